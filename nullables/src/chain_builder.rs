//! Builds valid regtest blocks for tests.
//!
//! Blocks are mined against the regtest limit, which any second hash meets.
//! A `tag` byte goes into each coinbase so that blocks built on the same
//! parent for different forks get different hashes.

use mvs_blockchain::ChainParams;
use mvs_crypto::{keypair_from_seed, sign_header};
use mvs_types::{
    generate_merkle_root, Block, BlockHash, Header, Input, KeyPair, OutPoint, Operation, Output, ProofKind,
    PublicKey, Script, Transaction, TxHash,
};
use mvs_work::WorkGenerator;

pub const GENESIS_TIMESTAMP: u32 = 1_500_000_000;
pub const BLOCK_SPACING: u32 = 60;

pub struct ChainBuilder {
    params: ChainParams,
    miner_seed: [u8; 32],
}

impl ChainBuilder {
    pub fn regtest() -> Self {
        Self {
            params: ChainParams::regtest(),
            miner_seed: [0x4d; 32],
        }
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn miner(&self) -> KeyPair {
        keypair_from_seed(&self.miner_seed)
    }

    /// A deterministic key for tests that need several signers.
    pub fn key(index: u8) -> KeyPair {
        keypair_from_seed(&[index; 32])
    }

    pub fn genesis(&self) -> Block {
        let header = Header {
            version: 1,
            proof: ProofKind::Pow,
            previous_hash: BlockHash::ZERO,
            merkle_root: TxHash::ZERO,
            timestamp: GENESIS_TIMESTAMP,
            bits: self.params.pow_limit_bits,
            nonce: 0,
            number: 0,
        };
        self.seal(header, vec![self.coinbase(0, 0, self.params.pow_subsidy(0))])
    }

    /// Coinbase at `height` paying `value` to the miner.
    pub fn coinbase(&self, height: u64, tag: u8, value: u64) -> Transaction {
        let mut marker = vec![tag];
        marker.extend_from_slice(&height.to_le_bytes());
        Transaction::new(
            vec![Input::new(OutPoint::NULL, Script::new(vec![Operation::push(marker)]))],
            vec![Output::new(value, Script::pay_to_public_key(&self.miner().public))],
        )
    }

    /// Spend output `index` of `previous`, paying `value` to `owner`.
    pub fn spend(previous: &Transaction, index: u32, value: u64, owner: &PublicKey) -> Transaction {
        Transaction::new(
            vec![Input::new(OutPoint::new(previous.hash(), index), Script::default())],
            vec![Output::new(value, Script::pay_to_public_key(owner))],
        )
    }

    fn child_header(&self, parent: &Header, proof: ProofKind) -> Header {
        Header {
            version: 1,
            proof,
            previous_hash: parent.hash(),
            merkle_root: TxHash::ZERO,
            timestamp: parent.timestamp + BLOCK_SPACING,
            bits: self.params.pow_limit_bits,
            nonce: 0,
            number: parent.number + 1,
        }
    }

    /// PoW block on `parent`: a full-subsidy coinbase followed by `transactions`.
    pub fn pow_block(&self, parent: &Header, tag: u8, transactions: Vec<Transaction>) -> Block {
        let header = self.child_header(parent, ProofKind::Pow);
        let mut all = vec![self.coinbase(header.number, tag, self.params.pow_subsidy(header.number))];
        all.extend(transactions);
        self.seal(header, all)
    }

    /// `count` empty PoW blocks on `parent`.
    pub fn pow_chain(&self, parent: &Header, count: usize, tag: u8) -> Vec<Block> {
        let mut blocks: Vec<Block> = Vec::with_capacity(count);
        for _ in 0..count {
            let parent = blocks.last().map_or(parent, |b| &b.header);
            let block = self.pow_block(parent, tag, Vec::new());
            blocks.push(block);
        }
        blocks
    }

    /// PoS block staking output `stake_index` of `stake_tx`, owned by `staker`.
    /// The coinstake returns the stake plus the stake reward.
    pub fn pos_block(
        &self,
        parent: &Header,
        tag: u8,
        stake_tx: &Transaction,
        stake_index: u32,
        staker: &KeyPair,
    ) -> Block {
        let header = self.child_header(parent, ProofKind::Pos);
        let stake_value = stake_tx.outputs[stake_index as usize].value;
        let coinstake = Transaction::new(
            vec![Input::new(OutPoint::new(stake_tx.hash(), stake_index), Script::default())],
            vec![
                Output::new(0, Script::default()),
                Output::new(stake_value + self.params.pos_reward, Script::pay_to_public_key(&staker.public)),
            ],
        );
        let coinbase = self.coinbase(header.number, tag, 0);
        let mut block = self.seal(header, vec![coinbase, coinstake]);
        Self::sign(&mut block, staker);
        block
    }

    /// DPoS block signed by `witness`. `extra` outputs follow the coinbase
    /// payment, e.g. a vote result at the start of an epoch.
    pub fn dpos_block(&self, parent: &Header, tag: u8, witness: &KeyPair, extra: Vec<Output>) -> Block {
        let header = self.child_header(parent, ProofKind::Dpos);
        let mut coinbase = self.coinbase(header.number, tag, self.params.dpos_reward);
        coinbase.outputs.extend(extra);
        let mut block = self.seal(header, vec![coinbase]);
        Self::sign(&mut block, witness);
        block
    }

    /// Find a nonce for a PoW header after its fields were edited.
    pub fn mine(&self, header: &mut Header) {
        if header.proof == ProofKind::Pow {
            header.nonce = WorkGenerator::default()
                .generate(header, self.params.pow_limit_bits)
                .expect("regtest work is always found")
                .0;
        }
    }

    pub fn sign(block: &mut Block, key: &KeyPair) {
        block.public_key = Some(key.public);
        block.signature = Some(sign_header(&block.header, &key.private));
    }

    /// Set the merkle root and, for PoW, find a nonce.
    pub fn seal(&self, mut header: Header, transactions: Vec<Transaction>) -> Block {
        header.merkle_root = generate_merkle_root(&transactions);
        self.mine(&mut header);
        Block {
            header,
            transactions,
            public_key: None,
            signature: None,
        }
    }
}
