//! Ed25519 signing and verification, plus the block-signature convention
//! (signer signs the header hash).

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use mvs_types::{Header, PrivateKey, PublicKey, Signature};

/// Sign a message with a private key, returning the signature.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    Signature(signing_key.sign(message).to_bytes())
}

/// Verify a signature against a message and public key.
///
/// Returns `true` if the signature is valid, `false` otherwise.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify(message, &dalek_sig).is_ok()
}

/// Sign a block header (over its hash).
pub fn sign_header(header: &Header, private_key: &PrivateKey) -> Signature {
    sign_message(header.hash().as_bytes(), private_key)
}

/// Verify a block signature over the header hash.
pub fn verify_header_signature(
    header: &Header,
    signature: &Signature,
    public_key: &PublicKey,
) -> bool {
    verify_signature(header.hash().as_bytes(), signature, public_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;
    use mvs_types::{BlockHash, ProofKind, TxHash};

    fn header(number: u64) -> Header {
        Header {
            version: 1,
            proof: ProofKind::Dpos,
            previous_hash: BlockHash::ZERO,
            merkle_root: TxHash::ZERO,
            timestamp: 1_000,
            bits: 0x207f_ffff,
            nonce: 0,
            number,
        }
    }

    #[test]
    fn sign_and_verify() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let msg = b"test message";
        let sig = sign_message(msg, &kp.private);
        assert!(verify_signature(msg, &sig, &kp.public));
    }

    #[test]
    fn wrong_key_fails() {
        let kp1 = keypair_from_seed(&[1u8; 32]);
        let kp2 = keypair_from_seed(&[2u8; 32]);
        let sig = sign_message(b"test", &kp1.private);
        assert!(!verify_signature(b"test", &sig, &kp2.public));
    }

    #[test]
    fn header_signature_binds_header_content() {
        let kp = keypair_from_seed(&[3u8; 32]);
        let sig = sign_header(&header(10), &kp.private);
        assert!(verify_header_signature(&header(10), &sig, &kp.public));
        assert!(!verify_header_signature(&header(11), &sig, &kp.public));
    }
}
