//! Compact target encoding, per-block work and the interval retarget.

use mvs_types::U256;

/// Decode compact `bits` into a 256-bit target.
///
/// Returns `None` for negative or overflowing encodings.
pub fn compact_to_target(bits: u32) -> Option<U256> {
    let size = bits >> 24;
    let word = bits & 0x007f_ffff;
    let sign = bits & 0x0080_0000 != 0;

    if size <= 3 {
        let word = word >> (8 * (3 - size));
        if word != 0 && sign {
            return None;
        }
        return Some(U256::from(word));
    }

    let overflow = word != 0 && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));
    if word != 0 && (sign || overflow) {
        return None;
    }
    Some(U256::from(word) << (8 * (size - 3)) as usize)
}

/// Encode a target as compact `bits`.
pub fn target_to_compact(target: U256) -> u32 {
    let mut size = (target.bits() + 7) / 8;
    let mut compact = if size <= 3 {
        (target.low_u64() << (8 * (3 - size))) as u32
    } else {
        (target >> (8 * (size - 3))).low_u64() as u32
    };

    // The sign bit is reserved; shift into the next byte instead.
    if compact & 0x0080_0000 != 0 {
        compact >>= 8;
        size += 1;
    }
    compact | ((size as u32) << 24)
}

/// Work represented by a block with the given `bits`: `2^256 / (target + 1)`.
///
/// Invalid or zero targets contribute no work.
pub fn block_work(bits: u32) -> U256 {
    match compact_to_target(bits) {
        Some(target) if !target.is_zero() => {
            // 2^256 does not fit; (~target / (target + 1)) + 1 is equivalent.
            (!target / (target + U256::one())) + U256::one()
        }
        _ => U256::zero(),
    }
}

/// Retarget after an interval, constraining the observed timespan to
/// a factor of four either way and never exceeding `limit_bits`.
pub fn retarget_bits(
    last_bits: u32,
    actual_timespan: u64,
    target_timespan: u64,
    limit_bits: u32,
) -> u32 {
    let limit = compact_to_target(limit_bits).unwrap_or_else(U256::max_value);
    let Some(last) = compact_to_target(last_bits) else {
        return limit_bits;
    };

    let target_timespan = target_timespan.max(1);
    let timespan = actual_timespan.clamp(target_timespan / 4, target_timespan * 4);

    let retargeted = last
        .checked_mul(U256::from(timespan))
        .map(|scaled| scaled / U256::from(target_timespan))
        .unwrap_or(limit);

    if retargeted > limit {
        limit_bits
    } else {
        target_to_compact(retargeted)
    }
}
