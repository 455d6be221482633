//! Basis-point arithmetic.
//!
//! Amounts are raw `u128` units. Percentages are integer basis points
//! (10000 = 100%) and every division floors.

/// 100% in basis points.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// `floor(amount * bps / 10000)`, saturating on overflow of the product.
pub fn apply_bps(amount: u128, bps: u32) -> u128 {
    match amount.checked_mul(bps as u128) {
        Some(product) => product / BPS_DENOMINATOR as u128,
        // Large amounts: divide first, losing at most one bps-step of precision.
        None => (amount / BPS_DENOMINATOR as u128).saturating_mul(bps as u128),
    }
}

/// `floor(part * 10000 / total)`; a zero total yields 0.
pub fn share_bps(part: u128, total: u128) -> u32 {
    if total == 0 {
        return 0;
    }
    let scaled = match part.checked_mul(BPS_DENOMINATOR as u128) {
        Some(p) => p / total,
        None => part / (total / BPS_DENOMINATOR as u128).max(1),
    };
    scaled.min(u32::MAX as u128) as u32
}

/// Whether `count` of `assigned` reaches a quorum of `quorum_bps`.
///
/// Equivalent to `count >= ceil(assigned * quorum_bps / 10000)`.
pub fn meets_quorum(count: u32, assigned: u32, quorum_bps: u32) -> bool {
    if assigned == 0 {
        return false;
    }
    count as u64 * BPS_DENOMINATOR as u64 >= assigned as u64 * quorum_bps as u64
}

/// Smallest ballot count that satisfies [`meets_quorum`].
pub fn quorum_count(assigned: u32, quorum_bps: u32) -> u32 {
    let need = assigned as u64 * quorum_bps as u64;
    need.div_ceil(BPS_DENOMINATOR as u64) as u32
}

/// Integer square root (floor).
pub fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let mut x = 1u128 << ((128 - n.leading_zeros()).div_ceil(2));
    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_bps_floors() {
        assert_eq!(apply_bps(999, 9000), 899); // 899.1
        assert_eq!(apply_bps(1000, 9000), 900);
        assert_eq!(apply_bps(0, 9000), 0);
        assert_eq!(apply_bps(u128::MAX, 10_000), u128::MAX / 10_000 * 10_000);
    }

    #[test]
    fn share_bps_floors() {
        assert_eq!(share_bps(1, 3), 3333);
        assert_eq!(share_bps(2, 3), 6666);
        assert_eq!(share_bps(5, 0), 0);
        assert_eq!(share_bps(50_001, 100_000), 5000);
    }

    #[test]
    fn quorum_is_ceiling() {
        // 7 assigned at 60% needs ceil(4.2) = 5.
        assert_eq!(quorum_count(7, 6000), 5);
        assert!(!meets_quorum(4, 7, 6000));
        assert!(meets_quorum(5, 7, 6000));
        // Exact multiples need no rounding.
        assert_eq!(quorum_count(5, 6000), 3);
        assert!(meets_quorum(3, 5, 6000));
        assert!(!meets_quorum(0, 0, 6000));
    }

    #[test]
    fn isqrt_matches_floor_sqrt() {
        for n in 0u128..2000 {
            let r = isqrt(n);
            assert!(r * r <= n && (r + 1) * (r + 1) > n, "n={n} r={r}");
        }
        assert_eq!(isqrt(1u128 << 100), 1u128 << 50);
    }
}
