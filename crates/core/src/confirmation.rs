//! Confirmation gate (C5).
//!
//! The highest block eligible for indexing is always `tip - confirm_blocks`;
//! nothing below that line is ever fetched, so a contract configured with a
//! deeper confirmation requirement simply lags the tip further.

/// Highest indexable block given the current tip and a contract's
/// confirmation depth. Saturates at 0 rather than underflowing when the
/// chain is younger than `confirm_blocks`.
pub fn safe_block(tip: u64, confirm_blocks: u32) -> u64 {
    tip.saturating_sub(confirm_blocks as u64)
}

/// Whether there is new, confirmed work to do.
pub fn has_confirmed_work(tip: u64, confirm_blocks: u32, last_indexed_block: i64) -> bool {
    safe_block(tip, confirm_blocks) as i64 > last_indexed_block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_block_subtracts_confirmations() {
        assert_eq!(safe_block(110, 6), 104);
    }

    #[test]
    fn safe_block_saturates_at_zero() {
        assert_eq!(safe_block(3, 6), 0);
    }

    #[test]
    fn has_confirmed_work_respects_lag() {
        // S6: confirm_blocks=6, tip=110, event at 108 -> not yet indexable.
        assert!(!has_confirmed_work(110, 6, 107));
        assert!(has_confirmed_work(114, 6, 107));
    }
}
