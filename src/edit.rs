//! Single-cell edits on week blocks.
//!
//! Edits never touch the block they are given; they return a fresh block with one
//! cell replaced so the caller can compare old and new state before persisting.

use crate::journal::{WeekBlock, TRADE_ROWS};

/// Parse free-text numeric entry. Anything that is not a finite number reads as 0.
pub fn parse_amount(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Parse a starting-capital entry. Same coercion as [`parse_amount`], negatives clamp to 0.
pub fn parse_capital(raw: &str) -> f64 {
    parse_amount(raw).max(0.0)
}

/// Copy of `block` with trade slot `row` on column `day` set to `value`.
///
/// # Panics
///
/// Panics if `row >= 5` or `day >= block.len()`.
pub fn with_trade(block: &WeekBlock, row: usize, day: usize, value: f64) -> WeekBlock {
    assert!(row < TRADE_ROWS, "trade row {} out of range", row);
    assert!(
        day < block.len(),
        "day {} out of range for week of {} days",
        day,
        block.len()
    );
    let mut next = block.clone();
    next.trades[row][day] = value;
    next
}

/// Copy of `block` with the charge on column `day` set to `value`.
///
/// # Panics
///
/// Panics if `day >= block.len()`.
pub fn with_charge(block: &WeekBlock, day: usize, value: f64) -> WeekBlock {
    assert!(
        day < block.len(),
        "day {} out of range for week of {} days",
        day,
        block.len()
    );
    let mut next = block.clone();
    next.charges[day] = value;
    next
}
