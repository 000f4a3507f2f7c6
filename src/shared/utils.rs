//! Utility functions and helpers

use crate::shared::types::Amount;

/// Format an integer amount with the given number of decimals
pub fn format_amount(amount: Amount, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let digits = format!("{:0>width$}", amount, width = decimals as usize + 1);
    let (whole, fraction) = digits.split_at(digits.len() - decimals as usize);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

/// Generate unique ID
pub fn generate_id() -> uuid::Uuid {
    uuid::Uuid::new_v4()
}
