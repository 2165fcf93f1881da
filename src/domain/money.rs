use thiserror::Error;

/// Amounts are plain floating-point currency units, e.g. 12.5 = $12.50.
pub type Amount = f64;

/// Format an amount with two decimals.
/// Example: 12.5 -> "12.50", 100.0 / 3.0 -> "33.33"
pub fn format_amount(amount: Amount) -> String {
    format!("{:.2}", amount)
}

/// Format an amount as dollars, e.g. "$12.50".
pub fn format_currency(amount: Amount) -> String {
    if amount < 0.0 {
        format!("-${:.2}", -amount)
    } else {
        format!("${:.2}", amount)
    }
}

/// Parse user-entered text into an amount.
/// Example: "50" -> 50.0, " 12.34 " -> 12.34, ".5" -> 0.5
///
/// Rejects anything that is not a finite, non-negative number. Invalid input
/// is an error, never a silent zero.
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    let amount: Amount = input
        .parse()
        .map_err(|_| ParseAmountError::InvalidFormat(input.to_string()))?;

    if !amount.is_finite() {
        return Err(ParseAmountError::InvalidFormat(input.to_string()));
    }
    if amount < 0.0 {
        return Err(ParseAmountError::Negative(amount));
    }

    // "-0" parses fine but should be stored as plain zero
    Ok(amount.abs())
}

/// True when the amount may be stored on a debt.
pub fn is_valid_amount(amount: Amount) -> bool {
    amount.is_finite() && amount >= 0.0
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseAmountError {
    #[error("amount is empty")]
    Empty,

    #[error("invalid amount '{0}': please enter a number")]
    InvalidFormat(String),

    #[error("amount cannot be negative: {0}")]
    Negative(Amount),
}
