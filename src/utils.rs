use chrono::NaiveDate;

use crate::errors::AppError;

/// Parse an expense date, accepting `YYYY-MM-DD` first and falling back to
/// `DD-MM-YYYY`. A date valid in both formats reads as ISO. The result is
/// normalized back to ISO text for storage.
pub fn parse_expense_date(raw: &str) -> Result<String, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d-%m-%Y"))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| {
            AppError::InvalidInput("Invalid date format, use YYYY-MM-DD or DD-MM-YYYY".into())
        })
}

/// Normalize an expense type to its canonical string and flag.
/// Anything that is not "purchase" (case-insensitive) counts as Others.
pub fn normalize_expense_type(raw: &str) -> (String, i64) {
    if raw.eq_ignore_ascii_case("purchase") {
        ("Purchase".to_string(), 0)
    } else {
        ("Others".to_string(), 1)
    }
}

/// Normalize a payment type: Cash -> 0, UPI -> 1, anything else -> none.
pub fn normalize_payment_type(raw: &str) -> Option<(String, i64)> {
    if raw.eq_ignore_ascii_case("cash") {
        Some(("Cash".to_string(), 0))
    } else if raw.eq_ignore_ascii_case("upi") {
        Some(("UPI".to_string(), 1))
    } else {
        None
    }
}
