//! Relative date expressions for `--date`.
//!
//! The only accepted shape is `+<integer><unit>` with unit one of
//! `hour`, `hours`, `minute`, `minutes`, e.g. `+2hours` or `+30minutes`.

use chrono::{DateTime, Duration, Utc};

use crate::error::{Error, Result};

/// Parse a relative date expression into a duration offset.
///
/// # Errors
/// Returns `InvalidDateExpression` if the input does not match the
/// `+<integer><unit>` pattern.
pub fn parse_offset(expr: &str) -> Result<Duration> {
    let invalid = || Error::InvalidDateExpression(expr.to_string());

    let rest = expr.strip_prefix('+').ok_or_else(invalid)?;

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (digits, unit) = rest.split_at(digits_end);

    let amount: i64 = digits.parse().map_err(|_| invalid())?;

    // try_* instead of the panicking constructors: an absurd amount is
    // user input and must come back as a parse error.
    match unit {
        "hour" | "hours" => Duration::try_hours(amount).ok_or_else(invalid),
        "minute" | "minutes" => Duration::try_minutes(amount).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Resolve the due time for a commit.
///
/// An absent expression means "due now": the record becomes eligible on
/// the consumer's next poll.
///
/// # Errors
/// Returns `InvalidDateExpression` for a malformed expression.
pub fn resolve_due(expr: Option<&str>, now: DateTime<Utc>) -> Result<i64> {
    let due = match expr {
        Some(expr) => now
            .checked_add_signed(parse_offset(expr)?)
            .ok_or_else(|| Error::InvalidDateExpression(expr.to_string()))?,
        None => now,
    };
    Ok(due.timestamp())
}
