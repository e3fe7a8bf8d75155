use thiserror::Error;

/// Monetary amounts are integer cents to avoid floating-point drift.
/// USD only: 20_000.00 collected from a customer is 2_000_000 cents.
pub type Cents = i64;

/// Format cents as a decimal string: 2000000 -> "20000.00", -150 -> "-1.50"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid money amount: {0}")]
pub struct MoneyParseError(pub String);

/// Parse a decimal string into cents. Accepts "20000", "20000.0", "20000.00",
/// with at most a leading '-' sign, so parsing inverts [`format_cents`].
/// More than two fractional digits is rejected rather than truncated.
pub fn parse_cents(input: &str) -> Result<Cents, MoneyParseError> {
    let trimmed = input.trim();
    let err = || MoneyParseError(input.to_string());

    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let (units_str, frac_str) = match digits.split_once('.') {
        Some((u, f)) => (u, f),
        None => (digits, ""),
    };

    if frac_str.len() > 2 || (units_str.is_empty() && frac_str.is_empty()) {
        return Err(err());
    }

    // The only sign accepted is the leading '-' stripped above; i64 parsing
    // would otherwise let "+5" or "1.-5" through
    if !units_str.bytes().all(|b| b.is_ascii_digit())
        || !frac_str.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(err());
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| err())?
    };

    let frac: i64 = if frac_str.is_empty() {
        0
    } else {
        // Pad "5" to "50" so tenths parse as cents
        let padded = format!("{:0<2}", frac_str);
        padded.parse().map_err(|_| err())?
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(frac))
        .ok_or_else(err)?;

    Ok(if negative { -cents } else { cents })
}
