//! Field validation shared by the API and the browser

use chrono::NaiveDate;
use rust_decimal::Decimal;

// ============================================================================
// Contact Validations
// ============================================================================

/// Validate email format: `local@domain.tld` with an alphabetic TLD of 2+ letters
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    const INVALID: &str = "Invalid email format";

    let (local, domain) = email.split_once('@').ok_or(INVALID)?;
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    if !local_ok {
        return Err(INVALID);
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(INVALID);
    }
    let (host, tld) = domain.rsplit_once('.').ok_or(INVALID)?;
    if host.is_empty() || tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(INVALID);
    }
    Ok(())
}

/// Validate phone number: 7-15 digits, in international or US/CA layout
///
/// Accepts `+1 (555) 123-4567`, `555.123.4567`, `+44 207 946 0958` and the like.
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let digit_count = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !(7..=15).contains(&digit_count) {
        return Err("Phone number must have between 7 and 15 digits");
    }

    let bytes = phone.as_bytes();
    let matched = match bytes.first() {
        Some(b'+') => (1..=3).any(|cc| {
            let end = 1 + cc;
            bytes.len() > end
                && bytes[1..end].iter().all(u8::is_ascii_digit)
                && match_local_number(skip_separator(&bytes[end..]))
        }),
        _ => match_local_number(bytes),
    };
    if matched {
        Ok(())
    } else {
        Err("Invalid phone number format")
    }
}

fn skip_separator(input: &[u8]) -> &[u8] {
    match input.first() {
        Some(b' ' | b'.' | b'-') => &input[1..],
        _ => input,
    }
}

fn take_digits(input: &[u8], count: usize) -> Option<&[u8]> {
    if input.len() >= count && input[..count].iter().all(u8::is_ascii_digit) {
        Some(&input[count..])
    } else {
        None
    }
}

/// `(?\d{3})?[sep]?\d{3}[sep]?\d{4}` anchored at both ends
fn match_local_number(input: &[u8]) -> bool {
    let rest = input.strip_prefix(b"(").unwrap_or(input);
    let Some(rest) = take_digits(rest, 3) else {
        return false;
    };
    let rest = rest.strip_prefix(b")").unwrap_or(rest);
    let Some(rest) = take_digits(skip_separator(rest), 3) else {
        return false;
    };
    matches!(take_digits(skip_separator(rest), 4), Some(rest) if rest.is_empty())
}

// ============================================================================
// Account Validations
// ============================================================================

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Validate username: 1-150 characters of letters, digits and `@.+-_`
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.is_empty() {
        return Err("Username is required");
    }
    if username.chars().count() > 150 {
        return Err("Username must be at most 150 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        return Err("Username may only contain letters, digits and @/./+/-/_");
    }
    Ok(())
}

// ============================================================================
// Date and Money Validations
// ============================================================================

pub fn validate_not_future(date: NaiveDate, today: NaiveDate) -> Result<(), &'static str> {
    if date > today {
        return Err("Date cannot be in the future");
    }
    Ok(())
}

/// `date` may not precede `base`
pub fn validate_not_before(date: NaiveDate, base: NaiveDate) -> Result<(), &'static str> {
    if date < base {
        return Err("Date cannot be before the reference date");
    }
    Ok(())
}

/// Decimal places kept by every stored quantity and amount
pub const STORED_SCALE: u32 = 2;

/// Exclusive bound on the magnitude of stored quantities and amounts, `NUMERIC(10, 2)`
pub const MAX_STORED_AMOUNT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// Whether `value` fits a `NUMERIC(10, 2)` column without rounding
pub fn validate_storable(value: Decimal) -> Result<(), &'static str> {
    if value.normalize().scale() > STORED_SCALE {
        return Err("At most 2 decimal places are allowed");
    }
    if value.abs() >= MAX_STORED_AMOUNT {
        return Err("Value must be less than 100000000");
    }
    Ok(())
}

pub fn validate_non_negative(value: Decimal) -> Result<(), &'static str> {
    validate_storable(value)?;
    if value < Decimal::ZERO {
        return Err("Value cannot be negative");
    }
    Ok(())
}

pub fn validate_positive(value: Decimal) -> Result<(), &'static str> {
    validate_storable(value)?;
    if value <= Decimal::ZERO {
        return Err("Value must be greater than zero");
    }
    Ok(())
}

/// Validate a required name field (non-blank, at most 255 characters)
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name is required");
    }
    if name.chars().count() > 255 {
        return Err("Name must be at most 255 characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_email_validation() {
        assert!(validate_email("orders@acme-spirits.com").is_ok());
        assert!(validate_email("first.last+bar@mail.example.co").is_ok());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@example").is_err());
        assert!(validate_email("user@example.c").is_err());
        assert!(validate_email("user@exa mple.com").is_err());
        assert!(validate_email("user@example.c0m").is_err());
    }

    #[test]
    fn test_phone_validation() {
        assert!(validate_phone("555-123-4567").is_ok());
        assert!(validate_phone("(555) 123-4567").is_ok());
        assert!(validate_phone("+1 (555) 123-4567").is_ok());
        assert!(validate_phone("+44 207.946.0958").is_ok());
        assert!(validate_phone("5551234567").is_ok());
        assert!(validate_phone("123-45").is_err());
        assert!(validate_phone("555-1234-567").is_err());
        assert!(validate_phone("call 5551234567").is_err());
    }

    #[test]
    fn test_password_and_username() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_username("bar.manager@1").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn test_date_validations() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let tomorrow = NaiveDate::from_ymd_opt(2024, 5, 11).unwrap();
        assert!(validate_not_future(today, today).is_ok());
        assert!(validate_not_future(tomorrow, today).is_err());
        assert!(validate_not_before(tomorrow, today).is_ok());
        assert!(validate_not_before(today, tomorrow).is_err());
    }

    #[test]
    fn test_money_validations() {
        assert!(validate_non_negative(dec!(0)).is_ok());
        assert!(validate_non_negative(dec!(-0.01)).is_err());
        assert!(validate_positive(dec!(0.01)).is_ok());
        assert!(validate_positive(dec!(0)).is_err());
        assert!(validate_name("  ").is_err());
        assert!(validate_name("Back Bar").is_ok());
    }

    #[test]
    fn test_amounts_must_fit_storage() {
        assert!(validate_storable(dec!(12.50)).is_ok());
        assert!(validate_storable(dec!(12.500)).is_ok());
        assert!(validate_storable(dec!(99999999.99)).is_ok());
        assert!(validate_storable(dec!(0.004)).is_err());
        assert!(validate_storable(dec!(100000000)).is_err());
        assert!(validate_storable(dec!(-100000000)).is_err());
        assert!(validate_non_negative(dec!(8.125)).is_err());
        assert!(validate_positive(dec!(0.005)).is_err());
    }
}
