//! Field validators applied before anything reaches a store.
//!
//! Every function is pure: it takes a primitive and returns either the
//! sanitized value or a [`ValidationError`] naming the violation. The stores
//! only ever see parameterized queries, so these checks are a second line
//! of defence against malformed data rather than an injection barrier.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::ValidationError;

pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_FAMILY_NAME_LEN: usize = 100;
pub const MAX_PERSON_NAME_LEN: usize = 50;
pub const MAX_CATEGORY_NAME_LEN: usize = 50;
pub const MAX_BUDGET_NAME_LEN: usize = 100;
pub const MAX_REPORT_NAME_LEN: usize = 100;
pub const MAX_ICON_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_LEN: usize = 30;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Largest amount accepted anywhere: 999,999,999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_215_752_191, 23, 0, false, 2);

/// ISO 4217 codes a family may keep its books in.
pub const SUPPORTED_CURRENCIES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD", "NZD", "CNY", "HKD", "SGD", "KRW", "INR",
    "SEK", "NOK", "DKK", "PLN", "CZK", "HUF", "RUB", "UAH", "BYN", "KZT", "TRY", "ILS", "BRL",
    "MXN", "ZAR",
];

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}$").unwrap());

static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#[0-9A-F]{6}$").unwrap());

/// Character sequences that never appear in a legitimate address but do in
/// injection attempts.
const EMAIL_FORBIDDEN_SEQUENCES: &[&str] = &["'", "\"", ";", "\\", "<", ">", "--", "/*", "*/"];

/// SQL keywords refused when they form a whole word of the address.
const EMAIL_FORBIDDEN_WORDS: &[&str] = &["select", "union", "drop", "insert", "delete", "update"];

// ─── Identifiers ────────────────────────────────────────────────────────────

/// Parse an id from text. The nil UUID is rejected.
pub fn validate_uuid(field: &'static str, raw: &str) -> Result<Uuid, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    let id = Uuid::parse_str(raw).map_err(|e| ValidationError::malformed(field, e.to_string()))?;
    validate_id(field, id)
}

/// Reject the nil UUID.
pub fn validate_id(field: &'static str, id: Uuid) -> Result<Uuid, ValidationError> {
    if id.is_nil() {
        return Err(ValidationError::malformed(field, "nil uuid"));
    }
    Ok(id)
}

// ─── Text ───────────────────────────────────────────────────────────────────

/// Validate and normalize an email address. Returns the lowercased, trimmed email.
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    const FIELD: &str = "email";
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::Empty { field: FIELD });
    }
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(ValidationError::TooLong {
            field: FIELD,
            max: MAX_EMAIL_LEN,
        });
    }
    if email.chars().any(char::is_control) {
        return Err(ValidationError::malformed(FIELD, "contains control characters"));
    }
    if let Some(seq) = EMAIL_FORBIDDEN_SEQUENCES.iter().find(|s| email.contains(**s)) {
        return Err(ValidationError::malformed(
            FIELD,
            format!("contains forbidden sequence {seq:?}"),
        ));
    }
    if let Some(word) = email
        .split(['.', '_', '%', '+', '@', '-'])
        .find(|w| EMAIL_FORBIDDEN_WORDS.contains(w))
    {
        return Err(ValidationError::malformed(
            FIELD,
            format!("contains forbidden word {word:?}"),
        ));
    }
    if email.contains("..") || !EMAIL_RE.is_match(&email) {
        return Err(ValidationError::malformed(FIELD, "not a valid address"));
    }
    Ok(email)
}

/// Trim a required name-like field and bound its length.
pub fn validate_name(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::malformed(field, "contains control characters"));
    }
    Ok(trimmed.to_string())
}

/// Free-form description; may be empty. Newlines and tabs are allowed.
pub fn validate_description(value: &str) -> Result<String, ValidationError> {
    const FIELD: &str = "description";
    let trimmed = value.trim();
    if trimmed.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: FIELD,
            max: MAX_DESCRIPTION_LEN,
        });
    }
    if trimmed
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\t')
    {
        return Err(ValidationError::malformed(FIELD, "contains control characters"));
    }
    Ok(trimmed.to_string())
}

/// `#RRGGBB`, normalized to upper case.
pub fn validate_color(value: &str) -> Result<String, ValidationError> {
    let color = value.trim().to_uppercase();
    if color.is_empty() {
        return Err(ValidationError::Empty { field: "color" });
    }
    if !COLOR_RE.is_match(&color) {
        return Err(ValidationError::malformed("color", "expected #RRGGBB"));
    }
    Ok(color)
}

/// Trim, lowercase and de-duplicate tags, keeping first-seen order.
pub fn validate_tags(tags: &[String]) -> Result<Vec<String>, ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(ValidationError::out_of_range(
            "tags",
            format!("at most {MAX_TAGS} tags"),
        ));
    }
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = validate_name("tag", tag, MAX_TAG_LEN)?.to_lowercase();
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    Ok(out)
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(ValidationError::out_of_range(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(ValidationError::TooLong {
            field: "password",
            max: MAX_PASSWORD_LEN,
        });
    }
    Ok(())
}

// ─── Currency & money ───────────────────────────────────────────────────────

/// Accepts whitelisted ISO 4217 codes, case-insensitively. Returns upper case.
pub fn validate_currency(code: &str) -> Result<String, ValidationError> {
    const FIELD: &str = "currency";
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(ValidationError::Empty { field: FIELD });
    }
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::malformed(FIELD, "expected a 3-letter code"));
    }
    if !SUPPORTED_CURRENCIES.contains(&code.as_str()) {
        return Err(ValidationError::unsupported(FIELD, code));
    }
    Ok(code)
}

/// Accepts `0 < amount <= MAX_AMOUNT`; the result is rounded to cents.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, ValidationError> {
    const FIELD: &str = "amount";
    if amount <= Decimal::ZERO {
        return Err(ValidationError::out_of_range(FIELD, "must be positive"));
    }
    if amount > MAX_AMOUNT {
        return Err(ValidationError::out_of_range(
            FIELD,
            format!("must not exceed {MAX_AMOUNT}"),
        ));
    }
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        return Err(ValidationError::out_of_range(
            FIELD,
            "smaller than the minor currency unit",
        ));
    }
    Ok(rounded)
}

// ─── Dates ──────────────────────────────────────────────────────────────────

pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if end < start {
        return Err(ValidationError::out_of_range(
            "end_date",
            "must not be before start_date",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn max_amount_constant() {
        assert_eq!(MAX_AMOUNT, dec("999999999.99"));
    }

    #[test]
    fn uuid_rules() {
        let id = Uuid::new_v4();
        assert_eq!(validate_uuid("id", &id.to_string()).unwrap(), id);
        assert_eq!(
            validate_uuid("id", &format!("  {id} ")).unwrap(),
            id,
            "surrounding whitespace is ignored"
        );
        assert!(matches!(
            validate_uuid("id", "00000000-0000-0000-0000-000000000000"),
            Err(ValidationError::Malformed { field: "id", .. })
        ));
        assert!(matches!(
            validate_uuid("id", ""),
            Err(ValidationError::Empty { field: "id" })
        ));
        assert!(validate_uuid("id", "not-a-uuid").is_err());
        assert!(validate_id("id", Uuid::nil()).is_err());
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(validate_email("  Alice@Example.COM ").unwrap(), "alice@example.com");
        assert_eq!(validate_email("a@b.com").unwrap(), "a@b.com");
        assert_eq!(
            validate_email("first.last+tag@sub.example.org").unwrap(),
            "first.last+tag@sub.example.org"
        );
    }

    #[test]
    fn email_rejections() {
        assert!(matches!(validate_email("   "), Err(ValidationError::Empty { .. })));
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(validate_email(&long), Err(ValidationError::TooLong { max: 254, .. })));
        for bad in [
            "no-at-sign",
            "a@b",
            "a@@b.com",
            "a..b@c.com",
            "a b@c.com",
            "a@b.c",
            "o'brien@example.com",
            "x@y.com;drop",
            "x--@y.com",
            "a\u{0007}@b.com",
            "\"a\"@b.com",
        ] {
            assert!(validate_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn email_sql_keywords_are_whole_words() {
        for bad in [
            "select@example.com",
            "DROP@example.com",
            "union.select@x.com",
            "delete@x.com",
            "a+insert@x.com",
            "bob@update.example.com",
        ] {
            assert!(
                matches!(validate_email(bad), Err(ValidationError::Malformed { .. })),
                "{bad} should be rejected"
            );
        }
        for good in ["selena@example.com", "dropbox-fan@x.com", "updates@x.com"] {
            assert!(validate_email(good).is_ok(), "{good} should be accepted");
        }
    }

    #[test]
    fn currency_whitelist() {
        for code in SUPPORTED_CURRENCIES {
            assert_eq!(validate_currency(code).unwrap(), *code);
            assert_eq!(
                validate_currency(&format!(" {} ", code.to_lowercase())).unwrap(),
                *code
            );
        }
        assert!(matches!(
            validate_currency("XXX"),
            Err(ValidationError::Unsupported { .. })
        ));
        assert!(matches!(
            validate_currency("US"),
            Err(ValidationError::Malformed { .. })
        ));
        assert!(matches!(
            validate_currency("U$D"),
            Err(ValidationError::Malformed { .. })
        ));
        assert!(matches!(validate_currency(""), Err(ValidationError::Empty { .. })));
    }

    #[test]
    fn amount_bounds() {
        assert_eq!(validate_amount(dec("100.50")).unwrap(), dec("100.50"));
        assert_eq!(validate_amount(dec("0.01")).unwrap(), dec("0.01"));
        assert_eq!(validate_amount(MAX_AMOUNT).unwrap(), MAX_AMOUNT);
        assert_eq!(validate_amount(dec("10.005")).unwrap(), dec("10.01"));
        assert!(validate_amount(Decimal::ZERO).is_err());
        assert!(validate_amount(dec("-1")).is_err());
        assert!(validate_amount(dec("1000000000")).is_err());
        assert!(validate_amount(dec("999999999.991")).is_err());
        assert!(validate_amount(dec("0.001")).is_err());
    }

    #[test]
    fn names() {
        assert_eq!(validate_name("name", "  Smith  ", 100).unwrap(), "Smith");
        assert!(matches!(
            validate_name("name", "   ", 100),
            Err(ValidationError::Empty { field: "name" })
        ));
        assert!(validate_name("name", &"x".repeat(101), 100).is_err());
        assert!(validate_name("name", &"x".repeat(100), 100).is_ok());
        assert!(validate_name("name", "a\u{0000}b", 100).is_err());
    }

    #[test]
    fn descriptions_allow_newlines() {
        assert_eq!(validate_description(" line1\nline2 ").unwrap(), "line1\nline2");
        assert_eq!(validate_description("").unwrap(), "");
        assert!(validate_description(&"x".repeat(501)).is_err());
        assert!(validate_description("bell\u{0007}").is_err());
    }

    #[test]
    fn colors() {
        assert_eq!(validate_color("#ff00aa").unwrap(), "#FF00AA");
        assert!(validate_color("ff00aa").is_err());
        assert!(validate_color("#ff00a").is_err());
        assert!(validate_color("#gg0000").is_err());
    }

    #[test]
    fn tags_are_normalized() {
        let tags = vec![" Food ".to_string(), "food".to_string(), "Weekly".to_string()];
        assert_eq!(validate_tags(&tags).unwrap(), vec!["food", "weekly"]);
        let too_many: Vec<String> = (0..11).map(|i| format!("t{i}")).collect();
        assert!(validate_tags(&too_many).is_err());
        assert!(validate_tags(&["".to_string()]).is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("hunter22").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"p".repeat(129)).is_err());
    }

    #[test]
    fn date_ranges() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert!(validate_date_range(a, b).is_ok());
        assert!(validate_date_range(a, a).is_ok());
        assert!(validate_date_range(b, a).is_err());
    }
}
