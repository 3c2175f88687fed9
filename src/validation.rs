//! Field validators for onboarding forms.
//!
//! Each validator takes the raw submitted value and returns `Err(message)`
//! with the user-facing message when the value is unacceptable.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, Utc};
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

pub type FieldResult = Result<(), String>;

static POSTCODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z]{1,2}[0-9][A-Z0-9]? ?[0-9][A-Z]{2}$").unwrap()
});

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?[0-9]{10,15}$").unwrap());

static SORT_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{6}$").unwrap());

static ACCOUNT_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{6,8}$").unwrap());

static COMPANY_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([0-9]{8}|[A-Z]{2}[0-9]{6})$").unwrap());

static VAT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(GB)?([0-9]{9}|[0-9]{12}|GD[0-9]{3}|HA[0-9]{3})$").unwrap());

/// Validation errors for one form, keyed by field in the order they were found.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(IndexMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; the first error for a field wins.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    /// Record `result` against `field` if it failed.
    pub fn check(&mut self, field: &'static str, result: FieldResult) {
        if let Err(message) = result {
            self.add(field, message);
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(value)` when nothing failed.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn mandatory(value: &str, message: &str) -> FieldResult {
    if is_blank(value) {
        Err(message.to_string())
    } else {
        Ok(())
    }
}

pub fn max_length(value: &str, max: usize, label: &str) -> FieldResult {
    if value.trim().chars().count() > max {
        Err(format!("{label} must be {max} characters or fewer"))
    } else {
        Ok(())
    }
}

/// Mandatory and no longer than `max` characters.
pub fn mandatory_text(value: &str, max: usize, label: &str, missing: &str) -> FieldResult {
    mandatory(value, missing)?;
    max_length(value, max, label)
}

pub fn postcode(value: &str) -> FieldResult {
    mandatory(value, "Enter a postcode")?;
    if POSTCODE.is_match(value.trim()) {
        Ok(())
    } else {
        Err("Enter a real postcode".to_string())
    }
}

pub fn email(value: &str) -> FieldResult {
    mandatory(value, "Enter an email address")?;
    max_length(value, 254, "Email address")?;
    if EMAIL.is_match(value.trim()) {
        Ok(())
    } else {
        Err("Enter an email address in the correct format, like name@example.com".to_string())
    }
}

/// Strip the separators people type into phone numbers.
fn strip_phone(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect()
}

pub fn phone(value: &str) -> FieldResult {
    mandatory(value, "Enter a work telephone number")?;
    if PHONE.is_match(&strip_phone(value.trim())) {
        Ok(())
    } else {
        Err("Enter a telephone number, like 01632 960 001, 07700 900 982 or +44 808 157 0192"
            .to_string())
    }
}

/// Normalise a validated phone number to E.164, assuming a UK number when no
/// country code is given.
pub fn normalise_phone(value: &str) -> String {
    let stripped = strip_phone(value.trim());
    if stripped.starts_with('+') {
        stripped
    } else if let Some(rest) = stripped.strip_prefix("00") {
        format!("+{rest}")
    } else if let Some(rest) = stripped.strip_prefix('0') {
        format!("+44{rest}")
    } else {
        format!("+{stripped}")
    }
}

/// Which part of a date of birth failed, so the error lands on that input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Day,
    Month,
    Year,
    Whole,
}

/// Validate a date of birth given as separate day/month/year inputs.
///
/// The person must be at least 13 and the year no earlier than 1900.
pub fn date_of_birth(day: &str, month: &str, year: &str) -> Result<NaiveDate, (DatePart, String)> {
    if is_blank(day) && is_blank(month) && is_blank(year) {
        return Err((DatePart::Whole, "Enter the date of birth".to_string()));
    }
    let day: u32 = day
        .trim()
        .parse()
        .ok()
        .filter(|d| (1..=31).contains(d))
        .ok_or((DatePart::Day, "Enter a valid day".to_string()))?;
    let month: u32 = month
        .trim()
        .parse()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or((DatePart::Month, "Enter a valid month".to_string()))?;
    let year: i32 = year
        .trim()
        .parse()
        .ok()
        .filter(|y: &i32| year.trim().len() == 4 && *y >= 1900)
        .ok_or((DatePart::Year, "Enter a valid year".to_string()))?;
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or((DatePart::Whole, "Enter a real date of birth".to_string()))?;

    let today = Utc::now().date_naive();
    let thirteenth = NaiveDate::from_ymd_opt(date.year() + 13, date.month(), date.day())
        .unwrap_or_else(|| date + chrono::Days::new(13 * 366));
    if date >= today {
        return Err((DatePart::Whole, "Date of birth must be in the past".to_string()));
    }
    if thirteenth > today {
        return Err((DatePart::Year, "Enter a valid year".to_string()));
    }
    Ok(date)
}

/// Remove spaces and dashes from bank identifiers.
pub fn compact_digits(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, ' ' | '-')).collect()
}

pub fn sort_code(value: &str) -> FieldResult {
    mandatory(value, "Enter a sort code")?;
    if SORT_CODE.is_match(&compact_digits(value)) {
        Ok(())
    } else {
        Err("Enter a valid sort code like 309430".to_string())
    }
}

pub fn account_number(value: &str) -> FieldResult {
    mandatory(value, "Enter an account number")?;
    if ACCOUNT_NUMBER.is_match(&compact_digits(value)) {
        Ok(())
    } else {
        Err("Enter a valid account number like 00733445".to_string())
    }
}

pub fn company_number(value: &str) -> FieldResult {
    mandatory(value, "Enter a company registration number")?;
    if COMPANY_NUMBER.is_match(&compact_digits(value)) {
        Ok(())
    } else {
        Err("Enter a valid company registration number".to_string())
    }
}

pub fn vat_number(value: &str) -> FieldResult {
    mandatory(value, "Enter a VAT registration number")?;
    if VAT_NUMBER.is_match(&compact_digits(value)) {
        Ok(())
    } else {
        Err("Enter a valid VAT registration number".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_keep_first_message_and_order() {
        let mut errors = FieldErrors::new();
        errors.add("b", "first b");
        errors.add("a", "first a");
        errors.add("b", "second b");
        assert_eq!(errors.get("b"), Some("first b"));
        let json = serde_json::to_string(&errors).unwrap();
        assert_eq!(json, r#"{"b":"first b","a":"first a"}"#);
        assert!(errors.into_result(()).is_err());
        assert_eq!(FieldErrors::new().into_result(5), Ok(5));
    }

    #[test]
    fn mandatory_and_length() {
        assert!(mandatory("  ", "Enter it").is_err());
        assert!(mandatory("x", "Enter it").is_ok());
        assert!(max_length(&"a".repeat(101), 100, "Name").is_err());
        assert!(mandatory_text("ok", 5, "Name", "Enter a name").is_ok());
        assert_eq!(
            mandatory_text("", 5, "Name", "Enter a name").unwrap_err(),
            "Enter a name"
        );
    }

    #[test]
    fn postcodes() {
        assert!(postcode("SW1A 1AA").is_ok());
        assert!(postcode("sw1a1aa").is_ok());
        assert!(postcode("12345").is_err());
        assert!(postcode("").is_err());
    }

    #[test]
    fn emails() {
        assert!(email("dev@example.com").is_ok());
        assert!(email("not-an-email").is_err());
    }

    #[test]
    fn phones_validate_and_normalise() {
        assert!(phone("01632 960 001").is_ok());
        assert!(phone("+44 808 157 0192").is_ok());
        assert!(phone("(020) 7946-0000").is_ok());
        assert!(phone("12ab").is_err());
        assert!(phone("").is_err());

        assert_eq!(normalise_phone("01632 960 001"), "+441632960001");
        assert_eq!(normalise_phone("+44 808 157 0192"), "+448081570192");
        assert_eq!(normalise_phone("0044 7700 900982"), "+447700900982");
    }

    #[test]
    fn dates_of_birth() {
        let date = date_of_birth("1", "2", "1980").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(1980, 2, 1).unwrap());

        assert_eq!(date_of_birth("", "", "").unwrap_err().0, DatePart::Whole);
        assert_eq!(date_of_birth("32", "1", "1980").unwrap_err().0, DatePart::Day);
        assert_eq!(date_of_birth("1", "13", "1980").unwrap_err().0, DatePart::Month);
        assert_eq!(date_of_birth("1", "1", "80").unwrap_err().0, DatePart::Year);
        assert_eq!(date_of_birth("1", "1", "1850").unwrap_err().0, DatePart::Year);
        assert_eq!(date_of_birth("31", "2", "1980").unwrap_err().0, DatePart::Whole);

        let next_year = (Utc::now().year() + 1).to_string();
        assert!(date_of_birth("1", "1", &next_year).is_err());
    }

    #[test]
    fn bank_identifiers() {
        assert!(sort_code("30-94-30").is_ok());
        assert!(sort_code("3094").is_err());
        assert!(account_number("00733445").is_ok());
        assert!(account_number("12").is_err());
    }

    #[test]
    fn company_and_vat_numbers() {
        assert!(company_number("01234567").is_ok());
        assert!(company_number("SC123456").is_ok());
        assert!(company_number("123").is_err());
        assert!(vat_number("GB 123 4567 89").is_ok());
        assert!(vat_number("123456789").is_ok());
        assert!(vat_number("GB12").is_err());
    }
}
