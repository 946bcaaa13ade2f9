//! Phone number normalization for outbound submissions

pub const COUNTRY_CODE: &str = "55";

pub const MIN_PHONE_DIGITS: usize = 10;
pub const MAX_PHONE_DIGITS: usize = 13;

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Digits only, one leading trunk `0` dropped, country code prefixed when absent.
pub fn normalize_phone(raw: &str) -> String {
    let digits = digits_only(raw);
    let cleaned = digits.strip_prefix('0').unwrap_or(&digits);

    if cleaned.starts_with(COUNTRY_CODE) {
        cleaned.to_string()
    } else {
        format!("{}{}", COUNTRY_CODE, cleaned)
    }
}

pub fn has_valid_digit_count(raw: &str) -> bool {
    let count = digits_only(raw).len();
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&count)
}
