use chrono::{Datelike, Utc};
use rand::Rng;

use crate::{luhn::passes_luhn, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Brand {
    Visa,
    Mastercard,
    Elo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardType {
    Physical,
    Virtual,
}

pub fn validate_brand_str(brand: &str) -> Result<Brand, ValidationError> {
    match brand.to_ascii_lowercase().as_str() {
        "visa" => Ok(Brand::Visa),
        "mastercard" => Ok(Brand::Mastercard),
        "elo" => Ok(Brand::Elo),
        other => Err(ValidationError::UnsupportedBrand(other.to_string())),
    }
}

pub fn card_type_from_str(card_type: &str) -> Result<CardType, ValidationError> {
    match card_type.to_ascii_lowercase().as_str() {
        "physical" => Ok(CardType::Physical),
        "virtual" => Ok(CardType::Virtual),
        other => Err(ValidationError::UnsupportedBrand(other.to_string())),
    }
}

fn mastercard_prefix() -> &'static str {
    const PREFIXES: [&str; 5] = ["51", "52", "53", "54", "55"];
    PREFIXES[rand::thread_rng().gen_range(0..PREFIXES.len())]
}

/// Assembles `prefix + random middle + check digit`, 16 digits total,
/// such that the result passes Luhn (spec.md §4.4).
pub fn generate_card_number(brand: Brand) -> Result<String, ValidationError> {
    let prefix = match brand {
        Brand::Visa => "4".to_string(),
        Brand::Mastercard => mastercard_prefix().to_string(),
        Brand::Elo => "636368".to_string(),
    };
    const TOTAL_LEN: usize = 16;
    let middle_len = TOTAL_LEN - prefix.len() - 1;
    let mut rng = rand::thread_rng();
    let middle: String = (0..middle_len).map(|_| char::from(b'0' + rng.gen_range(0..10))).collect();
    let partial = format!("{prefix}{middle}");
    let check_digit = (0..10u8)
        .find(|d| passes_luhn(&format!("{partial}{d}")))
        .expect("one of 0..10 always makes a Luhn-valid trailing digit");
    Ok(format!("{partial}{check_digit}"))
}

pub fn validate_cvv(cvv: &str) -> Result<(), ValidationError> {
    if cvv.len() >= 3 && cvv.len() <= 4 && cvv.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidCvv)
    }
}

/// Month in `[1,12]`; year not before the current year; if the year
/// equals the current year, month not before the current month. The
/// last day of the expiry month is still valid.
pub fn check_expiry(month: i32, year: i32) -> Result<(), ValidationError> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::InvalidExpiry);
    }
    let now = Utc::now();
    let (current_year, current_month) = (now.year(), now.month() as i32);
    if year < current_year || (year == current_year && month < current_month) {
        return Err(ValidationError::InvalidExpiry);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_visa_number_passes_luhn_and_has_right_prefix_and_length() {
        let n = generate_card_number(Brand::Visa).unwrap();
        assert_eq!(n.len(), 16);
        assert!(n.starts_with('4'));
        assert!(passes_luhn(&n));
    }

    #[test]
    fn generated_elo_number_has_declared_prefix() {
        let n = generate_card_number(Brand::Elo).unwrap();
        assert!(n.starts_with("636368"));
        assert!(passes_luhn(&n));
    }

    #[test]
    fn brand_parsing_is_case_insensitive() {
        assert_eq!(validate_brand_str("VISA").unwrap(), Brand::Visa);
        assert!(validate_brand_str("amex").is_err());
    }

    #[test]
    fn expiry_last_day_of_month_is_valid_next_month_is_not() {
        let now = Utc::now();
        assert!(check_expiry(now.month() as i32, now.year()).is_ok());
        assert!(check_expiry(1, now.year() - 1).is_err());
    }

    #[test]
    fn cvv_accepts_three_or_four_digits_only() {
        assert!(validate_cvv("123").is_ok());
        assert!(validate_cvv("1234").is_ok());
        assert!(validate_cvv("12").is_err());
        assert!(validate_cvv("12a4").is_err());
    }
}
