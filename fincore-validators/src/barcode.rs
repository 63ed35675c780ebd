use crate::ValidationError;

/// Modulo-11 check digit over the barcode's 43 non-check digits,
/// weights cycling 2..9 from the rightmost digit (the standard Brazilian
/// bank-slip barcode algorithm). A remainder of 0 or 1 collapses to a
/// check digit of 1 rather than 11 or 10.
fn check_digit(digits: &[u32]) -> u32 {
    let weights = [2, 3, 4, 5, 6, 7, 8, 9];
    let sum: u32 = digits
        .iter()
        .rev()
        .zip(weights.iter().cycle())
        .map(|(d, w)| d * w)
        .sum();
    match sum % 11 {
        0 | 1 => 1,
        r => 11 - r,
    }
}

/// 44 digits: bank code (3), currency code (1), check digit (1), due-date
/// factor (4), amount in cents (10), free field (25). Returns the amount
/// encoded at positions 10..20 once the check digit verifies (spec.md §4.4,
/// §4.7).
pub fn validate_barcode(barcode: &str) -> Result<i64, ValidationError> {
    if barcode.len() != 44 || !barcode.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidBarcode);
    }
    let digits: Vec<u32> = barcode.bytes().map(|b| (b - b'0') as u32).collect();
    let declared = digits[4];
    let mut rest = Vec::with_capacity(43);
    rest.extend_from_slice(&digits[0..4]);
    rest.extend_from_slice(&digits[5..]);
    if check_digit(&rest) != declared {
        return Err(ValidationError::InvalidBarcode);
    }
    barcode[9..19].parse::<i64>().map_err(|_| ValidationError::InvalidBarcode)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "34191100000000150001234567890123456789012345";

    #[test]
    fn accepts_a_known_valid_barcode_and_parses_its_amount() {
        assert_eq!(validate_barcode(VALID).unwrap(), 15_000);
    }

    #[test]
    fn rejects_a_tampered_digit() {
        let tampered = "94191100000000150001234567890123456789012345";
        assert!(validate_barcode(tampered).is_err());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(validate_barcode("1234").is_err());
    }

    #[test]
    fn rejects_non_digit_characters() {
        let mut bad = VALID.to_string();
        bad.replace_range(10..11, "x");
        assert!(validate_barcode(&bad).is_err());
    }
}
