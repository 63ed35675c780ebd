use crate::ValidationError;

const BLOCKLIST: [&str; 7] = ["1234", "4321", "0000", "1111", "2222", "123456", "654321"];

pub fn validate_pin_format(pin: &str) -> Result<(), ValidationError> {
    if (4..=6).contains(&pin.len()) && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPinFormat)
    }
}

/// A PIN is weak if every digit is identical, the digits are
/// monotonically ascending or descending by 1, or it appears on the
/// fixed blocklist (spec.md §4.4).
pub fn weak_pin(pin: &str) -> bool {
    if BLOCKLIST.contains(&pin) {
        return true;
    }
    let digits: Vec<i32> = pin.bytes().map(|b| (b - b'0') as i32).collect();
    if digits.windows(2).all(|w| w[0] == w[1]) {
        return true;
    }
    if digits.windows(2).all(|w| w[1] - w[0] == 1) {
        return true;
    }
    if digits.windows(2).all(|w| w[0] - w[1] == 1) {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocklisted_pins_are_weak() {
        assert!(weak_pin("1234"));
        assert!(weak_pin("0000"));
        assert!(weak_pin("654321"));
    }

    #[test]
    fn a_non_sequential_non_blocklisted_pin_is_not_weak() {
        assert!(!weak_pin("1357"));
    }

    #[test]
    fn format_requires_four_to_six_digits() {
        assert!(validate_pin_format("1357").is_ok());
        assert!(validate_pin_format("12").is_err());
        assert!(validate_pin_format("12a4").is_err());
    }
}
