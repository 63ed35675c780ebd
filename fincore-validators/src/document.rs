use crate::ValidationError;

fn all_identical(digits: &str) -> bool {
    let mut chars = digits.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => true,
    }
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let remainder = sum % 11;
    if remainder < 2 {
        0
    } else {
        11 - remainder
    }
}

fn to_digits(s: &str) -> Option<Vec<u32>> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(s.bytes().map(|b| (b - b'0') as u32).collect())
}

/// 11 digits, standard two-check-digit algorithm. Rejects all-identical
/// strings even if they would otherwise check (spec.md §4.4).
pub fn validate_cpf(cpf: &str) -> Result<(), ValidationError> {
    if cpf.len() != 11 || all_identical(cpf) {
        return Err(ValidationError::InvalidCpf);
    }
    let digits = to_digits(cpf).ok_or(ValidationError::InvalidCpf)?;

    let d1 = check_digit(&digits[0..9], &[10, 9, 8, 7, 6, 5, 4, 3, 2]);
    let d2 = check_digit(&digits[0..10], &[11, 10, 9, 8, 7, 6, 5, 4, 3, 2]);
    if digits[9] == d1 && digits[10] == d2 {
        Ok(())
    } else {
        Err(ValidationError::InvalidCpf)
    }
}

/// 14 digits, standard two-check-digit algorithm.
pub fn validate_cnpj(cnpj: &str) -> Result<(), ValidationError> {
    if cnpj.len() != 14 || all_identical(cnpj) {
        return Err(ValidationError::InvalidCnpj);
    }
    let digits = to_digits(cnpj).ok_or(ValidationError::InvalidCnpj)?;

    let d1 = check_digit(&digits[0..12], &[5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]);
    let d2 = check_digit(&digits[0..13], &[6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]);
    if digits[12] == d1 && digits[13] == d2 {
        Ok(())
    } else {
        Err(ValidationError::InvalidCnpj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_known_valid_cpf() {
        assert!(validate_cpf("52998224725").is_ok());
    }

    #[test]
    fn rejects_all_identical_digits_even_if_checksum_would_pass() {
        assert!(validate_cpf("11111111111").is_err());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(validate_cpf("123").is_err());
    }

    #[test]
    fn accepts_a_known_valid_cnpj() {
        assert!(validate_cnpj("11222333000181").is_ok());
    }

    #[test]
    fn rejects_tampered_cnpj_check_digit() {
        assert!(validate_cnpj("11222333000182").is_err());
    }
}
