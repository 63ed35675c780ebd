use uuid::Uuid;

use crate::document::{validate_cnpj, validate_cpf};
use crate::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixKeyKind {
    Cpf,
    Cnpj,
    Email,
    Phone,
    Random,
}

fn looks_like_an_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn looks_like_a_brazilian_phone(s: &str) -> bool {
    let Some(national) = s.strip_prefix("+55") else {
        return false;
    };
    (10..=11).contains(&national.len()) && national.bytes().all(|b| b.is_ascii_digit())
}

/// Dispatches on the declared key type (spec.md §4.4): `cpf`/`cnpj` run
/// the document checksum, `email`/`phone` run a shape check, `random`
/// must be a syntactically valid UUID.
pub fn validate_pix_key(kind: PixKeyKind, key: &str) -> Result<(), ValidationError> {
    let ok = match kind {
        PixKeyKind::Cpf => return validate_cpf(key).map_err(|_| ValidationError::InvalidPixKey),
        PixKeyKind::Cnpj => return validate_cnpj(key).map_err(|_| ValidationError::InvalidPixKey),
        PixKeyKind::Email => looks_like_an_email(key),
        PixKeyKind::Phone => looks_like_a_brazilian_phone(key),
        PixKeyKind::Random => Uuid::parse_str(key).is_ok(),
    };
    if ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidPixKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_well_formed_email_key() {
        assert!(validate_pix_key(PixKeyKind::Email, "alice@example.com").is_ok());
        assert!(validate_pix_key(PixKeyKind::Email, "not-an-email").is_err());
    }

    #[test]
    fn accepts_brazilian_phone_numbers() {
        assert!(validate_pix_key(PixKeyKind::Phone, "+5511987654321").is_ok());
        assert!(validate_pix_key(PixKeyKind::Phone, "11987654321").is_err());
    }

    #[test]
    fn random_key_must_be_a_uuid() {
        let id = Uuid::new_v4().to_string();
        assert!(validate_pix_key(PixKeyKind::Random, &id).is_ok());
        assert!(validate_pix_key(PixKeyKind::Random, "not-a-uuid").is_err());
    }
}
