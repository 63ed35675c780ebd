//! Pure, deterministic validators (spec.md §4.4). No state, no I/O —
//! every function here is safe to call from any component without a
//! transaction in scope.

mod barcode;
mod card;
mod document;
mod luhn;
mod pin;
mod pix;
mod transitions;

pub use barcode::validate_barcode;
pub use card::{
    card_type_from_str, check_expiry, generate_card_number, validate_brand_str, validate_cvv, Brand, CardType,
};
pub use document::{validate_cnpj, validate_cpf};
pub use luhn::passes_luhn;
pub use pin::{validate_pin_format, weak_pin};
pub use pix::{validate_pix_key, PixKeyKind};
pub use transitions::{card_transition_allowed, ticket_transition_allowed, transfer_transition_allowed};

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("amount must be a positive number of cents")]
    InvalidAmount,
    #[error("unsupported card brand {0:?}")]
    UnsupportedBrand(String),
    #[error("card number fails the Luhn check")]
    InvalidCardNumber,
    #[error("CVV must be 3 or 4 decimal digits")]
    InvalidCvv,
    #[error("PIN must be 4 to 6 decimal digits")]
    InvalidPinFormat,
    #[error("PIN is too easily guessed")]
    WeakPin,
    #[error("expiry month/year is invalid or already past")]
    InvalidExpiry,
    #[error("value is not a valid CPF")]
    InvalidCpf,
    #[error("value is not a valid CNPJ")]
    InvalidCnpj,
    #[error("PIX key does not match its declared type")]
    InvalidPixKey,
    #[error("barcode is malformed or fails its check digit")]
    InvalidBarcode,
    #[error("{entity} cannot transition from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },
}

impl From<ValidationError> for fincore_error::Error {
    fn from(e: ValidationError) -> Self {
        let code = match &e {
            ValidationError::InvalidAmount => "VAL_001",
            ValidationError::UnsupportedBrand(_) => "VAL_002",
            ValidationError::InvalidCardNumber => "VAL_003",
            ValidationError::InvalidCvv => "VAL_004",
            ValidationError::InvalidPinFormat | ValidationError::WeakPin => "VAL_005",
            ValidationError::InvalidExpiry => "VAL_006",
            ValidationError::InvalidCpf | ValidationError::InvalidCnpj => "VAL_007",
            ValidationError::InvalidPixKey => "VAL_008",
            ValidationError::InvalidBarcode => "VAL_010",
            ValidationError::InvalidTransition { .. } => "BUS_101",
        };
        let message: &'static str = match &e {
            ValidationError::InvalidAmount => "amount is invalid",
            ValidationError::UnsupportedBrand(_) => "card brand is not supported",
            ValidationError::InvalidCardNumber => "card number is invalid",
            ValidationError::InvalidCvv => "CVV is invalid",
            ValidationError::InvalidPinFormat => "PIN format is invalid",
            ValidationError::WeakPin => "PIN is too weak",
            ValidationError::InvalidExpiry => "expiry is invalid",
            ValidationError::InvalidCpf => "CPF is invalid",
            ValidationError::InvalidCnpj => "CNPJ is invalid",
            ValidationError::InvalidPixKey => "PIX key is invalid",
            ValidationError::InvalidBarcode => "barcode is invalid",
            ValidationError::InvalidTransition { .. } => "status transition is not allowed",
        };
        if matches!(e, ValidationError::InvalidTransition { .. }) {
            fincore_error::Error::invalid_status_transition().with_detail(e.to_string())
        } else {
            fincore_error::Error::validation(code, message).with_detail(e.to_string())
        }
    }
}
