//! Entity shapes from spec.md §3, stored as `NOT NULL DEFAULT 0` columns
//! wherever the value is business-critical and numeric (balance, limits,
//! spent counters) so the engine never needs defaulting logic at read
//! time (spec.md §9 "Nullable DB columns").
//!
//! Enum columns are plain `TEXT` with a `CHECK` constraint in the
//! migration rather than a native Postgres enum type, so the same
//! queries work against the `sqlite`/`any` driver used in tests
//! (grounded on `util/rich-indexer`'s dual sqlite/postgres test
//! harness). Rows are mapped by hand in `queries.rs` rather than via
//! `#[derive(FromRow)]`, since the enum and UUID columns need an explicit
//! parse step the derive can't express against the `Any` backend.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(concat!(stringify!($name), " has no variant {:?}"), other)),
                }
            }
        }
    };
}

string_enum!(UserStatus { Active => "active", Frozen => "frozen" });

string_enum!(TransferType {
    Pix => "pix",
    Ted => "ted",
    P2p => "p2p",
    Deposit => "deposit",
    Bill => "bill",
});

string_enum!(TransferStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

string_enum!(CardType { Physical => "physical", Virtual => "virtual" });

string_enum!(CardBrand {
    Visa => "visa",
    Mastercard => "mastercard",
    Elo => "elo",
});

string_enum!(CardStatus {
    Active => "active",
    Blocked => "blocked",
    Cancelled => "cancelled",
});

string_enum!(PixKeyType {
    Cpf => "cpf",
    Cnpj => "cnpj",
    Email => "email",
    Phone => "phone",
    Random => "random",
});

string_enum!(BankAccountType { Checking => "checking", Savings => "savings" });

string_enum!(BillStatus {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
});

string_enum!(BudgetPeriod {
    Weekly => "weekly",
    Monthly => "monthly",
    Annual => "annual",
});

string_enum!(AuditStatus { Success => "success", Failure => "failure" });

string_enum!(TicketStatus {
    Open => "open",
    InProgress => "in_progress",
    Waiting => "waiting",
    Resolved => "resolved",
    Closed => "closed",
});

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub balance_cents: i64,
    pub daily_transfer_limit_cents: i64,
    pub monthly_transfer_limit_cents: i64,
    pub status: UserStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct Transfer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub transfer_type: TransferType,
    pub status: TransferStatus,
    pub amount_cents: i64,
    pub fee_cents: i64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub pix_key: Option<String>,
    pub pix_key_type: Option<PixKeyType>,
    pub recipient_name: Option<String>,
    pub recipient_document: Option<String>,
    pub recipient_bank: Option<String>,
    pub recipient_branch: Option<String>,
    pub recipient_account: Option<String>,
    pub recipient_account_type: Option<BankAccountType>,
    pub recipient_user_id: Option<Uuid>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Card {
    pub id: Uuid,
    pub user_id: Uuid,
    pub card_type: CardType,
    pub brand: CardBrand,
    pub status: CardStatus,
    pub card_number_ct: Vec<u8>,
    pub cvv_ct: Vec<u8>,
    pub pin_hash: Option<String>,
    pub last_four: String,
    pub holder_name: String,
    pub expiry_month: i32,
    pub expiry_year: i32,
    pub daily_limit_cents: i64,
    pub monthly_limit_cents: i64,
    pub is_contactless: bool,
    pub is_international: bool,
    pub block_international: bool,
    pub block_online: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub blocked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardTransaction {
    pub id: Uuid,
    pub card_id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub merchant_name: String,
    pub merchant_category: String,
    pub status: String,
    pub transaction_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Bill {
    pub id: Uuid,
    pub user_id: Uuid,
    pub barcode: String,
    pub amount_cents: i64,
    pub fee_cents: i64,
    pub final_amount_cents: i64,
    pub status: BillStatus,
    pub recipient_name: String,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub period: BudgetPeriod,
    pub limit_cents: i64,
    pub current_spent_cents: i64,
    pub alert_threshold_pct: i32,
    pub alerts_enabled: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub old_values: serde_json::Value,
    pub new_values: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: String,
    pub status: AuditStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn enum_round_trips_through_its_wire_string() {
        assert_eq!(UserStatus::from_str("frozen").unwrap(), UserStatus::Frozen);
        assert_eq!(TransferStatus::Completed.as_str(), "completed");
        assert!(CardBrand::from_str("bogus").is_err());
    }
}
