//! Transaction domain model
//!
//! Transactions are produced and owned by the upstream transaction API.
//! The core only ever reads them; it never creates, updates, or deletes one.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Whether a transaction adds to or subtracts from the balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionKind {
    Credit,
    Debit,
}

/// Deserialize a kind that can be the upstream integer encoding or a name.
/// The upstream API encodes Credit as 1 and Debit as 2.
impl<'de> Deserialize<'de> for TransactionKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;
        let value: JsonValue = Deserialize::deserialize(deserializer)?;
        match value {
            JsonValue::Number(n) => match n.as_i64() {
                Some(1) => Ok(TransactionKind::Credit),
                Some(2) => Ok(TransactionKind::Debit),
                _ => Err(D::Error::custom(format!("unknown transaction kind: {}", n))),
            },
            JsonValue::String(s) => match s.to_lowercase().as_str() {
                "credit" => Ok(TransactionKind::Credit),
                "debit" => Ok(TransactionKind::Debit),
                _ => Err(D::Error::custom(format!("unknown transaction kind: {}", s))),
            },
            _ => Err(D::Error::custom("expected number or string for kind")),
        }
    }
}

/// A single credit/debit movement as reported by the transaction API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// Always positive; the kind determines the sign of its contribution
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub transaction_date: DateTime<Utc>,
    pub description: Option<String>,
    pub origin: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Upstream message identifier, when the transaction arrived via queue
    pub message_id: Option<String>,
}

impl Transaction {
    pub fn new(
        id: i64,
        amount: Decimal,
        kind: TransactionKind,
        transaction_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            amount,
            kind,
            transaction_date,
            description: None,
            origin: None,
            created_at: Utc::now(),
            message_id: None,
        }
    }
}

/// Deserialize an amount that can be number or string
pub(crate) fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    match value {
        JsonValue::Number(n) => {
            let s = n.to_string();
            s.parse::<Decimal>()
                .map_err(|e| D::Error::custom(format!("invalid decimal: {}", e)))
        }
        JsonValue::String(s) => s
            .parse::<Decimal>()
            .map_err(|e| D::Error::custom(format!("invalid decimal: {}", e))),
        _ => Err(D::Error::custom("expected number or string for amount")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_integer_encoding() {
        let credit: TransactionKind = serde_json::from_str("1").unwrap();
        assert_eq!(credit, TransactionKind::Credit);

        let debit: TransactionKind = serde_json::from_str("2").unwrap();
        assert_eq!(debit, TransactionKind::Debit);

        let unknown = serde_json::from_str::<TransactionKind>("7");
        assert!(unknown.is_err());
    }

    #[test]
    fn test_kind_from_name() {
        let credit: TransactionKind = serde_json::from_str("\"Credit\"").unwrap();
        assert_eq!(credit, TransactionKind::Credit);

        let debit: TransactionKind = serde_json::from_str("\"debit\"").unwrap();
        assert_eq!(debit, TransactionKind::Debit);
    }

    #[test]
    fn test_amount_from_number_or_string() {
        let tx: Transaction = serde_json::from_value(serde_json::json!({
            "id": 1,
            "amount": "100.50",
            "kind": 1,
            "transaction_date": "2024-01-15T10:30:00Z",
            "created_at": "2024-01-15T10:30:00Z",
            "description": null,
            "origin": null,
            "message_id": null,
        }))
        .unwrap();
        assert_eq!(tx.amount, Decimal::new(10050, 2));

        let tx: Transaction = serde_json::from_value(serde_json::json!({
            "id": 2,
            "amount": 42.25,
            "kind": 2,
            "transaction_date": "2024-01-15T10:30:00Z",
            "created_at": "2024-01-15T10:30:00Z",
            "description": "weekly supplies",
            "origin": "erp",
            "message_id": "msg-7",
        }))
        .unwrap();
        assert_eq!(tx.amount, Decimal::new(4225, 2));
        assert_eq!(tx.kind, TransactionKind::Debit);
    }
}
