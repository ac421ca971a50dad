use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::model::payroll::{PaySystem, PaymentMethod};
use crate::payroll::date_cursor::IsoDate;

/// Finance store key holding generated invoices.
pub const AUTO_INVOICES: &str = "autoInvoices";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Approved,
}

/// One generated payroll obligation. Immutable apart from approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayrollInvoice {
    pub id: String,
    #[schema(example = "payroll|emp:1|date:2024-01-01|sys:monthly|amt:1000|pm:cash")]
    pub payroll_key: String,
    pub status: InvoiceStatus,
    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub date: IsoDate,
    pub amount: f64,
    pub employee_id: u64,
    pub pay_system: PaySystem,
    pub payment_method: PaymentMethod,
    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub start_date: IsoDate,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub approved_at: Option<DateTime<Utc>>,
}

/// An entry of the `autoInvoices` list. Payroll invoices are typed; any
/// other shape (manual entries, older records) is kept verbatim.
///
/// A payroll invoice read back from the store keeps its stored JSON in
/// `raw` and is written back from it, so fields this crate does not model
/// and the exact number representation survive a rewrite of the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEntry {
    Payroll {
        invoice: PayrollInvoice,
        raw: Option<Value>,
    },
    Other(Value),
}

impl From<PayrollInvoice> for LedgerEntry {
    fn from(invoice: PayrollInvoice) -> Self {
        LedgerEntry::Payroll { invoice, raw: None }
    }
}

impl Serialize for LedgerEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LedgerEntry::Payroll { raw: Some(raw), .. } | LedgerEntry::Other(raw) => {
                raw.serialize(serializer)
            }
            LedgerEntry::Payroll { invoice, raw: None } => invoice.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for LedgerEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match PayrollInvoice::deserialize(&value) {
            Ok(invoice) => LedgerEntry::Payroll {
                invoice,
                raw: Some(value),
            },
            Err(_) => LedgerEntry::Other(value),
        })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl LedgerEntry {
    pub fn id(&self) -> Option<String> {
        match self {
            LedgerEntry::Payroll { invoice, .. } => Some(invoice.id.clone()),
            LedgerEntry::Other(value) => value.get("id").and_then(scalar_to_string),
        }
    }

    /// The key used for payroll dedup: `payrollKey`, else `id`.
    pub fn dedup_key(&self) -> Option<String> {
        match self {
            LedgerEntry::Payroll { invoice, .. } => Some(invoice.payroll_key.clone()),
            LedgerEntry::Other(value) => value
                .get("payrollKey")
                .and_then(scalar_to_string)
                .or_else(|| value.get("id").and_then(scalar_to_string)),
        }
    }

    /// Due date as stored, or empty when the entry has none.
    pub fn date_text(&self) -> String {
        match self {
            LedgerEntry::Payroll { invoice, .. } => invoice.date.to_string(),
            LedgerEntry::Other(value) => value
                .get("date")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }

    pub fn as_payroll(&self) -> Option<&PayrollInvoice> {
        match self {
            LedgerEntry::Payroll { invoice, .. } => Some(invoice),
            LedgerEntry::Other(_) => None,
        }
    }

    /// Marks a pending payroll invoice approved. Only `status` and
    /// `approvedAt` change in the stored JSON.
    pub fn mark_approved(&mut self, now: DateTime<Utc>) -> bool {
        let LedgerEntry::Payroll { invoice, raw } = self else {
            return false;
        };
        if invoice.status == InvoiceStatus::Approved {
            return false;
        }
        invoice.status = InvoiceStatus::Approved;
        invoice.approved_at = Some(now);

        if let Some(fields) = raw.as_mut().and_then(Value::as_object_mut) {
            fields.insert("status".into(), Value::String(InvoiceStatus::Approved.to_string()));
            fields.insert(
                "approvedAt".into(),
                Value::String(now.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            );
        }
        true
    }
}

/// Parse the stored `autoInvoices` blob. A missing or null blob is an empty
/// ledger; anything but an array is rejected.
pub fn parse_ledger(blob: Option<&Value>) -> anyhow::Result<Vec<LedgerEntry>> {
    match blob {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value @ Value::Array(_)) => Ok(serde_json::from_value(value.clone())?),
        Some(_) => anyhow::bail!("finance key `{AUTO_INVOICES}` must hold a JSON array"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payroll_json() -> Value {
        json!({
            "id": "pay-1",
            "payrollKey": "payroll|emp:1|date:2024-01-01|sys:monthly|amt:1000|pm:cash",
            "status": "pending",
            "date": "2024-01-01",
            "amount": 1000.0,
            "employeeId": 1,
            "paySystem": "monthly",
            "paymentMethod": "cash",
            "startDate": "2024-01-01",
            "details": "Payroll"
        })
    }

    #[test]
    fn mixed_ledger_parses_and_round_trips() {
        let manual = json!({"id": 77, "title": "Fiber splice", "amount": 40, "date": "2024-02-10"});
        let blob = json!([payroll_json(), manual.clone()]);

        let ledger = parse_ledger(Some(&blob)).unwrap();
        assert!(matches!(ledger[0], LedgerEntry::Payroll { .. }));
        assert_eq!(ledger[1], LedgerEntry::Other(manual));
        assert_eq!(serde_json::to_value(&ledger).unwrap(), blob);
    }

    #[test]
    fn stored_payroll_entry_keeps_unmodelled_fields() {
        let mut stored = payroll_json();
        stored["amount"] = json!(1000);
        stored["employeeName"] = json!("Sami");
        stored["createdAt"] = json!("2023-12-01T08:00:00Z");

        let mut ledger = parse_ledger(Some(&json!([stored.clone()]))).unwrap();
        assert_eq!(ledger[0].as_payroll().map(|i| i.amount), Some(1000.0));
        assert_eq!(serde_json::to_value(&ledger[0]).unwrap(), stored);

        let now = "2024-02-02T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert!(ledger[0].mark_approved(now));
        assert!(!ledger[0].mark_approved(now));

        let written = serde_json::to_value(&ledger[0]).unwrap();
        assert_eq!(written["status"], "approved");
        assert_eq!(written["approvedAt"], "2024-02-02T09:00:00Z");
        assert_eq!(written["employeeName"], "Sami");
        assert_eq!(written["amount"], json!(1000));
        let reread: LedgerEntry = serde_json::from_value(written).unwrap();
        assert_eq!(reread.as_payroll().and_then(|i| i.approved_at), Some(now));
    }

    #[test]
    fn dedup_key_falls_back_to_id() {
        let legacy = LedgerEntry::Other(json!({"id": "payroll|emp:9|date:2023-05-01|sys:daily|amt:5|pm:cash"}));
        assert_eq!(
            legacy.dedup_key().as_deref(),
            Some("payroll|emp:9|date:2023-05-01|sys:daily|amt:5|pm:cash")
        );

        let keyed = LedgerEntry::Other(json!({"id": 3, "payrollKey": "k"}));
        assert_eq!(keyed.dedup_key().as_deref(), Some("k"));
        assert_eq!(keyed.id().as_deref(), Some("3"));

        assert_eq!(LedgerEntry::Other(json!({"title": "x"})).dedup_key(), None);
    }

    #[test]
    fn non_array_blob_is_rejected() {
        assert!(parse_ledger(None).unwrap().is_empty());
        assert!(parse_ledger(Some(&Value::Null)).unwrap().is_empty());
        assert!(parse_ledger(Some(&json!({"a": 1}))).is_err());
    }
}
