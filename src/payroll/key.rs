use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::model::payroll::{PaySystem, PaymentMethod};
use crate::payroll::date_cursor::IsoDate;

/// Collapses non-finite and zero amounts to `0` so that `50`, `50.0` and
/// `"50"` all render as `50`.
pub fn normalize_amount(amount: f64) -> f64 {
    if amount.is_finite() && amount != 0.0 {
        amount
    } else {
        0.0
    }
}

/// Numeric coercion for loosely typed payloads: numbers pass through,
/// numeric strings are parsed, everything else is `0`.
pub fn coerce_amount(value: &Value) -> f64 {
    let raw = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    normalize_amount(raw)
}

/// serde adapter for [`coerce_amount`].
pub fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_amount(&value))
}

/// Natural key of one payroll obligation. Any change to the inputs,
/// including a corrected amount, produces a different key.
pub fn payroll_invoice_key(
    employee_id: u64,
    date: IsoDate,
    pay_system: PaySystem,
    amount: f64,
    payment_method: PaymentMethod,
) -> String {
    format!(
        "payroll|emp:{employee_id}|date:{date}|sys:{pay_system}|amt:{}|pm:{payment_method}",
        normalize_amount(amount)
    )
}
