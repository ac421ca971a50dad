use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::payroll::date_cursor::IsoDate;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaySystem {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Bank,
    Deferred,
}

/// Recurring payroll settings embedded in each employee record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PayrollConfig {
    pub enabled: bool,
    #[schema(example = 1000.0)]
    pub amount: f64,
    pub payment_method: PaymentMethod,
    pub pay_system: PaySystem,
    /// First due date.
    #[schema(example = "2024-01-01", value_type = Option<String>, format = "date")]
    pub start_date: Option<IsoDate>,

    // bookkeeping, written on save and ignored by the resolver
    #[schema(value_type = Option<String>, format = "date")]
    pub next_run_date: Option<IsoDate>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_run_at: Option<DateTime<Utc>>,
    pub note: String,
    pub run_seed: String,
}

impl PayrollConfig {
    /// Payroll produces invoices only when enabled with a positive amount
    /// and a start date.
    pub fn is_active(&self) -> bool {
        self.enabled && self.amount > 0.0 && self.start_date.is_some()
    }
}
