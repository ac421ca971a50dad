use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::payroll::PayrollConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Karim Hasan",
        "phone": "+8801712345678",
        "position": "Field technician",
        "payroll": {
            "enabled": true,
            "amount": 1000.0,
            "paymentMethod": "cash",
            "paySystem": "monthly",
            "startDate": "2024-01-01"
        }
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Karim Hasan")]
    pub name: String,

    #[schema(example = "+8801712345678", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = "Field technician", nullable = true)]
    pub position: Option<String>,

    #[serde(default)]
    pub payroll: PayrollConfig,
}

/// Validated input for a new employee.
#[derive(Debug, Clone)]
pub struct EmployeeDraft {
    pub name: String,
    pub phone: Option<String>,
    pub position: Option<String>,
}

/// Validated partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct EmployeePatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
}
