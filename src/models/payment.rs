use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{validate_amount, BalanceBreakdown, DomainError};
use crate::models::validation::{validate_optional_text, validate_required_text};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentPayment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub payment_amount: f64,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePayment {
    pub payment_amount: f64,
    /// Defaults to today
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl CreatePayment {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_amount(self.payment_amount, "Payment amount")?;
        validate_optional_text(self.notes.as_deref(), "Notes", 500)
    }
}

/// Extra fee added on top of the package price (uniform, tournament, ...)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentCharge {
    pub id: Uuid,
    pub student_id: Uuid,
    pub amount: f64,
    pub charge_type: String,
    pub charge_date: NaiveDate,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCharge {
    pub amount: f64,
    pub charge_type: String,
    pub charge_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl CreateCharge {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_amount(self.amount, "Charge amount")?;
        validate_required_text(&self.charge_type, "Charge type", 60)?;
        validate_optional_text(self.description.as_deref(), "Description", 500)
    }
}

/// Payment page: every money movement plus the resulting balance
#[derive(Debug, Clone, Serialize)]
pub struct StudentLedger {
    pub student_id: Uuid,
    pub balance: BalanceBreakdown,
    pub payments: Vec<StudentPayment>,
    pub charges: Vec<StudentCharge>,
}

impl StudentLedger {
    pub fn new(
        student_id: Uuid,
        total_training_fee: f64,
        downpayment: f64,
        payments: Vec<StudentPayment>,
        charges: Vec<StudentCharge>,
    ) -> Self {
        let balance = BalanceBreakdown::compute(
            total_training_fee,
            downpayment,
            payments.iter().map(|p| p.payment_amount),
            charges.iter().map(|c| c.amount),
        );

        Self {
            student_id,
            balance,
            payments,
            charges,
        }
    }
}
