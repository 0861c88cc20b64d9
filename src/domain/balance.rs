use serde::Serialize;

use super::DomainError;

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Every term that goes into a student's remaining balance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceBreakdown {
    pub total_training_fee: f64,
    pub downpayment: f64,
    pub total_payments: f64,
    pub total_charges: f64,
    pub remaining_balance: f64,
    /// Nothing left to pay; a negative balance is a credit.
    pub is_settled: bool,
}

impl BalanceBreakdown {
    pub fn compute<P, C>(total_training_fee: f64, downpayment: f64, payments: P, charges: C) -> Self
    where
        P: IntoIterator<Item = f64>,
        C: IntoIterator<Item = f64>,
    {
        let total_payments = round_cents(payments.into_iter().sum());
        let total_charges = round_cents(charges.into_iter().sum());
        let remaining_balance = remaining_balance(
            total_training_fee,
            downpayment,
            total_payments,
            total_charges,
        );

        Self {
            total_training_fee: round_cents(total_training_fee),
            downpayment: round_cents(downpayment),
            total_payments,
            total_charges,
            remaining_balance,
            is_settled: remaining_balance <= 0.0,
        }
    }
}

/// total fee - downpayment - payments + extra charges
pub fn remaining_balance(
    total_training_fee: f64,
    downpayment: f64,
    total_payments: f64,
    total_charges: f64,
) -> f64 {
    round_cents(total_training_fee - downpayment - total_payments + total_charges)
}

pub fn validate_fee_terms(total_training_fee: f64, downpayment: f64) -> Result<(), DomainError> {
    if !total_training_fee.is_finite() || total_training_fee < 0.0 {
        return Err(DomainError::validation("Total training fee must be a non-negative amount"));
    }
    if !downpayment.is_finite() || downpayment < 0.0 {
        return Err(DomainError::validation("Downpayment must be a non-negative amount"));
    }
    if downpayment > total_training_fee {
        return Err(DomainError::validation("Downpayment cannot exceed the total training fee"));
    }
    Ok(())
}

/// Payments and charges must move a positive amount of money
pub fn validate_amount(amount: f64, field_name: &str) -> Result<(), DomainError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(DomainError::validation(format!(
            "{} must be greater than zero",
            field_name
        )));
    }
    Ok(())
}
