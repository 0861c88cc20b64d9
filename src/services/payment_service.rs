use anyhow::Result;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::round_cents;
use crate::models::{
    normalize_optional, CreateCharge, CreatePayment, StudentCharge, StudentLedger, StudentPayment,
};
use crate::services::student_service::{lock_student, refresh_balance};

const PAYMENT_COLUMNS: &str = "id, student_id, payment_amount, payment_date, notes, created_at";
const CHARGE_COLUMNS: &str =
    "id, student_id, amount, charge_type, charge_date, description, created_at";

/// Payments and extra charges. Every write refreshes the student's stored
/// balance before its transaction commits.
#[derive(Clone)]
pub struct PaymentService {
    db: PgPool,
}

impl PaymentService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// `Ok(None)` when the student does not exist
    pub async fn record_payment(
        &self,
        student_id: Uuid,
        data: CreatePayment,
    ) -> Result<Option<StudentPayment>> {
        data.validate()?;

        let mut tx = self.db.begin().await?;
        if lock_student(&mut tx, student_id).await?.is_none() {
            return Ok(None);
        }

        let payment = sqlx::query_as::<_, StudentPayment>(&format!(
            "INSERT INTO student_payments (id, student_id, payment_amount, payment_date, notes, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(round_cents(data.payment_amount))
        .bind(data.payment_date.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(normalize_optional(data.notes))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        refresh_balance(&mut tx, student_id).await?;
        tx.commit().await?;

        tracing::info!(%student_id, payment_id = %payment.id, amount = payment.payment_amount, "payment recorded");
        Ok(Some(payment))
    }

    pub async fn list_payments(&self, student_id: Uuid) -> Result<Vec<StudentPayment>> {
        let payments = sqlx::query_as::<_, StudentPayment>(&format!(
            "SELECT {} FROM student_payments
             WHERE student_id = $1
             ORDER BY payment_date DESC, created_at DESC",
            PAYMENT_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.db)
        .await?;

        Ok(payments)
    }

    pub async fn delete_payment(&self, payment_id: Uuid) -> Result<bool> {
        let mut tx = self.db.begin().await?;
        let Some(student_id) = owning_student(&mut tx, "student_payments", payment_id).await? else {
            return Ok(false);
        };

        let deleted = sqlx::query("DELETE FROM student_payments WHERE id = $1 AND student_id = $2")
            .bind(payment_id)
            .bind(student_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        refresh_balance(&mut tx, student_id).await?;
        tx.commit().await?;

        tracing::info!(%student_id, %payment_id, "payment deleted");
        Ok(true)
    }

    /// `Ok(None)` when the student does not exist
    pub async fn add_charge(&self, student_id: Uuid, data: CreateCharge) -> Result<Option<StudentCharge>> {
        data.validate()?;

        let mut tx = self.db.begin().await?;
        if lock_student(&mut tx, student_id).await?.is_none() {
            return Ok(None);
        }

        let charge = sqlx::query_as::<_, StudentCharge>(&format!(
            "INSERT INTO student_charges (id, student_id, amount, charge_type, charge_date, description, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            CHARGE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(round_cents(data.amount))
        .bind(data.charge_type.trim())
        .bind(data.charge_date.unwrap_or_else(|| Utc::now().date_naive()))
        .bind(normalize_optional(data.description))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        refresh_balance(&mut tx, student_id).await?;
        tx.commit().await?;

        tracing::info!(%student_id, charge_id = %charge.id, amount = charge.amount, "charge added");
        Ok(Some(charge))
    }

    pub async fn list_charges(&self, student_id: Uuid) -> Result<Vec<StudentCharge>> {
        let charges = sqlx::query_as::<_, StudentCharge>(&format!(
            "SELECT {} FROM student_charges
             WHERE student_id = $1
             ORDER BY charge_date DESC, created_at DESC",
            CHARGE_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.db)
        .await?;

        Ok(charges)
    }

    pub async fn delete_charge(&self, charge_id: Uuid) -> Result<bool> {
        let mut tx = self.db.begin().await?;
        let Some(student_id) = owning_student(&mut tx, "student_charges", charge_id).await? else {
            return Ok(false);
        };

        let deleted = sqlx::query("DELETE FROM student_charges WHERE id = $1 AND student_id = $2")
            .bind(charge_id)
            .bind(student_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        refresh_balance(&mut tx, student_id).await?;
        tx.commit().await?;

        tracing::info!(%student_id, %charge_id, "charge deleted");
        Ok(true)
    }

    pub async fn ledger(&self, student_id: Uuid) -> Result<Option<StudentLedger>> {
        let terms = sqlx::query_as::<_, (f64, f64)>(
            "SELECT total_training_fee, downpayment FROM students WHERE id = $1",
        )
        .bind(student_id)
        .fetch_optional(&self.db)
        .await?;

        let Some((total_training_fee, downpayment)) = terms else {
            return Ok(None);
        };

        let payments = self.list_payments(student_id).await?;
        let charges = self.list_charges(student_id).await?;

        Ok(Some(StudentLedger::new(
            student_id,
            total_training_fee,
            downpayment,
            payments,
            charges,
        )))
    }
}

/// Student a payment or charge belongs to, with that student's row locked so
/// the delete and the balance refresh run after any in-flight money write.
async fn owning_student(conn: &mut PgConnection, table: &str, row_id: Uuid) -> Result<Option<Uuid>> {
    let student_id = sqlx::query_scalar::<_, Uuid>(&format!("SELECT student_id FROM {} WHERE id = $1", table))
        .bind(row_id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(student_id) = student_id else {
        return Ok(None);
    };
    Ok(lock_student(conn, student_id).await?.map(|student| student.id))
}
