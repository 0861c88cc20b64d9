use anyhow::Result;
use chrono::{NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::{
    consumed_sessions, matches_search, remaining_sessions, round_cents, validate_fee_terms,
    AttendanceStatus, AttendanceTally, BalanceBreakdown, DatedAttendance, DomainError, Page,
};
use crate::models::{
    normalize_optional, normalize_patch, renewal_snapshot, CreateStudent, Package, RenewPackage,
    Student, StudentAttendanceEntry, StudentPackageHistory, StudentQuery, StudentSummary,
    UpdateStudent,
};

pub(crate) const STUDENT_COLUMNS: &str = "id, name, email, phone, branch_id, package_type, sessions, \
     remaining_sessions, enrollment_date, expiration_date, total_training_fee, downpayment, \
     remaining_balance, created_at, updated_at";

const HISTORY_COLUMNS: &str = "id, student_id, package_type, sessions, remaining_sessions, \
     enrollment_date, expiration_date, total_training_fee, downpayment, remaining_balance, archived_at";

const RECENT_ATTENDANCE_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct StudentService {
    db: PgPool,
}

impl StudentService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_student(&self, data: CreateStudent) -> Result<Student> {
        data.validate()?;

        let package = match data.package_id {
            Some(package_id) => Some(find_package(&self.db, package_id).await?),
            None => None,
        };
        if let Some(branch_id) = data.branch_id {
            ensure_branch(&self.db, branch_id).await?;
        }

        let package_type = normalize_optional(data.package_type)
            .or_else(|| package.as_ref().map(|p| p.name.clone()));
        let sessions = data
            .sessions
            .or_else(|| package.as_ref().map(|p| p.default_sessions))
            .unwrap_or(0);
        let total_training_fee = data
            .total_training_fee
            .or_else(|| package.as_ref().and_then(|p| p.price))
            .unwrap_or(0.0);
        let downpayment = data.downpayment.unwrap_or(0.0);
        validate_fee_terms(total_training_fee, downpayment)?;

        let now = Utc::now();
        let student = sqlx::query_as::<_, Student>(&format!(
            "INSERT INTO students (id, name, email, phone, branch_id, package_type, sessions,
                                   remaining_sessions, enrollment_date, expiration_date,
                                   total_training_fee, downpayment, remaining_balance,
                                   created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8, $9, $10, $11, $12, $13, $13)
             RETURNING {}",
            STUDENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(data.name.trim())
        .bind(normalize_optional(data.email).map(|e| e.to_lowercase()))
        .bind(normalize_optional(data.phone))
        .bind(data.branch_id)
        .bind(package_type)
        .bind(sessions)
        .bind(data.enrollment_date)
        .bind(data.expiration_date)
        .bind(round_cents(total_training_fee))
        .bind(round_cents(downpayment))
        .bind(round_cents(total_training_fee - downpayment))
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(student_id = %student.id, sessions, "student enrolled");
        Ok(student)
    }

    pub async fn get_student(&self, student_id: Uuid) -> Result<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {} FROM students WHERE id = $1",
            STUDENT_COLUMNS
        ))
        .bind(student_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(student)
    }

    pub async fn list_students(&self, query: &StudentQuery) -> Result<Page<Student>> {
        let students = sqlx::query_as::<_, Student>(&format!(
            "SELECT {} FROM students
             WHERE ($1::uuid IS NULL OR branch_id = $1)
             ORDER BY name ASC",
            STUDENT_COLUMNS
        ))
        .bind(query.branch_id)
        .fetch_all(&self.db)
        .await?;

        let list_query = query.list_query();
        let term = list_query.search_term();
        let matching = students
            .into_iter()
            .filter(|s| {
                matches_search(
                    [Some(s.name.as_str()), s.email.as_deref(), s.phone.as_deref()],
                    term,
                )
            })
            .collect();

        Ok(list_query.paginate(matching))
    }

    /// Partial update. Session count and balance are re-derived in the same transaction.
    pub async fn update_student(&self, student_id: Uuid, data: UpdateStudent) -> Result<Option<Student>> {
        data.validate()?;

        let mut tx = self.db.begin().await?;
        let Some(current) = lock_student(&mut tx, student_id).await? else {
            return Ok(None);
        };
        data.validate_against(&current)?;
        if let Some(Some(branch_id)) = data.branch_id {
            ensure_branch(&mut *tx, branch_id).await?;
        }
        let email = normalize_patch(data.email).map(|e| e.map(|e| e.to_lowercase()));
        let phone = normalize_patch(data.phone);

        // CASE WHEN pairs: a supplied flag, then the value (which may be NULL)
        sqlx::query(
            "UPDATE students
             SET name = COALESCE($2, name),
                 email = CASE WHEN $3 THEN $4 ELSE email END,
                 phone = CASE WHEN $5 THEN $6 ELSE phone END,
                 branch_id = CASE WHEN $7 THEN $8 ELSE branch_id END,
                 package_type = COALESCE($9, package_type),
                 sessions = COALESCE($10, sessions),
                 enrollment_date = CASE WHEN $11 THEN $12 ELSE enrollment_date END,
                 expiration_date = CASE WHEN $13 THEN $14 ELSE expiration_date END,
                 total_training_fee = COALESCE($15, total_training_fee),
                 downpayment = COALESCE($16, downpayment),
                 updated_at = $17
             WHERE id = $1",
        )
        .bind(student_id)
        .bind(data.name.map(|v| v.trim().to_string()))
        .bind(email.is_some())
        .bind(email.flatten())
        .bind(phone.is_some())
        .bind(phone.flatten())
        .bind(data.branch_id.is_some())
        .bind(data.branch_id.flatten())
        .bind(normalize_optional(data.package_type))
        .bind(data.sessions)
        .bind(data.enrollment_date.is_some())
        .bind(data.enrollment_date.flatten())
        .bind(data.expiration_date.is_some())
        .bind(data.expiration_date.flatten())
        .bind(data.total_training_fee.map(round_cents))
        .bind(data.downpayment.map(round_cents))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        refresh_remaining_sessions(&mut tx, student_id).await?;
        refresh_balance(&mut tx, student_id).await?;
        let student = fetch_student(&mut tx, student_id).await?;
        tx.commit().await?;

        Ok(student)
    }

    /// Payments, charges, attendance and history go with the student
    pub async fn delete_student(&self, student_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(student_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() > 0 {
            tracing::info!(%student_id, "student deleted");
        }
        Ok(result.rows_affected() > 0)
    }

    /// Recompute remaining sessions and remaining balance from their sources and store both.
    pub async fn reconcile(&self, student_id: Uuid) -> Result<Option<Student>> {
        let mut tx = self.db.begin().await?;
        if lock_student(&mut tx, student_id).await?.is_none() {
            return Ok(None);
        }

        let remaining = refresh_remaining_sessions(&mut tx, student_id).await?;
        let balance = refresh_balance(&mut tx, student_id).await?;
        let student = fetch_student(&mut tx, student_id).await?;
        tx.commit().await?;

        tracing::info!(
            %student_id,
            remaining_sessions = ?remaining,
            remaining_balance = ?balance.map(|b| b.remaining_balance),
            "student reconciled"
        );
        Ok(student)
    }

    /// Archive the current package and start a new one, all in one transaction.
    pub async fn renew_package(&self, student_id: Uuid, data: RenewPackage) -> Result<Option<Student>> {
        data.validate()?;

        let mut tx = self.db.begin().await?;
        let Some(current) = lock_student(&mut tx, student_id).await? else {
            return Ok(None);
        };

        let package = match data.package_id {
            Some(package_id) => Some(find_package(&mut *tx, package_id).await?),
            None => None,
        };
        let package_type = normalize_optional(data.package_type)
            .or_else(|| package.as_ref().map(|p| p.name.clone()));
        let sessions = data
            .sessions
            .or_else(|| package.as_ref().map(|p| p.default_sessions))
            .ok_or_else(|| DomainError::validation("Session count is required for a custom package"))?;
        let renewal_fee = data
            .renewal_fee
            .or_else(|| package.as_ref().and_then(|p| p.price))
            .unwrap_or(0.0);

        let snapshot = renewal_snapshot(&current, Utc::now());
        sqlx::query(
            "INSERT INTO student_package_history
                (id, student_id, package_type, sessions, remaining_sessions, enrollment_date,
                 expiration_date, total_training_fee, downpayment, remaining_balance, archived_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(snapshot.id)
        .bind(snapshot.student_id)
        .bind(&snapshot.package_type)
        .bind(snapshot.sessions)
        .bind(snapshot.remaining_sessions)
        .bind(snapshot.enrollment_date)
        .bind(snapshot.expiration_date)
        .bind(snapshot.total_training_fee)
        .bind(snapshot.downpayment)
        .bind(snapshot.remaining_balance)
        .bind(snapshot.archived_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE students
             SET package_type = $2,
                 sessions = $3,
                 remaining_sessions = $3,
                 enrollment_date = $4,
                 expiration_date = $5,
                 total_training_fee = total_training_fee + $6,
                 updated_at = $7
             WHERE id = $1",
        )
        .bind(student_id)
        .bind(package_type)
        .bind(sessions)
        .bind(data.enrollment_date)
        .bind(data.expiration_date)
        .bind(round_cents(renewal_fee))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        // attendance already inside the new window counts against it
        refresh_remaining_sessions(&mut tx, student_id).await?;
        refresh_balance(&mut tx, student_id).await?;
        let student = fetch_student(&mut tx, student_id).await?;
        tx.commit().await?;

        tracing::info!(%student_id, sessions, renewal_fee, "package renewed");
        Ok(student)
    }

    pub async fn package_history(&self, student_id: Uuid) -> Result<Vec<StudentPackageHistory>> {
        let history = sqlx::query_as::<_, StudentPackageHistory>(&format!(
            "SELECT {} FROM student_package_history
             WHERE student_id = $1
             ORDER BY archived_at DESC",
            HISTORY_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.db)
        .await?;

        Ok(history)
    }

    pub async fn summary(&self, student_id: Uuid, today: NaiveDate) -> Result<Option<StudentSummary>> {
        let Some(student) = self.get_student(student_id).await? else {
            return Ok(None);
        };

        let branch_name = match student.branch_id {
            Some(branch_id) => {
                sqlx::query_scalar::<_, String>("SELECT name FROM branches WHERE id = $1")
                    .bind(branch_id)
                    .fetch_optional(&self.db)
                    .await?
            }
            None => None,
        };

        let (total_payments, total_charges) = money_totals(&self.db, student_id).await?;
        let balance = BalanceBreakdown::compute(
            student.total_training_fee,
            student.downpayment,
            [total_payments],
            [total_charges],
        );

        let statuses = sqlx::query_scalar::<_, AttendanceStatus>(
            "SELECT status FROM attendance_records WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_all(&self.db)
        .await?;
        let attendance = AttendanceTally::from_statuses(statuses);

        let recent_attendance = sqlx::query_as::<_, StudentAttendanceEntry>(
            "SELECT ar.session_id, ts.date AS session_date, ar.status, ar.marked_at, ar.session_duration
             FROM attendance_records ar
             JOIN training_sessions ts ON ts.id = ar.session_id
             WHERE ar.student_id = $1
             ORDER BY ts.date DESC, ts.start_time DESC
             LIMIT $2",
        )
        .bind(student_id)
        .bind(RECENT_ATTENDANCE_LIMIT)
        .fetch_all(&self.db)
        .await?;

        let package_history = self.package_history(student_id).await?;

        Ok(Some(StudentSummary {
            package_status: student.package_status(today),
            student,
            branch_name,
            balance,
            attendance_rate: attendance.rate(),
            attendance,
            recent_attendance,
            package_history,
        }))
    }
}

async fn find_package<'e, E>(executor: E, package_id: Uuid) -> Result<Package>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Package>(
        "SELECT id, name, description, default_sessions, price, is_active, created_at, updated_at
         FROM packages WHERE id = $1",
    )
    .bind(package_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| DomainError::validation("Selected package does not exist").into())
}

async fn ensure_branch<'e, E>(executor: E, branch_id: Uuid) -> Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM branches WHERE id = $1)")
        .bind(branch_id)
        .fetch_one(executor)
        .await?;

    if !exists {
        return Err(DomainError::validation("Selected branch does not exist").into());
    }
    Ok(())
}

pub(crate) async fn lock_student(conn: &mut PgConnection, student_id: Uuid) -> Result<Option<Student>> {
    let student = sqlx::query_as::<_, Student>(&format!(
        "SELECT {} FROM students WHERE id = $1 FOR UPDATE",
        STUDENT_COLUMNS
    ))
    .bind(student_id)
    .fetch_optional(conn)
    .await?;

    Ok(student)
}

/// Row locks for several students, taken in id order so writers touching
/// overlapping sets queue up instead of deadlocking.
pub(crate) async fn lock_students(conn: &mut PgConnection, student_ids: &[Uuid]) -> Result<()> {
    if student_ids.is_empty() {
        return Ok(());
    }

    sqlx::query_scalar::<_, Uuid>("SELECT id FROM students WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(student_ids)
        .fetch_all(conn)
        .await?;

    Ok(())
}

async fn fetch_student(conn: &mut PgConnection, student_id: Uuid) -> Result<Option<Student>> {
    let student = sqlx::query_as::<_, Student>(&format!(
        "SELECT {} FROM students WHERE id = $1",
        STUDENT_COLUMNS
    ))
    .bind(student_id)
    .fetch_optional(conn)
    .await?;

    Ok(student)
}

async fn money_totals<'e, E>(executor: E, student_id: Uuid) -> Result<(f64, f64)>
where
    E: sqlx::PgExecutor<'e>,
{
    let totals = sqlx::query_as::<_, (f64, f64)>(
        "SELECT
            COALESCE((SELECT SUM(payment_amount) FROM student_payments WHERE student_id = $1), 0)::DOUBLE PRECISION,
            COALESCE((SELECT SUM(amount) FROM student_charges WHERE student_id = $1), 0)::DOUBLE PRECISION",
    )
    .bind(student_id)
    .fetch_one(executor)
    .await?;

    Ok(totals)
}

/// Recount the current package's sessions from attendance and store the result.
/// Holds the student row lock until the caller's transaction ends, so the count
/// always includes marks committed by earlier writers.
/// Returns `None` when the student does not exist.
pub(crate) async fn refresh_remaining_sessions(
    conn: &mut PgConnection,
    student_id: Uuid,
) -> Result<Option<i32>> {
    let Some(student) = lock_student(&mut *conn, student_id).await? else {
        return Ok(None);
    };

    let records: Vec<DatedAttendance> = sqlx::query_as::<_, (NaiveDate, AttendanceStatus)>(
        "SELECT ts.date, ar.status
         FROM attendance_records ar
         JOIN training_sessions ts ON ts.id = ar.session_id
         WHERE ar.student_id = $1",
    )
    .bind(student_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|(session_date, status)| DatedAttendance { session_date, status })
    .collect();

    let remaining = remaining_sessions(
        student.sessions,
        consumed_sessions(&records, &student.package_window()),
    );

    if remaining != student.remaining_sessions {
        sqlx::query("UPDATE students SET remaining_sessions = $2, updated_at = $3 WHERE id = $1")
            .bind(student_id)
            .bind(remaining)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;
        tracing::debug!(%student_id, remaining, "remaining sessions updated");
    }

    Ok(Some(remaining))
}

/// Recompute the balance from payments and charges and store it, under the
/// student row lock. Returns `None` when the student does not exist.
pub(crate) async fn refresh_balance(
    conn: &mut PgConnection,
    student_id: Uuid,
) -> Result<Option<BalanceBreakdown>> {
    let Some(student) = lock_student(&mut *conn, student_id).await? else {
        return Ok(None);
    };

    let (total_payments, total_charges) = money_totals(&mut *conn, student_id).await?;
    let balance = BalanceBreakdown::compute(
        student.total_training_fee,
        student.downpayment,
        [total_payments],
        [total_charges],
    );

    if balance.remaining_balance != student.remaining_balance {
        sqlx::query("UPDATE students SET remaining_balance = $2, updated_at = $3 WHERE id = $1")
            .bind(student_id)
            .bind(balance.remaining_balance)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;
        tracing::debug!(%student_id, remaining_balance = balance.remaining_balance, "balance updated");
    }

    Ok(Some(balance))
}
