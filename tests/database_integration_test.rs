// Service flows against a real Postgres. Each test skips when
// TEST_DATABASE_URL (or the default local test database) is unreachable.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use serial_test::serial;
use uuid::Uuid;

use hoop_academy::auth::{AuthError, AuthService, LoginRequest, UserRole};
use hoop_academy::domain::{AttendanceStatus, DomainError, ListQuery, PackageStatus};
use hoop_academy::models::*;
use hoop_academy::services::*;

use common::{MockData, TestDatabase, TEST_JWT_SECRET};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn domain_error(err: &anyhow::Error) -> Option<&DomainError> {
    err.downcast_ref::<DomainError>()
}

async fn session_on(
    sessions: &TrainingSessionService,
    branch_id: Uuid,
    day: NaiveDate,
    coach_ids: Vec<Uuid>,
    student_ids: Vec<Uuid>,
) -> SessionDetail {
    sessions
        .create_session(CreateTrainingSession {
            date: day,
            start_time: time(16, 0),
            end_time: time(18, 0),
            branch_id,
            package_type: None,
            notes: None,
            coach_ids,
            student_ids,
        })
        .await
        .unwrap()
}

fn mark(status: AttendanceStatus) -> MarkAttendance {
    MarkAttendance {
        status,
        session_duration: None,
    }
}

#[tokio::test]
#[serial]
async fn test_balance_follows_payments_and_charges() {
    let Some(db) = TestDatabase::connect().await else { return };
    let branches = BranchService::new(db.pool.clone());
    let students = StudentService::new(db.pool.clone());
    let payments = PaymentService::new(db.pool.clone());

    let branch = branches.create_branch(MockData::branch()).await.unwrap();
    let student = students.create_student(MockData::student(branch.id)).await.unwrap();
    assert_eq!(student.remaining_balance, 6_000.0);
    assert_eq!(student.remaining_sessions, 8);

    let payment = payments
        .record_payment(
            student.id,
            CreatePayment {
                payment_amount: 2_500.0,
                payment_date: Some(date(2024, 3, 1)),
                notes: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
    payments
        .add_charge(
            student.id,
            CreateCharge {
                amount: 450.5,
                charge_type: "uniform".to_string(),
                charge_date: None,
                description: Some("Home jersey".to_string()),
            },
        )
        .await
        .unwrap()
        .unwrap();

    let stored = students.get_student(student.id).await.unwrap().unwrap();
    assert_eq!(stored.remaining_balance, 3_950.5);

    let ledger = payments.ledger(student.id).await.unwrap().unwrap();
    assert_eq!(ledger.balance.total_payments, 2_500.0);
    assert_eq!(ledger.balance.total_charges, 450.5);
    assert_eq!(ledger.balance.remaining_balance, 3_950.5);
    assert!(!ledger.balance.is_settled);

    assert!(payments.delete_payment(payment.id).await.unwrap());
    let stored = students.get_student(student.id).await.unwrap().unwrap();
    assert_eq!(stored.remaining_balance, 6_450.5);

    let missing = payments
        .record_payment(
            Uuid::new_v4(),
            CreatePayment {
                payment_amount: 10.0,
                payment_date: None,
                notes: None,
            },
        )
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
#[serial]
async fn test_attendance_consumes_sessions_inside_window() {
    let Some(db) = TestDatabase::connect().await else { return };
    let branches = BranchService::new(db.pool.clone());
    let students = StudentService::new(db.pool.clone());
    let sessions = TrainingSessionService::new(db.pool.clone());
    let attendance = AttendanceService::new(db.pool.clone());

    let branch = branches.create_branch(MockData::branch()).await.unwrap();
    let student = students
        .create_student(CreateStudent {
            enrollment_date: Some(date(2024, 5, 1)),
            expiration_date: Some(date(2024, 5, 31)),
            ..MockData::student(branch.id)
        })
        .await
        .unwrap();
    let bystander = students.create_student(MockData::student(branch.id)).await.unwrap();

    let inside = session_on(&sessions, branch.id, date(2024, 5, 10), vec![], vec![student.id]).await;
    let outside = session_on(&sessions, branch.id, date(2024, 6, 10), vec![], vec![student.id]).await;

    let sheet = attendance.session_attendance(inside.session.id).await.unwrap().unwrap();
    assert_eq!(sheet.entries.len(), 1);
    assert_eq!(sheet.entries[0].status, AttendanceStatus::Pending);

    let entry = attendance
        .mark_attendance(inside.session.id, student.id, mark(AttendanceStatus::Present))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.remaining_sessions, 7);
    assert!(entry.marked_at.is_some());

    // past the expiration date, so the package is not charged
    attendance
        .mark_attendance(outside.session.id, student.id, mark(AttendanceStatus::Present))
        .await
        .unwrap();
    let stored = students.get_student(student.id).await.unwrap().unwrap();
    assert_eq!(stored.remaining_sessions, 7);

    attendance
        .mark_attendance(inside.session.id, student.id, mark(AttendanceStatus::Absent))
        .await
        .unwrap();
    let stored = students.get_student(student.id).await.unwrap().unwrap();
    assert_eq!(stored.remaining_sessions, 8);

    let err = attendance
        .mark_attendance(inside.session.id, bystander.id, mark(AttendanceStatus::Present))
        .await
        .unwrap_err();
    assert_matches!(domain_error(&err), Some(DomainError::Validation(_)));
}

#[tokio::test]
#[serial]
async fn test_dropping_participant_restores_session() {
    let Some(db) = TestDatabase::connect().await else { return };
    let branches = BranchService::new(db.pool.clone());
    let students = StudentService::new(db.pool.clone());
    let sessions = TrainingSessionService::new(db.pool.clone());
    let attendance = AttendanceService::new(db.pool.clone());

    let branch = branches.create_branch(MockData::branch()).await.unwrap();
    let student = students.create_student(MockData::student(branch.id)).await.unwrap();
    let session = session_on(&sessions, branch.id, date(2024, 7, 1), vec![], vec![student.id]).await;

    attendance
        .bulk_mark(
            session.session.id,
            BulkMarkAttendance {
                records: vec![BulkAttendanceItem {
                    student_id: student.id,
                    mark: mark(AttendanceStatus::Present),
                }],
            },
        )
        .await
        .unwrap();
    assert_eq!(students.get_student(student.id).await.unwrap().unwrap().remaining_sessions, 7);

    let participants = sessions.set_participants(session.session.id, &[]).await.unwrap().unwrap();
    assert!(participants.is_empty());
    assert_eq!(students.get_student(student.id).await.unwrap().unwrap().remaining_sessions, 8);
}

#[tokio::test]
#[serial]
async fn test_renewal_archives_package() {
    let Some(db) = TestDatabase::connect().await else { return };
    let branches = BranchService::new(db.pool.clone());
    let packages = PackageService::new(db.pool.clone());
    let students = StudentService::new(db.pool.clone());

    let branch = branches.create_branch(MockData::branch()).await.unwrap();
    let elite = packages
        .create_package(CreatePackage {
            name: "Elite 12".to_string(),
            description: None,
            default_sessions: 12,
            price: Some(12_000.0),
            is_active: None,
        })
        .await
        .unwrap();
    let student = students.create_student(MockData::student(branch.id)).await.unwrap();

    let renewed = students
        .renew_package(
            student.id,
            RenewPackage {
                package_id: Some(elite.id),
                package_type: None,
                sessions: None,
                enrollment_date: date(2024, 9, 1),
                expiration_date: Some(date(2024, 12, 1)),
                renewal_fee: None,
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(renewed.package_type.as_deref(), Some("Elite 12"));
    assert_eq!(renewed.sessions, 12);
    assert_eq!(renewed.remaining_sessions, 12);
    assert_eq!(renewed.total_training_fee, 20_000.0);
    assert_eq!(renewed.remaining_balance, 18_000.0);

    let history = students.package_history(student.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].package_type.as_deref(), Some("Junior 8"));
    assert_eq!(history[0].remaining_balance, 6_000.0);

    let summary = students
        .summary(student.id, date(2024, 10, 1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.package_status, PackageStatus::Active);
    assert_eq!(summary.package_history.len(), 1);
    assert_eq!(summary.branch_name.as_deref(), Some(branch.name.as_str()));
}

#[tokio::test]
#[serial]
async fn test_coach_present_after_clock_out() {
    let Some(db) = TestDatabase::connect().await else { return };
    let branches = BranchService::new(db.pool.clone());
    let coaches = CoachService::new(db.pool.clone());
    let sessions = TrainingSessionService::new(db.pool.clone());
    let coach_attendance = CoachAttendanceService::new(db.pool.clone());
    let dashboard = DashboardService::new(db.pool.clone());

    let branch = branches.create_branch(MockData::branch()).await.unwrap();
    let coach = coaches.create_coach(MockData::coach()).await.unwrap();
    let outsider = coaches.create_coach(MockData::coach()).await.unwrap();
    let session = session_on(&sessions, branch.id, date(2024, 8, 3), vec![coach.id], vec![]).await;

    let clock_in = Utc.with_ymd_and_hms(2024, 8, 3, 8, 0, 0).unwrap();
    let after_in = coach_attendance
        .record_time(
            session.session.id,
            coach.id,
            RecordCoachTime {
                time_in: Some(clock_in),
                time_out: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_in.entry.status, AttendanceStatus::Pending);

    let after_out = coach_attendance
        .record_time(
            session.session.id,
            coach.id,
            RecordCoachTime {
                time_in: None,
                time_out: Some(clock_in + Duration::minutes(90)),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_out.entry.status, AttendanceStatus::Present);
    assert_eq!(after_out.worked_hours, Some(1.5));

    let err = coach_attendance
        .record_time(
            session.session.id,
            outsider.id,
            RecordCoachTime {
                time_in: Some(clock_in),
                time_out: None,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(domain_error(&err), Some(DomainError::Validation(_)));

    let stats = dashboard.coach_stats(coach.id, date(2024, 8, 1)).await.unwrap().unwrap();
    assert_eq!(stats.assigned_sessions, 1);
    assert_eq!(stats.upcoming_sessions, 1);
    assert_eq!(stats.attendance.present, 1);
    assert_eq!(stats.hours_worked, 1.5);
}

#[tokio::test]
#[serial]
async fn test_branch_in_use_cannot_be_deleted() {
    let Some(db) = TestDatabase::connect().await else { return };
    let branches = BranchService::new(db.pool.clone());
    let students = StudentService::new(db.pool.clone());

    let branch = branches.create_branch(MockData::branch()).await.unwrap();
    let empty = branches.create_branch(MockData::branch()).await.unwrap();
    students.create_student(MockData::student(branch.id)).await.unwrap();

    let err = branches.delete_branch(branch.id).await.unwrap_err();
    assert_matches!(domain_error(&err), Some(DomainError::Conflict(_)));

    assert!(branches.delete_branch(empty.id).await.unwrap());
    assert!(!branches.delete_branch(empty.id).await.unwrap());

    let page = branches
        .list_branches(&ListQuery {
            search: Some(branch.name.to_uppercase()),
            page: None,
            page_size: None,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
#[serial]
async fn test_provisioned_coach_can_log_in() {
    let Some(db) = TestDatabase::connect().await else { return };
    let coaches = CoachService::new(db.pool.clone());
    let auth = AuthService::new(db.pool.clone(), TEST_JWT_SECRET);

    let coach = coaches.create_coach(MockData::coach()).await.unwrap();
    let account = auth.provision_coach_account(coach.id).await.unwrap();
    assert_eq!(account.user.role, UserRole::Coach);
    assert_eq!(account.user.coach_id, Some(coach.id));

    let again = auth.provision_coach_account(coach.id).await;
    assert_matches!(again, Err(AuthError::AccountAlreadyProvisioned));

    let response = auth
        .login(LoginRequest {
            email: coach.email.to_uppercase(),
            password: account.temporary_password.clone(),
        })
        .await
        .unwrap();
    assert_eq!(response.user.coach_id, Some(coach.id));

    let wrong = auth
        .login(LoginRequest {
            email: coach.email.clone(),
            password: "Wrong-password-1".to_string(),
        })
        .await;
    assert_matches!(wrong, Err(AuthError::InvalidCredentials));
}

#[tokio::test]
#[serial]
async fn test_bulk_mark_rejects_whole_batch_for_non_participant() {
    let Some(db) = TestDatabase::connect().await else { return };
    let branches = BranchService::new(db.pool.clone());
    let students = StudentService::new(db.pool.clone());
    let sessions = TrainingSessionService::new(db.pool.clone());
    let attendance = AttendanceService::new(db.pool.clone());

    let branch = branches.create_branch(MockData::branch()).await.unwrap();
    let player = students.create_student(MockData::student(branch.id)).await.unwrap();
    let teammate = students.create_student(MockData::student(branch.id)).await.unwrap();
    let walk_in = students.create_student(MockData::student(branch.id)).await.unwrap();
    let session = session_on(
        &sessions,
        branch.id,
        date(2024, 7, 2),
        vec![],
        vec![player.id, teammate.id],
    )
    .await;

    let batch = [player.id, walk_in.id, teammate.id]
        .into_iter()
        .map(|student_id| BulkAttendanceItem {
            student_id,
            mark: mark(AttendanceStatus::Present),
        })
        .collect();
    let err = attendance
        .bulk_mark(session.session.id, BulkMarkAttendance { records: batch })
        .await
        .unwrap_err();
    assert_matches!(domain_error(&err), Some(DomainError::Validation(_)));

    let sheet = attendance.session_attendance(session.session.id).await.unwrap().unwrap();
    assert!(sheet
        .entries
        .iter()
        .all(|entry| entry.status == AttendanceStatus::Pending));
    for student_id in [player.id, teammate.id] {
        let stored = students.get_student(student_id).await.unwrap().unwrap();
        assert_eq!(stored.remaining_sessions, 8);
    }
}

#[tokio::test]
#[serial]
async fn test_moving_or_deleting_session_recounts_package() {
    let Some(db) = TestDatabase::connect().await else { return };
    let branches = BranchService::new(db.pool.clone());
    let students = StudentService::new(db.pool.clone());
    let sessions = TrainingSessionService::new(db.pool.clone());
    let attendance = AttendanceService::new(db.pool.clone());

    let branch = branches.create_branch(MockData::branch()).await.unwrap();
    let student = students
        .create_student(CreateStudent {
            enrollment_date: Some(date(2024, 5, 1)),
            expiration_date: Some(date(2024, 5, 31)),
            ..MockData::student(branch.id)
        })
        .await
        .unwrap();
    let session = session_on(&sessions, branch.id, date(2024, 5, 10), vec![], vec![student.id]).await;
    attendance
        .mark_attendance(session.session.id, student.id, mark(AttendanceStatus::Present))
        .await
        .unwrap();
    assert_eq!(students.get_student(student.id).await.unwrap().unwrap().remaining_sessions, 7);

    let moved_out = UpdateTrainingSession {
        date: Some(date(2024, 6, 10)),
        ..Default::default()
    };
    sessions.update_session(session.session.id, moved_out).await.unwrap().unwrap();
    assert_eq!(students.get_student(student.id).await.unwrap().unwrap().remaining_sessions, 8);

    let moved_back = UpdateTrainingSession {
        date: Some(date(2024, 5, 12)),
        ..Default::default()
    };
    sessions.update_session(session.session.id, moved_back).await.unwrap().unwrap();
    assert_eq!(students.get_student(student.id).await.unwrap().unwrap().remaining_sessions, 7);

    assert!(sessions.delete_session(session.session.id).await.unwrap());
    assert_eq!(students.get_student(student.id).await.unwrap().unwrap().remaining_sessions, 8);
    assert!(!sessions.delete_session(session.session.id).await.unwrap());
}

#[tokio::test]
#[serial]
async fn test_deleted_coach_loses_login() {
    let Some(db) = TestDatabase::connect().await else { return };
    let coaches = CoachService::new(db.pool.clone());
    let auth = AuthService::new(db.pool.clone(), TEST_JWT_SECRET);

    let coach = coaches.create_coach(MockData::coach()).await.unwrap();
    let account = auth.provision_coach_account(coach.id).await.unwrap();
    let credentials = LoginRequest {
        email: coach.email.clone(),
        password: account.temporary_password.clone(),
    };
    auth.login(credentials.clone()).await.unwrap();

    assert!(coaches.delete_coach(coach.id).await.unwrap());
    assert_matches!(auth.login(credentials).await, Err(AuthError::InvalidCredentials));
    assert!(coaches.get_coach(coach.id).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_parallel_marks_keep_remaining_sessions_exact() {
    let Some(db) = TestDatabase::connect().await else { return };
    let branches = BranchService::new(db.pool.clone());
    let students = StudentService::new(db.pool.clone());
    let sessions = TrainingSessionService::new(db.pool.clone());
    let attendance = AttendanceService::new(db.pool.clone());

    let branch = branches.create_branch(MockData::branch()).await.unwrap();
    let student = students.create_student(MockData::student(branch.id)).await.unwrap();
    let mut session_ids = Vec::new();
    for day in 1..=4 {
        let session = session_on(&sessions, branch.id, date(2024, 4, day), vec![], vec![student.id]).await;
        session_ids.push(session.session.id);
    }

    let handles: Vec<_> = session_ids
        .into_iter()
        .map(|session_id| {
            let attendance = attendance.clone();
            tokio::spawn(async move {
                attendance
                    .mark_attendance(session_id, student.id, mark(AttendanceStatus::Present))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap().unwrap();
    }

    let stored = students.get_student(student.id).await.unwrap().unwrap();
    assert_eq!(stored.remaining_sessions, 4);
    let recounted = students.reconcile(student.id).await.unwrap().unwrap();
    assert_eq!(recounted.remaining_sessions, stored.remaining_sessions);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_parallel_payment_deletes_restore_balance() {
    let Some(db) = TestDatabase::connect().await else { return };
    let branches = BranchService::new(db.pool.clone());
    let students = StudentService::new(db.pool.clone());
    let payments = PaymentService::new(db.pool.clone());

    let branch = branches.create_branch(MockData::branch()).await.unwrap();
    let student = students.create_student(MockData::student(branch.id)).await.unwrap();
    let mut payment_ids = Vec::new();
    for amount in [500.0, 750.0, 1_250.0] {
        let payment = payments
            .record_payment(
                student.id,
                CreatePayment {
                    payment_amount: amount,
                    payment_date: None,
                    notes: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
        payment_ids.push(payment.id);
    }
    let charge = payments
        .add_charge(
            student.id,
            CreateCharge {
                amount: 300.0,
                charge_type: "tournament".to_string(),
                charge_date: None,
                description: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(students.get_student(student.id).await.unwrap().unwrap().remaining_balance, 3_800.0);

    let mut handles: Vec<_> = payment_ids
        .into_iter()
        .map(|payment_id| {
            let payments = payments.clone();
            tokio::spawn(async move { payments.delete_payment(payment_id).await })
        })
        .collect();
    let charges = payments.clone();
    handles.push(tokio::spawn(async move { charges.delete_charge(charge.id).await }));
    for handle in handles {
        assert!(handle.await.unwrap().unwrap());
    }

    let stored = students.get_student(student.id).await.unwrap().unwrap();
    assert_eq!(stored.remaining_balance, 6_000.0);
}

#[tokio::test]
#[serial]
async fn test_renewal_counts_attendance_inside_new_window() {
    let Some(db) = TestDatabase::connect().await else { return };
    let branches = BranchService::new(db.pool.clone());
    let students = StudentService::new(db.pool.clone());
    let sessions = TrainingSessionService::new(db.pool.clone());
    let attendance = AttendanceService::new(db.pool.clone());

    let branch = branches.create_branch(MockData::branch()).await.unwrap();
    let student = students.create_student(MockData::student(branch.id)).await.unwrap();
    let session = session_on(&sessions, branch.id, date(2024, 9, 5), vec![], vec![student.id]).await;
    attendance
        .mark_attendance(session.session.id, student.id, mark(AttendanceStatus::Present))
        .await
        .unwrap();

    let renewed = students
        .renew_package(
            student.id,
            RenewPackage {
                package_id: None,
                package_type: Some("Senior 12".to_string()),
                sessions: Some(12),
                enrollment_date: date(2024, 9, 1),
                expiration_date: Some(date(2024, 11, 30)),
                renewal_fee: Some(9_000.0),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renewed.sessions, 12);
    assert_eq!(renewed.remaining_sessions, 11);

    let recounted = students.reconcile(student.id).await.unwrap().unwrap();
    assert_eq!(recounted.remaining_sessions, 11);
}

#[tokio::test]
#[serial]
async fn test_unclocked_past_sessions_count_against_coach() {
    let Some(db) = TestDatabase::connect().await else { return };
    let branches = BranchService::new(db.pool.clone());
    let coaches = CoachService::new(db.pool.clone());
    let sessions = TrainingSessionService::new(db.pool.clone());
    let coach_attendance = CoachAttendanceService::new(db.pool.clone());
    let dashboard = DashboardService::new(db.pool.clone());

    let branch = branches.create_branch(MockData::branch()).await.unwrap();
    let coach = coaches.create_coach(MockData::coach()).await.unwrap();
    let mut worked = None;
    for day in 1..=4 {
        let session = session_on(&sessions, branch.id, date(2024, 8, day), vec![coach.id], vec![]).await;
        worked.get_or_insert(session.session.id);
    }
    let upcoming = session_on(&sessions, branch.id, date(2024, 8, 30), vec![coach.id], vec![]).await;

    let clock_in = Utc.with_ymd_and_hms(2024, 8, 1, 8, 0, 0).unwrap();
    coach_attendance
        .record_time(
            worked.unwrap(),
            coach.id,
            RecordCoachTime {
                time_in: Some(clock_in),
                time_out: Some(clock_in + Duration::hours(2)),
            },
        )
        .await
        .unwrap()
        .unwrap();

    let stats = dashboard.coach_stats(coach.id, date(2024, 8, 20)).await.unwrap().unwrap();
    assert_eq!(stats.assigned_sessions, 5);
    assert_eq!(stats.upcoming_sessions, 1);
    assert_eq!(stats.attendance.present, 1);
    assert_eq!(stats.attendance.absent, 3);
    assert_eq!(stats.attendance.pending, 1);
    assert_eq!(stats.attendance_rate, Some(25.0));
    assert_eq!(stats.hours_worked, 2.0);

    let cancelled = UpdateTrainingSession {
        status: Some(SessionStatus::Cancelled),
        ..Default::default()
    };
    sessions.update_session(upcoming.session.id, cancelled).await.unwrap().unwrap();
    let stats = dashboard.coach_stats(coach.id, date(2024, 8, 20)).await.unwrap().unwrap();
    assert_eq!(stats.attendance.pending, 0);
}

#[tokio::test]
#[serial]
async fn test_explicit_null_clears_optional_fields() {
    let Some(db) = TestDatabase::connect().await else { return };
    let branches = BranchService::new(db.pool.clone());
    let students = StudentService::new(db.pool.clone());

    let branch = branches
        .create_branch(CreateBranch {
            contact_email: Some("frontdesk@example.com".to_string()),
            ..MockData::branch()
        })
        .await
        .unwrap();
    assert!(branch.contact_email.is_some());
    let student = students
        .create_student(CreateStudent {
            email: Some("point.guard@example.com".to_string()),
            phone: Some("+63 917 555 0101".to_string()),
            enrollment_date: Some(date(2024, 5, 1)),
            expiration_date: Some(date(2024, 5, 31)),
            ..MockData::student(branch.id)
        })
        .await
        .unwrap();

    let patch: UpdateStudent = serde_json::from_value(serde_json::json!({
        "email": null,
        "expiration_date": null,
        "name": "Renamed Player",
    }))
    .unwrap();
    let updated = students.update_student(student.id, patch).await.unwrap().unwrap();
    assert_eq!(updated.name, "Renamed Player");
    assert_eq!(updated.email, None);
    assert_eq!(updated.expiration_date, None);
    assert_eq!(updated.phone, student.phone);
    assert_eq!(updated.enrollment_date, Some(date(2024, 5, 1)));

    let cleared_branch = branches
        .update_branch(
            branch.id,
            UpdateBranch {
                contact_email: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cleared_branch.contact_email, None);
    assert_eq!(cleared_branch.name, branch.name);
}
