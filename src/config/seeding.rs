use anyhow::Result;
use chrono::{Duration, Local, NaiveTime};
use sqlx::PgPool;

use crate::domain::ListQuery;
use crate::models::*;
use crate::services::*;

/// Demo data for local development. Does nothing once any branch exists.
pub struct DatabaseSeeder {
    pool: PgPool,
}

impl DatabaseSeeder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn seed_all(&self) -> Result<()> {
        let branch_service = BranchService::new(self.pool.clone());
        if branch_service.list_branches(&ListQuery::default()).await?.total > 0 {
            tracing::info!("Database already has data, skipping demo seed");
            return Ok(());
        }

        tracing::info!("Starting database seeding...");

        let branch = branch_service
            .create_branch(CreateBranch {
                name: "Main Court".to_string(),
                address: "123 Rizal Avenue".to_string(),
                city: "Pasig".to_string(),
                contact_email: Some("main@hoopacademy.ph".to_string()),
                contact_number: Some("+63 917 555 0101".to_string()),
            })
            .await?;

        let package = PackageService::new(self.pool.clone())
            .create_package(CreatePackage {
                name: "Junior 8".to_string(),
                description: Some("Eight fundamentals sessions for ages 8-12".to_string()),
                default_sessions: 8,
                price: Some(4_800.0),
                is_active: Some(true),
            })
            .await?;

        let coach = CoachService::new(self.pool.clone())
            .create_coach(CreateCoach {
                name: "Coach Migs Reyes".to_string(),
                email: "migs@hoopacademy.ph".to_string(),
                phone: Some("+63 917 555 0199".to_string()),
                specialization: Some("Ball handling".to_string()),
            })
            .await?;

        let today = Local::now().date_naive();
        let student_service = StudentService::new(self.pool.clone());
        let mut student_ids = Vec::new();
        for (name, downpayment) in [("Paolo Santos", 1_000.0), ("Bea Lim", 2_400.0), ("Kiko Cruz", 0.0)] {
            let student = student_service
                .create_student(CreateStudent {
                    name: name.to_string(),
                    email: None,
                    phone: None,
                    branch_id: Some(branch.id),
                    package_id: Some(package.id),
                    package_type: None,
                    sessions: None,
                    enrollment_date: Some(today - Duration::days(7)),
                    expiration_date: Some(today + Duration::days(60)),
                    total_training_fee: None,
                    downpayment: Some(downpayment),
                })
                .await?;
            student_ids.push(student.id);
        }

        let (Some(start_time), Some(end_time)) = (
            NaiveTime::from_hms_opt(16, 0, 0),
            NaiveTime::from_hms_opt(17, 30, 0),
        ) else {
            anyhow::bail!("invalid demo session time");
        };

        TrainingSessionService::new(self.pool.clone())
            .create_session(CreateTrainingSession {
                date: today + Duration::days(1),
                start_time,
                end_time,
                branch_id: branch.id,
                package_type: Some(package.name.clone()),
                notes: Some("Demo session".to_string()),
                coach_ids: vec![coach.id],
                student_ids: student_ids.clone(),
            })
            .await?;

        if let Some(student_id) = student_ids.first() {
            PaymentService::new(self.pool.clone())
                .record_payment(
                    *student_id,
                    CreatePayment {
                        payment_amount: 1_500.0,
                        payment_date: Some(today),
                        notes: Some("Second installment".to_string()),
                    },
                )
                .await?;
        }

        tracing::info!(students = student_ids.len(), "Database seeding completed!");
        Ok(())
    }
}
