use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Badge, Batch, CourseInfo, Notification, QuizResult, Tier, UserInfo};
use crate::store::Store;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub struct SeedSummary {
    pub course_id: Uuid,
    pub course_title: String,
    pub module_ids: Vec<Uuid>,
    pub instructor_email: String,
    pub learner_emails: Vec<String>,
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<SeedSummary> {
    let users = vec![
        (
            Uuid::parse_str("8f2f6f0a-51d4-4c3a-9b1e-2f6a0f9f3c11")?,
            "Maya Okafor",
            "maya.okafor@example.com",
            "instructor",
        ),
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Avery Lee",
            "avery.lee@example.com",
            "learner",
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Jules Moreno",
            "jules.moreno@example.com",
            "learner",
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Kiara Patel",
            "kiara.patel@example.com",
            "learner",
        ),
    ];

    for (id, name, email, role) in &users {
        sqlx::query(
            r#"
            INSERT INTO progress_pipeline.users (id, full_name, email, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, role = EXCLUDED.role
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(role)
        .fetch_one(pool)
        .await?;
    }

    let instructor_id = users[0].0;
    let course_id = Uuid::parse_str("6a1f0c7e-8d4b-42a1-b6d8-9f1e2a3b4c5d")?;
    let course_title = "Web Development Bootcamp";

    sqlx::query(
        r#"
        INSERT INTO progress_pipeline.courses (id, title, instructor_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title
        "#,
    )
    .bind(course_id)
    .bind(course_title)
    .bind(instructor_id)
    .execute(pool)
    .await?;

    let modules = vec![
        (
            Uuid::parse_str("b1a2c3d4-0001-4a0a-8a0a-aaaaaaaaaaa1")?,
            1,
            "HTML & CSS Foundations",
        ),
        (
            Uuid::parse_str("b1a2c3d4-0002-4a0a-8a0a-aaaaaaaaaaa2")?,
            2,
            "JavaScript Essentials",
        ),
        (
            Uuid::parse_str("b1a2c3d4-0003-4a0a-8a0a-aaaaaaaaaaa3")?,
            3,
            "Building a Backend",
        ),
    ];

    for (id, position, title) in &modules {
        sqlx::query(
            r#"
            INSERT INTO progress_pipeline.modules (id, course_id, position, title)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title
            "#,
        )
        .bind(id)
        .bind(course_id)
        .bind(position)
        .bind(title)
        .execute(pool)
        .await?;
    }

    for (id, _, _, role) in &users {
        if *role == "learner" {
            sqlx::query(
                r#"
                INSERT INTO progress_pipeline.enrollments (user_id, course_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, course_id) DO NOTHING
                "#,
            )
            .bind(id)
            .bind(course_id)
            .execute(pool)
            .await?;
        }
    }

    Ok(SeedSummary {
        course_id,
        course_title: course_title.to_string(),
        module_ids: modules.iter().map(|(id, _, _)| *id).collect(),
        instructor_email: users[0].2.to_string(),
        learner_emails: users
            .iter()
            .filter(|(_, _, _, role)| *role == "learner")
            .map(|(_, _, email, _)| email.to_string())
            .collect(),
    })
}

/// Postgres-backed Store. The add-if-absent operations lean on the unique
/// constraints declared in the migrations, so they stay at-most-once even
/// across processes.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_user(row: &sqlx::postgres::PgRow) -> UserInfo {
    UserInfo {
        id: row.get("id"),
        name: row.get("full_name"),
        email: row.get("email"),
        created_at: row.get("created_at"),
    }
}

fn row_course(row: &sqlx::postgres::PgRow) -> CourseInfo {
    CourseInfo {
        id: row.get("id"),
        title: row.get("title"),
        instructor_id: row.get("instructor_id"),
    }
}

fn row_batch(row: &sqlx::postgres::PgRow) -> Result<Batch, StoreError> {
    let tier_name: String = row.get("tier");
    let tier = Tier::from_name(&tier_name)
        .ok_or_else(|| StoreError::Backend(format!("unknown tier stored: {tier_name}")))?;
    Ok(Batch {
        id: row.get("id"),
        course_id: row.get("course_id"),
        tier,
        instructor_id: row.get("instructor_id"),
    })
}

#[async_trait]
impl Store for PgStore {
    async fn course(&self, course_id: Uuid) -> Result<Option<CourseInfo>, StoreError> {
        let row = sqlx::query(
            "SELECT id, title, instructor_id FROM progress_pipeline.courses WHERE id = $1",
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| row_course(&r)))
    }

    async fn course_of_module(&self, module_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let row = sqlx::query("SELECT course_id FROM progress_pipeline.modules WHERE id = $1")
            .bind(module_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("course_id")))
    }

    async fn modules_of(&self, course_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let rows = sqlx::query(
            "SELECT id FROM progress_pipeline.modules WHERE course_id = $1 ORDER BY position, id",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.get("id")).collect())
    }

    async fn courses_of_instructor(
        &self,
        instructor_id: Uuid,
    ) -> Result<Vec<CourseInfo>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, title, instructor_id FROM progress_pipeline.courses \
             WHERE instructor_id = $1 ORDER BY created_at, id",
        )
        .bind(instructor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_course).collect())
    }

    async fn enrollments_of(&self, course_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let rows = sqlx::query(
            "SELECT user_id FROM progress_pipeline.enrollments \
             WHERE course_id = $1 ORDER BY enrolled_at, user_id",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.get("user_id")).collect())
    }

    async fn user(&self, user_id: Uuid) -> Result<Option<UserInfo>, StoreError> {
        let row = sqlx::query(
            "SELECT id, full_name, email, created_at FROM progress_pipeline.users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| row_user(&r)))
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<UserInfo>, StoreError> {
        let row = sqlx::query(
            "SELECT id, full_name, email, created_at FROM progress_pipeline.users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| row_user(&r)))
    }

    async fn append_result(&self, result: &QuizResult) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO progress_pipeline.quiz_results
            (id, user_id, module_id, score, total_questions, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(result.id)
        .bind(result.learner_id)
        .bind(result.module_id)
        .bind(result.score)
        .bind(result.total_questions)
        .bind(result.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn results_for(
        &self,
        learner_id: Uuid,
        module_ids: &[Uuid],
    ) -> Result<Vec<QuizResult>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, module_id, score, total_questions, completed_at
            FROM progress_pipeline.quiz_results
            WHERE user_id = $1 AND module_id = ANY($2)
            ORDER BY completed_at, id
            "#,
        )
        .bind(learner_id)
        .bind(module_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| QuizResult {
                id: r.get("id"),
                learner_id: r.get("user_id"),
                module_id: r.get("module_id"),
                score: r.get("score"),
                total_questions: r.get("total_questions"),
                completed_at: r.get("completed_at"),
            })
            .collect())
    }

    async fn find_or_create_badge(
        &self,
        name: &str,
        description: &str,
        icon: &str,
    ) -> Result<Badge, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO progress_pipeline.badges (id, name, description, icon)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name, description, icon
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(icon)
        .fetch_one(&self.pool)
        .await?;

        Ok(Badge {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            icon: row.get("icon"),
        })
    }

    async fn grant_badge(&self, learner_id: Uuid, badge_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO progress_pipeline.badge_grants (user_id, badge_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, badge_id) DO NOTHING
            "#,
        )
        .bind(learner_id)
        .bind(badge_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn badges_of(&self, learner_id: Uuid) -> Result<Vec<Badge>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.name, b.description, b.icon
            FROM progress_pipeline.badges b
            JOIN progress_pipeline.badge_grants g ON g.badge_id = b.id
            WHERE g.user_id = $1
            ORDER BY g.granted_at, b.name
            "#,
        )
        .bind(learner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| Badge {
                id: r.get("id"),
                name: r.get("name"),
                description: r.get("description"),
                icon: r.get("icon"),
            })
            .collect())
    }

    async fn find_or_create_batch(
        &self,
        course_id: Uuid,
        tier: Tier,
        instructor_id: Uuid,
    ) -> Result<Batch, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO progress_pipeline.batches (id, course_id, tier, instructor_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (course_id, tier) DO UPDATE SET tier = EXCLUDED.tier
            RETURNING id, course_id, tier, instructor_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(tier.as_str())
        .bind(instructor_id)
        .fetch_one(&self.pool)
        .await?;

        row_batch(&row)
    }

    async fn join_batch(&self, batch_id: Uuid, learner_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO progress_pipeline.batch_members (batch_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (batch_id, user_id) DO NOTHING
            "#,
        )
        .bind(batch_id)
        .bind(learner_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn batch_roster(
        &self,
        course_id: Uuid,
    ) -> Result<Vec<(Batch, Vec<UserInfo>)>, StoreError> {
        let batch_rows = sqlx::query(
            "SELECT id, course_id, tier, instructor_id FROM progress_pipeline.batches \
             WHERE course_id = $1 ORDER BY created_at, id",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let mut roster = Vec::new();
        for batch_row in &batch_rows {
            let batch = row_batch(batch_row)?;
            let member_rows = sqlx::query(
                r#"
                SELECT u.id, u.full_name, u.email, u.created_at
                FROM progress_pipeline.users u
                JOIN progress_pipeline.batch_members m ON m.user_id = u.id
                WHERE m.batch_id = $1
                ORDER BY m.joined_at, u.email
                "#,
            )
            .bind(batch.id)
            .fetch_all(&self.pool)
            .await?;
            let members = member_rows.iter().map(row_user).collect();
            roster.push((batch, members));
        }
        Ok(roster)
    }

    async fn push_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO progress_pipeline.notifications
            (id, user_id, title, message, kind, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.kind)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn notifications_for(&self, user_id: Uuid) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, message, kind, is_read, created_at
            FROM progress_pipeline.notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| Notification {
                id: r.get("id"),
                user_id: r.get("user_id"),
                title: r.get("title"),
                message: r.get("message"),
                kind: r.get("kind"),
                is_read: r.get("is_read"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE progress_pipeline.notifications SET is_read = TRUE \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
