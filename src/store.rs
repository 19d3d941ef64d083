use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Badge, Batch, CourseInfo, Notification, QuizResult, Tier, UserInfo};

/// Repository seam for the pipeline and the report aggregator.
///
/// The grant and membership operations are add-if-absent: they return whether
/// a row was newly created, and implementations must make that decision
/// atomically (a unique constraint, or a single write lock over the check and
/// the insert).
#[async_trait]
pub trait Store: Send + Sync {
    // Course and user collaborators. Read-only to this crate's logic;
    // written only by seeding and imports.
    async fn course(&self, course_id: Uuid) -> Result<Option<CourseInfo>, StoreError>;
    async fn course_of_module(&self, module_id: Uuid) -> Result<Option<Uuid>, StoreError>;
    async fn modules_of(&self, course_id: Uuid) -> Result<Vec<Uuid>, StoreError>;
    async fn courses_of_instructor(&self, instructor_id: Uuid)
        -> Result<Vec<CourseInfo>, StoreError>;
    async fn enrollments_of(&self, course_id: Uuid) -> Result<Vec<Uuid>, StoreError>;
    async fn user(&self, user_id: Uuid) -> Result<Option<UserInfo>, StoreError>;
    async fn user_by_email(&self, email: &str) -> Result<Option<UserInfo>, StoreError>;

    // Attempt log. Append-only.
    async fn append_result(&self, result: &QuizResult) -> Result<(), StoreError>;
    async fn results_for(
        &self,
        learner_id: Uuid,
        module_ids: &[Uuid],
    ) -> Result<Vec<QuizResult>, StoreError>;

    // Badge ledger.
    async fn find_or_create_badge(
        &self,
        name: &str,
        description: &str,
        icon: &str,
    ) -> Result<Badge, StoreError>;
    /// Returns true when the grant was newly created.
    async fn grant_badge(&self, learner_id: Uuid, badge_id: Uuid) -> Result<bool, StoreError>;
    async fn badges_of(&self, learner_id: Uuid) -> Result<Vec<Badge>, StoreError>;

    // Batch (cohort) ledger.
    async fn find_or_create_batch(
        &self,
        course_id: Uuid,
        tier: Tier,
        instructor_id: Uuid,
    ) -> Result<Batch, StoreError>;
    /// Returns true when the membership was newly created.
    async fn join_batch(&self, batch_id: Uuid, learner_id: Uuid) -> Result<bool, StoreError>;
    async fn batch_roster(
        &self,
        course_id: Uuid,
    ) -> Result<Vec<(Batch, Vec<UserInfo>)>, StoreError>;

    // Notification inbox.
    async fn push_notification(&self, notification: &Notification) -> Result<(), StoreError>;
    /// Newest first.
    async fn notifications_for(&self, user_id: Uuid) -> Result<Vec<Notification>, StoreError>;
    /// Returns true when a notification with this id belongs to the user.
    /// Marking an already-read notification is a no-op, not an error.
    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, StoreError>;
}
