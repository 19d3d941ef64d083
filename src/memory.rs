use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Badge, Batch, CourseInfo, Notification, QuizResult, Tier, UserInfo};
use crate::store::Store;

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserInfo>,
    courses: HashMap<Uuid, CourseInfo>,
    module_course: HashMap<Uuid, Uuid>,
    course_modules: HashMap<Uuid, Vec<Uuid>>,
    enrollments: Vec<(Uuid, Uuid)>,
    results: Vec<QuizResult>,
    badges: Vec<Badge>,
    badge_grants: Vec<(Uuid, Uuid)>,
    batches: Vec<Batch>,
    batch_members: Vec<(Uuid, Uuid)>,
    notifications: Vec<Notification>,
}

/// In-memory Store used by the demo command and by tests. All mutation runs
/// under a single write lock, which makes each add-if-absent check-and-insert
/// atomic.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, name: &str, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.write().await.users.insert(
            id,
            UserInfo {
                id,
                name: name.to_string(),
                email: email.to_string(),
                created_at: Utc::now(),
            },
        );
        id
    }

    pub async fn add_course(&self, title: &str, instructor_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        let mut inner = self.inner.write().await;
        inner.courses.insert(
            id,
            CourseInfo {
                id,
                title: title.to_string(),
                instructor_id,
            },
        );
        inner.course_modules.insert(id, Vec::new());
        id
    }

    pub async fn add_module(&self, course_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        let mut inner = self.inner.write().await;
        inner.module_course.insert(id, course_id);
        inner.course_modules.entry(course_id).or_default().push(id);
        id
    }

    pub async fn enroll(&self, learner_id: Uuid, course_id: Uuid) {
        let mut inner = self.inner.write().await;
        if !inner.enrollments.contains(&(learner_id, course_id)) {
            inner.enrollments.push((learner_id, course_id));
        }
    }
}

#[async_trait]
impl Store for MemStore {
    async fn course(&self, course_id: Uuid) -> Result<Option<CourseInfo>, StoreError> {
        Ok(self.inner.read().await.courses.get(&course_id).cloned())
    }

    async fn course_of_module(&self, module_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(self.inner.read().await.module_course.get(&module_id).copied())
    }

    async fn modules_of(&self, course_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .course_modules
            .get(&course_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn courses_of_instructor(
        &self,
        instructor_id: Uuid,
    ) -> Result<Vec<CourseInfo>, StoreError> {
        let inner = self.inner.read().await;
        let mut courses: Vec<CourseInfo> = inner
            .courses
            .values()
            .filter(|c| c.instructor_id == instructor_id)
            .cloned()
            .collect();
        courses.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(courses)
    }

    async fn enrollments_of(&self, course_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .enrollments
            .iter()
            .filter(|(_, c)| *c == course_id)
            .map(|(learner, _)| *learner)
            .collect())
    }

    async fn user(&self, user_id: Uuid) -> Result<Option<UserInfo>, StoreError> {
        Ok(self.inner.read().await.users.get(&user_id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<UserInfo>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn append_result(&self, result: &QuizResult) -> Result<(), StoreError> {
        self.inner.write().await.results.push(result.clone());
        Ok(())
    }

    async fn results_for(
        &self,
        learner_id: Uuid,
        module_ids: &[Uuid],
    ) -> Result<Vec<QuizResult>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .results
            .iter()
            .filter(|r| r.learner_id == learner_id && module_ids.contains(&r.module_id))
            .cloned()
            .collect())
    }

    async fn find_or_create_badge(
        &self,
        name: &str,
        description: &str,
        icon: &str,
    ) -> Result<Badge, StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(badge) = inner.badges.iter().find(|b| b.name == name) {
            return Ok(badge.clone());
        }
        let badge = Badge {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
        };
        inner.badges.push(badge.clone());
        Ok(badge)
    }

    async fn grant_badge(&self, learner_id: Uuid, badge_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.badge_grants.contains(&(learner_id, badge_id)) {
            return Ok(false);
        }
        inner.badge_grants.push((learner_id, badge_id));
        Ok(true)
    }

    async fn badges_of(&self, learner_id: Uuid) -> Result<Vec<Badge>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .badge_grants
            .iter()
            .filter(|(learner, _)| *learner == learner_id)
            .filter_map(|(_, badge_id)| inner.badges.iter().find(|b| b.id == *badge_id))
            .cloned()
            .collect())
    }

    async fn find_or_create_batch(
        &self,
        course_id: Uuid,
        tier: Tier,
        instructor_id: Uuid,
    ) -> Result<Batch, StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(batch) = inner
            .batches
            .iter()
            .find(|b| b.course_id == course_id && b.tier == tier)
        {
            return Ok(batch.clone());
        }
        let batch = Batch {
            id: Uuid::new_v4(),
            course_id,
            tier,
            instructor_id,
        };
        inner.batches.push(batch.clone());
        Ok(batch)
    }

    async fn join_batch(&self, batch_id: Uuid, learner_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.batch_members.contains(&(batch_id, learner_id)) {
            return Ok(false);
        }
        inner.batch_members.push((batch_id, learner_id));
        Ok(true)
    }

    async fn batch_roster(
        &self,
        course_id: Uuid,
    ) -> Result<Vec<(Batch, Vec<UserInfo>)>, StoreError> {
        let inner = self.inner.read().await;
        let mut roster = Vec::new();
        for batch in inner.batches.iter().filter(|b| b.course_id == course_id) {
            let members: Vec<UserInfo> = inner
                .batch_members
                .iter()
                .filter(|(b, _)| *b == batch.id)
                .filter_map(|(_, learner)| inner.users.get(learner))
                .cloned()
                .collect();
            roster.push((batch.clone(), members));
        }
        Ok(roster)
    }

    async fn push_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(())
    }

    async fn notifications_for(&self, user_id: Uuid) -> Result<Vec<Notification>, StoreError> {
        // Appended in creation order, so reverse iteration is newest first.
        Ok(self
            .inner
            .read()
            .await
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id)
        {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
