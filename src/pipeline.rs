use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::models::{CourseInfo, Progress, QuizResult, Tier};
use crate::notify;
use crate::progress;
use crate::store::Store;

/// Progress, average and tier for one (learner, course) pair, recomputed from
/// the attempt log on demand.
#[derive(Debug, Clone, Copy)]
pub struct ProgressReport {
    pub progress: Progress,
    pub average: f64,
    pub tier: Tier,
}

/// Runs one quiz-module submission end to end: record the attempt, recompute
/// completion, and on a newly completed course grant the badge, classify the
/// tier and place the learner into the matching batch, emitting one
/// notification per event that actually occurred.
///
/// Submissions for the same (learner, course) are serialized through a
/// per-key lock held from the attempt insert to the last side effect. The
/// grant and membership writes are additionally add-if-absent at the store,
/// so the at-most-once guarantees hold across processes too.
pub struct SubmissionPipeline<S> {
    store: Arc<S>,
    locks: Mutex<HashMap<(Uuid, Uuid), Arc<Mutex<()>>>>,
}

impl<S: Store> SubmissionPipeline<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn submit(
        &self,
        learner_id: Uuid,
        module_id: Uuid,
        score: i32,
        total_questions: i32,
    ) -> Result<QuizResult, PipelineError> {
        if score < 0 {
            return Err(PipelineError::Validation(format!(
                "score must be non-negative, got {score}"
            )));
        }
        if total_questions < 0 {
            return Err(PipelineError::Validation(format!(
                "total questions must be non-negative, got {total_questions}"
            )));
        }
        if score > total_questions {
            return Err(PipelineError::Validation(format!(
                "score {score} exceeds total questions {total_questions}"
            )));
        }

        let course_id = self
            .store
            .course_of_module(module_id)
            .await?
            .ok_or(PipelineError::ModuleNotFound(module_id))?;
        let course = self
            .store
            .course(course_id)
            .await?
            .ok_or(PipelineError::CourseNotFound(course_id))?;
        if self.store.user(learner_id).await?.is_none() {
            return Err(PipelineError::LearnerNotFound(learner_id));
        }

        let _guard = self.completion_lock(learner_id, course_id).await;

        let result = QuizResult {
            id: Uuid::new_v4(),
            learner_id,
            module_id,
            score,
            total_questions,
            completed_at: Utc::now(),
        };
        self.store.append_result(&result).await?;

        let module_ids = self.store.modules_of(course_id).await?;
        let results = self.store.results_for(learner_id, &module_ids).await?;
        let snapshot = progress::completion(&module_ids, &results);

        // The attempt is durably recorded at this point. Everything below is
        // a secondary effect: failures are logged and never unwind it.
        if snapshot.total_modules > 0 && snapshot.completed_modules == snapshot.total_modules {
            if let Err(err) = self.grant_achievement(learner_id, &course).await {
                warn!(
                    learner = %learner_id,
                    course = %course.id,
                    error = %err,
                    "badge grant failed after course completion"
                );
            }
            if let Err(err) = self.place_in_cohort(learner_id, &course, &results).await {
                warn!(
                    learner = %learner_id,
                    course = %course.id,
                    error = %err,
                    "cohort placement failed after course completion"
                );
            }
        }

        Ok(result)
    }

    /// Read-only recomputation used by progress queries.
    pub async fn report_for(
        &self,
        learner_id: Uuid,
        course_id: Uuid,
    ) -> Result<ProgressReport, PipelineError> {
        if self.store.course(course_id).await?.is_none() {
            return Err(PipelineError::CourseNotFound(course_id));
        }
        let module_ids = self.store.modules_of(course_id).await?;
        let results = self.store.results_for(learner_id, &module_ids).await?;
        let average = progress::average_score(&results);
        Ok(ProgressReport {
            progress: progress::completion(&module_ids, &results),
            average,
            tier: Tier::for_average(average),
        })
    }

    async fn completion_lock(&self, learner_id: Uuid, course_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(
                locks
                    .entry((learner_id, course_id))
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    async fn grant_achievement(
        &self,
        learner_id: Uuid,
        course: &CourseInfo,
    ) -> Result<(), PipelineError> {
        let badge = self
            .store
            .find_or_create_badge(
                &format!("{} Graduate", course.title),
                &format!("Completed every module of {}", course.title),
                "graduation-cap",
            )
            .await?;

        if self.store.grant_badge(learner_id, badge.id).await? {
            info!(learner = %learner_id, badge = %badge.name, "badge granted");
            self.store
                .push_notification(&notify::badge_earned(learner_id, &badge))
                .await?;
        }
        Ok(())
    }

    async fn place_in_cohort(
        &self,
        learner_id: Uuid,
        course: &CourseInfo,
        results: &[QuizResult],
    ) -> Result<(), PipelineError> {
        let average = progress::average_score(results);
        let tier = Tier::for_average(average);
        let batch = self
            .store
            .find_or_create_batch(course.id, tier, course.instructor_id)
            .await?;

        if self.store.join_batch(batch.id, learner_id).await? {
            info!(learner = %learner_id, course = %course.id, %tier, "joined cohort");
            self.store
                .push_notification(&notify::cohort_joined(
                    learner_id,
                    tier,
                    &course.title,
                    average,
                ))
                .await?;
        }
        Ok(())
    }
}
