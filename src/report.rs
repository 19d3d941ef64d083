use std::collections::HashMap;
use std::fmt::Write;

use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{StudentSummary, UserInfo};
use crate::progress;
use crate::store::Store;

struct LearnerAccumulator {
    learner: UserInfo,
    courses: Vec<String>,
    progress_total: i64,
    course_count: i64,
    completed_any: bool,
}

/// Instructor-facing roster: every learner enrolled in any of the
/// instructor's courses, with per-course completion recomputed from the
/// attempt log and averaged (unweighted) across courses.
///
/// The "Legend"/"Newbie" label is derived fresh on every call from whether
/// any course sits at 100%; it is a report decoration, not the badge ledger.
pub async fn learner_report<S: Store>(
    store: &S,
    instructor_id: Uuid,
) -> Result<Vec<StudentSummary>, StoreError> {
    let courses = store.courses_of_instructor(instructor_id).await?;

    let mut accumulators: HashMap<Uuid, LearnerAccumulator> = HashMap::new();
    let mut first_seen: Vec<Uuid> = Vec::new();

    for course in &courses {
        let module_ids = store.modules_of(course.id).await?;
        for learner_id in store.enrollments_of(course.id).await? {
            let Some(learner) = store.user(learner_id).await? else {
                continue;
            };
            let results = store.results_for(learner_id, &module_ids).await?;
            let snapshot = progress::completion(&module_ids, &results);

            let entry = accumulators.entry(learner_id).or_insert_with(|| {
                first_seen.push(learner_id);
                LearnerAccumulator {
                    learner,
                    courses: Vec::new(),
                    progress_total: 0,
                    course_count: 0,
                    completed_any: false,
                }
            });
            entry.courses.push(course.title.clone());
            entry.progress_total += i64::from(snapshot.percent);
            entry.course_count += 1;
            if snapshot.percent == 100 {
                entry.completed_any = true;
            }
        }
    }

    let mut summaries = Vec::with_capacity(first_seen.len());
    for learner_id in first_seen {
        let Some(entry) = accumulators.remove(&learner_id) else {
            continue;
        };
        let progress = if entry.course_count > 0 {
            (entry.progress_total / entry.course_count) as i32
        } else {
            0
        };
        let badges = if entry.completed_any {
            vec!["Legend".to_string()]
        } else {
            vec!["Newbie".to_string()]
        };
        let name = if entry.learner.name.is_empty() {
            "User".to_string()
        } else {
            entry.learner.name.clone()
        };
        let avatar = name
            .chars()
            .next()
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_else(|| "U".to_string());

        summaries.push(StudentSummary {
            id: entry.learner.id,
            name,
            email: entry.learner.email,
            courses: entry.courses,
            progress,
            badges,
            status: "Active".to_string(),
            last_active: entry.learner.created_at.format("%Y-%m-%d").to_string(),
            avatar,
        });
    }

    Ok(summaries)
}

pub fn render_markdown(instructor_email: &str, summaries: &[StudentSummary]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Learner Progress Report");
    let _ = writeln!(output, "Generated for {}", instructor_email);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Students");

    if summaries.is_empty() {
        let _ = writeln!(output, "No enrolled students.");
    } else {
        for summary in summaries {
            let _ = writeln!(
                output,
                "- {} ({}) — {}% across {} course(s), badges: {}, last active {}",
                summary.name,
                summary.email,
                summary.progress,
                summary.courses.len(),
                summary.badges.join(", "),
                summary.last_active
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::memory::MemStore;
    use crate::models::QuizResult;

    async fn attempt(store: &MemStore, learner_id: Uuid, module_id: Uuid, score: i32) {
        store
            .append_result(&QuizResult {
                id: Uuid::new_v4(),
                learner_id,
                module_id,
                score,
                total_questions: 10,
                completed_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn progress_is_the_unweighted_mean_across_courses() {
        let store = MemStore::new();
        let instructor = store.add_user("Maya Okafor", "maya@example.com").await;
        let learner = store.add_user("Avery Lee", "avery@example.com").await;

        let complete = store.add_course("Algorithms", instructor).await;
        let complete_module = store.add_module(complete).await;
        store.enroll(learner, complete).await;
        attempt(&store, learner, complete_module, 10).await;

        let halfway = store.add_course("Databases", instructor).await;
        let halfway_module = store.add_module(halfway).await;
        store.add_module(halfway).await;
        store.enroll(learner, halfway).await;
        attempt(&store, learner, halfway_module, 4).await;

        let summaries = learner_report(&store, instructor).await.unwrap();
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.progress, 75);
        assert_eq!(summary.courses.len(), 2);
        assert_eq!(summary.badges, vec!["Legend".to_string()]);
        assert_eq!(summary.status, "Active");
        assert_eq!(summary.avatar, "A");
    }

    #[tokio::test]
    async fn learners_without_a_complete_course_stay_newbie() {
        let store = MemStore::new();
        let instructor = store.add_user("Maya Okafor", "maya@example.com").await;
        let learner = store.add_user("Jules Moreno", "jules@example.com").await;

        let course = store.add_course("Databases", instructor).await;
        let module = store.add_module(course).await;
        store.add_module(course).await;
        store.enroll(learner, course).await;
        attempt(&store, learner, module, 9).await;

        let summaries = learner_report(&store, instructor).await.unwrap();
        assert_eq!(summaries[0].progress, 50);
        assert_eq!(summaries[0].badges, vec!["Newbie".to_string()]);
    }

    #[tokio::test]
    async fn only_the_instructors_courses_are_reported() {
        let store = MemStore::new();
        let instructor = store.add_user("Maya Okafor", "maya@example.com").await;
        let other = store.add_user("Sam Chen", "sam@example.com").await;
        let learner = store.add_user("Kiara Patel", "kiara@example.com").await;

        let foreign = store.add_course("Statistics", other).await;
        store.add_module(foreign).await;
        store.enroll(learner, foreign).await;

        assert!(learner_report(&store, instructor).await.unwrap().is_empty());

        let summaries = learner_report(&store, other).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].progress, 0);
    }

    #[tokio::test]
    async fn enrolled_learner_with_no_attempts_reports_zero() {
        let store = MemStore::new();
        let instructor = store.add_user("Maya Okafor", "maya@example.com").await;
        let learner = store.add_user("Avery Lee", "avery@example.com").await;
        let course = store.add_course("Algorithms", instructor).await;
        store.add_module(course).await;
        store.enroll(learner, course).await;

        let summaries = learner_report(&store, instructor).await.unwrap();
        assert_eq!(summaries[0].progress, 0);
        assert_eq!(summaries[0].badges, vec!["Newbie".to_string()]);
    }

    #[test]
    fn markdown_lists_each_student() {
        let summaries = vec![StudentSummary {
            id: Uuid::new_v4(),
            name: "Avery Lee".to_string(),
            email: "avery@example.com".to_string(),
            courses: vec!["Algorithms".to_string()],
            progress: 75,
            badges: vec!["Legend".to_string()],
            status: "Active".to_string(),
            last_active: "2026-08-01".to_string(),
            avatar: "A".to_string(),
        }];

        let report = render_markdown("maya@example.com", &summaries);
        assert!(report.contains("# Learner Progress Report"));
        assert!(report.contains("Avery Lee (avery@example.com) — 75%"));

        let empty = render_markdown("maya@example.com", &[]);
        assert!(empty.contains("No enrolled students."));
    }
}
