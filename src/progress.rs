use std::collections::HashSet;

use uuid::Uuid;

use crate::models::{Progress, QuizResult};

/// Completion snapshot for one learner in one course.
///
/// A module counts as completed once the learner has any attempt for it,
/// whatever the score. The percentage truncates (integer division); a course
/// with no modules reports 0 and is never considered complete.
pub fn completion(module_ids: &[Uuid], results: &[QuizResult]) -> Progress {
    let modules: HashSet<Uuid> = module_ids.iter().copied().collect();
    let attempted: HashSet<Uuid> = results
        .iter()
        .map(|r| r.module_id)
        .filter(|id| modules.contains(id))
        .collect();

    let total_modules = modules.len();
    let completed_modules = attempted.len();
    let percent = if total_modules > 0 {
        (completed_modules * 100 / total_modules) as i32
    } else {
        0
    };

    Progress {
        completed_modules,
        total_modules,
        percent,
    }
}

/// Mean of per-attempt percentages over every historical attempt, including
/// failing ones and retakes. Attempts with zero questions are skipped; no
/// usable attempts yields 0.
pub fn average_score(results: &[QuizResult]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;

    for result in results {
        if result.total_questions > 0 {
            sum += result.score as f64 / result.total_questions as f64 * 100.0;
            count += 1;
        }
    }

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn attempt(module_id: Uuid, score: i32, total_questions: i32) -> QuizResult {
        QuizResult {
            id: Uuid::new_v4(),
            learner_id: Uuid::new_v4(),
            module_id,
            score,
            total_questions,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn percent_truncates_instead_of_rounding() {
        let modules = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let results = vec![attempt(modules[0], 5, 10)];

        let snapshot = completion(&modules, &results);
        assert_eq!(snapshot.completed_modules, 1);
        assert_eq!(snapshot.total_modules, 3);
        assert_eq!(snapshot.percent, 33);
    }

    #[test]
    fn repeated_attempts_count_one_module() {
        let modules = vec![Uuid::new_v4(), Uuid::new_v4()];
        let results = vec![
            attempt(modules[0], 2, 10),
            attempt(modules[0], 9, 10),
            attempt(modules[0], 10, 10),
        ];

        let snapshot = completion(&modules, &results);
        assert_eq!(snapshot.completed_modules, 1);
        assert_eq!(snapshot.percent, 50);
    }

    #[test]
    fn attempts_for_other_courses_are_ignored() {
        let modules = vec![Uuid::new_v4()];
        let results = vec![attempt(Uuid::new_v4(), 10, 10)];

        let snapshot = completion(&modules, &results);
        assert_eq!(snapshot.completed_modules, 0);
        assert_eq!(snapshot.percent, 0);
    }

    #[test]
    fn empty_course_is_never_complete() {
        let results = vec![attempt(Uuid::new_v4(), 10, 10)];

        let snapshot = completion(&[], &results);
        assert_eq!(snapshot.total_modules, 0);
        assert_eq!(snapshot.percent, 0);
    }

    #[test]
    fn average_spans_every_attempt() {
        let module = Uuid::new_v4();
        let results = vec![
            attempt(module, 10, 10),
            attempt(module, 9, 10),
            attempt(module, 0, 10),
        ];

        let average = average_score(&results);
        assert!((average - (100.0 + 90.0 + 0.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn zero_question_attempts_are_skipped() {
        let module = Uuid::new_v4();
        let results = vec![attempt(module, 0, 0), attempt(module, 7, 10)];

        let average = average_score(&results);
        assert!((average - 70.0).abs() < 1e-9);
    }

    #[test]
    fn no_usable_attempts_averages_zero() {
        assert_eq!(average_score(&[]), 0.0);
        assert_eq!(average_score(&[attempt(Uuid::new_v4(), 0, 0)]), 0.0);
    }
}
