use chrono::Utc;
use uuid::Uuid;

use crate::models::{Badge, Notification, Tier};

/// Notification for a newly granted course-completion badge.
pub fn badge_earned(user_id: Uuid, badge: &Badge) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        user_id,
        title: "Achievement unlocked".to_string(),
        message: format!("You earned the \"{}\" badge.", badge.name),
        kind: "success".to_string(),
        is_read: false,
        created_at: Utc::now(),
    }
}

/// Notification for a newly joined performance cohort.
pub fn cohort_joined(user_id: Uuid, tier: Tier, course_title: &str, average: f64) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        user_id,
        title: "Cohort placement".to_string(),
        message: format!(
            "You joined the {} cohort for {} with an average score of {}%.",
            tier,
            course_title,
            average.round() as i64
        ),
        kind: "info".to_string(),
        is_read: false,
        created_at: Utc::now(),
    }
}
