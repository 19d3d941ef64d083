use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One recorded quiz attempt. Append-only: every attempt is kept, including
/// retakes after the course is already complete.
#[derive(Debug, Clone, Serialize)]
pub struct QuizResult {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub module_id: Uuid,
    pub score: i32,
    pub total_questions: i32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CourseInfo {
    pub id: Uuid,
    pub title: String,
    pub instructor_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Badge {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone)]
pub struct Batch {
    pub id: Uuid,
    pub course_id: Uuid,
    pub tier: Tier,
    pub instructor_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Performance band derived from a learner's average score across every
/// attempt in a course. Lower bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Diamond,
}

impl Tier {
    pub fn for_average(average: f64) -> Self {
        if average >= 90.0 {
            Tier::Diamond
        } else if average >= 80.0 {
            Tier::Gold
        } else if average >= 70.0 {
            Tier::Silver
        } else {
            Tier::Bronze
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Bronze => "Bronze",
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
            Tier::Diamond => "Diamond",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Bronze" => Some(Tier::Bronze),
            "Silver" => Some(Tier::Silver),
            "Gold" => Some(Tier::Gold),
            "Diamond" => Some(Tier::Diamond),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion snapshot for one (learner, course) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed_modules: usize,
    pub total_modules: usize,
    pub percent: i32,
}

/// One row of the instructor-facing learner report. Field names mirror the
/// payload the dashboard consumes.
#[derive(Debug, Clone, Serialize)]
pub struct StudentSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub courses: Vec<String>,
    pub progress: i32,
    pub badges: Vec<String>,
    pub status: String,
    #[serde(rename = "lastActive")]
    pub last_active: String,
    pub avatar: String,
}
