// src/exam/status.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// The slice of an exam the lifecycle depends on.
/// Dates are epoch milliseconds; `end_date > start_date` is enforced when the exam is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamWindow {
    pub is_active: bool,
    pub start_date: i64,
    pub end_date: i64,
}

/// Derived lifecycle status of an exam. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    Active,
    Upcoming,
    Completed,
    Inactive,
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamStatus::Active => "active",
            ExamStatus::Upcoming => "upcoming",
            ExamStatus::Completed => "completed",
            ExamStatus::Inactive => "inactive",
        }
    }

    /// Only an active exam may be started or continued by a candidate.
    pub fn permits_attempt(&self) -> bool {
        matches!(self, ExamStatus::Active)
    }

    /// Mutating an active exam may disturb candidates who are mid-attempt.
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, ExamStatus::Active)
    }
}

impl fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves the lifecycle status of an exam at `now`.
///
/// The checks form a precedence chain: the administrative flag wins over the
/// window, and both window bounds are inclusive.
pub fn resolve_status(exam: &ExamWindow, now: i64) -> ExamStatus {
    if !exam.is_active {
        ExamStatus::Inactive
    } else if now < exam.start_date {
        ExamStatus::Upcoming
    } else if now > exam.end_date {
        ExamStatus::Completed
    } else {
        ExamStatus::Active
    }
}
