// src/exam/mod.rs

//! Exam lifecycle: status resolution, the admin mutation guard and the
//! candidate-side attempt controller.

pub mod attempt;
pub mod guard;
pub mod status;

pub use attempt::{
    AccessDecision, Attempt, AttemptError, AttemptSubmitter, SubmitError, gate_access,
};
pub use guard::{GuardError, GuardState, MutationGuard};
pub use status::{ExamStatus, ExamWindow, resolve_status};
