// src/session/mod.rs

//! Test-session engine.
//!
//! * `bank` turns a subject's questions into a shuffled, prepared bank.
//! * `attempt` is the single-attempt state machine (answers, navigation, scoring).
//! * `timer` drives the countdown of timed attempts.
//! * `service` owns live attempts and persists each result once.

pub mod attempt;
pub mod bank;
pub mod service;
pub mod timer;

use thiserror::Error;
use uuid::Uuid;

use crate::error::StoreError;

pub use attempt::{Attempt, AttemptStatus, AttemptView, Finish, ReviewItem};
pub use bank::{PreparedQuestion, build_bank, load_bank};
pub use service::{AttemptService, FinishOutcome, SessionSettings};

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The subject exists but has no questions. Retrying will not help.
    #[error("subject {0} has no questions")]
    EmptyBank(i64),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("attempt has not started")]
    NotStarted,

    #[error("attempt has already started")]
    AlreadyStarted,

    #[error("attempt is still running")]
    NotFinished,

    /// Unknown id, or an attempt owned by someone else.
    #[error("attempt {0} not found")]
    UnknownAttempt(Uuid),

    #[error("invalid answer: {0}")]
    InvalidAnswer(String),
}
