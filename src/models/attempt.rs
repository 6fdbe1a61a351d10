// src/models/attempt.rs

use serde::Deserialize;
use validator::Validate;

use super::result::AttemptMode;

/// DTO for starting an attempt.
#[derive(Debug, Deserialize)]
pub struct StartAttemptRequest {
    pub subject_id: i64,
    pub mode: AttemptMode,
}

/// DTO for recording an answer. `choice` indexes the shuffled answers.
#[derive(Debug, Deserialize, Validate)]
pub struct AnswerRequest {
    pub question_id: i64,
    #[validate(range(max = 3, message = "Choice must be between 0 and 3."))]
    pub choice: usize,
}

#[derive(Debug, Deserialize)]
pub struct GoToRequest {
    pub index: usize,
}
