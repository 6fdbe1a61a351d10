// src/session/bank.rs

use rand::Rng;
use serde::Serialize;

use super::SessionError;
use crate::{
    models::{question::Question, result::AttemptMode},
    repositories::QuestionStore,
};

/// A question prepared for one attempt.
///
/// `answers` holds the four answer texts in shuffled order and
/// `correct_index` points at the correct one. The index is derived by
/// permuting positions, so duplicate answer texts cannot confuse it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedQuestion {
    pub id: i64,
    pub text: String,
    pub answers: [String; 4],
    pub correct_index: usize,
    pub explanation: Option<String>,
}

/// In-place Fisher-Yates: walk from the last index down to 1 and swap
/// each slot with a uniformly chosen slot in `0..=i`.
pub fn shuffle<T, R>(items: &mut [T], rng: &mut R)
where
    R: Rng + ?Sized,
{
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Shuffles the answers of one question.
pub fn prepare_question<R>(question: Question, rng: &mut R) -> PreparedQuestion
where
    R: Rng + ?Sized,
{
    // Slot 0 is the correct answer before shuffling.
    let mut order = [0usize, 1, 2, 3];
    shuffle(&mut order, rng);

    let source = [
        question.correct_answer,
        question.wrong_answer1,
        question.wrong_answer2,
        question.wrong_answer3,
    ];
    let correct_index = order.iter().position(|&slot| slot == 0).unwrap_or(0);
    let answers = order.map(|slot| source[slot].clone());

    PreparedQuestion {
        id: question.id,
        text: question.text,
        answers,
        correct_index,
        explanation: question.explanation,
    }
}

/// Builds the bank for one attempt.
///
/// Question order is shuffled first; timed attempts then keep the first
/// `timed_cap` questions, so the shuffle doubles as the random sample.
pub fn build_bank<R>(
    subject_id: i64,
    mut questions: Vec<Question>,
    mode: AttemptMode,
    timed_cap: usize,
    rng: &mut R,
) -> Result<Vec<PreparedQuestion>, SessionError>
where
    R: Rng + ?Sized,
{
    if questions.is_empty() {
        return Err(SessionError::EmptyBank(subject_id));
    }

    shuffle(&mut questions, rng);
    if mode.is_timed() {
        questions.truncate(timed_cap);
    }

    Ok(questions
        .into_iter()
        .map(|question| prepare_question(question, rng))
        .collect())
}

/// Fetches a subject's questions and prepares a fresh bank.
/// Every call reshuffles; nothing is cached between attempts.
pub async fn load_bank(
    store: &dyn QuestionStore,
    subject_id: i64,
    mode: AttemptMode,
    timed_cap: usize,
) -> Result<Vec<PreparedQuestion>, SessionError> {
    let questions = store.fetch_questions(subject_id).await?;
    tracing::debug!(
        "Loaded {} questions for subject {} ({})",
        questions.len(),
        subject_id,
        mode
    );

    build_bank(subject_id, questions, mode, timed_cap, &mut rand::rng())
}
