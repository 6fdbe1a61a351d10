// src/session/attempt.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{PreparedQuestion, SessionError};
use crate::models::result::{AttemptMode, AttemptResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Idle,
    InProgress,
    Finished,
}

/// Outcome of finishing. Only `Completed` should be persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum Finish {
    Completed(AttemptResult),
    AlreadyFinished(AttemptResult),
}

impl Finish {
    pub fn result(&self) -> &AttemptResult {
        match self {
            Finish::Completed(result) | Finish::AlreadyFinished(result) => result,
        }
    }

    pub fn into_result(self) -> AttemptResult {
        match self {
            Finish::Completed(result) | Finish::AlreadyFinished(result) => result,
        }
    }

    pub fn is_first(&self) -> bool {
        matches!(self, Finish::Completed(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Moved(usize),
    Finished(Finish),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// Seconds left after this tick.
    Running(u32),
    Expired(Finish),
    /// Untimed, not started or already finished: nothing to count down.
    Inactive,
}

/// The question currently on screen. The correct index is withheld.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: i64,
    pub text: String,
    pub answers: [String; 4],
}

/// Snapshot of an attempt for the client.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptView {
    pub attempt_id: Uuid,
    pub subject_id: i64,
    pub mode: AttemptMode,
    pub status: AttemptStatus,
    pub position: usize,
    pub total_questions: usize,
    pub answered_count: usize,
    pub remaining_seconds: Option<u32>,
    pub question: Option<QuestionView>,
    pub selected: Option<usize>,
    pub result: Option<AttemptResult>,
}

/// One line of the post-attempt review.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewItem {
    pub question_id: i64,
    pub text: String,
    pub answers: [String; 4],
    pub correct_index: usize,
    pub selected: Option<usize>,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

/// One quiz attempt from prepared bank to scored result.
///
/// Idle -> InProgress on `start`; InProgress -> Finished on `finish`,
/// on `advance` past the last question, or when a timed countdown hits zero.
/// Finished is terminal and keeps the result it computed.
#[derive(Debug, Clone)]
pub struct Attempt {
    id: Uuid,
    user_id: i64,
    subject_id: i64,
    mode: AttemptMode,
    questions: Vec<PreparedQuestion>,
    position: usize,
    /// Question id -> index into that question's shuffled answers.
    selections: HashMap<i64, usize>,
    started_at: Option<DateTime<Utc>>,
    time_limit: Option<u32>,
    remaining: Option<u32>,
    status: AttemptStatus,
    result: Option<AttemptResult>,
}

impl Attempt {
    /// `time_limit_seconds` only applies to timed attempts.
    pub fn new(
        user_id: i64,
        subject_id: i64,
        mode: AttemptMode,
        questions: Vec<PreparedQuestion>,
        time_limit_seconds: u32,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::EmptyBank(subject_id));
        }

        let time_limit = mode.is_timed().then_some(time_limit_seconds);

        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            subject_id,
            mode,
            questions,
            position: 0,
            selections: HashMap::new(),
            started_at: None,
            time_limit,
            remaining: None,
            status: AttemptStatus::Idle,
            result: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn subject_id(&self) -> i64 {
        self.subject_id
    }

    pub fn mode(&self) -> AttemptMode {
        self.mode
    }

    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn remaining_seconds(&self) -> Option<u32> {
        self.remaining
    }

    pub fn questions(&self) -> &[PreparedQuestion] {
        &self.questions
    }

    pub fn selection(&self, question_id: i64) -> Option<usize> {
        self.selections.get(&question_id).copied()
    }

    pub fn result(&self) -> Option<&AttemptResult> {
        self.result.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.status == AttemptStatus::Finished
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.status != AttemptStatus::Idle {
            return Err(SessionError::AlreadyStarted);
        }
        self.status = AttemptStatus::InProgress;
        self.started_at = Some(now);
        self.remaining = self.time_limit;
        Ok(())
    }

    /// Records a choice; the latest choice for a question wins.
    /// Returns false when the attempt is not running.
    pub fn select_answer(&mut self, question_id: i64, choice: usize) -> bool {
        if self.status != AttemptStatus::InProgress {
            return false;
        }
        self.selections.insert(question_id, choice);
        true
    }

    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<Advance, SessionError> {
        match self.status {
            AttemptStatus::Idle => Err(SessionError::NotStarted),
            AttemptStatus::Finished => Ok(Advance::Finished(self.finish(now)?)),
            AttemptStatus::InProgress => {
                if self.position + 1 < self.questions.len() {
                    self.position += 1;
                    Ok(Advance::Moved(self.position))
                } else {
                    Ok(Advance::Finished(self.finish(now)?))
                }
            }
        }
    }

    /// Steps back one question, stopping at the first. Untimed only.
    pub fn previous(&mut self) -> usize {
        if self.free_navigation() {
            self.position = self.position.saturating_sub(1);
        }
        self.position
    }

    /// Jumps to a question, clamped to the bank. Untimed only.
    pub fn go_to(&mut self, index: usize) -> usize {
        if self.free_navigation() {
            self.position = index.min(self.questions.len() - 1);
        }
        self.position
    }

    fn free_navigation(&self) -> bool {
        self.status == AttemptStatus::InProgress && !self.mode.is_timed()
    }

    /// Counts down one second. Reaching zero finishes the attempt.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        if self.status != AttemptStatus::InProgress {
            return Tick::Inactive;
        }
        let Some(remaining) = self.remaining else {
            return Tick::Inactive;
        };

        let remaining = remaining.saturating_sub(1);
        self.remaining = Some(remaining);

        if remaining > 0 {
            return Tick::Running(remaining);
        }

        match self.finish(now) {
            Ok(finish) => Tick::Expired(finish),
            Err(_) => Tick::Inactive,
        }
    }

    /// Scores the attempt. Later calls return the cached result unchanged.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<Finish, SessionError> {
        match self.status {
            AttemptStatus::Idle => Err(SessionError::NotStarted),
            AttemptStatus::Finished => match &self.result {
                Some(result) => Ok(Finish::AlreadyFinished(result.clone())),
                None => Err(SessionError::NotStarted),
            },
            AttemptStatus::InProgress => {
                let result = self.compute_result(now);
                self.status = AttemptStatus::Finished;
                self.result = Some(result.clone());
                Ok(Finish::Completed(result))
            }
        }
    }

    /// Replaces the cached result with the persisted copy (id assigned).
    pub fn record_saved(&mut self, saved: AttemptResult) {
        if self.is_finished() {
            self.result = Some(saved);
        }
    }

    pub fn correct_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| self.selections.get(&q.id) == Some(&q.correct_index))
            .count()
    }

    fn compute_result(&self, now: DateTime<Utc>) -> AttemptResult {
        let total = self.questions.len();
        let correct = self.correct_count();

        let elapsed_seconds = match (self.time_limit, self.remaining) {
            (Some(limit), Some(remaining)) => i64::from(limit.saturating_sub(remaining)),
            _ => self
                .started_at
                .map(|started| (now - started).num_seconds().max(0))
                .unwrap_or(0),
        };

        AttemptResult {
            id: None,
            user_id: self.user_id,
            subject_id: self.subject_id,
            score: score_percent(correct, total),
            total_questions: total as i32,
            correct_count: correct as i32,
            elapsed_seconds,
            mode: self.mode,
            created_at: now,
        }
    }

    pub fn view(&self) -> AttemptView {
        let current = (!self.is_finished())
            .then(|| self.questions.get(self.position))
            .flatten();

        AttemptView {
            attempt_id: self.id,
            subject_id: self.subject_id,
            mode: self.mode,
            status: self.status,
            position: self.position,
            total_questions: self.questions.len(),
            answered_count: self
                .questions
                .iter()
                .filter(|q| self.selections.contains_key(&q.id))
                .count(),
            remaining_seconds: self.remaining,
            question: current.map(|q| QuestionView {
                id: q.id,
                text: q.text.clone(),
                answers: q.answers.clone(),
            }),
            selected: current.and_then(|q| self.selection(q.id)),
            result: self.result.clone(),
        }
    }

    /// Per-question breakdown, available once the attempt is finished.
    pub fn review(&self) -> Option<Vec<ReviewItem>> {
        if !self.is_finished() {
            return None;
        }

        Some(
            self.questions
                .iter()
                .map(|q| {
                    let selected = self.selection(q.id);
                    ReviewItem {
                        question_id: q.id,
                        text: q.text.clone(),
                        answers: q.answers.clone(),
                        correct_index: q.correct_index,
                        selected,
                        is_correct: selected == Some(q.correct_index),
                        explanation: q.explanation.clone(),
                    }
                })
                .collect(),
        )
    }
}

/// round(100 * correct / total), half up, in integer arithmetic.
pub fn score_percent(correct: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    ((200 * correct + total) / (2 * total)) as i32
}
