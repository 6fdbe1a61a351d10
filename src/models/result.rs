// src/models/result.rs

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// How an attempt is run.
///
/// Untimed attempts use the whole bank with free navigation and are tagged `PRACTICE`.
/// Timed attempts use a capped bank with a countdown and are tagged `TRAINING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttemptMode {
    #[serde(rename = "PRACTICE")]
    Untimed,
    #[serde(rename = "TRAINING")]
    Timed,
}

impl AttemptMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptMode::Untimed => "PRACTICE",
            AttemptMode::Timed => "TRAINING",
        }
    }

    pub fn is_timed(&self) -> bool {
        matches!(self, AttemptMode::Timed)
    }
}

impl FromStr for AttemptMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRACTICE" => Ok(AttemptMode::Untimed),
            "TRAINING" => Ok(AttemptMode::Timed),
            other => Err(format!("unknown attempt mode '{other}'")),
        }
    }
}

impl fmt::Display for AttemptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scored outcome of one finished attempt.
/// `id` is assigned by the results store; `None` means it was never saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub id: Option<i64>,
    pub user_id: i64,
    pub subject_id: i64,
    /// Percentage in 0..=100, rounded half up.
    pub score: i32,
    pub total_questions: i32,
    pub correct_count: i32,
    pub elapsed_seconds: i64,
    pub mode: AttemptMode,
    pub created_at: DateTime<Utc>,
}

/// Raw 'results' row; `mode` is stored as TEXT.
#[derive(Debug, FromRow)]
pub struct ResultRow {
    pub id: i64,
    pub user_id: i64,
    pub subject_id: i64,
    pub score: i32,
    pub total_questions: i32,
    pub correct_count: i32,
    pub elapsed_seconds: i64,
    pub mode: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ResultRow> for AttemptResult {
    type Error = String;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        Ok(AttemptResult {
            id: Some(row.id),
            user_id: row.user_id,
            subject_id: row.subject_id,
            score: row.score,
            total_questions: row.total_questions,
            correct_count: row.correct_count,
            elapsed_seconds: row.elapsed_seconds,
            mode: row.mode.parse()?,
            created_at: row.created_at,
        })
    }
}

/// Aggregates for one subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectStats {
    pub subject_id: i64,
    pub attempts: i64,
    pub average_score: i32,
    pub best_score: i32,
}

/// Aggregate statistics over a user's results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultStats {
    pub attempts: i64,
    pub average_score: i32,
    pub best_score: i32,
    pub total_correct: i64,
    pub total_questions: i64,
    pub by_mode: BTreeMap<AttemptMode, i64>,
    pub by_subject: Vec<SubjectStats>,
}

impl ResultStats {
    pub fn from_results(results: &[AttemptResult]) -> Self {
        let mut by_mode = BTreeMap::new();
        let mut subjects: BTreeMap<i64, Vec<i32>> = BTreeMap::new();

        for result in results {
            *by_mode.entry(result.mode).or_insert(0) += 1;
            subjects.entry(result.subject_id).or_default().push(result.score);
        }

        let scores: Vec<i32> = results.iter().map(|r| r.score).collect();

        Self {
            attempts: results.len() as i64,
            average_score: rounded_mean(&scores),
            best_score: scores.iter().copied().max().unwrap_or(0),
            total_correct: results.iter().map(|r| i64::from(r.correct_count)).sum(),
            total_questions: results.iter().map(|r| i64::from(r.total_questions)).sum(),
            by_mode,
            by_subject: subjects
                .into_iter()
                .map(|(subject_id, scores)| SubjectStats {
                    subject_id,
                    attempts: scores.len() as i64,
                    average_score: rounded_mean(&scores),
                    best_score: scores.iter().copied().max().unwrap_or(0),
                })
                .collect(),
        }
    }
}

/// Mean of non-negative scores, rounded half up.
fn rounded_mean(scores: &[i32]) -> i32 {
    if scores.is_empty() {
        return 0;
    }
    let sum: i64 = scores.iter().map(|s| i64::from(*s)).sum();
    let n = scores.len() as i64;
    ((2 * sum + n) / (2 * n)) as i32
}
