// src/session/service.rs

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{
    SessionError,
    attempt::{Advance, Attempt, AttemptView, Finish, ReviewItem},
    bank::load_bank,
    timer::{CountdownHandle, spawn_countdown},
};
use crate::{
    config::Config,
    models::result::{AttemptMode, AttemptResult},
    repositories::{QuestionStore, ResultStore},
};

/// Knobs for the attempt engine.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub time_limit_seconds: u32,
    pub timed_cap: usize,
    /// Length of one countdown second. Tests shorten it.
    pub tick_period: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            time_limit_seconds: config.timed_limit_seconds,
            timed_cap: config.timed_question_cap,
            tick_period: Duration::from_secs(1),
        }
    }
}

/// Result of finishing an attempt.
/// `saved` is false when the results store rejected the write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinishOutcome {
    #[serde(flatten)]
    pub result: AttemptResult,
    pub saved: bool,
}

/// A live attempt plus its countdown, if any.
#[derive(Debug)]
pub struct ActiveAttempt {
    pub(crate) attempt: Mutex<Attempt>,
    countdown: Mutex<Option<CountdownHandle>>,
}

impl ActiveAttempt {
    fn new(attempt: Attempt) -> Self {
        Self {
            attempt: Mutex::new(attempt),
            countdown: Mutex::new(None),
        }
    }

    async fn cancel_countdown(&self) {
        if let Some(handle) = self.countdown.lock().await.take() {
            handle.cancel();
        }
    }
}

/// Persists a result the first time an attempt finishes.
///
/// Only `Finish::Completed` reaches the store, so a result is written at
/// most once however finishing was triggered. A failed write is logged and
/// the computed result is still handed back.
pub(crate) async fn persist_finish(
    results: &dyn ResultStore,
    attempt: &mut Attempt,
    finish: Finish,
) -> FinishOutcome {
    match finish {
        Finish::AlreadyFinished(result) => {
            let saved = result.id.is_some();
            FinishOutcome { result, saved }
        }
        Finish::Completed(result) => match results.save_result(result.clone()).await {
            Ok(saved) => {
                tracing::info!(
                    "Attempt {} finished: user {} subject {} scored {} ({})",
                    attempt.id(),
                    saved.user_id,
                    saved.subject_id,
                    saved.score,
                    saved.mode
                );
                attempt.record_saved(saved.clone());
                FinishOutcome {
                    result: saved,
                    saved: true,
                }
            }
            Err(e) => {
                tracing::error!("Failed to save result of attempt {}: {}", attempt.id(), e);
                FinishOutcome {
                    result,
                    saved: false,
                }
            }
        },
    }
}

#[derive(Default)]
struct Registry {
    attempts: HashMap<Uuid, Arc<ActiveAttempt>>,
    by_user: HashMap<i64, Uuid>,
}

struct Inner {
    questions: Arc<dyn QuestionStore>,
    results: Arc<dyn ResultStore>,
    settings: SessionSettings,
    registry: RwLock<Registry>,
}

/// Owns every live attempt, at most one per user.
///
/// Attempts stay registered after they finish so they can still be viewed
/// and reviewed, until the user starts another one or abandons it.
#[derive(Clone)]
pub struct AttemptService {
    inner: Arc<Inner>,
}

impl AttemptService {
    pub fn new(
        questions: Arc<dyn QuestionStore>,
        results: Arc<dyn ResultStore>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                questions,
                results,
                settings,
                registry: RwLock::new(Registry::default()),
            }),
        }
    }

    /// Loads a fresh bank and starts an attempt.
    /// Any attempt the user already had is discarded without saving.
    pub async fn start(
        &self,
        user_id: i64,
        subject_id: i64,
        mode: AttemptMode,
    ) -> Result<AttemptView, SessionError> {
        let settings = self.inner.settings;
        let bank = load_bank(
            self.inner.questions.as_ref(),
            subject_id,
            mode,
            settings.timed_cap,
        )
        .await?;

        let mut attempt = Attempt::new(
            user_id,
            subject_id,
            mode,
            bank,
            settings.time_limit_seconds,
        )?;
        attempt.start(Utc::now())?;

        let attempt_id = attempt.id();
        let view = attempt.view();
        let active = Arc::new(ActiveAttempt::new(attempt));

        if mode.is_timed() {
            let handle = spawn_countdown(
                Arc::downgrade(&active),
                self.inner.results.clone(),
                settings.tick_period,
            );
            *active.countdown.lock().await = Some(handle);
        }

        let previous = {
            let mut registry = self.inner.registry.write().await;
            let previous = registry
                .by_user
                .insert(user_id, attempt_id)
                .and_then(|old| registry.attempts.remove(&old));
            registry.attempts.insert(attempt_id, active);
            previous
        };

        if let Some(previous) = previous {
            previous.cancel_countdown().await;
            tracing::debug!("Discarded previous attempt of user {}", user_id);
        }

        tracing::info!(
            "User {} started attempt {} on subject {} ({}, {} questions)",
            user_id,
            attempt_id,
            subject_id,
            mode,
            view.total_questions
        );

        Ok(view)
    }

    async fn lookup(
        &self,
        user_id: i64,
        attempt_id: Uuid,
    ) -> Result<Arc<ActiveAttempt>, SessionError> {
        let registry = self.inner.registry.read().await;
        let active = registry
            .attempts
            .get(&attempt_id)
            .ok_or(SessionError::UnknownAttempt(attempt_id))?
            .clone();
        drop(registry);

        if active.attempt.lock().await.user_id() != user_id {
            return Err(SessionError::UnknownAttempt(attempt_id));
        }
        Ok(active)
    }

    pub async fn view(&self, user_id: i64, attempt_id: Uuid) -> Result<AttemptView, SessionError> {
        let active = self.lookup(user_id, attempt_id).await?;
        let attempt = active.attempt.lock().await;
        Ok(attempt.view())
    }

    pub async fn select_answer(
        &self,
        user_id: i64,
        attempt_id: Uuid,
        question_id: i64,
        choice: usize,
    ) -> Result<AttemptView, SessionError> {
        if choice > 3 {
            return Err(SessionError::InvalidAnswer(format!(
                "choice {} is out of range 0..=3",
                choice
            )));
        }

        let active = self.lookup(user_id, attempt_id).await?;
        let mut attempt = active.attempt.lock().await;
        // Ids outside the bank are kept but never scored.
        attempt.select_answer(question_id, choice);
        Ok(attempt.view())
    }

    /// Moves forward; advancing past the last question finishes the attempt.
    pub async fn advance(&self, user_id: i64, attempt_id: Uuid) -> Result<AttemptView, SessionError> {
        let active = self.lookup(user_id, attempt_id).await?;
        let mut attempt = active.attempt.lock().await;

        let finished = match attempt.advance(Utc::now())? {
            Advance::Moved(_) => false,
            Advance::Finished(finish) => {
                persist_finish(self.inner.results.as_ref(), &mut attempt, finish).await;
                true
            }
        };
        let view = attempt.view();
        drop(attempt);

        if finished {
            active.cancel_countdown().await;
        }
        Ok(view)
    }

    pub async fn previous(&self, user_id: i64, attempt_id: Uuid) -> Result<AttemptView, SessionError> {
        let active = self.lookup(user_id, attempt_id).await?;
        let mut attempt = active.attempt.lock().await;
        attempt.previous();
        Ok(attempt.view())
    }

    pub async fn go_to(
        &self,
        user_id: i64,
        attempt_id: Uuid,
        index: usize,
    ) -> Result<AttemptView, SessionError> {
        let active = self.lookup(user_id, attempt_id).await?;
        let mut attempt = active.attempt.lock().await;
        attempt.go_to(index);
        Ok(attempt.view())
    }

    /// Finishes the attempt. Repeated calls return the same result.
    pub async fn finish(&self, user_id: i64, attempt_id: Uuid) -> Result<FinishOutcome, SessionError> {
        let active = self.lookup(user_id, attempt_id).await?;

        let outcome = {
            let mut attempt = active.attempt.lock().await;
            let finish = attempt.finish(Utc::now())?;
            persist_finish(self.inner.results.as_ref(), &mut attempt, finish).await
        };

        active.cancel_countdown().await;
        Ok(outcome)
    }

    pub async fn review(
        &self,
        user_id: i64,
        attempt_id: Uuid,
    ) -> Result<Vec<ReviewItem>, SessionError> {
        let active = self.lookup(user_id, attempt_id).await?;
        let attempt = active.attempt.lock().await;
        attempt.review().ok_or(SessionError::NotFinished)
    }

    /// Drops an attempt without saving anything.
    pub async fn abandon(&self, user_id: i64, attempt_id: Uuid) -> Result<(), SessionError> {
        let active = self.lookup(user_id, attempt_id).await?;

        {
            let mut registry = self.inner.registry.write().await;
            registry.attempts.remove(&attempt_id);
            if registry.by_user.get(&user_id) == Some(&attempt_id) {
                registry.by_user.remove(&user_id);
            }
        }

        active.cancel_countdown().await;
        tracing::info!("User {} abandoned attempt {}", user_id, attempt_id);
        Ok(())
    }

    /// Id of the user's current attempt, finished or not.
    pub async fn current_for(&self, user_id: i64) -> Option<Uuid> {
        self.inner.registry.read().await.by_user.get(&user_id).copied()
    }

    pub async fn active_count(&self) -> usize {
        self.inner.registry.read().await.attempts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::StoreError,
        models::question::NewQuestion,
        repositories::{CatalogStore, MemoryStore, StoreResult},
        session::AttemptStatus,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts writes and can be told to fail them.
    #[derive(Default)]
    struct RecordingResults {
        saves: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ResultStore for RecordingResults {
        async fn save_result(&self, mut result: AttemptResult) -> StoreResult<AttemptResult> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Backend("results table offline".to_string()));
            }
            result.id = Some(self.saves.load(Ordering::SeqCst) as i64);
            Ok(result)
        }

        async fn list_results(
            &self,
            _user_id: i64,
            _limit: Option<i64>,
        ) -> StoreResult<Vec<AttemptResult>> {
            Ok(Vec::new())
        }
    }

    async fn seeded_store(questions: usize) -> (MemoryStore, i64) {
        let store = MemoryStore::new();
        let faculty = store.create_faculty("Engineering").await.unwrap();
        let subject = store.create_subject("Statics", faculty.id).await.unwrap();

        let rows = (0..questions)
            .map(|i| NewQuestion {
                subject_id: subject.id,
                text: format!("Question {}", i),
                correct_answer: format!("right {}", i),
                wrong_answers: [
                    format!("wrong a {}", i),
                    format!("wrong b {}", i),
                    format!("wrong c {}", i),
                ],
                explanation: None,
            })
            .collect();
        store.create_questions(rows).await.unwrap();

        (store, subject.id)
    }

    fn settings(limit: u32) -> SessionSettings {
        SessionSettings {
            time_limit_seconds: limit,
            timed_cap: 25,
            tick_period: Duration::from_secs(1),
        }
    }

    fn service(
        store: &MemoryStore,
        results: Arc<dyn ResultStore>,
        limit: u32,
    ) -> AttemptService {
        AttemptService::new(Arc::new(store.clone()), results, settings(limit))
    }

    #[tokio::test]
    async fn test_answer_all_and_finish_saves_once() {
        let (store, subject_id) = seeded_store(4).await;
        let results = Arc::new(RecordingResults::default());
        let service = service(&store, results.clone(), 60);

        let view = service.start(1, subject_id, AttemptMode::Untimed).await.unwrap();
        assert_eq!(view.total_questions, 4);
        let id = view.attempt_id;

        let question = view.question.unwrap();
        let right = question
            .answers
            .iter()
            .position(|a| a.starts_with("right"))
            .unwrap();
        service.select_answer(1, id, question.id, right).await.unwrap();

        let first = service.finish(1, id).await.unwrap();
        let second = service.finish(1, id).await.unwrap();

        assert!(first.saved);
        assert_eq!(first.result.correct_count, 1);
        assert_eq!(first.result.score, 25);
        assert_eq!(first, second);
        assert_eq!(results.saves.load(Ordering::SeqCst), 1);

        let review = service.review(1, id).await.unwrap();
        assert_eq!(review.len(), 4);
        assert_eq!(review.iter().filter(|r| r.is_correct).count(), 1);
    }

    #[tokio::test]
    async fn test_advancing_past_last_question_finishes() {
        let (store, subject_id) = seeded_store(2).await;
        let results = Arc::new(RecordingResults::default());
        let service = service(&store, results.clone(), 60);

        let id = service
            .start(1, subject_id, AttemptMode::Untimed)
            .await
            .unwrap()
            .attempt_id;

        assert_eq!(service.advance(1, id).await.unwrap().position, 1);
        let view = service.advance(1, id).await.unwrap();

        assert_eq!(view.status, AttemptStatus::Finished);
        assert!(view.result.unwrap().id.is_some());
        assert_eq!(results.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_save_still_returns_result() {
        let (store, subject_id) = seeded_store(3).await;
        let results = Arc::new(RecordingResults {
            fail: true,
            ..Default::default()
        });
        let service = service(&store, results.clone(), 60);

        let id = service
            .start(1, subject_id, AttemptMode::Untimed)
            .await
            .unwrap()
            .attempt_id;

        let outcome = service.finish(1, id).await.unwrap();
        assert!(!outcome.saved);
        assert_eq!(outcome.result.id, None);
        assert_eq!(outcome.result.total_questions, 3);

        // The write is not retried on the next finish.
        let again = service.finish(1, id).await.unwrap();
        assert!(!again.saved);
        assert_eq!(results.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_subject_is_reported() {
        let (store, subject_id) = seeded_store(0).await;
        let service = service(&store, Arc::new(RecordingResults::default()), 60);

        let err = service
            .start(1, subject_id, AttemptMode::Untimed)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::EmptyBank(id) if id == subject_id));
    }

    #[tokio::test]
    async fn test_missing_subject_is_not_found() {
        let (store, _) = seeded_store(1).await;
        let service = service(&store, Arc::new(RecordingResults::default()), 60);

        let err = service.start(1, 9999, AttemptMode::Timed).await.unwrap_err();
        assert!(matches!(err, SessionError::Store(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_attempts_are_private_to_their_owner() {
        let (store, subject_id) = seeded_store(2).await;
        let service = service(&store, Arc::new(RecordingResults::default()), 60);

        let id = service
            .start(1, subject_id, AttemptMode::Untimed)
            .await
            .unwrap()
            .attempt_id;

        assert!(matches!(
            service.view(2, id).await,
            Err(SessionError::UnknownAttempt(_))
        ));
        assert!(matches!(
            service.finish(2, id).await,
            Err(SessionError::UnknownAttempt(_))
        ));
    }

    #[tokio::test]
    async fn test_out_of_range_choice_rejected() {
        let (store, subject_id) = seeded_store(2).await;
        let service = service(&store, Arc::new(RecordingResults::default()), 60);

        let view = service.start(1, subject_id, AttemptMode::Untimed).await.unwrap();
        let question_id = view.question.unwrap().id;

        assert!(matches!(
            service.select_answer(1, view.attempt_id, question_id, 4).await,
            Err(SessionError::InvalidAnswer(_))
        ));

        let view = service
            .select_answer(1, view.attempt_id, -1, 0)
            .await
            .unwrap();
        assert_eq!(view.answered_count, 0);
    }

    #[tokio::test]
    async fn test_review_requires_finished_attempt() {
        let (store, subject_id) = seeded_store(2).await;
        let service = service(&store, Arc::new(RecordingResults::default()), 60);

        let id = service
            .start(1, subject_id, AttemptMode::Untimed)
            .await
            .unwrap()
            .attempt_id;

        assert!(matches!(
            service.review(1, id).await,
            Err(SessionError::NotFinished)
        ));
    }

    #[tokio::test]
    async fn test_starting_again_discards_previous_attempt() {
        let (store, subject_id) = seeded_store(3).await;
        let results = Arc::new(RecordingResults::default());
        let service = service(&store, results.clone(), 60);

        let first = service
            .start(1, subject_id, AttemptMode::Untimed)
            .await
            .unwrap()
            .attempt_id;
        let second = service
            .start(1, subject_id, AttemptMode::Untimed)
            .await
            .unwrap()
            .attempt_id;

        assert_ne!(first, second);
        assert_eq!(service.active_count().await, 1);
        assert_eq!(service.current_for(1).await, Some(second));
        assert!(service.view(1, first).await.is_err());
        assert_eq!(results.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_expiry_saves_exactly_once() {
        let (store, subject_id) = seeded_store(30).await;
        let results = Arc::new(RecordingResults::default());
        let service = service(&store, results.clone(), 3);

        let view = service.start(1, subject_id, AttemptMode::Timed).await.unwrap();
        assert_eq!(view.total_questions, 25);
        assert_eq!(view.remaining_seconds, Some(3));

        tokio::time::sleep(Duration::from_millis(3500)).await;

        let view = service.view(1, view.attempt_id).await.unwrap();
        assert_eq!(view.status, AttemptStatus::Finished);
        assert_eq!(view.remaining_seconds, Some(0));

        let result = view.result.unwrap();
        assert_eq!(result.mode, AttemptMode::Timed);
        assert_eq!(result.elapsed_seconds, 3);
        assert!(result.id.is_some());

        // A late manual finish gets the saved result back.
        let outcome = service.finish(1, view.attempt_id).await.unwrap();
        assert!(outcome.saved);
        assert_eq!(outcome.result, result);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(results.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_timed_attempt_never_saves() {
        let (store, subject_id) = seeded_store(5).await;
        let results = Arc::new(RecordingResults::default());
        let service = service(&store, results.clone(), 2);

        let id = service
            .start(1, subject_id, AttemptMode::Timed)
            .await
            .unwrap()
            .attempt_id;
        service.abandon(1, id).await.unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(results.saves.load(Ordering::SeqCst), 0);
        assert_eq!(service.active_count().await, 0);
        assert!(service.current_for(1).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replaced_timed_attempt_stops_counting() {
        let (store, subject_id) = seeded_store(5).await;
        let results = Arc::new(RecordingResults::default());
        let service = service(&store, results.clone(), 2);

        service.start(1, subject_id, AttemptMode::Timed).await.unwrap();
        let second = service
            .start(1, subject_id, AttemptMode::Untimed)
            .await
            .unwrap()
            .attempt_id;

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(results.saves.load(Ordering::SeqCst), 0);
        let view = service.view(1, second).await.unwrap();
        assert_eq!(view.status, AttemptStatus::InProgress);
    }
}
