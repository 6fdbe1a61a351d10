// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{
    config::Config,
    entitlement::OperatorAllowlist,
    repositories::{CatalogStore, MemoryStore, PgStore, QuestionStore, ResultStore, UserStore},
    session::{AttemptService, SessionSettings},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub operators: OperatorAllowlist,
    pub catalog: Arc<dyn CatalogStore>,
    pub questions: Arc<dyn QuestionStore>,
    pub results: Arc<dyn ResultStore>,
    pub users: Arc<dyn UserStore>,
    pub attempts: AttemptService,
}

impl AppState {
    /// Wires every store trait to one backing implementation.
    pub fn new<S>(config: Config, store: Arc<S>) -> Self
    where
        S: CatalogStore + QuestionStore + ResultStore + UserStore + 'static,
    {
        Self::with_settings(config.clone(), store, SessionSettings::from_config(&config))
    }

    pub fn with_settings<S>(config: Config, store: Arc<S>, settings: SessionSettings) -> Self
    where
        S: CatalogStore + QuestionStore + ResultStore + UserStore + 'static,
    {
        let questions: Arc<dyn QuestionStore> = store.clone();
        let results: Arc<dyn ResultStore> = store.clone();

        Self {
            operators: config.operator_allowlist(),
            config,
            catalog: store.clone(),
            attempts: AttemptService::new(questions.clone(), results.clone(), settings),
            questions,
            results,
            users: store,
        }
    }

    pub fn with_postgres(pool: PgPool, config: Config) -> Self {
        Self::new(config, Arc::new(PgStore::new(pool)))
    }

    pub fn in_memory(config: Config) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for AttemptService {
    fn from_ref(state: &AppState) -> Self {
        state.attempts.clone()
    }
}
