// src/repositories/postgres/mod.rs

mod catalog;
mod question;
mod result;
mod user;

use sqlx::PgPool;

/// sqlx-backed store. One pool serves every trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
