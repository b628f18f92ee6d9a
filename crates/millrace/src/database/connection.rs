/*
 *  Copyright 2026 Millrace Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Database connection management.
//!
//! Provides an async connection pool over SQLite using `deadpool-diesel`.
//! Accepted connection strings: a file path, `sqlite://` URLs, `file:` URIs,
//! or `:memory:` for in-memory databases.

use deadpool_diesel::sqlite::{Manager as SqliteManager, Pool as SqlitePool, Runtime};
use tracing::info;

use crate::error::StorageError;

/// A pool of SQLite connections shared by all storage components.
///
/// `Database` is `Clone`; each clone references the same underlying pool.
/// Concurrency correctness across worker processes comes from SQLite
/// transactions, not from anything held in this struct.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Creates a new connection pool.
    ///
    /// `max_size` is accepted for API symmetry but clamped to 1: SQLite has
    /// limited concurrent write support even with WAL mode, and a single
    /// connection avoids "database is locked" errors under load.
    ///
    /// # Panics
    ///
    /// Panics if the pool cannot be created.
    pub fn new(connection_string: &str, max_size: u32) -> Self {
        let _ = max_size;
        let connection_url = Self::build_sqlite_url(connection_string);
        let manager = SqliteManager::new(connection_url, Runtime::Tokio1);
        let pool_size = 1;
        let pool = SqlitePool::builder(manager)
            .max_size(pool_size)
            .build()
            .expect("Failed to create SQLite connection pool");

        info!("SQLite connection pool initialized (size: {})", pool_size);

        Self { pool }
    }

    /// Creates a pool from the `DATABASE_URL` environment variable, loading
    /// a `.env` file first when one is present.
    pub fn from_env() -> Result<Self, StorageError> {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| StorageError::Configuration("DATABASE_URL is not set".to_string()))?;
        Ok(Self::new(&url, 1))
    }

    /// Returns a clone of the connection pool.
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    /// Gets a pooled connection.
    pub async fn get_connection(
        &self,
    ) -> Result<deadpool::managed::Object<SqliteManager>, StorageError> {
        self.pool
            .get()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))
    }

    /// Builds a SQLite connection URL.
    fn build_sqlite_url(connection_string: &str) -> String {
        // Strip sqlite:// prefix if present
        if let Some(path) = connection_string.strip_prefix("sqlite://") {
            path.to_string()
        } else {
            connection_string.to_string()
        }
    }

    /// Runs pending migrations and sets the concurrency pragmas.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        use diesel::prelude::*;
        use diesel_migrations::MigrationHarness;

        let conn = self.get_connection().await?;
        conn.interact(|conn| {
            // WAL mode allows concurrent reads during writes
            diesel::sql_query("PRAGMA journal_mode=WAL;").execute(conn)?;
            // busy_timeout makes SQLite wait instead of immediately failing on locks
            diesel::sql_query("PRAGMA busy_timeout=30000;").execute(conn)?;

            conn.run_pending_migrations(crate::database::MIGRATIONS)
                .map_err(|e| StorageError::Migration(e.to_string()))?;
            Ok::<_, StorageError>(())
        })
        .await
        .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        info!("Database migrations applied");
        Ok(())
    }
}
