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

//! # Millrace
//!
//! Relational persistence for a background-job processing system: durable
//! job records with full state history, expirable key-value collections,
//! row-based distributed locks, a worker registry with heartbeat liveness,
//! and queue-provider routing, all behind one [`StorageConnection`] façade.
//!
//! Storage is SQLite through Diesel with an async connection pool. Schema
//! migrations are embedded in the binary and applied with
//! [`Database::run_migrations`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use chrono::{Duration, Utc};
//! use millrace::{Database, JobInvocation, QueueProviderResolver, StorageConnection};
//! # use millrace::queue::{ClaimedJob, QueueProvider};
//! # use millrace::StorageError;
//! # use tokio_util::sync::CancellationToken;
//! # struct NoQueue;
//! # #[async_trait::async_trait]
//! # impl QueueProvider for NoQueue {
//! #     async fn dequeue(
//! #         &self,
//! #         _queues: &[String],
//! #         _cancellation: CancellationToken,
//! #     ) -> Result<Box<dyn ClaimedJob>, StorageError> {
//! #         unimplemented!()
//! #     }
//! # }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let database = Database::new("sqlite://jobs.db", 1);
//! database.run_migrations().await?;
//!
//! let resolver = Arc::new(QueueProviderResolver::new(Arc::new(NoQueue)));
//! let storage = StorageConnection::new(database, resolver);
//!
//! let invocation = JobInvocation {
//!     type_name: "Mailer".to_string(),
//!     method: "send_welcome".to_string(),
//!     arguments: vec!["\"user-42\"".to_string()],
//! };
//! let job_id = storage
//!     .create_expired_job(
//!         &invocation,
//!         "[]",
//!         &HashMap::new(),
//!         Utc::now(),
//!         Duration::days(1),
//!     )
//!     .await?;
//!
//! storage
//!     .set_job_state(
//!         &job_id,
//!         &millrace::JobStateChange {
//!             name: "Enqueued".to_string(),
//!             reason: Some("initial".to_string()),
//!             data: HashMap::new(),
//!         },
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod dal;
pub mod database;
pub mod error;
pub mod models;
pub mod queue;
pub mod storage;

pub use dal::{CollectionDAL, DistributedLockGuard, JobDAL, LockDAL, ServerDAL, DAL};
pub use database::types::{DbTimestamp, DbUuid};
pub use database::Database;
pub use error::StorageError;
pub use models::job::{JobData, JobInvocation, JobStateChange, StateData};
pub use models::server::ServerContext;
pub use queue::{ClaimedJob, QueueProvider, QueueProviderResolver};
pub use storage::StorageConnection;
