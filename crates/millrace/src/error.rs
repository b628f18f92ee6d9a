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

//! Storage error taxonomy.
//!
//! Malformed *inputs* to a call error synchronously; lookups of unknown
//! subjects (jobs, hashes, servers) return empty/zero/negative sentinels
//! instead. Transactional and pool failures propagate unchanged; retry
//! policy belongs to the caller.

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the storage core.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A required input was empty or absent. Carries the parameter name.
    #[error("invalid argument `{0}`: value must be provided and non-empty")]
    InvalidArgument(&'static str),

    /// A malformed numeric range, e.g. an upper score bound below the lower.
    #[error("invalid range: upper bound {to} is below lower bound {from}")]
    InvalidRange { from: f64, to: f64 },

    /// The requested queue names span more than one dequeue provider.
    #[error("queues {queues:?} are served by multiple providers; a single fetch cannot span heterogeneous backends")]
    AmbiguousRouting { queues: Vec<String> },

    /// A distributed lock was not acquired within the requested window.
    #[error("lock on `{resource}` was not acquired within {timeout:?}")]
    LockTimeout { resource: String, timeout: Duration },

    /// Connection pool or cross-thread dispatch failure.
    #[error("connection pool error: {0}")]
    ConnectionPool(String),

    /// The environment did not supply a usable configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Migration failure during startup.
    #[error("migration error: {0}")]
    Migration(String),

    /// A database error, propagated unchanged.
    #[error(transparent)]
    Database(#[from] diesel::result::Error),

    /// A stored payload could not be serialized or deserialized.
    ///
    /// Note: corrupt invocation payloads encountered by `get_job_data` are
    /// reported through `JobData::load_error` instead, so job metadata stays
    /// inspectable.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
