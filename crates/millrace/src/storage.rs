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

//! Storage connection façade
//!
//! The single surface the worker loop and scheduler call. Owns no state of
//! its own; every method delegates to the component that exclusively owns
//! the tables involved. Callers needing multi-step exclusivity across
//! several operations must wrap them with a distributed lock explicitly.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::dal::{DistributedLockGuard, DAL};
use crate::database::Database;
use crate::error::StorageError;
use crate::models::job::{JobData, JobInvocation, JobStateChange, StateData};
use crate::models::server::ServerContext;
use crate::queue::{ClaimedJob, QueueProviderResolver};

/// The composition root: job repository, collection store, distributed
/// locking, server registry and queue routing behind one API.
pub struct StorageConnection {
    dal: DAL,
    resolver: Arc<QueueProviderResolver>,
}

impl StorageConnection {
    /// Creates a storage connection over an initialized database.
    pub fn new(database: Database, resolver: Arc<QueueProviderResolver>) -> Self {
        Self {
            dal: DAL::new(database),
            resolver,
        }
    }

    /// Access to the underlying DAL, mostly for tests and tooling.
    pub fn dal(&self) -> &DAL {
        &self.dal
    }

    // ------------------------------------------------------------------
    // Jobs
    // ------------------------------------------------------------------

    /// Creates an unclaimed job with an expiry watermark; see
    /// [`crate::dal::JobDAL::create_expired_job`].
    pub async fn create_expired_job(
        &self,
        invocation: &JobInvocation,
        arguments: &str,
        parameters: &HashMap<String, Option<String>>,
        created_at: DateTime<Utc>,
        expire_in: Duration,
    ) -> Result<String, StorageError> {
        self.dal
            .jobs()
            .create_expired_job(invocation, arguments, parameters, created_at, expire_in)
            .await
    }

    pub async fn get_job_data(&self, id: &str) -> Result<Option<JobData>, StorageError> {
        self.dal.jobs().get_job_data(id).await
    }

    pub async fn get_job_parameter(
        &self,
        id: &str,
        name: &str,
    ) -> Result<Option<String>, StorageError> {
        self.dal.jobs().get_job_parameter(id, name).await
    }

    pub async fn set_job_parameter(
        &self,
        id: &str,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), StorageError> {
        self.dal.jobs().set_job_parameter(id, name, value).await
    }

    pub async fn get_state_data(&self, id: &str) -> Result<Option<StateData>, StorageError> {
        self.dal.jobs().get_state_data(id).await
    }

    pub async fn set_job_state(&self, id: &str, state: &JobStateChange) -> Result<(), StorageError> {
        self.dal.jobs().set_job_state(id, state).await
    }

    pub async fn add_job_state(&self, id: &str, state: &JobStateChange) -> Result<(), StorageError> {
        self.dal.jobs().add_job_state(id, state).await
    }

    // ------------------------------------------------------------------
    // Queue
    // ------------------------------------------------------------------

    /// Resolves the queues to a single provider and delegates the claim.
    pub async fn fetch_next_job(
        &self,
        queues: &[String],
        cancellation: CancellationToken,
    ) -> Result<Box<dyn ClaimedJob>, StorageError> {
        self.resolver.fetch_next_job(queues, cancellation).await
    }

    // ------------------------------------------------------------------
    // Locks
    // ------------------------------------------------------------------

    pub async fn acquire_distributed_lock(
        &self,
        resource: &str,
        timeout: std::time::Duration,
    ) -> Result<DistributedLockGuard, StorageError> {
        self.dal.locks().acquire(resource, timeout).await
    }

    // ------------------------------------------------------------------
    // Servers
    // ------------------------------------------------------------------

    pub async fn announce_server(
        &self,
        server_id: &str,
        context: &ServerContext,
    ) -> Result<(), StorageError> {
        self.dal.servers().announce(server_id, context).await
    }

    pub async fn server_heartbeat(&self, server_id: &str) -> Result<(), StorageError> {
        self.dal.servers().heartbeat(server_id).await
    }

    pub async fn remove_server(&self, server_id: &str) -> Result<(), StorageError> {
        self.dal.servers().remove_server(server_id).await
    }

    pub async fn remove_timed_out_servers(&self, threshold: Duration) -> Result<u64, StorageError> {
        self.dal.servers().remove_timed_out_servers(threshold).await
    }

    // ------------------------------------------------------------------
    // Collections
    // ------------------------------------------------------------------

    pub async fn get_all_entries_from_hash(
        &self,
        key: &str,
    ) -> Result<Option<HashMap<String, Option<String>>>, StorageError> {
        self.dal.collections().get_all_entries_from_hash(key).await
    }

    pub async fn get_hash_count(&self, key: &str) -> Result<i64, StorageError> {
        self.dal.collections().get_hash_count(key).await
    }

    pub async fn get_value_from_hash(
        &self,
        key: &str,
        field: &str,
    ) -> Result<Option<String>, StorageError> {
        self.dal.collections().get_value_from_hash(key, field).await
    }

    pub async fn get_hash_ttl(&self, key: &str) -> Result<Duration, StorageError> {
        self.dal.collections().get_hash_ttl(key).await
    }

    pub async fn set_range_in_hash(
        &self,
        key: &str,
        entries: &HashMap<String, Option<String>>,
    ) -> Result<(), StorageError> {
        self.dal.collections().set_range_in_hash(key, entries).await
    }

    pub async fn get_all_items_from_list(
        &self,
        key: &str,
    ) -> Result<Vec<Option<String>>, StorageError> {
        self.dal.collections().get_all_items_from_list(key).await
    }

    pub async fn get_range_from_list(
        &self,
        key: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<Option<String>>, StorageError> {
        self.dal
            .collections()
            .get_range_from_list(key, start, end)
            .await
    }

    pub async fn get_list_count(&self, key: &str) -> Result<i64, StorageError> {
        self.dal.collections().get_list_count(key).await
    }

    pub async fn get_list_ttl(&self, key: &str) -> Result<Duration, StorageError> {
        self.dal.collections().get_list_ttl(key).await
    }

    pub async fn get_all_items_from_set(&self, key: &str) -> Result<Vec<String>, StorageError> {
        self.dal.collections().get_all_items_from_set(key).await
    }

    pub async fn get_range_from_set(
        &self,
        key: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<String>, StorageError> {
        self.dal
            .collections()
            .get_range_from_set(key, start, end)
            .await
    }

    pub async fn get_first_by_lowest_score_from_set(
        &self,
        key: &str,
        from_score: f64,
        to_score: f64,
    ) -> Result<Option<String>, StorageError> {
        self.dal
            .collections()
            .get_first_by_lowest_score_from_set(key, from_score, to_score)
            .await
    }

    pub async fn get_set_count(&self, key: &str) -> Result<i64, StorageError> {
        self.dal.collections().get_set_count(key).await
    }

    pub async fn get_set_ttl(&self, key: &str) -> Result<Duration, StorageError> {
        self.dal.collections().get_set_ttl(key).await
    }

    pub async fn get_counter(&self, key: &str) -> Result<i64, StorageError> {
        self.dal.collections().get_counter(key).await
    }
}
