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

//! Queue provider resolution
//!
//! A fetch request names an ordered list of queues; each queue is served by
//! exactly one registered [`QueueProvider`] (falling back to the default
//! provider). Resolution enforces that one fetch never spans heterogeneous
//! backends: if the queue set maps to more than one distinct provider the
//! call fails instead of silently picking one. On success the dequeue is
//! delegated to that single provider unchanged.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::StorageError;

/// A job claimed from a queue. Dropping the handle without acknowledgement
/// must not lose the job; the provider decides how (visibility timeout,
/// requeue on reconnect, ...).
#[async_trait]
pub trait ClaimedJob: Send {
    /// The claimed job's id in its external string form.
    fn job_id(&self) -> &str;

    /// Acknowledges the job: removes it from the queue for good.
    async fn remove_from_queue(&mut self) -> Result<(), StorageError>;

    /// Returns the job to its queue for another worker to claim.
    async fn requeue(&mut self) -> Result<(), StorageError>;
}

/// A dequeue strategy serving one or more queues.
///
/// `dequeue` may block up to an implementation-defined wait and must honor
/// the cancellation token promptly, without leaving the job claimed.
#[async_trait]
pub trait QueueProvider: Send + Sync {
    async fn dequeue(
        &self,
        queues: &[String],
        cancellation: CancellationToken,
    ) -> Result<Box<dyn ClaimedJob>, StorageError>;
}

impl std::fmt::Debug for dyn QueueProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("QueueProvider")
    }
}

/// Maps queue names to providers and enforces single-provider routing.
pub struct QueueProviderResolver {
    default_provider: Arc<dyn QueueProvider>,
    providers: HashMap<String, Arc<dyn QueueProvider>>,
}

impl QueueProviderResolver {
    /// Creates a resolver where every queue name falls back to
    /// `default_provider` unless registered otherwise.
    pub fn new(default_provider: Arc<dyn QueueProvider>) -> Self {
        Self {
            default_provider,
            providers: HashMap::new(),
        }
    }

    /// Registers a provider for a specific queue name, overriding the
    /// default for that queue.
    pub fn register(&mut self, queue: impl Into<String>, provider: Arc<dyn QueueProvider>) {
        self.providers.insert(queue.into(), provider);
    }

    /// Resolves the distinct provider serving all of `queues`.
    pub fn resolve(&self, queues: &[String]) -> Result<Arc<dyn QueueProvider>, StorageError> {
        if queues.is_empty() {
            return Err(StorageError::InvalidArgument("queues"));
        }

        let mut distinct: Vec<Arc<dyn QueueProvider>> = Vec::new();
        for queue in queues {
            if queue.is_empty() {
                return Err(StorageError::InvalidArgument("queues"));
            }
            let provider = self
                .providers
                .get(queue)
                .unwrap_or(&self.default_provider)
                .clone();
            if !distinct.iter().any(|p| Arc::ptr_eq(p, &provider)) {
                distinct.push(provider);
            }
        }

        if distinct.len() > 1 {
            return Err(StorageError::AmbiguousRouting {
                queues: queues.to_vec(),
            });
        }
        Ok(distinct.remove(0))
    }

    /// Resolves and delegates the dequeue call, returning the provider's
    /// result unchanged.
    pub async fn fetch_next_job(
        &self,
        queues: &[String],
        cancellation: CancellationToken,
    ) -> Result<Box<dyn ClaimedJob>, StorageError> {
        let provider = self.resolve(queues)?;
        provider.dequeue(queues, cancellation).await
    }
}
