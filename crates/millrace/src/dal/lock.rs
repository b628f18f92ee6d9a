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

//! Distributed Lock
//!
//! An advisory, single-database mutual-exclusion primitive. Each acquire
//! attempt runs one transaction: reap the resource's row if its lease has
//! expired, then try to insert our own; a unique violation means the lock is
//! held elsewhere. The loop polls until acquired or the timeout elapses.
//!
//! The lease expires at `acquired_at + timeout` and is not renewed, so a
//! holder running past its lease is no longer protected from a second
//! acquirer; crashed holders become reclaimable at the same moment. The
//! holder marker keeps a stale guard from deleting a lock that was
//! reclaimed by someone else.

use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use std::time::Duration;
use tracing::{debug, warn};

use super::DAL;
use crate::database::schema::distributed_locks;
use crate::database::types::{DbTimestamp, DbUuid};
use crate::database::Database;
use crate::error::StorageError;
use crate::models::lock::NewLockRow;

/// How long to wait between acquire attempts while the lock is contended.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Data access layer for distributed lock operations.
#[derive(Clone)]
pub struct LockDAL<'a> {
    dal: &'a DAL,
}

impl<'a> LockDAL<'a> {
    /// Creates a new LockDAL instance.
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Acquires the named lock, polling until it is free or `timeout`
    /// elapses. A returned guard always represents a held lock; failure to
    /// acquire in time is [`StorageError::LockTimeout`].
    pub async fn acquire(
        &self,
        resource: &str,
        timeout: Duration,
    ) -> Result<DistributedLockGuard, StorageError> {
        if resource.is_empty() {
            return Err(StorageError::InvalidArgument("resource"));
        }
        let lease = chrono::Duration::from_std(timeout)
            .map_err(|_| StorageError::InvalidArgument("timeout"))?;

        let holder = DbUuid::new_v4();
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.try_acquire(resource, holder, lease).await? {
                debug!(resource, %holder, "acquired distributed lock");
                return Ok(DistributedLockGuard {
                    resource: resource.to_string(),
                    holder,
                    database: self.dal.database.clone(),
                    released: false,
                });
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(StorageError::LockTimeout {
                    resource: resource.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// One acquire attempt. Reaps an expired row for the resource, then
    /// inserts ours; `false` means a live holder exists.
    async fn try_acquire(
        &self,
        resource: &str,
        holder: DbUuid,
        lease: chrono::Duration,
    ) -> Result<bool, StorageError> {
        let resource = resource.to_string();
        let conn = self.dal.database.get_connection().await?;
        let acquired = conn
            .interact(move |conn| {
                conn.transaction::<_, diesel::result::Error, _>(|conn| {
                    let now = DbTimestamp::now();
                    diesel::delete(
                        distributed_locks::table
                            .filter(distributed_locks::resource.eq(resource.clone()))
                            .filter(distributed_locks::expires_at.le(now)),
                    )
                    .execute(conn)?;

                    let row = NewLockRow {
                        resource,
                        holder,
                        acquired_at: now,
                        expires_at: DbTimestamp(now.0 + lease),
                    };
                    match diesel::insert_into(distributed_locks::table)
                        .values(&row)
                        .execute(conn)
                    {
                        Ok(_) => Ok(true),
                        Err(diesel::result::Error::DatabaseError(
                            DatabaseErrorKind::UniqueViolation,
                            _,
                        )) => Ok(false),
                        Err(e) => Err(e),
                    }
                })
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(acquired)
    }
}

/// An owned handle to a held distributed lock.
///
/// Release explicitly with [`release`](Self::release) to observe the result,
/// or let the guard drop for a best-effort async release. An unreleased lock
/// (crashed holder) is reclaimable by others once its lease expires.
#[derive(Debug)]
pub struct DistributedLockGuard {
    resource: String,
    holder: DbUuid,
    database: Database,
    released: bool,
}

impl DistributedLockGuard {
    /// The resource name this guard holds.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Releases the lock, unblocking the next acquirer.
    pub async fn release(mut self) -> Result<(), StorageError> {
        self.released = true;
        delete_lock_row(&self.database, self.resource.clone(), self.holder).await
    }
}

impl Drop for DistributedLockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Best effort: Drop cannot await. Outside a runtime the row is left
        // to lapse via its lease expiry.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let database = self.database.clone();
                let resource = self.resource.clone();
                let holder = self.holder;
                handle.spawn(async move {
                    if let Err(e) = delete_lock_row(&database, resource.clone(), holder).await {
                        warn!(resource, error = %e, "failed to release dropped lock");
                    }
                });
            }
            Err(_) => {
                warn!(
                    resource = %self.resource,
                    "lock guard dropped outside a runtime; lock will lapse at lease expiry"
                );
            }
        }
    }
}

/// Deletes the lock row, but only if `holder` still owns it.
async fn delete_lock_row(
    database: &Database,
    resource: String,
    holder: DbUuid,
) -> Result<(), StorageError> {
    let conn = database.get_connection().await?;
    conn.interact(move |conn| {
        diesel::delete(
            distributed_locks::table
                .filter(distributed_locks::resource.eq(resource))
                .filter(distributed_locks::holder.eq(holder)),
        )
        .execute(conn)
    })
    .await
    .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

    Ok(())
}
