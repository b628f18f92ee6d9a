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

//! Server Registry
//!
//! Tracks worker-process identity, declared queues/capacity and heartbeat
//! timestamps. Liveness is polled: stale rows are deleted wholesale by
//! [`ServerDAL::remove_timed_out_servers`], nothing is pushed to workers.

use chrono::{Duration, Utc};
use diesel::prelude::*;
use tracing::info;

use super::DAL;
use crate::database::schema::servers;
use crate::database::types::DbTimestamp;
use crate::error::StorageError;
use crate::models::server::{NewServerRecord, ServerContext, ServerRecord};

/// Data access layer for the worker registry.
#[derive(Clone)]
pub struct ServerDAL<'a> {
    dal: &'a DAL,
}

impl<'a> ServerDAL<'a> {
    /// Creates a new ServerDAL instance.
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Registers a worker or refreshes its registration. Idempotent: a
    /// repeat announce overwrites the stored context and refreshes the
    /// heartbeat, leaving exactly one row per server id.
    pub async fn announce(
        &self,
        server_id: &str,
        context: &ServerContext,
    ) -> Result<(), StorageError> {
        if server_id.is_empty() {
            return Err(StorageError::InvalidArgument("server_id"));
        }

        let record = NewServerRecord {
            id: server_id.to_string(),
            data: serde_json::to_string(context)?,
            last_heartbeat: DbTimestamp::now(),
        };

        let conn = self.dal.database.get_connection().await?;
        conn.interact(move |conn| {
            let data = record.data.clone();
            let heartbeat = record.last_heartbeat;
            diesel::insert_into(servers::table)
                .values(&record)
                .on_conflict(servers::id)
                .do_update()
                .set((
                    servers::data.eq(data),
                    servers::last_heartbeat.eq(heartbeat),
                ))
                .execute(conn)
        })
        .await
        .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(())
    }

    /// Refreshes only the heartbeat timestamp. A no-op when the server is
    /// unknown.
    pub async fn heartbeat(&self, server_id: &str) -> Result<(), StorageError> {
        if server_id.is_empty() {
            return Err(StorageError::InvalidArgument("server_id"));
        }

        let server_id = server_id.to_string();
        let conn = self.dal.database.get_connection().await?;
        conn.interact(move |conn| {
            diesel::update(servers::table.find(server_id))
                .set(servers::last_heartbeat.eq(DbTimestamp::now()))
                .execute(conn)
        })
        .await
        .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(())
    }

    /// Deletes a worker's row if present; a no-op otherwise.
    pub async fn remove_server(&self, server_id: &str) -> Result<(), StorageError> {
        if server_id.is_empty() {
            return Err(StorageError::InvalidArgument("server_id"));
        }

        let server_id = server_id.to_string();
        let conn = self.dal.database.get_connection().await?;
        conn.interact(move |conn| {
            diesel::delete(servers::table.find(server_id)).execute(conn)
        })
        .await
        .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(())
    }

    /// Deletes every server whose last heartbeat is older than
    /// `now - threshold`, returning the number removed.
    pub async fn remove_timed_out_servers(&self, threshold: Duration) -> Result<u64, StorageError> {
        if threshold < Duration::zero() {
            return Err(StorageError::InvalidArgument("threshold"));
        }

        let cutoff = DbTimestamp(Utc::now() - threshold);
        let conn = self.dal.database.get_connection().await?;
        let removed = conn
            .interact(move |conn| {
                diesel::delete(servers::table.filter(servers::last_heartbeat.lt(cutoff)))
                    .execute(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        if removed > 0 {
            info!(removed, "evicted timed-out servers");
        }
        Ok(removed as u64)
    }

    /// Fetches a server row by id, mostly for diagnostics and tests.
    pub async fn get_server(&self, server_id: &str) -> Result<Option<ServerRecord>, StorageError> {
        if server_id.is_empty() {
            return Err(StorageError::InvalidArgument("server_id"));
        }

        let server_id = server_id.to_string();
        let conn = self.dal.database.get_connection().await?;
        let record = conn
            .interact(move |conn| servers::table.find(server_id).first(conn).optional())
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(record)
    }
}
