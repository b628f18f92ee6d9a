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

//! Server Registry Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::types::DbTimestamp;

/// A worker process row; the id is the natural key.
#[derive(Debug, Clone, diesel::Queryable, diesel::Selectable)]
#[diesel(table_name = crate::database::schema::servers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ServerRecord {
    pub id: String,
    /// JSON-serialized [`ServerContext`]
    pub data: String,
    pub last_heartbeat: DbTimestamp,
}

#[derive(Debug, diesel::Insertable)]
#[diesel(table_name = crate::database::schema::servers)]
pub struct NewServerRecord {
    pub id: String,
    pub data: String,
    pub last_heartbeat: DbTimestamp,
}

/// What a worker declares about itself when announcing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerContext {
    pub queues: Vec<String>,
    pub worker_count: i32,
    pub started_at: DateTime<Utc>,
}
