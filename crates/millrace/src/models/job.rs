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

//! Job Models
//!
//! Row structs for the `jobs`, `job_parameters` and `job_states` tables plus
//! the domain types exchanged at the repository boundary. The job row
//! denormalizes the latest state (`state_name`/`state_reason`/`state_data`)
//! for cheap reads; `job_states` keeps the full append-only history.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::database::types::{DbTimestamp, DbUuid};

/// A job record as stored in the database.
#[derive(Debug, Clone, diesel::Queryable, diesel::Selectable)]
#[diesel(table_name = crate::database::schema::jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Job {
    /// Unique identifier; exposed to callers in its string form
    pub id: DbUuid,
    /// JSON-serialized invocation payload
    pub invocation_data: String,
    /// Serialized job arguments
    pub arguments: String,
    pub created_at: DbTimestamp,
    /// Set only while the job has no owning worker
    pub expire_at: Option<DbTimestamp>,
    /// Mirror of the latest `job_states` row
    pub state_name: Option<String>,
    pub state_reason: Option<String>,
    pub state_data: Option<String>,
    pub last_state_changed_at: Option<DbTimestamp>,
}

/// A new job to be inserted.
#[derive(Debug, diesel::Insertable)]
#[diesel(table_name = crate::database::schema::jobs)]
pub struct NewJob {
    pub id: DbUuid,
    pub invocation_data: String,
    pub arguments: String,
    pub created_at: DbTimestamp,
    pub expire_at: Option<DbTimestamp>,
}

/// A job parameter row; unique per (job_id, name).
#[derive(Debug, Clone, diesel::Queryable, diesel::Selectable)]
#[diesel(table_name = crate::database::schema::job_parameters)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JobParameter {
    pub id: i64,
    pub job_id: DbUuid,
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, diesel::Insertable)]
#[diesel(table_name = crate::database::schema::job_parameters)]
pub struct NewJobParameter {
    pub job_id: DbUuid,
    pub name: String,
    pub value: Option<String>,
}

/// An entry in the append-only state history.
#[derive(Debug, Clone, diesel::Queryable, diesel::Selectable)]
#[diesel(table_name = crate::database::schema::job_states)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JobState {
    pub id: i64,
    pub job_id: DbUuid,
    pub name: String,
    pub reason: Option<String>,
    pub created_at: DbTimestamp,
    /// JSON-serialized state data map
    pub data: Option<String>,
}

#[derive(Debug, diesel::Insertable)]
#[diesel(table_name = crate::database::schema::job_states)]
pub struct NewJobState {
    pub job_id: DbUuid,
    pub name: String,
    pub reason: Option<String>,
    pub created_at: DbTimestamp,
    pub data: Option<String>,
}

/// The invocation payload stored on a job: what to call when a worker picks
/// it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInvocation {
    /// Fully qualified type or module path of the target
    pub type_name: String,
    /// Method or function to invoke
    pub method: String,
    /// Serialized argument list
    #[serde(default)]
    pub arguments: Vec<String>,
}

/// A state transition to record against a job.
#[derive(Debug, Clone)]
pub struct JobStateChange {
    pub name: String,
    pub reason: Option<String>,
    pub data: HashMap<String, String>,
}

/// Job metadata returned by point queries.
///
/// When the stored invocation payload fails to deserialize, `invocation` is
/// `None` and `load_error` carries the failure so callers can still inspect
/// the rest of the record.
#[derive(Debug)]
pub struct JobData {
    pub invocation: Option<JobInvocation>,
    pub load_error: Option<String>,
    pub state_name: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The latest state of a job, sourced from the history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateData {
    pub name: String,
    pub reason: Option<String>,
    pub data: HashMap<String, String>,
}
