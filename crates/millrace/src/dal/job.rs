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

//! Job Repository
//!
//! Owns the `jobs`, `job_parameters` and `job_states` tables. State
//! transitions are transactional: the history insert and the mirrored state
//! columns on the job row are written atomically. If either fails, both are
//! rolled back.

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use std::collections::HashMap;

use super::DAL;
use crate::database::schema::{job_parameters, job_states, jobs};
use crate::database::types::{DbTimestamp, DbUuid};
use crate::error::StorageError;
use crate::models::job::{
    Job, JobData, JobInvocation, JobState, JobStateChange, NewJob, NewJobParameter, NewJobState,
    StateData,
};

/// Data access layer for job repository operations.
#[derive(Clone)]
pub struct JobDAL<'a> {
    dal: &'a DAL,
}

impl<'a> JobDAL<'a> {
    /// Creates a new JobDAL instance.
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Creates a job in the "created but unclaimed" form: the job row, its
    /// parameters and an expiry watermark, all in one transaction. No state
    /// is recorded yet, so the mirrored state columns stay unset.
    ///
    /// Returns the new job id in its external string form.
    pub async fn create_expired_job(
        &self,
        invocation: &JobInvocation,
        arguments: &str,
        parameters: &HashMap<String, Option<String>>,
        created_at: DateTime<Utc>,
        expire_in: Duration,
    ) -> Result<String, StorageError> {
        if invocation.type_name.is_empty() || invocation.method.is_empty() {
            return Err(StorageError::InvalidArgument("invocation"));
        }

        let id = DbUuid::new_v4();
        let new_job = NewJob {
            id,
            invocation_data: serde_json::to_string(invocation)?,
            arguments: arguments.to_string(),
            created_at: DbTimestamp(created_at),
            expire_at: Some(DbTimestamp(created_at + expire_in)),
        };
        let new_parameters: Vec<NewJobParameter> = parameters
            .iter()
            .map(|(name, value)| NewJobParameter {
                job_id: id,
                name: name.clone(),
                value: value.clone(),
            })
            .collect();

        let conn = self.dal.database.get_connection().await?;
        conn.interact(move |conn| {
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                diesel::insert_into(jobs::table)
                    .values(&new_job)
                    .execute(conn)?;

                if !new_parameters.is_empty() {
                    diesel::insert_into(job_parameters::table)
                        .values(&new_parameters)
                        .execute(conn)?;
                }

                Ok(())
            })
        })
        .await
        .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(id.to_string())
    }

    /// Retrieves job metadata by id.
    ///
    /// Returns `None` when no job matches. A corrupt invocation payload is
    /// reported through [`JobData::load_error`] rather than as a hard
    /// failure, so the metadata stays inspectable.
    pub async fn get_job_data(&self, id: &str) -> Result<Option<JobData>, StorageError> {
        if id.is_empty() {
            return Err(StorageError::InvalidArgument("id"));
        }
        let job_id = match DbUuid::parse(id) {
            Ok(job_id) => job_id,
            Err(_) => return Ok(None),
        };

        let conn = self.dal.database.get_connection().await?;
        let job: Option<Job> = conn
            .interact(move |conn| jobs::table.find(job_id).first(conn).optional())
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(job.map(|job| {
            let (invocation, load_error) =
                match serde_json::from_str::<JobInvocation>(&job.invocation_data) {
                    Ok(invocation) => (Some(invocation), None),
                    Err(e) => (None, Some(e.to_string())),
                };
            JobData {
                invocation,
                load_error,
                state_name: job.state_name,
                created_at: job.created_at.into_inner(),
            }
        }))
    }

    /// Point lookup of a job parameter by (job id, name).
    pub async fn get_job_parameter(
        &self,
        id: &str,
        name: &str,
    ) -> Result<Option<String>, StorageError> {
        if id.is_empty() {
            return Err(StorageError::InvalidArgument("id"));
        }
        if name.is_empty() {
            return Err(StorageError::InvalidArgument("name"));
        }
        let job_id = match DbUuid::parse(id) {
            Ok(job_id) => job_id,
            Err(_) => return Ok(None),
        };

        let name = name.to_string();
        let conn = self.dal.database.get_connection().await?;
        let value: Option<Option<String>> = conn
            .interact(move |conn| {
                job_parameters::table
                    .filter(job_parameters::job_id.eq(job_id))
                    .filter(job_parameters::name.eq(name))
                    .select(job_parameters::value)
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(value.flatten())
    }

    /// Idempotent upsert of a job parameter keyed by (job id, name). A
    /// second call with the same name replaces the value; a null value is
    /// stored as null.
    pub async fn set_job_parameter(
        &self,
        id: &str,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), StorageError> {
        if id.is_empty() {
            return Err(StorageError::InvalidArgument("id"));
        }
        if name.is_empty() {
            return Err(StorageError::InvalidArgument("name"));
        }
        let job_id = DbUuid::parse(id).map_err(|_| StorageError::InvalidArgument("id"))?;

        let new_parameter = NewJobParameter {
            job_id,
            name: name.to_string(),
            value: value.map(String::from),
        };

        let conn = self.dal.database.get_connection().await?;
        conn.interact(move |conn| {
            let value = new_parameter.value.clone();
            diesel::insert_into(job_parameters::table)
                .values(&new_parameter)
                .on_conflict((job_parameters::job_id, job_parameters::name))
                .do_update()
                .set(job_parameters::value.eq(value))
                .execute(conn)
        })
        .await
        .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(())
    }

    /// Returns the job's current state, sourced from the latest history row
    /// (by recency, not from the mirrored job columns). `None` when the job
    /// is unknown or has no recorded state.
    pub async fn get_state_data(&self, id: &str) -> Result<Option<StateData>, StorageError> {
        if id.is_empty() {
            return Err(StorageError::InvalidArgument("id"));
        }
        let job_id = match DbUuid::parse(id) {
            Ok(job_id) => job_id,
            Err(_) => return Ok(None),
        };

        let conn = self.dal.database.get_connection().await?;
        let state: Option<JobState> = conn
            .interact(move |conn| {
                job_states::table
                    .filter(job_states::job_id.eq(job_id))
                    .order(job_states::id.desc())
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        match state {
            None => Ok(None),
            Some(state) => {
                let data: HashMap<String, String> = match state.data {
                    Some(ref json) => serde_json::from_str(json)?,
                    None => HashMap::new(),
                };
                Ok(Some(StateData {
                    name: state.name,
                    reason: state.reason,
                    data,
                }))
            }
        }
    }

    /// Records a state transition: appends a history row and updates the
    /// job's mirrored state columns in a single transaction.
    pub async fn set_job_state(&self, id: &str, state: &JobStateChange) -> Result<(), StorageError> {
        if id.is_empty() {
            return Err(StorageError::InvalidArgument("id"));
        }
        if state.name.is_empty() {
            return Err(StorageError::InvalidArgument("state"));
        }
        let job_id = DbUuid::parse(id).map_err(|_| StorageError::InvalidArgument("id"))?;

        let data_json = serde_json::to_string(&state.data)?;
        let new_state = NewJobState {
            job_id,
            name: state.name.clone(),
            reason: state.reason.clone(),
            created_at: DbTimestamp::now(),
            data: Some(data_json),
        };

        let conn = self.dal.database.get_connection().await?;
        conn.interact(move |conn| {
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let mirror_name = new_state.name.clone();
                let mirror_reason = new_state.reason.clone();
                let mirror_data = new_state.data.clone();
                let changed_at = new_state.created_at;

                diesel::insert_into(job_states::table)
                    .values(&new_state)
                    .execute(conn)?;

                diesel::update(jobs::table.find(job_id))
                    .set((
                        jobs::state_name.eq(Some(mirror_name)),
                        jobs::state_reason.eq(mirror_reason),
                        jobs::state_data.eq(mirror_data),
                        jobs::last_state_changed_at.eq(Some(changed_at)),
                    ))
                    .execute(conn)?;

                Ok(())
            })
        })
        .await
        .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(())
    }

    /// Appends a history annotation without changing the job's current
    /// state. The mirrored columns on the job row are left untouched.
    pub async fn add_job_state(&self, id: &str, state: &JobStateChange) -> Result<(), StorageError> {
        if id.is_empty() {
            return Err(StorageError::InvalidArgument("id"));
        }
        if state.name.is_empty() {
            return Err(StorageError::InvalidArgument("state"));
        }
        let job_id = DbUuid::parse(id).map_err(|_| StorageError::InvalidArgument("id"))?;

        let data_json = serde_json::to_string(&state.data)?;
        let new_state = NewJobState {
            job_id,
            name: state.name.clone(),
            reason: state.reason.clone(),
            created_at: DbTimestamp::now(),
            data: Some(data_json),
        };

        let conn = self.dal.database.get_connection().await?;
        conn.interact(move |conn| {
            diesel::insert_into(job_states::table)
                .values(&new_state)
                .execute(conn)
        })
        .await
        .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(())
    }
}
