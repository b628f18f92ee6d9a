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

//! Distributed Lock Models

use crate::database::types::{DbTimestamp, DbUuid};

/// The lock row for one resource name. At most one live (non-expired) row
/// exists per resource; the holder marker ties the row to the guard that
/// created it.
#[derive(Debug, Clone, diesel::Queryable, diesel::Selectable)]
#[diesel(table_name = crate::database::schema::distributed_locks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LockRow {
    pub resource: String,
    pub holder: DbUuid,
    pub acquired_at: DbTimestamp,
    pub expires_at: DbTimestamp,
}

#[derive(Debug, diesel::Insertable)]
#[diesel(table_name = crate::database::schema::distributed_locks)]
pub struct NewLockRow {
    pub resource: String,
    pub holder: DbUuid,
    pub acquired_at: DbTimestamp,
    pub expires_at: DbTimestamp,
}
