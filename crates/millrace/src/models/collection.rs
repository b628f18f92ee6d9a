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

//! Collection Store Models
//!
//! Row structs for the generic expirable data structures: hashes, lists,
//! scored sets and counters. Every entry carries its own optional
//! `expire_at`; reads filter expired rows lazily at query time.

use crate::database::types::DbTimestamp;

/// One field of a hash; unique per (key, field).
#[derive(Debug, Clone, diesel::Queryable, diesel::Selectable)]
#[diesel(table_name = crate::database::schema::hashes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HashEntry {
    pub id: i64,
    pub key: String,
    pub field: String,
    pub value: Option<String>,
    pub expire_at: Option<DbTimestamp>,
}

#[derive(Debug, diesel::Insertable)]
#[diesel(table_name = crate::database::schema::hashes)]
pub struct NewHashEntry {
    pub key: String,
    pub field: String,
    pub value: Option<String>,
    pub expire_at: Option<DbTimestamp>,
}

/// One element of a list; the surrogate id records insertion order.
#[derive(Debug, Clone, diesel::Queryable, diesel::Selectable)]
#[diesel(table_name = crate::database::schema::lists)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ListEntry {
    pub id: i64,
    pub key: String,
    pub value: Option<String>,
    pub expire_at: Option<DbTimestamp>,
}

#[derive(Debug, diesel::Insertable)]
#[diesel(table_name = crate::database::schema::lists)]
pub struct NewListEntry {
    pub key: String,
    pub value: Option<String>,
    pub expire_at: Option<DbTimestamp>,
}

/// One member of a scored set; unique per (key, value), id breaks score ties.
#[derive(Debug, Clone, diesel::Queryable, diesel::Selectable)]
#[diesel(table_name = crate::database::schema::sets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SetEntry {
    pub id: i64,
    pub key: String,
    pub value: String,
    pub score: f64,
    pub expire_at: Option<DbTimestamp>,
}

#[derive(Debug, diesel::Insertable)]
#[diesel(table_name = crate::database::schema::sets)]
pub struct NewSetEntry {
    pub key: String,
    pub value: String,
    pub score: f64,
    pub expire_at: Option<DbTimestamp>,
}

/// A raw counter increment; never updated in place, summed at read time.
#[derive(Debug, Clone, diesel::Queryable, diesel::Selectable)]
#[diesel(table_name = crate::database::schema::counters)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CounterEntry {
    pub id: i64,
    pub key: String,
    pub value: i64,
}

#[derive(Debug, diesel::Insertable)]
#[diesel(table_name = crate::database::schema::counters)]
pub struct NewCounterEntry {
    pub key: String,
    pub value: i64,
}

/// The folded counter value, maintained by an external aggregation pass.
#[derive(Debug, Clone, diesel::Queryable, diesel::Selectable, diesel::Insertable)]
#[diesel(table_name = crate::database::schema::aggregated_counters)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AggregatedCounter {
    pub key: String,
    pub value: i64,
}
