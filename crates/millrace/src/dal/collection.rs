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

//! Collection Store
//!
//! One generic component over the four expirable keyed structures: hashes,
//! lists, scored sets and counters. Expiry is lazy: every read filters out
//! rows whose `expire_at` lies in the past at query time, so callers never
//! observe logically-expired entries and no background sweep is needed.
//!
//! Per-variant ordering rules:
//! - lists read newest-inserted first (`id DESC`)
//! - sets read by ascending score, ties broken by insertion order (`id ASC`)
//! - counters are summed at read time: raw rows plus the aggregated value

use chrono::Duration;
use diesel::prelude::*;
use std::collections::HashMap;

use super::DAL;
use crate::database::schema::{aggregated_counters, counters, hashes, lists, sets};
use crate::database::types::DbTimestamp;
use crate::error::StorageError;
use crate::models::collection::NewHashEntry;

/// Sentinel returned by TTL queries when the subject does not exist or
/// carries no expiry.
fn no_ttl() -> Duration {
    Duration::seconds(-1)
}

fn require(name: &'static str, value: &str) -> Result<(), StorageError> {
    if value.is_empty() {
        return Err(StorageError::InvalidArgument(name));
    }
    Ok(())
}

/// Data access layer for the generic collection store.
#[derive(Clone)]
pub struct CollectionDAL<'a> {
    dal: &'a DAL,
}

impl<'a> CollectionDAL<'a> {
    /// Creates a new CollectionDAL instance.
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    // ------------------------------------------------------------------
    // Hash
    // ------------------------------------------------------------------

    /// Returns all live fields of a hash, or `None` when the hash has no
    /// live fields at all (distinguishing "no such hash" from an empty map).
    pub async fn get_all_entries_from_hash(
        &self,
        key: &str,
    ) -> Result<Option<HashMap<String, Option<String>>>, StorageError> {
        require("key", key)?;

        let key = key.to_string();
        let conn = self.dal.database.get_connection().await?;
        let entries: Vec<(String, Option<String>)> = conn
            .interact(move |conn| {
                let now = DbTimestamp::now();
                hashes::table
                    .filter(hashes::key.eq(key))
                    .filter(hashes::expire_at.is_null().or(hashes::expire_at.gt(now)))
                    .select((hashes::field, hashes::value))
                    .load(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(entries.into_iter().collect()))
    }

    /// Counts the live fields of a hash.
    pub async fn get_hash_count(&self, key: &str) -> Result<i64, StorageError> {
        require("key", key)?;

        let key = key.to_string();
        let conn = self.dal.database.get_connection().await?;
        let count = conn
            .interact(move |conn| {
                let now = DbTimestamp::now();
                hashes::table
                    .filter(hashes::key.eq(key))
                    .filter(hashes::expire_at.is_null().or(hashes::expire_at.gt(now)))
                    .count()
                    .get_result(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(count)
    }

    /// Point lookup of a single hash field.
    pub async fn get_value_from_hash(
        &self,
        key: &str,
        field: &str,
    ) -> Result<Option<String>, StorageError> {
        require("key", key)?;
        require("name", field)?;

        let key = key.to_string();
        let field = field.to_string();
        let conn = self.dal.database.get_connection().await?;
        let value: Option<Option<String>> = conn
            .interact(move |conn| {
                let now = DbTimestamp::now();
                hashes::table
                    .filter(hashes::key.eq(key))
                    .filter(hashes::field.eq(field))
                    .filter(hashes::expire_at.is_null().or(hashes::expire_at.gt(now)))
                    .select(hashes::value)
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(value.flatten())
    }

    /// Time until the hash expires. Negative when the hash does not exist
    /// or has no expiry set.
    pub async fn get_hash_ttl(&self, key: &str) -> Result<Duration, StorageError> {
        require("key", key)?;

        let key = key.to_string();
        let conn = self.dal.database.get_connection().await?;
        let min_expire: Option<DbTimestamp> = conn
            .interact(move |conn| {
                hashes::table
                    .filter(hashes::key.eq(key))
                    .select(diesel::dsl::min(hashes::expire_at))
                    .get_result(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(match min_expire {
            Some(expire) => expire.into_inner() - chrono::Utc::now(),
            None => no_ttl(),
        })
    }

    /// Batch-upserts hash fields. Null values are stored as null.
    pub async fn set_range_in_hash(
        &self,
        key: &str,
        entries: &HashMap<String, Option<String>>,
    ) -> Result<(), StorageError> {
        require("key", key)?;

        let new_entries: Vec<NewHashEntry> = entries
            .iter()
            .map(|(field, value)| NewHashEntry {
                key: key.to_string(),
                field: field.clone(),
                value: value.clone(),
                expire_at: None,
            })
            .collect();

        let conn = self.dal.database.get_connection().await?;
        conn.interact(move |conn| {
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                for entry in &new_entries {
                    let value = entry.value.clone();
                    diesel::insert_into(hashes::table)
                        .values(entry)
                        .on_conflict((hashes::key, hashes::field))
                        .do_update()
                        .set(hashes::value.eq(value))
                        .execute(conn)?;
                }
                Ok(())
            })
        })
        .await
        .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(())
    }

    // ------------------------------------------------------------------
    // List
    // ------------------------------------------------------------------

    /// Returns all live items of a list, newest-inserted first.
    pub async fn get_all_items_from_list(
        &self,
        key: &str,
    ) -> Result<Vec<Option<String>>, StorageError> {
        require("key", key)?;

        let key = key.to_string();
        let conn = self.dal.database.get_connection().await?;
        let items = conn
            .interact(move |conn| {
                let now = DbTimestamp::now();
                lists::table
                    .filter(lists::key.eq(key))
                    .filter(lists::expire_at.is_null().or(lists::expire_at.gt(now)))
                    .order(lists::id.desc())
                    .select(lists::value)
                    .load(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(items)
    }

    /// A 0-based inclusive window over the newest-first order. An inverted
    /// or negative-start window yields an empty result; SQLite would clamp a
    /// negative offset to 0 and return the head window otherwise.
    pub async fn get_range_from_list(
        &self,
        key: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<Option<String>>, StorageError> {
        require("key", key)?;
        if start < 0 || end < start {
            return Ok(Vec::new());
        }

        let key = key.to_string();
        let conn = self.dal.database.get_connection().await?;
        let items = conn
            .interact(move |conn| {
                let now = DbTimestamp::now();
                lists::table
                    .filter(lists::key.eq(key))
                    .filter(lists::expire_at.is_null().or(lists::expire_at.gt(now)))
                    .order(lists::id.desc())
                    .offset(start)
                    .limit(end - start + 1)
                    .select(lists::value)
                    .load(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(items)
    }

    /// Counts the live items of a list.
    pub async fn get_list_count(&self, key: &str) -> Result<i64, StorageError> {
        require("key", key)?;

        let key = key.to_string();
        let conn = self.dal.database.get_connection().await?;
        let count = conn
            .interact(move |conn| {
                let now = DbTimestamp::now();
                lists::table
                    .filter(lists::key.eq(key))
                    .filter(lists::expire_at.is_null().or(lists::expire_at.gt(now)))
                    .count()
                    .get_result(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(count)
    }

    /// Time until the list expires; negative when absent or without expiry.
    pub async fn get_list_ttl(&self, key: &str) -> Result<Duration, StorageError> {
        require("key", key)?;

        let key = key.to_string();
        let conn = self.dal.database.get_connection().await?;
        let min_expire: Option<DbTimestamp> = conn
            .interact(move |conn| {
                lists::table
                    .filter(lists::key.eq(key))
                    .select(diesel::dsl::min(lists::expire_at))
                    .get_result(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(match min_expire {
            Some(expire) => expire.into_inner() - chrono::Utc::now(),
            None => no_ttl(),
        })
    }

    // ------------------------------------------------------------------
    // Set
    // ------------------------------------------------------------------

    /// Returns the distinct live values of a scored set.
    pub async fn get_all_items_from_set(&self, key: &str) -> Result<Vec<String>, StorageError> {
        require("key", key)?;

        let key = key.to_string();
        let conn = self.dal.database.get_connection().await?;
        let items = conn
            .interact(move |conn| {
                let now = DbTimestamp::now();
                sets::table
                    .filter(sets::key.eq(key))
                    .filter(sets::expire_at.is_null().or(sets::expire_at.gt(now)))
                    .select(sets::value)
                    .load(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(items)
    }

    /// A 0-based inclusive window ordered by ascending score, ties broken
    /// by insertion order. An inverted or negative-start window yields an
    /// empty result; SQLite would clamp a negative offset to 0 otherwise.
    pub async fn get_range_from_set(
        &self,
        key: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<String>, StorageError> {
        require("key", key)?;
        if start < 0 || end < start {
            return Ok(Vec::new());
        }

        let key = key.to_string();
        let conn = self.dal.database.get_connection().await?;
        let items = conn
            .interact(move |conn| {
                let now = DbTimestamp::now();
                sets::table
                    .filter(sets::key.eq(key))
                    .filter(sets::expire_at.is_null().or(sets::expire_at.gt(now)))
                    .order((sets::score.asc(), sets::id.asc()))
                    .offset(start)
                    .limit(end - start + 1)
                    .select(sets::value)
                    .load(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(items)
    }

    /// Returns the member with the lowest score within `[from_score,
    /// to_score]`, or `None` when no member qualifies.
    pub async fn get_first_by_lowest_score_from_set(
        &self,
        key: &str,
        from_score: f64,
        to_score: f64,
    ) -> Result<Option<String>, StorageError> {
        require("key", key)?;
        if to_score < from_score {
            return Err(StorageError::InvalidRange {
                from: from_score,
                to: to_score,
            });
        }

        let key = key.to_string();
        let conn = self.dal.database.get_connection().await?;
        let value = conn
            .interact(move |conn| {
                let now = DbTimestamp::now();
                sets::table
                    .filter(sets::key.eq(key))
                    .filter(sets::score.ge(from_score))
                    .filter(sets::score.le(to_score))
                    .filter(sets::expire_at.is_null().or(sets::expire_at.gt(now)))
                    .order((sets::score.asc(), sets::id.asc()))
                    .select(sets::value)
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(value)
    }

    /// Counts the live members of a set.
    pub async fn get_set_count(&self, key: &str) -> Result<i64, StorageError> {
        require("key", key)?;

        let key = key.to_string();
        let conn = self.dal.database.get_connection().await?;
        let count = conn
            .interact(move |conn| {
                let now = DbTimestamp::now();
                sets::table
                    .filter(sets::key.eq(key))
                    .filter(sets::expire_at.is_null().or(sets::expire_at.gt(now)))
                    .count()
                    .get_result(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(count)
    }

    /// Time until the set expires; negative when absent or without expiry.
    pub async fn get_set_ttl(&self, key: &str) -> Result<Duration, StorageError> {
        require("key", key)?;

        let key = key.to_string();
        let conn = self.dal.database.get_connection().await?;
        let min_expire: Option<DbTimestamp> = conn
            .interact(move |conn| {
                sets::table
                    .filter(sets::key.eq(key))
                    .select(diesel::dsl::min(sets::expire_at))
                    .get_result(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(match min_expire {
            Some(expire) => expire.into_inner() - chrono::Utc::now(),
            None => no_ttl(),
        })
    }

    // ------------------------------------------------------------------
    // Counter
    // ------------------------------------------------------------------

    /// Returns the counter value: the sum of all raw increment rows plus
    /// the aggregated value, 0 when neither exists. Reads reflect only
    /// committed increments.
    pub async fn get_counter(&self, key: &str) -> Result<i64, StorageError> {
        require("key", key)?;

        let key = key.to_string();
        let conn = self.dal.database.get_connection().await?;
        let total = conn
            .interact(move |conn| {
                let raw: Vec<i64> = counters::table
                    .filter(counters::key.eq(&key))
                    .select(counters::value)
                    .load(conn)?;

                let aggregated: Option<i64> = aggregated_counters::table
                    .find(&key)
                    .select(aggregated_counters::value)
                    .first(conn)
                    .optional()?;

                Ok::<_, diesel::result::Error>(
                    raw.iter().sum::<i64>() + aggregated.unwrap_or(0),
                )
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(total)
    }
}
