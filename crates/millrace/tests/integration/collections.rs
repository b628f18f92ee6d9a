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

//! Integration tests for the collection store: hashes, lists, scored sets
//! and counters, including lazy expiry and ordering rules.
//!
//! The store's write surface is the hash upsert; list, set and counter rows
//! are written by the enqueue side of the system, so these tests seed them
//! directly through the schema.

use chrono::{Duration, Utc};
use diesel::prelude::*;
use std::collections::HashMap;

use millrace::database::schema::{aggregated_counters, counters, lists, sets};
use millrace::models::collection::{
    AggregatedCounter, NewCounterEntry, NewHashEntry, NewListEntry, NewSetEntry,
};
use millrace::{Database, DbTimestamp, StorageError};

use crate::fixtures::test_database;

async fn seed_list(database: &Database, key: &str, value: &str) {
    let entry = NewListEntry {
        key: key.to_string(),
        value: Some(value.to_string()),
        expire_at: None,
    };
    let conn = database.get_connection().await.unwrap();
    conn.interact(move |conn| {
        diesel::insert_into(lists::table)
            .values(&entry)
            .execute(conn)
    })
    .await
    .unwrap()
    .unwrap();
}

async fn seed_set(database: &Database, key: &str, value: &str, score: f64) {
    let entry = NewSetEntry {
        key: key.to_string(),
        value: value.to_string(),
        score,
        expire_at: None,
    };
    let conn = database.get_connection().await.unwrap();
    conn.interact(move |conn| {
        diesel::insert_into(sets::table)
            .values(&entry)
            .execute(conn)
    })
    .await
    .unwrap()
    .unwrap();
}

// ----------------------------------------------------------------------
// Hash
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_hash_missing_is_none_not_empty() {
    let fixture = test_database().await;
    let collections = fixture.dal.collections();

    assert!(collections
        .get_all_entries_from_hash("no-such-hash")
        .await
        .unwrap()
        .is_none());
    assert_eq!(collections.get_hash_count("no-such-hash").await.unwrap(), 0);
}

#[tokio::test]
async fn test_hash_set_range_and_read_back() {
    let fixture = test_database().await;
    let collections = fixture.dal.collections();

    let mut entries = HashMap::new();
    entries.insert("host".to_string(), Some("worker-1".to_string()));
    entries.insert("pid".to_string(), Some("4242".to_string()));
    entries.insert("note".to_string(), None);
    collections.set_range_in_hash("server:meta", &entries).await.unwrap();

    let all = collections
        .get_all_entries_from_hash("server:meta")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(all, entries);
    assert_eq!(collections.get_hash_count("server:meta").await.unwrap(), 3);
    assert_eq!(
        collections.get_value_from_hash("server:meta", "host").await.unwrap(),
        Some("worker-1".to_string())
    );
    assert!(collections
        .get_value_from_hash("server:meta", "note")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_hash_set_range_upserts_existing_fields() {
    let fixture = test_database().await;
    let collections = fixture.dal.collections();

    let mut first = HashMap::new();
    first.insert("attempt".to_string(), Some("1".to_string()));
    collections.set_range_in_hash("job:meta", &first).await.unwrap();

    let mut second = HashMap::new();
    second.insert("attempt".to_string(), Some("2".to_string()));
    collections.set_range_in_hash("job:meta", &second).await.unwrap();

    assert_eq!(collections.get_hash_count("job:meta").await.unwrap(), 1);
    assert_eq!(
        collections.get_value_from_hash("job:meta", "attempt").await.unwrap(),
        Some("2".to_string())
    );
}

#[tokio::test]
async fn test_hash_expired_fields_are_invisible() {
    let fixture = test_database().await;
    let collections = fixture.dal.collections();

    let live = NewHashEntry {
        key: "mixed".to_string(),
        field: "live".to_string(),
        value: Some("yes".to_string()),
        expire_at: Some(DbTimestamp(Utc::now() + Duration::hours(1))),
    };
    let expired = NewHashEntry {
        key: "mixed".to_string(),
        field: "stale".to_string(),
        value: Some("no".to_string()),
        expire_at: Some(DbTimestamp(Utc::now() - Duration::hours(1))),
    };
    let conn = fixture.database.get_connection().await.unwrap();
    conn.interact(move |conn| {
        diesel::insert_into(millrace::database::schema::hashes::table)
            .values(vec![&live, &expired])
            .execute(conn)
    })
    .await
    .unwrap()
    .unwrap();
    drop(conn);

    let all = collections
        .get_all_entries_from_hash("mixed")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(all.len(), 1);
    assert!(all.contains_key("live"));
    assert_eq!(collections.get_hash_count("mixed").await.unwrap(), 1);
    assert!(collections
        .get_value_from_hash("mixed", "stale")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_hash_all_fields_expired_reads_as_missing() {
    let fixture = test_database().await;
    let collections = fixture.dal.collections();

    let expired = NewHashEntry {
        key: "gone".to_string(),
        field: "f".to_string(),
        value: Some("v".to_string()),
        expire_at: Some(DbTimestamp(Utc::now() - Duration::minutes(5))),
    };
    let conn = fixture.database.get_connection().await.unwrap();
    conn.interact(move |conn| {
        diesel::insert_into(millrace::database::schema::hashes::table)
            .values(&expired)
            .execute(conn)
    })
    .await
    .unwrap()
    .unwrap();
    drop(conn);

    assert!(collections
        .get_all_entries_from_hash("gone")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_hash_ttl() {
    let fixture = test_database().await;
    let collections = fixture.dal.collections();

    // No expiry set: negative sentinel
    let mut entries = HashMap::new();
    entries.insert("f".to_string(), Some("v".to_string()));
    collections.set_range_in_hash("forever", &entries).await.unwrap();
    assert!(collections.get_hash_ttl("forever").await.unwrap() < Duration::zero());

    // Missing hash: negative as well
    assert!(collections.get_hash_ttl("absent").await.unwrap() < Duration::zero());

    // Expiry an hour out: TTL lands just under an hour
    let entry = NewHashEntry {
        key: "timed".to_string(),
        field: "f".to_string(),
        value: Some("v".to_string()),
        expire_at: Some(DbTimestamp(Utc::now() + Duration::hours(1))),
    };
    let conn = fixture.database.get_connection().await.unwrap();
    conn.interact(move |conn| {
        diesel::insert_into(millrace::database::schema::hashes::table)
            .values(&entry)
            .execute(conn)
    })
    .await
    .unwrap()
    .unwrap();
    drop(conn);

    let ttl = collections.get_hash_ttl("timed").await.unwrap();
    assert!(ttl > Duration::minutes(59));
    assert!(ttl <= Duration::hours(1));
}

// ----------------------------------------------------------------------
// List
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_list_reads_newest_first() {
    let fixture = test_database().await;
    let collections = fixture.dal.collections();

    // Interleave a second key to prove filtering
    seed_list(&fixture.database, "history", "v1").await;
    seed_list(&fixture.database, "other", "x1").await;
    seed_list(&fixture.database, "history", "v2").await;
    seed_list(&fixture.database, "history", "v3").await;
    seed_list(&fixture.database, "other", "x2").await;
    seed_list(&fixture.database, "history", "v4").await;

    let all = collections.get_all_items_from_list("history").await.unwrap();
    assert_eq!(
        all,
        vec![
            Some("v4".to_string()),
            Some("v3".to_string()),
            Some("v2".to_string()),
            Some("v1".to_string()),
        ]
    );
    assert_eq!(collections.get_list_count("history").await.unwrap(), 4);
}

#[tokio::test]
async fn test_list_range_is_window_over_newest_first() {
    let fixture = test_database().await;
    let collections = fixture.dal.collections();

    // Foreign-key row in the middle must not shift the window
    seed_list(&fixture.database, "ranged", "v1").await;
    seed_list(&fixture.database, "other", "x").await;
    seed_list(&fixture.database, "ranged", "v2").await;
    seed_list(&fixture.database, "ranged", "v3").await;
    seed_list(&fixture.database, "ranged", "v4").await;

    // Positions 1..=2 of [v4, v3, v2, v1]
    let window = collections.get_range_from_list("ranged", 1, 2).await.unwrap();
    assert_eq!(window, vec![Some("v3".to_string()), Some("v2".to_string())]);

    // A window past the end is simply empty
    assert!(collections
        .get_range_from_list("ranged", 10, 20)
        .await
        .unwrap()
        .is_empty());

    // Inverted bounds yield empty rather than an error
    assert!(collections
        .get_range_from_list("ranged", 2, 1)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_range_with_negative_start_is_empty() {
    let fixture = test_database().await;
    let collections = fixture.dal.collections();

    seed_list(&fixture.database, "neg", "v1").await;
    seed_list(&fixture.database, "neg", "v2").await;
    seed_set(&fixture.database, "neg", "a", 1.0).await;
    seed_set(&fixture.database, "neg", "b", 2.0).await;

    // A negative start must not fall back to the head window
    assert!(collections
        .get_range_from_list("neg", -1, 1)
        .await
        .unwrap()
        .is_empty());
    assert!(collections
        .get_range_from_set("neg", -1, 1)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_list_missing_key_is_empty() {
    let fixture = test_database().await;
    let collections = fixture.dal.collections();

    assert!(collections
        .get_all_items_from_list("no-such-list")
        .await
        .unwrap()
        .is_empty());
    assert_eq!(collections.get_list_count("no-such-list").await.unwrap(), 0);
    assert!(collections.get_list_ttl("no-such-list").await.unwrap() < Duration::zero());
}

// ----------------------------------------------------------------------
// Set
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_set_range_orders_by_score_then_insertion() {
    let fixture = test_database().await;
    let collections = fixture.dal.collections();

    // Insert out of score order, with a tie on 1.0
    seed_set(&fixture.database, "scored", "b", 2.0).await;
    seed_set(&fixture.database, "scored", "tie-first", 1.0).await;
    seed_set(&fixture.database, "scored", "tie-second", 1.0).await;
    seed_set(&fixture.database, "scored", "d", 5.0).await;
    seed_set(&fixture.database, "scored", "c", 3.0).await;

    let all = collections.get_range_from_set("scored", 0, 10).await.unwrap();
    assert_eq!(all, vec!["tie-first", "tie-second", "b", "c", "d"]);

    let window = collections.get_range_from_set("scored", 1, 3).await.unwrap();
    assert_eq!(window, vec!["tie-second", "b", "c"]);

    assert!(collections
        .get_range_from_set("scored", 3, 1)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(collections.get_set_count("scored").await.unwrap(), 5);
}

#[tokio::test]
async fn test_set_equal_scores_keep_insertion_order() {
    let fixture = test_database().await;
    let collections = fixture.dal.collections();

    seed_set(&fixture.database, "flat", "1", 0.0).await;
    seed_set(&fixture.database, "flat", "2", 0.0).await;
    seed_set(&fixture.database, "noise", "x", 0.0).await;
    seed_set(&fixture.database, "flat", "4", 0.0).await;
    seed_set(&fixture.database, "flat", "5", 0.0).await;
    seed_set(&fixture.database, "flat", "3", 0.0).await;

    let window = collections.get_range_from_set("flat", 0, 4).await.unwrap();
    assert_eq!(window, vec!["1", "2", "4", "5", "3"]);
}

#[tokio::test]
async fn test_set_first_by_lowest_score() {
    let fixture = test_database().await;
    let collections = fixture.dal.collections();

    seed_set(&fixture.database, "schedule", "early", 100.0).await;
    seed_set(&fixture.database, "schedule", "late", 200.0).await;

    assert_eq!(
        collections
            .get_first_by_lowest_score_from_set("schedule", 0.0, 150.0)
            .await
            .unwrap(),
        Some("early".to_string())
    );
    assert_eq!(
        collections
            .get_first_by_lowest_score_from_set("schedule", 150.0, 300.0)
            .await
            .unwrap(),
        Some("late".to_string())
    );
    assert!(collections
        .get_first_by_lowest_score_from_set("schedule", 300.0, 400.0)
        .await
        .unwrap()
        .is_none());

    let err = collections
        .get_first_by_lowest_score_from_set("schedule", 10.0, 5.0)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidRange { .. }));
}

#[tokio::test]
async fn test_set_expired_members_are_invisible() {
    let fixture = test_database().await;
    let collections = fixture.dal.collections();

    seed_set(&fixture.database, "retry", "live", 1.0).await;
    let expired = NewSetEntry {
        key: "retry".to_string(),
        value: "stale".to_string(),
        score: 0.5,
        expire_at: Some(DbTimestamp(Utc::now() - Duration::minutes(1))),
    };
    let conn = fixture.database.get_connection().await.unwrap();
    conn.interact(move |conn| {
        diesel::insert_into(sets::table)
            .values(&expired)
            .execute(conn)
    })
    .await
    .unwrap()
    .unwrap();
    drop(conn);

    assert_eq!(
        collections.get_all_items_from_set("retry").await.unwrap(),
        vec!["live"]
    );
    assert_eq!(
        collections
            .get_first_by_lowest_score_from_set("retry", 0.0, 10.0)
            .await
            .unwrap(),
        Some("live".to_string())
    );
    assert_eq!(collections.get_set_count("retry").await.unwrap(), 1);
}

// ----------------------------------------------------------------------
// Counter
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_counter_sums_raw_and_aggregated() {
    let fixture = test_database().await;
    let collections = fixture.dal.collections();

    let conn = fixture.database.get_connection().await.unwrap();
    conn.interact(|conn| {
        let raw = vec![
            NewCounterEntry {
                key: "stats:succeeded".to_string(),
                value: 1,
            },
            NewCounterEntry {
                key: "stats:succeeded".to_string(),
                value: 1,
            },
            NewCounterEntry {
                key: "stats:succeeded".to_string(),
                value: -1,
            },
            NewCounterEntry {
                key: "stats:other".to_string(),
                value: 7,
            },
        ];
        diesel::insert_into(counters::table)
            .values(&raw)
            .execute(conn)?;

        diesel::insert_into(aggregated_counters::table)
            .values(&AggregatedCounter {
                key: "stats:succeeded".to_string(),
                value: 10,
            })
            .execute(conn)
    })
    .await
    .unwrap()
    .unwrap();
    drop(conn);

    // 1 + 1 - 1 raw plus 10 aggregated
    assert_eq!(collections.get_counter("stats:succeeded").await.unwrap(), 11);
    assert_eq!(collections.get_counter("stats:other").await.unwrap(), 7);
    assert_eq!(collections.get_counter("stats:missing").await.unwrap(), 0);
}

#[tokio::test]
async fn test_collection_keys_must_be_nonempty() {
    let fixture = test_database().await;
    let collections = fixture.dal.collections();

    assert!(matches!(
        collections.get_all_entries_from_hash("").await.unwrap_err(),
        StorageError::InvalidArgument("key")
    ));
    assert!(matches!(
        collections.get_value_from_hash("k", "").await.unwrap_err(),
        StorageError::InvalidArgument("name")
    ));
    assert!(matches!(
        collections.get_counter("").await.unwrap_err(),
        StorageError::InvalidArgument("key")
    ));
}
