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

//! Diesel table definitions for the storage schema.
//!
//! UUID columns are `Binary` (16-byte BLOBs), timestamps are `Text`
//! (RFC 3339, see [`crate::database::types`]). Surrogate `BigInt` ids on the
//! collection tables double as insertion-order markers: list reads order by
//! `id DESC`, set reads break score ties by `id ASC`.

diesel::table! {
    jobs (id) {
        id -> Binary,
        invocation_data -> Text,
        arguments -> Text,
        created_at -> Text,
        expire_at -> Nullable<Text>,
        state_name -> Nullable<Text>,
        state_reason -> Nullable<Text>,
        state_data -> Nullable<Text>,
        last_state_changed_at -> Nullable<Text>,
    }
}

diesel::table! {
    job_parameters (id) {
        id -> BigInt,
        job_id -> Binary,
        name -> Text,
        value -> Nullable<Text>,
    }
}

diesel::table! {
    job_states (id) {
        id -> BigInt,
        job_id -> Binary,
        name -> Text,
        reason -> Nullable<Text>,
        created_at -> Text,
        data -> Nullable<Text>,
    }
}

diesel::table! {
    hashes (id) {
        id -> BigInt,
        key -> Text,
        field -> Text,
        value -> Nullable<Text>,
        expire_at -> Nullable<Text>,
    }
}

diesel::table! {
    lists (id) {
        id -> BigInt,
        key -> Text,
        value -> Nullable<Text>,
        expire_at -> Nullable<Text>,
    }
}

diesel::table! {
    sets (id) {
        id -> BigInt,
        key -> Text,
        value -> Text,
        score -> Double,
        expire_at -> Nullable<Text>,
    }
}

diesel::table! {
    counters (id) {
        id -> BigInt,
        key -> Text,
        value -> BigInt,
    }
}

diesel::table! {
    aggregated_counters (key) {
        key -> Text,
        value -> BigInt,
    }
}

diesel::table! {
    servers (id) {
        id -> Text,
        data -> Text,
        last_heartbeat -> Text,
    }
}

diesel::table! {
    distributed_locks (resource) {
        resource -> Text,
        holder -> Binary,
        acquired_at -> Text,
        expires_at -> Text,
    }
}

diesel::joinable!(job_parameters -> jobs (job_id));
diesel::joinable!(job_states -> jobs (job_id));

diesel::allow_tables_to_appear_in_same_query!(
    jobs,
    job_parameters,
    job_states,
    hashes,
    lists,
    sets,
    counters,
    aggregated_counters,
    servers,
    distributed_locks,
);
