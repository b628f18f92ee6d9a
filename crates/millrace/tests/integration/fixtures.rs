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

//! Test fixtures.
//!
//! Each test gets its own on-disk SQLite database in a temp directory so
//! tests stay independent and can run under the multi-threaded runtime.

use millrace::dal::DAL;
use millrace::Database;
use tempfile::TempDir;

/// A migrated database backed by a temp directory. The directory is removed
/// when the fixture drops.
pub struct TestDatabase {
    pub dal: DAL,
    pub database: Database,
    _dir: TempDir,
}

pub async fn test_database() -> TestDatabase {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("millrace-test.db");
    let database = Database::new(path.to_str().expect("temp path is not UTF-8"), 1);
    database
        .run_migrations()
        .await
        .expect("Failed to run migrations");

    TestDatabase {
        dal: DAL::new(database.clone()),
        database,
        _dir: dir,
    }
}
