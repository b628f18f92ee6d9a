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

//! Data Access Layer
//!
//! Each storage component owns its own tables exclusively and is reached
//! through an accessor on [`DAL`]. The DAL holds no state of its own beyond
//! the connection pool; every mutating operation executes as one transaction.

use crate::database::Database;

pub mod collection;
pub mod job;
pub mod lock;
pub mod server;

pub use collection::CollectionDAL;
pub use job::JobDAL;
pub use lock::{DistributedLockGuard, LockDAL};
pub use server::ServerDAL;

/// The main Data Access Layer struct.
///
/// `DAL` is `Clone`; each clone references the same underlying connection
/// pool.
#[derive(Clone, Debug)]
pub struct DAL {
    /// The database instance with connection pool
    pub database: Database,
}

impl DAL {
    /// Creates a new DAL instance.
    pub fn new(database: Database) -> Self {
        DAL { database }
    }

    /// Returns a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Returns a job DAL for job repository operations.
    pub fn jobs(&self) -> JobDAL {
        JobDAL::new(self)
    }

    /// Returns a collection DAL for hash/list/set/counter operations.
    pub fn collections(&self) -> CollectionDAL {
        CollectionDAL::new(self)
    }

    /// Returns a server DAL for worker registry operations.
    pub fn servers(&self) -> ServerDAL {
        ServerDAL::new(self)
    }

    /// Returns a lock DAL for distributed lock operations.
    pub fn locks(&self) -> LockDAL {
        LockDAL::new(self)
    }
}
