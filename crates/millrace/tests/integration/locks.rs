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

//! Integration tests for the distributed lock: mutual exclusion, timeout,
//! release and lease expiry.

use serial_test::serial;
use std::time::Duration;

use millrace::dal::DAL;
use millrace::StorageError;

use crate::fixtures::test_database;

#[tokio::test]
async fn test_acquire_and_release() {
    let fixture = test_database().await;

    let guard = fixture
        .dal
        .locks()
        .acquire("cron:nightly", Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(guard.resource(), "cron:nightly");
    guard.release().await.unwrap();

    // Released lock is immediately acquirable again
    let guard = fixture
        .dal
        .locks()
        .acquire("cron:nightly", Duration::from_secs(5))
        .await
        .unwrap();
    guard.release().await.unwrap();
}

#[tokio::test]
async fn test_distinct_resources_do_not_contend() {
    let fixture = test_database().await;

    let first = fixture
        .dal
        .locks()
        .acquire("resource-a", Duration::from_secs(5))
        .await
        .unwrap();
    let second = fixture
        .dal
        .locks()
        .acquire("resource-b", Duration::from_secs(5))
        .await
        .unwrap();

    first.release().await.unwrap();
    second.release().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_contended_acquire_times_out() {
    let fixture = test_database().await;

    let _held = fixture
        .dal
        .locks()
        .acquire("singleton", Duration::from_secs(30))
        .await
        .unwrap();

    let err = fixture
        .dal
        .locks()
        .acquire("singleton", Duration::from_millis(300))
        .await
        .unwrap_err();
    match err {
        StorageError::LockTimeout { resource, .. } => assert_eq!(resource, "singleton"),
        other => panic!("expected LockTimeout, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_release_unblocks_waiter() {
    let fixture = test_database().await;

    let guard = fixture
        .dal
        .locks()
        .acquire("handoff", Duration::from_secs(30))
        .await
        .unwrap();

    let dal: DAL = fixture.dal.clone();
    let waiter = tokio::spawn(async move {
        dal.locks().acquire("handoff", Duration::from_secs(5)).await
    });

    tokio::time::sleep(Duration::from_millis(150)).await;
    guard.release().await.unwrap();

    let reacquired = waiter.await.unwrap().unwrap();
    reacquired.release().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_expired_lock_is_reclaimable() {
    let fixture = test_database().await;

    // The lease matches the acquire timeout. Forget the guard so no release
    // ever happens, as if the holder crashed.
    let guard = fixture
        .dal
        .locks()
        .acquire("crashed", Duration::from_millis(200))
        .await
        .unwrap();
    std::mem::forget(guard);

    tokio::time::sleep(Duration::from_millis(250)).await;

    let reclaimed = fixture
        .dal
        .locks()
        .acquire("crashed", Duration::from_secs(2))
        .await
        .unwrap();
    reclaimed.release().await.unwrap();
}

#[tokio::test]
async fn test_empty_resource_is_rejected() {
    let fixture = test_database().await;

    let err = fixture
        .dal
        .locks()
        .acquire("", Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidArgument("resource")));
}
