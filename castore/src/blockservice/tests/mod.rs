//! This contains test scenarios that a given [BlockService] needs to pass.
//! We use [rstest] and [rstest_reuse] to provide all services we want to test
//! against, and then apply this template to all test functions.

use bytes::Bytes;
use rstest::*;
use rstest_reuse::{self, *};
use std::path::PathBuf;

use super::BlockService;
use crate::blockservice::{self, SimpleFilesystemBlockService};
use crate::fixtures::{BLOB_A, BLOB_A_DIGEST, BLOB_B, BLOB_B_DIGEST};
use crate::Error;

/// A fresh directory which outlives the test.
fn tempdir_path() -> PathBuf {
    tempfile::TempDir::new().unwrap().into_path()
}

/// This produces a template, which will be applied to all individual test functions.
/// See https://github.com/la10736/rstest/issues/130#issuecomment-968864832
#[template]
#[rstest]
#[case::memory(blockservice::from_addr("memory://").await.unwrap())]
#[case::sled(blockservice::from_addr("sled://").await.unwrap())]
#[case::simplefs(SimpleFilesystemBlockService::new(tempdir_path()).await.unwrap())]
pub fn block_services(#[case] block_service: impl BlockService) {}

/// Using [BlockService::has] on a non-existing block should return false.
#[apply(block_services)]
#[tokio::test]
async fn has_nonexistent_false(block_service: impl BlockService) {
    assert!(!block_service
        .has(&BLOB_A_DIGEST)
        .await
        .expect("must not fail"));
}

/// Trying to get a non-existing block should return a None.
#[apply(block_services)]
#[tokio::test]
async fn not_found_get(block_service: impl BlockService) {
    assert!(block_service
        .get(&BLOB_A_DIGEST)
        .await
        .expect("must not fail")
        .is_none())
}

/// Put a block in the store, check has, get it back.
#[apply(block_services)]
#[tokio::test]
async fn put_has_get(block_service: impl BlockService) {
    for (contents, digest) in &[
        (&*BLOB_A, BLOB_A_DIGEST.clone()),
        (&*BLOB_B, BLOB_B_DIGEST.clone()),
    ] {
        block_service
            .put(digest, (*contents).clone())
            .await
            .expect("put must succeed");

        assert!(block_service.has(digest).await.expect("must not fail"));

        assert_eq!(
            Some((*contents).clone()),
            block_service.get(digest).await.expect("must not fail")
        );
    }
}

/// Putting the same block twice is a no-op.
#[apply(block_services)]
#[tokio::test]
async fn put_idempotent(block_service: impl BlockService) {
    for _ in 0..2 {
        block_service
            .put(&BLOB_A_DIGEST, BLOB_A.clone())
            .await
            .expect("put must succeed");
    }

    assert_eq!(
        Some(BLOB_A.clone()),
        block_service.get(&BLOB_A_DIGEST).await.expect("must not fail")
    );
}

/// Putting data under a digest it doesn't hash to must fail, and leave
/// nothing behind.
#[apply(block_services)]
#[tokio::test]
async fn put_mismatch_rejected(block_service: impl BlockService) {
    let res = block_service.put(&BLOB_A_DIGEST, BLOB_B.clone()).await;
    match res {
        Err(Error::Integrity { expected, actual }) => {
            assert_eq!(*BLOB_A_DIGEST, expected);
            assert_eq!(*BLOB_B_DIGEST, actual);
        }
        other => panic!("expected integrity error, got {:?}", other),
    }

    assert!(!block_service
        .has(&BLOB_A_DIGEST)
        .await
        .expect("must not fail"));
    assert!(block_service
        .get(&BLOB_A_DIGEST)
        .await
        .expect("must not fail")
        .is_none());
}

/// Many concurrent puts of the same and different blocks all succeed, and
/// every block is readable afterwards.
#[apply(block_services)]
#[tokio::test]
async fn concurrent_puts(block_service: impl BlockService) {
    let blocks: Vec<Bytes> = (0u8..16).map(|i| Bytes::from(vec![i; 64])).collect();

    let puts = blocks.iter().chain(blocks.iter()).map(|data| {
        let block_service = &block_service;
        async move {
            let digest = crate::ContentHash::of(data);
            block_service.put(&digest, data.clone()).await
        }
    });

    for res in futures::future::join_all(puts).await {
        res.expect("put must succeed");
    }

    for data in &blocks {
        assert_eq!(
            Some(data.clone()),
            block_service
                .get(&crate::ContentHash::of(data))
                .await
                .expect("must not fail")
        );
    }
}
