#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use hearthbook_migration::model::{LabelRecord, LegacySnapshot};
use hearthbook_migration::resolve::ResolvedJoins;
use hearthbook_migration::validate::{self, ExpectedCounts};
use hearthbook_migration::writer::write_and_validate;
use hearthbook_migration::{id, MigrationStats, ValidationError};
use tempfile::TempDir;
use uuid::Uuid;

#[tokio::test]
async fn count_mismatch_is_reported() {
    let dir = TempDir::new().unwrap();
    let pool = common::target_pool(dir.path()).await;
    let mut conn = pool.acquire().await.unwrap();

    let expected = ExpectedCounts {
        labels: 1,
        ..ExpectedCounts::default()
    };
    let err = validate::verify(&mut *conn, &expected).await.unwrap_err();
    assert!(matches!(
        err,
        ValidationError::CountMismatch {
            table: "labels",
            expected: 1,
            actual: 0,
        }
    ));

    drop(conn);
    pool.close().await;
}

#[tokio::test]
async fn dangling_reference_is_reported() {
    let dir = TempDir::new().unwrap();
    let pool = common::target_pool(dir.path()).await;
    let mut conn = pool.acquire().await.unwrap();

    // Constraints off so the bad row can be planted for the validator to find.
    sqlx::query("PRAGMA foreign_keys = OFF")
        .execute(&mut *conn)
        .await
        .unwrap();
    sqlx::query("INSERT INTO locations (id, home_id, name, photos) VALUES (?, ?, ?, '[]')")
        .bind(Uuid::new_v4().to_string())
        .bind(Uuid::new_v4().to_string())
        .bind("Cellar")
        .execute(&mut *conn)
        .await
        .unwrap();

    let expected = ExpectedCounts {
        locations: 1,
        ..ExpectedCounts::default()
    };
    let err = validate::verify(&mut *conn, &expected).await.unwrap_err();
    assert!(matches!(
        err,
        ValidationError::DanglingReference {
            table: "locations",
            column: "home_id",
            count: 1,
        }
    ));

    drop(conn);
    pool.close().await;
}

#[tokio::test]
async fn malformed_identifier_is_reported() {
    let dir = TempDir::new().unwrap();
    let pool = common::target_pool(dir.path()).await;
    let mut conn = pool.acquire().await.unwrap();

    sqlx::query("INSERT INTO labels (id, name) VALUES ('legacy-7', 'Tools')")
        .execute(&mut *conn)
        .await
        .unwrap();

    let expected = ExpectedCounts {
        labels: 1,
        ..ExpectedCounts::default()
    };
    let err = validate::verify(&mut *conn, &expected).await.unwrap_err();
    assert!(matches!(
        err,
        ValidationError::InvalidIdentifier { table: "labels", .. }
    ));

    drop(conn);
    pool.close().await;
}

/// A payload that cannot pass constraints leaves the target store exactly as
/// it was: nothing from the failed transaction is visible afterwards.
#[tokio::test]
async fn failed_write_rolls_back_every_row() {
    let dir = TempDir::new().unwrap();
    let pool = common::target_pool(dir.path()).await;

    let mut snapshot = LegacySnapshot::default();
    snapshot.labels.push(LabelRecord {
        id: id::new_stable_id(),
        legacy_id: 1,
        name: "Tools".into(),
        description: None,
        color: None,
        emoji: None,
    });

    // A join row whose endpoints were never part of the payload.
    let joins = ResolvedJoins {
        item_labels: vec![(id::new_stable_id(), id::new_stable_id())],
        home_policies: Vec::new(),
    };

    let mut stats = MigrationStats::default();
    assert!(write_and_validate(&pool, &snapshot, &joins, &mut stats)
        .await
        .is_err());

    assert_eq!(common::count(&pool, "labels").await, 0);
    assert_eq!(common::count(&pool, "item_labels").await, 0);

    pool.close().await;
}
