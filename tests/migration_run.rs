#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use hearthbook_migration::{run_migration, MigrationOutcome};
use tempfile::TempDir;

const ELECTRONICS_UUID: &str = "6f1b2c3d-4e5f-4a6b-8c7d-9e0f1a2b3c4d";

/// Populate a newest-generation legacy store: uuid columns, full parent
/// links, both join tables, and the extended item columns.
async fn seed_gen_c(dir: &std::path::Path) {
    let pool = common::create_legacy(dir, common::GEN_C_DDL).await;

    sqlx::query(
        "INSERT INTO labels (id, uuid, name, label_description, color, emoji) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(1i64)
    .bind(ELECTRONICS_UUID)
    .bind("Electronics")
    .bind("Plugged-in things")
    .bind("#FF0000")
    .bind("\u{1F4A1}")
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO labels (id, uuid, name) VALUES (?, ?, ?)")
        .bind(2i64)
        .bind(None::<String>)
        .bind("Fragile")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO homes (id, uuid, name, address1, city, country, purchase_date, \
                purchase_price, is_primary, created_date) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(1i64)
    .bind(None::<String>)
    .bind("Maple House")
    .bind("12 Maple Way")
    .bind("Arklow")
    .bind("IE")
    .bind(0.0f64)
    .bind("350000.00")
    .bind(1i64)
    .bind(0.0f64)
    .execute(&pool)
    .await
    .unwrap();

    // Coverage stored as a raw double; the migration must recover the
    // two-decimal textual amount.
    sqlx::query(
        "INSERT INTO policies (id, uuid, provider, policy_number, coverage_dwelling, start_date) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(1i64)
    .bind(None::<String>)
    .bind("Acme Mutual")
    .bind("HM-100")
    .bind(99.99f64)
    .bind(0.0f64)
    .execute(&pool)
    .await
    .unwrap();

    for (id, name) in [(1i64, "Garage"), (2i64, "Attic")] {
        sqlx::query("INSERT INTO locations (id, uuid, name, home_id) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(None::<String>)
            .bind(name)
            .bind(1i64)
            .execute(&pool)
            .await
            .unwrap();
    }

    sqlx::query(
        "INSERT INTO items (id, title, quantity, price, location_id, home_id) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(1i64)
    .bind("Drill")
    .bind(1i64)
    .bind("19.99")
    .bind(1i64)
    .bind(1i64)
    .execute(&pool)
    .await
    .unwrap();
    // Home link missing; must be backfilled through the Attic location.
    sqlx::query(
        "INSERT INTO items (id, title, quantity, price, location_id, home_id) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(2i64)
    .bind("Telescope")
    .bind(1i64)
    .bind(99.99f64)
    .bind(2i64)
    .bind(None::<i64>)
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO items (id, title, quantity, home_id, fragile) VALUES (?, ?, ?, ?, ?)")
        .bind(3i64)
        .bind("Sofa")
        .bind(1i64)
        .bind(1i64)
        .bind(1i64)
        .execute(&pool)
        .await
        .unwrap();

    for (item, label) in [(1i64, 1i64), (1, 2), (2, 1), (3, 999)] {
        sqlx::query("INSERT INTO item_labels (item_id, label_id) VALUES (?, ?)")
            .bind(item)
            .bind(label)
            .execute(&pool)
            .await
            .unwrap();
    }
    sqlx::query("INSERT INTO home_policies (home_id, policy_id) VALUES (?, ?)")
        .bind(1i64)
        .bind(1i64)
        .execute(&pool)
        .await
        .unwrap();

    pool.close().await;
}

#[tokio::test]
async fn migrates_newest_generation_end_to_end() {
    let dir = TempDir::new().unwrap();
    seed_gen_c(dir.path()).await;

    let pool = common::target_pool(dir.path()).await;
    let env = common::env_for(dir.path());

    let outcome = run_migration(&pool, &env).await.unwrap();
    let stats = match outcome {
        MigrationOutcome::Success(stats) => stats,
        other => panic!("expected success, got {other:?}"),
    };

    assert_eq!(stats.labels, 2);
    assert_eq!(stats.homes, 1);
    assert_eq!(stats.policies, 1);
    assert_eq!(stats.locations, 2);
    assert_eq!(stats.items, 3);
    assert_eq!(stats.item_labels, 3);
    assert_eq!(stats.home_policies, 1);
    assert_eq!(stats.skipped_item_labels, 1);
    assert_eq!(stats.backfilled_item_homes, 1);
    assert_eq!(stats.synthesized_homes, 0);
    assert_eq!(stats.single_home_assignments, 0);

    // A pre-existing stable identifier survives unchanged.
    let id: String = sqlx::query_scalar("SELECT id FROM labels WHERE name = 'Electronics'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(id, ELECTRONICS_UUID);

    // Money lands as exact decimal text, whether the source was text or a
    // binary double.
    let drill: String = sqlx::query_scalar("SELECT price FROM items WHERE title = 'Drill'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(drill, "19.99");
    let telescope: String = sqlx::query_scalar("SELECT price FROM items WHERE title = 'Telescope'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(telescope, "99.99");
    let coverage: String =
        sqlx::query_scalar("SELECT coverage_dwelling FROM insurance_policies")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(coverage, "99.99");

    // Seconds-since-reference-date becomes a calendar timestamp.
    let purchased: String = sqlx::query_scalar("SELECT purchase_date FROM homes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(purchased, "2001-01-01 00:00:00");

    // The backfilled item points at the same home as its location.
    let (item_home, location_home): (String, String) = sqlx::query_as(
        "SELECT i.home_id, l.home_id FROM items i \
           JOIN locations l ON i.location_id = l.id \
          WHERE i.title = 'Telescope'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(item_home, location_home);

    // Legacy file archived, not deleted.
    assert!(!common::legacy_path(dir.path()).exists());
    let backups: Vec<_> = std::fs::read_dir(dir.path().join("legacy-backup"))
        .unwrap()
        .collect();
    assert_eq!(backups.len(), 1);

    pool.close().await;
}

#[tokio::test]
async fn rerun_after_success_is_a_noop() {
    let dir = TempDir::new().unwrap();
    seed_gen_c(dir.path()).await;

    let pool = common::target_pool(dir.path()).await;
    let env = common::env_for(dir.path());

    assert!(matches!(
        run_migration(&pool, &env).await.unwrap(),
        MigrationOutcome::Success(_)
    ));
    let items_after_first = common::count(&pool, "items").await;

    assert_eq!(
        run_migration(&pool, &env).await.unwrap(),
        MigrationOutcome::AlreadyCompleted
    );
    assert_eq!(common::count(&pool, "items").await, items_after_first);

    pool.close().await;
}

#[tokio::test]
async fn unconvertible_money_text_becomes_null_and_is_counted() {
    let dir = TempDir::new().unwrap();
    let legacy = common::create_legacy(dir.path(), common::GEN_B_DDL).await;
    sqlx::query("INSERT INTO homes (id, name, created_date) VALUES (1, 'Mill House', 0.0)")
        .execute(&legacy)
        .await
        .unwrap();
    sqlx::query("INSERT INTO items (id, title, quantity, price) VALUES (1, 'Painting', 1, ?)")
        .bind("priceless, ask nana")
        .execute(&legacy)
        .await
        .unwrap();
    legacy.close().await;

    let pool = common::target_pool(dir.path()).await;
    let outcome = run_migration(&pool, &common::env_for(dir.path()))
        .await
        .unwrap();
    let stats = match outcome {
        MigrationOutcome::Success(stats) => stats,
        other => panic!("expected success, got {other:?}"),
    };

    assert_eq!(stats.money_fallbacks, 1);
    let price: Option<String> = sqlx::query_scalar("SELECT price FROM items")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(price, None);

    pool.close().await;
}

#[tokio::test]
async fn missing_legacy_file_is_a_fresh_install() {
    let dir = TempDir::new().unwrap();
    let pool = common::target_pool(dir.path()).await;
    let env = common::env_for(dir.path());

    assert_eq!(
        run_migration(&pool, &env).await.unwrap(),
        MigrationOutcome::FreshInstall
    );
    assert_eq!(common::count(&pool, "items").await, 0);

    // The fresh-install decision is sticky.
    assert_eq!(
        run_migration(&pool, &env).await.unwrap(),
        MigrationOutcome::AlreadyCompleted
    );

    pool.close().await;
}

#[tokio::test]
async fn legacy_file_without_known_tables_is_a_fresh_install() {
    let dir = TempDir::new().unwrap();
    let legacy = common::create_legacy(dir.path(), "CREATE TABLE misc (id INTEGER PRIMARY KEY)").await;
    legacy.close().await;

    let pool = common::target_pool(dir.path()).await;
    let env = common::env_for(dir.path());

    assert_eq!(
        run_migration(&pool, &env).await.unwrap(),
        MigrationOutcome::FreshInstall
    );
    // Unrecognized files are left in place, never archived.
    assert!(common::legacy_path(dir.path()).exists());

    pool.close().await;
}
