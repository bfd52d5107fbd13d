#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use hearthbook_migration::{db, migrate, MigrationEnv};

/// Oldest supported generation: no stable ids, no parent-home columns at
/// all, a single-label column on items, no join tables.
pub const GEN_A_DDL: &str = "
CREATE TABLE labels (id INTEGER PRIMARY KEY, name TEXT, label_description TEXT, color, emoji TEXT);
CREATE TABLE homes (id INTEGER PRIMARY KEY, name TEXT, address1 TEXT, address2 TEXT, city TEXT,
  state TEXT, zip TEXT, country TEXT, purchase_date REAL, purchase_price, primary_photo TEXT,
  photos, is_primary INTEGER, color, created_date REAL);
CREATE TABLE policies (id INTEGER PRIMARY KEY, provider TEXT, policy_number TEXT,
  coverage_dwelling, coverage_other_structures, coverage_personal_property,
  coverage_loss_of_use, coverage_liability, coverage_medical, start_date REAL, end_date REAL);
CREATE TABLE locations (id INTEGER PRIMARY KEY, name TEXT, location_description TEXT, icon TEXT, photos);
CREATE TABLE items (id INTEGER PRIMARY KEY, title TEXT, quantity_text TEXT, quantity INTEGER,
  item_description TEXT, serial_number TEXT, model_number TEXT, make TEXT, price,
  insured INTEGER, notes TEXT, photos, created_date REAL, purchase_date REAL, warranty_date REAL,
  dimensions TEXT, weight TEXT, color TEXT, fragile INTEGER, moving_priority INTEGER,
  room_destination TEXT, label_id INTEGER);
";

/// Mid generation: locations gained a home column and policies a direct
/// home column; item labels moved to a join table; items link to locations
/// but still not to homes.
pub const GEN_B_DDL: &str = "
CREATE TABLE labels (id INTEGER PRIMARY KEY, name TEXT, label_description TEXT, color, emoji TEXT);
CREATE TABLE homes (id INTEGER PRIMARY KEY, name TEXT, address1 TEXT, address2 TEXT, city TEXT,
  state TEXT, zip TEXT, country TEXT, purchase_date REAL, purchase_price, primary_photo TEXT,
  photos, is_primary INTEGER, color, created_date REAL);
CREATE TABLE policies (id INTEGER PRIMARY KEY, provider TEXT, policy_number TEXT,
  coverage_dwelling, coverage_other_structures, coverage_personal_property,
  coverage_loss_of_use, coverage_liability, coverage_medical, start_date REAL, end_date REAL,
  home_id INTEGER);
CREATE TABLE locations (id INTEGER PRIMARY KEY, name TEXT, location_description TEXT, icon TEXT,
  photos, home_id INTEGER);
CREATE TABLE items (id INTEGER PRIMARY KEY, title TEXT, quantity_text TEXT, quantity INTEGER,
  item_description TEXT, serial_number TEXT, model_number TEXT, make TEXT, price,
  insured INTEGER, notes TEXT, photos, created_date REAL, purchase_date REAL, warranty_date REAL,
  dimensions TEXT, weight TEXT, color TEXT, fragile INTEGER, moving_priority INTEGER,
  room_destination TEXT, location_id INTEGER);
CREATE TABLE item_labels (item_id INTEGER, label_id INTEGER);
";

/// Newest legacy generation: uuid columns everywhere, full parent links,
/// extended item columns, both join tables.
pub const GEN_C_DDL: &str = "
CREATE TABLE labels (id INTEGER PRIMARY KEY, uuid TEXT, name TEXT, label_description TEXT, color, emoji TEXT);
CREATE TABLE homes (id INTEGER PRIMARY KEY, uuid TEXT, name TEXT, address1 TEXT, address2 TEXT,
  city TEXT, state TEXT, zip TEXT, country TEXT, purchase_date REAL, purchase_price,
  primary_photo TEXT, photos, is_primary INTEGER, color, created_date REAL);
CREATE TABLE policies (id INTEGER PRIMARY KEY, uuid TEXT, provider TEXT, policy_number TEXT,
  coverage_dwelling, coverage_other_structures, coverage_personal_property,
  coverage_loss_of_use, coverage_liability, coverage_medical, start_date REAL, end_date REAL);
CREATE TABLE locations (id INTEGER PRIMARY KEY, uuid TEXT, name TEXT, location_description TEXT,
  icon TEXT, photos, home_id INTEGER);
CREATE TABLE items (id INTEGER PRIMARY KEY, uuid TEXT, title TEXT, quantity_text TEXT,
  quantity INTEGER, item_description TEXT, serial_number TEXT, model_number TEXT, make TEXT,
  price, insured INTEGER, notes TEXT, photos, created_date REAL, purchase_date REAL,
  warranty_date REAL, dimensions TEXT, weight TEXT, color TEXT, fragile INTEGER,
  moving_priority INTEGER, room_destination TEXT, replacement_cost, depreciation_rate,
  ai_assisted INTEGER, location_id INTEGER, home_id INTEGER);
CREATE TABLE item_labels (item_id INTEGER, label_id INTEGER);
CREATE TABLE home_policies (home_id INTEGER, policy_id INTEGER);
";

pub fn legacy_path(dir: &Path) -> std::path::PathBuf {
    dir.join("legacy.sqlite3")
}

pub fn env_for(dir: &Path) -> MigrationEnv {
    MigrationEnv::new(
        legacy_path(dir),
        dir.join("migration-state.json"),
        dir.join("legacy-backup"),
    )
}

/// Open (creating) the target store in the temp dir and apply its schema.
pub async fn target_pool(dir: &Path) -> SqlitePool {
    let pool = db::open_target_pool(&dir.join("hearthbook.sqlite3"))
        .await
        .expect("open target pool");
    migrate::apply_migrations(&pool).await.expect("apply DDL");
    pool
}

/// Create a legacy fixture file with the given generation's DDL.
pub async fn create_legacy(dir: &Path, ddl: &str) -> SqlitePool {
    let opts = SqliteConnectOptions::from_str(&legacy_path(dir).display().to_string())
        .unwrap()
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .expect("create legacy fixture");
    for stmt in ddl.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(&pool).await.expect("fixture DDL");
    }
    pool
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count rows")
}
