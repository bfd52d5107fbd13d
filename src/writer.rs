use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::error::MigrationError;
use crate::model::{HomeRecord, ItemRecord, LabelRecord, LegacySnapshot, LocationRecord, PolicyRecord};
use crate::report::MigrationStats;
use crate::resolve::ResolvedJoins;
use crate::validate::{self, ExpectedCounts};

/// Commit every converted entity and resolved relationship in a single
/// transaction, then validate inside that same transaction before COMMIT.
/// Either every row lands and survives validation, or the transaction rolls
/// back and the target store is exactly as it was.
pub async fn write_and_validate(
    pool: &SqlitePool,
    snapshot: &LegacySnapshot,
    joins: &ResolvedJoins,
    stats: &mut MigrationStats,
) -> Result<(), MigrationError> {
    let expected = ExpectedCounts {
        labels: snapshot.labels.len() as u64,
        homes: snapshot.homes.len() as u64,
        policies: snapshot.policies.len() as u64,
        locations: snapshot.locations.len() as u64,
        items: snapshot.items.len() as u64,
        item_labels: joins.item_labels.len() as u64,
        home_policies: joins.home_policies.len() as u64,
    };

    let mut tx = pool.begin().await?;
    info!(target: "hearthbook", event = "db_tx_begin");

    let write = async {
        for label in &snapshot.labels {
            insert_label(&mut *tx, label).await?;
        }
        for home in &snapshot.homes {
            insert_home(&mut *tx, home).await?;
        }
        for policy in &snapshot.policies {
            insert_policy(&mut *tx, policy).await?;
        }
        for location in &snapshot.locations {
            insert_location(&mut *tx, location).await?;
        }
        for item in &snapshot.items {
            insert_item(&mut *tx, item).await?;
        }
        for (item_id, label_id) in &joins.item_labels {
            insert_item_label(&mut *tx, *item_id, *label_id).await?;
        }
        for (home_id, policy_id) in &joins.home_policies {
            insert_home_policy(&mut *tx, *home_id, *policy_id).await?;
        }
        validate::verify(&mut *tx, &expected)
            .await
            .map_err(MigrationError::from)
    };

    if let Err(err) = write.await {
        tx.rollback().await.ok();
        info!(target: "hearthbook", event = "db_tx_rollback");
        return Err(err);
    }

    tx.commit().await?;
    info!(target: "hearthbook", event = "db_tx_commit");

    stats.labels = expected.labels;
    stats.homes = expected.homes;
    stats.policies = expected.policies;
    stats.locations = expected.locations;
    stats.items = expected.items;
    stats.item_labels = expected.item_labels;
    stats.home_policies = expected.home_policies;

    Ok(())
}

// One shared insertion routine per entity type. Any recovery path that
// re-inserts rows must call these same routines so column lists cannot
// drift.

pub(crate) async fn insert_label(
    conn: &mut SqliteConnection,
    label: &LabelRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO labels (id, name, description, color, emoji) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(label.id.to_string())
    .bind(&label.name)
    .bind(&label.description)
    .bind(label.color)
    .bind(&label.emoji)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_home(
    conn: &mut SqliteConnection,
    home: &HomeRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO homes (id, name, address_line1, address_line2, city, region, \
                postal_code, country, purchase_date, purchase_price, primary_photo, \
                secondary_photos, is_primary, color_tag) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(home.id.to_string())
    .bind(&home.name)
    .bind(&home.address_line1)
    .bind(&home.address_line2)
    .bind(&home.city)
    .bind(&home.region)
    .bind(&home.postal_code)
    .bind(&home.country)
    .bind(&home.purchase_date)
    .bind(&home.purchase_price)
    .bind(&home.primary_photo)
    .bind(&home.secondary_photos)
    .bind(home.is_primary as i64)
    .bind(home.color_tag)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_policy(
    conn: &mut SqliteConnection,
    policy: &PolicyRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO insurance_policies (id, provider, policy_number, \
                coverage_dwelling, coverage_other_structures, coverage_personal_property, \
                coverage_loss_of_use, coverage_liability, coverage_medical, \
                start_date, end_date) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(policy.id.to_string())
    .bind(&policy.provider)
    .bind(&policy.policy_number)
    .bind(&policy.coverage_dwelling)
    .bind(&policy.coverage_other_structures)
    .bind(&policy.coverage_personal_property)
    .bind(&policy.coverage_loss_of_use)
    .bind(&policy.coverage_liability)
    .bind(&policy.coverage_medical)
    .bind(&policy.start_date)
    .bind(&policy.end_date)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_location(
    conn: &mut SqliteConnection,
    location: &LocationRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO locations (id, home_id, name, description, icon, photos) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(location.id.to_string())
    .bind(location.home_id.map(|id| id.to_string()))
    .bind(&location.name)
    .bind(&location.description)
    .bind(&location.icon)
    .bind(&location.photos)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_item(
    conn: &mut SqliteConnection,
    item: &ItemRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO items (id, location_id, home_id, title, quantity_text, quantity, \
                description, serial_number, model_number, make, price, insured, notes, \
                replacement_cost, depreciation_rate, photos, ai_assisted, created_at, \
                purchase_date, warranty_expires, dimensions, weight, color, fragile, \
                moving_priority, room_destination) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(item.id.to_string())
    .bind(item.location_id.map(|id| id.to_string()))
    .bind(item.home_id.map(|id| id.to_string()))
    .bind(&item.title)
    .bind(&item.quantity_text)
    .bind(item.quantity)
    .bind(&item.description)
    .bind(&item.serial_number)
    .bind(&item.model_number)
    .bind(&item.make)
    .bind(&item.price)
    .bind(item.insured as i64)
    .bind(&item.notes)
    .bind(&item.replacement_cost)
    .bind(&item.depreciation_rate)
    .bind(&item.photos)
    .bind(item.ai_assisted as i64)
    .bind(&item.created_at)
    .bind(&item.purchase_date)
    .bind(&item.warranty_expires)
    .bind(&item.dimensions)
    .bind(&item.weight)
    .bind(&item.color)
    .bind(item.fragile as i64)
    .bind(item.moving_priority)
    .bind(&item.room_destination)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_item_label(
    conn: &mut SqliteConnection,
    item_id: Uuid,
    label_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO item_labels (item_id, label_id) VALUES (?, ?)")
        .bind(item_id.to_string())
        .bind(label_id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn insert_home_policy(
    conn: &mut SqliteConnection,
    home_id: Uuid,
    policy_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO home_policies (home_id, policy_id) VALUES (?, ?)")
        .bind(home_id.to_string())
        .bind(policy_id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}
