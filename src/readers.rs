use futures::TryStreamExt;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::info;

use crate::convert::{
    color_from_cell, date_from_offset, money_from_cell, photo_list_from_cell, ConvertCounts,
};
use crate::id::{stable_id_from_legacy, IdentifierMap};
use crate::model::{
    HomeRecord, ItemRecord, LabelRecord, LegacySnapshot, LocationRecord, PolicyRecord,
};
use crate::probe::SchemaCapabilities;

/// Select a legacy column, or NULL when the detected generation never had it.
fn col(present: bool, name: &str) -> String {
    if present {
        name.to_string()
    } else {
        format!("NULL AS {name}")
    }
}

fn text_cell(row: &SqliteRow, name: &str) -> Option<String> {
    row.try_get::<Option<String>, _>(name).ok().flatten()
}

/// SQLite's dynamic typing means a monetary cell may hold TEXT or a number
/// depending on which legacy build wrote it. Text is authoritative. A cell
/// that holds something unconvertible becomes NULL and is counted, never
/// dropped silently.
fn money_cell(row: &SqliteRow, name: &str, counts: &mut ConvertCounts) -> Option<String> {
    if let Ok(Some(text)) = row.try_get::<Option<String>, _>(name) {
        let converted = money_from_cell(Some(&text), None);
        if converted.is_none() {
            counts.money_fallbacks += 1;
        }
        return converted;
    }
    if let Ok(Some(real)) = row.try_get::<Option<f64>, _>(name) {
        let converted = money_from_cell(None, Some(real));
        if converted.is_none() {
            counts.money_fallbacks += 1;
        }
        return converted;
    }
    if let Ok(Some(int)) = row.try_get::<Option<i64>, _>(name) {
        return money_from_cell(None, Some(int as f64));
    }
    None
}

fn date_cell(row: &SqliteRow, name: &str) -> Option<String> {
    offset_cell(row, name).and_then(date_from_offset)
}

fn offset_cell(row: &SqliteRow, name: &str) -> Option<f64> {
    if let Ok(Some(real)) = row.try_get::<Option<f64>, _>(name) {
        return Some(real);
    }
    if let Ok(Some(int)) = row.try_get::<Option<i64>, _>(name) {
        return Some(int as f64);
    }
    None
}

/// Photo lists and archived colors may be stored as BLOB or TEXT.
fn bytes_cell(row: &SqliteRow, name: &str) -> Option<Vec<u8>> {
    if let Ok(Some(blob)) = row.try_get::<Option<Vec<u8>>, _>(name) {
        return Some(blob);
    }
    if let Ok(Some(text)) = row.try_get::<Option<String>, _>(name) {
        return Some(text.into_bytes());
    }
    None
}

fn bool_cell(row: &SqliteRow, name: &str) -> bool {
    row.try_get::<Option<i64>, _>(name)
        .ok()
        .flatten()
        .is_some_and(|v| v != 0)
}

fn int_cell(row: &SqliteRow, name: &str) -> Option<i64> {
    row.try_get::<Option<i64>, _>(name).ok().flatten()
}

/// Stream every legacy entity table into typed records plus identifier maps.
/// Readers never write to the target store and never resolve relationships.
pub async fn read_snapshot(
    conn: &mut SqliteConnection,
    caps: &SchemaCapabilities,
    counts: &mut ConvertCounts,
) -> Result<LegacySnapshot, sqlx::Error> {
    let mut snapshot = LegacySnapshot::default();

    if caps.labels_table {
        read_labels(conn, caps, counts, &mut snapshot).await?;
    }
    if caps.homes_table {
        read_homes(conn, caps, counts, &mut snapshot).await?;
    }
    if caps.policies_table {
        read_policies(conn, caps, counts, &mut snapshot).await?;
    }
    if caps.locations_table {
        read_locations(conn, caps, counts, &mut snapshot).await?;
    }
    if caps.items_table {
        read_items(conn, caps, counts, &mut snapshot).await?;
    }
    if caps.item_labels_table {
        snapshot.item_label_pairs = read_pairs(conn, "item_labels", "item_id", "label_id").await?;
    }
    if caps.home_policies_table {
        snapshot.home_policy_pairs =
            read_pairs(conn, "home_policies", "home_id", "policy_id").await?;
    }

    info!(
        target: "hearthbook",
        event = "legacy_read",
        labels = snapshot.labels.len(),
        homes = snapshot.homes.len(),
        policies = snapshot.policies.len(),
        locations = snapshot.locations.len(),
        items = snapshot.items.len(),
        item_label_pairs = snapshot.item_label_pairs.len(),
        home_policy_pairs = snapshot.home_policy_pairs.len()
    );

    Ok(snapshot)
}

async fn read_labels(
    conn: &mut SqliteConnection,
    caps: &SchemaCapabilities,
    counts: &mut ConvertCounts,
    snapshot: &mut LegacySnapshot,
) -> Result<(), sqlx::Error> {
    let sql = format!(
        "SELECT id, {}, name, label_description, color, emoji FROM labels ORDER BY id",
        col(caps.labels_uuid, "uuid")
    );
    let mut map = IdentifierMap::new();
    let mut rows = sqlx::query(&sql).fetch(&mut *conn);
    while let Some(row) = rows.try_next().await? {
        let legacy_id: i64 = row.try_get("id")?;
        let id = stable_id_from_legacy(text_cell(&row, "uuid").as_deref());
        map.insert(legacy_id, id);
        snapshot.labels.push(LabelRecord {
            id,
            legacy_id,
            name: text_cell(&row, "name").unwrap_or_default(),
            description: text_cell(&row, "label_description"),
            color: color_from_cell(bytes_cell(&row, "color").as_deref(), counts),
            emoji: text_cell(&row, "emoji"),
        });
    }
    drop(rows);
    snapshot.maps.labels = map;
    Ok(())
}

async fn read_homes(
    conn: &mut SqliteConnection,
    caps: &SchemaCapabilities,
    counts: &mut ConvertCounts,
    snapshot: &mut LegacySnapshot,
) -> Result<(), sqlx::Error> {
    let sql = format!(
        "SELECT id, {}, name, address1, address2, city, state, zip, country, \
                purchase_date, purchase_price, primary_photo, photos, is_primary, color, \
                created_date \
           FROM homes ORDER BY id",
        col(caps.homes_uuid, "uuid")
    );
    let mut map = IdentifierMap::new();
    let mut rows = sqlx::query(&sql).fetch(&mut *conn);
    while let Some(row) = rows.try_next().await? {
        let legacy_id: i64 = row.try_get("id")?;
        let id = stable_id_from_legacy(text_cell(&row, "uuid").as_deref());
        map.insert(legacy_id, id);
        snapshot.homes.push(HomeRecord {
            id,
            legacy_id,
            name: text_cell(&row, "name").unwrap_or_default(),
            address_line1: text_cell(&row, "address1"),
            address_line2: text_cell(&row, "address2"),
            city: text_cell(&row, "city"),
            region: text_cell(&row, "state"),
            postal_code: text_cell(&row, "zip"),
            country: text_cell(&row, "country"),
            purchase_date: date_cell(&row, "purchase_date"),
            purchase_price: money_cell(&row, "purchase_price", counts),
            primary_photo: text_cell(&row, "primary_photo"),
            secondary_photos: photo_list_from_cell(bytes_cell(&row, "photos").as_deref(), counts),
            is_primary: bool_cell(&row, "is_primary"),
            color_tag: color_from_cell(bytes_cell(&row, "color").as_deref(), counts),
            created_offset: offset_cell(&row, "created_date"),
        });
    }
    drop(rows);
    snapshot.maps.homes = map;
    Ok(())
}

async fn read_policies(
    conn: &mut SqliteConnection,
    caps: &SchemaCapabilities,
    counts: &mut ConvertCounts,
    snapshot: &mut LegacySnapshot,
) -> Result<(), sqlx::Error> {
    let sql = format!(
        "SELECT id, {}, provider, policy_number, \
                coverage_dwelling, coverage_other_structures, coverage_personal_property, \
                coverage_loss_of_use, coverage_liability, coverage_medical, \
                start_date, end_date, {} \
           FROM policies ORDER BY id",
        col(caps.policies_uuid, "uuid"),
        col(caps.policies_home_column, "home_id"),
    );
    let mut map = IdentifierMap::new();
    let mut rows = sqlx::query(&sql).fetch(&mut *conn);
    while let Some(row) = rows.try_next().await? {
        let legacy_id: i64 = row.try_get("id")?;
        let id = stable_id_from_legacy(text_cell(&row, "uuid").as_deref());
        map.insert(legacy_id, id);
        snapshot.policies.push(PolicyRecord {
            id,
            legacy_id,
            provider: text_cell(&row, "provider"),
            policy_number: text_cell(&row, "policy_number"),
            coverage_dwelling: money_cell(&row, "coverage_dwelling", counts),
            coverage_other_structures: money_cell(&row, "coverage_other_structures", counts),
            coverage_personal_property: money_cell(&row, "coverage_personal_property", counts),
            coverage_loss_of_use: money_cell(&row, "coverage_loss_of_use", counts),
            coverage_liability: money_cell(&row, "coverage_liability", counts),
            coverage_medical: money_cell(&row, "coverage_medical", counts),
            start_date: date_cell(&row, "start_date"),
            end_date: date_cell(&row, "end_date"),
            legacy_home_id: int_cell(&row, "home_id"),
        });
    }
    drop(rows);
    snapshot.maps.policies = map;
    Ok(())
}

async fn read_locations(
    conn: &mut SqliteConnection,
    caps: &SchemaCapabilities,
    counts: &mut ConvertCounts,
    snapshot: &mut LegacySnapshot,
) -> Result<(), sqlx::Error> {
    let sql = format!(
        "SELECT id, {}, name, location_description, icon, photos, {} \
           FROM locations ORDER BY id",
        col(caps.locations_uuid, "uuid"),
        col(caps.locations_home_column, "home_id"),
    );
    let mut map = IdentifierMap::new();
    let mut rows = sqlx::query(&sql).fetch(&mut *conn);
    while let Some(row) = rows.try_next().await? {
        let legacy_id: i64 = row.try_get("id")?;
        let id = stable_id_from_legacy(text_cell(&row, "uuid").as_deref());
        map.insert(legacy_id, id);
        snapshot.locations.push(LocationRecord {
            id,
            legacy_id,
            name: text_cell(&row, "name").unwrap_or_default(),
            description: text_cell(&row, "location_description"),
            icon: text_cell(&row, "icon"),
            photos: photo_list_from_cell(bytes_cell(&row, "photos").as_deref(), counts),
            legacy_home_id: int_cell(&row, "home_id"),
            home_id: None,
        });
    }
    drop(rows);
    snapshot.maps.locations = map;
    Ok(())
}

async fn read_items(
    conn: &mut SqliteConnection,
    caps: &SchemaCapabilities,
    counts: &mut ConvertCounts,
    snapshot: &mut LegacySnapshot,
) -> Result<(), sqlx::Error> {
    let sql = format!(
        "SELECT id, {}, title, quantity_text, quantity, item_description, \
                serial_number, model_number, make, price, insured, notes, photos, \
                created_date, purchase_date, warranty_date, \
                dimensions, weight, color, fragile, moving_priority, room_destination, \
                {}, {}, {}, {}, {}, {} \
           FROM items ORDER BY id",
        col(caps.items_uuid, "uuid"),
        col(caps.items_extended, "replacement_cost"),
        col(caps.items_extended, "depreciation_rate"),
        col(caps.items_extended, "ai_assisted"),
        col(caps.items_location_column, "location_id"),
        col(caps.items_home_column, "home_id"),
        col(caps.items_label_column, "label_id"),
    );
    let mut map = IdentifierMap::new();
    let mut rows = sqlx::query(&sql).fetch(&mut *conn);
    while let Some(row) = rows.try_next().await? {
        let legacy_id: i64 = row.try_get("id")?;
        let id = stable_id_from_legacy(text_cell(&row, "uuid").as_deref());
        map.insert(legacy_id, id);
        snapshot.items.push(ItemRecord {
            id,
            legacy_id,
            title: text_cell(&row, "title").unwrap_or_default(),
            quantity_text: text_cell(&row, "quantity_text"),
            quantity: int_cell(&row, "quantity").unwrap_or(1),
            description: text_cell(&row, "item_description"),
            serial_number: text_cell(&row, "serial_number"),
            model_number: text_cell(&row, "model_number"),
            make: text_cell(&row, "make"),
            price: money_cell(&row, "price", counts),
            insured: bool_cell(&row, "insured"),
            notes: text_cell(&row, "notes"),
            replacement_cost: money_cell(&row, "replacement_cost", counts),
            depreciation_rate: money_cell(&row, "depreciation_rate", counts),
            photos: photo_list_from_cell(bytes_cell(&row, "photos").as_deref(), counts),
            ai_assisted: bool_cell(&row, "ai_assisted"),
            created_at: date_cell(&row, "created_date"),
            purchase_date: date_cell(&row, "purchase_date"),
            warranty_expires: date_cell(&row, "warranty_date"),
            dimensions: text_cell(&row, "dimensions"),
            weight: text_cell(&row, "weight"),
            color: text_cell(&row, "color"),
            fragile: bool_cell(&row, "fragile"),
            moving_priority: int_cell(&row, "moving_priority"),
            room_destination: text_cell(&row, "room_destination"),
            legacy_location_id: int_cell(&row, "location_id"),
            legacy_home_id: int_cell(&row, "home_id"),
            legacy_label_id: int_cell(&row, "label_id"),
            location_id: None,
            home_id: None,
        });
    }
    drop(rows);
    snapshot.maps.items = map;
    Ok(())
}

async fn read_pairs(
    conn: &mut SqliteConnection,
    table: &str,
    left: &str,
    right: &str,
) -> Result<Vec<(i64, i64)>, sqlx::Error> {
    let sql = format!("SELECT {left}, {right} FROM {table}");
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    let mut pairs = Vec::with_capacity(rows.len());
    for row in rows {
        let l = row.try_get::<Option<i64>, _>(left).ok().flatten();
        let r = row.try_get::<Option<i64>, _>(right).ok().flatten();
        if let (Some(l), Some(r)) = (l, r) {
            pairs.push((l, r));
        }
    }
    Ok(pairs)
}
