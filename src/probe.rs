use std::collections::HashSet;

use sqlx::{Row, SqliteConnection};
use tracing::info;

/// What the legacy file is capable of expressing, inferred purely from its
/// table and column inventory. The legacy generations never recorded a
/// schema version, so presence checks are the only reliable signal.
///
/// Computed once per run and threaded through every reader; nothing
/// re-queries column existence ad hoc.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaCapabilities {
    pub labels_table: bool,
    pub homes_table: bool,
    pub policies_table: bool,
    pub locations_table: bool,
    pub items_table: bool,
    pub item_labels_table: bool,
    pub home_policies_table: bool,

    pub labels_uuid: bool,
    pub homes_uuid: bool,
    pub policies_uuid: bool,
    pub locations_uuid: bool,
    pub items_uuid: bool,

    /// Oldest generation recorded a single label directly on the item row.
    pub items_label_column: bool,
    /// Mid generations recorded the policy's home directly on the policy row.
    pub policies_home_column: bool,
    pub locations_home_column: bool,
    pub items_home_column: bool,
    pub items_location_column: bool,

    /// Newest generation grew extra item columns (ai flag, replacement cost,
    /// depreciation rate).
    pub items_extended: bool,
}

impl SchemaCapabilities {
    /// A store with none of the legacy entity tables is a fresh install.
    pub fn any_legacy_table(&self) -> bool {
        self.labels_table
            || self.homes_table
            || self.policies_table
            || self.locations_table
            || self.items_table
    }

    /// True when the generation records parent homes at all. When false the
    /// resolver falls back to the single-home heuristic.
    pub fn multi_home(&self) -> bool {
        self.locations_home_column || self.items_home_column
    }

    pub async fn probe(conn: &mut SqliteConnection) -> Result<Self, sqlx::Error> {
        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(&mut *conn)
            .await?;
        let mut tables = HashSet::new();
        for row in rows {
            if let Ok(name) = row.try_get::<String, _>("name") {
                tables.insert(name);
            }
        }

        let mut caps = SchemaCapabilities {
            labels_table: tables.contains("labels"),
            homes_table: tables.contains("homes"),
            policies_table: tables.contains("policies"),
            locations_table: tables.contains("locations"),
            items_table: tables.contains("items"),
            item_labels_table: tables.contains("item_labels"),
            home_policies_table: tables.contains("home_policies"),
            ..SchemaCapabilities::default()
        };

        if caps.labels_table {
            caps.labels_uuid = has_column(conn, "labels", "uuid").await?;
        }
        if caps.homes_table {
            caps.homes_uuid = has_column(conn, "homes", "uuid").await?;
        }
        if caps.policies_table {
            caps.policies_uuid = has_column(conn, "policies", "uuid").await?;
            caps.policies_home_column = has_column(conn, "policies", "home_id").await?;
        }
        if caps.locations_table {
            caps.locations_uuid = has_column(conn, "locations", "uuid").await?;
            caps.locations_home_column = has_column(conn, "locations", "home_id").await?;
        }
        if caps.items_table {
            caps.items_uuid = has_column(conn, "items", "uuid").await?;
            caps.items_label_column = has_column(conn, "items", "label_id").await?;
            caps.items_home_column = has_column(conn, "items", "home_id").await?;
            caps.items_location_column = has_column(conn, "items", "location_id").await?;
            caps.items_extended = has_column(conn, "items", "ai_assisted").await?;
        }

        info!(
            target: "hearthbook",
            event = "schema_probe",
            any_table = caps.any_legacy_table(),
            multi_home = caps.multi_home(),
            stable_ids = caps.items_uuid,
            item_labels_join = caps.item_labels_table,
            home_policies_join = caps.home_policies_table
        );

        Ok(caps)
    }
}

async fn has_column(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
) -> Result<bool, sqlx::Error> {
    let exists: Option<i64> = sqlx::query_scalar(&format!(
        "SELECT 1 FROM pragma_table_info('{table}') WHERE name = '{column}'"
    ))
    .fetch_optional(&mut *conn)
    .await?;
    Ok(exists.is_some())
}
