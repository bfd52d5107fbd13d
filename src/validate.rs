use sqlx::{Row, SqliteConnection};
use tracing::info;
use uuid::Uuid;

use crate::error::ValidationError;

/// Row counts the target store must hold after the write, computed from the
/// resolved payload (synthesized parents included as additions).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpectedCounts {
    pub labels: u64,
    pub homes: u64,
    pub policies: u64,
    pub locations: u64,
    pub items: u64,
    pub item_labels: u64,
    pub home_policies: u64,
}

const ENTITY_TABLES: &[&str] = &[
    "labels",
    "homes",
    "insurance_policies",
    "locations",
    "items",
];

/// Every foreign-key edge in the target schema, scanned exhaustively.
const FK_EDGES: &[(&str, &str, &str)] = &[
    ("locations", "home_id", "homes"),
    ("items", "home_id", "homes"),
    ("items", "location_id", "locations"),
    ("item_labels", "item_id", "items"),
    ("item_labels", "label_id", "labels"),
    ("home_policies", "home_id", "homes"),
    ("home_policies", "policy_id", "insurance_policies"),
];

/// Re-read the target store with fresh SQL (never in-memory counts) and
/// prove the invariants: exact per-table counts, syntactically valid stable
/// identifiers everywhere, and zero dangling references.
///
/// Runs against the writer's open transaction so a failure rolls the whole
/// payload back instead of leaving unvalidated rows committed.
pub async fn verify(
    conn: &mut SqliteConnection,
    expected: &ExpectedCounts,
) -> Result<(), ValidationError> {
    check_count(conn, "labels", expected.labels).await?;
    check_count(conn, "homes", expected.homes).await?;
    check_count(conn, "insurance_policies", expected.policies).await?;
    check_count(conn, "locations", expected.locations).await?;
    check_count(conn, "items", expected.items).await?;
    check_count(conn, "item_labels", expected.item_labels).await?;
    check_count(conn, "home_policies", expected.home_policies).await?;

    for table in ENTITY_TABLES {
        check_identifiers(conn, table).await?;
    }

    for (table, column, parent) in FK_EDGES {
        check_edge(conn, table, column, parent).await?;
    }

    info!(target: "hearthbook", event = "validation_passed");
    Ok(())
}

async fn check_count(
    conn: &mut SqliteConnection,
    table: &'static str,
    expected: u64,
) -> Result<(), ValidationError> {
    let actual: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&mut *conn)
        .await?;
    let actual = actual.max(0) as u64;
    if actual != expected {
        return Err(ValidationError::CountMismatch {
            table,
            expected,
            actual,
        });
    }
    Ok(())
}

async fn check_identifiers(
    conn: &mut SqliteConnection,
    table: &'static str,
) -> Result<(), ValidationError> {
    let rows = sqlx::query(&format!("SELECT id FROM {table}"))
        .fetch_all(&mut *conn)
        .await?;
    for row in rows {
        let id: Option<String> = row.try_get("id").unwrap_or(None);
        let valid = id
            .as_deref()
            .is_some_and(|v| Uuid::parse_str(v).is_ok());
        if !valid {
            return Err(ValidationError::InvalidIdentifier {
                table,
                value: id.unwrap_or_default(),
            });
        }
    }
    Ok(())
}

async fn check_edge(
    conn: &mut SqliteConnection,
    table: &'static str,
    column: &'static str,
    parent: &str,
) -> Result<(), ValidationError> {
    let sql = format!(
        "SELECT COUNT(*) FROM {table} c \
           LEFT JOIN {parent} p ON c.{column} = p.id \
          WHERE c.{column} IS NOT NULL AND p.id IS NULL"
    );
    let dangling: i64 = sqlx::query_scalar(&sql).fetch_one(&mut *conn).await?;
    if dangling > 0 {
        return Err(ValidationError::DanglingReference {
            table,
            column,
            count: dangling.max(0) as u64,
        });
    }
    Ok(())
}
