use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::Jsonb;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::db::PgPool;
use crate::storage::ObjectStorage;

/// Tables copied by a backup, in dependency order. Refresh tokens are session state and skipped.
pub const BACKUP_TABLES: &[&str] = &[
    "users",
    "settings",
    "officials",
    "announcements",
    "certificate_requests",
    "revenues",
    "inbox_items",
];

#[derive(Debug, Serialize)]
pub struct BackupObject {
    pub table: String,
    pub key: String,
    pub rows: usize,
}

#[derive(Debug, Serialize)]
pub struct BackupSummary {
    pub prefix: String,
    pub objects: Vec<BackupObject>,
}

#[derive(QueryableByName)]
struct TableDump {
    #[diesel(sql_type = Jsonb)]
    dump: Value,
}

pub fn backup_prefix(root: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}/{}",
        root.trim_matches('/'),
        at.format("%Y%m%dT%H%M%SZ")
    )
}

/// Serializes every table in [`BACKUP_TABLES`] to a JSON array and uploads one object per table.
///
/// Stops at the first failing table; objects uploaded before it are left in place.
pub async fn run_backup(
    pool: &PgPool,
    storage: &dyn ObjectStorage,
    root: &str,
    at: DateTime<Utc>,
) -> Result<BackupSummary> {
    let prefix = backup_prefix(root, at);
    let mut objects = Vec::with_capacity(BACKUP_TABLES.len());

    for table in BACKUP_TABLES {
        let rows = {
            let mut conn = pool.get().context("failed to get database connection")?;
            dump_table(&mut conn, table).map_err(|err| {
                error!(table, error = %err, "failed to dump table");
                err
            })?
        };

        let count = rows.as_array().map(Vec::len).unwrap_or_default();
        let key = format!("{prefix}/{table}.json");
        let bytes = serde_json::to_vec_pretty(&rows).context("failed to serialize table dump")?;

        storage
            .put_object(&key, bytes, Some("application/json".to_string()), None)
            .await
            .map_err(|err| {
                error!(table, key = %key, error = %err, "failed to upload table dump");
                err
            })?;

        info!(table, key = %key, rows = count, "table backed up");
        objects.push(BackupObject {
            table: (*table).to_string(),
            key,
            rows: count,
        });
    }

    Ok(BackupSummary { prefix, objects })
}

fn dump_table(conn: &mut PgConnection, table: &str) -> Result<Value> {
    // Table names only ever come from BACKUP_TABLES.
    let statement = format!(
        "SELECT COALESCE(jsonb_agg(to_jsonb(t)), '[]'::jsonb) AS dump FROM {table} t"
    );
    let result: TableDump = sql_query(statement)
        .get_result(conn)
        .with_context(|| format!("failed to dump table {table}"))?;
    Ok(result.dump)
}
