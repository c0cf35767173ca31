use super::{from_json, to_json, Pool, StoreError};
use crate::model::{Bundle, BundleInput, BundleUpdate};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

const COLUMNS: &str = "id, user_id, name, sku, components, created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<Bundle, StoreError> {
    let components: String = row.try_get("components")?;
    Ok(Bundle {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        sku: row.try_get("sku")?,
        components: from_json(&components)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[instrument(skip_all)]
pub async fn list_bundles(pool: &Pool, user_id: Uuid) -> Result<Vec<Bundle>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM bundles WHERE user_id = ? ORDER BY created_at ASC, rowid ASC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(from_row).collect()
}

#[instrument(skip_all)]
pub async fn insert_bundle(
    pool: &Pool,
    user_id: Uuid,
    input: &BundleInput,
) -> Result<Bundle, StoreError> {
    let now = Utc::now();
    let row = sqlx::query(&format!(
        "INSERT INTO bundles ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&input.name)
    .bind(&input.sku)
    .bind(to_json(&input.components)?)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    from_row(&row)
}

/// Apply the `Some` fields of `update`. A new component list replaces the
/// stored one wholesale.
#[instrument(skip_all)]
pub async fn update_bundle(
    pool: &Pool,
    user_id: Uuid,
    id: Uuid,
    update: &BundleUpdate,
) -> Result<Bundle, StoreError> {
    let components = update.components.as_ref().map(to_json).transpose()?;
    let row = sqlx::query(&format!(
        "UPDATE bundles SET \
           name = COALESCE(?, name), \
           sku = COALESCE(?, sku), \
           components = COALESCE(?, components), \
           updated_at = ? \
         WHERE user_id = ? AND id = ? \
         RETURNING {COLUMNS}"
    ))
    .bind(&update.name)
    .bind(&update.sku)
    .bind(components)
    .bind(Utc::now())
    .bind(user_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    match row {
        Some(row) => from_row(&row),
        None => Err(StoreError::NotFound {
            entity: "bundle",
            id,
        }),
    }
}

#[instrument(skip_all)]
pub async fn delete_bundle(pool: &Pool, user_id: Uuid, id: Uuid) -> Result<(), StoreError> {
    let res = sqlx::query("DELETE FROM bundles WHERE user_id = ? AND id = ?")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "bundle",
            id,
        });
    }
    Ok(())
}
