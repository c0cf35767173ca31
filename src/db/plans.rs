use super::{from_json, parse_column, to_json, OptionalRow, Pool, StoreError};
use crate::model::{LabelPrepType, ShipmentPlan, ShipmentPlanInput, ShipmentPlanUpdate};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

const COLUMNS: &str = "id, user_id, name, ship_from_address_id, label_prep_type, items, \
                       is_valid, created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<ShipmentPlan, StoreError> {
    let items: String = row.try_get("items")?;
    Ok(ShipmentPlan {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        ship_from_address_id: row.try_get("ship_from_address_id")?,
        label_prep_type: parse_column(
            "shipment_plans",
            "label_prep_type",
            row.try_get("label_prep_type")?,
            LabelPrepType::parse,
        )?,
        items: from_json(&items)?,
        is_valid: row.try_get("is_valid")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Newest first.
#[instrument(skip_all)]
pub async fn list_plans(pool: &Pool, user_id: Uuid) -> Result<Vec<ShipmentPlan>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM shipment_plans WHERE user_id = ? \
         ORDER BY created_at DESC, rowid DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(from_row).collect()
}

#[instrument(skip_all)]
pub async fn get_plan(
    pool: &Pool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<ShipmentPlan>, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM shipment_plans WHERE user_id = ? AND id = ?"
    ))
    .bind(user_id)
    .bind(id)
    .fetch_one(pool)
    .await
    .optional()?;
    row.as_ref().map(from_row).transpose()
}

#[instrument(skip_all)]
pub async fn insert_plan(
    pool: &Pool,
    user_id: Uuid,
    input: &ShipmentPlanInput,
) -> Result<ShipmentPlan, StoreError> {
    let now = Utc::now();
    let row = sqlx::query(&format!(
        "INSERT INTO shipment_plans ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?) \
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&input.name)
    .bind(input.ship_from_address_id)
    .bind(input.label_prep_type.as_str())
    .bind(to_json(&input.items)?)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    from_row(&row)
}

#[instrument(skip_all)]
pub async fn update_plan(
    pool: &Pool,
    user_id: Uuid,
    id: Uuid,
    update: &ShipmentPlanUpdate,
) -> Result<ShipmentPlan, StoreError> {
    let items = update.items.as_ref().map(to_json).transpose()?;
    let row = sqlx::query(&format!(
        "UPDATE shipment_plans SET \
           name = COALESCE(?, name), \
           ship_from_address_id = CASE WHEN ? THEN ? ELSE ship_from_address_id END, \
           label_prep_type = COALESCE(?, label_prep_type), \
           items = COALESCE(?, items), \
           is_valid = COALESCE(?, is_valid), \
           updated_at = ? \
         WHERE user_id = ? AND id = ? \
         RETURNING {COLUMNS}"
    ))
    .bind(&update.name)
    .bind(update.ship_from_address_id.is_some())
    .bind(update.ship_from_address_id.flatten())
    .bind(update.label_prep_type.map(|l| l.as_str()))
    .bind(items)
    .bind(update.is_valid)
    .bind(Utc::now())
    .bind(user_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    match row {
        Some(row) => from_row(&row),
        None => Err(StoreError::NotFound {
            entity: "shipment plan",
            id,
        }),
    }
}

#[instrument(skip_all)]
pub async fn delete_plan(pool: &Pool, user_id: Uuid, id: Uuid) -> Result<(), StoreError> {
    let res = sqlx::query("DELETE FROM shipment_plans WHERE user_id = ? AND id = ?")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "shipment plan",
            id,
        });
    }
    Ok(())
}
