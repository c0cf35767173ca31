use super::{parse_column, OptionalRow, Pool, StoreError};
use crate::model::{
    LabelPrepType, PrepOwner, Shipment, ShipmentInput, ShipmentItem, ShipmentItemInput,
    ShipmentItemUpdate, ShipmentStatus, ShipmentUpdate,
};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

const COLUMNS: &str = "id, user_id, name, shipment_id, plan_id, status, \
                       destination_fulfillment_center_id, label_prep_type, ship_from_address_id, \
                       box_count, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, user_id, shipment_id, product_id, sku, fnsku, quantity_shipped, \
                            quantity_received, prep_owner, created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<Shipment, StoreError> {
    Ok(Shipment {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        shipment_id: row.try_get("shipment_id")?,
        plan_id: row.try_get("plan_id")?,
        status: parse_column(
            "shipments",
            "status",
            row.try_get("status")?,
            ShipmentStatus::parse,
        )?,
        destination_fulfillment_center_id: row.try_get("destination_fulfillment_center_id")?,
        label_prep_type: parse_column(
            "shipments",
            "label_prep_type",
            row.try_get("label_prep_type")?,
            LabelPrepType::parse,
        )?,
        ship_from_address_id: row.try_get("ship_from_address_id")?,
        box_count: row.try_get("box_count")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn item_from_row(row: &SqliteRow) -> Result<ShipmentItem, StoreError> {
    Ok(ShipmentItem {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        shipment_id: row.try_get("shipment_id")?,
        product_id: row.try_get("product_id")?,
        sku: row.try_get("sku")?,
        fnsku: row.try_get("fnsku")?,
        quantity_shipped: row.try_get("quantity_shipped")?,
        quantity_received: row.try_get("quantity_received")?,
        prep_owner: parse_column(
            "shipment_items",
            "prep_owner",
            row.try_get("prep_owner")?,
            PrepOwner::parse,
        )?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Newest first.
#[instrument(skip_all)]
pub async fn list_shipments(pool: &Pool, user_id: Uuid) -> Result<Vec<Shipment>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM shipments WHERE user_id = ? ORDER BY created_at DESC, rowid DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(from_row).collect()
}

#[instrument(skip_all)]
pub async fn get_shipment(
    pool: &Pool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<Shipment>, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM shipments WHERE user_id = ? AND id = ?"
    ))
    .bind(user_id)
    .bind(id)
    .fetch_one(pool)
    .await
    .optional()?;
    row.as_ref().map(from_row).transpose()
}

#[instrument(skip_all)]
pub async fn insert_shipment(
    pool: &Pool,
    user_id: Uuid,
    input: &ShipmentInput,
) -> Result<Shipment, StoreError> {
    let now = Utc::now();
    let row = sqlx::query(&format!(
        "INSERT INTO shipments ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&input.name)
    .bind(&input.shipment_id)
    .bind(input.plan_id)
    .bind(input.status.as_str())
    .bind(&input.destination_fulfillment_center_id)
    .bind(input.label_prep_type.as_str())
    .bind(input.ship_from_address_id)
    .bind(input.box_count)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    from_row(&row)
}

#[instrument(skip_all)]
pub async fn update_shipment(
    pool: &Pool,
    user_id: Uuid,
    id: Uuid,
    update: &ShipmentUpdate,
) -> Result<Shipment, StoreError> {
    let row = sqlx::query(&format!(
        "UPDATE shipments SET \
           name = COALESCE(?, name), \
           shipment_id = CASE WHEN ? THEN ? ELSE shipment_id END, \
           status = COALESCE(?, status), \
           destination_fulfillment_center_id = \
             CASE WHEN ? THEN ? ELSE destination_fulfillment_center_id END, \
           label_prep_type = COALESCE(?, label_prep_type), \
           ship_from_address_id = CASE WHEN ? THEN ? ELSE ship_from_address_id END, \
           box_count = COALESCE(?, box_count), \
           updated_at = ? \
         WHERE user_id = ? AND id = ? \
         RETURNING {COLUMNS}"
    ))
    .bind(&update.name)
    .bind(update.shipment_id.is_some())
    .bind(update.shipment_id.as_ref().and_then(|v| v.as_deref()))
    .bind(update.status.map(|s| s.as_str()))
    .bind(update.destination_fulfillment_center_id.is_some())
    .bind(
        update
            .destination_fulfillment_center_id
            .as_ref()
            .and_then(|v| v.as_deref()),
    )
    .bind(update.label_prep_type.map(|l| l.as_str()))
    .bind(update.ship_from_address_id.is_some())
    .bind(update.ship_from_address_id.flatten())
    .bind(update.box_count)
    .bind(Utc::now())
    .bind(user_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    match row {
        Some(row) => from_row(&row),
        None => Err(StoreError::NotFound {
            entity: "shipment",
            id,
        }),
    }
}

/// Deletes the shipment and, via cascade, its items.
#[instrument(skip_all)]
pub async fn delete_shipment(pool: &Pool, user_id: Uuid, id: Uuid) -> Result<(), StoreError> {
    let res = sqlx::query("DELETE FROM shipments WHERE user_id = ? AND id = ?")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "shipment",
            id,
        });
    }
    Ok(())
}

#[instrument(skip_all)]
pub async fn list_shipment_items(
    pool: &Pool,
    user_id: Uuid,
    shipment_id: Uuid,
) -> Result<Vec<ShipmentItem>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT {ITEM_COLUMNS} FROM shipment_items WHERE user_id = ? AND shipment_id = ? \
         ORDER BY created_at ASC, rowid ASC"
    ))
    .bind(user_id)
    .bind(shipment_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(item_from_row).collect()
}

#[instrument(skip_all)]
pub async fn insert_shipment_item(
    pool: &Pool,
    user_id: Uuid,
    shipment_id: Uuid,
    input: &ShipmentItemInput,
) -> Result<ShipmentItem, StoreError> {
    if get_shipment(pool, user_id, shipment_id).await?.is_none() {
        return Err(StoreError::NotFound {
            entity: "shipment",
            id: shipment_id,
        });
    }
    let now = Utc::now();
    let row = sqlx::query(&format!(
        "INSERT INTO shipment_items ({ITEM_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?) \
         RETURNING {ITEM_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(shipment_id)
    .bind(input.product_id)
    .bind(&input.sku)
    .bind(&input.fnsku)
    .bind(input.quantity_shipped)
    .bind(input.prep_owner.as_str())
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    item_from_row(&row)
}

/// Record packing and receiving progress on one item.
#[instrument(skip_all)]
pub async fn update_shipment_item(
    pool: &Pool,
    user_id: Uuid,
    id: Uuid,
    update: &ShipmentItemUpdate,
) -> Result<ShipmentItem, StoreError> {
    let row = sqlx::query(&format!(
        "UPDATE shipment_items SET \
           fnsku = CASE WHEN ? THEN ? ELSE fnsku END, \
           quantity_shipped = COALESCE(?, quantity_shipped), \
           quantity_received = COALESCE(?, quantity_received), \
           prep_owner = COALESCE(?, prep_owner), \
           updated_at = ? \
         WHERE user_id = ? AND id = ? \
         RETURNING {ITEM_COLUMNS}"
    ))
    .bind(update.fnsku.is_some())
    .bind(update.fnsku.as_ref().and_then(|v| v.as_deref()))
    .bind(update.quantity_shipped)
    .bind(update.quantity_received)
    .bind(update.prep_owner.map(|p| p.as_str()))
    .bind(Utc::now())
    .bind(user_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    match row {
        Some(row) => item_from_row(&row),
        None => Err(StoreError::NotFound {
            entity: "shipment item",
            id,
        }),
    }
}

#[instrument(skip_all)]
pub async fn delete_shipment_item(pool: &Pool, user_id: Uuid, id: Uuid) -> Result<(), StoreError> {
    let res = sqlx::query("DELETE FROM shipment_items WHERE user_id = ? AND id = ?")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "shipment item",
            id,
        });
    }
    Ok(())
}
