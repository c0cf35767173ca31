use super::{from_json, parse_column, to_json, OptionalRow, Pool, StoreError};
use crate::model::{LabelPrepType, Product, ProductCondition, ProductInput, ProductUpdate};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

const COLUMNS: &str = "id, user_id, sku, asin, fnsku, title, brand, image_url, condition, cost, \
                       price, quantity, weight_lb, length_in, width_in, height_in, \
                       prep_instructions, label_prep_type, created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<Product, StoreError> {
    let prep: String = row.try_get("prep_instructions")?;
    Ok(Product {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        sku: row.try_get("sku")?,
        asin: row.try_get("asin")?,
        fnsku: row.try_get("fnsku")?,
        title: row.try_get("title")?,
        brand: row.try_get("brand")?,
        image_url: row.try_get("image_url")?,
        condition: parse_column(
            "products",
            "condition",
            row.try_get("condition")?,
            ProductCondition::parse,
        )?,
        cost: row.try_get("cost")?,
        price: row.try_get("price")?,
        quantity: row.try_get("quantity")?,
        weight_lb: row.try_get("weight_lb")?,
        length_in: row.try_get("length_in")?,
        width_in: row.try_get("width_in")?,
        height_in: row.try_get("height_in")?,
        prep_instructions: from_json(&prep)?,
        label_prep_type: parse_column(
            "products",
            "label_prep_type",
            row.try_get("label_prep_type")?,
            LabelPrepType::parse,
        )?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[instrument(skip_all)]
pub async fn list_products(pool: &Pool, user_id: Uuid) -> Result<Vec<Product>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM products WHERE user_id = ? ORDER BY created_at ASC, rowid ASC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(from_row).collect()
}

#[instrument(skip_all)]
pub async fn get_product(
    pool: &Pool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<Product>, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM products WHERE user_id = ? AND id = ?"
    ))
    .bind(user_id)
    .bind(id)
    .fetch_one(pool)
    .await
    .optional()?;
    row.as_ref().map(from_row).transpose()
}

#[instrument(skip_all)]
pub async fn insert_product(
    pool: &Pool,
    user_id: Uuid,
    input: &ProductInput,
) -> Result<Product, StoreError> {
    let now = Utc::now();
    let row = sqlx::query(&format!(
        "INSERT INTO products ({COLUMNS}) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&input.sku)
    .bind(&input.asin)
    .bind(&input.fnsku)
    .bind(&input.title)
    .bind(&input.brand)
    .bind(&input.image_url)
    .bind(input.condition.as_str())
    .bind(input.cost)
    .bind(input.price)
    .bind(input.quantity)
    .bind(input.weight_lb)
    .bind(input.length_in)
    .bind(input.width_in)
    .bind(input.height_in)
    .bind(to_json(&input.prep_instructions)?)
    .bind(input.label_prep_type.as_str())
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    from_row(&row)
}

/// Apply the `Some` fields of `update`; `Some(None)` on a nullable column
/// clears it. Fails with `NotFound` if the product does not exist for this
/// owner.
#[instrument(skip_all)]
pub async fn update_product(
    pool: &Pool,
    user_id: Uuid,
    id: Uuid,
    update: &ProductUpdate,
) -> Result<Product, StoreError> {
    let prep = update
        .prep_instructions
        .as_ref()
        .map(to_json)
        .transpose()?;
    let row = sqlx::query(&format!(
        "UPDATE products SET \
           sku = COALESCE(?, sku), \
           asin = COALESCE(?, asin), \
           fnsku = CASE WHEN ? THEN ? ELSE fnsku END, \
           title = COALESCE(?, title), \
           brand = CASE WHEN ? THEN ? ELSE brand END, \
           image_url = CASE WHEN ? THEN ? ELSE image_url END, \
           condition = COALESCE(?, condition), \
           cost = COALESCE(?, cost), \
           price = COALESCE(?, price), \
           quantity = COALESCE(?, quantity), \
           weight_lb = CASE WHEN ? THEN ? ELSE weight_lb END, \
           length_in = CASE WHEN ? THEN ? ELSE length_in END, \
           width_in = CASE WHEN ? THEN ? ELSE width_in END, \
           height_in = CASE WHEN ? THEN ? ELSE height_in END, \
           prep_instructions = COALESCE(?, prep_instructions), \
           label_prep_type = COALESCE(?, label_prep_type), \
           updated_at = ? \
         WHERE user_id = ? AND id = ? \
         RETURNING {COLUMNS}"
    ))
    .bind(&update.sku)
    .bind(&update.asin)
    .bind(update.fnsku.is_some())
    .bind(update.fnsku.as_ref().and_then(|v| v.as_deref()))
    .bind(&update.title)
    .bind(update.brand.is_some())
    .bind(update.brand.as_ref().and_then(|v| v.as_deref()))
    .bind(update.image_url.is_some())
    .bind(update.image_url.as_ref().and_then(|v| v.as_deref()))
    .bind(update.condition.map(|c| c.as_str()))
    .bind(update.cost)
    .bind(update.price)
    .bind(update.quantity)
    .bind(update.weight_lb.is_some())
    .bind(update.weight_lb.flatten())
    .bind(update.length_in.is_some())
    .bind(update.length_in.flatten())
    .bind(update.width_in.is_some())
    .bind(update.width_in.flatten())
    .bind(update.height_in.is_some())
    .bind(update.height_in.flatten())
    .bind(prep)
    .bind(update.label_prep_type.map(|l| l.as_str()))
    .bind(Utc::now())
    .bind(user_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    match row {
        Some(row) => from_row(&row),
        None => Err(StoreError::NotFound {
            entity: "product",
            id,
        }),
    }
}

#[instrument(skip_all)]
pub async fn delete_product(pool: &Pool, user_id: Uuid, id: Uuid) -> Result<(), StoreError> {
    let res = sqlx::query("DELETE FROM products WHERE user_id = ? AND id = ?")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "product",
            id,
        });
    }
    Ok(())
}
