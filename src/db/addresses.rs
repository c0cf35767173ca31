use super::{Pool, StoreError};
use crate::model::{Address, AddressInput, AddressUpdate};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

const COLUMNS: &str = "id, user_id, name, address_line1, address_line2, city, \
                       state_or_province_code, postal_code, country_code, is_default, \
                       created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<Address, StoreError> {
    Ok(Address {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        address_line1: row.try_get("address_line1")?,
        address_line2: row.try_get("address_line2")?,
        city: row.try_get("city")?,
        state_or_province_code: row.try_get("state_or_province_code")?,
        postal_code: row.try_get("postal_code")?,
        country_code: row.try_get("country_code")?,
        is_default: row.try_get("is_default")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[instrument(skip_all)]
pub async fn list_addresses(pool: &Pool, user_id: Uuid) -> Result<Vec<Address>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM addresses WHERE user_id = ? ORDER BY created_at ASC, rowid ASC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(from_row).collect()
}

/// Inserting a default address clears the flag on the owner's other rows.
#[instrument(skip_all)]
pub async fn insert_address(
    pool: &Pool,
    user_id: Uuid,
    input: &AddressInput,
) -> Result<Address, StoreError> {
    let mut tx = pool.begin().await?;
    if input.is_default {
        sqlx::query("UPDATE addresses SET is_default = 0 WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }
    let now = Utc::now();
    let row = sqlx::query(&format!(
        "INSERT INTO addresses ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&input.name)
    .bind(&input.address_line1)
    .bind(&input.address_line2)
    .bind(&input.city)
    .bind(&input.state_or_province_code)
    .bind(&input.postal_code)
    .bind(&input.country_code)
    .bind(input.is_default)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;
    let address = from_row(&row)?;
    tx.commit().await?;
    Ok(address)
}

#[instrument(skip_all)]
pub async fn update_address(
    pool: &Pool,
    user_id: Uuid,
    id: Uuid,
    update: &AddressUpdate,
) -> Result<Address, StoreError> {
    let mut tx = pool.begin().await?;
    if update.is_default == Some(true) {
        sqlx::query("UPDATE addresses SET is_default = 0 WHERE user_id = ? AND id <> ?")
            .bind(user_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    let row = sqlx::query(&format!(
        "UPDATE addresses SET \
           name = COALESCE(?, name), \
           address_line1 = COALESCE(?, address_line1), \
           address_line2 = CASE WHEN ? THEN ? ELSE address_line2 END, \
           city = COALESCE(?, city), \
           state_or_province_code = COALESCE(?, state_or_province_code), \
           postal_code = COALESCE(?, postal_code), \
           country_code = COALESCE(?, country_code), \
           is_default = COALESCE(?, is_default), \
           updated_at = ? \
         WHERE user_id = ? AND id = ? \
         RETURNING {COLUMNS}"
    ))
    .bind(&update.name)
    .bind(&update.address_line1)
    .bind(update.address_line2.is_some())
    .bind(update.address_line2.as_ref().and_then(|v| v.as_deref()))
    .bind(&update.city)
    .bind(&update.state_or_province_code)
    .bind(&update.postal_code)
    .bind(&update.country_code)
    .bind(update.is_default)
    .bind(Utc::now())
    .bind(user_id)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(row) = row else {
        return Err(StoreError::NotFound {
            entity: "address",
            id,
        });
    };
    let address = from_row(&row)?;
    tx.commit().await?;
    Ok(address)
}

#[instrument(skip_all)]
pub async fn delete_address(pool: &Pool, user_id: Uuid, id: Uuid) -> Result<(), StoreError> {
    let res = sqlx::query("DELETE FROM addresses WHERE user_id = ? AND id = ?")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            entity: "address",
            id,
        });
    }
    Ok(())
}
