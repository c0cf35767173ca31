use super::{parse_column, OptionalRow, Pool, StoreError};
use crate::model::{GlobalSettings, GlobalSettingsInput, LabelPrepType, PrepOwner};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

const COLUMNS: &str = "id, user_id, default_marketplace_id, default_prep_owner, \
                       default_label_prep_type, default_ship_from_address_id, \
                       low_stock_threshold, created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<GlobalSettings, StoreError> {
    Ok(GlobalSettings {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        default_marketplace_id: row.try_get("default_marketplace_id")?,
        default_prep_owner: parse_column(
            "global_settings",
            "default_prep_owner",
            row.try_get("default_prep_owner")?,
            PrepOwner::parse,
        )?,
        default_label_prep_type: parse_column(
            "global_settings",
            "default_label_prep_type",
            row.try_get("default_label_prep_type")?,
            LabelPrepType::parse,
        )?,
        default_ship_from_address_id: row.try_get("default_ship_from_address_id")?,
        low_stock_threshold: row.try_get("low_stock_threshold")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// `Ok(None)` when the user has never saved settings.
#[instrument(skip_all)]
pub async fn get_settings(
    pool: &Pool,
    user_id: Uuid,
) -> Result<Option<GlobalSettings>, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM global_settings WHERE user_id = ?"
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await
    .optional()?;
    row.as_ref().map(from_row).transpose()
}

#[instrument(skip_all)]
pub async fn upsert_settings(
    pool: &Pool,
    user_id: Uuid,
    input: &GlobalSettingsInput,
) -> Result<GlobalSettings, StoreError> {
    let now = Utc::now();
    let row = sqlx::query(&format!(
        "INSERT INTO global_settings ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(user_id) DO UPDATE SET \
           default_marketplace_id = excluded.default_marketplace_id, \
           default_prep_owner = excluded.default_prep_owner, \
           default_label_prep_type = excluded.default_label_prep_type, \
           default_ship_from_address_id = excluded.default_ship_from_address_id, \
           low_stock_threshold = excluded.low_stock_threshold, \
           updated_at = excluded.updated_at \
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&input.default_marketplace_id)
    .bind(input.default_prep_owner.as_str())
    .bind(input.default_label_prep_type.as_str())
    .bind(input.default_ship_from_address_id)
    .bind(input.low_stock_threshold)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    from_row(&row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::setup_pool;
    use crate::db::users::get_or_create_user;

    #[tokio::test]
    async fn settings_absent_until_saved_then_upserted_in_place() {
        let pool = setup_pool().await;
        let user = get_or_create_user(&pool, "ops@example.com", None)
            .await
            .unwrap();
        assert!(get_settings(&pool, user.id).await.unwrap().is_none());

        let first = upsert_settings(&pool, user.id, &GlobalSettingsInput::default())
            .await
            .unwrap();
        assert_eq!(first.low_stock_threshold, 10);
        assert_eq!(first.default_prep_owner, PrepOwner::Seller);

        let changed = GlobalSettingsInput {
            default_prep_owner: PrepOwner::Amazon,
            low_stock_threshold: 3,
            ..GlobalSettingsInput::default()
        };
        let second = upsert_settings(&pool, user.id, &changed).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.low_stock_threshold, 3);

        let loaded = get_settings(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(loaded.default_prep_owner, PrepOwner::Amazon);
    }
}
