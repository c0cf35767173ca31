use super::{OptionalRow, Pool, StoreError};
use crate::model::{AmazonCredentials, AmazonCredentialsInput};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

const COLUMNS: &str = "id, user_id, seller_id, marketplace_id, refresh_token, access_token, \
                       token_expires_at, created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<AmazonCredentials, StoreError> {
    Ok(AmazonCredentials {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        seller_id: row.try_get("seller_id")?,
        marketplace_id: row.try_get("marketplace_id")?,
        refresh_token: row.try_get("refresh_token")?,
        access_token: row.try_get("access_token")?,
        token_expires_at: row.try_get("token_expires_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[instrument(skip_all)]
pub async fn get_credentials(
    pool: &Pool,
    user_id: Uuid,
) -> Result<Option<AmazonCredentials>, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM amazon_credentials WHERE user_id = ?"
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await
    .optional()?;
    row.as_ref().map(from_row).transpose()
}

/// Insert or replace the single credential row owned by `user_id`.
#[instrument(skip_all)]
pub async fn upsert_credentials(
    pool: &Pool,
    user_id: Uuid,
    input: &AmazonCredentialsInput,
) -> Result<AmazonCredentials, StoreError> {
    let now = Utc::now();
    let row = sqlx::query(&format!(
        "INSERT INTO amazon_credentials \
           (id, user_id, seller_id, marketplace_id, refresh_token, access_token, token_expires_at, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(user_id) DO UPDATE SET \
           seller_id = excluded.seller_id, \
           marketplace_id = excluded.marketplace_id, \
           refresh_token = excluded.refresh_token, \
           access_token = excluded.access_token, \
           token_expires_at = excluded.token_expires_at, \
           updated_at = excluded.updated_at \
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&input.seller_id)
    .bind(&input.marketplace_id)
    .bind(&input.refresh_token)
    .bind(&input.access_token)
    .bind(input.token_expires_at)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    from_row(&row)
}

/// Persist a freshly refreshed access token.
#[instrument(skip_all)]
pub async fn update_access_token(
    pool: &Pool,
    user_id: Uuid,
    access_token: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE amazon_credentials SET access_token = ?, token_expires_at = ?, updated_at = ? \
         WHERE user_id = ?",
    )
    .bind(access_token)
    .bind(expires_at)
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn delete_credentials(pool: &Pool, user_id: Uuid) -> Result<bool, StoreError> {
    let res = sqlx::query("DELETE FROM amazon_credentials WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::setup_pool;
    use crate::db::users::get_or_create_user;

    fn input(token: &str) -> AmazonCredentialsInput {
        AmazonCredentialsInput {
            seller_id: "A1SELLER".into(),
            marketplace_id: "ATVPDKIKX0DER".into(),
            refresh_token: token.into(),
            access_token: None,
            token_expires_at: None,
        }
    }

    #[tokio::test]
    async fn upsert_keeps_one_row_per_owner() {
        let pool = setup_pool().await;
        let user = get_or_create_user(&pool, "s@example.com", None).await.unwrap();

        assert!(get_credentials(&pool, user.id).await.unwrap().is_none());
        let first = upsert_credentials(&pool, user.id, &input("r1")).await.unwrap();
        let second = upsert_credentials(&pool, user.id, &input("r2")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.refresh_token, "r2");

        let expires = Utc::now() + chrono::Duration::seconds(3600);
        update_access_token(&pool, user.id, "atza|new", expires).await.unwrap();
        let stored = get_credentials(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(stored.access_token.as_deref(), Some("atza|new"));

        assert!(delete_credentials(&pool, user.id).await.unwrap());
        assert!(!delete_credentials(&pool, user.id).await.unwrap());
    }
}
