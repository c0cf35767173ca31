use super::{OptionalRow, Pool, StoreError};
use crate::model::User;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

const COLUMNS: &str = "id, email, display_name, created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[instrument(skip_all)]
pub async fn get_user(pool: &Pool, id: Uuid) -> Result<Option<User>, StoreError> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_one(pool)
        .await
        .optional()?;
    row.as_ref().map(from_row).transpose()
}

#[instrument(skip_all)]
pub async fn find_user_by_email(pool: &Pool, email: &str) -> Result<Option<User>, StoreError> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM users WHERE email = ?"))
        .bind(email)
        .fetch_one(pool)
        .await
        .optional()?;
    row.as_ref().map(from_row).transpose()
}

/// Returns the user registered under `email`, creating it on first sight.
#[instrument(skip_all)]
pub async fn get_or_create_user(
    pool: &Pool,
    email: &str,
    display_name: Option<&str>,
) -> Result<User, StoreError> {
    if let Some(user) = find_user_by_email(pool, email).await? {
        return Ok(user);
    }

    let now = Utc::now();
    let row = sqlx::query(&format!(
        "INSERT INTO users (id, email, display_name, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(display_name)
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

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let pool = setup_pool().await;
        let first = get_or_create_user(&pool, "alice@example.com", Some("Alice"))
            .await
            .unwrap();
        let second = get_or_create_user(&pool, "alice@example.com", None)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.display_name.as_deref(), Some("Alice"));

        let by_id = get_user(&pool, first.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "alice@example.com");
        assert!(get_user(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }
}
