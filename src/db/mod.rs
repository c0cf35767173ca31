//! Record store: one submodule of SQL functions per table.
//!
//! Every function takes the pool explicitly and assigns identifiers and
//! timestamps itself, so callers never construct persisted fields. Single-row
//! lookups return `Ok(None)` when the row is absent; only genuine failures
//! surface as [`StoreError`].

pub mod addresses;
pub mod bundles;
pub mod credentials;
pub mod plans;
pub mod products;
pub mod reports;
pub mod settings;
pub mod shipments;
pub mod users;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

pub type Pool = SqlitePool;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("invalid value {value:?} in {table}.{column}")]
    InvalidValue {
        table: &'static str,
        column: &'static str,
        value: String,
    },
    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),
}

pub async fn init_pool(database_url: &str) -> Result<Pool, StoreError> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    if !normalized.starts_with("sqlite::memory") {
        sqlx::query("PRAGMA journal_mode=WAL;")
            .execute(&pool)
            .await?;
    }
    Ok(pool)
}

/// For file-backed SQLite URLs, expand a leading `~/`, ensure the parent
/// directory exists and ask SQLite to create the file. In-memory URLs pass
/// through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let query = match query_part {
        Some(q) if q.contains("mode=") => q.to_string(),
        Some(q) => format!("{q}&mode=rwc"),
        None => "mode=rwc".to_string(),
    };
    format!("sqlite://{expanded_path}?{query}")
}

pub async fn run_migrations(pool: &Pool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Separates the "no rows" outcome of a single-row fetch from real failures.
pub trait OptionalRow<T> {
    fn optional(self) -> Result<Option<T>, sqlx::Error>;
}

impl<T> OptionalRow<T> for Result<T, sqlx::Error> {
    fn optional(self) -> Result<Option<T>, sqlx::Error> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(sqlx::Error::RowNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

pub(crate) fn parse_column<T>(
    table: &'static str,
    column: &'static str,
    raw: String,
    parse: fn(&str) -> Option<T>,
) -> Result<T, StoreError> {
    parse(&raw).ok_or(StoreError::InvalidValue {
        table,
        column,
        value: raw,
    })
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String, StoreError> {
    Ok(serde_json::to_string(value)?)
}

pub(crate) fn from_json<T: DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    Ok(serde_json::from_str(raw)?)
}
