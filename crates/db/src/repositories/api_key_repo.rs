//! Repository for the `api_keys` table.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::api_key::{ApiKey, ApiKeyListItem};

const COLUMNS: &str = "\
    id, name, key_hash, key_prefix, is_active, rate_limit, last_used_at, \
    metadata, inserted_at, updated_at";

const LIST_COLUMNS: &str = "\
    id, name, key_prefix, is_active, rate_limit, last_used_at, inserted_at";

/// Provides CRUD operations for API keys.
pub struct ApiKeyRepo;

impl ApiKeyRepo {
    /// Create a new API key. The caller generates the secret and passes
    /// only its hash and lookup prefix.
    pub async fn create(
        pool: &PgPool,
        name: &str,
        key_hash: &str,
        key_prefix: &str,
        rate_limit: Option<i32>,
    ) -> Result<ApiKey, sqlx::Error> {
        let query = format!(
            "INSERT INTO api_keys (name, key_hash, key_prefix, rate_limit) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(name)
            .bind(key_hash)
            .bind(key_prefix)
            .bind(rate_limit)
            .fetch_one(pool)
            .await
    }

    /// Find the active key with the given lookup prefix.
    ///
    /// The partial unique index guarantees at most one active row per
    /// prefix, so authentication resolves to a single hash to verify.
    pub async fn find_active_by_prefix(
        pool: &PgPool,
        key_prefix: &str,
    ) -> Result<Option<ApiKey>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM api_keys WHERE key_prefix = $1 AND is_active"
        );
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(key_prefix)
            .fetch_optional(pool)
            .await
    }

    /// Find a key by its id.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<ApiKey>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM api_keys WHERE id = $1");
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all API keys, newest first. Does **not** include `key_hash`.
    pub async fn list(pool: &PgPool) -> Result<Vec<ApiKeyListItem>, sqlx::Error> {
        let query = format!(
            "SELECT {LIST_COLUMNS} FROM api_keys ORDER BY inserted_at DESC"
        );
        sqlx::query_as::<_, ApiKeyListItem>(&query)
            .fetch_all(pool)
            .await
    }

    /// Soft-deactivate a key. Historical messages keep their reference.
    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<Option<ApiKey>, sqlx::Error> {
        let query = format!(
            "UPDATE api_keys SET is_active = FALSE, updated_at = NOW() \
             WHERE id = $1 AND is_active \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ApiKey>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Hard-delete a key. Messages created with it survive with a null
    /// `api_key_id` (FK is `ON DELETE SET NULL`).
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update `last_used_at` to now. Best-effort; the caller runs this off
    /// the request path.
    pub async fn touch_last_used(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
