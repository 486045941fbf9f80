// Postgres persistence for imported content and profile lookups.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use recipe_common::{ImportedContent, NewContent, ProcessingStatus};

use crate::traits::{ContentStore, ProfileDirectory};

/// A row from the imported_content table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ContentRow {
    id: Uuid,
    user_id: Option<Uuid>,
    source_url: String,
    content: Option<serde_json::Value>,
    metadata: Option<serde_json::Value>,
    status: String,
    retry_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ContentRow> for ImportedContent {
    type Error = anyhow::Error;

    fn try_from(row: ContentRow) -> Result<Self> {
        let status: ProcessingStatus = row.status.parse().map_err(|e: String| anyhow!(e))?;
        Ok(ImportedContent {
            id: row.id,
            user_id: row.user_id,
            source_url: row.source_url,
            content: row.content.unwrap_or(serde_json::Value::Null),
            metadata: row.metadata.unwrap_or(serde_json::Value::Null),
            status,
            retry_count: row.retry_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn find_latest_by_source_url(&self, url: &str) -> Result<Option<ImportedContent>> {
        let row = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT * FROM imported_content
            WHERE source_url = $1 AND status = 'COMPLETED'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ImportedContent::try_from).transpose()
    }

    async fn insert_content(&self, new: NewContent) -> Result<ImportedContent> {
        let row = sqlx::query_as::<_, ContentRow>(
            r#"
            INSERT INTO imported_content
                (user_id, source_url, content, metadata, status, retry_count)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(&new.source_url)
        .bind(&new.content)
        .bind(&new.metadata)
        .bind(ProcessingStatus::Completed.as_str())
        .bind(new.retry_count)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn increment_usage_counter(&self, profile_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, Option<i64>>("SELECT increment_ai_imports($1)")
            .bind(profile_id)
            .fetch_one(&self.pool)
            .await?;

        count.ok_or_else(|| anyhow!("profile {profile_id} not found"))
    }

    async fn anonymize_user_content(&self, profile_id: Uuid) -> Result<u64> {
        let result = sqlx::query("UPDATE imported_content SET user_id = NULL WHERE user_id = $1")
            .bind(profile_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

pub struct PgProfileDirectory {
    pool: PgPool,
}

impl PgProfileDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileDirectory for PgProfileDirectory {
    async fn profile_id_for_auth_user(&self, auth_user_id: Uuid) -> Result<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM profiles WHERE auth_user_id = $1")
            .bind(auth_user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(id)
    }
}
