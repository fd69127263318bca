use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

const CREATION_COLUMNS: &str =
    "id, user_id, prompt, content, type, publish, likes, created_at";

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Display, EnumString, TS,
)]
#[sqlx(type_name = "creation_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CreationType {
    Article,
    Blog,
    Image,
    /// Older clients label these `resume`.
    #[serde(alias = "resume")]
    #[strum(to_string = "resume-review", serialize = "resume")]
    ResumeReview,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Creation {
    pub id: Uuid,
    pub user_id: String,
    pub prompt: String,
    pub content: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub creation_type: CreationType,
    pub publish: bool,
    #[ts(type = "string[]")]
    pub likes: sqlx::types::Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCreation {
    pub user_id: String,
    pub prompt: String,
    pub content: String,
    pub creation_type: CreationType,
    pub publish: bool,
}

/// Like set after a toggle, plus whether the caller is now in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeToggle {
    pub liked: bool,
    pub likes: Vec<String>,
}

#[derive(Debug, Clone, Copy, FromRow, Serialize, PartialEq, Eq, TS)]
pub struct CreationStats {
    pub total: i64,
    pub this_week: i64,
    pub published: i64,
}

impl Creation {
    pub fn likes(&self) -> &[String] {
        &self.likes.0
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateCreation,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Creation>(&format!(
            r#"INSERT INTO creations (id, user_id, prompt, content, type, publish, likes)
               VALUES ($1, $2, $3, $4, $5, $6, '[]')
               RETURNING {CREATION_COLUMNS}"#
        ))
        .bind(id)
        .bind(&data.user_id)
        .bind(&data.prompt)
        .bind(&data.content)
        .bind(data.creation_type)
        .bind(data.publish)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Creation>(&format!(
            "SELECT {CREATION_COLUMNS} FROM creations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Creation>(&format!(
            r#"SELECT {CREATION_COLUMNS}
               FROM creations
               WHERE user_id = $1
               ORDER BY created_at DESC, rowid DESC"#
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    // Unbounded on purpose for now; large galleries will need a cursor.
    pub async fn find_published(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Creation>(&format!(
            r#"SELECT {CREATION_COLUMNS}
               FROM creations
               WHERE publish = TRUE
               ORDER BY created_at DESC, rowid DESC"#
        ))
        .fetch_all(pool)
        .await
    }

    /// Adds `user_id` to the like set if absent, removes it if present.
    ///
    /// The new array is computed by SQLite inside a single UPDATE, so two
    /// concurrent toggles on the same row serialize instead of overwriting
    /// each other. Returns `None` when no row has `id`.
    pub async fn toggle_like(
        pool: &SqlitePool,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<LikeToggle>, sqlx::Error> {
        let likes = sqlx::query_scalar::<_, sqlx::types::Json<Vec<String>>>(
            r#"UPDATE creations
               SET likes = CASE
                   WHEN EXISTS (
                       SELECT 1 FROM json_each(creations.likes) WHERE json_each.value = $2
                   )
                   THEN (
                       SELECT json_group_array(json_each.value)
                       FROM json_each(creations.likes)
                       WHERE json_each.value <> $2
                   )
                   ELSE json_insert(creations.likes, '$[#]', $2)
               END
               WHERE id = $1
               RETURNING likes"#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(likes.map(|likes| {
            let likes = likes.0;
            LikeToggle {
                liked: likes.iter().any(|like| like == user_id),
                likes,
            }
        }))
    }

    /// Deletes `id` only if it belongs to `user_id`.
    pub async fn delete_owned(
        pool: &SqlitePool,
        id: Uuid,
        user_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM creations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all_for_user(pool: &SqlitePool, user_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM creations WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn stats_for_user(
        pool: &SqlitePool,
        user_id: &str,
        window_days: u32,
    ) -> Result<CreationStats, sqlx::Error> {
        sqlx::query_as::<_, CreationStats>(
            r#"SELECT COUNT(*) AS total,
                      COALESCE(SUM(CASE WHEN created_at >= datetime('now', $2) THEN 1 ELSE 0 END), 0) AS this_week,
                      COALESCE(SUM(CASE WHEN publish THEN 1 ELSE 0 END), 0) AS published
               FROM creations
               WHERE user_id = $1"#,
        )
        .bind(user_id)
        .bind(format!("-{window_days} days"))
        .fetch_one(pool)
        .await
    }
}
