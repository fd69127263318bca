//! Read, like and delete operations over stored creations.

use db::models::creation::{Creation, CreationStats};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

/// Window used for the "this week" dashboard counter.
pub const STATS_WINDOW_DAYS: u32 = 7;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("Creation not found")]
    CreationNotFound,
    /// Shared by "absent" and "owned by someone else" so callers cannot probe
    /// for other users' ids.
    #[error("Creation not found or unauthorized")]
    NotOwnedOrMissing,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes: Vec<String>,
}

impl LikeOutcome {
    pub fn message(&self) -> &'static str {
        if self.liked {
            "Creation Liked"
        } else {
            "Creation Unliked"
        }
    }
}

pub async fn list_published(pool: &SqlitePool) -> Result<Vec<Creation>, GalleryError> {
    Ok(Creation::find_published(pool).await?)
}

pub async fn list_owned(pool: &SqlitePool, user_id: &str) -> Result<Vec<Creation>, GalleryError> {
    Ok(Creation::find_by_user(pool, user_id).await?)
}

/// Flips the caller's membership in the like set of a creation they can see.
pub async fn toggle_like(
    pool: &SqlitePool,
    user_id: &str,
    creation_id: Uuid,
) -> Result<LikeOutcome, GalleryError> {
    let visible = Creation::find_by_id(pool, creation_id)
        .await?
        .is_some_and(|creation| creation.publish || creation.user_id == user_id);
    if !visible {
        return Err(GalleryError::CreationNotFound);
    }

    // The row can still vanish between the check and the update.
    let toggle = Creation::toggle_like(pool, creation_id, user_id)
        .await?
        .ok_or(GalleryError::CreationNotFound)?;

    Ok(LikeOutcome {
        liked: toggle.liked,
        likes: toggle.likes,
    })
}

pub async fn delete_one(
    pool: &SqlitePool,
    user_id: &str,
    creation_id: Uuid,
) -> Result<(), GalleryError> {
    let deleted = Creation::delete_owned(pool, creation_id, user_id).await?;
    if deleted == 0 {
        return Err(GalleryError::NotOwnedOrMissing);
    }
    tracing::info!("user {} deleted creation {}", user_id, creation_id);
    Ok(())
}

/// Returns how many rows were removed. Clearing an empty history succeeds.
pub async fn delete_all(pool: &SqlitePool, user_id: &str) -> Result<u64, GalleryError> {
    let deleted = Creation::delete_all_for_user(pool, user_id).await?;
    tracing::info!("user {} cleared {} creations", user_id, deleted);
    Ok(deleted)
}

pub async fn creation_stats(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<CreationStats, GalleryError> {
    Ok(Creation::stats_for_user(pool, user_id, STATS_WINDOW_DAYS).await?)
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::creation::{CreateCreation, CreationType},
    };

    use super::*;

    async fn pool() -> SqlitePool {
        DBService::new_in_memory().await.expect("db").pool
    }

    async fn seed(pool: &SqlitePool, user_id: &str, publish: bool) -> Uuid {
        let id = Uuid::new_v4();
        Creation::create(
            pool,
            &CreateCreation {
                user_id: user_id.to_string(),
                prompt: "a lighthouse".to_string(),
                content: "https://cdn.test/a.png".to_string(),
                creation_type: CreationType::Image,
                publish,
            },
            id,
        )
        .await
        .expect("seed creation");
        id
    }

    #[tokio::test]
    async fn like_then_unlike_restores_empty_set() {
        let pool = pool().await;
        let id = seed(&pool, "u1", true).await;

        let first = toggle_like(&pool, "u2", id).await.expect("like");
        assert!(first.liked);
        assert_eq!(first.likes, vec!["u2".to_string()]);
        assert_eq!(first.message(), "Creation Liked");

        let second = toggle_like(&pool, "u2", id).await.expect("unlike");
        assert!(!second.liked);
        assert!(second.likes.is_empty());
        assert_eq!(second.message(), "Creation Unliked");

        let stored = Creation::find_by_id(&pool, id).await.unwrap().unwrap();
        assert!(stored.likes().is_empty());
    }

    #[tokio::test]
    async fn toggling_keeps_other_likes() {
        let pool = pool().await;
        let id = seed(&pool, "u1", true).await;

        toggle_like(&pool, "u2", id).await.unwrap();
        toggle_like(&pool, "u3", id).await.unwrap();
        let outcome = toggle_like(&pool, "u2", id).await.unwrap();

        assert_eq!(outcome.likes, vec!["u3".to_string()]);
    }

    #[tokio::test]
    async fn unknown_or_hidden_creation_cannot_be_liked() {
        let pool = pool().await;
        let hidden = seed(&pool, "u1", false).await;

        assert!(matches!(
            toggle_like(&pool, "u2", Uuid::new_v4()).await,
            Err(GalleryError::CreationNotFound)
        ));
        assert!(matches!(
            toggle_like(&pool, "u2", hidden).await,
            Err(GalleryError::CreationNotFound)
        ));
        // Owners can like their own drafts.
        assert!(toggle_like(&pool, "u1", hidden).await.unwrap().liked);
    }

    #[tokio::test]
    async fn concurrent_likes_from_distinct_users_all_land() {
        let pool = pool().await;
        let id = seed(&pool, "owner", true).await;

        let users: Vec<String> = (0..16).map(|i| format!("user_{i}")).collect();
        let mut handles = Vec::new();
        for user in users.clone() {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                toggle_like(&pool, &user, id).await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("toggle");
        }

        let stored = Creation::find_by_id(&pool, id).await.unwrap().unwrap();
        let mut likes = stored.likes().to_vec();
        likes.sort();
        let mut expected = users;
        expected.sort();
        assert_eq!(likes, expected);
    }

    #[tokio::test]
    async fn published_listing_excludes_drafts() {
        let pool = pool().await;
        let public = seed(&pool, "u1", true).await;
        seed(&pool, "u1", false).await;
        seed(&pool, "u2", false).await;

        let published = list_published(&pool).await.unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].id, public);
        assert!(published.iter().all(|c| c.publish));

        assert_eq!(list_owned(&pool, "u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_one_only_removes_own_rows() {
        let pool = pool().await;
        let mine = seed(&pool, "u1", true).await;

        let err = delete_one(&pool, "u2", mine).await.unwrap_err();
        assert!(matches!(err, GalleryError::NotOwnedOrMissing));
        let missing = delete_one(&pool, "u2", Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.to_string(), missing.to_string());
        assert!(Creation::find_by_id(&pool, mine).await.unwrap().is_some());

        delete_one(&pool, "u1", mine).await.expect("owner delete");
        assert!(Creation::find_by_id(&pool, mine).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_all_is_scoped_to_caller() {
        let pool = pool().await;
        seed(&pool, "u1", true).await;
        seed(&pool, "u1", false).await;
        seed(&pool, "u2", true).await;

        assert_eq!(delete_all(&pool, "u1").await.unwrap(), 2);
        assert!(list_owned(&pool, "u1").await.unwrap().is_empty());
        assert_eq!(list_owned(&pool, "u2").await.unwrap().len(), 1);
        assert_eq!(delete_all(&pool, "u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stats_count_recent_and_published() {
        let pool = pool().await;
        seed(&pool, "u1", true).await;
        seed(&pool, "u1", false).await;
        seed(&pool, "u2", true).await;

        let stats = creation_stats(&pool, "u1").await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.this_week, 2);
        assert_eq!(stats.published, 1);
    }
}
