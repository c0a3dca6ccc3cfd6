//! Path repository trait and implementation

use crate::error::Result;
use crate::models::{LocalPath, PathKey};
use async_trait::async_trait;
use sqlx::{query_as, query_scalar, SqlitePool};

#[async_trait]
pub trait PathRepository: Send + Sync {
    async fn find_by_id(&self, id: PathKey) -> Result<Option<LocalPath>>;

    /// Owned paths, ordered by path
    async fn list_owned(&self, owner: &str) -> Result<Vec<LocalPath>>;

    async fn count_owned(&self, owner: &str) -> Result<i64>;
}

pub struct SqlitePathRepository {
    pool: SqlitePool,
}

impl SqlitePathRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PathRepository for SqlitePathRepository {
    async fn find_by_id(&self, id: PathKey) -> Result<Option<LocalPath>> {
        let path = query_as::<_, LocalPath>("SELECT * FROM paths WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(path)
    }

    async fn list_owned(&self, owner: &str) -> Result<Vec<LocalPath>> {
        let paths = query_as::<_, LocalPath>("SELECT * FROM paths WHERE owner = ? ORDER BY path")
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;

        Ok(paths)
    }

    async fn count_owned(&self, owner: &str) -> Result<i64> {
        let count = query_scalar::<_, i64>("SELECT COUNT(*) FROM paths WHERE owner = ?")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::store::LibraryTransaction;

    #[tokio::test]
    async fn test_list_owned_paths() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqlitePathRepository::new(pool.clone());

        sqlx::query("INSERT INTO paths (path) VALUES ('/host/music/')")
            .execute(&pool)
            .await
            .unwrap();

        let mut tx = LibraryTransaction::begin(&pool).await.unwrap();
        let b = tx.get_or_create_path("/sync/B/", "navidrome").await.unwrap();
        tx.get_or_create_path("/sync/A/", "navidrome").await.unwrap();
        tx.commit().await.unwrap();

        let owned = repo.list_owned("navidrome").await.unwrap();
        let paths: Vec<_> = owned.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["/sync/A/", "/sync/B/"]);
        assert_eq!(repo.count_owned("navidrome").await.unwrap(), 2);
        assert_eq!(repo.find_by_id(b).await.unwrap().unwrap().path, "/sync/B/");
    }
}
