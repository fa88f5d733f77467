use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::activities::models::{ActivityFilter, FileActivity, NewActivity};

const ACTIVITY_COLUMNS: &str =
    "id, user_id, username, filename, filepath, activity_type, ip_address, file_size, created_at";

/// Append-only activity storage
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn insert(&self, activity: NewActivity) -> Result<FileActivity>;

    /// Newest first
    async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<FileActivity>>;

    /// Newest first, with the total count matching `filter`
    async fn list(
        &self,
        filter: &ActivityFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<FileActivity>, i64)>;
}

pub struct PgActivityRepository {
    pool: PgPool,
}

impl PgActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `%term%` for ILIKE, with the term's own wildcards matched literally
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ActivityFilter) {
    builder.push(" WHERE TRUE");

    if let Some(activity_type) = filter.activity_type {
        builder.push(" AND activity_type = ").push_bind(activity_type);
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = contains_pattern(search.trim());
        builder
            .push(" AND (filename ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR filepath ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR username ILIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

#[async_trait]
impl ActivityRepository for PgActivityRepository {
    async fn insert(&self, activity: NewActivity) -> Result<FileActivity> {
        sqlx::query_as::<_, FileActivity>(&format!(
            r#"
            INSERT INTO file_activities
                (id, user_id, username, filename, filepath, activity_type, ip_address, file_size)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            ACTIVITY_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(activity.user_id)
        .bind(activity.username)
        .bind(activity.filename)
        .bind(activity.filepath)
        .bind(activity.activity_type)
        .bind(activity.ip_address)
        .bind(activity.file_size)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<FileActivity>> {
        sqlx::query_as::<_, FileActivity>(&format!(
            r#"
            SELECT {}
            FROM file_activities
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            ACTIVITY_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load recent activities: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn list(
        &self,
        filter: &ActivityFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<FileActivity>, i64)> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM file_activities");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM file_activities",
            ACTIVITY_COLUMNS
        ));
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let activities = query
            .build_query_as::<FileActivity>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list activities: {:?}", e);
                AppError::Database(e)
            })?;

        Ok((activities, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("report"), "%report%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("c:\\tmp"), "%c:\\\\tmp%");
    }
}
