use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::activities::models::{ActivityFilter, FileActivity, NewActivity};
use crate::features::activities::repositories::ActivityRepository;
use crate::shared::types::PaginationQuery;

/// Service for the file activity log
pub struct ActivityService {
    repository: Arc<dyn ActivityRepository>,
}

impl ActivityService {
    pub fn new(repository: Arc<dyn ActivityRepository>) -> Self {
        Self { repository }
    }

    /// Append an activity; failures are logged and swallowed
    pub async fn record(&self, activity: NewActivity) {
        let activity_type = activity.activity_type;
        let filepath = activity.filepath.clone();

        match self.repository.insert(activity).await {
            Ok(saved) => tracing::debug!(
                "Recorded {} of {} by {}",
                saved.activity_type,
                saved.filepath,
                saved.username
            ),
            Err(e) => tracing::warn!(
                "Failed to record {} activity for {}: {}",
                activity_type,
                filepath,
                e
            ),
        }
    }

    pub async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<FileActivity>> {
        self.repository.recent_for_user(user_id, limit).await
    }

    pub async fn list(
        &self,
        filter: &ActivityFilter,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<FileActivity>, i64)> {
        self.repository
            .list(filter, pagination.limit(), pagination.offset())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::activities::models::ActivityType;
    use crate::shared::test_helpers::{FailingActivityRepository, InMemoryActivityRepository};

    fn activity(user_id: Uuid, filename: &str, activity_type: ActivityType) -> NewActivity {
        NewActivity {
            user_id,
            username: "vessel_a".to_string(),
            filename: filename.to_string(),
            filepath: format!("/vesselA/{}", filename),
            activity_type,
            ip_address: Some("10.0.0.1".to_string()),
            file_size: Some(42),
        }
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let service = ActivityService::new(Arc::new(InMemoryActivityRepository::default()));
        let user_id = Uuid::now_v7();

        service.record(activity(user_id, "a.txt", ActivityType::Upload)).await;
        service.record(activity(user_id, "b.txt", ActivityType::Download)).await;
        service.record(activity(Uuid::now_v7(), "other.txt", ActivityType::View)).await;

        let recent = service.recent_for_user(user_id, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].filename, "b.txt");
        assert_eq!(recent[1].filename, "a.txt");
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let service = ActivityService::new(Arc::new(InMemoryActivityRepository::default()));
        let user_id = Uuid::now_v7();
        for i in 0..5 {
            service
                .record(activity(user_id, &format!("log{}.txt", i), ActivityType::Upload))
                .await;
        }
        service.record(activity(user_id, "manual.pdf", ActivityType::Delete)).await;

        let filter = ActivityFilter {
            activity_type: Some(ActivityType::Upload),
            ..Default::default()
        };
        let page = PaginationQuery {
            page: 2,
            page_size: 2,
        };
        let (items, total) = service.list(&filter, &page).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].filename, "log2.txt");

        let filter = ActivityFilter {
            search: Some("MANUAL".to_string()),
            ..Default::default()
        };
        let (items, total) = service.list(&filter, &PaginationQuery::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].activity_type, ActivityType::Delete);
    }

    #[tokio::test]
    async fn test_record_failure_is_not_fatal() {
        let service = ActivityService::new(Arc::new(FailingActivityRepository));

        service
            .record(activity(Uuid::now_v7(), "a.txt", ActivityType::Upload))
            .await;
    }
}
