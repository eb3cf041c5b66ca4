use serde_json::Value;

use crate::client::{ApiClient, ApiError};

use super::models::{AdminCaseSummary, PlatformMetrics, StruggleMetrics, UserDetail, UserSummary};

/// Offset paging for the admin list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Page {
    fn query(&self) -> String {
        format!("limit={}&offset={}", self.limit, self.offset)
    }
}

impl ApiClient {
    pub async fn get_admin_metrics(&self) -> Result<PlatformMetrics, ApiError> {
        self.get("/admin/metrics").await
    }

    pub async fn get_struggle_metrics(&self) -> Result<StruggleMetrics, ApiError> {
        self.get("/admin/metrics/struggles").await
    }

    pub async fn get_admin_users(&self, page: Page) -> Result<Vec<UserSummary>, ApiError> {
        self.get(&format!("/admin/users?{}", page.query())).await
    }

    pub async fn get_admin_user(&self, user_id: &str) -> Result<UserDetail, ApiError> {
        let endpoint = format!("/admin/users/{}", urlencoding::encode(user_id));
        self.get(&endpoint).await
    }

    pub async fn get_admin_cases(&self, page: Page) -> Result<Vec<AdminCaseSummary>, ApiError> {
        self.get(&format!("/admin/cases?{}", page.query())).await
    }

    /// Full record of any user's case including the conversation.
    pub async fn get_admin_case(&self, session_id: &str) -> Result<Value, ApiError> {
        let endpoint = format!("/admin/cases/{}", urlencoding::encode(session_id));
        self.get(&endpoint).await
    }
}
