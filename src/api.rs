//! HTTP client for the LMS analytics backend. Every endpoint lives under `{base_url}/api`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::{
    CategoryCompletion, CourseAnalytic, DashboardStats, EnrollmentTrendPoint, StudentPerformance,
};

pub const INITIALIZE_DATA: &str = "initialize-data";
pub const DASHBOARD_STATS: &str = "dashboard-stats";
pub const STUDENT_PERFORMANCE: &str = "student-performance";
pub const COURSE_ANALYTICS: &str = "course-analytics";
pub const ENROLLMENT_TRENDS: &str = "enrollment-trends";
pub const COMPLETION_BY_CATEGORY: &str = "completion-by-category";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to /api/{endpoint} failed: {source}")]
    Request {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("/api/{endpoint} responded with {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },
}

impl ApiError {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ApiError::Request { endpoint, .. } | ApiError::Status { endpoint, .. } => endpoint,
        }
    }
}

/// Read side of the analytics backend plus the one seeding call.
#[async_trait]
pub trait AnalyticsSource: Send + Sync + 'static {
    async fn initialize_data(&self) -> Result<(), ApiError>;
    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError>;
    async fn student_performance(&self) -> Result<Vec<StudentPerformance>, ApiError>;
    async fn course_analytics(&self) -> Result<Vec<CourseAnalytic>, ApiError>;
    async fn enrollment_trends(&self) -> Result<Vec<EnrollmentTrendPoint>, ApiError>;
    async fn completion_by_category(&self) -> Result<Vec<CategoryCompletion>, ApiError>;
}

pub struct AnalyticsClient {
    api_url: String,
    client: reqwest::Client,
}

impl AnalyticsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            api_url: format!("{}/api", base_url.trim_end_matches('/')),
            client,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_url, endpoint)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &'static str) -> Result<T, ApiError> {
        debug!(endpoint, "GET");
        let response = self
            .client
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|source| ApiError::Request { endpoint, source })?;
        let response = check_status(endpoint, response)?;
        response
            .json()
            .await
            .map_err(|source| ApiError::Request { endpoint, source })
    }
}

fn check_status(
    endpoint: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::Status { endpoint, status })
    }
}

#[async_trait]
impl AnalyticsSource for AnalyticsClient {
    async fn initialize_data(&self) -> Result<(), ApiError> {
        let endpoint = INITIALIZE_DATA;
        debug!(endpoint, "POST");
        let response = self
            .client
            .post(self.url(endpoint))
            .send()
            .await
            .map_err(|source| ApiError::Request { endpoint, source })?;
        // Body is not part of the contract.
        check_status(endpoint, response)?;
        Ok(())
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.get_json(DASHBOARD_STATS).await
    }

    async fn student_performance(&self) -> Result<Vec<StudentPerformance>, ApiError> {
        self.get_json(STUDENT_PERFORMANCE).await
    }

    async fn course_analytics(&self) -> Result<Vec<CourseAnalytic>, ApiError> {
        self.get_json(COURSE_ANALYTICS).await
    }

    async fn enrollment_trends(&self) -> Result<Vec<EnrollmentTrendPoint>, ApiError> {
        self.get_json(ENROLLMENT_TRENDS).await
    }

    async fn completion_by_category(&self) -> Result<Vec<CategoryCompletion>, ApiError> {
        self.get_json(COMPLETION_BY_CATEGORY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AnalyticsClient {
        AnalyticsClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let client = AnalyticsClient::with_client("http://lms.local/", reqwest::Client::new());
        assert_eq!(
            client.url(DASHBOARD_STATS),
            "http://lms.local/api/dashboard-stats"
        );
    }

    #[tokio::test]
    async fn fetches_dashboard_stats() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/dashboard-stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_students": 100,
                "total_courses": 8,
                "total_enrollments": 340,
                "active_students": 72,
                "completion_rate": 41.2,
                "average_score": 78.9
            })))
            .mount(&server)
            .await;

        let stats = client_for(&server).dashboard_stats().await.unwrap();
        assert_eq!(stats.total_students, 100);
        assert_eq!(stats.active_students, 72);
        assert!((stats.completion_rate - 41.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn keeps_enrollment_trend_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/enrollment-trends"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"month": "2024-01", "enrollments": 12},
                {"month": "2024-02", "enrollments": 30},
                {"month": "2024-03", "enrollments": 7}
            ])))
            .mount(&server)
            .await;

        let trends = client_for(&server).enrollment_trends().await.unwrap();
        let months: Vec<_> = trends.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02", "2024-03"]);
    }

    #[tokio::test]
    async fn initialize_posts_and_ignores_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/initialize-data"))
            .respond_with(ResponseTemplate::new(200).set_body_string("seeded"))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).initialize_data().await.unwrap();
    }

    #[tokio::test]
    async fn server_error_maps_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/course-analytics"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server).course_analytics().await.unwrap_err();
        assert_eq!(err.endpoint(), COURSE_ANALYTICS);
        assert!(matches!(
            err,
            ApiError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[tokio::test]
    async fn malformed_body_is_a_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/completion-by-category"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .completion_by_category()
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Request { endpoint: COMPLETION_BY_CATEGORY, .. }));
    }
}
