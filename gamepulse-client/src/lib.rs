use async_trait::async_trait;
use gamepulse_core::{
    CoreError, DataStatus, DeveloperInsights, LoadRequest, SentimentPoint, ThemeDistribution,
    TimePeriod, TopComment, TrendingTopic, WordcloudImage,
};

pub mod api;
pub mod metrics;


pub use api::GamePulseApiClient;
pub use metrics::{ApiMetrics, EndpointMetrics, MetricsCollector, RequestMetrics};

/// The backend surface the dashboard controller depends on.
///
/// `GamePulseApiClient` talks to the real REST API; tests substitute
/// in-memory implementations.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn status(&self) -> Result<DataStatus, CoreError>;

    async fn load_data(&self, request: &LoadRequest) -> Result<(), CoreError>;

    async fn trending_topics(&self) -> Result<Vec<TrendingTopic>, CoreError>;

    async fn sentiment_over_time(&self, period: TimePeriod)
        -> Result<Vec<SentimentPoint>, CoreError>;

    async fn top_comments(&self) -> Result<Vec<TopComment>, CoreError>;

    async fn theme_distribution(&self) -> Result<ThemeDistribution, CoreError>;

    async fn wordcloud(&self) -> Result<WordcloudImage, CoreError>;

    async fn developer_insights(&self) -> Result<DeveloperInsights, CoreError>;
}
