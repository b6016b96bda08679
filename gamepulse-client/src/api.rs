use crate::metrics::{ApiMetrics, MetricsCollector, RequestMetrics};
use crate::DashboardApi;
use async_trait::async_trait;
use gamepulse_core::{
    ApiConfig, ApiError, CommentAnalysis, CoreError, DashboardResource, DataStatus,
    DeveloperInsights, LoadRequest, SentimentPoint, ThemeDistribution, TimePeriod, TopComment,
    TrendingTopic, WordcloudImage,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const STATUS_ENDPOINT: &str = "/status";
pub const LOAD_DATA_ENDPOINT: &str = "/load-data";
pub const ANALYZE_COMMENT_ENDPOINT: &str = "/analyze-comment";

/// Optional query parameters the backend accepts on the derived views.
#[derive(Debug, Clone, Default)]
struct QueryOptions {
    trending_limit: Option<u32>,
    top_comments_limit: Option<u32>,
    top_comments_sort: Option<String>,
    wordcloud_width: Option<u32>,
    wordcloud_height: Option<u32>,
}

#[derive(Debug, Serialize)]
struct AnalyzeCommentBody<'a> {
    text: &'a str,
}

// Flask answers `{"error": ...}`, FastAPI `{"detail": ...}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    detail: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct GamePulseApiClient {
    http_client: Client,
    base_url: String,
    metrics: Arc<MetricsCollector>,
    query: QueryOptions,
    request_timeout: Duration,
}

impl GamePulseApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            metrics: Arc::new(MetricsCollector::new()),
            query: QueryOptions {
                trending_limit: config.trending_limit,
                top_comments_limit: config.top_comments_limit,
                top_comments_sort: config.top_comments_sort.clone(),
                wordcloud_width: config.wordcloud_width,
                wordcloud_height: config.wordcloud_height,
            },
            request_timeout: config.request_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, endpoint);
        self.http_client.request(method, url)
    }

    /// Sends a prepared request and maps transport failures and non-2xx
    /// statuses to `ApiError`. Every outcome is recorded in the metrics.
    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        request_builder: RequestBuilder,
    ) -> Result<Response, CoreError> {
        let start_time = Instant::now();

        info!("Making GamePulse API request: {} {}", method, endpoint);
        let result = match request_builder.send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Request successful: {} {}", response.status(), endpoint);
                Ok(response)
            }
            Ok(response) => {
                let status_code = response.status().as_u16();
                error!(
                    "Request failed with status: {} for {}",
                    response.status(),
                    endpoint
                );
                let detail = Self::error_detail(response).await;

                if (500..600).contains(&status_code) {
                    Err(ApiError::ServerError {
                        endpoint: endpoint.to_string(),
                        status_code,
                        detail,
                    })
                } else {
                    Err(ApiError::ClientError {
                        endpoint: endpoint.to_string(),
                        status_code,
                        detail,
                    })
                }
            }
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                Err(Self::transport_error(endpoint, e))
            }
        };

        let (status_code, error_type) = match &result {
            Ok(response) => (Some(response.status().as_u16()), None),
            Err(ApiError::ServerError { status_code, .. }) => {
                (Some(*status_code), Some("server_error"))
            }
            Err(ApiError::ClientError { status_code, .. }) => {
                (Some(*status_code), Some("client_error"))
            }
            Err(ApiError::RequestTimeout { .. }) => (None, Some("timeout")),
            Err(ApiError::Unreachable { .. }) => (None, Some("unreachable")),
            Err(ApiError::InvalidResponse { .. }) => (None, Some("invalid_response")),
        };

        self.metrics
            .record_request(RequestMetrics {
                endpoint: endpoint.to_string(),
                method: method.to_string(),
                status_code,
                response_time: start_time.elapsed(),
                success: result.is_ok(),
                timed_out: matches!(result, Err(ApiError::RequestTimeout { .. })),
                error_type: error_type.map(str::to_string),
            })
            .await;

        result.map_err(CoreError::Api)
    }

    fn transport_error(endpoint: &str, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::RequestTimeout {
                endpoint: endpoint.to_string(),
            }
        } else {
            ApiError::Unreachable {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
        }
    }

    async fn error_detail(response: Response) -> Option<String> {
        let body = response.text().await.ok()?;
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody {
                error: Some(message),
                ..
            }) => Some(message),
            Ok(ErrorBody {
                detail: Some(serde_json::Value::String(message)),
                ..
            }) => Some(message),
            Ok(ErrorBody {
                detail: Some(other),
                ..
            }) => Some(other.to_string()),
            _ => {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.chars().take(200).collect())
            }
        }
    }

    async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T, CoreError> {
        let body = response
            .text()
            .await
            .map_err(|e| CoreError::Api(Self::transport_error(endpoint, e)))?;

        serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse response from {}: {}", endpoint, e);
            CoreError::Api(ApiError::InvalidResponse {
                endpoint: endpoint.to_string(),
                details: e.to_string(),
            })
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, String)],
    ) -> Result<T, CoreError> {
        let mut request_builder = self.request(Method::GET, endpoint);
        if !query_params.is_empty() {
            request_builder = request_builder.query(query_params);
        }

        let response = self
            .make_request(Method::GET, endpoint, request_builder)
            .await?;
        Self::decode(endpoint, response).await
    }

    /// Asks the backend to analyze a single piece of feedback.
    pub async fn analyze_comment(&self, text: &str) -> Result<CommentAnalysis, CoreError> {
        if text.trim().is_empty() {
            return Err(CoreError::InvalidInput {
                message: "comment text is empty".to_string(),
            });
        }

        let request_builder = self
            .request(Method::POST, ANALYZE_COMMENT_ENDPOINT)
            .json(&AnalyzeCommentBody { text });
        let response = self
            .make_request(Method::POST, ANALYZE_COMMENT_ENDPOINT, request_builder)
            .await?;

        let analysis: CommentAnalysis = Self::decode(ANALYZE_COMMENT_ENDPOINT, response).await?;
        debug!(
            "Comment analyzed as {} ({:.2})",
            analysis.sentiment, analysis.sentiment_score
        );
        Ok(analysis)
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.get_metrics().await
    }

    pub async fn export_metrics(&self) -> Result<String, serde_json::Error> {
        self.metrics.export_metrics().await
    }

    pub async fn reset_metrics(&self) {
        self.metrics.reset_metrics().await;
    }
}

#[async_trait]
impl DashboardApi for GamePulseApiClient {
    async fn status(&self) -> Result<DataStatus, CoreError> {
        let status: DataStatus = self.get_json(STATUS_ENDPOINT, &[]).await?;
        debug!(
            "Backend status: posts={} comments={} analysis={}",
            status.posts_loaded, status.comments_loaded, status.analysis_loaded
        );
        Ok(status)
    }

    async fn load_data(&self, request: &LoadRequest) -> Result<(), CoreError> {
        let request_builder = self.request(Method::POST, LOAD_DATA_ENDPOINT).json(request);
        self.make_request(Method::POST, LOAD_DATA_ENDPOINT, request_builder)
            .await?;
        info!(
            "Backend loaded posts={} comments={} analysis={}",
            request.posts_file, request.comments_file, request.analysis_file
        );
        Ok(())
    }

    async fn trending_topics(&self) -> Result<Vec<TrendingTopic>, CoreError> {
        let mut params = Vec::with_capacity(1);
        if let Some(limit) = self.query.trending_limit {
            params.push(("limit", limit.to_string()));
        }

        let topics: Vec<TrendingTopic> = self
            .get_json(DashboardResource::TrendingTopics.endpoint(), &params)
            .await?;
        debug!("Retrieved {} trending topics", topics.len());
        Ok(topics)
    }

    async fn sentiment_over_time(
        &self,
        period: TimePeriod,
    ) -> Result<Vec<SentimentPoint>, CoreError> {
        let params = [("period", period.as_str().to_string())];
        let series: Vec<SentimentPoint> = self
            .get_json(DashboardResource::SentimentOverTime.endpoint(), &params)
            .await?;
        debug!("Retrieved {} sentiment points for {}", series.len(), period);
        Ok(series)
    }

    async fn top_comments(&self) -> Result<Vec<TopComment>, CoreError> {
        let mut params = Vec::with_capacity(2);
        if let Some(limit) = self.query.top_comments_limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(ref sort_by) = self.query.top_comments_sort {
            params.push(("sort_by", sort_by.clone()));
        }

        let comments: Vec<TopComment> = self
            .get_json(DashboardResource::TopComments.endpoint(), &params)
            .await?;
        debug!("Retrieved {} top comments", comments.len());
        Ok(comments)
    }

    async fn theme_distribution(&self) -> Result<ThemeDistribution, CoreError> {
        self.get_json(DashboardResource::ThemeDistribution.endpoint(), &[])
            .await
    }

    async fn wordcloud(&self) -> Result<WordcloudImage, CoreError> {
        let mut params = Vec::with_capacity(2);
        if let Some(width) = self.query.wordcloud_width {
            params.push(("width", width.to_string()));
        }
        if let Some(height) = self.query.wordcloud_height {
            params.push(("height", height.to_string()));
        }

        let image: WordcloudImage = self
            .get_json(DashboardResource::Wordcloud.endpoint(), &params)
            .await?;
        if image.image.is_empty() {
            warn!("Backend returned an empty word cloud image");
        }
        Ok(image)
    }

    async fn developer_insights(&self) -> Result<DeveloperInsights, CoreError> {
        let insights: DeveloperInsights = self
            .get_json(DashboardResource::DeveloperInsights.endpoint(), &[])
            .await?;
        debug!("Retrieved developer insights for {} categories", insights.len());
        Ok(insights)
    }
}
