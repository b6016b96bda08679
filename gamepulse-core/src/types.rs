use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Backend readiness as reported by `GET /status`.
///
/// Missing flags mean "not loaded"; the counts are only present once the
/// corresponding data set has been ingested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStatus {
    #[serde(default)]
    pub posts_loaded: bool,
    #[serde(default)]
    pub comments_loaded: bool,
    #[serde(default)]
    pub analysis_loaded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzed_comment_count: Option<u64>,
}

impl DataStatus {
    pub fn fully_loaded() -> Self {
        Self {
            posts_loaded: true,
            comments_loaded: true,
            analysis_loaded: true,
            ..Default::default()
        }
    }

    pub fn is_ready(&self) -> bool {
        self.posts_loaded && self.comments_loaded && self.analysis_loaded
    }
}

/// Source file references handed to `POST /load-data`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRequest {
    pub posts_file: String,
    pub comments_file: String,
    pub analysis_file: String,
}

impl LoadRequest {
    pub fn new(
        posts_file: impl Into<String>,
        comments_file: impl Into<String>,
        analysis_file: impl Into<String>,
    ) -> Self {
        Self {
            posts_file: posts_file.into(),
            comments_file: comments_file.into(),
            analysis_file: analysis_file.into(),
        }
    }

    /// All three paths present. Whitespace-only counts as empty.
    pub fn is_complete(&self) -> bool {
        [&self.posts_file, &self.comments_file, &self.analysis_file]
            .iter()
            .all(|path| !path.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
    Hour,
    #[default]
    Day,
    Week,
}

impl TimePeriod {
    pub const ALL: [TimePeriod; 3] = [TimePeriod::Hour, TimePeriod::Day, TimePeriod::Week];

    /// Value of the `period` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimePeriod::Hour => "hour",
            TimePeriod::Day => "day",
            TimePeriod::Week => "week",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimePeriod::Hour => "Hourly",
            TimePeriod::Day => "Daily",
            TimePeriod::Week => "Weekly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|period| period.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    #[default]
    #[serde(rename = "reddit")]
    Reddit,
    #[serde(rename = "youtube")]
    YouTube,
    #[serde(rename = "app_store")]
    AppStore,
}

impl DataSource {
    pub const ALL: [DataSource; 3] = [DataSource::Reddit, DataSource::YouTube, DataSource::AppStore];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Reddit => "reddit",
            DataSource::YouTube => "youtube",
            DataSource::AppStore => "app_store",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DataSource::Reddit => "Reddit",
            DataSource::YouTube => "YouTube",
            DataSource::AppStore => "App Store",
        }
    }

    /// Only Reddit feedback is ingested by the backend today.
    pub fn is_supported(&self) -> bool {
        matches!(self, DataSource::Reddit)
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|source| source.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshParameters {
    pub time_period: TimePeriod,
    pub data_source: DataSource,
}

/// The six derived views that make up one dashboard snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DashboardResource {
    TrendingTopics,
    SentimentOverTime,
    TopComments,
    ThemeDistribution,
    Wordcloud,
    DeveloperInsights,
}

impl DashboardResource {
    pub const ALL: [DashboardResource; 6] = [
        DashboardResource::TrendingTopics,
        DashboardResource::SentimentOverTime,
        DashboardResource::TopComments,
        DashboardResource::ThemeDistribution,
        DashboardResource::Wordcloud,
        DashboardResource::DeveloperInsights,
    ];

    pub fn endpoint(&self) -> &'static str {
        match self {
            DashboardResource::TrendingTopics => "/trending-topics",
            DashboardResource::SentimentOverTime => "/sentiment-over-time",
            DashboardResource::TopComments => "/top-comments",
            DashboardResource::ThemeDistribution => "/theme-distribution",
            DashboardResource::Wordcloud => "/wordcloud",
            DashboardResource::DeveloperInsights => "/developer-insights",
        }
    }
}

impl fmt::Display for DashboardResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.endpoint().trim_start_matches('/'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub theme: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub sentiment: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopComment {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub body: String,
    #[serde(default, deserialize_with = "deserialize_nullable_text")]
    pub summary: String,
    pub score: i64,
    pub sentiment: f64,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(rename = "created_utc", deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeShare {
    pub count: u64,
    pub percentage: f64,
}

pub type ThemeDistribution = BTreeMap<String, ThemeShare>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordcloudImage {
    pub image: String,
}

impl WordcloudImage {
    pub fn is_data_uri(&self) -> bool {
        self.image.starts_with("data:")
    }

    /// Media type of a `data:` URI, e.g. `image/png`.
    pub fn media_type(&self) -> Option<&str> {
        let rest = self.image.strip_prefix("data:")?;
        let end = rest.find([';', ','])?;
        Some(&rest[..end]).filter(|media| !media.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightItem {
    pub text: String,
    #[serde(default, deserialize_with = "deserialize_nullable_text")]
    pub summary: String,
    pub sentiment: f64,
    pub score: i64,
}

/// Category key (`bugs`, `balance`, ...) to the top feedback in it.
pub type DeveloperInsights = BTreeMap<String, Vec<InsightItem>>;

/// One consistent set of all six dashboard views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub trending_topics: Vec<TrendingTopic>,
    pub sentiment_series: Vec<SentimentPoint>,
    pub top_comments: Vec<TopComment>,
    pub theme_distribution: ThemeDistribution,
    pub wordcloud: WordcloudImage,
    pub developer_insights: DeveloperInsights,
}

impl DashboardSnapshot {
    pub fn is_sentiment_ordered(&self) -> bool {
        self.sentiment_series
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    }
}

/// Result of `POST /analyze-comment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentAnalysis {
    pub sentiment: String,
    #[serde(deserialize_with = "deserialize_score")]
    pub sentiment_score: f64,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_nullable_text")]
    pub summary: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Seconds(i64),
    FractionalSeconds(f64),
    Text(String),
}

/// Parses the timestamp shapes the backend emits: RFC 3339, naive ISO-8601
/// (taken as UTC), a bare date, or epoch seconds.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
    }

    value.parse::<f64>().ok().and_then(from_epoch_seconds)
}

fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round() as u32;
    Utc.timestamp_opt(whole as i64, nanos.min(999_999_999)).single()
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Seconds(seconds) => Utc.timestamp_opt(seconds, 0).single(),
        RawTimestamp::FractionalSeconds(seconds) => from_epoch_seconds(seconds),
        RawTimestamp::Text(text) => parse_timestamp(&text),
    };
    parsed.ok_or_else(|| serde::de::Error::custom("unrecognized timestamp"))
}

fn deserialize_nullable_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(id) => id.to_string(),
        RawId::Text(id) => id,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScore {
    Number(f64),
    Text(String),
}

// The analyzer prompt asks for "number from -1.0 to 1.0" and models often
// answer with a quoted number.
fn deserialize_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawScore::deserialize(deserializer)? {
        RawScore::Number(score) => Ok(score),
        RawScore::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid score: {text}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_status_defaults_missing_flags_to_not_loaded() {
        let status: DataStatus = serde_json::from_str(r#"{"status": "ok"}"#).unwrap();
        assert!(!status.is_ready());
        assert_eq!(status, DataStatus::default());

        let status: DataStatus = serde_json::from_str(
            r#"{"posts_loaded": true, "comments_loaded": true, "analysis_loaded": true, "post_count": 12}"#,
        )
        .unwrap();
        assert!(status.is_ready());
        assert_eq!(status.post_count, Some(12));
        assert_eq!(status.comment_count, None);
    }

    #[test]
    fn test_load_request_completeness() {
        assert!(LoadRequest::new("a.json", "b.json", "c.json").is_complete());
        assert!(!LoadRequest::new("a.json", "", "c.json").is_complete());
        assert!(!LoadRequest::new("a.json", "b.json", "   ").is_complete());
        assert!(!LoadRequest::default().is_complete());
    }

    #[test]
    fn test_data_source_wire_names() {
        assert_eq!(serde_json::to_string(&DataSource::YouTube).unwrap(), "\"youtube\"");
        assert_eq!(serde_json::to_string(&DataSource::AppStore).unwrap(), "\"app_store\"");
        assert_eq!(DataSource::parse("App_Store"), Some(DataSource::AppStore));
        assert!(DataSource::Reddit.is_supported());
        assert!(!DataSource::YouTube.is_supported());
        assert!(!DataSource::AppStore.is_supported());
    }

    #[test]
    fn test_time_period_query_values() {
        assert_eq!(TimePeriod::default(), TimePeriod::Day);
        assert_eq!(TimePeriod::Week.as_str(), "week");
        assert_eq!(TimePeriod::parse(" HOUR "), Some(TimePeriod::Hour));
        assert_eq!(TimePeriod::parse("month"), None);
    }

    #[test]
    fn test_parse_timestamp_shapes() {
        let naive = parse_timestamp("2024-03-01T14:00:00").unwrap();
        assert_eq!((naive.day(), naive.hour()), (1, 14));

        let offset = parse_timestamp("2024-03-01T14:00:00+02:00").unwrap();
        assert_eq!(offset.hour(), 12);

        let spaced = parse_timestamp("2024-03-01 14:30:05.250").unwrap();
        assert_eq!(spaced.minute(), 30);

        let date = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(date.hour(), 0);

        let epoch = parse_timestamp("1709301600").unwrap();
        assert_eq!(epoch.timestamp(), 1_709_301_600);

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_top_comment_accepts_epoch_and_null_summary() {
        let comment: TopComment = serde_json::from_str(
            r#"{"id": "k1", "body": "Hog rider is broken", "summary": null, "score": 42,
                "sentiment": -0.4, "themes": ["game balance"], "created_utc": 1709301600.5}"#,
        )
        .unwrap();
        assert_eq!(comment.summary, "");
        assert_eq!(comment.created_at.timestamp(), 1_709_301_600);
        assert_eq!(comment.created_at.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_sentiment_point_rejects_garbage_timestamp() {
        let result: Result<SentimentPoint, _> =
            serde_json::from_str(r#"{"timestamp": "soon", "sentiment": 0.1, "count": 3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_wordcloud_media_type() {
        let image = WordcloudImage {
            image: "data:image/png;base64,iVBORw0KGgo=".to_string(),
        };
        assert!(image.is_data_uri());
        assert_eq!(image.media_type(), Some("image/png"));

        let url = WordcloudImage {
            image: "https://cdn.example.com/cloud.png".to_string(),
        };
        assert!(!url.is_data_uri());
        assert_eq!(url.media_type(), None);
    }

    #[test]
    fn test_comment_analysis_quoted_score() {
        let analysis: CommentAnalysis = serde_json::from_str(
            r#"{"sentiment": "negative", "sentiment_score": "-0.6",
                "themes": ["user interface"], "summary": "Menus are confusing."}"#,
        )
        .unwrap();
        assert_eq!(analysis.sentiment_score, -0.6);
        assert_eq!(analysis.themes, vec!["user interface".to_string()]);
    }

    #[test]
    fn test_snapshot_ordering_check() {
        let point = |ts: &str| SentimentPoint {
            timestamp: parse_timestamp(ts).unwrap(),
            sentiment: 0.0,
            count: 1,
        };
        let mut snapshot = DashboardSnapshot {
            sentiment_series: vec![point("2024-01-01"), point("2024-01-01"), point("2024-01-02")],
            ..Default::default()
        };
        assert!(snapshot.is_sentiment_ordered());

        snapshot.sentiment_series.reverse();
        assert!(!snapshot.is_sentiment_ordered());
    }
}
