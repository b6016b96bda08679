//! Read-only projections of a committed snapshot for rendering.

use crate::state::{ControllerPhase, DashboardState, ReadyPhase};
use gamepulse_core::{
    DashboardSnapshot, DeveloperInsights, ErrorExt, InsightItem, ThemeDistribution, TopComment,
};
use std::cmp::Ordering;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommentSort {
    #[default]
    Score,
    Sentiment,
}

impl CommentSort {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "score" => Some(CommentSort::Score),
            "sentiment" => Some(CommentSort::Sentiment),
            _ => None,
        }
    }
}

/// Comments matching `search` (case-insensitive, over body, summary and
/// themes), highest first by the chosen key. An empty search keeps all.
pub fn filter_comments<'a>(
    comments: &'a [TopComment],
    search: &str,
    sort: CommentSort,
) -> Vec<&'a TopComment> {
    let needle = search.trim().to_lowercase();
    let mut matched: Vec<&TopComment> = comments
        .iter()
        .filter(|comment| needle.is_empty() || comment_matches(comment, &needle))
        .collect();

    match sort {
        CommentSort::Score => matched.sort_by(|a, b| b.score.cmp(&a.score)),
        CommentSort::Sentiment => matched.sort_by(|a, b| {
            b.sentiment
                .partial_cmp(&a.sentiment)
                .unwrap_or(Ordering::Equal)
        }),
    }
    matched
}

fn comment_matches(comment: &TopComment, needle: &str) -> bool {
    comment.body.to_lowercase().contains(needle)
        || comment.summary.to_lowercase().contains(needle)
        || comment
            .themes
            .iter()
            .any(|theme| theme.to_lowercase().contains(needle))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentBand {
    VeryPositive,
    Positive,
    Negative,
    VeryNegative,
}

impl SentimentBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.5 {
            SentimentBand::VeryPositive
        } else if score >= 0.0 {
            SentimentBand::Positive
        } else if score >= -0.5 {
            SentimentBand::Negative
        } else {
            SentimentBand::VeryNegative
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SentimentBand::VeryPositive => "Very positive",
            SentimentBand::Positive => "Positive",
            SentimentBand::Negative => "Negative",
            SentimentBand::VeryNegative => "Very negative",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThemeSlice<'a> {
    pub theme: &'a str,
    pub count: u64,
    pub percentage: f64,
}

/// Largest theme first; equal counts fall back to name order.
pub fn theme_slices(distribution: &ThemeDistribution) -> Vec<ThemeSlice<'_>> {
    let mut slices: Vec<ThemeSlice<'_>> = distribution
        .iter()
        .map(|(theme, share)| ThemeSlice {
            theme,
            count: share.count,
            percentage: share.percentage,
        })
        .collect();
    slices.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.theme.cmp(b.theme)));
    slices
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InsightCategory {
    #[default]
    Bugs,
    Balance,
    Features,
    Ux,
    Monetization,
}

impl InsightCategory {
    pub const ALL: [InsightCategory; 5] = [
        InsightCategory::Bugs,
        InsightCategory::Balance,
        InsightCategory::Features,
        InsightCategory::Ux,
        InsightCategory::Monetization,
    ];

    /// Key used by `/developer-insights`.
    pub fn key(&self) -> &'static str {
        match self {
            InsightCategory::Bugs => "bugs",
            InsightCategory::Balance => "balance",
            InsightCategory::Features => "features",
            InsightCategory::Ux => "ux",
            InsightCategory::Monetization => "monetization",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InsightCategory::Bugs => "Bug Reports",
            InsightCategory::Balance => "Balance Issues",
            InsightCategory::Features => "Feature Requests",
            InsightCategory::Ux => "User Experience",
            InsightCategory::Monetization => "Monetization",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            InsightCategory::Bugs => "Technical issues reported by users",
            InsightCategory::Balance => "Comments about game balance and fairness",
            InsightCategory::Features => "Suggestions for new content and gameplay mechanics",
            InsightCategory::Ux => "Interface and performance feedback",
            InsightCategory::Monetization => "Feedback about pricing, purchases, and value",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|category| category.key() == value)
    }

    pub fn items<'a>(&self, insights: &'a DeveloperInsights) -> &'a [InsightItem] {
        insights.get(self.key()).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub fn insight_counts(insights: &DeveloperInsights) -> Vec<(InsightCategory, usize)> {
    InsightCategory::ALL
        .into_iter()
        .map(|category| (category, category.items(insights).len()))
        .collect()
}

/// One-paragraph text rendering of the dashboard, used by the headless
/// session.
pub fn render_summary(state: &DashboardState) -> String {
    let params = state.params();
    let mut out = String::new();

    let phase = match state.phase() {
        ControllerPhase::Uninitialized => "starting",
        ControllerPhase::CheckingStatus => "checking backend status",
        ControllerPhase::NotReady => "waiting for data",
        ControllerPhase::Ready(ReadyPhase::Idle) => "ready",
        ControllerPhase::Ready(ReadyPhase::Loading) => "loading",
        ControllerPhase::Ready(ReadyPhase::Error) => "error",
    };
    let _ = write!(
        out,
        "[{}] {} / {}",
        phase,
        params.data_source.label(),
        params.time_period.label()
    );

    if let Some(error) = state.error() {
        let _ = write!(out, " | {}", error.user_friendly_message());
    }

    if let Some(committed) = state.snapshot() {
        let _ = write!(
            out,
            " | snapshot #{} at {}: {}",
            committed.sequence,
            committed.committed_at.format("%H:%M:%S"),
            describe_snapshot(&committed.data)
        );
    }

    out
}

fn describe_snapshot(snapshot: &DashboardSnapshot) -> String {
    let mut parts = Vec::new();

    match snapshot.trending_topics.first() {
        Some(top) => parts.push(format!(
            "{} trending topics (top: {} with {})",
            snapshot.trending_topics.len(),
            top.theme,
            top.count
        )),
        None => parts.push("no trending topics".to_string()),
    }

    if let Some(latest) = snapshot.sentiment_series.last() {
        parts.push(format!(
            "latest sentiment {:.2} ({})",
            latest.sentiment,
            SentimentBand::from_score(latest.sentiment).label()
        ));
    }

    parts.push(format!("{} top comments", snapshot.top_comments.len()));

    if let Some(largest) = theme_slices(&snapshot.theme_distribution).first() {
        parts.push(format!(
            "largest theme {} ({:.1}%)",
            largest.theme, largest.percentage
        ));
    }

    let insights: usize = insight_counts(&snapshot.developer_insights)
        .iter()
        .map(|(_, count)| count)
        .sum();
    parts.push(format!("{} developer insights", insights));

    if !snapshot.wordcloud.image.is_empty() {
        parts.push("wordcloud ready".to_string());
    }

    parts.join(", ")
}
