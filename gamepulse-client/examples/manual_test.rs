use gamepulse_client::{DashboardApi, GamePulseApiClient};
use gamepulse_core::{DashboardResource, GamePulseConfig, TimePeriod};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    println!("=== GamePulse API Manual Test ===\n");

    let config = GamePulseConfig::load()?;
    let client = GamePulseApiClient::new(&config.api)?;
    println!("Backend: {}", client.base_url());

    // Step 1: Status
    println!("\n🧪 Step 1: Status");
    let status = match client.status().await {
        Ok(status) => status,
        Err(e) => {
            println!("❌ Status check failed: {}", e);
            println!("   Is the API server running at {}?", client.base_url());
            return Ok(());
        }
    };
    println!("✅ posts={} comments={} analysis={}", status.posts_loaded, status.comments_loaded, status.analysis_loaded);

    if !status.is_ready() {
        println!("\n💡 Backend has no data loaded yet. Set [load] in gamepulse.toml and start the dashboard.");
        return Ok(());
    }

    // Step 2: Each derived view, one at a time
    println!("\n🧪 Step 2: Derived views");
    for resource in DashboardResource::ALL {
        let outcome = match resource {
            DashboardResource::TrendingTopics => client.trending_topics().await.map(|v| format!("{} topics", v.len())),
            DashboardResource::SentimentOverTime => client
                .sentiment_over_time(TimePeriod::Day)
                .await
                .map(|v| format!("{} points", v.len())),
            DashboardResource::TopComments => client.top_comments().await.map(|v| format!("{} comments", v.len())),
            DashboardResource::ThemeDistribution => client.theme_distribution().await.map(|v| format!("{} themes", v.len())),
            DashboardResource::Wordcloud => client.wordcloud().await.map(|v| format!("{} bytes", v.image.len())),
            DashboardResource::DeveloperInsights => client
                .developer_insights()
                .await
                .map(|v| format!("{} categories", v.len())),
        };

        match outcome {
            Ok(summary) => println!("✅ {:<20} {}", resource, summary),
            Err(e) => println!("❌ {:<20} {}", resource, e),
        }
    }

    // Step 3: Metrics
    println!("\n🧪 Step 3: API Metrics");
    let metrics = client.get_metrics().await;
    println!("   Total requests: {}", metrics.total_requests);
    println!("   Failed requests: {}", metrics.failed_requests);
    println!("   Average response time: {:?}", metrics.average_response_time);

    Ok(())
}
