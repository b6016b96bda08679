use dashboard::ControllerEvent;
use dashboard::SentimentBand;
use gamepulse_core::{CommentAnalysis, DataSource, LoadRequest, TimePeriod};

pub const USAGE: &str =
    "commands: status | refresh | period <hour|day|week> | source <reddit|youtube|app_store> | load <posts> <comments> <analysis> | analyze <text> | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Event(ControllerEvent),
    /// Free text sent to `POST /analyze-comment`.
    Analyze(String),
    Quit,
}

/// Parses one line typed into the headless session.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(USAGE.to_string());
    };
    if verb.eq_ignore_ascii_case("analyze") {
        let text = line.trim_start()[verb.len()..].trim();
        if text.is_empty() {
            return Err(USAGE.to_string());
        }
        return Ok(Command::Analyze(text.to_string()));
    }
    let args: Vec<&str> = words.collect();

    match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("quit" | "exit", []) => Ok(Command::Quit),
        ("status", []) => Ok(Command::Event(ControllerEvent::CheckStatus)),
        ("refresh", []) => Ok(Command::Event(ControllerEvent::Refresh)),
        ("period", [value]) => TimePeriod::parse(value)
            .map(|period| Command::Event(ControllerEvent::SetTimePeriod(period)))
            .ok_or_else(|| format!("unknown time period '{value}'")),
        ("source", [value]) => DataSource::parse(value)
            .map(|source| Command::Event(ControllerEvent::SetDataSource(source)))
            .ok_or_else(|| format!("unknown data source '{value}'")),
        ("load", [posts, comments, analysis]) => Ok(Command::Event(ControllerEvent::Load(
            LoadRequest::new(*posts, *comments, *analysis),
        ))),
        _ => Err(USAGE.to_string()),
    }
}

pub fn describe_analysis(analysis: &CommentAnalysis) -> String {
    let themes = if analysis.themes.is_empty() {
        "none".to_string()
    } else {
        analysis.themes.join(", ")
    };
    format!(
        "{} ({:.2}, {}) | themes: {} | {}",
        analysis.sentiment,
        analysis.sentiment_score,
        SentimentBand::from_score(analysis.sentiment_score).label(),
        themes,
        analysis.summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
        assert_eq!(
            parse_command("  Refresh "),
            Ok(Command::Event(ControllerEvent::Refresh))
        );
        assert_eq!(
            parse_command("period week"),
            Ok(Command::Event(ControllerEvent::SetTimePeriod(TimePeriod::Week)))
        );
        assert_eq!(
            parse_command("source youtube"),
            Ok(Command::Event(ControllerEvent::SetDataSource(DataSource::YouTube)))
        );
        assert_eq!(
            parse_command("load posts.json comments.json analysis.json"),
            Ok(Command::Event(ControllerEvent::Load(LoadRequest::new(
                "posts.json",
                "comments.json",
                "analysis.json"
            ))))
        );
    }

    #[test]
    fn test_parse_analyze_keeps_full_text() {
        assert_eq!(
            parse_command("analyze  The new  patch is great"),
            Ok(Command::Analyze("The new  patch is great".to_string()))
        );
        assert!(parse_command("analyze   ").is_err());
    }

    #[test]
    fn test_describe_analysis() {
        let analysis = CommentAnalysis {
            sentiment: "positive".to_string(),
            sentiment_score: 0.72,
            themes: vec!["graphics".to_string(), "balance".to_string()],
            summary: "Likes the patch".to_string(),
        };
        assert_eq!(
            describe_analysis(&analysis),
            "positive (0.72, Very positive) | themes: graphics, balance | Likes the patch"
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_command("").is_err());
        assert!(parse_command("period fortnight").unwrap_err().contains("fortnight"));
        assert!(parse_command("load only-one.json").is_err());
        assert!(parse_command("dance").is_err());
    }
}
