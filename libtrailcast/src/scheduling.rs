//! Fire-time parsing for schedule entries
//!
//! Accepts relative durations ("30m", "2h"), natural language
//! ("tomorrow", "next friday 9am") and the literal "now".

use chrono::{DateTime, Duration, Utc};

use crate::error::{Result, TrailcastError};

/// Parse a fire-time string into a UTC timestamp
pub fn parse_fire_time(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if input.is_empty() {
        return Err(TrailcastError::InvalidInput(
            "Fire time cannot be empty".to_string(),
        ));
    }

    if input.eq_ignore_ascii_case("now") {
        return Ok(Utc::now());
    }

    if let Ok(duration) = parse_duration(input) {
        return Ok(Utc::now() + duration);
    }

    if let Ok(dt) = parse_natural_language(input) {
        return Ok(dt);
    }

    Err(TrailcastError::InvalidInput(format!(
        "Could not parse fire time: {}",
        input
    )))
}

fn parse_duration(input: &str) -> Result<Duration> {
    if let Ok(std_duration) = humantime::parse_duration(input) {
        let seconds = std_duration.as_secs() as i64;
        return Duration::try_seconds(seconds)
            .ok_or_else(|| TrailcastError::InvalidInput("Duration out of range".to_string()));
    }

    Err(TrailcastError::InvalidInput(format!(
        "Could not parse duration: {}",
        input
    )))
}

fn parse_natural_language(input: &str) -> Result<DateTime<Utc>> {
    chrono_english::parse_date_string(input, Utc::now(), chrono_english::Dialect::Us)
        .map_err(|e| TrailcastError::InvalidInput(format!("Could not parse time: {}", e)))
}

/// Render a Unix timestamp for CLI output
pub fn format_fire_time(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_now() {
        let parsed = parse_fire_time("now").unwrap();
        let diff = (Utc::now() - parsed).num_seconds().abs();
        assert!(diff <= 2, "Expected roughly now, got {}s away", diff);
    }

    #[test]
    fn test_parse_duration_minutes() {
        let parsed = parse_fire_time("30m").unwrap();
        let diff = (parsed - Utc::now()).num_minutes();
        assert!(
            (29..=31).contains(&diff),
            "Expected ~30 minutes, got {}",
            diff
        );
    }

    #[test]
    fn test_parse_duration_hours() {
        let parsed = parse_fire_time("2h").unwrap();
        let diff = (parsed - Utc::now()).num_minutes();
        assert!(
            (119..=121).contains(&diff),
            "Expected ~120 minutes, got {}",
            diff
        );
    }

    #[test]
    fn test_parse_duration_with_space() {
        let parsed = parse_fire_time("1 hour").unwrap();
        let diff = (parsed - Utc::now()).num_minutes();
        assert!((59..=61).contains(&diff), "Expected ~60 minutes, got {}", diff);
    }

    #[test]
    fn test_parse_tomorrow() {
        let parsed = parse_fire_time("tomorrow").unwrap();
        let diff = (parsed - Utc::now()).num_hours();
        assert!((20..=28).contains(&diff), "Expected ~24 hours, got {}", diff);
    }

    #[test]
    fn test_parse_empty_string() {
        assert!(parse_fire_time("").is_err());
        assert!(parse_fire_time("   ").is_err());
    }

    #[test]
    fn test_parse_invalid_format() {
        let result = parse_fire_time("not a time");
        assert!(matches!(result, Err(TrailcastError::InvalidInput(_))));
    }

    #[test]
    fn test_format_fire_time() {
        assert_eq!(format_fire_time(0), "1970-01-01 00:00:00 UTC");
    }
}
