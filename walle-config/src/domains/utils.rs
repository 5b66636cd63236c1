//! Shared helpers for the configuration domains

use std::time::Duration;

/// Parse `30`, `30s`, `1m 30s` or `500ms`; a bare number is seconds
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }
    humantime::parse_duration(value).map_err(|e| format!("'{}': {}", value, e))
}

/// Durations written as humantime strings, read from strings or whole seconds
pub mod serde_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Seconds(seconds) => Ok(Duration::from_secs(seconds)),
            Raw::Text(text) => super::parse_duration(&text).map_err(serde::de::Error::custom),
        }
    }
}

/// Prefix a bare `host:port` with `http://`
pub fn normalize_host(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("localhost:3000"), "http://localhost:3000");
        assert_eq!(normalize_host("http://localhost:3000/"), "http://localhost:3000");
        assert_eq!(normalize_host("https://api.walle.dev"), "https://api.walle.dev");
    }

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration(" 2m ").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert!(parse_duration("soon").is_err());
    }

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Holder {
        #[serde(with = "serde_duration")]
        timeout: Duration,
    }

    #[test]
    fn test_serde_duration_accepts_seconds_and_text() {
        let numeric: Holder = serde_yaml::from_str("timeout: 15").unwrap();
        assert_eq!(numeric.timeout, Duration::from_secs(15));

        let text: Holder = serde_yaml::from_str("timeout: 1m 30s").unwrap();
        assert_eq!(text.timeout, Duration::from_secs(90));

        let rendered = serde_yaml::to_string(&Holder {
            timeout: Duration::from_secs(600),
        })
        .unwrap();
        assert_eq!(rendered.trim(), "timeout: 10m");
    }
}
