// ── Topic filters ──
//
// MQTT-style patterns: segments are separated by '/', '+' matches exactly
// one segment, '#' (only as the last segment) matches any remainder,
// including nothing.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    SingleLevel,
    MultiLevel,
}

/// A validated subscription pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter {
    raw: String,
    segments: Vec<Segment>,
}

impl TopicFilter {
    pub fn new(filter: impl Into<String>) -> Result<Self, Error> {
        let raw = filter.into();
        let invalid = |reason: &str| Error::InvalidTopicFilter {
            filter: raw.clone(),
            reason: reason.to_owned(),
        };

        if raw.is_empty() {
            return Err(invalid("filter is empty"));
        }

        let parts: Vec<&str> = raw.split('/').collect();
        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());

        for (i, part) in parts.iter().enumerate() {
            let segment = match *part {
                "+" => Segment::SingleLevel,
                "#" if i == last => Segment::MultiLevel,
                "#" => return Err(invalid("'#' is only allowed as the last segment")),
                p if p.contains('+') || p.contains('#') => {
                    return Err(invalid("wildcards must occupy a whole segment"));
                }
                p => Segment::Literal(p.to_owned()),
            };
            segments.push(segment);
        }

        Ok(Self { raw, segments })
    }

    /// The filter exactly as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Test a concrete topic name against this filter.
    pub fn matches(&self, topic: &str) -> bool {
        let mut levels = topic.split('/');

        for segment in &self.segments {
            match segment {
                Segment::MultiLevel => return true,
                Segment::SingleLevel => {
                    if levels.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(literal) => match levels.next() {
                    Some(level) if level == literal => {}
                    _ => return false,
                },
            }
        }

        levels.next().is_none()
    }
}

impl FromStr for TopicFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn filter(s: &str) -> TopicFilter {
        TopicFilter::new(s).unwrap()
    }

    #[test]
    fn literal_filter_matches_only_itself() {
        let f = filter("pitu/router/telemetry");
        assert!(f.matches("pitu/router/telemetry"));
        assert!(!f.matches("pitu/router"));
        assert!(!f.matches("pitu/router/telemetry/extra"));
    }

    #[test]
    fn single_level_wildcard_matches_one_segment() {
        let f = filter("$aws/things/pitu-caleya/shadow/name/+/update/accepted");
        assert!(f.matches("$aws/things/pitu-caleya/shadow/name/net-lte/update/accepted"));
        assert!(f.matches("$aws/things/pitu-caleya/shadow/name/victron-battery/update/accepted"));
        assert!(!f.matches("$aws/things/pitu-caleya/shadow/name/update/accepted"));
        assert!(!f.matches("$aws/things/pitu-caleya/shadow/name/a/b/update/accepted"));
        assert!(!f.matches("$aws/things/other/shadow/name/net-lte/update/accepted"));
    }

    #[test]
    fn multi_level_wildcard_matches_remainder() {
        let f = filter("pitu/#");
        assert!(f.matches("pitu/router/telemetry"));
        assert!(f.matches("pitu/ui"));
        assert!(f.matches("pitu"));
        assert!(!f.matches("other/router"));
    }

    #[test]
    fn empty_segment_is_a_literal() {
        let f = filter("a//b");
        assert!(f.matches("a//b"));
        assert!(!f.matches("a/x/b"));
    }

    #[test]
    fn rejects_misplaced_wildcards() {
        assert!(TopicFilter::new("").is_err());
        assert!(TopicFilter::new("a/#/b").is_err());
        assert!(TopicFilter::new("a/b+").is_err());
        assert!(TopicFilter::new("a/#x").is_err());
    }

    #[test]
    fn parses_from_str() {
        let f: TopicFilter = "a/+/c".parse().unwrap();
        assert_eq!(f.to_string(), "a/+/c");
        assert_eq!(f.as_str(), "a/+/c");
    }
}
