//! Telemetry redaction.
//!
//! Router status documents carry credentials, message contents, and large
//! sections the UI never reads. A [`RedactionRuleSet`] removes a fixed list
//! of dot-separated paths from a JSON object before it is reported into a
//! shadow. Removal is idempotent and tolerates absent paths.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::CoreError;

/// Paths removed from router telemetry before it is reported.
pub const ROUTER_TELEMETRY_REDACTIONS: &[&str] = &[
    "accesscontrol",
    "cradle",
    "custom",
    "eventlog",
    "failover",
    "general.supportedLangList",
    "lcd",
    "led",
    "mediaserver",
    "ready",
    "router",
    "session",
    "sim.end",
    "sim.mep",
    "sim.pin",
    "sim.puk",
    "sim.SPN",
    "sim.sprintSimLock",
    "sms.end",
    "sms.msgs",
    "sms.sendMsg",
    "sms.trans",
    "ui",
    "webd",
    "wifi.aux",
    "wwan.dataUsage",
];

// ── RedactionPath ────────────────────────────────────────────────────

/// A non-empty sequence of object keys, written `a.b.c`.
///
/// Keys are matched case-sensitively. The last key names the field to
/// delete; the keys before it locate the object that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RedactionPath {
    segments: Vec<String>,
}

impl RedactionPath {
    pub fn new(path: &str) -> Result<Self, CoreError> {
        if path.is_empty() {
            return Err(CoreError::Config {
                message: "redaction path must not be empty".into(),
            });
        }
        let segments: Vec<String> = path.split('.').map(str::to_owned).collect();
        if segments.iter().any(String::is_empty) {
            return Err(CoreError::Config {
                message: format!("redaction path '{path}' has an empty segment"),
            });
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Delete the field this path names, if it exists. Intermediate
    /// values that are missing or not objects end the walk silently.
    ///
    /// A parent object left empty by the removal is removed as well, so
    /// redacting every key of a section drops the section.
    pub fn remove_from(&self, value: &mut Value) -> Option<Value> {
        remove_segments(value, &self.segments)
    }
}

impl FromStr for RedactionPath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for RedactionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

// ── RedactionRuleSet ─────────────────────────────────────────────────

/// An ordered set of paths to strip from telemetry objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedactionRuleSet {
    paths: Vec<RedactionPath>,
}

impl RedactionRuleSet {
    pub fn new(paths: Vec<RedactionPath>) -> Self {
        Self { paths }
    }

    /// Parse every entry of `paths`, failing on the first invalid one.
    pub fn from_paths<S: AsRef<str>>(paths: &[S]) -> Result<Self, CoreError> {
        paths
            .iter()
            .map(|p| RedactionPath::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// The built-in rule set for router status telemetry.
    pub fn router_telemetry() -> Self {
        let paths = ROUTER_TELEMETRY_REDACTIONS
            .iter()
            .map(|p| RedactionPath {
                segments: p.split('.').map(str::to_owned).collect(),
            })
            .collect();
        Self { paths }
    }

    pub fn paths(&self) -> &[RedactionPath] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Apply every path in place. Returns how many fields were removed.
    pub fn apply(&self, value: &mut Value) -> usize {
        self.paths
            .iter()
            .filter(|path| path.remove_from(value).is_some())
            .count()
    }

    /// Return a redacted copy of a telemetry object.
    ///
    /// Non-object inputs are rejected with `MalformedInput`.
    pub fn sanitize(&self, raw: &Value) -> Result<Value, CoreError> {
        if !raw.is_object() {
            return Err(CoreError::MalformedInput {
                reason: format!("expected a JSON object, got {}", json_kind(raw)),
            });
        }
        let mut sanitized = raw.clone();
        self.apply(&mut sanitized);
        Ok(sanitized)
    }

    /// Parse raw bytes as JSON and sanitize the result.
    pub fn sanitize_bytes(&self, raw: &[u8]) -> Result<Value, CoreError> {
        let value: Value = serde_json::from_slice(raw).map_err(|e| CoreError::MalformedInput {
            reason: e.to_string(),
        })?;
        self.sanitize(&value)
    }
}

fn remove_segments(node: &mut Value, segments: &[String]) -> Option<Value> {
    let (key, rest) = segments.split_first()?;
    let object = node.as_object_mut()?;
    if rest.is_empty() {
        return object.remove(key);
    }

    let child = object.get_mut(key)?;
    let removed = remove_segments(child, rest)?;
    if child.as_object().is_some_and(serde_json::Map::is_empty) {
        object.remove(key);
    }
    Some(removed)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn removes_nested_and_top_level_paths() {
        let raw = json!({
            "sim": { "pin": { "state": "Disabled" }, "status": "Ready" },
            "wwan": { "connection": "Connected", "dataUsage": { "total": 5 } },
            "session": { "secToken": "abc" },
        });
        let clean = RedactionRuleSet::router_telemetry().sanitize(&raw).unwrap();
        assert_eq!(
            clean,
            json!({
                "sim": { "status": "Ready" },
                "wwan": { "connection": "Connected" },
            })
        );
    }

    #[test]
    fn drops_sections_emptied_by_redaction() {
        let raw = json!({
            "sim": { "pin": "1234", "puk": "0000" },
            "wwan": { "signal": -70 },
        });
        let clean = RedactionRuleSet::router_telemetry().sanitize(&raw).unwrap();
        assert_eq!(clean, json!({ "wwan": { "signal": -70 } }));
    }

    #[test]
    fn keeps_sections_that_arrived_empty() {
        let raw = json!({ "sim": {}, "wwan": { "signal": -70 } });
        let clean = RedactionRuleSet::router_telemetry().sanitize(&raw).unwrap();
        assert_eq!(clean, raw);
    }

    #[test]
    fn absent_parent_is_a_no_op() {
        let rules = RedactionRuleSet::from_paths(&["sim.pin"]).unwrap();
        let raw = json!({ "wwan": { "connection": "Connected" } });
        assert_eq!(rules.sanitize(&raw).unwrap(), raw);
    }

    #[test]
    fn non_object_parent_is_a_no_op() {
        let rules = RedactionRuleSet::from_paths(&["sim.pin"]).unwrap();
        let raw = json!({ "sim": "missing" });
        assert_eq!(rules.sanitize(&raw).unwrap(), raw);
    }

    #[test]
    fn sanitize_is_idempotent() {
        let rules = RedactionRuleSet::router_telemetry();
        let raw = json!({
            "general": { "supportedLangList": ["en"], "model": "MR1100" },
            "sms": { "msgs": [1, 2], "unread": 0 },
            "ui": {},
        });
        let once = rules.sanitize(&raw).unwrap();
        let twice = rules.sanitize(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(
            once,
            json!({ "general": { "model": "MR1100" }, "sms": { "unread": 0 } })
        );
    }

    #[test]
    fn keys_match_case_sensitively() {
        let rules = RedactionRuleSet::router_telemetry();
        let raw = json!({ "sim": { "SPN": "carrier", "spn": "kept" } });
        assert_eq!(
            rules.sanitize(&raw).unwrap(),
            json!({ "sim": { "spn": "kept" } })
        );
    }

    #[test]
    fn apply_counts_removed_fields() {
        let rules = RedactionRuleSet::from_paths(&["a", "b.c", "missing.x"]).unwrap();
        let mut value = json!({ "a": 1, "b": { "c": 2, "d": 3 } });
        assert_eq!(rules.apply(&mut value), 2);
        assert_eq!(value, json!({ "b": { "d": 3 } }));
    }

    #[test]
    fn rejects_non_object_input() {
        let rules = RedactionRuleSet::router_telemetry();
        let err = rules.sanitize(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, CoreError::MalformedInput { .. }));

        let err = rules.sanitize_bytes(b"not json").unwrap_err();
        assert!(matches!(err, CoreError::MalformedInput { .. }));
    }

    #[test]
    fn rejects_empty_paths() {
        assert!(RedactionPath::new("").is_err());
        assert!(RedactionPath::new("sim..pin").is_err());
        assert_eq!(RedactionPath::new("sim.pin").unwrap().to_string(), "sim.pin");
    }

    #[test]
    fn router_rule_set_has_every_path() {
        let rules = RedactionRuleSet::router_telemetry();
        assert_eq!(rules.len(), ROUTER_TELEMETRY_REDACTIONS.len());
        assert_eq!(rules.paths()[5].segments(), ["general", "supportedLangList"]);
    }
}
