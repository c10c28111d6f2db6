//! Conversation data models: messages, birth details, topics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: format!("msg-{}", Uuid::new_v4().simple()),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Birth-details keys the flow knows about. Other keys are carried opaquely.
pub mod fields {
    pub const DATE: &str = "date";
    pub const TIME: &str = "time";
    pub const PLACE: &str = "place";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
}

/// Minimum keys for birth details to count as collected mid-conversation.
pub const COLLECTED_THRESHOLD: usize = 2;

/// Minimum keys for birth details supplied upfront at conversation start.
pub const UPFRONT_THRESHOLD: usize = 3;

/// Accumulated birth details: field name → value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BirthDetails(BTreeMap<String, String>);

impl BirthDetails {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn date(&self) -> Option<&str> {
        self.get(fields::DATE)
    }

    pub fn time(&self) -> Option<&str> {
        self.get(fields::TIME)
    }

    pub fn place(&self) -> Option<&str> {
        self.get(fields::PLACE)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge `other` into `self`; values in `other` win for shared keys.
    pub fn merge(&mut self, other: &BirthDetails) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Whether enough fields are present to move past the birth-details stage.
    pub fn is_collected(&self) -> bool {
        self.len() >= COLLECTED_THRESHOLD
    }

    /// Build from a loosely typed JSON object (e.g. a profile payload).
    ///
    /// Strings are kept, numbers and booleans are stringified, null and blank
    /// values are dropped.
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut details = Self::new();
        for (key, value) in object {
            let text = match value {
                serde_json::Value::String(s) => s.trim().to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            if !text.is_empty() {
                details.insert(key.clone(), text);
            }
        }
        details
    }
}

/// Preset advice categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Job,
    Marriage,
    Finance,
}

impl Topic {
    /// All topics in display order.
    pub const ALL: [Topic; 3] = [Topic::Job, Topic::Marriage, Topic::Finance];

    /// The synthetic user message sent when the topic is picked.
    pub fn request_phrase(&self) -> &'static str {
        match self {
            Self::Job => "I'd like advice about my career and professional life.",
            Self::Marriage => "I'd like advice about my marriage and relationships.",
            Self::Finance => "I'd like advice about my financial situation and wealth.",
        }
    }

    /// Button label for the rendering layer.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Job => "Career & Job",
            Self::Marriage => "Marriage & Relationships",
            Self::Finance => "Finance & Wealth",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Job => write!(f, "job"),
            Self::Marriage => write!(f, "marriage"),
            Self::Finance => write!(f, "finance"),
        }
    }
}

impl std::str::FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "job" | "career" => Ok(Self::Job),
            "marriage" | "relationships" => Ok(Self::Marriage),
            "finance" | "wealth" => Ok(Self::Finance),
            other => Err(format!("Unknown topic: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_are_unique() {
        let a = Message::user("hello");
        let b = Message::user("hello");
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("msg-"));
        assert_eq!(a.role, Role::User);
    }

    #[test]
    fn message_timestamp_serializes_iso8601() {
        let msg = Message::assistant("Namaste");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        let ts = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok(), "not RFC 3339: {ts}");
    }

    #[test]
    fn merge_overwrites_and_keeps_other_keys() {
        let mut details = BirthDetails::new()
            .with(fields::DATE, "01/01/1990")
            .with(fields::PLACE, "Pune");
        let newer = BirthDetails::new()
            .with(fields::DATE, "15/08/1990")
            .with(fields::TIME, "14:30");
        details.merge(&newer);

        assert_eq!(details.date(), Some("15/08/1990"));
        assert_eq!(details.time(), Some("14:30"));
        assert_eq!(details.place(), Some("Pune"));
        assert_eq!(details.len(), 3);
    }

    #[test]
    fn merge_is_idempotent() {
        let extracted = BirthDetails::new()
            .with(fields::DATE, "15/08/1990")
            .with(fields::TIME, "14:30");
        let mut details = BirthDetails::new().with(fields::PLACE, "Mumbai");
        details.merge(&extracted);
        let once = details.clone();
        details.merge(&extracted);
        assert_eq!(details, once);
    }

    #[test]
    fn collected_threshold() {
        let one = BirthDetails::new().with(fields::DATE, "15/08/1990");
        assert!(!one.is_collected());
        let two = one.with(fields::TIME, "14:30");
        assert!(two.is_collected());
    }

    #[test]
    fn from_json_object_stringifies_and_drops_blanks() {
        let json = serde_json::json!({
            "date": "1990-08-15",
            "time": "",
            "place": "Mumbai",
            "latitude": 19.076,
            "longitude": null
        });
        let details = BirthDetails::from_json_object(json.as_object().unwrap());
        assert_eq!(details.date(), Some("1990-08-15"));
        assert_eq!(details.get(fields::LATITUDE), Some("19.076"));
        assert!(details.time().is_none());
        assert!(details.get(fields::LONGITUDE).is_none());
        assert_eq!(details.len(), 3);
    }

    #[test]
    fn birth_details_serialize_as_flat_object() {
        let details = BirthDetails::new().with("date", "15/08/1990");
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json, serde_json::json!({"date": "15/08/1990"}));
    }

    #[test]
    fn topic_display_matches_serde() {
        for topic in Topic::ALL {
            let json = serde_json::to_string(&topic).unwrap();
            assert_eq!(format!("\"{topic}\""), json);
        }
    }

    #[test]
    fn topic_from_str_accepts_aliases() {
        assert_eq!("Career".parse::<Topic>().unwrap(), Topic::Job);
        assert_eq!("marriage".parse::<Topic>().unwrap(), Topic::Marriage);
        assert_eq!(" wealth ".parse::<Topic>().unwrap(), Topic::Finance);
        assert!("health".parse::<Topic>().is_err());
    }
}
