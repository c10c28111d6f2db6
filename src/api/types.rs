//! Request and response bodies for the consultation backend.

use serde::{Deserialize, Serialize};

use crate::conversation::{BirthDetails, Message, Role, Topic};

/// Backend paths.
pub mod endpoints {
    pub const START: &str = "/api/chat/start";
    pub const QUERY: &str = "/api/chat/query";
    pub const HISTORY: &str = "/api/chat/history";
    pub const CONVERSATIONS: &str = "/api/chat/conversations";
    pub const PROFILE: &str = "/api/user/profile";
}

/// Body of `POST /api/chat/start`.
#[derive(Debug, Clone, Serialize)]
pub struct StartRequest {
    pub birth_details: BirthDetails,
}

/// Response of `POST /api/chat/start`.
#[derive(Debug, Clone, Deserialize)]
pub struct StartResponse {
    pub conversation_id: String,
    #[serde(default)]
    pub initial_response: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
}

impl StartResponse {
    /// The backend's greeting, whichever field it used.
    pub fn greeting(&self) -> Option<&str> {
        self.initial_response
            .as_deref()
            .or(self.response.as_deref())
    }
}

/// One prior turn sent as conversation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Body of the unified `POST /api/chat/query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub conversation_history: Vec<HistoryEntry>,
    pub birth_details: BirthDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<Topic>,
}

impl QueryRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: None,
            conversation_history: Vec::new(),
            birth_details: BirthDetails::new(),
            topic: None,
        }
    }

    pub fn with_conversation_id(mut self, id: Option<String>) -> Self {
        self.conversation_id = id;
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.conversation_history = history;
        self
    }

    pub fn with_birth_details(mut self, details: BirthDetails) -> Self {
        self.birth_details = details;
        self
    }

    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.topic = Some(topic);
        self
    }
}

/// Response of the unified query endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// A message as stored by the backend. Timestamps are passed through as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

/// Response of `GET /api/chat/history`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub conversation_id: String,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

/// One row of `GET /api/chat/conversations`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub last_updated: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ConversationsResponse {
    #[serde(default)]
    pub conversations: Vec<ConversationSummary>,
}

/// Response of `GET /api/user/profile`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    birth_details: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Profile {
    /// Stored birth details with blank fields dropped.
    pub fn birth_details(&self) -> BirthDetails {
        self.birth_details
            .as_ref()
            .map(BirthDetails::from_json_object)
            .unwrap_or_default()
    }
}

/// Body of `PUT /api/user/profile`.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub birth_details: BirthDetails,
}

/// Error body on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_request_omits_absent_fields() {
        let request = QueryRequest::new("Start conversation");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["message"], "Start conversation");
        assert_eq!(json["conversation_history"], serde_json::json!([]));
        assert_eq!(json["birth_details"], serde_json::json!({}));
        assert!(json.get("conversation_id").is_none());
        assert!(json.get("topic").is_none());
    }

    #[test]
    fn query_request_carries_topic_tag() {
        let request = QueryRequest::new(Topic::Marriage.request_phrase())
            .with_conversation_id(Some("abc".into()))
            .with_topic(Topic::Marriage);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["topic"], "marriage");
        assert_eq!(json["conversation_id"], "abc");
    }

    #[test]
    fn history_entry_from_message() {
        let msg = Message::user("When will I marry?");
        let entry = HistoryEntry::from(&msg);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "When will I marry?"}));
    }

    #[test]
    fn start_response_greeting_prefers_initial_response() {
        let resp: StartResponse = serde_json::from_str(
            r#"{"success": true, "conversation_id": "c1", "initial_response": "Welcome"}"#,
        )
        .unwrap();
        assert_eq!(resp.greeting(), Some("Welcome"));

        let resp: StartResponse =
            serde_json::from_str(r#"{"conversation_id": "c1", "response": "Hi"}"#).unwrap();
        assert_eq!(resp.greeting(), Some("Hi"));
    }

    #[test]
    fn profile_with_numeric_coordinates() {
        let profile: Profile = serde_json::from_str(
            r#"{
                "name": "Asha",
                "email": "asha@example.com",
                "birth_details": {"date": "1990-08-15", "time": "14:30", "place": "Mumbai", "latitude": 19.07, "longitude": 72.87}
            }"#,
        )
        .unwrap();
        let details = profile.birth_details();
        assert_eq!(details.len(), 5);
        assert_eq!(details.get("longitude"), Some("72.87"));
    }

    #[test]
    fn profile_without_birth_details() {
        let profile: Profile = serde_json::from_str(r#"{"name": "Asha", "birth_details": null}"#).unwrap();
        assert!(profile.birth_details().is_empty());
        assert!(profile.email.is_empty());
    }
}
