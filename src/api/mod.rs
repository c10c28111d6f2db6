//! Consultation backend client.
//!
//! The `ChatBackend` trait is the seam between the conversation controller
//! and the HTTP API, so the flow can run against a stub in tests.

pub mod http;
pub mod types;

pub use http::HttpBackend;
pub use types::*;

use async_trait::async_trait;

use crate::conversation::BirthDetails;
use crate::error::ApiError;
use crate::session::Credentials;

/// Operations the consultation backend provides.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Open a conversation on the authenticated endpoint.
    async fn start_conversation(
        &self,
        credentials: &Credentials,
        birth_details: &BirthDetails,
    ) -> Result<StartResponse, ApiError>;

    /// Unified query: chart analysis, topic advice and free-form questions.
    async fn query(
        &self,
        credentials: &Credentials,
        request: &QueryRequest,
    ) -> Result<QueryResponse, ApiError>;

    /// Stored messages of one conversation.
    async fn history(
        &self,
        credentials: &Credentials,
        conversation_id: &str,
    ) -> Result<HistoryResponse, ApiError>;

    /// The user's conversations, most recently updated first.
    async fn conversations(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<ConversationSummary>, ApiError>;

    async fn load_profile(&self, credentials: &Credentials) -> Result<Profile, ApiError>;

    async fn update_profile(
        &self,
        credentials: &Credentials,
        update: &ProfileUpdate,
    ) -> Result<(), ApiError>;
}
