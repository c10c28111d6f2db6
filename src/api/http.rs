//! HTTP implementation of `ChatBackend` over reqwest.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::types::{
    ConversationSummary, ConversationsResponse, ErrorBody, HistoryResponse, Profile,
    ProfileUpdate, QueryRequest, QueryResponse, StartRequest, StartResponse, endpoints,
};
use super::ChatBackend;
use crate::config::ClientConfig;
use crate::conversation::BirthDetails;
use crate::error::{ApiError, ConfigError};
use crate::session::Credentials;

/// JSON-over-HTTP client for the consultation backend.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, credentials: &Credentials) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .header(reqwest::header::ACCEPT, "application/json");
        match credentials.authorization() {
            Some(value) => builder.header(reqwest::header::AUTHORIZATION, value),
            None => builder,
        }
    }

    fn require_token(credentials: &Credentials, endpoint: &str) -> Result<(), ApiError> {
        if credentials.is_authenticated() {
            Ok(())
        } else {
            Err(ApiError::MissingToken {
                endpoint: endpoint.to_string(),
            })
        }
    }

    /// Send and return the raw body of a 2xx response.
    async fn dispatch(&self, endpoint: &str, builder: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = builder.send().await.map_err(|e| ApiError::Transport {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| ApiError::Transport {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_default();
            warn!(endpoint, status = status.as_u16(), error = %message, "Backend request failed");
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        debug!(endpoint, status = status.as_u16(), bytes = body.len(), "Backend request succeeded");
        Ok(body.to_vec())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = self.dispatch(endpoint, builder).await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::MalformedJson {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn start_conversation(
        &self,
        credentials: &Credentials,
        birth_details: &BirthDetails,
    ) -> Result<StartResponse, ApiError> {
        Self::require_token(credentials, endpoints::START)?;
        let body = StartRequest {
            birth_details: birth_details.clone(),
        };
        let builder = self
            .request(Method::POST, endpoints::START, credentials)
            .json(&body);
        self.send_json(endpoints::START, builder).await
    }

    async fn query(
        &self,
        credentials: &Credentials,
        request: &QueryRequest,
    ) -> Result<QueryResponse, ApiError> {
        let builder = self
            .request(Method::POST, endpoints::QUERY, credentials)
            .json(request);
        self.send_json(endpoints::QUERY, builder).await
    }

    async fn history(
        &self,
        credentials: &Credentials,
        conversation_id: &str,
    ) -> Result<HistoryResponse, ApiError> {
        Self::require_token(credentials, endpoints::HISTORY)?;
        let builder = self
            .request(Method::GET, endpoints::HISTORY, credentials)
            .query(&[("conversation_id", conversation_id)]);
        self.send_json(endpoints::HISTORY, builder).await
    }

    async fn conversations(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<ConversationSummary>, ApiError> {
        Self::require_token(credentials, endpoints::CONVERSATIONS)?;
        let builder = self.request(Method::GET, endpoints::CONVERSATIONS, credentials);
        let response: ConversationsResponse =
            self.send_json(endpoints::CONVERSATIONS, builder).await?;
        Ok(response.conversations)
    }

    async fn load_profile(&self, credentials: &Credentials) -> Result<Profile, ApiError> {
        Self::require_token(credentials, endpoints::PROFILE)?;
        let builder = self.request(Method::GET, endpoints::PROFILE, credentials);
        self.send_json(endpoints::PROFILE, builder).await
    }

    async fn update_profile(
        &self,
        credentials: &Credentials,
        update: &ProfileUpdate,
    ) -> Result<(), ApiError> {
        Self::require_token(credentials, endpoints::PROFILE)?;
        let builder = self
            .request(Method::PUT, endpoints::PROFILE, credentials)
            .json(update);
        self.dispatch(endpoints::PROFILE, builder).await?;
        Ok(())
    }
}
