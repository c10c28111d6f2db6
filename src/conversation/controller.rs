//! ConversationController drives the consultation stages, mediates backend
//! requests, and publishes every observable state change.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::api::{ChatBackend, HistoryEntry, QueryRequest};
use crate::config::FlowDelays;
use crate::error::{ApiError, ConversationError};
use crate::session::Credentials;

use super::continuation::Continuations;
use super::extract::extract_birth_details;
use super::fallback::fallback_reply;
use super::model::{BirthDetails, Message, Topic, UPFRONT_THRESHOLD};
use super::prompts;
use super::stage::ConversationStage;

/// Default broadcast channel capacity.
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Prefixes of conversation ids minted locally rather than by the backend.
const LOCAL_SESSION_PREFIX: &str = "session-";
const LOCAL_MOCK_PREFIX: &str = "mock-conversation-";

/// State changes published to the rendering layer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerEvent {
    /// A message was appended to the history.
    MessageAppended { message: Message },
    /// The message history was emptied.
    HistoryCleared,
    /// The conversation moved to a new stage.
    StageChanged {
        from: ConversationStage,
        to: ConversationStage,
    },
    /// Topic choices are on offer.
    TopicsShown { topics: Vec<Topic> },
    /// Topic choices were withdrawn.
    TopicsHidden,
    /// A request started or finished.
    Loading { active: bool },
    /// Error banner raised.
    Error { message: String },
    /// Error banner dismissed.
    ErrorCleared,
}

/// Read-only copy of the session for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub stage: ConversationStage,
    pub messages: Vec<Message>,
    pub birth_details: BirthDetails,
    pub birth_details_collected: bool,
    pub conversation_id: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    /// Topic choices currently on offer; empty when hidden.
    pub topics: Vec<Topic>,
}

/// Mutable session state. Only touched under the controller's lock.
#[derive(Debug, Default)]
struct Session {
    /// Bumped on every reset; in-flight work compares against it.
    epoch: u64,
    stage: ConversationStage,
    messages: Vec<Message>,
    birth_details: BirthDetails,
    birth_details_collected: bool,
    conversation_id: Option<String>,
    loading: bool,
    error: Option<String>,
    topics_visible: bool,
}

impl Session {
    fn history(&self) -> Vec<HistoryEntry> {
        self.messages.iter().map(HistoryEntry::from).collect()
    }

    fn has_local_conversation_id(&self) -> bool {
        self.conversation_id
            .as_deref()
            .is_some_and(is_local_conversation_id)
    }
}

fn is_local_conversation_id(id: &str) -> bool {
    id.starts_with(LOCAL_SESSION_PREFIX) || id.starts_with(LOCAL_MOCK_PREFIX)
}

/// Owns one consultation session and drives it through its stages.
pub struct ConversationController {
    backend: Arc<dyn ChatBackend>,
    credentials: Credentials,
    delays: FlowDelays,
    state: RwLock<Session>,
    continuations: Continuations,
    events: broadcast::Sender<ControllerEvent>,
}

impl ConversationController {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        credentials: Credentials,
        delays: FlowDelays,
    ) -> Arc<Self> {
        let (events, _rx) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Arc::new(Self {
            backend,
            credentials,
            delays,
            state: RwLock::new(Session::default()),
            continuations: Continuations::new(),
            events,
        })
    }

    /// Subscribe to state-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let s = self.state.read().await;
        SessionSnapshot {
            stage: s.stage,
            messages: s.messages.clone(),
            birth_details: s.birth_details.clone(),
            birth_details_collected: s.birth_details_collected,
            conversation_id: s.conversation_id.clone(),
            loading: s.loading,
            error: s.error.clone(),
            topics: if s.topics_visible {
                Topic::ALL.to_vec()
            } else {
                Vec::new()
            },
        }
    }

    pub async fn stage(&self) -> ConversationStage {
        self.state.read().await.stage
    }

    // ── Actions ─────────────────────────────────────────────────────────

    /// Open a conversation and show the welcome message.
    ///
    /// Birth details supplied here replace the accumulated set and count as
    /// collected once they carry at least three fields.
    pub async fn start(&self, birth_details: Option<BirthDetails>) {
        let (epoch, details) = {
            let mut s = self.state.write().await;
            if s.loading {
                debug!("Request in flight, not starting another conversation");
                return;
            }
            self.set_loading(&mut s, true);
            self.clear_error(&mut s);
            self.force_stage(&mut s, ConversationStage::Introduction);
            self.set_topics_visible(&mut s, false);
            s.birth_details_collected = false;
            if let Some(details) = birth_details {
                s.birth_details_collected = details.len() >= UPFRONT_THRESHOLD;
                s.birth_details = details;
            }
            (s.epoch, s.birth_details.clone())
        };

        let opened = self.open_conversation(&details).await;

        let mut s = self.state.write().await;
        if s.epoch != epoch {
            debug!("Discarding stale conversation start");
            return;
        }

        let welcome = match opened {
            Ok(id) => {
                info!(conversation_id = %id, "Conversation started");
                s.conversation_id = Some(id);
                prompts::WELCOME
            }
            Err(e) => {
                warn!("Failed to start conversation: {}", e);
                self.raise_error(&mut s, e.banner_text());
                s.conversation_id = Some(format!(
                    "{LOCAL_MOCK_PREFIX}{}",
                    Utc::now().timestamp_millis()
                ));
                prompts::OFFLINE_WELCOME
            }
        };

        self.clear_history(&mut s);
        self.append(&mut s, Message::assistant(welcome));
        self.set_loading(&mut s, false);
    }

    /// Load the profile and start with its birth details, if any.
    pub async fn start_from_profile(&self) {
        let details = match self.backend.load_profile(&self.credentials).await {
            Ok(profile) => Some(profile.birth_details()).filter(|d| !d.is_empty()),
            Err(ApiError::MissingToken { .. }) => None,
            Err(e) => {
                warn!("Failed to load profile, starting without birth details: {}", e);
                None
            }
        };
        self.start(details).await;
    }

    /// Submit free text from the user.
    pub async fn send_message(self: &Arc<Self>, content: &str) -> Result<(), ConversationError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ConversationError::EmptyMessage);
        }

        let needs_start = {
            let s = self.state.read().await;
            if s.loading {
                return Err(ConversationError::Busy);
            }
            s.conversation_id.is_none()
        };
        if needs_start {
            self.start(None).await;
        }

        let mut s = self.state.write().await;
        if s.loading {
            return Err(ConversationError::Busy);
        }
        self.set_loading(&mut s, true);
        self.clear_error(&mut s);
        self.set_topics_visible(&mut s, false);

        let history = s.history();
        self.append(&mut s, Message::user(content));

        let stage = s.stage;
        match stage {
            ConversationStage::Introduction => {
                self.transition(&mut s, ConversationStage::BirthDetails)?;
                self.append(&mut s, Message::assistant(prompts::REQUEST_BIRTH_DETAILS));
                self.set_loading(&mut s, false);
                Ok(())
            }
            ConversationStage::BirthDetails => {
                self.collect_birth_details(&mut s, content);
                self.set_loading(&mut s, false);
                Ok(())
            }
            _ => {
                let epoch = s.epoch;
                let request = QueryRequest::new(content)
                    .with_conversation_id(s.conversation_id.clone())
                    .with_history(history)
                    .with_birth_details(s.birth_details.clone());
                drop(s);

                let result = self.backend.query(&self.credentials, &request).await;

                let mut s = self.state.write().await;
                if s.epoch != epoch {
                    debug!("Discarding stale reply");
                    return Ok(());
                }
                match result {
                    Ok(response) => {
                        if !s.has_local_conversation_id() {
                            if let Some(id) = response.conversation_id {
                                s.conversation_id = Some(id);
                            }
                        }
                        self.append(&mut s, Message::assistant(response.response));
                    }
                    Err(e) => {
                        warn!(stage = %s.stage, "Query failed, using fallback reply: {}", e);
                        self.raise_error(&mut s, e.banner_text());
                        self.append(&mut s, Message::assistant(fallback_reply(content)));
                    }
                }
                let reexpose = s.stage.offers_topics();
                self.set_loading(&mut s, false);
                drop(s);

                if reexpose {
                    self.schedule_topics(epoch);
                }
                Ok(())
            }
        }
    }

    /// Ask for advice on a preset topic.
    pub async fn select_topic(self: &Arc<Self>, topic: Topic) -> Result<(), ConversationError> {
        let mut s = self.state.write().await;
        if s.loading {
            return Err(ConversationError::Busy);
        }
        if !s.stage.offers_topics() {
            return Err(ConversationError::TopicsUnavailable { stage: s.stage });
        }
        if !s.topics_visible {
            return Err(ConversationError::TopicsHidden);
        }

        self.set_loading(&mut s, true);
        self.clear_error(&mut s);
        self.set_topics_visible(&mut s, false);
        self.transition(&mut s, ConversationStage::TopicAdvice)?;

        let history = s.history();
        self.append(&mut s, Message::user(topic.request_phrase()));

        let epoch = s.epoch;
        let request = QueryRequest::new(topic.request_phrase())
            .with_conversation_id(s.conversation_id.clone())
            .with_history(history)
            .with_birth_details(s.birth_details.clone())
            .with_topic(topic);
        drop(s);

        let result = self.backend.query(&self.credentials, &request).await;

        let mut s = self.state.write().await;
        if s.epoch != epoch {
            debug!(%topic, "Discarding stale topic advice");
            return Ok(());
        }
        match result {
            Ok(response) => {
                self.append(&mut s, Message::assistant(response.response));
            }
            Err(e) => {
                warn!(%topic, "Topic advice failed, using fallback: {}", e);
                self.raise_error(&mut s, e.banner_text());
                self.append(&mut s, Message::assistant(prompts::topic_fallback(topic)));
            }
        }
        self.set_loading(&mut s, false);
        drop(s);

        self.schedule_topics(epoch);
        Ok(())
    }

    /// Discard the session and start over at the introduction.
    pub async fn reset(&self) {
        {
            let mut s = self.state.write().await;
            s.epoch += 1;
            self.continuations.cancel_all();

            self.clear_history(&mut s);
            s.birth_details = BirthDetails::new();
            s.birth_details_collected = false;
            s.conversation_id = None;
            self.clear_error(&mut s);
            self.set_topics_visible(&mut s, false);
            self.set_loading(&mut s, false);
            self.force_stage(&mut s, ConversationStage::Introduction);
            info!(epoch = s.epoch, "Conversation reset");
        }
        self.start(None).await;
    }

    /// Retry after an error. Always a full restart.
    pub async fn retry(&self) {
        self.reset().await;
    }

    /// Dismiss the error banner.
    pub async fn dismiss_error(&self) {
        let mut s = self.state.write().await;
        self.clear_error(&mut s);
    }

    /// Replace the accumulated birth details (e.g. from a profile form).
    pub async fn update_birth_details(&self, details: BirthDetails) {
        let mut s = self.state.write().await;
        s.birth_details_collected = details.is_collected();
        s.birth_details = details;
    }

    // ── Stage steps ─────────────────────────────────────────────────────

    /// Merge what the user wrote into the birth details; confirm and schedule
    /// the chart analysis once enough is known, otherwise ask again.
    fn collect_birth_details(self: &Arc<Self>, s: &mut Session, content: &str) {
        if let Some(extracted) = extract_birth_details(content) {
            s.birth_details.merge(&extracted);
            if s.birth_details.is_collected() {
                s.birth_details_collected = true;
                let confirmation = prompts::birth_details_confirmation(&s.birth_details);
                self.append(s, Message::assistant(confirmation));

                let this = Arc::clone(self);
                let epoch = s.epoch;
                self.continuations.schedule(
                    "basic_prompt",
                    self.delays.confirmation_to_analysis,
                    async move { this.run_basic_prompt(epoch).await },
                );
                return;
            }
        }
        self.append(s, Message::assistant(prompts::ASK_AGAIN));
    }

    async fn run_basic_prompt(self: Arc<Self>, epoch: u64) {
        let request = {
            let mut s = self.state.write().await;
            if s.epoch != epoch || s.stage != ConversationStage::BirthDetails {
                debug!(stage = %s.stage, "Skipping basic prompt");
                return;
            }
            self.set_loading(&mut s, true);
            if let Err(e) = self.transition(&mut s, ConversationStage::BasicPrompt) {
                warn!("{}", e);
                self.set_loading(&mut s, false);
                return;
            }
            let history = s.history();
            self.append(&mut s, Message::assistant(prompts::ANALYZING));
            QueryRequest::new(prompts::ANALYSIS_INSTRUCTION)
                .with_conversation_id(s.conversation_id.clone())
                .with_history(history)
                .with_birth_details(s.birth_details.clone())
        };

        let result = self.backend.query(&self.credentials, &request).await;

        let delay = {
            let mut s = self.state.write().await;
            if s.epoch != epoch {
                debug!("Discarding stale chart analysis");
                return;
            }
            let delay = match result {
                Ok(response) => {
                    self.append(&mut s, Message::assistant(response.response));
                    self.delays.analysis_to_topics
                }
                Err(e) => {
                    warn!("Chart analysis failed, using fallback: {}", e);
                    self.raise_error(&mut s, e.banner_text());
                    self.append(&mut s, Message::assistant(prompts::ANALYSIS_FALLBACK));
                    self.delays.fallback_to_topics
                }
            };
            self.set_loading(&mut s, false);
            delay
        };

        let this = Arc::clone(&self);
        self.continuations.schedule("topic_selection", delay, async move {
            this.request_topic_selection(epoch).await
        });
    }

    async fn request_topic_selection(&self, epoch: u64) {
        let mut s = self.state.write().await;
        if s.epoch != epoch || s.stage != ConversationStage::BasicPrompt {
            debug!(stage = %s.stage, "Skipping topic selection");
            return;
        }
        if let Err(e) = self.transition(&mut s, ConversationStage::TopicSelection) {
            warn!("{}", e);
            return;
        }
        self.append(&mut s, Message::assistant(prompts::TOPIC_SELECTION));
        self.set_topics_visible(&mut s, true);
    }

    /// Offer topic choices again after the re-expose delay.
    fn schedule_topics(self: &Arc<Self>, epoch: u64) {
        let this = Arc::clone(self);
        self.continuations
            .schedule("topics_reexpose", self.delays.topics_reexpose, async move {
                let mut s = this.state.write().await;
                if s.epoch != epoch || !s.stage.offers_topics() || s.loading {
                    debug!(stage = %s.stage, "Skipping topic re-expose");
                    return;
                }
                this.set_topics_visible(&mut s, true);
            });
    }

    // ── State helpers ───────────────────────────────────────────────────

    /// Authenticated start first, then the unified endpoint without a token.
    async fn open_conversation(&self, details: &BirthDetails) -> Result<String, ApiError> {
        if self.credentials.is_authenticated() {
            match self.backend.start_conversation(&self.credentials, details).await {
                Ok(response) => {
                    if let Some(greeting) = response.greeting() {
                        debug!(greeting, "Backend greeting ignored");
                    }
                    return Ok(response.conversation_id);
                }
                Err(e) => {
                    warn!("Authenticated start failed, using unified endpoint: {}", e);
                }
            }
        }

        let request = QueryRequest::new(prompts::START_MESSAGE).with_birth_details(details.clone());
        let response = self
            .backend
            .query(&Credentials::anonymous(), &request)
            .await?;
        Ok(response.conversation_id.unwrap_or_else(|| {
            format!("{LOCAL_SESSION_PREFIX}{}", Utc::now().timestamp_millis())
        }))
    }

    fn emit(&self, event: ControllerEvent) {
        // Ok if no receivers are listening
        let _ = self.events.send(event);
    }

    fn append(&self, s: &mut Session, message: Message) {
        s.messages.push(message.clone());
        self.emit(ControllerEvent::MessageAppended { message });
    }

    fn clear_history(&self, s: &mut Session) {
        if !s.messages.is_empty() {
            s.messages.clear();
            self.emit(ControllerEvent::HistoryCleared);
        }
    }

    fn transition(
        &self,
        s: &mut Session,
        target: ConversationStage,
    ) -> Result<(), ConversationError> {
        if !s.stage.can_transition_to(target) {
            return Err(ConversationError::InvalidTransition {
                from: s.stage,
                to: target,
            });
        }
        self.force_stage(s, target);
        Ok(())
    }

    /// Set the stage without validation. Used for start and reset.
    fn force_stage(&self, s: &mut Session, target: ConversationStage) {
        let from = s.stage;
        s.stage = target;
        if from != target {
            info!(%from, to = %target, "Conversation stage changed");
            self.emit(ControllerEvent::StageChanged { from, to: target });
        }
    }

    fn set_loading(&self, s: &mut Session, active: bool) {
        if s.loading != active {
            s.loading = active;
            self.emit(ControllerEvent::Loading { active });
        }
    }

    fn set_topics_visible(&self, s: &mut Session, visible: bool) {
        if s.topics_visible == visible {
            return;
        }
        s.topics_visible = visible;
        self.emit(if visible {
            ControllerEvent::TopicsShown {
                topics: Topic::ALL.to_vec(),
            }
        } else {
            ControllerEvent::TopicsHidden
        });
    }

    fn raise_error(&self, s: &mut Session, message: String) {
        s.error = Some(message.clone());
        self.emit(ControllerEvent::Error { message });
    }

    fn clear_error(&self, s: &mut Session) {
        if s.error.take().is_some() {
            self.emit(ControllerEvent::ErrorCleared);
        }
    }
}
