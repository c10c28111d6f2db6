//! Consultation stage machine. Tracks which phase the conversation is in.

use serde::{Deserialize, Serialize};

/// The stages of the guided consultation.
///
/// Progresses Introduction → BirthDetails → BasicPrompt → TopicSelection,
/// then alternates between TopicSelection and TopicAdvice. Reset returns to
/// Introduction from anywhere and is not modelled as a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    #[default]
    Introduction,
    BirthDetails,
    BasicPrompt,
    TopicSelection,
    TopicAdvice,
}

impl ConversationStage {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: ConversationStage) -> bool {
        use ConversationStage::*;
        matches!(
            (self, target),
            (Introduction, BirthDetails)
                | (BirthDetails, BasicPrompt)
                | (BasicPrompt, TopicSelection)
                | (TopicSelection, TopicAdvice)
                | (TopicAdvice, TopicAdvice)
                | (TopicAdvice, TopicSelection)
        )
    }

    /// Whether topic choices may be offered in this stage.
    pub fn offers_topics(&self) -> bool {
        matches!(self, Self::TopicSelection | Self::TopicAdvice)
    }
}

impl std::fmt::Display for ConversationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Introduction => "introduction",
            Self::BirthDetails => "birth_details",
            Self::BasicPrompt => "basic_prompt",
            Self::TopicSelection => "topic_selection",
            Self::TopicAdvice => "topic_advice",
        };
        write!(f, "{s}")
    }
}
