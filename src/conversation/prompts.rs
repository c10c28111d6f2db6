//! Fixed assistant texts and backend instructions for the consultation flow.

use super::model::{BirthDetails, Topic};

pub const WELCOME: &str = "Welcome to Parasara Jyotish consultation! I'm your astrological assistant. Before we begin, could you please tell me a little about yourself?";

/// Welcome shown when the conversation could not be opened on the backend.
pub const OFFLINE_WELCOME: &str = "Welcome to Parasara Jyotish! I'm your astrological assistant. Before we begin, could you please tell me a little about yourself?";

/// Message sent to the unified endpoint to open a conversation.
pub const START_MESSAGE: &str = "Start conversation";

pub const REQUEST_BIRTH_DETAILS: &str = "Thank you for sharing. For an accurate astrological reading, I'll need your birth details. Could you please provide your birth date, time, and place of birth?";

pub const ASK_AGAIN: &str = "I still need more birth details. Please provide your complete birth date, time, and place of birth for an accurate reading.";

pub const ANALYZING: &str = "I'm analyzing your birth chart based on Vedic astrology principles. This will include your ascendant, moon sign, planetary positions, and key yogas in your chart...";

/// Instruction sent with the basic prompt request.
pub const ANALYSIS_INSTRUCTION: &str = "Please provide a comprehensive birth chart analysis based on my birth details. Include ascendant, moon sign, sun sign, houses, lords, yogas, doshas, and planetary strengths.";

pub const ANALYSIS_FALLBACK: &str = "Based on your birth details, I've analyzed your Vedic birth chart. I can see your ascendant, planetary positions, and key yogas in your chart. There are several interesting patterns that influence different areas of your life. What specific area would you like more detailed guidance on?";

pub const TOPIC_SELECTION: &str = "Now that I've analyzed your birth chart, which specific area of your life would you like more detailed advice on? Please select one of the options below or ask a specific question.";

const NOT_PROVIDED: &str = "Not provided";

/// Confirmation listing the recorded birth details.
pub fn birth_details_confirmation(details: &BirthDetails) -> String {
    format!(
        "Thank you for providing your birth details. I've recorded:\n- Date: {}\n- Time: {}\n- Place: {}\n\nNow I'll analyze your chart.",
        details.date().unwrap_or(NOT_PROVIDED),
        details.time().unwrap_or(NOT_PROVIDED),
        details.place().unwrap_or(NOT_PROVIDED),
    )
}

/// Substitute reply when topic advice could not be fetched.
pub fn topic_fallback(topic: Topic) -> String {
    format!(
        "I'd be happy to provide insights about your {topic}. To give you the most accurate guidance, could you please share your birth details (date, time, and place of birth)?"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::model::fields;

    #[test]
    fn confirmation_lists_recorded_fields() {
        let details = BirthDetails::new()
            .with(fields::DATE, "15/08/1990")
            .with(fields::PLACE, "Mumbai, India");
        let text = birth_details_confirmation(&details);
        assert!(text.contains("- Date: 15/08/1990"));
        assert!(text.contains("- Time: Not provided"));
        assert!(text.contains("- Place: Mumbai, India"));
        assert!(text.ends_with("Now I'll analyze your chart."));
    }

    #[test]
    fn topic_fallback_names_topic() {
        assert!(topic_fallback(Topic::Finance).contains("insights about your finance"));
    }
}
