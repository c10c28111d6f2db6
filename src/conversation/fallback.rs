//! Canned replies used when the backend cannot answer a free-text question.

/// A keyword group and the reply it selects.
struct KeywordGroup {
    keywords: &'static [&'static str],
    reply: &'static str,
}

const PLANETS_REPLY: &str = "In Vedic astrology, there are nine celestial bodies or grahas: Sun (Surya), Moon (Chandra), Mars (Mangal), Mercury (Budha), Jupiter (Guru), Venus (Shukra), Saturn (Shani), and the lunar nodes Rahu and Ketu. Each planet represents different energies and influences various aspects of life.";

const HOUSES_REPLY: &str = "Vedic astrology divides a birth chart into 12 houses or bhavas, each governing different areas of life. The 1st house represents self and personality, 2nd house wealth, 3rd house siblings, 4th house mother and home, 5th house creativity and children, and so on.";

const SIGNS_REPLY: &str = "Vedic astrology uses the sidereal zodiac with 12 signs (rashis): Aries (Mesha), Taurus (Vrishabha), Gemini (Mithuna), Cancer (Karka), Leo (Simha), Virgo (Kanya), Libra (Tula), Scorpio (Vrishchika), Sagittarius (Dhanu), Capricorn (Makara), Aquarius (Kumbha), and Pisces (Meena).";

const DASHA_REPLY: &str = "Parasara Jyotish uses the Vimshottari Dasha system to time events. This system divides life into planetary periods (dashas) and sub-periods (antardashas). The sequence is: Sun (6 years), Moon (10 years), Mars (7 years), Rahu (18 years), Jupiter (16 years), Saturn (19 years), Mercury (17 years), Ketu (7 years), and Venus (20 years).";

const GENERIC_REPLY: &str = "According to Parasara Jyotish principles, your question relates to the cosmic influences that shape our experiences. The planetary positions and their aspects form unique patterns that can provide insights into various life situations. Would you like to know more about a specific area of Vedic astrology?";

/// Groups are checked in order; the first match wins, since a question can
/// hit several groups ("planet in the 7th house").
const KEYWORD_GROUPS: &[KeywordGroup] = &[
    KeywordGroup {
        keywords: &["planet", "graha"],
        reply: PLANETS_REPLY,
    },
    KeywordGroup {
        keywords: &["house", "bhava"],
        reply: HOUSES_REPLY,
    },
    KeywordGroup {
        keywords: &["zodiac", "rashi"],
        reply: SIGNS_REPLY,
    },
    KeywordGroup {
        keywords: &["dasha", "period"],
        reply: DASHA_REPLY,
    },
];

/// Pick a canned reply for `question` by case-insensitive keyword match.
pub fn fallback_reply(question: &str) -> &'static str {
    let question = question.to_lowercase();
    KEYWORD_GROUPS
        .iter()
        .find(|group| group.keywords.iter().any(|k| question.contains(k)))
        .map(|group| group.reply)
        .unwrap_or(GENERIC_REPLY)
}
