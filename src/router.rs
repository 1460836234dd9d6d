//! Keyword routing from a free-text message to a persona.

use crate::personas::PersonaRegistry;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    pub persona_id: String,
    /// Keyword hits of the chosen persona. Zero for explicit picks and fallbacks.
    pub score: usize,
    /// The caller named the persona; no keyword scoring happened.
    pub explicit: bool,
}

impl RouteDecision {
    pub fn describe(&self) -> String {
        if self.explicit {
            format!("explicit selection -> {}", self.persona_id)
        } else if self.score == 0 {
            format!("no keyword hits, fallback -> {}", self.persona_id)
        } else {
            format!("{} keyword hit(s) -> {}", self.score, self.persona_id)
        }
    }
}

/// Pick a persona for `message`.
///
/// A `requested` id that exists in the registry always wins. Otherwise the persona with the
/// strictly highest keyword count is chosen; ties keep the earlier persona in registry order
/// and a zero score falls back to the default persona.
pub fn route(message: &str, requested: Option<&str>, registry: &PersonaRegistry) -> RouteDecision {
    if let Some(id) = requested {
        if registry.contains(id) {
            return RouteDecision {
                persona_id: id.to_string(),
                score: 0,
                explicit: true,
            };
        }
    }

    let lowered = message.to_lowercase();
    let mut best_id = registry.default_persona().id.as_str();
    let mut best_score = 0;

    for persona in registry.iter() {
        let score = persona.keyword_hits(&lowered);
        if score > best_score {
            best_score = score;
            best_id = persona.id.as_str();
        }
    }

    RouteDecision {
        persona_id: best_id.to_string(),
        score: best_score,
        explicit: false,
    }
}
