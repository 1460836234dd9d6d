//! Proactive follow-ups: short messages sent after a response, each from a different angle,
//! and the continue-or-stop decision for an idle thread.

use crate::goals::Goal;
use crate::memory::TurnRecord;
use serde::{Deserialize, Serialize};

/// Most follow-up rounds after a single response.
pub const MAX_FOLLOW_UP_ROUNDS: u32 = 4;
/// Rounds produced by one approved auto-continuation.
pub const CONTINUATION_ROUNDS: u32 = 2;
/// Goals listed in a follow-up prompt.
const FOLLOW_UP_GOALS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpMode {
    General,
    Coaching,
    Creative,
    Analytical,
    GoalProgress,
    Insight,
    ActionStep,
}

/// Angles used for the rounds after a response, in order.
pub const ROUND_ROTATION: [FollowUpMode; 4] = [
    FollowUpMode::General,
    FollowUpMode::Coaching,
    FollowUpMode::Creative,
    FollowUpMode::Analytical,
];

/// Angles used by auto-continuation rounds.
pub const CONTINUATION_FOCUS: [FollowUpMode; 3] = [
    FollowUpMode::GoalProgress,
    FollowUpMode::Insight,
    FollowUpMode::ActionStep,
];

impl FollowUpMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowUpMode::General => "general",
            FollowUpMode::Coaching => "coaching",
            FollowUpMode::Creative => "creative",
            FollowUpMode::Analytical => "analytical",
            FollowUpMode::GoalProgress => "goal_progress",
            FollowUpMode::Insight => "insight",
            FollowUpMode::ActionStep => "action_step",
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            FollowUpMode::General => "Ask a helpful follow-up question that moves the user forward with their goals.",
            FollowUpMode::Coaching => "Give encouraging coaching advice that motivates the user to take action.",
            FollowUpMode::Creative => "Suggest a creative approach or alternative the user could try.",
            FollowUpMode::Analytical => "Offer an analytical insight that helps the user optimize their approach.",
            FollowUpMode::GoalProgress => "Check in on progress toward one of their goals and name the next milestone.",
            FollowUpMode::Insight => "Share a deeper insight that connects the conversation to their goals.",
            FollowUpMode::ActionStep => "Offer one concrete action they can take today.",
        }
    }

    /// Mode for round `round` (1-based) after a response.
    pub fn for_round(round: u32) -> FollowUpMode {
        let index = (round.max(1) - 1) as usize % ROUND_ROTATION.len();
        ROUND_ROTATION[index]
    }
}

/// One proactive message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub round: u32,
    pub mode: FollowUpMode,
    pub content: String,
    pub timestamp: String,
    /// Produced by auto-continuation rather than right after a response.
    pub auto: bool,
}

pub fn build_follow_up_prompt(
    turn: &TurnRecord,
    mode: FollowUpMode,
    goals: &[Goal],
    thread: &[String],
    round: u32,
) -> String {
    let mut prompt = String::from(
        "You are speaking directly to the user as a helpful assistant. Write a brief follow-up message.\n\n",
    );
    prompt.push_str(&format!(
        "CONVERSATION CONTEXT:\nUser said: \"{}\"\nAssistant responded: \"{}\"\nPersona: {}\n",
        turn.user_message.trim(),
        turn.response.trim(),
        turn.persona_id
    ));

    if !goals.is_empty() {
        prompt.push_str("\nUSER'S ACTIVE GOALS:\n");
        for goal in goals.iter().take(FOLLOW_UP_GOALS) {
            prompt.push_str(&format!("- {} ({}% complete)\n", goal.title, goal.progress_percentage));
        }
    }

    if !thread.is_empty() {
        prompt.push_str("\nTHREAD SO FAR:\n");
        for (i, entry) in thread.iter().enumerate() {
            prompt.push_str(&format!("Round {}: {}\n", i + 1, entry));
        }
    }

    prompt.push_str(&format!(
        "\nYOUR TASK ({} PERSPECTIVE, ROUND {}):\n{}\n",
        mode.as_str().to_uppercase(),
        round,
        mode.instruction()
    ));
    prompt.push_str(
        "
Keep it to 1-3 sentences. Speak to the user as \"you\". Build on earlier rounds instead of
repeating them. No labels, no formatting, no thinking out loud.
",
    );
    prompt
}

pub fn build_continuation_prompt(
    turn: &TurnRecord,
    idle_secs: i64,
    thread: &[String],
    goals: &[Goal],
) -> String {
    let mut prompt = String::from(
        "You decide whether an assistant should send another proactive message to an idle user.\n\n",
    );
    prompt.push_str(&format!(
        "User's last message: \"{}\"\nLast response: \"{}\"\nSeconds since last message: {}\n",
        turn.user_message.trim(),
        turn.response.trim(),
        idle_secs
    ));

    if !thread.is_empty() {
        prompt.push_str("\nRECENT THREAD:\n");
        for entry in thread {
            prompt.push_str(&format!("- {}\n", entry));
        }
    }

    prompt.push_str(&format!("\nUSER'S ACTIVE GOALS ({}):\n", goals.len()));
    for goal in goals.iter().take(FOLLOW_UP_GOALS) {
        prompt.push_str(&format!("- {} ({}% progress)\n", goal.title, goal.progress_percentage));
    }

    prompt.push_str(
        "
Continue if the conversation is still goal-relevant or leaves questions open.
Stop if it feels complete or the user needs space.

RESPOND WITH ONLY ONE LINE:
CONTINUE: <brief reason>
or
STOP: <brief reason>
",
    );
    prompt
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinuationDecision {
    Continue(String),
    Stop(String),
}

/// Anything without an explicit `CONTINUE:` is a stop.
pub fn parse_continuation_decision(text: &str) -> ContinuationDecision {
    let upper = text.to_ascii_uppercase();
    let reason_after = |marker: &str| {
        upper
            .find(marker)
            .map(|at| text[at + marker.len()..].lines().next().unwrap_or("").trim().to_string())
            .unwrap_or_default()
    };

    if upper.contains("CONTINUE:") {
        ContinuationDecision::Continue(reason_after("CONTINUE:"))
    } else {
        ContinuationDecision::Stop(reason_after("STOP:"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::{Category, Priority};

    fn last_turn() -> TurnRecord {
        TurnRecord {
            timestamp: String::new(),
            user_message: "How do I get better at chess?".to_string(),
            response: "Study endgames.".to_string(),
            persona_id: "general".to_string(),
            goal_titles: Vec::new(),
        }
    }

    #[test]
    fn test_round_rotation() {
        assert_eq!(FollowUpMode::for_round(1), FollowUpMode::General);
        assert_eq!(FollowUpMode::for_round(2), FollowUpMode::Coaching);
        assert_eq!(FollowUpMode::for_round(4), FollowUpMode::Analytical);
        assert_eq!(FollowUpMode::for_round(5), FollowUpMode::General);
    }

    #[test]
    fn test_follow_up_prompt_carries_goals_and_thread() {
        let goals: Vec<Goal> = (0..4)
            .map(|i| Goal::new(&format!("Goal {}", i), "", Category::General, Priority::Low, None))
            .collect();
        let thread = vec!["How do I get better at chess?".to_string(), "Have you tried puzzles?".to_string()];
        let prompt = build_follow_up_prompt(&last_turn(), FollowUpMode::Creative, &goals, &thread, 3);

        assert!(prompt.contains("User said: \"How do I get better at chess?\""));
        assert!(prompt.contains("- Goal 2 (0% complete)"));
        assert!(!prompt.contains("Goal 3"));
        assert!(prompt.contains("Round 2: Have you tried puzzles?"));
        assert!(prompt.contains("CREATIVE PERSPECTIVE, ROUND 3"));
    }

    #[test]
    fn test_continuation_prompt_mentions_idle_time() {
        let prompt = build_continuation_prompt(&last_turn(), 75, &[], &[]);
        assert!(prompt.contains("Seconds since last message: 75"));
        assert!(prompt.contains("USER'S ACTIVE GOALS (0)"));
        assert!(prompt.contains("CONTINUE: <brief reason>"));
    }

    #[test]
    fn test_parse_continuation_decision() {
        assert_eq!(
            parse_continuation_decision("Continue: they asked about openings"),
            ContinuationDecision::Continue("they asked about openings".to_string())
        );
        assert_eq!(
            parse_continuation_decision("<think>hmm</think>\nSTOP: conversation is complete"),
            ContinuationDecision::Stop("conversation is complete".to_string())
        );
        assert_eq!(
            parse_continuation_decision("maybe later"),
            ContinuationDecision::Stop(String::new())
        );
    }
}
