//! Conversation memory for a running session.
//!
//! The thread holds recent exchanges and follow-up rounds in order. Every few turns the
//! latest user messages are rolled into permanent memory, which outlives thread trimming.
//! The thread also remembers when the last proactive message went out, which is what
//! keeps an idle conversation eligible for auto-continuation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Characters of a user message kept in a rollup insight.
const INSIGHT_CHARS: usize = 100;
/// Characters of a response repeated in the prompt memory block.
const RESPONSE_PREVIEW_CHARS: usize = 200;

// ============ Entries ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub timestamp: String,
    pub user_message: String,
    pub response: String,
    pub persona_id: String,
    pub goal_titles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemoryEntry {
    Turn(TurnRecord),
    FollowUp {
        timestamp: String,
        round: u32,
        mode: String,
        content: String,
    },
}

impl MemoryEntry {
    /// The text a later prompt should see for this entry.
    pub fn content(&self) -> &str {
        match self {
            MemoryEntry::Turn(turn) => &turn.user_message,
            MemoryEntry::FollowUp { content, .. } => content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRollup {
    pub session_id: String,
    pub key_insights: Vec<String>,
    pub goals: Vec<String>,
    pub timestamp: String,
}

fn preview(text: &str, limit: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= limit {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(limit).collect();
    format!("{}...", cut.trim_end())
}

// ============ Conversation Memory ============

#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    thread: Vec<MemoryEntry>,
    permanent: Vec<MemoryRollup>,
    turns_recorded: usize,
    capacity: usize,
    rollup_every: usize,
    last_proactive: Option<DateTime<Utc>>,
}

impl ConversationMemory {
    pub fn new(capacity: usize, rollup_every: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            rollup_every,
            ..Default::default()
        }
    }

    pub fn thread(&self) -> &[MemoryEntry] {
        &self.thread
    }

    pub fn permanent(&self) -> &[MemoryRollup] {
        &self.permanent
    }

    fn push(&mut self, entry: MemoryEntry) {
        self.thread.push(entry);
        if self.thread.len() > self.capacity {
            let excess = self.thread.len() - self.capacity;
            self.thread.drain(..excess);
        }
    }

    /// Add a finished exchange. Returns the rollup when this turn completes a batch.
    pub fn record_turn(&mut self, turn: TurnRecord, now: DateTime<Utc>) -> Option<MemoryRollup> {
        let goals = turn.goal_titles.clone();
        self.push(MemoryEntry::Turn(turn));
        self.turns_recorded += 1;

        if self.rollup_every == 0 || self.turns_recorded % self.rollup_every != 0 {
            return None;
        }

        let mut insights: Vec<String> = self
            .recent_turns(self.rollup_every)
            .iter()
            .map(|t| preview(&t.user_message, INSIGHT_CHARS))
            .collect();
        insights.reverse();

        let rollup = MemoryRollup {
            session_id: now.format("%Y%m%d_%H%M").to_string(),
            key_insights: insights,
            goals,
            timestamp: now.to_rfc3339(),
        };
        self.permanent.push(rollup.clone());
        Some(rollup)
    }

    pub fn record_follow_up(&mut self, round: u32, mode: &str, content: &str, now: DateTime<Utc>) {
        self.push(MemoryEntry::FollowUp {
            timestamp: now.to_rfc3339(),
            round,
            mode: mode.to_string(),
            content: content.to_string(),
        });
    }

    /// Up to `n` exchanges, newest first.
    pub fn recent_turns(&self, n: usize) -> Vec<&TurnRecord> {
        self.thread
            .iter()
            .rev()
            .filter_map(|entry| match entry {
                MemoryEntry::Turn(turn) => Some(turn),
                MemoryEntry::FollowUp { .. } => None,
            })
            .take(n)
            .collect()
    }

    pub fn last_turn(&self) -> Option<&TurnRecord> {
        self.recent_turns(1).into_iter().next()
    }

    /// Content of the last `n` entries of any kind, oldest first.
    pub fn recent_contents(&self, n: usize) -> Vec<String> {
        let start = self.thread.len().saturating_sub(n);
        self.thread[start..].iter().map(|e| e.content().to_string()).collect()
    }

    /// The memory block for a persona prompt: the last `turns` exchanges, oldest first,
    /// and the most recent rollup. Empty for a fresh session.
    pub fn format_for_prompt(&self, turns: usize) -> String {
        let mut recent = self.recent_turns(turns);
        if recent.is_empty() {
            return String::new();
        }
        recent.reverse();

        let mut block = String::from("🧵 CONVERSATION SO FAR:\n");
        for turn in recent {
            block.push_str(&format!("- User: {}\n", preview(&turn.user_message, RESPONSE_PREVIEW_CHARS)));
            block.push_str(&format!(
                "  {}: {}\n",
                turn.persona_id,
                preview(&turn.response, RESPONSE_PREVIEW_CHARS)
            ));
        }

        if let Some(rollup) = self.permanent.last() {
            block.push_str(&format!("\n🗂️ EARLIER TOPICS: {}\n", rollup.key_insights.join("; ")));
        }
        block
    }

    // ============ Proactive Timer ============

    pub fn arm_continuation(&mut self, now: DateTime<Utc>) {
        self.last_proactive = Some(now);
    }

    pub fn stop_continuation(&mut self) {
        self.last_proactive = None;
    }

    /// When the last proactive message went out, if continuation is armed.
    pub fn last_proactive(&self) -> Option<DateTime<Utc>> {
        self.last_proactive
    }
}
