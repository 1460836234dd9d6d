//! Prompt assembly for persona turns and goal proposals.

use crate::goals::Goal;
use crate::personas::Persona;

const GOAL_FOCUS: &str = "🎯 IMPORTANT: Keep the user's goals at the center of your response.

If they have active goals:
- Reference their goals by name
- Connect your advice to their current progress
- Suggest a specific next action for each goal
- Name the likely obstacles and how to get past them";

/// The goals block folded into a persona prompt. Empty when there are no goals.
pub fn goal_context(goals: &[Goal]) -> String {
    if goals.is_empty() {
        return String::new();
    }

    let mut out = String::from("🎯 USER'S ACTIVE GOALS (consider these in your response):\n");
    for goal in goals {
        out.push_str(&format!("\n📋 {} ({}% complete)", goal.title, goal.progress_percentage));
        out.push_str(&format!(
            "\n   Category: {} | Priority: {}",
            goal.category.as_str(),
            goal.priority.as_str()
        ));

        if !goal.milestones.is_empty() {
            out.push_str("\n   🎯 Milestones:");
            for milestone in &goal.milestones {
                let mark = if milestone.is_completed() { "✅" } else { "⏳" };
                out.push_str(&format!("\n     {} {}", mark, milestone.title));
                if milestone.is_completed() {
                    out.push_str(&format!(
                        " (completed {})",
                        milestone.completed_date.as_deref().unwrap_or("")
                    ));
                }
            }
        }

        if !goal.daily_routines.is_empty() {
            out.push_str("\n   🔄 Daily Routines:");
            for routine in &goal.daily_routines {
                out.push_str(&format!(
                    "\n     🔥 {} (streak: {}, best: {})",
                    routine.title, routine.streak_count, routine.longest_streak
                ));
            }
        }
        out.push('\n');
    }
    out
}

/// Optional sections of a persona prompt. Blank fields are left out.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptExtras<'a> {
    /// Recent exchanges from the conversation memory.
    pub memory: &'a str,
    pub image: &'a str,
    /// Notes from the thinking pass.
    pub thinking: &'a str,
}

/// Persona template, goal context, memory, image context, the user message, the
/// goal-focus instructions, then any strategic notes.
pub fn build_enhanced_prompt(
    persona: &Persona,
    user_message: &str,
    goals: &[Goal],
    extras: PromptExtras<'_>,
) -> String {
    let mut prompt = persona.prompt.trim_end().to_string();

    let goals_block = goal_context(goals);
    if !goals_block.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(&goals_block);
    }

    if !extras.memory.trim().is_empty() {
        prompt.push_str(&format!("\n\n{}", extras.memory.trim_end()));
    }

    if !extras.image.trim().is_empty() {
        prompt.push_str(&format!("\n\nIMAGE CONTEXT:\n{}\n", extras.image.trim()));
    }

    prompt.push_str(&format!("\n\nUser: {}\n\n{}", user_message, GOAL_FOCUS));

    if !extras.thinking.trim().is_empty() {
        prompt.push_str(&format!(
            "\n\n🧠 STRATEGIC THINKING:\n{}\n\nNow give your response:",
            extras.thinking.trim()
        ));
    }
    prompt
}

/// Ask the thinking model for a few strategic points before the persona answers.
pub fn build_thinking_prompt(user_message: &str, persona_id: &str, goal_count: usize) -> String {
    format!(
        "STRATEGIC THINKING TASK:
Analyze this request and plan the best response.

USER REQUEST: {}
PERSONA: {}
ACTIVE GOALS: {} goals

Cover what the user actually needs, current approaches or tools that fit the request,
and how the answer can move their goals forward.

Write 2-3 short points:
Point 1: [analysis of the need]
Point 2: [approach and practical application]
Point 3: [goal alignment]
",
        user_message.trim(),
        persona_id,
        goal_count
    )
}

/// Ask the suggestion model for up to three goals in the line format the parser reads.
pub fn build_suggestion_prompt(
    user_message: &str,
    response: &str,
    persona_id: &str,
    existing: &[Goal],
) -> String {
    let mut prompt = String::from(
        "You are a goal advisor. Based on this conversation, suggest 3 specific goals for the user, each with milestones and daily routines.\n\n",
    );
    prompt.push_str(&format!(
        "CONVERSATION:\nUser: \"{}\"\nAssistant: \"{}\"\nPersona: {}\n",
        user_message.trim(),
        response.trim(),
        persona_id
    ));

    if !existing.is_empty() {
        prompt.push_str("\nEXISTING GOALS:\n");
        for goal in existing {
            prompt.push_str(&format!(
                "- {} ({}, {}%)\n",
                goal.title,
                goal.category.as_str(),
                goal.progress_percentage
            ));
        }
    }

    prompt.push_str(
        "
Each goal should be specific and measurable, achievable in 1-6 months, and complementary to existing goals.

REQUIRED FORMAT (be exact):
GOAL1: Learn Python fundamentals and build first project
MILESTONE1.1: Complete Python basics course (2 weeks)
MILESTONE1.2: Build a simple calculator app (1 week)
ROUTINE1.1: Practice coding for 30 minutes daily
ROUTINE1.2: Review code concepts every Sunday

GOAL2: ...

GENERATE YOUR 3 GOALS WITH MILESTONES AND ROUTINES NOW:
",
    );
    prompt
}
