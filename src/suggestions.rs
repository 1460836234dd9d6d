//! Parser for goal proposals written by the suggestion model.
//!
//! The model is asked for lines shaped like
//!
//! ```text
//! GOAL1: Establish a daily meditation practice
//! MILESTONE1.1: Complete a 7-day meditation challenge
//! ROUTINE1.1: Meditate for 10 minutes every morning
//! ```
//!
//! Small models wander off format, so anything unrecognized is dropped instead of failing.

use serde::{Deserialize, Serialize};

/// Most proposals kept from one response.
pub const MAX_PROPOSALS: usize = 3;

/// Goal titles this short are treated as noise.
const MIN_TITLE_CHARS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GoalProposal {
    pub title: String,
    #[serde(default)]
    pub milestones: Vec<String>,
    #[serde(default)]
    pub routines: Vec<String>,
}

enum LineKind {
    Goal,
    Milestone,
    Routine,
}

/// Classify a trimmed line by its prefix and return the text after the first colon.
fn classify(line: &str) -> Option<(LineKind, String)> {
    // Tolerate markdown bullets and bold around the prefix
    let line = line.trim_start_matches(&['*', '-', '#', ' '][..]);
    let kind = if line.starts_with("GOAL") {
        LineKind::Goal
    } else if line.starts_with("MILESTONE") {
        LineKind::Milestone
    } else if line.starts_with("ROUTINE") {
        LineKind::Routine
    } else {
        return None;
    };

    let text = line.split_once(':').map_or(line, |(_, rest)| rest);
    let text = text.trim().trim_matches('*').trim().to_string();
    Some((kind, text))
}

/// Group `GOAL`/`MILESTONE`/`ROUTINE` lines into at most three proposals.
///
/// Milestones and routines attach to the most recent accepted goal. A goal line whose title
/// is five characters or fewer is dropped along with the lines that follow it, until the
/// next goal line.
pub fn parse_goal_suggestions(text: &str) -> Vec<GoalProposal> {
    let mut proposals = Vec::new();
    let mut current: Option<GoalProposal> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some((kind, body)) = classify(line) else {
            continue;
        };

        match kind {
            LineKind::Goal => {
                if let Some(done) = current.take() {
                    proposals.push(done);
                }
                if body.chars().count() > MIN_TITLE_CHARS {
                    current = Some(GoalProposal {
                        title: body,
                        ..Default::default()
                    });
                }
            }
            LineKind::Milestone => {
                if let Some(goal) = current.as_mut() {
                    if !body.is_empty() {
                        goal.milestones.push(body);
                    }
                }
            }
            LineKind::Routine => {
                if let Some(goal) = current.as_mut() {
                    if !body.is_empty() {
                        goal.routines.push(body);
                    }
                }
            }
        }
    }

    if let Some(done) = current {
        proposals.push(done);
    }
    proposals.truncate(MAX_PROPOSALS);
    proposals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_children_under_latest_goal() {
        let text = "GOAL1: Learn X\nMILESTONE1.1: Do Y\nROUTINE1.1: Practice daily\nGOAL2: Learn Z";
        let proposals = parse_goal_suggestions(text);

        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[0].title, "Learn X");
        assert_eq!(proposals[0].milestones, vec!["Do Y"]);
        assert_eq!(proposals[0].routines, vec!["Practice daily"]);
        assert_eq!(proposals[1].title, "Learn Z");
        assert!(proposals[1].milestones.is_empty());
        assert!(proposals[1].routines.is_empty());
    }

    #[test]
    fn test_caps_at_three_proposals() {
        let text = (1..=5)
            .map(|i| format!("GOAL{}: Goal number {}", i, i))
            .collect::<Vec<_>>()
            .join("\n");
        let proposals = parse_goal_suggestions(&text);
        assert_eq!(proposals.len(), 3);
        assert_eq!(proposals[2].title, "Goal number 3");
    }

    #[test]
    fn test_short_goal_title_drops_its_children() {
        let text = "GOAL1: Run\nMILESTONE1.1: Buy running shoes\nGOAL2: Cook more at home\nROUTINE2.1: Plan meals on Sunday";
        let proposals = parse_goal_suggestions(text);
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].title, "Cook more at home");
        assert!(proposals[0].milestones.is_empty());
        assert_eq!(proposals[0].routines, vec!["Plan meals on Sunday"]);
    }

    #[test]
    fn test_tolerates_noise_and_markdown() {
        let text = "Here are some ideas!\n\n  **GOAL1:** Read twelve books this year  \n- MILESTONE1.1: Finish four books by spring\nsome chatter\nROUTINE1.1:\n* ROUTINE1.2: Read 20 pages before bed";
        let proposals = parse_goal_suggestions(text);
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].title, "Read twelve books this year");
        assert_eq!(proposals[0].milestones, vec!["Finish four books by spring"]);
        assert_eq!(proposals[0].routines, vec!["Read 20 pages before bed"]);
    }

    #[test]
    fn test_children_before_any_goal_are_dropped() {
        let text = "MILESTONE1.1: Orphaned milestone\nROUTINE1.1: Orphaned routine";
        assert!(parse_goal_suggestions(text).is_empty());
        assert!(parse_goal_suggestions("").is_empty());
    }
}
