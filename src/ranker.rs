//! Picks which active goals a persona gets to see in its prompt.

use crate::goals::Goal;
use crate::personas::DEFAULT_PERSONA_ID;
use std::cmp::Reverse;

/// Most goals folded into a single prompt.
pub const MAX_RELEVANT_GOALS: usize = 3;

/// A goal is visible to a persona that is listed in its related agents, whose id equals the
/// goal's category, or that is the default persona.
pub fn is_relevant(persona_id: &str, goal: &Goal) -> bool {
    persona_id == DEFAULT_PERSONA_ID
        || goal.category.as_str() == persona_id
        || goal.related_agents.iter().any(|a| a == persona_id)
}

/// Up to three goals relevant to `persona_id`.
///
/// Qualifying goals are stable-sorted ascending by (priority weight, descending progress) and
/// the whole list is then reversed, so high priority comes first. Within one priority the
/// reversal puts lower progress first and equal keys in reverse input order.
pub fn relevant_goals(persona_id: &str, goals: &[Goal]) -> Vec<Goal> {
    let mut ranked: Vec<Goal> = goals
        .iter()
        .filter(|g| is_relevant(persona_id, g))
        .cloned()
        .collect();

    ranked.sort_by_key(|g| (g.priority.weight(), Reverse(g.progress_percentage)));
    ranked.reverse();
    ranked.truncate(MAX_RELEVANT_GOALS);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::{Category, Priority};

    fn goal(title: &str, category: Category, priority: Priority, progress: u8) -> Goal {
        let mut goal = Goal::new(title, "", category, priority, None);
        goal.progress_percentage = progress;
        goal
    }

    fn titles(goals: &[Goal]) -> Vec<&str> {
        goals.iter().map(|g| g.title.as_str()).collect()
    }

    #[test]
    fn test_never_more_than_three() {
        let goals: Vec<Goal> = (0..6)
            .map(|i| goal(&format!("g{}", i), Category::Career, Priority::Medium, i * 10))
            .collect();
        assert_eq!(relevant_goals("general", &goals).len(), 3);
        assert!(relevant_goals("general", &[]).is_empty());
    }

    #[test]
    fn test_only_qualifying_goals_are_returned() {
        let mut linked = goal("linked", Category::Career, Priority::Low, 0);
        linked.related_agents = vec!["wellness_coach".to_string()];
        let by_category = goal("cat", Category::MentalHealth, Priority::High, 0);
        let unrelated = goal("other", Category::Cooking, Priority::High, 0);
        let goals = vec![linked, by_category, unrelated];

        assert_eq!(titles(&relevant_goals("wellness_coach", &goals)), vec!["linked"]);
        assert_eq!(titles(&relevant_goals("mental_health", &goals)), vec!["cat"]);
        assert!(relevant_goals("culinary_guide", &goals).is_empty());

        for g in relevant_goals("wellness_coach", &goals) {
            assert!(is_relevant("wellness_coach", &g));
        }
    }

    #[test]
    fn test_general_sees_every_goal() {
        let goals = vec![
            goal("a", Category::Cooking, Priority::Low, 0),
            goal("b", Category::Career, Priority::Low, 0),
        ];
        assert_eq!(relevant_goals("general", &goals).len(), 2);
    }

    #[test]
    fn test_priority_orders_first() {
        let goals = vec![
            goal("low", Category::General, Priority::Low, 90),
            goal("high", Category::General, Priority::High, 5),
            goal("medium", Category::General, Priority::Medium, 50),
        ];
        assert_eq!(titles(&relevant_goals("general", &goals)), vec!["high", "medium", "low"]);
    }

    #[test]
    fn test_within_priority_lower_progress_first_after_reversal() {
        let goals = vec![
            goal("far", Category::General, Priority::High, 80),
            goal("near", Category::General, Priority::High, 20),
            goal("mid", Category::General, Priority::High, 50),
        ];
        assert_eq!(titles(&relevant_goals("general", &goals)), vec!["near", "mid", "far"]);
    }

    #[test]
    fn test_equal_keys_come_out_in_reverse_input_order() {
        let goals = vec![
            goal("first", Category::General, Priority::Medium, 30),
            goal("second", Category::General, Priority::Medium, 30),
        ];
        assert_eq!(titles(&relevant_goals("general", &goals)), vec!["second", "first"]);
    }
}
