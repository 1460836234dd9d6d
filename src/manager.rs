//! Goal mutations.
//!
//! Every operation that targets a goal looks it up among the active goals. An unknown goal,
//! milestone or routine id is reported as `Ok(false)` and nothing is written; a storage
//! failure comes back as `Err`.

use crate::db::GoalStore;
use crate::error::Result;
use crate::goals::{Category, DailyRoutine, Frequency, Goal, GoalStatus, Milestone, Priority};
use crate::logging::log_goals;
use crate::personas::PersonaRegistry;
use crate::suggestions::GoalProposal;
use chrono::{DateTime, Local, Utc};
use std::sync::Arc;

/// Most personas linked to one goal.
pub const MAX_RELATED_PERSONAS: usize = 5;

/// Keyword hits a persona needs in a goal's text to be linked without a category match.
const RELATED_KEYWORD_HITS: usize = 2;

pub struct GoalsManager {
    store: GoalStore,
    registry: Arc<PersonaRegistry>,
}

impl GoalsManager {
    pub fn new(store: GoalStore, registry: Arc<PersonaRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> &GoalStore {
        &self.store
    }

    /// Personas that can help with a goal: every persona in `category`, then any other
    /// persona with at least two keywords in `text`. Capped at five, registry order.
    pub fn suggest_related_personas(&self, category: Category, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let mut related: Vec<String> = self
            .registry
            .iter()
            .filter(|p| p.category == category)
            .map(|p| p.id.clone())
            .collect();

        for persona in self.registry.iter() {
            if related.contains(&persona.id) {
                continue;
            }
            if persona.keyword_hits(&lowered) >= RELATED_KEYWORD_HITS {
                related.push(persona.id.clone());
            }
        }

        related.truncate(MAX_RELATED_PERSONAS);
        related
    }

    fn new_goal(
        &self,
        title: &str,
        description: &str,
        category: Category,
        priority: Priority,
        target_date: Option<String>,
    ) -> Goal {
        let mut goal = Goal::new(title, description, category, priority, target_date);
        goal.related_agents =
            self.suggest_related_personas(category, &format!("{} {}", description, title));
        goal
    }

    pub fn create_goal(
        &self,
        title: &str,
        description: &str,
        category: Category,
        priority: Priority,
        target_date: Option<String>,
    ) -> Result<Goal> {
        let goal = self.new_goal(title, description, category, priority, target_date);
        self.store.save(&goal)?;

        log_goals(
            Some(&goal.id),
            &format!(
                "Created '{}' ({}, {}) related to [{}]",
                goal.title,
                category.as_str(),
                priority.as_str(),
                goal.related_agents.join(", ")
            ),
        );
        Ok(goal)
    }

    pub fn get_active_goals(&self) -> Result<Vec<Goal>> {
        self.store.list_by_status(GoalStatus::Active)
    }

    fn find_active(&self, goal_id: &str) -> Result<Option<Goal>> {
        Ok(self
            .get_active_goals()?
            .into_iter()
            .find(|g| g.id == goal_id))
    }

    /// Look up an active goal, apply `change`, and save when it reports success.
    fn mutate<F>(&self, goal_id: &str, change: F) -> Result<bool>
    where
        F: FnOnce(&mut Goal) -> bool,
    {
        let Some(mut goal) = self.find_active(goal_id)? else {
            log_goals(Some(goal_id), "No active goal with this id");
            return Ok(false);
        };

        if !change(&mut goal) {
            return Ok(false);
        }
        self.store.save(&goal)?;
        Ok(true)
    }

    /// Set progress, clamped to 0..=100. Reaching 100 completes the goal.
    pub fn update_progress(&self, goal_id: &str, progress: i64) -> Result<bool> {
        self.update_progress_at(goal_id, progress, Utc::now())
    }

    pub fn update_progress_at(&self, goal_id: &str, progress: i64, now: DateTime<Utc>) -> Result<bool> {
        let updated = self.mutate(goal_id, |goal| {
            goal.set_progress(progress, now);
            true
        })?;
        if updated {
            log_goals(Some(goal_id), &format!("Progress set from {}", progress));
        }
        Ok(updated)
    }

    pub fn add_milestone(
        &self,
        goal_id: &str,
        title: &str,
        description: &str,
        target_date: Option<String>,
    ) -> Result<bool> {
        let added = self.mutate(goal_id, |goal| {
            goal.milestones.push(Milestone::new(title, description, target_date));
            true
        })?;
        if added {
            log_goals(Some(goal_id), &format!("Milestone added: {}", title));
        }
        Ok(added)
    }

    pub fn add_daily_routine(
        &self,
        goal_id: &str,
        title: &str,
        description: &str,
        frequency: Frequency,
    ) -> Result<bool> {
        let added = self.mutate(goal_id, |goal| {
            goal.daily_routines
                .push(DailyRoutine::new(title, description, frequency));
            true
        })?;
        if added {
            log_goals(
                Some(goal_id),
                &format!("Routine added: {} ({})", title, frequency.as_str()),
            );
        }
        Ok(added)
    }

    pub fn complete_milestone(&self, goal_id: &str, milestone_id: &str) -> Result<bool> {
        self.complete_milestone_at(goal_id, milestone_id, Local::now())
    }

    pub fn complete_milestone_at(
        &self,
        goal_id: &str,
        milestone_id: &str,
        now: DateTime<Local>,
    ) -> Result<bool> {
        let completed = self.mutate(goal_id, |goal| match goal.milestone_mut(milestone_id) {
            Some(milestone) => {
                milestone.complete(now);
                true
            }
            None => false,
        })?;
        if completed {
            log_goals(Some(goal_id), &format!("Milestone {} completed", milestone_id));
        }
        Ok(completed)
    }

    pub fn check_daily_routine(&self, goal_id: &str, routine_id: &str) -> Result<bool> {
        self.check_daily_routine_at(goal_id, routine_id, Local::now())
    }

    pub fn check_daily_routine_at(
        &self,
        goal_id: &str,
        routine_id: &str,
        now: DateTime<Local>,
    ) -> Result<bool> {
        let mut streak = 0;
        let checked = self.mutate(goal_id, |goal| match goal.routine_mut(routine_id) {
            Some(routine) => {
                routine.check(now);
                streak = routine.streak_count;
                true
            }
            None => false,
        })?;
        if checked {
            log_goals(
                Some(goal_id),
                &format!("Routine {} checked, streak {}", routine_id, streak),
            );
        }
        Ok(checked)
    }

    /// Create a goal from an accepted proposal with its milestones and routines.
    /// A blank title creates nothing.
    pub fn create_goal_from_suggestion(
        &self,
        proposal: &GoalProposal,
        category: Category,
        priority: Priority,
    ) -> Result<bool> {
        let title = proposal.title.trim();
        if title.is_empty() {
            return Ok(false);
        }

        let mut goal = self.new_goal(title, "", category, priority, None);
        for milestone in &proposal.milestones {
            goal.milestones.push(Milestone::new(
                milestone,
                &format!("Milestone for {}", title),
                None,
            ));
        }
        for routine in &proposal.routines {
            goal.daily_routines.push(DailyRoutine::new(
                routine,
                &format!("Daily routine for {}", title),
                Frequency::Daily,
            ));
        }
        self.store.save(&goal)?;

        log_goals(
            Some(&goal.id),
            &format!(
                "Created '{}' from a suggestion with {} milestones and {} routines",
                goal.title,
                goal.milestones.len(),
                goal.daily_routines.len()
            ),
        );
        Ok(true)
    }

    /// The full active goal with milestones and routines, if any.
    pub fn get_goal_with_details(&self, goal_id: &str) -> Result<Option<Goal>> {
        self.find_active(goal_id)
    }
}
