pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod followup;
pub mod goals;
pub mod logging;
pub mod manager;
pub mod memory;
pub mod ollama;
pub mod orchestrator;
pub mod personas;
pub mod prompt;
pub mod ranker;
pub mod router;
pub mod samples;
pub mod suggestions;
pub mod vision;

use config::AppConfig;
use db::GoalStore;
use error::Result as GoalpostResult;
use followup::FollowUp;
use goals::{Category, Frequency, Goal, GoalStatus, Priority};
use manager::GoalsManager;
use orchestrator::{Orchestrator, TurnEvent, TurnRequest, TurnResult};
use personas::{PersonaRegistry, PersonaSummary};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use suggestions::GoalProposal;

// ============ App Context ============

/// Everything a command needs, built once at startup and passed to each call.
pub struct AppContext {
    pub config: AppConfig,
    pub registry: Arc<PersonaRegistry>,
    pub goals: GoalsManager,
    pub orchestrator: Orchestrator,
}

impl AppContext {
    /// Open the goal store named by `config` and wire the collaborators.
    pub fn new(config: AppConfig) -> GoalpostResult<Self> {
        let store = GoalStore::open_with(&config.database_path(), config.seed_samples)?;
        Ok(Self::with_store(config, store))
    }

    /// Context over an in-memory store, seeded when the config says so.
    pub fn in_memory(config: AppConfig) -> GoalpostResult<Self> {
        let store = GoalStore::in_memory()?;
        if config.seed_samples {
            store.seed_samples()?;
        }
        Ok(Self::with_store(config, store))
    }

    fn with_store(config: AppConfig, store: GoalStore) -> Self {
        let registry = Arc::new(PersonaRegistry::builtin());
        let goals = GoalsManager::new(store, registry.clone());
        let orchestrator = Orchestrator::new(&config.ollama, &config.conversation, registry.clone());
        Self {
            config,
            registry,
            goals,
            orchestrator,
        }
    }
}

// ============ App Initialization ============

#[derive(Debug, Serialize, Deserialize)]
pub struct InitResult {
    pub status: String,            // "ready"
    pub database: String,
    pub active_goals: usize,
    pub personas: usize,
    pub removed_logs: usize,
}

/// Load config, start logging, open the store. A store that cannot be opened is fatal.
pub fn init_app(config_path: Option<&Path>) -> Result<(AppContext, InitResult), String> {
    let config = AppConfig::load(config_path).map_err(|e| e.to_string())?;

    if let Err(e) = logging::init_logging(&config.logging.dir, config.logging.echo) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    // Clean up old log files
    let removed_logs = logging::cleanup_old_logs(&config.logging.dir, config.logging.retention_days)
        .unwrap_or_else(|e| {
            logging::log_error(None, &format!("Log cleanup failed: {}", e));
            0
        });

    let ctx = AppContext::new(config).map_err(|e| {
        logging::log_error(None, &format!("Goal store unavailable: {}", e));
        e.to_string()
    })?;

    let active_goals = ctx.goals.get_active_goals().map_err(|e| e.to_string())?.len();
    let result = InitResult {
        status: "ready".to_string(),
        database: ctx.config.database_path().display().to_string(),
        active_goals,
        personas: ctx.registry.len(),
        removed_logs,
    };
    logging::log_store(
        None,
        &format!("Ready with {} active goals, {} personas", result.active_goals, result.personas),
    );
    Ok((ctx, result))
}

// ============ Chat ============

/// One chat turn. Thinking, response fragments and follow-ups reach `on_event` as they arrive.
pub async fn send_message<F>(
    ctx: &AppContext,
    message: &str,
    persona_id: Option<String>,
    image: Option<Vec<u8>>,
    on_event: F,
) -> Result<TurnResult, String>
where
    F: FnMut(TurnEvent<'_>),
{
    if message.trim().is_empty() && image.is_none() {
        return Err("Message is empty".to_string());
    }
    let request = TurnRequest::new(message)
        .with_persona(persona_id)
        .with_image(image);
    ctx.orchestrator
        .process_message(&ctx.goals, &request, on_event)
        .await
        .map_err(|e| e.to_string())
}

/// Proactive rounds for an idle thread, when auto-continuation is on and due.
pub async fn check_auto_continuation(ctx: &AppContext) -> Result<Vec<FollowUp>, String> {
    ctx.orchestrator
        .check_auto_continuation(&ctx.goals)
        .await
        .map_err(|e| e.to_string())
}

pub fn stop_auto_continuation(ctx: &AppContext) {
    ctx.orchestrator.stop_continuation();
}

// ============ Goals ============

fn parse_category(value: &str) -> Result<Category, String> {
    Category::from_str(value).ok_or_else(|| format!("Unknown category '{}'", value))
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    Priority::from_str(value).ok_or_else(|| format!("Unknown priority '{}'", value))
}

fn parse_frequency(value: &str) -> Result<Frequency, String> {
    Frequency::from_str(value).ok_or_else(|| format!("Unknown frequency '{}'", value))
}

pub fn get_active_goals(ctx: &AppContext) -> Result<Vec<Goal>, String> {
    ctx.goals.get_active_goals().map_err(|e| e.to_string())
}

pub fn get_goals_by_status(ctx: &AppContext, status: &str) -> Result<Vec<Goal>, String> {
    let status = GoalStatus::from_str(status).ok_or_else(|| format!("Unknown status '{}'", status))?;
    ctx.goals.store().list_by_status(status).map_err(|e| e.to_string())
}

pub fn create_goal(
    ctx: &AppContext,
    title: &str,
    description: &str,
    category: &str,
    priority: &str,
    target_date: Option<String>,
) -> Result<Goal, String> {
    if title.trim().is_empty() {
        return Err("Goal title is empty".to_string());
    }
    let category = parse_category(category)?;
    let priority = parse_priority(priority)?;
    ctx.goals
        .create_goal(title.trim(), description, category, priority, target_date)
        .map_err(|e| e.to_string())
}

pub fn create_goal_from_suggestion(
    ctx: &AppContext,
    proposal: &GoalProposal,
    category: &str,
    priority: &str,
) -> Result<bool, String> {
    let category = parse_category(category)?;
    let priority = parse_priority(priority)?;
    ctx.goals
        .create_goal_from_suggestion(proposal, category, priority)
        .map_err(|e| e.to_string())
}

pub fn update_goal_progress(ctx: &AppContext, goal_id: &str, progress: i64) -> Result<bool, String> {
    ctx.goals.update_progress(goal_id, progress).map_err(|e| e.to_string())
}

pub fn add_milestone(
    ctx: &AppContext,
    goal_id: &str,
    title: &str,
    description: &str,
    target_date: Option<String>,
) -> Result<bool, String> {
    ctx.goals
        .add_milestone(goal_id, title, description, target_date)
        .map_err(|e| e.to_string())
}

pub fn add_daily_routine(
    ctx: &AppContext,
    goal_id: &str,
    title: &str,
    description: &str,
    frequency: &str,
) -> Result<bool, String> {
    let frequency = parse_frequency(frequency)?;
    ctx.goals
        .add_daily_routine(goal_id, title, description, frequency)
        .map_err(|e| e.to_string())
}

pub fn complete_milestone(ctx: &AppContext, goal_id: &str, milestone_id: &str) -> Result<bool, String> {
    ctx.goals
        .complete_milestone(goal_id, milestone_id)
        .map_err(|e| e.to_string())
}

pub fn check_daily_routine(ctx: &AppContext, goal_id: &str, routine_id: &str) -> Result<bool, String> {
    ctx.goals
        .check_daily_routine(goal_id, routine_id)
        .map_err(|e| e.to_string())
}

pub fn get_goal_with_details(ctx: &AppContext, goal_id: &str) -> Result<Option<Goal>, String> {
    ctx.goals.get_goal_with_details(goal_id).map_err(|e| e.to_string())
}

// ============ Personas ============

pub fn get_persona_list(ctx: &AppContext) -> Vec<PersonaSummary> {
    ctx.registry.list()
}

/// Entry point of the `goalpost` binary.
pub fn run() -> std::process::ExitCode {
    cli::run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(seed: bool) -> AppContext {
        let mut config = AppConfig::default();
        config.seed_samples = seed;
        config.ollama.base_url = "http://127.0.0.1:9".to_string();
        config.ollama.request_timeout_secs = 2;
        AppContext::in_memory(config).unwrap()
    }

    #[test]
    fn test_seeded_context_has_three_goals() {
        let ctx = context(true);
        assert_eq!(get_active_goals(&ctx).unwrap().len(), 3);
        assert_eq!(get_persona_list(&ctx).len(), 20);
    }

    #[test]
    fn test_commands_validate_enum_strings() {
        let ctx = context(false);
        let err = create_goal(&ctx, "Bake bread", "", "baking", "high", None).unwrap_err();
        assert!(err.contains("Unknown category"));
        let err = create_goal(&ctx, "Bake bread", "", "cooking", "urgent", None).unwrap_err();
        assert!(err.contains("Unknown priority"));
        assert!(create_goal(&ctx, "  ", "", "cooking", "high", None).is_err());
        assert!(get_goals_by_status(&ctx, "archived").is_err());
    }

    #[test]
    fn test_goal_lifecycle_through_commands() {
        let ctx = context(false);
        let goal = create_goal(&ctx, "Bake bread weekly", "sourdough", "cooking", "medium", None).unwrap();
        assert!(goal.related_agents.contains(&"culinary_guide".to_string()));

        assert!(add_milestone(&ctx, &goal.id, "First loaf", "", None).unwrap());
        assert!(add_daily_routine(&ctx, &goal.id, "Feed starter", "", "daily").unwrap());
        assert!(add_daily_routine(&ctx, &goal.id, "Feed starter", "", "hourly").is_err());

        let detailed = get_goal_with_details(&ctx, &goal.id).unwrap().unwrap();
        let milestone_id = detailed.milestones[0].id.clone();
        let routine_id = detailed.daily_routines[0].id.clone();

        assert!(complete_milestone(&ctx, &goal.id, &milestone_id).unwrap());
        assert!(check_daily_routine(&ctx, &goal.id, &routine_id).unwrap());
        assert!(update_goal_progress(&ctx, &goal.id, 100).unwrap());

        assert!(get_active_goals(&ctx).unwrap().is_empty());
        let completed = get_goals_by_status(&ctx, "completed").unwrap();
        assert_eq!(completed.len(), 1);
        assert!(completed[0].milestones[0].is_completed());
        assert_eq!(completed[0].daily_routines[0].streak_count, 1);
    }

    #[test]
    fn test_accept_suggestion_command() {
        let ctx = context(false);
        let proposal = GoalProposal {
            title: "Learn conversational Spanish".to_string(),
            milestones: vec!["Hold a 10 minute conversation".to_string()],
            routines: vec!["Practice vocabulary for 15 minutes".to_string()],
        };
        assert!(create_goal_from_suggestion(&ctx, &proposal, "multilingual_communication", "high").unwrap());
        let goals = get_active_goals(&ctx).unwrap();
        assert_eq!(goals[0].priority, Priority::High);
        assert_eq!(goals[0].daily_routines.len(), 1);
    }

    #[test]
    fn test_unopenable_database_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("goals.db")).unwrap();

        let mut config = AppConfig::default();
        config.data_dir = dir.path().to_path_buf();
        assert!(AppContext::new(config).is_err());
    }

    #[tokio::test]
    async fn test_auto_continuation_is_idle_by_default() {
        let ctx = context(true);
        assert!(check_auto_continuation(&ctx).await.unwrap().is_empty());
        stop_auto_continuation(&ctx);
    }

    #[tokio::test]
    async fn test_send_message_survives_missing_runtime() {
        let ctx = context(true);
        assert!(send_message(&ctx, "   ", None, None, |_| {}).await.is_err());

        let result = send_message(&ctx, "help me sleep better", Some("wellness_coach".to_string()), None, |_| {})
            .await
            .unwrap();
        assert_eq!(result.persona_id, "wellness_coach");
        assert!(result.generation_error.is_some());
        assert_eq!(result.relevant_goals.len(), 1);
    }
}
