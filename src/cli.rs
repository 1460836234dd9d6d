//! `goalpost` command line.

use crate::followup::FollowUp;
use crate::goals::Goal;
use crate::orchestrator::{TurnEvent, TurnResult};
use crate::suggestions::GoalProposal;
use crate::AppContext;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "goalpost", version, about = "Goal-aware persona chat on a local model runtime")]
pub struct Cli {
    /// Path to a goalpost.toml
    #[arg(long, global = true, env = "GOALPOST_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive chat session
    Chat {
        /// Persona id to talk to instead of keyword routing
        #[arg(short, long)]
        persona: Option<String>,
    },

    /// Send a single message and print the response
    Ask {
        /// The message
        #[arg(required = true)]
        message: String,

        /// Persona id to talk to instead of keyword routing
        #[arg(short, long)]
        persona: Option<String>,

        /// Image file to attach
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// Manage goals
    #[command(subcommand)]
    Goals(GoalsCommand),

    /// List the available personas
    Personas,
}

#[derive(Subcommand, Debug)]
pub enum GoalsCommand {
    /// List goals with a given status
    List {
        #[arg(short, long, default_value = "active")]
        status: String,
    },

    /// Show one active goal with milestones and routines
    Show { goal_id: String },

    /// Create a goal
    Create {
        #[arg(required = true)]
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        #[arg(short, long, default_value = "general")]
        category: String,

        #[arg(short, long, default_value = "medium")]
        priority: String,

        /// Target date, ISO-8601
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Set progress (clamped to 0-100)
    Progress {
        goal_id: String,
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },

    /// Add a milestone
    Milestone {
        goal_id: String,
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        #[arg(short, long)]
        target: Option<String>,
    },

    /// Mark a milestone completed
    CompleteMilestone { goal_id: String, milestone_id: String },

    /// Add a routine
    Routine {
        goal_id: String,
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        #[arg(short, long, default_value = "daily")]
        frequency: String,
    },

    /// Check off a routine for today
    Check { goal_id: String, routine_id: String },
}

// ============ Output ============

fn print_goal_line(goal: &Goal) {
    println!(
        "{}  {} ({}%)  [{} | {} | {}]",
        goal.id,
        goal.title,
        goal.progress_percentage,
        goal.category.as_str(),
        goal.priority.as_str(),
        goal.status.as_str()
    );
}

fn print_goal_details(goal: &Goal) {
    print_goal_line(goal);
    if !goal.description.is_empty() {
        println!("  {}", goal.description);
    }
    if let Some(target) = &goal.target_date {
        println!("  target: {}", target);
    }
    if !goal.related_agents.is_empty() {
        println!("  personas: {}", goal.related_agents.join(", "));
    }
    for milestone in &goal.milestones {
        let mark = if milestone.is_completed() { "✅" } else { "⏳" };
        println!(
            "  {} {}  {} ({}%, {})",
            mark,
            milestone.id,
            milestone.title,
            milestone.progress_percentage,
            milestone.status.as_str()
        );
    }
    for routine in &goal.daily_routines {
        println!(
            "  🔥 {}  {} [{}] streak {} best {}",
            routine.id,
            routine.title,
            routine.frequency.as_str(),
            routine.streak_count,
            routine.longest_streak
        );
    }
}

fn print_suggestions(suggestions: &[GoalProposal]) {
    if suggestions.is_empty() {
        return;
    }
    println!("\nSuggested goals:");
    for (i, proposal) in suggestions.iter().enumerate() {
        println!("  {}. {}", i + 1, proposal.title);
        for milestone in &proposal.milestones {
            println!("       milestone: {}", milestone);
        }
        for routine in &proposal.routines {
            println!("       routine: {}", routine);
        }
    }
}

fn print_turn_footer(result: &TurnResult) {
    println!();
    eprintln!(
        "[{} {} | {} goals in context | {}ms]",
        result.persona_emoji,
        result.persona_name,
        result.relevant_goals.len(),
        result.response_time_ms
    );
    print_suggestions(&result.suggestions);
}

fn report(ok: bool, what: &str) -> Result<(), String> {
    if ok {
        println!("{}", what);
        Ok(())
    } else {
        Err("No matching active goal, milestone or routine".to_string())
    }
}

fn print_follow_up(follow_up: &FollowUp) {
    let marker = if follow_up.auto { "⏰" } else { "↪" };
    println!(
        "\n{} [{} {}] {}",
        marker,
        follow_up.round,
        follow_up.mode.as_str(),
        follow_up.content
    );
}

/// Streams a turn to the terminal. Thinking goes to stderr, the answer to stdout.
#[derive(Default)]
struct EventPrinter {
    thinking: bool,
}

impl EventPrinter {
    fn handle(&mut self, event: TurnEvent<'_>) {
        match event {
            TurnEvent::Thinking(fragment) => {
                if !self.thinking {
                    eprint!("💭 ");
                    self.thinking = true;
                }
                eprint!("{}", fragment);
            }
            TurnEvent::Text(fragment) => {
                if self.thinking {
                    eprintln!();
                    self.thinking = false;
                }
                print!("{}", fragment);
                let _ = io::stdout().flush();
            }
            TurnEvent::FollowUp(follow_up) => print_follow_up(follow_up),
        }
    }
}

// ============ Commands ============

fn run_goals(ctx: &AppContext, command: GoalsCommand) -> Result<(), String> {
    match command {
        GoalsCommand::List { status } => {
            let goals = crate::get_goals_by_status(ctx, &status)?;
            if goals.is_empty() {
                println!("No {} goals.", status);
            }
            for goal in &goals {
                print_goal_line(goal);
            }
            Ok(())
        }
        GoalsCommand::Show { goal_id } => match crate::get_goal_with_details(ctx, &goal_id)? {
            Some(goal) => {
                print_goal_details(&goal);
                Ok(())
            }
            None => Err(format!("No active goal {}", goal_id)),
        },
        GoalsCommand::Create { title, description, category, priority, target } => {
            let goal = crate::create_goal(ctx, &title, &description, &category, &priority, target)?;
            print_goal_details(&goal);
            Ok(())
        }
        GoalsCommand::Progress { goal_id, value } => {
            let ok = crate::update_goal_progress(ctx, &goal_id, value)?;
            report(ok, "Progress updated.")
        }
        GoalsCommand::Milestone { goal_id, title, description, target } => {
            let ok = crate::add_milestone(ctx, &goal_id, &title, &description, target)?;
            report(ok, "Milestone added.")
        }
        GoalsCommand::CompleteMilestone { goal_id, milestone_id } => {
            let ok = crate::complete_milestone(ctx, &goal_id, &milestone_id)?;
            report(ok, "Milestone completed.")
        }
        GoalsCommand::Routine { goal_id, title, description, frequency } => {
            let ok = crate::add_daily_routine(ctx, &goal_id, &title, &description, &frequency)?;
            report(ok, "Routine added.")
        }
        GoalsCommand::Check { goal_id, routine_id } => {
            let ok = crate::check_daily_routine(ctx, &goal_id, &routine_id)?;
            report(ok, "Routine checked off.")
        }
    }
}

async fn run_ask(
    ctx: &AppContext,
    message: &str,
    persona: Option<String>,
    image: Option<PathBuf>,
) -> Result<(), String> {
    let image = match image {
        Some(path) => Some(
            std::fs::read(&path).map_err(|e| format!("Cannot read {}: {}", path.display(), e))?,
        ),
        None => None,
    };
    let mut printer = EventPrinter::default();
    let result = crate::send_message(ctx, message, persona, image, |event| printer.handle(event)).await?;
    print_turn_footer(&result);
    Ok(())
}

fn prompt_marker() {
    print!("> ");
    let _ = io::stdout().flush();
}

/// Line-oriented chat. `/accept N [category] [priority]` turns the last suggestion N into a
/// goal, `/persona ID` pins a persona, `/auto` returns to routing, `/goals` lists goals and
/// `/stop` silences auto-continuation. While waiting for input the idle thread is checked
/// for auto-continuation on every tick.
async fn run_chat(ctx: &AppContext, mut persona: Option<String>) -> Result<(), String> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let tick_secs = ctx.config.conversation.auto_continue_interval_secs.clamp(1, 15);
    let mut ticker = tokio::time::interval(Duration::from_secs(tick_secs));
    let mut last_suggestions: Vec<GoalProposal> = Vec::new();

    println!("Goalpost chat. /goals, /persona ID, /auto, /accept N, /stop, /quit");
    prompt_marker();
    loop {
        let line = tokio::select! {
            read = lines.next_line() => match read.map_err(|e| e.to_string())? {
                Some(line) => line,
                None => return Ok(()),
            },
            _ = ticker.tick() => {
                let follow_ups = crate::check_auto_continuation(ctx).await?;
                if !follow_ups.is_empty() {
                    follow_ups.iter().for_each(print_follow_up);
                    prompt_marker();
                }
                continue;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            prompt_marker();
            continue;
        }

        let mut words = line.split_whitespace();
        match words.next() {
            Some("/quit") | Some("/exit") => return Ok(()),
            Some("/stop") => {
                crate::stop_auto_continuation(ctx);
                println!("Auto-continuation off until your next message");
            }
            Some("/goals") => {
                for goal in crate::get_active_goals(ctx)? {
                    print_goal_line(&goal);
                }
            }
            Some("/persona") => {
                persona = words.next().map(str::to_string);
                println!("Persona pinned to {}", persona.as_deref().unwrap_or("auto"));
            }
            Some("/auto") => {
                persona = None;
                println!("Keyword routing on");
            }
            Some("/accept") => {
                let index = words.next().and_then(|n| n.parse::<usize>().ok());
                let category = words.next().unwrap_or("general");
                let priority = words.next().unwrap_or("medium");
                match index.and_then(|n| last_suggestions.get(n.wrapping_sub(1))) {
                    Some(proposal) => {
                        match crate::create_goal_from_suggestion(ctx, proposal, category, priority) {
                            Ok(true) => println!("Goal created: {}", proposal.title),
                            Ok(false) => println!("Suggestion has no title"),
                            Err(e) => println!("{}", e),
                        }
                    }
                    None => println!("No such suggestion"),
                }
            }
            _ => {
                let mut printer = EventPrinter::default();
                let result =
                    crate::send_message(ctx, line, persona.clone(), None, |event| printer.handle(event)).await?;
                print_turn_footer(&result);
                last_suggestions = result.suggestions;
            }
        }
        prompt_marker();
    }
}

fn print_personas(ctx: &AppContext) {
    for persona in crate::get_persona_list(ctx) {
        println!(
            "{} {:<28} {:<26} {}",
            persona.emoji,
            persona.id,
            persona.category.as_str(),
            persona.name
        );
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let (ctx, _init) = match crate::init_app(cli.config.as_deref()) {
        Ok(ready) => ready,
        Err(e) => {
            eprintln!("goalpost: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = match cli.command {
        Command::Goals(command) => run_goals(&ctx, command),
        Command::Personas => {
            print_personas(&ctx);
            Ok(())
        }
        Command::Chat { persona } => block_on(run_chat(&ctx, persona)),
        Command::Ask { message, persona, image } => block_on(run_ask(&ctx, &message, persona, image)),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            crate::logging::log_error(None, &e);
            eprintln!("goalpost: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn block_on<F>(future: F) -> Result<(), String>
where
    F: std::future::Future<Output = Result<(), String>>,
{
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Cannot start async runtime: {}", e))?
        .block_on(future)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_goal_subcommands() {
        let cli = Cli::parse_from(["goalpost", "goals", "progress", "abc", "-5"]);
        match cli.command {
            Command::Goals(GoalsCommand::Progress { goal_id, value }) => {
                assert_eq!(goal_id, "abc");
                assert_eq!(value, -5);
            }
            other => panic!("unexpected {:?}", other),
        }

        let cli = Cli::parse_from([
            "goalpost", "goals", "create", "Learn Rust", "-d", "build a CLI tool", "-c", "education", "-p", "high",
        ]);
        match cli.command {
            Command::Goals(GoalsCommand::Create { title, category, priority, target, .. }) => {
                assert_eq!(title, "Learn Rust");
                assert_eq!(category, "education");
                assert_eq!(priority, "high");
                assert!(target.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_printer_closes_thinking_before_text() {
        let mut printer = EventPrinter::default();
        printer.handle(TurnEvent::Thinking("weighing options"));
        assert!(printer.thinking);
        printer.handle(TurnEvent::Text("Here is the plan."));
        assert!(!printer.thinking);
    }

    #[test]
    fn test_parses_ask_with_persona() {
        let cli = Cli::parse_from(["goalpost", "--config", "/tmp/g.toml", "ask", "hi", "--persona", "coding_mentor"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/g.toml")));
        match cli.command {
            Command::Ask { message, persona, image } => {
                assert_eq!(message, "hi");
                assert_eq!(persona.as_deref(), Some("coding_mentor"));
                assert!(image.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
