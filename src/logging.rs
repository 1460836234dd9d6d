//! Structured logging module for Goalpost
//!
//! Writes daily log files to the configured log directory with categories:
//! - GOALS: Goal creation and mutation
//! - ROUTING: Persona selection decisions
//! - STORE: Goal store lifecycle, seeding, skipped records
//! - GENERATION: Local model runtime calls
//! - ERROR: Errors and crashes

use chrono::{Local, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use once_cell::sync::Lazy;

/// Log categories for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Goals,      // Goal creation, progress, milestones, routines
    Routing,    // Persona selection
    Store,      // Schema, seeding, decode failures
    Generation, // Model runtime requests
    Error,      // Errors and crashes
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Goals => "GOALS",
            LogCategory::Routing => "ROUTING",
            LogCategory::Store => "STORE",
            LogCategory::Generation => "GENERATION",
            LogCategory::Error => "ERROR",
        }
    }
}

struct LogTarget {
    dir: PathBuf,
    echo: bool,
}

/// Where lines go once `init_logging` has run. Before that, lines only reach stderr.
static LOG_TARGET: Lazy<Mutex<Option<LogTarget>>> = Lazy::new(|| Mutex::new(None));

fn log_file_path(dir: &Path) -> PathBuf {
    let today = Local::now().format("%Y-%m-%d").to_string();
    dir.join(format!("goalpost-{}.log", today))
}

/// Initialize the logging system - creates log directory if needed
pub fn init_logging(dir: &Path, echo: bool) -> std::io::Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    if let Ok(mut target) = LOG_TARGET.lock() {
        *target = Some(LogTarget {
            dir: dir.to_path_buf(),
            echo,
        });
    }

    log(LogCategory::Store, None, "Goalpost logging initialized");
    Ok(())
}

/// Format one log line. `context` is usually a goal or persona id.
pub fn format_line(category: LogCategory, context: Option<&str>, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let context = context
        .map(|id| format!("{} | ", &id[..id.char_indices().nth(8).map_or(id.len(), |(i, _)| i)]))
        .unwrap_or_default();

    format!("[{}] [{}] {}{}\n", timestamp, category.as_str(), context, message)
}

/// Log a message with category and optional goal/persona context
pub fn log(category: LogCategory, context: Option<&str>, message: &str) {
    let line = format_line(category, context, message);

    let target = match LOG_TARGET.lock() {
        Ok(guard) => guard.as_ref().map(|t| (t.dir.clone(), t.echo)),
        Err(_) => None,
    };

    match target {
        Some((dir, echo)) => {
            if echo {
                eprint!("{}", line);
            }
            if let Ok(mut file) = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file_path(&dir))
            {
                let _ = file.write_all(line.as_bytes());
            }
        }
        None => {
            if category == LogCategory::Error {
                eprint!("{}", line);
            }
        }
    }
}

/// Log a goal mutation
pub fn log_goals(goal_id: Option<&str>, message: &str) {
    log(LogCategory::Goals, goal_id, message);
}

/// Log a routing decision (which persona, why)
pub fn log_routing(persona_id: Option<&str>, message: &str) {
    log(LogCategory::Routing, persona_id, message);
}

/// Log a store lifecycle event
pub fn log_store(goal_id: Option<&str>, message: &str) {
    log(LogCategory::Store, goal_id, message);
}

/// Log a model runtime event
pub fn log_generation(persona_id: Option<&str>, message: &str) {
    log(LogCategory::Generation, persona_id, message);
}

/// Log an error
pub fn log_error(context: Option<&str>, message: &str) {
    log(LogCategory::Error, context, message);
}

/// Clean up old log files (keep last `retention_days` days)
pub fn cleanup_old_logs(dir: &Path, retention_days: i64) -> std::io::Result<usize> {
    let mut deleted = 0;

    if !dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - chrono::Duration::days(retention_days);

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.starts_with("goalpost-") && n.ends_with(".log"));
        if !is_log {
            continue;
        }

        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            let modified_time: chrono::DateTime<Utc> = modified.into();
            if modified_time < cutoff && fs::remove_file(&path).is_ok() {
                deleted += 1;
            }
        }
    }

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line_truncates_context() {
        let line = format_line(
            LogCategory::Goals,
            Some("0b5e2c4a-8d3f-4a1e-9c0b-1234567890ab"),
            "Progress set to 40",
        );
        assert!(line.contains("[GOALS] 0b5e2c4a | Progress set to 40"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_format_line_short_context_and_none() {
        let line = format_line(LogCategory::Routing, Some("general"), "fallback");
        assert!(line.contains("[ROUTING] general | fallback"));

        let line = format_line(LogCategory::Store, None, "opened");
        assert!(line.contains("[STORE] opened"));
    }

    #[test]
    fn test_cleanup_keeps_recent_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("goalpost-2020-01-01.log"), "x").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        // Everything was just written, so nothing is past a 7 day window
        assert_eq!(cleanup_old_logs(dir.path(), 7).unwrap(), 0);
        // A negative window puts the cutoff in the future
        assert_eq!(cleanup_old_logs(dir.path(), -1).unwrap(), 1);
        assert!(dir.path().join("notes.txt").exists());
    }
}
