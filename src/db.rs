use crate::error::{GoalpostError, Result};
use crate::goals::{Category, DailyRoutine, Goal, GoalStatus, Milestone, Priority, clamp_progress};
use crate::logging::{log_error, log_store};
use crate::samples::sample_goals;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Columns of the `goals` table, in their fixed storage order.
const GOAL_COLUMNS: [(&str, &str); 15] = [
    ("id", "TEXT PRIMARY KEY"),
    ("title", "TEXT NOT NULL DEFAULT ''"),
    ("description", "TEXT"),
    ("category", "TEXT"),
    ("priority", "TEXT"),
    ("status", "TEXT"),
    ("target_date", "TEXT"),
    ("created_date", "TEXT"),
    ("completed_date", "TEXT"),
    ("progress_percentage", "INTEGER"),
    ("milestones", "TEXT"),
    ("daily_routines", "TEXT"),
    ("related_agents", "TEXT"),
    ("user_notes", "TEXT"),
    ("ai_suggestions", "TEXT"),
];

const SELECT_GOAL: &str = "SELECT id, title, description, category, priority, status, target_date, \
     created_date, completed_date, progress_percentage, milestones, daily_routines, \
     related_agents, user_notes, ai_suggestions FROM goals";

/// A goals row as stored, before any text is interpreted.
struct GoalRow {
    id: String,
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    priority: Option<String>,
    status: Option<String>,
    target_date: Option<String>,
    created_date: Option<String>,
    completed_date: Option<String>,
    progress_percentage: Option<i64>,
    milestones: Option<String>,
    daily_routines: Option<String>,
    related_agents: Option<String>,
    user_notes: Option<String>,
    ai_suggestions: Option<String>,
}

impl GoalRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(GoalRow {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            category: row.get(3)?,
            priority: row.get(4)?,
            status: row.get(5)?,
            target_date: row.get(6)?,
            created_date: row.get(7)?,
            completed_date: row.get(8)?,
            progress_percentage: row.get(9)?,
            milestones: row.get(10)?,
            daily_routines: row.get(11)?,
            related_agents: row.get(12)?,
            user_notes: row.get(13)?,
            ai_suggestions: row.get(14)?,
        })
    }

    fn into_goal(self) -> Result<Goal> {
        let id = self.id;
        let bad = |reason: String| GoalpostError::RecordDecode {
            id: id.clone(),
            reason,
        };

        let category = self.category.unwrap_or_default();
        let category = Category::from_str(&category)
            .ok_or_else(|| bad(format!("unknown category '{}'", category)))?;
        let priority = self.priority.unwrap_or_default();
        let priority = Priority::from_str(&priority)
            .ok_or_else(|| bad(format!("unknown priority '{}'", priority)))?;
        let status = self.status.unwrap_or_default();
        let status = GoalStatus::from_str(&status)
            .ok_or_else(|| bad(format!("unknown status '{}'", status)))?;

        let milestones: Vec<Milestone> = decode_list(self.milestones.as_deref())
            .map_err(|e| bad(format!("milestones: {}", e)))?;
        let daily_routines: Vec<DailyRoutine> = decode_list(self.daily_routines.as_deref())
            .map_err(|e| bad(format!("daily_routines: {}", e)))?;
        let related_agents: Vec<String> = decode_list(self.related_agents.as_deref())
            .map_err(|e| bad(format!("related_agents: {}", e)))?;
        let ai_suggestions: Vec<String> = decode_list(self.ai_suggestions.as_deref())
            .map_err(|e| bad(format!("ai_suggestions: {}", e)))?;

        Ok(Goal {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            category,
            priority,
            status,
            target_date: self.target_date,
            created_date: self.created_date.unwrap_or_default(),
            completed_date: self.completed_date,
            progress_percentage: clamp_progress(self.progress_percentage.unwrap_or(0)),
            milestones,
            daily_routines,
            related_agents,
            user_notes: self.user_notes.unwrap_or_default(),
            ai_suggestions,
            id,
        })
    }
}

/// NULL and empty text both decode as an empty list.
fn decode_list<T: serde::de::DeserializeOwned>(text: Option<&str>) -> serde_json::Result<Vec<T>> {
    match text.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(json) => serde_json::from_str(json),
    }
}

/// SQLite-backed goal persistence. One connection, serialized behind a mutex.
pub struct GoalStore {
    conn: Mutex<Connection>,
}

impl GoalStore {
    /// Open (or create) the store at `path` and seed sample goals if it has no active goal.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, true)
    }

    /// Open the store, seeding sample goals only when `seed` is set.
    pub fn open_with(path: &Path, seed: bool) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        log_store(None, &format!("Opened goal store at {}", path.display()));
        Self::from_connection(conn, seed)
    }

    /// Empty in-memory store without samples.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, false)
    }

    fn from_connection(conn: Connection, seed: bool) -> Result<Self> {
        ensure_schema(&conn)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        if seed {
            store.seed_samples()?;
        }
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock();
        f(&conn)
    }

    /// Write the three sample goals unless an active goal already exists.
    /// Returns how many goals were written.
    pub fn seed_samples(&self) -> Result<usize> {
        if !self.list_by_status(GoalStatus::Active)?.is_empty() {
            log_store(None, "Active goals present, skipping samples");
            return Ok(0);
        }

        let samples = sample_goals(Utc::now());
        for goal in &samples {
            self.save(goal)?;
        }
        log_store(None, &format!("Seeded {} sample goals", samples.len()));
        Ok(samples.len())
    }

    /// Insert or replace the whole goal record by id.
    pub fn save(&self, goal: &Goal) -> Result<()> {
        let milestones = serde_json::to_string(&goal.milestones)?;
        let daily_routines = serde_json::to_string(&goal.daily_routines)?;
        let related_agents = serde_json::to_string(&goal.related_agents)?;
        let ai_suggestions = serde_json::to_string(&goal.ai_suggestions)?;

        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO goals (id, title, description, category, priority, status, target_date, created_date, completed_date, progress_percentage, milestones, daily_routines, related_agents, user_notes, ai_suggestions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    goal.id,
                    goal.title,
                    goal.description,
                    goal.category.as_str(),
                    goal.priority.as_str(),
                    goal.status.as_str(),
                    goal.target_date,
                    goal.created_date,
                    goal.completed_date,
                    goal.progress_percentage,
                    milestones,
                    daily_routines,
                    related_agents,
                    goal.user_notes,
                    ai_suggestions
                ],
            )?;
            Ok(())
        })
    }

    /// Goals with `status`, in storage order. Rows that fail to decode are logged and skipped.
    pub fn list_by_status(&self, status: GoalStatus) -> Result<Vec<Goal>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!("{} WHERE status = ?1 ORDER BY rowid", SELECT_GOAL))?;
            let rows = stmt.query_map([status.as_str()], GoalRow::from_row)?;

            let mut goals = Vec::new();
            for row in rows {
                let decoded = row
                    .map_err(GoalpostError::from)
                    .and_then(GoalRow::into_goal);
                match decoded {
                    Ok(goal) => goals.push(goal),
                    Err(e) => log_error(None, &format!("Skipping goal record: {}", e)),
                }
            }
            Ok(goals)
        })
    }

    /// Any goal by id, whatever its status.
    pub fn get(&self, goal_id: &str) -> Result<Option<Goal>> {
        let row = self.with_connection(|conn| {
            Ok(conn
                .query_row(
                    &format!("{} WHERE id = ?1", SELECT_GOAL),
                    [goal_id],
                    GoalRow::from_row,
                )
                .optional()?)
        })?;
        row.map(GoalRow::into_goal).transpose()
    }

    pub fn count(&self) -> Result<i64> {
        self.with_connection(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM goals", [], |row| row.get(0))?)
        })
    }
}

/// Create the goals table, then add any column an older file is missing.
fn ensure_schema(conn: &Connection) -> Result<()> {
    let columns = GOAL_COLUMNS
        .iter()
        .map(|(name, ty)| format!("{} {}", name, ty))
        .collect::<Vec<_>>()
        .join(",\n            ");
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS goals (\n            {}\n        );",
        columns
    ))?;

    for (name, ty) in GOAL_COLUMNS.iter().skip(1) {
        let has_column: bool = conn.query_row(
            "SELECT COUNT(*) FROM pragma_table_info('goals') WHERE name = ?1",
            [name],
            |row| Ok(row.get::<_, i64>(0)? > 0),
        )?;

        if !has_column {
            // SQLite refuses NOT NULL without a default; every added column is nullable
            let added_type = ty.split_whitespace().next().unwrap_or("TEXT");
            conn.execute(&format!("ALTER TABLE goals ADD COLUMN {} {}", name, added_type), [])
                .map_err(|_| GoalpostError::SchemaMismatch {
                    column: name.to_string(),
                })?;
            log_store(None, &format!("Migrated goals table: added column {}", name));
        }
    }

    // The primary key cannot be added after the fact
    let has_id: bool = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info('goals') WHERE name = 'id'",
        [],
        |row| Ok(row.get::<_, i64>(0)? > 0),
    )?;
    if !has_id {
        return Err(GoalpostError::SchemaMismatch {
            column: "id".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::Frequency;

    fn goal_with_children() -> Goal {
        let mut goal = Goal::new("Learn Rust", "build a CLI tool", Category::Education, Priority::High, None);
        goal.milestones.push(Milestone::new("Finish the book", "", None));
        goal.daily_routines.push(DailyRoutine::new("Read a chapter", "", Frequency::Daily));
        goal.related_agents = vec!["coding_mentor".to_string()];
        goal.ai_suggestions = vec!["Try Advent of Code".to_string()];
        goal
    }

    #[test]
    fn test_save_and_list_round_trip() {
        let store = GoalStore::in_memory().unwrap();
        let goal = goal_with_children();
        store.save(&goal).unwrap();

        let active = store.list_by_status(GoalStatus::Active).unwrap();
        assert_eq!(active, vec![goal.clone()]);
        assert!(store.list_by_status(GoalStatus::Completed).unwrap().is_empty());
        assert_eq!(store.get(&goal.id).unwrap(), Some(goal));
    }

    #[test]
    fn test_save_replaces_by_id() {
        let store = GoalStore::in_memory().unwrap();
        let mut goal = goal_with_children();
        store.save(&goal).unwrap();

        goal.set_progress(100, Utc::now());
        store.save(&goal).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert!(store.list_by_status(GoalStatus::Active).unwrap().is_empty());
        let done = store.list_by_status(GoalStatus::Completed).unwrap();
        assert_eq!(done[0].progress_percentage, 100);
    }

    #[test]
    fn test_corrupt_row_is_skipped() {
        let store = GoalStore::in_memory().unwrap();
        let good = goal_with_children();
        store.save(&good).unwrap();

        store
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO goals (id, title, category, priority, status, progress_percentage, milestones)
                     VALUES ('broken', 'Broken', 'general', 'low', 'active', 10, '{not json')",
                    [],
                )?;
                conn.execute(
                    "INSERT INTO goals (id, title, category, priority, status, progress_percentage)
                     VALUES ('odd', 'Odd', 'astrology', 'low', 'active', 10)",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        let active = store.list_by_status(GoalStatus::Active).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, good.id);
        assert!(matches!(
            store.get("broken"),
            Err(GoalpostError::RecordDecode { .. })
        ));
    }

    #[test]
    fn test_out_of_range_progress_is_clamped_on_read() {
        let store = GoalStore::in_memory().unwrap();
        store
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO goals (id, title, category, priority, status, progress_percentage)
                     VALUES ('g', 'G', 'career', 'medium', 'active', 180)",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        let goal = store.get("g").unwrap().unwrap();
        assert_eq!(goal.progress_percentage, 100);
        assert!(goal.milestones.is_empty());
    }

    #[test]
    fn test_seeding_creates_three_rich_goals() {
        let store = GoalStore::in_memory().unwrap();
        assert_eq!(store.seed_samples().unwrap(), 3);

        let active = store.list_by_status(GoalStatus::Active).unwrap();
        assert_eq!(active.len(), 3);
        for goal in &active {
            assert!(goal.milestones.len() >= 2);
            assert!(goal.daily_routines.len() >= 2);
        }

        // Already seeded
        assert_eq!(store.seed_samples().unwrap(), 0);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_reopen_keeps_goals_and_does_not_reseed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("goals.db");

        let first_ids: Vec<String> = {
            let store = GoalStore::open(&path).unwrap();
            store
                .list_by_status(GoalStatus::Active)
                .unwrap()
                .into_iter()
                .map(|g| g.id)
                .collect()
        };
        assert_eq!(first_ids.len(), 3);

        let store = GoalStore::open(&path).unwrap();
        let ids: Vec<String> = store
            .list_by_status(GoalStatus::Active)
            .unwrap()
            .into_iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids, first_ids);
    }

    #[test]
    fn test_open_without_samples_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = GoalStore::open_with(&dir.path().join("goals.db"), false).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_legacy_table_gains_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE goals (id TEXT PRIMARY KEY, title TEXT NOT NULL, category TEXT, priority TEXT, status TEXT, progress_percentage INTEGER);
                 INSERT INTO goals VALUES ('old', 'Old goal', 'cooking', 'low', 'active', 40);",
            )
            .unwrap();
        }

        let store = GoalStore::open_with(&path, false).unwrap();
        let goal = store.get("old").unwrap().unwrap();
        assert_eq!(goal.category, Category::Cooking);
        assert_eq!(goal.progress_percentage, 40);
        assert!(goal.related_agents.is_empty());

        // New writes use the added columns
        let mut updated = goal.clone();
        updated.user_notes = "migrated".to_string();
        store.save(&updated).unwrap();
        assert_eq!(store.get("old").unwrap().unwrap().user_notes, "migrated");
    }

    #[test]
    fn test_unopenable_path_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GoalStore::open_with(dir.path(), false).err().unwrap();
        assert!(matches!(err, GoalpostError::Storage(_)));
    }

    #[test]
    fn test_table_without_id_is_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyless.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE goals (title TEXT, status TEXT);").unwrap();
        }

        match GoalStore::open_with(&path, false) {
            Err(GoalpostError::SchemaMismatch { column }) => assert_eq!(column, "id"),
            Err(other) => panic!("unexpected error {}", other),
            Ok(_) => panic!("store opened without an id column"),
        }
    }

    #[test]
    fn test_failed_save_surfaces_from_mutators() {
        use crate::manager::GoalsManager;
        use crate::personas::PersonaRegistry;
        use crate::suggestions::GoalProposal;
        use std::sync::Arc;

        let store = GoalStore::in_memory().unwrap();
        let goal = goal_with_children();
        store.save(&goal).unwrap();
        store
            .with_connection(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_writes BEFORE INSERT ON goals
                     BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
                )?;
                Ok(())
            })
            .unwrap();

        let manager = GoalsManager::new(store, Arc::new(PersonaRegistry::builtin()));
        assert!(matches!(
            manager.update_progress(&goal.id, 50),
            Err(GoalpostError::Storage(_))
        ));
        assert!(manager.add_milestone(&goal.id, "Ship it", "", None).is_err());

        let proposal = GoalProposal {
            title: "Contribute to an open source crate".to_string(),
            milestones: vec!["Land a first PR".to_string()],
            routines: vec!["Read issues for 15 minutes".to_string()],
        };
        assert!(manager
            .create_goal_from_suggestion(&proposal, Category::Career, Priority::Low)
            .is_err());

        // Nothing partial reached the table
        assert_eq!(manager.store().count().unwrap(), 1);
        assert_eq!(manager.store().get(&goal.id).unwrap(), Some(goal));
    }
}
