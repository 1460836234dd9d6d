//! Goal aggregate: goals with their milestones and daily routines.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

// ============ Enumerations ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    General,
    Education,
    HealthFitness,
    Career,
    Creativity,
    MentalHealth,
    Productivity,
    Relationships,
    Cooking,
    AiMlDatascience,
    EnvironmentalSustainability,
    Accessibility,
    CrisisResponse,
    MultilingualCommunication,
    HomeEnvironment,
    RaisingBabiesPregnancyCare,
    EthicsPhilosophy,
    StrategicAnalysis,
}

impl Category {
    pub const ALL: [Category; 18] = [
        Category::General,
        Category::Education,
        Category::HealthFitness,
        Category::Career,
        Category::Creativity,
        Category::MentalHealth,
        Category::Productivity,
        Category::Relationships,
        Category::Cooking,
        Category::AiMlDatascience,
        Category::EnvironmentalSustainability,
        Category::Accessibility,
        Category::CrisisResponse,
        Category::MultilingualCommunication,
        Category::HomeEnvironment,
        Category::RaisingBabiesPregnancyCare,
        Category::EthicsPhilosophy,
        Category::StrategicAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Education => "education",
            Category::HealthFitness => "health_fitness",
            Category::Career => "career",
            Category::Creativity => "creativity",
            Category::MentalHealth => "mental_health",
            Category::Productivity => "productivity",
            Category::Relationships => "relationships",
            Category::Cooking => "cooking",
            Category::AiMlDatascience => "ai_ml_datascience",
            Category::EnvironmentalSustainability => "environmental_sustainability",
            Category::Accessibility => "accessibility",
            Category::CrisisResponse => "crisis_response",
            Category::MultilingualCommunication => "multilingual_communication",
            Category::HomeEnvironment => "home_environment",
            Category::RaisingBabiesPregnancyCare => "raising_babies_pregnancy_care",
            Category::EthicsPhilosophy => "ethics_philosophy",
            Category::StrategicAnalysis => "strategic_analysis",
        }
    }

    pub fn from_str(s: &str) -> Option<Category> {
        let wanted = s.trim().to_lowercase();
        Category::ALL.iter().copied().find(|c| c.as_str() == wanted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Priority> {
        match s.trim().to_lowercase().as_str() {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }

    /// Ranking weight: high=3, medium=2, low=1.
    pub fn weight(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Paused,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Paused => "paused",
        }
    }

    pub fn from_str(s: &str) -> Option<GoalStatus> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(GoalStatus::Active),
            "completed" => Some(GoalStatus::Completed),
            "paused" => Some(GoalStatus::Paused),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    Pending,
    InProgress,
    Completed,
}

impl MilestoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneStatus::Pending => "pending",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Custom,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Custom => "custom",
        }
    }

    pub fn from_str(s: &str) -> Option<Frequency> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Some(Frequency::Daily),
            "weekly" => Some(Frequency::Weekly),
            "custom" => Some(Frequency::Custom),
            _ => None,
        }
    }
}

// ============ Milestones ============

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Milestone {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: MilestoneStatus,
    #[serde(default)]
    pub target_date: Option<String>,
    #[serde(default)]
    pub completed_date: Option<String>,        // Calendar day, YYYY-MM-DD
    #[serde(default)]
    pub completion_timestamp: Option<String>,  // Full RFC 3339 instant
    #[serde(default)]
    pub progress_percentage: u8,
    #[serde(default)]
    pub notes: String,
}

impl Milestone {
    /// A fresh pending milestone at 0%.
    pub fn new(title: &str, description: &str, target_date: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            status: MilestoneStatus::Pending,
            target_date,
            completed_date: None,
            completion_timestamp: None,
            progress_percentage: 0,
            notes: String::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == MilestoneStatus::Completed
    }

    pub fn complete(&mut self, now: DateTime<Local>) {
        self.status = MilestoneStatus::Completed;
        self.progress_percentage = 100;
        self.completed_date = Some(now.format("%Y-%m-%d").to_string());
        self.completion_timestamp = Some(now.with_timezone(&Utc).to_rfc3339());
    }
}

// ============ Daily Routines ============

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Checkmark {
    pub date: String,       // YYYY-MM-DD
    pub timestamp: String,  // RFC 3339
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyRoutine {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub frequency: Frequency,
    #[serde(default)]
    pub checkmarks: Vec<Checkmark>,
    #[serde(default)]
    pub streak_count: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub last_completed: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl DailyRoutine {
    /// A fresh active routine with zeroed streaks.
    pub fn new(title: &str, description: &str, frequency: Frequency) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            frequency,
            checkmarks: Vec::new(),
            streak_count: 0,
            longest_streak: 0,
            last_completed: None,
            is_active: true,
        }
    }

    /// Record a check-off. The streak only ever grows; a skipped day does not reset it.
    pub fn check(&mut self, now: DateTime<Local>) {
        let timestamp = now.with_timezone(&Utc).to_rfc3339();
        self.checkmarks.push(Checkmark {
            date: now.format("%Y-%m-%d").to_string(),
            timestamp: timestamp.clone(),
        });
        self.last_completed = Some(timestamp);
        self.streak_count += 1;
        if self.streak_count > self.longest_streak {
            self.longest_streak = self.streak_count;
        }
    }
}

// ============ Goals ============

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub status: GoalStatus,
    pub target_date: Option<String>,
    pub created_date: String,
    pub completed_date: Option<String>,
    pub progress_percentage: u8,
    pub milestones: Vec<Milestone>,
    pub daily_routines: Vec<DailyRoutine>,
    pub related_agents: Vec<String>,   // Persona ids, no lifecycle coupling
    pub user_notes: String,
    pub ai_suggestions: Vec<String>,
}

impl Goal {
    /// A new active goal at 0% with no milestones or routines.
    pub fn new(
        title: &str,
        description: &str,
        category: Category,
        priority: Priority,
        target_date: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            category,
            priority,
            status: GoalStatus::Active,
            target_date,
            created_date: Utc::now().to_rfc3339(),
            completed_date: None,
            progress_percentage: 0,
            milestones: Vec::new(),
            daily_routines: Vec::new(),
            related_agents: Vec::new(),
            user_notes: String::new(),
            ai_suggestions: Vec::new(),
        }
    }

    /// Clamp and apply a progress value. Reaching 100 completes the goal; an existing
    /// completion date is kept.
    pub fn set_progress(&mut self, value: i64, now: DateTime<Utc>) {
        self.progress_percentage = clamp_progress(value);
        if self.progress_percentage == 100 {
            self.status = GoalStatus::Completed;
            if self.completed_date.is_none() {
                self.completed_date = Some(now.to_rfc3339());
            }
        }
    }

    pub fn milestone_mut(&mut self, milestone_id: &str) -> Option<&mut Milestone> {
        self.milestones.iter_mut().find(|m| m.id == milestone_id)
    }

    pub fn routine_mut(&mut self, routine_id: &str) -> Option<&mut DailyRoutine> {
        self.daily_routines.iter_mut().find(|r| r.id == routine_id)
    }
}

pub fn clamp_progress(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}
