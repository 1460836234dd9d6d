//! Starter goals written into an empty store.

use crate::goals::{Category, DailyRoutine, Frequency, Goal, Milestone, MilestoneStatus, Priority};
use chrono::{DateTime, Duration, Utc};

fn days_from(now: DateTime<Utc>, days: i64) -> Option<String> {
    Some((now + Duration::days(days)).to_rfc3339())
}

fn milestone(now: DateTime<Utc>, title: &str, description: &str, days: i64, notes: &str) -> Milestone {
    let mut m = Milestone::new(title, description, days_from(now, days));
    m.notes = notes.to_string();
    m
}

fn started(mut m: Milestone, progress: u8) -> Milestone {
    m.status = MilestoneStatus::InProgress;
    m.progress_percentage = progress;
    m
}

fn routine(title: &str, description: &str, frequency: Frequency) -> DailyRoutine {
    DailyRoutine::new(title, description, frequency)
}

#[allow(clippy::too_many_arguments)]
fn sample(
    now: DateTime<Utc>,
    title: &str,
    description: &str,
    category: Category,
    priority: Priority,
    days: i64,
    progress: u8,
    milestones: Vec<Milestone>,
    routines: Vec<DailyRoutine>,
    related: &[&str],
    notes: &str,
    suggestions: &[&str],
) -> Goal {
    let mut goal = Goal::new(title, description, category, priority, days_from(now, days));
    goal.created_date = now.to_rfc3339();
    goal.progress_percentage = progress;
    goal.milestones = milestones;
    goal.daily_routines = routines;
    goal.related_agents = related.iter().map(|s| s.to_string()).collect();
    goal.user_notes = notes.to_string();
    goal.ai_suggestions = suggestions.iter().map(|s| s.to_string()).collect();
    goal
}

/// Three active goals in different categories, each with milestones and routines.
pub fn sample_goals(now: DateTime<Utc>) -> Vec<Goal> {
    let career = sample(
        now,
        "🚀 AI/ML Career Excellence",
        "Build a world-class AI/ML career with cutting-edge skills, SOTA knowledge, and industry leadership",
        Category::AiMlDatascience,
        Priority::High,
        365,
        15,
        vec![
            started(
                milestone(
                    now,
                    "Master SOTA Models",
                    "Deep dive into latest transformer architectures, attention mechanisms, and model optimization",
                    90,
                    "Focus on current frontier architectures and their applications",
                ),
                30,
            ),
            milestone(
                now,
                "Cloud AI Infrastructure",
                "Deploy and scale AI models on AWS, GCP, and Azure with MLOps practices",
                180,
                "Learn Kubernetes, Docker, CI/CD for ML pipelines",
            ),
            milestone(
                now,
                "Research Paper Reading",
                "Read and analyze 50+ papers from NeurIPS, ICML, ICLR, and arXiv",
                120,
                "Focus on transformer variants, multimodal AI, and efficient training",
            ),
            milestone(
                now,
                "AI Community Leadership",
                "Present at conferences, contribute to open source, and mentor junior developers",
                240,
                "Build presence on GitHub, LinkedIn, and AI communities",
            ),
        ],
        vec![
            routine(
                "📚 Daily AI Learning",
                "Spend 30 minutes reading AI papers, watching tutorials, or coding",
                Frequency::Daily,
            ),
            routine(
                "💻 Code Practice",
                "Implement AI models, work on personal projects, or contribute to open source",
                Frequency::Daily,
            ),
            routine(
                "🌐 AI Networking",
                "Engage with the AI community online",
                Frequency::Weekly,
            ),
        ],
        &["coding_mentor", "ai_ml_datascience"],
        "Focus on practical applications and real-world impact",
        &["Consider specializing in computer vision", "Explore edge AI and mobile ML"],
    );

    let sleep = sample(
        now,
        "😴 Sleep Optimization",
        "Establish healthy sleep patterns for better productivity, mood, and overall wellness",
        Category::HealthFitness,
        Priority::High,
        60,
        25,
        vec![
            started(
                milestone(
                    now,
                    "Consistent Bedtime",
                    "Go to bed at 10:30 PM consistently for 30 days",
                    30,
                    "Use sleep tracking app to monitor consistency",
                ),
                40,
            ),
            milestone(
                now,
                "Screen-Free Hour",
                "No screens 1 hour before bedtime for better sleep quality",
                45,
                "Read books, meditate, or journal instead",
            ),
            milestone(
                now,
                "7-8 Hours Sleep",
                "Achieve 7-8 hours of quality sleep consistently",
                60,
                "Track sleep quality and energy levels",
            ),
        ],
        vec![
            routine(
                "🌙 Evening Wind-Down",
                "Start bedtime routine at 9:30 PM with no screens",
                Frequency::Daily,
            ),
            routine(
                "☀️ Morning Routine",
                "Wake up at 6:30 AM and start day with energy",
                Frequency::Daily,
            ),
        ],
        &["wellness_coach", "mental_health"],
        "Sleep is foundation for everything else",
        &["Consider blue light blocking glasses", "Try meditation apps for sleep"],
    );

    let sustainability = sample(
        now,
        "🌱 Sustainable Living",
        "Reduce environmental impact through conscious choices in daily life and work",
        Category::EnvironmentalSustainability,
        Priority::Medium,
        180,
        20,
        vec![
            started(
                milestone(
                    now,
                    "Zero Waste Kitchen",
                    "Eliminate single-use plastics and food waste in kitchen",
                    60,
                    "Use reusable containers, buy in bulk, compost food scraps",
                ),
                60,
            ),
            milestone(
                now,
                "Green Energy Switch",
                "Switch to renewable energy provider and optimize home energy use",
                120,
                "Research local renewable energy options",
            ),
            milestone(
                now,
                "Sustainable Transportation",
                "Reduce car usage by 50% through walking, biking, and public transit",
                90,
                "Track carbon footprint reduction",
            ),
        ],
        vec![
            routine("♻️ Zero Waste Day", "Avoid single-use items and recycle properly", Frequency::Daily),
            routine(
                "🚶‍♂️ Walk/Bike Commute",
                "Use sustainable transportation for daily commute",
                Frequency::Daily,
            ),
            routine("🌿 Plant Care", "Water indoor plants and maintain garden", Frequency::Daily),
        ],
        &["sustainability_guide", "home_optimizer"],
        "Every small action counts toward a sustainable future",
        &["Consider starting a vegetable garden", "Look into solar panel installation"],
    );

    vec![career, sleep, sustainability]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::GoalStatus;
    use std::collections::HashSet;

    #[test]
    fn test_samples_cover_three_categories() {
        let goals = sample_goals(Utc::now());
        assert_eq!(goals.len(), 3);

        let categories: HashSet<Category> = goals.iter().map(|g| g.category).collect();
        assert_eq!(categories.len(), 3);

        for goal in &goals {
            assert_eq!(goal.status, GoalStatus::Active);
            assert!((3..=4).contains(&goal.milestones.len()), "{}", goal.title);
            assert!((2..=3).contains(&goal.daily_routines.len()), "{}", goal.title);
            assert!(goal.target_date.is_some());
        }
    }

    #[test]
    fn test_sample_ids_are_unique() {
        let goals = sample_goals(Utc::now());
        let mut ids = HashSet::new();
        for goal in &goals {
            assert!(ids.insert(goal.id.clone()));
            for m in &goal.milestones {
                assert!(ids.insert(m.id.clone()));
            }
            for r in &goal.daily_routines {
                assert!(ids.insert(r.id.clone()));
            }
        }
    }
}
