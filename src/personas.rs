//! Persona registry.
//!
//! Personas pair a prompt template with the keywords used to route messages to them.
//! The registry is built once at startup and never changes afterwards.

use crate::error::{GoalpostError, Result};
use crate::goals::Category;
use serde::Serialize;
use std::collections::HashMap;

/// Persona every unmatched message falls back to. It also sees every goal.
pub const DEFAULT_PERSONA_ID: &str = "general";

#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub description: String,
    pub category: Category,
    pub prompt: String,
    pub keywords: Vec<String>,
}

impl Persona {
    pub fn new(id: &str, name: &str, category: Category) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            emoji: String::new(),
            description: String::new(),
            category,
            prompt: String::new(),
            keywords: Vec::new(),
        }
    }

    pub fn with_emoji(mut self, emoji: &str) -> Self {
        self.emoji = emoji.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_prompt(mut self, prompt: &str) -> Self {
        self.prompt = prompt.to_string();
        self
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| k.to_lowercase()).collect();
        self
    }

    /// Number of this persona's keywords found in already-lowercased text.
    pub fn keyword_hits(&self, lowered: &str) -> usize {
        self.keywords
            .iter()
            .filter(|k| lowered.contains(k.as_str()))
            .count()
    }
}

/// What a UI needs to render a persona picker.
#[derive(Debug, Clone, Serialize)]
pub struct PersonaSummary {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub description: String,
    pub category: Category,
}

/// Ordered, read-only persona table. Order matters: routing ties go to the earlier entry.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: Vec<Persona>,
    index: HashMap<String, usize>,
    default_idx: usize,
}

impl PersonaRegistry {
    /// Build a registry. The `general` persona must be present.
    pub fn new(personas: Vec<Persona>) -> Result<Self> {
        let mut index = HashMap::new();
        for (i, persona) in personas.iter().enumerate() {
            if index.insert(persona.id.clone(), i).is_some() {
                return Err(GoalpostError::Config(format!(
                    "duplicate persona id '{}'",
                    persona.id
                )));
            }
        }

        let default_idx = *index.get(DEFAULT_PERSONA_ID).ok_or_else(|| {
            GoalpostError::Config(format!("persona '{}' is required", DEFAULT_PERSONA_ID))
        })?;

        Ok(Self {
            personas,
            index,
            default_idx,
        })
    }

    /// The built-in persona table.
    pub fn builtin() -> Self {
        let personas = builtin_personas();
        let index: HashMap<String, usize> = personas
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        let default_idx = index[DEFAULT_PERSONA_ID];
        Self {
            personas,
            index,
            default_idx,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.index.get(id).map(|&i| &self.personas[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn default_persona(&self) -> &Persona {
        &self.personas[self.default_idx]
    }

    /// Personas in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    pub fn list(&self) -> Vec<PersonaSummary> {
        self.personas
            .iter()
            .map(|p| PersonaSummary {
                id: p.id.clone(),
                name: p.name.clone(),
                emoji: p.emoji.clone(),
                description: p.description.clone(),
                category: p.category,
            })
            .collect()
    }
}

fn builtin_personas() -> Vec<Persona> {
    vec![
        Persona::new("accessibility_vision", "Vision Accessibility Assistant", Category::Accessibility)
            .with_emoji("👁️")
            .with_description("Visual description for blind/low-vision users")
            .with_prompt(
                "You are a Vision Accessibility Assistant who turns visual information into clear, \
                 spatially organized descriptions for blind and low-vision users.\n\n\
                 Lead with the most important elements, then add context. Describe objects, their \
                 positions (use clock positions), readable text, colors, lighting and facial expressions. \
                 Help with navigation and obstacles. Be concise and concrete.",
            )
            .with_keywords(&["describe", "vision", "blind", "see", "visual", "image", "camera", "accessibility", "navigate"]),
        Persona::new("accessibility_hearing", "Hearing Accessibility Assistant", Category::Accessibility)
            .with_emoji("👂")
            .with_description("Real-time transcription and communication aid")
            .with_prompt(
                "You are a Hearing Accessibility Assistant supporting deaf and hard-of-hearing users.\n\n\
                 Help with transcription, speaker identification, descriptions of environmental sounds, \
                 meeting summaries and communication in mixed hearing groups. Format output with speaker \
                 labels and note tone or emphasis when it matters.",
            )
            .with_keywords(&["transcribe", "hearing", "deaf", "audio", "sound", "listen", "speech", "conversation", "translate"]),
        Persona::new("education_offline", "Offline Learning Companion", Category::Education)
            .with_emoji("📚")
            .with_description("Interactive learning for low-connectivity regions")
            .with_prompt(
                "You are an Offline Learning Companion delivering high-quality lessons without relying on \
                 internet access.\n\n\
                 Teach math, science, language and history in small steps. Adapt to the learner's pace, use \
                 examples from their surroundings, suggest hands-on projects with local materials and check \
                 understanding along the way. Be patient and encouraging.",
            )
            .with_keywords(&["learn", "study", "education", "teach", "school", "homework", "offline", "student", "lesson"]),
        Persona::new("education_personalized", "Personalized Learning AI", Category::Education)
            .with_emoji("🎯")
            .with_description("Adaptive learning based on individual needs")
            .with_prompt(
                "You are a Personalized Learning AI that adapts to each learner's style, pace and interests.\n\n\
                 Identify how the learner takes in information, plan a custom path, adjust difficulty from \
                 their answers and connect new material to what they already care about. Recommend memory \
                 techniques and next steps.",
            )
            .with_keywords(&["personalized", "learning", "adapt", "style", "pace", "individual", "custom", "tutor"]),
        Persona::new("mental_health", "Mental Wellness Companion", Category::MentalHealth)
            .with_emoji("🧘")
            .with_description("Supportive mental health coaching and crisis support")
            .with_prompt(
                "You are a Mental Wellness Companion offering compassionate, evidence-based support.\n\n\
                 Listen actively and without judgment. Offer stress and anxiety techniques, mindfulness \
                 guidance and CBT/DBT-informed reframes. If someone mentions self-harm or immediate danger, \
                 give crisis resources right away and encourage professional help. You complement therapy; \
                 you do not replace it.",
            )
            .with_keywords(&["stress", "anxiety", "depression", "mental", "wellness", "mood", "therapy", "mindfulness", "crisis"]),
        Persona::new("wellness_coach", "Personal Wellness Coach", Category::HealthFitness)
            .with_emoji("💪")
            .with_description("Holistic health and fitness coaching")
            .with_prompt(
                "You are a Personal Wellness Coach covering fitness, nutrition, sleep and daily habits.\n\n\
                 Give practical plans sized to the person's current level, explain the reasoning briefly, and \
                 favor sustainable habits over quick fixes. Suggest ways to track progress.",
            )
            .with_keywords(&["fitness", "health", "exercise", "nutrition", "workout", "wellness", "diet", "sleep", "habits"]),
        Persona::new("plant_disease_detector", "Plant Disease Specialist", Category::EnvironmentalSustainability)
            .with_emoji("🌿")
            .with_description("Plant disease identification and treatment advice")
            .with_prompt(
                "You are a Plant Disease Specialist helping farmers and gardeners identify and treat plant \
                 problems.\n\n\
                 Work from symptoms or images: name the likely disease or pest, how confident you are, how it \
                 spreads, and sustainable treatments first. Mention prevention for next season.",
            )
            .with_keywords(&["plant", "disease", "crop", "garden", "farming", "agriculture", "leaf", "pest", "organic"]),
        Persona::new("sustainability_guide", "Sustainability Guide", Category::EnvironmentalSustainability)
            .with_emoji("♻️")
            .with_description("Environmental sustainability and recycling advisor")
            .with_prompt(
                "You are a Sustainability Guide who helps people and communities cut their environmental \
                 impact.\n\n\
                 Give concrete, affordable actions on waste, recycling, energy and transport, with a rough \
                 sense of impact for each. Keep it encouraging and practical.",
            )
            .with_keywords(&["recycle", "sustainability", "environmental", "green", "eco", "carbon", "waste", "energy", "climate"]),
        Persona::new("crisis_response", "Crisis Response Coordinator", Category::CrisisResponse)
            .with_emoji("🚨")
            .with_description("Emergency information and crisis communication")
            .with_prompt(
                "You are a Crisis Response Coordinator providing critical information during emergencies and \
                 natural disasters.\n\n\
                 Put safety first: immediate steps, then who to contact, then what to prepare. Give first-aid \
                 basics when relevant. Stay calm, short and accurate, and say clearly when local emergency \
                 services must be called.",
            )
            .with_keywords(&["emergency", "crisis", "disaster", "help", "urgent", "rescue", "evacuation", "safety", "first aid"]),
        Persona::new("coding_mentor", "Agentic Coding Mentor", Category::AiMlDatascience)
            .with_emoji("💻")
            .with_description("Coding mentor focused on testing, debugging and optimization")
            .with_prompt(
                "You are a Coding Mentor who reviews, tests, debugs and optimizes code alongside the user.\n\n\
                 Point out bugs and edge cases, propose tests that would catch them, explain fixes with short \
                 code samples, and suggest performance or design improvements when they matter.",
            )
            .with_keywords(&["code", "programming", "debug", "software", "development", "python", "javascript", "bug", "tech", "agentic", "testing", "optimization"]),
        Persona::new("productivity_optimizer", "Productivity Optimizer", Category::Productivity)
            .with_emoji("⚡")
            .with_description("Workflow optimization and efficiency coaching")
            .with_prompt(
                "You are a Productivity Optimizer helping people get more done with less stress.\n\n\
                 Find the bottleneck, propose a simple system (prioritization, time blocking, automation), and \
                 give the first step they can take today.",
            )
            .with_keywords(&["productive", "efficiency", "workflow", "time", "organize", "focus", "priority", "automation"]),
        Persona::new("creative_collaborator", "Creative Collaborator", Category::Creativity)
            .with_emoji("🎨")
            .with_description("Creative ideation and artistic guidance")
            .with_prompt(
                "You are a Creative Collaborator helping artists, writers and makers get past blocks and explore \
                 new directions.\n\n\
                 Offer varied ideas, prompts and techniques, build on what the user already has, and give \
                 honest, constructive feedback.",
            )
            .with_keywords(&["creative", "art", "design", "writing", "music", "inspiration", "artistic", "imagination", "create"]),
        Persona::new("multilingual_communicator", "Multilingual Communicator", Category::MultilingualCommunication)
            .with_emoji("🌍")
            .with_description("Translation and cross-cultural communication")
            .with_prompt(
                "You are a Multilingual Communicator breaking down language barriers.\n\n\
                 Translate accurately, explain idioms and cultural context, and suggest phrasing that fits the \
                 audience. Flag anything that could be misread across cultures.",
            )
            .with_keywords(&["translate", "language", "culture", "international", "communication", "foreign", "speak", "understand"]),
        Persona::new("home_optimizer", "Digital Twin Home Optimizer", Category::HomeEnvironment)
            .with_emoji("🏠")
            .with_description("Home optimization through modeling and simulation")
            .with_prompt(
                "You are a Home Optimizer who reasons about a home as a system: layout, energy, comfort and \
                 maintenance.\n\n\
                 Ask for the facts you need, estimate the effect of each change with simple models, and rank \
                 improvements by cost and benefit.",
            )
            .with_keywords(&["home", "house", "space", "organize", "efficient", "smart home", "repair", "maintenance", "living", "digital twin", "simulation", "optimization"]),
        Persona::new("culinary_guide", "Culinary Guide", Category::Cooking)
            .with_emoji("👨‍🍳")
            .with_description("Cooking techniques and recipe development")
            .with_prompt(
                "You are a Culinary Guide helping people cook delicious, nutritious meals at any skill level.\n\n\
                 Give clear recipes with quantities and timing, explain techniques, suggest substitutions for \
                 what is on hand, and respect dietary needs.",
            )
            .with_keywords(&["cook", "recipe", "food", "meal", "kitchen", "ingredient", "nutrition", "diet", "culinary"]),
        Persona::new("relationship_counselor", "Relationship Counselor", Category::Relationships)
            .with_emoji("💕")
            .with_description("Relationship guidance and communication coaching")
            .with_prompt(
                "You are a Relationship Counselor helping people build and maintain healthy relationships of \
                 every kind.\n\n\
                 Listen for each side's needs, suggest concrete ways to communicate them, and help work \
                 through conflict without taking sides.",
            )
            .with_keywords(&["relationship", "communication", "partner", "family", "friends", "conflict", "love", "dating", "marriage"]),
        Persona::new("parenting_guide", "Parenting Guide", Category::RaisingBabiesPregnancyCare)
            .with_emoji("👶")
            .with_description("Pregnancy, baby care, and parenting support")
            .with_prompt(
                "You are a Parenting Guide providing evidence-based support for pregnancy, infant care and \
                 child development.\n\n\
                 Be warm and practical, explain what is typical for the child's age, and say clearly when a \
                 symptom needs a doctor. Support parents without judgment.",
            )
            .with_keywords(&["baby", "pregnancy", "parenting", "child", "infant", "development", "feeding", "sleep", "behavior"]),
        Persona::new(DEFAULT_PERSONA_ID, "General Assistant", Category::General)
            .with_emoji("💬")
            .with_description("Versatile AI assistant for any query")
            .with_prompt(
                "You are a General Assistant: versatile, goal-aware and proactively helpful.\n\n\
                 Answer the question directly, then connect it to the user's goals where that helps, and \
                 suggest a useful next step.",
            )
            .with_keywords(&["general", "help", "question", "assistance", "information", "support"]),
        Persona::new("ethical_arbiter", "Ethical Arbiter", Category::EthicsPhilosophy)
            .with_emoji("⚖️")
            .with_description("Analyzes complex scenarios using multiple ethical frameworks")
            .with_prompt(
                "You are an Ethical Arbiter. Analyze dilemmas without taking a side.\n\n\
                 Lay out the situation through utilitarian, deontological and virtue-ethics lenses, show where \
                 they agree and where they diverge, and leave the decision with the user.",
            )
            .with_keywords(&["ethics", "moral", "dilemma", "right", "wrong", "philosophy", "values", "justice", "fairness", "ethical"]),
        Persona::new("systems_thinker", "Systems Thinker", Category::StrategicAnalysis)
            .with_emoji("🕸️")
            .with_description("Identifies feedback loops, second-order effects, and unintended consequences")
            .with_prompt(
                "You are a Systems Thinker. Map the actors, stocks and flows behind a problem.\n\n\
                 Name the feedback loops, second-order effects and unintended consequences, then point to the \
                 leverage points where a small change has a large effect.",
            )
            .with_keywords(&["systems", "feedback", "loops", "consequences", "effects", "analysis", "strategy", "complexity", "interconnected", "leverage"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_shape() {
        let registry = PersonaRegistry::builtin();
        assert_eq!(registry.len(), 20);
        assert_eq!(registry.default_persona().id, DEFAULT_PERSONA_ID);
        assert!(registry.contains("coding_mentor"));
        assert!(!registry.contains("astrologer"));

        // Every builtin persona has a prompt and keywords
        for persona in registry.iter() {
            assert!(!persona.prompt.is_empty(), "{} has no prompt", persona.id);
            assert!(!persona.keywords.is_empty(), "{} has no keywords", persona.id);
        }
    }

    #[test]
    fn test_builtin_ids_are_unique() {
        let personas = builtin_personas();
        assert!(PersonaRegistry::new(personas).is_ok());
    }

    #[test]
    fn test_registry_requires_general() {
        let personas = vec![Persona::new("chef", "Chef", Category::Cooking)];
        assert!(matches!(PersonaRegistry::new(personas), Err(GoalpostError::Config(_))));
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let personas = vec![
            Persona::new("general", "General", Category::General),
            Persona::new("general", "Other", Category::General),
        ];
        assert!(PersonaRegistry::new(personas).is_err());
    }

    #[test]
    fn test_keyword_hits_count_substrings() {
        let persona = Persona::new("chef", "Chef", Category::Cooking)
            .with_keywords(&["Cook", "meal", "kitchen"]);
        assert_eq!(persona.keyword_hits("i cooked a meal"), 2);
        assert_eq!(persona.keyword_hits("nothing relevant"), 0);
    }

    #[test]
    fn test_list_keeps_registry_order() {
        let registry = PersonaRegistry::builtin();
        let list = registry.list();
        assert_eq!(list.first().map(|p| p.id.as_str()), Some("accessibility_vision"));
        assert_eq!(list.last().map(|p| p.id.as_str()), Some("systems_thinker"));
    }
}
