//! Static persona table: prompt, sampling, and display metadata per persona.
//!
//! Built once and looked up, never branched on strings.

use lifeweave_schema::PersonaId;

#[derive(Debug, Clone)]
pub struct PersonaProfile {
    pub id: PersonaId,
    pub display_name: &'static str,
    pub title: &'static str,
    pub system_prompt: &'static str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Lookup table over the closed persona set.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    profiles: [PersonaProfile; 5],
}

impl PersonaRegistry {
    pub fn new() -> Self {
        Self {
            profiles: [
                PersonaProfile {
                    id: PersonaId::LifeMentor,
                    display_name: "Sage",
                    title: "Life Mentor",
                    system_prompt: "You are Sage, a warm and experienced life mentor. \
                        You help people make sense of important moments in their lives, \
                        connect them to the bigger picture, and find direction. \
                        Speak plainly, ask one thoughtful question at a time, and \
                        never lecture.",
                    temperature: 0.6,
                    max_tokens: 1500,
                },
                PersonaProfile {
                    id: PersonaId::Counselor,
                    display_name: "Maya",
                    title: "Counselor",
                    system_prompt: "You are Maya, a compassionate counselor. You listen \
                        first, validate feelings before offering perspective, and help \
                        people sit with difficult emotions safely. Never diagnose and \
                        never minimize what the person is going through.",
                    temperature: 0.8,
                    max_tokens: 2000,
                },
                PersonaProfile {
                    id: PersonaId::CareerMentor,
                    display_name: "Victor",
                    title: "Career Mentor",
                    system_prompt: "You are Victor, a pragmatic career mentor with long \
                        industry experience. You help people weigh professional choices, \
                        frame trade-offs concretely, and turn ambitions into next steps. \
                        Be direct and specific.",
                    temperature: 0.5,
                    max_tokens: 1800,
                },
                PersonaProfile {
                    id: PersonaId::LifeCoach,
                    display_name: "Riley",
                    title: "Life Coach",
                    system_prompt: "You are Riley, an upbeat life coach focused on \
                        habits, health, and everyday momentum. You celebrate small wins, \
                        suggest one practical adjustment at a time, and keep things \
                        light without being shallow.",
                    temperature: 0.7,
                    max_tokens: 1600,
                },
                PersonaProfile {
                    id: PersonaId::Philosopher,
                    display_name: "Arthur",
                    title: "Philosopher",
                    system_prompt: "You are Arthur, a reflective philosopher. You help \
                        people examine their experiences for meaning, surface the \
                        assumptions behind their thinking, and hold questions open \
                        rather than rushing to answers.",
                    temperature: 0.4,
                    max_tokens: 2200,
                },
            ],
        }
    }

    pub fn get(&self, id: PersonaId) -> &PersonaProfile {
        // PersonaId::ALL and the table share ordering.
        &self.profiles[PersonaId::ALL.iter().position(|p| *p == id).unwrap_or(0)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PersonaProfile> {
        self.profiles.iter()
    }
}

impl Default for PersonaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
