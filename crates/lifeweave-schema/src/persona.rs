use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ParseEnumError;

/// The closed set of AI personas a user can talk to.
///
/// Persona identity is an enum rather than a free string so that dispatch on
/// persona is exhaustive and unknown ids are rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaId {
    LifeMentor,
    Counselor,
    CareerMentor,
    LifeCoach,
    Philosopher,
}

impl PersonaId {
    pub const ALL: [PersonaId; 5] = [
        PersonaId::LifeMentor,
        PersonaId::Counselor,
        PersonaId::CareerMentor,
        PersonaId::LifeCoach,
        PersonaId::Philosopher,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaId::LifeMentor => "life_mentor",
            PersonaId::Counselor => "counselor",
            PersonaId::CareerMentor => "career_mentor",
            PersonaId::LifeCoach => "life_coach",
            PersonaId::Philosopher => "philosopher",
        }
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonaId {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "life_mentor" => Ok(PersonaId::LifeMentor),
            "counselor" => Ok(PersonaId::Counselor),
            "career_mentor" => Ok(PersonaId::CareerMentor),
            "life_coach" => Ok(PersonaId::LifeCoach),
            "philosopher" => Ok(PersonaId::Philosopher),
            other => Err(ParseEnumError::new("persona", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persona_str_roundtrip() {
        for persona in PersonaId::ALL {
            assert_eq!(persona.as_str().parse::<PersonaId>().unwrap(), persona);
        }
    }

    #[test]
    fn persona_serde_uses_snake_case() {
        let json = serde_json::to_string(&PersonaId::CareerMentor).unwrap();
        assert_eq!(json, "\"career_mentor\"");
        let parsed: PersonaId = serde_json::from_str("\"life_coach\"").unwrap();
        assert_eq!(parsed, PersonaId::LifeCoach);
    }

    #[test]
    fn unknown_persona_is_rejected() {
        let err = "oracle".parse::<PersonaId>().unwrap_err();
        assert!(err.to_string().contains("oracle"));
    }
}
