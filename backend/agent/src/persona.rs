//! Tutor persona: the system instruction for each target language.
//!
//! Personas come from the closed `Language` set. An identifier outside it is
//! an error, never an empty or default instruction.

use proglot_core::{Language, TutorError};

/// Static instruction text for one target language. Built per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    language: Language,
}

impl Persona {
    pub fn for_language(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Label used inside the instruction, e.g. "Italian (İtalyanca)".
    fn label(&self) -> String {
        format!("{} ({})", self.language.name(), self.language.turkish_name())
    }

    pub fn instruction(&self) -> String {
        let label = self.label();
        format!(
            "You are 'ProGlot', an expert {label} tutor for Turkish speakers.\n\
             IMPORTANT: This is an ongoing lesson. Remember previous mistakes and progress.\n\
             \n\
             RULES:\n\
             1. Explain concepts in Turkish, but provide examples strictly in {label}.\n\
             2. Correct mistakes gently and explain the 'Why' behind the rule.\n\
             3. End every response with an interactive question or exercise.\n\
             4. NEVER just provide the answer; keep the dialogue active.\n\
             \n\
             TONE: Professional, Patient, Encouraging."
        )
    }
}

/// Resolve a language identifier to its instruction text.
pub fn assemble_persona(language_id: &str) -> Result<String, TutorError> {
    let language = Language::parse(language_id)?;
    Ok(Persona::for_language(language).instruction())
}

/// Hidden first message that opens a lesson with an empty history.
pub fn kickoff_prompt(language: Language) -> String {
    format!(
        "Start the lesson. Introduce yourself professionally in Turkish and ask for my {} proficiency level.",
        Persona::for_language(language).label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persona_names_only_its_own_language() {
        let italian = assemble_persona("it").unwrap();
        assert!(italian.contains("expert Italian (İtalyanca) tutor"));
        assert!(italian.contains("strictly in Italian"));
        for other in Language::ALL.iter().filter(|l| **l != Language::Italian) {
            assert!(!italian.contains(other.name()), "leaked {other}");
        }
    }

    #[test]
    fn every_language_gets_the_full_rule_set() {
        for lang in Language::ALL {
            let text = Persona::for_language(lang).instruction();
            assert!(text.starts_with("You are 'ProGlot'"));
            for rule in ["1. ", "2. ", "3. ", "4. ", "TONE:"] {
                assert!(text.contains(rule), "{lang} missing {rule}");
            }
        }
    }

    #[test]
    fn unsupported_identifier_is_an_error() {
        for id in ["", "tr", "Klingon"] {
            assert!(matches!(
                assemble_persona(id),
                Err(TutorError::UnsupportedLanguage(_))
            ));
        }
    }

    #[test]
    fn assembly_is_deterministic() {
        assert_eq!(assemble_persona("de").unwrap(), assemble_persona("German").unwrap());
    }

    #[test]
    fn kickoff_asks_for_level() {
        let prompt = kickoff_prompt(Language::Japanese);
        assert!(prompt.contains("Japanese (Japonca) proficiency level"));
    }
}
