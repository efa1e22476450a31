//! Manual-export prompt for degraded mode.
//!
//! When the API is unavailable the user can paste this text into a web chat
//! interface and carry on with the lesson there.

use proglot_core::{Role, Turn};

pub struct FallbackPrompt;

impl FallbackPrompt {
    /// Render the instruction, the given turns, and an optional pending user
    /// turn as one copy-pasteable block.
    pub fn render(instruction: &str, turns: &[Turn], pending: Option<&Turn>) -> String {
        let mut out = String::new();
        out.push_str("SYSTEM INSTRUCTION:\n");
        out.push_str(instruction.trim());
        out.push_str("\n\nCHAT HISTORY:\n");
        for turn in turns.iter().chain(pending) {
            out.push_str(Self::speaker(turn.role()));
            out.push_str(": ");
            out.push_str(turn.text());
            out.push('\n');
        }
        out.push_str("\n(Please continue from here)");
        out
    }

    fn speaker(role: Role) -> &'static str {
        match role {
            Role::User => "Student",
            Role::Assistant => "Tutor",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_instruction_history_and_pending_turn() {
        let turns = vec![Turn::user("Ciao"), Turn::assistant("Ciao! Come stai?")];
        let pending = Turn::user("Sto bene");
        let text = FallbackPrompt::render("  You are 'ProGlot'.\n", &turns, Some(&pending));

        assert_eq!(
            text,
            "SYSTEM INSTRUCTION:\nYou are 'ProGlot'.\n\nCHAT HISTORY:\n\
             Student: Ciao\nTutor: Ciao! Come stai?\nStudent: Sto bene\n\n\
             (Please continue from here)"
        );
    }

    #[test]
    fn empty_history_still_has_sections() {
        let text = FallbackPrompt::render("persona", &[], None);
        assert!(text.contains("CHAT HISTORY:\n\n(Please continue from here)"));
    }
}
