//! The closed set of target languages the tutor supports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TutorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Italian,
    Spanish,
    German,
    French,
    Japanese,
    English,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Italian,
        Language::Spanish,
        Language::German,
        Language::French,
        Language::Japanese,
        Language::English,
    ];

    /// Short identifier, also used to derive the storage key.
    pub fn code(self) -> &'static str {
        match self {
            Language::Italian => "it",
            Language::Spanish => "es",
            Language::German => "de",
            Language::French => "fr",
            Language::Japanese => "ja",
            Language::English => "en",
        }
    }

    /// English name, as used in the tutor instructions.
    pub fn name(self) -> &'static str {
        match self {
            Language::Italian => "Italian",
            Language::Spanish => "Spanish",
            Language::German => "German",
            Language::French => "French",
            Language::Japanese => "Japanese",
            Language::English => "English",
        }
    }

    /// Name of the language in Turkish, the learner's language.
    pub fn turkish_name(self) -> &'static str {
        match self {
            Language::Italian => "İtalyanca",
            Language::Spanish => "İspanyolca",
            Language::German => "Almanca",
            Language::French => "Fransızca",
            Language::Japanese => "Japonca",
            Language::English => "İngilizce",
        }
    }

    /// Parse a code (`it`, `jp`, ...) or English name, case-insensitively.
    pub fn parse(id: &str) -> Result<Self, TutorError> {
        let normalized = id.trim().to_lowercase();
        let lang = match normalized.as_str() {
            "it" | "italian" => Language::Italian,
            "es" | "spanish" => Language::Spanish,
            "de" | "german" => Language::German,
            "fr" | "french" => Language::French,
            "ja" | "jp" | "japanese" => Language::Japanese,
            "en" | "english" => Language::English,
            _ => return Err(TutorError::UnsupportedLanguage(id.to_string())),
        };
        Ok(lang)
    }
}

impl FromStr for Language {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::parse(s)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
