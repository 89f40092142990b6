//! Shared data models for the gearpoll survey

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported survey locales
///
/// The language selects the catalog display column and the locale of
/// validation and UI messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Fr,
}

impl Language {
    /// All supported languages (catalogs are loaded once per language)
    pub const ALL: [Language; 2] = [Language::En, Language::Fr];

    /// Wire and storage form of the language code
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
        }
    }

    /// Column name carrying this language's display string in the catalog file
    pub fn catalog_column(&self) -> &'static str {
        match self {
            Language::En => "EN",
            Language::Fr => "FR",
        }
    }

    /// Localized label for an identity field, used in validation messages
    fn field_label(&self, field: IdentityField) -> &'static str {
        match (self, field) {
            (Language::En, IdentityField::FirstName) => "first name",
            (Language::En, IdentityField::LastName) => "last name",
            (Language::En, IdentityField::Email) => "email",
            (Language::Fr, IdentityField::FirstName) => "prénom",
            (Language::Fr, IdentityField::LastName) => "nom",
            (Language::Fr, IdentityField::Email) => "e-mail",
        }
    }

    /// Localized validation message listing the missing fields
    pub fn missing_fields_message(&self, missing: &[IdentityField]) -> String {
        let fields: Vec<&str> = missing.iter().map(|f| self.field_label(*f)).collect();
        match self {
            Language::En => format!(
                "Please fill in all required fields: {}",
                fields.join(", ")
            ),
            Language::Fr => format!(
                "Veuillez renseigner tous les champs obligatoires : {}",
                fields.join(", ")
            ),
        }
    }
}

/// Identity fields that can fail non-empty validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    FirstName,
    LastName,
    Email,
}

/// Respondent identity captured at session start
///
/// Email is the stable key used to resume prior progress. All fields are
/// required non-empty; no format validation is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondentIdentity {
    pub language: Language,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl RespondentIdentity {
    /// Validate that all identity fields are non-empty.
    ///
    /// Returns a message localized to the submitted language on failure.
    /// Whitespace-only values count as empty.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut missing = Vec::new();
        if self.first_name.trim().is_empty() {
            missing.push(IdentityField::FirstName);
        }
        if self.last_name.trim().is_empty() {
            missing.push(IdentityField::LastName);
        }
        if self.email.trim().is_empty() {
            missing.push(IdentityField::Email);
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(self.language.missing_fields_message(&missing))
        }
    }
}

/// Three-way judgment on a presented pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerResult {
    /// The left item is more damaging
    Left,
    /// The right item is more damaging
    Right,
    /// Both items judged equally damaging
    Same,
}

impl AnswerResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerResult::Left => "left",
            AnswerResult::Right => "right",
            AnswerResult::Same => "same",
        }
    }
}

impl std::str::FromStr for AnswerResult {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "left" => Ok(AnswerResult::Left),
            "right" => Ok(AnswerResult::Right),
            "same" => Ok(AnswerResult::Same),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown answer result: {}",
                other
            ))),
        }
    }
}

/// One recorded judgment, append-only in the records table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: Uuid,
    pub language: Language,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Catalog key of the item presented on the left
    pub option_left: String,
    /// Catalog key of the item presented on the right
    pub option_right: String,
    /// Session trial index at the time of the answer (0-based, pre-increment)
    pub n_trials: i64,
    pub result: AnswerResult,
    /// Optional campaign/source tag from the page URL
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One gear item from the catalog, localized
///
/// Immutable once loaded; re-derived from the catalog file, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Full localized display string ("Title: Description"), unique per language
    pub key: String,
    pub title: String,
    pub description: String,
    /// Image file name, relative to the configured image folder
    pub image_path: String,
    pub language: Language,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(first: &str, last: &str, email: &str, language: Language) -> RespondentIdentity {
        RespondentIdentity {
            language,
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn validate_accepts_complete_identity() {
        let id = identity("Ada", "Lovelace", "ada@example.org", Language::En);
        assert!(id.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_fields_with_english_message() {
        let id = identity("", "Lovelace", "  ", Language::En);
        let msg = id.validate().unwrap_err();
        assert!(msg.contains("first name"));
        assert!(msg.contains("email"));
        assert!(!msg.contains("last name"));
    }

    #[test]
    fn validate_rejects_empty_fields_with_french_message() {
        let id = identity("Ada", "", "ada@example.org", Language::Fr);
        let msg = id.validate().unwrap_err();
        assert!(msg.contains("nom"));
        assert!(msg.starts_with("Veuillez"));
    }

    #[test]
    fn answer_result_round_trips_wire_form() {
        for (s, r) in [
            ("left", AnswerResult::Left),
            ("right", AnswerResult::Right),
            ("same", AnswerResult::Same),
        ] {
            assert_eq!(s.parse::<AnswerResult>().unwrap(), r);
            assert_eq!(r.as_str(), s);
        }
        assert!("winner".parse::<AnswerResult>().is_err());
    }

    #[test]
    fn language_deserializes_from_lowercase_codes() {
        let lang: Language = serde_json::from_str("\"fr\"").unwrap();
        assert_eq!(lang, Language::Fr);
        assert_eq!(lang.catalog_column(), "FR");
    }
}
