use serde::{Deserialize, Deserializer, Serialize};

/// A persona record used to seed roleplay tasks.
///
/// Every field is always present. An empty string means "unset"; dataset
/// records with missing or `null` fields deserialize to `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    #[serde(default, deserialize_with = "nullable")]
    pub creator: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub first_mes: String,
    #[serde(default, deserialize_with = "nullable")]
    pub mes_example: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub personality: String,
    #[serde(default, deserialize_with = "nullable")]
    pub scenario: String,
    #[serde(default, deserialize_with = "nullable")]
    pub system_prompt: String,
    #[serde(default, deserialize_with = "nullable")]
    pub char_greeting: String,
    #[serde(default, deserialize_with = "nullable")]
    pub example_dialogue: String,
    #[serde(default, deserialize_with = "nullable")]
    pub world_scenario: String,
    #[serde(default, deserialize_with = "nullable")]
    pub char_persona: String,
    #[serde(default, deserialize_with = "nullable")]
    pub char_name: String,
}

fn nullable<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Character {
    /// Build a character with only a name and description set.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// Fixed record returned by the stub character source.
    pub fn stub() -> Self {
        Self {
            creator: "stub".into(),
            first_mes: "Hello there.".into(),
            personality: "Patient and precise.".into(),
            scenario: "A quiet workshop at the edge of town.".into(),
            ..Self::new("Stub", "A placeholder character used for testing.")
        }
    }

    /// A character is usable only if both name and description contain
    /// something other than whitespace.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && !self.description.trim().is_empty()
    }

    /// Name used to address the character in prompts and stop sequences.
    /// Prefers `char_name` when the dataset filled it.
    pub fn display_name(&self) -> &str {
        if self.char_name.trim().is_empty() {
            self.name.trim()
        } else {
            self.char_name.trim()
        }
    }
}
