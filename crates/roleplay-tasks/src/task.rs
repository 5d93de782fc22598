use rand::Rng;
use roleplay_characters::Character;
use serde::{Deserialize, Serialize};

use crate::criteria::Criterion;

/// Header line that precedes the criteria bullet list
pub const CRITERIA_HEADER: &str = "The following criteria must be respected:";

/// The kinds of task the validator can ask for.
///
/// Each family supplies its own instruction text and routing tags; new
/// families get a new variant and a factory function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskFamily {
    /// Write a message typical of a character, given their description
    MessageFromDescription,
    /// Continue a character's scenario with dialogue and narration
    DialogueFromScenario,
}

impl TaskFamily {
    pub const ALL: [TaskFamily; 2] = [
        TaskFamily::MessageFromDescription,
        TaskFamily::DialogueFromScenario,
    ];

    /// Lead-in text placed before the base text of the prompt
    pub fn instruction(self) -> &'static str {
        match self {
            TaskFamily::MessageFromDescription => {
                "Please read the following character description carefully.\n\
                 Your task is to roleplay as the character described in the text below \
                 and to write a message that would be typical of that character.\n\
                 No matter what, do not break character.\n"
            }
            TaskFamily::DialogueFromScenario => {
                "Please read the following scenario carefully.\n\
                 Your task is to roleplay as the main character of the scenario below \
                 and to write the next moment of the scene, mixing spoken dialogue with \
                 narration of the character's actions.\n\
                 No matter what, do not break character.\n"
            }
        }
    }

    pub fn task_type(self) -> &'static str {
        match self {
            TaskFamily::MessageFromDescription => "message-from-description",
            TaskFamily::DialogueFromScenario => "dialogue-from-scenario",
        }
    }

    pub fn task_name(self) -> &'static str {
        match self {
            TaskFamily::MessageFromDescription => "augment",
            TaskFamily::DialogueFromScenario => "dialogue",
        }
    }

    /// The part of a character this family builds its prompt around
    pub fn base_text(self, character: &Character) -> String {
        match self {
            TaskFamily::MessageFromDescription => character.description.clone(),
            TaskFamily::DialogueFromScenario => {
                if character.scenario.trim().is_empty() {
                    character.description.clone()
                } else {
                    character.scenario.clone()
                }
            }
        }
    }

    /// Pick a family uniformly at random
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// Build a task of this family for `character`, randomizing criterion
    /// targets with `rng`.
    pub fn build<R: Rng + ?Sized>(self, character: Character, rng: &mut R) -> Task {
        let base_text = self.base_text(&character);
        match self {
            TaskFamily::MessageFromDescription => {
                crate::create_message_from_description_task(base_text, character, rng)
            }
            TaskFamily::DialogueFromScenario => {
                crate::create_dialogue_from_scenario_task(base_text, character, rng)
            }
        }
    }
}

impl std::fmt::Display for TaskFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.task_type())
    }
}

impl std::str::FromStr for TaskFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|family| family.task_type() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown task family: {}", s))
    }
}

/// One prompt-generation request.
///
/// All randomness happens while the task is built; rendering is a pure
/// function of the stored fields.
#[derive(Debug, Clone)]
pub struct Task {
    family: TaskFamily,
    base_text: String,
    task_name: String,
    task_type: String,
    character: Character,
    criteria: Vec<Criterion>,
}

impl Task {
    /// Assemble a task tagged with the family's default name and type
    pub fn new(
        family: TaskFamily,
        base_text: impl Into<String>,
        character: Character,
        criteria: Vec<Criterion>,
    ) -> Self {
        Self {
            family,
            base_text: base_text.into(),
            task_name: family.task_name().to_string(),
            task_type: family.task_type().to_string(),
            character,
            criteria,
        }
    }

    pub fn family(&self) -> TaskFamily {
        self.family
    }

    pub fn base_text(&self) -> &str {
        &self.base_text
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn compose_instruction(&self) -> &'static str {
        self.family.instruction()
    }

    /// Criteria rendered as a bulleted list under [`CRITERIA_HEADER`].
    /// The header is emitted even when there are no criteria.
    pub fn compose_criteria_str(&self) -> String {
        let bullets: Vec<String> = self
            .criteria
            .iter()
            .map(|criterion| format!("- {}", criterion.compose_text()))
            .collect();
        format!("{}\n{}\n", CRITERIA_HEADER, bullets.join("\n"))
    }

    /// The full prompt: instruction, base text, criteria
    pub fn compose_prompt(&self) -> String {
        format!(
            "{}\n{}\n{}\n",
            self.compose_instruction(),
            self.base_text,
            self.compose_criteria_str()
        )
    }

    /// One constraint statement per criterion, in order
    pub fn get_criteria_strs(&self) -> Vec<String> {
        self.criteria.iter().map(|c| c.compose_text()).collect()
    }

    /// Speaker names a completion provider should stop at
    pub fn stop_sequences(&self) -> Vec<String> {
        let name = self.character.display_name();
        let mut stops = vec!["User:".to_string()];
        if !name.is_empty() {
            stops.push(format!("{}:", name));
        }
        stops
    }
}
