use std::sync::Arc;

use rand::Rng;
use roleplay_characters::Character;
use tracing::debug;

use crate::criteria::{
    ContentMatchType, Criterion, LayoutMatchType, MatchContentCriterion, MatchLayoutCriterion,
    MatchLengthCriterion, TextLengthUnit,
};
use crate::{Task, TaskFamily};

/// Build a "message from description" task with randomized word and
/// sentence targets.
pub fn create_message_from_description_task<R: Rng + ?Sized>(
    base_text: impl Into<String>,
    character: Character,
    rng: &mut R,
) -> Task {
    let target_words = rng.gen_range(50..=200);
    let target_sentences = rng.gen_range(4..=10);

    debug!(target_words, target_sentences, "Building message-from-description task");

    let criteria: Vec<Criterion> = vec![
        Arc::new(MatchLengthCriterion::new(
            0.25,
            target_words,
            TextLengthUnit::Words,
        )),
        Arc::new(MatchLengthCriterion::new(
            0.25,
            target_sentences,
            TextLengthUnit::Sentences,
        )),
    ];

    Task::new(
        TaskFamily::MessageFromDescription,
        base_text,
        character,
        criteria,
    )
}

/// Build a "dialogue from scenario" task: dialogue-with-narration layout, a
/// randomized word target, and the character's name must appear.
pub fn create_dialogue_from_scenario_task<R: Rng + ?Sized>(
    base_text: impl Into<String>,
    character: Character,
    rng: &mut R,
) -> Task {
    let target_words = rng.gen_range(80..=250);

    debug!(target_words, "Building dialogue-from-scenario task");

    let mut criteria: Vec<Criterion> = vec![
        Arc::new(MatchLayoutCriterion::new(
            0.25,
            LayoutMatchType::DialogueWithNarration,
        )),
        Arc::new(MatchLengthCriterion::new(
            0.25,
            target_words,
            TextLengthUnit::Words,
        )),
    ];

    let name = character.display_name();
    if !name.is_empty() {
        criteria.push(Arc::new(MatchContentCriterion::new(
            0.1,
            vec![name.to_string()],
            ContentMatchType::Includes,
        )));
    }

    Task::new(TaskFamily::DialogueFromScenario, base_text, character, criteria)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn ava() -> Character {
        Character::new("Ava", "A curious robot.")
    }

    #[test]
    fn test_message_from_description_targets_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let task = create_message_from_description_task("A curious robot.", ava(), &mut rng);
            assert_eq!(task.criteria().len(), 2);
            assert_eq!(task.task_type(), "message-from-description");
            assert_eq!(task.task_name(), "augment");

            let strs = task.get_criteria_strs();
            let words: usize = strs[0]
                .trim_start_matches("The response must be ")
                .split(' ')
                .next()
                .unwrap()
                .parse()
                .unwrap();
            let sentences: usize = strs[1]
                .trim_start_matches("The response must be ")
                .split(' ')
                .next()
                .unwrap()
                .parse()
                .unwrap();
            assert!((50..=200).contains(&words));
            assert!((4..=10).contains(&sentences));
            assert!(strs[0].ends_with("words long."));
            assert!(strs[1].ends_with("sentences long."));
        }
    }

    #[test]
    fn test_same_seed_builds_same_prompt() {
        let a = create_message_from_description_task("x", ava(), &mut StdRng::seed_from_u64(9));
        let b = create_message_from_description_task("x", ava(), &mut StdRng::seed_from_u64(9));
        assert_eq!(a.compose_prompt(), b.compose_prompt());
    }

    #[test]
    fn test_dialogue_task_requires_character_name() {
        let mut rng = StdRng::seed_from_u64(1);
        let task = TaskFamily::DialogueFromScenario.build(ava(), &mut rng);
        let strs = task.get_criteria_strs();
        assert_eq!(strs.len(), 3);
        assert_eq!(
            strs[0],
            "The response must be written as quoted dialogue mixed with narration."
        );
        assert_eq!(strs[2], "The response must include the word \"Ava\".");
        assert_eq!(task.base_text(), "A curious robot.");
    }

    #[test]
    fn test_sample_covers_every_family() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            seen.insert(TaskFamily::sample(&mut rng));
        }
        assert_eq!(seen.len(), TaskFamily::ALL.len());
    }
}
