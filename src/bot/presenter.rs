//! Response presentation: sentence splitting and the random text/voice mix.

use rand::Rng;

/// How a response gets delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// All parts as text messages.
    TextOnly,
    /// The whole response as one voice message.
    VoiceOnly,
    /// First part as text, second part (if any) as voice.
    SplitTextVoice,
    /// Coin flip between both parts as text and each part as voice.
    Repeated,
}

/// Presentation selection, injectable so tests can pin the outcome.
pub trait Chooser: Send + Sync {
    /// Pick a presentation variant for one response.
    fn choose(&self) -> Presentation;
    /// Coin flip used by [`Presentation::Repeated`].
    fn coin(&self) -> bool;
}

/// Uniformly random chooser used in production.
pub struct RandomChooser;

impl Chooser for RandomChooser {
    fn choose(&self) -> Presentation {
        match rand::thread_rng().gen_range(0..4) {
            0 => Presentation::TextOnly,
            1 => Presentation::VoiceOnly,
            2 => Presentation::SplitTextVoice,
            _ => Presentation::Repeated,
        }
    }

    fn coin(&self) -> bool {
        rand::thread_rng().gen_bool(0.5)
    }
}

/// Split a response into one or two sentence-grouped parts.
///
/// Splits on `". "`; a single sentence comes back verbatim. Otherwise the
/// sentence list is split at its midpoint (floor) and each half is rejoined
/// with `". "` and closed with a period.
pub fn split_response(text: &str) -> Vec<String> {
    let sentences: Vec<&str> = text.split(". ").collect();
    if sentences.len() <= 1 {
        return vec![text.to_string()];
    }

    let mid = sentences.len() / 2;
    let first_half = format!("{}.", sentences[..mid].join(". ").trim_end_matches('.'));
    let second_half = format!("{}.", sentences[mid..].join(". ").trim_end_matches('.'));
    vec![first_half, second_half]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_sentence_is_returned_whole() {
        assert_eq!(split_response("OnlySentence"), vec!["OnlySentence"]);
        assert_eq!(split_response("No terminator here"), vec!["No terminator here"]);
    }

    #[test]
    fn test_three_sentences_split_one_two() {
        let parts = split_response("A. B. C.");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], "A.");
        assert_eq!(parts[1], "B. C.");
        assert!(parts.iter().all(|p| p.ends_with('.')));
    }

    #[test]
    fn test_five_sentences_split_two_three() {
        let parts = split_response("Um. Dois. Três. Quatro. Cinco.");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], "Um. Dois.");
        assert_eq!(parts[1], "Três. Quatro. Cinco.");
    }

    #[test]
    fn test_two_sentences_split_evenly() {
        let parts = split_response("Hi there. How are you.");
        assert_eq!(parts, vec!["Hi there.", "How are you."]);
    }

    #[test]
    fn test_parts_end_with_single_period() {
        let parts = split_response("First. Second. Third.");
        for part in parts {
            assert!(part.ends_with('.'));
            assert!(!part.ends_with(".."));
        }
    }

    #[test]
    fn test_random_chooser_stays_in_range() {
        // Non-deterministic by design; just check every draw is a valid variant
        let chooser = RandomChooser;
        for _ in 0..50 {
            let _ = chooser.coin();
            match chooser.choose() {
                Presentation::TextOnly
                | Presentation::VoiceOnly
                | Presentation::SplitTextVoice
                | Presentation::Repeated => {}
            }
        }
    }
}
