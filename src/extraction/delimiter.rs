use anyhow::{Context, Result};
use regex::Regex;

use super::markers::MarkerPatterns;
use super::validate::ContentValidator;
use crate::model::{ExerciseCandidate, StrategyTag};

const START_SENTINEL: &str = "EXERCISE_START";

#[derive(Debug)]
pub struct DelimiterExtractor {
    pair: Regex,
    markers: MarkerPatterns,
}

impl DelimiterExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pair: Regex::new(concat!(
                r"(?s)(?:\[|<<?)?\s*EXERCISE_START\s*(?:\]|>>?)?",
                r"(?P<body>.*?)",
                r"(?:\[|<<?)?\s*EXERCISE_END\s*(?:\]|>>?)?",
            ))
            .context("failed to compile exercise sentinel regex")?,
            markers: MarkerPatterns::new()?,
        })
    }

    pub fn extract_delimited(
        &self,
        text: &str,
        validator: &ContentValidator,
    ) -> Vec<ExerciseCandidate> {
        self.pair
            .captures_iter(text)
            .filter_map(|captures| {
                let body = captures.name("body")?.as_str();
                // A start sentinel left open before this pair only contributes its tail.
                let body = body
                    .rsplit(START_SENTINEL)
                    .next()
                    .unwrap_or(body)
                    .trim_start_matches([']', '>']);
                let body = condense_whitespace(body);

                if !validator.is_educational(&body) {
                    return None;
                }

                let candidate = match self.markers.match_line(&body) {
                    Some((marker, rest)) if !rest.is_empty() => {
                        let question = format!("{marker}. {rest}");
                        ExerciseCandidate::new(Some(marker), question, StrategyTag::Delimiter)
                    }
                    _ => ExerciseCandidate::new(None, body, StrategyTag::Delimiter),
                };
                Some(candidate)
            })
            .collect()
    }
}

fn condense_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Marker, MarkerKind};

    fn extract(text: &str) -> Vec<ExerciseCandidate> {
        let extractor = DelimiterExtractor::new().expect("sentinel regex compiles");
        let validator = ContentValidator::new().expect("validator patterns compile");
        extractor.extract_delimited(text, &validator)
    }

    #[test]
    fn paired_sentinels_become_candidates_with_empty_answers() {
        let text = concat!(
            "EXERCISE_START a) Calcule 3+4 EXERCISE_END bruit\n",
            "[EXERCISE_START]\nTrouve x si x+2=5\n[EXERCISE_END]",
        );

        let candidates = extract(text);
        assert_eq!(candidates.len(), 2);

        assert_eq!(candidates[0].question, "a. Calcule 3+4");
        assert_eq!(
            candidates[0].identifier,
            Some(Marker::new(MarkerKind::Lettered, "a"))
        );
        assert!(candidates[0].answer.is_empty());
        assert_eq!(candidates[0].provenance, StrategyTag::Delimiter);

        assert_eq!(candidates[1].question, "Trouve x si x+2=5");
        assert!(candidates[1].identifier.is_none());
    }

    #[test]
    fn trivial_and_unpaired_blocks_are_ignored() {
        assert!(extract("EXERCISE_START .. EXERCISE_END").is_empty());
        assert!(extract("EXERCISE_START Calcule 3+4 sans fin").is_empty());
        assert!(extract("aucun marqueur 3+4").is_empty());
    }

    #[test]
    fn dangling_start_uses_innermost_block() {
        let candidates = extract("EXERCISE_START perdu EXERCISE_START 12/18 EXERCISE_END");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].question, "12/18");
    }
}
