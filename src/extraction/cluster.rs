use anyhow::{Context, Result};
use regex::Regex;

use super::validate::ContentValidator;
use crate::model::{ExerciseCandidate, Marker, MarkerKind, StrategyTag};

// Tried in order; the first one that yields enough parts wins.
const SEPARATORS: [&str; 4] = ["\n\n", ". ", "? ", "! "];

#[derive(Debug)]
pub struct ContentClusterer {
    sentence_break: Regex,
    math_signal: Regex,
    max_span_chars: usize,
    min_part_chars: usize,
}

impl ContentClusterer {
    pub fn new(max_span_chars: usize, min_part_chars: usize) -> Result<Self> {
        Ok(Self {
            sentence_break: Regex::new(r"[.!?](?:\s+|$)|\n+")
                .context("failed to compile sentence break regex")?,
            math_signal: Regex::new(r"\d+\s*/\s*\d+|\d\s*[-+×x*÷:]\s*\d|=")
                .context("failed to compile math signal regex")?,
            max_span_chars,
            min_part_chars,
        })
    }

    pub fn extract_clusters(
        &self,
        text: &str,
        validator: &ContentValidator,
    ) -> Vec<ExerciseCandidate> {
        let clusters = self.math_clusters(text, validator);
        if clusters.len() >= 2 {
            return numbered(clusters);
        }

        SEPARATORS
            .iter()
            .map(|separator| self.separator_parts(text, separator, validator))
            .find(|parts| parts.len() >= 2)
            .map(numbered)
            .unwrap_or_default()
    }

    fn math_clusters<'a>(&self, text: &'a str, validator: &ContentValidator) -> Vec<&'a str> {
        self.sentence_spans(text)
            .into_iter()
            .filter(|span| self.math_signal.is_match(span))
            .filter(|span| span.chars().count() <= self.max_span_chars)
            .filter(|span| validator.is_educational(span))
            .collect()
    }

    /// Sentences end at `.`, `!` or `?` followed by whitespace or the end of text, or at
    /// a line break. The terminating punctuation stays with its sentence.
    fn sentence_spans<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut spans = Vec::new();
        let mut cursor = 0;

        for found in self.sentence_break.find_iter(text) {
            let end = if found.as_str().starts_with(['.', '!', '?']) {
                found.start() + 1
            } else {
                found.start()
            };
            spans.push(text[cursor..end].trim());
            cursor = found.end();
        }
        spans.push(text[cursor..].trim());

        spans.retain(|span| !span.is_empty());
        spans
    }

    fn separator_parts<'a>(
        &self,
        text: &'a str,
        separator: &str,
        validator: &ContentValidator,
    ) -> Vec<&'a str> {
        text.split(separator)
            .map(str::trim)
            .filter(|part| part.chars().count() > self.min_part_chars)
            .filter(|part| validator.is_educational(part))
            .collect()
    }
}

fn numbered(parts: Vec<&str>) -> Vec<ExerciseCandidate> {
    parts
        .into_iter()
        .enumerate()
        .map(|(index, part)| {
            let label = (index + 1).to_string();
            let question = format!("{label}. {part}");
            ExerciseCandidate::new(
                Some(Marker::new(MarkerKind::Numbered, label)),
                question,
                StrategyTag::Clustering,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clusters(text: &str, max_span: usize) -> Vec<ExerciseCandidate> {
        let clusterer = ContentClusterer::new(max_span, 10).expect("cluster patterns compile");
        let validator = ContentValidator::new().expect("validator patterns compile");
        clusterer.extract_clusters(text, &validator)
    }

    #[test]
    fn math_sentences_become_numbered_exercises() {
        let candidates = clusters(
            "Calcule 3+4. Puis écris 12/18 en plus simple! Enfin x=5 ? Bonne chance",
            240,
        );

        let questions: Vec<&str> = candidates
            .iter()
            .map(|candidate| candidate.question.as_str())
            .collect();
        assert_eq!(questions, vec![
            "1. Calcule 3+4.",
            "2. Puis écris 12/18 en plus simple!",
            "3. Enfin x=5 ?",
        ]);
        assert_eq!(
            candidates[2].identifier,
            Some(Marker::new(MarkerKind::Numbered, "3"))
        );
        assert!(
            candidates
                .iter()
                .all(|candidate| candidate.provenance == StrategyTag::Clustering)
        );
    }

    #[test]
    fn oversized_spans_are_skipped() {
        let candidates = clusters(
            "Calcule 3+4 et encore beaucoup de texte ici. Puis 5+6. Enfin 7+8.",
            20,
        );

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].question, "1. Puis 5+6.");
        assert_eq!(candidates[1].question, "2. Enfin 7+8.");
    }

    #[test]
    fn separator_split_used_when_no_math_clusters() {
        let candidates = clusters(
            "Lis attentivement le texte suivant.\n\nRéponds aux questions posées",
            240,
        );

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].question, "1. Lis attentivement le texte suivant.");
        assert_eq!(candidates[1].question, "2. Réponds aux questions posées");
    }

    #[test]
    fn single_fragment_yields_nothing() {
        assert!(clusters("Bonjour", 240).is_empty());
        assert!(clusters("Calcule 3+4", 240).is_empty());
        assert!(clusters("", 240).is_empty());
    }
}
