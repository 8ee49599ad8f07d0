use anyhow::Result;

use super::markers::MarkerPatterns;
use super::validate::ContentValidator;
use crate::model::{ExerciseCandidate, Marker, StrategyTag};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanState {
    pub current_marker: Option<Marker>,
    pub accumulated_body: String,
}

impl ScanState {
    fn open(marker: Marker, body: String) -> Self {
        Self {
            current_marker: Some(marker),
            accumulated_body: body,
        }
    }

    fn append(mut self, line: &str) -> Self {
        if !self.accumulated_body.is_empty() {
            self.accumulated_body.push(' ');
        }
        self.accumulated_body.push_str(line);
        self
    }
}

/// Closes the open exercise, if any, and returns an empty state.
pub fn flush(
    state: ScanState,
    validator: &ContentValidator,
) -> (Option<ExerciseCandidate>, ScanState) {
    let Some(marker) = state.current_marker else {
        return (None, ScanState::default());
    };

    let body = state.accumulated_body.trim();
    let keep = validator.is_educational(body) || body.chars().count() > 2;
    if !keep {
        return (None, ScanState::default());
    }

    let question = format!("{marker}. {body}");
    let candidate = ExerciseCandidate::new(Some(marker), question, StrategyTag::BoundaryScan);
    (Some(candidate), ScanState::default())
}

#[derive(Debug)]
pub struct BoundaryScanner {
    markers: MarkerPatterns,
}

impl BoundaryScanner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            markers: MarkerPatterns::new()?,
        })
    }

    pub fn scan(&self, text: &str, validator: &ContentValidator) -> Vec<ExerciseCandidate> {
        let (mut candidates, state) = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .fold((Vec::new(), ScanState::default()), |(mut candidates, state), line| {
                let state = match self.markers.match_line(line) {
                    Some((marker, body)) => {
                        let (candidate, _) = flush(state, validator);
                        candidates.extend(candidate);
                        ScanState::open(marker, body)
                    }
                    None if state.current_marker.is_some() => state.append(line),
                    None => state,
                };
                (candidates, state)
            });

        let (last, _) = flush(state, validator);
        candidates.extend(last);
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MarkerKind;

    fn scan(text: &str) -> Vec<ExerciseCandidate> {
        let scanner = BoundaryScanner::new().expect("marker patterns compile");
        let validator = ContentValidator::new().expect("validator patterns compile");
        scanner.scan(text, &validator)
    }

    #[test]
    fn each_marker_opens_a_new_exercise() {
        let candidates =
            scan("a. Simplifiez la fraction 30/63\nb. Simplifiez la fraction 12/18");

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].question, "a. Simplifiez la fraction 30/63");
        assert_eq!(candidates[1].question, "b. Simplifiez la fraction 12/18");
        assert_eq!(
            candidates[1].identifier,
            Some(Marker::new(MarkerKind::Lettered, "b"))
        );
        assert!(candidates.iter().all(|candidate| candidate.answer.is_empty()));
        assert!(
            candidates
                .iter()
                .all(|candidate| candidate.provenance == StrategyTag::BoundaryScan)
        );
    }

    #[test]
    fn continuation_lines_join_the_open_exercise() {
        let candidates = scan(concat!(
            "Titre de la fiche\nExercice 1\nTrouve x si x+2=5\n",
            "et vérifie\n\nII) Réduire 4/8",
        ));

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].question, "Exercice 1. Trouve x si x+2=5 et vérifie");
        assert_eq!(candidates[1].question, "II. Réduire 4/8");
        assert_eq!(
            candidates[1].identifier,
            Some(Marker::new(MarkerKind::Roman, "II"))
        );
    }

    #[test]
    fn calculation_keyword_does_not_swallow_its_operand() {
        let candidates = scan("Calcule 25 + 17\ncalcule 5+6");

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].question, "Calcule. 25 + 17");
        assert_eq!(candidates[1].question, "Calcule. 5+6");
        assert_eq!(
            candidates[0].identifier,
            Some(Marker::new(MarkerKind::Keyword, "Calcule"))
        );
    }

    #[test]
    fn empty_bodies_are_discarded() {
        let candidates = scan("a)\nb) 12\nc. ..");
        assert!(candidates.is_empty());
    }

    #[test]
    fn flush_without_marker_emits_nothing() {
        let validator = ContentValidator::new().expect("validator patterns compile");
        let state = ScanState {
            current_marker: None,
            accumulated_body: "calcule 3+4".to_string(),
        };

        let (candidate, next) = flush(state, &validator);
        assert!(candidate.is_none());
        assert_eq!(next, ScanState::default());
    }
}
