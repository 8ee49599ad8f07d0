use anyhow::{Context, Result};
use tracing::debug;

use super::boundary::BoundaryScanner;
use super::cluster::ContentClusterer;
use super::config::ExtractionConfig;
use super::delimiter::DelimiterExtractor;
use super::normalize::TextNormalizer;
use super::smart_math::SmartMathExtractor;
use super::validate::ContentValidator;
use crate::model::{
    ExerciseCandidate, ExtractionOutcome, StrategyAttempt, StrategyKind, StrategyTag,
};

const FALLBACK_QUESTION: &str = "Document Content";

struct StrategyInput<'a> {
    raw: &'a str,
    normalized: &'a str,
}

/// Runs the configured strategies in order over one page of OCR text.
#[derive(Debug)]
pub struct ExerciseExtractor {
    config: ExtractionConfig,
    normalizer: TextNormalizer,
    validator: ContentValidator,
    delimiter: DelimiterExtractor,
    smart_math: SmartMathExtractor,
    boundary: BoundaryScanner,
    clusterer: ContentClusterer,
}

impl ExerciseExtractor {
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        config.validate().context("invalid extraction config")?;

        Ok(Self {
            normalizer: TextNormalizer::new()?,
            validator: ContentValidator::new()?,
            delimiter: DelimiterExtractor::new()?,
            smart_math: SmartMathExtractor::new(
                config.answer_window_chars,
                config.duplicate_policy,
            )?,
            boundary: BoundaryScanner::new()?,
            clusterer: ContentClusterer::new(
                config.cluster_max_span_chars,
                config.min_separator_part_chars,
            )?,
            config,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn normalize(&self, raw: &str) -> String {
        self.normalizer.normalize(raw)
    }

    pub fn extract(&self, raw: &str) -> Vec<ExerciseCandidate> {
        self.extract_with_outcome(raw).exercises
    }

    pub fn extract_with_outcome(&self, raw: &str) -> ExtractionOutcome {
        let normalized = self.normalizer.normalize(raw);
        let input = StrategyInput {
            raw,
            normalized: &normalized,
        };

        let mut attempts = Vec::with_capacity(self.config.policy.len());
        for &strategy in &self.config.policy {
            let exercises = self.run_strategy(strategy, &input);
            debug!(
                strategy = strategy.as_str(),
                candidates = exercises.len(),
                "strategy attempt finished"
            );
            attempts.push(StrategyAttempt {
                strategy,
                candidates: exercises.len(),
            });

            if !exercises.is_empty() {
                return ExtractionOutcome {
                    strategy: Some(strategy),
                    attempts,
                    exercises,
                    needs_review: false,
                };
            }
        }

        let exercises = self.fallback(raw).into_iter().collect::<Vec<_>>();
        let needs_review = !exercises.is_empty();
        if needs_review {
            debug!(
                chars = raw.chars().count(),
                "no strategy matched, using whole document"
            );
        }

        ExtractionOutcome {
            strategy: None,
            attempts,
            exercises,
            needs_review,
        }
    }

    fn run_strategy(
        &self,
        strategy: StrategyKind,
        input: &StrategyInput<'_>,
    ) -> Vec<ExerciseCandidate> {
        match strategy {
            StrategyKind::Delimiter => self
                .delimiter
                .extract_delimited(input.normalized, &self.validator),
            StrategyKind::SmartMath => self
                .smart_math
                .extract_smart_math(input.raw, &self.validator),
            StrategyKind::BoundaryScan => self.boundary.scan(input.normalized, &self.validator),
            StrategyKind::Clustering => self
                .clusterer
                .extract_clusters(input.normalized, &self.validator),
        }
    }

    fn fallback(&self, raw: &str) -> Option<ExerciseCandidate> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let preview: String = trimmed.chars().take(self.config.fallback_preview_chars).collect();
        Some(
            ExerciseCandidate::new(
                None,
                FALLBACK_QUESTION.to_string(),
                StrategyTag::WholeDocumentFallback,
            )
            .with_answer(preview),
        )
    }
}
