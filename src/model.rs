use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::extraction::DuplicatePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Lettered,
    Numbered,
    Roman,
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub label: String,
}

impl Marker {
    pub fn new(kind: MarkerKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyTag {
    Delimiter,
    SmartMathLatex,
    SmartMathOcr,
    BoundaryScan,
    Clustering,
    WholeDocumentFallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseCandidate {
    pub identifier: Option<Marker>,
    pub question: String,
    pub answer: String,
    pub provenance: StrategyTag,
}

impl ExerciseCandidate {
    pub fn new(identifier: Option<Marker>, question: String, provenance: StrategyTag) -> Self {
        Self {
            identifier,
            question,
            answer: String::new(),
            provenance,
        }
    }

    pub fn with_answer(mut self, answer: String) -> Self {
        self.answer = answer;
        self
    }

    // An empty answer is a prompt for the student, not a wrong answer.
    pub fn needs_student_input(&self) -> bool {
        self.answer.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Delimiter,
    SmartMath,
    BoundaryScan,
    Clustering,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delimiter => "delimiter",
            Self::SmartMath => "smart-math",
            Self::BoundaryScan => "boundary-scan",
            Self::Clustering => "clustering",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyAttempt {
    pub strategy: StrategyKind,
    pub candidates: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutcome {
    pub strategy: Option<StrategyKind>,
    pub attempts: Vec<StrategyAttempt>,
    pub exercises: Vec<ExerciseCandidate>,
    pub needs_review: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub report_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub input: String,
    pub input_sha256: String,
    pub input_chars: usize,
    pub policy: Vec<StrategyKind>,
    pub duplicate_policy: DuplicatePolicy,
    pub outcome: ExtractionOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    pub filename: String,
    pub sha256: String,
    pub needs_review: bool,
    pub exercise_count: usize,
    pub exercises: Vec<ExerciseCandidate>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchCounts {
    pub pages_total: usize,
    pub pages_needing_review: usize,
    pub exercises_total: usize,
    pub exercises_with_answers: usize,
    pub by_provenance: BTreeMap<StrategyTag, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub updated_at: String,
    pub source_directory: String,
    pub policy: Vec<StrategyKind>,
    pub duplicate_policy: DuplicatePolicy,
    pub counts: BatchCounts,
    pub pages: Vec<PageResult>,
    pub warnings: Vec<String>,
}
