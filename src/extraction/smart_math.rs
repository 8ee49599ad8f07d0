use std::collections::HashMap;
use std::ops::Range;

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use tracing::debug;

use super::config::DuplicatePolicy;
use super::validate::ContentValidator;
use crate::model::{ExerciseCandidate, Marker, MarkerKind, StrategyTag};

const FORMULA: &str = r"\\d?frac\s*\{\s*\d+\s*\}\s*\{\s*\d+\s*\}";
const PLAIN: &str = r"\(?\s*\d+\s*\)?\s*/\s*\(?\s*\d+\s*\)?";
const FORMULA_CAPTURE: &str = r"\\d?frac\s*\{\s*(?P<fnum>\d+)\s*\}\s*\{\s*(?P<fden>\d+)\s*\}";
const PLAIN_CAPTURE: &str = r"\(?\s*(?P<num>\d+)\s*\)?\s*/\s*\(?\s*(?P<den>\d+)\s*\)?";
const BARE_CAPTURE: &str = r"(?P<num>\d+)\s*/\s*(?P<den>\d+)";
const ARROW: &str = r"(?:→|->|=>|⇒|:)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FractionToken {
    pub numerator: String,
    pub denominator: String,
    pub span: Range<usize>,
    pub surface: String,
}

impl FractionToken {
    pub fn fraction(&self) -> String {
        format!("{}/{}", self.numerator, self.denominator)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FractionSurface {
    Formula,
    Plain,
}

impl FractionSurface {
    fn provenance(self) -> StrategyTag {
        match self {
            Self::Formula => StrategyTag::SmartMathLatex,
            Self::Plain => StrategyTag::SmartMathOcr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnswerPattern {
    FormulaEquals,
    PlainEquals,
    Enclosed,
    Arrow,
}

impl AnswerPattern {
    const ORDER: [AnswerPattern; 4] = [
        AnswerPattern::FormulaEquals,
        AnswerPattern::PlainEquals,
        AnswerPattern::Enclosed,
        AnswerPattern::Arrow,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::FormulaEquals => "formula_equals",
            Self::PlainEquals => "plain_equals",
            Self::Enclosed => "enclosed",
            Self::Arrow => "arrow",
        }
    }

    // Anchored at the problem fraction; the answer is captured as fnum/fden or num/den.
    fn pattern(self) -> String {
        let problem = format!("(?:{FORMULA}|{PLAIN})");
        match self {
            Self::FormulaEquals => format!(r"^{FORMULA}\s*=\s*{FORMULA_CAPTURE}"),
            Self::PlainEquals => format!(r"^{PLAIN}\s*=\s*{PLAIN_CAPTURE}"),
            Self::Enclosed => {
                let answer = format!("(?:{FORMULA_CAPTURE}|{BARE_CAPTURE})");
                format!(r"^{problem}[^()\[\]\n]{{0,40}}?[(\[]\s*{answer}\s*[)\]]")
            }
            Self::Arrow => {
                format!(r"^{problem}\s*{ARROW}\s*(?:{FORMULA_CAPTURE}|{PLAIN_CAPTURE})")
            }
        }
    }
}

#[derive(Debug, Clone)]
struct MathFinding {
    token: FractionToken,
    candidate: ExerciseCandidate,
}

#[derive(Debug)]
pub struct SmartMathExtractor {
    formula_token: Regex,
    plain_token: Regex,
    answer_patterns: Vec<(AnswerPattern, Regex)>,
    answer_window_chars: usize,
    duplicate_policy: DuplicatePolicy,
}

impl SmartMathExtractor {
    pub fn new(answer_window_chars: usize, duplicate_policy: DuplicatePolicy) -> Result<Self> {
        let mut answer_patterns = Vec::with_capacity(AnswerPattern::ORDER.len());
        for kind in AnswerPattern::ORDER {
            let regex = Regex::new(&kind.pattern()).with_context(|| {
                format!("failed to compile {} answer regex", kind.as_str())
            })?;
            answer_patterns.push((kind, regex));
        }

        Ok(Self {
            formula_token: Regex::new(FORMULA_CAPTURE)
                .context("failed to compile markup fraction token regex")?,
            plain_token: Regex::new(
                r"\(?\b(?P<num>\d{1,4})\)?\s*/\s*\(?(?P<den>\d{1,4})\b\)?",
            )
            .context("failed to compile plain fraction token regex")?,
            answer_patterns,
            answer_window_chars,
            duplicate_policy,
        })
    }

    /// Formula-markup pass then plain-OCR pass over the raw text, followed by
    /// duplicate reconciliation.
    pub fn extract_smart_math(
        &self,
        text: &str,
        validator: &ContentValidator,
    ) -> Vec<ExerciseCandidate> {
        let mut findings = self.run_pass(text, FractionSurface::Formula, validator);
        findings.extend(self.run_pass(text, FractionSurface::Plain, validator));

        reconcile_duplicates(findings, self.duplicate_policy)
            .into_iter()
            .map(|finding| finding.candidate)
            .collect()
    }

    fn run_pass(
        &self,
        text: &str,
        surface: FractionSurface,
        validator: &ContentValidator,
    ) -> Vec<MathFinding> {
        let mut findings = Vec::new();
        // End of the most recent bound answer; fractions inside it are answers, not exercises.
        let mut bound_until = 0usize;

        for token in self.find_tokens(text, surface) {
            if token.span.start < bound_until {
                continue;
            }

            let answer = match self.find_answer(text, &token) {
                Some((answer, answer_end)) => {
                    bound_until = answer_end;
                    answer
                }
                None => String::new(),
            };

            let label = sequence_letter(findings.len());
            let question = format!("{label}. Simplifiez la fraction {}", token.fraction());
            if !validator.is_educational(&question) {
                continue;
            }

            let candidate = ExerciseCandidate::new(
                Some(Marker::new(MarkerKind::Lettered, label)),
                question,
                surface.provenance(),
            )
            .with_answer(answer);
            findings.push(MathFinding { token, candidate });
        }

        findings
    }

    fn find_tokens(&self, text: &str, surface: FractionSurface) -> Vec<FractionToken> {
        let (regex, num, den) = match surface {
            FractionSurface::Formula => (&self.formula_token, "fnum", "fden"),
            FractionSurface::Plain => (&self.plain_token, "num", "den"),
        };

        regex
            .captures_iter(text)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                if surface == FractionSurface::Plain && is_slash_chain(text, whole.range()) {
                    return None;
                }
                Some(FractionToken {
                    numerator: captures.name(num)?.as_str().to_string(),
                    denominator: captures.name(den)?.as_str().to_string(),
                    span: whole.range(),
                    surface: whole.as_str().to_string(),
                })
            })
            .collect()
    }

    /// Returns the bound answer and the byte offset where its match ends.
    fn find_answer(&self, text: &str, token: &FractionToken) -> Option<(String, usize)> {
        let window_end = text[token.span.end..]
            .char_indices()
            .nth(self.answer_window_chars)
            .map(|(offset, _)| token.span.end + offset)
            .unwrap_or(text.len());
        let window = &text[token.span.start..window_end];

        self.answer_patterns.iter().find_map(|(kind, regex)| {
            let captures = regex.captures(window)?;
            let answer = fraction_from_captures(&captures)?;
            let end = token.span.start + captures.get(0)?.end();
            debug!(
                fraction = %token.fraction(),
                surface = %token.surface,
                answer = %answer,
                pattern = kind.as_str(),
                "bound answer to fraction"
            );
            Some((answer, end))
        })
    }
}

fn fraction_from_captures(captures: &Captures<'_>) -> Option<String> {
    let pair = captures
        .name("fnum")
        .zip(captures.name("fden"))
        .or_else(|| captures.name("num").zip(captures.name("den")))?;
    Some(format!("{}/{}", pair.0.as_str(), pair.1.as_str()))
}

fn is_slash_chain(text: &str, span: Range<usize>) -> bool {
    let before = text[..span.start].trim_end().ends_with('/');
    let after = text[span.end..].trim_start().starts_with('/');
    before || after
}

fn sequence_letter(index: usize) -> String {
    let mut label = Vec::new();
    let mut value = index + 1;
    while value > 0 {
        let digit = (value - 1) % 26;
        label.push(char::from(b'a' + digit as u8));
        value = (value - 1) / 26;
    }
    label.iter().rev().collect()
}

/// `Keep` returns both passes untouched. `PreferFormula` drops a plain-OCR finding when
/// the formula pass found the same fraction, carrying its answer over if the formula
/// finding has none.
fn reconcile_duplicates(findings: Vec<MathFinding>, policy: DuplicatePolicy) -> Vec<MathFinding> {
    if policy == DuplicatePolicy::Keep {
        return findings;
    }

    let (mut formula, plain): (Vec<MathFinding>, Vec<MathFinding>) = findings
        .into_iter()
        .partition(|finding| finding.candidate.provenance == StrategyTag::SmartMathLatex);

    let mut formula_index: HashMap<String, usize> = HashMap::new();
    for (index, finding) in formula.iter().enumerate() {
        formula_index.entry(finding.token.fraction()).or_insert(index);
    }

    let mut kept_plain = Vec::new();
    for finding in plain {
        match formula_index.get(&finding.token.fraction()) {
            Some(&index) => {
                let preferred = &mut formula[index].candidate;
                if preferred.answer.is_empty() && !finding.candidate.answer.is_empty() {
                    preferred.answer = finding.candidate.answer;
                }
                debug!(
                    fraction = %finding.token.fraction(),
                    "dropped plain duplicate of markup fraction"
                );
            }
            None => kept_plain.push(finding),
        }
    }

    formula.extend(kept_plain);
    formula
}
