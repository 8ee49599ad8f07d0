use anyhow::{Context, Result};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSignal {
    Fraction,
    Operator,
    Equals,
    Digit,
    Keyword,
    Word,
}

#[derive(Debug)]
pub struct ContentValidator {
    fraction: Regex,
    operator: Regex,
    keyword: Regex,
    word: Regex,
}

impl ContentValidator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fraction: Regex::new(r"\d+\s*/\s*\d+").context("failed to compile fraction regex")?,
            operator: Regex::new(r"\d\s*[-+×x*÷:]\s*\d")
                .context("failed to compile arithmetic operator regex")?,
            keyword: Regex::new(
                r"(?i)calcul|r[ée]soudre|simplifi|r[ée]duire|complet|[ée]cri[rsv]|trouve",
            )
            .context("failed to compile instruction keyword regex")?,
            word: Regex::new(r"\p{L}{3,}").context("failed to compile word regex")?,
        })
    }

    pub fn is_educational(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.chars().count() <= 2 {
            return false;
        }

        if !trimmed.chars().any(char::is_alphanumeric) {
            return false;
        }

        !self.signals(trimmed).is_empty()
    }

    pub fn signals(&self, text: &str) -> Vec<ContentSignal> {
        let mut signals = Vec::new();

        if self.fraction.is_match(text) {
            signals.push(ContentSignal::Fraction);
        }
        if self.operator.is_match(text) {
            signals.push(ContentSignal::Operator);
        }
        if text.contains('=') {
            signals.push(ContentSignal::Equals);
        }
        if text.chars().any(|ch| ch.is_ascii_digit()) {
            signals.push(ContentSignal::Digit);
        }
        if self.keyword.is_match(text) {
            signals.push(ContentSignal::Keyword);
        }
        if self.word.is_match(text) {
            signals.push(ContentSignal::Word);
        }

        signals
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("....", false)]
    #[case("  ", false)]
    #[case("", false)]
    #[case("a)", false)]
    #[case("?!;", false)]
    #[case("x y", false)]
    #[case("calcule 3/4", true)]
    #[case("12 + 7", true)]
    #[case("x=4", true)]
    #[case("Résoudre", true)]
    #[case("écris la suite", true)]
    #[case("b. 45", true)]
    fn is_educational_matches_expected(#[case] text: &str, #[case] expected: bool) {
        let validator = ContentValidator::new().expect("validator patterns compile");
        assert_eq!(validator.is_educational(text), expected, "input: {text:?}");
    }

    #[test]
    fn signals_report_every_matching_heuristic() {
        let validator = ContentValidator::new().expect("validator patterns compile");

        let signals = validator.signals("Simplifie 30/63 = 10/21");
        assert!(signals.contains(&ContentSignal::Fraction));
        assert!(signals.contains(&ContentSignal::Equals));
        assert!(signals.contains(&ContentSignal::Digit));
        assert!(signals.contains(&ContentSignal::Keyword));
        assert!(signals.contains(&ContentSignal::Word));
        assert!(!signals.contains(&ContentSignal::Operator));

        assert_eq!(validator.signals("4 × 5"), vec![
            ContentSignal::Operator,
            ContentSignal::Digit
        ]);
    }
}
