use std::borrow::Cow;

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use unicode_normalization::UnicodeNormalization;

use super::markers::MarkerPatterns;
use crate::model::MarkerKind;

#[derive(Debug)]
pub struct TextNormalizer {
    fill_run: Regex,
    latex_fraction: Regex,
    latex_times: Regex,
    latex_div: Regex,
    markup_fragment: Regex,
    marker_punctuation: Regex,
    fraction_spacing: Regex,
    equals_spacing: Regex,
    horizontal_space: Regex,
    blank_lines: Regex,
    markers: MarkerPatterns,
}

impl TextNormalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fill_run: Regex::new(r"\.{4,}|_{4,}").context("failed to compile fill-line regex")?,
            latex_fraction: Regex::new(r"\\d?frac\s*\{([^{}]*)\}\s*\{([^{}]*)\}")
                .context("failed to compile markup fraction regex")?,
            latex_times: Regex::new(r"\\(?:times|cdot)")
                .context("failed to compile markup product regex")?,
            latex_div: Regex::new(r"\\div").context("failed to compile markup quotient regex")?,
            markup_fragment: Regex::new(r"\\[A-Za-z]+|\\[()\[\]]|\$+|[{}]")
                .context("failed to compile markup fragment regex")?,
            marker_punctuation: Regex::new(
                r"(?m)^[^\S\n]*([a-h]|\d{1,2}|[IVX]{1,4})[^\S\n]*[,.][^\S\n]+",
            )
            .context("failed to compile marker punctuation regex")?,
            fraction_spacing: Regex::new(r"(\d)(?:[^\S\n]+/[^\S\n]*|/[^\S\n]+)(\d)")
                .context("failed to compile fraction spacing regex")?,
            equals_spacing: Regex::new(r"[^\S\n]+=[^\S\n]*|=[^\S\n]+")
                .context("failed to compile equals spacing regex")?,
            horizontal_space: Regex::new(r"[^\S\n]+")
                .context("failed to compile horizontal whitespace regex")?,
            blank_lines: Regex::new(r"\n{3,}").context("failed to compile blank line regex")?,
            markers: MarkerPatterns::new()?,
        })
    }

    /// Cleans OCR output so that each exercise marker starts its own line.
    ///
    /// The stages run in a fixed order: encoding, fill lines, markup, spacing, marker
    /// collisions, whitespace. Applying the result a second time is a no-op.
    pub fn normalize(&self, raw: &str) -> String {
        let text = canonicalize_encoding(raw);
        let text = self.fill_run.replace_all(&text, " ");
        let text = self.strip_markup(&text);
        let text = self.normalize_spacing(&text);
        let text = self.split_collided_markers(&text);
        self.collapse_whitespace(&text)
    }

    fn strip_markup(&self, text: &str) -> String {
        let text = self
            .latex_fraction
            .replace_all(text, |captures: &Captures<'_>| {
                format!(" {}/{} ", captures[1].trim(), captures[2].trim())
            });
        let text = self.latex_times.replace_all(&text, " × ");
        let text = self.latex_div.replace_all(&text, " ÷ ");
        self.markup_fragment.replace_all(&text, " ").into_owned()
    }

    fn normalize_spacing(&self, text: &str) -> String {
        let text = self.marker_punctuation.replace_all(text, "${1}. ");
        let text = self.equals_spacing.replace_all(&text, "=");

        // A replacement consumes the digit on its right, so chains like `1 / 2 / 3` need
        // another round. Every round shortens the text.
        let mut text = text.into_owned();
        loop {
            let tightened = match self.fraction_spacing.replace_all(&text, "${1}/${2}") {
                Cow::Owned(tightened) => tightened,
                Cow::Borrowed(_) => break,
            };
            text = tightened;
        }
        text
    }

    fn split_collided_markers(&self, text: &str) -> String {
        let mut lines: Vec<String> = text.split('\n').map(ToOwned::to_owned).collect();
        for kind in MarkerKind::ALL {
            lines = lines
                .into_iter()
                .flat_map(|line| self.split_line(&line, kind))
                .collect();
        }
        lines.join("\n")
    }

    fn split_line(&self, line: &str, kind: MarkerKind) -> Vec<String> {
        let body = line.trim_start();
        let offsets = self.markers.token_offsets(body, kind);
        let starts_with_marker = offsets.first() == Some(&0);
        let inline: Vec<usize> = offsets.into_iter().filter(|offset| *offset > 0).collect();

        if inline.is_empty() || (!starts_with_marker && inline.len() < 2) {
            return vec![line.to_string()];
        }

        // A line opened by a marker of another family keeps its first inline token.
        let breaks = if !starts_with_marker && self.markers.match_line(body).is_some() {
            &inline[1..]
        } else {
            &inline[..]
        };

        let mut pieces = Vec::with_capacity(breaks.len() + 1);
        let mut cursor = 0;
        for &offset in breaks {
            pieces.push(body[cursor..offset].trim_end().to_string());
            cursor = offset;
        }
        pieces.push(body[cursor..].to_string());
        pieces
    }

    fn collapse_whitespace(&self, text: &str) -> String {
        let lines = text
            .split('\n')
            .map(|line| self.horizontal_space.replace_all(line.trim(), " ").into_owned())
            .collect::<Vec<String>>()
            .join("\n");
        let collapsed = self.blank_lines.replace_all(&lines, "\n\n");
        collapsed.trim().nfc().collect()
    }
}

fn canonicalize_encoding(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace('\r', "\n").nfc().collect()
}
