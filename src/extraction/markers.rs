use anyhow::{Context, Result};
use regex::Regex;

use crate::model::{Marker, MarkerKind};

impl MarkerKind {
    // Priority order for line recognition.
    pub const ALL: [MarkerKind; 4] = [
        MarkerKind::Lettered,
        MarkerKind::Numbered,
        MarkerKind::Roman,
        MarkerKind::Keyword,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lettered => "lettered",
            Self::Numbered => "numbered",
            Self::Roman => "roman",
            Self::Keyword => "keyword",
        }
    }

    fn line_pattern(self) -> &'static str {
        match self {
            Self::Lettered => r"^(?P<label>[a-h])(?:\)|\.(?:\s|$))\s*(?P<body>.*)$",
            Self::Numbered => r"^(?P<label>\d{1,3})(?:\)|\.(?:\s|$))\s*(?P<body>.*)$",
            Self::Roman => r"^(?P<label>[IVX]{1,5})(?:\)|\.(?:\s|$))\s*(?P<body>.*)$",
            // Only headings take a number; `calcule 25 + 17` keeps its operand in the body.
            Self::Keyword => concat!(
                r"(?i)^(?P<label>(?:exercice|probl[eè]me)(?:\s+(?:n°\s*)?\d{1,3})?",
                r"|calculez|calcule)",
                r"\b\s*[.:)\-]?\s*(?P<body>.*)$",
            ),
        }
    }

    fn inline_pattern(self) -> &'static str {
        match self {
            Self::Lettered => r"\b[a-h][.)]",
            Self::Numbered => r"\b\d{1,3}[.)]",
            Self::Roman => r"\b[IVX]{1,5}[.)]",
            Self::Keyword => r"(?i)\b(?:exercice|probl[eè]me|calculez|calcule)\b",
        }
    }

    fn render_label(self, raw: &str) -> String {
        match self {
            Self::Lettered => raw.to_lowercase(),
            Self::Numbered => raw.to_string(),
            Self::Roman => raw.to_uppercase(),
            Self::Keyword => {
                let condensed = raw.split_whitespace().collect::<Vec<&str>>().join(" ");
                capitalize_first(&condensed)
            }
        }
    }
}

fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug)]
pub struct MarkerPatterns {
    line: Vec<(MarkerKind, Regex)>,
    inline: Vec<(MarkerKind, Regex)>,
}

impl MarkerPatterns {
    pub fn new() -> Result<Self> {
        let mut line = Vec::with_capacity(MarkerKind::ALL.len());
        let mut inline = Vec::with_capacity(MarkerKind::ALL.len());

        for kind in MarkerKind::ALL {
            let line_regex = Regex::new(kind.line_pattern()).with_context(|| {
                format!("failed to compile {} marker line regex", kind.as_str())
            })?;
            let inline_regex = Regex::new(kind.inline_pattern()).with_context(|| {
                format!("failed to compile {} marker token regex", kind.as_str())
            })?;
            line.push((kind, line_regex));
            inline.push((kind, inline_regex));
        }

        Ok(Self { line, inline })
    }

    pub fn match_line(&self, line: &str) -> Option<(Marker, String)> {
        let trimmed = line.trim();
        self.line.iter().find_map(|(kind, regex)| {
            let captures = regex.captures(trimmed)?;
            let label = captures.name("label")?.as_str();
            let body = captures
                .name("body")
                .map(|value| value.as_str().trim().to_string())
                .unwrap_or_default();
            Some((Marker::new(*kind, kind.render_label(label)), body))
        })
    }

    /// Byte offsets of `kind` marker tokens that begin the line or follow whitespace.
    /// A `.` terminated token must also be followed by whitespace or the end of the line,
    /// which keeps decimals such as `3.5` from counting as markers.
    pub fn token_offsets(&self, line: &str, kind: MarkerKind) -> Vec<usize> {
        let Some((_, regex)) = self.inline.iter().find(|(candidate, _)| *candidate == kind) else {
            return Vec::new();
        };

        regex
            .find_iter(line)
            .filter(|found| {
                let preceded = line[..found.start()]
                    .chars()
                    .next_back()
                    .is_none_or(char::is_whitespace);
                let followed = !found.as_str().ends_with('.')
                    || line[found.end()..]
                        .chars()
                        .next()
                        .is_none_or(char::is_whitespace);
                preceded && followed
            })
            .map(|found| found.start())
            .collect()
    }
}
