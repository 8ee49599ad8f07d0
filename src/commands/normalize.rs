use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::NormalizeArgs;
use crate::extraction::{ExerciseExtractor, ExtractionConfig};
use crate::util::{decode_text, read_text_input};

pub fn run(args: NormalizeArgs) -> Result<()> {
    let extractor = ExerciseExtractor::new(ExtractionConfig::default())?;
    let raw = decode_text(&read_text_input(&args.input)?);
    let normalized = extractor.normalize(&raw);

    info!(
        raw_chars = raw.chars().count(),
        normalized_chars = normalized.chars().count(),
        lines = normalized.lines().count(),
        "normalized input"
    );

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{normalized}").context("failed to write normalized text to stdout")?;
    Ok(())
}
