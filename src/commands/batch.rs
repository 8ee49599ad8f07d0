use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cli::BatchArgs;
use crate::commands::build_config;
use crate::extraction::ExerciseExtractor;
use crate::model::{BatchCounts, BatchRunManifest, PageResult};
use crate::util::{decode_text, now_utc_string, sha256_bytes, utc_compact_string, write_json_pretty};

const MANIFEST_VERSION: u32 = 1;

pub fn run(args: BatchArgs) -> Result<()> {
    let config = build_config(&args.extraction)?;
    let extractor = ExerciseExtractor::new(config)?;

    let started_ts = Utc::now();
    let run_id = format!("batch-{}", utc_compact_string(started_ts));
    let manifest = build_manifest(&extractor, &args.input_dir, &args.extension, run_id)?;

    for warning in &manifest.warnings {
        warn!(warning = %warning, "batch extraction warning");
    }

    let manifest_path = args.manifest_path.unwrap_or_else(|| {
        args.input_dir
            .join(format!("extraction_run_{}.json", utc_compact_string(started_ts)))
    });
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote batch manifest");
    info!(
        pages = manifest.counts.pages_total,
        exercises = manifest.counts.exercises_total,
        needs_review = manifest.counts.pages_needing_review,
        "batch extraction completed"
    );

    Ok(())
}

pub fn build_manifest(
    extractor: &ExerciseExtractor,
    input_dir: &Path,
    extension: &str,
    run_id: String,
) -> Result<BatchRunManifest> {
    let started_at = now_utc_string();

    let mut page_paths = discover_pages(input_dir, extension)?;
    page_paths.sort();

    if page_paths.is_empty() {
        bail!("no .{} pages found in {}", extension, input_dir.display());
    }

    let mut counts = BatchCounts::default();
    let mut pages = Vec::with_capacity(page_paths.len());
    let mut warnings = Vec::new();

    for path in page_paths {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

        let data = fs::read(&path)
            .with_context(|| format!("failed to read page: {}", path.display()))?;
        if std::str::from_utf8(&data).is_err() {
            warnings.push(format!("{filename}: invalid UTF-8 replaced"));
        }

        let outcome = extractor.extract_with_outcome(&decode_text(&data));
        debug!(
            page = %filename,
            exercises = outcome.exercises.len(),
            attempts = outcome.attempts.len(),
            "page extracted"
        );

        if outcome.needs_review {
            warnings.push(format!("{filename}: no distinct exercises found"));
            counts.pages_needing_review += 1;
        }
        counts.pages_total += 1;
        counts.exercises_total += outcome.exercises.len();
        for exercise in &outcome.exercises {
            if !exercise.needs_student_input() {
                counts.exercises_with_answers += 1;
            }
            *counts.by_provenance.entry(exercise.provenance).or_default() += 1;
        }

        pages.push(PageResult {
            filename,
            sha256: sha256_bytes(&data),
            needs_review: outcome.needs_review,
            exercise_count: outcome.exercises.len(),
            exercises: outcome.exercises,
        });
    }

    let config = extractor.config();
    Ok(BatchRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id,
        started_at,
        updated_at: now_utc_string(),
        source_directory: input_dir.display().to_string(),
        policy: config.policy.clone(),
        duplicate_policy: config.duplicate_policy,
        counts,
        pages,
        warnings,
    })
}

fn discover_pages(input_dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut pages = Vec::new();

    let entries = fs::read_dir(input_dir)
        .with_context(|| format!("failed to read {}", input_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", input_dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let matches_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));

        if matches_extension {
            pages.push(path);
        }
    }

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::ExtractionConfig;
    use crate::model::StrategyTag;

    fn extractor() -> ExerciseExtractor {
        ExerciseExtractor::new(ExtractionConfig::default()).expect("extractor builds")
    }

    #[test]
    fn manifest_counts_pages_and_provenance() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("p02.txt"), "Bonjour la classe").expect("write page");
        fs::write(dir.path().join("p01.txt"), r"\frac{30}{63} = \frac{10}{21} et 4/8")
            .expect("write page");
        fs::write(dir.path().join("notes.md"), "30/63").expect("write other file");

        let manifest = build_manifest(&extractor(), dir.path(), "txt", "batch-test".to_string())
            .expect("manifest builds");

        let filenames: Vec<&str> = manifest
            .pages
            .iter()
            .map(|page| page.filename.as_str())
            .collect();
        assert_eq!(filenames, vec!["p01.txt", "p02.txt"]);

        assert_eq!(manifest.counts.pages_total, 2);
        assert_eq!(manifest.counts.pages_needing_review, 1);
        assert_eq!(manifest.counts.exercises_total, 3);
        assert_eq!(manifest.counts.exercises_with_answers, 2);
        assert_eq!(
            manifest.counts.by_provenance.get(&StrategyTag::SmartMathLatex),
            Some(&1)
        );
        assert_eq!(
            manifest.counts.by_provenance.get(&StrategyTag::WholeDocumentFallback),
            Some(&1)
        );
        assert_eq!(manifest.warnings, vec!["p02.txt: no distinct exercises found"]);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = build_manifest(&extractor(), dir.path(), "txt", "batch-test".to_string());
        assert!(result.is_err());
    }
}
