use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::ExtractArgs;
use crate::commands::build_config;
use crate::extraction::ExerciseExtractor;
use crate::model::{ExerciseCandidate, ExtractionReport, StrategyTag};
use crate::util::{
    decode_text, now_utc_string, print_json_pretty, read_text_input, sha256_bytes,
    utc_compact_string, write_json_pretty,
};

const REPORT_VERSION: u32 = 1;

pub fn run(args: ExtractArgs) -> Result<()> {
    let config = build_config(&args.extraction)?;
    let extractor = ExerciseExtractor::new(config)?;

    let data = read_text_input(&args.input)?;
    let input = args.input.display().to_string();

    if !args.json && args.output.is_none() {
        let exercises = extractor.extract(&decode_text(&data));
        if returned_whole_document(&exercises) {
            warn!(input = %input, "no distinct exercises found, returning whole document");
        }
        info!(exercises = exercises.len(), "extraction complete");
        return print_json_pretty(&exercises);
    }

    let report = build_report(&extractor, &input, &data);
    if report.outcome.needs_review {
        warn!(input = %input, "no distinct exercises found, returning whole document");
    }
    info!(
        exercises = report.outcome.exercises.len(),
        strategy = report.outcome.strategy.map(|kind| kind.as_str()).unwrap_or("fallback"),
        "extraction complete"
    );

    if let Some(path) = &args.output {
        write_json_pretty(path, &report)?;
        info!(path = %path.display(), "wrote extraction report");
    }

    if args.json {
        print_json_pretty(&report)
    } else {
        print_json_pretty(&report.outcome.exercises)
    }
}

fn returned_whole_document(exercises: &[ExerciseCandidate]) -> bool {
    exercises
        .iter()
        .any(|exercise| exercise.provenance == StrategyTag::WholeDocumentFallback)
}

pub fn build_report(extractor: &ExerciseExtractor, input: &str, data: &[u8]) -> ExtractionReport {
    let text = decode_text(data);
    let outcome = extractor.extract_with_outcome(&text);
    let config = extractor.config();

    ExtractionReport {
        report_version: REPORT_VERSION,
        run_id: format!("extract-{}", utc_compact_string(Utc::now())),
        generated_at: now_utc_string(),
        input: input.to_string(),
        input_sha256: sha256_bytes(data),
        input_chars: text.chars().count(),
        policy: config.policy.clone(),
        duplicate_policy: config.duplicate_policy,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::ExtractionConfig;
    use crate::model::StrategyKind;

    #[test]
    fn report_records_input_and_outcome() {
        let extractor =
            ExerciseExtractor::new(ExtractionConfig::default()).expect("extractor builds");
        let data = r"\frac{30}{63} = \frac{10}{21}".as_bytes();

        let report = build_report(&extractor, "page-01.txt", data);

        assert_eq!(report.input, "page-01.txt");
        assert_eq!(report.input_sha256, sha256_bytes(data));
        assert_eq!(report.input_chars, data.len());
        assert_eq!(
            report.policy,
            vec![StrategyKind::SmartMath, StrategyKind::Delimiter]
        );
        assert_eq!(report.outcome.strategy, Some(StrategyKind::SmartMath));
        assert_eq!(report.outcome.exercises[0].answer, "10/21");
        assert!(report.run_id.starts_with("extract-"));

        let json = serde_json::to_value(&report).expect("report serializes");
        assert_eq!(json["policy"][0], "smart-math");
        assert_eq!(json["duplicate_policy"], "keep");
        assert_eq!(json["outcome"]["exercises"][0]["provenance"], "smart_math_latex");
        assert_eq!(
            json["outcome"]["exercises"][0]["identifier"]["kind"],
            "lettered"
        );
    }

    #[test]
    fn exercise_list_matches_report_outcome() {
        let extractor =
            ExerciseExtractor::new(ExtractionConfig::default()).expect("extractor builds");

        let data = "EXERCISE_START Trouve x si x+2=5 EXERCISE_END";
        let exercises = extractor.extract(data);
        let report = build_report(&extractor, "page-02.txt", data.as_bytes());
        assert_eq!(exercises, report.outcome.exercises);
        assert!(!returned_whole_document(&exercises));

        let exercises = extractor.extract("Bonjour à tous, bonne rentrée");
        assert!(returned_whole_document(&exercises));
    }
}
