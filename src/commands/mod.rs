pub mod batch;
pub mod extract;
pub mod normalize;

use anyhow::Result;
use tracing::debug;

use crate::cli::{PolicyArgs, PolicyPreset};
use crate::extraction::{DuplicatePolicy, ExtractionConfig, FULL_POLICY, TWO_PHASE_POLICY};

/// Config file first, then CLI flags on top of it.
pub fn build_config(args: &PolicyArgs) -> Result<ExtractionConfig> {
    let mut config = match &args.config {
        Some(path) => ExtractionConfig::load(path)?,
        None => ExtractionConfig::default(),
    };

    match args.policy {
        Some(PolicyPreset::TwoPhase) => config.policy = TWO_PHASE_POLICY.to_vec(),
        Some(PolicyPreset::Full) => config.policy = FULL_POLICY.to_vec(),
        None => {}
    }

    if !args.strategies.is_empty() {
        config.policy = args.strategies.clone();
    }

    if args.dedupe_fractions {
        config.duplicate_policy = DuplicatePolicy::PreferFormula;
    }

    config.validate()?;
    debug!(
        preset = args.policy.map(PolicyPreset::as_str),
        policy = ?config.policy,
        duplicate_policy = ?config.duplicate_policy,
        "resolved extraction config"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StrategyKind;

    #[test]
    fn flags_override_defaults_in_order() {
        let config = build_config(&PolicyArgs::default()).expect("default config is valid");
        assert_eq!(config, ExtractionConfig::default());

        let config = build_config(&PolicyArgs {
            policy: Some(PolicyPreset::Full),
            dedupe_fractions: true,
            ..PolicyArgs::default()
        })
        .expect("full preset is valid");
        assert_eq!(config.policy, FULL_POLICY.to_vec());
        assert_eq!(config.duplicate_policy, DuplicatePolicy::PreferFormula);

        let config = build_config(&PolicyArgs {
            policy: Some(PolicyPreset::Full),
            strategies: vec![StrategyKind::BoundaryScan, StrategyKind::Delimiter],
            ..PolicyArgs::default()
        })
        .expect("custom order is valid");
        assert_eq!(
            config.policy,
            vec![StrategyKind::BoundaryScan, StrategyKind::Delimiter]
        );
    }

    #[test]
    fn repeated_strategy_flags_are_rejected() {
        let result = build_config(&PolicyArgs {
            strategies: vec![StrategyKind::Clustering, StrategyKind::Clustering],
            ..PolicyArgs::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn missing_config_file_is_reported() {
        let result = build_config(&PolicyArgs {
            config: Some("does/not/exist.json".into()),
            ..PolicyArgs::default()
        });
        let message = format!("{:#}", result.expect_err("missing file should fail"));
        assert!(message.contains("does/not/exist.json"));
    }
}
