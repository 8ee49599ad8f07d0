use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::model::StrategyKind;

pub const TWO_PHASE_POLICY: [StrategyKind; 2] = [StrategyKind::SmartMath, StrategyKind::Delimiter];

pub const FULL_POLICY: [StrategyKind; 4] = [
    StrategyKind::Delimiter,
    StrategyKind::SmartMath,
    StrategyKind::BoundaryScan,
    StrategyKind::Clustering,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    #[default]
    Keep,
    PreferFormula,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub policy: Vec<StrategyKind>,
    pub duplicate_policy: DuplicatePolicy,
    pub answer_window_chars: usize,
    pub cluster_max_span_chars: usize,
    pub min_separator_part_chars: usize,
    pub fallback_preview_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            policy: TWO_PHASE_POLICY.to_vec(),
            duplicate_policy: DuplicatePolicy::Keep,
            answer_window_chars: 240,
            cluster_max_span_chars: 240,
            min_separator_part_chars: 10,
            fallback_preview_chars: 300,
        }
    }
}

impl ExtractionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid extraction config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.policy.is_empty() {
            bail!("extraction policy must name at least one strategy");
        }

        for (index, kind) in self.policy.iter().enumerate() {
            if self.policy[..index].contains(kind) {
                bail!("strategy '{}' appears more than once in policy", kind.as_str());
            }
        }

        if self.answer_window_chars == 0 {
            bail!("answer_window_chars must be positive");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults_for_missing_fields() {
        let raw = r#"{
            "policy": ["delimiter", "boundary-scan"],
            "duplicate_policy": "prefer-formula"
        }"#;

        let config: ExtractionConfig =
            serde_json::from_str(raw).expect("partial config should deserialize");
        assert_eq!(
            config.policy,
            vec![StrategyKind::Delimiter, StrategyKind::BoundaryScan]
        );
        assert_eq!(config.duplicate_policy, DuplicatePolicy::PreferFormula);
        assert_eq!(config.fallback_preview_chars, 300);
        assert_eq!(config.answer_window_chars, 240);
    }

    #[test]
    fn validate_rejects_empty_and_repeated_policies() {
        let empty = ExtractionConfig {
            policy: Vec::new(),
            ..ExtractionConfig::default()
        };
        assert!(empty.validate().is_err());

        let repeated = ExtractionConfig {
            policy: vec![StrategyKind::SmartMath, StrategyKind::SmartMath],
            ..ExtractionConfig::default()
        };
        assert!(repeated.validate().is_err());

        let full = ExtractionConfig {
            policy: FULL_POLICY.to_vec(),
            ..ExtractionConfig::default()
        };
        assert!(full.validate().is_ok());
    }
}
