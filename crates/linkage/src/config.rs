use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::error::LinkageError;
use crate::normalize::KeyKind;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    pub name: String,
    pub primary: TableConfig,
    pub sources: HashMap<String, TableConfig>,
    pub stages: Vec<StageConfig>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    pub file: String,
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// One merge stage: link the running table against one secondary source.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    pub name: String,
    pub source: String,
    pub prefix: String,
    /// Allow-list of secondary columns to import.
    pub columns: Vec<String>,
    /// Exact strategies in priority order.
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
    /// Approximate fallback for rows no strategy matched.
    #[serde(default)]
    pub fuzzy: Option<FuzzyConfig>,
    /// Append `<prefix>match_method` and `<prefix>match_score` columns.
    #[serde(default)]
    pub provenance: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    pub id: String,
    pub primary_key: Vec<KeyColumn>,
    pub secondary_key: Vec<KeyColumn>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FuzzyConfig {
    pub primary: KeyColumn,
    pub secondary: KeyColumn,
}

/// A column participating in a key, with the normalization applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyColumn {
    pub column: String,
    #[serde(default)]
    pub kind: KeyKind,
}

impl KeyColumn {
    pub fn new(column: impl Into<String>, kind: KeyKind) -> Self {
        Self {
            column: column.into(),
            kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Output + Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub file: Option<String>,
    /// Preferred leading column order. Unknown names are skipped.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Columns never written.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Text written for missing values.
    #[serde(default)]
    pub missing: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Columns to report value counts for.
    #[serde(default)]
    pub breakdown: Vec<String>,
    /// Columns to report distinct-value counts for.
    #[serde(default)]
    pub distinct: Vec<String>,
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

fn default_progress_every() -> usize {
    1000
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            breakdown: Vec::new(),
            distinct: Vec::new(),
            progress_every: default_progress_every(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LinkConfig {
    pub fn from_toml(input: &str) -> Result<Self, LinkageError> {
        let config: LinkConfig =
            toml::from_str(input).map_err(|e| LinkageError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LinkageError> {
        if self.stages.is_empty() {
            return Err(LinkageError::ConfigValidation(
                "at least one stage is required".into(),
            ));
        }

        if self.report.progress_every == 0 {
            return Err(LinkageError::ConfigValidation(
                "report.progress_every must be at least 1".into(),
            ));
        }

        let mut stage_names = HashSet::new();
        let mut prefixes = HashSet::new();

        for stage in &self.stages {
            if !stage_names.insert(stage.name.as_str()) {
                return Err(LinkageError::ConfigValidation(format!(
                    "duplicate stage name '{}'",
                    stage.name
                )));
            }

            if !self.sources.contains_key(&stage.source) {
                return Err(LinkageError::UnknownSource(format!(
                    "stage '{}': source '{}' not found",
                    stage.name, stage.source
                )));
            }

            if stage.prefix.is_empty() {
                return Err(LinkageError::ConfigValidation(format!(
                    "stage '{}': prefix must not be empty",
                    stage.name
                )));
            }
            if !prefixes.insert(stage.prefix.as_str()) {
                return Err(LinkageError::ConfigValidation(format!(
                    "stage '{}': prefix '{}' is already used by another stage",
                    stage.name, stage.prefix
                )));
            }

            if stage.columns.is_empty() {
                return Err(LinkageError::ConfigValidation(format!(
                    "stage '{}': columns allow-list is empty",
                    stage.name
                )));
            }

            if stage.strategies.is_empty() && stage.fuzzy.is_none() {
                return Err(LinkageError::ConfigValidation(format!(
                    "stage '{}': needs at least one strategy or a fuzzy fallback",
                    stage.name
                )));
            }

            let mut ids = HashSet::new();
            for strategy in &stage.strategies {
                if !ids.insert(strategy.id.as_str()) {
                    return Err(LinkageError::ConfigValidation(format!(
                        "stage '{}': duplicate strategy id '{}'",
                        stage.name, strategy.id
                    )));
                }
                if strategy.primary_key.is_empty()
                    || strategy.primary_key.len() != strategy.secondary_key.len()
                {
                    return Err(LinkageError::KeyArity {
                        stage: stage.name.clone(),
                        strategy: strategy.id.clone(),
                        primary: strategy.primary_key.len(),
                        secondary: strategy.secondary_key.len(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Source names in first-use order across stages.
    pub fn source_order(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.stages
            .iter()
            .map(|s| s.source.as_str())
            .filter(|s| seen.insert(*s))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "Master reference"

[primary]
file = "si_au_ref_names.csv"

[sources.secref]
file = "secref.csv"

[sources.master]
file = "master.csv"

[[stages]]
name = "security_reference"
source = "secref"
prefix = "SR_"
columns = ["CompanyId", "ISIN"]

[[stages.strategies]]
id = "company_share_class"
primary_key = [{ column = "MS_CompanyID" }, { column = "MS_SecurityID" }]
secondary_key = [{ column = "CompanyId" }, { column = "ShareClassId" }]

[[stages]]
name = "master_company"
source = "master"
prefix = "MC_"
columns = ["ABN", "TradingStatus"]
provenance = true

[[stages.strategies]]
id = "isin"
primary_key = [{ column = "SR_ISIN" }]
secondary_key = [{ column = "ISIN" }]

[[stages.strategies]]
id = "symbol"
primary_key = [{ column = "CompanyTicker", kind = "code" }]
secondary_key = [{ column = "Symbol", kind = "code" }]

[stages.fuzzy]
primary = { column = "FullCompanyName", kind = "name" }
secondary = { column = "CompanyName", kind = "name" }

[output]
file = "out.csv"
exclude = ["join_key"]

[report]
breakdown = ["MC_TradingStatus"]
distinct = ["Gcode"]
"#;

    #[test]
    fn parse_valid() {
        let config = LinkConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "Master reference");
        assert_eq!(config.stages.len(), 2);
        assert_eq!(config.sources.len(), 2);

        let mc = &config.stages[1];
        assert_eq!(mc.strategies.len(), 2);
        assert_eq!(mc.strategies[1].primary_key[0].kind, KeyKind::Code);
        assert!(mc.provenance);
        let fuzzy = mc.fuzzy.as_ref().unwrap();
        assert_eq!(fuzzy.primary.kind, KeyKind::Name);

        // Defaults
        assert_eq!(config.stages[0].strategies[0].primary_key[0].kind, KeyKind::Text);
        assert!(!config.stages[0].provenance);
        assert_eq!(config.report.progress_every, 1000);
        assert_eq!(config.output.missing, "");
        assert_eq!(config.source_order(), vec!["secref", "master"]);
    }

    #[test]
    fn reject_unknown_source() {
        let input = VALID.replace("source = \"master\"", "source = \"nope\"");
        let err = LinkConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("'nope'"));
    }

    #[test]
    fn reject_key_arity_mismatch() {
        let input = VALID.replace(
            "secondary_key = [{ column = \"CompanyId\" }, { column = \"ShareClassId\" }]",
            "secondary_key = [{ column = \"CompanyId\" }]",
        );
        let err = LinkConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, LinkageError::KeyArity { primary: 2, secondary: 1, .. }));
    }

    #[test]
    fn reject_duplicate_prefix() {
        let input = VALID.replace("prefix = \"MC_\"", "prefix = \"SR_\"");
        let err = LinkConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("prefix 'SR_'"));
    }

    #[test]
    fn reject_invalid_kind() {
        let input = VALID.replace("kind = \"code\" }]\nsecondary", "kind = \"ticker\" }]\nsecondary");
        assert!(LinkConfig::from_toml(&input).is_err());
    }

    #[test]
    fn reject_stage_without_strategies() {
        let input = r#"
name = "Bad"
[primary]
file = "p.csv"
[sources.s]
file = "s.csv"
[[stages]]
name = "s"
source = "s"
prefix = "S_"
columns = ["a"]
"#;
        let err = LinkConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("at least one strategy"));
    }

    #[test]
    fn reject_no_stages() {
        let input = r#"
name = "Bad"
stages = []
[primary]
file = "p.csv"
[sources.s]
file = "s.csv"
"#;
        let err = LinkConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("at least one stage"));
    }
}
