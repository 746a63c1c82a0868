//! Configuration parsing for coral18s
//!
//! One YAML file describes where the cached pipeline outputs live, which
//! parameter sweeps to run, and how the agreement oracle is invoked.

use crate::coordinate::{DistanceMethod, ALL_ISLANDS, NormalisationMethod, SweepCoordinate, SweepValue};
use crate::mantel::{default_normalisation_abundance, MantelSettings};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Input and output directories
    pub paths: PathsConfig,

    /// Classification agreement sweep (optional)
    #[serde(default)]
    pub sweep: Option<SweepConfig>,

    /// External agreement program (required by `sweep`)
    #[serde(default)]
    pub oracle: Option<OracleConfig>,

    /// Mantel figure series
    #[serde(default)]
    pub mantel: MantelSettings,
}

/// Directory layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Results directory: Mantel/classification results and distance artifacts
    pub output_dir: PathBuf,

    /// Shared intermediates (defaults to `output_dir`)
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Per-readset QC outputs, one subdirectory per readset
    #[serde(default)]
    pub qc_dir: Option<PathBuf>,

    /// Where figures are written (defaults to `output_dir`)
    #[serde(default)]
    pub figure_dir: Option<PathBuf>,

    /// Where release tables are written (defaults to `output_dir`)
    #[serde(default)]
    pub tables_dir: Option<PathBuf>,
}

impl PathsConfig {
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| self.output_dir.clone())
    }

    pub fn figure_dir(&self) -> PathBuf {
        self.figure_dir.clone().unwrap_or_else(|| self.output_dir.clone())
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.tables_dir.clone().unwrap_or_else(|| self.output_dir.clone())
    }

    pub fn qc_dir(&self) -> Result<&Path> {
        self.qc_dir
            .as_deref()
            .context("paths.qc_dir must be set to build the release tables")
    }
}

/// Parameter sweep definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_genera")]
    pub genera: Vec<String>,

    #[serde(default = "default_distance_methods")]
    pub distance_methods: Vec<DistanceMethod>,

    /// Island subsets; empty means one panel over all islands
    #[serde(default)]
    pub islands: Vec<String>,

    /// Normalisation depth per distance method
    #[serde(default = "default_normalisation_abundance")]
    pub normalisation_abundance: BTreeMap<DistanceMethod, u32>,

    #[serde(default = "default_normalisation_method")]
    pub normalisation_method: NormalisationMethod,

    #[serde(default)]
    pub snp_only: bool,

    /// `samples_at_least_threshold` values (spelling is kept)
    pub thresholds: Vec<SweepValue>,

    /// `most_abund_seq_cutoff` values
    pub cutoffs: Vec<SweepValue>,

    /// Cutoffs never plotted or computed
    #[serde(default)]
    pub excluded_cutoffs: Vec<f64>,

    #[serde(default = "default_min_distinct_seqs")]
    pub min_distinct_seqs: u32,

    /// Concurrent oracle invocations
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// How to run the agreement oracle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Executable path
    pub program: PathBuf,

    /// Extra arguments placed before the per-item flags
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_genera() -> Vec<String> {
    vec!["Pocillopora".to_string(), "Porites".to_string()]
}

fn default_distance_methods() -> Vec<DistanceMethod> {
    vec![DistanceMethod::BrayCurtis, DistanceMethod::Unifrac]
}

fn default_normalisation_method() -> NormalisationMethod {
    NormalisationMethod::Pwr
}

fn default_min_distinct_seqs() -> u32 {
    3
}

fn default_workers() -> usize {
    (num_cpus::get() / 2).max(1)
}

/// All coordinates of one agreement contour
#[derive(Debug, Clone)]
pub struct SweepPanel {
    pub genus: String,
    pub distance_method: DistanceMethod,
    pub island: Option<String>,
    pub coordinates: Vec<SweepCoordinate>,
}

impl SweepPanel {
    pub fn title(&self) -> String {
        match &self.island {
            Some(island) => format!("{} {} {}", self.genus, self.distance_method, island),
            None => format!("{} {}", self.genus, self.distance_method),
        }
    }
}

impl SweepConfig {
    pub fn normalisation_for(&self, method: DistanceMethod) -> u32 {
        self.normalisation_abundance
            .get(&method)
            .copied()
            .unwrap_or(match method {
                DistanceMethod::Unifrac => 1000,
                DistanceMethod::BrayCurtis => 10000,
            })
    }

    /// One panel per genus × distance method × island, each the full
    /// threshold × cutoff cross product
    pub fn panels(&self) -> Vec<SweepPanel> {
        let islands: Vec<Option<String>> = if self.islands.is_empty() {
            vec![None]
        } else {
            self.islands.iter().cloned().map(Some).collect()
        };

        let mut panels = Vec::new();
        for genus in &self.genera {
            for &method in &self.distance_methods {
                for island in &islands {
                    let base = SweepCoordinate::new(genus, method)
                        .with_normalisation(self.normalisation_for(method), self.normalisation_method)
                        .with_only_snp_samples(self.snp_only)
                        .with_min_distinct_seqs(self.min_distinct_seqs)
                        .with_island(island.clone());
                    let coordinates = self
                        .thresholds
                        .iter()
                        .flat_map(|t| {
                            let base = &base;
                            self.cutoffs.iter().map(move |c| {
                                base.clone().with_threshold(t.clone()).with_cutoff(c.clone())
                            })
                        })
                        .collect();
                    panels.push(SweepPanel {
                        genus: genus.clone(),
                        distance_method: method,
                        island: island.clone(),
                        coordinates,
                    });
                }
            }
        }
        panels
    }

    fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("sweep.workers must be at least 1");
        }
        if self.genera.is_empty() {
            bail!("sweep.genera must list at least one genus");
        }
        if self.distance_methods.is_empty() {
            bail!("sweep.distance_methods must list at least one method");
        }
        if self.thresholds.is_empty() {
            bail!("sweep.thresholds must list at least one value");
        }
        if self.cutoffs.is_empty() {
            bail!("sweep.cutoffs must list at least one value");
        }
        for genus in &self.genera {
            if genus.is_empty() || genus.contains('_') {
                bail!("Invalid genus '{}': must be non-empty and contain no '_'", genus);
            }
        }
        for island in &self.islands {
            if island.is_empty() || island.contains('_') {
                bail!("Invalid island '{}': must be non-empty and contain no '_'", island);
            }
            if island == ALL_ISLANDS {
                bail!("Island '{}' is reserved: leave sweep.islands empty to sweep all islands", island);
            }
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.paths.output_dir.is_dir() {
            bail!(
                "Output directory not found: {}",
                self.paths.output_dir.display()
            );
        }

        if let Some(sweep) = &self.sweep {
            sweep.validate()?;
        }

        if let Some(oracle) = &self.oracle {
            if oracle.program.as_os_str().is_empty() {
                bail!("oracle.program must not be empty");
            }
        }

        Ok(())
    }

    pub fn sweep(&self) -> Result<&SweepConfig> {
        self.sweep
            .as_ref()
            .context("No 'sweep' section in the configuration")
    }

    pub fn oracle(&self) -> Result<&OracleConfig> {
        self.oracle
            .as_ref()
            .context("No 'oracle' section in the configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
paths:
  output_dir: /data/18s/output
  qc_dir: /data/18s/qc

sweep:
  genera: [Porites]
  islands: [I01, I04]
  thresholds: [0, 0.1, "0.0"]
  cutoffs: [1, 2]
  excluded_cutoffs: [2]
  workers: 3

oracle:
  program: /opt/agreement/run
  args: ["--quiet"]
"#;

    #[test]
    fn test_parse_yaml() {
        let config: Config = serde_yaml::from_str(YAML).unwrap();
        assert_eq!(config.paths.output_dir, PathBuf::from("/data/18s/output"));
        assert_eq!(config.paths.cache_dir(), PathBuf::from("/data/18s/output"));

        let sweep = config.sweep().unwrap();
        assert_eq!(sweep.workers, 3);
        assert_eq!(sweep.distance_methods.len(), 2);
        assert_eq!(sweep.thresholds[0].as_str(), "0");
        assert_eq!(sweep.thresholds[2].as_str(), "0.0");
        assert_eq!(sweep.normalisation_for(DistanceMethod::Unifrac), 1000);
        assert_eq!(config.oracle().unwrap().args, vec!["--quiet".to_string()]);
        assert_eq!(config.mantel.min_distinct_seqs, 3);
    }

    #[test]
    fn test_panels_cross_product() {
        let config: Config = serde_yaml::from_str(YAML).unwrap();
        let panels = config.sweep().unwrap().panels();
        // 1 genus × 2 methods × 2 islands
        assert_eq!(panels.len(), 4);
        assert_eq!(panels[0].coordinates.len(), 6);
        assert_eq!(panels[0].title(), "Porites braycurtis I01");
        let first = &panels[0].coordinates[0];
        assert_eq!(first.normalisation_abundance, 10000);
        assert_eq!(first.island.as_deref(), Some("I01"));
    }

    #[test]
    fn test_validate_rejects_bad_sweeps() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = format!(
            "paths:\n  output_dir: {}\nsweep:\n  thresholds: [0]\n  cutoffs: [1]\n  workers: 0\n",
            dir.path().display()
        );
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.validate().is_err());

        let yaml = format!(
            "paths:\n  output_dir: {}\nsweep:\n  islands: [bad_island]\n  thresholds: [0]\n  cutoffs: [1]\n",
            dir.path().display()
        );
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.validate().is_err());

        let yaml = format!(
            "paths:\n  output_dir: {}\nsweep:\n  islands: [all]\n  thresholds: [0]\n  cutoffs: [1]\n",
            dir.path().display()
        );
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.validate().is_err());

        let yaml = format!(
            "paths:\n  output_dir: {}\nsweep:\n  thresholds: [0]\n  cutoffs: [1]\n",
            dir.path().display()
        );
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_output_dir() {
        let config: Config =
            serde_yaml::from_str("paths:\n  output_dir: /nonexistent/coral18s/out\n").unwrap();
        assert!(config.validate().is_err());
        assert!(config.sweep().is_err());
    }
}
