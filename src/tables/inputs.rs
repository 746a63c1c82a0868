//! Dataset-level tables and per-readset QC artifacts

use crate::seqio::{read_json, read_names_abundance, read_unique_fasta, UniqueSequence};
use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub const ABUNDANCE_INFO: &str = "abundance_info.tsv";
pub const FASTQ_INFO: &str = "fastq_info.tsv";
pub const SAMPLE_PROVENANCE: &str = "sample_provenance.tsv";
pub const BLASTED_TO_CONSOLIDATED: &str = "coral_blasted_seq_to_consolidated_seq_dict.json";

pub const UNIQUE_FASTA: &str = "stability.trim.contigs.good.unique.abund.pcr.unique.fasta";
pub const UNIQUE_NAMES: &str = "stability.trim.contigs.good.unique.abund.pcr.names";
pub const CORAL_ANNOTATION: &str = "coral_annotation_dict.json";
pub const CONSOLIDATED_HOST: &str = "consolidated_host_seqs_abund_dict.json";
pub const REL_ALL_SEQ_ABUNDANCE: &str = "rel_all_seq_abundance_dict.json";
pub const SAMPLE_ANNOTATION: &str = "sample_annotation_dict.json";

/// Accepts the `True`/`False` spelling written by pandas as well as `true`/`1`
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let s = String::deserialize(deserializer)?;
    match s.trim() {
        "True" | "true" | "TRUE" | "1" => Ok(true),
        "False" | "false" | "FALSE" | "0" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected True or False, found '{}'",
            other
        ))),
    }
}

/// Row of `abundance_info.tsv`; its readsets are the coral readsets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbundanceInfo {
    pub readset: String,
    pub most_abund_coral_genus: String,
    pub most_abund_seq_of_coral_genus: String,
    pub post_qc_seq_depth: u64,
}

/// Row of `fastq_info.tsv`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastqInfo {
    pub readset: String,
    #[serde(rename = "sample-id")]
    pub sample_id: String,
    #[serde(deserialize_with = "deserialize_flag")]
    pub is_replicate: bool,
    pub fwd_read_name: String,
    pub rev_read_name: String,
}

/// Row of `sample_provenance.tsv`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(rename = "sample-id")]
    pub sample_id: String,
    #[serde(rename = "Sample Material label, organismal system level, taxonomic, nominal")]
    pub taxonomic_nominal: String,
    #[serde(rename = "Sample Material label, organismal system level, taxonomic, label", default)]
    pub taxonomic_label: String,
    #[serde(rename = "SAMPLING DESIGN LABEL", default)]
    pub sampling_design_label: String,
    #[serde(rename = "ISLAND#", default)]
    pub island: String,
    #[serde(rename = "SITE#", default)]
    pub site: String,
    #[serde(rename = "COLONY# (C000) FISH# (F000) MACROALGAE# (MA00)", default)]
    pub colony: String,
    #[serde(rename = "SAMPLE PROTOCOL LABEL, level 1", default)]
    pub protocol_level_1: String,
    #[serde(rename = "SAMPLE PROTOCOL LABEL, level 2", default)]
    pub protocol_level_2: String,
    #[serde(rename = "Sample Material label - trait", default)]
    pub trait_label: String,
}

fn read_tsv<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for (i, row) in reader.deserialize().enumerate() {
        let row: T = row.with_context(|| format!("{}: bad row {}", path.display(), i + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Dataset-wide inputs shared by all readsets
#[derive(Debug, Clone, Default)]
pub struct DatasetInfo {
    /// In file order
    pub abundance: Vec<AbundanceInfo>,
    /// In file order
    pub fastq: Vec<FastqInfo>,
    pub provenance: HashMap<String, Provenance>,
    /// Blasted coral sequence to the consolidated sequence representing it
    pub blasted_to_consolidated: HashMap<String, String>,
}

impl DatasetInfo {
    pub fn load(cache_dir: &Path) -> Result<Self> {
        let abundance: Vec<AbundanceInfo> = read_tsv(&cache_dir.join(ABUNDANCE_INFO))?;
        let fastq: Vec<FastqInfo> = read_tsv(&cache_dir.join(FASTQ_INFO))?;
        let provenance: Vec<Provenance> = read_tsv(&cache_dir.join(SAMPLE_PROVENANCE))?;
        let blasted_to_consolidated = read_json(&cache_dir.join(BLASTED_TO_CONSOLIDATED))?;

        let info = DatasetInfo {
            abundance,
            fastq,
            provenance: provenance
                .into_iter()
                .map(|p| (p.sample_id.clone(), p))
                .collect(),
            blasted_to_consolidated,
        };
        info.check()?;
        log::info!(
            "Loaded {} coral readsets, {} fastq pairs, {} provenance records",
            info.abundance.len(),
            info.fastq.len(),
            info.provenance.len()
        );
        Ok(info)
    }

    fn check(&self) -> Result<()> {
        let mut seen = HashMap::new();
        for (i, row) in self.abundance.iter().enumerate() {
            if let Some(previous) = seen.insert(row.readset.as_str(), i) {
                bail!(
                    "Readset {} listed twice in {} (rows {} and {})",
                    row.readset,
                    ABUNDANCE_INFO,
                    previous + 1,
                    i + 1
                );
            }
        }
        for row in &self.abundance {
            let fastq = self.fastq(&row.readset)?;
            self.provenance(&fastq.sample_id)?;
        }
        Ok(())
    }

    /// Coral readsets in table order
    pub fn coral_readsets(&self) -> Vec<String> {
        self.abundance.iter().map(|a| a.readset.clone()).collect()
    }

    pub fn abundance_info(&self, readset: &str) -> Result<&AbundanceInfo> {
        self.abundance
            .iter()
            .find(|a| a.readset == readset)
            .with_context(|| format!("Readset {} missing from {}", readset, ABUNDANCE_INFO))
    }

    pub fn fastq(&self, readset: &str) -> Result<&FastqInfo> {
        self.fastq
            .iter()
            .find(|f| f.readset == readset)
            .with_context(|| format!("Readset {} missing from {}", readset, FASTQ_INFO))
    }

    pub fn provenance(&self, sample_id: &str) -> Result<&Provenance> {
        self.provenance
            .get(sample_id)
            .with_context(|| format!("Sample {} missing from {}", sample_id, SAMPLE_PROVENANCE))
    }

    pub fn sample_id(&self, readset: &str) -> Result<&str> {
        Ok(&self.fastq(readset)?.sample_id)
    }
}

/// Taxonomy as stored by the annotation step: (genus, family, order)
pub type TaxonomyTuple = (String, String, String);

/// Everything the release tables need from one readset's QC directory
#[derive(Debug, Clone, Default)]
pub struct ReadsetArtifacts {
    pub readset: String,
    /// Unique sequences in FASTA order
    pub fasta: Vec<UniqueSequence>,
    /// Absolute abundance per sequence name
    pub names_abundance: HashMap<String, u64>,
    /// Sequence name to coral genus, for sequences annotated as coral
    pub coral_annotation: BTreeMap<String, String>,
    /// Consolidated host sequence to relative abundance within the host genus
    pub consolidated_host_abundance: BTreeMap<String, f64>,
    /// Sequence name to relative abundance over all sequences
    pub rel_all_seq_abundance: BTreeMap<String, f64>,
    /// Sequence name to taxonomy, for every annotated sequence
    pub sample_annotation: BTreeMap<String, TaxonomyTuple>,
}

impl ReadsetArtifacts {
    pub fn load(qc_dir: &Path, readset: &str) -> Result<Self> {
        let dir = qc_dir.join(readset);
        let load = || -> Result<Self> {
            Ok(ReadsetArtifacts {
                readset: readset.to_string(),
                fasta: read_unique_fasta(&dir.join(UNIQUE_FASTA))?,
                names_abundance: read_names_abundance(&dir.join(UNIQUE_NAMES))?,
                coral_annotation: read_json(&dir.join(CORAL_ANNOTATION))?,
                consolidated_host_abundance: read_json(&dir.join(CONSOLIDATED_HOST))?,
                rel_all_seq_abundance: read_json(&dir.join(REL_ALL_SEQ_ABUNDANCE))?,
                sample_annotation: read_json(&dir.join(SAMPLE_ANNOTATION))?,
            })
        };
        load().with_context(|| format!("Failed to load QC artifacts for readset {}", readset))
    }

    /// Absolute abundance of a named sequence
    pub fn abundance_of(&self, name: &str) -> Result<u64> {
        self.names_abundance.get(name).copied().with_context(|| {
            format!("Sequence {} of readset {} missing from names file", name, self.readset)
        })
    }

    /// Sequence of a named FASTA record
    pub fn sequence_of(&self, name: &str) -> Option<&str> {
        self.fasta
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.sequence.as_str())
    }
}

/// Load all readsets in parallel, preserving the input order
pub fn load_readsets(qc_dir: &Path, readsets: &[String]) -> Result<Vec<ReadsetArtifacts>> {
    log::info!("Loading QC artifacts for {} readsets", readsets.len());
    readsets
        .par_iter()
        .map(|readset| ReadsetArtifacts::load(qc_dir, readset))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_dataset(dir: &Path) {
        std::fs::write(
            dir.join(ABUNDANCE_INFO),
            "readset\tmost_abund_coral_genus\tmost_abund_seq_of_coral_genus\tpost_qc_seq_depth\n\
             RS1\tPorites\tACGT\t1200\n\
             RS2\tPorites\tACGT\t900\n",
        )
        .unwrap();
        std::fs::write(
            dir.join(FASTQ_INFO),
            "readset\tsample-id\tis_replicate\tfwd_read_name\trev_read_name\n\
             RS1\tTARA_1\tTrue\tRS1_R1.fastq.gz\tRS1_R2.fastq.gz\n\
             RS2\tTARA_1\tTrue\tRS2_R1.fastq.gz\tRS2_R2.fastq.gz\n",
        )
        .unwrap();
        std::fs::write(
            dir.join(SAMPLE_PROVENANCE),
            "sample-id\tSample Material label, organismal system level, taxonomic, nominal\tISLAND#\n\
             TARA_1\tPorites lobata\tI01\n",
        )
        .unwrap();
        std::fs::write(dir.join(BLASTED_TO_CONSOLIDATED), r#"{"ACGA": "ACGT"}"#).unwrap();
    }

    #[test]
    fn test_load_dataset() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let info = DatasetInfo::load(dir.path()).unwrap();
        assert_eq!(info.coral_readsets(), vec!["RS1".to_string(), "RS2".to_string()]);
        assert!(info.fastq("RS1").unwrap().is_replicate);
        assert_eq!(info.sample_id("RS2").unwrap(), "TARA_1");
        let prov = info.provenance("TARA_1").unwrap();
        assert_eq!(prov.taxonomic_nominal, "Porites lobata");
        assert_eq!(prov.island, "I01");
        assert_eq!(prov.site, "");
        assert_eq!(info.blasted_to_consolidated["ACGA"], "ACGT");
    }

    #[test]
    fn test_readset_without_fastq_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        std::fs::write(
            dir.path().join(FASTQ_INFO),
            "readset\tsample-id\tis_replicate\tfwd_read_name\trev_read_name\n\
             RS1\tTARA_1\tFalse\ta\tb\n",
        )
        .unwrap();
        let err = DatasetInfo::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("RS2"));
    }

    #[test]
    fn test_load_readset_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let rs = dir.path().join("RS1");
        std::fs::create_dir(&rs).unwrap();
        std::fs::write(rs.join(UNIQUE_FASTA), ">s1\t5\nACGT\n>s2\t1\nACGA\n").unwrap();
        std::fs::write(rs.join(UNIQUE_NAMES), "s1\ts1,a,b\ns2\ts2\n").unwrap();
        std::fs::write(rs.join(CORAL_ANNOTATION), r#"{"s1": "Porites"}"#).unwrap();
        std::fs::write(rs.join(CONSOLIDATED_HOST), r#"{"ACGT": 1.0}"#).unwrap();
        std::fs::write(rs.join(REL_ALL_SEQ_ABUNDANCE), r#"{"s1": 0.75, "s2": 0.25}"#).unwrap();
        std::fs::write(
            rs.join(SAMPLE_ANNOTATION),
            r#"{"s1": ["Porites", "Poritidae", "Scleractinia"]}"#,
        )
        .unwrap();

        let loaded = load_readsets(dir.path(), &["RS1".to_string()]).unwrap();
        let a = &loaded[0];
        assert_eq!(a.fasta.len(), 2);
        assert_eq!(a.abundance_of("s1").unwrap(), 3);
        assert_eq!(a.sequence_of("s2"), Some("ACGA"));
        assert_eq!(a.sample_annotation["s1"].2, "Scleractinia");

        assert!(load_readsets(dir.path(), &["RS9".to_string()]).is_err());
    }
}
