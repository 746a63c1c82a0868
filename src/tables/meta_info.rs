//! Coral meta-info table: per-readset QC flags and the `use` verdict

use super::inputs::{DatasetInfo, ReadsetArtifacts};
use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, HashMap};

/// Host genera the release is about
pub const TARGET_GENERA: [&str; 3] = ["Porites", "Millepora", "Pocillopora"];
/// Provenance genus kept in the table but never usable
pub const HELIOPORA: &str = "Heliopora";

pub const INTER_GENUS_CONTAMINATION_MAX: f64 = 0.01;
pub const LOW_HOST_REL_ABUND_MIN: f64 = 0.3;
pub const INTRA_GENUS_RATIO_MAX: f64 = 0.3;

/// Why a readset should not be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoUseReason {
    TaxAnnotationMismatch,
    NotOfTargetGenus,
    InterGenusContamination,
    DifferentPrimarySequence,
    LowHostSequenceAbundance,
    PutativeIntraGenusContamination,
}

impl NoUseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoUseReason::TaxAnnotationMismatch => "tax_annotation_mismatch",
            NoUseReason::NotOfTargetGenus => "not_of_target_genus",
            NoUseReason::InterGenusContamination => "inter_genus_contamination",
            NoUseReason::DifferentPrimarySequence => "different_primary_sequence",
            NoUseReason::LowHostSequenceAbundance => "low_host_sequence_abundance",
            NoUseReason::PutativeIntraGenusContamination => "putative_intra_genus_contamination",
        }
    }
}

/// One row of the meta-info table. `None` is written as an empty cell.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaInfoRow {
    pub sample_id: String,
    pub readset: String,
    pub use_readset: bool,
    pub no_use_reasons: Vec<NoUseReason>,
    pub genus_annotation: String,
    pub provenance_nominal: String,
    pub provenance_label: String,
    pub is_provenance_annotation_correct: bool,
    pub inter_genus_contamination_rel_abund: Option<f64>,
    pub is_inter_genus_contamination: Option<bool>,
    pub primary_sequence: String,
    pub is_different_primary_sequence: Option<bool>,
    pub host_rel_abund: f64,
    pub is_low_host_rel_abund: bool,
    pub intra_genus_contamination_ratio: Option<f64>,
    pub is_intra_genus_contamination: Option<bool>,
    pub is_replicate: bool,
    pub is_representative: bool,
    pub post_qc_seq_depth: u64,
    pub fwd_read_name: String,
    pub rev_read_name: String,
    pub sampling_design_label: String,
    pub island: String,
    pub site: String,
    pub colony: String,
    pub protocol_level_1: String,
    pub protocol_level_2: String,
    pub trait_label: String,
}

impl MetaInfoRow {
    pub const HEADER: [&'static str; 28] = [
        "sample-id",
        "readset",
        "use",
        "no_use_reason",
        "genetic_18S_genus_taxonomic_annotation",
        "Sample Material label, organismal system level, taxonomic, nominal",
        "Sample Material label, organismal system level, taxonomic, label",
        "is_provenance_taxonomic_annotation_correct",
        "inter_genus_contamination_rel_abund",
        "is_inter_genus_contamination",
        "primary_sequence",
        "is_different_primary_sequence",
        "host_rel_abund",
        "is_low_host_rel_abund",
        "putative_intra_genus_contamination_ratio",
        "is_putative_intra_genus_contamination",
        "is_replicate",
        "is_representative_for_sample",
        "post_qc_seq_depth",
        "fwd_read_name",
        "rev_read_name",
        "SAMPLING DESIGN LABEL",
        "ISLAND#",
        "SITE#",
        "COLONY# (C000) FISH# (F000) MACROALGAE# (MA00)",
        "SAMPLE PROTOCOL LABEL, level 1",
        "SAMPLE PROTOCOL LABEL, level 2",
        "Sample Material label - trait",
    ];

    /// `;`-joined reasons, each once, in the order they were raised
    pub fn no_use_reason(&self) -> String {
        let mut seen: Vec<&str> = Vec::new();
        for reason in &self.no_use_reasons {
            if !seen.contains(&reason.as_str()) {
                seen.push(reason.as_str());
            }
        }
        seen.join(";")
    }

    pub fn record(&self) -> Vec<String> {
        vec![
            self.sample_id.clone(),
            self.readset.clone(),
            py_bool(self.use_readset),
            self.no_use_reason(),
            self.genus_annotation.clone(),
            self.provenance_nominal.clone(),
            self.provenance_label.clone(),
            py_bool(self.is_provenance_annotation_correct),
            opt_float(self.inter_genus_contamination_rel_abund),
            opt_bool(self.is_inter_genus_contamination),
            self.primary_sequence.clone(),
            opt_bool(self.is_different_primary_sequence),
            py_float(self.host_rel_abund),
            py_bool(self.is_low_host_rel_abund),
            opt_float(self.intra_genus_contamination_ratio),
            opt_bool(self.is_intra_genus_contamination),
            py_bool(self.is_replicate),
            py_bool(self.is_representative),
            self.post_qc_seq_depth.to_string(),
            self.fwd_read_name.clone(),
            self.rev_read_name.clone(),
            self.sampling_design_label.clone(),
            self.island.clone(),
            self.site.clone(),
            self.colony.clone(),
            self.protocol_level_1.clone(),
            self.protocol_level_2.clone(),
            self.trait_label.clone(),
        ]
    }
}

fn py_bool(b: bool) -> String {
    let s = if b { "True" } else { "False" };
    s.to_string()
}

fn opt_bool(b: Option<bool>) -> String {
    b.map(py_bool).unwrap_or_default()
}

/// Floats always carry a decimal point (`1.0`, not `1`)
pub fn py_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

fn opt_float(v: Option<f64>) -> String {
    v.map(py_float).unwrap_or_default()
}

/// Dataset-wide primary sequence per target genus: the most common
/// `most_abund_seq_of_coral_genus` among readsets of that genus.
/// Ties go to the lexically smallest sequence.
pub fn primary_sequences(info: &DatasetInfo) -> HashMap<String, String> {
    let mut primary = HashMap::new();
    for genus in TARGET_GENERA {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for row in info.abundance.iter().filter(|r| r.most_abund_coral_genus == genus) {
            *counts.entry(row.most_abund_seq_of_coral_genus.as_str()).or_insert(0) += 1;
        }
        let mode = counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)));
        match mode {
            Some((seq, _)) => {
                primary.insert(genus.to_string(), seq.to_string());
            }
            None => log::warn!("No readsets annotated as {}: no primary sequence", genus),
        }
    }
    primary
}

/// Keys sorted by value, descending; ties keep iteration order
fn ranked(tally: &[(String, f64)]) -> Vec<(String, f64)> {
    let mut ranked = tally.to_vec();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// Sum relative abundance per label, in first-seen label order
fn tally<'a>(
    labelled: impl Iterator<Item = (&'a String, &'a str)>,
    rel_abundance: &BTreeMap<String, f64>,
    readset: &str,
) -> Result<Vec<(String, f64)>> {
    let mut tally: Vec<(String, f64)> = Vec::new();
    for (name, label) in labelled {
        let rel = rel_abundance.get(name).copied().with_context(|| {
            format!("Sequence {} of readset {} has no relative abundance", name, readset)
        })?;
        match tally.iter_mut().find(|(l, _)| l == label) {
            Some(entry) => entry.1 += rel,
            None => tally.push((label.to_string(), rel)),
        }
    }
    Ok(tally)
}

enum ProvenanceKind {
    Target(String),
    Heliopora,
}

fn classify_provenance(nominal: &str) -> Result<ProvenanceKind> {
    if TARGET_GENERA.contains(&nominal) {
        return Ok(ProvenanceKind::Target(nominal.to_string()));
    }
    if nominal == HELIOPORA {
        return Ok(ProvenanceKind::Heliopora);
    }
    // Binomials count by their genus
    let genus = nominal.split(' ').next().unwrap_or(nominal);
    if TARGET_GENERA.contains(&genus) {
        return Ok(ProvenanceKind::Target(genus.to_string()));
    }
    bail!("Unexpected provenance annotation: '{}'", nominal);
}

/// Readset with the highest post-QC depth among the sample's replicates
fn is_representative(info: &DatasetInfo, readset: &str, sample_id: &str) -> Result<bool> {
    let mut best: Option<(&str, u64)> = None;
    for fastq in info.fastq.iter().filter(|f| f.sample_id == sample_id) {
        let depth = info.abundance_info(&fastq.readset)?.post_qc_seq_depth;
        if best.map_or(true, |(_, d)| depth > d) {
            best = Some((fastq.readset.as_str(), depth));
        }
    }
    Ok(best.map_or(false, |(r, _)| r == readset))
}

/// Running `use` verdict with the reasons raised so far
#[derive(Debug, Default)]
struct Verdict {
    rejected: bool,
    reasons: Vec<NoUseReason>,
}

impl Verdict {
    fn reject(&mut self, reason: NoUseReason) {
        self.rejected = true;
        self.reasons.push(reason);
    }

    /// Unusable without a listed reason (annotation outside the target genera)
    fn reject_unlisted(&mut self) {
        self.rejected = true;
    }
}

/// Host-derived columns of a row
#[derive(Debug)]
struct HostAssessment {
    genus_annotation: String,
    is_provenance_annotation_correct: bool,
    inter_genus_contamination_rel_abund: Option<f64>,
    is_inter_genus_contamination: Option<bool>,
    primary_sequence: String,
    is_different_primary_sequence: Option<bool>,
    host_rel_abund: f64,
    is_low_host_rel_abund: bool,
    intra_genus_contamination_ratio: Option<f64>,
    is_intra_genus_contamination: Option<bool>,
}

/// Sample whose provenance is one of the target genera
fn assess_target(
    artifacts: &ReadsetArtifacts,
    provenance_genus: &str,
    reported_primary: &str,
    primary: &HashMap<String, String>,
    verdict: &mut Verdict,
) -> Result<HostAssessment> {
    let readset = artifacts.readset.as_str();
    let coral = ranked(&tally(
        artifacts.coral_annotation.iter().map(|(n, g)| (n, g.as_str())),
        &artifacts.rel_all_seq_abundance,
        readset,
    )?);
    let Some((annotation, host_rel_abund)) = coral.first().cloned() else {
        bail!("Readset {} has no coral-annotated sequences", readset);
    };

    let is_provenance_annotation_correct = annotation == provenance_genus;
    if !is_provenance_annotation_correct {
        verdict.reject(NoUseReason::TaxAnnotationMismatch);
    }
    if !TARGET_GENERA.contains(&annotation.as_str()) {
        verdict.reject(NoUseReason::NotOfTargetGenus);
    }

    let inter: f64 = coral.iter().skip(1).map(|(_, v)| v).sum();
    let is_inter = inter > INTER_GENUS_CONTAMINATION_MAX;
    if is_inter {
        verdict.reject(NoUseReason::InterGenusContamination);
    }

    let is_different = match primary.get(&annotation) {
        Some(seq) => {
            let different = seq != reported_primary;
            if different {
                verdict.reject(NoUseReason::DifferentPrimarySequence);
            }
            Some(different)
        }
        None => {
            verdict.reject_unlisted();
            None
        }
    };

    let is_low_host = host_rel_abund < LOW_HOST_REL_ABUND_MIN;
    if is_low_host {
        verdict.reject(NoUseReason::LowHostSequenceAbundance);
    }

    let mut consolidated: Vec<f64> = artifacts
        .consolidated_host_abundance
        .values()
        .copied()
        .collect();
    consolidated.sort_by(|a, b| b.total_cmp(a));
    let (ratio, is_intra) = if consolidated.len() > 1 {
        let ratio = consolidated[1] / consolidated[0];
        (ratio, ratio > INTRA_GENUS_RATIO_MAX)
    } else {
        (0.0, false)
    };
    if is_intra {
        verdict.reject(NoUseReason::PutativeIntraGenusContamination);
    }

    Ok(HostAssessment {
        genus_annotation: annotation,
        is_provenance_annotation_correct,
        inter_genus_contamination_rel_abund: Some(inter),
        is_inter_genus_contamination: Some(is_inter),
        primary_sequence: reported_primary.to_string(),
        is_different_primary_sequence: is_different,
        host_rel_abund,
        is_low_host_rel_abund: is_low_host,
        intra_genus_contamination_ratio: Some(ratio),
        is_intra_genus_contamination: Some(is_intra),
    })
}

/// Heliopora sample: annotated from all sequences, contamination columns blank
fn assess_heliopora(artifacts: &ReadsetArtifacts, verdict: &mut Verdict) -> Result<HostAssessment> {
    let readset = artifacts.readset.as_str();
    verdict.reject(NoUseReason::NotOfTargetGenus);

    let all = ranked(&tally(
        artifacts
            .sample_annotation
            .iter()
            .map(|(n, tax)| (n, tax.0.as_str())),
        &artifacts.rel_all_seq_abundance,
        readset,
    )?);
    let Some((annotation, host_rel_abund)) = all.first().cloned() else {
        bail!("Readset {} has no annotated sequences", readset);
    };

    let is_provenance_annotation_correct = annotation == HELIOPORA;
    if !is_provenance_annotation_correct {
        verdict.reject(NoUseReason::TaxAnnotationMismatch);
    }

    // Primary sequence is the most abundant sequence overall
    let most_abundant = artifacts
        .rel_all_seq_abundance
        .iter()
        .fold(None, |best: Option<(&String, f64)>, (name, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((name, v)),
        })
        .map(|(name, _)| name.as_str());
    let primary_sequence = most_abundant
        .and_then(|name| artifacts.sequence_of(name))
        .with_context(|| format!("No primary sequence for readset {}", readset))?
        .to_string();

    let is_low_host = host_rel_abund < LOW_HOST_REL_ABUND_MIN;
    if is_low_host {
        verdict.reject(NoUseReason::LowHostSequenceAbundance);
    }

    Ok(HostAssessment {
        genus_annotation: annotation,
        is_provenance_annotation_correct,
        inter_genus_contamination_rel_abund: None,
        is_inter_genus_contamination: None,
        primary_sequence,
        is_different_primary_sequence: None,
        host_rel_abund,
        is_low_host_rel_abund: is_low_host,
        intra_genus_contamination_ratio: None,
        is_intra_genus_contamination: None,
    })
}

/// Build one meta-info row, applying every QC rule
pub fn meta_info_row(
    info: &DatasetInfo,
    primary: &HashMap<String, String>,
    artifacts: &ReadsetArtifacts,
) -> Result<MetaInfoRow> {
    let readset = artifacts.readset.as_str();
    let fastq = info.fastq(readset)?;
    let abundance = info.abundance_info(readset)?;
    let provenance = info.provenance(&fastq.sample_id)?;

    let mut verdict = Verdict::default();
    let host = match classify_provenance(&provenance.taxonomic_nominal)
        .with_context(|| format!("Readset {}", readset))?
    {
        ProvenanceKind::Target(genus) => assess_target(
            artifacts,
            &genus,
            &abundance.most_abund_seq_of_coral_genus,
            primary,
            &mut verdict,
        )?,
        ProvenanceKind::Heliopora => assess_heliopora(artifacts, &mut verdict)?,
    };

    let is_representative = if fastq.is_replicate {
        is_representative(info, readset, &fastq.sample_id)?
    } else {
        true
    };

    Ok(MetaInfoRow {
        sample_id: fastq.sample_id.clone(),
        readset: readset.to_string(),
        use_readset: !verdict.rejected,
        no_use_reasons: verdict.reasons,
        genus_annotation: host.genus_annotation,
        provenance_nominal: provenance.taxonomic_nominal.clone(),
        provenance_label: provenance.taxonomic_label.clone(),
        is_provenance_annotation_correct: host.is_provenance_annotation_correct,
        inter_genus_contamination_rel_abund: host.inter_genus_contamination_rel_abund,
        is_inter_genus_contamination: host.is_inter_genus_contamination,
        primary_sequence: host.primary_sequence,
        is_different_primary_sequence: host.is_different_primary_sequence,
        host_rel_abund: host.host_rel_abund,
        is_low_host_rel_abund: host.is_low_host_rel_abund,
        intra_genus_contamination_ratio: host.intra_genus_contamination_ratio,
        is_intra_genus_contamination: host.is_intra_genus_contamination,
        is_replicate: fastq.is_replicate,
        is_representative,
        post_qc_seq_depth: abundance.post_qc_seq_depth,
        fwd_read_name: fastq.fwd_read_name.clone(),
        rev_read_name: fastq.rev_read_name.clone(),
        sampling_design_label: provenance.sampling_design_label.clone(),
        island: provenance.island.clone(),
        site: provenance.site.clone(),
        colony: provenance.colony.clone(),
        protocol_level_1: provenance.protocol_level_1.clone(),
        protocol_level_2: provenance.protocol_level_2.clone(),
        trait_label: provenance.trait_label.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seqio::UniqueSequence;
    use crate::tables::inputs::{AbundanceInfo, FastqInfo, Provenance};

    fn dataset(provenance: &str) -> DatasetInfo {
        let abundance = vec![
            AbundanceInfo {
                readset: "RS1".to_string(),
                most_abund_coral_genus: "Porites".to_string(),
                most_abund_seq_of_coral_genus: "PRIMARY".to_string(),
                post_qc_seq_depth: 900,
            },
            AbundanceInfo {
                readset: "RS2".to_string(),
                most_abund_coral_genus: "Porites".to_string(),
                most_abund_seq_of_coral_genus: "PRIMARY".to_string(),
                post_qc_seq_depth: 1500,
            },
            AbundanceInfo {
                readset: "RS3".to_string(),
                most_abund_coral_genus: "Porites".to_string(),
                most_abund_seq_of_coral_genus: "OTHER".to_string(),
                post_qc_seq_depth: 100,
            },
        ];
        let fastq = ["RS1", "RS2", "RS3"]
            .iter()
            .map(|r| FastqInfo {
                readset: r.to_string(),
                sample_id: if *r == "RS3" { "TARA_2" } else { "TARA_1" }.to_string(),
                is_replicate: *r != "RS3",
                fwd_read_name: format!("{}_R1.fastq.gz", r),
                rev_read_name: format!("{}_R2.fastq.gz", r),
            })
            .collect();
        let provenance = ["TARA_1", "TARA_2"]
            .iter()
            .map(|s| {
                (
                    s.to_string(),
                    Provenance {
                        sample_id: s.to_string(),
                        taxonomic_nominal: provenance.to_string(),
                        island: "I01".to_string(),
                        ..Default::default()
                    },
                )
            })
            .collect();
        DatasetInfo {
            abundance,
            fastq,
            provenance,
            ..Default::default()
        }
    }

    fn clean_porites(readset: &str) -> ReadsetArtifacts {
        ReadsetArtifacts {
            readset: readset.to_string(),
            fasta: vec![
                UniqueSequence {
                    name: "s1".to_string(),
                    sequence: "PRIMARY".to_string(),
                },
                UniqueSequence {
                    name: "s2".to_string(),
                    sequence: "ALGA".to_string(),
                },
            ],
            coral_annotation: BTreeMap::from([("s1".to_string(), "Porites".to_string())]),
            rel_all_seq_abundance: BTreeMap::from([("s1".to_string(), 0.8), ("s2".to_string(), 0.2)]),
            consolidated_host_abundance: BTreeMap::from([
                ("PRIMARY".to_string(), 0.9),
                ("VARIANT".to_string(), 0.1),
            ]),
            sample_annotation: BTreeMap::from([
                (
                    "s1".to_string(),
                    ("Porites".to_string(), "Poritidae".to_string(), "Scleractinia".to_string()),
                ),
                (
                    "s2".to_string(),
                    ("Symbiodinium".to_string(), "Symbiodiniaceae".to_string(), "Suessiales".to_string()),
                ),
            ]),
            ..Default::default()
        }
    }

    #[test]
    fn test_primary_sequence_is_mode() {
        let primary = primary_sequences(&dataset("Porites"));
        assert_eq!(primary["Porites"], "PRIMARY");
        assert!(!primary.contains_key("Millepora"));
    }

    #[test]
    fn test_clean_sample_is_usable() {
        let info = dataset("Porites");
        let primary = primary_sequences(&info);
        let row = meta_info_row(&info, &primary, &clean_porites("RS2")).unwrap();

        assert!(row.use_readset);
        assert_eq!(row.no_use_reason(), "");
        assert_eq!(row.genus_annotation, "Porites");
        assert_eq!(row.host_rel_abund, 0.8);
        assert_eq!(row.inter_genus_contamination_rel_abund, Some(0.0));
        assert_eq!(row.is_different_primary_sequence, Some(false));
        assert!((row.intra_genus_contamination_ratio.unwrap() - 0.1 / 0.9).abs() < 1e-12);
        // RS2 has the deeper replicate of TARA_1
        assert!(row.is_replicate);
        assert!(row.is_representative);
        assert_eq!(row.record().len(), MetaInfoRow::HEADER.len());
    }

    #[test]
    fn test_non_representative_replicate() {
        let info = dataset("Porites");
        let primary = primary_sequences(&info);
        let row = meta_info_row(&info, &primary, &clean_porites("RS1")).unwrap();
        assert!(!row.is_representative);
        // Not a usability criterion
        assert!(row.use_readset);
    }

    #[test]
    fn test_contamination_rules() {
        let info = dataset("Porites lobata");
        let primary = primary_sequences(&info);
        let mut artifacts = clean_porites("RS3");
        artifacts.coral_annotation.insert("s2".to_string(), "Pocillopora".to_string());
        artifacts.rel_all_seq_abundance = BTreeMap::from([("s1".to_string(), 0.25), ("s2".to_string(), 0.05)]);
        artifacts
            .consolidated_host_abundance
            .insert("VARIANT".to_string(), 0.5);

        let row = meta_info_row(&info, &primary, &artifacts).unwrap();
        assert!(!row.use_readset);
        assert_eq!(
            row.no_use_reason(),
            "inter_genus_contamination;different_primary_sequence;\
             low_host_sequence_abundance;putative_intra_genus_contamination"
        );
        // Binomial provenance reduced to its genus
        assert!(row.is_provenance_annotation_correct);
        assert_eq!(row.provenance_nominal, "Porites lobata");
        assert!(row.is_representative);
    }

    #[test]
    fn test_mismatched_provenance() {
        let info = dataset("Pocillopora");
        let primary = primary_sequences(&info);
        let row = meta_info_row(&info, &primary, &clean_porites("RS2")).unwrap();
        assert!(!row.is_provenance_annotation_correct);
        assert_eq!(row.no_use_reason(), "tax_annotation_mismatch");
    }

    #[test]
    fn test_heliopora_leaves_contamination_blank() {
        let info = dataset("Heliopora");
        let primary = primary_sequences(&info);
        let mut artifacts = clean_porites("RS2");
        artifacts.sample_annotation.insert(
            "s1".to_string(),
            ("Heliopora".to_string(), "Helioporidae".to_string(), "Helioporacea".to_string()),
        );

        let row = meta_info_row(&info, &primary, &artifacts).unwrap();
        assert!(!row.use_readset);
        assert_eq!(row.no_use_reason(), "not_of_target_genus");
        assert_eq!(row.genus_annotation, "Heliopora");
        assert_eq!(row.primary_sequence, "PRIMARY");
        assert_eq!(row.inter_genus_contamination_rel_abund, None);
        assert_eq!(row.is_different_primary_sequence, None);
        assert_eq!(row.intra_genus_contamination_ratio, None);

        let record = row.record();
        assert_eq!(record[8], "");
        assert_eq!(record[2], "False");
    }

    #[test]
    fn test_unknown_provenance_is_fatal() {
        let info = dataset("Acropora");
        let primary = primary_sequences(&info);
        assert!(meta_info_row(&info, &primary, &clean_porites("RS2")).is_err());
    }

    #[test]
    fn test_reasons_deduplicated() {
        let info = dataset("Porites");
        let primary = primary_sequences(&info);
        let mut row = meta_info_row(&info, &primary, &clean_porites("RS2")).unwrap();
        row.no_use_reasons = vec![
            NoUseReason::NotOfTargetGenus,
            NoUseReason::TaxAnnotationMismatch,
            NoUseReason::NotOfTargetGenus,
        ];
        assert_eq!(row.no_use_reason(), "not_of_target_genus;tax_annotation_mismatch");
    }

    #[test]
    fn test_py_float() {
        assert_eq!(py_float(1.0), "1.0");
        assert_eq!(py_float(0.25), "0.25");
        assert_eq!(py_float(0.0), "0.0");
    }
}
