//! Sweep coordinates and the legacy result-file naming scheme
//!
//! Every cached result produced by the 18S pipeline is named after the
//! parameters that produced it. The fields are joined with `_` in a fixed
//! order and followed by a marker naming the kind of result:
//!
//! `{genus}_{remove_maj_seq}_{exclude_secondary_seq_samples}_{exclude_no_use_samples}_
//! {use_replicates}_{snp_distance_type}_{dist_method}_{approach}_{normalisation_abundance}_
//! {normalisation_method}_{only_snp_samples}_{samples_at_least_threshold}_
//! {most_abund_seq_cutoff}_{min_num_distinct_seqs_per_sample}`
//!
//! Fields are read back by position, so the order here must never change.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Marker for Mantel test result files (`coef\tp_value`)
pub const MANTEL_SUFFIX: &str = "_mantel_result.txt";

/// Marker for classification agreement result files (`max_agreement,max_k`)
pub const CLASSIFICATION_SUFFIX: &str = "_classification_result.txt";

/// Island label of classification results computed over every island
pub const ALL_ISLANDS: &str = "all";

/// Number of `_`-separated fields in the unique string
const FIELD_COUNT: usize = 14;

/// Positional indices into the split unique string
pub mod field {
    pub const GENUS: usize = 0;
    pub const DISTANCE_METHOD: usize = 6;
    pub const NORMALISATION_ABUNDANCE: usize = 8;
    pub const NORMALISATION_METHOD: usize = 9;
    pub const SAMPLES_AT_LEAST_THRESHOLD: usize = 11;
    pub const MOST_ABUND_SEQ_CUTOFF: usize = 12;
    pub const MIN_DISTINCT_SEQS: usize = 13;
}

/// A numeric sweep parameter that remembers how it was spelled on disk.
///
/// The pipeline wrote both `0` and `0.0` for the same threshold depending on
/// how the distances were produced, and the two name different cache slots.
/// Identity (`Eq`/`Hash`) follows the spelling; [`SweepValue::value`] gives the
/// number used for grid axes.
#[derive(Debug, Clone)]
pub struct SweepValue {
    text: String,
    value: f64,
}

impl SweepValue {
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for SweepValue {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for SweepValue {}

impl Hash for SweepValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl FromStr for SweepValue {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let value: f64 = text
            .parse()
            .with_context(|| format!("Invalid numeric sweep value: '{}'", s))?;
        if !value.is_finite() {
            bail!("Sweep value must be finite: '{}'", s);
        }
        Ok(SweepValue {
            text: text.to_string(),
            value,
        })
    }
}

impl From<u32> for SweepValue {
    fn from(v: u32) -> Self {
        SweepValue {
            text: v.to_string(),
            value: v as f64,
        }
    }
}

impl From<f64> for SweepValue {
    /// Floats are spelled the way the pipeline's writer spelled them (`1.0`, `0.25`)
    fn from(v: f64) -> Self {
        SweepValue {
            text: format!("{:?}", v),
            value: v,
        }
    }
}

impl fmt::Display for SweepValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for SweepValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for SweepValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Float(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(v) => Ok(SweepValue {
                text: v.to_string(),
                value: v as f64,
            }),
            Raw::Float(v) => Ok(SweepValue::from(v)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Between-sample distance used to build the distance matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMethod {
    BrayCurtis,
    Unifrac,
}

impl DistanceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMethod::BrayCurtis => "braycurtis",
            DistanceMethod::Unifrac => "unifrac",
        }
    }

    /// File name suffix of the artifact the agreement oracle consumes.
    /// Bray-Curtis works on the distance matrix, UniFrac on its PCoA coordinates.
    pub fn artifact_suffix(&self) -> &'static str {
        match self {
            DistanceMethod::BrayCurtis => "_distances.dist",
            DistanceMethod::Unifrac => "_pcoa_coords.csv.gz",
        }
    }
}

impl fmt::Display for DistanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "braycurtis" => Ok(DistanceMethod::BrayCurtis),
            "unifrac" => Ok(DistanceMethod::Unifrac),
            other => bail!("Unknown distance method: '{}'", other),
        }
    }
}

/// Abundance normalisation applied before distances are computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalisationMethod {
    /// Rarefaction to an absolute depth
    Rai,
    /// Proportional scaling with rounding
    Pwr,
}

impl NormalisationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalisationMethod::Rai => "rai",
            NormalisationMethod::Pwr => "pwr",
        }
    }
}

impl fmt::Display for NormalisationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NormalisationMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rai" => Ok(NormalisationMethod::Rai),
            "pwr" => Ok(NormalisationMethod::Pwr),
            other => bail!("Unknown normalisation method: '{}'", other),
        }
    }
}

/// Kind of cached result, distinguished by file name marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Mantel,
    Classification,
}

impl ResultKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            ResultKind::Mantel => MANTEL_SUFFIX,
            ResultKind::Classification => CLASSIFICATION_SUFFIX,
        }
    }
}

/// One point of the parameter sweep. Uniquely identifies one cache slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SweepCoordinate {
    pub genus: String,
    pub remove_majority_sequence: bool,
    pub exclude_secondary_seq_samples: bool,
    pub exclude_no_use_samples: bool,
    pub use_replicates: bool,
    pub snp_distance_type: String,
    pub distance_method: DistanceMethod,
    pub approach: String,
    pub normalisation_abundance: u32,
    pub normalisation_method: NormalisationMethod,
    pub only_snp_samples: bool,
    pub samples_at_least_threshold: SweepValue,
    pub most_abund_seq_cutoff: SweepValue,
    pub min_num_distinct_seqs: u32,
    /// Island subset, only part of classification result names
    pub island: Option<String>,
}

impl SweepCoordinate {
    /// Coordinate with the processing flags used throughout the coral analysis
    /// (majority sequence removed, secondary and no-use samples excluded,
    /// replicates not used, biallelic SNP distances).
    pub fn new(genus: &str, distance_method: DistanceMethod) -> Self {
        SweepCoordinate {
            genus: genus.to_string(),
            remove_majority_sequence: true,
            exclude_secondary_seq_samples: true,
            exclude_no_use_samples: true,
            use_replicates: false,
            snp_distance_type: "biallelic".to_string(),
            distance_method,
            approach: "dist".to_string(),
            normalisation_abundance: 10000,
            normalisation_method: NormalisationMethod::Pwr,
            only_snp_samples: false,
            samples_at_least_threshold: SweepValue::from(0u32),
            most_abund_seq_cutoff: SweepValue::from(0u32),
            min_num_distinct_seqs: 3,
            island: None,
        }
    }

    pub fn with_normalisation(mut self, abundance: u32, method: NormalisationMethod) -> Self {
        self.normalisation_abundance = abundance;
        self.normalisation_method = method;
        self
    }

    pub fn with_only_snp_samples(mut self, only_snp_samples: bool) -> Self {
        self.only_snp_samples = only_snp_samples;
        self
    }

    pub fn with_threshold(mut self, threshold: SweepValue) -> Self {
        self.samples_at_least_threshold = threshold;
        self
    }

    pub fn with_cutoff(mut self, cutoff: SweepValue) -> Self {
        self.most_abund_seq_cutoff = cutoff;
        self
    }

    pub fn with_min_distinct_seqs(mut self, min: u32) -> Self {
        self.min_num_distinct_seqs = min;
        self
    }

    pub fn with_island(mut self, island: Option<String>) -> Self {
        self.island = island;
        self
    }

    /// Legacy unique string (never includes the island)
    pub fn unique_string(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}_{}_{}_{}_{}_{}_{}_{}_{}_{}",
            self.genus,
            py_bool(self.remove_majority_sequence),
            py_bool(self.exclude_secondary_seq_samples),
            py_bool(self.exclude_no_use_samples),
            py_bool(self.use_replicates),
            self.snp_distance_type,
            self.distance_method,
            self.approach,
            self.normalisation_abundance,
            self.normalisation_method,
            py_bool(self.only_snp_samples),
            self.samples_at_least_threshold,
            self.most_abund_seq_cutoff,
            self.min_num_distinct_seqs,
        )
    }

    /// Island subset as passed to the oracle (`all` when unset)
    pub fn island_label(&self) -> &str {
        self.island.as_deref().unwrap_or(ALL_ISLANDS)
    }

    /// File name of this coordinate's cached result.
    ///
    /// Classification results always carry the island label.
    pub fn result_file_name(&self, kind: ResultKind) -> String {
        match kind {
            ResultKind::Classification => {
                format!("{}_{}{}", self.unique_string(), self.island_label(), kind.suffix())
            }
            ResultKind::Mantel => format!("{}{}", self.unique_string(), kind.suffix()),
        }
    }

    /// File name of the distance matrix or PCoA artifact for this coordinate
    pub fn distance_artifact_name(&self) -> String {
        format!(
            "{}{}",
            self.unique_string(),
            self.distance_method.artifact_suffix()
        )
    }
}

impl fmt::Display for SweepCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.island {
            Some(island) => write!(f, "{} [{}]", self.unique_string(), island),
            None => f.write_str(&self.unique_string()),
        }
    }
}

fn py_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

fn parse_py_bool(s: &str) -> Result<bool> {
    match s {
        "True" => Ok(true),
        "False" => Ok(false),
        other => bail!("Expected True or False, found '{}'", other),
    }
}

/// Decode a legacy unique string back into a coordinate (island unset)
pub fn parse_unique_string(s: &str) -> Result<SweepCoordinate> {
    let fields: Vec<&str> = s.split('_').collect();
    if fields.len() != FIELD_COUNT {
        bail!(
            "Expected {} '_'-separated fields, found {}: {}",
            FIELD_COUNT,
            fields.len(),
            s
        );
    }
    decode_fields(&fields).with_context(|| format!("Failed to decode sweep coordinate: {}", s))
}

fn decode_fields(fields: &[&str]) -> Result<SweepCoordinate> {
    Ok(SweepCoordinate {
        genus: fields[field::GENUS].to_string(),
        remove_majority_sequence: parse_py_bool(fields[1])?,
        exclude_secondary_seq_samples: parse_py_bool(fields[2])?,
        exclude_no_use_samples: parse_py_bool(fields[3])?,
        use_replicates: parse_py_bool(fields[4])?,
        snp_distance_type: fields[5].to_string(),
        distance_method: fields[field::DISTANCE_METHOD].parse()?,
        approach: fields[7].to_string(),
        normalisation_abundance: fields[field::NORMALISATION_ABUNDANCE]
            .parse()
            .with_context(|| {
                format!(
                    "Invalid normalisation abundance: '{}'",
                    fields[field::NORMALISATION_ABUNDANCE]
                )
            })?,
        normalisation_method: fields[field::NORMALISATION_METHOD].parse()?,
        only_snp_samples: parse_py_bool(fields[10])?,
        samples_at_least_threshold: fields[field::SAMPLES_AT_LEAST_THRESHOLD].parse()?,
        most_abund_seq_cutoff: fields[field::MOST_ABUND_SEQ_CUTOFF].parse()?,
        min_num_distinct_seqs: fields[field::MIN_DISTINCT_SEQS].parse().with_context(|| {
            format!(
                "Invalid minimum distinct sequences: '{}'",
                fields[field::MIN_DISTINCT_SEQS]
            )
        })?,
        island: None,
    })
}

/// Decode a result file name into its coordinate.
///
/// Returns `Ok(None)` when the name does not carry the marker for `kind`.
/// Classification names may carry one extra trailing field, the island.
pub fn decode_result_file_name(name: &str, kind: ResultKind) -> Result<Option<SweepCoordinate>> {
    let Some(stem) = name.strip_suffix(kind.suffix()) else {
        return Ok(None);
    };
    let fields: Vec<&str> = stem.split('_').collect();

    let coordinate = match (kind, fields.len()) {
        (_, FIELD_COUNT) => decode_fields(&fields)?,
        (ResultKind::Classification, n) if n == FIELD_COUNT + 1 => {
            let island = match fields[FIELD_COUNT] {
                ALL_ISLANDS => None,
                island => Some(island.to_string()),
            };
            decode_fields(&fields[..FIELD_COUNT])?.with_island(island)
        }
        (_, n) => bail!("Unexpected field count {} in result file name: {}", n, name),
    };
    Ok(Some(coordinate))
}
