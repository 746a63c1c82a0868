//! Raw abundance, taxonomy and consolidated host tables

use super::inputs::{DatasetInfo, ReadsetArtifacts};
use crate::seqio::relative_abundance;
use anyhow::{Context, Result};
use std::collections::HashMap;

pub const NOT_ANNOTATED: &str = "not_annotated";

/// Readset × column count table
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    /// Value columns, after `readset` and `sample-id`
    pub columns: Vec<String>,
    /// (readset, sample-id, counts in column order)
    pub rows: Vec<(String, String, Vec<u64>)>,
}

/// One row of the taxonomy table
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyRow {
    pub sequence: String,
    pub order: String,
    pub family: String,
    pub genus: String,
}

/// Every sequence of the dataset with its cumulative relative abundance
#[derive(Debug, Clone, Default)]
pub struct MasterSequences {
    /// Sorted by cumulative abundance, descending; ties keep first-seen order
    pub ordered: Vec<String>,
    pub taxonomy: HashMap<String, TaxonomyRow>,
}

/// Sort keys by summed value, descending, keeping insertion order on ties
fn order_by_sum(first_seen: Vec<String>, sums: &HashMap<String, f64>) -> Vec<String> {
    let mut ordered = first_seen;
    ordered.sort_by(|a, b| {
        let (va, vb) = (sums[a.as_str()], sums[b.as_str()]);
        vb.total_cmp(&va)
    });
    ordered
}

impl MasterSequences {
    /// First pass over all readsets: relative abundances summed per sequence.
    /// Taxonomy comes from the first readset a sequence is seen in.
    pub fn collect(readsets: &[ReadsetArtifacts]) -> Result<Self> {
        let mut first_seen = Vec::new();
        let mut sums: HashMap<String, f64> = HashMap::new();
        let mut taxonomy = HashMap::new();

        for artifacts in readsets {
            let relative = relative_abundance(&artifacts.names_abundance);
            for record in &artifacts.fasta {
                let rel = relative.get(&record.name).copied().with_context(|| {
                    format!(
                        "Sequence {} of readset {} missing from names file",
                        record.name, artifacts.readset
                    )
                })?;
                match sums.get_mut(&record.sequence) {
                    Some(sum) => *sum += rel,
                    None => {
                        sums.insert(record.sequence.clone(), rel);
                        first_seen.push(record.sequence.clone());
                        let row = match artifacts.sample_annotation.get(&record.name) {
                            Some((genus, family, order)) => TaxonomyRow {
                                sequence: record.sequence.clone(),
                                order: order.clone(),
                                family: family.clone(),
                                genus: genus.clone(),
                            },
                            None => TaxonomyRow {
                                sequence: record.sequence.clone(),
                                order: NOT_ANNOTATED.to_string(),
                                family: NOT_ANNOTATED.to_string(),
                                genus: NOT_ANNOTATED.to_string(),
                            },
                        };
                        taxonomy.insert(record.sequence.clone(), row);
                    }
                }
            }
        }

        Ok(MasterSequences {
            ordered: order_by_sum(first_seen, &sums),
            taxonomy,
        })
    }

    pub fn taxonomy_rows(&self) -> Vec<TaxonomyRow> {
        self.ordered
            .iter()
            .filter_map(|seq| self.taxonomy.get(seq).cloned())
            .collect()
    }
}

/// Absolute abundance of every master sequence in every readset
pub fn raw_abundance_table(
    info: &DatasetInfo,
    master: &MasterSequences,
    readsets: &[ReadsetArtifacts],
) -> Result<WideTable> {
    let mut rows = Vec::with_capacity(readsets.len());
    for artifacts in readsets {
        let mut by_sequence: HashMap<&str, u64> = HashMap::with_capacity(artifacts.fasta.len());
        for record in &artifacts.fasta {
            by_sequence.insert(&record.sequence, artifacts.abundance_of(&record.name)?);
        }
        let counts = master
            .ordered
            .iter()
            .map(|seq| by_sequence.get(seq.as_str()).copied().unwrap_or(0))
            .collect();
        rows.push((
            artifacts.readset.clone(),
            info.sample_id(&artifacts.readset)?.to_string(),
            counts,
        ));
    }
    Ok(WideTable {
        columns: master.ordered.clone(),
        rows,
    })
}

/// Consolidated host sequences with absolute abundance per readset.
///
/// A consolidated sequence's count is the summed abundance of the original
/// sequences it represents in that readset.
pub fn consolidated_host_table(
    info: &DatasetInfo,
    readsets: &[ReadsetArtifacts],
) -> Result<WideTable> {
    let mut first_seen = Vec::new();
    let mut sums: HashMap<String, f64> = HashMap::new();
    for artifacts in readsets {
        for (seq, rel) in &artifacts.consolidated_host_abundance {
            match sums.get_mut(seq) {
                Some(sum) => *sum += rel,
                None => {
                    sums.insert(seq.clone(), *rel);
                    first_seen.push(seq.clone());
                }
            }
        }
    }
    let columns = order_by_sum(first_seen, &sums);

    let mut rows = Vec::with_capacity(readsets.len());
    for artifacts in readsets {
        let mut represented: HashMap<&str, u64> = HashMap::new();
        for record in &artifacts.fasta {
            let representative = info
                .blasted_to_consolidated
                .get(&record.sequence)
                .map(String::as_str)
                .unwrap_or(&record.sequence);
            *represented.entry(representative).or_insert(0) += artifacts
                .abundance_of(&record.name)
                .with_context(|| format!("Consolidating readset {}", artifacts.readset))?;
        }

        let counts = columns
            .iter()
            .map(|seq| {
                if artifacts.consolidated_host_abundance.contains_key(seq) {
                    represented.get(seq.as_str()).copied().unwrap_or(0)
                } else {
                    0
                }
            })
            .collect();
        rows.push((
            artifacts.readset.clone(),
            info.sample_id(&artifacts.readset)?.to_string(),
            counts,
        ));
    }

    Ok(WideTable { columns, rows })
}
