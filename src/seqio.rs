//! Readers for the QC pipeline's per-readset artifacts
//!
//! Every artifact may have been gzipped after the pipeline finished, so a
//! missing `x` falls back to `x.gz`.

use anyhow::{bail, Context, Result};
use flate2::read::MultiGzDecoder;
use needletail::parse_fastx_file;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One record of a mothur unique FASTA
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueSequence {
    /// Mothur sequence name (first tab-separated field of the header)
    pub name: String,
    pub sequence: String,
}

/// Locate `path` or its gzipped sibling
pub fn resolve(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    let mut gz = path.as_os_str().to_owned();
    gz.push(".gz");
    let gz = PathBuf::from(gz);
    if gz.is_file() {
        return Ok(gz);
    }
    bail!("File not found (also tried .gz): {}", path.display());
}

/// Open a text file, decompressing `.gz` transparently
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>> {
    let path = resolve(path)?;
    let file = File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
    if path.extension().is_some_and(|e| e == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Read a mothur unique FASTA in file order
pub fn read_unique_fasta(path: &Path) -> Result<Vec<UniqueSequence>> {
    let path = resolve(path)?;
    let mut reader = parse_fastx_file(&path)
        .with_context(|| format!("Failed to open FASTA: {}", path.display()))?;

    let mut records = Vec::new();
    while let Some(record) = reader.next() {
        let record =
            record.with_context(|| format!("Failed to parse record in {}", path.display()))?;
        let header = String::from_utf8_lossy(record.id()).to_string();
        let name = header.split('\t').next().unwrap_or(&header).trim().to_string();
        let sequence = String::from_utf8_lossy(&record.seq()).to_string();
        records.push(UniqueSequence { name, sequence });
    }
    Ok(records)
}

/// Absolute abundance per representative name from a mothur `.names` file.
///
/// Each line is `name<TAB>member1,member2,...`; the abundance is the member count.
pub fn read_names_abundance(path: &Path) -> Result<HashMap<String, u64>> {
    let reader = open_text(path)?;
    let mut abundance = HashMap::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let (Some(name), Some(members)) = (fields.next(), fields.next()) else {
            bail!("{}:{}: expected 'name<TAB>members'", path.display(), i + 1);
        };
        let count = members.split(',').filter(|m| !m.is_empty()).count() as u64;
        abundance.insert(name.to_string(), count);
    }
    Ok(abundance)
}

/// Relative abundance per name (sums to 1 over the file)
pub fn relative_abundance(absolute: &HashMap<String, u64>) -> HashMap<String, f64> {
    let total: u64 = absolute.values().sum();
    absolute
        .iter()
        .map(|(name, &count)| {
            let rel = if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            };
            (name.clone(), rel)
        })
        .collect()
}

/// Deserialize a (possibly gzipped) JSON file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = open_text(path)?;
    serde_json::from_reader(reader).with_context(|| format!("Failed to parse JSON: {}", path.display()))
}
