//! Release tables for the 18S coral dataset
//!
//! Four CSV files are produced from the QC pipeline's cached outputs: raw
//! sequence abundance, per-sequence taxonomy, consolidated host abundance and
//! the coral meta-info table carrying the `use` verdict of every readset.

pub mod abundance;
pub mod inputs;
pub mod meta_info;

use abundance::{
    consolidated_host_table, raw_abundance_table, MasterSequences, TaxonomyRow, WideTable,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use inputs::{load_readsets, DatasetInfo};
use log::info;
use meta_info::{meta_info_row, primary_sequences, MetaInfoRow};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Everything written in one release
#[derive(Debug, Clone)]
pub struct ReleaseTables {
    pub raw_abundance: WideTable,
    pub taxonomy: Vec<TaxonomyRow>,
    pub consolidated_host: WideTable,
    pub meta_info: Vec<MetaInfoRow>,
}

/// Load every coral readset and build the four tables
pub fn build_release_tables(cache_dir: &Path, qc_dir: &Path) -> Result<ReleaseTables> {
    let info = DatasetInfo::load(cache_dir)?;
    let readsets = info.coral_readsets();
    let artifacts = load_readsets(qc_dir, &readsets)?;

    info!("Building raw abundance and taxonomy tables...");
    let master = MasterSequences::collect(&artifacts)?;
    let raw_abundance = raw_abundance_table(&info, &master, &artifacts)?;
    let taxonomy = master.taxonomy_rows();
    info!("  {} distinct sequences", master.ordered.len());

    info!("Building consolidated host table...");
    let consolidated_host = consolidated_host_table(&info, &artifacts)?;
    info!("  {} consolidated host sequences", consolidated_host.columns.len());

    info!("Building coral meta-info table...");
    let primary = primary_sequences(&info);
    let meta_info: Vec<MetaInfoRow> = artifacts
        .par_iter()
        .map(|a| meta_info_row(&info, &primary, a))
        .collect::<Result<_>>()?;
    let usable = meta_info.iter().filter(|r| r.use_readset).count();
    info!("  {} of {} readsets usable", usable, meta_info.len());

    Ok(ReleaseTables {
        raw_abundance,
        taxonomy,
        consolidated_host,
        meta_info,
    })
}

/// Timestamp embedded in release file names
pub fn release_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H_%M_%S.%6fUTC").to_string()
}

fn csv_writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    csv::WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))
}

fn write_wide(path: &Path, table: &WideTable) -> Result<()> {
    let mut writer = csv_writer(path)?;
    let mut header = vec!["readset", "sample-id"];
    header.extend(table.columns.iter().map(String::as_str));
    writer.write_record(&header)?;
    for (readset, sample_id, counts) in &table.rows {
        let mut record = vec![readset.clone(), sample_id.clone()];
        record.extend(counts.iter().map(|c| c.to_string()));
        writer.write_record(&record)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Write the four tables into `out_dir`, returning their paths
pub fn write_release_tables(
    tables: &ReleaseTables,
    out_dir: &Path,
    stamp: &str,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let meta_path = out_dir.join(format!("18S_coral_meta_info_table_{}.csv", stamp));
    let mut writer = csv_writer(&meta_path)?;
    writer.write_record(MetaInfoRow::HEADER)?;
    for row in &tables.meta_info {
        writer.write_record(row.record())?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", meta_path.display()))?;

    let tax_path = out_dir.join(format!("18S_tax_annotation_{}.csv", stamp));
    let mut writer = csv_writer(&tax_path)?;
    writer.write_record(["sequence", "order", "family", "genus"])?;
    for row in &tables.taxonomy {
        writer.write_record([&row.sequence, &row.order, &row.family, &row.genus])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", tax_path.display()))?;

    let raw_path = out_dir.join(format!("18S_raw_seq_abund_{}.csv", stamp));
    write_wide(&raw_path, &tables.raw_abundance)?;

    let host_path = out_dir.join(format!("18S_consolidated_host_{}.csv", stamp));
    write_wide(&host_path, &tables.consolidated_host)?;

    for path in [&meta_path, &tax_path, &raw_path, &host_path] {
        info!("Wrote {}", path.display());
    }
    Ok(vec![meta_path, tax_path, raw_path, host_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;

    fn write_inputs(cache: &Path, qc: &Path) {
        fs::write(
            cache.join(inputs::ABUNDANCE_INFO),
            "readset\tmost_abund_coral_genus\tmost_abund_seq_of_coral_genus\tpost_qc_seq_depth\n\
             RS1\tPorites\tAAAA\t10\n\
             RS2\tPorites\tAAAA\t6\n",
        )
        .unwrap();
        fs::write(
            cache.join(inputs::FASTQ_INFO),
            "readset\tsample-id\tis_replicate\tfwd_read_name\trev_read_name\n\
             RS1\tTARA_1\tFalse\tRS1_1.fq.gz\tRS1_2.fq.gz\n\
             RS2\tTARA_2\tFalse\tRS2_1.fq.gz\tRS2_2.fq.gz\n",
        )
        .unwrap();
        fs::write(
            cache.join(inputs::SAMPLE_PROVENANCE),
            "sample-id\tSample Material label, organismal system level, taxonomic, nominal\n\
             TARA_1\tPorites\n\
             TARA_2\tPorites lobata\n",
        )
        .unwrap();
        fs::write(cache.join(inputs::BLASTED_TO_CONSOLIDATED), "{\"AAAT\": \"AAAA\"}").unwrap();

        for (readset, fasta, names) in [
            ("RS1", ">a\nAAAA\n>b\nAAAT\n", "a\ta,x,y\nb\tb\n"),
            ("RS2", ">c\nAAAA\n>d\nCCCC\n", "c\tc,z\nd\td\n"),
        ] {
            let dir = qc.join(readset);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(inputs::UNIQUE_FASTA), fasta).unwrap();
            fs::write(dir.join(inputs::UNIQUE_NAMES), names).unwrap();
        }

        let rs1 = qc.join("RS1");
        fs::write(rs1.join(inputs::CORAL_ANNOTATION), r#"{"a": "Porites", "b": "Porites"}"#).unwrap();
        fs::write(rs1.join(inputs::CONSOLIDATED_HOST), r#"{"AAAA": 1.0}"#).unwrap();
        fs::write(rs1.join(inputs::REL_ALL_SEQ_ABUNDANCE), r#"{"a": 0.75, "b": 0.25}"#).unwrap();
        fs::write(
            rs1.join(inputs::SAMPLE_ANNOTATION),
            r#"{"a": ["Porites", "Poritidae", "Scleractinia"], "b": ["Porites", "Poritidae", "Scleractinia"]}"#,
        )
        .unwrap();

        let rs2 = qc.join("RS2");
        fs::write(rs2.join(inputs::CORAL_ANNOTATION), r#"{"c": "Porites"}"#).unwrap();
        fs::write(rs2.join(inputs::CONSOLIDATED_HOST), r#"{"AAAA": 1.0}"#).unwrap();
        fs::write(rs2.join(inputs::REL_ALL_SEQ_ABUNDANCE), r#"{"c": 0.666, "d": 0.334}"#).unwrap();
        fs::write(
            rs2.join(inputs::SAMPLE_ANNOTATION),
            r#"{"c": ["Porites", "Poritidae", "Scleractinia"]}"#,
        )
        .unwrap();
    }

    #[test]
    fn test_release_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(release_timestamp(now), "2024-03-05T14_07_09.000000UTC");
    }

    #[test]
    fn test_build_and_write_release() {
        let cache = tempfile::tempdir().unwrap();
        let qc = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_inputs(cache.path(), qc.path());

        let tables = build_release_tables(cache.path(), qc.path()).unwrap();
        // Cumulative relative abundance: AAAA 3/4 + 2/3, CCCC 1/3, AAAT 1/4
        assert_eq!(tables.raw_abundance.columns, vec!["AAAA", "CCCC", "AAAT"]);
        assert_eq!(tables.raw_abundance.rows[0].2, vec![3, 0, 1]);
        assert_eq!(tables.raw_abundance.rows[1].2, vec![2, 1, 0]);
        assert_eq!(tables.consolidated_host.columns, vec!["AAAA"]);
        assert_eq!(tables.consolidated_host.rows[0].2, vec![4]);
        assert_eq!(tables.consolidated_host.rows[1].2, vec![2]);
        assert_eq!(tables.taxonomy[1].genus, abundance::NOT_ANNOTATED);
        assert_eq!(tables.taxonomy[2].family, "Poritidae");

        let meta: Vec<&str> = tables.meta_info.iter().map(|r| r.readset.as_str()).collect();
        assert_eq!(meta, vec!["RS1", "RS2"]);
        assert!(tables.meta_info.iter().all(|r| r.use_readset));

        let paths = write_release_tables(&tables, out.path(), "STAMP").unwrap();
        assert_eq!(paths.len(), 4);
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names[0], "18S_coral_meta_info_table_STAMP.csv");

        let host = fs::read_to_string(&paths[3]).unwrap();
        assert_eq!(host, "readset,sample-id,AAAA\nRS1,TARA_1,4\nRS2,TARA_2,2\n");

        let mut reader = csv::Reader::from_path(&paths[0]).unwrap();
        assert_eq!(reader.headers().unwrap().len(), MetaInfoRow::HEADER.len());
        let first = reader.records().next().unwrap().unwrap();
        assert_eq!(&first[0], "TARA_1");
        assert_eq!(&first[2], "True");
    }
}
