//! Mantel result scanning and parameter series
//!
//! The distance pipeline leaves one `{unique}_mantel_result.txt` per sweep
//! coordinate (`coef\tp_value`). This module reads them back, slices them into
//! one-parameter series and threshold × cutoff grids, and lays out the
//! three-row comparison figure.

use crate::cache::ResultRecord;
use crate::coordinate::{
    decode_result_file_name, DistanceMethod, NormalisationMethod, ResultKind, SweepCoordinate,
    SweepValue,
};
use crate::grid::{Exclusions, Grid, GridKey};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Correlation between the 18S distances and the SNP distances
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MantelResult {
    pub coefficient: f64,
    pub p_value: f64,
}

/// A Mantel result with the coordinate decoded from its file name
#[derive(Debug, Clone)]
pub struct MantelEntry {
    pub coordinate: SweepCoordinate,
    pub result: MantelResult,
    pub file_name: String,
}

/// Read a single `coef\tp_value` file
pub fn read_mantel_result(path: &Path) -> Result<MantelResult> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read Mantel result: {}", path.display()))?;
    parse_mantel_line(&content)
        .with_context(|| format!("Malformed Mantel result: {}", path.display()))
}

fn parse_mantel_line(content: &str) -> Result<MantelResult> {
    let fields: Vec<&str> = content.trim().split('\t').collect();
    if fields.len() != 2 {
        bail!("Expected 'coef<TAB>p_value', found {} fields", fields.len());
    }
    let coefficient: f64 = fields[0]
        .trim()
        .parse()
        .with_context(|| format!("Invalid coefficient: '{}'", fields[0]))?;
    let p_value: f64 = fields[1]
        .trim()
        .parse()
        .with_context(|| format!("Invalid p-value: '{}'", fields[1]))?;
    Ok(MantelResult {
        coefficient,
        p_value,
    })
}

/// Read every Mantel result in `dir`, sorted by file name.
///
/// Files carrying the Mantel marker but an undecodable name are skipped.
pub fn scan_mantel_results(dir: &Path) -> Result<Vec<MantelEntry>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list results directory: {}", dir.display()))?
    {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();

    let mut entries = Vec::new();
    for name in names {
        let coordinate = match decode_result_file_name(&name, ResultKind::Mantel) {
            Ok(Some(coordinate)) => coordinate,
            Ok(None) => continue,
            Err(e) => {
                log::debug!("Skipping {}: {:#}", name, e);
                continue;
            }
        };
        let result = read_mantel_result(&dir.join(&name))?;
        entries.push(MantelEntry {
            coordinate,
            result,
            file_name: name,
        });
    }

    log::info!("Found {} Mantel results in {}", entries.len(), dir.display());
    Ok(entries)
}

/// Sweep parameter that varies along a series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAxis {
    NormalisationAbundance,
    SamplesAtLeastThreshold,
    MostAbundSeqCutoff,
}

impl SweepAxis {
    pub fn value(&self, coordinate: &SweepCoordinate) -> f64 {
        match self {
            SweepAxis::NormalisationAbundance => coordinate.normalisation_abundance as f64,
            SweepAxis::SamplesAtLeastThreshold => coordinate.samples_at_least_threshold.value(),
            SweepAxis::MostAbundSeqCutoff => coordinate.most_abund_seq_cutoff.value(),
        }
    }

    /// The value as written in the file name
    pub fn spelling(&self, coordinate: &SweepCoordinate) -> String {
        match self {
            SweepAxis::NormalisationAbundance => coordinate.normalisation_abundance.to_string(),
            SweepAxis::SamplesAtLeastThreshold => {
                coordinate.samples_at_least_threshold.as_str().to_string()
            }
            SweepAxis::MostAbundSeqCutoff => coordinate.most_abund_seq_cutoff.as_str().to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SweepAxis::NormalisationAbundance => "normalisation abundance",
            SweepAxis::SamplesAtLeastThreshold => "samples at least threshold",
            SweepAxis::MostAbundSeqCutoff => "most abundant seq cutoff",
        }
    }

    /// Copy this axis' field from `from` into `into`
    fn project(&self, into: &mut SweepCoordinate, from: &SweepCoordinate) {
        match self {
            SweepAxis::NormalisationAbundance => {
                into.normalisation_abundance = from.normalisation_abundance
            }
            SweepAxis::SamplesAtLeastThreshold => {
                into.samples_at_least_threshold = from.samples_at_least_threshold.clone()
            }
            SweepAxis::MostAbundSeqCutoff => {
                into.most_abund_seq_cutoff = from.most_abund_seq_cutoff.clone()
            }
        }
    }
}

/// Selects entries equal to a template on every field but the free axes
#[derive(Debug, Clone)]
pub struct MantelQuery {
    template: SweepCoordinate,
    free: Vec<SweepAxis>,
    exclusions: Exclusions,
}

impl MantelQuery {
    pub fn along(template: SweepCoordinate, axis: SweepAxis) -> Self {
        MantelQuery {
            template,
            free: vec![axis],
            exclusions: Exclusions::default(),
        }
    }

    /// Threshold and cutoff both free
    pub fn contour(template: SweepCoordinate) -> Self {
        MantelQuery {
            template,
            free: vec![SweepAxis::SamplesAtLeastThreshold, SweepAxis::MostAbundSeqCutoff],
            exclusions: Exclusions::default(),
        }
    }

    /// Drop excluded cutoffs when the cutoff is a free axis
    pub fn with_exclusions(mut self, exclusions: Exclusions) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn matches(&self, coordinate: &SweepCoordinate) -> bool {
        let mut expected = self.template.clone();
        for axis in &self.free {
            axis.project(&mut expected, coordinate);
        }
        expected == *coordinate
    }

    /// Matching entries, minus excluded cutoffs along a free cutoff axis
    fn selects(&self, coordinate: &SweepCoordinate) -> bool {
        if self.free.contains(&SweepAxis::MostAbundSeqCutoff)
            && self
                .exclusions
                .excludes_cutoff(coordinate.most_abund_seq_cutoff.value())
        {
            return false;
        }
        self.matches(coordinate)
    }
}

/// Extra hint when two colliding values differ only in spelling
fn spelling_hint(first: &str, second: &str) -> String {
    let (first, second) = if first <= second { (first, second) } else { (second, first) };
    if first == second {
        String::new()
    } else {
        format!(
            " ('{}' and '{}' are the same number spelled differently; remove one of the two result files)",
            first, second
        )
    }
}

/// Points of a one-parameter series, sorted along the free axis.
///
/// Two entries at the same axis value (e.g. `0` and `0.0`) are an error
/// naming both files and both spellings.
pub fn series(entries: &[MantelEntry], query: &MantelQuery) -> Result<Vec<(f64, MantelResult)>> {
    let axis = match query.free.as_slice() {
        [axis] => *axis,
        _ => bail!("A series needs exactly one free axis"),
    };

    let mut points: Vec<(f64, &MantelEntry)> = entries
        .iter()
        .filter(|e| query.selects(&e.coordinate))
        .map(|e| (axis.value(&e.coordinate), e))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    for pair in points.windows(2) {
        if pair[0].0 == pair[1].0 {
            bail!(
                "Two Mantel results at {} = {}: {} and {}{}",
                axis.label(),
                pair[0].0,
                pair[0].1.file_name,
                pair[1].1.file_name,
                spelling_hint(
                    &axis.spelling(&pair[0].1.coordinate),
                    &axis.spelling(&pair[1].1.coordinate)
                )
            );
        }
    }

    Ok(points.into_iter().map(|(x, e)| (x, e.result)).collect())
}

/// Threshold × cutoff grid of correlation coefficients, without the
/// excluded cutoff columns
pub fn mantel_grid(
    entries: &[MantelEntry],
    template: &SweepCoordinate,
    exclusions: &Exclusions,
) -> Result<Grid> {
    let query = MantelQuery::contour(template.clone()).with_exclusions(exclusions.clone());
    let selected: Vec<&MantelEntry> = entries
        .iter()
        .filter(|e| query.selects(&e.coordinate))
        .collect();

    let mut seen: HashMap<GridKey, &MantelEntry> = HashMap::with_capacity(selected.len());
    for entry in &selected {
        let c = &entry.coordinate;
        let key = GridKey::new(
            c.samples_at_least_threshold.value(),
            c.most_abund_seq_cutoff.value(),
        );
        if let Some(previous) = seen.insert(key, entry) {
            let p = &previous.coordinate;
            bail!(
                "Two Mantel results at threshold {}, cutoff {}: {} and {}{}{}",
                p.samples_at_least_threshold.as_str(),
                p.most_abund_seq_cutoff.as_str(),
                previous.file_name,
                entry.file_name,
                spelling_hint(
                    p.samples_at_least_threshold.as_str(),
                    c.samples_at_least_threshold.as_str()
                ),
                spelling_hint(p.most_abund_seq_cutoff.as_str(), c.most_abund_seq_cutoff.as_str())
            );
        }
    }

    let records: Vec<ResultRecord> = selected
        .iter()
        .map(|e| {
            ResultRecord::for_coordinate(
                &e.coordinate,
                e.result.coefficient,
                format!("{}", e.result.p_value),
            )
        })
        .collect();
    Grid::assemble_with(&records, exclusions).context("Inconsistent Mantel results for contour")
}

fn default_genera() -> Vec<String> {
    vec!["Pocillopora".to_string(), "Porites".to_string()]
}

fn default_distance_methods() -> Vec<DistanceMethod> {
    vec![DistanceMethod::Unifrac, DistanceMethod::BrayCurtis]
}

fn default_normalisation_methods() -> Vec<NormalisationMethod> {
    vec![NormalisationMethod::Pwr, NormalisationMethod::Rai]
}

pub fn default_normalisation_abundance() -> BTreeMap<DistanceMethod, u32> {
    BTreeMap::from([(DistanceMethod::Unifrac, 1000), (DistanceMethod::BrayCurtis, 10000)])
}

fn default_fixed_value() -> SweepValue {
    SweepValue::from(0u32)
}

fn default_min_distinct_seqs() -> u32 {
    3
}

/// Which Mantel series make up the three-row figure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MantelSettings {
    #[serde(default = "default_genera")]
    pub genera: Vec<String>,
    #[serde(default = "default_distance_methods")]
    pub distance_methods: Vec<DistanceMethod>,
    #[serde(default = "default_normalisation_methods")]
    pub normalisation_methods: Vec<NormalisationMethod>,
    /// Normalisation depth used for rows 2 and 3
    #[serde(default = "default_normalisation_abundance")]
    pub normalisation_abundance: BTreeMap<DistanceMethod, u32>,
    /// Threshold held fixed where it is not swept
    #[serde(default = "default_fixed_value")]
    pub fixed_threshold: SweepValue,
    /// Cutoff held fixed where it is not swept
    #[serde(default = "default_fixed_value")]
    pub fixed_cutoff: SweepValue,
    #[serde(default = "default_min_distinct_seqs")]
    pub min_distinct_seqs: u32,
    #[serde(default)]
    pub snp_only: bool,
    /// Cutoffs left out of the cutoff series and the contours
    #[serde(default)]
    pub excluded_cutoffs: Vec<f64>,
}

impl Default for MantelSettings {
    fn default() -> Self {
        MantelSettings {
            genera: default_genera(),
            distance_methods: default_distance_methods(),
            normalisation_methods: default_normalisation_methods(),
            normalisation_abundance: default_normalisation_abundance(),
            fixed_threshold: default_fixed_value(),
            fixed_cutoff: default_fixed_value(),
            min_distinct_seqs: default_min_distinct_seqs(),
            snp_only: false,
            excluded_cutoffs: Vec::new(),
        }
    }
}

impl MantelSettings {
    fn exclusions(&self) -> Exclusions {
        Exclusions::new(self.excluded_cutoffs.iter().copied())
    }

    fn normalisation_for(&self, method: DistanceMethod) -> u32 {
        self.normalisation_abundance
            .get(&method)
            .copied()
            .unwrap_or(match method {
                DistanceMethod::Unifrac => 1000,
                DistanceMethod::BrayCurtis => 10000,
            })
    }

    fn template(&self, genus: &str, method: DistanceMethod) -> SweepCoordinate {
        SweepCoordinate::new(genus, method)
            .with_only_snp_samples(self.snp_only)
            .with_threshold(self.fixed_threshold.clone())
            .with_cutoff(self.fixed_cutoff.clone())
            .with_min_distinct_seqs(self.min_distinct_seqs)
    }
}

/// One line of a line panel
#[derive(Debug, Clone)]
pub struct SeriesLine {
    pub label: String,
    /// Position of the genus in the configured genera (line colour)
    pub genus_index: usize,
    pub dashed: bool,
    pub points: Vec<(f64, MantelResult)>,
}

#[derive(Debug, Clone)]
pub struct LinePanel {
    pub title: String,
    pub axis: SweepAxis,
    pub lines: Vec<SeriesLine>,
}

#[derive(Debug, Clone)]
pub struct ContourPanel {
    pub title: String,
    pub grid: Grid,
}

#[derive(Debug, Clone)]
pub enum Panel {
    Line(LinePanel),
    Contour(ContourPanel),
}

/// Three rows of panels: normalisation, threshold/cutoff lines, contours
#[derive(Debug, Clone)]
pub struct MantelLayout {
    pub rows: Vec<Vec<Panel>>,
}

impl MantelLayout {
    pub fn build(entries: &[MantelEntry], settings: &MantelSettings) -> Result<Self> {
        let rows = vec![
            Self::normalisation_row(entries, settings)?,
            Self::filter_row(entries, settings)?,
            Self::contour_row(entries, settings)?,
        ];
        Ok(MantelLayout { rows })
    }

    pub fn panel_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    fn line(
        entries: &[MantelEntry],
        query: MantelQuery,
        label: String,
        genus_index: usize,
        dashed: bool,
    ) -> Result<Option<SeriesLine>> {
        let points = series(entries, &query).with_context(|| format!("Series {}", label))?;
        if points.is_empty() {
            log::debug!("No Mantel results for series {}", label);
            return Ok(None);
        }
        Ok(Some(SeriesLine {
            label,
            genus_index,
            dashed,
            points,
        }))
    }

    /// Row 1: normalisation depth by distance method (rai) and by
    /// normalisation method (braycurtis)
    fn normalisation_row(entries: &[MantelEntry], settings: &MantelSettings) -> Result<Vec<Panel>> {
        let axis = SweepAxis::NormalisationAbundance;
        let mut by_distance = Vec::new();
        let mut by_normalisation = Vec::new();

        for (g, genus) in settings.genera.iter().enumerate() {
            for &method in &settings.distance_methods {
                let template = settings
                    .template(genus, method)
                    .with_normalisation(0, NormalisationMethod::Rai);
                let label = format!("{} {} rai", genus, method);
                by_distance.extend(Self::line(
                    entries,
                    MantelQuery::along(template, axis),
                    label,
                    g,
                    method == DistanceMethod::Unifrac,
                )?);
            }
            for &norm in &settings.normalisation_methods {
                let template = settings
                    .template(genus, DistanceMethod::BrayCurtis)
                    .with_normalisation(0, norm);
                let label = format!("{} braycurtis {}", genus, norm);
                by_normalisation.extend(Self::line(
                    entries,
                    MantelQuery::along(template, axis),
                    label,
                    g,
                    norm == NormalisationMethod::Pwr,
                )?);
            }
        }

        Ok(vec![
            Panel::Line(LinePanel {
                title: "dist_method".to_string(),
                axis,
                lines: by_distance,
            }),
            Panel::Line(LinePanel {
                title: "norm_method".to_string(),
                axis,
                lines: by_normalisation,
            }),
        ])
    }

    /// Row 2: threshold and cutoff, pwr at the per-method depth
    fn filter_row(entries: &[MantelEntry], settings: &MantelSettings) -> Result<Vec<Panel>> {
        let mut panels = Vec::new();
        for (axis, title) in [
            (SweepAxis::SamplesAtLeastThreshold, "samples_at_least_threshold"),
            (SweepAxis::MostAbundSeqCutoff, "most_abund_seq_cutoff"),
        ] {
            let mut lines = Vec::new();
            for (g, genus) in settings.genera.iter().enumerate() {
                for &method in &settings.distance_methods {
                    let template = settings.template(genus, method).with_normalisation(
                        settings.normalisation_for(method),
                        NormalisationMethod::Pwr,
                    );
                    let label = format!("{} {} pwr", genus, method);
                    let query =
                        MantelQuery::along(template, axis).with_exclusions(settings.exclusions());
                    lines.extend(Self::line(
                        entries,
                        query,
                        label,
                        g,
                        method == DistanceMethod::Unifrac,
                    )?);
                }
            }
            panels.push(Panel::Line(LinePanel {
                title: title.to_string(),
                axis,
                lines,
            }));
        }
        Ok(panels)
    }

    /// Row 3: threshold × cutoff contour per genus and distance method
    fn contour_row(entries: &[MantelEntry], settings: &MantelSettings) -> Result<Vec<Panel>> {
        let exclusions = settings.exclusions();
        let mut panels = Vec::new();
        for genus in &settings.genera {
            for &method in &settings.distance_methods {
                let template = settings.template(genus, method).with_normalisation(
                    settings.normalisation_for(method),
                    NormalisationMethod::Pwr,
                );
                let grid = mantel_grid(entries, &template, &exclusions)
                    .with_context(|| format!("{} {}", genus, method))?;
                if grid.is_empty() {
                    log::debug!("No Mantel contour results for {} {}", genus, method);
                    continue;
                }
                panels.push(Panel::Contour(ContourPanel {
                    title: format!("{} {}", genus, method),
                    grid,
                }));
            }
        }
        Ok(panels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::MANTEL_SUFFIX;

    fn write(dir: &Path, unique: &str, content: &str) {
        std::fs::write(dir.join(format!("{}{}", unique, MANTEL_SUFFIX)), content).unwrap();
    }

    fn unique(genus: &str, dm: &str, abund: u32, nm: &str, thresh: &str, cutoff: &str) -> String {
        format!(
            "{}_True_True_True_False_biallelic_{}_dist_{}_{}_False_{}_{}_3",
            genus, dm, abund, nm, thresh, cutoff
        )
    }

    #[test]
    fn test_parse_mantel_line() {
        let r = parse_mantel_line("0.41\t0.001\n").unwrap();
        assert_eq!(r.coefficient, 0.41);
        assert_eq!(r.p_value, 0.001);
        assert!(parse_mantel_line("0.41,0.001").is_err());
        assert!(parse_mantel_line("x\t0.1").is_err());
    }

    #[test]
    fn test_scan_skips_unrelated_and_undecodable() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), &unique("Porites", "braycurtis", 1000, "rai", "0", "0"), "0.3\t0.01");
        write(dir.path(), "garbage_name", "0.3\t0.01");
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let entries = scan_mantel_results(dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].coordinate.normalisation_abundance, 1000);
    }

    #[test]
    fn test_scan_malformed_content_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), &unique("Porites", "braycurtis", 1000, "rai", "0", "0"), "oops");
        assert!(scan_mantel_results(dir.path()).is_err());
    }

    #[test]
    fn test_normalisation_series_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for (abund, coef) in [(10000, 0.5), (1000, 0.2), (5000, 0.4)] {
            write(
                dir.path(),
                &unique("Porites", "braycurtis", abund, "rai", "0", "0"),
                &format!("{}\t0.01", coef),
            );
        }
        // Different cutoff: not part of the series
        write(dir.path(), &unique("Porites", "braycurtis", 2000, "rai", "0", "5"), "0.9\t0.01");

        let entries = scan_mantel_results(dir.path()).unwrap();
        let template = SweepCoordinate::new("Porites", DistanceMethod::BrayCurtis)
            .with_normalisation(0, NormalisationMethod::Rai);
        let points = series(
            &entries,
            &MantelQuery::along(template, SweepAxis::NormalisationAbundance),
        )
        .unwrap();
        let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
        assert_eq!(xs, vec![1000.0, 5000.0, 10000.0]);
        assert_eq!(points[2].1.coefficient, 0.5);
    }

    #[test]
    fn test_zero_spellings_collide_in_series() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), &unique("Porites", "braycurtis", 10000, "pwr", "0", "0"), "0.01\t0.9");
        write(dir.path(), &unique("Porites", "braycurtis", 10000, "pwr", "0.0", "0"), "0.02\t0.8");
        let entries = scan_mantel_results(dir.path()).unwrap();
        let template = SweepCoordinate::new("Porites", DistanceMethod::BrayCurtis);
        let err = series(
            &entries,
            &MantelQuery::along(template, SweepAxis::SamplesAtLeastThreshold),
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Two Mantel results"));
        assert!(message.contains("'0' and '0.0' are the same number spelled differently"));
    }

    #[test]
    fn test_zero_spellings_collide_in_grid() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), &unique("Porites", "unifrac", 1000, "pwr", "0.1", "0"), "0.3\t0.05");
        write(dir.path(), &unique("Porites", "unifrac", 1000, "pwr", "0.1", "0.0"), "0.4\t0.05");
        let entries = scan_mantel_results(dir.path()).unwrap();
        let template = SweepCoordinate::new("Porites", DistanceMethod::Unifrac)
            .with_normalisation(1000, NormalisationMethod::Pwr);
        let err = mantel_grid(&entries, &template, &Exclusions::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("cutoff 0"));
        assert!(message.contains("'0' and '0.0' are the same number spelled differently"));

        // Excluding the cutoff drops both spellings
        let grid = mantel_grid(&entries, &template, &Exclusions::new([0.0])).unwrap();
        assert!(grid.is_empty());
    }

    #[test]
    fn test_mantel_grid() {
        let dir = tempfile::tempdir().unwrap();
        for (t, c, coef) in [("0.1", "1", 0.3), ("0.1", "2", 0.35), ("0.2", "1", 0.4)] {
            write(
                dir.path(),
                &unique("Porites", "unifrac", 1000, "pwr", t, c),
                &format!("{}\t0.05", coef),
            );
        }
        let entries = scan_mantel_results(dir.path()).unwrap();
        let template = SweepCoordinate::new("Porites", DistanceMethod::Unifrac)
            .with_normalisation(1000, NormalisationMethod::Pwr);
        let grid = mantel_grid(&entries, &template, &Exclusions::default()).unwrap();
        assert_eq!(grid.rows(), &[0.1, 0.2]);
        assert_eq!(grid.columns(), &[1.0, 2.0]);
        assert_eq!(grid.get(0.2, 1.0), Some(0.4));
        assert_eq!(grid.get(0.2, 2.0), None);
    }

    #[test]
    fn test_excluded_cutoffs_leave_layout() {
        let dir = tempfile::tempdir().unwrap();
        for (t, c) in [("0", "0"), ("0", "2"), ("0", "5"), ("0.1", "2"), ("0.1", "5")] {
            write(
                dir.path(),
                &unique("Porites", "braycurtis", 10000, "pwr", t, c),
                "0.3\t0.01",
            );
        }
        let entries = scan_mantel_results(dir.path()).unwrap();
        let settings = MantelSettings {
            excluded_cutoffs: vec![5.0],
            ..MantelSettings::default()
        };
        let layout = MantelLayout::build(&entries, &settings).unwrap();

        let Panel::Line(cutoffs) = &layout.rows[1][1] else {
            panic!("expected line panel");
        };
        let xs: Vec<f64> = cutoffs.lines[0].points.iter().map(|p| p.0).collect();
        assert_eq!(xs, vec![0.0, 2.0]);

        let Panel::Contour(contour) = &layout.rows[2][0] else {
            panic!("expected contour panel");
        };
        assert_eq!(contour.grid.columns(), &[0.0, 2.0]);
        assert_eq!(contour.grid.filled(), 3);
    }

    #[test]
    fn test_layout_rows() {
        let dir = tempfile::tempdir().unwrap();
        for abund in [1000, 10000] {
            write(
                dir.path(),
                &unique("Porites", "braycurtis", abund, "rai", "0", "0"),
                "0.2\t0.01",
            );
        }
        for t in ["0", "0.1"] {
            write(
                dir.path(),
                &unique("Porites", "braycurtis", 10000, "pwr", t, "0"),
                "0.3\t0.01",
            );
        }
        write(dir.path(), &unique("Porites", "braycurtis", 10000, "pwr", "0.1", "2"), "0.3\t0.01");

        let entries = scan_mantel_results(dir.path()).unwrap();
        let layout = MantelLayout::build(&entries, &MantelSettings::default()).unwrap();
        assert_eq!(layout.rows.len(), 3);

        let Panel::Line(dist) = &layout.rows[0][0] else {
            panic!("expected line panel");
        };
        assert_eq!(dist.lines.len(), 1);
        assert_eq!(dist.lines[0].genus_index, 1);
        assert!(!dist.lines[0].dashed);

        let Panel::Line(thresholds) = &layout.rows[1][0] else {
            panic!("expected line panel");
        };
        assert_eq!(thresholds.lines[0].points.len(), 2);

        // One contour: Porites braycurtis
        assert_eq!(layout.rows[2].len(), 1);
        let Panel::Contour(contour) = &layout.rows[2][0] else {
            panic!("expected contour panel");
        };
        assert_eq!(contour.grid.filled(), 3);
    }
}
