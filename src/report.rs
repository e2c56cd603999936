//! CSV reports
//!
//! Output names follow the segment: `psi_<segment>`, `max_dpd_flag_<segment>`
//! and `gini_<segment>`. A report with several sheets is written as a
//! directory holding one CSV per sheet. Non-finite numbers are written as
//! empty cells.

use crate::discrimination::{as_percent, DiscriminationReport};
use crate::error::Result;
use crate::performance::{PerformanceBase, PerformanceRow, FORWARD_MONTHS};
use crate::psi::{PsiBinRow, PsiReport, PsiResult};
use crate::segment::Segment;
use csv::{Reader, Writer};
use std::fs;
use std::path::{Path, PathBuf};

/// Longest sheet name a spreadsheet accepts
pub const MAX_SHEET_NAME: usize = 31;

/// Name of the combined performance sheet
pub const ALL_SHEET: &str = "All";

/// A number as a cell, empty when NaN or infinite
pub fn float_cell(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        String::new()
    }
}

fn opt_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Spreadsheet-safe sheet name: forbidden characters replaced, at most 31 characters
pub fn sheet_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .take(MAX_SHEET_NAME)
        .collect()
}

/// A directory of CSV sheets
#[derive(Debug, Clone)]
pub struct Workbook {
    dir: PathBuf,
}

impl Workbook {
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn sheet_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", sheet_name(name)))
    }

    pub fn write_sheet<I>(&self, name: &str, header: &[String], rows: I) -> Result<PathBuf>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let path = self.sheet_path(name);
        write_table(&path, header, rows)?;
        Ok(path)
    }
}

fn write_table<I>(path: &Path, header: &[String], rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = Writer::from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn psi_cells(row: &PsiBinRow) -> Vec<String> {
    vec![
        row.pd_group.to_string(),
        row.total.to_string(),
        float_cell(row.actual_pct),
        float_cell(row.expected),
        float_cell(row.log_ratio),
        float_cell(row.index),
    ]
}

const PSI_HEADER: [&str; 6] = ["pd_group", "total", "actual_pct", "expected", "log_ratio", "index"];

/// Write one PSI table
pub fn write_psi_table<P: AsRef<Path>>(path: P, result: &PsiResult) -> Result<()> {
    write_table(
        path.as_ref(),
        &strings(&PSI_HEADER),
        result.bins.iter().map(psi_cells),
    )
}

/// Read a PSI table written by [`write_psi_table`]
pub fn read_psi_table<P: AsRef<Path>>(path: P) -> Result<Vec<PsiBinRow>> {
    let mut reader = Reader::from_path(path)?;
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

/// Write the PSI report. Returns the files written.
pub fn write_psi<P: AsRef<Path>>(
    out_dir: P,
    segment: Segment,
    report: &PsiReport,
) -> Result<Vec<PathBuf>> {
    let stem = format!("psi_{}", segment.file_stem());
    match report {
        PsiReport::Single(result) => {
            fs::create_dir_all(out_dir.as_ref())?;
            let path = out_dir.as_ref().join(format!("{}.csv", stem));
            write_psi_table(&path, result)?;
            Ok(vec![path])
        }
        PsiReport::BySize(by_size) => {
            let book = Workbook::create(out_dir.as_ref().join(stem))?;
            let mut written = Vec::new();
            for (size, result) in by_size {
                let path = book.sheet_path(&format!("PSI_{}", size));
                write_psi_table(&path, result)?;
                written.push(path);
            }
            Ok(written)
        }
    }
}

fn performance_header(columns: &[String], months: &[String]) -> Vec<String> {
    let mut header = Vec::with_capacity(columns.len() + months.len() + 3);
    header.push("Sheet".to_string());
    header.extend(columns.iter().cloned());
    header.extend(months.iter().cloned());
    header.push("Max DPD".to_string());
    header.push("Bad Flag".to_string());
    header
}

fn performance_cells(row: &PerformanceRow, width: usize) -> Vec<String> {
    let mut cells = Vec::with_capacity(width + FORWARD_MONTHS + 3);
    cells.push(row.period.label());
    cells.extend((0..width).map(|i| row.account.carried.get(i).cloned().unwrap_or_default()));
    cells.extend(row.dpd.iter().map(|d| opt_cell(*d)));
    cells.push(opt_cell(row.max_dpd));
    cells.push(row.bad_flag.to_string());
    cells
}

/// Write the Max DPD workbook: one sheet per observation period plus `All`,
/// where the month columns are relabelled M1..M12.
pub fn write_performance<P: AsRef<Path>>(
    out_dir: P,
    segment: Segment,
    base: &PerformanceBase,
) -> Result<PathBuf> {
    let book = Workbook::create(
        out_dir
            .as_ref()
            .join(format!("max_dpd_flag_{}", segment.file_stem())),
    )?;
    let width = base.columns.len();

    for table in &base.tables {
        let months: Vec<String> = table.months.iter().map(|m| m.label()).collect();
        book.write_sheet(
            &table.period.label(),
            &performance_header(&base.columns, &months),
            table.rows.iter().map(|r| performance_cells(r, width)),
        )?;
    }

    let ordinals: Vec<String> = (1..=FORWARD_MONTHS).map(|i| format!("M{}", i)).collect();
    book.write_sheet(
        ALL_SHEET,
        &performance_header(&base.columns, &ordinals),
        base.rows().map(|r| performance_cells(r, width)),
    )?;

    Ok(book.dir().to_path_buf())
}

/// Write the per-group Gini table and a summary of the scalar metrics
pub fn write_gini<P: AsRef<Path>>(
    out_dir: P,
    segment: Segment,
    report: &DiscriminationReport,
) -> Result<PathBuf> {
    fs::create_dir_all(out_dir.as_ref())?;
    let stem = format!("gini_{}", segment.file_stem());
    let path = out_dir.as_ref().join(format!("{}.csv", stem));

    let header = strings(&[
        "Group", "bad", "good", "total", "bad_rate", "prop_bad", "prop_good", "prop_total",
        "cum_bad", "cum_good", "cum_total", "ks", "roc",
    ]);
    let rows = report.bins.iter().map(|b| {
        vec![
            b.pd_group.to_string(),
            b.bad.to_string(),
            b.good.to_string(),
            b.total.to_string(),
            b.bad_rate.map(float_cell).unwrap_or_default(),
            float_cell(b.prop_bad),
            float_cell(b.prop_good),
            float_cell(b.prop_total),
            float_cell(b.cum_bad),
            float_cell(b.cum_good),
            float_cell(b.cum_total),
            float_cell(b.ks),
            float_cell(b.roc),
        ]
    });
    write_table(&path, &header, rows)?;

    let summary = out_dir.as_ref().join(format!("{}_summary.csv", stem));
    let metrics = [("KS", report.ks), ("AUROC", report.auroc), ("Gini", report.gini)];
    write_table(
        &summary,
        &strings(&["metric", "value", "percent"]),
        metrics
            .iter()
            .map(|(name, v)| vec![name.to_string(), float_cell(*v), float_cell(as_percent(*v))]),
    )?;

    Ok(path)
}
