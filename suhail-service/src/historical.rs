//! Historical contract data used to benchmark new offers.
//!
//! The dataset is read once at start-up from the first sheet of a workbook
//! whose header row names the columns below. Column order does not matter.

use std::{collections::BTreeMap, path::Path};

use calamine::{Data, Reader, open_workbook_auto};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub const REGION_COLUMN: &str = "Contract Region";
pub const PACKAGE_COLUMN: &str = "Product Package";
pub const LIVES_COLUMN: &str = "Earned Exposure";
pub const LOSS_RATIO_COLUMN: &str = "Loss Ratio";
pub const PREMIUM_COLUMN: &str = "Average Premium";
pub const CLAIMS_COLUMN: &str = "Claims";

const REQUIRED_COLUMNS: [&str; 6] = [
    REGION_COLUMN,
    PACKAGE_COLUMN,
    LIVES_COLUMN,
    LOSS_RATIO_COLUMN,
    PREMIUM_COLUMN,
    CLAIMS_COLUMN,
];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open workbook: {0}")]
    Open(String),
    #[error("workbook has no sheets")]
    NoSheets,
    #[error("Missing required columns: {}. Available columns: {}", .missing.join(", "), .available.join(", "))]
    MissingColumns {
        missing: Vec<String>,
        available: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalRecord {
    pub region: String,
    pub package: String,
    /// Earned exposure, in lives
    pub lives: f64,
    pub loss_ratio: f64,
    pub premium: f64,
    pub claims: f64,
}

/// Averages over a slice of records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Benchmark {
    pub lives: f64,
    pub loss_ratio: f64,
    pub premium: f64,
    /// Total claims over total lives, not a mean of per-row ratios
    pub claims_per_life: f64,
}

impl Benchmark {
    /// `None` for an empty slice or one with no earned exposure.
    pub fn from_records(records: &[&HistoricalRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        let count = records.len() as f64;
        let total_lives: f64 = records.iter().map(|r| r.lives).sum();
        if total_lives <= 0.0 {
            return None;
        }
        let total_claims: f64 = records.iter().map(|r| r.claims).sum();

        Some(Self {
            lives: total_lives / count,
            loss_ratio: records.iter().map(|r| r.loss_ratio).sum::<f64>() / count,
            premium: records.iter().map(|r| r.premium).sum::<f64>() / count,
            claims_per_life: total_claims / total_lives,
        })
    }
}

/// Aggregates for one region/package pair.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentStats {
    pub region: String,
    pub package: String,
    pub contracts: usize,
    pub total_lives: f64,
    pub avg_loss_ratio: f64,
    pub avg_premium: f64,
    pub claims_per_life: f64,
}

#[derive(Debug, Clone, Default)]
pub struct HistoricalDataset {
    records: Vec<HistoricalRecord>,
}

impl HistoricalDataset {
    pub fn new(records: Vec<HistoricalRecord>) -> Self {
        Self { records }
    }

    /// Read the first sheet of a workbook (`.xlsx`, `.xls`, `.ods`).
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let mut workbook = open_workbook_auto(path).map_err(|e| DatasetError::Open(e.to_string()))?;
        let sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(DatasetError::NoSheets)?;
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| DatasetError::Open(e.to_string()))?;

        let mut rows = range.rows();
        let header: Vec<String> = rows
            .next()
            .map(|row| row.iter().map(cell_to_string).collect())
            .unwrap_or_default();

        let dataset = Self::from_table(&header, rows)?;
        info!(path = %path.display(), rows = dataset.len(), "Historical dataset loaded");
        Ok(dataset)
    }

    /// Like [`load`](Self::load), but a missing file gives an empty dataset.
    pub fn load_or_empty(path: &Path) -> Result<Self, DatasetError> {
        if !path.exists() {
            warn!(path = %path.display(), "Historical data file not found, offer assessment is unavailable");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Build the dataset from a header row and data rows. Rows with a blank
    /// region/package or an unreadable number are skipped.
    pub fn from_table<'a, I>(header: &[String], rows: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = &'a [Data]>,
    {
        let position = |name: &str| header.iter().position(|h| h.trim() == name);
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| position(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DatasetError::MissingColumns {
                missing,
                available: header.to_vec(),
            });
        }

        // Every required column was found above.
        let column = |name: &str| position(name).unwrap_or_default();
        let (region, package, lives, loss_ratio, premium, claims) = (
            column(REGION_COLUMN),
            column(PACKAGE_COLUMN),
            column(LIVES_COLUMN),
            column(LOSS_RATIO_COLUMN),
            column(PREMIUM_COLUMN),
            column(CLAIMS_COLUMN),
        );

        let mut records = Vec::new();
        for (index, row) in rows.into_iter().enumerate() {
            let text = |i: usize| row.get(i).map(cell_to_string).unwrap_or_default();
            let number = |i: usize| row.get(i).and_then(cell_to_f64);

            let region_name = text(region).trim().to_string();
            let package_name = text(package).trim().to_string();
            if region_name.is_empty() && package_name.is_empty() {
                continue;
            }

            match (number(lives), number(loss_ratio), number(premium), number(claims)) {
                (Some(lives), Some(loss_ratio), Some(premium), Some(claims))
                    if !region_name.is_empty() && !package_name.is_empty() =>
                {
                    records.push(HistoricalRecord {
                        region: region_name,
                        package: package_name,
                        lives,
                        loss_ratio,
                        premium,
                        claims,
                    });
                }
                _ => warn!(row = index + 2, "Skipping unreadable historical row"),
            }
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[HistoricalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows in `region` (case-insensitive) whose package label contains `package`.
    pub fn matching(&self, region: &str, package: &str) -> Vec<&HistoricalRecord> {
        let region = region.trim().to_lowercase();
        let package = package.trim().to_lowercase();
        self.records
            .iter()
            .filter(|r| r.region.to_lowercase() == region)
            .filter(|r| r.package.to_lowercase().contains(&package))
            .collect()
    }

    /// Rows of every region whose package label contains `package`.
    pub fn with_package(&self, package: &str) -> Vec<&HistoricalRecord> {
        let package = package.trim().to_lowercase();
        self.records
            .iter()
            .filter(|r| r.package.to_lowercase().contains(&package))
            .collect()
    }

    /// Distinct regions in order of first appearance.
    pub fn regions(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.region.as_str()))
    }

    /// Distinct package labels in order of first appearance.
    pub fn packages(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.package.as_str()))
    }

    /// Per region/package aggregates, sorted by region then package.
    pub fn segment_stats(&self) -> Vec<SegmentStats> {
        let mut groups: BTreeMap<(&str, &str), Vec<&HistoricalRecord>> = BTreeMap::new();
        for record in &self.records {
            groups
                .entry((record.region.as_str(), record.package.as_str()))
                .or_default()
                .push(record);
        }

        groups
            .into_iter()
            .map(|((region, package), rows)| {
                let count = rows.len() as f64;
                let total_lives: f64 = rows.iter().map(|r| r.lives).sum();
                let total_claims: f64 = rows.iter().map(|r| r.claims).sum();
                SegmentStats {
                    region: region.to_string(),
                    package: package.to_string(),
                    contracts: rows.len(),
                    total_lives,
                    avg_loss_ratio: rows.iter().map(|r| r.loss_ratio).sum::<f64>() / count,
                    avg_premium: rows.iter().map(|r| r.premium).sum::<f64>() / count,
                    claims_per_life: if total_lives > 0.0 {
                        total_claims / total_lives
                    } else {
                        0.0
                    },
                }
            })
            .collect()
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for value in values {
        if !seen.iter().any(|s| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) => format!("{}", f),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR({:?})", e),
        Data::DateTime(dt) => format!("{}", dt),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

fn cell_to_f64(cell: &Data) -> Option<f64> {
    let value = match cell {
        Data::Float(f) => *f,
        Data::Int(n) => *n as f64,
        Data::String(s) => s.trim().replace(',', "").parse().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}
