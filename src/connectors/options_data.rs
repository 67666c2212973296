// src/connectors/options_data.rs
//
// Historical option-chain dataset loaded from a directory of per-sheet CSV files.
//
// Each `<sheet>.csv` holds one expiry:
//
//   date,T,S,r,540,550,560
//   2010-01-04,60,552.3,0.15,18.2,11.9,6.8
//
// `T` is in trading days, `r` in percent. Strike columns are named by the
// integer strike; an empty cell is a missing quote.

use crate::models::{HedgeError, OptionSeries, QuoteRow};
use crate::traits::OptionsDataSource;
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Dataset used when the requested directory does not exist.
pub const DEFAULT_DATA_DIR: &str = "data/isx2010C";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Could not find {requested:?} nor the default dataset {fallback:?}")]
    NotFound { requested: PathBuf, fallback: PathBuf },
    #[error("No sheet files (*.csv) in {0:?}")]
    NoSheets(PathBuf),
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse CSV {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path:?} has no {column:?} column")]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("{path:?}, line {line}: {message}")]
    InvalidCell {
        path: PathBuf,
        line: u64,
        message: String,
    },
}

/// In-memory option-chain dataset with a chronological sheet order.
#[derive(Debug, Clone, Default)]
pub struct OptionsData {
    /// Sheet names, chronological by first quote date
    order: Vec<String>,
    series: HashMap<String, OptionSeries>,
    /// Sheet -> next sheet; the last sheet is its own successor
    successors: HashMap<String, String>,
}

impl OptionsData {
    /// Loads every `*.csv` file of `dir` as one sheet.
    /// Falls back to [`DEFAULT_DATA_DIR`] with a warning when `dir` does not exist.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, DataError> {
        let requested = dir.as_ref();
        let dir = if requested.is_dir() {
            requested.to_path_buf()
        } else {
            let fallback = PathBuf::from(DEFAULT_DATA_DIR);
            if !fallback.is_dir() {
                return Err(DataError::NotFound {
                    requested: requested.to_path_buf(),
                    fallback,
                });
            }
            warn!(
                "Could not find {:?}; proceeding with {:?}",
                requested, fallback
            );
            fallback
        };

        let entries = std::fs::read_dir(&dir).map_err(|source| DataError::Io {
            path: dir.clone(),
            source,
        })?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| DataError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            let is_csv = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            if is_csv && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(DataError::NoSheets(dir));
        }

        let series = paths
            .iter()
            .map(|path| load_sheet(path))
            .collect::<Result<Vec<_>, _>>()?;

        info!("Loaded {} sheets from {:?}", series.len(), dir);
        Ok(Self::from_series(series))
    }

    /// Builds a dataset from already loaded series.
    pub fn from_series(series: Vec<OptionSeries>) -> Self {
        let mut series = series;
        series.sort_by(|a, b| {
            (a.first_date().is_none(), a.first_date(), &a.name)
                .cmp(&(b.first_date().is_none(), b.first_date(), &b.name))
        });

        let order: Vec<String> = series.iter().map(|s| s.name.clone()).collect();
        let successors = order
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let next = order.get(i + 1).unwrap_or(name);
                (name.clone(), next.clone())
            })
            .collect();

        Self {
            order,
            series: series.into_iter().map(|s| (s.name.clone(), s)).collect(),
            successors,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl OptionsDataSource for OptionsData {
    fn sheet_names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn series(&self, sheet: &str) -> Result<&OptionSeries, HedgeError> {
        self.series
            .get(sheet)
            .ok_or_else(|| HedgeError::UnknownSheet(sheet.to_string()))
    }

    fn next_sheet_name(&self, sheet: &str) -> Result<String, HedgeError> {
        self.successors
            .get(sheet)
            .cloned()
            .ok_or_else(|| HedgeError::UnknownSheet(sheet.to_string()))
    }
}

// =============================================================================
// CSV Parsing
// =============================================================================

struct Columns {
    date: usize,
    days: usize,
    spot: usize,
    rate: usize,
    strikes: Vec<(usize, u32)>,
}

impl Columns {
    fn from_headers(path: &Path, headers: &csv::StringRecord) -> Result<Self, DataError> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| DataError::MissingColumn {
                    path: path.to_path_buf(),
                    column,
                })
        };

        let mut strikes = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            match parse_strike(header) {
                Some(strike) => strikes.push((idx, strike)),
                None if matches!(header, "date" | "T" | "S" | "r") => {}
                None => debug!("{:?}: ignoring column {:?}", path, header),
            }
        }

        Ok(Self {
            date: find("date")?,
            days: find("T")?,
            spot: find("S")?,
            rate: find("r")?,
            strikes,
        })
    }
}

/// Strike columns are named by an integer, possibly written as "550.0".
fn parse_strike(header: &str) -> Option<u32> {
    if let Ok(strike) = header.parse::<u32>() {
        return Some(strike);
    }
    header
        .parse::<f64>()
        .ok()
        .filter(|v| *v > 0.0 && v.fract() == 0.0 && *v <= u32::MAX as f64)
        .map(|v| v as u32)
}

fn load_sheet(path: &Path) -> Result<OptionSeries, DataError> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let csv_err = |source: csv::Error| DataError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    let columns = Columns::from_headers(path, reader.headers().map_err(csv_err)?)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        // Rows with no data at all are padding in the source sheets
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let invalid = |message: String| DataError::InvalidCell {
            path: path.to_path_buf(),
            line,
            message,
        };

        let cell = |idx: usize| record.get(idx).unwrap_or("");
        let date = NaiveDate::parse_from_str(cell(columns.date), DATE_FORMAT)
            .map_err(|e| invalid(format!("bad date {:?}: {}", cell(columns.date), e)))?;
        let days = parse_number(cell(columns.days))
            .filter(|v| *v >= 0.0 && v.fract() == 0.0)
            .ok_or_else(|| invalid(format!("bad T {:?}", cell(columns.days))))?;
        let spot = parse_number(cell(columns.spot))
            .ok_or_else(|| invalid(format!("bad S {:?}", cell(columns.spot))))?;
        let rate_pct = parse_number(cell(columns.rate))
            .ok_or_else(|| invalid(format!("bad r {:?}", cell(columns.rate))))?;

        let mut row = QuoteRow::new(date, days as u32, spot, rate_pct / 100.0);
        for &(idx, strike) in &columns.strikes {
            let raw = cell(idx);
            if raw.is_empty() {
                continue;
            }
            let price = parse_number(raw)
                .ok_or_else(|| invalid(format!("bad price {:?} for strike {}", raw, strike)))?;
            row.insert_call(strike, price);
        }
        rows.push(row);
    }

    rows.sort_by_key(|r| r.date);
    debug!("{:?}: {} rows, {} strikes", path, rows.len(), columns.strikes.len());
    Ok(OptionSeries::new(name, rows))
}

fn parse_number(cell: &str) -> Option<f64> {
    if cell.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    cell.parse::<f64>().ok()
}
