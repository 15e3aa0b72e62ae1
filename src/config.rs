//! Deployment tables and per-run options.
//!
//! Every heuristic in the pipeline (header aliases, synonym tables, ledger
//! layout) reads its vocabulary from a [`DeploymentProfile`], so a deployment
//! can extend categories or header spellings through a JSON file without
//! touching the matching algorithms.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, Result};
use crate::model::{LogicalColumn, PeriodKey};

/// Source sheet opened when the caller does not name one.
pub const DEFAULT_SOURCE_SHEET: &str = "VLU 2025";

/// Rule for distributing one row's quantity over several resolved categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CompoundingPolicy {
    /// Divide the quantity evenly across the categories.
    #[default]
    Split,
    /// Attribute the full quantity to the first category only.
    First,
    /// Attribute the full quantity to every category.
    Duplicate,
}

impl From<String> for CompoundingPolicy {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "split" => CompoundingPolicy::Split,
            "first" => CompoundingPolicy::First,
            _ => CompoundingPolicy::Duplicate,
        }
    }
}

impl From<CompoundingPolicy> for String {
    fn from(policy: CompoundingPolicy) -> Self {
        match policy {
            CompoundingPolicy::Split => "split",
            CompoundingPolicy::First => "first",
            CompoundingPolicy::Duplicate => "duplicate",
        }
        .to_string()
    }
}

/// Synonym table entry: one canonical name or an ordered list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SynonymTarget {
    One(String),
    Many(Vec<String>),
}

impl SynonymTarget {
    pub fn names(&self) -> Vec<&str> {
        match self {
            SynonymTarget::One(name) => vec![name.as_str()],
            SynonymTarget::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// A category column of the master ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerColumn {
    pub name: String,
    /// Spreadsheet column letter, e.g. `C`.
    pub column: String,
}

/// Deployment-wide configuration tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentProfile {
    /// Accepted header spellings per logical column, uppercase.
    pub header_aliases: BTreeMap<LogicalColumn, Vec<String>>,
    /// Static column letters used when no header row can be found.
    pub fallback_columns: BTreeMap<LogicalColumn, String>,
    /// Ordered canonical category set.
    pub categories: Vec<String>,
    /// Raw nomination spelling → canonical name(s).
    pub synonyms: BTreeMap<String, SynonymTarget>,
    /// Ledger column holding the period labels.
    pub ledger_period_column: String,
    pub ledger_columns: Vec<LedgerColumn>,
    /// Ledger sheet per target year; unknown years use the year itself.
    pub ledger_sheets: BTreeMap<i32, String>,
    pub compounding: CompoundingPolicy,
    /// Apply the period found at the top of the block to every row in it.
    pub force_header_period: bool,
    /// Value written when clearing a ledger cell; `None` leaves it empty.
    pub clear_value: Option<f64>,
}

impl Default for DeploymentProfile {
    fn default() -> Self {
        let aliases: [(LogicalColumn, &[&str]); 6] = [
            (LogicalColumn::RowNumber, &["NO", "NO."]),
            (LogicalColumn::Month, &["MONTH", "MON"]),
            (LogicalColumn::Status, &["STATUS"]),
            (
                LogicalColumn::ActualQuantity,
                &[
                    "QTY ACTUAL LOADED",
                    "ACTUAL LOADED",
                    "QTY ACTUAL LOADING",
                    "ACTUAL LOADING",
                ],
            ),
            (
                LogicalColumn::Facility,
                &["LOADING FACILITIES", "LOADING FACILITY"],
            ),
            (
                LogicalColumn::Nomination,
                &["FLF NOMINATE", "FLF/FC NOMINATE", "FLF FC NOMINATE"],
            ),
        ];
        let header_aliases = aliases
            .into_iter()
            .map(|(column, names)| (column, names.iter().map(|s| s.to_string()).collect()))
            .collect();

        let fallback_columns = [
            (LogicalColumn::RowNumber, "B"),
            (LogicalColumn::Month, "C"),
            (LogicalColumn::Status, "P"),
            (LogicalColumn::ActualQuantity, "BN"),
            (LogicalColumn::Facility, "BP"),
            (LogicalColumn::Nomination, "BQ"),
        ]
        .into_iter()
        .map(|(column, letter)| (column, letter.to_string()))
        .collect();

        let categories: Vec<String> = [
            "Apollo",
            "Zeus",
            "Mara",
            "August",
            "Eagle",
            "WHS",
            "Bulk Java",
            "Ratu Dewata",
            "Labor",
            "Green Calypso",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let one = |name: &str| SynonymTarget::One(name.to_string());
        let zeus_apollo = || SynonymTarget::Many(vec!["Zeus".into(), "Apollo".into()]);
        let synonyms = [
            ("WHS ISKANDAR", one("WHS")),
            ("WHS-ISKANDAR", one("WHS")),
            ("WHS/ISKANDAR", one("WHS")),
            ("WHSISKANDAR", one("WHS")),
            ("ZEUS-APOLLO", zeus_apollo()),
            ("ZEUS/APOLLO", zeus_apollo()),
            ("APOLLO-ZEUS", zeus_apollo()),
            ("APOLLO/ZEUS", zeus_apollo()),
            ("ZEUSAPOLLO", zeus_apollo()),
            ("APOLLOZEUS", zeus_apollo()),
            ("BULKJAVA", one("Bulk Java")),
            ("RATUDEWATA", one("Ratu Dewata")),
            ("GREENCALYPSO", one("Green Calypso")),
            ("MUTIARA JAWA", one("Eagle")),
        ]
        .into_iter()
        .map(|(raw, target)| (raw.to_string(), target))
        .collect();

        let ledger_columns = [
            ("Apollo", "C"),
            ("Zeus", "D"),
            ("Mara", "E"),
            ("August", "F"),
            ("Eagle", "G"),
            ("WHS", "H"),
            ("Bulk Java", "I"),
            ("Ratu Dewata", "J"),
            ("Labor", "K"),
            ("Green Calypso", "L"),
            ("FC Sumber", "M"),
        ]
        .into_iter()
        .map(|(name, column)| LedgerColumn {
            name: name.to_string(),
            column: column.to_string(),
        })
        .collect();

        let ledger_sheets = [2023, 2024, 2025]
            .into_iter()
            .map(|year| (year, year.to_string()))
            .collect();

        Self {
            header_aliases,
            fallback_columns,
            categories,
            synonyms,
            ledger_period_column: "B".to_string(),
            ledger_columns,
            ledger_sheets,
            compounding: CompoundingPolicy::Split,
            force_header_period: true,
            clear_value: None,
        }
    }
}

impl DeploymentProfile {
    /// Loads a JSON profile; fields absent from the file keep their defaults.
    pub fn from_json_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReconcileError::MissingInput(path.to_path_buf()));
        }
        let data = fs::read_to_string(path)?;
        let profile: DeploymentProfile = serde_json::from_str(&data)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Checks that every column letter parses and the category set is usable.
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(ReconcileError::InvalidProfile(
                "category set is empty".to_string(),
            ));
        }
        let letters = self
            .fallback_columns
            .values()
            .chain(std::iter::once(&self.ledger_period_column))
            .chain(self.ledger_columns.iter().map(|column| &column.column));
        for letter in letters {
            if column_index(letter).is_none() {
                return Err(ReconcileError::InvalidProfile(format!(
                    "invalid column letter '{letter}'"
                )));
            }
        }
        Ok(())
    }

    /// Name of the ledger sheet holding the given year.
    pub fn ledger_sheet_name(&self, year: i32) -> String {
        self.ledger_sheets
            .get(&year)
            .cloned()
            .unwrap_or_else(|| year.to_string())
    }
}

/// Converts a column letter such as `BN` into a zero-based index.
pub fn column_index(letters: &str) -> Option<usize> {
    let letters = letters.trim();
    if letters.is_empty() {
        return None;
    }
    letters
        .chars()
        .try_fold(0usize, |acc, ch| {
            if !ch.is_ascii_alphabetic() {
                return None;
            }
            let digit = ch.to_ascii_uppercase() as usize - 'A' as usize + 1;
            acc.checked_mul(26)?.checked_add(digit)
        })
        .map(|one_based| one_based - 1)
}

/// Immutable configuration for a single invocation of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub master_path: PathBuf,
    pub source_path: PathBuf,
    pub source_sheet: String,
    pub target_year: i32,
    /// One-based first row to process.
    pub start_row: usize,
    /// Number of rows to process; zero runs to the end of the sheet.
    pub row_count: usize,
    pub only_completed: bool,
    pub dry_run: bool,
    pub clear_before_write: bool,
    /// Manual period forced onto every row, ahead of any header period.
    pub period_override: Option<PeriodKey>,
}

impl RunOptions {
    pub fn new(
        master_path: impl Into<PathBuf>,
        source_path: impl Into<PathBuf>,
        source_sheet: impl Into<String>,
        target_year: i32,
    ) -> Self {
        Self {
            master_path: master_path.into(),
            source_path: source_path.into(),
            source_sheet: source_sheet.into(),
            target_year,
            start_row: 1,
            row_count: 0,
            only_completed: false,
            dry_run: false,
            clear_before_write: true,
            period_override: None,
        }
    }

    /// Plain-text block describing the options, shown before a run starts.
    pub fn summary(&self) -> String {
        let yes_no = |flag: bool| if flag { "Yes" } else { "No" };
        [
            format!("Master        : {}", self.master_path.display()),
            format!("Barge         : {}", self.source_path.display()),
            format!("Year          : {}", self.target_year),
            format!("Barge Sheet   : {}", self.source_sheet),
            format!("Start Row     : {}", self.start_row),
            format!("Row Count     : {}", self.row_count),
            format!("Only Completed: {}", yes_no(self.only_completed)),
            format!("Dry Run       : {}", yes_no(self.dry_run)),
        ]
        .join("\n")
    }
}
