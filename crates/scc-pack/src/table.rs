//! In-memory input tables and their CSV readers.
//!
//! Columns are always resolved by name. Feature columns are recognised by the
//! exact pattern `<prefix>_<integer>` and ordered by that integer.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;

use scc_core::{
    Contributions, CouplingRecord, CouplingType, ErrorInfo, PairId, PathDescriptor, SccError,
};
use serde::{Deserialize, Serialize};

/// Declared shape of a node or edge feature block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    /// Maximum number of items (atoms or edges) per molecule.
    pub max_items: usize,
    /// Number of feature values per item.
    pub stride: usize,
}

impl FeatureLayout {
    /// Creates a layout.
    pub const fn new(max_items: usize, stride: usize) -> Self {
        Self { max_items, stride }
    }

    /// Padded row width, `max_items * stride`.
    pub fn width(&self) -> usize {
        self.max_items * self.stride
    }
}

/// One molecule row of a node or edge table.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// Molecule key.
    pub molecule_name: String,
    /// True number of items described by `values`.
    pub count: usize,
    /// Padded feature values.
    pub values: Vec<f32>,
}

/// Per-molecule feature table (`node_*` or `edge_*` columns).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    prefix: String,
    width: usize,
    rows: Vec<FeatureRow>,
    index: HashMap<String, usize>,
}

impl FeatureTable {
    /// Creates an empty table whose rows hold `width` values.
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            width,
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Appends a row, rejecting duplicate molecules and wrong widths.
    pub fn push(&mut self, row: FeatureRow) -> Result<(), SccError> {
        if row.values.len() != self.width {
            return Err(SccError::shape(
                "feature-row-width",
                format!("{} row has the wrong number of values", self.prefix),
                self.width,
                row.values.len(),
            )
            .with_context("molecule", &row.molecule_name));
        }
        if self.index.contains_key(&row.molecule_name) {
            return Err(SccError::Schema(
                ErrorInfo::new("feature-duplicate-molecule", "molecule appears twice")
                    .with_context("table", &self.prefix)
                    .with_context("molecule", &row.molecule_name),
            ));
        }
        self.index.insert(row.molecule_name.clone(), self.rows.len());
        self.rows.push(row);
        Ok(())
    }

    /// Column prefix, e.g. `node`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Values per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of molecules.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no molecules.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in input order.
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Looks up the row of `molecule`.
    pub fn get(&self, molecule: &str) -> Option<&FeatureRow> {
        self.index.get(molecule).map(|&idx| &self.rows[idx])
    }

    /// Keeps only the molecules in `keep`, preserving order.
    pub fn retain_molecules(&self, keep: &HashSet<String>) -> Self {
        let mut out = Self::new(self.prefix.clone(), self.width);
        for row in self.rows.iter().filter(|row| keep.contains(&row.molecule_name)) {
            out.index.insert(row.molecule_name.clone(), out.rows.len());
            out.rows.push(row.clone());
        }
        out
    }

    /// Checks the table against the declared layout.
    pub fn check_layout(&self, layout: &FeatureLayout) -> Result<(), SccError> {
        if self.width != layout.width() {
            return Err(SccError::shape(
                "feature-width",
                format!("{} table width differs from the declared layout", self.prefix),
                layout.width(),
                self.width,
            ));
        }
        if let Some(row) = self.rows.iter().find(|row| row.count > layout.max_items) {
            return Err(SccError::shape(
                "feature-count",
                format!("{} count exceeds the layout maximum", self.prefix),
                layout.max_items,
                row.count,
            )
            .with_context("molecule", &row.molecule_name));
        }
        Ok(())
    }

    /// Reads a table with columns `molecule_name`, `count_column` and
    /// `<prefix>_0 .. <prefix>_{W-1}`. Empty feature cells read as 0.0.
    pub fn read_csv<R: Read>(
        reader: R,
        prefix: &str,
        count_column: &str,
    ) -> Result<Self, SccError> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|err| csv_error("feature-header", err))?
            .clone();
        let columns = ColumnIndex::new(&headers, prefix);
        let name_col = columns.require("molecule_name")?;
        let count_col = columns.require(count_column)?;
        let feature_cols = columns.numbered(prefix)?;

        let mut table = Self::new(prefix, feature_cols.len());
        for (line, record) in rdr.records().enumerate() {
            let record = record.map_err(|err| csv_error("feature-row", err))?;
            let cell = Cell::new(&record, prefix, line + 2);
            let molecule_name = cell.text(name_col, "molecule_name")?.to_string();
            let count = cell.index(count_col, count_column)? as usize;
            let mut values = Vec::with_capacity(feature_cols.len());
            for (col, name) in &feature_cols {
                values.push(cell.float(*col, name)?.unwrap_or(0.0) as f32);
            }
            table.push(FeatureRow {
                molecule_name,
                count,
                values,
            })?;
        }
        Ok(table)
    }
}

/// Flat per-pair coupling table.
#[derive(Debug, Clone, PartialEq)]
pub struct CouplingTable {
    records: Vec<CouplingRecord>,
    has_targets: bool,
}

const TARGET_COLUMNS: [&str; 5] = ["scalar_coupling_constant", "fc", "sd", "pso", "dso"];

impl CouplingTable {
    /// Wraps already parsed records.
    pub fn new(records: Vec<CouplingRecord>, has_targets: bool) -> Self {
        Self {
            records,
            has_targets,
        }
    }

    /// Records in input order.
    pub fn records(&self) -> &[CouplingRecord] {
        &self.records
    }

    /// Consumes the table.
    pub fn into_records(self) -> Vec<CouplingRecord> {
        self.records
    }

    /// True when target and contribution columns were read.
    pub fn has_targets(&self) -> bool {
        self.has_targets
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the table holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct molecules, sorted.
    pub fn molecules(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .records
            .iter()
            .map(|record| record.molecule_name.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        names.sort();
        names
    }

    /// Splits records by molecule membership: `(inside, outside)`.
    pub fn partition(&self, molecules: &HashSet<String>) -> (Self, Self) {
        let (inside, outside): (Vec<_>, Vec<_>) = self
            .records
            .iter()
            .cloned()
            .partition(|record| molecules.contains(&record.molecule_name));
        (
            Self::new(inside, self.has_targets),
            Self::new(outside, self.has_targets),
        )
    }

    /// Number of pairs per coupling type.
    pub fn type_counts(&self) -> BTreeMap<CouplingType, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.coupling_type).or_insert(0) += 1;
        }
        counts
    }

    /// Reads a coupling table. The type column may be called `type` or
    /// `coupling_type`. With `require_targets`, the target and contribution
    /// columns must be present; otherwise missing ones read as 0.0.
    pub fn read_csv<R: Read>(reader: R, require_targets: bool) -> Result<Self, SccError> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|err| csv_error("coupling-header", err))?
            .clone();
        let columns = ColumnIndex::new(&headers, "coupling");
        let name_col = columns.require("molecule_name")?;
        let a0_col = columns.require("atom_index_0")?;
        let a1_col = columns.require("atom_index_1")?;
        let type_col = columns.require_any(&["type", "coupling_type"])?;
        let id_col = columns.require("id")?;
        let path_index: Vec<usize> = (0..4)
            .map(|i| columns.require(&format!("path_index_{i}")))
            .collect::<Result<_, _>>()?;
        let path_btype: Vec<usize> = (0..3)
            .map(|i| columns.require(&format!("path_btype_{i}")))
            .collect::<Result<_, _>>()?;
        let path_a_num: Vec<usize> = (0..4)
            .map(|i| columns.require(&format!("path_a_num_{i}")))
            .collect::<Result<_, _>>()?;
        let target_cols: Vec<Option<usize>> = TARGET_COLUMNS
            .iter()
            .map(|name| columns.optional(name))
            .collect();
        let has_targets = target_cols.iter().all(Option::is_some);
        if require_targets && !has_targets {
            let missing: Vec<&str> = TARGET_COLUMNS
                .iter()
                .zip(&target_cols)
                .filter(|(_, col)| col.is_none())
                .map(|(name, _)| *name)
                .collect();
            return Err(SccError::Schema(
                ErrorInfo::new("coupling-missing-targets", "labelled table lacks target columns")
                    .with_context("columns", missing.join(",")),
            ));
        }

        let mut records = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record.map_err(|err| csv_error("coupling-row", err))?;
            let cell = Cell::new(&record, "coupling", line + 2);
            let mut targets = [0.0f64; 5];
            for (slot, (col, name)) in targets.iter_mut().zip(target_cols.iter().zip(TARGET_COLUMNS)) {
                if let Some(col) = col {
                    *slot = cell.float(*col, name)?.unwrap_or(0.0);
                }
            }
            let mut path = PathDescriptor::default();
            cell.optional_indices(&path_index, "path_index", &mut path.index)?;
            cell.optional_indices(&path_btype, "path_btype", &mut path.btype)?;
            cell.optional_indices(&path_a_num, "path_a_num", &mut path.a_num)?;
            let coupling_type: CouplingType = cell
                .text(type_col, "type")?
                .parse()
                .map_err(|err: SccError| err.with_context("line", line + 2))?;
            records.push(CouplingRecord {
                molecule_name: cell.text(name_col, "molecule_name")?.to_string(),
                atom_index_0: cell.u32(a0_col, "atom_index_0")?,
                atom_index_1: cell.u32(a1_col, "atom_index_1")?,
                coupling_type,
                scalar_coupling_constant: targets[0],
                contributions: Contributions::from_array([
                    targets[1], targets[2], targets[3], targets[4],
                ]),
                path,
                id: cell.pair_id(id_col, "id")?,
            });
        }
        Ok(Self::new(records, has_targets))
    }
}

fn csv_error(code: &str, err: csv::Error) -> SccError {
    SccError::Schema(ErrorInfo::new(code, err.to_string()))
}

/// Header lookup by exact column name.
struct ColumnIndex {
    table: String,
    names: HashMap<String, usize>,
}

impl ColumnIndex {
    fn new(headers: &csv::StringRecord, table: &str) -> Self {
        let names = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_string(), idx))
            .collect();
        Self {
            table: table.to_string(),
            names,
        }
    }

    fn optional(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    fn require(&self, name: &str) -> Result<usize, SccError> {
        self.optional(name).ok_or_else(|| {
            SccError::Schema(
                ErrorInfo::new("missing-column", "required column is missing")
                    .with_context("table", &self.table)
                    .with_context("column", name),
            )
        })
    }

    fn require_any(&self, names: &[&str]) -> Result<usize, SccError> {
        names
            .iter()
            .find_map(|name| self.optional(name))
            .ok_or_else(|| {
                SccError::Schema(
                    ErrorInfo::new("missing-column", "required column is missing")
                        .with_context("table", &self.table)
                        .with_context("column", names.join("|")),
                )
            })
    }

    /// Columns named `<prefix>_<n>`, ordered by `n`; `n` must run 0..W.
    fn numbered(&self, prefix: &str) -> Result<Vec<(usize, String)>, SccError> {
        let mut found: Vec<(usize, usize, String)> = self
            .names
            .iter()
            .filter_map(|(name, &col)| {
                let suffix = name.strip_prefix(prefix)?.strip_prefix('_')?;
                if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                suffix.parse::<usize>().ok().map(|n| (n, col, name.clone()))
            })
            .collect();
        found.sort_unstable();
        for (expected, (n, _, name)) in found.iter().enumerate() {
            if *n != expected {
                return Err(SccError::Schema(
                    ErrorInfo::new("feature-columns-gap", "feature columns are not contiguous")
                        .with_context("table", &self.table)
                        .with_context("column", name)
                        .with_context("expected_index", expected),
                ));
            }
        }
        Ok(found.into_iter().map(|(_, col, name)| (col, name)).collect())
    }
}

/// Typed access to the cells of one CSV record.
struct Cell<'a> {
    record: &'a csv::StringRecord,
    table: &'a str,
    line: usize,
}

impl<'a> Cell<'a> {
    fn new(record: &'a csv::StringRecord, table: &'a str, line: usize) -> Self {
        Self {
            record,
            table,
            line,
        }
    }

    fn error(&self, column: &str, value: &str, message: &str) -> SccError {
        SccError::Schema(
            ErrorInfo::new("bad-cell", message)
                .with_context("table", self.table)
                .with_context("line", self.line)
                .with_context("column", column)
                .with_context("value", value),
        )
    }

    fn text(&self, col: usize, column: &str) -> Result<&'a str, SccError> {
        match self.record.get(col).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(self.error(column, "", "required cell is empty")),
        }
    }

    /// Empty and `nan` cells read as `None`.
    fn float(&self, col: usize, column: &str) -> Result<Option<f64>, SccError> {
        let raw = self.record.get(col).map(str::trim).unwrap_or("");
        if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
            return Ok(None);
        }
        raw.parse::<f64>()
            .map(Some)
            .map_err(|_| self.error(column, raw, "cell is not a number"))
    }

    /// Non-negative integer, accepting `3.0` style float renderings.
    fn optional_index(&self, col: usize, column: &str) -> Result<Option<u64>, SccError> {
        let raw = self.record.get(col).map(str::trim).unwrap_or("");
        if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
            return Ok(None);
        }
        let digits = match raw.split_once('.') {
            Some((whole, frac)) if frac.bytes().all(|b| b == b'0') => whole,
            _ => raw,
        };
        digits
            .parse::<u64>()
            .map(Some)
            .map_err(|_| self.error(column, raw, "cell is not a non-negative integer"))
    }

    fn index(&self, col: usize, column: &str) -> Result<u64, SccError> {
        self.optional_index(col, column)?
            .ok_or_else(|| self.error(column, "", "required cell is empty"))
    }

    fn pair_id(&self, col: usize, column: &str) -> Result<PairId, SccError> {
        let id = PairId::from_raw(self.index(col, column)?);
        if !id.is_exact() {
            return Err(self.error(column, &id.to_string(), "pair id exceeds 2^53"));
        }
        Ok(id)
    }

    fn u32(&self, col: usize, column: &str) -> Result<u32, SccError> {
        let value = self.index(col, column)?;
        u32::try_from(value).map_err(|_| self.error(column, &value.to_string(), "index too large"))
    }

    fn optional_indices(
        &self,
        cols: &[usize],
        stem: &str,
        out: &mut [Option<u32>],
    ) -> Result<(), SccError> {
        for (i, (col, slot)) in cols.iter().zip(out.iter_mut()).enumerate() {
            let column = format!("{stem}_{i}");
            *slot = match self.optional_index(*col, &column)? {
                Some(value) => Some(
                    u32::try_from(value)
                        .map_err(|_| self.error(&column, &value.to_string(), "index too large"))?,
                ),
                None => None,
            };
        }
        Ok(())
    }
}
