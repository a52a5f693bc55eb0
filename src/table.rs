use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::error::ConvertError;

/// Cell contents that are read as missing values rather than text.
pub const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A single table value after type coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Coerce raw cell text: NA marker, then integer, then float, else text.
    /// NaN spellings are missing; overflowing or infinite numbers keep their text.
    pub fn parse(raw: &str) -> Self {
        if NA_VALUES.contains(&raw) {
            return Cell::Missing;
        }
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Cell::Integer(i);
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_nan() => Cell::Missing,
            Ok(f) if f.is_finite() => Cell::Float(f),
            _ => Cell::Text(raw.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Numeric value of the cell, if it has a finite one.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Cell::Missing => return None,
            Cell::Integer(i) => *i as f64,
            Cell::Float(f) => *f,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

/// Ordered mapping from column name to cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    cells: Vec<(String, Cell)>,
}

impl Row {
    pub fn new(cells: Vec<(String, Cell)>) -> Self {
        Self { cells }
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.cells.iter().map(|(name, cell)| (name.as_str(), cell))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A fully materialized table: header plus rows in file order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Read a delimited table from any reader. `source` only labels errors.
    pub fn from_reader<R: Read>(
        reader: R,
        delimiter: u8,
        source: &Path,
    ) -> Result<Self, ConvertError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = reader.records();
        let header = match records.next() {
            Some(record) => record.map_err(|e| ConvertError::csv(source, e))?,
            None => {
                return Err(ConvertError::MissingHeader {
                    path: source.to_path_buf(),
                })
            }
        };
        let columns = column_names(&header);

        let mut rows = Vec::new();
        for record in records {
            let record = record.map_err(|e| ConvertError::csv(source, e))?;
            if record.len() > columns.len() {
                return Err(ConvertError::RaggedRow {
                    path: source.to_path_buf(),
                    line: record.position().map_or(0, |p| p.line()),
                    expected: columns.len(),
                    found: record.len(),
                });
            }

            // Short records are padded with missing cells.
            let cells = columns
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let cell = record.get(i).map_or(Cell::Missing, Cell::parse);
                    (name.clone(), cell)
                })
                .collect();
            rows.push(Row::new(cells));
        }

        Ok(Table { columns, rows })
    }
}

/// Load a delimited file from disk.
pub fn read_table(path: &Path, delimiter: u8) -> Result<Table, ConvertError> {
    let file = File::open(path).map_err(|e| ConvertError::io(path, e))?;
    let table = Table::from_reader(BufReader::new(file), delimiter, path)?;
    debug!(
        path = %path.display(),
        columns = table.columns.len(),
        rows = table.rows.len(),
        "Loaded table"
    );
    Ok(table)
}

// Repeated names get a numeric suffix: `Id`, `Id.1`, `Id.2`.
fn column_names(header: &StringRecord) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut columns = Vec::with_capacity(header.len());

    for (i, raw) in header.iter().enumerate() {
        let mut name = if i == 0 {
            raw.trim_start_matches('\u{feff}').to_string()
        } else {
            raw.to_string()
        };

        let mut count = counts.get(&name).copied().unwrap_or(0);
        while count > 0 {
            counts.insert(name.clone(), count + 1);
            name = format!("{name}.{count}");
            count = counts.get(&name).copied().unwrap_or(0);
        }
        counts.insert(name.clone(), count + 1);
        columns.push(name);
    }

    columns
}
