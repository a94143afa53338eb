//! File readers: bytes of a supported format → [`Table`].
//!
//! | Extension     | Reader                                              |
//! |---------------|-----------------------------------------------------|
//! | `csv`         | polars CSV reader, comma separated, header row      |
//! | `xlsx`, `xls` | calamine, first sheet, header row                   |
//! | `json`        | polars JSON reader (array of records, or JSONL)     |
//! | `txt`         | tab separated, falling back to whitespace separated |
//!
//! The extension is checked against the allow-list before any byte is read.
//! An empty field (CSV/TXT) or empty cell (Excel) is read as missing; an
//! empty string supplied as a value, such as JSON `""`, stays text.
//! Every reader failure surfaces as [`SluiceError::Parse`].

use super::missing::{NA_TOKENS, is_na_token};
use super::table::{Table, TableColumn, Value};
use crate::config::ParseSettings;
use crate::error::{Result, ResultExt as _, SluiceError};
use calamine::{Data, DataType as _, Reader as _};
use chrono::{DateTime, NaiveDateTime, Utc};
use polars::prelude::*;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

/// Extensions accepted by [`FileFormat::from_extension`].
pub const ALLOWED_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls", "json", "txt"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
    Xls,
    Json,
    Txt,
}

impl FileFormat {
    /// # Errors
    ///
    /// Returns [`SluiceError::UnsupportedFormat`] for anything outside
    /// [`ALLOWED_EXTENSIONS`].
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            "xls" => Ok(Self::Xls),
            "json" => Ok(Self::Json),
            "txt" => Ok(Self::Txt),
            other => Err(SluiceError::UnsupportedFormat(format!(
                "'{other}' is not one of {}",
                ALLOWED_EXTENSIONS.join(", ")
            ))),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                SluiceError::UnsupportedFormat(format!(
                    "{} has no file extension",
                    path.display()
                ))
            })?;
        Self::from_extension(ext)
    }
}

/// Which branch of the text reader produced a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextLayout {
    TabSeparated,
    WhitespaceSeparated,
}

/// Reads and parses a file; the format comes from its extension.
pub fn read_file(path: &Path, settings: &ParseSettings) -> Result<Table> {
    let format = FileFormat::from_path(path)?;
    let bytes = std::fs::read(path).with_context(|| format!("Reading {}", path.display()))?;
    parse_bytes(&bytes, format, settings)
}

pub fn parse_bytes(bytes: &[u8], format: FileFormat, settings: &ParseSettings) -> Result<Table> {
    let table = match format {
        FileFormat::Csv => read_delimited(bytes, b',', settings)
            .context("Failed to read CSV")
            .and_then(|df| table_from_frame(&df)),
        FileFormat::Xlsx | FileFormat::Xls => read_workbook(bytes),
        FileFormat::Json => read_json(bytes),
        FileFormat::Txt => read_text(bytes, settings).map(|(table, _)| table),
    };

    table.map_err(|e| match e {
        SluiceError::Parse(msg) => SluiceError::Parse(format!("Error reading file: {msg}")),
        other => other,
    })
}

/// Reads delimited text, guessing column types from the first
/// `infer_schema_length` rows.
///
/// A later row that contradicts the guess (`X-17` under thousands of
/// integers) makes the whole file rescanned, so the column widens to text
/// instead of failing.
fn read_delimited(bytes: &[u8], separator: u8, settings: &ParseSettings) -> Result<DataFrame> {
    match read_delimited_with(bytes, separator, settings, Some(settings.infer_schema_length)) {
        Ok(df) => Ok(df),
        Err(err) => {
            tracing::debug!(
                "Types guessed from the first {} rows did not hold ({err}); scanning every row",
                settings.infer_schema_length
            );
            read_delimited_with(bytes, separator, settings, None)
        }
    }
}

fn read_delimited_with(
    bytes: &[u8],
    separator: u8,
    settings: &ParseSettings,
    infer_schema_length: Option<usize>,
) -> Result<DataFrame> {
    let null_values = NullValues::AllColumns(NA_TOKENS.iter().map(|t| (*t).into()).collect());
    let parse_options = CsvParseOptions::default()
        .with_separator(separator)
        .with_try_parse_dates(settings.try_parse_dates)
        .with_null_values(Some(null_values));

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(infer_schema_length)
        .with_parse_options(parse_options)
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()?;
    Ok(df)
}

fn read_json(bytes: &[u8]) -> Result<Table> {
    let is_array = bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'[');
    let format = if is_array {
        JsonFormat::Json
    } else {
        JsonFormat::JsonLines
    };

    let df = JsonReader::new(Cursor::new(bytes.to_vec()))
        .with_json_format(format)
        .finish()
        .context("Failed to read JSON records")?;
    table_from_frame(&df)
}

/// Tab separated first, whitespace separated on failure.
///
/// The tab branch is taken when the header line contains a tab, or has no
/// whitespace at all (a single-column file).
pub fn read_text(bytes: &[u8], settings: &ParseSettings) -> Result<(Table, TextLayout)> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| SluiceError::Parse(format!("File is not valid UTF-8: {e}")))?;

    match read_tab_separated(text, settings) {
        Ok(table) => Ok((table, TextLayout::TabSeparated)),
        Err(tab_err) => {
            tracing::warn!("Tab-separated read failed ({tab_err}); retrying on whitespace runs");
            let table = read_whitespace_separated(text, settings)
                .context("Neither tab nor whitespace separation matched")?;
            Ok((table, TextLayout::WhitespaceSeparated))
        }
    }
}

fn header_line(text: &str) -> Result<&str> {
    text.lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| SluiceError::Parse("File is empty".to_owned()))
}

fn read_tab_separated(text: &str, settings: &ParseSettings) -> Result<Table> {
    let header = header_line(text)?;
    if !header.contains('\t') && header.contains(char::is_whitespace) {
        return Err(SluiceError::Parse(
            "Header line has no tab separators".to_owned(),
        ));
    }
    let df = read_delimited(text.as_bytes(), b'\t', settings)?;
    table_from_frame(&df)
}

fn read_whitespace_separated(text: &str, settings: &ParseSettings) -> Result<Table> {
    header_line(text)?;
    let normalised = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join("\t"))
        .collect::<Vec<_>>()
        .join("\n");
    let df = read_delimited(normalised.as_bytes(), b'\t', settings)?;
    table_from_frame(&df)
}

fn read_workbook(bytes: &[u8]) -> Result<Table> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .context("Failed to open Excel file")?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SluiceError::Parse("No worksheet found".to_owned()))?
        .context("Failed to read Excel range")?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| SluiceError::Parse("Excel sheet is empty".to_owned()))?;
    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| match cell {
            Data::Empty => format!("Unnamed: {idx}"),
            other => other.to_string().trim().to_owned(),
        })
        .collect();
    let names = dedupe_headers(&names);

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (idx, values) in columns.iter_mut().enumerate() {
            values.push(row.get(idx).map_or(Value::Missing, cell_value));
        }
    }

    Table::new(
        names
            .into_iter()
            .zip(columns)
            .map(|(name, values)| TableColumn::new(name, values))
            .collect(),
    )
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Missing,
        Data::Int(i) => Value::Integer(*i),
        // xlsx stores every number as a float
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Value::Integer(*f as i64),
        Data::Float(f) => Value::Float(*f),
        Data::Bool(b) => Value::Boolean(*b),
        // an empty cell reads as missing whether Excel stored it or not
        Data::String(s) if s.is_empty() || is_na_token(s) => Value::Missing,
        Data::String(s) => Value::Text(s.clone()),
        Data::DateTime(_) => cell
            .as_datetime()
            .map_or_else(|| Value::Text(cell.to_string()), Value::Timestamp),
        Data::DateTimeIso(s) => parse_iso_datetime(s).map_or_else(|| Value::Text(s.clone()), Value::Timestamp),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Renames repeated headers the way pandas does: `a, a, a` → `a, a.1, a.2`.
pub fn dedupe_headers(names: &[String]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(names.len());

    for name in names {
        let mut candidate = name.clone();
        while let Some(n) = counts.get_mut(&candidate) {
            *n += 1;
            candidate = format!("{name}.{n}");
        }
        counts.insert(candidate.clone(), 0);
        out.push(candidate);
    }
    out
}

/// Converts a polars frame into a [`Table`], one column at a time.
pub fn table_from_frame(df: &DataFrame) -> Result<Table> {
    let columns = df
        .get_columns()
        .iter()
        .map(|col| {
            let name = col.name().to_string();
            let values = series_values(col.as_materialized_series())
                .with_context(|| format!("Converting column '{name}'"))?;
            Ok(TableColumn::new(name, values))
        })
        .collect::<Result<Vec<_>>>()?;
    Table::new(columns)
}

fn series_values(series: &Series) -> Result<Vec<Value>> {
    let dtype = series.dtype();

    if dtype.is_bool() {
        return Ok(series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(Value::Missing, Value::Boolean))
            .collect());
    }

    if dtype.is_integer() {
        // u64 values above i64::MAX keep their digits as text
        if let Ok(casted) = series.strict_cast(&DataType::Int64) {
            return Ok(casted
                .i64()?
                .into_iter()
                .map(|v| v.map_or(Value::Missing, Value::Integer))
                .collect());
        }
        return text_values(series);
    }

    if dtype.is_float() {
        let casted = series.cast(&DataType::Float64)?;
        return Ok(casted
            .f64()?
            .into_iter()
            .map(|v| v.map_or(Value::Missing, Value::Float))
            .collect());
    }

    if matches!(dtype, DataType::Date | DataType::Datetime(_, _)) {
        let millis = series
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            .cast(&DataType::Int64)?;
        return Ok(millis
            .i64()?
            .into_iter()
            .map(|v| {
                v.and_then(DateTime::<Utc>::from_timestamp_millis)
                    .map_or(Value::Missing, |dt| Value::Timestamp(dt.naive_utc()))
            })
            .collect());
    }

    text_values(series)
}

fn text_values(series: &Series) -> Result<Vec<Value>> {
    let to_value = |s: Option<&str>| s.map_or(Value::Missing, |s| Value::Text(s.to_owned()));

    if let Ok(ca) = series.str() {
        return Ok(ca.into_iter().map(to_value).collect());
    }
    if let Ok(casted) = series.cast(&DataType::String)
        && let Ok(ca) = casted.str()
    {
        return Ok(ca.into_iter().map(to_value).collect());
    }

    let rechunked = series.rechunk();
    Ok(rechunked
        .iter()
        .map(|av| {
            if av.is_null() {
                Value::Missing
            } else {
                Value::Text(av.to_string())
            }
        })
        .collect())
}
