//! Tabular source reader
//!
//! Opens a spreadsheet (first sheet) or a delimited text file and yields the
//! header once followed by data rows, lazily and forward-only.

use super::IngestError;
use calamine::{Data, Range, Reader, open_workbook_auto};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Spreadsheet,
    Csv,
    Tsv,
}

impl SourceFormat {
    /// Format by file extension
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SourceFormat::Spreadsheet),
            "csv" | "txt" => Ok(SourceFormat::Csv),
            "tsv" => Ok(SourceFormat::Tsv),
            "" => Err(IngestError::UnsupportedFormat(path.display().to_string())),
            other => Err(IngestError::UnsupportedFormat(format!(".{other}"))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    /// Field delimiter for `.csv`/`.txt`; sniffed from the header line when unset
    pub delimiter: Option<u8>,
}

/// One data row
///
/// `line` is the 1-based line (text) or row (sheet) number in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub line: usize,
    cells: Vec<String>,
}

impl SourceRow {
    pub fn new(line: usize, cells: Vec<String>) -> Self {
        Self { line, cells }
    }

    /// Trimmed cell text; `None` past the end of a short row
    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(|c| c.trim())
    }

    /// Trimmed, non-empty cell text
    pub fn value(&self, index: usize) -> Option<&str> {
        self.cell(index).filter(|c| !c.is_empty())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

enum Rows {
    Delimited(csv::StringRecordsIntoIter<File>),
    Sheet {
        range: Range<Data>,
        next: usize,
        height: usize,
        width: usize,
    },
    Closed,
}

pub struct TabularSource {
    format: SourceFormat,
    header: Vec<String>,
    rows: Rows,
    line: usize,
}

impl TabularSource {
    pub fn open(path: &Path, options: &ReaderOptions) -> Result<Self, IngestError> {
        match SourceFormat::from_path(path)? {
            SourceFormat::Spreadsheet => Self::open_sheet(path),
            SourceFormat::Csv => {
                let delimiter = match options.delimiter {
                    Some(d) => d,
                    None => sniff_delimiter(path)?,
                };
                Self::open_delimited(path, SourceFormat::Csv, delimiter)
            }
            SourceFormat::Tsv => Self::open_delimited(path, SourceFormat::Tsv, b'\t'),
        }
    }

    fn open_delimited(path: &Path, format: SourceFormat, delimiter: u8) -> Result<Self, IngestError> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(csv_error)?;
        let mut records = reader.into_records();
        let header = match records.next() {
            Some(record) => record
                .map_err(csv_error)?
                .iter()
                .map(normalize_header)
                .collect(),
            None => Vec::new(),
        };
        tracing::debug!(path = %path.display(), delimiter = %(delimiter as char), columns = header.len(), "Opened delimited source");
        Ok(Self {
            format,
            header,
            rows: Rows::Delimited(records),
            line: 1,
        })
    }

    fn open_sheet(path: &Path) -> Result<Self, IngestError> {
        let mut workbook = open_workbook_auto(path).map_err(sheet_error)?;
        let first = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| IngestError::Parse("workbook has no sheets".into()))?;
        let range = workbook.worksheet_range(&first).map_err(sheet_error)?;
        let (height, width) = range.get_size();
        let header = if height == 0 {
            Vec::new()
        } else {
            (0..width)
                .map(|col| range.get((0, col)).map(cell_text).unwrap_or_default())
                .map(|h| normalize_header(&h))
                .collect()
        };
        tracing::debug!(path = %path.display(), sheet = %first, rows = height, columns = width, "Opened spreadsheet source");
        Ok(Self {
            format: SourceFormat::Spreadsheet,
            header,
            rows: Rows::Sheet {
                range,
                next: 1,
                height,
                width,
            },
            line: 1,
        })
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    /// Trimmed header names, in column order
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Release the underlying file
    pub fn close(mut self) {
        self.rows = Rows::Closed;
    }
}

impl Iterator for TabularSource {
    type Item = Result<SourceRow, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (line, cells) = match &mut self.rows {
                Rows::Delimited(records) => match records.next()? {
                    Ok(record) => {
                        let line = record
                            .position()
                            .map(|p| p.line() as usize)
                            .unwrap_or(self.line + 1);
                        (line, record.iter().map(str::to_string).collect::<Vec<_>>())
                    }
                    Err(e) => {
                        let line = e
                            .position()
                            .map(|p| p.line() as usize)
                            .unwrap_or(self.line + 1);
                        self.line = line;
                        return Some(Err(IngestError::MalformedRecord {
                            line,
                            message: e.to_string(),
                        }));
                    }
                },
                Rows::Sheet {
                    range,
                    next,
                    height,
                    width,
                } => {
                    if *next >= *height {
                        return None;
                    }
                    let row = *next;
                    *next += 1;
                    let cells = (0..*width)
                        .map(|col| range.get((row, col)).map(cell_text).unwrap_or_default())
                        .collect::<Vec<_>>();
                    (row + 1, cells)
                }
                Rows::Closed => return None,
            };
            self.line = line;
            let row = SourceRow::new(line, cells);
            if row.is_blank() {
                continue;
            }
            return Some(Ok(row));
        }
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

/// Render a spreadsheet cell as text; integral floats lose their `.0`
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Pick the most frequent of `,` `;` `\t` in the first line
fn sniff_delimiter(path: &Path) -> Result<u8, IngestError> {
    let mut first = String::new();
    BufReader::new(File::open(path)?).read_line(&mut first)?;
    let best = [b',', b';', b'\t']
        .into_iter()
        .map(|d| (d, first.bytes().filter(|b| *b == d).count()))
        .max_by_key(|(_, n)| *n)
        .filter(|(_, n)| *n > 0)
        .map(|(d, _)| d)
        .unwrap_or(b',');
    Ok(best)
}

fn csv_error(err: csv::Error) -> IngestError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => IngestError::Io(e),
        _ => IngestError::Parse(message),
    }
}

fn sheet_error(err: calamine::Error) -> IngestError {
    match err {
        calamine::Error::Io(e) => IngestError::Io(e),
        other => IngestError::Parse(other.to_string()),
    }
}
