use encoding_rs::{WINDOWS_1252, WINDOWS_1256};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Literal cell values the exporters write for "no value".
pub const MISSING_TOKENS: [&str; 2] = ["nan", "None"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingSourcePolicy {
    /// A missing results file is a load failure.
    #[default]
    #[serde(alias = "strict")]
    Fail,
    /// A missing results file loads the built-in sample table instead.
    #[serde(alias = "demo")]
    Sample,
}

impl MissingSourcePolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fail" | "strict" => Some(Self::Fail),
            "sample" | "demo" => Some(Self::Sample),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatasetSource {
    pub path: PathBuf,
    pub missing: MissingSourcePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8Sig,
    Utf8,
    Windows1256,
    Latin1,
}

impl TextEncoding {
    /// Tried in this order; the first one that decodes and parses wins.
    pub const FALLBACK_ORDER: [TextEncoding; 4] = [
        TextEncoding::Utf8Sig,
        TextEncoding::Utf8,
        TextEncoding::Windows1256,
        TextEncoding::Latin1,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8Sig => "utf-8-sig",
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Windows1256 => "windows-1256",
            TextEncoding::Latin1 => "latin-1",
        }
    }

    fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body).ok().map(str::to_string)
            }
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            TextEncoding::Windows1256 => WINDOWS_1256
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|s| s.into_owned()),
            // encoding_rs follows WHATWG, where the "latin1" label means windows-1252.
            TextEncoding::Latin1 => WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|s| s.into_owned()),
        }
    }
}

/// Immutable in-memory results table. Every row holds exactly one cell per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Builds a table from raw header names and rows, applying the load-time
    /// normalization: names and cells are trimmed, missing tokens become empty,
    /// short rows are padded and rows with no content are dropped.
    ///
    /// Rows wider than the header are truncated; the file parser rejects them first.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let columns: Vec<String> = columns.into_iter().map(|c| c.trim().to_string()).collect();
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|row| {
                let mut cells: Vec<String> = row
                    .into_iter()
                    .take(width)
                    .map(|c| normalize_cell(&c))
                    .collect();
                cells.resize(width, String::new());
                cells
            })
            .filter(|cells| cells.iter().any(|c| !c.is_empty()))
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(|r| r.as_slice())
    }
}

pub fn normalize_cell(raw: &str) -> String {
    let t = raw.trim();
    if MISSING_TOKENS.contains(&t) {
        String::new()
    } else {
        t.to_string()
    }
}

/// Where a loaded table came from, reported by the debug snapshot.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub path: PathBuf,
    pub synthetic: bool,
    pub encoding: Option<TextEncoding>,
    pub delimiter: Option<u8>,
    pub sha256: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: Table,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("file has no header row")]
    Empty,
    #[error("no encoding produced a readable table ({})", .0.join("; "))]
    Unreadable(Vec<String>),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("dataset not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read dataset {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not load dataset {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
}

#[derive(Debug, Clone)]
pub struct Decoded {
    pub table: Table,
    pub encoding: TextEncoding,
    pub delimiter: u8,
}

pub fn load(source: &DatasetSource) -> Result<LoadedTable, LoadError> {
    let path = source.path.as_path();
    if !path.is_file() {
        return match source.missing {
            MissingSourcePolicy::Fail => Err(LoadError::NotFound(path.to_path_buf())),
            MissingSourcePolicy::Sample => {
                tracing::warn!(path = %path.display(), "results file missing, using sample table");
                Ok(LoadedTable {
                    table: sample_table(),
                    provenance: Provenance {
                        path: path.to_path_buf(),
                        synthetic: true,
                        encoding: None,
                        delimiter: None,
                        sha256: None,
                    },
                })
            }
        };
    }

    let bytes = std::fs::read(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let decoded = decode_table(&bytes).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(
        path = %path.display(),
        encoding = decoded.encoding.label(),
        rows = decoded.table.len(),
        columns = decoded.table.columns().len(),
        "results file loaded"
    );

    Ok(LoadedTable {
        table: decoded.table,
        provenance: Provenance {
            path: path.to_path_buf(),
            synthetic: false,
            encoding: Some(decoded.encoding),
            delimiter: Some(decoded.delimiter),
            sha256: Some(format!("{:x}", Sha256::digest(&bytes))),
        },
    })
}

/// Decodes raw file bytes into a table, walking `TextEncoding::FALLBACK_ORDER`.
pub fn decode_table(bytes: &[u8]) -> Result<Decoded, DecodeError> {
    let mut attempts: Vec<String> = Vec::new();
    for encoding in TextEncoding::FALLBACK_ORDER {
        let Some(text) = encoding.decode(bytes) else {
            attempts.push(format!("{}: invalid byte sequence", encoding.label()));
            continue;
        };
        if text.trim().is_empty() {
            return Err(DecodeError::Empty);
        }

        let delimiter = sniff_delimiter(&text);
        match parse_delimited(&text, delimiter) {
            Ok(table) => {
                return Ok(Decoded {
                    table,
                    encoding,
                    delimiter,
                })
            }
            Err(reason) => {
                tracing::debug!(encoding = encoding.label(), %reason, "parse attempt failed");
                attempts.push(format!("{}: {}", encoding.label(), reason));
            }
        }
    }
    Err(DecodeError::Unreadable(attempts))
}

/// Picks the delimiter that occurs most often in the header line. Ties go to `,`.
pub fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let mut best = DELIMITERS[0];
    let mut best_count = 0usize;
    for d in DELIMITERS {
        let n = header.bytes().filter(|b| *b == d).count();
        if n > best_count {
            best = d;
            best_count = n;
        }
    }
    best
}

fn parse_delimited(text: &str, delimiter: u8) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if columns.is_empty() {
        return Err("missing header row".to_string());
    }

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| e.to_string())?;
        if record.len() > columns.len() {
            // Line numbers are 1-based and count the header.
            return Err(format!(
                "line {}: expected {} fields, saw {}",
                idx + 2,
                columns.len(),
                record.len()
            ));
        }
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }

    Ok(Table::new(columns, rows))
}

/// Fixed demo table served when the results file is missing and the
/// missing-source policy is `sample`.
pub fn sample_table() -> Table {
    let columns = ["seating_no", "arabic_name", "total_score", "status"];
    let rows = [
        ["A001", "Ahmed Hassan", "420", "PASS"],
        ["A002", "Mona Adel", "245", "FAIL"],
        ["A003", "Omar Khaled", "310", "PASS"],
        ["A004", "Sara", "350", "FAIL"],
        ["A005", "Youssef Ali", "480", "PASS"],
    ];
    Table::new(
        columns.iter().map(|c| c.to_string()).collect(),
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}

pub fn source_exists(path: &Path) -> bool {
    path.is_file()
}
