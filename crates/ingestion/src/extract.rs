//! Source adapters. The set of sources is closed ([`SourceKind`]) but the
//! heavyweight document extractors (Excel/PDF/OCR/DOCX/audio transcription)
//! are opaque plug-ins: anything registered for those kinds just has to
//! produce a [`RawTable`] or fail.

use ara_core::{AraError, Cell, RawTable};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Csv,
    Excel,
    Pdf,
    Image,
    Docx,
    Paste,
    Scrape,
    Audio,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Csv => "csv",
            SourceKind::Excel => "excel",
            SourceKind::Pdf => "pdf",
            SourceKind::Image => "image",
            SourceKind::Docx => "docx",
            SourceKind::Paste => "paste",
            SourceKind::Scrape => "scrape",
            SourceKind::Audio => "audio",
        }
    }

    pub fn from_str(s: &str) -> Option<SourceKind> {
        match s {
            "csv" => Some(SourceKind::Csv),
            "excel" => Some(SourceKind::Excel),
            "pdf" => Some(SourceKind::Pdf),
            "image" => Some(SourceKind::Image),
            "docx" => Some(SourceKind::Docx),
            "paste" => Some(SourceKind::Paste),
            "scrape" => Some(SourceKind::Scrape),
            "audio" => Some(SourceKind::Audio),
            _ => None,
        }
    }
}

/// What an adapter consumes: uploaded bytes or pasted text.
#[derive(Debug, Clone)]
pub enum SourcePayload {
    Bytes(Vec<u8>),
    Text(String),
}

impl SourcePayload {
    fn as_text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            SourcePayload::Text(s) => std::borrow::Cow::Borrowed(s),
            SourcePayload::Bytes(b) => String::from_utf8_lossy(b),
        }
    }
}

/// One capability shared by every adapter: turn a payload into a table.
pub trait Extractor: Send + Sync {
    fn extract(&self, payload: &SourcePayload) -> Result<RawTable, AraError>;
    fn name(&self) -> &'static str;
}

/// CSV files with a header row.
pub struct CsvExtractor;

impl Extractor for CsvExtractor {
    fn extract(&self, payload: &SourcePayload) -> Result<RawTable, AraError> {
        read_delimited(payload.as_text().as_bytes(), b',')
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}

/// Clipboard-pasted tables. Sniffs the delimiter: tab first, then comma,
/// otherwise whitespace-separated columns.
pub struct PasteExtractor;

impl Extractor for PasteExtractor {
    fn extract(&self, payload: &SourcePayload) -> Result<RawTable, AraError> {
        let text = payload.as_text();
        if text.contains('\t') {
            return read_delimited(text.as_bytes(), b'\t');
        }
        if text.contains(',') {
            return read_delimited(text.as_bytes(), b',');
        }

        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
        let Some(header) = lines.next() else {
            return Err(AraError::Extraction("no rows found in pasted text".into()));
        };
        let columns: Vec<String> = header.split_whitespace().map(str::to_string).collect();
        let mut table = RawTable::new(columns);
        for line in lines {
            table.push_row(line.split_whitespace().map(Cell::parse).collect());
        }
        if table.is_empty() {
            return Err(AraError::Extraction("no data rows found in pasted text".into()));
        }
        Ok(table)
    }

    fn name(&self) -> &'static str {
        "paste"
    }
}

fn read_delimited(bytes: &[u8], delimiter: u8) -> Result<RawTable, AraError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| AraError::Extraction(format!("unreadable header row: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut table = RawTable::new(headers);
    for record in reader.records() {
        let record = record.map_err(|e| AraError::Extraction(format!("bad record: {e}")))?;
        table.push_row(record.iter().map(Cell::parse).collect());
    }
    if table.is_empty() {
        return Err(AraError::Extraction("no data rows found".into()));
    }
    Ok(table)
}

/// The closed adapter set. CSV and paste ship built in; the document kinds
/// stay empty until a concrete extractor is registered for them.
pub struct ExtractorRegistry {
    extractors: HashMap<SourceKind, Box<dyn Extractor>>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        let mut registry = Self {
            extractors: HashMap::new(),
        };
        registry.register(SourceKind::Csv, Box::new(CsvExtractor));
        registry.register(SourceKind::Paste, Box::new(PasteExtractor));
        registry
    }
}

impl ExtractorRegistry {
    pub fn register(&mut self, kind: SourceKind, extractor: Box<dyn Extractor>) {
        self.extractors.insert(kind, extractor);
    }

    pub fn supports(&self, kind: SourceKind) -> bool {
        self.extractors.contains_key(&kind)
    }

    pub fn extract(&self, kind: SourceKind, payload: &SourcePayload) -> Result<RawTable, AraError> {
        let extractor = self
            .extractors
            .get(&kind)
            .ok_or_else(|| AraError::UnsupportedSource(kind.as_str().to_string()))?;
        tracing::debug!(source = extractor.name(), "extracting table");
        extractor.extract(payload)
    }
}
