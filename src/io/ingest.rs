//! Transaction table ingest
//!
//! Reads the transactions sheet either as a delimited export or directly
//! from a workbook (first worksheet). Columns are located by header name.
//! Rows with an unusable section, type code or coordinate are skipped and
//! tallied; the aggregation core never sees them.

use crate::domain::types::{LatLng, SectionId, TransactionRecord, TypeCode};
use calamine::{open_workbook_auto, Data, Reader};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("CSV error")]
    Csv(#[from] csv::Error),

    #[error("Workbook error")]
    Workbook(#[from] calamine::Error),

    #[error("Workbook has no worksheet")]
    NoWorksheet,

    #[error("Missing column {0:?} in header")]
    MissingColumn(String),

    #[error("Input has no header row")]
    EmptyInput,
}

/// How the transactions file is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Decided by file extension
    #[default]
    Auto,
    Csv,
    #[serde(alias = "xlsx")]
    Workbook,
}

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

impl InputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::Auto => "auto",
            InputFormat::Csv => "csv",
            InputFormat::Workbook => "workbook",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(InputFormat::Auto),
            "csv" => Some(InputFormat::Csv),
            "workbook" | "xlsx" => Some(InputFormat::Workbook),
            _ => None,
        }
    }

    /// Concrete format for `path`; never returns `Auto`
    pub fn resolve(self, path: &Path) -> InputFormat {
        match self {
            InputFormat::Auto => {
                let is_workbook = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| ext.eq_ignore_ascii_case(w)))
                    .unwrap_or(false);
                if is_workbook {
                    InputFormat::Workbook
                } else {
                    InputFormat::Csv
                }
            }
            explicit => explicit,
        }
    }
}

/// Column mapping and parsing options
#[derive(Debug, Clone, PartialEq)]
pub struct InputSettings {
    pub format: InputFormat,
    pub delimiter: char,
    pub section_column: String,
    pub type_column: String,
    pub latitude_column: String,
    pub longitude_column: String,
    pub swap_coordinates: bool,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            format: InputFormat::Auto,
            delimiter: ',',
            section_column: "Seccion".to_string(),
            type_column: "Tipo Trx".to_string(),
            latitude_column: "Latitud".to_string(),
            longitude_column: "Longitud".to_string(),
            swap_coordinates: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InvalidSection,
    InvalidType,
    InvalidCoordinates,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::InvalidSection => "invalid_section",
            SkipReason::InvalidType => "invalid_type",
            SkipReason::InvalidCoordinates => "invalid_coordinates",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipTally {
    pub invalid_section: usize,
    pub invalid_type: usize,
    pub invalid_coordinates: usize,
}

impl SkipTally {
    fn count(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::InvalidSection => self.invalid_section += 1,
            SkipReason::InvalidType => self.invalid_type += 1,
            SkipReason::InvalidCoordinates => self.invalid_coordinates += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.invalid_section + self.invalid_type + self.invalid_coordinates
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub records: Vec<TransactionRecord>,
    pub rows_read: usize,
    pub skipped: SkipTally,
}

impl IngestReport {
    fn push_row(&mut self, parsed: Result<TransactionRecord, SkipReason>, line: u64) {
        self.rows_read += 1;
        match parsed {
            Ok(record) => self.records.push(record),
            Err(reason) => {
                debug!(line = %line, reason = %reason.as_str(), "row_skipped");
                self.skipped.count(reason);
            }
        }
    }

    fn finish(self) -> Self {
        if self.skipped.total() > 0 {
            warn!(
                skipped = %self.skipped.total(),
                invalid_section = %self.skipped.invalid_section,
                invalid_type = %self.skipped.invalid_type,
                invalid_coordinates = %self.skipped.invalid_coordinates,
                "ingest_rows_skipped"
            );
        }
        info!(rows = %self.rows_read, records = %self.records.len(), "ingest_complete");
        self
    }
}

/// Header positions of the four columns we need
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    section: usize,
    type_code: usize,
    latitude: usize,
    longitude: usize,
}

impl ColumnIndex {
    fn resolve<'a, I>(headers: I, settings: &InputSettings) -> Result<Self, IngestError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let headers: Vec<&str> = headers.into_iter().map(str::trim).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(IngestError::EmptyInput);
        }
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| *h == name.trim())
                .ok_or_else(|| IngestError::MissingColumn(name.to_string()))
        };

        let lat_col = find(&settings.latitude_column)?;
        let lng_col = find(&settings.longitude_column)?;
        let (latitude, longitude) =
            if settings.swap_coordinates { (lng_col, lat_col) } else { (lat_col, lng_col) };

        Ok(Self {
            section: find(&settings.section_column)?,
            type_code: find(&settings.type_column)?,
            latitude,
            longitude,
        })
    }
}

/// Read transactions from a file, decoding it per `settings.format`
pub fn read_transactions<P: AsRef<Path>>(
    path: P,
    settings: &InputSettings,
) -> Result<IngestReport, IngestError> {
    let path = path.as_ref();
    let format = settings.format.resolve(path);
    match format {
        InputFormat::Workbook => read_workbook(path, settings),
        _ => {
            let file = File::open(path)?;
            info!(path = %path.display(), format = %format.as_str(), "ingest_started");
            read_transactions_from_reader(file, settings)
        }
    }
}

/// Read transactions from any delimited reader
pub fn read_transactions_from_reader<R: Read>(
    reader: R,
    settings: &InputSettings,
) -> Result<IngestReport, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(settings.delimiter as u8)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let columns = ColumnIndex::resolve(headers.iter(), settings)?;

    let mut report = IngestReport::default();
    for row in csv_reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        report.push_row(parse_row(|idx| row.get(idx).unwrap_or(""), columns), line);
    }
    Ok(report.finish())
}

/// Read transactions from the first worksheet of a workbook
///
/// The first row of the sheet's used range is the header row.
pub fn read_workbook<P: AsRef<Path>>(
    path: P,
    settings: &InputSettings,
) -> Result<IngestReport, IngestError> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)?;
    info!(path = %path.display(), format = %InputFormat::Workbook.as_str(), "ingest_started");

    let range = workbook.worksheet_range_at(0).ok_or(IngestError::NoWorksheet)??;
    let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<String>>());

    let headers = rows.next().ok_or(IngestError::EmptyInput)?;
    let columns = ColumnIndex::resolve(headers.iter().map(String::as_str), settings)?;

    let first_line = range.start().map(|(row, _)| u64::from(row) + 1).unwrap_or(1);
    let mut report = IngestReport::default();
    for (offset, row) in rows.enumerate() {
        let line = first_line + 1 + offset as u64;
        report.push_row(parse_row(|idx| row.get(idx).map(String::as_str).unwrap_or(""), columns), line);
    }
    Ok(report.finish())
}

/// Cell as the text the delimited export would have carried
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Int(v) => v.to_string(),
        Data::Float(v) => v.to_string(),
        Data::Bool(v) => v.to_string(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        _ => String::new(),
    }
}

fn parse_row<'a, F>(field: F, columns: ColumnIndex) -> Result<TransactionRecord, SkipReason>
where
    F: Fn(usize) -> &'a str,
{
    let section = parse_integer(field(columns.section)).ok_or(SkipReason::InvalidSection)?;
    let type_code = parse_integer(field(columns.type_code))
        .and_then(|v| i32::try_from(v).ok())
        .ok_or(SkipReason::InvalidType)?;
    let lat = parse_coordinate(field(columns.latitude)).ok_or(SkipReason::InvalidCoordinates)?;
    let lng = parse_coordinate(field(columns.longitude)).ok_or(SkipReason::InvalidCoordinates)?;

    Ok(TransactionRecord {
        section: SectionId(section),
        type_code: TypeCode(type_code),
        position: LatLng::new(lat, lng),
    })
}

/// Integer cell; spreadsheet exports may write integral values as `12.0`
pub fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let v = raw.parse::<f64>().ok()?;
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// Decimal-comma tolerant coordinate; only finite values are accepted
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    let normalized = raw.trim().replacen(',', ".", 1);
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Seccion,Tipo Trx,Latitud,Longitud
1,627,-34.6037,-58.3816
1,624,-34.6037,-58.3816
2,627,-34.6051,-58.3787
";

    fn read(input: &str, settings: &InputSettings) -> Result<IngestReport, IngestError> {
        read_transactions_from_reader(input.as_bytes(), settings)
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer(" -7 "), Some(-7));
        assert_eq!(parse_integer("12.0"), Some(12));
        assert_eq!(parse_integer("12.5"), None);
        assert_eq!(parse_integer("abc"), None);
        assert_eq!(parse_integer(""), None);
        assert_eq!(parse_integer("NaN"), None);
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("-34.6037"), Some(-34.6037));
        assert_eq!(parse_coordinate("-34,6037"), Some(-34.6037));
        assert_eq!(parse_coordinate(" 58,5 "), Some(58.5));
        assert_eq!(parse_coordinate("inf"), None);
        assert_eq!(parse_coordinate("NaN"), None);
        assert_eq!(parse_coordinate(""), None);
        assert_eq!(parse_coordinate("1,2,3"), None);
    }

    #[test]
    fn test_read_sample() {
        let report = read(SAMPLE, &InputSettings::default()).unwrap();
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.skipped.total(), 0);
        assert_eq!(report.records[0], TransactionRecord::new(1, 627, -34.6037, -58.3816));
        assert_eq!(report.records[1].type_code, TypeCode(624));
    }

    #[test]
    fn test_swap_coordinates() {
        let settings = InputSettings { swap_coordinates: true, ..Default::default() };
        let report = read(SAMPLE, &settings).unwrap();
        assert_eq!(report.records[0].position, LatLng::new(-58.3816, -34.6037));
    }

    #[test]
    fn test_semicolon_and_decimal_comma() {
        let input = "Seccion;Tipo Trx;Latitud;Longitud\n5;627;-34,6037;-58,3816\n";
        let settings = InputSettings { delimiter: ';', ..Default::default() };
        let report = read(input, &settings).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].position, LatLng::new(-34.6037, -58.3816));
    }

    #[test]
    fn test_quoted_decimal_comma_with_comma_delimiter() {
        let input = "Seccion,Tipo Trx,Latitud,Longitud\n5,627,\"-34,6037\",\"-58,3816\"\n";
        let report = read(input, &InputSettings::default()).unwrap();
        assert_eq!(report.records[0].position, LatLng::new(-34.6037, -58.3816));
    }

    #[test]
    fn test_invalid_rows_are_tallied() {
        let input = "\
Seccion,Tipo Trx,Latitud,Longitud
x,627,-34.6,-58.3
1,,-34.6,-58.3
1,627,,-58.3
1,627,-34.6,NaN
1,9999999999,-34.6,-58.3
2,627,-34.6,-58.3
";
        let report = read(input, &InputSettings::default()).unwrap();
        assert_eq!(report.rows_read, 6);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.skipped.invalid_section, 1);
        assert_eq!(report.skipped.invalid_type, 2);
        assert_eq!(report.skipped.invalid_coordinates, 2);
        assert_eq!(report.skipped.total(), 5);
    }

    #[test]
    fn test_short_row_is_skipped() {
        let input = "Seccion,Tipo Trx,Latitud,Longitud\n1,627\n2,624,-34.6,-58.3\n";
        let report = read(input, &InputSettings::default()).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.skipped.invalid_coordinates, 1);
    }

    #[test]
    fn test_extra_and_reordered_columns() {
        let input = "Fecha,Longitud,Latitud,Tipo Trx,Seccion\n2024-01-01,-58.38,-34.60,624,9\n";
        let report = read(input, &InputSettings::default()).unwrap();
        assert_eq!(report.records[0], TransactionRecord::new(9, 624, -34.60, -58.38));
    }

    #[test]
    fn test_missing_column() {
        let input = "Seccion,Tipo,Latitud,Longitud\n1,627,-34.6,-58.3\n";
        match read(input, &InputSettings::default()) {
            Err(IngestError::MissingColumn(name)) => assert_eq!(name, "Tipo Trx"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_header_only_is_empty_report() {
        let report = read("Seccion,Tipo Trx,Latitud,Longitud\n", &InputSettings::default()).unwrap();
        assert!(report.records.is_empty());
        assert_eq!(report.rows_read, 0);
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(read("", &InputSettings::default()), Err(IngestError::EmptyInput)));
    }

    #[test]
    fn test_missing_file() {
        let result = read_transactions("/nonexistent/transactions.csv", &InputSettings::default());
        assert!(matches!(result, Err(IngestError::Io(_))));
    }

    #[test]
    fn test_io_cause_printed_once_in_chain() {
        let err = read_transactions("/nonexistent/transactions.csv", &InputSettings::default()).unwrap_err();
        let chain = format!("{:#}", anyhow::Error::new(err));
        assert_eq!(chain.matches("os error").count(), 1, "{}", chain);
    }

    #[test]
    fn test_csv_error_keeps_prefix() {
        let mut input = b"Seccion,Tipo Trx,Latitud,Longitud\n1,627,".to_vec();
        input.extend_from_slice(&[0xff, 0xfe]);
        input.extend_from_slice(b",-58.3\n");
        let err = read_transactions_from_reader(input.as_slice(), &InputSettings::default()).unwrap_err();
        assert!(matches!(err, IngestError::Csv(_)));
        let chain = format!("{:#}", anyhow::Error::new(err));
        assert!(chain.starts_with("CSV error: "), "{}", chain);
        assert_eq!(chain.matches("CSV error").count(), 1, "{}", chain);
    }

    #[test]
    fn test_input_format_resolve() {
        assert_eq!(InputFormat::Auto.resolve(Path::new("data/t.xlsx")), InputFormat::Workbook);
        assert_eq!(InputFormat::Auto.resolve(Path::new("data/T.XLS")), InputFormat::Workbook);
        assert_eq!(InputFormat::Auto.resolve(Path::new("data/t.ods")), InputFormat::Workbook);
        assert_eq!(InputFormat::Auto.resolve(Path::new("data/t.csv")), InputFormat::Csv);
        assert_eq!(InputFormat::Auto.resolve(Path::new("data/transactions")), InputFormat::Csv);
        assert_eq!(InputFormat::Csv.resolve(Path::new("data/t.xlsx")), InputFormat::Csv);
        assert_eq!(InputFormat::Workbook.resolve(Path::new("data/t.txt")), InputFormat::Workbook);
    }

    #[test]
    fn test_input_format_parse() {
        assert_eq!(InputFormat::parse("xlsx"), Some(InputFormat::Workbook));
        assert_eq!(InputFormat::parse(" CSV "), Some(InputFormat::Csv));
        assert_eq!(InputFormat::parse("auto"), Some(InputFormat::Auto));
        assert_eq!(InputFormat::parse("parquet"), None);
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(-34.6037)), "-34.6037");
        assert_eq!(cell_text(&Data::Float(12.0)), "12");
        assert_eq!(cell_text(&Data::Int(627)), "627");
        assert_eq!(cell_text(&Data::String(" -34,6 ".to_string())), "-34,6");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_read_workbook_missing_file() {
        let result = read_workbook("/nonexistent/transactions.xlsx", &InputSettings::default());
        assert!(result.is_err());
    }
}
