use crate::error::DataError;
use crate::store::CrimeData;
use crate::types::{DateRange, IncidentRow, YearMonth};
use crate::util::{check_date_in_range, parse_int_field};
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Column positions of the logical fields in an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub crime_type: usize,
    pub year: usize,
    pub month: usize,
    pub neighbourhood: usize,
    /// Explicit count column; `None` means every row counts once.
    pub occurrences: Option<usize>,
}

impl ColumnMap {
    /// Per-incident export: TYPE, YEAR, MONTH, ..., NEIGHBOURHOOD at 7.
    pub const RAW: ColumnMap = ColumnMap {
        crime_type: 0,
        year: 1,
        month: 2,
        neighbourhood: 7,
        occurrences: None,
    };

    /// The file written by `output::write_csv` from an exported store.
    pub const PROCESSED: ColumnMap = ColumnMap {
        crime_type: 0,
        year: 2,
        month: 3,
        neighbourhood: 1,
        occurrences: Some(4),
    };

    /// Pull the logical fields out of one record.
    pub fn extract(&self, record: &StringRecord) -> Result<IncidentRow, DataError> {
        let crime_type = text_cell(record, "crime_type", self.crime_type)?;
        let neighbourhood = text_cell(record, "neighbourhood", self.neighbourhood)?;
        let year = parse_int_field("year", cell(record, "year", self.year)?)?;
        let month = parse_int_field("month", cell(record, "month", self.month)?)?;
        let occurrences = match self.occurrences {
            Some(idx) => parse_int_field("count", cell(record, "count", idx)?)?,
            None => 1,
        };
        Ok(IncidentRow {
            crime_type,
            neighbourhood,
            year,
            month,
            occurrences,
        })
    }
}

fn cell<'r>(
    record: &'r StringRecord,
    column: &'static str,
    index: usize,
) -> Result<&'r str, DataError> {
    record
        .get(index)
        .ok_or(DataError::MissingColumn { column, index })
}

// Blank labels are rejected so they never form a series of their own.
fn text_cell(
    record: &StringRecord,
    column: &'static str,
    index: usize,
) -> Result<String, DataError> {
    let value = cell(record, column, index)?.trim();
    if value.is_empty() {
        return Err(DataError::EmptyField { column });
    }
    Ok(value.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// Unaggregated incidents: keep rows inside the range, count each once,
    /// then fill gaps over the same range.
    Raw(DateRange),
    /// Already aggregated and densified: add each row's count as-is.
    Processed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub columns: ColumnMap,
    pub mode: IngestMode,
}

impl LoadOptions {
    pub fn raw(range: DateRange) -> Self {
        Self {
            columns: ColumnMap::RAW,
            mode: IngestMode::Raw(range),
        }
    }

    pub fn processed() -> Self {
        Self {
            columns: ColumnMap::PROCESSED,
            mode: IngestMode::Processed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub ingested_rows: usize,
    pub out_of_range_rows: usize,
    pub parse_errors: usize,
    pub filled_entries: usize,
}

/// Aggregate already-extracted rows.
///
/// An invalid month in raw mode aborts with [`DataError::InvalidMonth`]
/// since the range check cannot order it.
pub fn ingest<I>(rows: I, mode: &IngestMode) -> Result<(CrimeData, LoadReport), DataError>
where
    I: IntoIterator<Item = IncidentRow>,
{
    let mut data = CrimeData::new();
    let mut report = LoadReport::default();

    match mode {
        IngestMode::Raw(range) => {
            for row in rows {
                report.total_rows += 1;
                let date = YearMonth::new(row.year, row.month);
                if check_date_in_range(range.start, range.end, date)? {
                    data.increment_crime(
                        &row.crime_type,
                        &row.neighbourhood,
                        row.year,
                        row.month,
                        1,
                    );
                    report.ingested_rows += 1;
                } else {
                    report.out_of_range_rows += 1;
                }
            }
            report.filled_entries = data.fill_gaps(*range);
        }
        IngestMode::Processed => {
            for row in rows {
                report.total_rows += 1;
                data.increment_crime(
                    &row.crime_type,
                    &row.neighbourhood,
                    row.year,
                    row.month,
                    row.occurrences,
                );
                report.ingested_rows += 1;
            }
        }
    }

    debug!(
        rows = report.total_rows,
        entries = data.len(),
        filled = report.filled_entries,
        "ingested rows"
    );
    Ok((data, report))
}

/// Read a headered CSV from any reader and aggregate it.
///
/// Rows that cannot be read or whose columns do not extract are skipped and
/// counted in `parse_errors`.
pub fn read_crime_data<R: Read>(
    reader: R,
    options: &LoadOptions,
) -> Result<(CrimeData, LoadReport), DataError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut rows: Vec<IncidentRow> = Vec::new();

    for result in rdr.records() {
        total_rows += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(row = total_rows, error = %e, "skipping unreadable row");
                parse_errors += 1;
                continue;
            }
        };
        match options.columns.extract(&record) {
            Ok(row) => rows.push(row),
            Err(e) => {
                warn!(row = total_rows, error = %e, "skipping malformed row");
                parse_errors += 1;
            }
        }
    }

    let (data, mut report) = ingest(rows, &options.mode)?;
    report.total_rows = total_rows;
    report.parse_errors = parse_errors;
    Ok((data, report))
}

pub fn build_crime_data(
    path: impl AsRef<Path>,
    options: &LoadOptions,
) -> Result<(CrimeData, LoadReport), DataError> {
    let path = path.as_ref();
    info!(path = %path.display(), mode = ?options.mode, "loading crime data");
    let file = std::fs::File::open(path)?;
    let (data, report) = read_crime_data(file, options)?;
    info!(
        rows = report.total_rows,
        ingested = report.ingested_rows,
        skipped = report.parse_errors,
        entries = data.len(),
        "loaded crime data"
    );
    Ok((data, report))
}

/// Load a dataset previously written by `convert`.
pub fn load_processed(path: impl AsRef<Path>) -> Result<(CrimeData, LoadReport), DataError> {
    build_crime_data(path, &LoadOptions::processed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{export, write_csv};
    use crate::types::CrimeCountRow;
    use std::io::Write;
    use tempfile::tempdir;

    const RAW_HEADER: &str =
        "TYPE,YEAR,MONTH,DAY,HOUR,MINUTE,HUNDRED_BLOCK,NEIGHBOURHOOD,X,Y\n";

    fn raw_range() -> DateRange {
        DateRange::new(YearMonth::new(2003, 1), YearMonth::new(2003, 3))
    }

    fn incident(crime_type: &str, neighbourhood: &str, year: i32, month: u32) -> IncidentRow {
        IncidentRow {
            crime_type: crime_type.to_string(),
            neighbourhood: neighbourhood.to_string(),
            year,
            month,
            occurrences: 1,
        }
    }

    fn row(crime_type: &str, neighbourhood: &str, year: i32, month: u32, count: u64) -> CrimeCountRow {
        CrimeCountRow {
            crime_type: crime_type.to_string(),
            neighbourhood: neighbourhood.to_string(),
            year,
            month,
            count,
        }
    }

    #[test]
    fn raw_rows_are_counted_and_gap_filled() {
        let rows = vec![
            incident("Theft", "X", 2003, 1),
            incident("Theft", "X", 2003, 1),
            incident("Theft", "X", 2003, 3),
        ];
        let (data, report) = ingest(rows, &IngestMode::Raw(raw_range())).unwrap();

        assert_eq!(
            export(&data),
            vec![
                row("Theft", "X", 2003, 1, 2),
                row("Theft", "X", 2003, 2, 0),
                row("Theft", "X", 2003, 3, 1),
            ]
        );
        assert_eq!(report.ingested_rows, 3);
        assert_eq!(report.filled_entries, 1);
    }

    #[test]
    fn raw_mode_drops_rows_outside_range() {
        let rows = vec![
            incident("Theft", "X", 2002, 12),
            incident("Theft", "X", 2003, 2),
            incident("Theft", "X", 2003, 4),
            incident("Mischief", "Y", 2004, 1),
        ];
        let (data, report) = ingest(rows, &IngestMode::Raw(raw_range())).unwrap();

        assert_eq!(report.out_of_range_rows, 3);
        assert_eq!(data.pairs(), vec![("Theft".to_string(), "X".to_string())]);
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn raw_mode_ignores_explicit_counts() {
        let mut r = incident("Theft", "X", 2003, 1);
        r.occurrences = 40;
        let (data, _) = ingest(vec![r], &IngestMode::Raw(raw_range())).unwrap();
        assert_eq!(data.get("Theft", "X", 2003, 1), Some(1));
    }

    #[test]
    fn raw_mode_fails_on_invalid_month() {
        let rows = vec![incident("Theft", "X", 2003, 13)];
        let err = ingest(rows, &IngestMode::Raw(raw_range())).unwrap_err();
        assert!(matches!(err, DataError::InvalidMonth { month: 13, .. }));
    }

    #[test]
    fn processed_mode_adds_counts_without_filling() {
        let mut a = incident("Theft", "X", 2003, 1);
        a.occurrences = 5;
        let mut b = incident("Theft", "X", 2003, 3);
        b.occurrences = 0;
        let (data, report) = ingest(vec![a, b], &IngestMode::Processed).unwrap();

        assert_eq!(data.get("Theft", "X", 2003, 1), Some(5));
        assert_eq!(data.get("Theft", "X", 2003, 2), None);
        assert_eq!(data.get("Theft", "X", 2003, 3), Some(0));
        assert_eq!(report.filled_entries, 0);
    }

    #[test]
    fn reads_raw_csv_by_position() {
        let csv = format!(
            "{RAW_HEADER}\
             Theft of Bicycle,2003,1,4,10,0,10XX ALBERNI ST,West End,491000,5459000\n\
             Theft of Bicycle,2003,3,9,11,30,10XX ALBERNI ST,West End,491000,5459000\n\
             Mischief,2003,2,1,0,0,1XX E HASTINGS ST,Strathcona,492000,5458000\n"
        );
        let (data, report) = read_crime_data(csv.as_bytes(), &LoadOptions::raw(raw_range())).unwrap();

        assert_eq!(report.total_rows, 3);
        assert_eq!(report.parse_errors, 0);
        assert_eq!(data.get("Theft of Bicycle", "West End", 2003, 2), Some(0));
        assert_eq!(data.series("Mischief", "Strathcona").len(), 3);
        assert_eq!(data.total_occurrences(), 3);
    }

    #[test]
    fn short_or_non_numeric_rows_are_skipped() {
        let csv = format!(
            "{RAW_HEADER}\
             Theft,2003,1,4,10,0,BLOCK,West End,0,0\n\
             Theft,2003,1\n\
             Theft,two thousand,1,4,10,0,BLOCK,West End,0,0\n"
        );
        let (data, report) = read_crime_data(csv.as_bytes(), &LoadOptions::raw(raw_range())).unwrap();

        assert_eq!(report.total_rows, 3);
        assert_eq!(report.parse_errors, 2);
        assert_eq!(data.get("Theft", "West End", 2003, 1), Some(1));
    }

    #[test]
    fn rows_with_blank_labels_are_skipped() {
        let csv = format!(
            "{RAW_HEADER}\
             Offence Against a Person,2003,1,1,0,0,OFFSET TO PROTECT PRIVACY,,0,0\n\
             ,2003,2,1,0,0,BLOCK,West End,0,0\n\
             Theft,2003,2,1,0,0,BLOCK,  ,0,0\n\
             Theft,2003,1,4,10,0,BLOCK,West End,0,0\n"
        );
        let (data, report) = read_crime_data(csv.as_bytes(), &LoadOptions::raw(raw_range())).unwrap();

        assert_eq!(report.total_rows, 4);
        assert_eq!(report.parse_errors, 3);
        assert_eq!(data.pairs(), vec![("Theft".to_string(), "West End".to_string())]);
        assert!(export(&data)
            .iter()
            .all(|r| !r.neighbourhood.is_empty() && !r.crime_type.is_empty()));
    }

    #[test]
    fn blank_neighbourhood_is_an_empty_field_error() {
        let record = StringRecord::from(vec!["Theft", "2003", "1", "", "", "", "", " "]);
        let err = ColumnMap::RAW.extract(&record).unwrap_err();
        assert!(matches!(err, DataError::EmptyField { column: "neighbourhood" }));
    }

    #[test]
    fn processed_rows_with_fractional_count_are_skipped() {
        let csv = "crime_type,neighbourhood,year,month,count\n\
                   Theft,X,2003,1,2\n\
                   Theft,X,2003,2,2.5\n\
                   Theft,X,2003,3,1\n";
        let (data, report) = read_crime_data(csv.as_bytes(), &LoadOptions::processed()).unwrap();

        assert_eq!(report.parse_errors, 1);
        assert_eq!(
            export(&data),
            vec![row("Theft", "X", 2003, 1, 2), row("Theft", "X", 2003, 3, 1)]
        );
    }

    #[test]
    fn convert_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let raw_path = dir.path().join("raw.csv");
        let processed_path = dir.path().join("processed.csv");

        let mut f = std::fs::File::create(&raw_path).unwrap();
        write!(
            f,
            "{RAW_HEADER}\
             Theft,2003,1,1,0,0,B,X,0,0\n\
             Theft,2003,1,2,0,0,B,X,0,0\n\
             Theft,2003,3,2,0,0,B,X,0,0\n\
             Mischief,2003,2,2,0,0,B,Y,0,0\n"
        )
        .unwrap();
        drop(f);

        let (raw, _) = build_crime_data(&raw_path, &LoadOptions::raw(raw_range())).unwrap();
        write_csv(&processed_path, &export(&raw)).unwrap();
        let (loaded, report) = load_processed(&processed_path).unwrap();

        assert_eq!(loaded, raw);
        assert_eq!(report.total_rows, 6);
        assert_eq!(report.parse_errors, 0);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let err = load_processed(dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, DataError::Io(_)));
    }
}
