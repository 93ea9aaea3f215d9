use crate::loader::{ColumnMap, LoadOptions};
use crate::types::{DateRange, YearMonth};
use crate::util::parse_year_month;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_RAW_PATH: &str = "pre-processed-crime-data-vancouver.csv";
pub const DEFAULT_PROCESSED_PATH: &str = "crime_data_vancouver.csv";
pub const DEFAULT_START: YearMonth = YearMonth::new(2003, 1);
pub const DEFAULT_END: YearMonth = YearMonth::new(2021, 11);

#[derive(Parser)]
#[command(name = "crime_series")]
#[command(about = "Aggregate crime incident records into gap-filled monthly series")]
#[command(version)]
pub struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Without a command the interactive menu is shown
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Aggregate a raw per-incident export into a processed dataset
    Convert(ConvertArgs),

    /// Load a processed dataset and preview its first rows
    Load {
        /// Processed CSV to read
        #[arg(short, long, default_value = DEFAULT_PROCESSED_PATH)]
        input: PathBuf,

        /// Number of rows to print
        #[arg(long, default_value_t = 5)]
        preview: usize,
    },

    /// Generate summary reports from a processed dataset
    Report(ReportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Raw incident CSV
    #[arg(short, long, default_value = DEFAULT_RAW_PATH)]
    pub input: PathBuf,

    /// Where the processed CSV is written
    #[arg(short, long, default_value = DEFAULT_PROCESSED_PATH)]
    pub output: PathBuf,

    /// First month kept (YYYY-MM)
    #[arg(long, default_value = "2003-01", value_parser = parse_year_month)]
    pub start: YearMonth,

    /// Last month kept (YYYY-MM)
    #[arg(long, default_value = "2021-11", value_parser = parse_year_month)]
    pub end: YearMonth,

    /// Column positions: crime_type,year,month,neighbourhood
    #[arg(long, default_value = "0,1,2,7", value_parser = parse_column_map)]
    pub columns: ColumnMap,
}

impl Default for ConvertArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_RAW_PATH),
            output: PathBuf::from(DEFAULT_PROCESSED_PATH),
            start: DEFAULT_START,
            end: DEFAULT_END,
            columns: ColumnMap::RAW,
        }
    }
}

impl ConvertArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            columns: self.columns,
            ..LoadOptions::raw(DateRange::new(self.start, self.end))
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Processed CSV to read
    #[arg(short, long, default_value = DEFAULT_PROCESSED_PATH)]
    pub input: PathBuf,

    /// Directory receiving the report CSVs and summary.json
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
}

impl Default for ReportArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_PROCESSED_PATH),
            out_dir: PathBuf::from("."),
        }
    }
}

/// Parse `crime_type,year,month,neighbourhood` positions; a fifth value
/// names an explicit count column.
pub fn parse_column_map(s: &str) -> Result<ColumnMap, String> {
    let positions = s
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid column position in {s:?}: {e}"))?;
    match positions.as_slice() {
        &[crime_type, year, month, neighbourhood] => Ok(ColumnMap {
            crime_type,
            year,
            month,
            neighbourhood,
            occurrences: None,
        }),
        &[crime_type, year, month, neighbourhood, count] => Ok(ColumnMap {
            crime_type,
            year,
            month,
            neighbourhood,
            occurrences: Some(count),
        }),
        _ => Err(format!("expected 4 or 5 column positions, got {}", positions.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::IngestMode;

    #[test]
    fn defaults_match_raw_preset() {
        let cli = Cli::try_parse_from(["crime_series", "convert"]).unwrap();
        let Some(Command::Convert(args)) = cli.command else {
            panic!("expected convert");
        };
        let defaults = ConvertArgs::default();
        assert_eq!(args.start, defaults.start);
        assert_eq!(args.end, defaults.end);
        assert_eq!(args.columns, ColumnMap::RAW);
        assert_eq!(args.input, defaults.input);
    }

    #[test]
    fn convert_accepts_range_and_columns() {
        let cli = Cli::try_parse_from([
            "crime_series",
            "--log-level",
            "debug",
            "convert",
            "--start",
            "2010-06",
            "--end",
            "2011/02",
            "--columns",
            "3,0,1,2",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        let Some(Command::Convert(args)) = cli.command else {
            panic!("expected convert");
        };
        let options = args.load_options();
        assert_eq!(
            options.mode,
            IngestMode::Raw(DateRange::new(YearMonth::new(2010, 6), YearMonth::new(2011, 2)))
        );
        assert_eq!(options.columns.crime_type, 3);
        assert_eq!(options.columns.neighbourhood, 2);
    }

    #[test]
    fn convert_rejects_bad_month() {
        assert!(Cli::try_parse_from(["crime_series", "convert", "--start", "2003-13"]).is_err());
    }

    #[test]
    fn column_map_with_count() {
        assert_eq!(parse_column_map("0,2,3,1,4").unwrap(), ColumnMap::PROCESSED);
        assert!(parse_column_map("0,1,2").is_err());
        assert!(parse_column_map("0,x,2,7").is_err());
    }

    #[test]
    fn no_command_means_interactive() {
        let cli = Cli::try_parse_from(["crime_series"]).unwrap();
        assert!(cli.command.is_none());
    }
}
