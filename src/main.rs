// Entry point and high-level CLI flow.
//
// - `convert` reads the raw incident export, keeps the requested months,
//   fills gaps and writes the processed dataset.
// - `load` reads a processed dataset back and previews it.
// - `report` writes three summary reports and a JSON summary.
// - Without a command an interactive menu offers the same actions and
//   keeps the loaded aggregate between them.
mod cli;
mod error;
mod loader;
mod logging;
mod output;
mod reports;
mod store;
mod types;
mod util;

use clap::Parser;
use cli::{Cli, Command, ConvertArgs, ReportArgs};
use error::DataError;
use loader::LoadReport;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Mutex, PoisonError};
use store::CrimeData;

// Aggregate shared between menu actions so a dataset is converted or
// loaded once and reported on many times.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { data: None }));

struct AppState {
    data: Option<CrimeData>,
}

fn print_load_report(report: &LoadReport, data: &CrimeData) {
    println!(
        "Processing dataset... ({} rows read, {} ingested, {} outside range)",
        util::format_int(report.total_rows),
        util::format_int(report.ingested_rows),
        util::format_int(report.out_of_range_rows)
    );
    if report.parse_errors > 0 {
        println!(
            "Note: {} rows skipped due to parse/validation errors.",
            util::format_int(report.parse_errors)
        );
    }
    if report.filled_entries > 0 {
        println!(
            "Info: Filled {} empty months.",
            util::format_int(report.filled_entries)
        );
    }
    if data.is_empty() {
        println!("Warning: no entries were aggregated.");
    }
    println!(
        "{} monthly entries across {} series.\n",
        util::format_int(data.len()),
        util::format_int(data.pairs().len())
    );
}

fn run_convert(args: &ConvertArgs) -> Result<CrimeData, DataError> {
    let (data, report) = loader::build_crime_data(&args.input, &args.load_options())?;
    print_load_report(&report, &data);
    let rows = output::export(&data);
    output::write_csv(&args.output, &rows)?;
    output::preview_table_rows(&rows, 3);
    println!("(Full table exported to {})\n", args.output.display());
    Ok(data)
}

fn run_load(input: &Path, preview: usize) -> Result<CrimeData, DataError> {
    let (data, report) = loader::load_processed(input)?;
    print_load_report(&report, &data);
    output::preview_table_rows(&output::export(&data), preview);
    Ok(data)
}

fn run_reports(data: &CrimeData, out_dir: &Path) -> Result<(), DataError> {
    println!("Generating reports...");
    println!("Outputs saved to individual files...\n");

    let r1 = reports::generate_crime_type_summary(data);
    let file1 = out_dir.join("report1_crime_type_summary.csv");
    output::write_csv(&file1, &r1)?;
    println!("Report 1: Crime Type Summary");
    println!("(Sorted by total occurrences)\n");
    output::preview_table_rows(&r1, 3);
    println!("(Full table exported to {})\n", file1.display());

    let r2 = reports::generate_neighbourhood_ranking(data);
    let file2 = out_dir.join("report2_neighbourhood_ranking.csv");
    output::write_csv(&file2, &r2)?;
    println!("Report 2: Neighbourhood Ranking");
    println!("(Top 15 by total occurrences)\n");
    output::preview_table_rows(&r2, 3);
    println!("(Full table exported to {})\n", file2.display());

    let r3 = reports::generate_annual_trends(data);
    let file3 = out_dir.join("report3_annual_trends.csv");
    output::write_csv(&file3, &r3)?;
    println!("Report 3: Annual Crime Type Trends");
    println!("(Grouped by Year and CrimeType)\n");
    output::preview_table_rows(&r3, 3);
    println!("(Full table exported to {})\n", file3.display());

    let summary = reports::generate_summary(data);
    output::write_json(out_dir.join("summary.json"), &summary)?;
    println!("Summary Stats (summary.json):");
    println!(
        "{{\"total_occurrences\": {}, \"series\": {}}}\n",
        util::format_int(summary.total_occurrences),
        util::format_int(summary.total_series)
    );
    Ok(())
}

/// Read a single line of input after printing the "Enter choice:" prompt.
/// Returns `None` once stdin is closed.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Ask whether to go back to the menu after generating reports.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        match io::stdin().read_line(&mut buf) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn store_data(data: CrimeData) {
    let mut state = APP_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    state.data = Some(data);
}

fn handle_convert() {
    match run_convert(&ConvertArgs::default()) {
        Ok(data) => store_data(data),
        Err(e) => {
            tracing::error!(error = %e, "conversion failed");
            eprintln!("Failed to convert file: {}\n", e);
        }
    }
}

fn handle_load() {
    match run_load(Path::new(cli::DEFAULT_PROCESSED_PATH), 3) {
        Ok(data) => store_data(data),
        Err(e) => {
            tracing::error!(error = %e, "load failed");
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

fn handle_generate_reports() {
    let data = {
        let state = APP_STATE.lock().unwrap_or_else(PoisonError::into_inner);
        state.data.clone()
    };
    let Some(data) = data else {
        println!("Error: No data loaded. Please convert or load a dataset first (option 1 or 2).\n");
        return;
    };
    if let Err(e) = run_reports(&data, &ReportArgs::default().out_dir) {
        tracing::error!(error = %e, "report generation failed");
        eprintln!("Write error: {}", e);
    }
}

fn interactive() {
    loop {
        println!("Select Action:");
        println!("[1] Convert raw dataset");
        println!("[2] Load processed dataset");
        println!("[3] Generate Reports\n");
        let Some(choice) = read_choice() else {
            println!("Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => handle_convert(),
            "2" => handle_load(),
            "3" => {
                println!();
                handle_generate_reports();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
}

fn run(command: Command) -> Result<(), DataError> {
    match command {
        Command::Convert(args) => run_convert(&args).map(|_| ()),
        Command::Load { input, preview } => run_load(&input, preview).map(|_| ()),
        Command::Report(args) => {
            let (data, _) = loader::load_processed(&args.input)?;
            run_reports(&data, &args.out_dir)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let Some(command) = cli.command else {
        interactive();
        return ExitCode::SUCCESS;
    };
    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
