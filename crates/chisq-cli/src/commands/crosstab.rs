use super::{describe, json_pretty, print_report, AnalysisArgs, EXIT_SUCCESS};
use chisq_core::{read_observations_csv, Analyzer};
use chisq_schema::parse_delimiter;
use std::path::Path;

pub fn run(
    csv: &Path,
    row_field: &str,
    column_field: &str,
    delimiter: &str,
    args: &AnalysisArgs,
    json: bool,
) -> Result<u8, String> {
    let delimiter = parse_delimiter(Some(delimiter)).map_err(|_| {
        format!("--delimiter must be a single ASCII character or \\t, got '{delimiter}'")
    })?;
    let analyzer = Analyzer::new(args.options()).map_err(describe)?;
    let table = read_observations_csv(csv, row_field, column_field, delimiter).map_err(describe)?;
    let mut report = analyzer.run(&table).map_err(describe)?;
    report.name = Some(format!("{row_field} x {column_field}"));

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(EXIT_SUCCESS)
}
