use super::{describe, json_pretty, print_report, AnalysisArgs, EXIT_SUCCESS};
use chisq_core::analyze;
use chisq_schema::parse_manifest_file;
use std::path::Path;
use tracing::debug;

pub fn run(manifest: &Path, args: &AnalysisArgs, json: bool) -> Result<u8, String> {
    let mut normalized = parse_manifest_file(manifest)
        .and_then(|m| m.normalize())
        .map_err(describe)?;
    args.apply(&mut normalized);
    debug!(
        "effective settings: alpha {}, {} correction, {} post-hoc over {}",
        normalized.alpha, normalized.correction, normalized.post_hoc, normalized.axis
    );

    let base_dir = manifest.parent().unwrap_or_else(|| Path::new("."));
    let report = analyze(&normalized, base_dir).map_err(describe)?;

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(EXIT_SUCCESS)
}
