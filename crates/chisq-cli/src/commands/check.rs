use super::{describe, json_pretty, EXIT_SUCCESS};
use chisq_core::load_table;
use chisq_schema::{compute_analysis_id, package_info, parse_manifest_file, TableSource};
use console::Style;
use std::path::Path;

pub fn run(manifest: &Path, json: bool) -> Result<u8, String> {
    let normalized = parse_manifest_file(manifest)
        .and_then(|m| m.normalize())
        .map_err(describe)?;
    let identity = compute_analysis_id(&normalized).map_err(describe)?;

    let base_dir = manifest.parent().unwrap_or_else(|| Path::new("."));
    let table = load_table(&normalized.source, base_dir).map_err(describe)?;

    if json {
        let payload = serde_json::json!({
            "analysis_id": identity.analysis_id,
            "short_id": identity.short_id,
            "analysis": normalized,
            "table": {
                "rows": table.rows(),
                "columns": table.columns(),
                "total": table.total(),
            },
            "package": package_info(),
        });
        println!("{}", json_pretty(&payload)?);
        return Ok(EXIT_SUCCESS);
    }

    let ok = Style::new().green().bold();
    println!("{} {}", ok.apply_to("valid:"), manifest.display());
    println!("analysis_id: {}", identity.analysis_id);
    println!("short_id:    {}", identity.short_id);
    if let Some(name) = &normalized.name {
        println!("name:        {name}");
    }
    println!("alpha:       {}", normalized.alpha);
    println!(
        "correction:  {} ({})",
        normalized.correction,
        normalized.correction.describe()
    );
    println!("post_hoc:    {} over {}", normalized.post_hoc, normalized.axis);
    println!(
        "statistic:   {}{}",
        normalized.statistic,
        if normalized.yates { ", Yates on 2x2" } else { "" }
    );
    match &normalized.source {
        TableSource::Inline { .. } => println!("source:      inline table"),
        TableSource::Csv { path, format, .. } => println!("source:      {path} ({format})"),
    }
    println!(
        "table:       {} x {}, n = {}",
        table.n_rows(),
        table.n_columns(),
        table.total()
    );
    Ok(EXIT_SUCCESS)
}
