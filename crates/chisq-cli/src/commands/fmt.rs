use super::{describe, json_pretty, write_atomic, EXIT_FAILURE, EXIT_SUCCESS};
use chisq_schema::{parse_manifest_str, ManifestError};
use std::path::Path;

/// Canonical TOML for a manifest: every default written out, labels trimmed,
/// method names in their canonical spelling.
fn canonical(source: &str) -> Result<String, ManifestError> {
    parse_manifest_str(source)?
        .normalize()?
        .to_manifest()
        .to_toml_string()
}

pub fn run(manifest: &Path, check: bool, json: bool) -> Result<u8, String> {
    let original = std::fs::read_to_string(manifest)
        .map_err(|e| describe(ManifestError::Io(e)))?;
    let formatted = canonical(&original).map_err(describe)?;
    let is_canonical = formatted == original;
    let rewrite = !is_canonical && !check;

    if rewrite {
        write_atomic(manifest, &formatted)?;
    }

    if json {
        let payload = serde_json::json!({
            "path": manifest.display().to_string(),
            "canonical": is_canonical,
            "rewritten": rewrite,
        });
        println!("{}", json_pretty(&payload)?);
    } else if is_canonical {
        println!("{} is already canonical", manifest.display());
    } else if rewrite {
        println!("formatted {}", manifest.display());
    } else {
        println!("{} is not canonical (run `chisq fmt`)", manifest.display());
    }

    Ok(if check && !is_canonical {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    })
}
