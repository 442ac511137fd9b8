use super::{describe, json_pretty, write_atomic, EXIT_SUCCESS};
use chisq_schema::{get_preset, list_presets, parse_manifest_str, ManifestV1};
use dialoguer::Confirm;
use std::io::{stderr, stdin, IsTerminal};
use std::path::Path;

const DEST_MANIFEST: &str = "chisq.toml";

fn load_template(name: &str) -> Result<ManifestV1, String> {
    let preset = get_preset(name).ok_or_else(|| {
        let known: Vec<&str> = list_presets().iter().map(|p| p.name).collect();
        format!("unknown template '{name}' (expected: {})", known.join(", "))
    })?;
    parse_manifest_str(preset.manifest).map_err(|e| format!("template parse error: {e}"))
}

fn ensure_can_write(dest: &Path, force: bool, is_tty: bool) -> Result<(), String> {
    if !dest.exists() || force {
        return Ok(());
    }
    if !is_tty {
        return Err(format!(
            "refusing to overwrite existing ./{DEST_MANIFEST} (pass --force)"
        ));
    }
    let overwrite = Confirm::new()
        .with_prompt(format!("overwrite ./{DEST_MANIFEST}?"))
        .default(false)
        .interact()
        .map_err(|e| format!("prompt failed: {e}"))?;
    if overwrite {
        Ok(())
    } else {
        Err(format!(
            "refusing to overwrite existing ./{DEST_MANIFEST} (pass --force)"
        ))
    }
}

fn render(name: &str, template: &str) -> Result<String, String> {
    let mut manifest = load_template(template)?;
    let name = name.trim();
    manifest.analysis.name = (!name.is_empty()).then(|| name.to_owned());
    // Validate before anything is written.
    manifest.normalize().map_err(describe)?;
    manifest.to_toml_string().map_err(describe)
}

pub fn run(name: &str, template: &str, force: bool, json: bool) -> Result<u8, String> {
    let dest = Path::new(DEST_MANIFEST);
    let is_tty = stdin().is_terminal() && stderr().is_terminal();

    let content = render(name, template)?;
    ensure_can_write(dest, force, is_tty)?;
    write_atomic(dest, &content)?;

    if json {
        let payload = serde_json::json!({
            "status": "written",
            "path": format!("./{DEST_MANIFEST}"),
            "name": name,
            "template": template,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("wrote ./{DEST_MANIFEST} for '{name}'");
        println!("template: {template}");
    }
    Ok(EXIT_SUCCESS)
}
