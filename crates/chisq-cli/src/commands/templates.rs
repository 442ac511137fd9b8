use super::{json_pretty, EXIT_SUCCESS};
use chisq_schema::list_presets;
use console::Style;

pub fn run(json: bool) -> Result<u8, String> {
    let presets = list_presets();
    if json {
        println!("{}", json_pretty(&presets)?);
        return Ok(EXIT_SUCCESS);
    }
    let name_style = Style::new().cyan().bold();
    let width = presets.iter().map(|p| p.name.len()).max().unwrap_or(0);
    for preset in presets {
        println!(
            "{}  {}",
            name_style.apply_to(format!("{:<width$}", preset.name)),
            preset.description
        );
    }
    Ok(EXIT_SUCCESS)
}
