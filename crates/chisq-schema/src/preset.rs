use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub manifest: &'static str,
}

pub const BUILTIN_PRESETS: &[Preset] = &[
    Preset {
        name: "minimal",
        description: "Inline 2x2 table with default settings",
        manifest: r#"manifest_version = 1

[table]
rows = ["group_a", "group_b"]
columns = ["yes", "no"]
counts = [[20, 30], [35, 15]]
"#,
    },
    Preset {
        name: "pairwise",
        description: "Inline 3x3 table, pairwise row comparisons with Benjamini-Hochberg FDR",
        manifest: r#"manifest_version = 1

[analysis]
alpha = 0.05
correction = "fdr_bh"
post_hoc = "pairwise"
axis = "rows"

[table]
rows = ["control", "drug_a", "drug_b"]
columns = ["improved", "unchanged", "worse"]
counts = [[18, 22, 20], [35, 15, 10], [28, 20, 12]]
"#,
    },
    Preset {
        name: "residuals",
        description: "Cell-wise adjusted standardized residuals with Holm correction",
        manifest: r#"manifest_version = 1

[analysis]
alpha = 0.05
correction = "holm"
post_hoc = "residuals"

[table]
rows = ["urban", "suburban", "rural"]
columns = ["bus", "car", "bike"]
counts = [[45, 30, 25], [20, 60, 20], [10, 70, 5]]
"#,
    },
    Preset {
        name: "observations",
        description: "Observation-level CSV cross-tabulated on two named fields",
        manifest: r#"manifest_version = 1

[analysis]
correction = "fdr_bh"
post_hoc = "pairwise"

[data]
path = "observations.csv"
format = "observations"
row_field = "group"
column_field = "outcome"
"#,
    },
];

pub fn get_preset(name: &str) -> Option<&'static Preset> {
    BUILTIN_PRESETS.iter().find(|p| p.name == name)
}

pub fn list_presets() -> &'static [Preset] {
    BUILTIN_PRESETS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_manifest_str;

    #[test]
    fn all_presets_parse_and_normalize() {
        for preset in BUILTIN_PRESETS {
            let manifest = parse_manifest_str(preset.manifest)
                .unwrap_or_else(|e| panic!("preset '{}' failed to parse: {e}", preset.name));
            manifest
                .normalize()
                .unwrap_or_else(|e| panic!("preset '{}' failed to normalize: {e}", preset.name));
        }
    }

    #[test]
    fn get_preset_finds_known() {
        assert!(get_preset("pairwise").is_some());
        assert!(get_preset("residuals").is_some());
    }

    #[test]
    fn get_preset_returns_none_for_unknown() {
        assert!(get_preset("nonexistent").is_none());
    }

    #[test]
    fn list_presets_returns_all() {
        let presets = list_presets();
        assert_eq!(presets.len(), BUILTIN_PRESETS.len());
        assert!(presets.len() >= 4);
    }

    #[test]
    fn preset_names_are_unique() {
        let mut names: Vec<&str> = BUILTIN_PRESETS.iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), BUILTIN_PRESETS.len());
    }
}
