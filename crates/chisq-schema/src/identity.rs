use crate::manifest::ManifestError;
use crate::normalize::NormalizedAnalysis;
use crate::types::{AnalysisId, ShortId};
use serde::Serialize;

/// Deterministic identity of an analysis, derived from its normalized manifest.
///
/// Two manifests that differ only in whitespace, alias spelling, or whether a
/// default is written out share the same identity, so reports produced from
/// either can be matched to each other.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AnalysisIdentity {
    pub analysis_id: AnalysisId,
    pub short_id: ShortId,
}

/// Hash the canonical JSON of `normalized`.
///
/// JSON quoting delimits every label and field, so distinct analyses cannot
/// share an input to the hasher.
pub fn compute_analysis_id(
    normalized: &NormalizedAnalysis,
) -> Result<AnalysisIdentity, ManifestError> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"chisq-analysis:");
    hasher.update(normalized.canonical_json()?.as_bytes());

    let hex = hasher.finalize().to_hex().to_string();
    let short = hex[..12].to_owned();

    Ok(AnalysisIdentity {
        analysis_id: AnalysisId::new(hex),
        short_id: ShortId::new(short),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_manifest_str;

    fn normalized(input: &str) -> NormalizedAnalysis {
        parse_manifest_str(input).unwrap().normalize().unwrap()
    }

    #[test]
    fn stable_id_for_equivalent_manifests() {
        let a = normalized(
            r#"
manifest_version = 1
[analysis]
correction = "BH"
[table]
rows = ["a", "b"]
columns = ["x", "y"]
counts = [[1, 2], [3, 4]]
"#,
        );
        let b = normalized(
            r#"
manifest_version = 1
[analysis]
alpha = 0.050
correction = "fdr_bh"
post_hoc = "pairwise"
yates = true
[table]
rows = ["a", "b"]
columns = [" x", "y "]
counts = [[1, 2], [3, 4]]
"#,
        );
        assert_eq!(compute_analysis_id(&a).unwrap(), compute_analysis_id(&b).unwrap());
    }

    #[test]
    fn different_counts_produce_different_ids() {
        let a = normalized(
            "manifest_version = 1\n[table]\nrows = [\"a\", \"b\"]\ncolumns = [\"x\", \"y\"]\ncounts = [[1, 2], [3, 4]]\n",
        );
        let b = normalized(
            "manifest_version = 1\n[table]\nrows = [\"a\", \"b\"]\ncolumns = [\"x\", \"y\"]\ncounts = [[1, 2], [3, 5]]\n",
        );
        assert_ne!(compute_analysis_id(&a).unwrap(), compute_analysis_id(&b).unwrap());
    }

    #[test]
    fn correction_change_changes_id() {
        let a = normalized(
            "manifest_version = 1\n[analysis]\ncorrection = \"holm\"\n[table]\nrows = [\"a\", \"b\"]\ncolumns = [\"x\", \"y\"]\ncounts = [[1, 2], [3, 4]]\n",
        );
        let b = normalized(
            "manifest_version = 1\n[analysis]\ncorrection = \"hochberg\"\n[table]\nrows = [\"a\", \"b\"]\ncolumns = [\"x\", \"y\"]\ncounts = [[1, 2], [3, 4]]\n",
        );
        assert_ne!(compute_analysis_id(&a).unwrap(), compute_analysis_id(&b).unwrap());
    }

    fn inline(rows: &str, columns: &str) -> NormalizedAnalysis {
        normalized(&format!(
            "manifest_version = 1\n[table]\nrows = {rows}\ncolumns = {columns}\n\
             counts = [[1, 2], [3, 4]]\n"
        ))
    }

    #[test]
    fn label_boundaries_are_part_of_the_id() {
        let a = inline(r#"["a", "brow:c"]"#, r#"["x", "y"]"#);
        let b = inline(r#"["arow:b", "c"]"#, r#"["x", "y"]"#);
        assert_ne!(compute_analysis_id(&a).unwrap(), compute_analysis_id(&b).unwrap());

        let a = inline(r#"["a", "b"]"#, r#"["x", "y"]"#);
        let b = inline(r#"["a", "b"]"#, r#"["x", "y"]"#);
        assert_eq!(compute_analysis_id(&a).unwrap(), compute_analysis_id(&b).unwrap());
    }

    #[test]
    fn short_id_is_12_chars() {
        let n = normalized(
            "manifest_version = 1\n[data]\npath = \"t.csv\"\nformat = \"table\"\n",
        );
        let id = compute_analysis_id(&n).unwrap();
        assert_eq!(id.short_id.as_str().len(), 12);
        assert!(id.analysis_id.as_str().starts_with(id.short_id.as_str()));
    }
}
