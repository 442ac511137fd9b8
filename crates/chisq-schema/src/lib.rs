//! Analysis manifests, normalization, and analysis identity for chisq.
//!
//! This crate defines the schema layer: TOML manifest parsing (`ManifestV1`),
//! the validated representation handed to the engine (`NormalizedAnalysis`),
//! deterministic analysis identity (`compute_analysis_id`), the method enums
//! shared across the workspace, and built-in manifest presets.

pub mod identity;
pub mod manifest;
pub mod normalize;
pub mod package;
pub mod preset;
pub mod types;

pub use identity::{compute_analysis_id, AnalysisIdentity};
pub use manifest::{
    parse_manifest_file, parse_manifest_str, AnalysisSection, DataSection, ManifestError,
    ManifestV1, TableSection,
};
pub use normalize::{parse_delimiter, NormalizedAnalysis, TableSource};
pub use package::{
    package_info, PackageInfo, HOMEPAGE, LICENSE, PACKAGE_DESCRIPTION, PACKAGE_NAME,
    PACKAGE_VERSION, PURPOSE,
};
pub use preset::{get_preset, list_presets, Preset, BUILTIN_PRESETS};
pub use types::{
    AnalysisId, Axis, CorrectionMethod, DataFormat, PostHocMethod, ShortId, Statistic,
    UnknownVariant,
};
