use crate::independence::{chi2_contingency, ChiSquareResult, LOW_EXPECTED};
use crate::input::load_table;
use crate::posthoc::{run_post_hoc, PostHocReport};
use crate::table::ContingencyTable;
use crate::CoreError;
use chisq_schema::{
    compute_analysis_id, parse_manifest_file, AnalysisId, Axis, CorrectionMethod,
    NormalizedAnalysis, PostHocMethod, ShortId, Statistic,
};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Share of cells with an expected frequency below [`LOW_EXPECTED`] that
/// triggers a sparse-table warning.
const SPARSE_CELL_SHARE: f64 = 0.2;

/// Settings for one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisOptions {
    pub alpha: f64,
    pub correction: CorrectionMethod,
    pub post_hoc: PostHocMethod,
    pub axis: Axis,
    pub statistic: Statistic,
    pub yates: bool,
    /// Run the post-hoc battery even when the omnibus test is not significant.
    pub always_post_hoc: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            correction: CorrectionMethod::default(),
            post_hoc: PostHocMethod::default(),
            axis: Axis::default(),
            statistic: Statistic::default(),
            yates: true,
            always_post_hoc: false,
        }
    }
}

impl From<&NormalizedAnalysis> for AnalysisOptions {
    fn from(n: &NormalizedAnalysis) -> Self {
        Self {
            alpha: n.alpha,
            correction: n.correction,
            post_hoc: n.post_hoc,
            axis: n.axis,
            statistic: n.statistic,
            yates: n.yates,
            always_post_hoc: n.always_post_hoc,
        }
    }
}

impl AnalysisOptions {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.alpha > 0.0 && self.alpha < 1.0 {
            Ok(())
        } else {
            Err(CoreError::InvalidAlpha(self.alpha))
        }
    }
}

/// Labels, counts, and margins of the analysed table.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TableSummary {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub counts: Vec<Vec<u64>>,
    pub row_totals: Vec<u64>,
    pub column_totals: Vec<u64>,
    pub total: u64,
}

impl From<&ContingencyTable> for TableSummary {
    fn from(table: &ContingencyTable) -> Self {
        Self {
            rows: table.rows().to_vec(),
            columns: table.columns().to_vec(),
            counts: table.counts().to_vec(),
            row_totals: table.row_totals(),
            column_totals: table.column_totals(),
            total: table.total(),
        }
    }
}

/// Everything one analysis produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Set when the analysis came from a manifest.
    pub analysis_id: Option<AnalysisId>,
    pub short_id: Option<ShortId>,
    pub name: Option<String>,
    pub options: AnalysisOptions,
    pub table: TableSummary,
    pub omnibus: ChiSquareResult,
    /// Omnibus p-value is at most alpha.
    pub significant: bool,
    pub post_hoc: Option<PostHocReport>,
    /// Why no post-hoc battery ran, when none did.
    pub post_hoc_skipped: Option<String>,
    pub warnings: Vec<String>,
}

/// Runs the omnibus test and, when warranted, the corrected post-hoc battery.
pub struct Analyzer {
    options: AnalysisOptions,
}

impl Analyzer {
    pub fn new(options: AnalysisOptions) -> Result<Self, CoreError> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn run(&self, table: &ContingencyTable) -> Result<AnalysisReport, CoreError> {
        let options = &self.options;
        info!(
            "analysing {}x{} table (n = {}) with {} statistic",
            table.n_rows(),
            table.n_columns(),
            table.total(),
            options.statistic
        );

        let omnibus = chi2_contingency(table, options.statistic, options.yates)?;
        let significant = omnibus.p_value <= options.alpha;
        info!(
            "omnibus: statistic {:.4}, dof {}, p {:.4e}, {}",
            omnibus.statistic,
            omnibus.dof,
            omnibus.p_value,
            if significant { "significant" } else { "not significant" }
        );

        let mut warnings = expected_frequency_warnings(&omnibus);

        let (post_hoc, post_hoc_skipped) = if options.post_hoc == PostHocMethod::None {
            (None, Some("post-hoc method is 'none'".to_owned()))
        } else if !significant && !options.always_post_hoc {
            let reason = format!(
                "omnibus p-value {:.4e} is above alpha {}",
                omnibus.p_value, options.alpha
            );
            debug!("skipping post-hoc: {reason}");
            (None, Some(reason))
        } else {
            let report = run_post_hoc(table, options)?;
            if let Some(report) = &report {
                for comparison in report.findings.degenerate() {
                    warnings.push(format!(
                        "comparison {} has fewer than 2 non-empty categories; reported with p = 1",
                        comparison.label()
                    ));
                }
            }
            (report, None)
        };

        for warning in &warnings {
            warn!("{warning}");
        }

        Ok(AnalysisReport {
            analysis_id: None,
            short_id: None,
            name: None,
            options: *options,
            table: TableSummary::from(table),
            omnibus,
            significant,
            post_hoc,
            post_hoc_skipped,
            warnings,
        })
    }

    /// Parse, normalize, load, and analyse the manifest at `manifest_path`.
    pub fn run_manifest(manifest_path: &Path) -> Result<AnalysisReport, CoreError> {
        info!("running analysis from {}", manifest_path.display());
        let normalized = parse_manifest_file(manifest_path)?.normalize()?;
        let base_dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));
        analyze(&normalized, base_dir)
    }
}

fn expected_frequency_warnings(omnibus: &ChiSquareResult) -> Vec<String> {
    let mut warnings = Vec::new();
    let below_one = omnibus.expected.iter().flatten().filter(|&&e| e < 1.0).count();
    if below_one > 0 {
        warnings.push(format!(
            "{below_one} cell(s) have an expected frequency below 1 (minimum {:.3}); \
             the chi-square approximation is unreliable",
            omnibus.min_expected
        ));
    }
    let share = omnibus.low_expected_fraction();
    if share > SPARSE_CELL_SHARE {
        warnings.push(format!(
            "{} of {} cells ({:.0}%) have an expected frequency below {LOW_EXPECTED}",
            omnibus.low_expected_cells,
            omnibus.cells(),
            share * 100.0
        ));
    }
    warnings
}

/// Analyse a normalized manifest; CSV sources are resolved against `base_dir`.
pub fn analyze(
    normalized: &NormalizedAnalysis,
    base_dir: &Path,
) -> Result<AnalysisReport, CoreError> {
    let identity = compute_analysis_id(normalized)?;
    debug!(
        "analysis id {} ({})",
        identity.analysis_id, identity.short_id
    );

    let table = load_table(&normalized.source, base_dir)?;
    let analyzer = Analyzer::new(AnalysisOptions::from(normalized))?;
    let mut report = analyzer.run(&table)?;
    report.analysis_id = Some(identity.analysis_id);
    report.short_id = Some(identity.short_id);
    report.name.clone_from(&normalized.name);
    Ok(report)
}

/// Shorthand for [`Analyzer::run_manifest`].
pub fn analyze_manifest(manifest_path: &Path) -> Result<AnalysisReport, CoreError> {
    Analyzer::run_manifest(manifest_path)
}
