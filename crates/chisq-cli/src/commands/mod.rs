pub mod check;
pub mod completions;
pub mod correct;
pub mod crosstab;
pub mod fmt;
pub mod gof;
pub mod man_pages;
pub mod new;
pub mod run;
pub mod templates;

use chisq_core::{
    AnalysisOptions, AnalysisReport, Axis, CoreError, CorrectionMethod, Findings, PostHocMethod,
    Statistic,
};
use chisq_schema::NormalizedAnalysis;
use clap::Args;
use console::Style;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_DATA_ERROR: u8 = 3;

/// Analysis settings that override the manifest (or the defaults).
#[derive(Debug, Clone, Default, Args)]
pub struct AnalysisArgs {
    /// Family-wise significance level.
    #[arg(long)]
    pub alpha: Option<f64>,
    /// Multiple-comparison correction for the post-hoc family.
    #[arg(long)]
    pub correction: Option<CorrectionMethod>,
    /// Post-hoc battery: pairwise, one_vs_rest, residuals, or none.
    #[arg(long)]
    pub post_hoc: Option<PostHocMethod>,
    /// Axis whose categories are compared.
    #[arg(long)]
    pub axis: Option<Axis>,
    /// Test statistic: pearson or log_likelihood.
    #[arg(long)]
    pub statistic: Option<Statistic>,
    /// Disable the continuity correction on 2x2 tables.
    #[arg(long, default_value_t = false)]
    pub no_yates: bool,
    /// Run the post-hoc battery even when the omnibus test is not significant.
    #[arg(long, default_value_t = false)]
    pub always_post_hoc: bool,
}

impl AnalysisArgs {
    pub fn apply(&self, analysis: &mut NormalizedAnalysis) {
        if let Some(alpha) = self.alpha {
            analysis.alpha = alpha;
        }
        if let Some(correction) = self.correction {
            analysis.correction = correction;
        }
        if let Some(post_hoc) = self.post_hoc {
            analysis.post_hoc = post_hoc;
        }
        if let Some(axis) = self.axis {
            analysis.axis = axis;
        }
        if let Some(statistic) = self.statistic {
            analysis.statistic = statistic;
        }
        if self.no_yates {
            analysis.yates = false;
        }
        if self.always_post_hoc {
            analysis.always_post_hoc = true;
        }
    }

    pub fn options(&self) -> AnalysisOptions {
        let defaults = AnalysisOptions::default();
        AnalysisOptions {
            alpha: self.alpha.unwrap_or(defaults.alpha),
            correction: self.correction.unwrap_or(defaults.correction),
            post_hoc: self.post_hoc.unwrap_or(defaults.post_hoc),
            axis: self.axis.unwrap_or(defaults.axis),
            statistic: self.statistic.unwrap_or(defaults.statistic),
            yates: defaults.yates && !self.no_yates,
            always_post_hoc: defaults.always_post_hoc || self.always_post_hoc,
        }
    }
}

/// Error message for `err`, prefixed so `main` can pick the exit code.
pub fn describe(err: impl Into<CoreError>) -> String {
    err.into().to_string()
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn write_atomic(dest: &Path, content: &str) -> Result<(), String> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| format!("write temp file: {e}"))?;
    use std::io::Write;
    tmp.write_all(content.as_bytes())
        .map_err(|e| format!("write temp file: {e}"))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| format!("fsync temp file: {e}"))?;
    tmp.persist(dest)
        .map_err(|e| format!("persist {}: {}", dest.display(), e.error))?;
    Ok(())
}

/// p-values in fixed notation down to 1e-4, scientific below.
pub fn format_p(p: f64) -> String {
    if p >= 1e-4 {
        format!("{p:.4}")
    } else {
        format!("{p:.3e}")
    }
}

pub fn colorize_verdict(reject: bool) -> String {
    if reject {
        Style::new().green().bold().apply_to("reject").to_string()
    } else {
        Style::new().dim().apply_to("-").to_string()
    }
}

pub fn print_warnings(warnings: &[String]) {
    let style = Style::new().yellow();
    for warning in warnings {
        eprintln!("{} {warning}", style.apply_to("warning:"));
    }
}

pub fn print_report(report: &AnalysisReport) {
    let bold = Style::new().bold();
    if let Some(name) = &report.name {
        match &report.short_id {
            Some(short_id) => println!("{} {name} ({short_id})", bold.apply_to("analysis:")),
            None => println!("{} {name}", bold.apply_to("analysis:")),
        }
    } else if let Some(short_id) = &report.short_id {
        println!("{} {short_id}", bold.apply_to("analysis:"));
    }

    let table = &report.table;
    println!(
        "{} {} x {}, n = {}",
        bold.apply_to("table:"),
        table.rows.len(),
        table.columns.len(),
        table.total
    );
    println!("  rows:    {}", table.rows.join(", "));
    println!("  columns: {}", table.columns.join(", "));

    let omnibus = &report.omnibus;
    let verdict = if report.significant {
        Style::new().green().bold().apply_to("significant").to_string()
    } else {
        Style::new().dim().apply_to("not significant").to_string()
    };
    println!(
        "{} {} = {:.4}, dof = {}, p = {}{}  {verdict}",
        bold.apply_to("omnibus:"),
        omnibus.statistic_kind,
        omnibus.statistic,
        omnibus.dof,
        format_p(omnibus.p_value),
        if omnibus.yates_applied { " (Yates)" } else { "" },
    );
    println!("cramers_v: {:.4}", omnibus.cramers_v);

    match &report.post_hoc {
        None => {
            if let Some(reason) = &report.post_hoc_skipped {
                println!("{} skipped: {reason}", bold.apply_to("post-hoc:"));
            }
        }
        Some(post_hoc) => {
            let over = post_hoc
                .axis
                .map_or_else(String::new, |axis| format!(" over {axis}"));
            println!(
                "{} {}{over}, {} at alpha {}: {} of {} rejected",
                bold.apply_to("post-hoc:"),
                post_hoc.method,
                post_hoc.correction,
                post_hoc.alpha,
                post_hoc.rejected,
                post_hoc.family_size
            );
            match &post_hoc.findings {
                Findings::Pairwise(items) | Findings::OneVsRest(items) => {
                    let width = items.iter().map(|c| c.label().len()).max().unwrap_or(0);
                    for c in items {
                        println!(
                            "  {:<width$}  stat {:>9.4}  dof {:>2}  p {:>10}  adj {:>10}  {}",
                            c.label(),
                            c.statistic,
                            c.dof,
                            format_p(c.p_value),
                            format_p(c.adjusted_p_value),
                            colorize_verdict(c.reject),
                        );
                    }
                }
                Findings::Residuals(cells) => {
                    let width = cells
                        .iter()
                        .map(|c| c.row.len() + c.column.len() + 3)
                        .max()
                        .unwrap_or(0);
                    for c in cells {
                        println!(
                            "  {:<width$}  obs {:>6}  exp {:>9.2}  z {:>8.3}  p {:>10}  adj {:>10}  {}",
                            format!("{} / {}", c.row, c.column),
                            c.observed,
                            c.expected,
                            c.residual,
                            format_p(c.p_value),
                            format_p(c.adjusted_p_value),
                            colorize_verdict(c.reject),
                        );
                    }
                }
            }
        }
    }

    print_warnings(&report.warnings);
}
