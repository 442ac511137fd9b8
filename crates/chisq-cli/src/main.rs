mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{AnalysisArgs, EXIT_DATA_ERROR, EXIT_FAILURE, EXIT_MANIFEST_ERROR};
use chisq_core::{CorrectionMethod, Statistic};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "chisq", version, about = chisq_schema::PURPOSE)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a new chisq.toml from a template.
    New {
        /// Analysis name recorded in the manifest.
        name: String,
        /// Template to start from (see `chisq templates`).
        #[arg(long, default_value = "minimal")]
        template: String,
        /// Overwrite an existing chisq.toml without asking.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Run the analysis described by a manifest.
    Run {
        /// Path to manifest TOML file.
        #[arg(default_value = "chisq.toml")]
        manifest: PathBuf,
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Validate a manifest and its data, and print the analysis id.
    Check {
        /// Path to manifest TOML file.
        #[arg(default_value = "chisq.toml")]
        manifest: PathBuf,
    },
    /// Rewrite a manifest in canonical form.
    Fmt {
        /// Path to manifest TOML file.
        #[arg(default_value = "chisq.toml")]
        manifest: PathBuf,
        /// Exit non-zero instead of rewriting when the manifest is not canonical.
        #[arg(long, default_value_t = false)]
        check: bool,
    },
    /// Cross-tabulate an observation CSV and analyse it without a manifest.
    Crosstab {
        /// Observation file, one record per observation.
        csv: PathBuf,
        /// Field whose values become table rows.
        #[arg(long)]
        rows: String,
        /// Field whose values become table columns.
        #[arg(long)]
        columns: String,
        /// Field delimiter (a single ASCII character, or \t).
        #[arg(long, default_value = ",")]
        delimiter: String,
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Goodness-of-fit test of observed counts, with corrected residuals.
    Gof {
        /// Observed counts, comma-separated.
        #[arg(long, required = true, value_delimiter = ',')]
        observed: Vec<u64>,
        /// Expected counts (or proportions with --proportions); uniform if omitted.
        #[arg(long, value_delimiter = ',')]
        expected: Option<Vec<f64>>,
        /// Interpret --expected as proportions summing to 1.
        #[arg(long, default_value_t = false, requires = "expected")]
        proportions: bool,
        /// Category labels, comma-separated.
        #[arg(long, value_delimiter = ',')]
        labels: Option<Vec<String>>,
        /// Degrees of freedom lost to parameters estimated from the data.
        #[arg(long, default_value_t = 0)]
        ddof: usize,
        /// Test statistic.
        #[arg(long, default_value_t = Statistic::default())]
        statistic: Statistic,
        /// Correction applied to the residual p-values.
        #[arg(long, default_value_t = CorrectionMethod::default())]
        correction: CorrectionMethod,
        /// Family-wise significance level.
        #[arg(long, default_value_t = 0.05)]
        alpha: f64,
    },
    /// Apply a multiple-comparison correction to a list of p-values.
    Correct {
        /// Raw p-values, comma-separated.
        #[arg(long = "p", required = true, value_delimiter = ',', allow_negative_numbers = true)]
        p_values: Vec<f64>,
        /// Correction method.
        #[arg(long, default_value_t = CorrectionMethod::default())]
        method: CorrectionMethod,
        /// Family-wise significance level.
        #[arg(long, default_value_t = 0.05)]
        alpha: f64,
    },
    /// List built-in manifest templates.
    Templates,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CHISQ_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;

    let result = match cli.command {
        Commands::New {
            name,
            template,
            force,
        } => commands::new::run(&name, &template, force, json_output),
        Commands::Run { manifest, analysis } => {
            commands::run::run(&manifest, &analysis, json_output)
        }
        Commands::Check { manifest } => commands::check::run(&manifest, json_output),
        Commands::Fmt { manifest, check } => commands::fmt::run(&manifest, check, json_output),
        Commands::Crosstab {
            csv,
            rows,
            columns,
            delimiter,
            analysis,
        } => commands::crosstab::run(&csv, &rows, &columns, &delimiter, &analysis, json_output),
        Commands::Gof {
            observed,
            expected,
            proportions,
            labels,
            ddof,
            statistic,
            correction,
            alpha,
        } => commands::gof::run(
            &commands::gof::GofRequest {
                observed,
                expected,
                proportions,
                labels,
                ddof,
                statistic,
                correction,
                alpha,
            },
            json_output,
        ),
        Commands::Correct {
            p_values,
            method,
            alpha,
        } => commands::correct::run(&p_values, method, alpha, json_output),
        Commands::Templates => commands::templates::run(json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("manifest error:")
                || msg.starts_with("failed to parse manifest")
                || msg.starts_with("failed to read manifest")
            {
                EXIT_MANIFEST_ERROR
            } else if msg.starts_with("data error:") {
                EXIT_DATA_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
