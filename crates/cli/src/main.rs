// cdrecon CLI - run CDR reconciliation jobs from TOML job files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cdrecon_engine::{EngineError, JobInput};

mod export;
mod job_file;

use job_file::JobFile;

// Exit codes are part of the shell contract; scripts rely on them.
const EXIT_SUCCESS: u8 = 0;
/// Discrepancies found. Like diff(1), exit 1 means "the sides differ."
const EXIT_DISCREPANCIES: u8 = 1;
/// Bad arguments or an unreadable/invalid job file.
const EXIT_USAGE: u8 = 2;
/// Input or decode failure reported by the engine.
const EXIT_INPUT: u8 = 3;
/// A policy limit (file size, row count) was exceeded.
const EXIT_LIMIT: u8 = 4;
/// Engine runtime failure.
const EXIT_RUNTIME: u8 = 5;

#[derive(Parser)]
#[command(name = "cdrecon")]
#[command(about = "Reconcile two CDR exports and report billing discrepancies")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reconciliation job described by a TOML job file
    #[command(after_help = "\
Examples:
  cdrecon run job.toml
  cdrecon run job.toml --json
  cdrecon run job.toml --output result.json --export discrepancies.csv")]
    Run {
        /// Path to the job file
        job: PathBuf,

        /// Print the full result as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Write the full JSON result to a file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the discrepancy sample as CSV
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Validate a job file without running it
    Validate {
        /// Path to the job file
        job: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            job,
            json,
            output,
            export,
        } => cmd_run(job, json, output, export),
        Commands::Validate { job } => cmd_validate(job),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError {
            code,
            message,
            hint,
        }) => {
            eprintln!("error: {message}");
            if let Some(hint) = hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(code)
        }
    }
}

struct CliError {
    code: u8,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn usage(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_USAGE,
            message: msg.into(),
            hint: None,
        }
    }

    fn runtime(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_RUNTIME,
            message: msg.into(),
            hint: None,
        }
    }

    fn from_engine(e: EngineError) -> Self {
        let code = match &e {
            EngineError::Input(_) | EngineError::Decode(_) => EXIT_INPUT,
            EngineError::Limit(_) => EXIT_LIMIT,
            EngineError::Internal(_) => EXIT_RUNTIME,
        };
        Self {
            code,
            message: e.to_string(),
            hint: None,
        }
    }
}

fn load_job(path: &Path) -> Result<(JobFile, JobInput), CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("cannot read {}: {e}", path.display())))?;
    let job = JobFile::from_toml(&text).map_err(|e| CliError {
        code: EXIT_USAGE,
        message: format!("invalid job file: {e}"),
        hint: Some("expected [yours] and [provider] tables, each with a file and [*.columns] mapping".into()),
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let input = job.to_job_input(base_dir);
    Ok((job, input))
}

fn cmd_run(
    job_path: PathBuf,
    json: bool,
    output: Option<PathBuf>,
    export: Option<PathBuf>,
) -> Result<(), CliError> {
    let (job, input) = load_job(&job_path)?;

    let result = cdrecon_engine::reconcile(&input).map_err(CliError::from_engine)?;

    if json || output.is_some() {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;
        if let Some(ref path) = output {
            std::fs::write(path, &json_str)
                .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }
        if json {
            println!("{json_str}");
        }
    }

    if let Some(ref path) = export {
        export::write_csv(&result, path)
            .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }

    // Human summary to stderr.
    let s = &result.summary;
    if let Some(ref name) = job.name {
        eprintln!("job '{name}' ({})", result.job_id);
    }
    eprintln!(
        "{} + {} records, {} matched; {} discrepancies, impact ${:.2}",
        s.total_records_a,
        s.total_records_b,
        s.matched_records,
        s.total_discrepancies,
        s.monetary_impact,
    );
    if s.hung_calls_in_yours + s.hung_calls_in_provider > 0 {
        eprintln!(
            "hung calls: {} yours in {} group(s), {} provider in {} group(s)",
            s.hung_calls_in_yours,
            s.hung_call_groups_yours,
            s.hung_calls_in_provider,
            s.hung_call_groups_provider,
        );
    }
    if result.has_more {
        eprintln!(
            "showing {} of {} discrepancies",
            result.discrepancies.len(),
            result.total_discrepancy_count,
        );
    }

    if s.total_discrepancies > 0 {
        return Err(CliError {
            code: EXIT_DISCREPANCIES,
            message: "discrepancies found".into(),
            hint: None,
        });
    }
    Ok(())
}

fn cmd_validate(job_path: PathBuf) -> Result<(), CliError> {
    let (job, input) = load_job(&job_path)?;

    for (label, path) in [
        ("yours", &input.file_a_path),
        ("provider", &input.file_b_path),
    ] {
        if !path.exists() {
            return Err(CliError::usage(format!(
                "{label} file {} does not exist",
                path.display()
            )));
        }
    }
    for name in [&input.file_a_declared_name, &input.file_b_declared_name] {
        if !has_supported_extension(name) {
            return Err(CliError::usage(format!(
                "'{name}' is not a csv, xlsx, xls, or zip file"
            )));
        }
    }

    eprintln!(
        "valid: job '{}' reconciles {} against {}",
        job.name.as_deref().unwrap_or("unnamed"),
        input.file_a_declared_name,
        input.file_b_declared_name,
    );
    Ok(())
}

fn has_supported_extension(name: &str) -> bool {
    matches!(
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("csv" | "xlsx" | "xls" | "zip")
    )
}
