// citymerge CLI - config-driven municipal dataset merging

mod exit_codes;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use citymerge_recon::config::DatasetShape;
use citymerge_recon::dataset::{find_duplicate_keys, from_dict, from_list, ExtractOptions};
use citymerge_recon::{PipelineConfig, PipelineInput};

use exit_codes::{EXIT_DUPLICATE, EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "citymerge")]
#[command(about = "Merge inconsistently-keyed municipal JSON datasets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a merge pipeline from a TOML config file
    #[command(after_help = "\
Examples:
  citymerge run pipeline.toml
  citymerge run pipeline.toml --json
  citymerge run pipeline.toml --output cities_merged.json")]
    Run {
        /// Path to the pipeline .toml config file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file (overrides [output] in the config)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a pipeline config without running
    Validate {
        /// Path to the pipeline .toml config file
        config: PathBuf,
    },

    /// Report display names that collapse to the same normalized key
    #[command(after_help = "\
Examples:
  citymerge check-dupes pipeline.toml cities")]
    CheckDupes {
        /// Path to the pipeline .toml config file
        config: PathBuf,

        /// Declared dataset to scan
        dataset: String,
    },
}

#[derive(Debug)]
struct CliError {
    code: u8,
    message: String,
}

fn err(code: u8, message: impl Into<String>) -> CliError {
    CliError {
        code,
        message: message.into(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, json, output } => cmd_run(config, json, output),
        Commands::Validate { config } => cmd_validate(config),
        Commands::CheckDupes { config, dataset } => cmd_check_dupes(config, &dataset),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("error: {}", e.message);
            ExitCode::from(e.code)
        }
    }
}

fn load_config(config_path: &Path) -> Result<PipelineConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| err(EXIT_RUNTIME, format!("cannot read config: {e}")))?;
    PipelineConfig::from_toml(&config_str).map_err(|e| err(EXIT_INVALID_CONFIG, e.to_string()))
}

/// Load every declared dataset file, relative to the config's directory.
fn load_input(config: &PipelineConfig, base_dir: &Path) -> Result<PipelineInput, CliError> {
    let mut datasets: HashMap<String, serde_json::Value> = HashMap::new();
    for (name, dataset_config) in &config.datasets {
        let path = base_dir.join(&dataset_config.file);
        let data = std::fs::read_to_string(&path)
            .map_err(|e| err(EXIT_RUNTIME, format!("cannot read {}: {e}", path.display())))?;
        let value: serde_json::Value = serde_json::from_str(&data)
            .map_err(|e| err(EXIT_RUNTIME, format!("{}: invalid JSON: {e}", path.display())))?;
        datasets.insert(name.clone(), value);
    }
    Ok(PipelineInput { datasets })
}

fn cmd_run(config_path: PathBuf, json_output: bool, output_file: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let base_dir = config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let input = load_input(&config, &base_dir)?;

    let result = citymerge_recon::run(&config, &input)
        .map_err(|e| err(EXIT_RUNTIME, e.to_string()))?;

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| err(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;

    // --output wins over the config's [output] section.
    let target = output_file.or_else(|| config.output.json.as_ref().map(|f| base_dir.join(f)));
    if let Some(ref path) = target {
        std::fs::write(path, &json_str)
            .map_err(|e| err(EXIT_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr, one line per step plus the misses.
    for step in &result.steps {
        eprintln!(
            "step '{}': {} matched, {} unmatched left, {} unmatched right, {} ambiguous",
            step.step, step.matched, step.unmatched_left, step.unmatched_right, step.ambiguous,
        );
        for name in &step.unmatched_left_names {
            eprintln!("  missing in '{}': {}", step.right, name);
        }
    }
    eprintln!(
        "pipeline '{}': {} entities merged over {} step(s)",
        result.meta.config_name,
        result.entities.len(),
        result.steps.len(),
    );

    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "valid: pipeline '{}' with {} dataset(s), {} step(s)",
        config.name,
        config.datasets.len(),
        config.steps.len(),
    );
    Ok(())
}

fn cmd_check_dupes(config_path: PathBuf, dataset_name: &str) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let dataset_config = config
        .datasets
        .get(dataset_name)
        .ok_or_else(|| err(EXIT_USAGE, format!("dataset '{dataset_name}' not declared in config")))?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let path = base_dir.join(&dataset_config.file);
    let data = std::fs::read_to_string(&path)
        .map_err(|e| err(EXIT_RUNTIME, format!("cannot read {}: {e}", path.display())))?;
    let value: serde_json::Value = serde_json::from_str(&data)
        .map_err(|e| err(EXIT_RUNTIME, format!("{}: invalid JSON: {e}", path.display())))?;

    let opts = ExtractOptions {
        name_field: dataset_config.name_field.clone(),
        payload_key: dataset_config.payload_key.clone(),
        strip_suffix: dataset_config.strip_suffix.clone(),
        markers: dataset_config.markers,
    };
    let dataset = match dataset_config.shape {
        DatasetShape::List => from_list(dataset_name, &value, &opts),
        DatasetShape::Dict => from_dict(dataset_name, &value, &opts),
    }
    .map_err(|e| err(EXIT_RUNTIME, e.to_string()))?;

    let dupes = find_duplicate_keys(&dataset);
    if dupes.is_empty() {
        eprintln!("no duplicates in '{dataset_name}' ({} entities)", dataset.len());
        return Ok(());
    }

    for (key, names) in &dupes {
        eprintln!("'{key}' appears {} times: {}", names.len(), names.join(", "));
    }
    Err(err(
        EXIT_DUPLICATE,
        format!("{} duplicate key(s) in '{dataset_name}'", dupes.len()),
    ))
}
