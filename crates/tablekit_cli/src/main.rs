//! # tablekit
//!
//! Command-line front end for `tablekit_export`.
//!
//! ```bash
//! # Export records through a job config
//! tablekit export --config job.toml --records rows.json --out-dir out/
//!
//! # Validate a config and print the planned columns
//! tablekit check --config job.toml
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::info;

use tablekit_export::{
    EnumBackendKind, EnumColumnRule, Exporter, Record, load_export_config, plan_column_widths,
    records_from_ipc_bytes, records_from_json_bytes,
};

/// tablekit - declarative spreadsheet export
#[derive(Parser)]
#[command(name = "tablekit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export records to an .xlsx document
    Export {
        /// Job config file (.toml or .json)
        #[arg(short, long)]
        config: PathBuf,

        /// Records file: JSON array of objects, or Arrow IPC (.arrow/.ipc/.feather)
        #[arg(short, long)]
        records: PathBuf,

        /// Backend override: rich | streaming (legacy: php_spreadsheet | xls_writer)
        #[arg(short, long)]
        backend: Option<EnumBackendKind>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Validate a job config and print its columns
    Check {
        /// Job config file (.toml or .json)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Export {
            config,
            records,
            backend,
            out_dir,
        } => run_export(&config, &records, backend, &out_dir),
        Commands::Check { config } => run_check(&config),
    }
}

fn run_export(
    path_config: &Path,
    path_records: &Path,
    backend: Option<EnumBackendKind>,
    dir_out: &Path,
) -> Result<()> {
    let cfg = load_export_config(path_config)
        .with_context(|| format!("failed to load config {}", path_config.display()))?;
    let kind = backend.unwrap_or_else(|| cfg.backend_kind());
    let options = cfg.options.clone();

    let records = load_records(path_records)?;
    info!("loaded {} records from {}", records.len(), path_records.display());

    let job = cfg.into_job(records).context("invalid column schema")?;
    let doc = Exporter::new(kind)
        .with_options(options)
        .run(job)
        .context("export failed")?;

    fs::create_dir_all(dir_out)
        .with_context(|| format!("failed to create {}", dir_out.display()))?;
    let path_out = dir_out.join(&doc.file_name);
    fs::write(&path_out, &doc.bytes)
        .with_context(|| format!("failed to write {}", path_out.display()))?;

    for c_warning in &doc.report.warnings {
        eprintln!("warning: {c_warning}");
    }
    println!("{}", doc.report);
    println!("wrote {} ({} bytes)", path_out.display(), doc.bytes.len());
    Ok(())
}

fn run_check(path_config: &Path) -> Result<()> {
    let cfg = load_export_config(path_config)
        .with_context(|| format!("failed to load config {}", path_config.display()))?;
    let schema = cfg.schema().context("invalid column schema")?;
    let l_widths = plan_column_widths(&schema, &cfg.options.policy_autofit);

    println!(
        "{:?} -> {:?} ({} backend)",
        cfg.title,
        cfg.file_name,
        cfg.backend_kind()
    );
    for (n_col, column) in schema.columns().iter().enumerate() {
        let c_width = l_widths
            .iter()
            .find(|(n_idx, _)| usize::from(*n_idx) == n_col)
            .map(|(_, n_width)| format!("{n_width:.1}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>3}  {:<24} {:<16} width={:<6} type={:?} rule={}{}",
            n_col,
            column.key,
            column.title,
            c_width,
            column.value_type,
            derive_rule_name(&column.rule),
            if column.summary { " summary" } else { "" }
        );
    }
    Ok(())
}

fn derive_rule_name(rule: &EnumColumnRule) -> &'static str {
    match rule {
        EnumColumnRule::Index => "index",
        EnumColumnRule::Computed(_) => "computed",
        EnumColumnRule::Dictionary(_) => "dictionary",
        EnumColumnRule::Raw => "raw",
    }
}

/// Read records by file extension.
fn load_records(path: &Path) -> Result<Vec<Record>> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let c_ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let records = match c_ext.as_str() {
        "json" => records_from_json_bytes(&bytes)?,
        "arrow" | "ipc" | "feather" => records_from_ipc_bytes(&bytes)?,
        _ => bail!("unsupported records file: {}", path.display()),
    };
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_records_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"[{"name": "A"}, {"name": "B"}]"#).unwrap();
        let l_records = load_records(file.path()).unwrap();
        assert_eq!(l_records.len(), 2);

        let file_csv = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        assert!(load_records(file_csv.path()).is_err());
    }

    #[test]
    fn test_cli_parses_backend_names() {
        let cli = Cli::try_parse_from([
            "tablekit", "export", "-c", "job.toml", "-r", "rows.json", "-b", "xls_writer", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Export { backend, .. } => {
                assert_eq!(backend, Some(EnumBackendKind::Streaming))
            }
            Commands::Check { .. } => panic!("expected export command"),
        }

        assert!(Cli::try_parse_from(["tablekit", "check"]).is_err());
    }

    #[test]
    fn test_export_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        let path_config = dir.path().join("job.toml");
        fs::write(
            &path_config,
            "title = \"T\"\nname = \"out\"\n[columns._index]\ntitle = \"No.\"\n[columns.name]\ntitle = \"Name\"\n",
        )
        .unwrap();
        let path_records = dir.path().join("rows.json");
        fs::write(&path_records, r#"[{"name": "A"}]"#).unwrap();

        run_export(&path_config, &path_records, None, dir.path()).unwrap();
        assert!(dir.path().join("out.xlsx").exists());
        run_check(&path_config).unwrap();
    }
}
