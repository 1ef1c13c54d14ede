use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use subtext_installer::config::{self, ConfigOverrides, InstallerConfig};
use subtext_installer::utils::compute_hash;
use subtext_installer::{
    DirectoryScripts, InstallReport, InstallationState, Installer, ScriptCatalog, Version,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "subtext-installer.json";

/// Subtext Installer - installs and upgrades the weblog database schema
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(long, env = "SUBTEXT_INSTALLER_CONFIG", default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// SQLite database file to operate on
    #[arg(short, long, env = "SUBTEXT_DATABASE")]
    database: Option<PathBuf>,

    /// Directory of installation scripts (defaults to the compiled-in scripts)
    #[arg(long, env = "SUBTEXT_SCRIPTS_DIR")]
    scripts_dir: Option<PathBuf>,

    /// Version of the running application
    #[arg(long)]
    binary_version: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show whether the database needs installation or upgrade
    Status,
    /// Install the schema
    Install {
        /// Version to install (defaults to the binary version)
        #[arg(long)]
        version: Option<Version>,
    },
    /// Upgrade the schema to the binary version
    Upgrade,
    /// List the scripts selected for a version range
    Scripts {
        /// Exclusive lower bound
        #[arg(long)]
        from: Option<Version>,
        /// Inclusive upper bound
        #[arg(long)]
        to: Option<Version>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = config::resolve(
        &args.config,
        ConfigOverrides {
            database: args.database.clone(),
            scripts_dir: args.scripts_dir.clone(),
            binary_version: args.binary_version.clone(),
        },
    )
    .with_context(|| format!("failed to load config {}", args.config.display()))?;

    let catalog = build_catalog(&config);

    match args.command {
        Command::Scripts { from, to } => {
            list_scripts(&catalog, from.as_ref(), to.as_ref(), args.json)
        }
        Command::Status => {
            let installer = open_installer(&config, catalog)?;
            let state = installer.status()?;
            let current = installer.current_version()?;
            let binary_version = installer.binary_version();
            if args.json {
                println!(
                    "{}",
                    json!({
                        "state": state,
                        "currentVersion": current,
                        "binaryVersion": binary_version,
                    })
                );
            } else {
                let current = current.map_or_else(|| "none".to_string(), |v| v.to_string());
                println!("state: {}", describe(state));
                println!("installed version: {current}");
                println!("binary version: {binary_version}");
            }
            Ok(())
        }
        Command::Install { version } => {
            let mut installer = open_installer(&config, catalog)?;
            let target = version.unwrap_or_else(|| installer.binary_version().clone());
            let report = installer.install(&target)?;
            print_report(&report, args.json)
        }
        Command::Upgrade => {
            let mut installer = open_installer(&config, catalog)?;
            let report = installer.upgrade()?;
            print_report(&report, args.json)
        }
    }
}

fn open_installer(config: &InstallerConfig, catalog: ScriptCatalog) -> Result<Installer> {
    let binary_version = config.binary_version()?;
    let conn = Connection::open(&config.database)
        .with_context(|| format!("failed to open database {}", config.database.display()))?;

    info!(
        database = %config.database.display(),
        binary_version = %binary_version,
        "Installer ready"
    );

    Ok(Installer::new(conn, catalog, binary_version))
}

fn build_catalog(config: &InstallerConfig) -> ScriptCatalog {
    match &config.scripts_dir {
        Some(dir) => ScriptCatalog::new(Arc::new(DirectoryScripts::new(dir))),
        None => ScriptCatalog::embedded(),
    }
}

fn list_scripts(
    catalog: &ScriptCatalog,
    from: Option<&Version>,
    to: Option<&Version>,
    as_json: bool,
) -> Result<()> {
    let mut entries = Vec::new();
    for script in catalog.select_scripts(from, to)? {
        let checksum = compute_hash(&catalog.read(&script)?);
        entries.push((script.script_name().to_string(), checksum));
    }

    if as_json {
        let scripts: Vec<_> = entries
            .iter()
            .map(|(name, checksum)| json!({ "name": name, "sha256": checksum }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&scripts)?);
    } else {
        for (name, checksum) in &entries {
            println!("{name}  {checksum}");
        }
    }
    Ok(())
}

fn print_report(report: &InstallReport, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let from = report
        .from_version
        .as_ref()
        .map_or_else(|| "none".to_string(), |v| v.to_string());
    println!("installed {} (from {from})", report.to_version);
    for script in &report.scripts_applied {
        println!("  applied {script}");
    }
    Ok(())
}

fn describe(state: InstallationState) -> &'static str {
    match state {
        InstallationState::NeedsInstallation => "needs installation",
        InstallationState::NeedsUpgrade => "needs upgrade",
        InstallationState::Complete => "complete",
    }
}
