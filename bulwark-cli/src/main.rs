use anyhow::{Context, Result};
use bulwark::{build_agent, session, BatchReport, CallAgent, Contact};
use bulwark_config::{BulwarkConfig, ConfigLoader};
use bulwark_logging::{init_tracing, LoggingConfig};
use bulwark_resilience::FailureKind;
use bulwark_services::FailureSchedule;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::{self, BufReader};
use tracing::{debug, error, info, warn};

mod cli;

use cli::{Cli, Commands, ConfigCommands};

/// Load configuration from file or use defaults
fn load_config(config_path: Option<&PathBuf>) -> Result<BulwarkConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if path.exists() {
                info!("Loading configuration from: {:?}", path);
                loader
                    .from_file(path)
                    .context(format!("Failed to load configuration from {:?}", path))
            } else {
                warn!("Configuration file not found: {:?}. Using defaults.", path);
                loader
                    .from_env()
                    .context("Failed to load configuration from environment")
            }
        }
        None => {
            debug!("No configuration file specified. Loading from environment or defaults.");
            loader
                .from_env()
                .context("Failed to load configuration from environment")
        }
    }
}

fn handle_config_validate(config_file: &Path) -> Result<()> {
    info!("Validating configuration file: {:?}", config_file);

    if !config_file.exists() {
        return Err(anyhow::anyhow!(
            "Configuration file not found: {:?}",
            config_file
        ));
    }

    match ConfigLoader::new().from_file(config_file) {
        Ok(_config) => {
            println!("Configuration file is valid");
            Ok(())
        }
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            Err(e).context("Configuration validation failed")
        }
    }
}

fn handle_config_generate(output: Option<&Path>, force: bool) -> Result<()> {
    let sample = BulwarkConfig::generate_sample();

    let Some(output) = output else {
        print!("{}", sample);
        return Ok(());
    };

    if output.exists() && !force {
        return Err(anyhow::anyhow!(
            "Output file already exists: {:?}. Use --force to overwrite.",
            output
        ));
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    fs::write(output, sample).context("Failed to write configuration file")?;
    println!("Configuration written to {:?}", output);
    Ok(())
}

fn read_contacts(path: &Path) -> Result<Vec<Contact>> {
    let content = fs::read_to_string(path).context(format!("Failed to read {:?}", path))?;
    serde_yaml::from_str(&content).context(format!("Failed to parse contacts in {:?}", path))
}

fn print_report(report: &BatchReport) {
    println!();
    println!(
        "Batch finished: {} completed, {} skipped ({:.0}% success)",
        report.completed.len(),
        report.failed.len(),
        report.success_rate() * 100.0
    );
    for call in &report.completed {
        println!(
            "  ok    {:24} {:16} {} bytes of audio",
            call.contact.name, call.contact.phone, call.audio_bytes
        );
    }
    for call in &report.failed {
        println!(
            "  skip  {:24} {:16} {}",
            call.contact.name, call.contact.phone, call.error
        );
    }
}

async fn run_call(
    agent: &CallAgent,
    name: String,
    phone: String,
    outage: Option<(u32, FailureKind)>,
) -> Result<()> {
    if let Some((count, kind)) = outage {
        if agent.simulate_speech_outage(FailureSchedule::first_calls(count, kind)) {
            println!("Test mode: first {} speech requests fail with {}", count, kind);
        }
    }

    let contact = Contact::new(name, phone);
    match agent.make_call(&contact).await {
        Ok(outcome) => {
            println!("Call to {} completed", outcome.contact.name);
            println!("  Script: {}", outcome.script);
            println!("  Audio:  {} bytes (voice {})", outcome.audio_bytes, outcome.voice_id);
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("Call to {} failed", contact.name))),
    }
}

async fn run_demo(agent: &CallAgent) -> Result<()> {
    let contacts = [
        Contact::new("Alice Johnson", "+1-555-1001"),
        Contact::new("Bob Martinez", "+1-555-1002"),
        Contact::new("Carol Zhang", "+1-555-1003"),
    ];

    agent.reset();
    let mut report = BatchReport::default();
    for (idx, contact) in contacts.iter().enumerate() {
        let schedule = if idx == 0 {
            FailureSchedule::first_calls(3, FailureKind::ServiceUnavailable)
        } else {
            FailureSchedule::Never
        };
        if !agent.simulate_speech_outage(schedule) {
            return Err(anyhow::anyhow!("The demo requires services.mode = simulated"));
        }

        let mut single = agent.run_batch(std::slice::from_ref(contact)).await;
        report.completed.append(&mut single.completed);
        report.failed.append(&mut single.failed);
    }

    print_report(&report);
    println!();
    print!("{}", agent.system_status());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration commands work on files directly
    if let Commands::Config { config_cmd } = &cli.command {
        let logging = LoggingConfig {
            level: cli.log_level.clone().unwrap_or_else(|| "warn".to_string()),
            ..LoggingConfig::default()
        };
        init_tracing(&logging)?;

        return match config_cmd {
            ConfigCommands::Validate { config_file } => handle_config_validate(config_file),
            ConfigCommands::Generate { output, force } => {
                handle_config_generate(output.as_deref(), *force)
            }
        };
    }

    let mut config = load_config(cli.config.as_ref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config.logging)?;
    info!("Bulwark starting");

    let agent = build_agent(&config)?;

    let result = match cli.command {
        Commands::Call {
            name,
            phone,
            simulate_outage,
            failure,
        } => {
            agent.start_health_monitoring();
            run_call(&agent, name, phone, simulate_outage.map(|n| (n, failure.into()))).await
        }
        Commands::Batch { file, json } => {
            let contacts = read_contacts(&file)?;
            agent.start_health_monitoring();
            let report = agent.run_batch(&contacts).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(())
        }
        Commands::Demo => {
            agent.start_health_monitoring();
            run_demo(&agent).await
        }
        Commands::Status { json } => {
            agent.health().check_now().await;
            let status = agent.system_status();
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print!("{}", status);
            }
            Ok(())
        }
        Commands::Session => {
            agent.start_health_monitoring();
            println!("Interactive session, type 'help' for commands");
            session::run(&agent, BufReader::new(io::stdin()), io::stdout())
                .await
                .context("Session I/O failed")
        }
        Commands::Config { .. } => Ok(()),
    };

    agent.shutdown().await;
    result
}
