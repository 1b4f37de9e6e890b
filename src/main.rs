//! gmdl - Telegram group media downloader
//!
//! Command-line entry point.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use std::io;
use std::process::ExitCode;
use tracing::debug;

use gmdl::cli::{Cli, Commands, CompletionsArgs, ConfigArgs, DownloadArgs};
use gmdl::config::Config;
use gmdl::error::{GmdlError, format_gmdl_error};
use gmdl::export::ExportSession;
use gmdl::logging::{LogConfig, LogFormat, init_logging};
use gmdl::model::{DisqualifiedCaption, DownloadMode};
use gmdl::presets::{PresetList, RunParameters};
use gmdl::run::{DownloadRequest, RunSettings, has_files, run_with_session};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<GmdlError>() {
        Some(gmdl_err) => eprintln!("{}", format_gmdl_error(gmdl_err)),
        None => eprintln!("{} {err:#}", "✗".red().bold()),
    }
}

fn log_config(cli: &Cli, config: &Config) -> LogConfig {
    let mut log = LogConfig::for_cli(cli.quiet, cli.verbose);
    if !cli.quiet && !cli.verbose {
        if let Some(level) = config.logging.level.as_deref() {
            match LogConfig::parse_level(level) {
                Ok(level) => log.level = level,
                Err(e) => eprintln!("{} {e}", "warning:".yellow()),
            }
        }
    }
    if let Some(format) = config.logging.format.as_deref() {
        match format.parse::<LogFormat>() {
            Ok(format) => log.format = format,
            Err(e) => eprintln!("{} {e}", "warning:".yellow()),
        }
    }
    log.colors = config.output.colors;
    log.file.clone_from(&config.logging.file);
    log
}

async fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    if !config.output.colors {
        colored::control::set_override(false);
    }
    init_logging(&log_config(cli, &config))?;
    config.log_load();
    debug!(command = ?cli.command, "Starting");

    match &cli.command {
        Commands::Download(args) => cmd_download(cli, &config, args).await,
        Commands::Presets => cmd_presets(&config),
        Commands::Config(args) => cmd_config(&config, args),
        Commands::Completions(args) => cmd_completions(args),
    }
}

fn settings_for(cli: &Cli, config: &Config, args: &DownloadArgs) -> RunSettings {
    let mut settings = RunSettings::from_config(config);
    settings.policy.include_video |= args.include_video;
    settings.policy.include_animation |= args.include_animation;
    if args.keep_restricted_media {
        settings.on_disqualified = DisqualifiedCaption::KeepMedia;
    }
    if let Some(path) = &args.restrictions {
        settings.restrictions_path.clone_from(path);
    }
    settings.show_progress = !(cli.quiet || config.output.quiet);
    settings
}

async fn cmd_download(cli: &Cli, config: &Config, args: &DownloadArgs) -> Result<()> {
    let mut flags = args.fields();
    if flags.save_path.is_none() {
        flags.save_path.clone_from(&config.paths.base);
    }

    let preset = match &args.preset {
        Some(selector) => {
            let list = PresetList::load(&config.paths.presets)?;
            let preset = list.select(selector)?.clone();
            if !cli.quiet {
                println!("You selected: {}", preset.description.bold());
            }
            Some(preset)
        }
        None => None,
    };
    let params = RunParameters::resolve(preset.as_ref().map(|p| &p.config), &flags)?;

    let export = args
        .export
        .clone()
        .or_else(|| config.paths.export.clone())
        .ok_or(GmdlError::MissingParameter { name: "export" })?;

    let mode = DownloadMode::from(args.mode);
    let settings = settings_for(cli, config, args);
    let request = DownloadRequest::new(params, mode);

    if !cli.quiet {
        println!("{}", "Downloading group media...".bold().cyan());
        println!("  Group: {}", request.group);
        println!(
            "  Days: {} to {}",
            gmdl::date_parser::format_day(request.start),
            gmdl::date_parser::format_day(request.end)
        );
        println!("  Mode: {mode}");
        println!("  Export: {}", export.display());
        println!();
    }

    let mut session = ExportSession::new(export);
    let summary = run_with_session(&mut session, &request, &settings).await?;

    if !cli.quiet {
        for day in summary.days.iter().filter(|d| d.count > 0) {
            println!(
                "  {} {}: {}",
                "✓".green(),
                gmdl::date_parser::format_day(day.day),
                day.count
            );
        }
        println!();
    }
    println!(
        "Total downloaded photos: {}",
        gmdl::format_number(summary.total).bold().green()
    );
    if has_files(&summary.run_dir) {
        println!("  Saved to: {}", summary.run_dir.display());
    }
    Ok(())
}

fn cmd_presets(config: &Config) -> Result<()> {
    let list = PresetList::load(&config.paths.presets)?;
    println!("{}", "Presets".bold().cyan());
    for (id, preset) in list.presets().iter().enumerate() {
        println!("{}. {}", id + 1, preset.description.bold());
        let fields = &preset.config;
        let show = |label: &str, value: Option<String>| {
            if let Some(value) = value {
                println!("     {} {value}", format!("{label}:").dimmed());
            }
        };
        show("group", fields.group_name.clone());
        show("start", fields.start_date.clone());
        show("end", fields.end_date.clone());
        show("save path", fields.save_path.as_ref().map(|p| p.display().to_string()));
    }
    Ok(())
}

fn cmd_config(config: &Config, args: &ConfigArgs) -> Result<()> {
    if args.init {
        if let Some(path) = Config::user_config_path().filter(|p| p.exists()) {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        let path = Config::default().save()?;
        println!("{} Wrote {}", "✓".green(), path.display());
        return Ok(());
    }

    println!("{}", "Current Configuration".bold().cyan());
    match &config.source {
        Some(path) => println!("  File: {}", path.display()),
        None => println!("  File: {}", "(defaults)".dimmed()),
    }
    println!();
    print!("{}", config.to_toml());
    Ok(())
}

fn cmd_completions(args: &CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "gmdl", &mut io::stdout());
    Ok(())
}
