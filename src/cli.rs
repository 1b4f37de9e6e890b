//! CLI definitions for gmdl.
//!
//! Uses clap for argument parsing with derive macros.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::model::DownloadMode;
use crate::presets::PresetFields;

/// gmdl - download the media of a Telegram group, one folder per day
#[derive(Parser, Debug)]
#[command(name = "gmdl")]
#[command(version)]
#[command(about = "Download photos from a Telegram group into day folders")]
#[command(long_about = r#"
gmdl (group media downloader) walks a Telegram group day by day and saves
its photos into a dated folder tree.

Modes:
  - general:  every photo of a day goes into the day folder
  - grouped:  photos are grouped under the caption that describes them

Quick start:
  1. Export the chat with Telegram Desktop (JSON format)
  2. Run: gmdl download --export ./ChatExport --group "Family" \
            --start 01-01-2024 --end 31-01-2024 --save-path ./photos
"#)]
pub struct Cli {
    /// Configuration file (replaces ~/.config/gmdl/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Be verbose (show debug info)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Be quiet (suppress non-error output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the media of a group over a date range
    Download(DownloadArgs),

    /// List saved run presets
    Presets,

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Group or channel name (or numeric id)
    #[arg(long, short = 'g')]
    pub group: Option<String>,

    /// First day to download (dd-mm-yyyy)
    #[arg(long, short = 's')]
    pub start: Option<String>,

    /// Last day to download, inclusive (dd-mm-yyyy)
    #[arg(long, short = 'e')]
    pub end: Option<String>,

    /// Folder the run folder is created in
    #[arg(long, short = 'o')]
    pub save_path: Option<PathBuf>,

    /// Download mode
    #[arg(long, short = 'm', value_enum, default_value = "general")]
    pub mode: ModeArg,

    /// Take parameters from a preset (1-based id or description)
    #[arg(long, short = 'p')]
    pub preset: Option<String>,

    /// Telegram Desktop export directory to read from
    #[arg(long, env = "GMDL_EXPORT")]
    pub export: Option<PathBuf>,

    /// Also download videos
    #[arg(long)]
    pub include_video: bool,

    /// Also download GIF animations
    #[arg(long)]
    pub include_animation: bool,

    /// Keep media whose caption is restricted (grouped mode)
    #[arg(long)]
    pub keep_restricted_media: bool,

    /// Restriction list (JSON)
    #[arg(long)]
    pub restrictions: Option<PathBuf>,
}

impl DownloadArgs {
    /// The run parameters given on the command line.
    #[must_use]
    pub fn fields(&self) -> PresetFields {
        PresetFields {
            group_name: self.group.clone(),
            start_date: self.start.clone(),
            end_date: self.end.clone(),
            save_path: self.save_path.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show the effective configuration
    #[arg(long)]
    pub show: bool,

    /// Write the default configuration file
    #[arg(long, conflicts_with = "show")]
    pub init: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModeArg {
    /// Every photo straight into the day folder
    #[default]
    #[value(alias = "1")]
    General,
    /// Photos grouped by the caption describing them
    #[value(alias = "2")]
    Grouped,
}

impl From<ModeArg> for DownloadMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::General => Self::Ungrouped,
            ModeArg::Grouped => Self::Grouped,
        }
    }
}
