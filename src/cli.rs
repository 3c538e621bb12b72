use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, builder::BoolishValueParser};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(subcommand_value_name = "SUBCOMMAND")]
#[command(subcommand_help_heading = "Subcommands")]
pub struct Cli {
    /// Path to config directory (default: `$XDG_CONFIG_HOME/capdeck/`)
    ///
    /// Directory should contain a file named `config.kdl`
    #[arg(short, long = "config", value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Appliance address, overrides `base-url` from the config
    #[arg(short, long, value_name = "URL", global = true)]
    pub url: Option<String>,

    #[command(subcommand)]
    pub subcommand: Option<SubCommand>,
}

#[derive(Subcommand, Debug)]
pub enum SubCommand {
    /// Interactive control panel on stdin/stdout (the default)
    Panel,
    /// Print streaming status
    Status {
        /// Print the raw JSON answer
        #[arg(long)]
        json: bool,
    },
    /// Start or stop streaming
    Stream {
        #[arg(value_enum)]
        action: StreamArg,
    },
    /// Manage presets
    #[command(subcommand)]
    Preset(PresetCommand),
    /// Manage recordings on the appliance
    #[command(subcommand)]
    Recording(RecordingCommand),
    /// Select the audio input mixed into streams and recordings
    #[command(subcommand)]
    Audio(AudioCommand),
    /// List capture devices for the active source type
    Devices {
        /// Ask the appliance to rescan first
        #[arg(long)]
        refresh: bool,
    },
    /// Validate the config file
    Validate,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamArg {
    Start,
    Stop,
}

#[derive(Subcommand, Debug)]
pub enum PresetCommand {
    List,
    /// Print what a preset restores
    Show { name: String },
    Create(CreatePreset),
    Apply { name: String },
    Delete {
        name: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum RecordingCommand {
    List,
    /// Print whether a recording is running
    Status,
    Start,
    Stop,
    /// Print the recording settings, changing them first when asked
    Settings {
        /// Container format, e.g. mp4 or mkv
        #[arg(long)]
        container: Option<String>,
        /// Record the audio input too
        #[arg(long, value_name = "on|off", value_parser = BoolishValueParser::new())]
        audio: Option<bool>,
    },
    Show { id: String },
    Rename { id: String, name: String },
    Delete {
        id: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum AudioCommand {
    /// List audio input sources
    Sources,
    Status,
    /// Capture audio from the source with this id
    Use { id: String },
    Disconnect,
}

#[derive(Args, Debug)]
pub struct CreatePreset {
    pub name: String,
    #[arg(short, long, default_value = "")]
    pub description: String,
    /// Skip the thumbnail capture
    #[arg(long)]
    pub no_thumbnail: bool,
}
