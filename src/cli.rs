use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a video link for dubbing and follow the job
    Dub {
        /// Link to the source video
        #[arg(short, long)]
        url: String,

        /// Voice to dub with (see `voices`)
        #[arg(short, long)]
        voice: Option<String>,

        /// Target language, defaults to the voice's language
        #[arg(short, long)]
        language: Option<String>,

        /// Keep the background noise of the source audio
        #[arg(long)]
        keep_background_noise: bool,

        /// Do not align the dubbed audio with the original timing
        #[arg(long)]
        no_auto_sync: bool,

        /// Print the task id and return without waiting for the result
        #[arg(short, long)]
        detach: bool,
    },

    /// Show the current status of a dubbing job
    Status {
        /// Task id returned at submission
        #[arg(short, long)]
        task_id: String,
    },

    /// Follow an existing dubbing job until it finishes
    Track {
        /// Task id returned at submission
        #[arg(short, long)]
        task_id: String,
    },

    /// List the built-in voices
    Voices,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write the default configuration to a file
    Init {
        /// Destination file
        #[arg(short, long, default_value = "dubber.toml")]
        output: PathBuf,
    },

    /// Print the effective configuration
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dub_command() {
        let args = Args::parse_from([
            "dubber",
            "-v",
            "dub",
            "--url",
            "https://youtube.com/watch?v=abc",
            "--voice",
            "male_es",
            "--no-auto-sync",
        ]);
        assert!(args.verbose);
        match args.command {
            Commands::Dub { url, voice, language, keep_background_noise, no_auto_sync, detach } => {
                assert_eq!(url, "https://youtube.com/watch?v=abc");
                assert_eq!(voice.as_deref(), Some("male_es"));
                assert!(language.is_none());
                assert!(!keep_background_noise);
                assert!(no_auto_sync);
                assert!(!detach);
            }
            _ => panic!("expected dub command"),
        }
    }

    #[test]
    fn test_parse_config_init_default_path() {
        let args = Args::parse_from(["dubber", "config", "init"]);
        match args.command {
            Commands::Config { action: ConfigAction::Init { output } } => {
                assert_eq!(output, PathBuf::from("dubber.toml"));
            }
            _ => panic!("expected config init"),
        }
    }
}
