use std::path::PathBuf;

use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};
use veo_models::{AspectRatio, ModelId, NamingPosition};

#[derive(Debug, Parser)]
#[command(name = "veo-worker", version, about = "Batch video generation with Veo models")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Add one or more jobs to the queue
    Add(AddArgs),
    /// Process queued jobs until none remain
    Run,
    /// Show jobs and queue totals
    List,
    /// Remove every job
    Clear,
    /// Export a completed job to the output folder
    Export(ExportArgs),
    /// Show or change preferences
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub prompt: String,
    #[arg(long, default_value = ModelId::VEO_3_FAST,
          value_parser = PossibleValuesParser::new(ModelId::KNOWN.iter().copied()))]
    pub model: String,
    #[arg(long = "aspect-ratio", default_value = "16:9")]
    pub aspect_ratio: AspectRatio,
    #[arg(long, conflicts_with = "random_seed")]
    pub seed: Option<u32>,
    /// Pick a seed at random
    #[arg(long = "random-seed")]
    pub random_seed: bool,
    /// Reference image to guide generation
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,
    /// Number of copies to enqueue (1-20)
    #[arg(long, default_value_t = 1)]
    pub count: u32,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(value_name = "JOB_ID")]
    pub job_id: String,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the current preferences
    Show,
    /// Store the API key
    SetKey { key: String },
    /// Change output naming
    Naming {
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        start: Option<u32>,
        #[arg(long)]
        position: Option<NamingPosition>,
    },
    /// Change the export folder (must exist)
    Folder { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Commands, clap::Error> {
        Cli::try_parse_from(std::iter::once("veo-worker").chain(args.iter().copied())).map(|c| c.command)
    }

    #[test]
    fn test_add_defaults() {
        let Commands::Add(args) = parse(&["add", "a fox in snow"]).unwrap() else {
            panic!("expected add");
        };
        assert_eq!(args.prompt, "a fox in snow");
        assert_eq!(args.model, ModelId::VEO_3_FAST);
        assert_eq!(args.aspect_ratio, AspectRatio::Landscape);
        assert_eq!(args.count, 1);
        assert!(args.seed.is_none() && !args.random_seed);
    }

    #[test]
    fn test_add_options() {
        let Commands::Add(args) = parse(&[
            "add", "p", "--model", ModelId::VEO_2, "--aspect-ratio", "9:16", "--seed", "42", "--count", "4",
        ])
        .unwrap() else {
            panic!("expected add");
        };
        assert_eq!(args.model, ModelId::VEO_2);
        assert_eq!(args.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.count, 4);
    }

    #[test]
    fn test_add_rejects_bad_values() {
        assert!(parse(&["add", "p", "--model", "veo-9"]).is_err());
        assert!(parse(&["add", "p", "--aspect-ratio", "4:3"]).is_err());
        assert!(parse(&["add", "p", "--seed", "1", "--random-seed"]).is_err());
    }

    #[test]
    fn test_config_naming() {
        let Commands::Config(ConfigCommand::Naming { prefix, start, position }) =
            parse(&["config", "naming", "--prefix", "clip_", "--start", "5", "--position", "before"]).unwrap()
        else {
            panic!("expected config naming");
        };
        assert_eq!(prefix.as_deref(), Some("clip_"));
        assert_eq!(start, Some(5));
        assert_eq!(position, Some(NamingPosition::Before));
    }
}
