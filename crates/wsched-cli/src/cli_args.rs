use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use wsched_core::RuntimeOverrides;

/// Top-level CLI entrypoint.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "wsched",
    version,
    about = "Compose the merged workshop schedule from lesson schedule fragments",
    long_about = None
)]
pub struct Cli {
    /// Root directory of the workshop site.
    #[arg(
        long,
        global = true,
        default_value = ".",
        value_name = "DIR",
        value_hint = ValueHint::DirPath
    )]
    pub site: PathBuf,

    /// Also write JSON logs to the persistent log file.
    #[arg(long = "log-file", global = true, action = ArgAction::SetTrue)]
    pub log_file: bool,

    #[command(flatten)]
    pub process: ProcessArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Supported subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Write a wsched.toml with the default paths.
    Init(InitArgs),
}

#[derive(Debug, Clone, Args, Default)]
pub struct InitArgs {
    /// Replace an existing wsched.toml.
    #[arg(long, action = ArgAction::SetTrue)]
    pub force: bool,
}

/// Arguments for the main composition flow (default command).
#[derive(Debug, Clone, Args, Default)]
pub struct ProcessArgs {
    /// Site configuration listing the lessons.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    /// Directory holding the `<gh-name>-lesson/` include folders.
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub includes: Option<String>,

    /// Output file for the composed schedule.
    #[arg(long = "out", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub out: Option<String>,

    /// Print the composed schedule instead of writing it.
    #[arg(long, action = ArgAction::SetTrue)]
    pub dry_run: bool,

    /// List the configured lessons and their schedule tables, then exit.
    #[arg(long = "list-lessons", action = ArgAction::SetTrue)]
    pub list_lessons: bool,
}

impl ProcessArgs {
    /// Returns true when no processing flags were provided.
    pub fn is_empty(&self) -> bool {
        self.config.is_none()
            && self.includes.is_none()
            && self.out.is_none()
            && !self.dry_run
            && !self.list_lessons
    }

    /// Convert CLI flags into runtime overrides plus any advisory warnings.
    pub fn to_runtime_overrides(&self) -> Result<(RuntimeOverrides, Vec<String>), String> {
        let mut overrides = RuntimeOverrides::default();
        let mut warnings = Vec::new();

        if self.list_lessons && self.dry_run {
            return Err("--list-lessons cannot be combined with --dry-run.".into());
        }

        if let Some(ref config) = self.config {
            overrides.config = parse_optional_field(config);
        }

        if let Some(ref includes) = self.includes {
            overrides.includes = parse_optional_field(includes);
        }

        if let Some(ref out) = self.out {
            overrides.output = parse_optional_field(out);
            if self.dry_run || self.list_lessons {
                warnings.push("--out has no effect when nothing is written.".to_string());
            }
        }

        Ok((overrides, warnings))
    }
}

fn parse_optional_field(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if matches!(
        trimmed.to_ascii_lowercase().as_str(),
        "none" | "null" | "unset"
    ) {
        None
    } else {
        Some(trimmed.to_string())
    }
}
