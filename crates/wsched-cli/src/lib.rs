pub mod cli_args;

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::debug;
use wsched_core::{
    RunOptions, Settings, apply_runtime_overrides, list_lessons, load_settings, run,
    save_settings,
};

use cli_args::{Cli, Command, InitArgs, ProcessArgs};

/// Execute a parsed command line.
pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Command::Init(args)) => {
            if !cli.process.is_empty() {
                bail!("Processing flags cannot be combined with the init command.");
            }
            handle_init(&cli.site, args)
        }
        None => run_process(&cli.site, cli.process),
    }
}

fn handle_init(site: &Path, args: InitArgs) -> Result<()> {
    let path = save_settings(site, &Settings::default(), args.force)
        .context("failed to write settings")?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn run_process(site: &Path, args: ProcessArgs) -> Result<()> {
    let load = load_settings(site);
    debug!(source = ?load.source, "Loaded tool settings");
    let mut warnings = load.warnings;
    let mut settings = load.settings;

    let (overrides, mut override_warnings) =
        args.to_runtime_overrides().map_err(anyhow::Error::msg)?;
    warnings.append(&mut override_warnings);
    apply_runtime_overrides(&mut settings, &overrides);

    for warning in warnings {
        eprintln!("Warning: {warning}");
    }

    let options = RunOptions {
        site_root: site.to_path_buf(),
        settings,
        dry_run: args.dry_run,
    };

    if args.list_lessons {
        let summaries = list_lessons(&options)?;
        println!("{:<24}  {:>6}  {:<20}  Title", "Lesson", "Tables", "Start");
        for summary in summaries {
            println!(
                "{:<24}  {:>6}  {:<20}  {}",
                summary.gh_name,
                summary.tables,
                summary.start_times.join(", "),
                summary.title
            );
        }
        return Ok(());
    }

    let report = run(&options)?;
    if report.written {
        println!(
            "Schedule written to {} ({} fragment(s) from {} lesson(s))",
            report.output.display(),
            report.fragments,
            report.lessons
        );
    } else {
        print!("{}", report.document);
    }

    Ok(())
}
