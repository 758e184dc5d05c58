#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;

use clean_history::{
    cleaner::{self, Settings},
    cli::{Cli, Commands},
    display,
    exits::ExitLog,
    history::HistoryFile,
    shell,
};

fn main() -> Result<()> {
    env_logger::init();
    configure_colors();

    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(similarity) = cli.similarity {
        settings.similarity_threshold = similarity;
    }
    if let Some(rare) = cli.rare_threshold {
        settings.rare_threshold = rare;
    }
    settings.remove_rare = cli.remove_rare;
    settings.dry_run = cli.dry_run;
    settings.quiet = cli.quiet;

    match cli.command {
        None => {
            let outcome = cleaner::run(&settings)?;
            display::print_clean_report(&outcome, &settings);
        }
        Some(Commands::Stats { json }) => {
            settings.validate()?;
            let file = HistoryFile::load(&settings.history_file)?;
            let exits = ExitLog::load(&settings.exit_file)?;
            let plan = cleaner::plan(&file, &exits, &settings);
            if json {
                println!("{}", display::render_json_report(&plan)?);
            } else {
                display::print_stats_report(&file, &exits, &plan);
            }
        }
        Some(Commands::Info) => display::print_info(&settings),
        Some(Commands::Install) => shell::install_shell_integration()?,
        Some(Commands::Uninstall) => shell::uninstall_shell_integration()?,
    }

    Ok(())
}

fn configure_colors() {
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
}
