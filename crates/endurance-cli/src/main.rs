use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

mod alerts;
mod app;
mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "endurance", version, about = "Endurance focus timer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Run the timer live, reading commands from stdin
    Run,
    /// Preset management
    Preset {
        #[command(subcommand)]
        action: commands::preset::PresetAction,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// User settings
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Print shell completions
    Completions {
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init();

    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Run => commands::run::run(),
        Commands::Preset { action } => commands::preset::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Settings { action } => commands::settings::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "endurance", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
