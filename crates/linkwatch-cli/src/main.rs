//! Linkwatch CLI entry point

use clap::Parser;
use tracing::{error, info};

use linkwatch_cli::{
    app::{idle_window, ScenarioRunner},
    cli::{Cli, Commands},
    config::{load_configuration, render_config},
    error::Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = load_configuration(cli.config.as_deref())?;

    if let Err(e) = run(cli.command, ScenarioRunner::new(config.clone()), &config).await {
        error!("Command execution failed: {}", e);
        std::process::exit(1);
    }

    info!("Linkwatch CLI exited successfully");
    Ok(())
}

async fn run(
    command: Commands,
    runner: ScenarioRunner,
    config: &linkwatch_core::LinkwatchConfig,
) -> Result<()> {
    match command {
        Commands::Simulate {
            users,
            attempts,
            target,
        } => {
            let reports = runner.simulate(users, attempts, &target).await?;
            println!(
                "{:<10} {:>9} {:>8} {:>6} {:>7}  STATE",
                "USER", "CONNECTED", "SESSIONS", "FAILED", "BLOCKED"
            );
            for report in reports {
                println!(
                    "{:<10} {:>9} {:>8} {:>6} {:>7}  {}",
                    report.user_id,
                    report.connected,
                    report.active_sessions,
                    report.failed_attempts,
                    report.blocked,
                    report.state
                );
            }
        }
        Commands::Lockout { name } => {
            let manager = runner.lockout(&name);
            for line in manager.connection_logs() {
                println!("{}", line);
            }
            println!();
            print!("{}", manager.connection_info());
            println!();
            print!("{}", manager.evaluator().stats());
        }
        Commands::Sessions {
            count,
            idle_minutes,
        } => {
            let (report, logs) = runner.sessions(count, idle_window(idle_minutes));
            for line in logs {
                println!("{}", line);
            }
            println!();
            println!(
                "Opened {}, expired {}, disconnected {}, final state {}",
                report.opened, report.expired, report.disconnected, report.final_state
            );
        }
        Commands::Config => {
            print!("{}", render_config(config)?);
        }
    }
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
