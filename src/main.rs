use clap::{Parser, Subcommand};
use log::error;
use std::process::ExitCode;

mod cli;

use cli::config::ConfigCommand;
use cli::deploy::DeployCommand;
use cli::package::PackageCommand;
use cli::timestamp::TimestampCommand;
use deploy_docs::deploy::DeployFailure;

#[derive(Parser)]
#[command(name = "deploy-docs")]
#[command(about = "Build, package and publish HTML documentation to a web host over SSH", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Deploy(DeployCommand),
    Package(PackageCommand),
    Timestamp(TimestampCommand),
    Config(ConfigCommand),
}

fn main() -> ExitCode {
    // Initialize logging with INFO level by default
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Deploy(cmd) => cmd.execute(),
        Commands::Package(cmd) => cmd.execute(),
        Commands::Timestamp(cmd) => cmd.execute(),
        Commands::Config(cmd) => cmd.execute(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<DeployFailure>() {
                Some(failure) => error!(
                    "Deployment failed at step '{}' after {} completed step(s): {}",
                    failure.step,
                    failure.completed.len(),
                    failure.error
                ),
                None => error!("{:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}
