//! CLI command for managing deploy-docs configuration.

use anyhow::Result;
use clap::{Args, Subcommand};

use deploy_docs::config::{Config, PublishConfig, TargetConfig};

#[derive(Args)]
#[command(about = "Manage deploy-docs configuration")]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Initialize a new configuration file with example values
    Init {
        /// Overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(&self) -> Result<()> {
        match &self.action {
            ConfigAction::Show => self.show_config(),
            ConfigAction::Path => self.show_path(),
            ConfigAction::Init { force } => self.init_config(*force),
        }
    }

    fn show_config(&self) -> Result<()> {
        let exists = Config::default_path().is_some_and(|p| p.exists());
        let config = Config::load()?;

        if !exists {
            println!("# No configuration file found; showing built-in defaults.");
            println!("# To create one, run: deploy-docs config init");
        }

        let yaml = serde_yaml::to_string(&config)?;
        println!("{}", yaml);
        println!("# Connection: {}", config.target.connection_string());

        Ok(())
    }

    fn show_path(&self) -> Result<()> {
        match Config::default_path() {
            Some(path) => {
                println!("Configuration file path: {}", path.display());
                if path.exists() {
                    println!("Status: File exists");
                } else {
                    println!("Status: File does not exist");
                }
            }
            None => {
                println!("Could not determine configuration directory");
            }
        }

        Ok(())
    }

    fn init_config(&self, force: bool) -> Result<()> {
        let path = Config::default_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine configuration directory"))?;

        if path.exists() && !force {
            println!("Configuration file already exists at: {}", path.display());
            println!("Use --force to overwrite");
            return Ok(());
        }

        let config = example_config();
        config.save()?;

        println!("Created configuration file at: {}", path.display());
        println!();
        println!("Edit the file to point at your web host, then check it with:");
        println!("  deploy-docs config show");

        Ok(())
    }
}

fn example_config() -> Config {
    Config {
        target: TargetConfig::default()
            .with_host("docs.example.com".to_string())
            .with_user("deploy".to_string()),
        publish: PublishConfig::default(),
    }
}
