//! CLI command that builds and packs documentation locally.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use deploy_docs::archive::{create_archive, run_build};

#[derive(Args)]
#[command(about = "Build documentation and pack it into a .tar.gz")]
pub struct PackageCommand {
    /// Directory holding the rendered HTML
    #[arg(long)]
    pub source: PathBuf,

    /// Archive file to write
    #[arg(long)]
    pub output: PathBuf,

    /// Command to run before packing (e.g. "make html")
    #[arg(long)]
    pub build_cmd: Option<String>,

    /// Directory the build command runs in
    #[arg(long, default_value = ".")]
    pub build_dir: PathBuf,
}

impl PackageCommand {
    pub fn execute(&self) -> Result<()> {
        if let Some(cmd) = &self.build_cmd {
            run_build(cmd, &self.build_dir).context("Documentation build failed")?;
        }

        let info = create_archive(&self.source, &self.output).with_context(|| {
            format!("Failed to pack {}", self.source.display())
        })?;

        println!("Archive: {}", info.path.display());
        println!("Size:    {} bytes", info.size_bytes);
        println!("SHA-256: {}", info.sha256);
        Ok(())
    }
}
