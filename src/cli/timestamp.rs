use anyhow::Result;
use clap::Args;

use deploy_docs::timestamp::localize;

#[derive(Args)]
#[command(about = "Resolve a timestamp in a time zone")]
pub struct TimestampCommand {
    /// "now" or "YYYY-MM-DD HH:MM:SS"
    pub spec: String,

    /// IANA time zone name
    #[arg(long, default_value = "UTC")]
    pub zone: String,
}

impl TimestampCommand {
    pub fn execute(&self) -> Result<()> {
        let at = localize(&self.spec, &self.zone)?;
        println!("{}", at);
        println!("UTC: {}", at.utc().to_rfc3339());
        Ok(())
    }
}
