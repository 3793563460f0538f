//! # idv-cli — Identity Verification CLI
//!
//! Provides the `idv` command-line interface over the verification
//! workflow.
//!
//! ## Subcommands
//!
//! - `idv status` — Query the remote verification status for the token.
//! - `idv verify` — Run one workflow instance with images read from files.
//!
//! ```bash
//! IDV_TOKEN=... idv status
//! idv --token ... verify --selfie me.jpg --front id-front.jpg --skip-back
//! ```

pub mod capture;
pub mod status;
pub mod verify;

use clap::Args;
use idv_client::GatewayConfig;

/// Exit code for a workflow that ended in a non-success outcome.
pub const EXIT_NOT_VERIFIED: u8 = 2;

/// Connection options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GatewayOpts {
    /// Verification API base URL. Overrides `IDV_API_BASE`.
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Request timeout in seconds. Overrides `IDV_TIMEOUT_SECS`.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
}

impl GatewayOpts {
    /// Environment configuration with flag overrides applied.
    pub fn resolve(&self) -> anyhow::Result<GatewayConfig> {
        let mut config = match &self.api_base {
            Some(base) => {
                let env = GatewayConfig::from_env()?;
                GatewayConfig::new(base)?
                    .with_timeout_secs(env.timeout_secs)
                    .with_status_retries(env.status_retries)
            }
            None => GatewayConfig::from_env()?,
        };
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout_secs(secs);
        }
        Ok(config)
    }
}
