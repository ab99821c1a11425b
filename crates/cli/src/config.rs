use finance_tracker_core::models::settings::ClientSettings;

use crate::cli::GlobalArgs;
use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config/finance_tracker.toml";
const ENV_PREFIX: &str = "FINANCE_TRACKER";

/// File, then `FINANCE_TRACKER_*` environment, then command-line flags.
pub fn load(args: &GlobalArgs) -> Result<ClientSettings> {
    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));
    let mut settings: ClientSettings = builder.build()?.try_deserialize()?;

    if let Some(base_url) = &args.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(credentials) = &args.credentials {
        settings.credentials_path = credentials.clone();
    }

    Ok(settings)
}
