//! Show or write the effective configuration

use std::path::Path;

use ambilight::config::AmbilightConfig;
use tracing::info;

use super::CommandResult;

pub fn run(config: &AmbilightConfig, path: &Path, write: bool) -> CommandResult {
    config.validate()?;
    if write {
        config.save(path)?;
        info!("Wrote {}", path.display());
    }
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
