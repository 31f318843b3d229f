use anyhow::Result;

use quarry_core::Config;

pub fn run(config: &Config) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
