//! `als config-show` / `als config-init` – configuration surface.

use anyhow::Result;
use als_core::config;

pub fn run_config_show() -> Result<()> {
    let cfg = config::load_or_init()?;
    let path = config::config_path()?;
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(&cfg)?);
    Ok(())
}

pub fn run_config_init() -> Result<()> {
    let path = config::config_path()?;
    let existed = path.exists();
    config::load_or_init()?;
    if existed {
        println!("config already present at {}", path.display());
    } else {
        println!("created default config at {}", path.display());
    }
    Ok(())
}
