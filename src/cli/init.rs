//! `lexassoc init` - write a sample config file

use anyhow::{bail, Result};
use std::path::Path;
use tracing::info;

use crate::config::SAMPLE_CONFIG;

pub fn run(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("{} already exists, not overwriting", path.display());
    }
    std::fs::write(path, SAMPLE_CONFIG)?;
    info!("wrote sample config to {}", path.display());
    println!("Created {}", path.display());
    Ok(())
}
