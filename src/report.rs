//! JSON report rendering
//!
//! Outputs the association and regression reports as JSON for downstream
//! analysis. Pretty by default; compact single-line for piping.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Render any report as pretty-printed JSON.
pub fn render<T: Serialize>(report: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Render as compact JSON (single line).
pub fn render_compact<T: Serialize>(report: &T) -> Result<String> {
    Ok(serde_json::to_string(report)?)
}

/// Write a rendered report to `output`, or stdout when absent.
pub fn write(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            info!("report written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
