// SPDX-License-Identifier: MIT

//! Text/JSON output formatting, mirroring the teacher's `OutputFormat`
//! switch: every command prints either a human-readable summary or the raw
//! serialized value, never a mix of the two.

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print `value` as pretty JSON, or hand it to `render` for text mode.
pub fn emit<T: Serialize>(format: OutputFormat, value: &T, render: impl FnOnce(&T)) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Text => render(value),
    }
    Ok(())
}
