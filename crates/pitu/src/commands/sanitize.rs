//! `pitu sanitize`: apply the router telemetry redactions to a document.

use std::io::Read;
use std::path::Path;

use pitu_core::RedactionRuleSet;

use crate::cli::SanitizeArgs;
use crate::error::CliError;

pub fn handle(args: &SanitizeArgs) -> Result<(), CliError> {
    let raw = match args.file.as_deref() {
        Some(path) if path != Path::new("-") => std::fs::read(path)?,
        _ => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    let sanitized = RedactionRuleSet::router_telemetry().sanitize_bytes(&raw)?;
    let rendered = if args.compact {
        serde_json::to_string(&sanitized)?
    } else {
        serde_json::to_string_pretty(&sanitized)?
    };
    println!("{rendered}");
    Ok(())
}
