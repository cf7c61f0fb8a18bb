use crate::cli::args::{CliArgs, Command};
use crate::filter::StatusFilter;
use crate::output;
use crate::records::GrievanceStatus;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.base_url.as_deref() {
        reqwest::Url::parse(raw).map_err(|e| format!("invalid --base-url '{raw}': {e}"))?;
    }
    if args.timeout == Some(0) {
        return Err("invalid timeout, expected positive integer".to_string());
    }
    match &args.command {
        Command::List { status, format, .. } => {
            if let Some(raw) = status.as_deref() {
                StatusFilter::parse(raw)
                    .ok_or_else(|| format!("invalid --status '{raw}', expected all or a status"))?;
            }
            if let Some(raw) = format.as_deref() {
                output::OutputFormat::parse(raw)
                    .ok_or_else(|| format!("invalid --format '{raw}', expected text or json"))?;
            }
        }
        Command::Annotate { text, file, .. } => {
            if text.is_none() && file.is_none() {
                return Err("annotate needs TEXT or --file".to_string());
            }
        }
        Command::UpdateStatus { id, status, .. } => {
            if id.trim().is_empty() {
                return Err("invalid --id, expected a record id".to_string());
            }
            status
                .parse::<GrievanceStatus>()
                .map_err(|e| format!("invalid --status: {e}"))?;
        }
        Command::Verify { id, .. } => {
            if id.trim().is_empty() {
                return Err("invalid --id, expected a record id".to_string());
            }
        }
        Command::CopyHash { hash, id, .. } => {
            if hash.is_none() && id.is_none() {
                return Err("copy-hash needs --hash or --id".to_string());
            }
        }
        Command::Console { .. } => {}
    }
    Ok(())
}
