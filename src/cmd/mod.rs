pub mod check;
pub mod run;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::domain::error::SpecError;
use crate::io::{self, Format};

/// Reads a document from `path`, or from `stdin` when no path is given.
/// Stdin has no extension, so it falls back to `fallback`.
fn load_document<T, R>(
    label: &str,
    path: Option<&Path>,
    explicit: Option<Format>,
    fallback: Format,
    stdin: R,
) -> Result<T, CommandError>
where
    T: DeserializeOwned,
    R: Read,
{
    let value = match path {
        Some(path) => {
            let format = io::resolve_input_format(explicit, Some(path)).map_err(|err| {
                CommandError::InputUsage(format!(
                    "unable to resolve {label} format from `{}`: {err}",
                    path.display()
                ))
            })?;
            let file = File::open(path).map_err(|err| {
                CommandError::InputUsage(format!(
                    "failed to open {label} file `{}`: {err}",
                    path.display()
                ))
            })?;
            io::reader::read_value(file, format)
        }
        None => io::reader::read_value(stdin, explicit.unwrap_or(fallback)),
    }
    .map_err(|err| CommandError::InputUsage(format!("failed to read {label}: {err}")))?;

    serde_json::from_value(value)
        .map_err(|err| CommandError::InputUsage(format!("invalid {label} document: {err}")))
}

/// Every `SpecError` is a problem with the supplied documents.
fn map_spec_error(error: SpecError) -> CommandError {
    CommandError::InputUsage(error.to_string())
}

enum CommandError {
    InputUsage(String),
}
