use std::io::Read;
use std::path::PathBuf;
use std::rc::Rc;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use super::{CommandError, load_document, map_spec_error};
use crate::domain::assertion::Producer;
use crate::domain::document::ExpectationDocument;
use crate::domain::error::SpecError;
use crate::domain::pointer::PointerPath;
use crate::domain::report::Report;
use crate::domain::response::Response;
use crate::engine::expectation::ResponseExpectation;
use crate::engine::results::ExpectationResults;
use crate::engine::spec::loader::configure_expectation;
use crate::engine::spec::registry::Registry;
use crate::io::Format;

#[derive(Debug, Clone)]
pub struct CheckCommandArgs {
    pub expect: PathBuf,
    /// Captured response; read from stdin when absent.
    pub response: Option<PathBuf>,
    pub from: Option<Format>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckCommandResponse {
    pub exit_code: i32,
    pub payload: Value,
}

pub fn run_with_stdin<R: Read>(args: &CheckCommandArgs, stdin: R) -> CheckCommandResponse {
    match execute(args, stdin) {
        Ok(report) => report_response(report),
        Err(CommandError::InputUsage(message)) => CheckCommandResponse {
            exit_code: 3,
            payload: json!({
                "error": "input_usage_error",
                "message": message,
            }),
        },
    }
}

fn report_response(report: Report) -> CheckCommandResponse {
    let exit_code = if report.valid { 0 } else { 2 };
    match serde_json::to_value(&report) {
        Ok(payload) => CheckCommandResponse { exit_code, payload },
        Err(_) => CheckCommandResponse {
            exit_code: 1,
            payload: json!({
                "error": "internal_error",
                "message": "failed to serialize check report"
            }),
        },
    }
}

fn execute<R: Read>(args: &CheckCommandArgs, stdin: R) -> Result<Report, CommandError> {
    let document: ExpectationDocument = load_document(
        "expectation",
        Some(args.expect.as_path()),
        args.from,
        Format::Json,
        std::io::empty(),
    )?;
    let mut response: Response = load_document(
        "response",
        args.response.as_deref(),
        args.from,
        Format::Json,
        stdin,
    )?;

    let mut expectation = ResponseExpectation::new(Rc::new(Registry::new()));
    configure_expectation(&mut expectation, &document, &without_cache).map_err(map_spec_error)?;
    let results = expectation
        .validate(&mut response)
        .map_err(map_spec_error)?;
    let report = ExpectationResults::new(response, results).report();
    info!(valid = report.valid, aspects = report.expected.len(), "response checked");
    Ok(report)
}

/// A standalone expectation has no validation node, so there is no cache for
/// `$get` to read.
fn without_cache(path: PointerPath) -> Result<Producer, SpecError> {
    Err(SpecError::InvalidExpectation {
        path: path.to_string(),
        reason: "`$get` needs a validation cache; use `run` with a spec document".to_string(),
    })
}
