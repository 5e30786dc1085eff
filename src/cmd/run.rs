use std::io::Read;
use std::path::PathBuf;
use std::rc::Rc;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use super::{CommandError, load_document, map_spec_error};
use crate::domain::document::{ResponsesDocument, SpecDocument};
use crate::domain::report::SpecReport;
use crate::engine::spec::loader;
use crate::io::Format;

#[derive(Debug, Clone)]
pub struct RunCommandArgs {
    pub spec: PathBuf,
    /// Captured responses; read from stdin when absent.
    pub responses: Option<PathBuf>,
    pub from: Option<Format>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunCommandResponse {
    pub exit_code: i32,
    pub payload: Value,
}

pub fn run(args: &RunCommandArgs) -> RunCommandResponse {
    run_with_stdin(args, std::io::empty())
}

pub fn run_with_stdin<R: Read>(args: &RunCommandArgs, stdin: R) -> RunCommandResponse {
    match execute(args, stdin) {
        Ok(report) => report_response(report),
        Err(CommandError::InputUsage(message)) => RunCommandResponse {
            exit_code: 3,
            payload: json!({
                "error": "input_usage_error",
                "message": message,
            }),
        },
    }
}

fn report_response(report: SpecReport) -> RunCommandResponse {
    let exit_code = if report.valid { 0 } else { 2 };
    match serde_json::to_value(&report) {
        Ok(payload) => RunCommandResponse { exit_code, payload },
        Err(_) => RunCommandResponse {
            exit_code: 1,
            payload: json!({
                "error": "internal_error",
                "message": "failed to serialize run report"
            }),
        },
    }
}

fn execute<R: Read>(args: &RunCommandArgs, stdin: R) -> Result<SpecReport, CommandError> {
    let spec: SpecDocument = load_document(
        "spec",
        Some(args.spec.as_path()),
        args.from,
        Format::Json,
        std::io::empty(),
    )?;
    let responses: ResponsesDocument = load_document(
        "responses",
        args.responses.as_deref(),
        args.from,
        Format::Json,
        stdin,
    )?;

    let root = loader::load(&spec, Rc::new(responses), None).map_err(map_spec_error)?;
    let report = root.run().map_err(map_spec_error)?.into_report();
    info!(
        suite = %spec.name,
        results = report.results.len(),
        pending = report.pending.len(),
        valid = report.valid,
        "validation suite finished"
    );
    Ok(report)
}
