use std::io;
use std::path::PathBuf;
use std::process;

use apivalid::cmd::{check, run as run_cmd};
use apivalid::io::Format;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(
    name = "apivalid",
    version,
    about = "Declarative assertions over captured HTTP API responses"
)]
struct Cli {
    /// Log filter (trace, debug, info, warn, error or an EnvFilter directive)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a validation suite against captured responses.
    Run(RunArgs),
    /// Check one captured response against one expectation.
    Check(CheckArgs),
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    #[arg(long)]
    spec: PathBuf,

    /// Responses document; read from stdin when omitted.
    #[arg(long)]
    responses: Option<PathBuf>,

    #[arg(long, value_enum)]
    from: Option<CliInputFormat>,
}

#[derive(Debug, clap::Args)]
struct CheckArgs {
    #[arg(long)]
    expect: PathBuf,

    /// Response document; read from stdin when omitted.
    #[arg(long)]
    response: Option<PathBuf>,

    #[arg(long, value_enum)]
    from: Option<CliInputFormat>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliInputFormat {
    Json,
    Yaml,
}

impl From<CliInputFormat> for Format {
    fn from(value: CliInputFormat) -> Self {
        match value {
            CliInputFormat::Json => Self::Json,
            CliInputFormat::Yaml => Self::Yaml,
        }
    }
}

#[derive(Serialize)]
struct CliError<'a> {
    error: &'a str,
    message: String,
    code: i32,
    details: Value,
}

fn main() {
    process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return handle_parse_error(error),
    };

    init_logging(&cli.log_level);
    match cli.command {
        Commands::Run(args) => run_suite(args),
        Commands::Check(args) => run_check(args),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

fn handle_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            print!("{error}");
            0
        }
        _ => {
            emit_error(
                "input_usage_error",
                error.to_string(),
                json!({"kind": "cli_parse_error"}),
                3,
            );
            3
        }
    }
}

fn run_suite(args: RunArgs) -> i32 {
    let command_args = run_cmd::RunCommandArgs {
        spec: args.spec,
        responses: args.responses,
        from: args.from.map(Format::from),
    };
    let stdin = io::stdin();
    let response = run_cmd::run_with_stdin(&command_args, stdin.lock());
    emit_response("run", response.exit_code, &response.payload)
}

fn run_check(args: CheckArgs) -> i32 {
    let command_args = check::CheckCommandArgs {
        expect: args.expect,
        response: args.response,
        from: args.from.map(Format::from),
    };
    let stdin = io::stdin();
    let response = check::run_with_stdin(&command_args, stdin.lock());
    emit_response("check", response.exit_code, &response.payload)
}

/// Reports (exit 0 and 2) go to stdout; errors (exit 1 and 3) to stderr.
fn emit_response(command: &str, exit_code: i32, payload: &Value) -> i32 {
    let emitted = match exit_code {
        0 | 2 => emit_json_stdout(payload),
        1 | 3 => emit_json_stderr(payload),
        other => {
            emit_error(
                "internal_error",
                format!("unexpected {command} exit code: {other}"),
                json!({"command": command}),
                1,
            );
            return 1;
        }
    };
    if emitted {
        exit_code
    } else {
        emit_error(
            "internal_error",
            format!("failed to serialize {command} response"),
            json!({"command": command}),
            1,
        );
        1
    }
}

fn emit_json_stdout(value: &Value) -> bool {
    match serde_json::to_string(value) {
        Ok(serialized) => {
            println!("{serialized}");
            true
        }
        Err(_) => false,
    }
}

fn emit_json_stderr(value: &Value) -> bool {
    match serde_json::to_string(value) {
        Ok(serialized) => {
            eprintln!("{serialized}");
            true
        }
        Err(_) => false,
    }
}

fn emit_error(error: &'static str, message: String, details: Value, code: i32) {
    let payload = CliError {
        error,
        message,
        code,
        details,
    };
    match serde_json::to_string(&payload) {
        Ok(serialized) => eprintln!("{serialized}"),
        Err(_) => eprintln!(
            "{{\"error\":\"internal_error\",\"message\":\"failed to serialize error\",\"code\":1}}"
        ),
    }
}
