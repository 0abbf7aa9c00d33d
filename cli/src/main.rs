mod definition;
mod error;
mod record;

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use databind_core::{ConvertOptions, FieldErrors};
use databind_input::DEFAULT_BODY_LIMIT;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::definition::{FieldDef, SchemaDef};
use crate::error::CliError;
use crate::record::{Record, build_fields, build_schema};

/// Output format for `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "databind")]
#[command(about = "Bind and validate payloads against YAML schema definitions")]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Bind a payload file and print the result or its field errors.
    Check(CheckArgs),
    /// Print the fields of a schema definition.
    Describe(DescribeArgs),
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// YAML schema definition.
    #[arg(long)]
    schema: PathBuf,
    /// Payload file, or `-` for stdin.
    #[arg(long)]
    payload: PathBuf,
    /// Content type of the payload; guessed from the body when omitted.
    #[arg(long)]
    content_type: Option<String>,
    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
    /// Only report assignment errors.
    #[arg(long)]
    skip_validation: bool,
    /// Maximum payload size in bytes.
    #[arg(long, default_value_t = DEFAULT_BODY_LIMIT)]
    limit: usize,
}

#[derive(Debug, Args)]
struct DescribeArgs {
    /// YAML schema definition.
    #[arg(long)]
    schema: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Command::Check(args) => run_check(args),
        Command::Describe(args) => run_describe(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let def = SchemaDef::load(&args.schema).map_err(|e| e.to_string())?;
    let mut schema = build_schema(&def).map_err(|e| e.to_string())?;
    if args.skip_validation {
        schema = schema.skip_validation();
    }

    let body = read_payload(&args.payload).map_err(|e| e.to_string())?;
    let data = databind_input::decode(args.content_type.as_deref(), &body, args.limit)
        .map_err(|e| CliError::from(e).to_string())?;

    let mut record = Record::default();
    let binding = schema.run(&data, &mut record);
    info!(
        fields = schema.len(),
        errors = binding.errors().len(),
        "Payload checked"
    );

    if binding.is_ok() {
        let rendered = serde_json::to_string_pretty(&record.to_json(&def.fields))
            .map_err(|e| e.to_string())?;
        println!("{rendered}");
        return Ok(());
    }

    let errors = binding.errors();
    print!("{}", render_errors(errors, args.format).map_err(|e| e.to_string())?);
    Err(format!("{} field error(s)", errors.len()))
}

fn run_describe(args: DescribeArgs) -> Result<(), String> {
    let def = SchemaDef::load(&args.schema).map_err(|e| e.to_string())?;
    let mut lines = Vec::new();
    describe_fields(&def.fields, &def.options.convert_options(), 0, &mut lines)
        .map_err(|e| e.to_string())?;
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn read_payload(path: &Path) -> Result<Vec<u8>, CliError> {
    if path.as_os_str() == "-" {
        let mut body = Vec::new();
        std::io::stdin().read_to_end(&mut body)?;
        return Ok(body);
    }
    Ok(fs::read(path)?)
}

fn render_errors(errors: &FieldErrors, format: OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(errors)?),
        OutputFormat::Text => errors.iter().map(|error| format!("{error}\n")).collect(),
    })
}

/// Lists fields as `name (shape): description`, indenting nested levels.
fn describe_fields(
    fields: &[FieldDef],
    convert: &ConvertOptions,
    depth: usize,
    lines: &mut Vec<String>,
) -> Result<(), CliError> {
    let schema = build_fields(fields, convert)?;
    for (field, def) in schema.fields().zip(fields) {
        let mut line = format!("{}{} ({})", "  ".repeat(depth), field.name(), field.shape());
        if let Some(description) = field.description() {
            line.push_str(": ");
            line.push_str(description);
        }
        lines.push(line);
        describe_fields(&def.fields, convert, depth + 1, lines)?;
    }
    Ok(())
}
