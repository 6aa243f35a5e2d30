//! NASA Pics reference host.
//!
//! This binary is the composition root. It plays the host's part for local
//! use:
//!
//! 1. **Parse configuration**: flags with environment fallbacks (`clap`).
//! 2. **Wire observability**: `tracing-subscriber` to stderr, plus an
//!    OpenTelemetry OTLP exporter when an endpoint is configured.
//! 3. **Run a command**:
//!    - `request`: resolve a NASA Pics request, attach the API key, and
//!      either print the descriptor (key masked) or dispatch it.
//!    - `uppercase`: run the Uppercase Node over a JSON array of items.
//!    - `describe`: print the node and credential type descriptions.

mod telemetry;

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dispatch::HttpDispatcher;
use node_core::{
    CredentialRecord, CredentialSource, FieldValues, Item, NodeError, ProgrammaticNode,
    RequestDispatcher, API_KEY_PARAM,
};
use nodes::{NasaPics, UppercaseNode};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::telemetry::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "nasa-pics", version, about = "Build and send NASA open-data API requests")]
struct Cli {
    /// Log output format (logs go to stderr).
    #[arg(long, env = "NASA_PICS_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    /// OTLP/gRPC endpoint to export spans to.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT", global = true)]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve (and optionally send) a NASA Pics request.
    Request(RequestArgs),
    /// Uppercase the `text` of each item in a JSON array.
    Uppercase {
        /// File holding the items; stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Print node and credential type descriptions.
    Describe,
}

#[derive(Debug, Args)]
struct RequestArgs {
    #[arg(long, default_value = nodes::nasa_pics::APOD)]
    resource: String,

    #[arg(long, default_value = nodes::nasa_pics::GET)]
    operation: String,

    /// Field values as a JSON object.
    #[arg(long, conflicts_with = "values_file")]
    values: Option<String>,

    /// File holding field values as a JSON object.
    #[arg(long)]
    values_file: Option<PathBuf>,

    #[arg(long, env = "NASA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Send the request and print the response body.
    #[arg(long)]
    dispatch: bool,
}

/// Credential source backed by a flag or environment variable.
struct ArgCredential(Option<String>);

impl CredentialSource for ArgCredential {
    fn get_credential(&self) -> Result<CredentialRecord, NodeError> {
        self.0
            .as_deref()
            .filter(|key| !key.is_empty())
            .map(CredentialRecord::new)
            .ok_or_else(|| NodeError::CredentialUnavailable {
                message: "no API key given; pass --api-key or set NASA_API_KEY".to_owned(),
            })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _telemetry = telemetry::init(cli.log_format, cli.otlp_endpoint.as_deref())?;

    let output = match cli.command {
        Command::Request(args) => request(args).await?,
        Command::Uppercase { input } => uppercase(input)?,
        Command::Describe => describe()?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn request(args: RequestArgs) -> Result<Value> {
    let values = load_values(&args)?;
    let node = NasaPics::new().context("NASA Pics node description is invalid")?;

    let request = node
        .build_request(
            &args.resource,
            &args.operation,
            &values,
            &ArgCredential(args.api_key),
        )
        .with_context(|| format!("failed to build {}/{} request", args.resource, args.operation))?;

    let shown = request.redacted(API_KEY_PARAM);
    info!(request = %shown, "request resolved");

    if !args.dispatch {
        return Ok(json!({
            "method": shown.method(),
            "url": shown.to_url()?.as_str(),
            "query": shown.query(),
            "headers": shown.headers(),
        }));
    }

    let dispatcher = HttpDispatcher::new()?;
    match dispatcher.dispatch(&request).await {
        Ok(body) => Ok(body),
        Err(e) => {
            warn!(retry = ?e.retry_policy(), "dispatch failed");
            Err(e).context("NASA API request failed")
        }
    }
}

fn load_values(args: &RequestArgs) -> Result<FieldValues> {
    let raw = match (&args.values, &args.values_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => return Ok(FieldValues::new()),
    };
    serde_json::from_str(&raw).context("field values must be a JSON object of strings and objects")
}

fn uppercase(input: Option<PathBuf>) -> Result<Value> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            buffer
        }
    };

    let items = parse_items(&raw)?;
    let output = UppercaseNode::new().execute(&items);
    Ok(serde_json::to_value(output)?)
}

/// Accepts either host-shaped items (`[{"json": {...}}]`) or bare objects.
///
/// An object counts as host-shaped only when `json` is its sole key and holds
/// an object. Anything else is taken as a bare record, so no key is dropped.
fn parse_items(raw: &str) -> Result<Vec<Item>> {
    let values: Vec<Value> =
        serde_json::from_str(raw).context("input must be a JSON array of items")?;
    Ok(values.into_iter().map(into_item).collect())
}

fn into_item(value: Value) -> Item {
    match value {
        Value::Object(mut record) if record.len() == 1 && record.get("json").is_some_and(Value::is_object) => {
            Item::from_value(record.remove("json").unwrap_or_default())
        }
        other => Item::from_value(other),
    }
}

fn describe() -> Result<Value> {
    let nasa = NasaPics::new()?;
    Ok(json!({
        "nodes": [nasa.description(), UppercaseNode::new().description()],
        "credentials": [nodes::credentials::description()],
        "routing": nasa.catalog(),
    }))
}
