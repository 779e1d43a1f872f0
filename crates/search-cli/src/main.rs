//! OLD Search (`old-search`)
//!
//! Compiles OLD search requests from files or stdin and prints plans, SQL or
//! search parameters as JSON on stdout. Logs go to stderr.

mod config;

use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::{Value, json};
use tracing::{debug, info};

use old_search::schema::builtin::old_schema;
use old_search::sql::{SqlParam, SqlRenderer};
use old_search::{LogicalQueryPlan, SchemaDocument, SchemaRegistry, SearchCompiler, SearchError};

use crate::config::{CliConfig, Command};

/// Exit status for a rejected search request.
const EXIT_REJECTED: u8 = 2;

/// Initializes logging to stderr.
///
/// `RUST_LOG` takes precedence over `level`.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("old_search={0},old_search_cli={0}", level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_registry(config: &CliConfig) -> anyhow::Result<Arc<SchemaRegistry>> {
    let registry = match &config.schema {
        Some(path) => {
            info!(schema = %path.display(), "Loading schema document");
            SchemaDocument::from_path(path)?.into_registry()?
        }
        None => old_schema()?,
    };
    debug!(entities = registry.len(), "Schema registry ready");
    Ok(Arc::new(registry))
}

fn read_request(source: &str) -> anyhow::Result<Value> {
    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read request file {}", source))?
    };
    serde_json::from_str(&text).context("Request is not valid JSON")
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn param_json(param: &SqlParam) -> Value {
    match param {
        SqlParam::String(s) => Value::String(s.clone()),
        SqlParam::Integer(i) => json!(i),
        SqlParam::Float(f) => json!(f),
        SqlParam::Null => Value::Null,
    }
}

/// Prints the error body of a rejected request on stdout.
fn reject(error: &SearchError) -> anyhow::Result<ExitCode> {
    info!(code = error.code(), "Search request rejected");
    print_json(&error.to_response_body())?;
    Ok(ExitCode::from(EXIT_REJECTED))
}

fn compile_request(
    compiler: &SearchCompiler,
    entity: &str,
    source: &str,
) -> anyhow::Result<Result<LogicalQueryPlan, SearchError>> {
    let request = read_request(source)?;
    Ok(compiler.compile_request(entity, &request))
}

fn run(config: CliConfig) -> anyhow::Result<ExitCode> {
    let registry = load_registry(&config)?;
    let compiler = SearchCompiler::with_config(registry.clone(), config.compiler_config());

    match &config.command {
        Command::Compile { request, entity } => {
            match compile_request(&compiler, entity, request)? {
                Ok(plan) => print_json(&plan)?,
                Err(e) => return reject(&e),
            }
        }
        Command::Sql { request, entity } => {
            let plan = match compile_request(&compiler, entity, request)? {
                Ok(plan) => plan,
                Err(e) => return reject(&e),
            };
            let renderer = SqlRenderer::new(&registry);
            let select = renderer.render(&plan)?;
            let count = renderer.render_count(&plan)?;
            print_json(&json!({
                "sql": select.sql,
                "params": select.params.iter().map(param_json).collect::<Vec<_>>(),
                "countSql": count.sql,
                "countParams": count.params.iter().map(param_json).collect::<Vec<_>>(),
            }))?;
        }
        #[cfg(feature = "sqlite")]
        Command::Run {
            request,
            entity,
            database,
        } => {
            let plan = match compile_request(&compiler, entity, request)? {
                Ok(plan) => plan,
                Err(e) => return reject(&e),
            };
            let executor = old_search::SqliteExecutor::open(database, registry.clone())
                .with_context(|| format!("Failed to open database {}", database.display()))?;
            let ids = executor.execute(&plan)?;
            let count = executor.count(&plan)?;
            print_json(&json!({"ids": ids, "count": count}))?;
        }
        Command::Params { entity } => match compiler.search_parameters(entity) {
            Ok(params) => print_json(&params)?,
            Err(e) => return reject(&e),
        },
        Command::Entities => print_json(&registry.searchable_entity_names())?,
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> anyhow::Result<ExitCode> {
    let config = CliConfig::parse();

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        return Ok(ExitCode::FAILURE);
    }

    init_logging(&config.log_level);
    run(config)
}
