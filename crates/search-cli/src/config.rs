//! Command-line configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OLD_SEARCH_LOG_LEVEL` | warn | Log level |
//! | `OLD_SEARCH_SCHEMA` | built-in | JSON schema document |
//! | `OLD_SEARCH_MAX_DEPTH` | 32 | Maximum filter nesting depth |
//! | `OLD_SEARCH_MAX_LEAVES` | 256 | Maximum filter leaf count |
//! | `OLD_SEARCH_MAX_PAGE_SIZE` | 1000 | Maximum items per page |
//! | `OLD_SEARCH_NORMALIZE` | true | NFD-normalize string operands |

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use old_search::CompilerConfig;

/// OLD search query compiler.
#[derive(Debug, Clone, Parser)]
#[command(name = "old-search")]
#[command(about = "Compile OLD search requests into query plans")]
pub struct CliConfig {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "OLD_SEARCH_LOG_LEVEL", default_value = "warn", global = true)]
    pub log_level: String,

    /// JSON schema document to load instead of the built-in OLD schema.
    #[arg(long, env = "OLD_SEARCH_SCHEMA", global = true)]
    pub schema: Option<PathBuf>,

    /// Maximum nesting depth of a filter expression.
    #[arg(long, env = "OLD_SEARCH_MAX_DEPTH", default_value = "32", global = true)]
    pub max_depth: usize,

    /// Maximum number of leaves in a filter expression.
    #[arg(long, env = "OLD_SEARCH_MAX_LEAVES", default_value = "256", global = true)]
    pub max_leaves: usize,

    /// Maximum `itemsPerPage` a paginator may request.
    #[arg(long, env = "OLD_SEARCH_MAX_PAGE_SIZE", default_value = "1000", global = true)]
    pub max_page_size: u64,

    /// NFD-normalize string operands (`--normalize false` to disable).
    #[arg(
        long,
        env = "OLD_SEARCH_NORMALIZE",
        default_value = "true",
        action = ArgAction::Set,
        global = true
    )]
    pub normalize: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the logical query plan for a search request.
    Compile {
        /// Request file, or `-` for stdin.
        request: String,
        /// Root entity of the search.
        #[arg(long, default_value = "Form")]
        entity: String,
    },
    /// Print the SQLite statement and parameters for a search request.
    Sql {
        /// Request file, or `-` for stdin.
        request: String,
        /// Root entity of the search.
        #[arg(long, default_value = "Form")]
        entity: String,
    },
    /// Run a search request against a SQLite database.
    #[cfg(feature = "sqlite")]
    Run {
        /// Request file, or `-` for stdin.
        request: String,
        /// Root entity of the search.
        #[arg(long, default_value = "Form")]
        entity: String,
        /// SQLite database file.
        #[arg(long, env = "OLD_SEARCH_DATABASE")]
        database: PathBuf,
    },
    /// Print what an entity can be searched on.
    Params {
        /// Entity name.
        entity: String,
    },
    /// List the searchable entities.
    Entities,
}

impl CliConfig {
    /// Compiler limits taken from the command line.
    pub fn compiler_config(&self) -> CompilerConfig {
        CompilerConfig {
            normalize_strings: self.normalize,
            ..CompilerConfig::default()
        }
        .with_max_depth(self.max_depth)
        .with_max_leaves(self.max_leaves)
        .with_max_items_per_page(self.max_page_size)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !matches!(
            self.log_level.to_ascii_lowercase().as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        ) {
            errors.push(format!("Unknown log level '{}'", self.log_level));
        }

        if let Some(schema) = &self.schema {
            if !schema.is_file() {
                errors.push(format!("Schema file {} does not exist", schema.display()));
            }
        }

        if let Err(compiler_errors) = self.compiler_config().validate() {
            errors.extend(compiler_errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
