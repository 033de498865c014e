//! CLI command definitions for the `morphic` binary.

pub mod cache;
pub mod chats;
pub mod show;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use morphic_observe::tracing_setup::LogFormat;

/// Morphic answer engine backend.
#[derive(Parser)]
#[command(name = "morphic", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Detailed logs (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format: pretty or json.
    #[arg(long, global = true, env = "MORPHIC_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,

    /// Also export spans to stdout through OpenTelemetry.
    #[arg(long, global = true, env = "MORPHIC_OTEL")]
    pub otel: bool,

    /// Directory holding config.toml, models.toml and the database.
    #[arg(long, global = true, env = "MORPHIC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server.
    Serve {
        /// Interface to bind (defaults to the configured host).
        #[arg(long, env = "HOST")]
        host: Option<String>,

        /// Port to listen on (defaults to the configured port).
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
    },

    /// Apply database migrations and exit.
    Migrate,

    /// List a user's saved chats.
    Chats {
        /// Owner of the chats (defaults to the anonymous user id).
        #[arg(short, long)]
        user: Option<String>,

        /// Maximum number of chats to show.
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },

    /// Print one saved chat as a transcript with resolved citations.
    Show {
        /// Chat id.
        chat_id: String,

        /// Include the model's reasoning parts.
        #[arg(long)]
        reasoning: bool,
    },

    /// Print the effective chat cache settings.
    CacheConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_with_overrides() {
        let cli = Cli::try_parse_from(["morphic", "--log-format", "json", "serve", "--port", "8080"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(8080));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn chats_limit_defaults_to_twenty() {
        let cli = Cli::try_parse_from(["morphic", "chats", "--user", "alice"]).unwrap();
        match cli.command {
            Commands::Chats { user, limit } => {
                assert_eq!(user.as_deref(), Some("alice"));
                assert_eq!(limit, 20);
            }
            _ => panic!("expected chats"),
        }
    }

    #[test]
    fn show_takes_chat_id_positionally() {
        let cli = Cli::try_parse_from(["morphic", "show", "chat-123", "--reasoning"]).unwrap();
        match cli.command {
            Commands::Show { chat_id, reasoning } => {
                assert_eq!(chat_id, "chat-123");
                assert!(reasoning);
            }
            _ => panic!("expected show"),
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }
}
