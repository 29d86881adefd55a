//! Command line and layered configuration.
//!
//! Precedence, lowest first: built-in defaults, `config.{yaml,toml,json}` in
//! the working directory (or the file named by `--config`), `CHAT_`-prefixed
//! environment variables (`CHAT_SERVER__PORT=9000`), then explicit CLI flags
//! and their plain environment fallbacks (`PORT`, `CHAT_ENDPOINT`).

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::controller::{ControllerOptions, DEFAULT_ERROR_NOTICE};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, global = true, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long, global = true, env = "PORT")]
    pub port: Option<u16>,

    /// Chat endpoint used by `ask` and `chat`
    #[arg(long, global = true, env = "CHAT_ENDPOINT")]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the chat page and the streaming endpoint (default)
    Serve,
    /// Ask one question and stream the answer to stdout
    Ask {
        /// The question; multiple words are joined with spaces
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        query: Vec<String>,
    },
    /// Interactive chat on the terminal
    Chat,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding `index.html` and the page assets.
    pub static_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    /// Seconds to wait for the response and for each chunk; 0 waits forever.
    pub read_timeout_secs: u64,
    pub error_notice: String,
    pub bot_label: String,
}

impl ClientConfig {
    /// Controller options derived from this section.
    #[must_use]
    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            read_timeout: (self.read_timeout_secs > 0)
                .then(|| Duration::from_secs(self.read_timeout_secs)),
            error_notice: self.error_notice.clone(),
        }
    }
}

impl AppConfig {
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8001)?
            .set_default("server.static_dir", "static")?
            .set_default("client.endpoint", "http://localhost:8001/api/chat-stream")?
            .set_default("client.read_timeout_secs", 0)?
            .set_default("client.error_notice", DEFAULT_ERROR_NOTICE)?
            .set_default("client.bot_label", "KNOU")?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::from(path.as_path())),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix("CHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(endpoint) = &cli.endpoint {
            builder = builder.set_override("client.endpoint", endpoint.as_str())?;
        }

        builder.build()?.try_deserialize()
    }
}
