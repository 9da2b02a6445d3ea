use clap::{Parser, Subcommand};
use healthdocs::Result;
use healthdocs::commands::{build_index, query_once, serve, show_status};
use healthdocs::config::{Config, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "healthdocs")]
#[command(about = "Semantic question answering over a folder of healthcare documents")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and relative storage paths
    #[arg(long, global = true, env = "HEALTHDOCS_HOME")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and storage settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Rebuild the index from the document directory
    Index,
    /// Start the HTTP query server
    Serve {
        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Answer one question from the persisted index
    Query {
        /// Question text
        question: String,
    },
    /// Show configuration, embedding server and index status
    Status,
}

fn load_config(config_dir: Option<PathBuf>) -> Result<Config> {
    let config = match config_dir {
        Some(dir) => Config::load(dir)?,
        None => Config::load_default()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&load_config(cli.config_dir)?)?;
            } else {
                let dir = match cli.config_dir {
                    Some(dir) => dir,
                    None => Config::config_dir()?,
                };
                run_interactive_config(&dir)?;
            }
        }
        Commands::Index => {
            build_index(&load_config(cli.config_dir)?).await?;
        }
        Commands::Serve { host, port } => {
            let mut config = load_config(cli.config_dir)?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;
            serve(&config).await?;
        }
        Commands::Query { question } => {
            query_once(&load_config(cli.config_dir)?, &question).await?;
        }
        Commands::Status => {
            show_status(&load_config(cli.config_dir)?).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["healthdocs", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Status));
        }
    }

    #[test]
    fn index_command() {
        let cli = Cli::try_parse_from(["healthdocs", "index"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Index));
        }
    }

    #[test]
    fn query_command_with_question() {
        let cli = Cli::try_parse_from(["healthdocs", "query", "blood sugar treatment"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Query { question } = parsed.command {
                assert_eq!(question, "blood sugar treatment");
            }
        }
    }

    #[test]
    fn query_requires_question() {
        let cli = Cli::try_parse_from(["healthdocs", "query"]);
        assert!(cli.is_err());
    }

    #[test]
    fn serve_command_defaults() {
        let cli = Cli::try_parse_from(["healthdocs", "serve"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Serve { host, port } = parsed.command {
                assert_eq!(host, None);
                assert_eq!(port, None);
            }
        }
    }

    #[test]
    fn serve_command_with_overrides() {
        let cli = Cli::try_parse_from([
            "healthdocs",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Serve { host, port } = parsed.command {
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
                assert_eq!(port, Some(9000));
            }
        }
    }

    #[test]
    fn config_dir_is_global() {
        let cli = Cli::try_parse_from(["healthdocs", "status", "--config-dir", "/tmp/hd"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/hd")));
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["healthdocs", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["healthdocs", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["healthdocs", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
