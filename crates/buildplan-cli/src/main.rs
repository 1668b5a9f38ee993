//! buildplan CLI tool.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::OutputFormat;

#[derive(Parser)]
#[command(name = "buildplan")]
#[command(about = "Resolve declarative CI build configurations", long_about = None)]
struct Cli {
    /// Path to the project configuration
    #[arg(
        short = 'f',
        long,
        global = true,
        env = "BUILDPLAN_CONFIG",
        default_value = "buildplan.kdl"
    )]
    config: PathBuf,

    /// Extra variables for ${env.*} placeholders
    #[arg(long = "env", global = true, value_name = "KEY=VALUE", value_parser = parse_key_value)]
    env: Vec<(String, String)>,

    /// Do not read the process environment
    #[arg(long, global = true)]
    clean_env: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that every variant resolves
    Validate,
    /// List VCS roots, templates and variants
    List,
    /// Print resolved run descriptors
    Resolve {
        /// Only resolve this variant
        #[arg(long)]
        variant: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Check a variant's requirements against agent capabilities
    CheckAgent {
        /// Variant to check
        #[arg(long)]
        variant: String,
        /// Capability of an ad-hoc agent
        #[arg(short = 'c', long = "capability", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        capabilities: Vec<(String, String)>,
        /// KDL file describing agents
        #[arg(long)]
        agents: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show upcoming scheduled trigger times for a variant
    Schedule {
        /// Variant to inspect
        #[arg(long)]
        variant: String,
        /// Start time (RFC 3339), defaults to now
        #[arg(long)]
        after: Option<DateTime<Utc>>,
        /// Number of firings per trigger
        #[arg(long, default_value = "3")]
        count: usize,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so JSON output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let env = commands::environment(cli.clean_env, &cli.env);

    match cli.command {
        Commands::Validate => {
            commands::validate(&cli.config, env)?;
        }
        Commands::List => {
            commands::list(&cli.config)?;
        }
        Commands::Resolve { variant, format } => {
            commands::resolve::run(&cli.config, env, variant.as_deref(), format)?;
        }
        Commands::CheckAgent {
            variant,
            capabilities,
            agents,
            format,
        } => {
            commands::agent::check(
                &cli.config,
                env,
                &variant,
                capabilities,
                agents.as_deref(),
                format,
            )?;
        }
        Commands::Schedule {
            variant,
            after,
            count,
        } => {
            let after = after.unwrap_or_else(Utc::now);
            commands::schedule::show(&cli.config, &variant, after, count)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("JDK_17=/opt/jdk=17").unwrap(),
            ("JDK_17".to_string(), "/opt/jdk=17".to_string())
        );
        assert_eq!(parse_key_value("EMPTY=").unwrap().1, "");
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_parse_check_agent() {
        let cli = Cli::try_parse_from([
            "buildplan",
            "check-agent",
            "--variant",
            "JavaBuild",
            "-c",
            "os.name=Linux",
            "--config",
            "demo.kdl",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("demo.kdl"));
        match cli.command {
            Commands::CheckAgent { capabilities, .. } => {
                assert_eq!(capabilities, vec![("os.name".to_string(), "Linux".to_string())]);
            }
            _ => panic!("expected check-agent"),
        }
    }
}
