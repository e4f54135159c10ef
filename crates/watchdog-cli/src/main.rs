//! wd: control watchdogs from the command line.

mod output;

use clap::{Parser, Subcommand};

use watchdog_client::{ensure_valid, Result, WatchdogClient, DEFAULT_KICK_TTL};

use output::StatusOptions;

#[derive(Parser, Debug)]
#[command(name = "wd")]
#[command(about = "Control watchdogs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or kick a watchdog
    Kick {
        /// Full watchdog name
        name: String,
        /// Seconds until the watchdog expires without another kick
        #[arg(default_value_t = DEFAULT_KICK_TTL)]
        timeout: u64,
    },

    /// Fault a watchdog
    Fault {
        /// Full watchdog name
        name: String,
        /// Reason text; multiple arguments are joined with spaces
        #[arg(required = true, num_args = 1..)]
        reason: Vec<String>,
    },

    /// Retire a set of watchdogs by prefix
    Retire { prefix: String },

    /// Create a new prefix auth key
    Auth { prefix: String },

    /// Clear the cumulative downtime on a prefix
    Clear { prefix: String },

    /// List watchdog status
    Status {
        prefix: String,

        /// Suppress the header row
        #[arg(long)]
        noheader: bool,

        /// Disable colored output
        #[arg(long)]
        nocolor: bool,

        /// Tab-separated output (implies --noheader and --nocolor)
        #[arg(long)]
        tabsep: bool,

        /// Keep the service's row order instead of printing faulted rows first
        #[arg(long)]
        nobadfirst: bool,
    },
}

impl Commands {
    /// The name or prefix this command operates on, validated before any
    /// credential resolution or network activity.
    fn target(&self) -> &str {
        match self {
            Commands::Kick { name, .. } | Commands::Fault { name, .. } => name,
            Commands::Retire { prefix }
            | Commands::Auth { prefix }
            | Commands::Clear { prefix }
            | Commands::Status { prefix, .. } => prefix,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli.command).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    ensure_valid(command.target())?;
    let client = WatchdogClient::from_env()?;
    match command {
        Commands::Kick { name, timeout } => client.kick(&name, timeout).await,
        Commands::Fault { name, reason } => client.fault(&name, &reason.join(" ")).await,
        Commands::Retire { prefix } => client.retire(&prefix).await,
        Commands::Clear { prefix } => client.clear(&prefix).await,
        Commands::Auth { prefix } => {
            let key = client.auth(&prefix).await?;
            println!("{key}");
            Ok(())
        }
        Commands::Status {
            prefix,
            noheader,
            nocolor,
            tabsep,
            nobadfirst,
        } => {
            let rows = client.status(&prefix).await?;
            output::render_status(
                &rows,
                StatusOptions {
                    noheader,
                    nocolor,
                    tabsep,
                    nobadfirst,
                },
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_all_subcommands() {
        Cli::try_parse_from(["wd", "kick", "svc.service", "600"]).unwrap();
        Cli::try_parse_from(["wd", "fault", "svc.service", "down", "for", "repair"]).unwrap();
        Cli::try_parse_from(["wd", "retire", "host.sd"]).unwrap();
        Cli::try_parse_from(["wd", "auth", "host"]).unwrap();
        Cli::try_parse_from(["wd", "clear", "host"]).unwrap();
        Cli::try_parse_from(["wd", "status", "host", "--tabsep", "--nobadfirst"]).unwrap();
    }

    #[test]
    fn test_kick_timeout_defaults() {
        let cli = Cli::try_parse_from(["wd", "kick", "svc.service"]).unwrap();
        match cli.command {
            Commands::Kick { timeout, .. } => assert_eq!(timeout, DEFAULT_KICK_TTL),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_fault_requires_a_reason() {
        assert!(Cli::try_parse_from(["wd", "fault", "svc.service"]).is_err());
    }

    #[test]
    fn test_target_extraction() {
        let cli = Cli::try_parse_from(["wd", "status", "host.sd"]).unwrap();
        assert_eq!(cli.command.target(), "host.sd");
    }

    #[tokio::test]
    async fn test_invalid_name_fails_before_credential_resolution() {
        // InvalidName, not a credential error, regardless of whether the
        // environment has a token: validation runs first.
        let cli = Cli::try_parse_from(["wd", "kick", "Bad/Name"]).unwrap();
        let err = run(cli.command).await.unwrap_err();
        assert!(matches!(
            err,
            watchdog_client::WatchdogError::InvalidName { .. }
        ));
    }
}
