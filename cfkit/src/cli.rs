//! Command-line arguments.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cfkit_client::Credentials;
use clap::{Parser, Subcommand};

use crate::CommandError;
use crate::commands::{DeleteSecurityGroup, DeleteSecurityGroupArgs};
use crate::config::{CliConfig, ConfigFile, Overrides};
use crate::ui::Ui;

#[derive(Parser, Debug)]
#[command(name = "cfkit", version, about = "Command-line client for the cloud controller API")]
pub struct Cli {
    /// Print API requests and responses
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding `.cf/config.json` instead of the home directory
    #[arg(long, env = "CF_HOME", hide = true)]
    pub cf_home: Option<PathBuf>,

    /// `true` to trace to the terminal, or a file to trace to
    #[arg(long, env = "CF_TRACE", hide = true)]
    pub trace: Option<String>,

    /// Seconds to wait for a connection to be established
    #[arg(long, env = "CF_DIAL_TIMEOUT", hide = true, value_parser = parse_seconds)]
    pub dial_timeout: Option<Duration>,

    #[arg(long, env = "CF_USERNAME", hide = true)]
    pub username: Option<String>,

    #[arg(long, env = "CF_PASSWORD", hide = true, hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Deletes a security group
    DeleteSecurityGroup(DeleteSecurityGroupArgs),
}

impl Command {
    /// Name of the command as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Command::DeleteSecurityGroup(_) => "delete-security-group",
        }
    }
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| format!("invalid number of seconds: {}", value))
}

impl Cli {
    /// Settings that take precedence over the configuration file.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            verbose: self.verbose,
            trace: self.trace.clone(),
            dial_timeout: self.dial_timeout,
        }
    }

    /// Credentials for the password grant, when both parts are set.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) if !username.is_empty() => {
                Some(Credentials::new(username, password))
            }
            _ => None,
        }
    }

    /// Load the configuration and run the selected command.
    pub async fn run(self, ui: Arc<dyn Ui>) -> Result<(), CommandError> {
        let path = ConfigFile::default_path(self.cf_home.as_deref())?;
        let file = ConfigFile::load(path)?.with_credentials(self.credentials());
        let config = Arc::new(CliConfig::new("cfkit", Arc::new(file), self.overrides()));

        match &self.command {
            Command::DeleteSecurityGroup(args) => {
                DeleteSecurityGroup::new(config, ui).execute(args).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("cfkit").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_delete_security_group() {
        let cli = parse(&["delete-security-group", "web", "-f"]).unwrap();
        assert_eq!(
            cli.command,
            Command::DeleteSecurityGroup(DeleteSecurityGroupArgs {
                security_group: "web".into(),
                force: true,
            })
        );
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = parse(&["delete-security-group", "web", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.overrides().verbose);
    }

    #[test]
    fn test_security_group_is_required() {
        assert!(parse(&["delete-security-group"]).is_err());
    }

    #[test]
    fn test_dial_timeout_is_seconds() {
        let cli = parse(&["--dial-timeout", "30", "delete-security-group", "web"]).unwrap();
        assert_eq!(cli.overrides().dial_timeout, Some(Duration::from_secs(30)));
        assert!(parse(&["--dial-timeout", "soon", "delete-security-group", "web"]).is_err());
    }

    #[test]
    fn test_credentials_need_username_and_password() {
        let cli = parse(&["--username", "admin", "delete-security-group", "web"]).unwrap();
        if cli.password.is_none() {
            assert!(cli.credentials().is_none());
        }

        let cli = parse(&[
            "--username",
            "admin",
            "--password",
            "secret",
            "delete-security-group",
            "web",
        ])
        .unwrap();
        assert_eq!(cli.credentials(), Some(Credentials::new("admin", "secret")));
    }
}
