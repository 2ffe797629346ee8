use std::io;
use std::path::PathBuf;

use cfkit_client::ConnectionError;

/// Failure loading or saving the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine the home directory; set CF_HOME")]
    NoHomeDir,

    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Failure of a command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("No API endpoint set. Use '{binary_name} login' or '{binary_name} api' to target an endpoint.")]
    NoApiSet { binary_name: String },

    #[error("Not logged in. Use '{binary_name} login' to log in.")]
    NotLoggedIn { binary_name: String },

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_binary() {
        let err = CommandError::NoApiSet {
            binary_name: "cfkit".into(),
        };
        assert_eq!(
            err.to_string(),
            "No API endpoint set. Use 'cfkit login' or 'cfkit api' to target an endpoint."
        );

        let err = CommandError::NotLoggedIn {
            binary_name: "cfkit".into(),
        };
        assert_eq!(err.to_string(), "Not logged in. Use 'cfkit login' to log in.");
    }

    #[test]
    fn test_config_error_shows_path() {
        let err = ConfigError::Read {
            path: PathBuf::from("/tmp/.cf/config.json"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "failed to read /tmp/.cf/config.json: denied");
    }
}
