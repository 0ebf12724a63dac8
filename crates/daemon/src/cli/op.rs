use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use strongbox_daemon::state::{AppState, DEFAULT_API_PORT};

const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolve the daemon URL.
///
/// Priority: explicit `--remote` flag > config file `api_port` > the default port.
pub fn resolve_remote(explicit: Option<Url>, config_path: Option<PathBuf>) -> Url {
    if let Some(url) = explicit {
        return url;
    }
    let port = AppState::load(config_path)
        .map(|state| state.config.api_port)
        .unwrap_or(DEFAULT_API_PORT);
    Url::parse(&format!("http://localhost:{port}")).expect("localhost URL must parse")
}

#[derive(Clone)]
pub struct OpContext {
    /// Base URL of the daemon API
    pub remote: Url,
    /// HTTP client for talking to the daemon
    pub client: reqwest::Client,
    /// Optional custom state directory (defaults to ~/.strongbox)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    pub fn new(remote: Url, config_path: Option<PathBuf>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(CLIENT_TIMEOUT).build()?;
        Ok(Self {
            remote,
            client,
            config_path,
        })
    }

    /// Absolute URL for a path on the daemon.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.remote.as_str().trim_end_matches('/'), path)
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_remote_explicit_wins() {
        let explicit = Url::parse("http://example.com:9999").unwrap();
        let result = resolve_remote(Some(explicit.clone()), None);
        assert_eq!(result, explicit);
    }

    #[test]
    fn test_resolve_remote_falls_back_to_default() {
        let result = resolve_remote(None, Some(PathBuf::from("/nonexistent")));
        assert_eq!(result.as_str(), "http://localhost:5080/");
    }

    #[test]
    fn test_resolve_remote_reads_config_port() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("state");
        let mut config = strongbox_daemon::AppConfig::for_dir(&dir);
        config.api_port = 6123;
        AppState::init(Some(dir.clone()), Some(config)).unwrap();

        let result = resolve_remote(None, Some(dir));
        assert_eq!(result.port(), Some(6123));
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let ctx = OpContext::new(Url::parse("http://localhost:5080/").unwrap(), None).unwrap();
        assert_eq!(
            ctx.endpoint("/_status/livez"),
            "http://localhost:5080/_status/livez"
        );
    }
}
