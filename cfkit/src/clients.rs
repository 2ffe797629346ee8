//! Assembly of the connection pipeline for commands.

use std::sync::Arc;

use cfkit_client::{
    ClientBuilder, CloudControllerClient, RequestLogger, RequestLoggerOutput, RetryRequest,
    TargetSettings, UaaAuthentication, UaaClient, UaaConfig,
};

use crate::CommandError;
use crate::config::Config;
use crate::logging::{FileWriter, TerminalDisplay};
use crate::ui::Ui;

/// Retries applied to transient failures.
pub const MAX_RETRIES: u32 = 2;

/// Build the cloud controller and identity service clients for `config`.
///
/// Requests made by the cloud controller client pass through, outermost
/// first, a [`RetryRequest`], a [`UaaAuthentication`] and one
/// [`RequestLogger`] per configured trace sink. The identity client carries
/// the same loggers. Fails with [`CommandError::NoApiSet`] before touching
/// the network when no target is configured.
pub async fn new_clients(
    config: &dyn Config,
    ui: Arc<dyn Ui>,
) -> Result<(CloudControllerClient, UaaClient), CommandError> {
    let target = config.target();
    if target.is_empty() {
        return Err(CommandError::NoApiSet {
            binary_name: config.binary_name().to_string(),
        });
    }

    let mut cc_client = ClientBuilder::new(config.binary_name(), config.binary_version())
        .target(
            TargetSettings::new(target)
                .skip_ssl_validation(config.skip_ssl_validation())
                .dial_timeout(config.dial_timeout()),
        )
        .await?;

    let mut uaa_client = UaaClient::new(
        UaaConfig::new(cc_client.token_endpoint())
            .skip_ssl_validation(config.skip_ssl_validation())
            .dial_timeout(config.dial_timeout()),
    )?;

    let (verbose, location) = config.verbose();
    let mut outputs: Vec<Arc<dyn RequestLoggerOutput>> = Vec::new();
    if verbose {
        outputs.push(Arc::new(TerminalDisplay::new(ui.clone())));
    }
    if let Some(path) = location {
        outputs.push(Arc::new(FileWriter::new(ui, path)));
    }
    for output in outputs {
        let logger = RequestLogger::from_shared(output);
        uaa_client.wrap_connection(logger.clone());
        cc_client.wrap_connection(logger);
    }

    cc_client.wrap_connection(UaaAuthentication::new(
        uaa_client.clone(),
        config.token_store(),
    ));
    cc_client.wrap_connection(RetryRequest::new(MAX_RETRIES));

    tracing::debug!(
        target_url = %cc_client.api_url(),
        token_endpoint = %cc_client.token_endpoint(),
        "assembled connection pipeline"
    );
    Ok((cc_client, uaa_client))
}
