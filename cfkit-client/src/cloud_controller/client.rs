//! Cloud controller client and its builder.

use std::sync::Arc;

use http::HeaderValue;
use http::header::USER_AGENT;

use super::info::ApiInfo;
use super::resource::{Filter, Page, Resource, encode_filters};
use super::security_group::{SecurityGroup, SecurityGroupEntity};
use crate::config::TargetSettings;
use crate::{Connection, ConnectionError, ConnectionWrapper, HttpConnection, Request, Response};

/// Builder for creating a [`CloudControllerClient`].
///
/// # Example
///
/// ```ignore
/// use cfkit_client::{ClientBuilder, TargetSettings};
///
/// let client = ClientBuilder::new("cfkit", env!("CARGO_PKG_VERSION"))
///     .target(TargetSettings::new("https://api.example.com"))
///     .await?;
/// println!("API version {}", client.info().api_version);
/// ```
pub struct ClientBuilder {
    binary_name: String,
    version: String,
    /// Pre-built base connection; an [`HttpConnection`] is created otherwise.
    connection: Option<Arc<dyn Connection>>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("binary_name", &self.binary_name)
            .field("version", &self.version)
            .field("connection", &self.connection.is_some())
            .finish()
    }
}

impl ClientBuilder {
    /// Create a builder for a client identifying itself as `binary_name/version`.
    pub fn new(binary_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            binary_name: binary_name.into(),
            version: version.into(),
            connection: None,
        }
    }

    /// Send through `connection` instead of a new [`HttpConnection`].
    pub fn connection(mut self, connection: Arc<dyn Connection>) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Connect to `settings.url` and read its `/v2/info`.
    ///
    /// Fails with [`ConnectionError::Configuration`] when the URL is empty.
    pub async fn target(self, settings: TargetSettings) -> Result<CloudControllerClient, ConnectionError> {
        if settings.base_url().is_empty() {
            return Err(ConnectionError::Configuration("no API target set".into()));
        }

        let user_agent = format!(
            "{}/{} ({}; {})",
            self.binary_name,
            self.version,
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        let user_agent = HeaderValue::from_str(&user_agent)
            .map_err(|_| ConnectionError::Configuration(format!("invalid user agent: {}", user_agent)))?;

        let connection = match self.connection {
            Some(connection) => connection,
            None => Arc::new(HttpConnection::for_target(&settings)?),
        };

        let mut client = CloudControllerClient {
            connection,
            settings,
            info: ApiInfo::default(),
            user_agent,
        };

        let info: ApiInfo = client.send(Request::get(client.url("/v2/info"))).await?.json()?;
        tracing::debug!(
            target_url = %client.settings.url,
            api_version = %info.api_version,
            "targeted cloud controller"
        );
        client.info = info;
        Ok(client)
    }
}

/// Client for the cloud controller v2 API.
///
/// Owns the target settings and the wrapped connection. Every typed
/// operation builds one or more [`Request`]s and sends them through that
/// connection.
pub struct CloudControllerClient {
    connection: Arc<dyn Connection>,
    settings: TargetSettings,
    info: ApiInfo,
    user_agent: HeaderValue,
}

impl std::fmt::Debug for CloudControllerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudControllerClient")
            .field("settings", &self.settings)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl CloudControllerClient {
    /// Wrap the current connection. Wrappers added later run first.
    pub fn wrap_connection(&mut self, wrapper: impl ConnectionWrapper) {
        self.connection = wrapper.wrap(self.connection.clone());
    }

    pub fn target_settings(&self) -> &TargetSettings {
        &self.settings
    }

    /// The `/v2/info` document read when targeting.
    pub fn info(&self) -> &ApiInfo {
        &self.info
    }

    pub fn api_url(&self) -> &str {
        self.settings.base_url()
    }

    pub fn api_version(&self) -> &str {
        &self.info.api_version
    }

    pub fn authorization_endpoint(&self) -> &str {
        &self.info.authorization_endpoint
    }

    /// Base URL of the identity service.
    pub fn token_endpoint(&self) -> &str {
        &self.info.token_endpoint
    }

    pub fn min_cli_version(&self) -> Option<&str> {
        self.info.min_cli_version.as_deref()
    }

    /// List security groups matching every filter, following pagination.
    pub async fn get_security_groups(
        &self,
        filters: &[Filter],
    ) -> Result<Vec<SecurityGroup>, ConnectionError> {
        let query = encode_filters(filters)?;
        let mut path = if query.is_empty() {
            "/v2/security_groups".to_string()
        } else {
            format!("/v2/security_groups?{}", query)
        };

        let mut groups = Vec::new();
        loop {
            let page: Page<Resource<SecurityGroupEntity>> =
                self.send(Request::get(self.url(&path))).await?.json()?;
            groups.extend(page.resources.into_iter().map(SecurityGroup::from));

            match page.next_url {
                Some(next) if !next.is_empty() => path = next,
                _ => return Ok(groups),
            }
        }
    }

    /// Delete the security group `guid`.
    pub async fn delete_security_group(&self, guid: &str) -> Result<(), ConnectionError> {
        self.send(Request::delete(
            self.url(&format!("/v2/security_groups/{}", guid)),
        ))
        .await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url(), path)
    }

    async fn send(&self, request: Request) -> Result<Response, ConnectionError> {
        let request = request
            .accept_json()
            .header(USER_AGENT, self.user_agent.clone());
        self.connection.make(request).await
    }
}
