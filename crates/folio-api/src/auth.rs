use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::Error;

/// Credential material attached to every authenticated call.
///
/// The layer treats both values as opaque: the bearer token comes from
/// whatever issued the user session, and the service key (if configured)
/// is a service-to-service secret the deployment may require in addition.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Bearer token sent as `Authorization: Bearer <token>`.
    pub token: SecretString,

    /// Optional service-to-service key sent as `x-api-key`.
    pub service_key: Option<SecretString>,
}

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            service_key: None,
        }
    }

    pub fn with_service_key(mut self, key: impl Into<String>) -> Self {
        self.service_key = Some(SecretString::from(key.into()));
        self
    }

    /// Build the default header map injected into every request.
    ///
    /// Header values are marked sensitive so they never appear in logs.
    pub(crate) fn headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", self.token.expose_secret()))
            .map_err(|e| Error::Authentication {
            message: format!("invalid bearer token header value: {e}"),
        })?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        if let Some(key) = &self.service_key {
            let mut key_value =
                HeaderValue::from_str(key.expose_secret()).map_err(|e| Error::Authentication {
                    message: format!("invalid service key header value: {e}"),
                })?;
            key_value.set_sensitive(true);
            headers.insert("x-api-key", key_value);
        }

        Ok(headers)
    }
}
