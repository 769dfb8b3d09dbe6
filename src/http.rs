use std::sync::OnceLock;

use crate::client::{ApiClient, ClientError};
use crate::config::ClientConfig;

static SHARED_CLIENT: OnceLock<ApiClient> = OnceLock::new();

/// Return the process-wide [`ApiClient`] built from [`ClientConfig::default`].
///
/// The client is built on first use and every later call hands back the same
/// instance, so all callers share one connection pool and one cookie jar. If
/// two threads race on the first call, both may build a client but only the
/// one stored first is ever returned.
pub fn shared_client() -> Result<&'static ApiClient, ClientError> {
    if let Some(client) = SHARED_CLIENT.get() {
        return Ok(client);
    }
    let client = ApiClient::new(ClientConfig::default())?;
    Ok(SHARED_CLIENT.get_or_init(|| client))
}

/// Build a standalone client that does not touch the shared instance.
pub fn client_for(config: ClientConfig) -> Result<ApiClient, ClientError> {
    ApiClient::new(config)
}
