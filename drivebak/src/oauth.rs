use oauth2::{AuthUrl, ClientId, ClientSecret, TokenUrl};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::{auth_bail, auth_error, path::FsPath, Result};

/// Application credentials used to refresh expired access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub auth_url: AuthUrl,
    pub token_url: TokenUrl,
}

/// Reads a Google `client_secret.json` file.
pub async fn load_google_secret(path: &FsPath) -> Result<Secret> {
    let json = fs::read(path).await?;
    secret_from_json(&json).map_err(|err| auth_error!("invalid secret file {path}: {err}"))
}

fn secret_from_json(json: &[u8]) -> Result<Secret> {
    let goog: GoogleAppSecret =
        serde_json::from_slice(json).map_err(|err| auth_error!("{err}"))?;
    match goog {
        GoogleAppSecret::Installed(secret) => Ok(Secret {
            client_id: ClientId::new(secret.client_id),
            client_secret: ClientSecret::new(secret.client_secret),
            auth_url: AuthUrl::new(secret.auth_uri).map_err(|err| auth_error!("{err}"))?,
            token_url: TokenUrl::new(secret.token_uri).map_err(|err| auth_error!("{err}"))?,
        }),
        GoogleAppSecret::Web(_) => auth_bail!(
            "wrong kind of secret file. Please get a secret file with an \"installed\" field"
        ),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GoogleSecret {
    client_id: String,
    client_secret: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    redirect_uris: Vec<String>,
    auth_uri: String,
    token_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum GoogleAppSecret {
    Installed(GoogleSecret),
    Web(GoogleSecret),
}
