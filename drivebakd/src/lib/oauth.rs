use std::sync::Arc;

use chrono::{DateTime, Utc};
use drivebak::{
    auth_bail, auth_error,
    path::{FsPath, FsPathBuf},
    Result,
};
use futures::Future;
use oauth2::{
    basic::BasicClient, AccessToken, HttpRequest, HttpResponse, RefreshToken, Scope, TokenResponse,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

pub trait GetToken: Send + Sync + 'static {
    fn get_token(&self, scopes: Vec<Scope>) -> impl Future<Output = Result<AccessToken>> + Send;
}

/// One previously authorized token, as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenEntry {
    scopes: Vec<Scope>,
    access_token: AccessToken,
    refresh_token: Option<RefreshToken>,
    expiration: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum Lookup {
    None,
    Expired(RefreshToken, Vec<Scope>),
    Ok(AccessToken),
}

#[derive(Debug, Default)]
struct TokenStore {
    entries: Vec<TokenEntry>,
}

impl TokenStore {
    /// Attempts to read the store from disk.
    /// Returns `Ok(None)` if the file can't be read.
    /// Returns `Err` if the deserialization failed.
    async fn try_read_from_disk(path: &FsPath) -> Result<Option<Self>> {
        let json = match tokio::fs::read_to_string(path).await {
            Ok(json) => json,
            Err(_) => return Ok(None),
        };
        let entries = serde_json::from_str(&json)
            .map_err(|err| auth_error!("invalid token store {path}: {err}"))?;
        Ok(Some(TokenStore { entries }))
    }

    async fn write_to_disk(&self, path: &FsPath) -> Result<()> {
        log::info!("caching tokens to {path}");
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|err| auth_error!("could not serialize token store: {err}"))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    fn get(&self, scopes: &[Scope]) -> Lookup {
        for ent in self.entries.iter() {
            if !scopes.iter().all(|s| ent.scopes.contains(s)) {
                continue;
            }
            if let Some(expiration) = ent.expiration {
                if expiration < Utc::now() {
                    return match &ent.refresh_token {
                        Some(refresh_token) => {
                            Lookup::Expired(refresh_token.clone(), ent.scopes.clone())
                        }
                        None => Lookup::None,
                    };
                }
            }
            return Lookup::Ok(ent.access_token.clone());
        }
        Lookup::None
    }

    fn insert(&mut self, entry: TokenEntry) {
        for ent in self.entries.iter_mut() {
            if ent.scopes == entry.scopes {
                *ent = entry;
                return;
            }
        }
        self.entries.push(entry);
    }
}

#[derive(Debug)]
struct Inner {
    store: RwLock<TokenStore>,
    path: FsPathBuf,
    oauth2: Option<BasicClient>,
    http: reqwest::Client,
    has_credentials: bool,
}

/// Token provider backed by the on-disk store.
///
/// Refreshes expired entries through the token endpoint when an application
/// secret is available; it never runs an interactive authorization flow.
#[derive(Clone, Debug)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    pub async fn load(
        secret: Option<drivebak::oauth::Secret>,
        token_cache_path: &FsPath,
        http: reqwest::Client,
    ) -> Result<Self> {
        let store = TokenStore::try_read_from_disk(token_cache_path)
            .await?
            .unwrap_or_default();
        let has_credentials = !store.entries.is_empty();
        if has_credentials {
            log::info!(
                "loaded {} stored tokens from {token_cache_path}",
                store.entries.len()
            );
        }
        let oauth2 = secret.map(|secret| {
            BasicClient::new(
                secret.client_id,
                Some(secret.client_secret),
                secret.auth_url,
                Some(secret.token_url),
            )
        });

        Ok(Self {
            inner: Arc::new(Inner {
                store: RwLock::new(store),
                path: token_cache_path.to_owned(),
                oauth2,
                http,
                has_credentials,
            }),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.inner.has_credentials
    }

    async fn refresh_token(
        &self,
        refresh_token: RefreshToken,
        scopes: Vec<Scope>,
    ) -> Result<AccessToken> {
        let oauth2 = self.inner.oauth2.as_ref().ok_or_else(|| {
            auth_error!("access token expired and no application secret is available to refresh it")
        })?;

        let token_response = oauth2
            .exchange_refresh_token(&refresh_token)
            .add_scopes(scopes.clone())
            .request_async(|req| async { self.http(req).await })
            .await
            .map_err(|err| auth_error!("failed to refresh access token: {err}"))?;

        let access = token_response.access_token().clone();
        let entry = TokenEntry {
            scopes,
            access_token: access.clone(),
            refresh_token: token_response
                .refresh_token()
                .cloned()
                .or(Some(refresh_token)),
            expiration: token_response.expires_in().map(|exp| Utc::now() + exp),
        };

        let mut store = self.inner.store.write().await;
        store.insert(entry);
        if let Err(err) = store.write_to_disk(&self.inner.path).await {
            log::error!("could not persist refreshed token: {err}");
        }

        Ok(access)
    }

    async fn http(&self, req: HttpRequest) -> reqwest::Result<HttpResponse> {
        let method = req.method.clone();
        let url = req.url.clone();

        let resp = self
            .inner
            .http
            .request(req.method, req.url)
            .headers(req.headers)
            .body(req.body)
            .send()
            .await?;

        let status_code = resp.status();
        let headers = resp.headers().to_owned();
        let body = resp.bytes().await?.to_vec();

        if !status_code.is_success() {
            log::warn!("{method} {url} returned {status_code}");
        }

        Ok(HttpResponse {
            status_code,
            headers,
            body,
        })
    }
}

impl GetToken for Client {
    async fn get_token(&self, scopes: Vec<Scope>) -> Result<AccessToken> {
        let lookup = self.inner.store.read().await.get(&scopes);
        match lookup {
            Lookup::Ok(access_token) => Ok(access_token),
            Lookup::Expired(refresh_token, scopes) => {
                self.refresh_token(refresh_token, scopes).await
            }
            Lookup::None => auth_bail!(
                "no stored credentials cover the requested scopes; save authorized tokens to {}",
                self.inner.path
            ),
        }
    }
}
