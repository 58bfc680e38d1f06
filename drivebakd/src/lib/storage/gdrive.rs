use std::sync::Arc;

use drivebak::{api_error, Result};

use crate::oauth::GetToken;
use crate::storage::{EntryKind, FileId};

/// Google Drive v3 REST client.
#[derive(Clone)]
pub struct GoogleDrive<A> {
    client: reqwest::Client,
    auth: Arc<A>,
    base_url: &'static str,
    upload_base_url: &'static str,
    user_agent: String,
}

impl<A> GoogleDrive<A>
where
    A: GetToken,
{
    pub async fn new(auth: A, client: reqwest::Client) -> Self {
        let user_agent = format!("drivebakd/{}", env!("CARGO_PKG_VERSION"));
        let drive = Self {
            auth: Arc::new(auth),
            client,
            base_url: "https://www.googleapis.com/drive/v3",
            upload_base_url: "https://www.googleapis.com/upload/drive/v3",
            user_agent,
        };

        // Account probe. Failure is not fatal: a degraded client still
        // starts and individual remote calls report their own errors.
        match drive.about_get().await {
            Ok(about) => {
                log::info!(
                    "access granted to Drive of {}{}",
                    about.user.display_name,
                    about
                        .user
                        .email_address
                        .as_ref()
                        .map(|em| format!(" <{em}>"))
                        .unwrap_or_default(),
                );
                if let (Some(usage), Some(limit)) =
                    (about.storage_quota.usage, about.storage_quota.limit)
                {
                    use byte_unit::{Byte, UnitType};
                    if let (Some(usage), Some(limit)) =
                        (Byte::from_i64(usage), Byte::from_i64(limit))
                    {
                        let usage = usage.get_appropriate_unit(UnitType::Binary);
                        let limit = limit.get_appropriate_unit(UnitType::Binary);
                        log::info!("usage {usage:#.2} / {limit:#.3}");
                    }
                }
            }
            Err(err) => log::warn!("could not query Drive account info: {err}"),
        }

        drive
    }
}

impl<A> super::FindEntry for GoogleDrive<A>
where
    A: GetToken,
{
    async fn find_entry(
        &self,
        name: &str,
        kind: EntryKind,
        parent_id: Option<&FileId>,
    ) -> Result<Option<FileId>> {
        let q = search_query(name, kind, parent_id);
        log::trace!("files.list with query {q:?}");

        let mut page_token = None;
        loop {
            let list = self.files_list(q.clone(), page_token).await?;
            if let Some(files) = list.files {
                // The service matches names case-insensitively; the exact
                // comparison happens here.
                let mut matches = files.into_iter().filter(|f| f.name.as_deref() == Some(name));
                if let Some(first) = matches.next() {
                    let extra = matches.count();
                    if extra > 0 {
                        log::warn!(
                            "{} remote entries named {name:?} under the same parent; using the first one",
                            extra + 1
                        );
                    }
                    return Ok(first.id);
                }
            }
            page_token = list.next_page_token;
            if page_token.is_none() {
                return Ok(None);
            }
        }
    }
}

impl<A> super::MkDir for GoogleDrive<A>
where
    A: GetToken,
{
    async fn mkdir(&self, parent_id: Option<&FileId>, name: &str) -> Result<FileId> {
        if let Some(parent_id) = parent_id {
            log::info!("creating folder {name} in folder {parent_id}");
        } else {
            log::info!("creating folder {name} in root folder");
        }
        let f = api::File {
            id: None,
            name: Some(name.to_string()),
            mime_type: Some(FOLDER_MIMETYPE.to_string()),
            parents: parent_id.map(|id| vec![id.clone()]),
        };
        let res = self.files_create(&f).await?;
        res.id
            .ok_or_else(|| api_error!("no id returned for created folder {name}"))
    }
}

impl<A> super::CreateFile for GoogleDrive<A>
where
    A: GetToken,
{
    async fn create_file(
        &self,
        parent_id: Option<&FileId>,
        name: &str,
        mime_type: Option<&str>,
        size: u64,
        data: impl tokio::io::AsyncRead + Send,
    ) -> Result<FileId> {
        log::info!("uploading {name} ({size} bytes)");
        let file = api::File {
            id: None,
            name: Some(name.to_string()),
            mime_type: mime_type.map(str::to_string),
            parents: parent_id.map(|id| vec![id.clone()]),
        };
        let file = self.files_create_upload(&file, size, data).await?;
        file.id
            .ok_or_else(|| api_error!("no id returned for uploaded file {name}"))
    }
}

impl<A> super::DeleteEntry for GoogleDrive<A>
where
    A: GetToken,
{
    async fn delete(&self, id: &FileId) -> Result<()> {
        log::info!("deleting remote entry {id}");
        self.files_delete(id).await
    }
}

impl<A> super::Remote for GoogleDrive<A> where A: GetToken + Clone {}

const FOLDER_MIMETYPE: &str = "application/vnd.google-apps.folder";

/// Builds a `files.list` query for a name lookup scoped to a parent.
fn search_query(name: &str, kind: EntryKind, parent_id: Option<&FileId>) -> String {
    let mut q = format!("name = '{}'", escape_query(name));
    if kind == EntryKind::Folder {
        q.push_str(" and mimeType = '");
        q.push_str(FOLDER_MIMETYPE);
        q.push('\'');
    }
    if let Some(parent_id) = parent_id {
        q.push_str(" and '");
        q.push_str(&escape_query(parent_id.as_str()));
        q.push_str("' in parents");
    }
    q
}

fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

mod api {
    use serde::{Deserialize, Serialize};

    use super::utils::num_from_str;
    use crate::storage::FileId;

    #[derive(Default, Clone, Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct User {
        pub display_name: String,
        pub email_address: Option<String>,
    }

    #[derive(Default, Clone, Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Quota {
        #[serde(default, deserialize_with = "num_from_str")]
        pub limit: Option<i64>,
        #[serde(default, deserialize_with = "num_from_str")]
        pub usage: Option<i64>,
    }

    pub const ABOUT_FIELDS: &str = "kind,storageQuota(limit,usage),user";

    #[derive(Default, Clone, Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct About {
        pub kind: String,
        pub storage_quota: Quota,
        pub user: User,
    }

    pub const FILE_FIELDS: &str = "id,name,mimeType";
    pub const LIST_FIELDS: &str = "nextPageToken,incompleteSearch,files(id,name,mimeType)";

    #[derive(Default, Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct File {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub id: Option<FileId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub mime_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub parents: Option<Vec<FileId>>,
    }

    #[derive(Default, Clone, Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct FileList {
        pub files: Option<Vec<File>>,
        pub incomplete_search: Option<bool>,
        pub next_page_token: Option<String>,
    }

    #[derive(Debug, Clone, Copy)]
    pub enum Scope {
        Full,
        MetadataReadOnly,
    }

    impl AsRef<str> for Scope {
        fn as_ref(&self) -> &str {
            match self {
                Scope::Full => "https://www.googleapis.com/auth/drive",
                Scope::MetadataReadOnly => {
                    "https://www.googleapis.com/auth/drive.metadata.readonly"
                }
            }
        }
    }

    impl From<Scope> for oauth2::Scope {
        fn from(value: Scope) -> Self {
            oauth2::Scope::new(value.as_ref().to_string())
        }
    }

    #[derive(Debug, Copy, Clone)]
    pub enum UploadType {
        Resumable,
    }

    impl UploadType {
        pub fn as_str(&self) -> &str {
            match self {
                UploadType::Resumable => "resumable",
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct UploadParams<'a> {
        pub typ: UploadType,
        pub size: Option<u64>,
        pub mime_type: Option<&'a str>,
        pub fields: &'a str,
    }

    impl<'a> UploadParams<'a> {
        pub fn query_params(&'a self) -> Vec<(&'static str, &'a str)> {
            vec![("uploadType", self.typ.as_str()), ("fields", self.fields)]
        }
    }
}

const UPLOAD_CHUNK_SZ: u64 = 2 * 256 * 1024;

impl<A> GoogleDrive<A>
where
    A: GetToken,
{
    async fn about_get(&self) -> Result<api::About> {
        use drivebak::api_bail;

        let path = "/about";
        let query_params = vec![("fields", api::ABOUT_FIELDS)];

        let res = self
            .get_query(&[api::Scope::MetadataReadOnly], path, query_params)
            .await?;
        let res = utils::check_response("GET", path, res).await?;
        let about: api::About = res.json().await?;
        if about.kind != "drive#about" {
            api_bail!("/about returned wrong kind!");
        }
        Ok(about)
    }

    async fn files_list(
        &self,
        q: String,
        page_token: Option<String>,
    ) -> Result<api::FileList> {
        let path = "/files";

        let mut query_params = vec![
            ("q", q),
            ("fields", api::LIST_FIELDS.into()),
            ("alt", "json".into()),
        ];
        if let Some(page_token) = page_token {
            query_params.push(("pageToken", page_token));
        }

        let res = self
            .get_query(&[api::Scope::MetadataReadOnly], path, query_params)
            .await?;
        let res = utils::check_response("GET", path, res).await?;

        let file_list: api::FileList = res.json().await?;

        Ok(file_list)
    }

    async fn files_create(&self, file: &api::File) -> Result<api::File> {
        let scopes = &[api::Scope::Full];
        let path = "/files";
        let query_params = &[("fields", api::FILE_FIELDS)];
        let res = self
            .post_json_query(scopes, path, query_params, file)
            .await?;
        let res = utils::check_response("POST", path, res).await?;

        let file: api::File = res.json().await?;
        Ok(file)
    }

    async fn files_create_upload<D>(
        &self,
        file: &api::File,
        data_len: u64,
        data: D,
    ) -> Result<api::File>
    where
        D: tokio::io::AsyncRead + Send,
    {
        use drivebak::api_bail;
        use tokio::io::AsyncReadExt;

        let scopes = &[api::Scope::Full];
        let upload_params = api::UploadParams {
            typ: api::UploadType::Resumable,
            size: Some(data_len),
            mime_type: file.mime_type.as_deref(),
            fields: api::FILE_FIELDS,
        };
        let upload_url = self
            .post_upload_request(scopes, "/files", &upload_params, Some(file))
            .await?;

        tokio::pin!(data);

        let mut sent = 0u64;
        loop {
            let mut buf: Vec<u8> = Vec::with_capacity(UPLOAD_CHUNK_SZ as usize);
            let sz = data
                .as_mut()
                .take(UPLOAD_CHUNK_SZ)
                .read_to_end(&mut buf)
                .await?;
            log::trace!("uploading chunk of {sz} bytes");
            let res = self
                .put_upload_range(scopes, upload_url.clone(), buf, sent, data_len)
                .await?;
            sent += sz as u64;
            let status = res.status();
            if status.is_success() && sent == data_len {
                return Ok(res.json().await?);
            } else if status.is_client_error() || status.is_server_error() {
                let body = res.text().await.unwrap_or_default();
                api_bail!(
                    "upload of {} failed ({status}): {body}",
                    file.name.as_deref().unwrap_or_default()
                );
            }
            // 308: the service expects the next chunk
        }
    }

    async fn files_delete(&self, file_id: &FileId) -> Result<()> {
        let path = format!("/files/{file_id}");
        let res = self.delete_query(&[api::Scope::Full], &path).await?;
        utils::check_response("DELETE", &path, res).await?;
        Ok(())
    }
}

mod utils {
    use std::borrow::Borrow;

    use drivebak::{api_bail, api_error, Result};
    use oauth2::AccessToken;
    use reqwest::{header, Response, StatusCode, Url};
    use serde::{Deserialize, Deserializer, Serialize};

    use super::api;
    use crate::oauth::GetToken;

    pub fn num_from_str<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use std::str::FromStr;

        let s = String::deserialize(deserializer)?;
        Ok(Some(i64::from_str(&s).map_err(serde::de::Error::custom)?))
    }

    pub async fn check_response(method: &str, path: &str, res: Response) -> Result<Response> {
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            api_bail!("{method} {path} returned {status}\n{body}");
        }
        Ok(res)
    }

    impl<A> super::GoogleDrive<A>
    where
        A: GetToken,
    {
        async fn fetch_token(&self, scopes: &[api::Scope]) -> Result<AccessToken> {
            let scopes = scopes.iter().map(|&s| s.into()).collect();
            self.auth.get_token(scopes).await
        }

        pub(super) async fn get_query<Q, K, V>(
            &self,
            scopes: &[api::Scope],
            path: &str,
            query_params: Q,
        ) -> Result<Response>
        where
            Q: IntoIterator,
            Q::Item: Borrow<(K, V)>,
            K: AsRef<str>,
            V: AsRef<str>,
        {
            let token = self.fetch_token(scopes).await?;
            let url = url_with_query(self.base_url, path, query_params)?;

            let res = self
                .client
                .get(url)
                .header(header::USER_AGENT, &self.user_agent)
                .bearer_auth(token.secret())
                .send()
                .await?;

            Ok(res)
        }

        pub(super) async fn post_json_query<T, Q, K, V>(
            &self,
            scopes: &[api::Scope],
            path: &str,
            query_params: Q,
            body: &T,
        ) -> Result<Response>
        where
            T: Serialize,
            Q: IntoIterator,
            Q::Item: Borrow<(K, V)>,
            K: AsRef<str>,
            V: AsRef<str>,
        {
            let token = self.fetch_token(scopes).await?;
            let url = url_with_query(self.base_url, path, query_params)?;
            let res = self
                .client
                .post(url)
                .bearer_auth(token.secret())
                .header(header::USER_AGENT, &self.user_agent)
                .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
                .json(body)
                .send()
                .await?;
            Ok(res)
        }

        pub(super) async fn delete_query(
            &self,
            scopes: &[api::Scope],
            path: &str,
        ) -> Result<Response> {
            let token = self.fetch_token(scopes).await?;
            let url = Url::parse(&format!("{}{}", self.base_url, path))
                .map_err(|err| api_error!("invalid request URL: {err}"))?;
            let res = self
                .client
                .delete(url)
                .header(header::USER_AGENT, &self.user_agent)
                .bearer_auth(token.secret())
                .send()
                .await?;
            Ok(res)
        }

        pub(super) async fn post_upload_request<B>(
            &self,
            scopes: &[api::Scope],
            path: &str,
            params: &api::UploadParams<'_>,
            body: Option<&B>,
        ) -> Result<Url>
        where
            B: Serialize,
        {
            let token = self.fetch_token(scopes).await?;

            let url = url_with_query(self.upload_base_url, path, params.query_params())?;
            let mut req = self
                .client
                .post(url.clone())
                .bearer_auth(token.secret())
                .header(header::USER_AGENT, &self.user_agent);
            if let Some(mt) = params.mime_type {
                req = req.header("X-Upload-Content-Type", mt);
            }
            if let Some(sz) = params.size {
                req = req.header("X-Upload-Content-Length", sz);
            }
            if let Some(body) = body {
                req = req
                    .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
                    .json(body);
            }
            let res = req.send().await?;

            if res.status() != StatusCode::OK {
                api_bail!("POST {url} returned {}", res.status());
            }
            let location = res
                .headers()
                .get(header::LOCATION)
                .ok_or_else(|| api_error!("upload session response has no Location header"))?;
            let location = location
                .to_str()
                .map_err(|err| api_error!("invalid Location header: {err}"))?;
            Url::parse(location).map_err(|err| api_error!("invalid upload URL: {err}"))
        }

        pub(super) async fn put_upload_range(
            &self,
            scopes: &[api::Scope],
            url: Url,
            data: Vec<u8>,
            range_start: u64,
            range_len: u64,
        ) -> Result<Response> {
            let token = self.fetch_token(scopes).await?;

            let data_len = data.len() as u64;
            debug_assert!(range_len >= range_start + data_len);

            let mut req = self
                .client
                .put(url)
                .bearer_auth(token.secret())
                .header(header::USER_AGENT, &self.user_agent)
                .header(header::CONTENT_LENGTH, data_len);
            if range_start > 0 || data_len < range_len {
                req = req.header(
                    header::CONTENT_RANGE,
                    format!(
                        "bytes {range_start}-{}/{range_len}",
                        range_start + data_len - 1
                    ),
                );
            }
            Ok(req.body(data).send().await?)
        }
    }

    pub fn url_with_query<B, P, Q, K, V>(base_url: B, path: P, query_params: Q) -> Result<Url>
    where
        B: AsRef<str>,
        P: AsRef<str>,
        Q: IntoIterator,
        Q::Item: Borrow<(K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let base = format!("{}{}", base_url.as_ref(), path.as_ref());
        Url::parse_with_params(&base, query_params)
            .map_err(|err| api_error!("invalid request URL: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::{api, escape_query, search_query, utils};
    use crate::storage::{EntryKind, FileId};

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(escape_query("plain"), "plain");
        assert_eq!(escape_query("it's"), "it\\'s");
        assert_eq!(escape_query("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn file_query_has_no_type_filter() {
        let parent = FileId::from("p-123");
        let q = search_query("notes.txt", EntryKind::File, Some(&parent));
        assert_eq!(q, "name = 'notes.txt' and 'p-123' in parents");
    }

    #[test]
    fn folder_query_filters_on_mime_type() {
        let q = search_query("photos", EntryKind::Folder, None);
        assert_eq!(
            q,
            "name = 'photos' and mimeType = 'application/vnd.google-apps.folder'"
        );
    }

    #[test]
    fn url_with_query_encodes_params() {
        let url = utils::url_with_query(
            "https://www.googleapis.com/drive/v3",
            "/files",
            &[("q", "name = 'a b'")],
        )
        .unwrap();
        assert_eq!(url.path(), "/drive/v3/files");
        assert_eq!(url.query_pairs().next().unwrap().1, "name = 'a b'");
    }

    #[test]
    fn deserializes_file_list() {
        let json = r#"{
            "kind": "drive#fileList",
            "incompleteSearch": false,
            "nextPageToken": "tok",
            "files": [
                {"id": "f1", "name": "a.txt", "mimeType": "text/plain"},
                {"id": "d1", "name": "sub", "mimeType": "application/vnd.google-apps.folder"}
            ]
        }"#;
        let list: api::FileList = serde_json::from_str(json).unwrap();
        assert_eq!(list.next_page_token.as_deref(), Some("tok"));
        let files = list.files.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].id, Some(FileId::from("f1")));
        assert_eq!(files[1].mime_type.as_deref(), Some(super::FOLDER_MIMETYPE));
    }

    #[test]
    fn folder_create_body_skips_unset_fields() {
        let file = api::File {
            id: None,
            name: Some("sub".into()),
            mime_type: Some(super::FOLDER_MIMETYPE.into()),
            parents: Some(vec![FileId::from("p-123")]),
        };
        let json = serde_json::to_string(&file).unwrap();
        assert_eq!(
            json,
            r#"{"name":"sub","mimeType":"application/vnd.google-apps.folder","parents":["p-123"]}"#
        );
    }

    #[test]
    fn deserializes_about() {
        let json = r#"{
            "kind": "drive#about",
            "user": {"displayName": "Test User", "emailAddress": "test@example.com"},
            "storageQuota": {"limit": "16106127360", "usage": "535822"}
        }"#;
        let about: api::About = serde_json::from_str(json).unwrap();
        assert_eq!(about.user.display_name, "Test User");
        assert_eq!(about.storage_quota.limit, Some(16106127360));
        assert_eq!(about.storage_quota.usage, Some(535822));
    }
}
