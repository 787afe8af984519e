//! Blocking REST client for a remote binary repository.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use jobstash_core::{Error, Result, UsernamePassword};

/// Everything needed to reconstruct a client on another execution node:
/// server URL, target repository, resolved credential material. Immutable
/// and serializable; live connections never cross node boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoEndpoint {
    server_url: String,
    repository: String,
    credentials: Option<UsernamePassword>,
}

impl RepoEndpoint {
    pub fn new(
        server_url: impl Into<String>,
        repository: impl Into<String>,
        credentials: Option<UsernamePassword>,
    ) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            repository: repository.into(),
            credentials,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }
}

/// Characters escaped inside a single key segment. Everything outside the
/// unreserved set is encoded, so a space becomes `%20` and a literal `+`
/// becomes `%2B`.
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encodes a repository key segment by segment.
///
/// Slashes are structural and must survive as separators; encoding the
/// whole key at once would corrupt the hierarchy.
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| utf8_percent_encode(segment, KEY_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Stat response fields the client relies on. The server may send more;
/// only the folder flag, size, and last-modified time are contractual.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemInfo {
    #[serde(default)]
    folder: bool,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    last_modified: u64,
}

#[derive(Serialize)]
struct SearchQuery {
    repository: String,
    pattern: String,
}

#[derive(Deserialize)]
struct SearchResults {
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    path: String,
    name: String,
}

/// Client for one repository on one remote server.
///
/// Every operation is a single synchronous round trip; the server is
/// trusted to provide durability and consistency. Connection resources are
/// released when the client drops, on every exit path.
pub struct RepoClient {
    endpoint: RepoEndpoint,
    http: Client,
}

impl RepoClient {
    /// Builds a client for the endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn connect(endpoint: RepoEndpoint) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| Error::transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { endpoint, http })
    }

    /// The endpoint this client was built from, for handing a transfer to
    /// another execution node.
    pub fn endpoint(&self) -> &RepoEndpoint {
        &self.endpoint
    }

    /// Uploads a local file to the given key, creating or overwriting the
    /// remote object. The local file size is sent as a content-length
    /// hint.
    ///
    /// # Errors
    ///
    /// Returns a transport error on any network or auth failure.
    pub fn upload(&self, file: &Path, key: &str) -> Result<()> {
        let size = fs::metadata(file)?.len();
        let body = Body::sized(File::open(file)?, size);
        let response = self.send(self.http.put(self.object_url(key)).body(body))?;
        self.ensure_success("Upload", response)?;
        trace!(file = %file.display(), key, size, "uploaded");
        Ok(())
    }

    /// Downloads the object at the given key.
    ///
    /// Returns a byte stream positioned at the start of the content.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the object is absent or unreachable.
    pub fn download(&self, key: &str) -> Result<impl Read> {
        let response = self.send(self.http.get(self.object_url(key)))?;
        self.ensure_success("Download", response)
    }

    /// Deletes the object at the given key, recursively when the key
    /// denotes a folder.
    ///
    /// # Errors
    ///
    /// Returns a transport error on failure; deletes are never silently
    /// dropped at this level.
    pub fn delete(&self, key: &str) -> Result<()> {
        let response = self.send(self.http.delete(self.object_url(key)))?;
        self.ensure_success("Delete", response)?;
        Ok(())
    }

    /// Moves an object or folder server-side.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the server does not support relocation
    /// or the source is missing.
    pub fn move_object(&self, from: &str, to: &str) -> Result<()> {
        self.relocate("move", from, to)
    }

    /// Copies an object or folder server-side.
    ///
    /// # Errors
    ///
    /// Same constraints as [`RepoClient::move_object`].
    pub fn copy_object(&self, from: &str, to: &str) -> Result<()> {
        self.relocate("copy", from, to)
    }

    /// Whether the key denotes a folder.
    ///
    /// A failed lookup is unknown, and unknown defaults to the safer
    /// `false`.
    pub fn is_folder(&self, key: &str) -> bool {
        match self.stat(key) {
            Ok(info) => info.folder,
            Err(e) => {
                debug!(key, error = %e, "failed to check if key is a folder");
                false
            }
        }
    }

    /// Whether the key denotes a file. Always `false` when the key is a
    /// folder; a failed lookup also yields `false`.
    pub fn is_file(&self, key: &str) -> bool {
        if self.is_folder(key) {
            return false;
        }
        match self.stat(key) {
            Ok(info) => !info.folder,
            Err(e) => {
                debug!(key, error = %e, "failed to check if key is a file");
                false
            }
        }
    }

    /// Lists the full keys under a folder.
    ///
    /// Returns an empty list without issuing a search when the key is not
    /// a folder.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the search itself fails.
    pub fn list(&self, key: &str) -> Result<Vec<String>> {
        if !self.is_folder(key) {
            debug!(key, "not a folder, nothing to list");
            return Ok(Vec::new());
        }
        let query = SearchQuery {
            repository: self.endpoint.repository.clone(),
            pattern: format!("{}*", key),
        };
        let url = format!("{}/api/search/pattern", self.endpoint.server_url);
        let response = self.send(self.http.post(url).json(&query))?;
        let response = self.ensure_success("Search", response)?;
        let found: SearchResults = response
            .json()
            .map_err(|e| Error::transport(format!("Invalid search response: {}", e)))?;
        Ok(found
            .results
            .into_iter()
            .map(|item| format!("{}/{}", item.path, item.name))
            .collect())
    }

    /// Last modification time of the key, in epoch milliseconds.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the metadata is unavailable.
    pub fn last_modified(&self, key: &str) -> Result<u64> {
        trace!(key, "fetching last modified time");
        Ok(self.stat(key)?.last_modified)
    }

    /// Byte size of the object at the key; 0 when the key is a folder.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the metadata is unavailable.
    pub fn size(&self, key: &str) -> Result<u64> {
        if self.is_folder(key) {
            return Ok(0);
        }
        trace!(key, "fetching size");
        Ok(self.stat(key)?.size)
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.server_url,
            self.endpoint.repository,
            encode_key(key)
        )
    }

    fn stat(&self, key: &str) -> Result<ItemInfo> {
        let url = format!(
            "{}/api/storage/{}/{}",
            self.endpoint.server_url,
            self.endpoint.repository,
            encode_key(key)
        );
        let response = self.send(self.http.get(url))?;
        let response = self.ensure_success("Stat", response)?;
        response
            .json()
            .map_err(|e| Error::transport(format!("Invalid stat response: {}", e)))
    }

    fn relocate(&self, verb: &str, from: &str, to: &str) -> Result<()> {
        let url = format!(
            "{}/api/{}/{}/{}",
            self.endpoint.server_url,
            verb,
            self.endpoint.repository,
            encode_key(from)
        );
        let target = format!("/{}/{}", self.endpoint.repository, to);
        let response = self.send(self.http.post(url).query(&[("to", target.as_str())]))?;
        self.ensure_success("Relocation", response)?;
        Ok(())
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match &self.endpoint.credentials {
            Some(c) => request.basic_auth(&c.username, Some(&c.password)),
            None => request,
        };
        let request = request.build().map_err(Error::transport)?;
        debug!(method = %request.method(), url = %request.url(), "sending repository request");
        self.http.execute(request).map_err(Error::transport)
    }

    fn ensure_success(&self, what: &str, response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let text = response.text().unwrap_or_default();
        Err(Error::Transport(format!(
            "{} failed with status {}: {}",
            what, status, text
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> RepoEndpoint {
        RepoEndpoint::new("http://repo.example.com/", "generic-local", None)
    }

    #[test]
    fn encode_key_escapes_segments_not_separators() {
        assert_eq!(encode_key("a/b/c"), "a/b/c");
        assert_eq!(encode_key("jenkins/my job/cache.tar"), "jenkins/my%20job/cache.tar");
        assert_eq!(encode_key("a+b/c d"), "a%2Bb/c%20d");
        assert_eq!(encode_key("weird#seg?ment"), "weird%23seg%3Fment");
    }

    #[test]
    fn encode_key_never_uses_plus_for_space() {
        assert!(!encode_key("has space").contains('+'));
        assert_eq!(encode_key("has space"), "has%20space");
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        assert_eq!(endpoint().server_url(), "http://repo.example.com");
    }

    #[test]
    fn object_url_nests_key_under_repository() {
        let client = RepoClient::connect(endpoint()).unwrap();
        assert_eq!(
            client.object_url("jenkins/my-job/cache.tar"),
            "http://repo.example.com/generic-local/jenkins/my-job/cache.tar"
        );
    }

    #[test]
    fn endpoint_round_trips_through_serde() {
        let original = RepoEndpoint::new(
            "http://repo.example.com",
            "generic-local",
            Some(UsernamePassword::new("ci", "secret")),
        );
        let wire = serde_json::to_string(&original).unwrap();
        let restored: RepoEndpoint = serde_json::from_str(&wire).unwrap();
        assert_eq!(restored.server_url(), original.server_url());
        assert_eq!(restored.repository(), original.repository());
    }

    proptest::proptest! {
        // A standard percent decoder must recover the original key, and
        // slashes must survive as separators, never as escapes.
        #[test]
        fn encoded_keys_decode_back(key in "[a-zA-Z0-9 +._-]{1,10}(/[a-zA-Z0-9 +._-]{1,10}){0,3}") {
            let encoded = encode_key(&key);
            let decoded = percent_encoding::percent_decode_str(&encoded)
                .decode_utf8()
                .unwrap();
            proptest::prop_assert_eq!(decoded.as_ref(), key.as_str());
            proptest::prop_assert_eq!(
                encoded.matches('/').count(),
                key.matches('/').count()
            );
        }
    }
}
