use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use super::{QueryLanguage, QueryResults, Repository, RepositoryError, RepositoryNode, Session};

pub const SESSION_INFO_PATH: &str = "/system/sling/info.sessionInfo.json";
pub const QUERY_PATH: &str = "/crx/de/query.jsp";
pub const LOGOUT_PATH: &str = "/system/sling/logout";

const PRIMARY_TYPE_PROPERTY: &str = "jcr:primaryType";
const ANONYMOUS: &str = "anonymous";

/// A JCR repository reached through the Sling HTTP API.
pub struct HttpRepository {
    base: Url,
    client: Client,
}

impl HttpRepository {
    pub fn connect(uri: &str, timeout: Duration) -> Result<Self, RepositoryError> {
        let fail = |reason: String| RepositoryError::Connection {
            uri: uri.to_string(),
            reason,
        };

        let base = Url::parse(uri).map_err(|e| fail(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(fail(format!("unsupported scheme {}", base.scheme())));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| fail(e.to_string()))?;

        Ok(Self { base, client })
    }
}

impl Repository for HttpRepository {
    type Session = HttpSession;

    fn login(&self, user: &str, password: &str) -> Result<HttpSession, RepositoryError> {
        let conn = Connection {
            base: self.base.clone(),
            client: self.client.clone(),
            user: user.to_string(),
            password: password.to_string(),
        };
        let connection_error = |reason: String| RepositoryError::Connection {
            uri: self.base.to_string(),
            reason,
        };
        let auth_error = |reason: String| RepositoryError::Auth {
            user: user.to_string(),
            reason,
        };

        let url = conn.endpoint(SESSION_INFO_PATH).map_err(connection_error)?;
        let resp = conn.get(url).map_err(|e| connection_error(e.to_string()))?;
        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(auth_error(format!("HTTP {}", resp.status())))
            }
            status if !status.is_success() => {
                return Err(connection_error(format!("unexpected HTTP {}", status)))
            }
            _ => {}
        }

        let info: SessionInfo = resp
            .json()
            .map_err(|e| connection_error(format!("malformed session info: {}", e)))?;
        if info.user_id == ANONYMOUS && user != ANONYMOUS {
            return Err(auth_error("repository granted an anonymous session".to_string()));
        }
        log::debug!(
            "session opened for {} on workspace {}",
            info.user_id,
            info.workspace.as_deref().unwrap_or("default")
        );

        Ok(HttpSession {
            conn: Arc::new(conn),
            live: true,
        })
    }
}

struct Connection {
    base: Url,
    client: Client,
    user: String,
    password: String,
}

impl Connection {
    fn endpoint(&self, path: &str) -> Result<Url, String> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| format!("{} cannot be a base URL", self.base))?
            .pop_if_empty()
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn node_url(&self, path: &str) -> Result<Url, String> {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            return self.endpoint("/.json");
        }
        self.endpoint(&format!("{}.json", trimmed))
    }

    fn get(&self, url: Url) -> reqwest::Result<Response> {
        self.client
            .get(url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
    }

    fn fetch_node(self: &Arc<Self>, path: &str) -> Result<HttpNode, RepositoryError> {
        let fail = |reason: String| RepositoryError::Node {
            path: path.to_string(),
            reason,
        };

        let url = self.node_url(path).map_err(fail)?;
        let resp = self.get(url).map_err(|e| fail(e.to_string()))?;
        match resp.status() {
            StatusCode::NOT_FOUND => return Err(fail("not found".to_string())),
            status if !status.is_success() => return Err(fail(format!("HTTP {}", status))),
            _ => {}
        }

        let props: serde_json::Map<String, serde_json::Value> = resp
            .json()
            .map_err(|e| fail(format!("malformed node properties: {}", e)))?;
        let primary_type = props
            .get(PRIMARY_TYPE_PROPERTY)
            .and_then(|v| v.as_str())
            .ok_or_else(|| fail(format!("missing {}", PRIMARY_TYPE_PROPERTY)))?;

        Ok(HttpNode {
            conn: self.clone(),
            path: path.to_string(),
            primary_type: primary_type.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct SessionInfo {
    #[serde(rename = "userID")]
    user_id: String,
    #[serde(default)]
    workspace: Option<String>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    results: Vec<QueryHit>,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct QueryHit {
    path: String,
}

pub struct HttpSession {
    conn: Arc<Connection>,
    live: bool,
}

impl Session for HttpSession {
    type Node = HttpNode;

    fn run_query(
        &self,
        statement: &str,
        language: QueryLanguage,
    ) -> Result<QueryResults<'_, HttpNode>, RepositoryError> {
        let mut url = self.conn.endpoint(QUERY_PATH).map_err(RepositoryError::Query)?;
        url.query_pairs_mut()
            .append_pair("_charset_", "utf-8")
            .append_pair("type", language.as_str())
            .append_pair("stmt", statement)
            .append_pair("showResults", "true");

        let resp = self
            .conn
            .get(url)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(RepositoryError::Query(format!("HTTP {}", resp.status())));
        }
        let body: QueryResponse = resp
            .json()
            .map_err(|e| RepositoryError::Query(format!("malformed response: {}", e)))?;
        if !body.success {
            return Err(RepositoryError::Query(
                body.error_message
                    .unwrap_or_else(|| "rejected by repository".to_string()),
            ));
        }
        log::debug!("query matched {} nodes", body.results.len());

        let conn = self.conn.clone();
        Ok(Box::new(
            body.results
                .into_iter()
                .map(move |hit| conn.fetch_node(&hit.path)),
        ))
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn logout(&mut self) {
        self.live = false;
        let result = self
            .conn
            .endpoint(LOGOUT_PATH)
            .map_err(|e| e.to_string())
            .and_then(|url| self.conn.get(url).map_err(|e| e.to_string()));
        if let Err(e) = result {
            log::debug!("logout request failed: {}", e);
        }
    }
}

#[derive(Clone)]
pub struct HttpNode {
    conn: Arc<Connection>,
    path: String,
    primary_type: String,
}

impl std::fmt::Debug for HttpNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpNode")
            .field("path", &self.path)
            .field("primary_type", &self.primary_type)
            .finish()
    }
}

impl RepositoryNode for HttpNode {
    fn path(&self) -> &str {
        &self.path
    }

    fn primary_type(&self) -> &str {
        &self.primary_type
    }

    fn parent(&self) -> Result<Option<Self>, RepositoryError> {
        match super::parent_path(&self.path) {
            Some(parent) => self.conn.fetch_node(parent).map(Some),
            None => Ok(None),
        }
    }
}
