use thiserror::Error;

pub mod http;
#[cfg(test)]
pub mod memory;

pub use http::HttpRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("cannot connect to repository at {uri}: {reason}")]
    Connection { uri: String, reason: String },
    #[error("authentication failed for user {user}: {reason}")]
    Auth { user: String, reason: String },
    #[error("query failed: {0}")]
    Query(String),
    #[error("cannot read node {path}: {reason}")]
    Node { path: String, reason: String },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum QueryLanguage {
    #[default]
    Xpath,
    Sql2,
}

impl QueryLanguage {
    /// Name understood by the repository's query endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryLanguage::Xpath => "xpath",
            QueryLanguage::Sql2 => "JCR-SQL2",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "xpath" => Some(QueryLanguage::Xpath),
            "sql2" | "jcr-sql2" => Some(QueryLanguage::Sql2),
            _ => None,
        }
    }
}

impl std::fmt::Display for QueryLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A read-only view of one node in the content tree.
pub trait RepositoryNode: Sized {
    fn path(&self) -> &str;
    fn primary_type(&self) -> &str;
    fn parent(&self) -> Result<Option<Self>, RepositoryError>;

    fn name(&self) -> &str {
        node_name(self.path())
    }
}

pub type QueryResults<'s, N> = Box<dyn Iterator<Item = Result<N, RepositoryError>> + 's>;

pub trait Session {
    type Node: RepositoryNode;

    /// Runs a read-only query. Nodes are materialised as the iterator advances.
    fn run_query(
        &self,
        statement: &str,
        language: QueryLanguage,
    ) -> Result<QueryResults<'_, Self::Node>, RepositoryError>;
    fn is_live(&self) -> bool;
    fn logout(&mut self);
}

pub trait Repository {
    type Session: Session;

    fn login(&self, user: &str, password: &str) -> Result<Self::Session, RepositoryError>;
}

/// Owns an open session and logs it out when dropped.
pub struct SessionGuard<S: Session> {
    session: S,
}

impl<S: Session> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }
}

impl<S: Session> std::ops::Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: Session> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if self.session.is_live() {
            self.session.logout();
            log::debug!("repository session closed");
        }
    }
}

pub fn node_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Parent path of a slash-delimited node path; `None` for the root.
pub fn parent_path(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&trimmed[..idx]),
        None => None,
    }
}
