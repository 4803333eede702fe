//! In-memory content tree implementing the repository traits for tests.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::{
    parent_path, QueryLanguage, QueryResults, Repository, RepositoryError, RepositoryNode, Session,
};

struct Entry {
    path: String,
    primary_type: String,
    parent: Option<usize>,
}

#[derive(Default)]
pub struct MemoryTree {
    entries: Vec<Entry>,
    by_path: HashMap<String, usize>,
    broken: HashSet<usize>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, linking it to its parent path when that node already exists.
    pub fn add(&mut self, path: &str, primary_type: &str) -> &mut Self {
        let parent = parent_path(path).and_then(|p| self.by_path.get(p).copied());
        self.by_path.insert(path.to_string(), self.entries.len());
        self.entries.push(Entry {
            path: path.to_string(),
            primary_type: primary_type.to_string(),
            parent,
        });
        self
    }

    /// Makes `parent()` on the given node fail.
    pub fn break_parent_of(&mut self, path: &str) -> &mut Self {
        if let Some(idx) = self.by_path.get(path) {
            self.broken.insert(*idx);
        }
        self
    }

    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }
}

pub fn node(tree: &Rc<MemoryTree>, path: &str) -> Option<MemNode> {
    tree.by_path.get(path).map(|idx| MemNode {
        tree: tree.clone(),
        idx: *idx,
    })
}

#[derive(Clone)]
pub struct MemNode {
    tree: Rc<MemoryTree>,
    idx: usize,
}

impl std::fmt::Debug for MemNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MemNode").field(&self.path()).finish()
    }
}

impl RepositoryNode for MemNode {
    fn path(&self) -> &str {
        &self.tree.entries[self.idx].path
    }

    fn primary_type(&self) -> &str {
        &self.tree.entries[self.idx].primary_type
    }

    fn parent(&self) -> Result<Option<Self>, RepositoryError> {
        if self.tree.broken.contains(&self.idx) {
            return Err(RepositoryError::Node {
                path: self.path().to_string(),
                reason: "access denied".to_string(),
            });
        }
        Ok(self.tree.entries[self.idx].parent.map(|idx| MemNode {
            tree: self.tree.clone(),
            idx,
        }))
    }
}

/// Shared counters so tests can observe a session after it was consumed.
#[derive(Clone, Default)]
pub struct SessionProbe {
    pub logins: Rc<Cell<usize>>,
    pub logouts: Rc<Cell<usize>>,
    pub queries: Rc<Cell<usize>>,
}

pub struct MemoryRepository {
    tree: Rc<MemoryTree>,
    results: Vec<String>,
    password: String,
    query_error: Option<String>,
    pub probe: SessionProbe,
}

impl MemoryRepository {
    pub fn new(tree: Rc<MemoryTree>, results: &[&str]) -> Self {
        Self {
            tree,
            results: results.iter().map(|p| p.to_string()).collect(),
            password: "admin".to_string(),
            query_error: None,
            probe: SessionProbe::default(),
        }
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self
    }

    pub fn with_query_error(mut self, message: &str) -> Self {
        self.query_error = Some(message.to_string());
        self
    }
}

impl Repository for MemoryRepository {
    type Session = MemorySession;

    fn login(&self, user: &str, password: &str) -> Result<MemorySession, RepositoryError> {
        if password != self.password {
            return Err(RepositoryError::Auth {
                user: user.to_string(),
                reason: "invalid credentials".to_string(),
            });
        }
        self.probe.logins.set(self.probe.logins.get() + 1);
        Ok(MemorySession {
            tree: self.tree.clone(),
            results: self.results.clone(),
            query_error: self.query_error.clone(),
            live: true,
            probe: self.probe.clone(),
        })
    }
}

pub struct MemorySession {
    tree: Rc<MemoryTree>,
    results: Vec<String>,
    query_error: Option<String>,
    live: bool,
    probe: SessionProbe,
}

impl Session for MemorySession {
    type Node = MemNode;

    fn run_query(
        &self,
        _statement: &str,
        _language: QueryLanguage,
    ) -> Result<QueryResults<'_, MemNode>, RepositoryError> {
        self.probe.queries.set(self.probe.queries.get() + 1);
        if let Some(message) = &self.query_error {
            return Err(RepositoryError::Query(message.clone()));
        }
        let tree = self.tree.clone();
        Ok(Box::new(self.results.iter().map(move |path| {
            node(&tree, path).ok_or_else(|| RepositoryError::Node {
                path: path.clone(),
                reason: "not found".to_string(),
            })
        })))
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn logout(&mut self) {
        self.live = false;
        self.probe.logouts.set(self.probe.logouts.get() + 1);
    }
}
