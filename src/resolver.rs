use thiserror::Error;

use crate::repository::{RepositoryError, RepositoryNode};

pub const DEFAULT_PAGE_TYPE: &str = "cq:Page";
pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("cannot resolve parent of {path}")]
    Repository {
        path: String,
        #[source]
        source: RepositoryError,
    },
    #[error("no ancestor of type {target_type} within {limit} levels above {path}")]
    DepthExceeded {
        path: String,
        target_type: String,
        limit: usize,
    },
}

/// Finds the nearest ancestor of a node whose primary type matches `target_type`.
#[derive(Clone, Debug)]
pub struct AncestorResolver {
    target_type: String,
    max_depth: usize,
}

impl AncestorResolver {
    pub fn new(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Walks parent links starting above `node`; the node itself is never a candidate.
    pub fn find_enclosing_page<N: RepositoryNode>(
        &self,
        node: &N,
    ) -> Result<Option<N>, ResolutionError> {
        let mut current = parent_of(node)?;
        let mut depth = 1;

        while let Some(ancestor) = current {
            if ancestor.primary_type() == self.target_type {
                return Ok(Some(ancestor));
            }
            let next = parent_of(&ancestor)?;
            if next.is_some() && depth >= self.max_depth {
                return Err(ResolutionError::DepthExceeded {
                    path: node.path().to_string(),
                    target_type: self.target_type.clone(),
                    limit: self.max_depth,
                });
            }
            current = next;
            depth += 1;
        }

        Ok(None)
    }
}

impl Default for AncestorResolver {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_TYPE)
    }
}

fn parent_of<N: RepositoryNode>(node: &N) -> Result<Option<N>, ResolutionError> {
    node.parent().map_err(|source| ResolutionError::Repository {
        path: node.path().to_string(),
        source,
    })
}
