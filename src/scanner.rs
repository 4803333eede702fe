use std::collections::HashSet;

use tokio_util::sync::CancellationToken;

use crate::report::EventSink;
use crate::repository::{RepositoryError, RepositoryNode};
use crate::resolver::AncestorResolver;

/// How collected page paths are accumulated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollectPolicy {
    /// One entry per matching file, duplicates kept.
    #[default]
    All,
    /// One entry per page, first occurrence wins.
    Distinct,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub pages: Vec<String>,
    pub matched: usize,
    pub unresolved: usize,
    pub failed: usize,
    pub interrupted: bool,
}

pub struct Scanner<'a> {
    resolver: AncestorResolver,
    sink: &'a dyn EventSink,
    policy: CollectPolicy,
    cancel: CancellationToken,
}

impl<'a> Scanner<'a> {
    pub fn new(resolver: AncestorResolver, sink: &'a dyn EventSink) -> Self {
        Self {
            resolver,
            sink,
            policy: CollectPolicy::All,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_policy(mut self, policy: CollectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn sink(&self) -> &'a dyn EventSink {
        self.sink
    }

    /// Single ordered pass over query results. Per-node failures are logged and skipped.
    pub fn run<N, I>(&self, nodes: I) -> ScanReport
    where
        N: RepositoryNode,
        I: IntoIterator<Item = Result<N, RepositoryError>>,
    {
        let mut report = ScanReport::default();
        let mut seen = HashSet::new();

        for item in nodes {
            if self.cancel.is_cancelled() {
                self.sink.warn("Scan interrupted, remaining results skipped");
                report.interrupted = true;
                break;
            }

            let file = match item {
                Ok(file) => file,
                Err(e) => {
                    self.sink.warn(&format!("Skipping unreadable result: {}", e));
                    report.failed += 1;
                    continue;
                }
            };

            match self.resolver.find_enclosing_page(&file) {
                Ok(Some(page)) => {
                    report.matched += 1;
                    self.sink.info(&format!(
                        "Found {} image file in {}",
                        file.path(),
                        page.name()
                    ));
                    log::debug!("{} resolved to {}", file.path(), page.path());
                    if self.policy == CollectPolicy::Distinct && !seen.insert(page.path().to_string())
                    {
                        log::debug!("{} already collected", page.path());
                        continue;
                    }
                    report.pages.push(page.path().to_string());
                }
                Ok(None) => {
                    report.unresolved += 1;
                    self.sink
                        .warn(&format!("No parent page found for {}", file.path()));
                }
                Err(e) => {
                    report.failed += 1;
                    self.sink.warn(&format!(
                        "No parent page found for {}: {:#}",
                        file.path(),
                        anyhow::Error::new(e)
                    ));
                }
            }
        }

        report
    }
}
