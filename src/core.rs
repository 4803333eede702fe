use crate::configuration::ConnectionConfig;
use crate::repository::{Repository, RepositoryError, Session, SessionGuard};
use crate::scanner::{ScanReport, Scanner};

/// Opens a session, runs the configured query and scans the results.
pub struct Core<'a, R: Repository> {
    repository: R,
    scanner: Scanner<'a>,
}

impl<'a, R: Repository> Core<'a, R> {
    pub fn new(repository: R, scanner: Scanner<'a>) -> Self {
        Self {
            repository,
            scanner,
        }
    }

    /// Repository errors end the run with an empty report; they are logged, never returned.
    pub fn run(&self, config: &ConnectionConfig) -> ScanReport {
        match self.try_run(config) {
            Ok(report) => report,
            Err(e) => {
                self.scanner.sink().error(&format!("Repository error: {}", e));
                ScanReport::default()
            }
        }
    }

    fn try_run(&self, config: &ConnectionConfig) -> Result<ScanReport, RepositoryError> {
        let sink = self.scanner.sink();
        let session = SessionGuard::new(self.repository.login(&config.user, &config.password)?);
        sink.info("Connected to the repository");

        let nodes = session.run_query(&config.query, config.language)?;
        sink.info(&format!(
            "Executed {} query [{}]",
            config.language, config.query
        ));

        Ok(self.scanner.run(nodes))
    }
}
