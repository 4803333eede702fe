use log::Level;

pub const OPERATIONS_TARGET: &str = "pagefinder::common";
pub const RESULT_TARGET: &str = "pagefinder::result";

/// Destination for messages emitted while scanning.
pub trait EventSink {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to the `log` facade under a fixed target.
#[derive(Clone, Copy, Debug)]
pub struct LogSink {
    target: &'static str,
}

impl LogSink {
    pub fn operations() -> Self {
        Self {
            target: OPERATIONS_TARGET,
        }
    }

    pub fn results() -> Self {
        Self {
            target: RESULT_TARGET,
        }
    }

    fn emit(&self, level: Level, message: &str) {
        log::log!(target: self.target, level, "{}", message);
    }
}

impl EventSink for LogSink {
    fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.emit(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.emit(Level::Error, message);
    }
}

pub struct Reporter<'a> {
    operations: &'a dyn EventSink,
    results: &'a dyn EventSink,
}

impl<'a> Reporter<'a> {
    pub fn new(operations: &'a dyn EventSink, results: &'a dyn EventSink) -> Self {
        Self {
            operations,
            results,
        }
    }

    pub fn report(&self, pages: &[String]) {
        self.operations
            .info(&format!("Found {} pages with uploaded images", pages.len()));
        self.results
            .info(&format!("Found {} total pages", pages.len()));
        for page in pages {
            self.results.info(page);
        }
    }
}

#[cfg(test)]
pub use capture::CapturingSink;
