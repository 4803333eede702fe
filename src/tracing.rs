use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::report::RESULT_TARGET;

/// Operational log destination: stderr, teed to an optional file.
#[derive(Clone)]
struct SharedWriter {
    file: Arc<Mutex<Option<File>>>,
}

struct MultiWriter {
    file: Arc<Mutex<Option<File>>>,
}

impl SharedWriter {
    fn new(log_file: Option<&Path>) -> Self {
        Self {
            file: Arc::new(Mutex::new(log_file.and_then(open_log_file))),
        }
    }
}

impl<'a> fmt::MakeWriter<'a> for SharedWriter {
    type Writer = MultiWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MultiWriter {
            file: self.file.clone(),
        }
    }
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = io::stderr().write(buf)?;
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.write_all(&buf[..written]);
            }
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
        Ok(())
    }
}

fn open_log_file(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        let _ = std::fs::create_dir_all(parent);
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

fn is_result(target: &str) -> bool {
    target == RESULT_TARGET
}

/// Installs the global subscriber. Result lines go to stdout, everything else to stderr.
pub fn init(log_file: Option<&Path>) {
    let _ = tracing_log::LogTracer::init();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let operations = fmt::layer()
        .with_writer(SharedWriter::new(log_file))
        .with_ansi(false)
        .with_filter(filter_fn(|meta| !is_result(meta.target())));

    let results = fmt::layer()
        .with_writer(io::stdout)
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_ansi(false)
        .with_filter(filter_fn(|meta| is_result(meta.target())));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(operations)
        .with(results);

    let _ = ::tracing::subscriber::set_global_default(subscriber);
}
