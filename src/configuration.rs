use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use java_properties::{LineContent, PropertiesIter};
use thiserror::Error;

use crate::repository::QueryLanguage;

pub const DEFAULT_PROPERTIES_FILE: &str = "crx-server.properties";

pub const URI_KEY: &str = "repository.uri";
pub const USER_KEY: &str = "repository.user";
pub const PASSWORD_KEY: &str = "repository.password";
pub const QUERY_KEY: &str = "repository.query";
pub const QUERY_LANGUAGE_KEY: &str = "repository.query.language";

/// Image files uploaded anywhere below /content.
pub const DEFAULT_FILE_QUERY: &str = "/jcr:root/content//element(*, nt:file)[jcr:like(fn:name(), '%.jpg') or jcr:like(fn:name(), '%.jpeg') or jcr:like(fn:name(), '%.png') or jcr:like(fn:name(), '%.gif')]";

pub type Properties = BTreeMap<String, String>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} should not be empty")]
    Missing(&'static str),
    #[error("{key} has unsupported value {value}")]
    Invalid { key: &'static str, value: String },
}

/// Validated repository connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub query: String,
    pub language: QueryLanguage,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"***")
            .field("query", &self.query)
            .field("language", &self.language)
            .finish()
    }
}

impl ConnectionConfig {
    pub fn from_properties(props: &Properties) -> Result<Self, ConfigError> {
        let language = match props.get(QUERY_LANGUAGE_KEY).map(|s| s.trim()) {
            None | Some("") => QueryLanguage::default(),
            Some(value) => QueryLanguage::parse(value).ok_or_else(|| ConfigError::Invalid {
                key: QUERY_LANGUAGE_KEY,
                value: value.to_string(),
            })?,
        };

        Ok(Self {
            uri: required(props, URI_KEY)?,
            user: required(props, USER_KEY)?,
            password: required(props, PASSWORD_KEY)?,
            query: required(props, QUERY_KEY)?,
            language,
        })
    }
}

fn required(props: &Properties, key: &'static str) -> Result<String, ConfigError> {
    match props.get(key) {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(ConfigError::Missing(key)),
    }
}

/// Reads a Java-style properties file. Values are taken literally; the process environment is
/// never consulted. A file that cannot be opened yields an empty mapping, a malformed line is
/// skipped.
pub fn load_properties(path: &Path) -> Properties {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            log::error!(
                "Failed to load connection properties from {}: {}",
                path.display(),
                e
            );
            return Properties::new();
        }
    };

    let mut props = Properties::new();
    for line in PropertiesIter::new(BufReader::new(file)) {
        match line {
            Ok(line) => {
                if let LineContent::KVPair(key, value) = line.consume_content() {
                    props.insert(key, value);
                }
            }
            Err(e) => match e.line_number() {
                Some(n) => log::warn!("Skipping line {} of {}: {}", n, path.display(), e),
                None => {
                    log::error!(
                        "Failed to read connection properties from {}: {}",
                        path.display(),
                        e
                    );
                    break;
                }
            },
        }
    }
    props
}
