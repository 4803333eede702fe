use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as AnyhowContext, Result};

use crate::cli::Cli;
use crate::configuration::{
    self, ConnectionConfig, Properties, DEFAULT_FILE_QUERY, PASSWORD_KEY, QUERY_KEY,
    QUERY_LANGUAGE_KEY, URI_KEY, USER_KEY,
};
use crate::scanner::CollectPolicy;

/// Everything a run needs, resolved once at startup.
pub struct Context {
    pub connection: ConnectionConfig,
    pub page_type: String,
    pub max_depth: usize,
    pub policy: CollectPolicy,
    pub timeout: Duration,
    pub log_file: Option<PathBuf>,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let props = configuration::load_properties(&cli.properties);
        let mut props = merge_overrides(props, cli);

        if cli.ask_password && props.get(PASSWORD_KEY).map_or(true, |p| p.is_empty()) {
            if let Some(password) = prompt_password()? {
                props.insert(PASSWORD_KEY.to_string(), password);
            }
        }

        let connection = ConnectionConfig::from_properties(&props)
            .context("invalid repository connection settings")?;

        Ok(Self {
            connection,
            page_type: cli.page_type.clone(),
            max_depth: cli.max_depth,
            policy: if cli.distinct {
                CollectPolicy::Distinct
            } else {
                CollectPolicy::All
            },
            timeout: Duration::from_secs(cli.timeout_secs),
            log_file: cli.log_file.as_ref().map(PathBuf::from),
        })
    }
}

/// Flags and environment win over the properties file; the default query fills a missing key.
fn merge_overrides(mut props: Properties, cli: &Cli) -> Properties {
    let overrides = [
        (URI_KEY, cli.uri.clone()),
        (USER_KEY, cli.user.clone()),
        (PASSWORD_KEY, cli.password.clone()),
        (QUERY_KEY, cli.query.clone()),
        (
            QUERY_LANGUAGE_KEY,
            cli.language.map(|l| l.as_str().to_string()),
        ),
    ];
    for (key, value) in overrides {
        if let Some(value) = value {
            props.insert(key.to_string(), value);
        }
    }
    props
        .entry(QUERY_KEY.to_string())
        .or_insert_with(|| DEFAULT_FILE_QUERY.to_string());
    props
}

fn prompt_password() -> Result<Option<String>> {
    if !std::io::stdin().is_terminal() {
        return Ok(None);
    }
    let password = rpassword::prompt_password("Repository password: ").context("read password")?;
    Ok(Some(password).filter(|p| !p.is_empty()))
}
