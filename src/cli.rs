use std::env;
use std::path::PathBuf;

use clap::Parser;

use crate::configuration::DEFAULT_PROPERTIES_FILE;
use crate::repository::QueryLanguage;
use crate::resolver::{DEFAULT_MAX_DEPTH, DEFAULT_PAGE_TYPE};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "List the pages that contain files matched by a repository query",
    long_about = "Connects to a JCR content repository over HTTP, runs a query for file nodes and reports, for every match, the nearest enclosing page.\n\nConnection settings are read from a properties file and can be overridden by flags or environment variables."
)]
pub struct Cli {
    #[arg(
        short = 'p',
        long,
        env = "PAGEFINDER_PROPERTIES",
        default_value = DEFAULT_PROPERTIES_FILE,
        value_name = "PATH",
        help = "Properties file with repository.* connection settings"
    )]
    pub properties: PathBuf,

    #[arg(long, env = "REPOSITORY_URI", value_name = "URL", help = "Repository base URL")]
    pub uri: Option<String>,

    #[arg(long, env = "REPOSITORY_USER", value_name = "USER", help = "Repository user")]
    pub user: Option<String>,

    #[arg(
        long,
        env = "REPOSITORY_PASSWORD",
        value_name = "PASS",
        hide_env_values = true,
        help = "Repository password"
    )]
    pub password: Option<String>,

    #[arg(
        long,
        default_value_t = false,
        help = "Prompt for the password when none is configured"
    )]
    pub ask_password: bool,

    #[arg(
        short = 'q',
        long,
        env = "REPOSITORY_QUERY",
        value_name = "STATEMENT",
        help = "Query locating the file nodes"
    )]
    pub query: Option<String>,

    #[arg(
        long,
        env = "REPOSITORY_QUERY_LANGUAGE",
        value_enum,
        value_name = "LANG",
        help = "Query language of the statement"
    )]
    pub language: Option<QueryLanguage>,

    #[arg(
        long,
        env = "PAGEFINDER_PAGE_TYPE",
        default_value = DEFAULT_PAGE_TYPE,
        value_name = "TYPE",
        help = "Primary type of the enclosing nodes to report"
    )]
    pub page_type: String,

    #[arg(
        long,
        default_value_t = DEFAULT_MAX_DEPTH,
        value_name = "N",
        help = "Give up on a node after walking N ancestors"
    )]
    pub max_depth: usize,

    #[arg(
        long,
        default_value_t = false,
        help = "Report each page once instead of once per matching file"
    )]
    pub distinct: bool,

    #[arg(
        long,
        default_value_t = 30u64,
        value_name = "SECS",
        help = "HTTP request timeout"
    )]
    pub timeout_secs: u64,

    #[arg(
        long = "log-file",
        env = "PAGEFINDER_LOG_FILE",
        value_name = "PATH",
        help = "Write logs to PATH (in addition to stderr)"
    )]
    pub log_file: Option<String>,
}

pub fn parse() -> Cli {
    let dotenv_path = env::var("DOTENV_PATH").unwrap_or(".env".into());
    dotenvy::from_filename(&dotenv_path).ok();

    Cli::parse()
}
