use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

// admin:admin
const ADMIN_AUTH: &str = "Basic YWRtaW46YWRtaW4=";

pub struct FakeCrx {
    nodes: HashMap<String, String>,
    results: Vec<String>,
    pub logouts: AtomicUsize,
}

async fn session_info(headers: HeaderMap) -> Response {
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(ADMIN_AUTH) => Json(json!({"userID": "admin", "workspace": "crx.default"})).into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn query(
    State(crx): State<Arc<FakeCrx>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    if params.get("stmt").map_or(true, |s| s.is_empty()) {
        return Json(json!({"success": false, "errorMessage": "empty statement"}));
    }
    let results: Vec<_> = crx.results.iter().map(|p| json!({ "path": p })).collect();
    Json(json!({"success": true, "results": results, "total": crx.results.len()}))
}

async fn logout(State(crx): State<Arc<FakeCrx>>) -> StatusCode {
    crx.logouts.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn node_json(State(crx): State<Arc<FakeCrx>>, uri: Uri) -> Response {
    let Some(path) = uri.path().strip_suffix(".json") else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let path = if path.is_empty() { "/" } else { path };
    match crx.nodes.get(path) {
        Some(ty) => Json(json!({ "jcr:primaryType": ty })).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serves a minimal Sling/CRX API for the given tree on a background thread.
pub fn spawn_fake_crx(nodes: &[(&str, &str)], results: &[&str]) -> (String, Arc<FakeCrx>) {
    let crx = Arc::new(FakeCrx {
        nodes: nodes
            .iter()
            .map(|(p, t)| (p.to_string(), t.to_string()))
            .collect(),
        results: results.iter().map(|p| p.to_string()).collect(),
        logouts: AtomicUsize::new(0),
    });
    let app = Router::new()
        .route("/system/sling/info.sessionInfo.json", get(session_info))
        .route("/crx/de/query.jsp", get(query))
        .route("/system/sling/logout", get(logout))
        .fallback(node_json)
        .with_state(crx.clone());

    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind fake crx");
    listener.set_nonblocking(true).expect("nonblocking");
    let addr = listener.local_addr().expect("local addr");
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("listener");
            axum::serve(listener, app).await.expect("serve");
        });
    });

    (format!("http://{}", addr), crx)
}

pub fn site() -> Vec<(&'static str, &'static str)> {
    vec![
        ("/", "rep:root"),
        ("/content", "sling:Folder"),
        ("/content/page-a", "cq:Page"),
        ("/content/page-a/folder", "nt:folder"),
        ("/content/page-a/folder/file1.png", "nt:file"),
        ("/content/page-a/file2.png", "nt:file"),
        ("/content/page-b", "cq:Page"),
        ("/content/page-b/file3.png", "nt:file"),
        ("/stray.png", "nt:file"),
    ]
}

pub fn write_properties(dir: &Path, lines: &[String]) -> std::path::PathBuf {
    let path = dir.join("crx-server.properties");
    let mut file = std::fs::File::create(&path).expect("create properties");
    for line in lines {
        writeln!(file, "{}", line).expect("write properties");
    }
    path
}

pub fn run_pagefinder(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pagefinder"))
        .args(args)
        .env("DOTENV_PATH", dir.join("missing.env"))
        .env("RUST_LOG", "info")
        .env_remove("PAGEFINDER_PROPERTIES")
        .env_remove("PAGEFINDER_PAGE_TYPE")
        .env_remove("PAGEFINDER_LOG_FILE")
        .env_remove("REPOSITORY_URI")
        .env_remove("REPOSITORY_USER")
        .env_remove("REPOSITORY_PASSWORD")
        .env_remove("REPOSITORY_QUERY")
        .env_remove("REPOSITORY_QUERY_LANGUAGE")
        .output()
        .expect("run pagefinder")
}

pub fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}
