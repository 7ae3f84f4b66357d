//! Dev server with live reload.
//!
//! `site-pipeline server` runs the server plan's prerequisites, then serves
//! the output directory and re-runs stages as sources change.
//!
//! | Route | Purpose |
//! |---|---|
//! | `/__reload/client.js` | live-reload client |
//! | `/__reload/ws` | WebSocket carrying [`ReloadEvent`]s as JSON |
//! | everything else | files from the output directory |
//!
//! HTML responses get the client injected before `</body>`.

use crate::output::{print_failure, print_plan_summary};
use crate::pipeline::Pipeline;
use crate::plan::{Plan, PlanError, execute};
use crate::reload::{ReloadEvent, ReloadHub};
use crate::watch::{FileWatcher, WatchError, WatchRules, watch_and_rebuild};
use axum::{
    Router,
    body::Body,
    extract::{
        Request, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

pub const CLIENT_PATH: &str = "/__reload/client.js";
pub const SOCKET_PATH: &str = "/__reload/ws";

const CLIENT_TAG: &str = r#"<script src="/__reload/client.js"></script>"#;

const CLIENT_JS: &str = r#"(function () {
  var proto = location.protocol === "https:" ? "wss://" : "ws://";
  var socket = new WebSocket(proto + location.host + "/__reload/ws");
  function banner(text) {
    var el = document.createElement("div");
    el.textContent = text;
    el.style.cssText = "position:fixed;top:0;right:0;z-index:99999;padding:12px 18px;" +
      "background:#1d1f21;color:#fff;font:14px sans-serif";
    document.body.appendChild(el);
    setTimeout(function () { el.remove(); }, 4000);
  }
  function refreshStylesheets(paths) {
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    links.forEach(function (link) {
      var url = new URL(link.href);
      if (paths.indexOf(url.pathname) !== -1) {
        url.searchParams.set("_reload", Date.now());
        link.href = url.toString();
      }
    });
  }
  socket.onmessage = function (message) {
    var event = JSON.parse(message.data);
    if (event.type === "reload") location.reload();
    else if (event.type === "inject") refreshStylesheets(event.paths);
    else if (event.type === "notify") banner(event.message);
  };
})();
"#;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("build task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Clone)]
struct ServerState {
    hub: ReloadHub,
    output: PathBuf,
}

/// Insert the live-reload client before the last `</body>`, or append it.
pub fn inject_client(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(at) => format!("{}{}{}", &html[..at], CLIENT_TAG, &html[at..]),
        None => format!("{}{}", html, CLIENT_TAG),
    }
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"))
}

async fn client_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_JS,
    )
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
    let events = state.hub.subscribe();
    ws.on_upgrade(move |socket| forward_events(socket, events))
}

/// Push hub events to one browser until either side goes away.
async fn forward_events(mut socket: WebSocket, mut events: broadcast::Receiver<ReloadEvent>) {
    debug!("reload client connected");
    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    // Missed events; a full reload covers all of them.
                    Err(broadcast::error::RecvError::Lagged(_)) => ReloadEvent::Reload,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "failed to encode reload event");
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("reload client disconnected");
}

/// Serve a file from the output directory, injecting the client into HTML.
async fn serve_output(State(state): State<ServerState>, request: Request) -> Response {
    let is_head = request.method() == Method::HEAD;
    let response = ServeDir::new(&state.output)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {})
        .map(Body::new);

    if is_head || response.status() != StatusCode::OK || !is_html(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "failed to read page");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let html = inject_client(&String::from_utf8_lossy(&bytes));
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(html.len()));
    Response::from_parts(parts, Body::from(html))
}

fn build_router(state: ServerState) -> Router {
    Router::new()
        .route(CLIENT_PATH, get(client_js))
        .route(SOCKET_PATH, get(ws_handler))
        .fallback(serve_output)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

/// Build the server prerequisites, then serve and watch until ctrl-c.
pub async fn serve(pipeline: Arc<Pipeline<ReloadHub>>) -> Result<(), ServeError> {
    let plan = Plan::server();
    let start = Instant::now();
    let prerequisites = Arc::clone(&pipeline);
    let run_plan = plan.clone();
    let built =
        tokio::task::spawn_blocking(move || execute(&run_plan, prerequisites.as_ref())).await?;
    match built {
        Ok(reports) => print_plan_summary(&plan, &reports, start.elapsed()),
        Err(err) => {
            print_failure(&err);
            return Err(err.into());
        }
    }

    let layout = pipeline.layout().clone();
    let settings = pipeline.config().server.clone();

    let rules = WatchRules::for_layout(&layout);
    let watcher = FileWatcher::new(&rules.watched_dirs(), settings.debounce_ms)?;
    tokio::spawn(watch_and_rebuild(
        Arc::clone(&pipeline),
        rules,
        layout.root.clone(),
        watcher,
    ));

    let state = ServerState {
        hub: pipeline.notifier().clone(),
        output: layout.output.clone(),
    };
    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServeError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!(%addr, output = %layout.output.display(), "dev server listening");
    println!("Serving {} at http://{}", layout.output.display(), addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
