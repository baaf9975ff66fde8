//! In-memory reference host.
//!
//! Owns one document and serves both bridge planes on loopback. The tool side
//! never assumes this implementation: it only relies on the wire contract in
//! `appmodel_types::wire`, so any host speaking the same routes can replace it.
//!
//! Every action runs under the store lock, so two racing tool calls are
//! applied one after the other. Nothing ties an action to the snapshot the
//! caller validated against.

pub mod commands;
pub mod router;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::BridgeConfig;

pub use commands::HostSession;
pub use router::{command_router, data_router};
pub use store::{Action, DocumentStore, StoreError, Verb};

/// Shared state behind both routers.
#[derive(Clone)]
pub struct HostState {
    pub store: Arc<Mutex<DocumentStore>>,
    pub session: Arc<HostSession>,
}

#[derive(Debug, Clone, Default)]
pub struct HostOptions {
    pub logged_in: bool,
    /// Delay before the auth probe answers.
    pub auth_delay_ms: Option<u64>,
}

impl HostState {
    pub fn new(store: DocumentStore, options: &HostOptions) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            session: Arc::new(HostSession::new(
                options.logged_in,
                options.auth_delay_ms.map(Duration::from_millis),
            )),
        }
    }
}

/// A running host; both servers stop when the handle is dropped.
pub struct HostHandle {
    pub data_addr: SocketAddr,
    pub command_addr: SocketAddr,
    tasks: Vec<JoinHandle<()>>,
}

impl HostHandle {
    /// Client configuration pointing at this host.
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            host: self.data_addr.ip().to_string(),
            data_port: self.data_addr.port(),
            command_port: self.command_addr.port(),
            ..Default::default()
        }
    }

    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    /// Wait until either server exits.
    pub async fn wait(mut self) {
        let tasks = std::mem::take(&mut self.tasks);
        for task in tasks {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::error!(error = %e, "host server task failed");
                }
            }
        }
    }
}

impl Drop for HostHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Bind both planes and serve them in the background. Port 0 picks a free port.
pub async fn bind_loopback(
    state: HostState,
    host: &str,
    data_port: u16,
    command_port: u16,
) -> std::io::Result<HostHandle> {
    let data_listener = TcpListener::bind((host, data_port)).await?;
    let command_listener = TcpListener::bind((host, command_port)).await?;
    let data_addr = data_listener.local_addr()?;
    let command_addr = command_listener.local_addr()?;

    tracing::info!(%data_addr, %command_addr, "host listening");

    let tasks = vec![
        spawn_plane("data-plane", data_listener, data_router(state.clone())),
        spawn_plane("command-plane", command_listener, command_router(state)),
    ];
    Ok(HostHandle {
        data_addr,
        command_addr,
        tasks,
    })
}

fn spawn_plane(plane: &'static str, listener: TcpListener, app: axum::Router) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(plane, error = %e, "server stopped");
        }
    })
}
