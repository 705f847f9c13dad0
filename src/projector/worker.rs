//! Projector thread: the single owner of the projector state

use anyhow::Result;
use std::sync::mpsc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{Projector, Transport};
use crate::ipc::{ControlRequest, ControlResponse};
use crate::note::MarkdownRenderer;
use crate::protocol;
use crate::vault::FileLookup;

/// Everything the projector reacts to
pub enum ProjectorEvent {
    /// From a CLI client, answered on `reply`
    Control {
        request: ControlRequest,
        reply: mpsc::Sender<ControlResponse>,
    },
    /// Raw wire JSON from the popout window
    Popout(String),
}

fn respond(result: Result<()>) -> ControlResponse {
    match result {
        Ok(()) => ControlResponse::Ready,
        Err(e) => ControlResponse::Error(format!("{e:#}")),
    }
}

impl<L, R, T> Projector<L, R, T>
where
    L: FileLookup,
    R: MarkdownRenderer,
    T: Transport,
{
    pub fn dispatch(&mut self, request: ControlRequest) -> ControlResponse {
        let response = match request {
            ControlRequest::ShowCard { index } => respond(self.project_card(index)),
            ControlRequest::Next => respond(self.next()),
            ControlRequest::Prev => respond(self.prev()),
            ControlRequest::ShowMedia { path } => respond(self.project_media(&path)),
            ControlRequest::ShowNote { path } => respond(self.project_note(&path)),
            ControlRequest::ShowMap { path } => respond(self.project_map(&path)),
            ControlRequest::ShowItem { id } => respond(self.project_item(&id)),
            ControlRequest::ShowFavorite { index } => respond(self.project_favorite(index)),
            ControlRequest::ApplySettings(update) => respond(self.apply_settings(&update)),
            ControlRequest::Reload => respond(self.reload()),
            ControlRequest::ExportHistory => match self.export_history() {
                Ok(path) => ControlResponse::Exported(path),
                Err(e) => ControlResponse::Error(format!("{e:#}")),
            },
            ControlRequest::Ping => ControlResponse::Pong,
            ControlRequest::Shutdown => ControlResponse::Ready,
        };
        if let ControlResponse::Error(msg) = &response {
            warn!(error = %msg, "Control request failed");
        }
        response
    }
}

/// Run the projector until shutdown or until every sender is gone
///
/// `shutdown_tx` is signalled when a client asks the process to quit.
pub fn spawn_projector<L, R, T>(
    mut projector: Projector<L, R, T>,
    events: mpsc::Receiver<ProjectorEvent>,
    shutdown_tx: mpsc::Sender<()>,
) -> JoinHandle<()>
where
    L: FileLookup + Send + 'static,
    R: MarkdownRenderer + Send + 'static,
    T: Transport + 'static,
{
    std::thread::spawn(move || {
        info!("Projector thread started");
        while let Ok(event) = events.recv() {
            match event {
                ProjectorEvent::Control { request, reply } => {
                    let shutdown = request == ControlRequest::Shutdown;
                    let response = projector.dispatch(request);
                    if reply.send(response).is_err() {
                        warn!("Control client went away before the reply");
                    }
                    if shutdown {
                        info!("Shutdown requested via IPC");
                        shutdown_tx.send(()).ok();
                        break;
                    }
                }
                ProjectorEvent::Popout(raw) => match protocol::decode(&raw) {
                    Ok(Some(message)) => {
                        if let Err(e) = projector.handle_popout_message(message) {
                            error!(error = ?e, "Failed to answer popout");
                        }
                    }
                    Ok(None) => debug!("Ignoring message without our plugin tag"),
                    Err(e) => warn!(error = %e, "Dropping malformed popout message"),
                },
            }
        }
        info!("Projector thread stopped");
    })
}
