//! Control socket handler inside the popout process

use anyhow::{Context, Result};
use std::os::unix::net::UnixStream;
use std::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{ControlRequest, ControlResponse, ControlServer, read_message, write_message};
use crate::projector::ProjectorEvent;

/// Spawn IPC listener thread forwarding CLI requests to the projector
pub fn spawn_ipc_listener(
    server: ControlServer,
    projector_tx: mpsc::Sender<ProjectorEvent>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        if let Err(e) = run_ipc_loop(&server, &projector_tx) {
            error!(error = ?e, "IPC listener thread crashed");
        }
    })
}

fn run_ipc_loop(server: &ControlServer, projector_tx: &mpsc::Sender<ProjectorEvent>) -> Result<()> {
    info!(socket = ?server.path(), "IPC listener started");

    loop {
        let mut stream = server.accept().context("Failed to accept IPC connection")?;
        debug!("CLI connected");

        match serve_client(&mut stream, projector_tx) {
            Ok(ClientOutcome::Disconnected) => debug!("CLI disconnected"),
            Ok(ClientOutcome::ProjectorGone) => {
                info!("Projector stopped, closing IPC listener");
                break Ok(());
            }
            Err(e) => warn!(error = ?e, "IPC client error"),
        }
    }
}

enum ClientOutcome {
    Disconnected,
    ProjectorGone,
}

/// Requests from one client are handled in order until it hangs up
fn serve_client(stream: &mut UnixStream, projector_tx: &mpsc::Sender<ProjectorEvent>) -> Result<ClientOutcome> {
    loop {
        let request: ControlRequest = match read_message(stream) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = ?e, "IPC connection closed");
                return Ok(ClientOutcome::Disconnected);
            }
        };
        debug!(request = ?request, "Received control request");

        let shutdown = request == ControlRequest::Shutdown;
        let (reply_tx, reply_rx) = mpsc::channel();
        if projector_tx.send(ProjectorEvent::Control { request, reply: reply_tx }).is_err() {
            write_message(stream, &ControlResponse::Error("Projector is not running".to_string()))?;
            return Ok(ClientOutcome::ProjectorGone);
        }

        let response = reply_rx
            .recv()
            .unwrap_or_else(|_| ControlResponse::Error("Projector dropped the request".to_string()));
        write_message(stream, &response)?;

        if shutdown {
            return Ok(ClientOutcome::ProjectorGone);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::ControlClient;

    #[test]
    fn test_requests_are_forwarded_and_answered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("control.sock");
        let server = ControlServer::bind_to(path.clone()).unwrap();
        let (tx, rx) = mpsc::channel();
        let listener = spawn_ipc_listener(server, tx);

        // Stand-in projector answering two requests
        let projector = std::thread::spawn(move || {
            for _ in 0..2 {
                match rx.recv().unwrap() {
                    ProjectorEvent::Control { request: ControlRequest::Ping, reply } => {
                        reply.send(ControlResponse::Pong).unwrap();
                    }
                    ProjectorEvent::Control { request: ControlRequest::Shutdown, reply } => {
                        reply.send(ControlResponse::Ready).unwrap();
                    }
                    _ => panic!("unexpected event"),
                }
            }
        });

        let mut client = ControlClient::connect_to(&path).unwrap();
        assert_eq!(client.request(ControlRequest::Ping).unwrap(), ControlResponse::Pong);
        assert_eq!(client.request(ControlRequest::Shutdown).unwrap(), ControlResponse::Ready);

        projector.join().unwrap();
        listener.join().unwrap();
    }

    #[test]
    fn test_missing_projector_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("control.sock");
        let server = ControlServer::bind_to(path.clone()).unwrap();
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let listener = spawn_ipc_listener(server, tx);

        let mut client = ControlClient::connect_to(&path).unwrap();
        match client.request(ControlRequest::Next).unwrap() {
            ControlResponse::Error(msg) => assert!(msg.contains("not running")),
            other => panic!("expected error, got {other:?}"),
        }
        listener.join().unwrap();
    }
}
