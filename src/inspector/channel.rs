use crate::inspector::{Notification, PauseHandler, PausedContext};
use crossbeam_channel::{Receiver, RecvError, Sender, unbounded};
use serde_json::{Value as JsonValue, json};
use std::sync::atomic::{AtomicU64, Ordering};

/// Pause handler that serves protocol requests coming from another thread.
///
/// While the script is paused it blocks on the request channel, dispatches
/// each message and sends back the response, until a message resumes
/// execution. A dropped [`FrontendHandle`] resumes as well.
pub struct ChannelFrontend {
    requests: Receiver<JsonValue>,
    responses: Sender<JsonValue>,
}

/// The remote end of a [`ChannelFrontend`]. `Send`, so it can live on the
/// thread that plays the debugger client.
pub struct FrontendHandle {
    requests: Sender<JsonValue>,
    responses: Receiver<JsonValue>,
    notifications: Receiver<Notification>,
    next_id: AtomicU64,
}

/// Connects a frontend to the session whose notifications are given.
pub fn channel_frontend(notifications: Receiver<Notification>) -> (ChannelFrontend, FrontendHandle) {
    let (request_tx, request_rx) = unbounded();
    let (response_tx, response_rx) = unbounded();
    (
        ChannelFrontend {
            requests: request_rx,
            responses: response_tx,
        },
        FrontendHandle {
            requests: request_tx,
            responses: response_rx,
            notifications,
            next_id: AtomicU64::new(1),
        },
    )
}

impl PauseHandler for ChannelFrontend {
    fn on_paused(&mut self, ctx: &mut PausedContext<'_>) {
        while ctx.is_paused() {
            let request = match self.requests.recv() {
                Ok(request) => request,
                Err(RecvError) => {
                    log::debug!("frontend disconnected while paused, resuming");
                    break;
                }
            };
            let response = ctx.dispatch(&request);
            if self.responses.send(response).is_err() {
                log::warn!("frontend dropped a response");
            }
        }
    }
}

impl FrontendHandle {
    /// Sends `method` and waits for its response.
    pub fn call(&self, method: &str, params: JsonValue) -> Result<JsonValue, RecvError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let message = json!({ "id": id, "method": method, "params": params });
        if self.requests.send(message).is_err() {
            return Err(RecvError);
        }
        self.responses.recv()
    }

    /// Blocks until a notification named `method` arrives, skipping others.
    pub fn wait_for(&self, method: &str) -> Result<Notification, RecvError> {
        loop {
            let notification = self.notifications.recv()?;
            if notification.method == method {
                return Ok(notification);
            }
        }
    }

    pub fn notifications(&self) -> &Receiver<Notification> {
        &self.notifications
    }
}
