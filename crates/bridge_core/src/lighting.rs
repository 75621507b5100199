use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use shared::{
    domain::WidgetId,
    protocol::{LightingCommand, LightingFrame},
};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

use crate::{
    backoff::{Backoff, ReconnectPolicy},
    error::BridgeError,
    registry::SharedRegistry,
    shutdown_requested,
    widget_page::WidgetSource,
    BridgeEvent, LinkState, SessionEnd,
};

/// Cloneable sender side of the lighting console connection.
///
/// Commands are only queued while the connection is [`LinkState::Ready`];
/// otherwise they are logged and dropped.
#[derive(Clone)]
pub struct LightingHandle {
    commands: mpsc::UnboundedSender<LightingCommand>,
    state: watch::Receiver<LinkState>,
}

impl LightingHandle {
    pub(crate) fn from_parts(
        commands: mpsc::UnboundedSender<LightingCommand>,
        state: watch::Receiver<LinkState>,
    ) -> Self {
        Self { commands, state }
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == LinkState::Ready
    }

    pub fn send_command(&self, widget_id: &WidgetId, value: u8) -> bool {
        self.send(LightingCommand::new(widget_id.clone(), value))
    }

    /// Queues `command` for the console. Returns whether it was queued.
    pub fn send(&self, command: LightingCommand) -> bool {
        if !self.is_ready() {
            debug!(frame = %command, "lighting: console not ready, dropping command");
            return false;
        }
        self.commands.send(command).is_ok()
    }
}

/// Owns the lighting console socket and keeps the widget registry current.
pub struct LightingConnection {
    url: String,
    source: Arc<dyn WidgetSource>,
    registry: SharedRegistry,
    policy: ReconnectPolicy,
    state: watch::Sender<LinkState>,
    commands: mpsc::UnboundedReceiver<LightingCommand>,
    events: broadcast::Sender<BridgeEvent>,
}

impl LightingConnection {
    pub fn new(
        url: impl Into<String>,
        source: Arc<dyn WidgetSource>,
        registry: SharedRegistry,
        policy: ReconnectPolicy,
        events: broadcast::Sender<BridgeEvent>,
    ) -> (Self, LightingHandle) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (state, state_rx) = watch::channel(LinkState::Closed);
        let connection = Self {
            url: url.into(),
            source,
            registry,
            policy,
            state,
            commands,
            events,
        };
        (connection, LightingHandle::from_parts(commands_tx, state_rx))
    }

    /// Connects, serves and reconnects until `shutdown` flips to `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut backoff = Backoff::new(self.policy);
        while !*shutdown.borrow() {
            self.state.send_replace(LinkState::Connecting);
            let result = self.session(&mut shutdown, &mut backoff).await;
            let was_ready = self.state.send_replace(LinkState::Closed) == LinkState::Ready;
            self.discard_pending_commands();

            match result {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Closed) if was_ready => {
                    info!(url = %self.url, "lighting: disconnected from console")
                }
                Ok(SessionEnd::Closed) => debug!(url = %self.url, "lighting: closed before ready"),
                Err(err) if err.is_connection_refused() => {
                    debug!(url = %self.url, "lighting: console unavailable")
                }
                Err(err) => warn!(url = %self.url, error = %err, "lighting: connection failed"),
            }
            if was_ready {
                let _ = self.events.send(BridgeEvent::LightingDisconnected);
            }

            let delay = backoff.next_delay();
            debug!(delay_ms = delay.as_millis() as u64, "lighting: reconnect scheduled");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }
        self.state.send_replace(LinkState::Closed);
        debug!("lighting: stopped");
    }

    async fn session(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
        backoff: &mut Backoff,
    ) -> Result<SessionEnd, BridgeError> {
        let (socket, _) = tokio::select! {
            result = connect_async(self.url.as_str()) => result.map_err(|source| BridgeError::Connect {
                url: self.url.clone(),
                source,
            })?,
            _ = shutdown_requested(shutdown) => return Ok(SessionEnd::Shutdown),
        };
        // The previous session's widgets are gone until the fetch below lands.
        self.registry.write().await.clear();
        self.state.send_replace(LinkState::OpenUnready);
        debug!(url = %self.url, "lighting: socket open, fetching widget state");
        let (mut writer, mut reader) = socket.split();

        // Not ready until the registry reflects this session.
        let widgets = tokio::select! {
            widgets = self.source.fetch_widgets() => widgets?,
            _ = shutdown_requested(shutdown) => {
                let _ = writer.close().await;
                return Ok(SessionEnd::Shutdown);
            }
        };
        let count = self.registry.write().await.replace_all(widgets);
        self.discard_pending_commands();
        backoff.reset();
        self.state.send_replace(LinkState::Ready);
        info!(url = %self.url, widgets = count, "lighting: connected to console");
        let _ = self.events.send(BridgeEvent::LightingReady { widgets: count });

        loop {
            tokio::select! {
                frame = reader.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.on_frame(&text).await,
                    Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::Closed),
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err.into()),
                },
                Some(command) = self.commands.recv() => {
                    trace!(frame = %command, "lighting: sending");
                    writer.send(Message::Text(command.to_frame())).await?;
                }
                _ = shutdown_requested(shutdown) => {
                    let _ = writer.close().await;
                    return Ok(SessionEnd::Shutdown);
                }
            }
        }
    }

    async fn on_frame(&self, raw: &str) {
        match LightingFrame::parse(raw) {
            Ok(LightingFrame::ButtonStatus(push)) => {
                let mut registry = self.registry.write().await;
                match registry.apply_status(&push) {
                    Some(widget) => {
                        debug!(
                            widget_id = %widget.id,
                            active = widget.active,
                            monitoring = widget.monitoring,
                            "lighting: {} status updated",
                            widget.text
                        );
                        let _ = self.events.send(BridgeEvent::WidgetUpdated {
                            widget_id: widget.id.clone(),
                            active: widget.active,
                            monitoring: widget.monitoring,
                        });
                    }
                    None => {
                        debug!(widget_id = %push.widget_id, "lighting: status for unknown widget")
                    }
                }
            }
            Ok(LightingFrame::Other(frame)) => trace!(frame = %frame, "lighting: ignoring frame"),
            Err(err) => debug!(error = %err, "lighting: dropped malformed frame"),
        }
    }

    /// Commands queued for a session that is gone are never replayed.
    fn discard_pending_commands(&mut self) {
        let mut discarded = 0usize;
        while self.commands.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "lighting: discarded undelivered commands");
        }
    }
}

#[cfg(test)]
#[path = "tests/lighting_tests.rs"]
mod tests;
