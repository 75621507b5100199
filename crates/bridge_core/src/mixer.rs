use futures::StreamExt;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::{
    backoff::{Backoff, ReconnectPolicy},
    error::BridgeError,
    reconcile::SceneSwitcher,
    shutdown_requested, BridgeEvent, LinkState, SessionEnd,
};

/// Owns the mixer event socket and forwards scene switches to the [`SceneSwitcher`].
pub struct MixerConnection {
    url: String,
    policy: ReconnectPolicy,
    switcher: SceneSwitcher,
    state: watch::Sender<LinkState>,
    events: broadcast::Sender<BridgeEvent>,
}

impl MixerConnection {
    pub fn new(
        url: impl Into<String>,
        policy: ReconnectPolicy,
        switcher: SceneSwitcher,
        events: broadcast::Sender<BridgeEvent>,
    ) -> (Self, watch::Receiver<LinkState>) {
        let (state, state_rx) = watch::channel(LinkState::Closed);
        let connection = Self {
            url: url.into(),
            policy,
            switcher,
            state,
            events,
        };
        (connection, state_rx)
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut backoff = Backoff::new(self.policy);
        while !*shutdown.borrow() {
            self.state.send_replace(LinkState::Connecting);
            let result = self.session(&mut shutdown, &mut backoff).await;
            let was_ready = self.state.send_replace(LinkState::Closed) == LinkState::Ready;

            match result {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Closed) => info!(url = %self.url, "mixer: disconnected"),
                Err(err) if err.is_connection_refused() => {
                    debug!(url = %self.url, "mixer: unavailable")
                }
                Err(err) => warn!(url = %self.url, error = %err, "mixer: connection failed"),
            }
            if was_ready {
                let _ = self.events.send(BridgeEvent::MixerDisconnected);
            }

            let delay = backoff.next_delay();
            debug!(delay_ms = delay.as_millis() as u64, "mixer: reconnect scheduled");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }
        self.state.send_replace(LinkState::Closed);
        debug!("mixer: stopped");
    }

    async fn session(
        &self,
        shutdown: &mut watch::Receiver<bool>,
        backoff: &mut Backoff,
    ) -> Result<SessionEnd, BridgeError> {
        let (mut socket, _) = tokio::select! {
            result = connect_async(self.url.as_str()) => result.map_err(|source| BridgeError::Connect {
                url: self.url.clone(),
                source,
            })?,
            _ = shutdown_requested(shutdown) => return Ok(SessionEnd::Shutdown),
        };
        backoff.reset();
        self.state.send_replace(LinkState::Ready);
        info!(url = %self.url, "mixer: connected");
        let _ = self.events.send(BridgeEvent::MixerConnected);

        loop {
            tokio::select! {
                frame = socket.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        self.switcher.handle_frame(&text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::Closed),
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err.into()),
                },
                _ = shutdown_requested(shutdown) => {
                    let _ = socket.close(None).await;
                    return Ok(SessionEnd::Shutdown);
                }
            }
        }
    }
}
