use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use shared::domain::WidgetStatus;
use tokio::{
    net::TcpListener,
    sync::{broadcast, mpsc, RwLock},
    time::timeout,
};

use crate::BridgeEvent;

pub(crate) const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
enum PeerControl {
    Push(String),
    Disconnect,
}

/// Renders show buttons the way the console's web UI does.
pub(crate) fn status_page(buttons: &[(&str, &str, WidgetStatus)]) -> String {
    let mut html = String::from("<html><body><div id=\"vcPage\">");
    for (id, text, status) in buttons {
        let border = match status {
            WidgetStatus::Active => "#00E600",
            WidgetStatus::Monitoring => "#FFAA00",
            WidgetStatus::Idle => "#A0A0A0",
        };
        html.push_str(&format!(
            "<div class=\"vcbutton\" id=\"{id}\" style=\"width: 80px; height: 80px; border: 3px solid {border};\">{text}</div>"
        ));
    }
    html.push_str("</div></body></html>");
    html
}

/// Address nothing is listening on.
pub(crate) async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("addr")
}

pub(crate) async fn wait_for_event(
    events: &mut broadcast::Receiver<BridgeEvent>,
    mut matches: impl FnMut(&BridgeEvent) -> bool,
) -> BridgeEvent {
    timeout(WAIT, async {
        loop {
            let event = events.recv().await.expect("event stream open");
            if matches(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event in time")
}

#[derive(Clone)]
struct ConsoleState {
    page: Arc<RwLock<String>>,
    received: mpsc::UnboundedSender<String>,
    control: broadcast::Sender<PeerControl>,
}

/// In-process lighting console: status page on `/`, control socket on `/qlcplusWS`.
pub(crate) struct FakeConsole {
    addr: SocketAddr,
    page: Arc<RwLock<String>>,
    control: broadcast::Sender<PeerControl>,
    received: mpsc::UnboundedReceiver<String>,
}

impl FakeConsole {
    pub(crate) async fn start(page: String) -> Self {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (received_tx, received) = mpsc::unbounded_channel();
        let (control, _) = broadcast::channel(64);
        let page = Arc::new(RwLock::new(page));
        let state = ConsoleState {
            page: Arc::clone(&page),
            received: received_tx,
            control: control.clone(),
        };
        let app = Router::new()
            .route("/", get(serve_status_page))
            .route("/qlcplusWS", get(console_socket))
            .with_state(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            addr,
            page,
            control,
            received,
        }
    }

    pub(crate) fn ws_url(&self) -> String {
        format!("ws://{}/qlcplusWS", self.addr)
    }

    pub(crate) fn http_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) async fn set_page(&self, page: String) {
        *self.page.write().await = page;
    }

    pub(crate) fn push(&self, frame: &str) {
        let _ = self.control.send(PeerControl::Push(frame.to_string()));
    }

    pub(crate) fn disconnect(&self) {
        let _ = self.control.send(PeerControl::Disconnect);
    }

    pub(crate) async fn next_frames(&mut self, count: usize) -> Vec<String> {
        let mut frames = Vec::with_capacity(count);
        for _ in 0..count {
            let frame = timeout(WAIT, self.received.recv())
                .await
                .expect("frame in time")
                .expect("console alive");
            frames.push(frame);
        }
        frames
    }

    pub(crate) fn drain_frames(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.received.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

async fn serve_status_page(State(state): State<ConsoleState>) -> Html<String> {
    Html(state.page.read().await.clone())
}

async fn console_socket(
    ws: WebSocketUpgrade,
    State(state): State<ConsoleState>,
) -> impl IntoResponse {
    // Subscribe before the upgrade completes so no push is missed.
    let control = state.control.subscribe();
    ws.on_upgrade(move |socket| serve_peer(socket, control, Some(state.received)))
}

/// In-process mixer: event socket on `/`.
pub(crate) struct FakeMixer {
    addr: SocketAddr,
    control: broadcast::Sender<PeerControl>,
}

impl FakeMixer {
    pub(crate) async fn start() -> Self {
        Self::start_on(SocketAddr::from(([127, 0, 0, 1], 0))).await
    }

    pub(crate) async fn start_on(addr: SocketAddr) -> Self {
        let listener = TcpListener::bind(addr).await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (control, _) = broadcast::channel(64);
        let app = Router::new()
            .route("/", get(mixer_socket))
            .with_state(control.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { addr, control }
    }

    pub(crate) fn ws_url(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    pub(crate) fn push_raw(&self, frame: &str) {
        let _ = self.control.send(PeerControl::Push(frame.to_string()));
    }

    pub(crate) fn switch_scene(&self, scene: &str) {
        let frame = serde_json::json!({
            "update-type": "SwitchScenes",
            "scene-name": scene,
            "sources": [],
        });
        self.push_raw(&frame.to_string());
    }

    /// Closes every open event socket; later connections are served normally.
    pub(crate) fn disconnect(&self) {
        let _ = self.control.send(PeerControl::Disconnect);
    }
}

async fn mixer_socket(
    ws: WebSocketUpgrade,
    State(control): State<broadcast::Sender<PeerControl>>,
) -> impl IntoResponse {
    let control = control.subscribe();
    ws.on_upgrade(move |socket| serve_peer(socket, control, None))
}

async fn serve_peer(
    mut socket: WebSocket,
    mut control: broadcast::Receiver<PeerControl>,
    received: Option<mpsc::UnboundedSender<String>>,
) {
    loop {
        tokio::select! {
            message = socket.recv() => match message {
                Some(Ok(Message::Text(text))) => {
                    if let Some(received) = &received {
                        let _ = received.send(text);
                    }
                }
                Some(Ok(_)) => {}
                _ => break,
            },
            command = control.recv() => match command {
                Ok(PeerControl::Push(frame)) => {
                    if socket.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Ok(PeerControl::Disconnect) | Err(_) => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }
}
