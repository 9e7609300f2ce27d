//! [`GatewayClient`] -- the Discord Gateway WebSocket connection.
//!
//! Connects, identifies (or resumes), heartbeats, and hands every
//! INTERACTION_CREATE to [`App::handle_interaction`](crate::flow::App::handle_interaction)
//! on its own task. Runs until the [`CancellationToken`] fires.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::PlatformError;
use crate::flow::App;

use super::events::{
    ConnectionProperties, GatewayPayload, HelloData, IdentifyPayload, Interaction, OP_DISPATCH,
    OP_HEARTBEAT, OP_HEARTBEAT_ACK, OP_HELLO, OP_IDENTIFY, OP_INVALID_SESSION, OP_RECONNECT,
    OP_RESUME, ReadyEvent, ResumePayload,
};

/// Delay before reconnecting after a dropped connection.
const RECONNECT_DELAY_SECS: u64 = 5;

/// Heartbeat interval to fall back on when Hello never arrives.
const FALLBACK_HEARTBEAT_MS: u64 = 41_250;

/// Why a single Gateway session ended.
enum SessionOutcome {
    /// The cancellation token fired; stop for good.
    Shutdown,
    /// The connection dropped or the server asked us to reconnect.
    Reconnect,
}

/// The Gateway connection loop.
///
/// Holds the resume state (session id, resume URL, last sequence) across
/// reconnects within one process lifetime.
pub struct GatewayClient {
    app: Arc<App>,
    /// Last sequence number seen, echoed in heartbeats and Resume.
    sequence: AtomicU64,
    /// Session ID from READY, enables Resume.
    session_id: RwLock<Option<String>>,
    /// Resume gateway URL from READY.
    resume_url: RwLock<Option<String>>,
    /// Whether `/embed` has been registered this process.
    registered: AtomicBool,
}

/// A heartbeat payload carrying the last seen sequence (or null before
/// the first dispatch).
fn heartbeat_payload(seq: u64) -> GatewayPayload {
    GatewayPayload {
        op: OP_HEARTBEAT,
        d: (seq > 0).then(|| serde_json::json!(seq)),
        s: None,
        t: None,
    }
}

impl GatewayClient {
    /// Create a client over the shared application context.
    pub fn new(app: Arc<App>) -> Self {
        Self {
            app,
            sequence: AtomicU64::new(0),
            session_id: RwLock::new(None),
            resume_url: RwLock::new(None),
            registered: AtomicBool::new(false),
        }
    }

    /// The URL for the next connection attempt: the resume URL from the
    /// last READY when there is one, the configured URL otherwise.
    async fn connect_url(&self) -> String {
        self.resume_url
            .read()
            .await
            .clone()
            .unwrap_or_else(|| self.app.config().gateway_url.clone())
    }

    /// Run until cancelled, reconnecting after failures.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), PlatformError> {
        info!("gateway starting");

        loop {
            match self.run_session(&cancel).await {
                Ok(SessionOutcome::Shutdown) => break,
                Ok(SessionOutcome::Reconnect) => {}
                Err(e) => warn!(error = %e, "gateway session failed"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(std::time::Duration::from_secs(RECONNECT_DELAY_SECS)) => {
                    info!("reconnecting to the gateway");
                }
            }
        }

        info!("gateway stopped");
        Ok(())
    }

    /// One connection: hello, identify/resume, then the event loop.
    async fn run_session(&self, cancel: &CancellationToken) -> Result<SessionOutcome, PlatformError> {
        let url = self.connect_url().await;
        debug!(%url, "connecting to gateway");

        let (stream, _) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| PlatformError::ConnectionFailed(e.to_string()))?;
        info!("gateway connected");

        let (mut ws_write, mut ws_read) = stream.split();

        // Wait for Hello (opcode 10) to learn the heartbeat interval.
        let heartbeat_interval = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = ws_write.close().await;
                    return Ok(SessionOutcome::Shutdown);
                }
                msg = ws_read.next() => match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        if let Ok(payload) = serde_json::from_str::<GatewayPayload>(&text)
                            && payload.op == OP_HELLO
                            && let Some(d) = payload.d
                            && let Ok(hello) = serde_json::from_value::<HelloData>(d)
                        {
                            break hello.heartbeat_interval;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket error before hello");
                        break FALLBACK_HEARTBEAT_MS;
                    }
                    None => break FALLBACK_HEARTBEAT_MS,
                    _ => {}
                }
            }
        };
        debug!(interval_ms = heartbeat_interval, "hello received");

        // Resume when a previous READY left us a session, identify fresh
        // otherwise.
        let token = self.app.config().token.expose().to_owned();
        let auth = {
            let session_guard = self.session_id.read().await;
            if let Some(ref sid) = *session_guard {
                let seq = self.sequence.load(Ordering::SeqCst);
                info!(session_id = %sid, seq, "resuming gateway session");
                GatewayPayload {
                    op: OP_RESUME,
                    d: Some(
                        serde_json::to_value(ResumePayload {
                            token,
                            session_id: sid.clone(),
                            seq,
                        })
                        .unwrap_or_default(),
                    ),
                    s: None,
                    t: None,
                }
            } else {
                debug!("identifying as a new session");
                GatewayPayload {
                    op: OP_IDENTIFY,
                    d: Some(
                        serde_json::to_value(IdentifyPayload {
                            token,
                            intents: self.app.config().intents,
                            properties: ConnectionProperties {
                                os: std::env::consts::OS.to_owned(),
                                browser: "embedsmith".into(),
                                device: "embedsmith".into(),
                            },
                        })
                        .unwrap_or_default(),
                    ),
                    s: None,
                    t: None,
                }
            }
        };

        let json =
            serde_json::to_string(&auth).map_err(|e| PlatformError::RequestFailed(e.to_string()))?;
        ws_write
            .send(WsMessage::Text(json))
            .await
            .map_err(|e| PlatformError::ConnectionFailed(e.to_string()))?;

        let mut heartbeat =
            tokio::time::interval(std::time::Duration::from_millis(heartbeat_interval));
        // The first tick fires immediately; skip it and wait a full
        // interval.
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("gateway received shutdown");
                    let _ = ws_write.close().await;
                    return Ok(SessionOutcome::Shutdown);
                }
                _ = heartbeat.tick() => {
                    let seq = self.sequence.load(Ordering::SeqCst);
                    if let Ok(json) = serde_json::to_string(&heartbeat_payload(seq)) {
                        if let Err(e) = ws_write.send(WsMessage::Text(json)).await {
                            warn!(error = %e, "failed to send heartbeat");
                            return Ok(SessionOutcome::Reconnect);
                        }
                        debug!(seq, "heartbeat sent");
                    }
                }
                msg = ws_read.next() => match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<GatewayPayload>(&text) {
                            Ok(payload) => {
                                if let Some(s) = payload.s {
                                    self.sequence.store(s, Ordering::SeqCst);
                                }
                                match payload.op {
                                    OP_DISPATCH => self.handle_dispatch(payload).await,
                                    OP_HEARTBEAT_ACK => debug!("heartbeat acknowledged"),
                                    OP_HEARTBEAT => {
                                        // Server wants an immediate heartbeat.
                                        let seq = self.sequence.load(Ordering::SeqCst);
                                        if let Ok(json) =
                                            serde_json::to_string(&heartbeat_payload(seq))
                                        {
                                            let _ = ws_write.send(WsMessage::Text(json)).await;
                                        }
                                    }
                                    OP_RECONNECT => {
                                        info!("server requested reconnect");
                                        return Ok(SessionOutcome::Reconnect);
                                    }
                                    OP_INVALID_SESSION => {
                                        let resumable = payload
                                            .d
                                            .as_ref()
                                            .and_then(Value::as_bool)
                                            .unwrap_or(false);
                                        if resumable {
                                            warn!("invalid session (resumable), reconnecting");
                                        } else {
                                            warn!("invalid session, starting over with identify");
                                            *self.session_id.write().await = None;
                                            *self.resume_url.write().await = None;
                                            self.sequence.store(0, Ordering::SeqCst);
                                        }
                                        return Ok(SessionOutcome::Reconnect);
                                    }
                                    op => debug!(op, "unhandled opcode"),
                                }
                            }
                            Err(e) => warn!(error = %e, "failed to parse gateway payload"),
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) => {
                        info!("gateway closed by server");
                        return Ok(SessionOutcome::Reconnect);
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        let _ = ws_write.send(WsMessage::Pong(data)).await;
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "gateway websocket error");
                        return Ok(SessionOutcome::Reconnect);
                    }
                    None => {
                        info!("gateway stream ended");
                        return Ok(SessionOutcome::Reconnect);
                    }
                    _ => {} // Binary, Pong, Frame -- ignore
                }
            }
        }
    }

    /// Route a Dispatch (opcode 0) payload by event name.
    async fn handle_dispatch(&self, payload: GatewayPayload) {
        let Some(event) = payload.t.as_deref() else {
            return;
        };
        match event {
            "READY" => {
                if let Some(d) = payload.d
                    && let Ok(ready) = serde_json::from_value::<ReadyEvent>(d)
                {
                    info!(
                        bot_id = %ready.user.id,
                        bot_name = %ready.user.username,
                        "gateway authenticated"
                    );
                    *self.session_id.write().await = Some(ready.session_id);
                    *self.resume_url.write().await = ready.resume_gateway_url;

                    // Register /embed once per process, with the
                    // application id READY hands us.
                    if let Some(application) = ready.application
                        && !self.registered.swap(true, Ordering::SeqCst)
                    {
                        let app = self.app.clone();
                        tokio::spawn(async move {
                            match app.register_commands(&application.id).await {
                                Ok(()) => {
                                    info!(application_id = %application.id, "registered /embed")
                                }
                                Err(e) => error!(error = %e, "command registration failed"),
                            }
                        });
                    }
                }
            }
            "RESUMED" => info!("gateway session resumed"),
            "INTERACTION_CREATE" => {
                if let Some(d) = payload.d {
                    match serde_json::from_value::<Interaction>(d) {
                        Ok(interaction) => {
                            // One task per invocation; handlers share only
                            // the App context.
                            let app = self.app.clone();
                            tokio::spawn(async move {
                                app.handle_interaction(interaction).await;
                            });
                        }
                        Err(e) => warn!(error = %e, "failed to parse INTERACTION_CREATE"),
                    }
                }
            }
            other => debug!(event = other, "unhandled dispatch event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DiscordApi;
    use crate::config::Config;

    struct NoopApi;

    #[async_trait::async_trait]
    impl DiscordApi for NoopApi {
        async fn interaction_response(
            &self,
            _interaction_id: &str,
            _interaction_token: &str,
            _response: Value,
        ) -> Result<(), PlatformError> {
            Ok(())
        }

        async fn create_message(
            &self,
            _channel_id: &str,
            _payload: Value,
        ) -> Result<String, PlatformError> {
            Ok("noop".into())
        }

        async fn register_commands(
            &self,
            _application_id: &str,
            _guild_id: Option<&str>,
            _commands: Value,
        ) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    fn client() -> GatewayClient {
        let config = Config::from_json(r#"{"token": "t"}"#).unwrap();
        GatewayClient::new(Arc::new(App::new(config, Arc::new(NoopApi))))
    }

    #[tokio::test]
    async fn connect_url_defaults_to_config() {
        let client = client();
        assert_eq!(
            client.connect_url().await,
            "wss://gateway.discord.gg/?v=10&encoding=json"
        );
    }

    #[tokio::test]
    async fn connect_url_prefers_resume_url() {
        let client = client();
        *client.resume_url.write().await = Some("wss://resume.example".into());
        assert_eq!(client.connect_url().await, "wss://resume.example");
    }

    #[test]
    fn heartbeat_payload_echoes_sequence() {
        let hb = heartbeat_payload(42);
        assert_eq!(hb.op, OP_HEARTBEAT);
        assert_eq!(hb.d, Some(serde_json::json!(42)));
    }

    #[test]
    fn heartbeat_payload_null_before_first_dispatch() {
        let hb = heartbeat_payload(0);
        assert_eq!(hb.op, OP_HEARTBEAT);
        assert!(hb.d.is_none());
    }

    #[tokio::test]
    async fn ready_dispatch_stores_resume_state() {
        let client = client();
        let payload = GatewayPayload {
            op: OP_DISPATCH,
            d: Some(serde_json::json!({
                "v": 10,
                "user": {"id": "bot-1", "username": "embedsmith", "bot": true},
                "session_id": "sess-abc",
                "resume_gateway_url": "wss://resume.example"
            })),
            s: Some(1),
            t: Some("READY".into()),
        };

        client.handle_dispatch(payload).await;

        assert_eq!(
            client.session_id.read().await.as_deref(),
            Some("sess-abc")
        );
        assert_eq!(client.connect_url().await, "wss://resume.example");
    }
}
