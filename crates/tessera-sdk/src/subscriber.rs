//! Push subscriptions over WebSocket

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use crate::config::ClientConfig;
use crate::transport::{JsonRpcRequest, JsonRpcResponse};
use crate::SdkError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SUBSCRIBE_ID: i64 = 0;
const UNSUBSCRIBE_ID: i64 = 1;

struct Active {
    query: String,
    sink: SplitSink<WsStream, Message>,
    stop_tx: watch::Sender<bool>,
    running: Arc<AtomicBool>,
}

/// Resolves when a subscription's receive loop ends.
///
/// `Ok` after [`Subscriber::stop`] or a clean close by the node, `Err` when
/// the connection failed underneath a running subscription.
#[derive(Debug)]
pub struct Completion {
    handle: JoinHandle<Result<(), SdkError>>,
}

impl Completion {
    /// Wait for the receive loop to finish
    pub async fn wait(self) -> Result<(), SdkError> {
        self.handle
            .await
            .map_err(|e| SdkError::State(format!("receive loop aborted: {}", e)))?
    }

    /// Whether the receive loop has already finished
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Event subscriber.
///
/// One subscriber holds at most one subscription. Each subscription owns its
/// stop signal and its [`Completion`], so independent subscribers never
/// share teardown state.
pub struct Subscriber {
    url: String,
    connect_timeout: Option<Duration>,
    active: Mutex<Option<Active>>,
    // flag of the latest subscription; a finished loop only clears its own
    running: parking_lot::Mutex<Arc<AtomicBool>>,
}

impl Subscriber {
    /// Subscriber for a `ws://` or `wss://` endpoint
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: None,
            active: Mutex::new(None),
            running: parking_lot::Mutex::new(Arc::new(AtomicBool::new(false))),
        }
    }

    /// Subscriber for the configured WebSocket endpoint and connect timeout
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            ..Self::new(config.ws_url.clone())
        }
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether a receive loop is live
    pub fn is_running(&self) -> bool {
        self.running.lock().load(Ordering::SeqCst)
    }

    /// Subscribe to `query` and call `callback` with the `result` of every
    /// event until stopped.
    pub async fn start<F>(&self, query: &str, callback: F) -> Result<Completion, SdkError>
    where
        F: FnMut(Value) + Send + 'static,
    {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(SdkError::State("subscriber already started".to_string()));
        }

        let ws = self.connect().await?;
        let (mut sink, mut stream) = ws.split();

        let request = JsonRpcRequest::new(SUBSCRIBE_ID, "subscribe", vec![Value::from(query)]);
        send_json(&mut sink, &request).await?;

        // the first frame acknowledges the subscription
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                serde_json::from_str::<JsonRpcResponse>(text.as_str())?.into_result()?;
            }
            Some(Ok(other)) => {
                return Err(SdkError::Protocol(format!("unexpected subscribe ack: {:?}", other)))
            }
            Some(Err(e)) => return Err(SdkError::Transport(e.to_string())),
            None => return Err(SdkError::Transport("connection closed before ack".to_string())),
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let running = Arc::new(AtomicBool::new(true));
        *self.running.lock() = running.clone();
        let handle = tokio::spawn(receive_loop(stream, stop_rx, callback, running.clone()));

        info!(url = %self.url, query, "Subscribed");
        *active = Some(Active {
            query: query.to_string(),
            sink,
            stop_tx,
            running,
        });
        Ok(Completion { handle })
    }

    async fn connect(&self) -> Result<WsStream, SdkError> {
        let connecting = connect_async(self.url.as_str());
        let result = match self.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connecting)
                .await
                .map_err(|_| SdkError::Transport(format!("connect to {} timed out", self.url)))?,
            None => connecting.await,
        };
        let (ws, _response) = result.map_err(|e| SdkError::Transport(e.to_string()))?;
        Ok(ws)
    }

    /// Unsubscribe and close. Stopping a stopped subscriber does nothing.
    pub async fn stop(&self) -> Result<(), SdkError> {
        let Some(mut active) = self.active.lock().await.take() else {
            return Ok(());
        };
        let was_running = active.running.swap(false, Ordering::SeqCst);

        // raise the signal first so teardown errors on the read side are not reported
        let _ = active.stop_tx.send(true);

        let request =
            JsonRpcRequest::new(UNSUBSCRIBE_ID, "unsubscribe", vec![Value::from(active.query.clone())]);
        let sent = send_json(&mut active.sink, &request).await;
        if let Err(e) = active.sink.close().await {
            debug!(error = %e, "Close after unsubscribe failed");
        }
        info!(url = %self.url, query = %active.query, "Unsubscribed");

        match sent {
            Err(e) if was_running => Err(e),
            Err(e) => {
                debug!(error = %e, "Unsubscribe on a finished subscription");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("url", &self.url)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

async fn send_json(
    sink: &mut SplitSink<WsStream, Message>,
    request: &JsonRpcRequest,
) -> Result<(), SdkError> {
    let text = serde_json::to_string(request)?;
    sink.send(Message::Text(text.into()))
        .await
        .map_err(|e| SdkError::Transport(e.to_string()))
}

async fn receive_loop<F>(
    mut stream: SplitStream<WsStream>,
    mut stop_rx: watch::Receiver<bool>,
    mut callback: F,
    running: Arc<AtomicBool>,
) -> Result<(), SdkError>
where
    F: FnMut(Value) + Send + 'static,
{
    let result = loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break Ok(()),
            frame = stream.next() => {
                let stopped = *stop_rx.borrow();
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if stopped {
                            break Ok(());
                        }
                        let response: JsonRpcResponse = match serde_json::from_str(text.as_str()) {
                            Ok(r) => r,
                            Err(e) => {
                                error!(error = %e, "Undecodable event frame");
                                break Err(SdkError::Decode(e.to_string()));
                            }
                        };
                        match response.into_result() {
                            Ok(event) if is_empty_event(&event) => trace!("Empty event skipped"),
                            Ok(event) => callback(event),
                            Err(e) => {
                                error!(error = %e, "Subscription error from node");
                                break Err(e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        if !stopped {
                            warn!("Subscription closed by peer");
                        }
                        break Ok(());
                    }
                    Some(Ok(other)) => trace!(frame = ?other, "Non-text frame ignored"),
                    Some(Err(e)) if stopped => {
                        trace!(error = %e, "Read error during stop");
                        break Ok(());
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "Subscription read failed");
                        break Err(SdkError::Transport(e.to_string()));
                    }
                }
            }
        }
    };
    running.store(false, Ordering::SeqCst);
    result
}

/// Acknowledgements and keep-alives carry `{}` or nothing
fn is_empty_event(event: &Value) -> bool {
    match event {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
