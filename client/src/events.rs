use crate::{Error, Result};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use paradrop_types::{Inbound, Outbound};
use std::time::Duration;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, trace, warn};
use url::Url;

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Open the realtime channel and split it into a writer and a decoded event stream.
pub async fn connect(
    url: &Url,
    dial_timeout: Duration,
) -> Result<(Sender<MaybeTlsStream<TcpStream>>, Stream)> {
    debug!(%url, "dialing realtime channel");
    let (ws, _) = tokio::time::timeout(dial_timeout, connect_async(url.as_str()))
        .await
        .map_err(|_| Error::DialTimeout)??;
    Ok(split(ws))
}

pub(crate) fn split<S>(ws: WebSocketStream<S>) -> (Sender<S>, Stream)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let (sink, read) = ws.split();
    (Sender { sink }, Stream::new(read))
}

/// Writing half of the realtime channel.
pub struct Sender<S> {
    sink: SplitSink<WebSocketStream<S>, Message>,
}

impl<S> Sender<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    pub async fn send(&mut self, outbound: &Outbound) -> Result<()> {
        let text = serde_json::to_string(outbound)?;
        trace!(event = outbound.kind(), len = text.len(), "sending websocket message");
        self.sink.send(Message::Text(text)).await?;
        Ok(())
    }

    pub async fn close(&mut self) -> Result<()> {
        self.sink.close().await?;
        Ok(())
    }
}

/// Stream of decoded events from the WebSocket connection.
///
/// Undecodable frames are yielded as [Error::Json] and the stream keeps going;
/// a close frame or transport error is yielded once and ends it.
pub struct Stream {
    receiver: mpsc::Receiver<Result<Inbound>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl Drop for Stream {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

impl Stream {
    fn spawn_reader<S>(
        mut read: SplitStream<WebSocketStream<S>>,
        tx: mpsc::Sender<Result<Inbound>>,
    ) -> tokio::task::JoinHandle<()>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                let payload = match msg {
                    Ok(Message::Text(text)) => text.into_bytes(),
                    Ok(Message::Binary(data)) => data,
                    Ok(Message::Close(_)) => {
                        debug!("WebSocket closed");
                        let _ = tx.send(Err(Error::ConnectionClosed)).await;
                        return;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        let _ = tx.send(Err(e.into())).await;
                        return;
                    }
                };
                trace!(len = payload.len(), "received websocket message");
                let event = serde_json::from_slice::<Inbound>(&payload).map_err(|e| {
                    warn!(len = payload.len(), error = %e, "failed to decode websocket message");
                    Error::from(e)
                });
                if tx.send(event).await.is_err() {
                    return; // Receiver dropped
                }
            }
            let _ = tx.send(Err(Error::ConnectionClosed)).await;
        })
    }

    pub(crate) fn new<S>(read: SplitStream<WebSocketStream<S>>) -> Self
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        let handle = Self::spawn_reader(read, tx);
        Self {
            receiver: rx,
            _handle: handle,
        }
    }

    /// Receive the next event from the stream
    pub async fn next(&mut self) -> Option<Result<Inbound>> {
        self.receiver.recv().await
    }
}
