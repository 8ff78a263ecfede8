use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::PushError;

/// One established push channel. Server to client only.
#[async_trait::async_trait]
pub trait PushChannel: Send {
    /// Next text payload. `None` once the server has closed the channel.
    async fn next_frame(&mut self) -> Option<Result<String, PushError>>;

    async fn close(&mut self);
}

#[async_trait::async_trait]
pub trait PushConnector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn PushChannel>, PushError>;
}

#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait::async_trait]
impl PushConnector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn PushChannel>, PushError> {
        let (stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| PushError::Timeout)?
            .map_err(|err| PushError::Connect(err.to_string()))?;
        Ok(Box::new(WsChannel { stream }))
    }
}

struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait::async_trait]
impl PushChannel for WsChannel {
    async fn next_frame(&mut self) -> Option<Result<String, PushError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => {
                    return Some(Ok(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Ok(Message::Close(_)) => return None,
                // Ping/pong are answered by tungstenite itself.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
                Err(err) => return Some(Err(PushError::Transport(err.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}

/// Splits one transport payload into individual JSON documents.
///
/// Servers may batch several newline-delimited snapshots into one payload.
/// Anything that does not parse is passed through whole so the state machine
/// can discard it.
pub fn split_frames(text: &str) -> Vec<String> {
    let mut frames = Vec::new();
    let mut values = serde_json::Deserializer::from_str(text).into_iter::<serde_json::Value>();
    let mut start = 0;
    loop {
        match values.next() {
            Some(Ok(_)) => {
                let end = values.byte_offset();
                frames.push(text[start..end].trim().to_string());
                start = end;
            }
            Some(Err(_)) => {
                let rest = text[start..].trim();
                if !rest.is_empty() {
                    frames.push(rest.to_string());
                }
                break;
            }
            None => break,
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_document() {
        assert_eq!(split_frames("{\"a\":1}"), vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn newline_delimited_documents() {
        let frames = split_frames("{\"a\":1}\n{\"a\":2}\n");
        assert_eq!(frames, vec!["{\"a\":1}".to_string(), "{\"a\":2}".to_string()]);
    }

    #[test]
    fn garbage_is_passed_through() {
        let frames = split_frames("{\"a\":1}\nnot json");
        assert_eq!(frames, vec!["{\"a\":1}".to_string(), "not json".to_string()]);
    }

    #[test]
    fn blank_payload_yields_nothing() {
        assert!(split_frames("  \n").is_empty());
    }
}
