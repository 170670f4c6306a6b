use std::time::Duration;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;
use crate::core::{CloudError, Result};
use crate::progress::StageSample;
use super::packet::{decode_payload, EnginePacket, Handshake, SocketPacket};

/// Event name the backend uses for processing stages
pub const UPLOAD_PROGRESS_EVENT: &str = "uploadProgress";

/// Extra time on top of the server's ping interval before a poll is abandoned
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Socket.IO connection over Engine.IO long-polling
#[derive(Debug, Clone)]
pub struct PushChannel {
    client: Client,
    endpoint: Url,
    engine_sid: String,
    socket_id: String,
}

impl PushChannel {
    /// Opens the engine session and joins the main namespace.
    pub async fn connect(base_url: &str) -> Result<Self> {
        let endpoint = Url::parse(base_url)?.join("/socket.io/")?;

        let bootstrap = Client::builder().timeout(POLL_GRACE).build()?;
        let handshake = Self::handshake(&bootstrap, &endpoint).await?;
        debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "engine session opened");

        // a poll may legitimately be held for a full ping interval
        let poll_timeout = Duration::from_millis(handshake.ping_interval + handshake.ping_timeout) + POLL_GRACE;
        let client = Client::builder().timeout(poll_timeout).build()?;

        let mut channel = Self {
            client,
            endpoint,
            engine_sid: handshake.sid,
            socket_id: String::new(),
        };

        channel.send(&[SocketPacket::Connect { sid: None }.into_engine()]).await?;
        channel.socket_id = channel.await_namespace().await?;
        info!(socket_id = %channel.socket_id, "push channel connected");

        Ok(channel)
    }

    /// Id the backend uses to route `uploadProgress` events to this client.
    pub fn socket_id(&self) -> &str {
        &self.socket_id
    }

    fn session_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("EIO", "4")
            .append_pair("transport", "polling")
            .append_pair("t", &Uuid::new_v4().simple().to_string())
            .append_pair("sid", &self.engine_sid);
        url
    }

    async fn handshake(client: &Client, endpoint: &Url) -> Result<Handshake> {
        let mut url = endpoint.clone();
        url.query_pairs_mut()
            .append_pair("EIO", "4")
            .append_pair("transport", "polling")
            .append_pair("t", &Uuid::new_v4().simple().to_string());

        let body = client.get(url).send().await?.error_for_status()?.text().await?;
        match decode_payload(&body)?.into_iter().next() {
            Some(EnginePacket::Open(handshake)) => Ok(handshake),
            other => Err(CloudError::push(format!("expected open packet, got {other:?}"))),
        }
    }

    async fn send(&self, packets: &[EnginePacket]) -> Result<()> {
        let body = super::packet::encode_payload(packets);
        self.client
            .post(self.session_url())
            .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn poll(&self) -> Result<Vec<EnginePacket>> {
        let body = self
            .client
            .get(self.session_url())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        decode_payload(&body)
    }

    async fn await_namespace(&self) -> Result<String> {
        loop {
            for packet in self.poll().await? {
                match packet {
                    EnginePacket::Ping(data) => self.send(&[EnginePacket::Pong(data)]).await?,
                    EnginePacket::Close => return Err(CloudError::push("closed before namespace connect")),
                    EnginePacket::Message(data) => match SocketPacket::decode(&data)? {
                        SocketPacket::Connect { sid: Some(sid) } => return Ok(sid),
                        SocketPacket::Connect { sid: None } => {
                            return Err(CloudError::push("namespace connect without sid"));
                        }
                        SocketPacket::ConnectError(message) => return Err(CloudError::push(message)),
                        other => debug!(?other, "ignored before namespace connect"),
                    },
                    _ => {}
                }
            }
        }
    }

    /// Starts the poll loop. Samples arrive on the returned receiver until the
    /// server closes the session or `cancel` fires.
    pub fn subscribe(self, cancel: CancellationToken) -> (mpsc::UnboundedReceiver<StageSample>, JoinHandle<Result<()>>) {
        let (sample_tx, sample_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            let result = loop {
                let packets = tokio::select! {
                    _ = cancel.cancelled() => break Ok(()),
                    packets = self.poll() => packets,
                };

                match packets {
                    Ok(packets) => match self.dispatch(packets, &sample_tx).await {
                        Ok(true) => continue,
                        Ok(false) => break Ok(()),
                        Err(err) => break Err(err),
                    },
                    Err(err) => break Err(err),
                }
            };

            if cancel.is_cancelled() {
                if let Err(err) = self.send(&[SocketPacket::Disconnect.into_engine(), EnginePacket::Close]).await {
                    debug!(%err, "close packet not delivered");
                }
            }
            info!(socket_id = %self.socket_id, "push channel closed");

            result
        });

        (sample_rx, handle)
    }

    /// `Ok(false)` once the session is over.
    async fn dispatch(&self, packets: Vec<EnginePacket>, sample_tx: &mpsc::UnboundedSender<StageSample>) -> Result<bool> {
        for packet in packets {
            match packet {
                EnginePacket::Ping(data) => self.send(&[EnginePacket::Pong(data)]).await?,
                EnginePacket::Close => return Ok(false),
                EnginePacket::Message(data) => match SocketPacket::decode(&data) {
                    Ok(SocketPacket::Event { name, args }) if name == UPLOAD_PROGRESS_EVENT => {
                        if let Some(sample) = parse_sample(args) {
                            if sample_tx.send(sample).is_err() {
                                // nobody is listening anymore
                                return Ok(false);
                            }
                        }
                    }
                    Ok(SocketPacket::Disconnect) => return Ok(false),
                    Ok(other) => debug!(?other, "ignored socket packet"),
                    Err(err) => warn!(%err, "undecodable socket packet"),
                },
                _ => {}
            }
        }

        Ok(true)
    }
}

fn parse_sample(mut args: Vec<Value>) -> Option<StageSample> {
    if args.is_empty() {
        warn!("uploadProgress without payload");
        return None;
    }

    match serde_json::from_value::<StageSample>(args.remove(0)) {
        Ok(sample) => Some(sample),
        Err(err) => {
            warn!(%err, "skipping uploadProgress payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::progress::Stage;

    #[test]
    fn test_parse_sample() {
        let sample = parse_sample(vec![json!({ "stage": "compressing_video", "percent": 33 })]).unwrap();
        assert_eq!(sample, StageSample::new(Stage::CompressingVideo, 33.0));

        assert!(parse_sample(vec![]).is_none());
        assert!(parse_sample(vec![json!({ "stage": "teleporting", "percent": 1 })]).is_none());
        assert!(parse_sample(vec![json!({ "stage": "processing" })]).is_none());
    }
}
