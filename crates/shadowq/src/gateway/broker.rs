use anyhow::{Context, anyhow};
use bytes::Bytes;
use futures::future::{LocalBoxFuture, ready};
use futures::stream::LocalBoxStream;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::length_delimited::Builder;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Stream of message bodies delivered to a subscription.
pub type Subscription = LocalBoxStream<'static, anyhow::Result<Bytes>>;

/// Topic based publish/subscribe transport used to talk to the resource manager.
pub trait Broker {
    /// Publishes a single message body to `topic`.
    fn publish<'a>(&'a self, topic: &'a str, body: Bytes)
    -> LocalBoxFuture<'a, anyhow::Result<()>>;

    /// Opens a subscription, the returned stream ends when the connection is lost.
    fn subscribe<'a>(&'a self, topic: &'a str) -> LocalBoxFuture<'a, anyhow::Result<Subscription>>;
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum BrokerRequest {
    Subscribe { topic: String },
    Publish { topic: String, body: String },
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct BrokerDelivery {
    pub topic: String,
    pub body: String,
}

pub fn make_protocol_builder() -> Builder {
    *LengthDelimitedCodec::builder()
        .little_endian()
        .max_frame_length(MAX_FRAME_SIZE)
}

type Connection = Framed<TcpStream, LengthDelimitedCodec>;

/// Broker reached over TCP: length delimited frames carrying JSON envelopes.
///
/// Publishing goes through a single lazily opened connection that is dropped after a failure
/// and reopened by the next publish. Every subscription uses its own connection.
pub struct TcpBroker {
    address: String,
    publisher: Mutex<Option<Connection>>,
}

impl TcpBroker {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            publisher: Mutex::new(None),
        }
    }

    async fn connect(&self) -> anyhow::Result<Connection> {
        let stream = TcpStream::connect(&self.address)
            .await
            .with_context(|| format!("Cannot connect to broker at {}", self.address))?;
        stream.set_nodelay(true)?;
        log::debug!("Connected to broker at {}", self.address);
        Ok(make_protocol_builder().new_framed(stream))
    }
}

fn encode_request(request: &BrokerRequest) -> anyhow::Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(request)?))
}

impl Broker for TcpBroker {
    fn publish<'a>(
        &'a self,
        topic: &'a str,
        body: Bytes,
    ) -> LocalBoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let frame = encode_request(&BrokerRequest::Publish {
                topic: topic.to_string(),
                body: String::from_utf8(body.to_vec()).context("Message body is not UTF-8")?,
            })?;

            let mut publisher = self.publisher.lock().await;
            if publisher.is_none() {
                *publisher = Some(self.connect().await?);
            }
            let result = match publisher.as_mut() {
                Some(connection) => connection.send(frame).await.map_err(anyhow::Error::from),
                None => Err(anyhow!("Broker connection is not open")),
            };
            if result.is_err() {
                *publisher = None;
            }
            result
        })
    }

    fn subscribe<'a>(&'a self, topic: &'a str) -> LocalBoxFuture<'a, anyhow::Result<Subscription>> {
        Box::pin(async move {
            let mut connection = self.connect().await?;
            connection
                .send(encode_request(&BrokerRequest::Subscribe {
                    topic: topic.to_string(),
                })?)
                .await?;
            log::debug!("Subscribed to topic {topic}");

            let topic = topic.to_string();
            let stream = connection
                .map(move |frame| -> anyhow::Result<Option<Bytes>> {
                    let delivery: BrokerDelivery = serde_json::from_slice(&frame?)
                        .context("Malformed broker delivery")?;
                    Ok((delivery.topic == topic).then(|| Bytes::from(delivery.body)))
                })
                .filter_map(|delivery| ready(delivery.transpose()));
            Ok(stream.boxed_local())
        })
    }
}
