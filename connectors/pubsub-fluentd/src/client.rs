//! Fluentd transport client.
//!
//! [`ForwardClient`] speaks the Message Mode of the Fluentd Forward protocol:
//! every record is sent as the MessagePack array `[tag, time, record]`.

use crate::descriptor::{FluentConfig, Network};
use async_trait::async_trait;
use pubsub_core::{PubsubError, PubsubResult};
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// A connection able to post tagged records to Fluentd
#[async_trait]
pub trait FluentClient: Send + Sync {
    /// Post one record under `tag`
    async fn post(&self, tag: &str, record: &HashMap<String, String>) -> PubsubResult<()>;

    /// Close the connection
    async fn close(&self) -> PubsubResult<()>;
}

enum Connection {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

/// Forward protocol client over TCP or UDP.
///
/// Connects on the first post. A failed write drops the connection and the
/// next post reconnects.
pub struct ForwardClient {
    config: FluentConfig,
    connection: Mutex<Option<Connection>>,
    closed: AtomicBool,
}

impl ForwardClient {
    pub fn new(config: FluentConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &FluentConfig {
        &self.config
    }

    /// Encode a Message Mode entry
    pub fn encode(tag: &str, time: i64, record: &HashMap<String, String>) -> PubsubResult<Vec<u8>> {
        rmp_serde::to_vec(&(tag, time, record))
            .map_err(|e| PubsubError::transport_with_source("Failed to encode record", e))
    }

    async fn resolve(address: &str) -> PubsubResult<SocketAddr> {
        let addr = tokio::net::lookup_host(address).await?.next();
        addr.ok_or_else(|| PubsubError::transport(format!("No address found for {}", address)))
    }

    /// Resolve and connect, both bounded by the connect timeout
    async fn connect(&self) -> PubsubResult<Connection> {
        let network = self.config.network;
        let address = self.config.address();

        let dial = async {
            let addr = Self::resolve(&address).await?;
            debug!(%network, %addr, "Connecting to Fluentd");
            let connection = Self::open(network, addr).await.map_err(|e| {
                PubsubError::transport_with_source(format!("Failed to connect to {}", addr), e)
            })?;
            info!(%network, %addr, "Connected to Fluentd");
            Ok::<_, PubsubError>(connection)
        };

        match timeout(self.config.timeout, dial).await {
            Ok(result) => result,
            Err(e) => Err(PubsubError::transport_with_source(
                format!("Timed out connecting to {}", address),
                e,
            )),
        }
    }

    async fn open(network: Network, addr: SocketAddr) -> std::io::Result<Connection> {
        match network {
            Network::Tcp => Ok(Connection::Tcp(TcpStream::connect(addr).await?)),
            Network::Udp => {
                let local = if addr.is_ipv6() {
                    SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
                } else {
                    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
                };
                let socket = UdpSocket::bind(local).await?;
                socket.connect(addr).await?;
                Ok(Connection::Udp(socket))
            }
        }
    }

    async fn write(connection: &mut Connection, payload: &[u8]) -> std::io::Result<()> {
        match connection {
            Connection::Tcp(stream) => stream.write_all(payload).await,
            Connection::Udp(socket) => socket.send(payload).await.map(|_| ()),
        }
    }
}

#[async_trait]
impl FluentClient for ForwardClient {
    async fn post(&self, tag: &str, record: &HashMap<String, String>) -> PubsubResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PubsubError::Closed);
        }

        let payload = Self::encode(tag, chrono::Utc::now().timestamp(), record)?;

        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(connection) = guard.as_mut() else {
            return Err(PubsubError::transport("Fluentd connection unavailable"));
        };

        let written = timeout(self.config.write_timeout, Self::write(connection, &payload)).await;
        match written {
            Ok(Ok(())) => {
                debug!(%tag, bytes = payload.len(), "Posted record to Fluentd");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(%tag, "Write to Fluentd failed, dropping connection: {}", e);
                *guard = None;
                Err(PubsubError::transport_with_source("Failed to post record", e))
            }
            Err(e) => {
                warn!(%tag, "Write to Fluentd timed out, dropping connection");
                *guard = None;
                Err(PubsubError::transport_with_source("Timed out posting record", e))
            }
        }
    }

    async fn close(&self) -> PubsubResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(PubsubError::Closed);
        }

        let connection = self.connection.lock().await.take();
        if let Some(Connection::Tcp(mut stream)) = connection {
            stream.shutdown().await?;
        }
        info!(address = %self.config.address(), "Closed Fluentd connection");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_encode_message_mode() {
        let mut record = HashMap::new();
        record.insert("message".to_string(), "hello".to_string());

        let bytes = ForwardClient::encode("app.web", 1_700_000_000, &record).unwrap();
        let (tag, time, decoded): (String, i64, HashMap<String, String>) =
            rmp_serde::from_slice(&bytes).unwrap();

        assert_eq!(tag, "app.web");
        assert_eq!(time, 1_700_000_000);
        assert_eq!(decoded, record);
        // fixarray of three elements
        assert_eq!(bytes[0], 0x93);
    }

    #[tokio::test]
    async fn test_connect_timeout_covers_resolution() {
        let mut config = FluentConfig::new(Network::Tcp, "localhost", 24224);
        config.timeout = Duration::ZERO;
        let client = ForwardClient::new(config);

        let err = client.post("tag", &HashMap::new()).await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("Timed out connecting to localhost:24224"));
    }

    #[tokio::test]
    async fn test_post_after_close_fails() {
        let client = ForwardClient::new(FluentConfig::default());
        client.close().await.unwrap();

        let err = client.post("tag", &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, PubsubError::Closed));
        assert!(matches!(client.close().await, Err(PubsubError::Closed)));
    }
}
