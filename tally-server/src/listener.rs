use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;

use tally_metrics::Collector;

/// Largest payload accepted in a single datagram.
///
/// Submitters typically stay well below typical MTUs, but jumbo frames and loopback traffic
/// can legitimately carry more.
const MAX_DATAGRAM: usize = 65_536;

/// The UDP front of the collector.
///
/// Receives datagrams and forwards each payload to [`Collector::handle`]. All protocol
/// handling, including malformed input, happens inside the collector; the listener's only
/// failure mode is the socket itself, which is logged and retried.
pub struct UdpListener {
    socket: UdpSocket,
    collector: Arc<Collector>,
}

impl UdpListener {
    /// Binds the listener to the given address.
    pub async fn bind<A>(addr: A, collector: Arc<Collector>) -> io::Result<Self>
    where
        A: tokio::net::ToSocketAddrs,
    {
        let socket = UdpSocket::bind(addr).await?;
        tally_log::info!("udp listener started on {}", socket.local_addr()?);

        Ok(Self { socket, collector })
    }

    /// Returns the bound local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serves the listener forever.
    pub async fn run(self) {
        let mut buf = vec![0; MAX_DATAGRAM];

        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((len, _)) => self.collector.handle(&buf[..len]),
                Err(error) => tally_log::warn!("failed to receive packet: {error}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tally_metrics::CollectorConfig;

    use super::*;

    #[tokio::test]
    async fn test_listener_feeds_collector() {
        let collector = Arc::new(Collector::new(CollectorConfig::default()));
        let listener = UdpListener::bind(("127.0.0.1", 0), Arc::clone(&collector))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(listener.run());

        let socket = UdpSocket::bind(("127.0.0.1", 0)).await.unwrap();
        socket.connect(addr).await.unwrap();

        let mut total = 0;
        for _ in 0..50 {
            socket.send(b"endpoint.hits:1|c").await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;

            total += collector
                .flush()
                .counters
                .get("endpoint.hits")
                .copied()
                .unwrap_or(0);
            if total >= 1 {
                break;
            }
        }

        assert!(total >= 1, "listener did not deliver any packet");
    }
}
