use std::io;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::net::UdpSocket;

/// Cadence of the generated traffic.
const SEND_INTERVAL: Duration = Duration::from_millis(500);

/// Sends a small stream of example metrics to the local listener.
///
/// An easy way to exercise a freshly configured instance without a real submitter: a counter,
/// a timer, a gauge and a set key under the `local.` prefix.
pub async fn run(port: u16) {
    if let Err(error) = send_loop(port).await {
        tally_log::error!("sample sender failed: {error}");
    }
}

async fn send_loop(port: u16) -> io::Result<()> {
    let socket = UdpSocket::bind(("127.0.0.1", 0)).await?;
    socket.connect(("127.0.0.1", port)).await?;
    tally_log::info!("sample sender started");

    let mut rng = SmallRng::from_os_rng();

    loop {
        send(&socket, "local.hits:1|c").await;
        send(&socket, &format!("local.random:{}|ms", rng.random_range(0..1000))).await;
        send(&socket, &format!("local.cpu:{}|g", rng.random_range(0..100))).await;
        send(&socket, &format!("local.users:user{}|s", rng.random_range(0..32))).await;

        tokio::time::sleep(SEND_INTERVAL).await;
    }
}

async fn send(socket: &UdpSocket, line: &str) {
    if let Err(error) = socket.send(line.as_bytes()).await {
        tally_log::warn!("failed to send sample metric: {error}");
    }
}
