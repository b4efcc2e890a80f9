use embassy_net::{
    IpEndpoint, Stack,
    dns::DnsQueryType,
    udp::{PacketMetadata, UdpSocket},
};
use embassy_time::{Duration, Instant, with_timeout};
use heapless::{String, Vec};
use log::{debug, warn};
use meteoclock_core::net::sntp::{self, NTP_PORT, PACKET_LEN, ReplyError, TimeSyncClient};

const SERVER_SLOTS: usize = 2;
const HOST_BYTES: usize = 64;
const QUERY_TIMEOUT_MS: u64 = 2_000;
const SOCKET_BUFFER: usize = 128;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SntpError {
    Dns,
    Socket,
    Timeout,
    Reply(ReplyError),
}

/// SNTP client over embassy-net UDP.
///
/// Each poll before a reply sends one request, rotating through the
/// configured servers; after a reply the time advances from the local tick.
pub struct SntpClient<'a> {
    stack: Stack<'a>,
    servers: Vec<String<HOST_BYTES>, SERVER_SLOTS>,
    next_server: usize,
    synced: Option<(u64, Instant)>,
}

impl<'a> SntpClient<'a> {
    pub fn new(stack: Stack<'a>) -> Self {
        Self {
            stack,
            servers: Vec::new(),
            next_server: 0,
            synced: None,
        }
    }

    async fn query(&self, server: &str) -> Result<u64, SntpError> {
        let addresses = self
            .stack
            .dns_query(server, DnsQueryType::A)
            .await
            .map_err(|_| SntpError::Dns)?;
        let address = *addresses.first().ok_or(SntpError::Dns)?;

        let mut rx_meta = [PacketMetadata::EMPTY; 1];
        let mut rx_buffer = [0u8; SOCKET_BUFFER];
        let mut tx_meta = [PacketMetadata::EMPTY; 1];
        let mut tx_buffer = [0u8; SOCKET_BUFFER];
        let mut socket = UdpSocket::new(
            self.stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        socket.bind(0).map_err(|_| SntpError::Socket)?;

        socket
            .send_to(&sntp::build_request(), IpEndpoint::new(address, NTP_PORT))
            .await
            .map_err(|_| SntpError::Socket)?;

        let mut reply = [0u8; PACKET_LEN];
        let (len, _) = socket
            .recv_from(&mut reply)
            .await
            .map_err(|_| SntpError::Socket)?;
        sntp::parse_reply(&reply[..len]).map_err(SntpError::Reply)
    }
}

impl TimeSyncClient for SntpClient<'_> {
    async fn start(&mut self, servers: &[&str]) {
        self.servers.clear();
        for server in servers.iter().take(SERVER_SLOTS) {
            let mut host = String::new();
            if host.push_str(server).is_err() {
                warn!("ntp: server name too long host={}", server);
                continue;
            }
            let _ = self.servers.push(host);
        }
        self.next_server = 0;
        self.synced = None;
    }

    async fn unix_seconds(&mut self) -> u64 {
        if let Some((unix, at)) = self.synced {
            return unix + at.elapsed().as_secs();
        }
        if self.servers.is_empty() {
            return 0;
        }

        let index = self.next_server % self.servers.len();
        self.next_server = self.next_server.wrapping_add(1);
        let server = self.servers[index].clone();

        let outcome = with_timeout(
            Duration::from_millis(QUERY_TIMEOUT_MS),
            self.query(&server),
        )
        .await
        .unwrap_or(Err(SntpError::Timeout));

        match outcome {
            Ok(unix) => {
                debug!("ntp: reply from {} unix={}", server, unix);
                self.synced = Some((unix, Instant::now()));
                unix
            }
            Err(err) => {
                debug!("ntp: query to {} failed err={:?}", server, err);
                0
            }
        }
    }
}
