//! SNTPv4 client packets and the bounded wait for a plausible network time.

use log::debug;

use crate::clock::Monotonic;

pub const NTP_PORT: u16 = 123;
pub const PACKET_LEN: usize = 48;
/// Seconds between 1900-01-01 and 1970-01-01.
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;
/// Network time at or below this is treated as "not synced yet".
pub const SYNC_SENTINEL_SECS: u64 = 2 * 24 * 3_600;

// LI = 0, VN = 4, Mode = 3 (client).
const REQUEST_HEADER: u8 = 0x23;
const MODE_MASK: u8 = 0x07;
const MODE_SERVER: u8 = 4;
const MODE_BROADCAST: u8 = 5;
const STRATUM_UNSYNCHRONIZED: u8 = 16;
const TRANSMIT_OFFSET: usize = 40;
const ERA_SECONDS: u64 = 1 << 32;
// Era-0 values below the Unix epoch are read as era 1 (after 2036-02-07).
const ERA_PIVOT: u64 = NTP_UNIX_OFFSET;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReplyError {
    TooShort,
    NotServerMode,
    BadStratum,
    ZeroTransmit,
}

pub fn build_request() -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = REQUEST_HEADER;
    packet
}

/// Validates a server reply and returns its transmit time as Unix seconds.
pub fn parse_reply(packet: &[u8]) -> Result<u64, ReplyError> {
    if packet.len() < PACKET_LEN {
        return Err(ReplyError::TooShort);
    }

    let mode = packet[0] & MODE_MASK;
    if mode != MODE_SERVER && mode != MODE_BROADCAST {
        return Err(ReplyError::NotServerMode);
    }

    let stratum = packet[1];
    if stratum == 0 || stratum >= STRATUM_UNSYNCHRONIZED {
        return Err(ReplyError::BadStratum);
    }

    let seconds = u32::from_be_bytes([
        packet[TRANSMIT_OFFSET],
        packet[TRANSMIT_OFFSET + 1],
        packet[TRANSMIT_OFFSET + 2],
        packet[TRANSMIT_OFFSET + 3],
    ]) as u64;
    if seconds == 0 {
        return Err(ReplyError::ZeroTransmit);
    }

    Ok(ntp_to_unix(seconds))
}

fn ntp_to_unix(seconds: u64) -> u64 {
    if seconds >= ERA_PIVOT {
        seconds - NTP_UNIX_OFFSET
    } else {
        seconds + ERA_SECONDS - NTP_UNIX_OFFSET
    }
}

/// Background time-sync exchange.
///
/// `unix_seconds` reports whatever time the client currently believes; until
/// a reply lands this stays at or below [`SYNC_SENTINEL_SECS`].
#[allow(async_fn_in_trait)]
pub trait TimeSyncClient {
    async fn start(&mut self, servers: &[&str]);
    async fn unix_seconds(&mut self) -> u64;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimeSyncError {
    Timeout,
}

/// Starts the exchange and polls until the time clears the sentinel.
pub async fn acquire<T, M>(
    client: &mut T,
    ticker: &M,
    servers: &[&str],
    max_wait_ms: u64,
    poll_ms: u64,
) -> Result<u64, TimeSyncError>
where
    T: TimeSyncClient,
    M: Monotonic,
{
    client.start(servers).await;

    let started_ms = ticker.now_ms();
    loop {
        let unix = client.unix_seconds().await;
        if unix > SYNC_SENTINEL_SECS {
            debug!(
                "ntp: time acquired unix={} after {}ms",
                unix,
                ticker.now_ms().saturating_sub(started_ms)
            );
            return Ok(unix);
        }
        if ticker.now_ms().saturating_sub(started_ms) >= max_wait_ms {
            return Err(TimeSyncError::Timeout);
        }
        ticker.sleep_ms(poll_ms).await;
    }
}
