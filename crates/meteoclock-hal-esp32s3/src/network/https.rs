use core::ffi::CStr;

use embassy_net::{
    IpEndpoint, Stack,
    dns::{self, DnsQueryType},
    tcp::{self, TcpSocket},
};
use embassy_time::{Duration, with_timeout};
use embedded_io_07::ErrorKind;
use embedded_io_async_07::{Read, Write};
use heapless::String;
use log::debug;
use mbedtls_rs::{ClientSessionConfig, Session, SessionConfig, TlsError, TlsReference, X509};
use meteoclock_core::net::fetch::{HttpsTransport, TrustAnchor};

const HOST_BYTES: usize = 96;
const SOCKET_TIMEOUT_SECS: u64 = 20;
const CLOSE_FLUSH_MS: u64 = 250;

#[derive(Debug)]
pub enum HttpsError {
    HostName,
    Dns(dns::Error),
    NoAddress,
    Connect(tcp::ConnectError),
    Tls(TlsError),
}

/// TCP socket seen through the `embedded-io-async` 0.7 traits the TLS
/// session is written against.
struct TcpIo<'s, 'b> {
    socket: &'s mut TcpSocket<'b>,
}

#[derive(Debug)]
struct TcpIoError(tcp::Error);

impl embedded_io_07::Error for TcpIoError {
    fn kind(&self) -> ErrorKind {
        match self.0 {
            tcp::Error::ConnectionReset => ErrorKind::ConnectionReset,
        }
    }
}

impl embedded_io_07::ErrorType for TcpIo<'_, '_> {
    type Error = TcpIoError;
}

impl Read for TcpIo<'_, '_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.socket.read(buf).await.map_err(TcpIoError)
    }
}

impl Write for TcpIo<'_, '_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.socket.write(buf).await.map_err(TcpIoError)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.socket.flush().await.map_err(TcpIoError)
    }
}

/// HTTPS over embassy-net TCP and an mbedtls session.
pub struct HttpsClient<'a> {
    stack: Stack<'a>,
    tls: TlsReference<'a>,
    rx_buffer: &'a mut [u8],
    tx_buffer: &'a mut [u8],
}

impl<'a> HttpsClient<'a> {
    pub fn new(
        stack: Stack<'a>,
        tls: TlsReference<'a>,
        rx_buffer: &'a mut [u8],
        tx_buffer: &'a mut [u8],
    ) -> Self {
        Self {
            stack,
            tls,
            rx_buffer,
            tx_buffer,
        }
    }
}

async fn tls_exchange(
    tls: TlsReference<'_>,
    socket: &mut TcpSocket<'_>,
    server_name: &CStr,
    trust: &TrustAnchor,
    request: &[u8],
    response: &mut [u8],
) -> Result<usize, TlsError> {
    let config = SessionConfig::Client(ClientSessionConfig {
        ca_chain: Some(X509::pem(trust.pem())?),
        server_name: Some(server_name),
        ..ClientSessionConfig::new()
    });
    let mut session = Session::new(tls, TcpIo { socket }, &config)?;
    session.connect().await?;
    session.write_all(request).await?;
    session.flush().await?;

    let mut filled = 0usize;
    while filled < response.len() {
        let read = session.read(&mut response[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

impl HttpsTransport for HttpsClient<'_> {
    type Error = HttpsError;

    async fn exchange(
        &mut self,
        host: &str,
        port: u16,
        trust: &TrustAnchor,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, Self::Error> {
        let mut name: String<HOST_BYTES> = String::new();
        name.push_str(host).map_err(|_| HttpsError::HostName)?;
        name.push('\0').map_err(|_| HttpsError::HostName)?;
        let server_name =
            CStr::from_bytes_with_nul(name.as_bytes()).map_err(|_| HttpsError::HostName)?;

        let addresses = self
            .stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(HttpsError::Dns)?;
        let address = *addresses.first().ok_or(HttpsError::NoAddress)?;

        let mut socket = TcpSocket::new(self.stack, &mut *self.rx_buffer, &mut *self.tx_buffer);
        socket.set_timeout(Some(Duration::from_secs(SOCKET_TIMEOUT_SECS)));
        socket
            .connect(IpEndpoint::new(address, port))
            .await
            .map_err(HttpsError::Connect)?;
        debug!("https: connected host={} addr={}", host, address);

        let result = tls_exchange(
            self.tls,
            &mut socket,
            server_name,
            trust,
            request,
            response,
        )
        .await
        .map_err(HttpsError::Tls);

        socket.close();
        let _ = with_timeout(Duration::from_millis(CLOSE_FLUSH_MS), socket.flush()).await;
        socket.abort();
        result
    }
}
