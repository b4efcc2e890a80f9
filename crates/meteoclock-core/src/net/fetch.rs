//! One certificate-validated GET against the forecast API.

use core::fmt::Debug;

use log::{debug, warn};

use super::http::{self, ResponseError};
use crate::config::ForecastEndpoint;

/// Root certificate the server chain must validate against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TrustAnchor {
    pem: &'static [u8],
}

impl TrustAnchor {
    /// `pem` must include the trailing NUL the TLS backend expects.
    pub const fn from_pem(pem: &'static [u8]) -> Self {
        Self { pem }
    }

    pub const fn pem(&self) -> &'static [u8] {
        self.pem
    }
}

/// Opens a TLS session, writes `request` and reads until the peer closes.
#[allow(async_fn_in_trait)]
pub trait HttpsTransport {
    type Error: Debug;

    /// Returns the number of bytes read into `response`.
    async fn exchange(
        &mut self,
        host: &str,
        port: u16,
        trust: &TrustAnchor,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, Self::Error>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FetchError {
    Request,
    Transport,
    ResponseTooLarge,
    Malformed(ResponseError),
    Status(u16),
}

/// Fetches the current-conditions body into `buffer`.
pub async fn fetch<'b, H>(
    transport: &mut H,
    endpoint: &ForecastEndpoint,
    trust: &TrustAnchor,
    buffer: &'b mut [u8],
) -> Result<&'b [u8], FetchError>
where
    H: HttpsTransport,
{
    let path = http::forecast_path(endpoint).map_err(|_| FetchError::Request)?;
    let request = http::build_get(endpoint.host, &path).map_err(|_| FetchError::Request)?;

    let read = match transport
        .exchange(endpoint.host, endpoint.port, trust, &request, buffer)
        .await
    {
        Ok(read) => read,
        Err(err) => {
            warn!("fetch: transport err={:?}", err);
            return Err(FetchError::Transport);
        }
    };
    if read >= buffer.len() {
        warn!("fetch: response filled {} byte buffer", buffer.len());
        return Err(FetchError::ResponseTooLarge);
    }

    let buffer: &'b [u8] = buffer;
    let response = http::parse_response(&buffer[..read]).map_err(|err| {
        warn!("fetch: malformed response err={:?}", err);
        FetchError::Malformed(err)
    })?;
    if !http::is_success(response.status) {
        warn!("fetch: http status={}", response.status);
        return Err(FetchError::Status(response.status));
    }

    debug!(
        "fetch: status={} body_len={}",
        response.status,
        response.body.len()
    );
    Ok(response.body)
}
