//! Minimal HTTP/1.0 request/response framing for a single GET.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::config::ForecastEndpoint;

pub const REQUEST_MAX: usize = 256;
pub const PATH_MAX: usize = 128;
const USER_AGENT: &str = "meteoclock/0.1";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestError {
    TooLong,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponseError {
    /// No blank line ending the header block.
    Incomplete,
    BadStatusLine,
    BadContentLength,
    /// Fewer body bytes than `Content-Length` announced.
    Truncated,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Response<'a> {
    pub status: u16,
    pub body: &'a [u8],
}

/// Only 200 and 301 hand a body to the caller.
pub const fn is_success(status: u16) -> bool {
    matches!(status, 200 | 301)
}

pub fn forecast_path(endpoint: &ForecastEndpoint) -> Result<String<PATH_MAX>, RequestError> {
    let mut path = String::new();
    write!(
        path,
        "/v1/forecast?latitude={:.4}&longitude={:.4}&current=temperature_2m",
        endpoint.latitude, endpoint.longitude
    )
    .map_err(|_| RequestError::TooLong)?;
    Ok(path)
}

pub fn build_get(host: &str, path: &str) -> Result<Vec<u8, REQUEST_MAX>, RequestError> {
    let mut request: String<REQUEST_MAX> = String::new();
    write!(
        request,
        "GET {path} HTTP/1.0\r\nHost: {host}\r\nUser-Agent: {USER_AGENT}\r\nAccept: application/json\r\nConnection: close\r\n\r\n"
    )
    .map_err(|_| RequestError::TooLong)?;
    Ok(request.into_bytes())
}

pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}

fn parse_status_line(line: &str) -> Option<u16> {
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse::<u16>().ok()
}

/// `Ok(None)` when the header is absent.
pub fn parse_content_length(header: &str) -> Result<Option<usize>, ResponseError> {
    for line in header.lines().skip(1) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            return value
                .trim()
                .parse::<usize>()
                .map(Some)
                .map_err(|_| ResponseError::BadContentLength);
        }
    }
    Ok(None)
}

/// Splits a complete response read up to EOF into status and body.
pub fn parse_response(raw: &[u8]) -> Result<Response<'_>, ResponseError> {
    let header_end = find_header_end(raw).ok_or(ResponseError::Incomplete)?;
    let header =
        core::str::from_utf8(&raw[..header_end]).map_err(|_| ResponseError::BadStatusLine)?;
    let status = header
        .lines()
        .next()
        .and_then(parse_status_line)
        .ok_or(ResponseError::BadStatusLine)?;

    let mut body = &raw[header_end + 4..];
    if let Some(length) = parse_content_length(header)? {
        if length > body.len() {
            return Err(ResponseError::Truncated);
        }
        body = &body[..length];
    }

    Ok(Response { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_path_carries_coordinates() {
        let path = forecast_path(&ForecastEndpoint::new(55.0529, 74.5751)).expect("fits");
        assert_eq!(
            path.as_str(),
            "/v1/forecast?latitude=55.0529&longitude=74.5751&current=temperature_2m"
        );
    }

    #[test]
    fn get_request_closes_connection() {
        let request = build_get("api.open-meteo.com", "/v1/forecast").expect("fits");
        let text = core::str::from_utf8(&request).expect("ascii");
        assert!(text.starts_with("GET /v1/forecast HTTP/1.0\r\nHost: api.open-meteo.com\r\n"));
        assert!(text.contains("Accept: application/json\r\n"));
        assert!(text.ends_with("Connection: close\r\n\r\n"));
    }

    #[test]
    fn oversized_request_is_refused() {
        let long_path = "/x".repeat(200);
        assert_eq!(
            build_get("api.open-meteo.com", &long_path),
            Err(RequestError::TooLong)
        );
    }

    #[test]
    fn response_body_is_trimmed_to_content_length() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\ncontent-length: 2\r\n\r\n{}trailing";
        let response = parse_response(raw).expect("valid");
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"{}");
    }

    #[test]
    fn response_without_length_runs_to_eof() {
        let raw = b"HTTP/1.0 301 Moved Permanently\r\nLocation: /\r\n\r\nabc";
        let response = parse_response(raw).expect("valid");
        assert_eq!(response.status, 301);
        assert!(is_success(response.status));
        assert_eq!(response.body, b"abc");
    }

    #[test]
    fn malformed_responses_are_rejected() {
        assert_eq!(
            parse_response(b"HTTP/1.1 200 OK\r\n"),
            Err(ResponseError::Incomplete)
        );
        assert_eq!(
            parse_response(b"SSH-2.0 hi\r\n\r\n"),
            Err(ResponseError::BadStatusLine)
        );
        assert_eq!(
            parse_response(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n{}"),
            Err(ResponseError::Truncated)
        );
        assert_eq!(
            parse_response(b"HTTP/1.1 200 OK\r\nContent-Length: ten\r\n\r\n{}"),
            Err(ResponseError::BadContentLength)
        );
    }

    #[test]
    fn only_ok_and_moved_count_as_success() {
        assert!(is_success(200));
        assert!(is_success(301));
        assert!(!is_success(302));
        assert!(!is_success(500));
    }
}
