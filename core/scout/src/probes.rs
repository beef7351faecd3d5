// Path and File Name : /home/sensor/home-sensor-core/core/scout/src/probes.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Bounded per-port probes: TCP banner, HTTP HEAD, TLS ClientHello, favicon hash

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, TimeZone, Utc};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

const TCP_BANNER_TIMEOUT: Duration = Duration::from_secs(3);
const TCP_BANNER_MAX_BYTES: usize = 512;
const HTTP_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

pub const KNOWN_HTTP_PORTS: &[u16] = &[80, 8080, 8000, 8008, 8888, 3000, 5000, 9090];
pub const KNOWN_HTTPS_PORTS: &[u16] = &[443, 8443];

#[derive(Debug, Clone, Default)]
pub struct ProbeResult {
    pub protocol: String,
    pub http_status: Option<i64>,
    pub headers_json: Option<String>,
    pub body_snippet: Option<String>,
    pub favicon_hash: Option<String>,
    pub tls_common_name: Option<String>,
    pub tls_issuer: Option<String>,
    pub tls_not_after: Option<DateTime<Utc>>,
    pub banner: Option<String>,
}

/// Connects and reads whatever the service offers unprompted within the
/// timeout window. Services that only speak after receiving input yield no
/// banner, which is a legitimate (not an error) outcome.
pub async fn probe_tcp_banner(ip: &str, port: u16) -> Option<String> {
    let stream = timeout(TCP_BANNER_TIMEOUT, TcpStream::connect((ip, port))).await.ok()?.ok()?;
    let mut stream = stream;
    let mut buf = vec![0u8; TCP_BANNER_MAX_BYTES];
    match timeout(TCP_BANNER_TIMEOUT, stream.read(&mut buf)).await {
        Ok(Ok(n)) if n > 0 => Some(String::from_utf8_lossy(&buf[..n]).trim().to_string()),
        _ => None,
    }
}

/// Sends a raw minimal HTTP/1.1 HEAD request with a Host header and parses
/// the status line and headers from the raw response, since the target is
/// rarely a well-behaved, publicly routable server.
pub async fn probe_http_head(ip: &str, port: u16, use_tls: bool) -> Option<(i64, String)> {
    let request = format!("HEAD / HTTP/1.1\r\nHost: {ip}\r\nConnection: close\r\nUser-Agent: home-sensor-scout/1.0\r\n\r\n");

    let raw = if use_tls {
        let mut stream = tls_connect(ip, port).await?;
        timeout(HTTP_PROBE_TIMEOUT, stream.write_all(request.as_bytes())).await.ok()?.ok()?;
        read_to_string_bounded(&mut stream).await?
    } else {
        let mut stream = timeout(HTTP_PROBE_TIMEOUT, TcpStream::connect((ip, port))).await.ok()?.ok()?;
        timeout(HTTP_PROBE_TIMEOUT, stream.write_all(request.as_bytes())).await.ok()?.ok()?;
        read_to_string_bounded(&mut stream).await?
    };

    parse_http_response(&raw)
}

async fn read_to_string_bounded<S: tokio::io::AsyncRead + Unpin>(stream: &mut S) -> Option<String> {
    let mut buf = vec![0u8; 8192];
    let n = timeout(HTTP_PROBE_TIMEOUT, stream.read(&mut buf)).await.ok()?.ok()?;
    Some(String::from_utf8_lossy(&buf[..n]).into_owned())
}

fn parse_http_response(raw: &str) -> Option<(i64, String)> {
    let mut lines = raw.split("\r\n");
    let status_line = lines.next()?;
    let status = status_line.split_whitespace().nth(1)?.parse::<i64>().ok()?;

    let mut headers = serde_json::Map::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_string(), serde_json::Value::String(value.trim().to_string()));
        }
    }
    Some((status, serde_json::Value::Object(headers).to_string()))
}

/// Fetches `/favicon.ico` and returns a sha256 hex digest of the body, a
/// cheap fingerprint many embedded web UIs share across firmware versions.
pub async fn probe_favicon_hash(ip: &str, port: u16, use_tls: bool) -> Option<String> {
    let scheme = if use_tls { "https" } else { "http" };
    let client = reqwest::Client::builder().danger_accept_invalid_certs(true).timeout(HTTP_PROBE_TIMEOUT).build().ok()?;
    let url = format!("{scheme}://{ip}:{port}/favicon.ico");
    let resp = client.get(&url).send().await.ok()?;
    if !resp.status().is_success() {
        return None;
    }
    let bytes = resp.bytes().await.ok()?;
    if bytes.is_empty() {
        return None;
    }
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Some(format!("{:x}", hasher.finalize()))
}

struct AcceptAnyServerCert;

impl rustls::client::ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::Certificate,
        _intermediates: &[rustls::Certificate],
        _server_name: &rustls::ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<rustls::client::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::ServerCertVerified::assertion())
    }
}

async fn tls_connect(ip: &str, port: u16) -> Option<tokio_rustls::client::TlsStream<TcpStream>> {
    let config = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
        .with_no_client_auth();
    let connector = tokio_rustls::TlsConnector::from(Arc::new(config));
    let server_name = rustls::ServerName::try_from(ip).ok()?;
    let tcp = timeout(TLS_HANDSHAKE_TIMEOUT, TcpStream::connect((ip, port))).await.ok()?.ok()?;
    timeout(TLS_HANDSHAKE_TIMEOUT, connector.connect(server_name, tcp)).await.ok()?.ok()
}

/// Performs a bare TLS handshake (no application data) purely to harvest
/// the peer certificate's subject CN, issuer CN, and expiry.
pub async fn probe_tls_certificate(ip: &str, port: u16) -> Option<(Option<String>, Option<String>, Option<DateTime<Utc>>)> {
    let stream = tls_connect(ip, port).await?;
    let certs = stream.get_ref().1.peer_certificates()?;
    let leaf = certs.first()?;
    let (_, cert) = x509_parser::parse_x509_certificate(leaf.as_ref()).ok()?;

    let cn = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(str::to_string);
    let issuer = cert
        .issuer()
        .iter_common_name()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(str::to_string);
    let not_after = Utc.timestamp_opt(cert.validity().not_after.timestamp(), 0).single();

    debug!(ip, port, ?cn, ?issuer, "tls certificate probe complete");
    Some((cn, issuer, not_after))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_http_response_extracts_status_and_headers() {
        let raw = "HTTP/1.1 200 OK\r\nServer: lighttpd/1.4\r\nContent-Type: text/html\r\n\r\n";
        let (status, headers) = parse_http_response(raw).unwrap();
        assert_eq!(status, 200);
        assert!(headers.contains("lighttpd"));
    }

    #[test]
    fn parse_http_response_rejects_malformed_status_line() {
        assert!(parse_http_response("garbage\r\n\r\n").is_none());
    }

    #[test]
    fn known_port_tables_do_not_overlap() {
        for port in KNOWN_HTTP_PORTS {
            assert!(!KNOWN_HTTPS_PORTS.contains(port));
        }
    }
}
