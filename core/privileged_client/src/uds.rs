// Path and File Name : /home/sensor/home-sensor-core/core/privileged_client/src/uds.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Newline-delimited JSON-RPC client for the privileged collaborator over a Unix domain socket

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::client::PrivilegedOperations;
use crate::error::PrivilegedClientError;
use crate::types::{ArpScanEntry, DnsQueryRecord, ListenerHandle, PortForwardRule, ServiceScanEntry};

pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct RpcRequest<'a> {
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    ok: bool,
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

/// Talks to the privileged collaborator process over a Unix domain socket,
/// one connection per call: each request is a single JSON line, each
/// response a single JSON line. The collaborator runs as root (or with the
/// narrow capabilities raw sockets and packet-filter changes require); this
/// client never needs those privileges itself.
pub struct UnixSocketPrivilegedClient {
    socket_path: PathBuf,
    call_timeout: Duration,
}

impl UnixSocketPrivilegedClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self { socket_path: socket_path.into(), call_timeout: DEFAULT_RPC_TIMEOUT }
    }

    pub fn with_timeout(socket_path: impl Into<PathBuf>, call_timeout: Duration) -> Self {
        Self { socket_path: socket_path.into(), call_timeout }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T, PrivilegedClientError> {
        let attempt = self.call_once(method, params);
        match tokio::time::timeout(self.call_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(PrivilegedClientError::Timeout(self.call_timeout)),
        }
    }

    async fn call_once<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T, PrivilegedClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let request = RpcRequest { method, params };
        let mut line = serde_json::to_string(&request).map_err(|e| PrivilegedClientError::Protocol(e.to_string()))?;
        line.push('\n');
        write_half.write_all(line.as_bytes()).await?;
        write_half.flush().await?;

        let mut response_line = String::new();
        reader.read_line(&mut response_line).await?;
        if response_line.is_empty() {
            return Err(PrivilegedClientError::Protocol("collaborator closed connection without a response".into()));
        }

        let response: RpcResponse =
            serde_json::from_str(response_line.trim_end()).map_err(|e| PrivilegedClientError::Protocol(e.to_string()))?;
        if !response.ok {
            return Err(PrivilegedClientError::Transient(response.error.unwrap_or_else(|| "unspecified rpc failure".into())));
        }
        serde_json::from_value(response.result).map_err(|e| PrivilegedClientError::Protocol(e.to_string()))
    }
}

#[derive(Deserialize)]
struct FdResult {
    fd: i64,
}

#[async_trait]
impl PrivilegedOperations for UnixSocketPrivilegedClient {
    async fn arp_scan(&self, subnet: &str) -> Result<Vec<ArpScanEntry>, PrivilegedClientError> {
        self.call("arp_scan", json!({"subnet": subnet})).await
    }

    async fn service_scan(&self, targets: &[String], ports: &[u16]) -> Result<Vec<ServiceScanEntry>, PrivilegedClientError> {
        self.call("service_scan", json!({"targets": targets, "ports": ports})).await
    }

    async fn bind_listener(&self, addr: &str, port: u16) -> Result<ListenerHandle, PrivilegedClientError> {
        let result: FdResult = self.call("bind_listener", json!({"addr": addr, "port": port})).await?;
        Ok(ListenerHandle(result.fd))
    }

    async fn start_dns_sniff(&self, interface: &str) -> Result<(), PrivilegedClientError> {
        self.call("start_dns_sniff", json!({"interface": interface})).await
    }

    async fn stop_dns_sniff(&self, interface: &str) -> Result<(), PrivilegedClientError> {
        self.call("stop_dns_sniff", json!({"interface": interface})).await
    }

    async fn get_dns_queries(&self, since: DateTime<Utc>) -> Result<Vec<DnsQueryRecord>, PrivilegedClientError> {
        self.call("get_dns_queries", json!({"since": since})).await
    }

    async fn add_ip_alias(&self, ip: &str, interface: &str, mask: &str) -> Result<bool, PrivilegedClientError> {
        self.call("add_ip_alias", json!({"ip": ip, "interface": interface, "mask": mask})).await
    }

    async fn remove_ip_alias(&self, ip: &str, interface: &str) -> Result<bool, PrivilegedClientError> {
        self.call("remove_ip_alias", json!({"ip": ip, "interface": interface})).await
    }

    async fn setup_port_forwards(&self, rules: &[PortForwardRule], interface: &str) -> Result<bool, PrivilegedClientError> {
        self.call("setup_port_forwards", json!({"rules": rules, "interface": interface})).await
    }

    async fn clear_port_forwards(&self) -> Result<bool, PrivilegedClientError> {
        self.call("clear_port_forwards", json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::UnixListener;

    #[tokio::test]
    async fn successful_round_trip_decodes_result() {
        let dir = tempfile_dir();
        let socket_path = dir.join("privileged-arp-scan.sock");
        let listener = UnixListener::bind(&socket_path).unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = stream.read(&mut buf).await.unwrap();
            let _request: serde_json::Value = serde_json::from_slice(&buf[..n]).unwrap();
            let response = json!({"ok": true, "result": [{"ip": "192.168.1.5", "mac": "AA:BB:CC:DD:EE:FF"}]});
            let mut line = response.to_string();
            line.push('\n');
            stream.write_all(line.as_bytes()).await.unwrap();
        });

        let client = UnixSocketPrivilegedClient::new(socket_path);
        let entries = client.arp_scan("192.168.1.0/24").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ip, "192.168.1.5");
    }

    #[tokio::test]
    async fn error_response_surfaces_as_transient_error() {
        let dir = tempfile_dir();
        let socket_path = dir.join("privileged-dns-sniff.sock");
        let listener = UnixListener::bind(&socket_path).unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = stream.read(&mut buf).await.unwrap();
            let response = json!({"ok": false, "error": "interface not found"});
            let mut line = response.to_string();
            line.push('\n');
            stream.write_all(line.as_bytes()).await.unwrap();
        });

        let client = UnixSocketPrivilegedClient::new(socket_path);
        let err = client.start_dns_sniff("eth0").await.unwrap_err();
        assert!(matches!(err, PrivilegedClientError::Transient(_)));
    }

    fn tempfile_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sensor-privileged-client-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
