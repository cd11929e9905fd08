//! Devices from the control plane API.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use super::status::StatusCommand;
use super::Source;
use crate::device::Device;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: Vec<Device>,
}

/// Fetches every device in a tailnet, then optionally enriches them from
/// the local status command.
pub struct RemoteSource {
    client: Client,
    url: String,
    api_key: String,
    status: Option<StatusCommand>,
}

impl RemoteSource {
    /// The timeout covers the whole request; there is no retry.
    pub fn new(
        base_url: &str,
        tailnet: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tips/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Fetch(format!("building HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: devices_url(base_url, tailnet),
            api_key: api_key.into(),
            status: None,
        })
    }

    pub fn with_status(mut self, status: StatusCommand) -> Self {
        self.status = Some(status);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn devices_url(base_url: &str, tailnet: &str) -> String {
    format!(
        "{}/api/v2/tailnet/{}/devices?fields=all",
        base_url.trim_end_matches('/'),
        tailnet
    )
}

impl Source for RemoteSource {
    type Item = Device;

    fn fetch_all(&self) -> Result<Vec<Device>> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| Error::Fetch(format!("GET {}: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("GET {} returned {}", self.url, status)));
        }

        let body: DevicesResponse = response
            .json()
            .map_err(|e| Error::Fetch(format!("decoding devices: {}", e)))?;
        let mut devices = body.devices;
        tracing::debug!(count = devices.len(), "fetched devices");

        if let Some(status) = &self.status {
            status.enrich(&mut devices);
        }
        Ok(devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve exactly one canned HTTP response; returns the base URL and a
    /// handle yielding the request line and headers.
    fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end().to_string();
                if line.is_empty() {
                    break;
                }
                head.push(line);
            }
            let response = format!(
                "HTTP/1.1 {}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            head
        });

        (base, handle)
    }

    #[test]
    fn test_devices_url() {
        assert_eq!(
            devices_url("https://api.tailscale.com/", "-"),
            "https://api.tailscale.com/api/v2/tailnet/-/devices?fields=all"
        );
        assert_eq!(
            devices_url("http://localhost:8080", "example.com"),
            "http://localhost:8080/api/v2/tailnet/example.com/devices?fields=all"
        );
    }

    #[test]
    fn test_fetch_all() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"devices": [
                {"name": "a-foo.example.ts.net", "user": "x@example.com", "nodeKey": "nodekey:aaa"},
                {
                    "name": "b-foo.example.ts.net",
                    "user": "y@example.com",
                    "clientVersion": "1.56.1-t1"
                }
            ]}"#,
        );

        let source =
            RemoteSource::new(&base, "example.com", "secret", Duration::from_secs(5)).unwrap();
        let devices = source.fetch_all().unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].node_key, "nodekey:aaa");
        assert_eq!(devices[1].version(), "1.56.1");

        let head = server.join().unwrap();
        assert_eq!(
            head[0],
            "GET /api/v2/tailnet/example.com/devices?fields=all HTTP/1.1"
        );
        assert!(head
            .iter()
            .any(|h| h.eq_ignore_ascii_case("authorization: Bearer secret")));
    }

    #[test]
    fn test_error_status_is_a_fetch_error() {
        let (base, server) = serve_once("401 Unauthorized", r#"{"message": "invalid key"}"#);

        let source = RemoteSource::new(&base, "-", "bad", Duration::from_secs(5)).unwrap();
        let err = source.fetch_all().unwrap_err();
        assert!(matches!(err, Error::Fetch(ref m) if m.contains("401")), "{err}");
        server.join().unwrap();
    }

    #[test]
    fn test_unreachable_is_a_fetch_error() {
        // Bind then drop to get a port nobody listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let base = format!("http://127.0.0.1:{}", port);

        let source = RemoteSource::new(&base, "-", "key", Duration::from_secs(2)).unwrap();
        assert!(matches!(source.fetch_all(), Err(Error::Fetch(_))));
    }
}
