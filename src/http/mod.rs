//! HTTP-backed heating device: status polling and on/off commands.

mod actuator;
mod poller;
mod status_path;

pub use actuator::HttpActuator;
pub use poller::StatusPoller;
pub use status_path::StatusPath;

use crate::error::{HeatingError, Result};
use std::time::Duration;

/// Build the client shared by a device's poller and actuator.
///
/// Without a timeout, requests wait as long as the device keeps the
/// connection open.
pub fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| HeatingError::InvalidConfig(format!("failed to build HTTP client: {}", e)))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Minimal HTTP device for exercising the poller and actuator.

    use parking_lot::Mutex;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Answers every request with the configured status and body and
    /// records the requested paths. One request per connection.
    pub struct StubDevice {
        addr: SocketAddr,
        response: Arc<Mutex<(u16, String)>>,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl StubDevice {
        pub async fn start() -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let response = Arc::new(Mutex::new((200, "{}".to_string())));
            let requests = Arc::new(Mutex::new(Vec::new()));

            let (shared_response, shared_requests) = (response.clone(), requests.clone());
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(handle(stream, shared_response.clone(), shared_requests.clone()));
                }
            });

            Self {
                addr,
                response,
                requests,
            }
        }

        pub fn url(&self, path: &str) -> String {
            format!("http://{}{}", self.addr, path)
        }

        pub fn respond(&self, status: u16, body: &str) {
            *self.response.lock() = (status, body.to_string());
        }

        /// Paths requested so far, in arrival order.
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().clone()
        }

        pub fn count(&self, path: &str) -> usize {
            self.requests.lock().iter().filter(|p| *p == path).count()
        }
    }

    async fn handle(
        mut stream: TcpStream,
        response: Arc<Mutex<(u16, String)>>,
        requests: Arc<Mutex<Vec<String>>>,
    ) {
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => head.extend_from_slice(&buf[..n]),
            }
        }

        let head = String::from_utf8_lossy(&head);
        let path = head.split_whitespace().nth(1).unwrap_or("").to_string();
        requests.lock().push(path);

        let (status, body) = response.lock().clone();
        let reply = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            if status < 400 { "OK" } else { "Error" },
            body.len(),
            body
        );
        let _ = stream.write_all(reply.as_bytes()).await;
        let _ = stream.shutdown().await;
    }
}
