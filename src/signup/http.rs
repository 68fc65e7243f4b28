use std::collections::HashMap;

use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{AppError, AppResult, SignupError};

const MAX_REQUEST_BYTES: usize = 1024 * 1024;
const READ_CHUNK_BYTES: usize = 4096;

#[derive(Debug)]
pub(crate) struct HttpRequest {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) body: Vec<u8>,
}

impl HttpRequest {
    /// HTTP/1.1 keep-alive unless the client asked to close.
    pub(crate) fn keep_alive(&self) -> bool {
        !self
            .headers
            .get("connection")
            .is_some_and(|value| value.eq_ignore_ascii_case("close"))
    }
}

#[derive(Debug)]
pub(crate) struct RequestError {
    pub(crate) status: u16,
    pub(crate) message: String,
}

impl RequestError {
    fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// One keep-alive connection; bytes past the current request stay buffered.
pub(crate) struct HttpConnection {
    socket: TcpStream,
    buffer: Vec<u8>,
}

impl HttpConnection {
    /// Disables Nagle so small keep-alive responses are not held back.
    pub(crate) fn new(socket: TcpStream) -> Self {
        if let Err(err) = socket.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {}", err);
        }
        Self {
            socket,
            buffer: Vec::with_capacity(READ_CHUNK_BYTES),
        }
    }

    /// Reads the next request. `Ok(None)` means the peer closed between requests.
    pub(crate) async fn read_request(&mut self) -> Result<Option<HttpRequest>, RequestError> {
        let header_end = loop {
            if let Some(pos) = find_header_end(&self.buffer) {
                break pos;
            }
            if self.buffer.len() > MAX_REQUEST_BYTES {
                return Err(RequestError::new(413, "Request too large"));
            }
            if self.fill().await? == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(RequestError::new(400, "Incomplete request"));
            }
        };

        let header_bytes = self
            .buffer
            .get(..header_end)
            .ok_or_else(|| RequestError::new(400, "Malformed request headers"))?;
        let header_text = std::str::from_utf8(header_bytes)
            .map_err(|err| RequestError::new(400, format!("Invalid request encoding: {}", err)))?;
        let mut lines = header_text.split("\r\n");
        let request_line = lines
            .next()
            .ok_or_else(|| RequestError::new(400, "Missing request line"))?;
        let mut parts = request_line.split_whitespace();
        let method = parts
            .next()
            .ok_or_else(|| RequestError::new(400, "Missing HTTP method"))?
            .to_owned();
        let path = parts
            .next()
            .ok_or_else(|| RequestError::new(400, "Missing request path"))?
            .to_owned();

        let mut headers = HashMap::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                return Err(RequestError::new(400, "Malformed header"));
            };
            headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
        }

        let content_length = headers
            .get("content-length")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(0);
        if content_length > MAX_REQUEST_BYTES {
            return Err(RequestError::new(413, "Request body too large"));
        }
        let body_start = header_end
            .checked_add(4)
            .ok_or_else(|| RequestError::new(400, "Malformed request headers"))?;
        let body_end = body_start
            .checked_add(content_length)
            .ok_or_else(|| RequestError::new(400, "Malformed content length"))?;
        while self.buffer.len() < body_end {
            if self.fill().await? == 0 {
                return Err(RequestError::new(400, "Incomplete request body"));
            }
        }

        let body = self
            .buffer
            .get(body_start..body_end)
            .map(<[u8]>::to_vec)
            .unwrap_or_default();
        self.buffer.drain(..body_end);

        Ok(Some(HttpRequest {
            method,
            path,
            headers,
            body,
        }))
    }

    async fn fill(&mut self) -> Result<usize, RequestError> {
        let mut chunk = [0u8; READ_CHUNK_BYTES];
        let bytes = self
            .socket
            .read(&mut chunk)
            .await
            .map_err(|err| RequestError::new(400, format!("Failed to read request: {}", err)))?;
        let read_slice = chunk
            .get(..bytes)
            .ok_or_else(|| RequestError::new(400, "Invalid read length"))?;
        self.buffer.extend_from_slice(read_slice);
        Ok(bytes)
    }

    pub(crate) async fn write_json_response<T>(
        &mut self,
        status: u16,
        response: &T,
        keep_alive: bool,
    ) -> AppResult<()>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(response)
            .map_err(|source| AppError::signup(SignupError::Serialize { source }))?;
        self.write_response(status, &body, keep_alive).await
    }

    pub(crate) async fn write_error_response(
        &mut self,
        status: u16,
        message: &str,
        keep_alive: bool,
    ) -> AppResult<()> {
        self.write_json_response(status, &ErrorResponse { error: message }, keep_alive)
            .await
    }

    async fn write_response(&mut self, status: u16, body: &[u8], keep_alive: bool) -> AppResult<()> {
        let connection = if keep_alive { "keep-alive" } else { "close" };
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: {}\r\n\r\n",
            status,
            status_text(status),
            body.len(),
            connection
        );
        let mut response = Vec::with_capacity(head.len().saturating_add(body.len()));
        response.extend_from_slice(head.as_bytes());
        response.extend_from_slice(body);
        self.socket.write_all(&response).await.map_err(|source| {
            AppError::signup(SignupError::Io {
                context: "write response",
                source,
            })
        })
    }

    /// Whether Nagle's algorithm is disabled on the underlying socket.
    #[cfg(test)]
    pub(crate) fn nodelay(&self) -> bool {
        self.socket.nodelay().unwrap_or(false)
    }
}

#[derive(Serialize)]
pub(crate) struct ErrorResponse<'msg> {
    pub(crate) error: &'msg str,
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}

const fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}
