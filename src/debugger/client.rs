//! Debug Adapter Protocol client over a byte stream
//!
//! Messages are framed as `Content-Length: N\r\n\r\n<json>`. Requests are
//! sent one at a time; events and stale responses that arrive while a
//! request is outstanding are skipped.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;

use crate::debugger::protocol::{
    DebugTransport, EvaluateArguments, EvaluateArgumentsContext, EvaluateResponse, ReadMemoryArguments,
    ReadMemoryResponse, StackFrame, StackTraceArguments, StackTraceResponse, Thread, ThreadsResponse,
};
use crate::error::TransportError;

/// Largest message body accepted from an adapter (64 MiB)
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Default time to wait for a response
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const CONTENT_LENGTH: &str = "content-length";

/// A message received from the adapter
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomingMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "request_seq", default)]
    request_seq: Option<i64>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    event: Option<String>,
}

impl IncomingMessage {
    fn error_message(&self) -> String {
        self.body
            .as_ref()
            .and_then(|body| body.pointer("/error/format"))
            .and_then(Value::as_str)
            .or(self.message.as_deref())
            .unwrap_or("unknown error")
            .to_string()
    }
}

/// Frame a message body for the wire
pub fn encode_message(body: &[u8]) -> Vec<u8> {
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    let mut frame = Vec::with_capacity(header.len() + body.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(body);
    frame
}

/// Read one framed message body
pub async fn read_message<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut content_length = None;
    let mut saw_header = false;

    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(TransportError::Disconnected);
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            if saw_header {
                break;
            }
            // Stray blank line between messages
            continue;
        }
        saw_header = true;

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| TransportError::Malformed(format!("bad header line '{}'", line)))?;
        if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
            let length: usize = value
                .trim()
                .parse()
                .map_err(|_| TransportError::Malformed(format!("bad content length '{}'", value.trim())))?;
            content_length = Some(length);
        }
    }

    let length = content_length
        .ok_or_else(|| TransportError::Malformed("missing Content-Length header".to_string()))?;
    if length > MAX_MESSAGE_SIZE {
        return Err(TransportError::Malformed(format!(
            "message of {} bytes exceeds {} byte limit",
            length, MAX_MESSAGE_SIZE
        )));
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            TransportError::Disconnected
        } else {
            TransportError::Io(e)
        }
    })?;
    Ok(body)
}

struct Connection<R, W> {
    reader: BufReader<R>,
    writer: W,
    next_seq: i64,
    /// Set once the stream may be positioned inside a frame
    broken: bool,
}

impl<R, W> Connection<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, message: &Value) -> Result<(), TransportError> {
        let body = serde_json::to_vec(message)?;
        self.writer.write_all(&encode_message(&body)).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn response_for(&mut self, seq: i64) -> Result<IncomingMessage, TransportError> {
        loop {
            let body = read_message(&mut self.reader).await?;
            let message: IncomingMessage = serde_json::from_slice(&body)?;
            match message.kind.as_str() {
                "response" if message.request_seq == Some(seq) => return Ok(message),
                "response" => {
                    warn!("Dropping response to stale request {:?}", message.request_seq);
                }
                "event" => {
                    trace!("Skipping event {}", message.event.as_deref().unwrap_or("?"));
                }
                other => {
                    debug!("Ignoring message of type {}", other);
                }
            }
        }
    }
}

/// DAP client speaking over any async reader/writer pair
pub struct DapClient<R, W> {
    connection: Mutex<Connection<R, W>>,
    timeout: Duration,
}

impl DapClient<OwnedReadHalf, OwnedWriteHalf> {
    /// Connect to an adapter listening on a TCP socket
    pub async fn connect_tcp(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self::new(reader, writer))
    }
}

impl<R, W> DapClient<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a client over a stream pair
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            connection: Mutex::new(Connection {
                reader: BufReader::new(reader),
                writer,
                next_seq: 1,
                broken: false,
            }),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Change the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send a request and wait for its response body
    pub async fn request<A, B>(&self, command: &str, arguments: A) -> Result<B, TransportError>
    where
        A: Serialize,
        B: DeserializeOwned,
    {
        let arguments = serde_json::to_value(arguments)?;
        let mut connection = self.connection.lock().await;
        if connection.broken {
            return Err(TransportError::Disconnected);
        }
        let seq = connection.next_seq;
        connection.next_seq += 1;

        let message = json!({
            "seq": seq,
            "type": "request",
            "command": command,
            "arguments": arguments,
        });
        debug!("-> {} (seq {})", command, seq);

        let outcome = tokio::time::timeout(self.timeout, async {
            connection.send(&message).await?;
            connection.response_for(seq).await
        })
        .await;
        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                if matches!(
                    err,
                    TransportError::Io(_) | TransportError::Malformed(_) | TransportError::Disconnected
                ) {
                    connection.broken = true;
                }
                return Err(err);
            }
            Err(_) => {
                // The pending frame may be partly read
                warn!("No response to {} (seq {}), closing connection", command, seq);
                connection.broken = true;
                return Err(TransportError::Timeout(command.to_string()));
            }
        };

        if !response.success {
            return Err(TransportError::Request {
                command: response.command.clone().unwrap_or_else(|| command.to_string()),
                message: response.error_message(),
            });
        }
        debug!("<- {} (seq {})", command, seq);

        Ok(serde_json::from_value(response.body.unwrap_or(Value::Null))?)
    }
}

#[async_trait]
impl<R, W> DebugTransport for DapClient<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn threads(&self) -> Result<Vec<Thread>, TransportError> {
        let body: ThreadsResponse = self.request("threads", json!({})).await?;
        Ok(body.threads)
    }

    async fn stack_trace(
        &self,
        thread_id: i64,
        start_frame: i64,
        levels: Option<i64>,
    ) -> Result<Vec<StackFrame>, TransportError> {
        let arguments = StackTraceArguments {
            thread_id,
            start_frame: Some(start_frame),
            levels,
            ..Default::default()
        };
        let body: StackTraceResponse = self.request("stackTrace", arguments).await?;
        Ok(body.stack_frames)
    }

    async fn evaluate(
        &self,
        expression: &str,
        frame_id: i64,
        context: EvaluateArgumentsContext,
    ) -> Result<EvaluateResponse, TransportError> {
        let arguments = EvaluateArguments {
            expression: expression.to_string(),
            frame_id: Some(frame_id),
            context: Some(context),
            ..Default::default()
        };
        self.request("evaluate", arguments).await
    }

    async fn read_memory(
        &self,
        memory_reference: &str,
        offset: i64,
        count: u64,
    ) -> Result<ReadMemoryResponse, TransportError> {
        let count = i64::try_from(count)
            .map_err(|_| TransportError::Malformed(format!("read of {} bytes is not addressable", count)))?;
        let arguments = ReadMemoryArguments {
            memory_reference: memory_reference.to_string(),
            offset: Some(offset),
            count,
        };
        self.request("readMemory", arguments).await
    }
}
