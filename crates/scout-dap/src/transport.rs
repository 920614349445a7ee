//! DAP transport layer — Content-Length framing over TCP or child stdio.

use std::sync::atomic::{AtomicI64, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::Mutex;

use crate::error::DapError;

/// The blank line separating the header block from the body.
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Frame a JSON value as a DAP wire message.
pub fn encode_message(value: &serde_json::Value) -> Vec<u8> {
    let payload = value.to_string();
    let mut frame = format!("Content-Length: {}\r\n\r\n", payload.len()).into_bytes();
    frame.extend_from_slice(payload.as_bytes());
    frame
}

/// Parse a header line as a Content-Length field. Returns `None` for other
/// header fields; header names are matched case-insensitively.
fn content_length_field(line: &str) -> Option<Result<usize, DapError>> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    let value = value.trim();
    Some(value.parse::<usize>().map_err(|_| {
        DapError::Transport(format!("unparseable Content-Length {value:?}"))
    }))
}

/// Decode one DAP wire message from the front of a buffer.
///
/// Returns the parsed JSON body and how many bytes the frame occupied, so
/// callers can slice off the next frame. A buffer that does not yet hold a
/// complete frame is a `Transport` error.
pub fn decode_message(data: &[u8]) -> Result<(serde_json::Value, usize), DapError> {
    let header_end = data
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
        .ok_or_else(|| DapError::Transport("header not terminated yet".into()))?;

    let header = std::str::from_utf8(&data[..header_end])
        .map_err(|_| DapError::Transport("header is not valid UTF-8".into()))?;

    let mut length: Option<usize> = None;
    for field in header.split("\r\n") {
        if let Some(parsed) = content_length_field(field) {
            length = Some(parsed?);
        }
    }
    let length =
        length.ok_or_else(|| DapError::Transport("header carries no Content-Length".into()))?;

    let body_offset = header_end + HEADER_TERMINATOR.len();
    let frame_end = body_offset + length;
    if data.len() < frame_end {
        return Err(DapError::Transport(format!(
            "body truncated: need {length} bytes after the header, only {} buffered",
            data.len() - body_offset
        )));
    }

    let value = serde_json::from_slice(&data[body_offset..frame_end])
        .map_err(|e| DapError::InvalidMessage(format!("body is not valid JSON: {e}")))?;
    Ok((value, frame_end))
}

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A framed DAP message stream.
///
/// Backed either by a TCP socket or by the stdin/stdout pipes of a spawned
/// adapter process. The transport owns the outgoing sequence counter;
/// `send` is serialized so wire order matches submission order.
pub struct DapTransport {
    reader: Mutex<BufReader<BoxedReader>>,
    writer: Mutex<BoxedWriter>,
    seq: AtomicI64,
}

impl DapTransport {
    /// Connect to a DAP adapter listening on a TCP address.
    pub async fn connect_tcp(address: &str) -> Result<Self, DapError> {
        let stream = TcpStream::connect(address).await.map_err(|e| {
            DapError::Transport(format!("failed to connect to DAP server at {address}: {e}"))
        })?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self::from_parts(Box::new(read_half), Box::new(write_half)))
    }

    /// Wrap the stdio pipes of a spawned adapter process.
    pub fn from_child_stdio(stdin: ChildStdin, stdout: ChildStdout) -> Self {
        Self::from_parts(Box::new(stdout), Box::new(stdin))
    }

    /// Build a transport from arbitrary read/write halves.
    pub fn from_parts(reader: BoxedReader, writer: BoxedWriter) -> Self {
        Self {
            reader: Mutex::new(BufReader::new(reader)),
            writer: Mutex::new(writer),
            seq: AtomicI64::new(1),
        }
    }

    /// Allocate the next outgoing sequence number.
    pub fn next_seq(&self) -> i64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Send one framed message.
    pub async fn send(&self, message: &serde_json::Value) -> Result<(), DapError> {
        let frame = encode_message(message);
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Receive one framed message.
    ///
    /// Reads header lines until the blank separator, then exactly
    /// Content-Length body bytes. EOF is reported as a `Transport` error.
    pub async fn receive(&self) -> Result<serde_json::Value, DapError> {
        let mut reader = self.reader.lock().await;

        let mut length: Option<usize> = None;
        loop {
            let mut line = String::new();
            let n = reader.read_line(&mut line).await?;
            if n == 0 {
                return Err(DapError::Transport("connection closed".into()));
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                break;
            }
            if let Some(parsed) = content_length_field(line) {
                length = Some(parsed?);
            }
        }

        let length =
            length.ok_or_else(|| DapError::Transport("header carries no Content-Length".into()))?;

        let mut body = vec![0u8; length];
        reader.read_exact(&mut body).await?;

        serde_json::from_slice(&body)
            .map_err(|e| DapError::InvalidMessage(format!("body is not valid JSON: {e}")))
    }

    /// Shut down the write side. Best-effort; read side unblocks on EOF.
    pub async fn close(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

impl std::fmt::Debug for DapTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DapTransport")
            .field("seq", &self.seq.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_of(body: &str) -> Vec<u8> {
        let mut frame = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
        frame.extend_from_slice(body.as_bytes());
        frame
    }

    #[test]
    fn encode_produces_decodable_frame() {
        let message = serde_json::json!({
            "seq": 7,
            "type": "request",
            "command": "setBreakpoints",
            "arguments": {
                "source": { "path": "/work/api/server.go" },
                "breakpoints": [{ "line": 88 }]
            }
        });
        let frame = encode_message(&message);

        let header = String::from_utf8_lossy(&frame);
        assert!(header.starts_with("Content-Length: "), "frame: {header}");

        let (decoded, consumed) = decode_message(&frame).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(consumed, frame.len(), "a frame must account for every byte");
    }

    #[test]
    fn decode_length_covers_exactly_the_body() {
        let body = r#"{"seq":3,"type":"event","event":"terminated"}"#;
        let frame = frame_of(body);
        let (decoded, consumed) = decode_message(&frame).unwrap();
        assert_eq!(decoded["event"], "terminated");
        assert_eq!(consumed, frame.len());
    }

    #[test]
    fn decode_waits_for_header_terminator() {
        // Only half the header has arrived; the caller should keep buffering.
        let err = decode_message(b"Content-Length: 27\r\n").unwrap_err();
        assert!(err.to_string().contains("not terminated"), "got: {err}");
    }

    #[test]
    fn decode_requires_a_content_length_field() {
        let frame = b"Content-Type: application/vscode-jsonrpc\r\n\r\n{\"seq\":1}";
        let err = decode_message(frame).unwrap_err();
        assert!(err.to_string().contains("no Content-Length"), "got: {err}");
    }

    #[test]
    fn decode_rejects_a_non_numeric_length() {
        let err = decode_message(b"Content-Length: lots\r\n\r\n{}").unwrap_err();
        assert!(err.to_string().contains("unparseable"), "got: {err}");
    }

    #[test]
    fn decode_reports_short_bodies() {
        // The header promises 52 bytes but the pipe only delivered 11 so far.
        let err = decode_message(b"Content-Length: 52\r\n\r\n{\"seq\":901}").unwrap_err();
        assert!(err.to_string().contains("truncated"), "got: {err}");
    }

    #[test]
    fn decode_header_name_is_case_insensitive() {
        let body = r#"{"seq":12,"type":"request","command":"threads"}"#;
        let mut frame = format!("content-length: {}\r\n\r\n", body.len()).into_bytes();
        frame.extend_from_slice(body.as_bytes());
        let (decoded, _) = decode_message(&frame).unwrap();
        assert_eq!(decoded["command"], "threads");
    }

    #[test]
    fn decode_walks_back_to_back_frames() {
        // A scopes request immediately followed by the stopped event that
        // prompted it; each decode must consume exactly one frame.
        let first = r#"{"seq":41,"type":"request","command":"scopes","arguments":{"frameId":5}}"#;
        let second = r#"{"seq":42,"type":"event","event":"stopped","body":{"reason":"step"}}"#;
        let mut wire = frame_of(first);
        let first_len = wire.len();
        wire.extend_from_slice(&frame_of(second));

        let (message, consumed) = decode_message(&wire).unwrap();
        assert_eq!(message["command"], "scopes");
        assert_eq!(consumed, first_len);

        let (message, consumed) = decode_message(&wire[first_len..]).unwrap();
        assert_eq!(message["event"], "stopped");
        assert_eq!(first_len + consumed, wire.len());
    }

    #[test]
    fn transport_seq_numbers_start_at_one() {
        let (client, _server) = tokio::io::duplex(256);
        let (r, w) = tokio::io::split(client);
        let transport = DapTransport::from_parts(Box::new(r), Box::new(w));
        assert_eq!(transport.next_seq(), 1);
        assert_eq!(transport.next_seq(), 2);
        assert_eq!(transport.next_seq(), 3);
    }

    #[tokio::test]
    async fn transport_send_receive_roundtrip() {
        let (client_end, server_end) = tokio::io::duplex(4096);
        let (cr, cw) = tokio::io::split(client_end);
        let (sr, sw) = tokio::io::split(server_end);
        let client = DapTransport::from_parts(Box::new(cr), Box::new(cw));
        let server = DapTransport::from_parts(Box::new(sr), Box::new(sw));

        let msg = serde_json::json!({"seq": 1, "type": "request", "command": "threads"});
        client.send(&msg).await.unwrap();
        let received = server.receive().await.unwrap();
        assert_eq!(received, msg);
    }

    #[tokio::test]
    async fn transport_receive_reports_eof() {
        let (client_end, server_end) = tokio::io::duplex(64);
        let (cr, cw) = tokio::io::split(client_end);
        let client = DapTransport::from_parts(Box::new(cr), Box::new(cw));
        drop(server_end);

        let err = client.receive().await.unwrap_err();
        assert!(err.to_string().contains("connection closed"), "got: {err}");
    }

    #[tokio::test]
    async fn transport_receive_tolerates_extra_headers() {
        let (client_end, server_end) = tokio::io::duplex(4096);
        let (cr, cw) = tokio::io::split(client_end);
        let client = DapTransport::from_parts(Box::new(cr), Box::new(cw));

        let (_sr, mut sw) = tokio::io::split(server_end);
        let body = r#"{"seq":5,"type":"event","event":"initialized"}"#;
        let framed = format!(
            "Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        sw.write_all(framed.as_bytes()).await.unwrap();

        let received = client.receive().await.unwrap();
        assert_eq!(received["event"], "initialized");
    }
}
