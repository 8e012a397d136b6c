//! RESP2 framing.
//!
//! Commands go out as arrays of bulk strings; replies come back as one of
//! the five RESP2 kinds.
//!
//! ```rust
//! use bit_store::resp::{encode_command, read_reply, Reply};
//!
//! assert_eq!(
//!     encode_command(&["GETBIT", "k", "7"]),
//!     b"*3\r\n$6\r\nGETBIT\r\n$1\r\nk\r\n$1\r\n7\r\n".to_vec()
//! );
//!
//! let mut input: &[u8] = b"*2\r\n:1\r\n$-1\r\n";
//! let reply = read_reply(&mut input).unwrap();
//! assert_eq!(reply, Reply::Array(Some(vec![Reply::Integer(1), Reply::Bulk(None)])));
//! ```

use std::io::{BufRead, Read};

use crate::{Result, StoreError};

/// Deepest array nesting accepted in a reply.
const MAX_DEPTH: usize = 8;

/// Largest bulk string the server can send (its `proto-max-bulk-len`).
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Longest reply line accepted, type byte included, CRLF excluded.
const MAX_LINE_LEN: usize = 64 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Status(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
    Array(Option<Vec<Reply>>),
}

impl Reply {
    /// Converts `-ERR ...` replies into [`StoreError::Server`].
    pub fn into_result(self) -> Result<Reply> {
        match self {
            Reply::Error(message) => Err(StoreError::Server(message)),
            other => Ok(other),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Bulk(None) | Reply::Array(None))
    }
}

pub fn encode_command<S: AsRef<[u8]>>(args: &[S]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + args.iter().map(|a| a.as_ref().len() + 16).sum::<usize>());
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        let arg = arg.as_ref();
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
    out
}

pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    read_nested(reader, 0)
}

fn read_nested<R: BufRead>(reader: &mut R, depth: usize) -> Result<Reply> {
    if depth > MAX_DEPTH {
        return Err(StoreError::Protocol("reply nested too deeply".into()));
    }
    let line = read_line(reader)?;
    let (kind, body) = line
        .split_first()
        .ok_or_else(|| StoreError::Protocol("empty reply line".into()))?;
    let text = || String::from_utf8_lossy(body).into_owned();

    match kind {
        b'+' => Ok(Reply::Status(text())),
        b'-' => Ok(Reply::Error(text())),
        b':' => Ok(Reply::Integer(parse_int(body)?)),
        b'$' => {
            let len = parse_int(body)?;
            if len < 0 {
                return Ok(Reply::Bulk(None));
            }
            if len > MAX_BULK_LEN {
                return Err(StoreError::Protocol(format!(
                    "bulk length {len} exceeds {MAX_BULK_LEN} bytes"
                )));
            }
            let len = len as usize;
            let mut data = Vec::new();
            Read::take(&mut *reader, len as u64 + 2).read_to_end(&mut data)?;
            if data.len() < len + 2 {
                return Err(eof());
            }
            if !data.ends_with(b"\r\n") {
                return Err(StoreError::Protocol("bulk string not terminated by CRLF".into()));
            }
            data.truncate(len);
            Ok(Reply::Bulk(Some(data)))
        }
        b'*' => {
            let len = parse_int(body)?;
            if len < 0 {
                return Ok(Reply::Array(None));
            }
            // grows with what actually arrives, never with the announced length
            let mut items = Vec::new();
            for _ in 0..len {
                items.push(read_nested(reader, depth + 1)?);
            }
            Ok(Reply::Array(Some(items)))
        }
        other => Err(StoreError::Protocol(format!(
            "unknown reply type byte 0x{other:02x}"
        ))),
    }
}

/// Reads one CRLF-terminated line, without the terminator.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let n = Read::take(&mut *reader, MAX_LINE_LEN as u64 + 2).read_until(b'\n', &mut line)?;
    if n == 0 {
        return Err(eof());
    }
    if !line.ends_with(b"\n") && n == MAX_LINE_LEN + 2 {
        return Err(StoreError::Protocol(format!(
            "reply line longer than {MAX_LINE_LEN} bytes"
        )));
    }
    if !line.ends_with(b"\r\n") {
        return Err(StoreError::Protocol("reply line not terminated by CRLF".into()));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

fn eof() -> StoreError {
    StoreError::Io(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "connection closed by peer",
    ))
}

fn parse_int(body: &[u8]) -> Result<i64> {
    core::str::from_utf8(body)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            StoreError::Protocol(format!("invalid integer `{}`", String::from_utf8_lossy(body)))
        })
}
