//! Blocking RESP2 client for a remote bit store.
//!
//! # Examples
//!
//! ```no_run
//! use bit_store::{BitStore, ClientConfig, RespStore};
//! use std::time::Duration;
//!
//! let config = ClientConfig::default()
//!     .with_addr("10.0.0.5:6379")
//!     .with_read_timeout(Duration::from_millis(250));
//! let store = RespStore::connect(config).unwrap();
//! store.set_bit("logins", 42, true).unwrap();
//! ```

use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::resp::{self, Reply};
use crate::trace;
use crate::{BitOp, BitRange, BitStore, Command, FieldOp, Result, StoreError};

const BACKEND: &str = "resp";

/// Connection settings. Timeouts apply to the socket; the client itself
/// never retries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub addr: String,
    pub password: Option<String>,
    pub database: u32,
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:6379".into(),
            password: None,
            database: 0,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Reads `BITSTORE_ADDR`, `BITSTORE_PASSWORD`, `BITSTORE_DB`,
    /// `BITSTORE_TIMEOUT_MS` and `BITSTORE_TRACE` on top of the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(addr) = lookup("BITSTORE_ADDR") {
            config.addr = addr;
        }
        config.password = lookup("BITSTORE_PASSWORD").filter(|p| !p.is_empty());
        if let Some(db) = lookup("BITSTORE_DB") {
            config.database = db
                .parse()
                .map_err(|_| StoreError::Config(format!("BITSTORE_DB is not a number: `{db}`")))?;
        }
        if let Some(ms) = lookup("BITSTORE_TIMEOUT_MS") {
            let ms: u64 = ms.parse().map_err(|_| {
                StoreError::Config(format!("BITSTORE_TIMEOUT_MS is not a number: `{ms}`"))
            })?;
            config = config.with_timeout(Duration::from_millis(ms));
        }
        match lookup("BITSTORE_TRACE").as_deref() {
            Some("1") | Some("true") => trace::enable(),
            Some("0") | Some("false") | Some("") | None => {}
            Some(other) => {
                return Err(StoreError::Config(format!(
                    "BITSTORE_TRACE must be 0/1/true/false, got `{other}`"
                )));
            }
        }
        Ok(config)
    }

    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_database(mut self, database: u32) -> Self {
        self.database = database;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Sets connect, read and write timeouts at once.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_connect_timeout(timeout)
            .with_read_timeout(timeout)
            .with_write_timeout(timeout)
    }
}

#[derive(Debug)]
struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Connection {
    fn open(config: &ClientConfig) -> Result<Self> {
        let stream = match config.connect_timeout {
            Some(timeout) => {
                let addr = config
                    .addr
                    .to_socket_addrs()?
                    .next()
                    .ok_or_else(|| StoreError::Config(format!("cannot resolve `{}`", config.addr)))?;
                TcpStream::connect_timeout(&addr, timeout)?
            }
            None => TcpStream::connect(config.addr.as_str())?,
        };
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        stream.set_nodelay(true)?;

        let mut conn = Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        };
        if let Some(password) = &config.password {
            conn.round_trip(&["AUTH".to_owned(), password.clone()])?;
        }
        if config.database != 0 {
            conn.round_trip(&["SELECT".to_owned(), config.database.to_string()])?;
        }
        Ok(conn)
    }

    fn round_trip(&mut self, args: &[String]) -> Result<Reply> {
        self.writer.write_all(&resp::encode_command(args))?;
        self.writer.flush()?;
        resp::read_reply(&mut self.reader)?.into_result()
    }
}

/// [`BitStore`] backed by a TCP connection to a RESP2 server.
///
/// The connection is opened eagerly by [`connect`](RespStore::connect). After
/// an IO or protocol failure it is dropped, the failing call returns the
/// error, and the next call reconnects.
#[derive(Debug)]
pub struct RespStore {
    config: ClientConfig,
    conn: Mutex<Option<Connection>>,
}

impl RespStore {
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let conn = Connection::open(&config)?;
        Ok(Self {
            config,
            conn: Mutex::new(Some(conn)),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn execute(&self, command: Command<'_>) -> Result<Reply> {
        let args = command.to_args();
        trace::command(BACKEND, &args);

        let result = exchange(&self.config, &mut self.lock(), &args);
        trace::reply(BACKEND, &result);
        result
    }

    fn integer(&self, command: Command<'_>) -> Result<i64> {
        let name = command.name();
        match self.execute(command)? {
            Reply::Integer(n) => Ok(n),
            other => Err(unexpected(name, &other)),
        }
    }

    fn field_replies(&self, command: Command<'_>) -> Result<Vec<Option<i64>>> {
        let name = command.name();
        match self.execute(command)? {
            Reply::Array(Some(items)) => items
                .into_iter()
                .map(|item| match item {
                    Reply::Integer(n) => Ok(Some(n)),
                    Reply::Bulk(None) => Ok(None),
                    other => Err(unexpected(name, &other)),
                })
                .collect(),
            other => Err(unexpected(name, &other)),
        }
    }
}

/// Runs one command on the pooled connection, opening it first if needed.
/// A connection that failed at the IO or framing level is not put back.
fn exchange(config: &ClientConfig, slot: &mut Option<Connection>, args: &[String]) -> Result<Reply> {
    let mut conn = match slot.take() {
        Some(conn) => conn,
        None => Connection::open(config)?,
    };
    let result = conn.round_trip(args);
    if !matches!(result, Err(StoreError::Io(_) | StoreError::Protocol(_))) {
        *slot = Some(conn);
    }
    result
}

fn unexpected(command: &'static str, reply: &Reply) -> StoreError {
    StoreError::UnexpectedReply {
        command,
        reply: format!("{reply:?}"),
    }
}

fn to_bit(command: &'static str, n: i64) -> Result<bool> {
    match n {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(unexpected(command, &Reply::Integer(other))),
    }
}

impl BitStore for RespStore {
    fn set_bit(&self, key: &str, offset: u64, on: bool) -> Result<bool> {
        let n = self.integer(Command::SetBit { key, offset, on })?;
        to_bit("SETBIT", n)
    }

    fn get_bit(&self, key: &str, offset: u64) -> Result<bool> {
        let n = self.integer(Command::GetBit { key, offset })?;
        to_bit("GETBIT", n)
    }

    fn bit_count(&self, key: &str, range: Option<BitRange>) -> Result<u64> {
        let n = self.integer(Command::BitCount { key, range })?;
        u64::try_from(n).map_err(|_| unexpected("BITCOUNT", &Reply::Integer(n)))
    }

    fn bit_pos(&self, key: &str, bit: bool, range: Option<BitRange>) -> Result<i64> {
        self.integer(Command::BitPos { key, bit, range })
    }

    fn bit_op(&self, op: BitOp, dest: &str, sources: &[&str]) -> Result<u64> {
        if sources.is_empty() || (op == BitOp::Not && sources.len() != 1) {
            return Err(StoreError::InvalidArgument(format!(
                "BITOP {} with {} source keys",
                op.as_str(),
                sources.len()
            )));
        }
        let n = self.integer(Command::BitOp { op, dest, sources })?;
        u64::try_from(n).map_err(|_| unexpected("BITOP", &Reply::Integer(n)))
    }

    fn bitfield(&self, key: &str, ops: &[FieldOp]) -> Result<Vec<Option<i64>>> {
        self.field_replies(Command::BitField { key, ops })
    }

    fn bitfield_ro(&self, key: &str, ops: &[FieldOp]) -> Result<Vec<Option<i64>>> {
        if !ops.iter().all(FieldOp::is_read_only) {
            return Err(StoreError::InvalidArgument(
                "BITFIELD_RO only supports the GET subcommand".into(),
            ));
        }
        self.field_replies(Command::BitFieldRo { key, ops })
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let n = self.integer(Command::Expire { key, seconds: ttl.as_secs() })?;
        to_bit("EXPIRE", n)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let n = self.integer(Command::Del { key })?;
        Ok(n > 0)
    }
}
