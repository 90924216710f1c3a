//! StreamLog Client
//!
//! Async client for the StreamLog commit log server.
//!
//! ## Usage
//!
//! ```ignore
//! use streamlog_client::Client;
//! use bytes::Bytes;
//!
//! let mut client = Client::connect("127.0.0.1:8400").await?;
//!
//! let offset = client.produce(Bytes::from("hello world")).await?;
//! let record = client.consume(offset).await?;
//! assert_eq!(record.value, Bytes::from("hello world"));
//!
//! // Tail the log from the beginning
//! let mut stream = client.consume_stream(0).await?;
//! while let Some(record) = stream.next().await? {
//!     println!("{}: {:?}", record.offset, record.value);
//! }
//! ```
//!
//! A client owns one connection. Produce requests may be pipelined with
//! [`Client::produce_batch`]; [`Client::consume_stream`] consumes the client
//! because the connection switches permanently to server-push.

pub mod error;

pub use error::{Error, Result};

use bytes::Bytes;
use streamlog_core::Record;
use streamlog_wire::{read_frame, write_frame, Request, Response};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Connection to a StreamLog server
pub struct Client {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Connect to the server at `addr`
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let socket = TcpStream::connect(addr).await?;
        let (reader, writer) = socket.into_split();
        Ok(Self { reader, writer })
    }

    /// Append `value` to the log, returning its assigned offset
    pub async fn produce(&mut self, value: Bytes) -> Result<u64> {
        self.send(Request::Produce { value }).await?;
        match self.recv().await? {
            Response::Offset(offset) => Ok(offset),
            Response::Error { code, message } => Err(Error::from_wire(code, message)),
            Response::Record(_) => Err(Error::UnexpectedResponse),
        }
    }

    /// Append several values with pipelined requests, returning the offsets
    /// in order
    pub async fn produce_batch(&mut self, values: Vec<Bytes>) -> Result<Vec<u64>> {
        let count = values.len();
        for value in values {
            self.send(Request::Produce { value }).await?;
        }

        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            match self.recv().await? {
                Response::Offset(offset) => offsets.push(offset),
                Response::Error { code, message } => return Err(Error::from_wire(code, message)),
                Response::Record(_) => return Err(Error::UnexpectedResponse),
            }
        }
        Ok(offsets)
    }

    /// Read the record at `offset`
    pub async fn consume(&mut self, offset: u64) -> Result<Record> {
        self.send(Request::Consume { offset }).await?;
        match self.recv().await? {
            Response::Record(record) => Ok(record),
            Response::Error { code, message } => Err(Error::from_wire(code, message)),
            Response::Offset(_) => Err(Error::UnexpectedResponse),
        }
    }

    /// Switch this connection to a tailing stream starting at `offset`
    pub async fn consume_stream(mut self, offset: u64) -> Result<ConsumeStream> {
        self.send(Request::ConsumeStream { offset }).await?;
        Ok(ConsumeStream { client: self })
    }

    async fn send(&mut self, request: Request) -> Result<()> {
        write_frame(&mut self.writer, &request.encode()).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Response> {
        let body = read_frame(&mut self.reader)
            .await?
            .ok_or(Error::UnexpectedResponse)?;
        Ok(Response::decode(body)?)
    }
}

/// Server-push record stream; tails the log until dropped
pub struct ConsumeStream {
    client: Client,
}

impl ConsumeStream {
    /// Next record in offset order
    ///
    /// Waits while the stream is caught up with the head of the log.
    /// Returns `None` if the server closes the stream.
    pub async fn next(&mut self) -> Result<Option<Record>> {
        let Some(body) = read_frame(&mut self.client.reader).await? else {
            return Ok(None);
        };

        match Response::decode(body)? {
            Response::Record(record) => Ok(Some(record)),
            Response::Error { code, message } => Err(Error::from_wire(code, message)),
            Response::Offset(_) => Err(Error::UnexpectedResponse),
        }
    }
}
