//! Connection Handling
//!
//! One tokio task per connection. A connection serves pipelined
//! produce/consume requests in order until the client either hangs up or
//! switches it into a consume stream, at which point the server pushes
//! records and tails the log head.
//!
//! Storage calls block on file I/O, so every one of them hops onto the
//! blocking pool; the async side only shuttles frames.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use streamlog_core::Record;
use streamlog_storage::Error as StorageError;
use streamlog_wire::{read_frame, write_frame, ErrorCode, Request, Response};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task;

use crate::commit_log::CommitLog;
use crate::error::Result;

/// Default delay between head polls while a consume stream is caught up
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// TCP server for the StreamLog wire protocol
pub struct Server {
    log: Arc<dyn CommitLog>,
    poll_interval: Duration,
}

impl Server {
    pub fn new(log: Arc<dyn CommitLog>) -> Self {
        Self {
            log,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override how often caught-up consume streams poll the log head
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Accept connections until `shutdown` fires
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<()>,
    ) -> Result<()> {
        tracing::info!(addr = %listener.local_addr()?, "accepting connections");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (socket, addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            continue;
                        }
                    };

                    tracing::debug!(%addr, "accepted connection");
                    let conn = Connection {
                        log: Arc::clone(&self.log),
                        poll_interval: self.poll_interval,
                        shutdown: shutdown.clone(),
                    };
                    tokio::spawn(async move {
                        if let Err(e) = conn.run(socket).await {
                            tracing::warn!(%addr, error = %e, "connection error");
                        }
                    });
                }
                _ = shutdown.changed() => {
                    tracing::info!("shutdown signal received");
                    return Ok(());
                }
            }
        }
    }
}

struct Connection {
    log: Arc<dyn CommitLog>,
    poll_interval: Duration,
    shutdown: watch::Receiver<()>,
}

impl Connection {
    async fn run(mut self, socket: TcpStream) -> Result<()> {
        let (mut reader, mut writer) = socket.into_split();

        loop {
            let body = tokio::select! {
                frame = read_frame(&mut reader) => frame?,
                _ = self.shutdown.changed() => return Ok(()),
            };
            let Some(body) = body else {
                // Client closed at a frame boundary
                return Ok(());
            };

            match Request::decode(body)? {
                Request::Produce { value } => {
                    let response = self.produce(value).await?;
                    write_frame(&mut writer, &response.encode()).await?;
                }
                Request::Consume { offset } => {
                    let response = self.consume(offset).await?;
                    write_frame(&mut writer, &response.encode()).await?;
                }
                Request::ConsumeStream { offset } => {
                    return self.consume_stream(&mut reader, &mut writer, offset).await;
                }
            }
        }
    }

    async fn produce(&self, value: Bytes) -> Result<Response> {
        let log = Arc::clone(&self.log);
        let result = task::spawn_blocking(move || log.append(Record::new(value))).await?;

        Ok(match result {
            Ok(offset) => Response::Offset(offset),
            Err(err) => error_response(&err),
        })
    }

    async fn consume(&self, offset: u64) -> Result<Response> {
        let log = Arc::clone(&self.log);
        let result = task::spawn_blocking(move || log.read(offset)).await?;

        Ok(match result {
            Ok(record) => Response::Record(record),
            Err(err) => error_response(&err),
        })
    }

    /// Push records from `offset` onward, tailing the head of the log
    async fn consume_stream(
        mut self,
        reader: &mut OwnedReadHalf,
        writer: &mut OwnedWriteHalf,
        mut offset: u64,
    ) -> Result<()> {
        tracing::debug!(offset, "consume stream started");

        loop {
            let log = Arc::clone(&self.log);
            let next = offset;
            let result = task::spawn_blocking(move || log.read(next)).await?;

            match result {
                Ok(record) => {
                    let frame = Response::Record(record).encode();
                    if let Err(e) = write_frame(writer, &frame).await {
                        return if is_disconnect(&e) { Ok(()) } else { Err(e.into()) };
                    }
                    offset += 1;
                }
                Err(StorageError::OffsetOutOfRange(_)) => {
                    // Caught up with the head; the offset may exist shortly.
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        _ = self.shutdown.changed() => return Ok(()),
                        frame = read_frame(reader) => {
                            // The only meaningful thing a streaming client
                            // can still do is hang up.
                            if frame?.is_none() {
                                return Ok(());
                            }
                        }
                    }
                }
                Err(err) => {
                    let frame = error_response(&err).encode();
                    let _ = write_frame(writer, &frame).await;
                    return Err(err.into());
                }
            }
        }
    }
}

fn error_response(err: &StorageError) -> Response {
    let code = match err {
        StorageError::OffsetOutOfRange(_) => ErrorCode::OffsetOutOfRange,
        _ => ErrorCode::Internal,
    };

    Response::Error {
        code,
        message: err.to_string(),
    }
}

fn is_disconnect(err: &streamlog_wire::Error) -> bool {
    matches!(
        err,
        streamlog_wire::Error::Io(e) if matches!(
            e.kind(),
            std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::UnexpectedEof
        )
    )
}
