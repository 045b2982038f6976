//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::{QuillError, Result};
use crate::protocol::{read_request, write_response, Command, Request, Response, Status};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the engine
    engine: Arc<Engine>,

    /// Largest request body accepted
    max_body_size: usize,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let max_body_size = engine.config().max_body_size;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            engine,
            max_body_size,
            peer_addr,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Serves requests in a loop while the client keeps the connection
    /// alive. Returns when the client disconnects or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let request = match read_request(&mut self.reader, self.max_body_size) {
                Ok(Some(request)) => request,
                Ok(None) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(QuillError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} went away: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(e @ QuillError::Protocol(_)) => {
                    tracing::warn!("Bad request from {}: {}", self.peer_addr, e);
                    let response = Response::error(Status::BadRequest, &e.message());
                    let _ = write_response(&mut self.writer, &response, false);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            let keep_alive = request.keep_alive();
            let response = self.dispatch(&request);

            if let Err(e) = write_response(&mut self.writer, &response, keep_alive) {
                if let QuillError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }

            if !keep_alive {
                return Ok(());
            }
        }
    }

    /// Route a request and execute it
    fn dispatch(&self, request: &Request) -> Response {
        let command = match Command::from_request(request) {
            Ok(Some(command)) => command,
            Ok(None) => return Response::no_route(&request.method, &request.path),
            Err(e) => return Response::error(Status::BadRequest, &e.message()),
        };

        tracing::trace!("Received {} from {}", command.name(), self.peer_addr);

        let name = command.name();
        let result = self.engine.execute(command);
        match result {
            Err(ref e) if e.is_client_error() => {
                tracing::debug!("{} rejected for {}: {}", name, self.peer_addr, e);
            }
            Err(ref e) => tracing::error!("{} failed for {}: {}", name, self.peer_addr, e),
            Ok(_) => {}
        }
        Response::from_result(&result)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    )
}
