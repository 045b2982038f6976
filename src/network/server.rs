//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{QuillError, Result};

use super::Connection;

/// HTTP server for QuillKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
}

/// Stops a running [`Server`] from another thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    /// Signal the server to stop accepting and wake the acceptor
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        // accept() is blocking; a throwaway connection unblocks it
        let _ = TcpStream::connect(self.wake_addr);
    }
}

impl Server {
    /// Bind the listen address from config
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        if config.workers == 0 {
            return Err(QuillError::Config("workers must be at least 1".to_string()));
        }

        let listener = TcpListener::bind(&config.listen_addr)?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Listening on {}", local_addr);

        Ok(Self {
            config,
            engine,
            listener,
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        let mut wake_addr = self.local_addr;
        if wake_addr.ip().is_unspecified() {
            wake_addr.set_ip(match wake_addr.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            });
        }
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            wake_addr,
        }
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown_handle().shutdown();
    }

    /// Serve until shutdown (blocking)
    ///
    /// One acceptor (the calling thread) feeds accepted sockets to a fixed
    /// pool of workers over a bounded channel.
    pub fn run(&self) -> Result<()> {
        let (sender, receiver) = channel::bounded::<TcpStream>(self.config.workers * 4);

        let mut workers = Vec::with_capacity(self.config.workers);
        for id in 0..self.config.workers {
            let receiver = receiver.clone();
            let engine = Arc::clone(&self.engine);
            let read_ms = self.config.read_timeout_ms;
            let write_ms = self.config.write_timeout_ms;

            let handle = thread::Builder::new()
                .name(format!("quillkv-worker-{}", id))
                .spawn(move || {
                    for stream in receiver.iter() {
                        serve(stream, &engine, read_ms, write_ms);
                    }
                })?;
            workers.push(handle);
        }
        drop(receiver);

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            match stream {
                Ok(stream) => {
                    if sender.send(stream).is_err() {
                        tracing::error!("All workers exited, stopping acceptor");
                        break;
                    }
                }
                Err(e) => tracing::warn!("Accept failed: {}", e),
            }
        }

        tracing::info!("Shutting down, waiting for workers");
        drop(sender);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }

        Ok(())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn serve(stream: TcpStream, engine: &Arc<Engine>, read_ms: u64, write_ms: u64) {
    let mut connection = match Connection::new(stream, Arc::clone(engine)) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to set up connection: {}", e);
            return;
        }
    };

    if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
        tracing::warn!("Failed to set timeouts for {}: {}", connection.peer_addr(), e);
        return;
    }

    if let Err(e) = connection.handle() {
        tracing::warn!("Connection {} ended with error: {}", connection.peer_addr(), e);
    }
}
