//! UDP Server
//!
//! Runs the readiness loop and dispatches datagrams to worker pools.
//!
//! ```text
//!  I/O thread                read pool                  write pool
//! ┌──────────────┐   job   ┌───────────────────┐  job  ┌──────────────┐
//! │ poll         ├────────►│ decode frame      ├──────►│ encode       │
//! │ recv_from ×N │         │ reassemble        │       │ send_to ×N   │
//! └──────────────┘         │ Engine::execute   │       └──────────────┘
//!                          └───────────────────┘
//! ```
//!
//! The I/O thread never runs application logic: it drains the socket,
//! captures each datagram's origin, and hands the bytes on. Fragments of one
//! request may land on different read workers; the shared [`Reassembler`]
//! lets whichever worker completes the message execute it.

use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use mio::net::UdpSocket;
use mio::{Events, Interest, Poll, Token, Waker};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{BeingError, Result};
use crate::pool::{Job, WorkerPool};
use crate::protocol::{
    decode_frame, decode_request, encode_response, peek_message_id, FrameKind, Reassembler,
    Response,
};

const SOCKET: Token = Token(0);
const WAKER: Token = Token(1);

/// Receive buffer size: the largest possible UDP payload
const RECV_BUFFER_SIZE: usize = 65_536;

/// Poll timeout while work is pending (parked job or undrained socket)
const BUSY_POLL: Duration = Duration::from_millis(1);

/// Pause between retries of a send that would block
const SEND_BACKOFF: Duration = Duration::from_millis(2);

/// Stops a running [`Server`] from any thread
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    /// Ask the I/O loop to stop; returns immediately
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        if let Err(e) = self.waker.wake() {
            // The loop still notices within one poll interval
            tracing::warn!("Failed to wake I/O loop: {}", e);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// UDP server for BeingKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    reassembler: Arc<Reassembler>,
    poll: Poll,
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Bind the listen address and register it for readiness events.
    ///
    /// A bind failure is returned as [`BeingError::Bind`].
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        config.validate()?;

        let addr = resolve(&config.listen_addr)?;
        let mut socket = UdpSocket::bind(addr).map_err(|source| BeingError::Bind {
            addr: config.listen_addr.clone(),
            source,
        })?;
        let local_addr = socket.local_addr()?;

        let poll = Poll::new()?;
        poll.registry()
            .register(&mut socket, SOCKET, Interest::READABLE)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKER)?);

        tracing::info!("Listening on udp://{}", local_addr);

        let reassembler = Arc::new(Reassembler::new(
            config.reassembly_timeout(),
            config.max_pending_messages,
        ));

        Ok(Self {
            config,
            engine,
            reassembler,
            poll,
            socket: Arc::new(socket),
            local_addr,
            shutdown: ShutdownHandle {
                flag: Arc::new(AtomicBool::new(false)),
                waker,
            },
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Run the I/O loop until shutdown, then drain both pools (blocking)
    pub fn run(&mut self) -> Result<()> {
        let read_pool = WorkerPool::new(
            "beingkv-read",
            self.config.read_workers,
            self.config.queue_capacity,
            self.config.task_timeout(),
        )?;
        let write_pool = Arc::new(WorkerPool::new(
            "beingkv-write",
            self.config.write_workers,
            self.config.queue_capacity,
            self.config.task_timeout(),
        )?);
        let responder = Responder {
            socket: Arc::clone(&self.socket),
            pool: Arc::clone(&write_pool),
            send_retries: self.config.send_retries,
            max_datagram_size: self.config.max_datagram_size,
        };

        let result = self.event_loop(&read_pool, &responder);

        // Readers first: they may still queue responses
        tracing::info!("I/O loop stopped, draining worker pools");
        read_pool.shutdown();
        write_pool.shutdown();

        result
    }

    fn event_loop(&mut self, read_pool: &WorkerPool, responder: &Responder) -> Result<()> {
        let mut events = Events::with_capacity(128);
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        // Job the read pool had no room for; resubmitted before reading more
        let mut parked: Option<Job> = None;
        // Readiness is edge-triggered: remember a socket we stopped draining
        let mut socket_pending = false;

        while !self.shutdown.is_shutdown() {
            let timeout = if parked.is_some() || socket_pending {
                BUSY_POLL
            } else {
                self.config.poll_interval()
            };

            if let Err(e) = self.poll.poll(&mut events, Some(timeout)) {
                if e.kind() == ErrorKind::Interrupted {
                    continue;
                }
                return Err(e.into());
            }

            for event in events.iter() {
                if event.token() == SOCKET {
                    socket_pending = true;
                }
            }

            if self.shutdown.is_shutdown() {
                break;
            }

            if let Some(job) = parked.take() {
                if let Err(job) = read_pool.try_execute(job) {
                    parked = Some(job);
                    continue;
                }
            }

            if socket_pending {
                socket_pending = self.drain_socket(&mut buf, read_pool, responder, &mut parked);
            }
        }

        if parked.is_some() {
            tracing::warn!("Dropping one request that was waiting for a worker at shutdown");
        }
        Ok(())
    }

    /// Read datagrams until the socket would block or the read pool is full.
    /// Returns true if the socket may still hold data.
    fn drain_socket(
        &self,
        buf: &mut [u8],
        read_pool: &WorkerPool,
        responder: &Responder,
        parked: &mut Option<Job>,
    ) -> bool {
        loop {
            match self.socket.recv_from(buf) {
                Ok((len, origin)) => {
                    let datagram = Bytes::copy_from_slice(&buf[..len]);
                    let job = self.request_job(datagram, origin, responder.clone());
                    if let Err(job) = read_pool.try_execute(job) {
                        tracing::debug!("Read pool full, applying backpressure");
                        *parked = Some(job);
                        return true;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return false,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    // e.g. ICMP port unreachable from an earlier reply
                    tracing::warn!("Receive failed: {}", e);
                    return true;
                }
            }
        }
    }

    fn request_job(&self, datagram: Bytes, origin: SocketAddr, responder: Responder) -> Job {
        let engine = Arc::clone(&self.engine);
        let reassembler = Arc::clone(&self.reassembler);
        let max_datagram_size = self.config.max_datagram_size;

        Box::new(move || {
            if let Some(response) =
                dispatch(&engine, &reassembler, datagram, origin, max_datagram_size)
            {
                responder.send(response);
            }
        })
    }
}

/// Feed one datagram through reassembly and, once its request is complete,
/// execute it.
///
/// Returns `None` only for a fragment of a request still missing pieces.
/// Every complete or malformed request yields exactly one response addressed
/// to `origin`.
pub(crate) fn dispatch(
    engine: &Engine,
    reassembler: &Reassembler,
    datagram: Bytes,
    origin: SocketAddr,
    max_datagram_size: usize,
) -> Option<Response> {
    let malformed = |problem: String| {
        tracing::warn!("Malformed request from {}: {}", origin, problem);
        let id = peek_message_id(&datagram).unwrap_or(0);
        Some(Response::error(format!("Malformed request: {}", problem), origin).in_reply_to(id))
    };

    if datagram.len() > max_datagram_size {
        return malformed(format!(
            "{} bytes exceeds the {} byte limit",
            datagram.len(),
            max_datagram_size
        ));
    }

    let frame = match decode_frame(&datagram) {
        Ok(frame) => frame,
        Err(e) => return malformed(e.to_string()),
    };
    if frame.kind != FrameKind::Request {
        return malformed(format!("expected a request frame, got {:?}", frame.kind));
    }

    let message = match reassembler.push(origin, frame) {
        Ok(Some(message)) => message,
        Ok(None) => {
            tracing::trace!("Buffered a request fragment from {}", origin);
            return None;
        }
        Err(e) => return malformed(e.to_string()),
    };

    let request = match decode_request(&message, origin) {
        Ok(request) => request,
        Err(e) => return malformed(e.to_string()),
    };

    tracing::debug!(
        "Request #{} from {}: {} ({} arg(s){})",
        request.id,
        origin,
        request.command,
        request.args.len(),
        if request.payload.is_some() { ", with payload" } else { "" }
    );

    match catch_unwind(AssertUnwindSafe(|| engine.execute(&request))) {
        Ok(response) => Some(response),
        Err(_) => {
            tracing::error!("Command '{}' from {} panicked", request.command, origin);
            Some(
                Response::error(
                    format!("Internal error while executing '{}'", request.command),
                    origin,
                )
                .in_reply_to(request.id),
            )
        }
    }
}

/// Sends responses through the write pool, or inline when it is full
#[derive(Clone)]
struct Responder {
    socket: Arc<UdpSocket>,
    pool: Arc<WorkerPool>,
    send_retries: u32,
    max_datagram_size: usize,
}

impl Responder {
    fn send(&self, response: Response) {
        let this = self.clone();
        let job: Job = Box::new(move || this.transmit(response));
        if let Err(job) = self.pool.try_execute(job) {
            job();
        }
    }

    fn transmit(&self, response: Response) {
        let destination = response.destination;
        let datagrams = match self.encode(&response) {
            Some(datagrams) => datagrams,
            None => return,
        };

        let count = datagrams.len();
        for datagram in &datagrams {
            if !self.send_datagram(datagram, destination) {
                return;
            }
        }
        tracing::trace!("Sent {} fragment(s) to {}", count, destination);
    }

    /// Send one datagram, retrying while the socket would block
    fn send_datagram(&self, datagram: &[u8], destination: SocketAddr) -> bool {
        for _ in 0..=self.send_retries {
            match self.socket.send_to(datagram, destination) {
                Ok(_) => return true,
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
                    thread::sleep(SEND_BACKOFF);
                }
                Err(e) => {
                    tracing::warn!("Failed to send response to {}: {}", destination, e);
                    return false;
                }
            }
        }
        tracing::warn!(
            "Dropped response to {} after {} retries",
            destination,
            self.send_retries
        );
        false
    }

    /// Encode a response, replacing one that cannot be encoded by an error
    fn encode(&self, response: &Response) -> Option<Vec<Vec<u8>>> {
        let problem = match encode_response(response, self.max_datagram_size) {
            Ok(datagrams) => return Some(datagrams),
            Err(e) => format!("Response could not be encoded: {}", e),
        };

        tracing::warn!("Response to {}: {}", response.destination, problem);
        let fallback =
            Response::error(problem, response.destination).in_reply_to(response.request_id);
        match encode_response(&fallback, self.max_datagram_size) {
            Ok(datagrams) => Some(datagrams),
            Err(e) => {
                tracing::error!("Failed to encode error response: {}", e);
                None
            }
        }
    }
}

fn resolve(addr: &str) -> Result<SocketAddr> {
    let bind_error = |source| BeingError::Bind {
        addr: addr.to_string(),
        source,
    };
    addr.to_socket_addrs()
        .map_err(bind_error)?
        .next()
        .ok_or_else(|| {
            bind_error(std::io::Error::new(
                ErrorKind::AddrNotAvailable,
                "address resolved to nothing",
            ))
        })
}
