//! The CID client.
//!
//! [`CidClient`] owns the write half of a coordinator link and exposes the
//! read half as a method: whoever reads the port calls
//! [`CidClient::on_bytes_received`] with each chunk. Decoded responses go to
//! the waiting request, if any, and then to every subscriber.

use std::io::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, trace};
use zigbee_cid_protocol::{
    CidPacket, PingInfo, ReassemblerStats, Response, ResponseKind, Status, StreamReassembler,
};

use crate::config::ClientConfig;
use crate::correlator::Correlator;
use crate::error::{ClientError, ClientResult};

fn unexpected(expected: ResponseKind, got: &Response) -> ClientError {
    ClientError::UnexpectedResponse {
        expected,
        got: got.kind(),
    }
}

/// Client for a ZigBee coordinator's CID interface.
pub struct CidClient<W: Write + Send> {
    sink: Mutex<Option<W>>,
    reassembler: Mutex<StreamReassembler>,
    correlator: Correlator,
    events: broadcast::Sender<Response>,
    config: ClientConfig,
}

impl<W: Write + Send> CidClient<W> {
    /// Create a client writing to `sink`.
    pub fn new(sink: W, config: ClientConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        CidClient {
            sink: Mutex::new(Some(sink)),
            reassembler: Mutex::new(StreamReassembler::new()),
            correlator: Correlator::new(),
            events,
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Receive every response decoded from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Response> {
        self.events.subscribe()
    }

    /// Feed bytes read from the link.
    ///
    /// Chunks may split or join frames arbitrarily. Responses are handled
    /// in arrival order, even across concurrent callers.
    pub fn on_bytes_received(&self, bytes: &[u8]) {
        if self.config.log_frames {
            trace!(len = bytes.len(), data = %hex::encode(bytes), "rx");
        }
        let mut reassembler = self.reassembler.lock();
        reassembler.on_bytes_received(bytes, |response| self.dispatch(response));
    }

    fn dispatch(&self, response: Response) {
        let matched = self.correlator.offer(&response);
        debug!(kind = %response.kind(), code = response.code(), matched, "response");
        // No subscribers is fine.
        let _ = self.events.send(response);
    }

    /// Write a packet without waiting for a reply.
    pub fn send_packet(&self, packet: &CidPacket) -> ClientResult<()> {
        let frame = packet.encode()?;
        self.write_frame(&frame)
    }

    fn write_frame(&self, frame: &[u8]) -> ClientResult<()> {
        let mut sink = self.sink.lock();
        let writer = sink.as_mut().ok_or(ClientError::Closed)?;
        if self.config.log_frames {
            trace!(len = frame.len(), data = %hex::encode(frame), "tx");
        }
        writer.write_all(frame)?;
        writer.flush()?;
        Ok(())
    }

    /// Write `packet` and wait up to `timeout` for the next response of
    /// kind `expected`.
    pub async fn send_and_await(
        &self,
        packet: &CidPacket,
        expected: ResponseKind,
        timeout: Duration,
    ) -> ClientResult<Response> {
        let frame = packet.encode()?;
        let pending = self.correlator.register(expected);
        self.write_frame(&frame)?;
        let result = pending.wait(timeout).await;
        if let Err(ClientError::Timeout { kind, after }) = &result {
            debug!(%kind, ?after, command = packet.command, "request timed out");
        }
        result
    }

    /// [`send_and_await`](Self::send_and_await) with the configured default
    /// timeout.
    pub async fn request(
        &self,
        packet: &CidPacket,
        expected: ResponseKind,
    ) -> ClientResult<Response> {
        self.send_and_await(packet, expected, self.config.default_timeout())
            .await
    }

    /// Ping the coordinator.
    pub async fn ping(&self) -> ClientResult<PingInfo> {
        match self.request(&CidPacket::ping(), ResponseKind::Ping).await? {
            Response::Ping(info) => Ok(info),
            other => Err(unexpected(ResponseKind::Ping, &other)),
        }
    }

    /// Read the coordinator clock.
    pub async fn system_time(&self) -> ClientResult<DateTime<Utc>> {
        match self
            .request(&CidPacket::get_system_time(), ResponseKind::SystemTime)
            .await?
        {
            Response::SystemTime { time } => Ok(time),
            other => Err(unexpected(ResponseKind::SystemTime, &other)),
        }
    }

    /// Set the coordinator clock.
    pub async fn set_system_time(&self, time: DateTime<Utc>) -> ClientResult<Status> {
        let packet = CidPacket::set_system_time(time)?;
        match self.request(&packet, ResponseKind::SetSystemTime).await? {
            Response::SetSystemTime(status) => Ok(status),
            other => Err(unexpected(ResponseKind::SetSystemTime, &other)),
        }
    }

    /// Reassembler counters.
    pub fn stats(&self) -> ReassemblerStats {
        self.reassembler.lock().stats()
    }

    /// Number of requests waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.correlator.pending_count()
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_closed(&self) -> bool {
        self.sink.lock().is_none()
    }

    /// Release the sink and fail every waiting request.
    ///
    /// Later writes return [`ClientError::Closed`].
    pub fn shutdown(&self) {
        if let Some(sink) = self.sink.lock().take() {
            drop(sink);
            debug!("sink released");
        }
        self.correlator.clear();
    }
}
