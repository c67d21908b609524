//! The blocking session object: transaction allocation, response
//! correlation, and sync-event queueing over one connection.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{Read, Write};
use std::time::Duration;

use gemu_frame::{Packet, PacketBuilder, PacketReader, PacketType, PacketWriter};
use tracing::warn;

use crate::error::{PeerError, Result};
use crate::types::{Subscription, SyncEvent};

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Timeout for establishing the TCP connection.
    pub connect_timeout: Option<Duration>,
    /// Read timeout applied to the underlying stream.
    pub read_timeout: Option<Duration>,
    /// Write timeout applied to the underlying stream.
    pub write_timeout: Option<Duration>,
    /// Maximum sync events queued while waiting on responses.
    pub max_buffered_events: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(5)),
            read_timeout: None,
            write_timeout: None,
            max_buffered_events: 1024,
        }
    }
}

/// A blocking client session on one GEMU connection.
///
/// One connection carries interleaved responses and sync events; the
/// session owns the pending-transaction table that matches each response
/// to its request by transaction ID, independent of arrival order, and
/// queues sync events encountered along the way.
///
/// The session is single-threaded. Callers multiplexing one connection
/// from several threads must wrap it in their own lock so no two packets'
/// bytes interleave on the wire.
#[derive(Debug)]
pub struct Session<R, W> {
    reader: PacketReader<R>,
    writer: PacketWriter<W>,
    next_transaction: u16,
    in_flight: HashSet<u16>,
    pending: HashMap<u16, Packet>,
    events: VecDeque<SyncEvent>,
    pub(crate) subscriptions: HashSet<Subscription>,
    config: SessionConfig,
}

impl<R: Read, W: Write> Session<R, W> {
    /// Assemble a session from framed halves of a connection.
    pub fn from_parts(
        reader: PacketReader<R>,
        writer: PacketWriter<W>,
        config: SessionConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            next_transaction: 1,
            in_flight: HashSet::new(),
            pending: HashMap::new(),
            events: VecDeque::new(),
            subscriptions: HashSet::new(),
            config,
        }
    }

    /// Send one request packet and return its transaction ID.
    ///
    /// The ID is unique among in-flight requests; pair with
    /// [`wait`](Self::wait) to collect the response. Fire-and-forget types
    /// (`SendDeviceMessage`) consume an ID but are not tracked.
    pub fn submit(
        &mut self,
        domain_id: u32,
        device_id: u16,
        packet_type: PacketType,
        write_body: impl FnOnce(&mut PacketBuilder),
    ) -> Result<u16> {
        let transaction_id = self.alloc_transaction()?;
        let mut builder = PacketBuilder::new(domain_id, device_id, packet_type, transaction_id);
        write_body(&mut builder);
        self.writer.send(&builder.finish())?;
        if packet_type.expects_response() {
            self.in_flight.insert(transaction_id);
        }
        Ok(transaction_id)
    }

    /// Block until the response for `transaction_id` arrives.
    ///
    /// Responses for other in-flight transactions received in the meantime
    /// are parked and handed out by their own `wait` calls; sync events
    /// are queued for [`poll_event`](Self::poll_event).
    pub fn wait(&mut self, transaction_id: u16) -> Result<Packet> {
        loop {
            if let Some(packet) = self.pending.remove(&transaction_id) {
                self.in_flight.remove(&transaction_id);
                return Ok(packet);
            }
            if !self.in_flight.contains(&transaction_id) {
                return Err(PeerError::UnknownTransaction(transaction_id));
            }
            self.recv_next()?;
        }
    }

    /// Send one request and block for its response.
    pub fn transact(
        &mut self,
        domain_id: u32,
        device_id: u16,
        packet_type: PacketType,
        write_body: impl FnOnce(&mut PacketBuilder),
    ) -> Result<Packet> {
        let transaction_id = self.submit(domain_id, device_id, packet_type, write_body)?;
        self.wait(transaction_id)
    }

    /// Pop a queued sync event, if any. Does not read from the connection.
    pub fn poll_event(&mut self) -> Option<SyncEvent> {
        self.events.pop_front()
    }

    /// Block until a sync event is available.
    pub fn recv_event(&mut self) -> Result<SyncEvent> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Ok(event);
            }
            self.recv_next()?;
        }
    }

    /// Currently active sync subscriptions.
    pub fn subscriptions(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.iter()
    }

    /// Number of requests awaiting a response.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Consume the session and return the framed halves.
    pub fn into_parts(self) -> (PacketReader<R>, PacketWriter<W>) {
        (self.reader, self.writer)
    }

    fn alloc_transaction(&mut self) -> Result<u16> {
        for _ in 0..=u16::MAX as u32 {
            let transaction_id = self.next_transaction;
            self.next_transaction = self.next_transaction.wrapping_add(1);
            if !self.in_flight.contains(&transaction_id)
                && !self.pending.contains_key(&transaction_id)
            {
                return Ok(transaction_id);
            }
        }
        Err(PeerError::TransactionIdsExhausted)
    }

    /// Read one packet and route it: responses to the pending table, sync
    /// events to the queue, anything else logged and dropped.
    fn recv_next(&mut self) -> Result<()> {
        let packet = self.reader.read_packet()?;

        if packet.packet_type.is_sync_event() {
            if self.events.len() >= self.config.max_buffered_events {
                return Err(PeerError::EventBufferFull(self.events.len()));
            }
            self.events.push_back(SyncEvent::from_packet(&packet));
        } else if packet.packet_type.is_response() {
            if self.in_flight.contains(&packet.transaction_id) {
                self.pending.insert(packet.transaction_id, packet);
            } else {
                warn!(
                    packet_type = %packet.packet_type,
                    transaction_id = packet.transaction_id,
                    "dropping response with no matching request"
                );
            }
        } else {
            warn!(
                packet_type = %packet.packet_type,
                "dropping unexpected request-direction packet"
            );
        }

        Ok(())
    }
}
