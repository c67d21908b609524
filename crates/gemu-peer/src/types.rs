//! Decoded response and sync-event payloads.

use gemu_frame::{BodyReader, Packet, PacketType, ParameterList};

/// A device class advertised by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceClass {
    pub id: u32,
    pub name: String,
    pub description: String,
}

/// Which continuous synchronization stream a subscription covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    State,
    Mem,
}

/// An active sync subscription, identified by stream kind and the
/// domain/device pair it was requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub kind: SyncKind,
    pub domain_id: u32,
    pub device_id: u16,
}

/// One contiguous run of synchronized memory words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemRegion {
    /// Word address of the first synchronized word.
    pub start: u16,
    /// The words, in address order. Always a multiple of 16 on the wire.
    pub words: Vec<u16>,
}

/// An unsolicited synchronization packet, decoded.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Device state fields, keyed by device-defined parameter tags.
    State {
        domain_id: u32,
        device_id: u16,
        params: ParameterList,
    },
    /// Memory regions that changed since the last event.
    Mem {
        domain_id: u32,
        device_id: u16,
        regions: Vec<MemRegion>,
    },
}

impl SyncEvent {
    /// Domain the event applies to.
    pub fn domain_id(&self) -> u32 {
        match self {
            SyncEvent::State { domain_id, .. } | SyncEvent::Mem { domain_id, .. } => *domain_id,
        }
    }

    /// Device the event applies to.
    pub fn device_id(&self) -> u16 {
        match self {
            SyncEvent::State { device_id, .. } | SyncEvent::Mem { device_id, .. } => *device_id,
        }
    }

    /// Decode a `StateSync`/`MemSync` packet. Truncated bodies degrade to
    /// partial or empty payloads, never errors.
    pub(crate) fn from_packet(packet: &Packet) -> SyncEvent {
        match packet.packet_type {
            PacketType::MEM_SYNC => SyncEvent::Mem {
                domain_id: packet.domain_id,
                device_id: packet.device_id,
                regions: decode_mem_regions(&mut packet.body_reader()),
            },
            _ => SyncEvent::State {
                domain_id: packet.domain_id,
                device_id: packet.device_id,
                params: packet.body_reader().read_parameters(),
            },
        }
    }
}

/// Memory sync body: a 16-bit section count, then per section a 16-bit
/// start address, an 8-bit count of 16-word blocks, and the words.
fn decode_mem_regions(r: &mut BodyReader) -> Vec<MemRegion> {
    let sections = r.read_u16();
    let mut regions = Vec::new();
    for _ in 0..sections {
        if !r.has_more_data() {
            break;
        }
        let start = r.read_u16();
        let blocks = r.read_u8() as usize;
        let mut words = Vec::with_capacity(blocks * 16);
        for _ in 0..blocks * 16 {
            words.push(r.read_u16());
        }
        regions.push(MemRegion { start, words });
    }
    regions
}
