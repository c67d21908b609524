//! Header encoding and frame-boundary decoding.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, WireError};
use crate::packet::{Packet, PacketType};

/// Packet header: domain (4) + device (2) + type (2) + transaction (2) +
/// body length (2) = 12 bytes.
pub const HEADER_SIZE: usize = 12;

/// Maximum body length representable by the 16-bit wire length field.
pub const MAX_BODY_LEN: usize = u16::MAX as usize;

/// Encode a packet into the wire format.
///
/// Wire format (all fields little-endian):
/// ```text
/// ┌───────────┬───────────┬──────────┬───────────────┬────────────┬───────────────────┐
/// │ domainID  │ deviceID  │ type     │ transactionID │ bodyLength │ body              │
/// │ (4B LE)   │ (2B LE)   │ (2B LE)  │ (2B LE)       │ (2B LE)    │ (bodyLength bytes)│
/// └───────────┴───────────┴──────────┴───────────────┴────────────┴───────────────────┘
/// ```
pub fn encode_packet(packet: &Packet, dst: &mut BytesMut) -> Result<()> {
    if packet.body.len() > MAX_BODY_LEN {
        return Err(WireError::BodyTooLarge {
            size: packet.body.len(),
            max: MAX_BODY_LEN,
        });
    }
    dst.reserve(HEADER_SIZE + packet.body.len());
    dst.put_u32_le(packet.domain_id);
    dst.put_u16_le(packet.device_id);
    dst.put_u16_le(packet.packet_type.0);
    dst.put_u16_le(packet.transaction_id);
    dst.put_u16_le(packet.body.len() as u16);
    dst.put_slice(&packet.body);
    Ok(())
}

/// Decode a packet from a buffer.
///
/// Returns `None` if the buffer doesn't contain a complete packet yet.
/// On success, consumes exactly `12 + bodyLength` bytes from the buffer;
/// bytes belonging to a following packet are left untouched. There is no
/// checksum or resynchronization: length-prefix consistency is the only
/// framing invariant.
pub fn decode_packet(src: &mut BytesMut) -> Option<Packet> {
    if src.len() < HEADER_SIZE {
        return None; // Need more data
    }

    let body_len = u16::from_le_bytes(src[10..12].try_into().unwrap()) as usize;
    if src.len() < HEADER_SIZE + body_len {
        return None; // Need more data
    }

    let domain_id = u32::from_le_bytes(src[0..4].try_into().unwrap());
    let device_id = u16::from_le_bytes(src[4..6].try_into().unwrap());
    let packet_type = PacketType(u16::from_le_bytes(src[6..8].try_into().unwrap()));
    let transaction_id = u16::from_le_bytes(src[8..10].try_into().unwrap());

    src.advance(HEADER_SIZE);
    let body = src.split_to(body_len).freeze();

    Some(Packet {
        domain_id,
        device_id,
        packet_type,
        transaction_id,
        body,
    })
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::packet::PacketBuilder;

    #[test]
    fn empty_create_dt_frame_is_byte_exact() {
        let packet = PacketBuilder::new(7, 2, PacketType::CREATE_DT, 42).finish();

        let mut wire = BytesMut::new();
        encode_packet(&packet, &mut wire).unwrap();

        assert_eq!(
            wire.as_ref(),
            &[0x07, 0x00, 0x00, 0x00, 0x02, 0x00, 0x01, 0x01, 0x2A, 0x00, 0x00, 0x00]
        );

        let decoded = decode_packet(&mut wire).unwrap();
        assert_eq!(decoded.domain_id, 7);
        assert_eq!(decoded.device_id, 2);
        assert_eq!(decoded.packet_type, PacketType::CREATE_DT);
        assert_eq!(decoded.transaction_id, 42);
        assert!(decoded.body.is_empty());
        assert!(!decoded.body_reader().has_more_data());
        assert!(wire.is_empty());
    }

    #[test]
    fn roundtrip_preserves_header_and_body() {
        let mut b = PacketBuilder::new(0xDEAD_BEEF, 0xFFFF, PacketType(0x8130), 0xFFFF);
        b.write_u32(u32::MAX);
        b.write_i32(i32::MIN);
        b.write_string("lem1802");
        let packet = b.finish();

        let mut wire = BytesMut::new();
        encode_packet(&packet, &mut wire).unwrap();
        assert_eq!(wire.len(), packet.wire_size());

        let decoded = decode_packet(&mut wire).unwrap();
        assert_eq!(decoded.domain_id, 0xDEAD_BEEF);
        assert_eq!(decoded.device_id, 0xFFFF);
        assert_eq!(decoded.packet_type, PacketType(0x8130));
        assert_eq!(decoded.transaction_id, 0xFFFF);
        assert_eq!(decoded.body, packet.body);

        let mut r = decoded.body_reader();
        assert_eq!(r.read_u32(), u32::MAX);
        assert_eq!(r.read_i32(), i32::MIN);
        assert_eq!(r.read_string().as_ref(), b"lem1802");
        assert!(!r.has_more_data());
    }

    #[test]
    fn decode_incomplete_header() {
        let mut wire = BytesMut::from(&[0x07, 0x00, 0x00][..]);
        assert!(decode_packet(&mut wire).is_none());
        assert_eq!(wire.len(), 3);
    }

    #[test]
    fn decode_incomplete_body() {
        let mut b = PacketBuilder::new(1, 0, PacketType::START_DT, 9);
        b.write_u32(0);
        let mut wire = BytesMut::new();
        encode_packet(&b.finish(), &mut wire).unwrap();
        wire.truncate(HEADER_SIZE + 2);

        assert!(decode_packet(&mut wire).is_none());
        assert_eq!(wire.len(), HEADER_SIZE + 2);
    }

    #[test]
    fn first_decode_leaves_following_packet_untouched() {
        let first = PacketBuilder::new(1, 0, PacketType::STOP_DT, 1).finish();
        let mut second = PacketBuilder::new(2, 0, PacketType::RESET_DT, 2);
        second.write_u16(0xBEEF);
        let second = second.finish();

        let mut wire = BytesMut::new();
        encode_packet(&first, &mut wire).unwrap();
        encode_packet(&second, &mut wire).unwrap();
        // Only the second packet's header is buffered so far.
        wire.truncate(first.wire_size() + HEADER_SIZE);

        let p1 = decode_packet(&mut wire).unwrap();
        assert_eq!(p1.transaction_id, 1);
        assert_eq!(wire.len(), HEADER_SIZE);
        // The second packet still decodes once its body arrives.
        assert!(decode_packet(&mut wire).is_none());
        wire.put_u16_le(0xBEEF);
        let p2 = decode_packet(&mut wire).unwrap();
        assert_eq!(p2.transaction_id, 2);
        assert_eq!(p2.body.as_ref(), &[0xEF, 0xBE]);
    }

    #[test]
    fn encode_rejects_oversized_body() {
        let packet = Packet {
            domain_id: 0,
            device_id: 0,
            packet_type: PacketType::SEND_DEVICE_MESSAGE,
            transaction_id: 0,
            body: Bytes::from(vec![0u8; MAX_BODY_LEN + 1]),
        };
        let mut wire = BytesMut::new();
        let err = encode_packet(&packet, &mut wire).unwrap_err();
        assert!(matches!(err, WireError::BodyTooLarge { size, max } if size == MAX_BODY_LEN + 1 && max == MAX_BODY_LEN));
        assert!(wire.is_empty());
    }

    #[test]
    fn max_length_body_roundtrips() {
        let packet = Packet {
            domain_id: 3,
            device_id: 1,
            packet_type: PacketType::MEM_SYNC,
            transaction_id: 0,
            body: Bytes::from(vec![0x5A; MAX_BODY_LEN]),
        };
        let mut wire = BytesMut::new();
        encode_packet(&packet, &mut wire).unwrap();
        assert_eq!(wire.len(), HEADER_SIZE + MAX_BODY_LEN);

        let decoded = decode_packet(&mut wire).unwrap();
        assert_eq!(decoded.body.len(), MAX_BODY_LEN);
        assert!(wire.is_empty());
    }
}
