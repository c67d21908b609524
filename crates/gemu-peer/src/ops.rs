//! Typed device-tree operations over a session.

use std::io::{Read, Write};

use gemu_frame::{Packet, PacketType};

use crate::error::{PeerError, Result};
use crate::session::Session;
use crate::types::{DeviceClass, Subscription, SyncKind};

/// Decode the leading u32 status of a response body; non-zero is an
/// endpoint-reported failure. An empty body reads as status 0.
fn expect_status(packet: &Packet) -> Result<()> {
    let code = packet.body_reader().read_u32();
    if code != 0 {
        return Err(PeerError::Endpoint { code });
    }
    Ok(())
}

impl<R: Read, W: Write> Session<R, W> {
    /// Enumerate the device classes the endpoint can emulate.
    pub fn list_classes(&mut self) -> Result<Vec<DeviceClass>> {
        let response = self.transact(0, 0, PacketType::LIST_CLASSES, |_| {})?;

        let mut r = response.body_reader();
        let _advisory = r.read_u16(); // entry count; the stream is read to exhaustion
        let mut classes = Vec::new();
        while r.has_more_data() {
            let before = r.position();
            let id = r.read_u32();
            let name = String::from_utf8_lossy(&r.read_string()).into_owned();
            let description = String::from_utf8_lossy(&r.read_string()).into_owned();
            if r.position() == before {
                break; // truncated tail, nothing left to decode
            }
            classes.push(DeviceClass {
                id,
                name,
                description,
            });
        }
        Ok(classes)
    }

    /// Create a device tree; returns the domain ID the endpoint assigned
    /// (carried in the response header).
    pub fn create_dt(&mut self, name: &str) -> Result<u32> {
        let response = self.transact(0, 0, PacketType::CREATE_DT, |b| b.write_string(name))?;
        expect_status(&response)?;
        Ok(response.domain_id)
    }

    /// Tear down a device tree.
    pub fn delete_dt(&mut self, domain_id: u32) -> Result<()> {
        let response = self.transact(domain_id, 0, PacketType::DELETE_DT, |_| {})?;
        expect_status(&response)
    }

    /// Attach a device of `class_id` to a tree; returns the device ID the
    /// endpoint assigned (carried in the response header).
    pub fn attach_device(&mut self, domain_id: u32, class_id: u32) -> Result<u16> {
        let response = self.transact(domain_id, 0, PacketType::ATTACH_DT_DEVICE, |b| {
            b.write_u32(class_id)
        })?;
        expect_status(&response)?;
        Ok(response.device_id)
    }

    /// Remove a device from its tree.
    pub fn remove_device(&mut self, domain_id: u32, device_id: u16) -> Result<()> {
        let response =
            self.transact(domain_id, device_id, PacketType::REMOVE_DT_DEVICE, |_| {})?;
        expect_status(&response)
    }

    /// Start execution of a device tree.
    pub fn start_dt(&mut self, domain_id: u32) -> Result<()> {
        let response = self.transact(domain_id, 0, PacketType::START_DT, |_| {})?;
        expect_status(&response)
    }

    /// Stop execution of a device tree.
    pub fn stop_dt(&mut self, domain_id: u32) -> Result<()> {
        let response = self.transact(domain_id, 0, PacketType::STOP_DT, |_| {})?;
        expect_status(&response)
    }

    /// Reset a device tree to its initial state.
    pub fn reset_dt(&mut self, domain_id: u32) -> Result<()> {
        let response = self.transact(domain_id, 0, PacketType::RESET_DT, |_| {})?;
        expect_status(&response)
    }

    /// Send an opaque message to one device. Fire-and-forget: consumes a
    /// transaction ID but has no response.
    pub fn send_device_message(
        &mut self,
        domain_id: u32,
        device_id: u16,
        payload: &[u8],
    ) -> Result<()> {
        self.submit(domain_id, device_id, PacketType::SEND_DEVICE_MESSAGE, |b| {
            b.write_bytes(payload)
        })?;
        Ok(())
    }

    /// Subscribe to state synchronization for a domain/device pair.
    pub fn request_state_sync(&mut self, domain_id: u32, device_id: u16) -> Result<()> {
        self.sync_request(SyncKind::State, domain_id, device_id, true)
    }

    /// Cancel a state synchronization subscription.
    pub fn cancel_state_sync(&mut self, domain_id: u32, device_id: u16) -> Result<()> {
        self.sync_request(SyncKind::State, domain_id, device_id, false)
    }

    /// Subscribe to memory synchronization for a domain/device pair.
    pub fn request_mem_sync(&mut self, domain_id: u32, device_id: u16) -> Result<()> {
        self.sync_request(SyncKind::Mem, domain_id, device_id, true)
    }

    /// Cancel a memory synchronization subscription.
    pub fn cancel_mem_sync(&mut self, domain_id: u32, device_id: u16) -> Result<()> {
        self.sync_request(SyncKind::Mem, domain_id, device_id, false)
    }

    fn sync_request(
        &mut self,
        kind: SyncKind,
        domain_id: u32,
        device_id: u16,
        enable: bool,
    ) -> Result<()> {
        let packet_type = match (kind, enable) {
            (SyncKind::State, true) => PacketType::REQUEST_STATE_SYNC,
            (SyncKind::State, false) => PacketType::CANCEL_STATE_SYNC,
            (SyncKind::Mem, true) => PacketType::REQUEST_MEM_SYNC,
            (SyncKind::Mem, false) => PacketType::CANCEL_MEM_SYNC,
        };

        let response = self.transact(domain_id, device_id, packet_type, |_| {})?;
        expect_status(&response)?;

        let subscription = Subscription {
            kind,
            domain_id,
            device_id,
        };
        if enable {
            self.subscriptions.insert(subscription);
        } else {
            self.subscriptions.remove(&subscription);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use gemu_frame::{PacketBuilder, PacketReader, PacketWriter};

    use super::*;
    use crate::session::tests::{session_over, tcp_pair};

    fn serve_one(
        server: std::net::TcpStream,
        respond: impl FnOnce(&Packet) -> Packet + Send + 'static,
    ) -> thread::JoinHandle<Packet> {
        thread::spawn(move || {
            let mut reader = PacketReader::new(server.try_clone().unwrap());
            let mut writer = PacketWriter::new(server);
            let request = reader.read_packet().unwrap();
            writer.send(&respond(&request)).unwrap();
            request
        })
    }

    fn status_response(request: &Packet, code: u32) -> Packet {
        let mut b = PacketBuilder::response_to(request);
        b.write_u32(code);
        b.finish()
    }

    #[test]
    fn list_classes_parses_catalog() {
        let (client, server) = tcp_pair();
        let mut session = session_over(client);

        let echo = serve_one(server, |request| {
            let mut b = PacketBuilder::response_to(request);
            b.write_u16(2);
            b.write_u32(12289);
            b.write_string("dcpu");
            b.write_string("DCPU-16 processor");
            b.write_u32(6);
            b.write_string("lem1802");
            b.write_string("LEM1802 display");
            b.finish()
        });

        let classes = session.list_classes().unwrap();
        assert_eq!(
            classes,
            vec![
                DeviceClass {
                    id: 12289,
                    name: "dcpu".into(),
                    description: "DCPU-16 processor".into(),
                },
                DeviceClass {
                    id: 6,
                    name: "lem1802".into(),
                    description: "LEM1802 display".into(),
                },
            ]
        );

        let request = echo.join().unwrap();
        assert_eq!(request.packet_type, PacketType::LIST_CLASSES);
        assert_eq!(request.domain_id, 0);
    }

    #[test]
    fn list_classes_ignores_advisory_count() {
        let (client, server) = tcp_pair();
        let mut session = session_over(client);

        let echo = serve_one(server, |request| {
            let mut b = PacketBuilder::response_to(request);
            b.write_u16(5); // claims five entries
            b.write_u32(1);
            b.write_string("clock");
            b.write_string("Generic clock");
            b.finish()
        });

        let classes = session.list_classes().unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].name, "clock");

        echo.join().unwrap();
    }

    #[test]
    fn create_dt_returns_assigned_domain() {
        let (client, server) = tcp_pair();
        let mut session = session_over(client);

        let echo = serve_one(server, |request| {
            let mut b = PacketBuilder::new(
                7,
                0,
                request.packet_type.response(),
                request.transaction_id,
            );
            b.write_u32(0);
            b.finish()
        });

        let domain_id = session.create_dt("dev").unwrap();
        assert_eq!(domain_id, 7);

        let request = echo.join().unwrap();
        assert_eq!(request.packet_type, PacketType::CREATE_DT);
        assert_eq!(request.body_reader().read_string().as_ref(), b"dev");
    }

    #[test]
    fn attach_device_returns_assigned_device() {
        let (client, server) = tcp_pair();
        let mut session = session_over(client);

        let echo = serve_one(server, |request| {
            let mut b = PacketBuilder::new(
                request.domain_id,
                3,
                request.packet_type.response(),
                request.transaction_id,
            );
            b.write_u32(0);
            b.finish()
        });

        let device_id = session.attach_device(7, 12289).unwrap();
        assert_eq!(device_id, 3);

        let request = echo.join().unwrap();
        assert_eq!(request.domain_id, 7);
        assert_eq!(request.body_reader().read_u32(), 12289);
    }

    #[test]
    fn endpoint_error_status_surfaces() {
        let (client, server) = tcp_pair();
        let mut session = session_over(client);

        let echo = serve_one(server, |request| status_response(request, 3));

        let err = session.start_dt(1).unwrap_err();
        assert!(matches!(err, PeerError::Endpoint { code: 3 }));

        echo.join().unwrap();
    }

    #[test]
    fn empty_status_body_reads_as_success() {
        let (client, server) = tcp_pair();
        let mut session = session_over(client);

        let echo = serve_one(server, |request| {
            PacketBuilder::response_to(request).finish()
        });

        session.stop_dt(2).unwrap();
        echo.join().unwrap();
    }

    #[test]
    fn send_device_message_is_fire_and_forget() {
        let (client, server) = tcp_pair();
        let mut session = session_over(client);

        let echo = thread::spawn(move || {
            let mut reader = PacketReader::new(server.try_clone().unwrap());
            let mut writer = PacketWriter::new(server);

            let message = reader.read_packet().unwrap();
            assert_eq!(message.packet_type, PacketType::SEND_DEVICE_MESSAGE);
            assert_eq!(message.body.as_ref(), &[0x01, 0x7C, 0x30, 0x00]);

            // Only the follow-up request is answered.
            let request = reader.read_packet().unwrap();
            writer.send(&status_response(&request, 0)).unwrap();
        });

        session
            .send_device_message(7, 2, &[0x01, 0x7C, 0x30, 0x00])
            .unwrap();
        assert_eq!(session.in_flight_count(), 0);

        session.start_dt(7).unwrap();
        echo.join().unwrap();
    }

    #[test]
    fn sync_requests_track_subscriptions() {
        let (client, server) = tcp_pair();
        let mut session = session_over(client);

        let echo = thread::spawn(move || {
            let mut reader = PacketReader::new(server.try_clone().unwrap());
            let mut writer = PacketWriter::new(server);
            for _ in 0..3 {
                let request = reader.read_packet().unwrap();
                writer.send(&status_response(&request, 0)).unwrap();
            }
        });

        session.request_state_sync(7, 2).unwrap();
        session.request_mem_sync(7, 2).unwrap();
        assert_eq!(session.subscriptions().count(), 2);

        session.cancel_state_sync(7, 2).unwrap();
        let remaining: Vec<_> = session.subscriptions().collect();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].kind, SyncKind::Mem);

        echo.join().unwrap();
    }

    #[test]
    fn rejected_sync_request_leaves_no_subscription() {
        let (client, server) = tcp_pair();
        let mut session = session_over(client);

        let echo = serve_one(server, |request| status_response(request, 9));

        let err = session.request_mem_sync(1, 1).unwrap_err();
        assert!(matches!(err, PeerError::Endpoint { code: 9 }));
        assert_eq!(session.subscriptions().count(), 0);

        echo.join().unwrap();
    }
}
