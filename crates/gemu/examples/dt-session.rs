//! Drive one device-tree lifecycle against a scripted in-process endpoint.
//!
//! Run with:
//!   cargo run --example dt-session --features peer
//!
//! A mock endpoint thread answers every request with a success status so
//! the whole flow — create, attach, message, start, sync, teardown — runs
//! without a real emulation server.

use std::net::TcpListener;
use std::thread;

use gemu::frame::{PacketBuilder, PacketReader, PacketType, PacketWriter};
use gemu::peer::connect;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    let endpoint = thread::spawn(move || serve_one_session(listener));

    let mut session = connect(addr)?;

    let classes = session.list_classes()?;
    for class in &classes {
        eprintln!("class {:>5}  {:<10} {}", class.id, class.name, class.description);
    }

    let domain = session.create_dt("demo")?;
    eprintln!("created device tree {domain}");

    let dcpu = session.attach_device(domain, 12289)?;
    eprintln!("attached dcpu as device {dcpu}");

    // A tiny program image: word count followed by the words.
    let mut image = PacketBuilder::new(0, 0, PacketType::SEND_DEVICE_MESSAGE, 0);
    image.write_u16(2);
    image.write_words(&[0x7C01, 0x0030]);
    session.send_device_message(domain, dcpu, &image.finish().body)?;

    session.start_dt(domain)?;
    session.request_state_sync(domain, dcpu)?;
    eprintln!("running with {} active subscription(s)", session.subscriptions().count());

    session.cancel_state_sync(domain, dcpu)?;
    session.stop_dt(domain)?;
    session.delete_dt(domain)?;
    eprintln!("device tree {domain} torn down");

    endpoint.join().expect("endpoint thread panicked");
    Ok(())
}

/// Accept one connection and answer requests until it closes.
fn serve_one_session(listener: TcpListener) {
    let (stream, _) = listener.accept().expect("accept failed");
    let mut reader = PacketReader::new(stream.try_clone().expect("clone failed"));
    let mut writer = PacketWriter::new(stream);

    let mut next_domain = 7u32;
    let mut next_device = 1u16;

    while let Ok(request) = reader.read_packet() {
        let response = match request.packet_type {
            PacketType::LIST_CLASSES => {
                let mut b = PacketBuilder::response_to(&request);
                b.write_u16(2);
                b.write_u32(12289);
                b.write_string("dcpu");
                b.write_string("DCPU-16 processor");
                b.write_u32(6);
                b.write_string("lem1802");
                b.write_string("LEM1802 display");
                b.finish()
            }
            PacketType::CREATE_DT => {
                let domain = next_domain;
                next_domain += 1;
                let mut b = PacketBuilder::new(
                    domain,
                    0,
                    request.packet_type.response(),
                    request.transaction_id,
                );
                b.write_u32(0);
                b.finish()
            }
            PacketType::ATTACH_DT_DEVICE => {
                let device = next_device;
                next_device += 1;
                let mut b = PacketBuilder::new(
                    request.domain_id,
                    device,
                    request.packet_type.response(),
                    request.transaction_id,
                );
                b.write_u32(0);
                b.finish()
            }
            PacketType::SEND_DEVICE_MESSAGE => continue, // no response
            _ => {
                let mut b = PacketBuilder::response_to(&request);
                b.write_u32(0);
                b.finish()
            }
        };
        if writer.send(&response).is_err() {
            break;
        }
    }
}
