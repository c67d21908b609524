use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};

use gemu_frame::{PacketReader, PacketWriter, WireError};
use tracing::debug;

use crate::error::{PeerError, Result};
use crate::session::{Session, SessionConfig};

/// A session over a TCP connection.
pub type TcpSession = Session<TcpStream, TcpStream>;

/// Connect to an emulation endpoint with default configuration.
pub fn connect(addr: impl ToSocketAddrs) -> Result<TcpSession> {
    connect_with_config(addr, &SessionConfig::default())
}

/// Connect with explicit configuration.
///
/// Each resolved address is tried in turn; the error for the last attempt
/// is returned if none succeeds. The stream is split into reader and
/// writer halves, with timeouts from the config applied to both.
pub fn connect_with_config(
    addr: impl ToSocketAddrs,
    config: &SessionConfig,
) -> Result<TcpSession> {
    let addrs = addr
        .to_socket_addrs()
        .map_err(|source| PeerError::Connect {
            addr: "<unresolved>".to_string(),
            source,
        })?;

    let mut last_err = None;
    for sockaddr in addrs {
        let attempt = match config.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&sockaddr, timeout),
            None => TcpStream::connect(sockaddr),
        };
        match attempt {
            Ok(stream) => {
                debug!(addr = %sockaddr, "connected to emulation endpoint");
                return session_from_stream(stream, config);
            }
            Err(source) => {
                last_err = Some(PeerError::Connect {
                    addr: sockaddr.to_string(),
                    source,
                });
            }
        }
    }

    Err(last_err.unwrap_or_else(|| PeerError::Connect {
        addr: "<unresolved>".to_string(),
        source: std::io::Error::new(ErrorKind::NotFound, "address resolved to nothing"),
    }))
}

fn session_from_stream(stream: TcpStream, config: &SessionConfig) -> Result<TcpSession> {
    // Control packets are small; don't let Nagle sit on them.
    stream.set_nodelay(true).map_err(WireError::from)?;
    stream
        .set_read_timeout(config.read_timeout)
        .map_err(WireError::from)?;
    stream
        .set_write_timeout(config.write_timeout)
        .map_err(WireError::from)?;

    let reader_stream = stream.try_clone().map_err(WireError::from)?;

    Ok(Session::from_parts(
        PacketReader::new(reader_stream),
        PacketWriter::new(stream),
        config.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    use gemu_frame::{PacketBuilder, PacketType};

    use super::*;

    #[test]
    fn connect_and_transact_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = PacketReader::new(stream.try_clone().unwrap());
            let mut writer = PacketWriter::new(stream);

            let request = reader.read_packet().unwrap();
            assert_eq!(request.packet_type, PacketType::STOP_DT);
            let mut b = PacketBuilder::response_to(&request);
            b.write_u32(0);
            writer.send(&b.finish()).unwrap();
        });

        let mut session = connect(addr).unwrap();
        session.stop_dt(1).unwrap();

        server.join().unwrap();
    }

    #[test]
    fn timeouts_from_config_apply_to_the_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let accepter = thread::spawn(move || listener.accept().unwrap());

        let config = SessionConfig {
            read_timeout: Some(Duration::from_millis(250)),
            write_timeout: Some(Duration::from_millis(500)),
            ..SessionConfig::default()
        };
        let session = connect_with_config(addr, &config).unwrap();
        let (reader, writer) = session.into_parts();

        assert_eq!(
            reader.get_ref().read_timeout().unwrap(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(
            writer.get_ref().write_timeout().unwrap(),
            Some(Duration::from_millis(500))
        );
        assert!(writer.get_ref().nodelay().unwrap());

        accepter.join().unwrap();
    }

    #[test]
    fn connect_failure_names_the_address() {
        // A listener bound and immediately dropped leaves a port that
        // refuses connections.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = connect(addr).unwrap_err();
        match err {
            PeerError::Connect { addr: reported, .. } => {
                assert_eq!(reported, addr.to_string());
            }
            other => panic!("expected a connect error, got {other}"),
        }
    }
}
