use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::DeviceStream;

/// TCP transport to a comparator.
///
/// Resolves `address:port` and connects to the first resolved address that
/// accepts. There is no retry: a failed connect is reported to the caller.
pub struct TcpTransport;

impl TcpTransport {
    /// Connect using the OS default connect timeout.
    pub fn connect(address: &str, port: &str) -> Result<DeviceStream> {
        Self::connect_timeout(address, port, None)
    }

    /// Connect, bounding each connect attempt by `timeout` when given.
    pub fn connect_timeout(
        address: &str,
        port: &str,
        timeout: Option<Duration>,
    ) -> Result<DeviceStream> {
        let target = format!("{address}:{port}");
        let addrs = resolve(address, port)?;
        if addrs.is_empty() {
            return Err(TransportError::NoAddress { target });
        }

        let mut last_err = None;
        for addr in &addrs {
            let attempt = match timeout {
                Some(timeout) => TcpStream::connect_timeout(addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    // Command frames are tiny; don't let Nagle hold them back.
                    stream.set_nodelay(true)?;
                    info!(%addr, "connected to device");
                    return Ok(DeviceStream::from_tcp(stream));
                }
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Connect {
            target,
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no address attempted")
            }),
        })
    }
}

fn resolve(address: &str, port: &str) -> Result<Vec<SocketAddr>> {
    let target = format!("{address}:{port}");
    let port: u16 = port.trim().parse().map_err(|_| TransportError::Resolve {
        target: target.clone(),
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid port: {port}"),
        ),
    })?;

    let addrs = (address, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve { target, source })?;
    Ok(addrs.collect())
}
