use log::debug;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};

pub const LOCK_PORT: u16 = 49152;

/// Holds a bound loopback port for the life of the process so a second copy
/// of the manager can tell it is not alone.
#[derive(Debug)]
pub struct InstanceLock {
    _listener: TcpListener,
}

impl InstanceLock {
    pub fn acquire() -> Option<Self> {
        Self::acquire_on(LOCK_PORT)
    }

    /// `None` means another instance holds the port.
    pub fn acquire_on(port: u16) -> Option<Self> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        match TcpListener::bind(addr) {
            Ok(listener) => Some(Self {
                _listener: listener,
            }),
            Err(err) => {
                debug!("instance lock on {addr} unavailable: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_holder_is_refused_until_release() {
        let probe = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let first = InstanceLock::acquire_on(port).expect("first lock");
        assert!(InstanceLock::acquire_on(port).is_none());
        drop(first);
        assert!(InstanceLock::acquire_on(port).is_some());
    }
}
