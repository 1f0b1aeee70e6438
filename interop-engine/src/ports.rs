//! Port leases. Each run holds one port exclusively until its processes are gone.

use std::collections::BTreeSet;
use std::net::{Ipv4Addr, TcpListener};
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::EngineError;

#[derive(Debug)]
struct Pool {
    free: BTreeSet<u16>,
    /// Last port handed out; leases rotate through the range so a port that
    /// was just released is the last to be reused.
    cursor: u16,
}

#[derive(Debug, Clone)]
pub struct PortAllocator {
    start: u16,
    end: u16,
    pool: Arc<Mutex<Pool>>,
}

impl PortAllocator {
    /// Ports `start..end`.
    pub fn new(start: u16, end: u16) -> Self {
        Self {
            start,
            end,
            pool: Arc::new(Mutex::new(Pool {
                free: (start..end).collect(),
                cursor: start.wrapping_sub(1),
            })),
        }
    }

    /// Leases the next free port after the last one handed out that no other
    /// process on the host is bound to.
    pub fn lease(&self) -> Result<PortLease, EngineError> {
        let mut pool = self.pool.lock();
        let port = pool
            .free
            .range((Bound::Excluded(pool.cursor), Bound::Unbounded))
            .chain(pool.free.range(..=pool.cursor))
            .copied()
            .find(|port| bindable(*port))
            .ok_or(EngineError::PortsExhausted {
                start: self.start,
                end: self.end,
            })?;
        pool.free.remove(&port);
        pool.cursor = port;
        Ok(PortLease {
            port,
            pool: Arc::clone(&self.pool),
        })
    }

    pub fn available(&self) -> usize {
        self.pool.lock().free.len()
    }

    pub fn is_free(&self, port: u16) -> bool {
        self.pool.lock().free.contains(&port)
    }
}

/// The listener is closed again right away.
fn bindable(port: u16) -> bool {
    match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)) {
        Ok(_) => true,
        Err(e) => {
            debug!("Skipping port {}: {}", port, e);
            false
        }
    }
}

/// Exclusive use of one port. Returned to the allocator on drop.
#[derive(Debug)]
pub struct PortLease {
    port: u16,
    pool: Arc<Mutex<Pool>>,
}

impl PortLease {
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        self.pool.lock().free.insert(self.port);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leases_are_exclusive_until_dropped() {
        let ports = PortAllocator::new(42400, 42402);
        let a = ports.lease().unwrap();
        let b = ports.lease().unwrap();
        assert_ne!(a.port(), b.port());
        assert!(matches!(
            ports.lease(),
            Err(EngineError::PortsExhausted { .. })
        ));

        let released = a.port();
        drop(a);
        assert!(ports.is_free(released));
        assert_eq!(ports.lease().unwrap().port(), released);
    }

    #[test]
    fn leases_rotate_through_the_range() {
        let ports = PortAllocator::new(42410, 42413);
        let first = ports.lease().unwrap().port();
        let second = ports.lease().unwrap().port();
        let third = ports.lease().unwrap().port();
        let fourth = ports.lease().unwrap().port();
        assert_eq!((first, second, third, fourth), (42410, 42411, 42412, 42410));
        assert_eq!(ports.available(), 3);
    }

    #[test]
    fn ports_bound_elsewhere_are_never_leased() {
        let taken = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 42421)).unwrap();
        let ports = PortAllocator::new(42420, 42423);

        let a = ports.lease().unwrap();
        let b = ports.lease().unwrap();
        assert_eq!((a.port(), b.port()), (42420, 42422));
        assert!(matches!(
            ports.lease(),
            Err(EngineError::PortsExhausted { .. })
        ));
        // still in the pool, just unusable while held
        assert!(ports.is_free(42421));

        drop(taken);
        assert_eq!(ports.lease().unwrap().port(), 42421);
    }
}
