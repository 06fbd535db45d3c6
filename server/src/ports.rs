//! Free-port discovery for game servers
//!
//! A port is considered free when a probe listener can bind it. The probe is
//! released right away and the game server binds the port later, so two
//! allocations racing for the same port are possible; the shuffled probe
//! order makes that unlikely.

use std::net::TcpListener;
use std::ops::Range;

use log::debug;
use rand::seq::SliceRandom;

#[derive(Debug, Clone)]
pub struct PortAllocator {
    host: String,
    range: Range<u16>,
}

impl PortAllocator {
    pub fn new(host: impl Into<String>, range: Range<u16>) -> Self {
        Self {
            host: host.into(),
            range,
        }
    }

    pub fn range(&self) -> &Range<u16> {
        &self.range
    }

    /// First bindable port in shuffled order, or `None` if every port in the
    /// range is taken.
    pub fn allocate(&self) -> Option<u16> {
        let mut candidates: Vec<u16> = self.range.clone().collect();
        candidates.shuffle(&mut rand::thread_rng());

        let port = candidates
            .into_iter()
            .find(|&port| TcpListener::bind((self.host.as_str(), port)).is_ok());
        debug!("Probed {}:{:?} -> {:?}", self.host, self.range, port);
        port
    }
}
