//! Rate-limited liveness check against the platform.

use parking_lot::Mutex;
use tracing::{info, warn};

#[derive(Debug)]
struct ProbeState {
    requests_since_probe: u64,
    online: bool,
}

/// Caches the platform's reachability and only probes the network once every
/// `max_requests_before_probe + 1` calls.
///
/// Shared between the handshake, the transport and the receiver thread; the
/// counter and cached value live behind one lock so a probe is never lost or
/// duplicated.
#[derive(Debug)]
pub struct ConnectivityProbe {
    state: Mutex<ProbeState>,
    max_requests_before_probe: u64,
}

impl ConnectivityProbe {
    pub fn new(max_requests_before_probe: u32) -> Self {
        let max_requests_before_probe = u64::from(max_requests_before_probe);
        Self {
            state: Mutex::new(ProbeState {
                // Start past the threshold so the first call always probes.
                requests_since_probe: max_requests_before_probe + 1,
                online: false,
            }),
            max_requests_before_probe,
        }
    }

    /// Return the cached reachability, running `probe` when the counter is exhausted.
    ///
    /// `probe` reports failures of any kind as `false`.
    pub fn is_online(&self, probe: impl FnOnce() -> bool) -> bool {
        let mut state = self.state.lock();
        if state.requests_since_probe >= self.max_requests_before_probe {
            let online = probe();
            if online != state.online {
                if online {
                    info!("platform is online");
                } else {
                    warn!("platform is offline");
                }
            }
            state.online = online;
            state.requests_since_probe = 0;
        } else {
            state.requests_since_probe += 1;
        }
        state.online
    }
}
