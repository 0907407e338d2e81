//! Port discovery: linear scan from a default, used when no managed
//! container exists yet and a fresh one must be launched (spec §4.8 step 4).

use cv_core::{CvError, Result};
use std::net::TcpListener;

const SCAN_ATTEMPTS: u16 = 100;

pub fn find_available_port(start: u16) -> Result<u16> {
    for offset in 0..SCAN_ATTEMPTS {
        let candidate = start.saturating_add(offset);
        if TcpListener::bind(("127.0.0.1", candidate)).is_ok() {
            return Ok(candidate);
        }
    }
    Err(CvError::io(format!(
        "no available port found scanning {start}..{}",
        start.saturating_add(SCAN_ATTEMPTS)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_a_bindable_port_from_default() {
        let port = find_available_port(40000).unwrap();
        assert!(port >= 40000);
    }

    #[test]
    fn skips_a_port_already_in_use() {
        let held = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let busy_port = held.local_addr().unwrap().port();
        let found = find_available_port(busy_port).unwrap();
        assert_ne!(found, busy_port);
    }
}
