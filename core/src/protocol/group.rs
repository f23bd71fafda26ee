//! Random multicast group selection
//!
//! Peers only see each other when they share a group, so a randomly drawn
//! group works as a cheap private channel. Every peer must be configured with
//! the same result.

use std::net::{Ipv4Addr, Ipv6Addr};

use rand::Rng;

/// A random group in the administratively scoped `239.0.0.0/8` block
pub fn random_ipv4_group() -> Ipv4Addr {
    let mut rng = rand::thread_rng();
    Ipv4Addr::new(239, rng.gen(), rng.gen(), rng.gen())
}

/// A random transient link-local group `ff12::n`
pub fn random_ipv6_group() -> Ipv6Addr {
    let n: u16 = rand::thread_rng().gen_range(1..=u16::MAX);
    Ipv6Addr::new(0xff12, 0, 0, 0, 0, 0, 0, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ipv4_group_is_scoped_multicast() {
        for _ in 0..32 {
            let group = random_ipv4_group();
            assert!(group.is_multicast());
            assert_eq!(group.octets()[0], 239);
        }
    }

    #[test]
    fn test_random_ipv6_group_is_multicast() {
        for _ in 0..32 {
            let group = random_ipv6_group();
            assert!(group.is_multicast());
            assert_eq!(group.segments()[0], 0xff12);
            assert_ne!(group.segments()[7], 0);
        }
    }
}
