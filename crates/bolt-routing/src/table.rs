use crate::address::Address;
use bolt_connection::AccessMode;
use std::time::{Duration, Instant};

/// A time-limited, role-partitioned listing of cluster members (spec.md
/// §3 RoutingTable). Replaced wholesale on successful rediscovery;
/// individual-member `forget*` calls mutate a table in place.
///
/// Each role's members are kept in insertion order and rotated
/// round-robin by [`RoutingTable::next`] — insertion order is the
/// rotation order spec.md §3 specifies, not an incidental detail.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    routers: Vec<Address>,
    readers: Vec<Address>,
    writers: Vec<Address>,
    expires_at: Instant,
    reader_cursor: usize,
    writer_cursor: usize,
}

impl RoutingTable {
    pub fn new(routers: Vec<Address>, readers: Vec<Address>, writers: Vec<Address>, ttl: Duration) -> Self {
        RoutingTable {
            routers,
            readers,
            writers,
            expires_at: saturating_deadline(ttl),
            reader_cursor: 0,
            writer_cursor: 0,
        }
    }

    /// An empty table that is always stale — the state a freshly
    /// constructed routing driver starts from before its first
    /// rediscovery.
    pub fn empty() -> Self {
        RoutingTable::new(Vec::new(), Vec::new(), Vec::new(), Duration::ZERO)
    }

    pub fn routers(&self) -> &[Address] {
        &self.routers
    }

    pub fn readers(&self) -> &[Address] {
        &self.readers
    }

    pub fn writers(&self) -> &[Address] {
        &self.writers
    }

    /// spec.md §3: stale when `now >= expiresAt`, or routers is empty,
    /// or the requested role's set is empty.
    pub fn is_stale_for(&self, role: AccessMode) -> bool {
        Instant::now() >= self.expires_at
            || self.routers.is_empty()
            || match role {
                AccessMode::Read => self.readers.is_empty(),
                AccessMode::Write => self.writers.is_empty(),
            }
    }

    /// Round-robin the next member for `role`, advancing the cursor.
    /// `None` if that role's set is empty.
    pub fn next(&mut self, role: AccessMode) -> Option<Address> {
        match role {
            AccessMode::Read => next_round_robin(&self.readers, &mut self.reader_cursor),
            AccessMode::Write => next_round_robin(&self.writers, &mut self.writer_cursor),
        }
    }

    /// Remove `address` from readers and writers, never from routers
    /// (spec.md §3: "routers remain reachable for subsequent
    /// rediscovery even if their read/write role failed"). Idempotent.
    pub fn forget(&mut self, address: &Address) {
        self.readers.retain(|a| a != address);
        self.writers.retain(|a| a != address);
        self.reader_cursor = 0;
        self.writer_cursor = 0;
    }

    pub fn forget_router(&mut self, address: &Address) {
        self.routers.retain(|a| a != address);
    }

    pub fn forget_writer(&mut self, address: &Address) {
        self.writers.retain(|a| a != address);
        self.writer_cursor = 0;
    }
}

fn next_round_robin(members: &[Address], cursor: &mut usize) -> Option<Address> {
    if members.is_empty() {
        return None;
    }
    let idx = *cursor % members.len();
    *cursor = cursor.wrapping_add(1);
    Some(members[idx].clone())
}

/// `now + ttl`, saturating at `Instant`'s representable maximum instead
/// of panicking on overflow (spec.md §4.I TTL safety). A non-positive
/// `ttl` yields a deadline that is already in the past, which is exactly
/// "treat the table as already stale".
fn saturating_deadline(ttl: Duration) -> Instant {
    Instant::now().checked_add(ttl).unwrap_or_else(far_future)
}

fn far_future() -> Instant {
    // `Instant` has no public "max" constructor; repeatedly doubling a
    // checked_add from `now` converges on the platform's representable
    // ceiling without panicking.
    let mut deadline = Instant::now();
    let mut step = Duration::from_secs(365 * 24 * 3600);
    while let Some(next) = deadline.checked_add(step) {
        deadline = next;
        if let Some(doubled) = step.checked_mul(2) {
            step = doubled;
        } else {
            break;
        }
    }
    deadline
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u16) -> Address {
        Address::new("h", n)
    }

    #[test]
    fn stale_when_routers_empty() {
        let table = RoutingTable::new(vec![], vec![addr(1)], vec![addr(2)], Duration::from_secs(300));
        assert!(table.is_stale_for(AccessMode::Read));
        assert!(table.is_stale_for(AccessMode::Write));
    }

    #[test]
    fn stale_when_role_set_empty() {
        let table = RoutingTable::new(vec![addr(0)], vec![], vec![addr(2)], Duration::from_secs(300));
        assert!(table.is_stale_for(AccessMode::Read));
        assert!(!table.is_stale_for(AccessMode::Write));
    }

    #[test]
    fn stale_when_ttl_elapsed() {
        let table = RoutingTable::new(vec![addr(0)], vec![addr(1)], vec![addr(2)], Duration::ZERO);
        assert!(table.is_stale_for(AccessMode::Read));
    }

    #[test]
    fn next_rotates_round_robin() {
        let mut table =
            RoutingTable::new(vec![addr(0)], vec![addr(1), addr(2), addr(3)], vec![], Duration::from_secs(60));
        assert_eq!(table.next(AccessMode::Read), Some(addr(1)));
        assert_eq!(table.next(AccessMode::Read), Some(addr(2)));
        assert_eq!(table.next(AccessMode::Read), Some(addr(3)));
        assert_eq!(table.next(AccessMode::Read), Some(addr(1)));
    }

    #[test]
    fn forget_removes_from_readers_and_writers_not_routers() {
        let mut table =
            RoutingTable::new(vec![addr(0)], vec![addr(1), addr(2)], vec![addr(1)], Duration::from_secs(60));
        table.forget(&addr(1));
        assert_eq!(table.readers(), &[addr(2)]);
        assert!(table.writers().is_empty());
        assert_eq!(table.routers(), &[addr(0)]);
        // idempotent
        table.forget(&addr(1));
        assert_eq!(table.readers(), &[addr(2)]);
    }

    #[test]
    fn forget_router_only_affects_routers() {
        let mut table =
            RoutingTable::new(vec![addr(0), addr(1)], vec![addr(1)], vec![], Duration::from_secs(60));
        table.forget_router(&addr(1));
        assert_eq!(table.routers(), &[addr(0)]);
        assert_eq!(table.readers(), &[addr(1)]);
    }

    #[test]
    fn forget_writer_only_affects_writers() {
        let mut table = RoutingTable::new(vec![addr(0)], vec![addr(1)], vec![addr(1)], Duration::from_secs(60));
        table.forget_writer(&addr(1));
        assert!(table.writers().is_empty());
        assert_eq!(table.readers(), &[addr(1)]);
    }
}
