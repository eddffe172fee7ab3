//! Agent identifiers and the allocator that issues them.

use std::fmt;

/// A unique agent identifier.
///
/// Non-negative values name chain agents, values at or below `-4` name free
/// agents, and `-1..=-3` are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentId(pub i64);

impl AgentId {
    /// The external operator. Only it may change the formation.
    pub const OPERATOR: Self = Self(-1);

    /// Fan-out address. The router decides the recipients by message kind.
    pub const BROADCAST: Self = Self(-2);

    /// Placeholder for an empty ledger side in dumps and wire formats.
    pub const NO_NEIGHBOR: Self = Self(-3);

    /// First id handed to a free agent.
    pub const FIRST_FREE: i64 = -4;

    /// Get the raw value.
    #[inline]
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// True for the operator, broadcast and no-neighbor sentinels.
    #[inline]
    pub const fn is_sentinel(&self) -> bool {
        self.0 < 0 && self.0 > Self::FIRST_FREE
    }

    /// True if this id belongs to the chain range.
    #[inline]
    pub const fn is_chain(&self) -> bool {
        self.0 >= 0
    }

    /// True if this id belongs to the free-agent range.
    #[inline]
    pub const fn is_free(&self) -> bool {
        self.0 <= Self::FIRST_FREE
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::OPERATOR => write!(f, "operator"),
            Self::BROADCAST => write!(f, "broadcast"),
            Self::NO_NEIGHBOR => write!(f, "none"),
            Self(id) => write!(f, "#{}", id),
        }
    }
}

/// Issues chain and free-agent ids from disjoint ranges.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next_chain: i64,
    next_free: i64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    /// Start both ranges from their first value.
    pub const fn new() -> Self {
        Self {
            next_chain: 0,
            next_free: AgentId::FIRST_FREE,
        }
    }

    /// Next chain id (0, 1, 2, ...).
    pub fn next_chain(&mut self) -> AgentId {
        let id = AgentId(self.next_chain);
        self.next_chain += 1;
        id
    }

    /// Next free-agent id (-4, -5, -6, ...).
    pub fn next_free(&mut self) -> AgentId {
        let id = AgentId(self.next_free);
        self.next_free -= 1;
        id
    }

    /// Number of chain ids issued so far.
    pub fn chain_issued(&self) -> usize {
        self.next_chain as usize
    }

    /// Number of free ids issued so far.
    pub fn free_issued(&self) -> usize {
        (AgentId::FIRST_FREE - self.next_free) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_disjoint() {
        let mut ids = IdAllocator::new();
        let chain: Vec<_> = (0..5).map(|_| ids.next_chain()).collect();
        let free: Vec<_> = (0..5).map(|_| ids.next_free()).collect();

        assert!(chain.iter().all(|id| id.is_chain() && !id.is_free() && !id.is_sentinel()));
        assert!(free.iter().all(|id| id.is_free() && !id.is_chain() && !id.is_sentinel()));
        assert_eq!(chain[0], AgentId(0));
        assert_eq!(free[0], AgentId(-4));
        assert_eq!(free[4], AgentId(-8));
        assert_eq!(ids.chain_issued(), 5);
        assert_eq!(ids.free_issued(), 5);
    }

    #[test]
    fn sentinels_are_reserved() {
        for id in [AgentId::OPERATOR, AgentId::BROADCAST, AgentId::NO_NEIGHBOR] {
            assert!(id.is_sentinel());
            assert!(!id.is_chain());
            assert!(!id.is_free());
        }
    }

    #[test]
    fn display_names_sentinels() {
        assert_eq!(AgentId::OPERATOR.to_string(), "operator");
        assert_eq!(AgentId(7).to_string(), "#7");
        assert_eq!(AgentId(-9).to_string(), "#-9");
    }
}
