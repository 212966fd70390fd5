//! Invariant checking for store state.
//!
//! Invariants are properties that must hold after every store operation,
//! whatever sequence of operations led there. Unlike example-based tests
//! that check specific scenarios, they verify structural properties across
//! arbitrary operation sequences.
//!
//! # Architecture
//!
//! Observable state is extracted from a store and its storage backend into a
//! [`StoreSnapshot`], then registered [`Invariant`] checks run against it.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let mut snapshot = StoreSnapshot::default();
//! snapshot.observe(&store);
//! registry.assert_all(&snapshot, "after append");
//! ```

mod checks;
mod snapshot;

pub use checks::{
    NoEmptyReactionSets, SessionPairPersisted, StatusMonotonicity, UniqueMessageIds,
    UnreadKeysNormalized, UnreadPersisted,
};
pub use snapshot::StoreSnapshot;

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property that can be checked against a store snapshot.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against the snapshot.
    fn check(&self, state: &StoreSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the store's structural invariants.
    ///
    /// Includes:
    /// - [`UniqueMessageIds`]: no message id appears twice
    /// - [`NoEmptyReactionSets`]: every stored emoji has a reactor
    /// - [`SessionPairPersisted`]: identity and token persist together
    /// - [`UnreadKeysNormalized`]: unread keys are trimmed and non-blank
    /// - [`UnreadPersisted`]: the persisted unread map matches memory
    /// - [`StatusMonotonicity`]: delivery status never moves backwards
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(UniqueMessageIds);
        registry.add(NoEmptyReactionSets);
        registry.add(SessionPairPersisted);
        registry.add(UnreadKeysNormalized);
        registry.add(UnreadPersisted);
        registry.add(StatusMonotonicity);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &StoreSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation found.
    ///
    /// # Panics
    ///
    /// If any invariant is violated.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &StoreSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
