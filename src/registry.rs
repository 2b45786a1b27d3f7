//! The multicast delegate registry.

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::store::{DelegateStore, Retention, Strategy};

/// A registry of delegates implementing the capability trait `T`, invoked as
/// a group.
///
/// The registry wraps one [`DelegateStore`] whose reference-strength policy
/// is chosen at construction and fixed for the registry's lifetime. By
/// default members are held weakly: a delegate whose last external [`Rc`] is
/// dropped stops receiving invocations on its own, with no unregistration
/// call.
///
/// None of the operations can fail. Removing a delegate that was never
/// added, or re-adding one that is still a live member, are silent no-ops;
/// callers that need to detect a rejected add can query [`contains`] after
/// the fact.
///
/// The registry is `!Send` and `!Sync`; sharing one across threads requires
/// external synchronization and a different reference type than [`Rc`], so
/// the compiler rules it out entirely.
///
/// [`contains`]: MulticastDelegate::contains
///
/// # Example
///
/// ```
/// use std::rc::Rc;
///
/// use multicast_delegate::MulticastDelegate;
///
/// trait Ping {
///     fn ping(&self);
/// }
///
/// struct Sensor;
///
/// impl Ping for Sensor {
///     fn ping(&self) {}
/// }
///
/// let registry: MulticastDelegate<dyn Ping> = MulticastDelegate::new();
/// let sensor: Rc<dyn Ping> = Rc::new(Sensor);
///
/// registry.add(sensor.clone());
/// registry.invoke(|delegate| delegate.ping());
/// assert!(registry.contains(&sensor));
/// ```
pub struct MulticastDelegate<T: ?Sized> {
    delegates: DelegateStore<T>,
}

impl<T: ?Sized> MulticastDelegate<T> {
    /// Creates a registry holding its delegates by weak reference.
    pub fn new() -> Self {
        MulticastDelegate::with_retention(Retention::Weak)
    }

    /// Creates a registry with an explicit weak or strong [`Retention`].
    ///
    /// With [`Retention::Strong`] the registry co-owns its delegates; they
    /// stay alive at least until removed, cleared, or the registry itself is
    /// dropped.
    pub fn with_retention(retention: Retention) -> Self {
        MulticastDelegate {
            delegates: DelegateStore::new(retention),
        }
    }

    /// Creates a registry governed by a custom [`Strategy`], which controls
    /// duplication at insertion time, the equality notion used by
    /// [`contains`](MulticastDelegate::contains) and
    /// [`remove`](MulticastDelegate::remove), and the strength of the stored
    /// duplicate.
    pub fn with_strategy(strategy: Strategy<T>) -> Self {
        MulticastDelegate {
            delegates: DelegateStore::with_strategy(strategy),
        }
    }

    /// Adds a delegate.
    ///
    /// Re-adding a delegate that is still a live member is a no-op, so a
    /// delegate is never invoked twice in one pass however many times it was
    /// added.
    pub fn add(&self, delegate: Rc<T>) {
        self.delegates.insert(&delegate);
    }

    /// Removes a previously added delegate. No-op if it is not a member.
    pub fn remove(&self, delegate: &Rc<T>) {
        self.delegates.erase(delegate);
    }

    /// Whether `delegate` is currently a live member.
    ///
    /// A weakly held delegate whose referent has been destroyed counts as
    /// absent, exactly as if it had never been added.
    pub fn contains(&self, delegate: &Rc<T>) -> bool {
        self.delegates.contains(delegate)
    }

    /// Calls `action` once for each currently live delegate.
    ///
    /// The pass runs over a snapshot taken at call time: a callback may add
    /// or remove delegates on this same registry without corrupting or
    /// affecting the in-progress pass; such mutations become visible to
    /// later calls. Callbacks run synchronously and in-line, in unspecified
    /// order. `action` has no error channel; a panic inside it unwinds out
    /// of `invoke` like any other panic.
    pub fn invoke(&self, mut action: impl FnMut(&T)) {
        let snapshot = self.delegates.live();
        trace!(live = snapshot.len(), "invoking delegates");
        for delegate in &snapshot {
            action(&**delegate);
        }
    }

    /// Snapshot of the live members, for diagnostics and tests.
    pub fn delegates(&self) -> Vec<Rc<T>> {
        self.delegates.live()
    }

    /// Number of slots held, counting weak slots whose referent is already
    /// gone but which have not been reaped yet.
    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    /// Whether the registry holds no slots at all.
    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }

    /// Removes every delegate, releasing any strong references held.
    pub fn clear(&self) {
        self.delegates.clear();
    }
}

impl<T: ?Sized> Default for MulticastDelegate<T> {
    fn default() -> Self {
        MulticastDelegate::new()
    }
}

impl<T: ?Sized> fmt::Debug for MulticastDelegate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MulticastDelegate")
            .field("delegates", &self.delegates)
            .finish()
    }
}
