//! Reference-strength aware storage of delegate objects.
//!
//! This module provides the set-like container backing
//! [`MulticastDelegate`](crate::MulticastDelegate). Members are held in slots
//! whose strength is fixed when the store is created: weak slots never keep
//! their referent alive and lapse as soon as the last external [`Rc`] is
//! dropped, while strong slots co-own their referent. A custom [`Strategy`]
//! replaces allocation identity with a caller-supplied duplication function
//! and equality test.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use dyn_clone::DynClone;
use tracing::trace;

/// How a store holds on to its members.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Retention {
    /// Non-owning. A slot lapses as soon as the last external [`Rc`] to its
    /// referent is dropped; lapsed slots contribute nothing to invocation
    /// and are reaped lazily.
    #[default]
    Weak,
    /// Owning. The store keeps its members alive for at least as long as
    /// they remain in it.
    Strong,
}

/// A caller-supplied identity policy for a [`DelegateStore`].
///
/// The `duplicate` function runs at insertion time and its product is what
/// actually gets stored; the `equals` test replaces allocation identity for
/// `contains` and `erase`. The duplicate itself is held weakly or strongly
/// per the strategy's [`Retention`], independently of the equality notion.
///
/// Note that a weakly held duplicate lapses immediately unless something else
/// owns it, so duplication strategies are normally paired with
/// [`Retention::Strong`].
pub struct Strategy<T: ?Sized> {
    retention: Retention,
    duplicate: fn(&Rc<T>) -> Rc<T>,
    equals: fn(&T, &T) -> bool,
}

impl<T: ?Sized> Strategy<T> {
    /// Creates a strategy from a duplication function and an equality test.
    pub fn new(
        retention: Retention,
        duplicate: fn(&Rc<T>) -> Rc<T>,
        equals: fn(&T, &T) -> bool,
    ) -> Self {
        Strategy {
            retention,
            duplicate,
            equals,
        }
    }
}

impl<T: ?Sized + DynClone> Strategy<T> {
    /// Strategy that stores a deep copy of each inserted delegate, compared
    /// with `equals`.
    pub fn cloned(retention: Retention, equals: fn(&T, &T) -> bool) -> Self {
        Strategy::new(
            retention,
            |delegate| Rc::from(dyn_clone::clone_box(&**delegate)),
            equals,
        )
    }
}

impl<T: ?Sized> fmt::Debug for Strategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

enum Slot<T: ?Sized> {
    Weak(Weak<T>),
    Strong(Rc<T>),
}

impl<T: ?Sized> Slot<T> {
    fn wrap(retention: Retention, delegate: Rc<T>) -> Self {
        match retention {
            Retention::Weak => Slot::Weak(Rc::downgrade(&delegate)),
            Retention::Strong => Slot::Strong(delegate),
        }
    }

    /// `None` once the referent of a weak slot has been destroyed.
    fn upgrade(&self) -> Option<Rc<T>> {
        match self {
            Slot::Weak(weak) => weak.upgrade(),
            Slot::Strong(rc) => Some(rc.clone()),
        }
    }
}

enum Policy<T: ?Sized> {
    Identity(Retention),
    Custom(Strategy<T>),
}

impl<T: ?Sized> Policy<T> {
    fn retention(&self) -> Retention {
        match self {
            Policy::Identity(retention) => *retention,
            Policy::Custom(strategy) => strategy.retention,
        }
    }

    fn equals(&self, member: &Rc<T>, delegate: &Rc<T>) -> bool {
        match self {
            // Allocation identity. An `Rc` allocation's address cannot be
            // reused while any `Weak` to it survives, so this never aliases
            // a dead member with a new one.
            Policy::Identity(_) => Rc::ptr_eq(member, delegate),
            Policy::Custom(strategy) => (strategy.equals)(member, delegate),
        }
    }

    fn store_form(&self, delegate: &Rc<T>) -> Rc<T> {
        match self {
            Policy::Identity(_) => delegate.clone(),
            Policy::Custom(strategy) => (strategy.duplicate)(delegate),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Policy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Identity(retention) => f.debug_tuple("Identity").field(retention).finish(),
            Policy::Custom(strategy) => f.debug_tuple("Custom").field(strategy).finish(),
        }
    }
}

/// An unordered set of delegates held weakly, strongly, or per a custom
/// [`Strategy`], with the policy fixed at construction.
///
/// All operations are infallible: inserting an existing member, erasing an
/// absent one, or querying a lapsed slot degrade to no-ops rather than
/// errors. The slot list sits behind a [`RefCell`] so every operation takes
/// `&self`, which is what allows mutation from inside an invocation pass.
pub struct DelegateStore<T: ?Sized> {
    policy: Policy<T>,
    slots: RefCell<Vec<Slot<T>>>,
}

impl<T: ?Sized> DelegateStore<T> {
    /// Creates an empty store holding members with the given [`Retention`].
    pub fn new(retention: Retention) -> Self {
        DelegateStore {
            policy: Policy::Identity(retention),
            slots: RefCell::new(Vec::new()),
        }
    }

    /// Creates an empty store governed by a custom [`Strategy`].
    pub fn with_strategy(strategy: Strategy<T>) -> Self {
        DelegateStore {
            policy: Policy::Custom(strategy),
            slots: RefCell::new(Vec::new()),
        }
    }

    /// Adds `delegate` unless an equal live member is already present.
    ///
    /// Set semantics: re-inserting a live member is a no-op, so one
    /// invocation pass calls each member at most once no matter how many
    /// times it was inserted. Lapsed slots are reaped on the way.
    pub fn insert(&self, delegate: &Rc<T>) {
        let mut slots = self.slots.borrow_mut();
        slots.retain(|slot| !matches!(slot, Slot::Weak(weak) if weak.strong_count() == 0));
        let present = slots
            .iter()
            .filter_map(Slot::upgrade)
            .any(|member| self.policy.equals(&member, delegate));
        if present {
            return;
        }
        let stored = self.policy.store_form(delegate);
        slots.push(Slot::wrap(self.policy.retention(), stored));
        trace!(members = slots.len(), "delegate added");
    }

    /// Removes every live member equal to `delegate`, along with any lapsed
    /// slots. No-op if nothing matches.
    pub fn erase(&self, delegate: &Rc<T>) {
        let mut slots = self.slots.borrow_mut();
        let before = slots.len();
        slots.retain(|slot| {
            slot.upgrade()
                .is_some_and(|member| !self.policy.equals(&member, delegate))
        });
        if slots.len() != before {
            trace!(members = slots.len(), "delegate removed");
        }
    }

    /// Whether a live member equal to `delegate` exists.
    ///
    /// A lapsed slot is indistinguishable from one that was never inserted;
    /// no cleanup pass is required first.
    pub fn contains(&self, delegate: &Rc<T>) -> bool {
        self.slots
            .borrow()
            .iter()
            .filter_map(Slot::upgrade)
            .any(|member| self.policy.equals(&member, delegate))
    }

    /// Snapshot of the currently live members, lapsed slots skipped.
    ///
    /// Order is unspecified and may differ from insertion order.
    pub fn live(&self) -> Vec<Rc<T>> {
        self.slots.borrow().iter().filter_map(Slot::upgrade).collect()
    }

    /// Number of slots held, counting lapsed slots not yet reaped.
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Whether the store holds no slots at all.
    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    /// Drops every slot, releasing any strong co-ownership.
    pub fn clear(&self) {
        self.slots.borrow_mut().clear();
    }
}

impl<T: ?Sized> Default for DelegateStore<T> {
    fn default() -> Self {
        DelegateStore::new(Retention::Weak)
    }
}

impl<T: ?Sized> fmt::Debug for DelegateStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateStore")
            .field("policy", &self.policy)
            .field("slots", &self.len())
            .finish()
    }
}
