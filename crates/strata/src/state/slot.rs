use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

/// Transactional state owned by an extension.
///
/// A slot keeps a *committed* view and an *uncommitted* view on top of it. The
/// engine drives the transitions while it backtracks:
///
/// | operation  | effect                                                         |
/// |------------|----------------------------------------------------------------|
/// | `snapshot` | capture both views                                             |
/// | `restore`  | go back to a snapshot (the expression failed)                  |
/// | `uncommit` | keep the contents, but move the commit point back to a snapshot |
/// | `discard`  | drop the uncommitted view                                      |
/// | `commit`   | make the uncommitted view part of the committed view           |
/// | `extract`  | the uncommitted view as a replayable delta                     |
/// | `merge`    | append a delta to the uncommitted view                         |
///
/// When an expression is invoked the uncommitted view is empty. When it
/// succeeds, the uncommitted view holds exactly what the expression did, and
/// `extract` returns it for memoization or seed growing.
///
/// State that affects what later expressions match (not only what they
/// produce) must be folded into [`StateSlot::fingerprint`], otherwise memoized
/// outcomes may be replayed where they do not apply.
pub trait StateSlot: 'static {
    type Snapshot: 'static;
    type Delta: Clone + 'static;

    fn snapshot(&self) -> Self::Snapshot;
    fn restore(&mut self, snapshot: &Self::Snapshot);
    fn uncommit(&mut self, snapshot: &Self::Snapshot);
    fn discard(&mut self);
    fn commit(&mut self);
    fn extract(&self) -> Option<Self::Delta>;
    fn merge(&mut self, delta: &Self::Delta);

    fn fingerprint(&self) -> u64 {
        0
    }
}

/// Object-safe face of [`StateSlot`], used to store heterogeneous slots.
pub(crate) trait ErasedSlot {
    fn snapshot(&self) -> Box<dyn Any>;
    fn restore(&mut self, snapshot: &dyn Any);
    fn uncommit(&mut self, snapshot: &dyn Any);
    fn discard(&mut self);
    fn commit(&mut self);
    fn extract(&self) -> Option<Rc<dyn Any>>;
    fn merge(&mut self, delta: &dyn Any);
    fn fingerprint(&self) -> u64;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

fn downcast<S, T: 'static>(value: &dyn Any) -> &T {
    value.downcast_ref::<T>().unwrap_or_else(|| {
        panic!(
            "slot {} was handed a {} it did not produce",
            type_name::<S>(),
            type_name::<T>()
        )
    })
}

impl<S: StateSlot> ErasedSlot for S {
    fn snapshot(&self) -> Box<dyn Any> {
        Box::new(StateSlot::snapshot(self))
    }

    fn restore(&mut self, snapshot: &dyn Any) {
        StateSlot::restore(self, downcast::<S, S::Snapshot>(snapshot));
    }

    fn uncommit(&mut self, snapshot: &dyn Any) {
        StateSlot::uncommit(self, downcast::<S, S::Snapshot>(snapshot));
    }

    fn discard(&mut self) {
        StateSlot::discard(self);
    }

    fn commit(&mut self) {
        StateSlot::commit(self);
    }

    fn extract(&self) -> Option<Rc<dyn Any>> {
        StateSlot::extract(self).map(|delta| Rc::new(delta) as Rc<dyn Any>)
    }

    fn merge(&mut self, delta: &dyn Any) {
        StateSlot::merge(self, downcast::<S, S::Delta>(delta));
    }

    fn fingerprint(&self) -> u64 {
        StateSlot::fingerprint(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Typed handle to a registered extension slot.
pub struct SlotId<S> {
    index: usize,
    _slot: PhantomData<fn() -> S>,
}

impl<S> SlotId<S> {
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

impl<S> Clone for SlotId<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for SlotId<S> {}

impl<S> PartialEq for SlotId<S> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<S> Eq for SlotId<S> {}

impl<S> fmt::Debug for SlotId<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotId<{}>({})", type_name::<S>(), self.index)
    }
}

type SlotSupplier = Arc<dyn Fn() -> Box<dyn ErasedSlot> + Send + Sync>;

/// Suppliers of extension slots, instantiated fresh for every parse.
#[derive(Clone, Default)]
pub struct SlotRegistry {
    suppliers: Vec<SlotSupplier>,
}

impl SlotRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a slot supplier and return the handle used to reach the slot
    /// from a [`crate::engine::MatchContext`] or a [`super::ParseState`].
    pub fn register<S, F>(&mut self, supplier: F) -> SlotId<S>
    where
        S: StateSlot,
        F: Fn() -> S + Send + Sync + 'static,
    {
        let index = self.suppliers.len();
        self.suppliers
            .push(Arc::new(move || Box::new(supplier()) as Box<dyn ErasedSlot>));
        SlotId {
            index,
            _slot: PhantomData,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.suppliers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suppliers.is_empty()
    }

    pub(crate) fn instantiate(&self) -> Vec<Box<dyn ErasedSlot>> {
        self.suppliers.iter().map(|supply| supply()).collect()
    }
}

impl fmt::Debug for SlotRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotRegistry")
            .field("slots", &self.suppliers.len())
            .finish()
    }
}
