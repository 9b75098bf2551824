//! A single, move-only navigator over one observed [`Shared<T>`] slot.
//!
//! A `Cursor` is built over a root handle and then grown one step at a
//! time by [`step_offset`](Cursor::step_offset) / [`step_fn`](Cursor::step_fn),
//! each of which consumes the cursor it is built from and returns a new
//! one observing the child slot. Copying a cursor is forbidden: two live
//! cursors over the same spine could issue conflicting write
//! propagations.
//!
//! A step's child need not share its parent's type: stepping from a
//! `Cursor<'a, Scene>` into a `Shared<Layer>` field yields a
//! `Cursor<'a, Layer>`. The type parameter always names whatever the
//! cursor's *currently observed slot* holds, not a fixed type for the whole
//! chain — this is exactly the "`shared<U>` field within the parent"
//! stepping spec.md documents, expressed as a change of type on a
//! consumed-and-returned cursor rather than a runtime check.

use std::any::TypeId;
use std::marker::PhantomData;
use std::ops::Deref;

use crate::nav::Path;
use crate::shared::Shared;

/// A move-only navigator observing one slot of a (possibly deeper) path
/// rooted at some `Shared<Root>`. `T` names the type of the slot this
/// cursor currently observes, which changes on every [`step_offset`]/
/// [`step_fn`] call.
///
/// [`step_offset`]: Cursor::step_offset
/// [`step_fn`]: Cursor::step_fn
///
/// See the [module documentation](self) for the step-building protocol.
pub struct Cursor<'a, T: 'static> {
    path: Path<'a>,
    _marker: PhantomData<&'a T>,
}

impl<'a, T: 'static> Cursor<'a, T> {
    /// Build a root cursor observing `root` itself.
    pub fn new(root: &'a mut Shared<T>) -> Self
    where
        T: Clone,
    {
        Cursor {
            path: Path::new(root),
            _marker: PhantomData,
        }
    }

    /// Build a child cursor over a fixed field within the parent's current
    /// payload, identified by a pointer-into-parent captured at
    /// construction. The offset is recomputed on every re-derivation by
    /// re-applying this same byte offset to the parent's (possibly new)
    /// address. The field's type `Child` may differ from `T`.
    ///
    /// # Panics (debug only)
    ///
    /// Debug-asserts that `field` genuinely lives inside the parent's
    /// current payload.
    #[must_use]
    pub fn step_offset<Child: Clone + 'static>(mut self, field: &Shared<Child>) -> Cursor<'a, Child>
    where
        T: Clone,
    {
        self.path.push_offset::<T, Child>(field);
        Cursor {
            path: self.path,
            _marker: PhantomData,
        }
    }

    /// Build a child cursor over a slot chosen by a pure projection from
    /// the parent's payload. The field's type `Child` may differ from `T`.
    #[must_use]
    pub fn step_fn<Child, F>(mut self, f: F) -> Cursor<'a, Child>
    where
        Child: Clone + 'static,
        F: Fn(&T) -> Option<&Shared<Child>> + 'static,
    {
        self.path.push::<T, Child, F>(f);
        Cursor {
            path: self.path,
            _marker: PhantomData,
        }
    }

    fn here_shared(&self) -> Option<&Shared<T>> {
        // SAFETY: the observed slot, when set, always points at a `Shared<T>`
        // that outlives this cursor (either the caller's root, or a field
        // inside a payload kept alive by an ancestor handle in the chain);
        // `T` is exactly the type this level was pushed/rooted with, since
        // every step constructor above is generic over the level it
        // produces.
        self.path.here().map(|ptr| unsafe { ptr.cast::<Shared<T>>().as_ref() })
    }

    /// The immutable view of the observed slot's payload, or `None` if
    /// the slot itself is empty or unreachable.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.here_shared().and_then(Shared::get)
    }

    /// `true` if the observed slot refers to a live payload.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.here_shared().is_some_and(Shared::is_set)
    }

    /// Relaxed refcount of the observed slot's payload, or 0 if empty.
    #[must_use]
    pub fn use_count(&self) -> usize {
        self.here_shared().map_or(0, Shared::use_count)
    }

    /// Dynamic type identity of the observed slot's payload, or `None`.
    #[must_use]
    pub fn type_info(&self) -> Option<TypeId> {
        self.here_shared().and_then(Shared::type_info)
    }

    /// Propagate a write down to the observed slot, cloning any
    /// unmaterialized ancestors along the way.
    ///
    /// Returns `None` if the slot is (or became) empty. A cursor only
    /// ever materializes once; subsequent calls reuse the cached slot
    /// and its address, cloning again only if some other handle aliased
    /// it in the meantime.
    pub fn write(&mut self) -> Option<&mut T>
    where
        T: Clone,
    {
        self.path.write::<T>()
    }
}

impl<'a, T: 'static> Deref for Cursor<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.get().expect("Cursor::deref on an unset slot")
    }
}
