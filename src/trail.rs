//! A growable, ordered sequence of navigation steps rooted at an anchor.
//!
//! Where [`Cursor`](crate::Cursor) is move-only and grows by consuming
//! itself one step at a time (so its type parameter can simply change to
//! whatever the new leaf holds), `Trail` owns the whole chain in place and
//! lets callers grow, shrink, and re-root it through `&mut self`. That
//! mutate-in-place shape cannot change `Trail<'a, Root>`'s own type
//! parameter on every push, so a trail that steps into a field of a
//! *different* type than `Root` (spec.md §3's "objects may contain further
//! `shared<U>` fields") is grown with the `_as` methods below, which carry
//! the parent/child types explicitly and are checked against the path's
//! actually-tracked type at the `debug_assert!` level the rest of this
//! crate uses for precondition violations — the same trust model
//! `Shared::dynamic` already uses for its `TypeId` check. The plain
//! (non-`_as`) methods remain the ergonomic common case: a trail that never
//! leaves `Root`'s type, exactly as before.

use std::any::TypeId;
use std::marker::PhantomData;

use crate::nav::Path;
use crate::shared::Shared;

/// An owned, mutable sequence of navigation levels rooted at an anchor
/// `Shared<Root>`. `Root` is the type most of this trail's convenience
/// methods assume the current leaf holds; see the [module
/// documentation](self) for stepping into a different type.
pub struct Trail<'a, Root: 'static> {
    path: Path<'a>,
    _marker: PhantomData<&'a Root>,
}

impl<'a, Root: 'static> Trail<'a, Root> {
    /// Start a trail of size 1, observing `anchor` itself.
    pub fn new(anchor: &'a mut Shared<Root>) -> Self
    where
        Root: Clone,
    {
        Trail {
            path: Path::new(anchor),
            _marker: PhantomData,
        }
    }

    /// Number of levels, including the root.
    #[must_use]
    pub fn size(&self) -> usize {
        self.path.size()
    }

    /// Append a level over a fixed field within the current back's
    /// payload (assumed to be a `Root`), identified by a pointer-into-parent
    /// captured now.
    ///
    /// # Panics (debug only)
    ///
    /// Debug-asserts `field` lives inside the current back's payload and
    /// that the current back is in fact a `Root`.
    pub fn push(&mut self, field: &Shared<Root>)
    where
        Root: Clone,
    {
        self.path.push_offset::<Root, Root>(field);
    }

    /// Append a level chosen by a pure projection from the current back's
    /// payload (assumed to be a `Root`).
    pub fn push_fn<F>(&mut self, f: F)
    where
        Root: Clone,
        F: Fn(&Root) -> Option<&Shared<Root>> + 'static,
    {
        self.path.push::<Root, Root, F>(f);
    }

    /// Append a level built from an arbitrary step rule (assumed to stay
    /// within `Root`).
    ///
    /// The generalized `emplace<CursorKind>(args…)` factory in the
    /// original model is collapsed here, since this crate has only the
    /// two step kinds `push` and `push_fn` materialize; `emplace` is
    /// kept as a synonym for callers porting that call site directly.
    pub fn emplace<F>(&mut self, f: F)
    where
        Root: Clone,
        F: Fn(&Root) -> Option<&Shared<Root>> + 'static,
    {
        self.push_fn(f);
    }

    /// Append a level over a fixed field within the current back's
    /// payload, where the current back holds a `Parent` (possibly not
    /// `Root`) and the field holds a `Child` (possibly not `Parent`).
    ///
    /// # Panics (debug only)
    ///
    /// Debug-asserts `field` lives inside the current back's payload and
    /// that the current back is in fact a `Parent`.
    pub fn push_offset_as<Parent, Child>(&mut self, field: &Shared<Child>)
    where
        Parent: 'static,
        Child: Clone + 'static,
    {
        self.path.push_offset::<Parent, Child>(field);
    }

    /// Append a level chosen by a pure projection `Parent -> Option<&Shared<Child>>`,
    /// where the current back holds a `Parent` (possibly not `Root`) and the
    /// projected field holds a `Child` (possibly not `Parent`).
    ///
    /// # Panics (debug only)
    ///
    /// Debug-asserts that the current back is in fact a `Parent`.
    pub fn push_fn_as<Parent, Child, F>(&mut self, f: F)
    where
        Parent: 'static,
        Child: Clone + 'static,
        F: Fn(&Parent) -> Option<&Shared<Child>> + 'static,
    {
        self.path.push::<Parent, Child, F>(f);
    }

    /// Remove `k` levels from the back (all but the root if `k` exceeds
    /// the removable count), re-synchronizing the observed slot.
    pub fn pop(&mut self, k: usize) {
        self.path.pop(k);
    }

    /// Truncate to `n` levels. A no-op if `n >= size()`.
    pub fn resize(&mut self, n: usize) {
        self.path.resize(n);
    }

    /// Remove every level, including the root. The trail observes
    /// nothing until [`reset`](Trail::reset) is called.
    pub fn clear(&mut self) {
        self.path.clear();
    }

    /// Empty the trail and reinstall `anchor` as a size-1 root.
    pub fn reset(&mut self, anchor: &'a mut Shared<Root>)
    where
        Root: Clone,
    {
        self.path.reset_root(anchor);
    }

    /// The `i`-th level from the root (`front(0)` is always the root),
    /// assumed to hold a `Root`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= size()`. Debug-asserts that level actually holds a
    /// `Root` (see [`front_as`](Trail::front_as) otherwise).
    #[must_use]
    pub fn front(&self, i: usize) -> Option<&Shared<Root>> {
        self.path.level_from_front::<Root>(i)
    }

    /// The `i`-th level from the back (`back(0)` is the current leaf),
    /// assumed to hold a `Root`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= size()`. Debug-asserts that level actually holds a
    /// `Root` (see [`back_as`](Trail::back_as) otherwise).
    #[must_use]
    pub fn back(&self, i: usize) -> Option<&Shared<Root>> {
        self.path.level_from_back::<Root>(i)
    }

    /// The `i`-th level from the root, typed as `X` rather than `Root`, for
    /// a trail that has stepped into a different type along the way.
    ///
    /// # Panics
    ///
    /// Panics if `i >= size()`. Debug-asserts that level actually holds an
    /// `X`.
    #[must_use]
    pub fn front_as<X: 'static>(&self, i: usize) -> Option<&Shared<X>> {
        self.path.level_from_front::<X>(i)
    }

    /// The `i`-th level from the back, typed as `X` rather than `Root`, for
    /// a trail that has stepped into a different type along the way.
    ///
    /// # Panics
    ///
    /// Panics if `i >= size()`. Debug-asserts that level actually holds an
    /// `X`.
    #[must_use]
    pub fn back_as<X: 'static>(&self, i: usize) -> Option<&Shared<X>> {
        self.path.level_from_back::<X>(i)
    }

    fn here_shared(&self) -> Option<&Shared<Root>> {
        self.path.here_typed::<Root>()
    }

    /// The immutable view of the leaf's payload, or `None` if the leaf
    /// slot is empty or the trail itself is empty. Assumes the leaf holds
    /// a `Root` (see [`get_as`](Trail::get_as) otherwise).
    #[must_use]
    pub fn get(&self) -> Option<&Root> {
        self.here_shared().and_then(Shared::get)
    }

    /// `true` if the leaf slot refers to a live payload. Assumes the leaf
    /// holds a `Root`.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.here_shared().is_some_and(Shared::is_set)
    }

    /// Relaxed refcount of the leaf's payload, or 0 if empty. Assumes the
    /// leaf holds a `Root`.
    #[must_use]
    pub fn use_count(&self) -> usize {
        self.here_shared().map_or(0, Shared::use_count)
    }

    /// Dynamic type identity of the leaf's payload, or `None`. Assumes the
    /// leaf holds a `Root`.
    #[must_use]
    pub fn type_info(&self) -> Option<TypeId> {
        self.here_shared().and_then(Shared::type_info)
    }

    /// Propagate a write down to the leaf, cloning any unmaterialized
    /// levels along the way, then update the observed slot. Assumes the
    /// leaf holds a `Root` (see [`write_as`](Trail::write_as) otherwise).
    pub fn write(&mut self) -> Option<&mut Root>
    where
        Root: Clone,
    {
        self.path.write::<Root>()
    }

    /// The immutable view of the leaf's payload, typed as `X` rather than
    /// `Root`, for a trail that has stepped into a different type.
    #[must_use]
    pub fn get_as<X: 'static>(&self) -> Option<&X> {
        self.path.here_typed::<X>().and_then(Shared::get)
    }

    /// Propagate a write down to the leaf, typed as `X` rather than `Root`,
    /// for a trail that has stepped into a different type.
    pub fn write_as<X: Clone + 'static>(&mut self) -> Option<&mut X> {
        self.path.write::<X>()
    }
}

/// Build a trail over `anchor` and push each step in order in one
/// expression, mirroring the original model's `make_trail(&root, …)`.
pub fn make_trail<'a, Root, F>(anchor: &'a mut Shared<Root>, steps: impl IntoIterator<Item = F>) -> Trail<'a, Root>
where
    Root: Clone + 'static,
    F: Fn(&Root) -> Option<&Shared<Root>> + 'static,
{
    let mut trail = Trail::new(anchor);
    for step in steps {
        trail.push_fn(step);
    }
    trail
}
