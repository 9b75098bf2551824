//! Internal path-navigation engine shared by [`crate::Cursor`] and
//! [`crate::Trail`].
//!
//! Both public types are thin wrappers around [`Path<'a>`], which holds an
//! ordered sequence of [`Level`]s: the first is always the root anchor, and
//! each subsequent level remembers how to re-derive its observed child slot
//! from its parent's current value. A single tagged enum over the step
//! kinds stands in for what a class-inheritance-based implementation would
//! model as a hierarchy of offset/function/root step types.
//!
//! Each level may carry a *different* payload type from its neighbors (a
//! `Shared<Scene>` root may step into a `Shared<Layer>` field, which may in
//! turn step into a `Shared<Tile>` field): the levels are stored type-erased
//! behind `NonNull<u8>` plus a per-level pair of monomorphized function
//! pointers that know how to `read`/`write` the level's own concrete
//! `Shared<X>`. Callers recover a typed view at the edges (`Cursor`'s
//! typestate parameter, `Trail`'s `TypeId`-checked `_as` accessors); the
//! engine itself never needs to know the whole chain's types at once.

use std::any::TypeId;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::shared::Shared;
use crate::tracing_support::internal as log;

/// A type-erased pointer to a `Shared<X>` slot, for some `X` recorded
/// alongside it in a [`Level`]'s [`LevelOps`].
type Erased = NonNull<u8>;

/// # Safety
///
/// Callers must only ever invoke this with an `Erased` pointer that
/// genuinely denotes a live `Shared<X>` for the exact `X` this function was
/// monomorphized for.
unsafe fn write_erased<X: Clone + 'static>(shared_ptr: Erased) -> Option<Erased> {
    // SAFETY: see function contract.
    let shared = unsafe { shared_ptr.cast::<Shared<X>>().as_mut() };
    shared.try_write().map(|v| NonNull::from(v).cast::<u8>())
}

/// # Safety
///
/// Same contract as [`write_erased`].
unsafe fn get_erased<X: 'static>(shared_ptr: Erased) -> Option<Erased> {
    // SAFETY: see function contract.
    let shared = unsafe { shared_ptr.cast::<Shared<X>>().as_ref() };
    shared.get().map(|v| NonNull::from(v).cast::<u8>())
}

/// Per-level, type-specific operations, captured once (as plain function
/// pointers, since they close over nothing) when a level is pushed.
struct LevelOps {
    write_self: unsafe fn(Erased) -> Option<Erased>,
    get_self: unsafe fn(Erased) -> Option<Erased>,
    type_id: TypeId,
    type_name: &'static str,
}

impl LevelOps {
    fn of<X: Clone + 'static>() -> Self {
        LevelOps {
            write_self: write_erased::<X>,
            get_self: get_erased::<X>,
            type_id: TypeId::of::<X>(),
            type_name: std::any::type_name::<X>(),
        }
    }
}

enum Entry {
    Root,
    /// Derives this level's child `Shared<Child>` slot (erased) from the
    /// parent level's current payload address (erased, typed `Parent`).
    Derived(Box<dyn Fn(Erased) -> Option<Erased>>),
}

struct Level {
    ops: LevelOps,
    entry: Entry,
    here: Option<Erased>,
    materialized: bool,
}

/// Computes the byte offset of `field` within `parent`, for use with an
/// offset-derived step.
pub(crate) fn offset_of_field<Parent, Child>(parent: &Parent, field: &Shared<Child>) -> usize {
    let parent_addr = std::ptr::from_ref(parent).cast::<u8>() as usize;
    let field_addr = std::ptr::from_ref(field).cast::<u8>() as usize;
    debug_assert!(
        field_addr >= parent_addr && field_addr - parent_addr < std::mem::size_of::<Parent>(),
        "offset step built from a field pointer that is not inside the parent object"
    );
    field_addr - parent_addr
}

/// An ordered sequence of navigation levels, the first always the root.
///
/// `'a` ties the path to the lifetime of the caller's root `Shared<T>`
/// slot, so the borrow checker (not a runtime check) enforces that no one
/// else touches that slot while a `Cursor`/`Trail` observes it.
pub(crate) struct Path<'a> {
    levels: Vec<Level>,
    _marker: PhantomData<&'a mut ()>,
}

impl<'a> Path<'a> {
    pub(crate) fn new<Root: Clone + 'static>(root: &'a mut Shared<Root>) -> Self {
        Path {
            levels: vec![Level {
                ops: LevelOps::of::<Root>(),
                entry: Entry::Root,
                here: NonNull::new(std::ptr::from_mut(root).cast::<u8>()),
                materialized: true,
            }],
            _marker: PhantomData,
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.levels.len()
    }

    pub(crate) fn here(&self) -> Option<Erased> {
        self.levels.last().and_then(|l| l.here)
    }

    pub(crate) fn leaf_type_id(&self) -> Option<TypeId> {
        self.levels.last().map(|l| l.ops.type_id)
    }

    /// Append a level whose child slot is derived by a pure projection
    /// `Parent -> Option<&Shared<Child>>`.
    ///
    /// # Panics (debug only)
    ///
    /// Debug-asserts that the path's current leaf was itself pushed (or
    /// rooted) as a `Parent`.
    pub(crate) fn push<Parent, Child, F>(&mut self, f: F)
    where
        Parent: 'static,
        Child: Clone + 'static,
        F: Fn(&Parent) -> Option<&Shared<Child>> + 'static,
    {
        let derive: Box<dyn Fn(Erased) -> Option<Erased>> = Box::new(move |parent_ptr: Erased| {
            // SAFETY: by construction `parent_ptr` is the payload address of
            // the level this closure was pushed against, which `push_entry`
            // below verifies (in debug builds) is a `Parent`.
            let parent: &Parent = unsafe { parent_ptr.cast::<Parent>().as_ref() };
            f(parent).map(|child| NonNull::from(child).cast::<u8>())
        });
        self.push_entry::<Parent, Child>(derive);
    }

    /// Append a level whose child slot is a fixed byte offset (computed now,
    /// from `field`) within the parent's current payload.
    ///
    /// # Panics (debug only)
    ///
    /// Debug-asserts that `field` lives inside the current leaf's payload
    /// and that the current leaf was pushed (or rooted) as a `Parent`.
    pub(crate) fn push_offset<Parent, Child>(&mut self, field: &Shared<Child>)
    where
        Parent: 'static,
        Child: Clone + 'static,
    {
        let offset = self
            .here()
            .and_then(|parent_ptr| {
                // SAFETY: the debug_assert in `push_entry` below is the only
                // guard available for caller-supplied type parameters; this
                // mirrors the rest of the crate's precondition-violation
                // failure model (trusted in release).
                unsafe { get_erased::<Parent>(parent_ptr) }
            })
            .map_or(0, |parent_payload| {
                // SAFETY: see above.
                offset_of_field(unsafe { parent_payload.cast::<Parent>().as_ref() }, field)
            });
        let derive: Box<dyn Fn(Erased) -> Option<Erased>> = Box::new(move |parent_ptr: Erased| {
            // SAFETY: `offset` was computed above from a field reference
            // that genuinely lives inside a `Parent`, so adding it back to
            // any live parent payload address of the same type recovers a
            // pointer to the same field.
            let field_ptr = unsafe { parent_ptr.as_ptr().add(offset) };
            NonNull::new(field_ptr.cast::<Shared<Child>>())
        });
        self.push_entry::<Parent, Child>(derive);
    }

    fn push_entry<Parent: 'static, Child: Clone + 'static>(
        &mut self,
        derive: Box<dyn Fn(Erased) -> Option<Erased>>,
    ) {
        assert!(!self.levels.is_empty(), "push on an empty path");
        debug_assert_eq!(
            self.leaf_type_id(),
            Some(TypeId::of::<Parent>()),
            "step built against a parent type that does not match the path's current leaf"
        );
        let here = self.here().and_then(|parent_ptr| {
            // SAFETY: the debug_assert above is this crate's only guard for
            // a caller-misdeclared `Parent`; trusted in release, matching
            // this crate's documented precondition-violation failure model.
            let payload = unsafe { get_erased::<Parent>(parent_ptr) }?;
            derive(payload)
        });
        self.levels.push(Level {
            ops: LevelOps::of::<Child>(),
            entry: Entry::Derived(derive),
            here,
            materialized: false,
        });
    }

    pub(crate) fn pop(&mut self, count: usize) {
        let new_len = self.levels.len().saturating_sub(count);
        self.levels.truncate(new_len);
    }

    pub(crate) fn resize(&mut self, new_size: usize) {
        if new_size < self.levels.len() {
            self.levels.truncate(new_size);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.levels.clear();
    }

    pub(crate) fn reset_root<Root: Clone + 'static>(&mut self, root: &'a mut Shared<Root>) {
        self.levels.clear();
        self.levels.push(Level {
            ops: LevelOps::of::<Root>(),
            entry: Entry::Root,
            here: NonNull::new(std::ptr::from_mut(root).cast::<u8>()),
            materialized: true,
        });
    }

    /// The `index`-th level from the front, typed as `X`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range. Debug-asserts `X` matches the
    /// type that level was actually pushed/rooted with.
    pub(crate) fn level_from_front<X: 'static>(&self, index: usize) -> Option<&Shared<X>> {
        assert!(index < self.levels.len(), "front index out of range");
        self.typed_level(&self.levels[index])
    }

    /// The `index`-th level from the back, typed as `X`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range. Debug-asserts `X` matches the
    /// type that level was actually pushed/rooted with.
    pub(crate) fn level_from_back<X: 'static>(&self, index: usize) -> Option<&Shared<X>> {
        assert!(index < self.levels.len(), "back index out of range");
        self.typed_level(&self.levels[self.levels.len() - 1 - index])
    }

    /// The currently observed slot, typed as `X`, or `None` if the path is
    /// empty or that slot itself is empty. Unlike
    /// [`level_from_front`](Path::level_from_front)/[`level_from_back`](Path::level_from_back),
    /// never panics on an empty path — this is the accessor surface for
    /// `get`/`is_set`/`use_count`/`type_info`/`write`, which report "empty"
    /// rather than panicking.
    pub(crate) fn here_typed<X: 'static>(&self) -> Option<&Shared<X>> {
        self.levels.last().and_then(|level| self.typed_level(level))
    }

    fn typed_level<X: 'static>(&self, level: &Level) -> Option<&Shared<X>> {
        debug_assert_eq!(
            level.ops.type_id,
            TypeId::of::<X>(),
            "level accessed as the wrong type"
        );
        level.here.map(|ptr| {
            // SAFETY: checked above in debug builds; release builds trust
            // the precondition, matching this crate's failure model.
            unsafe { ptr.cast::<Shared<X>>().as_ref() }
        })
    }

    /// Propagate a `write()` down the whole path, materializing every
    /// unmaterialized level in order and re-deriving each child slot when
    /// its parent turned out to have been cloned. Returns the leaf's
    /// payload, uniquely writable, or `None` if any level along the way is
    /// (or became) empty.
    ///
    /// # Panics (debug only)
    ///
    /// Debug-asserts `Leaf` matches the type the path's last level was
    /// actually pushed/rooted with.
    pub(crate) fn write<Leaf: Clone + 'static>(&mut self) -> Option<&mut Leaf> {
        let len = self.levels.len();
        if len == 0 {
            return None;
        }
        debug_assert_eq!(
            self.levels[len - 1].ops.type_id,
            TypeId::of::<Leaf>(),
            "write() requested with a type that does not match the path's leaf"
        );
        for i in 1..len {
            if self.levels[i].materialized {
                continue;
            }
            let Some(parent_ptr) = self.levels[i - 1].here else {
                self.levels[i].here = None;
                self.levels[i].materialized = true;
                continue;
            };
            let write_self = self.levels[i - 1].ops.write_self;
            let get_self = self.levels[i - 1].ops.get_self;
            // SAFETY: `parent_ptr` is this path's own level `i - 1`, whose
            // `ops` were captured for its exact type when it was pushed.
            let old_addr = unsafe { get_self(parent_ptr) }.map(NonNull::as_ptr);
            let new_value = unsafe { write_self(parent_ptr) };
            let new_addr = new_value.map(NonNull::as_ptr);
            match new_value {
                None => self.levels[i].here = None,
                Some(new_payload) => {
                    if old_addr != new_addr || self.levels[i].here.is_none() {
                        let Entry::Derived(derive) = &self.levels[i].entry else {
                            unreachable!("non-root level must carry a step rule")
                        };
                        self.levels[i].here = derive(new_payload);
                        log::log_step_rederived(self.levels[i].ops.type_name, i);
                    }
                }
            }
            self.levels[i].materialized = true;
        }
        let leaf_ptr = self.levels[len - 1].here?;
        // SAFETY: checked by the debug_assert above; this materializes the
        // leaf itself, which the loop above only ever re-derives, never
        // writes directly.
        unsafe { leaf_ptr.cast::<Shared<Leaf>>().as_mut() }.try_write()
    }
}
