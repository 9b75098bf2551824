//! The [`Shared<T>`] copy-on-write handle.
//!
//! This is the primary user-facing type: a refcounted, nullable handle to
//! a heap-allocated payload that clones on demand when [`write`] is called
//! on an aliased handle, and returns the existing payload unchanged when
//! the handle is already uniquely held.
//!
//! [`write`]: Shared::write

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::tracing_support::internal as log;

/// The non-generic part of a control block: refcount, dynamic type
/// identity, and type-erased clone/drop entry points.
///
/// Kept separate from the payload (see [`Inner`]) and placed first in a
/// `#[repr(C)]` layout so that a `Shared<T>`'s pointer can be reinterpreted
/// as a different `Shared<U>` (see [`Shared::cast`] / [`Shared::dynamic`])
/// without ever constructing a trait-object fat pointer: casting a
/// concrete payload to a "base" handle in this crate is a change of the
/// phantom type parameter over the *same* erased pointer, checked against
/// the `type_id` stored here rather than against a vtable.
#[repr(C)]
struct Header {
    refcount: AtomicUsize,
    type_id: TypeId,
    type_name: &'static str,
    clone_fn: unsafe fn(NonNull<Header>) -> NonNull<Header>,
    drop_fn: unsafe fn(NonNull<Header>),
}

/// The heap allocation backing a [`Shared<T>`]: a [`Header`] followed by
/// the payload, at a fixed, statically-known offset.
#[repr(C)]
struct Inner<T> {
    header: Header,
    value: T,
}

unsafe fn clone_header<T: Clone + 'static>(ptr: NonNull<Header>) -> NonNull<Header> {
    // SAFETY: callers only ever invoke the `clone_fn` stored in a header that
    // was populated by `alloc_inner::<T>`, so `ptr` always denotes a live
    // `Inner<T>` for this exact `T`.
    let inner = ptr.cast::<Inner<T>>();
    let cloned_value = unsafe { (*inner.as_ptr()).value.clone() };
    alloc_inner(cloned_value)
}

unsafe fn drop_header<T>(ptr: NonNull<Header>) {
    // SAFETY: see `clone_header`; this is the last live reference, so
    // reclaiming the `Box` we originally leaked in `alloc_inner` is sound.
    drop(unsafe { Box::from_raw(ptr.cast::<Inner<T>>().as_ptr()) });
}

fn alloc_inner<T: Clone + 'static>(value: T) -> NonNull<Header> {
    let boxed = Box::new(Inner {
        header: Header {
            refcount: AtomicUsize::new(1),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            clone_fn: clone_header::<T>,
            drop_fn: drop_header::<T>,
        },
        value,
    });
    // `Header` is `Inner<T>`'s first field under `#[repr(C)]`, so a pointer
    // to the whole allocation is also a valid pointer to its header.
    NonNull::from(Box::leak(boxed)).cast::<Header>()
}

/// Marker trait declaring that a concrete payload type may also be viewed
/// through a `Shared<Base>` handle.
///
/// A language with class inheritance lets a `Derived*` convert to a
/// `Base*` for free; Rust has no such conversion, so this crate asks the
/// caller to assert it explicitly by implementing `Subtype<Base>` for
/// `Self`. [`Shared::cast`] is the compile-time-checked static cast gated
/// on this bound; [`Shared::dynamic`] is the runtime, `TypeId`-checked
/// counterpart and needs no such declaration.
///
/// # Safety
///
/// Implementing this trait for `Self: Subtype<Base>` asserts that `Base`
/// is a valid prefix view of `Self`'s layout: reading the first
/// `size_of::<Base>()` bytes of a live `Self` as a `Base` must be sound.
/// In practice this means `Self` should be `#[repr(C)]` with a `Base`
/// value as its first field — the same layout single, non-virtual
/// inheritance gives a derived class over its base subobject.
/// `Shared::cast` only changes which static type is used to read the
/// allocation; the allocation's `TypeId` remains `TypeId::of::<Self>()`
/// regardless, so [`Shared::dynamic`] against the concrete type still
/// succeeds after a handle has been cast to `Base`.
///
/// `Shared<T>`'s control block stores its payload inline, immediately
/// after the [`Header`], at `round_up(size_of::<Header>(), align_of::<T>())`
/// — an offset computed independently for whichever `T` a given `Shared<T>`
/// is statically typed as. Casting a `Shared<Self>` to a `Shared<Base>`
/// reinterprets the *same* allocation under `Base`'s own (independently
/// computed) offset, so this is only sound when that offset agrees for
/// both types, i.e. `align_of::<Self>() == align_of::<Base>()`.
/// [`Shared::cast`]/[`Shared::move_cast`] enforce this with a
/// compile-time assertion for every `Self`/`Base` pair they are
/// instantiated with; implementing `Subtype<Base>` for a `Self` with a
/// different alignment will fail to compile at the cast site rather than
/// silently reading the wrong offset.
pub unsafe trait Subtype<Base: 'static>: 'static {}

/// A refcounted, copy-on-write handle to a `T`.
///
/// `Shared<T>` may be null (see [`Shared::null`] / [`Shared::is_set`]). A
/// non-null handle always refers to a live allocation shared with zero or
/// more other handles; [`write`](Shared::write) is the only operation that
/// may allocate, and does so only when the handle is not uniquely held.
pub struct Shared<T: 'static> {
    ptr: Option<NonNull<Header>>,
    _marker: PhantomData<T>,
}

// SAFETY: the refcount is atomic and every operation that touches the
// payload through a `&T` or `&mut T` is bounded by the usual borrow rules;
// sending a `Shared<T>` across threads is exactly as sound as sending an
// `Arc<T>` when `T: Send + Sync`.
unsafe impl<T: Send + Sync + 'static> Send for Shared<T> {}
unsafe impl<T: Send + Sync + 'static> Sync for Shared<T> {}

impl<T: 'static> Shared<T> {
    /// Allocate a control block holding `value` and return a handle with
    /// refcount 1. Never null.
    #[must_use]
    pub fn make(value: T) -> Self
    where
        T: Clone,
    {
        Shared {
            ptr: Some(alloc_inner(value)),
            _marker: PhantomData,
        }
    }

    /// The null handle: refers to nothing, `use_count() == 0`.
    #[must_use]
    pub const fn null() -> Self {
        Shared {
            ptr: None,
            _marker: PhantomData,
        }
    }

    /// `true` if this handle refers to a live payload.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.ptr.is_some()
    }

    /// The immutable view of the payload, or `None` if null.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.ptr
            .map(|ptr| unsafe { &(*ptr.cast::<Inner<T>>().as_ptr()).value })
    }

    /// The immutable view of the payload.
    ///
    /// # Panics (debug only)
    ///
    /// Debug-asserts that the handle is non-null. Calling this on a null
    /// handle in a release build is a precondition violation (undefined
    /// behavior), per this crate's error-handling contract: the core API
    /// surfaces no recoverable error for caller misuse.
    #[must_use]
    pub fn read(&self) -> &T {
        debug_assert!(self.is_set(), "Shared::read on a null handle");
        // SAFETY: checked above in debug builds; release builds trust the
        // precondition, matching this crate's documented failure model.
        unsafe { &(*self.ptr.unwrap_unchecked().cast::<Inner<T>>().as_ptr()).value }
    }

    /// Relaxed load of the refcount, or 0 if null. Advisory only: racy
    /// against concurrent [`clone`](Clone::clone)s on other threads.
    #[must_use]
    pub fn use_count(&self) -> usize {
        self.ptr
            .map_or(0, |ptr| unsafe { ptr.as_ref() }.refcount.load(Ordering::Relaxed))
    }

    /// The dynamic type identity of the pointee, or `None` if null.
    #[must_use]
    pub fn type_info(&self) -> Option<TypeId> {
        self.ptr.map(|ptr| unsafe { ptr.as_ref() }.type_id)
    }

    /// Set this handle to null, dropping its reference to the prior
    /// payload (freeing it if this was the last reference).
    pub fn reset(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            Self::dec_ref(ptr);
        }
    }

    /// Obtain a mutable view, cloning the payload first if this handle is
    /// not uniquely held. Returns `None` if null; this is the null-safe
    /// counterpart used internally by [`Cursor`](crate::Cursor) /
    /// [`Trail`](crate::Trail) write propagation, which must not panic when
    /// an upstream slot turns out to be empty.
    pub fn try_write(&mut self) -> Option<&mut T>
    where
        T: Clone,
    {
        let ptr = self.ptr?;
        // Acquire: the safe choice for the unique-ownership fast path on
        // weak memory models.
        let header = unsafe { ptr.as_ref() };
        let count = header.refcount.load(Ordering::Acquire);
        debug_assert!(count >= 1, "write on a handle with a dead control block");
        if count > 1 {
            // SAFETY: `clone_fn` was populated for this exact `T` by `make`.
            let new_ptr = unsafe { (header.clone_fn)(ptr) };
            Self::dec_ref(ptr);
            log::log_cow_clone(header.type_name, count);
            self.ptr = Some(new_ptr);
        }
        let inner = unsafe { self.ptr.unwrap_unchecked() }.cast::<Inner<T>>();
        Some(unsafe { &mut (*inner.as_ptr()).value })
    }

    /// Obtain a mutable view, cloning the payload first if aliased.
    ///
    /// # Panics (debug only)
    ///
    /// Debug-asserts the handle is non-null; see [`read`](Shared::read).
    pub fn write(&mut self) -> &mut T
    where
        T: Clone,
    {
        debug_assert!(self.is_set(), "Shared::write on a null handle");
        // SAFETY: checked above.
        unsafe { self.try_write().unwrap_unchecked() }
    }

    /// Create an aliasing handle under a different static type,
    /// incrementing the refcount. Compile-time checked via [`Subtype`].
    ///
    /// # Panics (compile-time)
    ///
    /// Fails to compile if `align_of::<T>() != align_of::<U>()`: see
    /// [`Subtype`]'s safety contract for why the payload offset this
    /// crate computes per-type requires matching alignment.
    #[must_use]
    pub fn cast<U: 'static>(&self) -> Shared<U>
    where
        T: Subtype<U>,
    {
        const {
            assert!(
                std::mem::align_of::<T>() == std::mem::align_of::<U>(),
                "Subtype<Base> requires align_of::<Self>() == align_of::<Base>(); see Subtype's safety doc"
            );
        }
        if let Some(ptr) = self.ptr {
            Self::inc_ref(ptr);
        }
        Shared {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }

    /// Move-variant of [`cast`](Shared::cast): transfers ownership without
    /// touching the refcount.
    ///
    /// # Panics (compile-time)
    ///
    /// Same alignment requirement as [`cast`](Shared::cast).
    #[must_use]
    pub fn move_cast<U: 'static>(mut self) -> Shared<U>
    where
        T: Subtype<U>,
    {
        const {
            assert!(
                std::mem::align_of::<T>() == std::mem::align_of::<U>(),
                "Subtype<Base> requires align_of::<Self>() == align_of::<Base>(); see Subtype's safety doc"
            );
        }
        Shared {
            ptr: self.ptr.take(),
            _marker: PhantomData,
        }
    }

    /// Runtime-checked downcast/crosscast. `None` if the pointee's dynamic
    /// type is not exactly `U`.
    #[must_use]
    pub fn dynamic<U: 'static>(&self) -> Option<Shared<U>> {
        let ptr = self.ptr?;
        let header = unsafe { ptr.as_ref() };
        if header.type_id == TypeId::of::<U>() {
            Self::inc_ref(ptr);
            Some(Shared {
                ptr: Some(ptr),
                _marker: PhantomData,
            })
        } else {
            None
        }
    }

    /// Move-variant of [`dynamic`](Shared::dynamic). On a type mismatch the
    /// source is preserved and handed back as `Err`, the same shape as
    /// `Rc<dyn Any>::downcast`'s `Result<Rc<U>, Rc<T>>`, rather than
    /// silently nulling the source on a miss.
    pub fn move_dynamic<U: 'static>(mut self) -> Result<Shared<U>, Shared<T>> {
        let Some(ptr) = self.ptr else {
            return Err(self);
        };
        let header = unsafe { ptr.as_ref() };
        if header.type_id == TypeId::of::<U>() {
            self.ptr = None; // transferred without touching the refcount
            Ok(Shared {
                ptr: Some(ptr),
                _marker: PhantomData,
            })
        } else {
            Err(self)
        }
    }

    /// Pointer-identity equality of the payload; two null handles are equal.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        match (a.ptr, b.ptr) {
            (None, None) => true,
            (Some(x), Some(y)) => std::ptr::eq(x.as_ptr(), y.as_ptr()),
            _ => false,
        }
    }

    fn inc_ref(ptr: NonNull<Header>) {
        let header = unsafe { ptr.as_ref() };
        let prev = header.refcount.fetch_add(1, Ordering::Acquire);
        debug_assert!(prev != 0, "copying a handle to an already-dead control block");
    }

    fn dec_ref(ptr: NonNull<Header>) {
        let header = unsafe { ptr.as_ref() };
        // AcqRel on the decrement (rather than a plain Acquire) so the
        // zero-transition branch also carries the release a weaker memory
        // model needs before freeing.
        let prev = header.refcount.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev >= 1, "refcount underflow: double free");
        if prev == 1 {
            // SAFETY: we just observed the last reference drop to zero, and
            // no other handle can race us here (single-root-mutation
            // invariant this crate documents as caller responsibility).
            unsafe { (header.drop_fn)(ptr) };
        }
    }
}

impl<T: 'static> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.read()
    }
}

impl<T: 'static> Clone for Shared<T> {
    fn clone(&self) -> Self {
        if let Some(ptr) = self.ptr {
            Self::inc_ref(ptr);
        }
        Shared {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> Drop for Shared<T> {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr {
            Self::dec_ref(ptr);
        }
    }
}

impl<T: 'static> Default for Shared<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: 'static> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl<T: 'static> Eq for Shared<T> {}

impl<T: fmt::Debug + 'static> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("Shared").field(value).finish(),
            None => f.write_str("Shared(null)"),
        }
    }
}

/// Free-function alias for [`Shared::cast`].
#[must_use]
pub fn static_cast_shared<U: 'static, T: Subtype<U> + 'static>(src: &Shared<T>) -> Shared<U> {
    src.cast()
}

/// Free-function alias for [`Shared::dynamic`].
#[must_use]
pub fn dynamic_cast_shared<U: 'static, T: 'static>(src: &Shared<T>) -> Option<Shared<U>> {
    src.dynamic()
}
