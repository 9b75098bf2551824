//! Structured logging support.
//!
//! When the `tracing` feature is enabled, this module emits events at the
//! two structurally interesting moments in this crate: a [`Shared::write`]
//! that had to clone its control block, and a [`Cursor`]/[`Trail`]
//! re-deriving a child slot after an upstream clone. When the feature is
//! disabled these calls compile away to nothing.
//!
//! [`Shared::write`]: crate::Shared::write
//! [`Cursor`]: crate::Cursor

#[cfg(feature = "tracing")]
pub(crate) mod internal {
    /// Record that a `write()` call cloned its control block.
    pub fn log_cow_clone(type_name: &'static str, old_count: usize) {
        tracing::debug!(type_name, old_count, "shared_write_cloned");
    }

    /// Record that a cursor step re-derived its observed child slot
    /// because its parent was cloned.
    pub fn log_step_rederived(type_name: &'static str, depth: usize) {
        tracing::trace!(type_name, depth, "cursor_step_rederived");
    }
}

#[cfg(not(feature = "tracing"))]
pub(crate) mod internal {
    #[inline]
    pub fn log_cow_clone(_type_name: &'static str, _old_count: usize) {}

    #[inline]
    pub fn log_step_rederived(_type_name: &'static str, _depth: usize) {}
}
