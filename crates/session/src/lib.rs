//! Session lifecycle and message intake for balas.
//!
//! - [`SessionLifecycle`] — the connection state machine. One owned
//!   instance, one writer; everything else reads immutable snapshots.
//! - [`IntakeFilter`] — the ordered drop rules in front of the resolver.
//! - [`KeyedLocks`] — per-contact critical sections.
//! - [`SessionRuntime`] — wires a transport's event stream through the
//!   lifecycle, the filter, the contact registry, and the resolver.

pub mod intake;
pub mod keyed;
pub mod lifecycle;
pub mod runtime;

pub use intake::{DropReason, IntakeFilter};
pub use keyed::KeyedLocks;
pub use lifecycle::SessionLifecycle;
pub use runtime::SessionRuntime;
