//! Internal data structures shared by the runtime and the locks.
//!
//! [`Slab`] gives stable, reusable integer keys. The executor keys its task
//! table with it and the locks key their waiter records with it, so queues
//! only ever hold plain indices.

mod slab;

pub(crate) use slab::Slab;
