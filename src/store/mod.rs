//! # Pattern store
//!
//! The store ingests registration patterns and keeps them in a
//! radix-style namespace tree keyed by normalized fragments.
//!
//! A pattern such as `/customers/{id}/gifs/` is validated, its optional
//! host prefix split off, its parameters replaced by the `{}` sentinel,
//! and its extremal slashes trimmed, yielding the tree name
//! `customers/{}/gifs`. The node owning that name carries up to two
//! terminal entries (one per trailing-slash variant), each holding the
//! verbatim pattern, a compiled anchored regex, and the
//! method-to-handler table.
//!
//! Inserting a name that is a string prefix of an existing sibling splits
//! the sibling: `api/v1/admin` followed by `api` leaves a single root
//! child `api` with the child `v1/admin` reparented underneath.

pub(crate) mod entry;
pub(crate) mod node;
pub(crate) mod pattern;
