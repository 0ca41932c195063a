//! DWARF-to-BTF type translation.
//!
//! The core is decoupled from any concrete DWARF library: it consumes
//! debug info through the [`Die`] trait and emits bytes through the
//! [`ByteSink`] trait. A host wires up a real reader (see the
//! `gimli`-feature-gated [`gimli_die`] adapter) and a real byte
//! destination (an assembly printer, an object-file section writer, or
//! [`VecSink`] for testing).
//!
//! Lifecycle: construct a [`Context`], call [`Context::add_compile_unit`]
//! once per compile unit, call [`Context::finish`], then call
//! [`Context::emit`] or [`Context::show_all`] any number of times.

mod classify;
mod context;
mod die;
mod entry;
mod error;
mod sink;
mod strtab;
mod types;
mod wire;

/// Synthetic DIE fixtures, public so integration tests under `tests/` can
/// build the cyclic and forward-referencing shapes real DWARF exhibits.
pub mod testdie;

#[cfg(feature = "gimli")]
pub mod gimli_die;

pub use classify::{int_encoding, kind_of, should_skip};
pub use context::Context;
pub use die::{Attr, AttrId, BaseTypeEncoding, Die, Tag};
pub use error::{BtfError, BtfResult};
pub use sink::{ByteSink, VecSink};
pub use types::BtfKind;
