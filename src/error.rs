use crate::types::BtfKind;

pub type BtfResult<T> = std::result::Result<T, BtfError>;

/// Data errors a translation can legitimately hit. Precondition violations
/// (adding a CU after `finish`, emitting before it, a compile-unit DIE with
/// the wrong root tag) are programmer bugs rather than malformed input and
/// are reported via `assert!`/`debug_assert!` instead.
#[derive(Debug, thiserror::Error)]
pub enum BtfError {
    #[error("type count {count} exceeds BTF_MAX_TYPE ({max})")]
    TooManyTypes { count: usize, max: u32 },

    #[error("name offset {offset} exceeds BTF_MAX_NAME_OFFSET ({max})")]
    NameOffsetOverflow { offset: u32, max: u32 },

    #[error("{kind:?} vlen {vlen} exceeds BTF_MAX_VLEN ({max})")]
    VlenOverflow { kind: BtfKind, vlen: usize, max: u32 },

    #[cfg(feature = "gimli")]
    #[error(transparent)]
    Gimli(#[from] gimli::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
