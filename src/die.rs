//! The DIE abstraction consumed from the host: an opaque, externally-owned
//! debug-info tree node. The core only ever reads a tag, a handful of
//! attributes, and an ordered child list; it never mutates a DIE and
//! never outlives the tree it borrows from.

/// A DWARF tag, numerically identical to the standard's `DW_TAG_*`
/// constants so a real DWARF reader (see `crate::gimli_die` behind the
/// `gimli` feature) can hand these over without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub u16);

impl Tag {
    pub const ARRAY_TYPE: Tag = Tag(0x01);
    pub const CLASS_TYPE: Tag = Tag(0x02);
    pub const ENUMERATION_TYPE: Tag = Tag(0x04);
    pub const FORMAL_PARAMETER: Tag = Tag(0x05);
    pub const LEXICAL_BLOCK: Tag = Tag(0x0b);
    pub const MEMBER: Tag = Tag(0x0d);
    pub const POINTER_TYPE: Tag = Tag(0x0f);
    pub const COMPILE_UNIT: Tag = Tag(0x11);
    pub const STRUCTURE_TYPE: Tag = Tag(0x13);
    pub const SUBROUTINE_TYPE: Tag = Tag(0x15);
    pub const TYPEDEF: Tag = Tag(0x16);
    pub const UNION_TYPE: Tag = Tag(0x17);
    pub const INLINED_SUBROUTINE: Tag = Tag(0x1d);
    pub const SUBRANGE_TYPE: Tag = Tag(0x21);
    pub const BASE_TYPE: Tag = Tag(0x24);
    pub const CONST_TYPE: Tag = Tag(0x26);
    pub const ENUMERATOR: Tag = Tag(0x28);
    pub const SUBPROGRAM: Tag = Tag(0x2e);
    pub const VARIABLE: Tag = Tag(0x34);
    pub const VOLATILE_TYPE: Tag = Tag(0x35);
    pub const RESTRICT_TYPE: Tag = Tag(0x37);
}

/// A DWARF attribute id, numerically identical to `DW_AT_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttrId(pub u16);

impl AttrId {
    pub const NAME: AttrId = AttrId(0x03);
    pub const BYTE_SIZE: AttrId = AttrId(0x0b);
    pub const BIT_OFFSET: AttrId = AttrId(0x0c);
    pub const BIT_SIZE: AttrId = AttrId(0x0d);
    pub const CONST_VALUE: AttrId = AttrId(0x1c);
    pub const UPPER_BOUND: AttrId = AttrId(0x2f);
    pub const COUNT: AttrId = AttrId(0x37);
    pub const DECLARATION: AttrId = AttrId(0x3c);
    pub const ENCODING: AttrId = AttrId(0x3e);
    pub const TYPE: AttrId = AttrId(0x49);
}

/// DWARF base-type encodings (`DW_ATE_*`) relevant to INT classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseTypeEncoding {
    Boolean,
    Signed,
    SignedChar,
    Unsigned,
    UnsignedChar,
    Other(u64),
}

impl From<u64> for BaseTypeEncoding {
    fn from(v: u64) -> Self {
        match v {
            0x02 => BaseTypeEncoding::Boolean,
            0x05 => BaseTypeEncoding::Signed,
            0x06 => BaseTypeEncoding::SignedChar,
            0x07 => BaseTypeEncoding::Unsigned,
            0x08 => BaseTypeEncoding::UnsignedChar,
            other => BaseTypeEncoding::Other(other),
        }
    }
}

/// The value carried by one attribute lookup.
pub enum Attr<'a> {
    /// Presence-only (flag-form) attribute, e.g. `DW_AT_declaration`.
    Flag,
    Int(i64),
    Str(&'a str),
    Ref(&'a dyn Die),
}

/// A single DWARF debug-info entry, as handed to the core by the host.
///
/// `identity` must be stable and unique for the lifetime of one
/// translation; the reducer uses it as the key of the DIE-to-id map. DWARF
/// section offsets are a natural choice and are what the `gimli`-backed
/// adapter uses.
pub trait Die {
    fn identity(&self) -> u64;
    fn tag(&self) -> Tag;
    fn attr(&self, id: AttrId) -> Option<Attr<'_>>;
    fn children(&self) -> Vec<&dyn Die>;

    fn name(&self) -> Option<&str> {
        match self.attr(AttrId::NAME) {
            Some(Attr::Str(s)) => Some(s),
            _ => None,
        }
    }

    fn has_flag(&self, id: AttrId) -> bool {
        matches!(self.attr(id), Some(Attr::Flag) | Some(Attr::Int(_)))
    }

    fn int_attr(&self, id: AttrId) -> Option<i64> {
        match self.attr(id) {
            Some(Attr::Int(v)) => Some(v),
            _ => None,
        }
    }

    fn type_attr(&self) -> Option<&dyn Die> {
        match self.attr(AttrId::TYPE) {
            Some(Attr::Ref(d)) => Some(d),
            _ => None,
        }
    }
}
