//! The closed fourteen-value BTF kind enumeration.

use crate::wire::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BtfKind {
    Unkn,
    Int,
    Ptr,
    Array,
    Struct,
    Union,
    Enum,
    Fwd,
    Typedef,
    Volatile,
    Const,
    Restrict,
    Func,
    FuncProto,
}

impl BtfKind {
    pub fn wire_value(self) -> u32 {
        match self {
            BtfKind::Unkn => BTF_KIND_UNKN,
            BtfKind::Int => BTF_KIND_INT,
            BtfKind::Ptr => BTF_KIND_PTR,
            BtfKind::Array => BTF_KIND_ARRAY,
            BtfKind::Struct => BTF_KIND_STRUCT,
            BtfKind::Union => BTF_KIND_UNION,
            BtfKind::Enum => BTF_KIND_ENUM,
            BtfKind::Fwd => BTF_KIND_FWD,
            BtfKind::Typedef => BTF_KIND_TYPEDEF,
            BtfKind::Volatile => BTF_KIND_VOLATILE,
            BtfKind::Const => BTF_KIND_CONST,
            BtfKind::Restrict => BTF_KIND_RESTRICT,
            BtfKind::Func => BTF_KIND_FUNC,
            BtfKind::FuncProto => BTF_KIND_FUNC_PROTO,
        }
    }

    /// True for kinds whose `size_or_type` field holds a referenced type-id
    /// rather than a byte size, and whose `name_off` is always 0,
    /// excluding FWD which does carry a name.
    pub fn is_pure_reference(self) -> bool {
        matches!(
            self,
            BtfKind::Ptr | BtfKind::Const | BtfKind::Volatile | BtfKind::Restrict | BtfKind::Typedef
        )
    }
}
