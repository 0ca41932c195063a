//! DIE classifier: pure predicates mapping a DIE to a BTF kind, or
//! deciding it is unrepresentable and must be skipped.

use tracing::trace;

use crate::die::{AttrId, BaseTypeEncoding, Die, Tag};
use crate::types::BtfKind;
use crate::wire::{BTF_INT_BOOL, BTF_INT_CHAR, BTF_INT_INVALID_ENCODING, BTF_INT_SIGNED};

/// Maps `die`'s tag (and, for a few tags, its attributes) to a `BtfKind`.
/// Returns `BtfKind::Unkn` for anything not representable in BTF.
pub fn kind_of(die: &dyn Die) -> BtfKind {
    let tag = die.tag();
    if tag == Tag::BASE_TYPE {
        return match int_encoding(die) {
            Some(_) => BtfKind::Int,
            None => BtfKind::Unkn,
        };
    }
    if tag == Tag::CONST_TYPE {
        return BtfKind::Const;
    }
    if tag == Tag::POINTER_TYPE {
        return BtfKind::Ptr;
    }
    if tag == Tag::RESTRICT_TYPE {
        return BtfKind::Restrict;
    }
    if tag == Tag::VOLATILE_TYPE {
        return BtfKind::Volatile;
    }
    if tag == Tag::STRUCTURE_TYPE || tag == Tag::CLASS_TYPE {
        return if die.has_flag(AttrId::DECLARATION) {
            BtfKind::Fwd
        } else {
            BtfKind::Struct
        };
    }
    if tag == Tag::UNION_TYPE {
        return if die.has_flag(AttrId::DECLARATION) {
            BtfKind::Fwd
        } else {
            BtfKind::Union
        };
    }
    if tag == Tag::ENUMERATION_TYPE {
        return BtfKind::Enum;
    }
    if tag == Tag::VARIABLE {
        // A variable of array type is emitted as a named BTF array under
        // the variable's own DIE, rather than registering the underlying
        // array_type DIE itself.
        return match die.type_attr() {
            Some(t) if t.tag() == Tag::ARRAY_TYPE => BtfKind::Array,
            _ => BtfKind::Unkn,
        };
    }
    // typedef, subprogram, subroutine_type, standalone array_type,
    // compile_unit, formal_parameter, inlined_subroutine, lexical_block,
    // and anything else: reserved for future expansion.
    trace!(tag = tag.0, "unsupported DWARF tag, classified UNKN");
    BtfKind::Unkn
}

/// True when `die` should not be registered as a type entry at all: it is
/// itself UNKN, or it is a reference kind whose pointee is missing or is
/// itself skippable.
///
/// The one exception is `pointer_type`: a pointer whose pointee is absent
/// is NOT skipped — it becomes a `PTR` with `type = 0`, i.e. `void *`.
pub fn should_skip(die: &dyn Die) -> bool {
    let kind = kind_of(die);
    if kind == BtfKind::Unkn {
        return true;
    }
    if kind.is_pure_reference() && kind != BtfKind::Ptr {
        return match die.type_attr() {
            None => true,
            Some(pointee) => should_skip(pointee),
        };
    }
    false
}

/// Maps a `DW_AT_encoding` value to the BTF INT encoding bits, or `None` if
/// the encoding (e.g. float, complex, decimal) has no BTF representation.
pub fn int_encoding(die: &dyn Die) -> Option<u32> {
    let raw = die.int_attr(AttrId::ENCODING)?;
    match BaseTypeEncoding::from(raw as u64) {
        BaseTypeEncoding::Boolean => Some(BTF_INT_BOOL),
        BaseTypeEncoding::Signed => Some(BTF_INT_SIGNED),
        BaseTypeEncoding::SignedChar => Some(BTF_INT_CHAR),
        BaseTypeEncoding::Unsigned => Some(0),
        BaseTypeEncoding::UnsignedChar => Some(BTF_INT_CHAR),
        BaseTypeEncoding::Other(_) => {
            trace!("base type encoding has no BTF representation");
            None
        }
    }
}

#[allow(dead_code)]
pub const INVALID_ENCODING: u32 = BTF_INT_INVALID_ENCODING;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdie::TestDie;

    #[test]
    fn base_type_signed_is_int() {
        let d = TestDie::base_type("int", 4, 0x05);
        assert_eq!(kind_of(&d), BtfKind::Int);
    }

    #[test]
    fn base_type_float_is_unkn() {
        let d = TestDie::base_type("float", 4, 0x04);
        assert_eq!(kind_of(&d), BtfKind::Unkn);
        assert!(should_skip(&d));
    }

    #[test]
    fn declared_struct_is_fwd() {
        let d = TestDie::fwd_decl(Tag::STRUCTURE_TYPE, "S");
        assert_eq!(kind_of(&d), BtfKind::Fwd);
    }

    #[test]
    fn pointer_to_missing_is_not_skipped() {
        let d = TestDie::pointer(None);
        assert_eq!(kind_of(&d), BtfKind::Ptr);
        assert!(!should_skip(&d));
    }

    #[test]
    fn reference_to_skippable_pointee_is_skipped() {
        let float_ty = TestDie::base_type("float", 4, 0x04);
        let d = TestDie::cv_qualifier(Tag::CONST_TYPE, Some(&float_ty));
        assert!(should_skip(&d));
    }
}
