//! End-to-end translation scenarios driven entirely through synthetic DIE
//! fixtures, exercising the scenarios a real compile unit would trigger
//! without depending on a DWARF toolchain being installed.

use btfgen::testdie::DieArena;
use btfgen::{Context, Die, Tag, VecSink};

fn header_of(bytes: &[u8]) -> (u16, u8, u32, u32, u32, u32) {
    let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
    let version = bytes[2];
    let hdr_len = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    let type_len = u32::from_le_bytes(bytes[12..16].try_into().unwrap());
    let str_off = u32::from_le_bytes(bytes[16..20].try_into().unwrap());
    let str_len = u32::from_le_bytes(bytes[20..24].try_into().unwrap());
    (magic, version, hdr_len, type_len, str_off, str_len)
}

#[test]
fn s1_empty_compile_unit() {
    let mut arena = DieArena::new();
    let cu = arena.compile_unit();
    let mut ctx = Context::new();
    ctx.add_compile_unit(arena.get(cu)).unwrap();
    ctx.finish().unwrap();

    let mut sink = VecSink::new();
    ctx.emit(&mut sink, ".BTF").unwrap();
    let bytes = sink.section(".BTF").unwrap();
    let (magic, version, hdr_len, type_len, str_off, str_len) = header_of(bytes);
    assert_eq!(magic, 0xeB9F);
    assert_eq!(version, 1);
    assert_eq!(hdr_len, 24);
    assert_eq!(type_len, 0);
    assert_eq!(str_off, 0);
    assert_eq!(str_len, 1); // just the reserved empty string
    assert_eq!(bytes.len(), 24 + 1);
}

#[test]
fn s2_base_types_get_dense_ids_in_registration_order() {
    let mut arena = DieArena::new();
    let cu = arena.compile_unit();
    let int_ty = arena.base_type("int", 4, 0x05);
    let char_ty = arena.base_type("char", 1, 0x06);
    arena.add_child(cu, int_ty);
    arena.add_child(cu, char_ty);

    let mut ctx = Context::new();
    ctx.add_compile_unit(arena.get(cu)).unwrap();
    ctx.finish().unwrap();
    assert_eq!(ctx.type_count(), 2);
}

#[test]
fn s3_pointer_qualifier_chain_resolves_and_typedef_stays_unkn() {
    // const volatile int *p; plus a typedef naming the pointer, which the
    // classifier never routes (kind_of has no Tag::TYPEDEF arm), so it's
    // dropped rather than registered.
    let mut arena = DieArena::new();
    let cu = arena.compile_unit();
    let int_ty = arena.base_type("int", 4, 0x05);
    let vol = arena.cv_qualifier(Tag::VOLATILE_TYPE, Some(int_ty));
    let cst = arena.cv_qualifier(Tag::CONST_TYPE, Some(vol));
    let ptr = arena.pointer(Some(cst));
    let td = arena.typedef("cvp", Some(ptr));
    for d in [int_ty, vol, cst, ptr, td] {
        arena.add_child(cu, d);
    }

    let mut ctx = Context::new();
    ctx.add_compile_unit(arena.get(cu)).unwrap();
    ctx.finish().unwrap();
    assert_eq!(ctx.type_count(), 4);
}

#[test]
fn s4_forward_declared_struct_becomes_fwd() {
    let mut arena = DieArena::new();
    let cu = arena.compile_unit();
    let fwd = arena.fwd_decl(Tag::STRUCTURE_TYPE, "opaque");
    arena.add_child(cu, fwd);

    let mut ctx = Context::new();
    ctx.add_compile_unit(arena.get(cu)).unwrap();
    ctx.finish().unwrap();
    assert_eq!(ctx.type_count(), 1);
    assert!(ctx.show_all().unwrap().contains("Fwd"));
}

#[test]
fn s5_self_referential_struct_through_pointer() {
    // struct node { struct node *next; int val; };
    let mut arena = DieArena::new();
    let cu = arena.compile_unit();
    let int_ty = arena.base_type("int", 4, 0x05);
    let s = arena.structure("node", 16);
    let ptr = arena.pointer(Some(s));
    arena.member(s, "next", ptr, 0);
    arena.member(s, "val", int_ty, 64);
    for d in [int_ty, s, ptr] {
        arena.add_child(cu, d);
    }

    let mut ctx = Context::new();
    ctx.add_compile_unit(arena.get(cu)).unwrap();
    ctx.finish().unwrap();
    assert_eq!(ctx.type_count(), 3);

    let mut sink = VecSink::new();
    ctx.emit(&mut sink, ".BTF").unwrap();
    assert!(sink.section(".BTF").unwrap().len() > 24);
}

#[test]
fn s6_unsupported_member_type_collapses_without_failing_translation() {
    // struct has_float { float f; }; float is UNKN and must not abort the run.
    let mut arena = DieArena::new();
    let cu = arena.compile_unit();
    let float_ty = arena.base_type("f", 4, 0x04);
    let s = arena.structure("has_float", 4);
    arena.member(s, "f", float_ty, 0);
    arena.add_child(cu, float_ty);
    arena.add_child(cu, s);

    let mut ctx = Context::new();
    ctx.add_compile_unit(arena.get(cu)).unwrap();
    ctx.finish().unwrap();
    assert_eq!(ctx.type_count(), 1);
}

#[test]
fn enum_values_and_array_of_struct_round_trip_through_emit() {
    let mut arena = DieArena::new();
    let cu = arena.compile_unit();

    let e = arena.enumeration("color", 4);
    arena.enumerator(e, "RED", 0);
    arena.enumerator(e, "GREEN", 1);
    arena.enumerator(e, "BLUE", 2);

    let int_ty = arena.base_type("int", 4, 0x05);
    let arr_elem = arena.structure("point", 8);
    arena.member(arr_elem, "x", int_ty, 0);
    arena.member(arr_elem, "y", int_ty, 32);
    let arr_ty = arena.array_type(arr_elem);
    arena.subrange(arr_ty, None, 4);
    let points = arena.variable("points", arr_ty);

    for d in [e, int_ty, arr_elem, points] {
        arena.add_child(cu, d);
    }

    let mut ctx = Context::new();
    ctx.add_compile_unit(arena.get(cu)).unwrap();
    ctx.finish().unwrap();
    // enum, int, struct, array(points) -- array_type itself is never
    // registered directly, only the variable that anchors it.
    assert_eq!(ctx.type_count(), 4);

    let mut sink = VecSink::new();
    ctx.emit(&mut sink, ".BTF").unwrap();
    let bytes = sink.section(".BTF").unwrap();
    let (.., type_len, str_off, _) = header_of(bytes);
    assert_eq!(str_off, type_len);
}

#[test]
fn repeated_compile_units_share_one_type_graph() {
    let mut arena = DieArena::new();
    let cu1 = arena.compile_unit();
    let int_ty = arena.base_type("int", 4, 0x05);
    arena.add_child(cu1, int_ty);

    let cu2 = arena.compile_unit();
    let char_ty = arena.base_type("char", 1, 0x06);
    arena.add_child(cu2, char_ty);

    let mut ctx = Context::new();
    ctx.add_compile_unit(arena.get(cu1)).unwrap();
    ctx.add_compile_unit(arena.get(cu2)).unwrap();
    ctx.finish().unwrap();
    assert_eq!(ctx.type_count(), 2);
}

#[test]
#[should_panic(expected = "add_compile_unit called after finish")]
fn add_after_finish_is_a_precondition_violation() {
    let mut arena = DieArena::new();
    let cu1 = arena.compile_unit();
    let cu2 = arena.compile_unit();

    let mut ctx = Context::new();
    ctx.add_compile_unit(arena.get(cu1)).unwrap();
    ctx.finish().unwrap();
    let _ = ctx.add_compile_unit(arena.get(cu2));
}

// Sanity-check the identity assumption `Die` fixtures rely on: two distinct
// arena nodes never compare equal even with identical content.
#[test]
fn distinct_dies_have_distinct_identity() {
    let mut arena = DieArena::new();
    let a = arena.base_type("int", 4, 0x05);
    let b = arena.base_type("int", 4, 0x05);
    assert_ne!(arena.get(a).identity(), arena.get(b).identity());
}
