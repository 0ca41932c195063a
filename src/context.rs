//! Type-graph reducer / translation context: walks compile-unit DIE
//! trees, deduplicates by DIE identity, assigns dense ids, and owns the
//! string table. The lifecycle is strict: construct → N× `add_compile_unit`
//! → `finish` → M× `emit`/`show_all`.

use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::trace;

use crate::classify::{self, kind_of, should_skip};
use crate::die::{Die, Tag};
use crate::entry::{self, ArrayEntry, CompositeEntry, EnumEntry, FwdEntry, IntEntry, ReferenceEntry, TypeEntry};
use crate::error::{BtfError, BtfResult};
use crate::sink::ByteSink;
use crate::strtab::StringTable;
use crate::types::BtfKind;
use crate::wire::{BTF_HDR_LEN, BTF_MAGIC, BTF_MAX_TYPE, BTF_MAX_VLEN, BTF_VERSION};

pub struct Context<'d> {
    entries: Vec<TypeEntry<'d>>,
    die_map: HashMap<u64, u32>,
    strings: StringTable,
    finished: bool,
}

struct Header {
    type_len: usize,
    str_off: usize,
    str_len: usize,
}

impl<'d> Context<'d> {
    pub fn new() -> Self {
        Context {
            entries: Vec::new(),
            die_map: HashMap::new(),
            strings: StringTable::new(),
            finished: false,
        }
    }

    pub fn id_of(&self, die: Option<&dyn Die>) -> u32 {
        die.and_then(|d| self.die_map.get(&d.identity()).copied()).unwrap_or(0)
    }

    /// Registers a compile unit's types. `unit`'s tag must be
    /// `DW_TAG_compile_unit`; this is a programmer-error precondition, not
    /// a data error, so it's asserted rather than returned.
    pub fn add_compile_unit(&mut self, unit: &'d dyn Die) -> BtfResult<()> {
        assert!(!self.finished, "add_compile_unit called after finish()");
        assert_eq!(
            unit.tag(),
            Tag::COMPILE_UNIT,
            "compile unit root DIE must have tag DW_TAG_compile_unit"
        );
        self.walk(unit)
    }

    fn walk(&mut self, die: &'d dyn Die) -> BtfResult<()> {
        if die.tag() == Tag::COMPILE_UNIT || die.tag() == Tag::SUBPROGRAM {
            for child in die.children() {
                self.walk(child)?;
            }
            return Ok(());
        }
        if should_skip(die) {
            trace!(tag = die.tag().0, "skipping unsupported DIE");
            return Ok(());
        }
        let kind = kind_of(die);
        if kind == BtfKind::Unkn {
            return Ok(());
        }
        self.register(die, kind)
    }

    fn register(&mut self, die: &'d dyn Die, kind: BtfKind) -> BtfResult<()> {
        if self.die_map.contains_key(&die.identity()) {
            return Ok(());
        }
        let entry = match kind {
            BtfKind::Int => {
                let enc = classify::int_encoding(die).expect("kind_of only returns Int when an encoding exists");
                TypeEntry::Int(IntEntry::shape(die, enc))
            }
            BtfKind::Ptr | BtfKind::Const | BtfKind::Volatile | BtfKind::Restrict | BtfKind::Typedef => {
                TypeEntry::Reference(ReferenceEntry::shape(die, kind))
            }
            BtfKind::Fwd => TypeEntry::Fwd(FwdEntry::shape(die)),
            BtfKind::Enum => TypeEntry::Enum(EnumEntry::shape(die)),
            BtfKind::Array => TypeEntry::Array(ArrayEntry::shape(die)),
            BtfKind::Struct | BtfKind::Union => TypeEntry::Composite(CompositeEntry::shape(die, kind)),
            BtfKind::Func | BtfKind::FuncProto => {
                unreachable!("kind_of() never classifies a DIE as Func/FuncProto directly")
            }
            BtfKind::Unkn => unreachable!("filtered out by caller"),
        };
        if entry.vlen() as u32 > BTF_MAX_VLEN {
            return Err(BtfError::VlenOverflow {
                kind: entry.kind(),
                vlen: entry.vlen(),
                max: BTF_MAX_VLEN,
            });
        }
        self.entries.push(entry);
        if self.entries.len() as u32 > BTF_MAX_TYPE {
            return Err(BtfError::TooManyTypes {
                count: self.entries.len(),
                max: BTF_MAX_TYPE,
            });
        }
        self.die_map.insert(die.identity(), self.entries.len() as u32);
        Ok(())
    }

    /// Runs the completion pass and freezes the context. No further
    /// compile units may be added afterwards.
    pub fn finish(&mut self) -> BtfResult<()> {
        self.strings.add("")?;
        let Context { entries, die_map, strings, .. } = self;
        let id_of = entry::id_of_fn(die_map);
        for e in entries.iter_mut() {
            e.complete(strings, &id_of)?;
        }
        self.finished = true;
        Ok(())
    }

    fn header(&self) -> Header {
        let type_len: usize = self.entries.iter().map(|e| e.encoded_size()).sum();
        Header {
            type_len,
            str_off: type_len,
            str_len: self.strings.size(),
        }
    }

    /// Writes the header, the type section, then the string section into
    /// `section` of `sink`. May be called any number of times once
    /// `finish` has run.
    pub fn emit(&self, sink: &mut dyn ByteSink, section: &str) -> BtfResult<()> {
        assert!(self.finished, "emit() called before finish()");
        sink.switch_section(section);
        let hdr = self.header();
        sink.emit_u16(BTF_MAGIC);
        sink.emit_u8(BTF_VERSION);
        sink.emit_u8(0); // flags
        sink.emit_u32(BTF_HDR_LEN);
        sink.emit_u32(0); // type_off
        sink.emit_u32(hdr.type_len as u32);
        sink.emit_u32(hdr.str_off as u32);
        sink.emit_u32(hdr.str_len as u32);
        for e in &self.entries {
            e.emit(sink);
        }
        self.strings.emit(sink);
        Ok(())
    }

    /// Human-readable dump of every type entry plus the string table.
    /// Diagnostic only; the format is not stable.
    pub fn show_all(&self) -> BtfResult<String> {
        assert!(self.finished, "show_all() called before finish()");
        let mut out = String::new();
        for (idx, e) in self.entries.iter().enumerate() {
            let _ = writeln!(out, "#{}: {:?} vlen={}", idx + 1, e.kind(), e.vlen());
        }
        Ok(out)
    }

    pub fn type_count(&self) -> usize {
        self.entries.len()
    }
}

impl<'d> Default for Context<'d> {
    fn default() -> Self {
        Context::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::VecSink;
    use crate::testdie::DieArena;

    #[test]
    fn empty_compile_unit_yields_only_header() {
        let mut arena = DieArena::new();
        let cu = arena.compile_unit();
        let mut ctx = Context::new();
        ctx.add_compile_unit(arena.get(cu)).unwrap();
        ctx.finish().unwrap();
        assert_eq!(ctx.type_count(), 0);
        let mut sink = VecSink::new();
        ctx.emit(&mut sink, ".BTF").unwrap();
        assert_eq!(sink.section(".BTF").unwrap().len(), 24);
    }

    #[test]
    fn struct_with_member_registers_both_types() {
        let mut arena = DieArena::new();
        let cu = arena.compile_unit();
        let int_ty = arena.base_type("int", 4, 0x05);
        let s = arena.structure("point", 8);
        arena.member(s, "x", int_ty, 0);
        arena.add_child(cu, int_ty);
        arena.add_child(cu, s);
        let mut ctx = Context::new();
        ctx.add_compile_unit(arena.get(cu)).unwrap();
        ctx.finish().unwrap();
        assert_eq!(ctx.type_count(), 2);
    }

    #[test]
    fn cyclic_struct_and_pointer_both_resolve() {
        // struct S { struct S *next; } — a pointer whose pointee is the
        // enclosing struct, registered before the struct completes.
        let mut arena = DieArena::new();
        let cu = arena.compile_unit();
        let s = arena.structure("s", 8);
        let ptr = arena.pointer(Some(s));
        arena.member(s, "next", ptr, 0);
        arena.add_child(cu, s);
        arena.add_child(cu, ptr);
        let mut ctx = Context::new();
        ctx.add_compile_unit(arena.get(cu)).unwrap();
        ctx.finish().unwrap();
        assert_eq!(ctx.type_count(), 2);
        let dump = ctx.show_all().unwrap();
        assert!(dump.contains("Struct"));
        assert!(dump.contains("Ptr"));
    }

    #[test]
    fn skipped_die_does_not_consume_an_id() {
        let mut arena = DieArena::new();
        let cu = arena.compile_unit();
        let float_ty = arena.base_type("float", 4, 0x04); // unrepresentable encoding
        let s = arena.structure("has_float", 4);
        arena.member(s, "f", float_ty, 0);
        arena.add_child(cu, float_ty);
        arena.add_child(cu, s);
        let mut ctx = Context::new();
        ctx.add_compile_unit(arena.get(cu)).unwrap();
        ctx.finish().unwrap();
        // float_ty is UNKN and never registered; the struct itself still is.
        assert_eq!(ctx.type_count(), 1);
    }

    #[test]
    #[should_panic(expected = "compile unit root DIE must have tag")]
    fn add_compile_unit_rejects_non_cu_root() {
        let mut arena = DieArena::new();
        let not_cu = arena.structure("oops", 4);
        let mut ctx = Context::new();
        let _ = ctx.add_compile_unit(arena.get(not_cu));
    }
}
