//! The per-kind, two-phase in-memory model of one BTF type. `shape` fills
//! everything derivable from the DIE alone; `complete` fills everything
//! that needs the DIE-to-id map and the string table, which are only
//! fully populated once every DIE has been walked.

use std::collections::HashMap;

use crate::die::{AttrId, Die, Tag};
use crate::error::BtfResult;
use crate::strtab::StringTable;
use crate::types::BtfKind;
use crate::wire;

/// Looks a DIE's referent up in the id map; an absent DIE (void, or a
/// collapsed/skipped reference) resolves to id 0.
pub type IdOf<'a> = dyn Fn(Option<&dyn Die>) -> u32 + 'a;

pub struct IntEntry<'d> {
    die: &'d dyn Die,
    byte_size: u32,
    int_val: u32,
    name_off: u32,
}

impl<'d> IntEntry<'d> {
    pub fn shape(die: &'d dyn Die, encoding_bits: u32) -> Self {
        let byte_size = die.int_attr(AttrId::BYTE_SIZE).unwrap_or(0) as u32;
        let bit_offset = die.int_attr(AttrId::BIT_OFFSET).unwrap_or(0) as u32;
        let bit_size = die
            .int_attr(AttrId::BIT_SIZE)
            .map(|v| v as u32)
            .unwrap_or(byte_size * 8);
        let int_val = (encoding_bits << 24) | (bit_offset << 16) | (bit_size & 0xff);
        IntEntry {
            die,
            byte_size,
            int_val,
            name_off: 0,
        }
    }

    pub fn complete(&mut self, strings: &mut StringTable) -> BtfResult<()> {
        self.name_off = strings.add(self.die.name().unwrap_or(""))?;
        Ok(())
    }

    pub fn encoded_size(&self) -> usize {
        12 + 4
    }

    pub fn emit(&self, sink: &mut dyn crate::sink::ByteSink) {
        emit_header(sink, self.name_off, wire::info(BtfKind::Int.wire_value(), 0), self.byte_size);
        sink.emit_u32(self.int_val);
    }
}

/// PTR / CONST / VOLATILE / RESTRICT / TYPEDEF: a bare reference to
/// another type; always anonymous.
pub struct ReferenceEntry<'d> {
    die: &'d dyn Die,
    kind: BtfKind,
    type_id: u32,
}

impl<'d> ReferenceEntry<'d> {
    pub fn shape(die: &'d dyn Die, kind: BtfKind) -> Self {
        ReferenceEntry { die, kind, type_id: 0 }
    }

    pub fn complete(&mut self, id_of: &IdOf<'_>) {
        self.type_id = id_of(self.die.type_attr());
    }

    pub fn encoded_size(&self) -> usize {
        12
    }

    pub fn emit(&self, sink: &mut dyn crate::sink::ByteSink) {
        emit_header(sink, 0, wire::info(self.kind.wire_value(), 0), self.type_id);
    }
}

pub struct FwdEntry<'d> {
    die: &'d dyn Die,
    is_union: bool,
    name_off: u32,
}

impl<'d> FwdEntry<'d> {
    pub fn shape(die: &'d dyn Die) -> Self {
        FwdEntry {
            die,
            is_union: die.tag() == Tag::UNION_TYPE,
            name_off: 0,
        }
    }

    pub fn complete(&mut self, strings: &mut StringTable) -> BtfResult<()> {
        self.name_off = strings.add(self.die.name().unwrap_or(""))?;
        Ok(())
    }

    pub fn encoded_size(&self) -> usize {
        12
    }

    pub fn emit(&self, sink: &mut dyn crate::sink::ByteSink) {
        let flag = if self.is_union { wire::BTF_FWD_UNION_FLAG } else { 0 };
        emit_header(
            sink,
            self.name_off,
            wire::info(BtfKind::Fwd.wire_value(), 0) | (flag << 16),
            0,
        );
    }
}

pub struct EnumEntry<'d> {
    die: &'d dyn Die,
    byte_size: u32,
    vlen: usize,
    name_off: u32,
    values: Vec<(u32, i32)>,
}

impl<'d> EnumEntry<'d> {
    pub fn shape(die: &'d dyn Die) -> Self {
        let vlen = die.children().iter().filter(|c| c.tag() == Tag::ENUMERATOR).count();
        EnumEntry {
            die,
            byte_size: die.int_attr(AttrId::BYTE_SIZE).unwrap_or(0) as u32,
            vlen,
            name_off: 0,
            values: Vec::new(),
        }
    }

    pub fn complete(&mut self, strings: &mut StringTable) -> BtfResult<()> {
        self.name_off = strings.add(self.die.name().unwrap_or(""))?;
        for child in self.die.children() {
            if child.tag() != Tag::ENUMERATOR {
                continue;
            }
            let name_off = strings.add(child.name().unwrap_or(""))?;
            let value = child.int_attr(AttrId::CONST_VALUE).unwrap_or(0) as i32;
            self.values.push((name_off, value));
        }
        Ok(())
    }

    pub fn encoded_size(&self) -> usize {
        12 + self.vlen * 8
    }

    pub fn emit(&self, sink: &mut dyn crate::sink::ByteSink) {
        emit_header(
            sink,
            self.name_off,
            wire::info(BtfKind::Enum.wire_value(), self.vlen as u32),
            self.byte_size,
        );
        for &(name_off, val) in &self.values {
            sink.emit_u32(name_off);
            sink.emit_u32(val as u32);
        }
    }
}

/// A `variable` DIE anchoring a named array.
pub struct ArrayEntry<'d> {
    die: &'d dyn Die,
    name_off: u32,
    elem_type: u32,
    index_type: u32,
    nelems: u32,
}

impl<'d> ArrayEntry<'d> {
    pub fn shape(die: &'d dyn Die) -> Self {
        ArrayEntry {
            die,
            name_off: 0,
            elem_type: 0,
            index_type: 0,
            nelems: 0,
        }
    }

    pub fn complete(&mut self, strings: &mut StringTable, id_of: &IdOf<'_>) -> BtfResult<()> {
        self.name_off = strings.add(self.die.name().unwrap_or(""))?;
        let array_ty = self.die.type_attr();
        self.elem_type = id_of(array_ty.and_then(|a| a.type_attr()));
        if let Some(array_ty) = array_ty {
            if let Some(subrange) = array_ty.children().into_iter().find(|c| c.tag() == Tag::SUBRANGE_TYPE) {
                self.nelems = subrange.int_attr(AttrId::COUNT).unwrap_or(0) as u32;
                self.index_type = id_of(subrange.type_attr());
            }
        }
        Ok(())
    }

    pub fn encoded_size(&self) -> usize {
        12 + 12
    }

    pub fn emit(&self, sink: &mut dyn crate::sink::ByteSink) {
        emit_header(sink, self.name_off, wire::info(BtfKind::Array.wire_value(), 0), 0);
        sink.emit_u32(self.elem_type);
        sink.emit_u32(self.index_type);
        sink.emit_u32(self.nelems);
    }
}

pub struct Member {
    pub name_off: u32,
    pub type_id: u32,
    pub bit_offset: u32,
}

pub struct CompositeEntry<'d> {
    die: &'d dyn Die,
    kind: BtfKind,
    byte_size: u32,
    vlen: usize,
    name_off: u32,
    members: Vec<Member>,
}

impl<'d> CompositeEntry<'d> {
    pub fn shape(die: &'d dyn Die, kind: BtfKind) -> Self {
        let vlen = die.children().iter().filter(|c| c.tag() == Tag::MEMBER).count();
        CompositeEntry {
            die,
            kind,
            byte_size: die.int_attr(AttrId::BYTE_SIZE).unwrap_or(0) as u32,
            vlen,
            name_off: 0,
            members: Vec::new(),
        }
    }

    pub fn complete(&mut self, strings: &mut StringTable, id_of: &IdOf<'_>) -> BtfResult<()> {
        self.name_off = strings.add(self.die.name().unwrap_or(""))?;
        for child in self.die.children() {
            if child.tag() != Tag::MEMBER {
                continue;
            }
            let name_off = strings.add(child.name().unwrap_or(""))?;
            let type_id = id_of(child.type_attr());
            let bit_offset = child.int_attr(AttrId::BIT_OFFSET).unwrap_or(0) as u32;
            self.members.push(Member { name_off, type_id, bit_offset });
        }
        Ok(())
    }

    pub fn encoded_size(&self) -> usize {
        12 + self.vlen * 12
    }

    pub fn emit(&self, sink: &mut dyn crate::sink::ByteSink) {
        emit_header(
            sink,
            self.name_off,
            wire::info(self.kind.wire_value(), self.vlen as u32),
            self.byte_size,
        );
        for m in &self.members {
            sink.emit_u32(m.name_off);
            sink.emit_u32(m.type_id);
            sink.emit_u32(m.bit_offset);
        }
    }
}

pub struct FuncEntry<'d> {
    die: &'d dyn Die,
    vlen: usize,
    name_off: u32,
    ret_type: u32,
    params: Vec<u32>,
}

impl<'d> FuncEntry<'d> {
    pub fn shape(die: &'d dyn Die) -> Self {
        let vlen = die
            .children()
            .iter()
            .filter(|c| c.tag() == Tag::FORMAL_PARAMETER)
            .count();
        FuncEntry {
            die,
            vlen,
            name_off: 0,
            ret_type: 0,
            params: Vec::new(),
        }
    }

    pub fn complete(&mut self, strings: &mut StringTable, id_of: &IdOf<'_>) -> BtfResult<()> {
        let ret = self.die.type_attr();
        let name = self
            .die
            .name()
            .or_else(|| ret.and_then(|r| r.name()))
            .unwrap_or("");
        self.name_off = strings.add(name)?;
        self.ret_type = id_of(ret);
        for child in self.die.children() {
            if child.tag() != Tag::FORMAL_PARAMETER {
                continue;
            }
            self.params.push(id_of(child.type_attr()));
        }
        Ok(())
    }

    pub fn encoded_size(&self) -> usize {
        12 + self.vlen * 4
    }

    pub fn emit(&self, sink: &mut dyn crate::sink::ByteSink) {
        emit_header(
            sink,
            self.name_off,
            wire::info(BtfKind::Func.wire_value(), self.vlen as u32),
            self.ret_type,
        );
        for &p in &self.params {
            sink.emit_u32(p);
        }
    }
}

pub struct FuncProtoEntry<'d> {
    die: &'d dyn Die,
    vlen: usize,
    ret_type: u32,
    params: Vec<u32>,
}

impl<'d> FuncProtoEntry<'d> {
    pub fn shape(die: &'d dyn Die) -> Self {
        let vlen = die
            .children()
            .iter()
            .filter(|c| c.tag() == Tag::FORMAL_PARAMETER)
            .count();
        FuncProtoEntry {
            die,
            vlen,
            ret_type: 0,
            params: Vec::new(),
        }
    }

    pub fn complete(&mut self, id_of: &IdOf<'_>) {
        self.ret_type = id_of(self.die.type_attr());
        for child in self.die.children() {
            if child.tag() != Tag::FORMAL_PARAMETER {
                continue;
            }
            self.params.push(id_of(child.type_attr()));
        }
    }

    pub fn encoded_size(&self) -> usize {
        12 + self.vlen * 4
    }

    pub fn emit(&self, sink: &mut dyn crate::sink::ByteSink) {
        emit_header(
            sink,
            0,
            wire::info(BtfKind::FuncProto.wire_value(), self.vlen as u32),
            self.ret_type,
        );
        for &p in &self.params {
            sink.emit_u32(p);
        }
    }
}

pub enum TypeEntry<'d> {
    Int(IntEntry<'d>),
    Reference(ReferenceEntry<'d>),
    Fwd(FwdEntry<'d>),
    Enum(EnumEntry<'d>),
    Array(ArrayEntry<'d>),
    Composite(CompositeEntry<'d>),
    Func(FuncEntry<'d>),
    FuncProto(FuncProtoEntry<'d>),
}

impl<'d> TypeEntry<'d> {
    pub fn complete(&mut self, strings: &mut StringTable, id_of: &IdOf<'_>) -> BtfResult<()> {
        match self {
            TypeEntry::Int(e) => e.complete(strings),
            TypeEntry::Reference(e) => {
                e.complete(id_of);
                Ok(())
            }
            TypeEntry::Fwd(e) => e.complete(strings),
            TypeEntry::Enum(e) => e.complete(strings),
            TypeEntry::Array(e) => e.complete(strings, id_of),
            TypeEntry::Composite(e) => e.complete(strings, id_of),
            TypeEntry::Func(e) => e.complete(strings, id_of),
            TypeEntry::FuncProto(e) => {
                e.complete(id_of);
                Ok(())
            }
        }
    }

    pub fn encoded_size(&self) -> usize {
        match self {
            TypeEntry::Int(e) => e.encoded_size(),
            TypeEntry::Reference(e) => e.encoded_size(),
            TypeEntry::Fwd(e) => e.encoded_size(),
            TypeEntry::Enum(e) => e.encoded_size(),
            TypeEntry::Array(e) => e.encoded_size(),
            TypeEntry::Composite(e) => e.encoded_size(),
            TypeEntry::Func(e) => e.encoded_size(),
            TypeEntry::FuncProto(e) => e.encoded_size(),
        }
    }

    pub fn kind(&self) -> BtfKind {
        match self {
            TypeEntry::Int(_) => BtfKind::Int,
            TypeEntry::Reference(e) => e.kind,
            TypeEntry::Fwd(_) => BtfKind::Fwd,
            TypeEntry::Enum(_) => BtfKind::Enum,
            TypeEntry::Array(_) => BtfKind::Array,
            TypeEntry::Composite(e) => e.kind,
            TypeEntry::Func(_) => BtfKind::Func,
            TypeEntry::FuncProto(_) => BtfKind::FuncProto,
        }
    }

    pub fn vlen(&self) -> usize {
        match self {
            TypeEntry::Enum(e) => e.vlen,
            TypeEntry::Composite(e) => e.vlen,
            TypeEntry::Func(e) => e.vlen,
            TypeEntry::FuncProto(e) => e.vlen,
            _ => 0,
        }
    }

    pub fn emit(&self, sink: &mut dyn crate::sink::ByteSink) {
        match self {
            TypeEntry::Int(e) => e.emit(sink),
            TypeEntry::Reference(e) => e.emit(sink),
            TypeEntry::Fwd(e) => e.emit(sink),
            TypeEntry::Enum(e) => e.emit(sink),
            TypeEntry::Array(e) => e.emit(sink),
            TypeEntry::Composite(e) => e.emit(sink),
            TypeEntry::Func(e) => e.emit(sink),
            TypeEntry::FuncProto(e) => e.emit(sink),
        }
    }
}

/// Writes the 12-byte common `btf_type` prefix shared by every kind.
fn emit_header(sink: &mut dyn crate::sink::ByteSink, name_off: u32, info: u32, size_or_type: u32) {
    sink.emit_u32(name_off);
    sink.emit_u32(info);
    sink.emit_u32(size_or_type);
}

/// Builds an `IdOf` closure bound to one DIE-identity-to-id map.
pub fn id_of_fn(map: &HashMap<u64, u32>) -> impl Fn(Option<&dyn Die>) -> u32 + '_ {
    move |die| die.map(|d| map.get(&d.identity()).copied().unwrap_or(0)).unwrap_or(0)
}
