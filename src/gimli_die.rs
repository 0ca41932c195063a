//! `Die` adapter backed by `gimli`, feature-gated behind `gimli`. Grounded
//! in how `bpf-linker`'s DISanitizer pass walks
//! `gimli::Dwarf`/`UnitHeader`/`DebuggingInformationEntry` trees using the
//! same `DW_TAG_*`/`DW_AT_*` constants this crate's [`crate::die`] module
//! mirrors numerically.
//!
//! `gimli`'s own entry references only live as long as the cursor that
//! produced them, which doesn't fit `Die::children() -> Vec<&dyn Die>`'s
//! implied stable-borrow shape. So each compile unit is eagerly flattened,
//! once, into an arena of owned nodes (the same raw-pointer-into-`Box`
//! trick as [`crate::testdie`]), and `Die` is implemented against that
//! arena instead of against `gimli` types directly.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs::File;

use gimli::{AttributeValue, EndianSlice, LittleEndian, UnitOffset};
use memmap2::Mmap;
use object::{Object, ObjectSection};

use crate::die::{Attr, AttrId, Die, Tag};
use crate::error::BtfResult;

type R<'a> = EndianSlice<'a, LittleEndian>;

struct Node {
    tag: Tag,
    name: Option<String>,
    ints: Vec<(AttrId, i64)>,
    flags: Vec<AttrId>,
    type_ref: Cell<Option<*const Node>>,
    children: RefCell<Vec<*const Node>>,
}

impl Die for Node {
    fn identity(&self) -> u64 {
        self as *const Node as u64
    }

    fn tag(&self) -> Tag {
        self.tag
    }

    fn attr(&self, id: AttrId) -> Option<Attr<'_>> {
        if id == AttrId::NAME {
            return self.name.as_deref().map(Attr::Str);
        }
        if id == AttrId::TYPE {
            return self.type_ref.get().map(|p| Attr::Ref(unsafe { &*p } as &dyn Die));
        }
        if self.flags.contains(&id) {
            return Some(Attr::Flag);
        }
        self.ints.iter().find(|(a, _)| *a == id).map(|&(_, v)| Attr::Int(v))
    }

    fn children(&self) -> Vec<&dyn Die> {
        self.children.borrow().iter().map(|&p| unsafe { &*p } as &dyn Die).collect()
    }
}

/// One compile unit's DIE tree, flattened and owned. `root()` hands the
/// translation core a `&dyn Die` whose lifetime is tied to this arena.
pub struct GimliUnit {
    nodes: Vec<Box<Node>>,
    root: usize,
}

impl GimliUnit {
    pub fn root(&self) -> &dyn Die {
        &*self.nodes[self.root]
    }
}

/// An mmap'd ELF file plus the `gimli::Dwarf` borrowing from it, and every
/// compile unit already flattened into a [`GimliUnit`] arena.
pub struct GimliSource {
    _mmap: Mmap,
    pub units: Vec<GimliUnit>,
}

/// Maps a `gimli` attribute name to this crate's `AttrId`; tags and
/// attribute ids are numerically identical to `DW_TAG_*`/`DW_AT_*`, so no
/// table is needed, just a newtype wrap.
fn attr_id(name: gimli::DwAt) -> AttrId {
    AttrId(name.0)
}

fn tag_of(tag: gimli::DwTag) -> Tag {
    Tag(tag.0)
}

fn read_str<'a>(dwarf: &gimli::Dwarf<R<'a>>, unit: &gimli::Unit<R<'a>>, value: AttributeValue<R<'a>>) -> Option<String> {
    dwarf
        .attr_string(unit, value)
        .ok()
        .and_then(|s| s.to_string().ok().map(|s| s.into_owned()))
}

/// Opens `path` as an ELF object, mmaps it, and flattens every compile
/// unit's DWARF tree into owned arenas ready for [`crate::Context::add_compile_unit`].
pub fn load(path: &str) -> BtfResult<GimliSource> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    // Safety: `object` below only ever borrows from `mmap`'s backing bytes,
    // and `units` below only ever borrows from the `Dwarf<R<'static>>` we
    // build over that same memory. `GimliSource` keeps `mmap` alive for at
    // least as long as both, since it's dropped last.
    let data: &'static [u8] = unsafe { std::slice::from_raw_parts(mmap.as_ptr(), mmap.len()) };
    let object = object::File::parse(data).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

    let load_section = |id: gimli::SectionId| -> Result<R<'static>, gimli::Error> {
        let data = object
            .section_by_name(id.name())
            .and_then(|s| s.data().ok())
            .unwrap_or(&[]);
        Ok(EndianSlice::new(data, LittleEndian))
    };
    let dwarf = gimli::Dwarf::load(load_section)?;

    let mut units = Vec::new();
    let mut iter = dwarf.units();
    while let Some(header) = iter.next()? {
        let unit = dwarf.unit(header)?;
        units.push(flatten_unit(&dwarf, &unit)?);
    }
    Ok(GimliSource { _mmap: mmap, units })
}

fn flatten_unit<'a>(dwarf: &gimli::Dwarf<R<'a>>, unit: &gimli::Unit<R<'a>>) -> BtfResult<GimliUnit> {
    let mut nodes: Vec<Box<Node>> = Vec::new();
    let mut offset_to_idx: HashMap<UnitOffset, usize> = HashMap::new();
    // depth_stack[d] is the arena index of the current ancestor at depth d.
    let mut depth_stack: Vec<usize> = Vec::new();
    // pending type refs to resolve once every node exists.
    let mut type_refs: Vec<(usize, UnitOffset)> = Vec::new();

    let mut cursor = unit.entries();
    while let Some((delta, entry)) = cursor.next_dfs()? {
        let mut node = Box::new(Node {
            tag: tag_of(entry.tag()),
            name: None,
            ints: Vec::new(),
            flags: Vec::new(),
            type_ref: Cell::new(None),
            children: RefCell::new(Vec::new()),
        });

        let mut attrs = entry.attrs();
        while let Some(attr) = attrs.next()? {
            let id = attr_id(attr.name());
            match attr.value() {
                AttributeValue::Flag(true) => node.flags.push(id),
                AttributeValue::Udata(v) => node.ints.push((id, v as i64)),
                AttributeValue::Sdata(v) => node.ints.push((id, v)),
                AttributeValue::Data1(v) => node.ints.push((id, v as i64)),
                AttributeValue::Data2(v) => node.ints.push((id, v as i64)),
                AttributeValue::Data4(v) => node.ints.push((id, v as i64)),
                AttributeValue::Data8(v) => node.ints.push((id, v as i64)),
                AttributeValue::UnitRef(off) => type_refs.push((nodes.len(), off)),
                other @ (AttributeValue::String(_) | AttributeValue::DebugStrRef(_)) => {
                    if let Some(s) = read_str(dwarf, unit, other) {
                        node.name = Some(s);
                    }
                }
                _ => {}
            }
        }

        let idx = nodes.len();
        offset_to_idx.insert(entry.offset(), idx);
        if delta <= 0 {
            for _ in 0..(1 - delta) {
                depth_stack.pop();
            }
        }
        if let Some(&parent) = depth_stack.last() {
            let ptr: *const Node = &*node;
            nodes[parent].children.borrow_mut().push(ptr);
        }
        nodes.push(node);
        depth_stack.push(idx);
    }

    for (idx, off) in type_refs {
        if let Some(&target) = offset_to_idx.get(&off) {
            let ptr: *const Node = &*nodes[target];
            nodes[idx].type_ref.set(Some(ptr));
        }
    }

    Ok(GimliUnit { nodes, root: 0 })
}
