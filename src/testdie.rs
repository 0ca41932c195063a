//! Synthetic DIE trees for unit tests. Real DWARF entries live in one
//! contiguous arena and reference each other by offset, which is exactly
//! what lets a struct member point forward to a not-yet-visited type and a
//! pointer point back to its enclosing struct. This arena reproduces that
//! shape with indices instead of section offsets, boxing each node so its
//! address is stable once allocated.

use std::cell::{Cell, RefCell};

use crate::die::{Attr, AttrId, Die, Tag};

struct Node {
    tag: Tag,
    name: Option<String>,
    ints: Vec<(AttrId, i64)>,
    flags: Vec<AttrId>,
    type_ref: Cell<Option<*const Node>>,
    children: RefCell<Vec<*const Node>>,
}

#[derive(Clone, Copy, Debug)]
pub struct DieId(usize);

#[derive(Default)]
pub struct DieArena {
    nodes: Vec<Box<Node>>,
}

impl DieArena {
    pub fn new() -> Self {
        DieArena::default()
    }

    fn alloc(&mut self, tag: Tag) -> DieId {
        self.nodes.push(Box::new(Node {
            tag,
            name: None,
            ints: Vec::new(),
            flags: Vec::new(),
            type_ref: Cell::new(None),
            children: RefCell::new(Vec::new()),
        }));
        DieId(self.nodes.len() - 1)
    }

    fn node(&self, id: DieId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn set_name(&mut self, id: DieId, name: &str) -> &mut Self {
        self.nodes[id.0].name = Some(name.to_owned());
        self
    }

    pub fn set_int(&mut self, id: DieId, attr: AttrId, v: i64) -> &mut Self {
        self.nodes[id.0].ints.push((attr, v));
        self
    }

    pub fn set_flag(&mut self, id: DieId, attr: AttrId) -> &mut Self {
        self.nodes[id.0].flags.push(attr);
        self
    }

    pub fn set_type(&mut self, id: DieId, target: DieId) -> &mut Self {
        let ptr: *const Node = &*self.nodes[target.0];
        self.nodes[id.0].type_ref.set(Some(ptr));
        self
    }

    pub fn add_child(&mut self, parent: DieId, child: DieId) -> &mut Self {
        let ptr: *const Node = &*self.nodes[child.0];
        self.nodes[parent.0].children.borrow_mut().push(ptr);
        self
    }

    pub fn get(&self, id: DieId) -> &dyn Die {
        self.node(id)
    }

    // --- convenience constructors, one per DWARF tag this crate cares about ---

    pub fn compile_unit(&mut self) -> DieId {
        self.alloc(Tag::COMPILE_UNIT)
    }

    pub fn base_type(&mut self, name: &str, byte_size: i64, encoding: i64) -> DieId {
        let id = self.alloc(Tag::BASE_TYPE);
        self.set_name(id, name);
        self.set_int(id, AttrId::BYTE_SIZE, byte_size);
        self.set_int(id, AttrId::ENCODING, encoding);
        id
    }

    pub fn pointer(&mut self, pointee: Option<DieId>) -> DieId {
        let id = self.alloc(Tag::POINTER_TYPE);
        if let Some(p) = pointee {
            self.set_type(id, p);
        }
        id
    }

    pub fn cv_qualifier(&mut self, tag: Tag, pointee: Option<DieId>) -> DieId {
        let id = self.alloc(tag);
        if let Some(p) = pointee {
            self.set_type(id, p);
        }
        id
    }

    pub fn typedef(&mut self, name: &str, target: Option<DieId>) -> DieId {
        let id = self.alloc(Tag::TYPEDEF);
        self.set_name(id, name);
        if let Some(t) = target {
            self.set_type(id, t);
        }
        id
    }

    pub fn fwd_decl(&mut self, tag: Tag, name: &str) -> DieId {
        let id = self.alloc(tag);
        self.set_name(id, name);
        self.set_flag(id, AttrId::DECLARATION);
        id
    }

    pub fn structure(&mut self, name: &str, byte_size: i64) -> DieId {
        let id = self.alloc(Tag::STRUCTURE_TYPE);
        self.set_name(id, name);
        self.set_int(id, AttrId::BYTE_SIZE, byte_size);
        id
    }

    pub fn union_type(&mut self, name: &str, byte_size: i64) -> DieId {
        let id = self.alloc(Tag::UNION_TYPE);
        self.set_name(id, name);
        self.set_int(id, AttrId::BYTE_SIZE, byte_size);
        id
    }

    pub fn member(&mut self, parent: DieId, name: &str, ty: DieId, bit_offset: i64) -> DieId {
        let id = self.alloc(Tag::MEMBER);
        self.set_name(id, name);
        self.set_type(id, ty);
        self.set_int(id, AttrId::BIT_OFFSET, bit_offset);
        self.add_child(parent, id);
        id
    }

    pub fn enumeration(&mut self, name: &str, byte_size: i64) -> DieId {
        let id = self.alloc(Tag::ENUMERATION_TYPE);
        if !name.is_empty() {
            self.set_name(id, name);
        }
        self.set_int(id, AttrId::BYTE_SIZE, byte_size);
        id
    }

    pub fn enumerator(&mut self, parent: DieId, name: &str, value: i64) -> DieId {
        let id = self.alloc(Tag::ENUMERATOR);
        self.set_name(id, name);
        self.set_int(id, AttrId::CONST_VALUE, value);
        self.add_child(parent, id);
        id
    }

    /// A `variable` DIE whose `DW_AT_type` is the given `array_type` DIE
    /// (the variable itself is what gets registered, not the array type).
    pub fn variable(&mut self, name: &str, array_ty: DieId) -> DieId {
        let id = self.alloc(Tag::VARIABLE);
        self.set_name(id, name);
        self.set_type(id, array_ty);
        id
    }

    pub fn array_type(&mut self, elem_ty: DieId) -> DieId {
        let id = self.alloc(Tag::ARRAY_TYPE);
        self.set_type(id, elem_ty);
        id
    }

    pub fn subrange(&mut self, parent: DieId, index_ty: Option<DieId>, count: i64) -> DieId {
        let id = self.alloc(Tag::SUBRANGE_TYPE);
        if let Some(t) = index_ty {
            self.set_type(id, t);
        }
        self.set_int(id, AttrId::COUNT, count);
        self.add_child(parent, id);
        id
    }

    pub fn subprogram(&mut self, name: &str, ret_ty: Option<DieId>) -> DieId {
        let id = self.alloc(Tag::SUBPROGRAM);
        self.set_name(id, name);
        if let Some(t) = ret_ty {
            self.set_type(id, t);
        }
        id
    }

    pub fn subroutine_type(&mut self, ret_ty: Option<DieId>) -> DieId {
        let id = self.alloc(Tag::SUBROUTINE_TYPE);
        if let Some(t) = ret_ty {
            self.set_type(id, t);
        }
        id
    }

    pub fn formal_parameter(&mut self, parent: DieId, ty: DieId) -> DieId {
        let id = self.alloc(Tag::FORMAL_PARAMETER);
        self.set_type(id, ty);
        self.add_child(parent, id);
        id
    }
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
            return self
                .type_ref
                .get()
                .map(|p| Attr::Ref(unsafe { &*p } as &dyn Die));
        }
        if self.flags.contains(&id) {
            return Some(Attr::Flag);
        }
        self.ints
            .iter()
            .find(|(a, _)| *a == id)
            .map(|&(_, v)| Attr::Int(v))
    }

    fn children(&self) -> Vec<&dyn Die> {
        self.children
            .borrow()
            .iter()
            .map(|&p| unsafe { &*p } as &dyn Die)
            .collect()
    }
}

/// Standalone single-node DIEs for tests that don't need a full arena.
pub struct TestDie(Box<Node>);

impl TestDie {
    fn new(tag: Tag) -> Self {
        TestDie(Box::new(Node {
            tag,
            name: None,
            ints: Vec::new(),
            flags: Vec::new(),
            type_ref: Cell::new(None),
            children: RefCell::new(Vec::new()),
        }))
    }

    pub fn base_type(name: &str, byte_size: i64, encoding: i64) -> Self {
        let mut d = TestDie::new(Tag::BASE_TYPE);
        d.0.name = Some(name.to_owned());
        d.0.ints.push((AttrId::BYTE_SIZE, byte_size));
        d.0.ints.push((AttrId::ENCODING, encoding));
        d
    }

    pub fn fwd_decl(tag: Tag, name: &str) -> Self {
        let mut d = TestDie::new(tag);
        d.0.name = Some(name.to_owned());
        d.0.flags.push(AttrId::DECLARATION);
        d
    }

    pub fn pointer(pointee: Option<&TestDie>) -> Self {
        let mut d = TestDie::new(Tag::POINTER_TYPE);
        if let Some(p) = pointee {
            d.0.type_ref.set(Some(&*p.0 as *const Node));
        }
        d
    }

    pub fn cv_qualifier(tag: Tag, pointee: Option<&TestDie>) -> Self {
        let mut d = TestDie::new(tag);
        if let Some(p) = pointee {
            d.0.type_ref.set(Some(&*p.0 as *const Node));
        }
        d
    }
}

impl std::ops::Deref for TestDie {
    type Target = dyn Die;
    fn deref(&self) -> &dyn Die {
        &*self.0
    }
}

impl Die for TestDie {
    fn identity(&self) -> u64 {
        self.0.identity()
    }
    fn tag(&self) -> Tag {
        self.0.tag()
    }
    fn attr(&self, id: AttrId) -> Option<Attr<'_>> {
        self.0.attr(id)
    }
    fn children(&self) -> Vec<&dyn Die> {
        self.0.children()
    }
}
