//! BTF on-disk layout: header, the common type-record prefix, and the
//! kind-specific trailing records. Field names and layout follow the
//! kernel's `include/uapi/linux/btf.h`.

pub const BTF_MAGIC: u16 = 0xeB9F;
pub const BTF_VERSION: u8 = 1;

pub const BTF_MAX_TYPE: u32 = 0xffff;
pub const BTF_MAX_NAME_OFFSET: u32 = 0xffff;
pub const BTF_MAX_VLEN: u32 = 0xffff;

pub const BTF_KIND_UNKN: u32 = 0;
pub const BTF_KIND_INT: u32 = 1;
pub const BTF_KIND_PTR: u32 = 2;
pub const BTF_KIND_ARRAY: u32 = 3;
pub const BTF_KIND_STRUCT: u32 = 4;
pub const BTF_KIND_UNION: u32 = 5;
pub const BTF_KIND_ENUM: u32 = 6;
pub const BTF_KIND_FWD: u32 = 7;
pub const BTF_KIND_TYPEDEF: u32 = 8;
pub const BTF_KIND_VOLATILE: u32 = 9;
pub const BTF_KIND_CONST: u32 = 10;
pub const BTF_KIND_RESTRICT: u32 = 11;
pub const BTF_KIND_FUNC: u32 = 12;
pub const BTF_KIND_FUNC_PROTO: u32 = 13;

pub const BTF_INT_SIGNED: u32 = 0b001;
pub const BTF_INT_CHAR: u32 = 0b010;
pub const BTF_INT_BOOL: u32 = 0b100;
pub const BTF_INT_INVALID_ENCODING: u32 = 0xff;

/// Bit 0 of the otherwise-unused `info` range, set for FWD-to-union.
pub const BTF_FWD_UNION_FLAG: u32 = 1 << 0;

/// `magic(2) + version(1) + flags(1) + hdr_len(4) + type_off(4) +
/// type_len(4) + str_off(4) + str_len(4)`.
pub const BTF_HDR_LEN: u32 = 24;

pub fn info(kind: u32, vlen: u32) -> u32 {
    (kind << 24) | (vlen & 0xffff)
}

pub fn vlen_of(info: u32) -> u32 {
    info & 0xffff
}

pub fn kind_of_info(info: u32) -> u32 {
    (info >> 24) & 0xf
}
