//! Bytecode File Layout
//!
//! All integers are little-endian. Layout:
//!
//! ```text
//! magic            u32
//! function count   u32
//! per function:    name (u32 length + bytes), argn u32
//! per function:    regn u32, varn u32, line count u32, lines
//! line:            op (tag + payload), result flag u8, operand count u32, operands
//! ```
//!
//! Strings are a u32 byte length followed by UTF-8 bytes.

/// Bytecode magic number
pub const MAGIC: u32 = 0x8919_1500;

// Operand tags
pub const TAG_STR: u8 = 1;
pub const TAG_INT: u8 = 2;
pub const TAG_FLOAT: u8 = 3;
pub const TAG_REGISTER: u8 = 12;
pub const TAG_LOCAL: u8 = 13;
pub const TAG_GLOBAL: u8 = 17;

// Operation tags
pub const TAG_BLOCK_START: u8 = 8;
pub const TAG_BLOCK_END: u8 = 9;
pub const TAG_FUNCTION: u8 = 10;
pub const TAG_OPCODE: u8 = 14;
