// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime type descriptions for extension signatures.
//!
//! - **TypeDescriptor**: primitives, pointers, `char*` strings, arrays, structs
//! - **StructType**: ordered member list plus a native decoding prototype
//! - **LayoutPrototype**: prototype deriving a C layout from the members
//! - **Value**: decoded language-level values

mod descriptor;
mod layout;
mod struct_type;
mod value;

pub use descriptor::{TypeDescriptor, PRIMITIVE_NAMES};
pub use layout::{ByteOrder, LayoutConfig, LayoutPrototype, POINTER_SIZE};
pub use struct_type::{
    PrototypeContext, StructMember, StructPrototype, StructType, StructTypeBuilder,
};
pub use value::{StructValue, Value};
