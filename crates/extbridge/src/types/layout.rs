// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native memory layout rules and the built-in layout-driven prototype.
//!
//! # Layout
//!
//! Members are placed in declaration order. Each member starts at the next
//! multiple of its alignment (capped by [`LayoutConfig::pack`]), and the
//! struct size is rounded up to the largest member alignment:
//!
//! ```text
//! struct Sample { char tag; double value; int count; }
//!
//! offset  0: tag    (1)
//! offset  1: pad    (7)
//! offset  8: value  (8)
//! offset 16: count  (4)
//! offset 20: pad    (4)   size = 24, alignment = 8
//! ```

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, DecodeError};
use crate::types::struct_type::{PrototypeContext, StructPrototype};
use crate::types::{TypeDescriptor, Value};
use crate::types::value::StructValue;
use std::sync::Arc;

/// Width of a native pointer (and of `char*`).
pub const POINTER_SIZE: usize = 4;

/// Byte order of native memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// Layout and decoding configuration shared by all structs of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Byte order of native memory.
    pub byte_order: ByteOrder,
    /// Maximum member alignment (`#pragma pack(n)`), `None` for natural alignment.
    pub pack: Option<usize>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::Little,
            pack: None,
        }
    }
}

impl LayoutConfig {
    /// Effective alignment of a member after packing.
    pub fn effective_alignment(&self, natural: usize) -> usize {
        let natural = natural.max(1);
        match self.pack {
            Some(pack) if pack > 0 => natural.min(pack),
            _ => natural,
        }
    }

    pub(crate) fn read_i32(&self, bytes: &[u8]) -> i32 {
        match self.byte_order {
            ByteOrder::Little => LittleEndian::read_i32(bytes),
            ByteOrder::Big => BigEndian::read_i32(bytes),
        }
    }

    pub(crate) fn read_u32(&self, bytes: &[u8]) -> u32 {
        match self.byte_order {
            ByteOrder::Little => LittleEndian::read_u32(bytes),
            ByteOrder::Big => BigEndian::read_u32(bytes),
        }
    }

    pub(crate) fn read_f32(&self, bytes: &[u8]) -> f32 {
        match self.byte_order {
            ByteOrder::Little => LittleEndian::read_f32(bytes),
            ByteOrder::Big => BigEndian::read_f32(bytes),
        }
    }

    pub(crate) fn read_f64(&self, bytes: &[u8]) -> f64 {
        match self.byte_order {
            ByteOrder::Little => LittleEndian::read_f64(bytes),
            ByteOrder::Big => BigEndian::read_f64(bytes),
        }
    }
}

/// Return `data[offset..offset + need]`, or `BufferTooSmall`.
pub(crate) fn check_bounds(data: &[u8], offset: usize, need: usize) -> Result<&[u8], DecodeError> {
    match offset.checked_add(need) {
        Some(end) if end <= data.len() => Ok(&data[offset..end]),
        _ => Err(DecodeError::BufferTooSmall {
            offset,
            need,
            have: data.len().saturating_sub(offset),
        }),
    }
}

fn align_up(value: usize, alignment: usize) -> Option<usize> {
    value.checked_next_multiple_of(alignment)
}

#[derive(Debug, Clone, PartialEq)]
struct FieldLayout {
    name: String,
    offset: usize,
    type_desc: Arc<TypeDescriptor>,
}

/// Prototype computing a C layout from the declared members.
///
/// Registered in every catalog under
/// [`LAYOUT_PROTOTYPE_CLASS`](crate::catalog::LAYOUT_PROTOTYPE_CLASS).
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPrototype {
    type_name: String,
    fields: Vec<FieldLayout>,
    size: usize,
    alignment: usize,
    config: LayoutConfig,
}

impl LayoutPrototype {
    /// Lay out the members of `ctx`.
    ///
    /// Fails with [`BuildError::SizeOverflow`] if a member size, an offset or
    /// the padded total does not fit in `usize`.
    pub fn new(ctx: &PrototypeContext<'_>) -> Result<Self, BuildError> {
        let overflow = || BuildError::SizeOverflow {
            name: ctx.type_name.to_string(),
        };
        let config = *ctx.config;
        let mut offset: usize = 0;
        let mut max_align = 1;
        let mut fields = Vec::with_capacity(ctx.members.len());

        for member in ctx.members {
            let desc = member.descriptor();
            let size = desc.checked_size().ok_or_else(overflow)?;
            let align = config.effective_alignment(desc.alignment());
            max_align = max_align.max(align);
            offset = align_up(offset, align).ok_or_else(overflow)?;
            fields.push(FieldLayout {
                name: member.name().to_string(),
                offset,
                type_desc: desc.clone(),
            });
            offset = offset.checked_add(size).ok_or_else(overflow)?;
        }

        Ok(Self {
            type_name: ctx.type_name.to_string(),
            fields,
            size: align_up(offset, max_align).ok_or_else(overflow)?,
            alignment: max_align,
            config,
        })
    }

    /// Byte offset of a member.
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.offset)
    }
}

impl StructPrototype for LayoutPrototype {
    fn size(&self) -> usize {
        self.size
    }

    fn alignment(&self) -> usize {
        self.alignment
    }

    fn member_offset(&self, name: &str) -> Option<usize> {
        self.offset_of(name)
    }

    fn unmarshal(&self, data: &[u8], offset: usize) -> Result<Value, DecodeError> {
        check_bounds(data, offset, self.size)?;
        let mut value = StructValue::new(&self.type_name);
        for field in &self.fields {
            let decoded = field
                .type_desc
                .unmarshal(data, offset + field.offset, &self.config)?;
            value.push(&field.name, decoded);
        }
        Ok(Value::Struct(value))
    }
}
