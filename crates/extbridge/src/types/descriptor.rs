// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors for C-style extension signatures.

use std::fmt;
use std::sync::Arc;

use crate::error::DecodeError;
use crate::types::layout::{check_bounds, LayoutConfig, POINTER_SIZE};
use crate::types::{StructType, Value};

/// Names of the closed primitive set, in resolution priority order.
pub const PRIMITIVE_NAMES: [&str; 4] = ["int", "char", "double", "float"];

/// A resolvable C-like type.
///
/// Descriptors are immutable and shared through `Arc`, so the same typedef
/// or struct resolved twice yields the same underlying descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Int,
    Char,
    Float,
    Double,
    /// `char*`, a null-terminated text pointer.
    String,
    Pointer(Arc<TypeDescriptor>),
    /// Fixed-length array, introduced through typedefs.
    Array {
        element: Arc<TypeDescriptor>,
        length: usize,
    },
    Struct(Arc<StructType>),
}

impl TypeDescriptor {
    /// Look up a primitive by its C name.
    pub fn primitive(name: &str) -> Option<Self> {
        match name {
            "int" => Some(Self::Int),
            "char" => Some(Self::Char),
            "double" => Some(Self::Double),
            "float" => Some(Self::Float),
            _ => None,
        }
    }

    pub fn pointer_to(inner: Arc<TypeDescriptor>) -> Self {
        Self::Pointer(inner)
    }

    pub fn array_of(element: Arc<TypeDescriptor>, length: usize) -> Self {
        Self::Array { element, length }
    }

    /// Arrays decay to addresses, so they are exempt from output wrapping.
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. })
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer(_) | Self::String)
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Self::Struct(_))
    }

    /// Pointee of a pointer descriptor.
    pub fn pointee(&self) -> Option<&Arc<TypeDescriptor>> {
        match self {
            Self::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Arc<StructType>> {
        match self {
            Self::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Byte size of one value in native memory, saturating at `usize::MAX`.
    pub fn size(&self) -> usize {
        self.checked_size().unwrap_or(usize::MAX)
    }

    /// Byte size, or `None` if an array size overflows `usize`.
    pub fn checked_size(&self) -> Option<usize> {
        match self {
            Self::Char => Some(1),
            Self::Int | Self::Float => Some(4),
            Self::Double => Some(8),
            Self::String | Self::Pointer(_) => Some(POINTER_SIZE),
            Self::Array { element, length } => element.checked_size()?.checked_mul(*length),
            Self::Struct(s) => Some(s.size()),
        }
    }

    /// Natural alignment in native memory.
    pub fn alignment(&self) -> usize {
        match self {
            Self::Char => 1,
            Self::Int | Self::Float => 4,
            Self::Double => 8,
            Self::String | Self::Pointer(_) => POINTER_SIZE,
            Self::Array { element, .. } => element.alignment(),
            Self::Struct(s) => s.alignment(),
        }
    }

    /// Decode one value starting at `offset`.
    pub fn unmarshal(
        &self,
        data: &[u8],
        offset: usize,
        config: &LayoutConfig,
    ) -> Result<Value, DecodeError> {
        match self {
            Self::Struct(s) => s.unmarshal(data, offset),
            Self::Array { element, length } => {
                check_bounds(data, offset, self.size())?;
                let stride = element.size();
                // Zero-sized elements pass the bounds check at any length.
                let mut items = Vec::with_capacity((*length).min(data.len()));
                for i in 0..*length {
                    items.push(element.unmarshal(data, offset + i * stride, config)?);
                }
                Ok(Value::Array(items))
            }
            Self::Int => Ok(Value::Int(config.read_i32(check_bounds(data, offset, 4)?))),
            Self::Char => Ok(Value::Char(check_bounds(data, offset, 1)?[0] as i8)),
            Self::Float => Ok(Value::Float(config.read_f32(check_bounds(data, offset, 4)?))),
            Self::Double => Ok(Value::Double(config.read_f64(check_bounds(data, offset, 8)?))),
            Self::String | Self::Pointer(_) => Ok(Value::Address(
                config.read_u32(check_bounds(data, offset, POINTER_SIZE)?),
            )),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Char => write!(f, "char"),
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
            Self::String => write!(f, "char*"),
            Self::Pointer(inner) => write!(f, "{}*", inner),
            Self::Array { element, length } => write!(f, "{}[{}]", element, length),
            Self::Struct(s) => write!(f, "{}", s.name()),
        }
    }
}
