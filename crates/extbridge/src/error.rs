// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for type resolution, module setup, decoding and dispatch.
//!
//! - [`ResolveError`]: malformed extension metadata (unknown type name,
//!   pointer depth above the cap). Never retried.
//! - [`BuildError`]: a module, struct or function table could not be
//!   constructed. The loader decides whether to skip the extension.
//! - [`DecodeError`]: the byte buffer cannot hold the requested value.
//! - [`InvokeError`]: dispatch to an extension function failed.

use thiserror::Error;

use crate::module::FunctionId;

/// Errors raised while resolving a type name to a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("pointer depth {depth} for `{name}` exceeds the maximum of {max}", max = crate::registry::MAX_POINTER_DEPTH)]
    PointerDepthExceeded { name: String, depth: usize },

    #[error("unknown type: {0}")]
    UnknownType(String),
}

/// Errors raised while constructing modules and struct types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("no native module registered for class `{0}`")]
    UnknownModuleClass(String),

    #[error("no struct prototype registered for class `{0}`")]
    UnknownPrototypeClass(String),

    #[error("member `{member}` of struct `{struct_name}`: {source}")]
    Member {
        struct_name: String,
        member: String,
        #[source]
        source: ResolveError,
    },

    #[error("function `{0}` is declared more than once")]
    DuplicateFunction(String),

    #[error("size of `{name}` overflows the address space")]
    SizeOverflow { name: String },
}

/// Errors raised while decoding values from a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("buffer too small: need {need} bytes at offset {offset}, have {have}")]
    BufferTooSmall {
        offset: usize,
        need: usize,
        have: usize,
    },
}

/// Errors raised while dispatching extension function calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvokeError {
    #[error("no function with id {0}")]
    UnknownFunctionId(FunctionId),

    #[error("no function named `{0}`")]
    UnknownFunctionName(String),

    #[error("`{function}` expects {expected} arguments, got {found}")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("`{0}` has no native implementation")]
    Unbound(String),

    #[error("`{function}` failed: {message}")]
    Failed { function: String, message: String },
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error(transparent)]
    Metadata(#[from] crate::metadata::MetadataError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_error_names_offender() {
        let err = ResolveError::UnknownType("Widget".into());
        assert_eq!(err.to_string(), "unknown type: Widget");

        let err = ResolveError::PointerDepthExceeded {
            name: "int".into(),
            depth: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("int"));
        assert!(msg.contains('5'));
        assert!(msg.contains('4'));
    }

    #[test]
    fn test_member_error_keeps_source() {
        use std::error::Error as _;

        let err = BuildError::Member {
            struct_name: "Point".into(),
            member: "tag".into(),
            source: ResolveError::UnknownType("tag_t".into()),
        };
        assert!(err.to_string().contains("Point"));
        assert!(err.source().is_some());
    }
}
