// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-layout aggregate types.
//!
//! A [`StructType`] owns the ordered member list of a C struct and a
//! [`StructPrototype`] that knows the binary layout. Member metadata is
//! appended on a [`StructTypeBuilder`] and frozen by [`StructTypeBuilder::build`].

use std::fmt;
use std::sync::Arc;

use crate::catalog::{ModuleCatalog, PrototypeFactory};
use crate::error::{BuildError, DecodeError};
use crate::registry::{resolve, TypeScope};
use crate::types::layout::{check_bounds, LayoutConfig, POINTER_SIZE};
use crate::types::{TypeDescriptor, Value};

/// Native-side decoder for one struct type.
pub trait StructPrototype: fmt::Debug + Send + Sync {
    /// Fixed byte size of one instance.
    fn size(&self) -> usize;

    /// Alignment of one instance when nested in another struct.
    fn alignment(&self) -> usize {
        POINTER_SIZE
    }

    /// Decode one instance from `data` starting at `offset`.
    fn unmarshal(&self, data: &[u8], offset: usize) -> Result<Value, DecodeError>;

    /// Byte offset of a member, for prototypes that expose their layout.
    fn member_offset(&self, _name: &str) -> Option<usize> {
        None
    }
}

/// Everything a [`PrototypeFactory`] may use to instantiate a prototype.
#[derive(Debug, Clone, Copy)]
pub struct PrototypeContext<'a> {
    pub type_name: &'a str,
    pub class_name: &'a str,
    pub members: &'a [StructMember],
    pub config: &'a LayoutConfig,
}

/// A declared struct member with its resolved descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct StructMember {
    name: String,
    type_name: String,
    pointer_depth: usize,
    descriptor: Arc<TypeDescriptor>,
}

impl StructMember {
    /// Member name as declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base type name as declared, without indirection.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Declared indirection, `0` for a value member.
    pub fn pointer_depth(&self) -> usize {
        self.pointer_depth
    }

    /// Resolved descriptor, indirection included.
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }
}

#[derive(Debug, Clone)]
struct MemberDecl {
    name: String,
    type_name: String,
    pointer_depth: usize,
}

/// Mutable construction phase of a [`StructType`].
pub struct StructTypeBuilder {
    name: String,
    class_name: String,
    factory: PrototypeFactory,
    members: Vec<MemberDecl>,
}

impl StructTypeBuilder {
    /// Start a struct backed by the prototype registered as `class_name`.
    ///
    /// Fails if the catalog has no prototype for that class.
    pub fn new(
        name: impl Into<String>,
        class_name: impl Into<String>,
        catalog: &ModuleCatalog,
    ) -> Result<Self, BuildError> {
        let class_name = class_name.into();
        let factory = catalog
            .prototype_factory(&class_name)
            .ok_or_else(|| BuildError::UnknownPrototypeClass(class_name.clone()))?;
        Ok(Self {
            name: name.into(),
            class_name,
            factory,
            members: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Append a member. Declaration order is the layout order.
    pub fn add_member(
        &mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        pointer_depth: usize,
    ) -> &mut Self {
        self.members.push(MemberDecl {
            name: name.into(),
            type_name: type_name.into(),
            pointer_depth,
        });
        self
    }

    /// Resolve member types against `scope` and instantiate the prototype.
    pub fn build<S>(self, scope: &S, config: &LayoutConfig) -> Result<StructType, BuildError>
    where
        S: TypeScope + ?Sized,
    {
        let mut members = Vec::with_capacity(self.members.len());
        for decl in self.members {
            let descriptor = resolve(scope, &decl.type_name, decl.pointer_depth, false).map_err(
                |source| BuildError::Member {
                    struct_name: self.name.clone(),
                    member: decl.name.clone(),
                    source,
                },
            )?;
            members.push(StructMember {
                name: decl.name,
                type_name: decl.type_name,
                pointer_depth: decl.pointer_depth,
                descriptor,
            });
        }

        let prototype = (self.factory)(&PrototypeContext {
            type_name: &self.name,
            class_name: &self.class_name,
            members: &members,
            config,
        })?;

        log::debug!(
            "[struct] built {} ({} members, {} bytes, prototype {})",
            self.name,
            members.len(),
            prototype.size(),
            self.class_name
        );

        Ok(StructType {
            name: self.name,
            class_name: self.class_name,
            members,
            prototype,
        })
    }
}

impl fmt::Debug for StructTypeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructTypeBuilder")
            .field("name", &self.name)
            .field("class_name", &self.class_name)
            .field("members", &self.members)
            .finish_non_exhaustive()
    }
}

/// A frozen struct type.
#[derive(Debug)]
pub struct StructType {
    name: String,
    class_name: String,
    members: Vec<StructMember>,
    prototype: Arc<dyn StructPrototype>,
}

impl StructType {
    /// Struct name as declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Catalog class the prototype was instantiated from.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Members in declaration order.
    pub fn members(&self) -> &[StructMember] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&StructMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn member_descriptor(&self, name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.member(name).map(StructMember::descriptor)
    }

    pub fn prototype(&self) -> &Arc<dyn StructPrototype> {
        &self.prototype
    }

    /// Fixed byte size of one instance, as reported by the prototype.
    pub fn size(&self) -> usize {
        self.prototype.size()
    }

    pub fn alignment(&self) -> usize {
        self.prototype.alignment()
    }

    /// Byte offset of a member, if the prototype exposes its layout.
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.prototype.member_offset(name)
    }

    /// Decode one instance from `data` at `offset`.
    pub fn unmarshal(&self, data: &[u8], offset: usize) -> Result<Value, DecodeError> {
        check_bounds(data, offset, self.size())?;
        self.prototype.unmarshal(data, offset)
    }
}

impl PartialEq for StructType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.class_name == other.class_name
            && self.members == other.members
    }
}

impl fmt::Display for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "{{")?;
        for member in &self.members {
            writeln!(
                f,
                "{}{} {};",
                member.type_name,
                "*".repeat(member.pointer_depth),
                member.name
            )?;
        }
        writeln!(f, "}}")
    }
}
