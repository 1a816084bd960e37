// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-module type registry and the type-name resolver.
//!
//! ## Resolution
//!
//! [`resolve`] turns `(name, pointer_depth, is_output)` into a descriptor:
//!
//! 1. `pointer_depth` above [`MAX_POINTER_DEPTH`] is rejected.
//! 2. `char` at depth 1 is a `char*` string, not a pointer to char.
//! 3. Any other positive depth resolves `depth - 1` and wraps it in a pointer.
//! 4. At depth 0: `int`, `char`, `double`, `float`, then typedefs, then structs.
//! 5. Output parameters that are not arrays get one more pointer level.
//!
//! Primitives cannot be shadowed by a typedef or struct of the same name,
//! and typedefs take priority over structs.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ResolveError;
use crate::types::{StructType, TypeDescriptor};

/// Maximum supported pointer indirection.
pub const MAX_POINTER_DEPTH: usize = 4;

const CHAR_TYPE: &str = "char";

/// Name lookup used by the resolver.
///
/// Implemented by the frozen [`TypeRegistry`], by [`TypeRegistryBuilder`]
/// and by partially-loaded scopes while metadata is being read.
pub trait TypeScope {
    /// Look up a typedef by name.
    fn typedef(&self, name: &str) -> Option<Arc<TypeDescriptor>>;

    /// Look up a struct by name, as a descriptor.
    fn struct_descriptor(&self, name: &str) -> Option<Arc<TypeDescriptor>>;
}

/// Resolve a type name with explicit indirection against `scope`.
pub fn resolve<S>(
    scope: &S,
    name: &str,
    pointer_depth: usize,
    is_output: bool,
) -> Result<Arc<TypeDescriptor>, ResolveError>
where
    S: TypeScope + ?Sized,
{
    if pointer_depth > MAX_POINTER_DEPTH {
        return Err(ResolveError::PointerDepthExceeded {
            name: name.to_string(),
            depth: pointer_depth,
        });
    }

    let resolved = if pointer_depth == 1 && name == CHAR_TYPE {
        Arc::new(TypeDescriptor::String)
    } else if pointer_depth > 0 {
        let inner = resolve(scope, name, pointer_depth - 1, is_output)?;
        Arc::new(TypeDescriptor::Pointer(inner))
    } else if let Some(primitive) = TypeDescriptor::primitive(name) {
        Arc::new(primitive)
    } else if let Some(typedef) = scope.typedef(name) {
        typedef
    } else if let Some(st) = scope.struct_descriptor(name) {
        st
    } else {
        return Err(ResolveError::UnknownType(name.to_string()));
    };

    // Output rule applies at every level because `is_output` is forwarded.
    let resolved = if is_output && !resolved.is_array() {
        Arc::new(TypeDescriptor::Pointer(resolved))
    } else {
        resolved
    };

    log::trace!(
        "[resolve] {} depth={} out={} -> {}",
        name,
        pointer_depth,
        is_output,
        resolved
    );
    Ok(resolved)
}

// ---------------------------------------------------------------------------
// TypeRegistryBuilder
// ---------------------------------------------------------------------------

/// Construction phase of a [`TypeRegistry`].
///
/// Both mappings are replaced wholesale; there is no per-entry update.
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    typedefs: HashMap<String, Arc<TypeDescriptor>>,
    structs: HashMap<String, Arc<StructType>>,
}

impl TypeRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all typedefs.
    pub fn set_typedefs(&mut self, typedefs: HashMap<String, Arc<TypeDescriptor>>) {
        self.typedefs = typedefs;
    }

    /// Replace all structs.
    pub fn set_structs(&mut self, structs: HashMap<String, Arc<StructType>>) {
        self.structs = structs;
    }

    /// Resolve against the current contents.
    pub fn resolve(
        &self,
        name: &str,
        pointer_depth: usize,
        is_output: bool,
    ) -> Result<Arc<TypeDescriptor>, ResolveError> {
        resolve(self, name, pointer_depth, is_output)
    }

    /// Freeze into a read-only registry.
    pub fn build(self) -> TypeRegistry {
        let struct_descriptors = self
            .structs
            .iter()
            .map(|(name, st)| (name.clone(), Arc::new(TypeDescriptor::Struct(st.clone()))))
            .collect();
        TypeRegistry {
            typedefs: self.typedefs,
            structs: self.structs,
            struct_descriptors,
        }
    }
}

impl TypeScope for TypeRegistryBuilder {
    fn typedef(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.typedefs.get(name).cloned()
    }

    fn struct_descriptor(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.structs
            .get(name)
            .map(|st| Arc::new(TypeDescriptor::Struct(st.clone())))
    }
}

// ---------------------------------------------------------------------------
// TypeRegistry
// ---------------------------------------------------------------------------

/// Frozen typedef and struct mappings of one module.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    typedefs: HashMap<String, Arc<TypeDescriptor>>,
    structs: HashMap<String, Arc<StructType>>,
    /// One shared `TypeDescriptor::Struct` per struct.
    struct_descriptors: HashMap<String, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    /// Resolve a type name with explicit indirection.
    pub fn resolve(
        &self,
        name: &str,
        pointer_depth: usize,
        is_output: bool,
    ) -> Result<Arc<TypeDescriptor>, ResolveError> {
        resolve(self, name, pointer_depth, is_output)
    }

    /// Descriptor a typedef name stands for.
    pub fn typedef(&self, name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.typedefs.get(name)
    }

    /// Struct type registered under `name`.
    pub fn struct_type(&self, name: &str) -> Option<&Arc<StructType>> {
        self.structs.get(name)
    }

    /// Typedef names, sorted for determinism.
    pub fn typedef_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.typedefs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Struct names, sorted for determinism.
    pub fn struct_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.structs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of typedefs.
    pub fn typedef_count(&self) -> usize {
        self.typedefs.len()
    }

    /// Number of structs.
    pub fn struct_count(&self) -> usize {
        self.structs.len()
    }
}

impl TypeScope for TypeRegistry {
    fn typedef(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.typedefs.get(name).cloned()
    }

    fn struct_descriptor(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.struct_descriptors.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModuleCatalog;
    use crate::types::{LayoutConfig, StructTypeBuilder, PRIMITIVE_NAMES};

    fn ptr(inner: TypeDescriptor) -> TypeDescriptor {
        TypeDescriptor::Pointer(Arc::new(inner))
    }

    fn point_struct() -> Arc<StructType> {
        let mut builder =
            StructTypeBuilder::new("Point", "layout", &ModuleCatalog::new()).expect("class");
        builder.add_member("x", "int", 0).add_member("y", "int", 0);
        Arc::new(
            builder
                .build(&TypeRegistryBuilder::new(), &LayoutConfig::default())
                .expect("build"),
        )
    }

    fn registry() -> TypeRegistry {
        let mut typedefs = HashMap::new();
        typedefs.insert("handle_t".to_string(), Arc::new(TypeDescriptor::Int));
        typedefs.insert(
            "vec4".to_string(),
            Arc::new(TypeDescriptor::array_of(Arc::new(TypeDescriptor::Float), 4)),
        );
        // Colliding names must never win over primitives.
        typedefs.insert("int".to_string(), Arc::new(TypeDescriptor::Double));
        typedefs.insert("float".to_string(), Arc::new(TypeDescriptor::Char));

        let mut structs = HashMap::new();
        structs.insert("Point".to_string(), point_struct());
        structs.insert("double".to_string(), point_struct());

        let mut builder = TypeRegistryBuilder::new();
        builder.set_typedefs(typedefs);
        builder.set_structs(structs);
        builder.build()
    }

    #[test]
    fn test_primitives_are_never_shadowed() {
        let reg = registry();
        for name in PRIMITIVE_NAMES {
            let resolved = reg.resolve(name, 0, false).expect("primitive");
            assert_eq!(Some(resolved.as_ref().clone()), TypeDescriptor::primitive(name));
        }
    }

    #[test]
    fn test_char_pointer_is_string() {
        let reg = registry();
        assert_eq!(*reg.resolve("char", 1, false).unwrap(), TypeDescriptor::String);
        assert_eq!(
            *reg.resolve("char", 2, false).unwrap(),
            ptr(TypeDescriptor::String)
        );
        assert_eq!(
            *reg.resolve("char", 3, false).unwrap(),
            ptr(ptr(TypeDescriptor::String))
        );
    }

    #[test]
    fn test_pointer_depth_cap() {
        let reg = registry();
        let err = reg.resolve("int", 5, false).unwrap_err();
        assert_eq!(
            err,
            ResolveError::PointerDepthExceeded {
                name: "int".into(),
                depth: 5
            }
        );
        let four = reg.resolve("int", 4, false).expect("depth 4");
        assert_eq!(*four, ptr(ptr(ptr(ptr(TypeDescriptor::Int)))));
        assert!(reg.resolve("Point", 4, false).is_ok());
        assert!(reg.resolve("Unknown", 5, false).is_err());
    }

    #[test]
    fn test_output_parameter_wraps_non_arrays() {
        let reg = registry();
        assert_eq!(*reg.resolve("int", 0, true).unwrap(), ptr(TypeDescriptor::Int));

        let arr = reg.resolve("vec4", 0, true).unwrap();
        assert!(arr.is_array());
        assert_eq!(arr, reg.resolve("vec4", 0, false).unwrap());
    }

    #[test]
    fn test_output_rule_applies_per_level() {
        let reg = registry();
        // depth 0 -> int*, depth 1 -> int**, then the output wrap -> int***
        assert_eq!(
            *reg.resolve("int", 1, true).unwrap(),
            ptr(ptr(ptr(TypeDescriptor::Int)))
        );
        // char* is never an array, so it is wrapped once
        assert_eq!(
            *reg.resolve("char", 1, true).unwrap(),
            ptr(TypeDescriptor::String)
        );
    }

    #[test]
    fn test_typedef_then_struct_lookup() {
        let reg = registry();
        assert_eq!(*reg.resolve("handle_t", 0, false).unwrap(), TypeDescriptor::Int);

        let point = reg.resolve("Point", 0, false).unwrap();
        assert_eq!(point.as_struct().map(|s| s.name()), Some("Point"));
        // Struct descriptors are shared between resolutions.
        assert!(Arc::ptr_eq(&point, &reg.resolve("Point", 0, false).unwrap()));

        let point_ptr = reg.resolve("Point", 1, false).unwrap();
        assert!(Arc::ptr_eq(point_ptr.pointee().unwrap(), &point));
    }

    #[test]
    fn test_typedefs_take_priority_over_structs() {
        let mut typedefs = HashMap::new();
        typedefs.insert("Point".to_string(), Arc::new(TypeDescriptor::Int));
        let mut structs = HashMap::new();
        structs.insert("Point".to_string(), point_struct());

        let mut builder = TypeRegistryBuilder::new();
        builder.set_typedefs(typedefs);
        builder.set_structs(structs);
        assert_eq!(*builder.resolve("Point", 0, false).unwrap(), TypeDescriptor::Int);
        assert_eq!(*builder.build().resolve("Point", 0, false).unwrap(), TypeDescriptor::Int);
    }

    #[test]
    fn test_unknown_type_names_identifier() {
        let reg = registry();
        let err = reg.resolve("Widget", 0, false).unwrap_err();
        assert_eq!(err, ResolveError::UnknownType("Widget".into()));
        assert!(err.to_string().contains("Widget"));

        let err = reg.resolve("Widget", 2, true).unwrap_err();
        assert_eq!(err, ResolveError::UnknownType("Widget".into()));
    }

    #[test]
    fn test_set_replaces_whole_mapping() {
        let mut builder = TypeRegistryBuilder::new();
        let mut first = HashMap::new();
        first.insert("a_t".to_string(), Arc::new(TypeDescriptor::Int));
        builder.set_typedefs(first);

        let mut second = HashMap::new();
        second.insert("b_t".to_string(), Arc::new(TypeDescriptor::Char));
        builder.set_typedefs(second);

        let reg = builder.build();
        assert!(reg.typedef("a_t").is_none());
        assert!(reg.typedef("b_t").is_some());
        assert_eq!(reg.typedef_names(), ["b_t"]);
        assert_eq!(reg.struct_count(), 0);
    }
}
