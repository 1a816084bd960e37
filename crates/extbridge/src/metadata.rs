// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Extension interface descriptions (JSON) and the module loader.
//!
//! # Format
//!
//! ```json
//! {
//!   "id": 3,
//!   "name": "geometry",
//!   "class": "com.example.Geometry",
//!   "hash": 305419896,
//!   "layout": { "byte_order": "little" },
//!   "types": [
//!     { "kind": "typedef", "name": "vec4", "type": "float", "array_length": 4 },
//!     { "kind": "struct", "name": "Point", "members": [
//!         { "name": "x", "type": "int" },
//!         { "name": "label", "type": "char", "pointer_depth": 1 } ] }
//!   ],
//!   "functions": [
//!     { "name": "length", "returns": { "type": "double" },
//!       "params": [ { "name": "p", "type": "Point", "pointer_depth": 1 },
//!                   { "name": "result", "type": "double", "output": true } ] }
//!   ]
//! }
//! ```
//!
//! Types are declared in dependency order: a typedef or struct member may
//! only refer to primitives and to types declared before it. Structs without
//! a `class` use the built-in layout prototype.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{ModuleCatalog, LAYOUT_PROTOTYPE_CLASS};
use crate::error::{BuildError, ResolveError};
use crate::module::{
    ExtensionModule, ExtensionModuleBuilder, FunctionInvocation, FunctionSignature,
    NativeFunction, Parameter,
};
use crate::registry::{resolve, TypeScope};
use crate::types::{LayoutConfig, StructType, StructTypeBuilder, TypeDescriptor};

/// Errors produced while loading interface descriptions.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid interface description: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("{context}: {source}")]
    Resolve {
        context: String,
        #[source]
        source: ResolveError,
    },

    #[error("type `{0}` is declared more than once")]
    DuplicateType(String),
}

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

/// Interface description of one extension module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDocument {
    pub id: u32,
    pub name: String,
    /// Catalog class of the native module.
    pub class: String,
    #[serde(default)]
    pub hash: u32,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
}

/// A typedef or struct declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeDecl {
    Typedef(TypedefDecl),
    Struct(StructDecl),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedefDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub pointer_depth: usize,
    /// Makes the typedef a fixed-length array of the resolved type.
    #[serde(default)]
    pub array_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    #[serde(default = "default_prototype_class")]
    pub class: String,
    #[serde(default)]
    pub members: Vec<MemberDecl>,
}

fn default_prototype_class() -> String {
    LAYOUT_PROTOTYPE_CLASS.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub pointer_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    /// Absent for `void`.
    #[serde(default)]
    pub returns: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub pointer_depth: usize,
    #[serde(default)]
    pub output: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub pointer_depth: usize,
}

impl ModuleDocument {
    /// Parse a JSON interface description.
    pub fn parse(json: &str) -> Result<Self, MetadataError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON interface description.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, MetadataError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&json)
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Types declared so far, used as the resolution scope while loading.
#[derive(Default)]
struct DeclaredTypes {
    typedefs: HashMap<String, Arc<TypeDescriptor>>,
    structs: HashMap<String, Arc<StructType>>,
}

impl DeclaredTypes {
    fn add_typedef(&mut self, name: &str, desc: Arc<TypeDescriptor>) -> Result<(), MetadataError> {
        if self.typedefs.insert(name.to_string(), desc).is_some() {
            return Err(MetadataError::DuplicateType(name.to_string()));
        }
        Ok(())
    }

    fn add_struct(&mut self, st: StructType) -> Result<(), MetadataError> {
        let name = st.name().to_string();
        if self.structs.contains_key(&name) {
            return Err(MetadataError::DuplicateType(name));
        }
        self.structs.insert(name, Arc::new(st));
        Ok(())
    }
}

impl TypeScope for DeclaredTypes {
    fn typedef(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.typedefs.get(name).cloned()
    }

    fn struct_descriptor(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.structs
            .get(name)
            .map(|st| Arc::new(TypeDescriptor::Struct(st.clone())))
    }
}

/// Build an [`ExtensionModule`] from its interface description.
pub fn load_module(
    doc: &ModuleDocument,
    catalog: &ModuleCatalog,
) -> Result<ExtensionModule, MetadataError> {
    log::debug!(
        "[metadata] loading module {} (id={}, class={})",
        doc.name,
        doc.id,
        doc.class
    );
    let mut builder =
        ExtensionModuleBuilder::new(doc.id, &doc.name, &doc.class, doc.hash, catalog)?;

    let declared = declare_types(&doc.types, &doc.layout, catalog)?;
    builder.set_typedefs(declared.typedefs);
    builder.set_structs(declared.structs);

    let mut invokers: Vec<Arc<dyn FunctionInvocation>> = Vec::with_capacity(doc.functions.len());
    for decl in &doc.functions {
        let signature = resolve_signature(&builder, decl)?;
        invokers.push(Arc::new(NativeFunction::new(
            &decl.name,
            signature,
            builder.native().clone(),
        )));
    }
    builder.set_invokers(invokers)?;

    Ok(builder.build())
}

/// Parse and load in one step.
pub fn load_module_from_str(
    json: &str,
    catalog: &ModuleCatalog,
) -> Result<ExtensionModule, MetadataError> {
    load_module(&ModuleDocument::parse(json)?, catalog)
}

/// Read, parse and load in one step.
pub fn load_module_from_path(
    path: impl AsRef<Path>,
    catalog: &ModuleCatalog,
) -> Result<ExtensionModule, MetadataError> {
    load_module(&ModuleDocument::read(path)?, catalog)
}

fn declare_types(
    decls: &[TypeDecl],
    layout: &LayoutConfig,
    catalog: &ModuleCatalog,
) -> Result<DeclaredTypes, MetadataError> {
    let mut declared = DeclaredTypes::default();
    for decl in decls {
        match decl {
            TypeDecl::Typedef(t) => {
                let base = resolve(&declared, &t.type_name, t.pointer_depth, false).map_err(
                    |source| MetadataError::Resolve {
                        context: format!("typedef `{}`", t.name),
                        source,
                    },
                )?;
                let desc = match t.array_length {
                    Some(length) => {
                        let array = TypeDescriptor::array_of(base, length);
                        if array.checked_size().is_none() {
                            return Err(BuildError::SizeOverflow {
                                name: t.name.clone(),
                            }
                            .into());
                        }
                        Arc::new(array)
                    }
                    None => base,
                };
                declared.add_typedef(&t.name, desc)?;
            }
            TypeDecl::Struct(s) => {
                let mut st = StructTypeBuilder::new(&s.name, &s.class, catalog)?;
                for member in &s.members {
                    st.add_member(&member.name, &member.type_name, member.pointer_depth);
                }
                declared.add_struct(st.build(&declared, layout)?)?;
            }
        }
    }
    Ok(declared)
}

fn resolve_signature(
    builder: &ExtensionModuleBuilder,
    decl: &FunctionDecl,
) -> Result<FunctionSignature, MetadataError> {
    let context = |what: String| format!("function `{}` {}", decl.name, what);

    let mut params = Vec::with_capacity(decl.params.len());
    for param in &decl.params {
        let descriptor = builder
            .type_descriptor(&param.type_name, param.pointer_depth, param.output)
            .map_err(|source| MetadataError::Resolve {
                context: context(format!("parameter `{}`", param.name)),
                source,
            })?;
        params.push(Parameter {
            name: param.name.clone(),
            type_name: param.type_name.clone(),
            pointer_depth: param.pointer_depth,
            output: param.output,
            descriptor,
        });
    }

    let returns = match &decl.returns {
        Some(ret) => Some(
            builder
                .type_descriptor(&ret.type_name, ret.pointer_depth, false)
                .map_err(|source| MetadataError::Resolve {
                    context: context("return type".to_string()),
                    source,
                })?,
        ),
        None => None,
    };

    Ok(FunctionSignature { params, returns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::DetachedModule;
    use crate::types::ByteOrder;

    const GEOMETRY: &str = r#"{
        "id": 3,
        "name": "geometry",
        "class": "test.Geometry",
        "hash": 305419896,
        "types": [
            { "kind": "typedef", "name": "coord_t", "type": "double" },
            { "kind": "typedef", "name": "vec4", "type": "float", "array_length": 4 },
            { "kind": "struct", "name": "Point", "members": [
                { "name": "x", "type": "coord_t" },
                { "name": "y", "type": "coord_t" } ] },
            { "kind": "struct", "name": "Label", "members": [
                { "name": "at", "type": "Point" },
                { "name": "text", "type": "char", "pointer_depth": 1 },
                { "name": "color", "type": "vec4" } ] }
        ],
        "functions": [
            { "name": "distance", "returns": { "type": "double" },
              "params": [ { "name": "a", "type": "Point", "pointer_depth": 1 },
                          { "name": "b", "type": "Point", "pointer_depth": 1 } ] },
            { "name": "centroid",
              "params": [ { "name": "pts", "type": "Point", "pointer_depth": 1 },
                          { "name": "count", "type": "int" },
                          { "name": "result", "type": "Point", "output": true } ] }
        ]
    }"#;

    fn catalog() -> ModuleCatalog {
        let mut catalog = ModuleCatalog::new();
        catalog.register_module("test.Geometry", DetachedModule::create);
        catalog
    }

    #[test]
    fn test_parse_defaults() {
        let doc = ModuleDocument::parse(r#"{ "id": 1, "name": "m", "class": "c" }"#)
            .expect("parse");
        assert_eq!(doc.hash, 0);
        assert_eq!(doc.layout, LayoutConfig::default());
        assert!(doc.types.is_empty());
        assert!(doc.functions.is_empty());
    }

    #[test]
    fn test_parse_struct_default_class() {
        let doc = ModuleDocument::parse(GEOMETRY).expect("parse");
        match &doc.types[2] {
            TypeDecl::Struct(s) => assert_eq!(s.class, LAYOUT_PROTOTYPE_CLASS),
            other => panic!("expected struct, got {:?}", other),
        }
    }

    #[test]
    fn test_load_geometry() {
        let module = load_module_from_str(GEOMETRY, &catalog()).expect("load");
        assert_eq!(module.id(), 3);
        assert_eq!(module.hash(), 0x1234_5678);
        assert_eq!(module.registry().typedef_names(), ["coord_t", "vec4"]);
        assert_eq!(module.registry().struct_names(), ["Label", "Point"]);

        let label = module.struct_type("Label").expect("Label");
        // at @0 (16), text @16 (4), color @20 (16), rounded up to 8
        assert_eq!(label.size(), 40);

        let centroid = module.function_by_name("centroid").expect("centroid");
        assert_eq!(centroid.name(), "centroid");
        assert_eq!(centroid.signature().map(|s| s.params.len()), Some(3));
        assert_eq!(module.functions().id_of("centroid"), Some(1));
    }

    #[test]
    fn test_signature_resolution() {
        let doc = ModuleDocument::parse(GEOMETRY).expect("parse");
        let mut builder =
            ExtensionModuleBuilder::new(doc.id, &doc.name, &doc.class, doc.hash, &catalog())
                .expect("module");
        let declared = declare_types(&doc.types, &doc.layout, &catalog()).expect("types");
        builder.set_typedefs(declared.typedefs);
        builder.set_structs(declared.structs);

        let sig = resolve_signature(&builder, &doc.functions[1]).expect("signature");
        assert_eq!(sig.to_string(), "(Point* pts, int count, out Point* result) -> void");

        let sig = resolve_signature(&builder, &doc.functions[0]).expect("signature");
        assert_eq!(sig.returns.as_deref(), Some(&TypeDescriptor::Double));
    }

    #[test]
    fn test_forward_reference_is_rejected() {
        let json = r#"{ "id": 1, "name": "m", "class": "test.Geometry",
            "types": [
                { "kind": "typedef", "name": "p_t", "type": "Point", "pointer_depth": 1 },
                { "kind": "struct", "name": "Point", "members": [ { "name": "x", "type": "int" } ] }
            ] }"#;
        let err = load_module_from_str(json, &catalog()).unwrap_err();
        match err {
            MetadataError::Resolve { context, source } => {
                assert!(context.contains("p_t"));
                assert_eq!(source, ResolveError::UnknownType("Point".into()));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_duplicate_declarations() {
        let json = r#"{ "id": 1, "name": "m", "class": "test.Geometry",
            "types": [
                { "kind": "typedef", "name": "a_t", "type": "int" },
                { "kind": "typedef", "name": "a_t", "type": "char" }
            ] }"#;
        let err = load_module_from_str(json, &catalog()).unwrap_err();
        assert!(matches!(err, MetadataError::DuplicateType(ref n) if n == "a_t"));

        let json = r#"{ "id": 1, "name": "m", "class": "test.Geometry",
            "functions": [ { "name": "f" }, { "name": "f" } ] }"#;
        let err = load_module_from_str(json, &catalog()).unwrap_err();
        assert!(matches!(
            err,
            MetadataError::Build(BuildError::DuplicateFunction(ref n)) if n == "f"
        ));
    }

    #[test]
    fn test_unknown_classes() {
        let json = r#"{ "id": 1, "name": "m", "class": "test.Nowhere" }"#;
        let err = load_module_from_str(json, &catalog()).unwrap_err();
        assert!(matches!(
            err,
            MetadataError::Build(BuildError::UnknownModuleClass(_))
        ));

        let json = r#"{ "id": 1, "name": "m", "class": "test.Geometry",
            "types": [ { "kind": "struct", "name": "S", "class": "test.SProto" } ] }"#;
        let err = load_module_from_str(json, &catalog()).unwrap_err();
        assert!(matches!(
            err,
            MetadataError::Build(BuildError::UnknownPrototypeClass(_))
        ));
    }

    #[test]
    fn test_oversized_array_typedef() {
        let json = format!(
            r#"{{ "id": 1, "name": "m", "class": "test.Geometry",
                "types": [
                    {{ "kind": "typedef", "name": "big", "type": "double", "array_length": {} }},
                    {{ "kind": "struct", "name": "Holder", "members": [ {{ "name": "b", "type": "big" }} ] }}
                ] }}"#,
            usize::MAX
        );
        let err = load_module_from_str(&json, &catalog()).unwrap_err();
        assert!(matches!(
            err,
            MetadataError::Build(BuildError::SizeOverflow { ref name }) if name == "big"
        ));
    }

    #[test]
    fn test_struct_size_overflow() {
        // each half fits on its own, two of them do not
        let json = format!(
            r#"{{ "id": 1, "name": "m", "class": "test.Geometry",
                "types": [
                    {{ "kind": "typedef", "name": "half", "type": "char", "array_length": {} }},
                    {{ "kind": "struct", "name": "Twice", "members": [
                        {{ "name": "a", "type": "half" }}, {{ "name": "b", "type": "half" }} ] }}
                ] }}"#,
            usize::MAX / 2 + 1
        );
        let err = load_module_from_str(&json, &catalog()).unwrap_err();
        assert!(matches!(
            err,
            MetadataError::Build(BuildError::SizeOverflow { ref name }) if name == "Twice"
        ));
    }

    #[test]
    fn test_packed_layout() {
        let json = r#"{ "id": 1, "name": "m", "class": "test.Geometry",
            "layout": { "pack": 1 },
            "types": [ { "kind": "struct", "name": "Packed", "members": [
                { "name": "tag", "type": "char" },
                { "name": "v", "type": "double" },
                { "name": "n", "type": "int" } ] } ] }"#;
        let module = load_module_from_str(json, &catalog()).expect("load");
        let st = module.struct_type("Packed").expect("Packed");
        assert_eq!(st.size(), 13);
        assert_eq!(st.offset_of("v"), Some(1));
        assert_eq!(st.offset_of("n"), Some(9));

        let mut data = vec![b'k'];
        data.extend(&4.0f64.to_le_bytes());
        data.extend(&7i32.to_le_bytes());
        let value = st.unmarshal(&data, 0).expect("decode");
        assert_eq!(value.get_field("v").and_then(|v| v.as_double()), Some(4.0));
        assert_eq!(value.get_field("n").and_then(|v| v.as_int()), Some(7));
    }

    #[test]
    fn test_big_endian_layout() {
        let json = r#"{ "id": 1, "name": "m", "class": "test.Geometry",
            "layout": { "byte_order": "big" },
            "types": [ { "kind": "struct", "name": "S", "members": [ { "name": "v", "type": "int" } ] } ] }"#;
        let doc = ModuleDocument::parse(json).expect("parse");
        assert_eq!(doc.layout.byte_order, ByteOrder::Big);

        let module = load_module(&doc, &catalog()).expect("load");
        let st = module.struct_type("S").expect("S");
        let value = st.unmarshal(&[0, 0, 1, 0], 0).expect("decode");
        assert_eq!(value.get_field("v").and_then(|v| v.as_int()), Some(256));
    }

    #[test]
    fn test_invalid_json() {
        let err = ModuleDocument::parse("{ not json").unwrap_err();
        assert!(matches!(err, MetadataError::Parse(_)));
    }
}
