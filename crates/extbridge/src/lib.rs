// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # extbridge - native extension type bridge
//!
//! Resolves the C-like type names used in extension interface descriptions
//! into runtime descriptors, decodes native struct memory into language
//! values, and dispatches function calls to the linked native module.
//!
//! ## Quick Start
//!
//! ```rust
//! use extbridge::{load_module_from_str, DetachedModule, ModuleCatalog, Value};
//!
//! let mut catalog = ModuleCatalog::new();
//! catalog.register_module("com.example.Geometry", DetachedModule::create);
//!
//! let module = load_module_from_str(
//!     r#"{
//!         "id": 1, "name": "geometry", "class": "com.example.Geometry",
//!         "types": [ { "kind": "struct", "name": "Point", "members": [
//!             { "name": "x", "type": "int" }, { "name": "y", "type": "int" } ] } ]
//!     }"#,
//!     &catalog,
//! )?;
//!
//! let point = module.struct_type("Point").expect("declared above");
//! let bytes = [1, 0, 0, 0, 2, 0, 0, 0];
//! let value = point.unmarshal(&bytes, 0)?;
//! assert_eq!(value.get_field("y"), Some(&Value::Int(2)));
//! # Ok::<(), extbridge::Error>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |  metadata     JSON interface description -> loader          |
//! +-------------------------------------------------------------+
//! |  module       ExtensionModule: registry + function table    |
//! +-------------------------------------------------------------+
//! |  registry     name + pointer depth -> TypeDescriptor        |
//! +-------------------------------------------------------------+
//! |  types        descriptors, StructType, layout, values       |
//! +-------------------------------------------------------------+
//! |  catalog      class name -> native constructor              |
//! +-------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`types`] - Type descriptors, struct types and decoded values
//! - [`registry`] - Type resolution over typedef and struct tables
//! - [`module`] - Extension modules and function dispatch
//! - [`catalog`] - Native module and prototype constructors
//! - [`metadata`] - Interface description format and loader

pub mod catalog;
pub mod error;
pub mod metadata;
pub mod module;
pub mod registry;
pub mod types;

pub use catalog::{ModuleCatalog, LAYOUT_PROTOTYPE_CLASS};
pub use error::{BuildError, DecodeError, Error, InvokeError, ResolveError, Result};
pub use metadata::{
    load_module, load_module_from_path, load_module_from_str, MetadataError, ModuleDocument,
};
pub use module::{
    DetachedModule, ExtensionModule, ExtensionModuleBuilder, FunctionId, FunctionInvocation,
    NativeModule,
};
pub use registry::{resolve, TypeRegistry, TypeRegistryBuilder, TypeScope, MAX_POINTER_DEPTH};
pub use types::{
    LayoutConfig, StructType, StructTypeBuilder, StructValue, TypeDescriptor, Value,
};
