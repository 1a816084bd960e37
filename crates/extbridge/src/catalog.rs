// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Closed table of native module and struct prototype constructors.
//!
//! Extension metadata refers to native implementations by class name. The
//! host registers every class it links in; anything else fails to load.
//!
//! ```rust
//! use extbridge::catalog::{ModuleCatalog, LAYOUT_PROTOTYPE_CLASS};
//! use extbridge::module::DetachedModule;
//!
//! let mut catalog = ModuleCatalog::new();
//! catalog.register_module("com.example.Geometry", DetachedModule::create);
//!
//! assert!(catalog.has_module("com.example.Geometry"));
//! assert!(catalog.has_prototype(LAYOUT_PROTOTYPE_CLASS));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::BuildError;
use crate::module::NativeModule;
use crate::types::{LayoutPrototype, PrototypeContext, StructPrototype};

/// Class name of the built-in [`LayoutPrototype`].
pub const LAYOUT_PROTOTYPE_CLASS: &str = "layout";

/// Constructor of a native module object.
pub type ModuleFactory = fn() -> Arc<dyn NativeModule>;

/// Constructor of a struct prototype.
pub type PrototypeFactory =
    fn(&PrototypeContext<'_>) -> Result<Arc<dyn StructPrototype>, BuildError>;

fn layout_prototype(ctx: &PrototypeContext<'_>) -> Result<Arc<dyn StructPrototype>, BuildError> {
    let prototype: Arc<dyn StructPrototype> = Arc::new(LayoutPrototype::new(ctx)?);
    Ok(prototype)
}

/// Registry of native constructors, keyed by class name.
pub struct ModuleCatalog {
    modules: HashMap<String, ModuleFactory>,
    prototypes: HashMap<String, PrototypeFactory>,
}

impl ModuleCatalog {
    /// Create a catalog knowing only the built-in layout prototype.
    pub fn new() -> Self {
        let mut prototypes: HashMap<String, PrototypeFactory> = HashMap::new();
        prototypes.insert(LAYOUT_PROTOTYPE_CLASS.to_string(), layout_prototype);
        Self {
            modules: HashMap::new(),
            prototypes,
        }
    }

    /// Register (or replace) a native module class.
    pub fn register_module(&mut self, class_name: impl Into<String>, factory: ModuleFactory) {
        self.modules.insert(class_name.into(), factory);
    }

    /// Register (or replace) a struct prototype class.
    pub fn register_prototype(
        &mut self,
        class_name: impl Into<String>,
        factory: PrototypeFactory,
    ) {
        self.prototypes.insert(class_name.into(), factory);
    }

    pub fn module_factory(&self, class_name: &str) -> Option<ModuleFactory> {
        self.modules.get(class_name).copied()
    }

    pub fn prototype_factory(&self, class_name: &str) -> Option<PrototypeFactory> {
        self.prototypes.get(class_name).copied()
    }

    pub fn has_module(&self, class_name: &str) -> bool {
        self.modules.contains_key(class_name)
    }

    pub fn has_prototype(&self, class_name: &str) -> bool {
        self.prototypes.contains_key(class_name)
    }
}

impl Default for ModuleCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut modules: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        modules.sort_unstable();
        let mut prototypes: Vec<&str> = self.prototypes.keys().map(String::as_str).collect();
        prototypes.sort_unstable();
        f.debug_struct("ModuleCatalog")
            .field("modules", &modules)
            .field("prototypes", &prototypes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::DetachedModule;

    #[test]
    fn test_new_catalog_has_layout_only() {
        let catalog = ModuleCatalog::new();
        assert!(catalog.has_prototype(LAYOUT_PROTOTYPE_CLASS));
        assert!(catalog.prototype_factory("com.example.Point").is_none());
        assert!(catalog.module_factory("com.example.Module").is_none());
    }

    #[test]
    fn test_register_module() {
        let mut catalog = ModuleCatalog::new();
        catalog.register_module("com.example.Module", DetachedModule::create);

        let factory = catalog.module_factory("com.example.Module").expect("registered");
        let module = factory();
        assert!(module.as_any().downcast_ref::<DetachedModule>().is_some());
        assert!(format!("{:?}", catalog).contains("com.example.Module"));
    }
}
