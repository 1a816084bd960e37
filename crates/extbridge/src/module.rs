// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Extension modules: identity, type registry and function dispatch table.
//!
//! An [`ExtensionModuleBuilder`] is created from the host's
//! [`ModuleCatalog`], populated once with typedefs, structs and invokers,
//! and frozen into an [`ExtensionModule`] that is shared read-only across
//! threads.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::catalog::ModuleCatalog;
use crate::error::{BuildError, InvokeError, ResolveError};
use crate::registry::{TypeRegistry, TypeRegistryBuilder};
use crate::types::{StructType, TypeDescriptor, Value};

/// Dense function id, assigned by position in the invoker list.
pub type FunctionId = u32;

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// An instantiated native module object.
pub trait NativeModule: fmt::Debug + Send + Sync {
    /// Call `function` with already-marshaled arguments.
    fn invoke(&self, function: &str, args: &[Value]) -> Result<Value, InvokeError>;

    /// Downcast support for hosts that need the concrete module.
    fn as_any(&self) -> &dyn Any;
}

/// A callable extension function.
pub trait FunctionInvocation: Send + Sync {
    fn name(&self) -> &str;

    fn invoke(&self, args: &[Value]) -> Result<Value, InvokeError>;

    /// Declared signature, when the invoker carries one.
    fn signature(&self) -> Option<&FunctionSignature> {
        None
    }
}

/// Native module without an implementation, for inspection-only hosts.
///
/// Every call fails with [`InvokeError::Unbound`].
#[derive(Debug, Default)]
pub struct DetachedModule;

impl DetachedModule {
    /// [`ModuleFactory`](crate::catalog::ModuleFactory) for the catalog.
    pub fn create() -> Arc<dyn NativeModule> {
        Arc::new(DetachedModule)
    }
}

impl NativeModule for DetachedModule {
    fn invoke(&self, function: &str, _args: &[Value]) -> Result<Value, InvokeError> {
        Err(InvokeError::Unbound(function.to_string()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// NativeFunction
// ---------------------------------------------------------------------------

/// One declared function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
    pub pointer_depth: usize,
    pub output: bool,
    pub descriptor: Arc<TypeDescriptor>,
}

/// Resolved signature of an extension function.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionSignature {
    pub params: Vec<Parameter>,
    /// `None` for `void`.
    pub returns: Option<Arc<TypeDescriptor>>,
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if param.output {
                write!(f, "out ")?;
            }
            write!(f, "{} {}", param.descriptor, param.name)?;
        }
        write!(f, ") -> ")?;
        match &self.returns {
            Some(ret) => write!(f, "{}", ret),
            None => write!(f, "void"),
        }
    }
}

/// Function forwarding to a [`NativeModule`] after an arity check.
#[derive(Debug, Clone)]
pub struct NativeFunction {
    name: String,
    signature: FunctionSignature,
    module: Arc<dyn NativeModule>,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        signature: FunctionSignature,
        module: Arc<dyn NativeModule>,
    ) -> Self {
        Self {
            name: name.into(),
            signature,
            module,
        }
    }
}

impl FunctionInvocation for NativeFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> Option<&FunctionSignature> {
        Some(&self.signature)
    }

    fn invoke(&self, args: &[Value]) -> Result<Value, InvokeError> {
        if args.len() != self.signature.params.len() {
            return Err(InvokeError::ArityMismatch {
                function: self.name.clone(),
                expected: self.signature.params.len(),
                found: args.len(),
            });
        }
        self.module.invoke(&self.name, args)
    }
}

// ---------------------------------------------------------------------------
// FunctionTable
// ---------------------------------------------------------------------------

/// Id and name indices over one list of invokers.
///
/// Both indices are built in a single pass, so every entry reachable by id
/// is reachable by name and vice versa.
#[derive(Default, Clone)]
pub struct FunctionTable {
    by_id: Vec<Arc<dyn FunctionInvocation>>,
    by_name: HashMap<String, FunctionId>,
}

impl FunctionTable {
    /// Index `invokers` by position and by name.
    pub fn from_invokers(invokers: Vec<Arc<dyn FunctionInvocation>>) -> Result<Self, BuildError> {
        let mut by_name = HashMap::with_capacity(invokers.len());
        for (id, invoker) in invokers.iter().enumerate() {
            let previous = by_name.insert(invoker.name().to_string(), id as FunctionId);
            if previous.is_some() {
                return Err(BuildError::DuplicateFunction(invoker.name().to_string()));
            }
        }
        Ok(Self {
            by_id: invokers,
            by_name,
        })
    }

    pub fn get(&self, id: FunctionId) -> Option<&Arc<dyn FunctionInvocation>> {
        self.by_id.get(id as usize)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Arc<dyn FunctionInvocation>> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    pub fn id_of(&self, name: &str) -> Option<FunctionId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (FunctionId, &Arc<dyn FunctionInvocation>)> {
        self.by_id
            .iter()
            .enumerate()
            .map(|(id, f)| (id as FunctionId, f))
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.by_id.iter().map(|inv| inv.name()))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ExtensionModuleBuilder
// ---------------------------------------------------------------------------

/// Setup phase of an [`ExtensionModule`].
#[derive(Debug)]
pub struct ExtensionModuleBuilder {
    id: u32,
    name: String,
    class_name: String,
    hash: u32,
    native: Arc<dyn NativeModule>,
    types: TypeRegistryBuilder,
    functions: FunctionTable,
}

impl ExtensionModuleBuilder {
    /// Instantiate the native module registered as `class_name`.
    pub fn new(
        id: u32,
        name: impl Into<String>,
        class_name: impl Into<String>,
        hash: u32,
        catalog: &ModuleCatalog,
    ) -> Result<Self, BuildError> {
        let class_name = class_name.into();
        let factory = catalog
            .module_factory(&class_name)
            .ok_or_else(|| BuildError::UnknownModuleClass(class_name.clone()))?;
        Ok(Self {
            id,
            name: name.into(),
            class_name,
            hash,
            native: factory(),
            types: TypeRegistryBuilder::new(),
            functions: FunctionTable::default(),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn native(&self) -> &Arc<dyn NativeModule> {
        &self.native
    }

    /// Replace the typedef registry.
    pub fn set_typedefs(&mut self, typedefs: HashMap<String, Arc<TypeDescriptor>>) {
        self.types.set_typedefs(typedefs);
    }

    /// Replace the struct registry.
    pub fn set_structs(&mut self, structs: HashMap<String, Arc<StructType>>) {
        self.types.set_structs(structs);
    }

    /// Replace the function table; ids follow list order.
    ///
    /// On a duplicate name the previous table is kept.
    pub fn set_invokers(
        &mut self,
        invokers: Vec<Arc<dyn FunctionInvocation>>,
    ) -> Result<(), BuildError> {
        self.functions = FunctionTable::from_invokers(invokers)?;
        Ok(())
    }

    /// Resolve against the registries set so far.
    pub fn type_descriptor(
        &self,
        name: &str,
        pointer_depth: usize,
        is_output: bool,
    ) -> Result<Arc<TypeDescriptor>, ResolveError> {
        self.types.resolve(name, pointer_depth, is_output)
    }

    /// Freeze the module.
    pub fn build(self) -> ExtensionModule {
        let types = self.types.build();
        log::debug!(
            "[module] {} (id={}, hash={:#010x}) ready: {} typedefs, {} structs, {} functions",
            self.name,
            self.id,
            self.hash,
            types.typedef_count(),
            types.struct_count(),
            self.functions.len()
        );
        ExtensionModule {
            id: self.id,
            name: self.name,
            class_name: self.class_name,
            hash: self.hash,
            native: self.native,
            types,
            functions: self.functions,
        }
    }
}

// ---------------------------------------------------------------------------
// ExtensionModule
// ---------------------------------------------------------------------------

/// A loaded, read-only extension module.
#[derive(Debug)]
pub struct ExtensionModule {
    id: u32,
    name: String,
    class_name: String,
    hash: u32,
    native: Arc<dyn NativeModule>,
    types: TypeRegistry,
    functions: FunctionTable,
}

impl ExtensionModule {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Opaque interface fingerprint; stored, never validated here.
    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn native(&self) -> &Arc<dyn NativeModule> {
        &self.native
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.types
    }

    /// Resolve a parameter or member type of this module.
    pub fn type_descriptor(
        &self,
        name: &str,
        pointer_depth: usize,
        is_output: bool,
    ) -> Result<Arc<TypeDescriptor>, ResolveError> {
        self.types.resolve(name, pointer_depth, is_output)
    }

    pub fn struct_type(&self, name: &str) -> Option<&Arc<StructType>> {
        self.types.struct_type(name)
    }

    pub fn function(&self, id: FunctionId) -> Option<&Arc<dyn FunctionInvocation>> {
        self.functions.get(id)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Arc<dyn FunctionInvocation>> {
        self.functions.get_by_name(name)
    }

    /// Same entry as [`function`](Self::function).
    pub fn invoker(&self, id: FunctionId) -> Option<&Arc<dyn FunctionInvocation>> {
        self.functions.get(id)
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Dispatch by id.
    pub fn invoke(&self, id: FunctionId, args: &[Value]) -> Result<Value, InvokeError> {
        let function = self
            .function(id)
            .ok_or(InvokeError::UnknownFunctionId(id))?;
        function.invoke(args)
    }

    /// Dispatch by name.
    pub fn invoke_by_name(&self, name: &str, args: &[Value]) -> Result<Value, InvokeError> {
        let function = self
            .function_by_name(name)
            .ok_or_else(|| InvokeError::UnknownFunctionName(name.to_string()))?;
        function.invoke(args)
    }
}
