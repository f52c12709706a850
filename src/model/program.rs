// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The immutable fact base consumed by the analysis, and the builder that
//! validates it.

use std::collections::{HashMap, HashSet};

use log::*;
use thiserror::Error;

use super::call_site::{CallSite, InstantiationSite};
use super::function::{FuncId, Function, SigId, Signature};
use super::types::{ConcreteType, InterfaceId, InterfaceMethod, InterfaceType, Method, TypeId, TypeKind};
use crate::util::index::Idx;
use crate::util::vec_set::VecSet;

/// A contract violation in the program handed over by the front end.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("duplicate function `{0}`")]
    DuplicateFunction(String),
    #[error("duplicate type `{0}`")]
    DuplicateType(String),
    #[error("duplicate interface `{0}`")]
    DuplicateInterface(String),
    #[error("duplicate method `{method}` in `{owner}`")]
    DuplicateMethod { owner: String, method: String },
    #[error("unknown function `{name}` referenced by {context}")]
    UnknownFunction { name: String, context: String },
    #[error("unknown type `{name}` referenced by {context}")]
    UnknownType { name: String, context: String },
    #[error("unknown interface `{name}` referenced by {context}")]
    UnknownInterface { name: String, context: String },
    #[error("interface `{interface}` has no method `{method}` (called from `{caller}`)")]
    UnknownInterfaceMethod {
        interface: String,
        method: String,
        caller: String,
    },
    #[error("cyclic embedding through type `{0}`")]
    CyclicEmbedding(String),
}

/// The whole program as seen by the analysis. Built once, never mutated.
#[derive(Debug)]
pub struct Program {
    functions: Vec<Function>,
    types: Vec<ConcreteType>,
    interfaces: Vec<InterfaceType>,
    signatures: VecSet<SigId, Signature>,
    roots: Vec<FuncId>,
    func_names: HashMap<String, FuncId>,
    type_names: HashMap<String, TypeId>,
}

impl Program {
    #[inline]
    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.index()]
    }

    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (FuncId::new(i), f))
    }

    #[inline]
    pub fn num_functions(&self) -> usize {
        self.functions.len()
    }

    #[inline]
    pub fn concrete_type(&self, id: TypeId) -> &ConcreteType {
        &self.types[id.index()]
    }

    pub fn concrete_types(&self) -> impl Iterator<Item = (TypeId, &ConcreteType)> {
        self.types.iter().enumerate().map(|(i, t)| (TypeId::new(i), t))
    }

    #[inline]
    pub fn num_types(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn interface(&self, id: InterfaceId) -> &InterfaceType {
        &self.interfaces[id.index()]
    }

    pub fn interfaces(&self) -> impl Iterator<Item = (InterfaceId, &InterfaceType)> {
        self.interfaces
            .iter()
            .enumerate()
            .map(|(i, t)| (InterfaceId::new(i), t))
    }

    #[inline]
    pub fn num_interfaces(&self) -> usize {
        self.interfaces.len()
    }

    #[inline]
    pub fn signature(&self, id: SigId) -> &Signature {
        &self.signatures[id]
    }

    /// Returns the id of an interned signature, if any function or interface uses it.
    pub fn signature_id(&self, sig: &Signature) -> Option<SigId> {
        self.signatures.get_index(sig)
    }

    pub fn func_id(&self, name: &str) -> Option<FuncId> {
        self.func_names.get(name).copied()
    }

    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.type_names.get(name).copied()
    }

    #[inline]
    pub fn func_name(&self, id: FuncId) -> &str {
        &self.function(id).name
    }

    #[inline]
    pub fn type_name(&self, id: TypeId) -> &str {
        &self.concrete_type(id).name
    }

    /// Entry points declared by the front end itself.
    pub fn declared_roots(&self) -> &[FuncId] {
        &self.roots
    }

    /// Every function flagged as part of the externally visible API.
    pub fn exported_functions(&self) -> Vec<FuncId> {
        self.functions()
            .filter(|(_, f)| f.exported)
            .map(|(id, _)| id)
            .collect()
    }
}

#[derive(Debug)]
enum CallDecl {
    Resolved(CallSite),
    Invoke { interface: InterfaceId, method: String },
}

#[derive(Debug)]
struct FunctionDecl {
    name: String,
    signature: SigId,
    synthetic: bool,
    exported: bool,
    calls: Vec<CallDecl>,
    instantiations: Vec<InstantiationSite>,
}

#[derive(Debug)]
struct InterfaceDecl {
    name: String,
    methods: Vec<(String, SigId)>,
}

/// Collects the facts of a program and validates them in [`ProgramBuilder::build`].
///
/// The mutators panic when handed an id that this builder did not create.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    functions: Vec<FunctionDecl>,
    types: Vec<ConcreteType>,
    interfaces: Vec<InterfaceDecl>,
    signatures: VecSet<SigId, Signature>,
    roots: Vec<FuncId>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, name: impl Into<String>, signature: Signature) -> FuncId {
        let id = FuncId::new(self.functions.len());
        let signature = self.signatures.insert(signature);
        self.functions.push(FunctionDecl {
            name: name.into(),
            signature,
            synthetic: false,
            exported: false,
            calls: Vec::new(),
            instantiations: Vec::new(),
        });
        id
    }

    pub fn set_exported(&mut self, func: FuncId, exported: bool) -> &mut Self {
        self.decl_mut(func).exported = exported;
        self
    }

    pub fn set_synthetic(&mut self, func: FuncId, synthetic: bool) -> &mut Self {
        self.decl_mut(func).synthetic = synthetic;
        self
    }

    pub fn add_type(&mut self, name: impl Into<String>, kind: TypeKind) -> TypeId {
        let id = TypeId::new(self.types.len());
        self.types.push(ConcreteType {
            name: name.into(),
            kind,
            methods: Vec::new(),
            embeds: Vec::new(),
        });
        id
    }

    pub fn set_pointer_elem(&mut self, ty: TypeId, elem: TypeId) -> &mut Self {
        self.type_mut(ty).kind = TypeKind::Pointer(elem);
        self
    }

    pub fn add_method(&mut self, ty: TypeId, name: impl Into<String>, func: FuncId) -> &mut Self {
        self.type_mut(ty).methods.push(Method {
            name: name.into(),
            func,
        });
        self
    }

    pub fn add_embed(&mut self, ty: TypeId, embedded: TypeId) -> &mut Self {
        self.type_mut(ty).embeds.push(embedded);
        self
    }

    pub fn add_interface<I, S>(&mut self, name: impl Into<String>, methods: I) -> InterfaceId
    where
        I: IntoIterator<Item = (S, Signature)>,
        S: Into<String>,
    {
        let id = InterfaceId::new(self.interfaces.len());
        let methods = methods
            .into_iter()
            .map(|(n, sig)| (n.into(), self.signatures.insert(sig)))
            .collect();
        self.interfaces.push(InterfaceDecl {
            name: name.into(),
            methods,
        });
        id
    }

    pub fn static_call(&mut self, caller: FuncId, callee: FuncId) -> &mut Self {
        self.push_call(caller, CallDecl::Resolved(CallSite::Static { callee, method: false }))
    }

    pub fn static_method_call(&mut self, caller: FuncId, callee: FuncId) -> &mut Self {
        self.push_call(caller, CallDecl::Resolved(CallSite::Static { callee, method: true }))
    }

    pub fn invoke(&mut self, caller: FuncId, interface: InterfaceId, method: impl Into<String>) -> &mut Self {
        self.push_call(
            caller,
            CallDecl::Invoke {
                interface,
                method: method.into(),
            },
        )
    }

    pub fn indirect_call(&mut self, caller: FuncId, signature: Signature) -> &mut Self {
        let signature = self.signatures.insert(signature);
        self.push_call(caller, CallDecl::Resolved(CallSite::Indirect { signature }))
    }

    pub fn instantiate(&mut self, func: FuncId, ty: TypeId) -> &mut Self {
        self.decl_mut(func).instantiations.push(InstantiationSite::Type(ty));
        self
    }

    pub fn take_address(&mut self, func: FuncId, target: FuncId) -> &mut Self {
        self.decl_mut(func)
            .instantiations
            .push(InstantiationSite::FuncValue(target));
        self
    }

    pub fn add_root(&mut self, func: FuncId) -> &mut Self {
        self.roots.push(func);
        self
    }

    fn push_call(&mut self, caller: FuncId, call: CallDecl) -> &mut Self {
        self.decl_mut(caller).calls.push(call);
        self
    }

    fn decl_mut(&mut self, func: FuncId) -> &mut FunctionDecl {
        let len = self.functions.len();
        self.functions
            .get_mut(func.index())
            .unwrap_or_else(|| panic!("{:?} out of range ({} functions declared)", func, len))
    }

    fn type_mut(&mut self, ty: TypeId) -> &mut ConcreteType {
        let len = self.types.len();
        self.types
            .get_mut(ty.index())
            .unwrap_or_else(|| panic!("{:?} out of range ({} types declared)", ty, len))
    }

    /// Validates the collected facts and freezes them into a [`Program`].
    pub fn build(self) -> Result<Program, ModelError> {
        let ProgramBuilder {
            functions,
            types,
            interfaces,
            signatures,
            roots,
        } = self;

        let mut func_names = HashMap::with_capacity(functions.len());
        for (i, f) in functions.iter().enumerate() {
            if func_names.insert(f.name.clone(), FuncId::new(i)).is_some() {
                return Err(ModelError::DuplicateFunction(f.name.clone()));
            }
        }
        let mut type_names = HashMap::with_capacity(types.len());
        for (i, t) in types.iter().enumerate() {
            if type_names.insert(t.name.clone(), TypeId::new(i)).is_some() {
                return Err(ModelError::DuplicateType(t.name.clone()));
            }
        }
        let mut interface_names = HashSet::with_capacity(interfaces.len());
        for t in &interfaces {
            if !interface_names.insert(t.name.as_str()) {
                return Err(ModelError::DuplicateInterface(t.name.clone()));
            }
        }

        let func_in_range = |f: FuncId, context: &dyn Fn() -> String| -> Result<(), ModelError> {
            if f.index() < functions.len() {
                Ok(())
            } else {
                Err(ModelError::UnknownFunction {
                    name: format!("{:?}", f),
                    context: context(),
                })
            }
        };
        let type_in_range = |t: TypeId, context: &dyn Fn() -> String| -> Result<(), ModelError> {
            if t.index() < types.len() {
                Ok(())
            } else {
                Err(ModelError::UnknownType {
                    name: format!("{:?}", t),
                    context: context(),
                })
            }
        };

        for ty in &types {
            let context = || format!("type `{}`", ty.name);
            if let TypeKind::Pointer(elem) = ty.kind {
                type_in_range(elem, &context)?;
            }
            for (i, m) in ty.methods.iter().enumerate() {
                func_in_range(m.func, &context)?;
                if ty.methods[..i].iter().any(|prev| prev.name == m.name) {
                    return Err(ModelError::DuplicateMethod {
                        owner: ty.name.clone(),
                        method: m.name.clone(),
                    });
                }
            }
            for e in &ty.embeds {
                type_in_range(*e, &context)?;
            }
        }
        check_embedding_acyclic(&types)?;

        let mut frozen_interfaces = Vec::with_capacity(interfaces.len());
        for decl in interfaces {
            let mut methods: Vec<InterfaceMethod> = decl
                .methods
                .into_iter()
                .map(|(name, signature)| InterfaceMethod { name, signature })
                .collect();
            methods.sort_by(|a, b| a.name.cmp(&b.name));
            if let Some(dup) = methods.windows(2).find(|w| w[0].name == w[1].name) {
                return Err(ModelError::DuplicateMethod {
                    owner: decl.name,
                    method: dup[0].name.clone(),
                });
            }
            if methods.is_empty() {
                warn!("Interface `{}` has no methods; every type satisfies it", decl.name);
            }
            frozen_interfaces.push(InterfaceType {
                name: decl.name,
                methods,
            });
        }

        let mut frozen_functions = Vec::with_capacity(functions.len());
        for decl in &functions {
            let context = || format!("function `{}`", decl.name);
            let mut call_sites = Vec::with_capacity(decl.calls.len());
            for call in &decl.calls {
                let site = match call {
                    CallDecl::Resolved(site) => site.clone(),
                    CallDecl::Invoke { interface, method } => {
                        let iface = frozen_interfaces.get(interface.index()).ok_or_else(|| {
                            ModelError::UnknownInterface {
                                name: format!("{:?}", interface),
                                context: context(),
                            }
                        })?;
                        let index = iface.method_index(method).ok_or_else(|| {
                            ModelError::UnknownInterfaceMethod {
                                interface: iface.name.clone(),
                                method: method.clone(),
                                caller: decl.name.clone(),
                            }
                        })?;
                        CallSite::Invoke {
                            interface: *interface,
                            method: index as u32,
                        }
                    }
                };
                if let CallSite::Static { callee, .. } = site {
                    func_in_range(callee, &context)?;
                }
                call_sites.push(site);
            }
            for inst in &decl.instantiations {
                match *inst {
                    InstantiationSite::Type(t) => type_in_range(t, &context)?,
                    InstantiationSite::FuncValue(f) => func_in_range(f, &context)?,
                }
            }
            frozen_functions.push(Function {
                name: decl.name.clone(),
                signature: decl.signature,
                synthetic: decl.synthetic,
                exported: decl.exported,
                call_sites,
                instantiations: decl.instantiations.clone(),
            });
        }
        for root in &roots {
            func_in_range(*root, &|| "the declared roots".to_string())?;
        }

        debug!(
            "Built program: {} functions, {} types, {} interfaces, {} signatures",
            frozen_functions.len(),
            types.len(),
            frozen_interfaces.len(),
            signatures.len()
        );
        Ok(Program {
            functions: frozen_functions,
            types,
            interfaces: frozen_interfaces,
            signatures,
            roots,
            func_names,
            type_names,
        })
    }
}

/// Rejects types that embed themselves, directly or transitively.
fn check_embedding_acyclic(types: &[ConcreteType]) -> Result<(), ModelError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unseen,
        OnStack,
        Done,
    }
    let mut marks = vec![Mark::Unseen; types.len()];
    for start in 0..types.len() {
        if marks[start] != Mark::Unseen {
            continue;
        }
        // (type, next embed to visit)
        let mut stack = vec![(start, 0usize)];
        marks[start] = Mark::OnStack;
        while let Some((ty, next)) = stack.last_mut() {
            let ty = *ty;
            if let Some(embedded) = types[ty].embeds.get(*next) {
                *next += 1;
                let e = embedded.index();
                match marks[e] {
                    Mark::OnStack => return Err(ModelError::CyclicEmbedding(types[e].name.clone())),
                    Mark::Unseen => {
                        marks[e] = Mark::OnStack;
                        stack.push((e, 0));
                    }
                    Mark::Done => {}
                }
            } else {
                marks[ty] = Mark::Done;
                stack.pop();
            }
        }
    }
    Ok(())
}
