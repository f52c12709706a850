// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! JSON description of a program, as emitted by a front end.
//!
//! Entities reference each other by name. Names are resolved to indices here;
//! unresolvable names are reported with the entity that mentions them.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use log::*;
use serde::{Deserialize, Serialize};

use super::function::{FuncId, Signature};
use super::program::{ModelError, Program, ProgramBuilder};
use super::types::{InterfaceId, TypeId, TypeKind};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramDesc {
    #[serde(default)]
    pub functions: Vec<FunctionDesc>,
    #[serde(default)]
    pub types: Vec<TypeDesc>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceDesc>,
    /// Entry points suggested by the front end.
    #[serde(default)]
    pub roots: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionDesc {
    pub name: String,
    #[serde(default)]
    pub signature: Signature,
    #[serde(default)]
    pub exported: bool,
    #[serde(default)]
    pub synthetic: bool,
    #[serde(default)]
    pub calls: Vec<CallDesc>,
    #[serde(default)]
    pub instantiates: Vec<InstantiationDesc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDesc {
    Static {
        callee: String,
        #[serde(default)]
        method: bool,
    },
    Invoke {
        interface: String,
        method: String,
    },
    Indirect {
        #[serde(default)]
        signature: Signature,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstantiationDesc {
    Type(String),
    Func(String),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindDesc {
    #[default]
    Named,
    Pointer(String),
    Struct,
    Basic,
    Func,
    Other,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDesc {
    pub name: String,
    #[serde(default)]
    pub kind: KindDesc,
    #[serde(default)]
    pub methods: Vec<MethodDesc>,
    #[serde(default)]
    pub embeds: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodDesc {
    pub name: String,
    pub func: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterfaceDesc {
    pub name: String,
    #[serde(default)]
    pub methods: Vec<InterfaceMethodDesc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterfaceMethodDesc {
    pub name: String,
    #[serde(default)]
    pub signature: Signature,
}

impl ProgramDesc {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Resolves names and validates the description.
    pub fn into_program(self) -> Result<Program, ModelError> {
        let mut builder = ProgramBuilder::new();

        // Declare everything first so that references may point forward.
        let mut funcs: HashMap<&str, FuncId> = HashMap::new();
        for f in &self.functions {
            let id = builder.add_function(f.name.clone(), f.signature.clone());
            if funcs.insert(f.name.as_str(), id).is_some() {
                return Err(ModelError::DuplicateFunction(f.name.clone()));
            }
            builder.set_exported(id, f.exported).set_synthetic(id, f.synthetic);
        }
        let mut types: HashMap<&str, TypeId> = HashMap::new();
        let mut pending_pointers = Vec::new();
        for t in &self.types {
            let kind = match &t.kind {
                KindDesc::Named => TypeKind::Named,
                KindDesc::Struct => TypeKind::Struct,
                KindDesc::Basic => TypeKind::Basic,
                KindDesc::Func => TypeKind::Func,
                KindDesc::Other => TypeKind::Other,
                // Patched below, once the element is known.
                KindDesc::Pointer(_) => TypeKind::Other,
            };
            let id = builder.add_type(t.name.clone(), kind);
            if types.insert(t.name.as_str(), id).is_some() {
                return Err(ModelError::DuplicateType(t.name.clone()));
            }
            if let KindDesc::Pointer(elem) = &t.kind {
                pending_pointers.push((id, t.name.as_str(), elem.as_str()));
            }
        }
        let mut interfaces: HashMap<&str, InterfaceId> = HashMap::new();
        for i in &self.interfaces {
            let id = builder.add_interface(
                i.name.clone(),
                i.methods.iter().map(|m| (m.name.clone(), m.signature.clone())),
            );
            if interfaces.insert(i.name.as_str(), id).is_some() {
                return Err(ModelError::DuplicateInterface(i.name.clone()));
            }
        }

        let func = |name: &str, context: &dyn Fn() -> String| {
            funcs.get(name).copied().ok_or_else(|| ModelError::UnknownFunction {
                name: name.to_string(),
                context: context(),
            })
        };
        let ty = |name: &str, context: &dyn Fn() -> String| {
            types.get(name).copied().ok_or_else(|| ModelError::UnknownType {
                name: name.to_string(),
                context: context(),
            })
        };

        for (id, name, elem) in pending_pointers {
            let elem = ty(elem, &|| format!("pointer type `{}`", name))?;
            builder.set_pointer_elem(id, elem);
        }

        for t in &self.types {
            let context = || format!("type `{}`", t.name);
            let id = types[t.name.as_str()];
            for m in &t.methods {
                let f = func(&m.func, &context)?;
                builder.add_method(id, m.name.clone(), f);
            }
            for e in &t.embeds {
                let e = ty(e, &context)?;
                builder.add_embed(id, e);
            }
        }

        for f in &self.functions {
            let context = || format!("function `{}`", f.name);
            let caller = funcs[f.name.as_str()];
            for inst in &f.instantiates {
                match inst {
                    InstantiationDesc::Type(t) => {
                        let t = ty(t, &context)?;
                        builder.instantiate(caller, t);
                    }
                    InstantiationDesc::Func(target) => {
                        let target = func(target, &context)?;
                        builder.take_address(caller, target);
                    }
                }
            }
            for call in &f.calls {
                match call {
                    CallDesc::Static { callee, method } => {
                        let callee = func(callee, &context)?;
                        if *method {
                            builder.static_method_call(caller, callee);
                        } else {
                            builder.static_call(caller, callee);
                        }
                    }
                    CallDesc::Invoke { interface, method } => {
                        let iface = interfaces.get(interface.as_str()).copied().ok_or_else(|| {
                            ModelError::UnknownInterface {
                                name: interface.clone(),
                                context: context(),
                            }
                        })?;
                        builder.invoke(caller, iface, method.clone());
                    }
                    CallDesc::Indirect { signature } => {
                        builder.indirect_call(caller, signature.clone());
                    }
                }
            }
        }

        for root in &self.roots {
            let root = func(root, &|| "the declared roots".to_string())?;
            builder.add_root(root);
        }

        builder.build()
    }
}

/// Reads and validates a JSON program description.
pub fn load_program(path: &Path) -> anyhow::Result<Program> {
    info!("Loading program from {}", path.display());
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read program file {}", path.display()))?;
    let desc = ProgramDesc::from_json(&json)
        .with_context(|| format!("failed to parse program file {}", path.display()))?;
    let program = desc
        .into_program()
        .with_context(|| format!("malformed program in {}", path.display()))?;
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::call_site::{CallSite, InstantiationSite};

    const SMALL: &str = r#"{
        "functions": [
            {"name": "main", "calls": [{"static": {"callee": "helper"}},
                                       {"invoke": {"interface": "Stringer", "method": "String"}}],
             "instantiates": [{"type": "*T"}, {"func": "helper"}]},
            {"name": "helper", "exported": true},
            {"name": "(*T).String", "signature": {"results": ["string"]}}
        ],
        "types": [
            {"name": "T", "kind": "struct"},
            {"name": "*T", "kind": {"pointer": "T"}, "methods": [{"name": "String", "func": "(*T).String"}]}
        ],
        "interfaces": [
            {"name": "Stringer", "methods": [{"name": "String", "signature": {"results": ["string"]}}]}
        ],
        "roots": ["main"]
    }"#;

    #[test]
    fn parses_and_resolves_names() {
        let program = ProgramDesc::from_json(SMALL).unwrap().into_program().unwrap();
        let main = program.func_id("main").unwrap();
        let helper = program.func_id("helper").unwrap();
        let ptr_t = program.type_id("*T").unwrap();
        let t = program.type_id("T").unwrap();

        assert_eq!(program.declared_roots(), &[main]);
        assert_eq!(program.exported_functions(), vec![helper]);
        assert_eq!(program.concrete_type(ptr_t).kind, TypeKind::Pointer(t));
        let main_fn = program.function(main);
        assert_eq!(main_fn.call_sites[0], CallSite::Static { callee: helper, method: false });
        assert!(matches!(main_fn.call_sites[1], CallSite::Invoke { method: 0, .. }));
        assert_eq!(
            main_fn.instantiations,
            vec![InstantiationSite::Type(ptr_t), InstantiationSite::FuncValue(helper)]
        );
    }

    #[test]
    fn unknown_callee_names_the_caller() {
        let json = r#"{"functions": [{"name": "main", "calls": [{"static": {"callee": "nope"}}]}]}"#;
        let err = ProgramDesc::from_json(json).unwrap().into_program().unwrap_err();
        assert_eq!(
            err,
            ModelError::UnknownFunction {
                name: "nope".into(),
                context: "function `main`".into()
            }
        );
    }

    #[test]
    fn unknown_pointer_elem_is_reported() {
        let json = r#"{"types": [{"name": "*X", "kind": {"pointer": "X"}}]}"#;
        let err = ProgramDesc::from_json(json).unwrap().into_program().unwrap_err();
        assert!(matches!(err, ModelError::UnknownType { ref name, .. } if name == "X"));
    }

    #[test]
    fn unknown_root_is_reported() {
        let json = r#"{"functions": [{"name": "main"}], "roots": ["start"]}"#;
        let err = ProgramDesc::from_json(json).unwrap().into_program().unwrap_err();
        assert!(matches!(err, ModelError::UnknownFunction { ref name, .. } if name == "start"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let json = r#"{"functions": [{"name": "main", "body": []}]}"#;
        assert!(ProgramDesc::from_json(json).is_err());
    }

    #[test]
    fn misspelled_method_fields_are_rejected() {
        let json = r#"{"interfaces": [{"name": "I", "methods": [{"name": "F", "signatur": {}}]}]}"#;
        assert!(ProgramDesc::from_json(json).is_err());
        let json = r#"{"types": [{"name": "T", "methods": [{"name": "F", "func": "T.F", "fn": "x"}]}]}"#;
        assert!(ProgramDesc::from_json(json).is_err());
    }
}
