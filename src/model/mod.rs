// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The program model: functions, types, interfaces and the call and
//! instantiation sites inside function bodies.

pub mod call_site;
pub mod function;
pub mod loader;
pub mod program;
pub mod types;

pub use call_site::{BaseCallSite, CallSite, CallType, DispatchKey, InstantiationSite};
pub use function::{FuncId, Function, SigId, Signature};
pub use program::{ModelError, Program, ProgramBuilder};
pub use types::{ConcreteType, InterfaceId, InterfaceType, TypeId, TypeKind};
