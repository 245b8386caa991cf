//! Mangling scheme selection and parameter adjustment.
//!
//! The two concrete mangling engines (Itanium-dialect and MSVC-dialect) are
//! opaque services supplied by the back end. This module picks the one the
//! target follows — once, from the resolved OS family — and routes every
//! request to it.

use std::fmt;

use lyra_core::types::{FunctionType, Mangler, Parameter, RecordType, Storage, Symbol, Type};
use serde::{Deserialize, Serialize};

use crate::description::{OsFamily, TargetDescription};

/// Which name-mangling dialect the target follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManglingScheme {
    /// Itanium C++ ABI mangling. Every POSIX family, OSX included.
    Itanium,
    /// MSVC mangling.
    Msvc,
}

impl ManglingScheme {
    /// The dialect a given OS family follows.
    pub fn for_os(os: OsFamily) -> Self {
        match os {
            OsFamily::Windows => ManglingScheme::Msvc,
            OsFamily::Linux
            | OsFamily::Osx
            | OsFamily::FreeBsd
            | OsFamily::OpenBsd
            | OsFamily::DragonFlyBsd
            | OsFamily::Solaris => ManglingScheme::Itanium,
        }
    }
}

/// Routes mangling requests to the engine matching the target's scheme.
///
/// The engine is selected at construction and never re-decided per call.
pub struct ManglingDispatcher {
    scheme: ManglingScheme,
    engine: Box<dyn Mangler>,
}

impl ManglingDispatcher {
    /// Pick the engine matching `desc` out of the two dialect
    /// implementations.
    pub fn select(
        desc: &TargetDescription,
        itanium: Box<dyn Mangler>,
        msvc: Box<dyn Mangler>,
    ) -> Self {
        let scheme = ManglingScheme::for_os(desc.os);
        let engine = match scheme {
            ManglingScheme::Itanium => itanium,
            ManglingScheme::Msvc => msvc,
        };
        Self { scheme, engine }
    }

    /// The dialect in effect.
    pub fn scheme(&self) -> ManglingScheme {
        self.scheme
    }

    /// Mangled linker name for `symbol`.
    pub fn mangle_symbol(&self, symbol: &Symbol) -> String {
        self.engine.mangle_symbol(symbol)
    }

    /// Mangled name of the type-info object for `record`.
    pub fn mangle_type_info(&self, record: &RecordType) -> String {
        self.engine.mangle_type_info(record)
    }

    /// The type a parameter is mangled as, after calling-convention
    /// adjustment.
    ///
    /// Types in this representation are structural, so the canonical form
    /// is the type itself; by-reference parameters mangle as references,
    /// and lazy parameters as the niladic delegate that produces them.
    pub fn adjust_parameter_type(&self, param: &Parameter) -> Type {
        let ty = param.ty.clone();
        match param.storage {
            Storage::Value => ty,
            Storage::Ref => Type::reference_to(ty),
            Storage::Lazy => Type::Delegate(Box::new(FunctionType::niladic(ty))),
        }
    }
}

impl fmt::Debug for ManglingDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManglingDispatcher")
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}
