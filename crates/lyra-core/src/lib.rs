//! Core type representation for the Lyra compiler.
//!
//! Later phases of the compiler — layout, code generation, mangling — query
//! types through a small surface: kind tests, sizes and natural alignment,
//! record introspection, fixed-array reduction, and the register-passing
//! decomposition of records. This crate models exactly that surface, plus
//! the interfaces to scope resolution and the name-mangling engines.

pub mod types;

pub use types::{
    CharWidth, Field, FloatPrecision, FunctionType, IdentityResolver, LayoutContext, Linkage,
    Mangler, Parameter, RecordType, Signedness, Storage, Symbol, Type, TypeResolver,
};
