//! The Lyra type universe, reduced to what ABI resolution needs.
//!
//! The full front end keeps a richer semantic representation; target ABI
//! queries only ever ask about kinds, sizes, record layout, and how records
//! decompose for register passing. Sizes that depend on the target (pointer
//! width, the extended floating-point format) are answered against a
//! [`LayoutContext`] resolved by the target layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Signedness of an integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// Floating-point precision.
///
/// `Extended` is the widest hardware format of the target (the x87 80-bit
/// format on x86); its in-memory size, padding, and alignment are resolved
/// per target and carried in the [`LayoutContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatPrecision {
    Single,
    Double,
    Extended,
}

impl FloatPrecision {
    /// In-memory size of one component of this precision.
    pub fn storage_size(self, layout: &LayoutContext) -> u64 {
        match self {
            FloatPrecision::Single => 4,
            FloatPrecision::Double => 8,
            FloatPrecision::Extended => u64::from(layout.extended_float_size),
        }
    }

    /// Natural alignment of one component of this precision.
    pub fn storage_align(self, layout: &LayoutContext) -> u32 {
        match self {
            FloatPrecision::Single => 4,
            FloatPrecision::Double => 8,
            FloatPrecision::Extended => layout.extended_float_align,
        }
    }
}

/// Character width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharWidth {
    /// 1-byte character.
    Narrow,
    /// 2-byte character.
    Wide,
    /// 4-byte character.
    Quad,
}

impl CharWidth {
    pub fn bytes(self) -> u64 {
        match self {
            CharWidth::Narrow => 1,
            CharWidth::Wide => 2,
            CharWidth::Quad => 4,
        }
    }
}

/// Function linkage. `Native` is Lyra's own ABI; the rest select foreign
/// calling and mangling conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Linkage {
    Native,
    C,
    Cpp,
    Windows,
    ObjC,
}

/// Target-resolved sizes that scalar layout depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutContext {
    /// Pointer size in bytes.
    pub pointer_size: u32,
    /// In-memory size of the extended floating-point format, padding
    /// included.
    pub extended_float_size: u32,
    /// Alignment of the extended floating-point format.
    pub extended_float_align: u32,
}

/// The core type representation consumed by ABI resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    Void,
    Bool,
    /// Integer with explicit width in bits (8, 16, 32, or 64).
    Int { width: u8, signedness: Signedness },
    Float { precision: FloatPrecision },
    Imaginary { precision: FloatPrecision },
    /// Complex number; twice the size of its component precision.
    Complex { precision: FloatPrecision },
    Char { width: CharWidth },
    Pointer(Box<Type>),
    Reference(Box<Type>),
    /// Fixed-length homogeneous sequence.
    StaticArray { element: Box<Type>, length: u64 },
    /// SIMD vector of `lanes` elements.
    Vector { element: Box<Type>, lanes: u32 },
    Record(Box<RecordType>),
    Function(Box<FunctionType>),
    /// Fat pointer: context pointer plus function pointer.
    Delegate(Box<FunctionType>),
    /// A named type not yet bound through scope.
    Named(String),
}

/// A record (struct) as the ABI layer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordType {
    pub name: String,
    /// Total size in bytes, as computed by aggregate layout.
    pub size: u64,
    /// Alignment in bytes, as computed by aggregate layout.
    pub align: u32,
    pub fields: Vec<Field>,
    /// Trivially copyable: no user-defined copy/destruction semantics.
    pub pod: bool,
    /// Whether the record declares a constructor.
    pub has_ctor: bool,
    /// Register-passing decomposition (0..=2 constituent types), as
    /// computed by aggregate classification.
    pub arg_types: Vec<Type>,
}

impl RecordType {
    /// A trivially-copyable record with no fields, constructors, or
    /// decomposition; callers fill in what they need.
    pub fn new(name: impl Into<String>, size: u64, align: u32) -> Self {
        Self {
            name: name.into(),
            size,
            align,
            fields: Vec::new(),
            pod: true,
            has_ctor: false,
            arg_types: Vec::new(),
        }
    }
}

/// A named record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

/// Parameter passing style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Storage {
    /// Passed by value.
    Value,
    /// Passed by reference.
    Ref,
    /// Evaluated on use at the callee; passed as a niladic delegate.
    Lazy,
}

/// A formal function parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub storage: Storage,
    pub ty: Type,
}

impl Parameter {
    pub fn by_value(ty: Type) -> Self {
        Self {
            storage: Storage::Value,
            ty,
        }
    }
}

/// A function signature as calling-convention code sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionType {
    pub linkage: Linkage,
    pub params: Vec<Parameter>,
    pub ret: Type,
    /// The function returns a reference; the result is already a pointer.
    pub returns_by_ref: bool,
}

impl FunctionType {
    pub fn new(linkage: Linkage, ret: Type) -> Self {
        Self {
            linkage,
            params: Vec::new(),
            ret,
            returns_by_ref: false,
        }
    }

    /// Zero-parameter native function producing `ret`.
    pub fn niladic(ret: Type) -> Self {
        Self::new(Linkage::Native, ret)
    }
}

/// A declared symbol, as the mangling engines consume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub linkage: Linkage,
}

impl Type {
    // === Convenience constructors ===

    pub fn int8() -> Self {
        Type::Int {
            width: 8,
            signedness: Signedness::Signed,
        }
    }
    pub fn int16() -> Self {
        Type::Int {
            width: 16,
            signedness: Signedness::Signed,
        }
    }
    pub fn int32() -> Self {
        Type::Int {
            width: 32,
            signedness: Signedness::Signed,
        }
    }
    pub fn int64() -> Self {
        Type::Int {
            width: 64,
            signedness: Signedness::Signed,
        }
    }
    pub fn uint8() -> Self {
        Type::Int {
            width: 8,
            signedness: Signedness::Unsigned,
        }
    }
    pub fn uint16() -> Self {
        Type::Int {
            width: 16,
            signedness: Signedness::Unsigned,
        }
    }
    pub fn uint32() -> Self {
        Type::Int {
            width: 32,
            signedness: Signedness::Unsigned,
        }
    }
    pub fn uint64() -> Self {
        Type::Int {
            width: 64,
            signedness: Signedness::Unsigned,
        }
    }
    pub fn float32() -> Self {
        Type::Float {
            precision: FloatPrecision::Single,
        }
    }
    pub fn float64() -> Self {
        Type::Float {
            precision: FloatPrecision::Double,
        }
    }
    pub fn extended_float() -> Self {
        Type::Float {
            precision: FloatPrecision::Extended,
        }
    }
    pub fn imaginary(precision: FloatPrecision) -> Self {
        Type::Imaginary { precision }
    }
    pub fn complex(precision: FloatPrecision) -> Self {
        Type::Complex { precision }
    }
    pub fn narrow_char() -> Self {
        Type::Char {
            width: CharWidth::Narrow,
        }
    }
    pub fn pointer_to(ty: Type) -> Self {
        Type::Pointer(Box::new(ty))
    }
    pub fn reference_to(ty: Type) -> Self {
        Type::Reference(Box::new(ty))
    }
    pub fn static_array(element: Type, length: u64) -> Self {
        Type::StaticArray {
            element: Box::new(element),
            length,
        }
    }
    pub fn vector_of(element: Type, lanes: u32) -> Self {
        Type::Vector {
            element: Box::new(element),
            lanes,
        }
    }
    pub fn record(record: RecordType) -> Self {
        Type::Record(Box::new(record))
    }
    pub fn named(name: impl Into<String>) -> Self {
        Type::Named(name.into())
    }

    // === Layout queries ===

    /// Size of the type in bytes on the described target.
    ///
    /// Unbound named types have no size yet and report 0.
    pub fn size(&self, layout: &LayoutContext) -> u64 {
        match self {
            Type::Void | Type::Bool => 1,
            Type::Int { width, .. } => u64::from(*width / 8),
            Type::Float { precision } | Type::Imaginary { precision } => {
                precision.storage_size(layout)
            }
            Type::Complex { precision } => 2 * precision.storage_size(layout),
            Type::Char { width } => width.bytes(),
            Type::Pointer(_) | Type::Reference(_) | Type::Function(_) => {
                u64::from(layout.pointer_size)
            }
            Type::Delegate(_) => 2 * u64::from(layout.pointer_size),
            Type::StaticArray { element, length } => element.size(layout) * length,
            Type::Vector { element, lanes } => element.size(layout) * u64::from(*lanes),
            Type::Record(rec) => rec.size,
            Type::Named(_) => 0,
        }
    }

    /// The type's own alignment, before any target-specific rule applies.
    ///
    /// Complex numbers align as their component, arrays as their element,
    /// vectors as their full width.
    pub fn natural_align(&self, layout: &LayoutContext) -> u32 {
        match self {
            Type::Void | Type::Bool => 1,
            Type::Int { width, .. } => u32::from(*width / 8),
            Type::Float { precision }
            | Type::Imaginary { precision }
            | Type::Complex { precision } => precision.storage_align(layout),
            Type::Char { width } => width.bytes() as u32,
            Type::Pointer(_) | Type::Reference(_) | Type::Function(_) | Type::Delegate(_) => {
                layout.pointer_size
            }
            Type::StaticArray { element, .. } => element.natural_align(layout),
            Type::Vector { .. } => self.size(layout) as u32,
            Type::Record(rec) => rec.align,
            Type::Named(_) => 1,
        }
    }

    // === Kind predicates ===

    /// Integral kinds: booleans, characters, and integers.
    pub fn is_integral(&self) -> bool {
        matches!(self, Type::Bool | Type::Int { .. } | Type::Char { .. })
    }

    /// Floating kinds, imaginary and complex included.
    pub fn is_floating(&self) -> bool {
        matches!(
            self,
            Type::Float { .. } | Type::Imaginary { .. } | Type::Complex { .. }
        )
    }

    /// Scalar kinds: integral or floating.
    pub fn is_scalar(&self) -> bool {
        self.is_integral() || self.is_floating()
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Type::Complex { .. })
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Type::Record(_))
    }

    pub fn as_record(&self) -> Option<&RecordType> {
        match self {
            Type::Record(rec) => Some(rec),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<(&Type, u32)> {
        match self {
            Type::Vector { element, lanes } => Some((element, *lanes)),
            _ => None,
        }
    }

    /// Strip fixed-array layers down to the base element type.
    pub fn base_elem(&self) -> &Type {
        let mut t = self;
        while let Type::StaticArray { element, .. } = t {
            t = element;
        }
        t
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Bool => write!(f, "bool"),
            Type::Int {
                width,
                signedness: Signedness::Signed,
            } => write!(f, "int{width}"),
            Type::Int {
                width,
                signedness: Signedness::Unsigned,
            } => write!(f, "uint{width}"),
            Type::Float { precision } => write!(f, "float<{precision:?}>"),
            Type::Imaginary { precision } => write!(f, "imaginary<{precision:?}>"),
            Type::Complex { precision } => write!(f, "complex<{precision:?}>"),
            Type::Char { width } => write!(f, "char{}", width.bytes() * 8),
            Type::Pointer(t) => write!(f, "{t}*"),
            Type::Reference(t) => write!(f, "ref {t}"),
            Type::StaticArray { element, length } => write!(f, "{element}[{length}]"),
            Type::Vector { element, lanes } => write!(f, "vector<{element}, {lanes}>"),
            Type::Record(rec) => write!(f, "struct {}", rec.name),
            Type::Function(tf) => write!(f, "fn(...) -> {}", tf.ret),
            Type::Delegate(tf) => write!(f, "delegate(...) -> {}", tf.ret),
            Type::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Scope-level type binding service.
///
/// ABI resolution needs it in exactly one place: binding the named
/// `__va_list_tag` aggregate on 64-bit POSIX targets.
pub trait TypeResolver {
    /// Resolve the named types inside `ty` to their declarations.
    fn resolve(&self, ty: Type) -> Type;
}

/// Resolver that leaves types untouched. Sufficient wherever no named type
/// can occur, and for tests.
pub struct IdentityResolver;

impl TypeResolver for IdentityResolver {
    fn resolve(&self, ty: Type) -> Type {
        ty
    }
}

/// A name-mangling engine. The two concrete dialect implementations live
/// with the back end; the ABI layer only routes to them.
pub trait Mangler {
    fn mangle_symbol(&self, symbol: &Symbol) -> String;
    fn mangle_type_info(&self, record: &RecordType) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout64() -> LayoutContext {
        LayoutContext {
            pointer_size: 8,
            extended_float_size: 16,
            extended_float_align: 16,
        }
    }

    fn layout32() -> LayoutContext {
        LayoutContext {
            pointer_size: 4,
            extended_float_size: 12,
            extended_float_align: 4,
        }
    }

    #[test]
    fn scalar_sizes() {
        let l = layout64();
        assert_eq!(Type::int8().size(&l), 1);
        assert_eq!(Type::int64().size(&l), 8);
        assert_eq!(Type::float32().size(&l), 4);
        assert_eq!(Type::extended_float().size(&l), 16);
        assert_eq!(Type::complex(FloatPrecision::Single).size(&l), 8);
        assert_eq!(Type::complex(FloatPrecision::Extended).size(&l), 32);
        assert_eq!(Type::narrow_char().size(&l), 1);
    }

    #[test]
    fn pointerish_sizes_follow_layout() {
        let t = Type::pointer_to(Type::int32());
        assert_eq!(t.size(&layout64()), 8);
        assert_eq!(t.size(&layout32()), 4);
        let d = Type::Delegate(Box::new(FunctionType::niladic(Type::Void)));
        assert_eq!(d.size(&layout64()), 16);
        assert_eq!(d.size(&layout32()), 8);
    }

    #[test]
    fn extended_float_size_follows_layout() {
        assert_eq!(Type::extended_float().size(&layout32()), 12);
        assert_eq!(Type::extended_float().natural_align(&layout32()), 4);
        assert_eq!(Type::extended_float().natural_align(&layout64()), 16);
    }

    #[test]
    fn array_and_vector_sizes() {
        let l = layout64();
        assert_eq!(Type::static_array(Type::int32(), 6).size(&l), 24);
        assert_eq!(Type::vector_of(Type::float32(), 4).size(&l), 16);
        assert_eq!(Type::vector_of(Type::float64(), 4).size(&l), 32);
    }

    #[test]
    fn base_elem_strips_array_layers() {
        let t = Type::static_array(Type::static_array(Type::float64(), 2), 3);
        assert_eq!(*t.base_elem(), Type::float64());
        assert_eq!(*Type::int32().base_elem(), Type::int32());
    }

    #[test]
    fn kind_predicates() {
        assert!(Type::Bool.is_integral());
        assert!(Type::narrow_char().is_integral());
        assert!(Type::complex(FloatPrecision::Double).is_floating());
        assert!(Type::complex(FloatPrecision::Double).is_scalar());
        assert!(!Type::pointer_to(Type::Void).is_scalar());
        assert!(!Type::record(RecordType::new("S", 4, 4)).is_scalar());
    }

    #[test]
    fn record_queries() {
        let mut rec = RecordType::new("Pair", 8, 4);
        rec.fields.push(Field {
            name: "a".into(),
            ty: Type::int32(),
        });
        rec.fields.push(Field {
            name: "b".into(),
            ty: Type::int32(),
        });
        rec.arg_types.push(Type::int64());
        let t = Type::record(rec);
        let r = t.as_record().unwrap();
        assert_eq!(r.fields.len(), 2);
        assert_eq!(r.arg_types.len(), 1);
        assert!(r.pod);
        assert_eq!(t.size(&layout64()), 8);
        assert_eq!(t.natural_align(&layout64()), 4);
    }

    #[test]
    fn complex_aligns_as_component() {
        let l = layout64();
        assert_eq!(Type::complex(FloatPrecision::Single).natural_align(&l), 4);
        assert_eq!(Type::complex(FloatPrecision::Double).natural_align(&l), 8);
    }

    #[test]
    fn types_survive_serialization() {
        let t = Type::static_array(Type::complex(FloatPrecision::Double), 3);
        let json = serde_json::to_string(&t).unwrap();
        let back: Type = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn identity_resolver_is_a_no_op() {
        let t = Type::pointer_to(Type::named("__va_list_tag"));
        assert_eq!(IdentityResolver.resolve(t.clone()), t);
    }
}
