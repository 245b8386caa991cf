//! CPU-feature-gated support for vector types and operators.
//!
//! Whether a vector type exists at all, and which operators compile for it,
//! depends on the byte width, the element kind, and the CPU feature tier
//! the target guarantees. "Unsupported" is an ordinary answer here, never
//! an error: semantic analysis turns it into a diagnostic.

use lyra_core::types::{FloatPrecision, Type};
use serde::{Deserialize, Serialize};

use crate::abi::TargetAbi;
use crate::description::{CpuTier, OsFamily};

/// Result of classifying a prospective vector type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VectorSupport {
    Supported,
    /// The target has no vector registers at all.
    UnsupportedOnTarget,
    /// The element kind can never be carried in a vector register.
    UnsupportedElementKind,
    /// The byte width is not available, either outright or below the
    /// feature tier it needs.
    UnsupportedSize,
}

/// Operator categories checked against vector operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VectorOp {
    UnaryPlus,
    Negate,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    And,
    Or,
    Xor,
    /// Bitwise complement (`~`), lowered as an xor against all-ones.
    BitNot,
    LogicalNot,
    Equal,
    NotEqual,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    ShiftLeft,
    ShiftRight,
    UnsignedShiftRight,
}

impl TargetAbi {
    /// Whether vector registers exist at all on this target.
    fn has_xmm(&self) -> bool {
        self.desc.is_64bit || self.desc.os == OsFamily::Osx
    }

    /// Classify a prospective vector type of `byte_size` bytes with the
    /// given element kind.
    pub fn classify_vector_type(&self, byte_size: u64, element: &Type) -> VectorSupport {
        if !self.has_xmm() {
            return VectorSupport::UnsupportedOnTarget;
        }
        let eligible = matches!(
            element,
            Type::Void
                | Type::Int { .. }
                | Type::Float {
                    precision: FloatPrecision::Single | FloatPrecision::Double,
                }
        );
        if !eligible {
            return VectorSupport::UnsupportedElementKind;
        }
        let supported = match byte_size {
            16 => {
                let floor = match element {
                    Type::Float {
                        precision: FloatPrecision::Single,
                    }
                    | Type::Int { width: 32, .. } => CpuTier::Sse,
                    _ => CpuTier::Sse2,
                };
                self.desc.cpu >= floor
            }
            32 => self.desc.cpu >= CpuTier::Avx,
            _ => false,
        };
        if supported {
            VectorSupport::Supported
        } else {
            VectorSupport::UnsupportedSize
        }
    }

    /// Whether `op` can be compiled for operands of type `ty` on this
    /// target. Non-vector operand types always pass; the check is a no-op
    /// for them.
    pub fn operation_supported(&self, ty: &Type, op: VectorOp, _rhs: Option<&Type>) -> bool {
        let Some((element, _lanes)) = ty.as_vector() else {
            return true;
        };
        let width = ty.size(&self.layout());
        if width != 16 && width != 32 {
            return false;
        }
        let wide = width == 32;
        let cpu = self.desc.cpu;
        let integral = element.is_integral();
        let floating = element.is_floating();
        let single = matches!(
            element,
            Type::Float {
                precision: FloatPrecision::Single
            }
        );
        let double = matches!(
            element,
            Type::Float {
                precision: FloatPrecision::Double
            }
        );
        let int16 = matches!(element, Type::Int { width: 16, .. });
        let int32 = matches!(element, Type::Int { width: 32, .. });

        match op {
            VectorOp::UnaryPlus => element.is_scalar(),
            VectorOp::Negate | VectorOp::Add | VectorOp::Sub => {
                if wide {
                    (floating && cpu >= CpuTier::Avx) || (integral && cpu >= CpuTier::Avx2)
                } else {
                    (single && cpu >= CpuTier::Sse)
                        || ((double || integral) && cpu >= CpuTier::Sse2)
                }
            }
            VectorOp::Mul => {
                if wide {
                    (floating && cpu >= CpuTier::Avx)
                        || ((int16 || int32) && cpu >= CpuTier::Avx2)
                } else {
                    (single && cpu >= CpuTier::Sse)
                        || ((double || int16) && cpu >= CpuTier::Sse2)
                        || (int32 && cpu >= CpuTier::Sse4_1)
                }
            }
            VectorOp::Div => {
                if wide {
                    floating && cpu >= CpuTier::Avx
                } else {
                    (single && cpu >= CpuTier::Sse) || (double && cpu >= CpuTier::Sse2)
                }
            }
            VectorOp::And | VectorOp::Or | VectorOp::Xor | VectorOp::BitNot => {
                integral
                    && if wide {
                        cpu >= CpuTier::Avx2
                    } else {
                        cpu >= CpuTier::Sse2
                    }
            }
            VectorOp::Mod
            | VectorOp::Pow
            | VectorOp::LogicalNot
            | VectorOp::Equal
            | VectorOp::NotEqual
            | VectorOp::Less
            | VectorOp::LessEq
            | VectorOp::Greater
            | VectorOp::GreaterEq
            | VectorOp::ShiftLeft
            | VectorOp::ShiftRight
            | VectorOp::UnsignedShiftRight => false,
        }
    }
}
