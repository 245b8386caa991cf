//! Per-kind, per-target alignment rules.

use lyra_core::types::{FloatPrecision, Type};

use crate::abi::TargetAbi;
use crate::description::OsFamily;

impl TargetAbi {
    /// ABI alignment of `ty` on this target.
    pub fn align_of(&self, ty: &Type) -> u32 {
        let posix = self.desc.os.is_posix();
        match ty {
            Type::Float {
                precision: FloatPrecision::Extended,
            }
            | Type::Imaginary {
                precision: FloatPrecision::Extended,
            }
            | Type::Complex {
                precision: FloatPrecision::Extended,
            } => self.extended_float_align,
            Type::Complex {
                precision: FloatPrecision::Single,
            } if posix => 4,
            Type::Int { width: 64, .. }
            | Type::Float {
                precision: FloatPrecision::Double,
            }
            | Type::Imaginary {
                precision: FloatPrecision::Double,
            }
            | Type::Complex {
                precision: FloatPrecision::Double,
            } if posix => {
                if self.desc.is_64bit {
                    8
                } else {
                    4
                }
            }
            _ => ty.natural_align(&self.layout()),
        }
    }

    /// Alignment of `ty` when laid out as an aggregate field.
    ///
    /// Vector and extended-float alignments survive only where the target
    /// ABI mandates them (64-bit and Apple); everywhere else field alignment
    /// caps at 8.
    pub fn field_align_of(&self, ty: &Type) -> u32 {
        let align = self.align_of(ty);
        if (self.desc.is_64bit || self.desc.os == OsFamily::Osx) && (align == 16 || align == 32) {
            return align;
        }
        align.min(8)
    }
}
