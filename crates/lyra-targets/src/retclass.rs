//! Register-versus-memory classification of function returns.
//!
//! Decides whether a function result comes back in registers or is written
//! through a caller-supplied hidden pointer. The answer depends on the OS
//! family, bitness, object format, linkage, and the shape of the return
//! type; aggregates reduce layer by layer (fixed array to element, record
//! to its sole register constituent) until a scalar-sized verdict applies.

use lyra_core::types::{FloatPrecision, FunctionType, Linkage, Type};

use crate::abi::TargetAbi;
use crate::description::OsFamily;

/// Reduction steps before a malformed type is given up on and classified
/// as a memory return. Well-formed types cannot nest this deep.
const MAX_REDUCTIONS: u32 = 64;

impl TargetAbi {
    /// Whether a call to `tf` returns its result through a caller-provided
    /// hidden pointer rather than in registers.
    ///
    /// `needs_this` marks functions called with an implicit receiver
    /// (non-static member functions) under foreign C++ linkage.
    pub fn is_return_on_stack(&self, tf: &FunctionType, needs_this: bool) -> bool {
        if tf.returns_by_ref {
            // a ref return already comes back as a pointer
            return false;
        }
        let ret = &tf.ret;
        let sz = ret.size(&self.layout());

        if self.desc.os == OsFamily::Windows && self.desc.is_64bit {
            return self.win64_return_on_stack(tf, needs_this, ret, sz);
        }
        if self.desc.os == OsFamily::Windows && self.desc.object_format_is_coff {
            if ret.base_elem().is_record() && tf.linkage == Linkage::Cpp && needs_this {
                return true;
            }
        }
        self.general_return_on_stack(tf, needs_this, ret, sz)
    }

    /// Win64: anything that is not scalar-like must be a power-of-two
    /// 1..16 bytes to ride back in RAX/XMM0.
    fn win64_return_on_stack(
        &self,
        tf: &FunctionType,
        needs_this: bool,
        ret: &Type,
        sz: u64,
    ) -> bool {
        if matches!(
            ret,
            Type::Complex {
                precision: FloatPrecision::Single
            }
        ) {
            return true;
        }
        if ret.is_scalar() {
            return false;
        }
        if let Type::Record(rec) = ret.base_elem() {
            if tf.linkage == Linkage::Cpp && needs_this {
                return true;
            }
            if !rec.pod || sz > 8 {
                return true;
            }
            if rec.fields.is_empty() {
                return true;
            }
        }
        !matches!(sz, 1 | 2 | 4 | 8 | 16)
    }

    /// Every remaining target: reduce aggregates layer by layer, then
    /// apply the size/triviality rules.
    fn general_return_on_stack(
        &self,
        tf: &FunctionType,
        needs_this: bool,
        ret: &Type,
        sz: u64,
    ) -> bool {
        let os = self.desc.os;
        let is_64bit = self.desc.is_64bit;
        let mut t = ret;
        for _ in 0..MAX_REDUCTIONS {
            if matches!(t, Type::StaticArray { .. }) {
                let element = t.base_elem();
                if !element.is_record() {
                    return self.small_aggregate_on_stack(tf.linkage, sz);
                }
                t = element;
            }
            if let Type::Record(rec) = t {
                if os == OsFamily::Linux && tf.linkage != Linkage::Native && !is_64bit {
                    // the 32-bit C/C++ ABI returns every aggregate in memory
                    return true;
                }
                if os == OsFamily::Windows
                    && tf.linkage == Linkage::Cpp
                    && needs_this
                    && rec.pod
                    && rec.has_ctor
                {
                    // win32 quirk: otherwise-trivial records that declare a
                    // constructor return via the hidden pointer
                    return true;
                }
                match rec.arg_types.as_slice() {
                    [constituent] if !constituent.is_record() => {
                        return self.small_aggregate_on_stack(tf.linkage, sz);
                    }
                    [constituent] => {
                        t = constituent;
                        continue;
                    }
                    [] if is_64bit => return true,
                    _ => {}
                }
                if rec.pod {
                    match sz {
                        1 | 2 | 4 | 8 => return false,
                        16 if os != OsFamily::Windows && is_64bit => return false,
                        _ => {}
                    }
                }
                return true;
            }
            // non-record, non-array
            if os.is_posix() && tf.linkage == Linkage::C && t.is_complex() {
                // complex-single splits across a register pair; wider
                // complex kinds go to memory
                return !matches!(
                    t,
                    Type::Complex {
                        precision: FloatPrecision::Single
                    }
                );
            }
            return false;
        }
        true
    }

    fn small_aggregate_on_stack(&self, linkage: Linkage, sz: u64) -> bool {
        if self.desc.os == OsFamily::Linux && linkage != Linkage::Native && !self.desc.is_64bit {
            return true;
        }
        !matches!(sz, 1 | 2 | 4 | 8)
    }
}
