//! The resolved target ABI model.
//!
//! [`TargetAbi`] is computed once from a [`TargetDescription`] at the start
//! of a compilation and treated as read-only by every later phase. The only
//! mutation after initialization is the write-once va_list cache, guarded by
//! its cell. `deinitialize` returns the model to its zeroed state so tools
//! that re-target within one process can initialize again.

use lyra_core::types::{LayoutContext, Linkage, Type};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::description::{OsFamily, TargetDescription};

/// Properties of a floating-point format, taken from the host numeric
/// environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FloatProperties {
    pub max: f64,
    pub min_normal: f64,
    pub nan: f64,
    pub infinity: f64,
    pub epsilon: f64,
    /// Decimal digits of precision.
    pub dig: u32,
    /// Bits in the mantissa.
    pub mant_dig: u32,
    pub max_exp: i32,
    pub min_exp: i32,
    pub max_10_exp: i32,
    pub min_10_exp: i32,
}

impl FloatProperties {
    fn single() -> Self {
        Self {
            max: f64::from(f32::MAX),
            min_normal: f64::from(f32::MIN_POSITIVE),
            nan: f64::from(f32::NAN),
            infinity: f64::from(f32::INFINITY),
            epsilon: f64::from(f32::EPSILON),
            dig: f32::DIGITS,
            mant_dig: f32::MANTISSA_DIGITS,
            max_exp: f32::MAX_EXP,
            min_exp: f32::MIN_EXP,
            max_10_exp: f32::MAX_10_EXP,
            min_10_exp: f32::MIN_10_EXP,
        }
    }

    fn double() -> Self {
        Self {
            max: f64::MAX,
            min_normal: f64::MIN_POSITIVE,
            nan: f64::NAN,
            infinity: f64::INFINITY,
            epsilon: f64::EPSILON,
            dig: f64::DIGITS,
            mant_dig: f64::MANTISSA_DIGITS,
            max_exp: f64::MAX_EXP,
            min_exp: f64::MIN_EXP,
            max_10_exp: f64::MAX_10_EXP,
            min_10_exp: f64::MIN_10_EXP,
        }
    }

    fn extended() -> Self {
        // The host exposes no format wider than double; the extended
        // precision reuses its environment.
        Self::double()
    }
}

/// C ABI facts derived from the target description.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CAbiFacts {
    /// Size of C `long` in bytes.
    pub long_size: u32,
    /// Size of C `long double` in bytes.
    pub long_double_size: u32,
    /// Size of the C runtime's mutex/critical-section object in bytes.
    pub critical_section_size: u32,
}

impl CAbiFacts {
    fn resolve(desc: &TargetDescription, extended_float_size: u32) -> Self {
        let long_size = if desc.os.is_posix() && desc.is_64bit {
            8
        } else {
            4
        };
        // The MSVC runtime's long double is a plain double.
        let long_double_size = if desc.os == OsFamily::Windows {
            8
        } else {
            extended_float_size
        };
        let critical_section_size = match desc.os {
            // CRITICAL_SECTION and glibc pthread_mutex_t coincide
            OsFamily::Windows | OsFamily::Linux => {
                if desc.is_64bit {
                    40
                } else {
                    24
                }
            }
            OsFamily::Osx => {
                if desc.is_64bit {
                    64
                } else {
                    44
                }
            }
            OsFamily::Solaris => 24,
            // pointer to an opaque kernel object
            OsFamily::FreeBsd | OsFamily::OpenBsd | OsFamily::DragonFlyBsd => {
                if desc.is_64bit {
                    8
                } else {
                    4
                }
            }
        };
        Self {
            long_size,
            long_double_size,
            critical_section_size,
        }
    }
}

/// C++ ABI facts consumed by codegen and mangling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CppAbiFacts {
    /// Overload sets mangle in reverse declaration order.
    pub reverse_overload_order: bool,
    /// C++ exceptions can propagate through Lyra frames.
    pub exception_interop_supported: bool,
    /// The vtable carries both deleting and complete destructors.
    pub two_destructors_in_vtable: bool,
}

impl CppAbiFacts {
    fn resolve(desc: &TargetDescription) -> Self {
        let windows = desc.os == OsFamily::Windows;
        Self {
            reverse_overload_order: windows && !desc.is_64bit,
            exception_interop_supported: !windows,
            two_destructors_in_vtable: !windows,
        }
    }
}

/// Objective-C ABI facts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjcAbiFacts {
    pub interop_supported: bool,
}

impl ObjcAbiFacts {
    fn resolve(desc: &TargetDescription) -> Self {
        Self {
            interop_supported: desc.os == OsFamily::Osx && desc.is_64bit,
        }
    }
}

/// A value from the target-info registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetInfoValue {
    Str(String),
    Int(u32),
}

/// The resolved target ABI: the root aggregate every later phase queries.
#[derive(Debug, Clone, Default)]
pub struct TargetAbi {
    /// Pointer size in bytes.
    pub pointer_size: u32,
    /// In-memory size of the extended floating-point format, padding
    /// included.
    pub extended_float_size: u32,
    /// Padding bytes inside `extended_float_size`.
    pub extended_float_pad: u32,
    /// Alignment of the extended floating-point format.
    pub extended_float_align: u32,
    /// Size of the runtime class-metadata object.
    pub class_info_size: u32,
    /// Upper bound for a single static data object.
    pub max_static_data_size: u64,
    pub float_properties: FloatProperties,
    pub double_properties: FloatProperties,
    pub extended_properties: FloatProperties,
    pub c: CAbiFacts,
    pub cpp: CppAbiFacts,
    pub objc: ObjcAbiFacts,
    pub(crate) desc: TargetDescription,
    pub(crate) va_list: OnceCell<Type>,
}

/// Extended-float layout `(size, pad, align)` keyed on OS family and
/// bitness.
fn extended_float_layout(os: OsFamily, is_64bit: bool) -> (u32, u32, u32) {
    match os {
        OsFamily::Windows => (10, 0, 2),
        OsFamily::Osx => (16, 6, 16),
        OsFamily::Linux
        | OsFamily::FreeBsd
        | OsFamily::OpenBsd
        | OsFamily::DragonFlyBsd
        | OsFamily::Solaris => {
            if is_64bit {
                (16, 6, 16)
            } else {
                (12, 2, 4)
            }
        }
    }
}

impl TargetAbi {
    /// Resolve the full ABI model for `desc`.
    pub fn new(desc: TargetDescription) -> Self {
        let mut abi = Self::default();
        abi.initialize(&desc);
        abi
    }

    /// Populate every derived fact from `desc`. Called exactly once per
    /// compilation; a deinitialized model may be initialized again.
    pub fn initialize(&mut self, desc: &TargetDescription) {
        self.float_properties = FloatProperties::single();
        self.double_properties = FloatProperties::double();
        self.extended_properties = FloatProperties::extended();

        if desc.is_lp64 {
            self.pointer_size = 8;
            self.class_info_size = 152;
        } else {
            self.pointer_size = 4;
            self.class_info_size = 76;
        }

        self.max_static_data_size = i32::MAX as u64;
        if desc.os == OsFamily::Windows && !desc.is_64bit && !desc.object_format_is_coff {
            // the legacy OMF linker cannot emit a data object past 16 MiB
            self.max_static_data_size = 0x100_0000;
        }

        let (size, pad, align) = extended_float_layout(desc.os, desc.is_64bit);
        self.extended_float_size = size;
        self.extended_float_pad = pad;
        self.extended_float_align = align;

        self.c = CAbiFacts::resolve(desc, self.extended_float_size);
        self.cpp = CppAbiFacts::resolve(desc);
        self.objc = ObjcAbiFacts::resolve(desc);
        self.desc = desc.clone();
        self.va_list = OnceCell::new();
    }

    /// Reset every field to its zero value.
    pub fn deinitialize(&mut self) {
        *self = Self::default();
    }

    /// The description this model was resolved from.
    pub fn description(&self) -> &TargetDescription {
        &self.desc
    }

    /// The size context for `lyra-core` layout queries.
    pub fn layout(&self) -> LayoutContext {
        LayoutContext {
            pointer_size: self.pointer_size,
            extended_float_size: self.extended_float_size,
            extended_float_align: self.extended_float_align,
        }
    }

    /// The platform's default `extern(System)` linkage.
    pub fn system_linkage(&self) -> Linkage {
        if self.desc.os == OsFamily::Windows {
            Linkage::Windows
        } else {
            Linkage::C
        }
    }

    /// Size of the C runtime's critical-section object.
    pub fn critical_section_size(&self) -> u32 {
        self.c.critical_section_size
    }

    /// Bytes a parameter of type `ty` occupies in the argument area.
    pub fn parameter_size(&self, ty: &Type) -> u64 {
        if !self.desc.is_64bit && matches!(self.desc.os, OsFamily::FreeBsd | OsFamily::Osx) {
            // these targets report sizeof == 1 for an empty struct but
            // pass zero bytes for it
            if let Some(rec) = ty.as_record() {
                if rec.fields.is_empty() {
                    return 0;
                }
            }
        }
        let sz = ty.size(&self.layout());
        if self.desc.is_64bit {
            (sz + 7) & !7
        } else {
            (sz + 3) & !3
        }
    }

    /// Look up a target property by name. Unknown keys yield `None`.
    pub fn target_info(&self, key: &str) -> Option<TargetInfoValue> {
        match key {
            "objectFormat" => {
                let format = match self.desc.os {
                    OsFamily::Windows => {
                        if self.desc.object_format_is_coff {
                            "coff"
                        } else {
                            "omf"
                        }
                    }
                    OsFamily::Osx => "macho",
                    OsFamily::Linux
                    | OsFamily::FreeBsd
                    | OsFamily::OpenBsd
                    | OsFamily::DragonFlyBsd
                    | OsFamily::Solaris => "elf",
                };
                Some(TargetInfoValue::Str(format.into()))
            }
            "floatAbi" => Some(TargetInfoValue::Str("hard".into())),
            "cppRuntimeLibrary" => {
                let library = if self.desc.os == OsFamily::Windows {
                    if self.desc.object_format_is_coff {
                        self.desc.c_runtime.clone()
                    } else {
                        "snn".into()
                    }
                } else {
                    String::new()
                };
                Some(TargetInfoValue::Str(library))
            }
            "cppStd" => Some(TargetInfoValue::Int(self.desc.cpp_std)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyra_core::types::RecordType;

    #[test]
    fn layout_table_per_target() {
        // (desc, pointer, class_info, ext_size, ext_pad, ext_align)
        let cases = [
            (TargetDescription::linux_x86_64(), 8, 152, 16, 6, 16),
            (TargetDescription::linux_x86(), 4, 76, 12, 2, 4),
            (TargetDescription::windows_x64(), 8, 152, 10, 0, 2),
            (TargetDescription::windows_x86_coff(), 4, 76, 10, 0, 2),
            (TargetDescription::windows_x86_omf(), 4, 76, 10, 0, 2),
            (TargetDescription::macos_x86_64(), 8, 152, 16, 6, 16),
            (TargetDescription::macos_x86(), 4, 76, 16, 6, 16),
            (TargetDescription::freebsd_x86_64(), 8, 152, 16, 6, 16),
            (TargetDescription::freebsd_x86(), 4, 76, 12, 2, 4),
            (TargetDescription::openbsd_x86_64(), 8, 152, 16, 6, 16),
            (TargetDescription::dragonflybsd_x86_64(), 8, 152, 16, 6, 16),
            (TargetDescription::solaris_x86_64(), 8, 152, 16, 6, 16),
        ];
        for (desc, ptr, ci, esz, epad, ealign) in cases {
            let abi = TargetAbi::new(desc.clone());
            assert_eq!(abi.pointer_size, ptr, "{:?}", desc.os);
            assert_eq!(abi.class_info_size, ci, "{:?}", desc.os);
            assert_eq!(abi.extended_float_size, esz, "{:?}", desc.os);
            assert_eq!(abi.extended_float_pad, epad, "{:?}", desc.os);
            assert_eq!(abi.extended_float_align, ealign, "{:?}", desc.os);
        }
    }

    #[test]
    fn static_data_cap_only_on_omf_windows() {
        let omf = TargetAbi::new(TargetDescription::windows_x86_omf());
        assert_eq!(omf.max_static_data_size, 0x100_0000);
        let coff = TargetAbi::new(TargetDescription::windows_x86_coff());
        assert_eq!(coff.max_static_data_size, i32::MAX as u64);
        let linux = TargetAbi::new(TargetDescription::linux_x86());
        assert_eq!(linux.max_static_data_size, i32::MAX as u64);
    }

    #[test]
    fn c_abi_facts() {
        let linux64 = TargetAbi::new(TargetDescription::linux_x86_64());
        assert_eq!(linux64.c.long_size, 8);
        assert_eq!(linux64.c.long_double_size, 16);
        assert_eq!(linux64.critical_section_size(), 40);

        let linux32 = TargetAbi::new(TargetDescription::linux_x86());
        assert_eq!(linux32.c.long_size, 4);
        assert_eq!(linux32.c.long_double_size, 12);
        assert_eq!(linux32.critical_section_size(), 24);

        let win64 = TargetAbi::new(TargetDescription::windows_x64());
        assert_eq!(win64.c.long_size, 4);
        assert_eq!(win64.c.long_double_size, 8);
        assert_eq!(win64.critical_section_size(), 40);

        let osx = TargetAbi::new(TargetDescription::macos_x86_64());
        assert_eq!(osx.critical_section_size(), 64);
        let fbsd = TargetAbi::new(TargetDescription::freebsd_x86_64());
        assert_eq!(fbsd.critical_section_size(), 8);
        let solaris = TargetAbi::new(TargetDescription::solaris_x86_64());
        assert_eq!(solaris.critical_section_size(), 24);
    }

    #[test]
    fn cpp_and_objc_facts() {
        let win32 = TargetAbi::new(TargetDescription::windows_x86_coff());
        assert!(win32.cpp.reverse_overload_order);
        assert!(!win32.cpp.exception_interop_supported);
        assert!(!win32.cpp.two_destructors_in_vtable);

        let win64 = TargetAbi::new(TargetDescription::windows_x64());
        assert!(!win64.cpp.reverse_overload_order);

        let linux = TargetAbi::new(TargetDescription::linux_x86_64());
        assert!(linux.cpp.exception_interop_supported);
        assert!(linux.cpp.two_destructors_in_vtable);
        assert!(!linux.objc.interop_supported);

        let osx = TargetAbi::new(TargetDescription::macos_x86_64());
        assert!(osx.objc.interop_supported);
        let osx32 = TargetAbi::new(TargetDescription::macos_x86());
        assert!(!osx32.objc.interop_supported);
    }

    #[test]
    fn float_properties_from_host() {
        let abi = TargetAbi::new(TargetDescription::linux_x86_64());
        assert_eq!(abi.float_properties.mant_dig, 24);
        assert_eq!(abi.float_properties.max_10_exp, 38);
        assert_eq!(abi.double_properties.mant_dig, 53);
        assert_eq!(abi.double_properties.max_exp, 1024);
        assert!(abi.double_properties.nan.is_nan());
        assert!(abi.extended_properties.infinity.is_infinite());
    }

    #[test]
    fn deinitialize_resets_to_zero() {
        let mut abi = TargetAbi::new(TargetDescription::windows_x64());
        abi.deinitialize();
        assert_eq!(abi.pointer_size, 0);
        assert_eq!(abi.class_info_size, 0);
        assert_eq!(abi.max_static_data_size, 0);
        assert_eq!(abi.c, CAbiFacts::default());
        // and the model can be resolved again for a different target
        abi.initialize(&TargetDescription::linux_x86_64());
        assert_eq!(abi.pointer_size, 8);
    }

    #[test]
    fn system_linkage_per_os() {
        let win = TargetAbi::new(TargetDescription::windows_x64());
        assert_eq!(win.system_linkage(), Linkage::Windows);
        let linux = TargetAbi::new(TargetDescription::linux_x86_64());
        assert_eq!(linux.system_linkage(), Linkage::C);
    }

    #[test]
    fn parameter_size_rounds_to_slot() {
        let abi64 = TargetAbi::new(TargetDescription::linux_x86_64());
        assert_eq!(abi64.parameter_size(&Type::int8()), 8);
        assert_eq!(abi64.parameter_size(&Type::int64()), 8);
        assert_eq!(abi64.parameter_size(&Type::record(RecordType::new("S", 12, 4))), 16);

        let abi32 = TargetAbi::new(TargetDescription::linux_x86());
        assert_eq!(abi32.parameter_size(&Type::int8()), 4);
        assert_eq!(abi32.parameter_size(&Type::int64()), 8);
        assert_eq!(abi32.parameter_size(&Type::record(RecordType::new("S", 5, 1))), 8);
    }

    #[test]
    fn empty_record_parameter_on_freebsd32_and_osx32() {
        // sizeof reports 1 but nothing is passed
        let empty = Type::record(RecordType::new("Empty", 1, 1));
        for desc in [
            TargetDescription::freebsd_x86(),
            TargetDescription::macos_x86(),
        ] {
            let abi = TargetAbi::new(desc);
            assert_eq!(abi.parameter_size(&empty), 0);
        }
        // 64-bit flavors round up as usual
        let abi = TargetAbi::new(TargetDescription::freebsd_x86_64());
        assert_eq!(abi.parameter_size(&empty), 8);
        // other 32-bit targets too
        let abi = TargetAbi::new(TargetDescription::linux_x86());
        assert_eq!(abi.parameter_size(&empty), 4);
    }

    #[test]
    fn target_info_registry() {
        let linux = TargetAbi::new(TargetDescription::linux_x86_64());
        assert_eq!(
            linux.target_info("objectFormat"),
            Some(TargetInfoValue::Str("elf".into()))
        );
        assert_eq!(
            linux.target_info("floatAbi"),
            Some(TargetInfoValue::Str("hard".into()))
        );
        assert_eq!(
            linux.target_info("cppRuntimeLibrary"),
            Some(TargetInfoValue::Str(String::new()))
        );
        assert_eq!(linux.target_info("cppStd"), Some(TargetInfoValue::Int(201703)));
        assert_eq!(linux.target_info("pointerWidth"), None);

        let osx = TargetAbi::new(TargetDescription::macos_x86_64());
        assert_eq!(
            osx.target_info("objectFormat"),
            Some(TargetInfoValue::Str("macho".into()))
        );

        let coff = TargetAbi::new(TargetDescription::windows_x64());
        assert_eq!(
            coff.target_info("objectFormat"),
            Some(TargetInfoValue::Str("coff".into()))
        );
        assert_eq!(
            coff.target_info("cppRuntimeLibrary"),
            Some(TargetInfoValue::Str("libcmt".into()))
        );

        let omf = TargetAbi::new(TargetDescription::windows_x86_omf());
        assert_eq!(
            omf.target_info("objectFormat"),
            Some(TargetInfoValue::Str("omf".into()))
        );
        assert_eq!(
            omf.target_info("cppRuntimeLibrary"),
            Some(TargetInfoValue::Str("snn".into()))
        );
    }
}
