//! Lazy derivation of the target's `va_list` type.

use lyra_core::types::{Type, TypeResolver};

use crate::abi::TargetAbi;
use crate::description::OsFamily;

impl TargetAbi {
    /// The type of the variadic-argument cursor on this target.
    ///
    /// Computed on first use and cached; concurrent first calls are
    /// serialized by the cell. The 64-bit POSIX form names the
    /// `__va_list_tag` aggregate and is bound through `resolver` before it
    /// is cached.
    pub fn va_list_type(&self, resolver: &dyn TypeResolver) -> &Type {
        self.va_list.get_or_init(|| match self.desc.os {
            OsFamily::Windows => Type::pointer_to(Type::narrow_char()),
            OsFamily::Linux
            | OsFamily::Osx
            | OsFamily::FreeBsd
            | OsFamily::OpenBsd
            | OsFamily::DragonFlyBsd
            | OsFamily::Solaris => {
                if self.desc.is_64bit {
                    resolver.resolve(Type::pointer_to(Type::named("__va_list_tag")))
                } else {
                    Type::pointer_to(Type::narrow_char())
                }
            }
        })
    }
}
