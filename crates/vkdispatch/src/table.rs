//! Static dispatch table layout.
//!
//! Each tier declares its symbols once through [`dispatch_table!`]. The macro
//! pairs every entry point name with its `ash::vk` PFN type, so the
//! name-to-signature mapping is fixed when the crate is compiled.

/// Declare a dispatch table with one optional slot per entry point.
///
/// Slot names are the Vulkan entry point names. The generated type gets:
/// - `SYMBOLS`, the nul-terminated names in declaration order
/// - `resolve_with`, which fills every slot from a resolver closure
/// - presence queries (`presence`, `present`, `missing`, `is_present`,
///   `resolved_count`)
macro_rules! dispatch_table {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($func:ident: $pfn:ty,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        #[allow(non_snake_case)]
        $vis struct $name {
            $(
                #[doc = concat!("`", stringify!($func), "`, or `None` when not provided.")]
                pub $func: Option<$pfn>,
            )+
        }

        impl $name {
            /// Every symbol in this table, in declaration order.
            pub const SYMBOLS: &'static [&'static ::std::ffi::CStr] = &[
                $($crate::proc_addr::symbol(concat!(stringify!($func), "\0").as_bytes()),)+
            ];

            /// Build a table by asking `resolve` for every symbol in turn.
            ///
            /// Each symbol resolves independently; an absent one leaves its
            /// slot empty and does not affect the others.
            ///
            /// # Safety
            /// For every name, `resolve` must return either `None` or an entry
            /// point whose signature matches the Vulkan definition of that name.
            pub unsafe fn resolve_with(
                mut resolve: impl FnMut(&'static ::std::ffi::CStr) -> ::ash::vk::PFN_vkVoidFunction,
            ) -> Self {
                let table = Self {
                    $(
                        $func: $crate::proc_addr::cast_proc(resolve(
                            $crate::proc_addr::symbol(concat!(stringify!($func), "\0").as_bytes()),
                        )),
                    )+
                };

                for name in table.missing() {
                    ::tracing::trace!("{}: {:?} not provided", stringify!($name), name);
                }
                ::tracing::debug!(
                    "Built {} ({}/{} symbols resolved)",
                    stringify!($name),
                    table.resolved_count(),
                    Self::SYMBOLS.len(),
                );

                table
            }

            /// Presence flag for each entry of [`Self::SYMBOLS`].
            pub fn presence(&self) -> Vec<bool> {
                vec![$(self.$func.is_some(),)+]
            }

            /// Check whether the named symbol was resolved.
            ///
            /// Names that do not belong to this table are never present.
            pub fn is_present(&self, name: &::std::ffi::CStr) -> bool {
                Self::SYMBOLS
                    .iter()
                    .zip(self.presence())
                    .any(|(symbol, present)| present && *symbol == name)
            }

            /// Names of the resolved symbols.
            pub fn present(&self) -> Vec<&'static ::std::ffi::CStr> {
                self.filter_symbols(true)
            }

            /// Names of the symbols left empty.
            pub fn missing(&self) -> Vec<&'static ::std::ffi::CStr> {
                self.filter_symbols(false)
            }

            /// Number of resolved slots.
            pub fn resolved_count(&self) -> usize {
                self.presence().into_iter().filter(|present| *present).count()
            }

            fn filter_symbols(&self, wanted: bool) -> Vec<&'static ::std::ffi::CStr> {
                Self::SYMBOLS
                    .iter()
                    .zip(self.presence())
                    .filter(|(_, present)| *present == wanted)
                    .map(|(symbol, _)| *symbol)
                    .collect()
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("resolved", &self.resolved_count())
                    .field("symbols", &Self::SYMBOLS.len())
                    .finish()
            }
        }
    };
}

pub(crate) use dispatch_table;
