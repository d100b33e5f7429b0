//! Vulkan library loading and bootstrap entry points.

use crate::error::{LoaderError, Result};
use crate::fake;
use crate::proc_addr::cast_fn;
use ash::vk;
use parking_lot::Mutex;
use std::ffi::{CStr, OsString};
use std::path::PathBuf;
use std::ptr;
use std::sync::{Arc, Weak};

/// Environment variable naming a library to try before the defaults.
pub const LIBRARY_ENV: &str = "VKDISPATCH_LIBRARY";

/// Environment variable selecting the fake backing when set.
pub const FAKE_ENV: &str = "VKDISPATCH_FAKE";

/// Platform library names, tried in order.
#[cfg(target_os = "windows")]
const DEFAULT_LIBRARY_NAMES: &[&str] = &["vulkan-1.dll"];
#[cfg(target_os = "macos")]
const DEFAULT_LIBRARY_NAMES: &[&str] = &[
    "libvulkan.dylib",
    "libvulkan.1.dylib",
    "libMoltenVK.dylib",
];
#[cfg(target_os = "android")]
const DEFAULT_LIBRARY_NAMES: &[&str] = &["libvulkan.so"];
#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "android")))]
const DEFAULT_LIBRARY_NAMES: &[&str] = &["libvulkan.so.1", "libvulkan.so"];

/// Process-wide library shared by [`Library::shared`].
static SHARED_LIBRARY: Mutex<Weak<Library>> = Mutex::new(Weak::new());

/// What keeps the bootstrap entry points alive.
enum Backing {
    /// A mapped shared library, unloaded when dropped.
    Mapped {
        /// Held only so the image stays mapped until drop.
        _image: libloading::Library,
        path: PathBuf,
    },
    /// The in-crate stand-in from [`crate::fake`].
    Fake,
}

/// The Vulkan loader library and its bootstrap entry points.
///
/// Every bootstrap symbol is mandatory, so the slots are not optional. The
/// mapped image is released exactly once, when this value is dropped; instance
/// tables built from it must not be used past that point unless the backing
/// is fake.
#[allow(non_snake_case)]
pub struct Library {
    backing: Backing,

    pub vkGetInstanceProcAddr: vk::PFN_vkGetInstanceProcAddr,
    pub vkCreateInstance: vk::PFN_vkCreateInstance,
    pub vkEnumerateInstanceExtensionProperties: vk::PFN_vkEnumerateInstanceExtensionProperties,
}

impl Library {
    /// Bootstrap symbols resolved from the library itself.
    pub const SYMBOLS: [&'static CStr; 3] = [
        c"vkGetInstanceProcAddr",
        c"vkCreateInstance",
        c"vkEnumerateInstanceExtensionProperties",
    ];

    /// Open the system Vulkan library using the environment configuration.
    ///
    /// # Safety
    /// Loading a library runs its initialisers. The library that gets mapped
    /// must be a conforming Vulkan loader.
    pub unsafe fn open() -> Result<Self> {
        LibraryBuilder::from_env().open()
    }

    /// Open a library backed by the headless fake.
    pub fn fake() -> Self {
        // SAFETY: the fake resolves each bootstrap name to a stub with the
        // matching signature.
        match unsafe { Self::resolve_bootstrap(fake::lookup_global) } {
            Ok(entry_points) => Self::with_backing(Backing::Fake, entry_points),
            Err(err) => unreachable!("fake backing provides every bootstrap symbol: {err}"),
        }
    }

    /// Get the library shared by the whole process, loading it on first use
    /// with the environment configuration.
    ///
    /// See [`LibraryBuilder::shared`].
    ///
    /// # Safety
    /// Same as [`Library::open`].
    pub unsafe fn shared() -> Result<Arc<Self>> {
        LibraryBuilder::from_env().shared()
    }

    /// Whether this library is the headless fake.
    pub fn is_fake(&self) -> bool {
        matches!(self.backing, Backing::Fake)
    }

    /// Path of the mapped image, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match &self.backing {
            Backing::Mapped { path, .. } => Some(path),
            Backing::Fake => None,
        }
    }

    /// Enumerate the instance extensions reported by the implementation.
    pub fn enumerate_instance_extensions(&self) -> Result<Vec<String>> {
        loop {
            let mut count = 0u32;
            // SAFETY: count query with a null properties array.
            unsafe {
                (self.vkEnumerateInstanceExtensionProperties)(ptr::null(), &mut count, ptr::null_mut())
            }
            .result()?;

            let mut properties = vec![vk::ExtensionProperties::default(); count as usize];
            // SAFETY: `properties` has room for `count` entries.
            let result = unsafe {
                (self.vkEnumerateInstanceExtensionProperties)(
                    ptr::null(),
                    &mut count,
                    properties.as_mut_ptr(),
                )
            };

            // The set can grow between the two calls; start over if it did.
            if result == vk::Result::INCOMPLETE {
                continue;
            }
            result.result()?;

            properties.truncate(count as usize);
            let names = properties
                .iter()
                .map(|props| {
                    // SAFETY: the implementation writes nul-terminated names.
                    unsafe { CStr::from_ptr(props.extension_name.as_ptr()) }
                        .to_string_lossy()
                        .into_owned()
                })
                .collect();
            return Ok(names);
        }
    }

    /// Resolve the bootstrap symbols through `lookup`.
    ///
    /// # Safety
    /// `lookup` must return null or an entry point with the Vulkan signature
    /// of the requested name.
    unsafe fn resolve_bootstrap(
        lookup: impl Fn(&'static CStr) -> vk::PFN_vkVoidFunction,
    ) -> Result<BootstrapEntryPoints> {
        let require = |name: &'static CStr| {
            lookup(name)
                .ok_or_else(|| LoaderError::SymbolMissing(name.to_string_lossy().into_owned()))
        };

        let [get_instance_proc_addr, create_instance, enumerate_instance_extension_properties] =
            Self::SYMBOLS;
        Ok(BootstrapEntryPoints {
            get_instance_proc_addr: cast_fn(require(get_instance_proc_addr)?),
            create_instance: cast_fn(require(create_instance)?),
            enumerate_instance_extension_properties: cast_fn(require(
                enumerate_instance_extension_properties,
            )?),
        })
    }

    /// Resolve the bootstrap symbols from a freshly mapped image.
    unsafe fn from_image(image: libloading::Library, path: PathBuf) -> Result<Self> {
        let entry_points = Self::resolve_bootstrap(|name| {
            image
                .get::<unsafe extern "system" fn()>(name.to_bytes_with_nul())
                .ok()
                .map(|sym| *sym)
        })?;
        Ok(Self::with_backing(Backing::Mapped {
                _image: image,
                path,
            }, entry_points))
    }

    fn with_backing(backing: Backing, entry_points: BootstrapEntryPoints) -> Self {
        Self {
            backing,
            vkGetInstanceProcAddr: entry_points.get_instance_proc_addr,
            vkCreateInstance: entry_points.create_instance,
            vkEnumerateInstanceExtensionProperties: entry_points
                .enumerate_instance_extension_properties,
        }
    }
}

/// Bootstrap entry points before they are tied to a backing.
struct BootstrapEntryPoints {
    get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    create_instance: vk::PFN_vkCreateInstance,
    enumerate_instance_extension_properties: vk::PFN_vkEnumerateInstanceExtensionProperties,
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("path", &self.path())
            .field("fake", &self.is_fake())
            .finish()
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        match &self.backing {
            Backing::Mapped { path, .. } => {
                tracing::debug!("Unloading Vulkan library {}", path.display());
            }
            Backing::Fake => tracing::trace!("Dropping fake Vulkan library"),
        }
    }
}

/// Builder for opening a [`Library`].
#[derive(Debug, Clone, Default)]
pub struct LibraryBuilder {
    library_names: Vec<OsString>,
    search_paths: Vec<PathBuf>,
    fake: bool,
}

impl LibraryBuilder {
    /// Create a new builder using the platform defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder configured from [`LIBRARY_ENV`] and [`FAKE_ENV`].
    pub fn from_env() -> Self {
        let mut builder = Self::new();
        if let Some(name) = std::env::var_os(LIBRARY_ENV) {
            builder = builder.library_name(name);
        }
        if std::env::var_os(FAKE_ENV).is_some() {
            builder = builder.fake(true);
        }
        builder
    }

    /// Try this library name or path before the platform defaults.
    pub fn library_name(mut self, name: impl Into<OsString>) -> Self {
        self.library_names.push(name.into());
        self
    }

    /// Look for the library in this directory before the system search path.
    pub fn search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Use the headless fake instead of a real library.
    pub fn fake(mut self, fake: bool) -> Self {
        self.fake = fake;
        self
    }

    /// Library paths to try, in order.
    ///
    /// Explicit names come first, then the platform defaults. Each name is
    /// tried inside every search path before being handed to the system
    /// loader as is.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let names: Vec<OsString> = self
            .library_names
            .iter()
            .cloned()
            .chain(DEFAULT_LIBRARY_NAMES.iter().map(OsString::from))
            .collect();

        let mut candidates = Vec::new();
        for name in &names {
            for dir in &self.search_paths {
                candidates.push(dir.join(name));
            }
            candidates.push(PathBuf::from(name));
        }
        candidates
    }

    /// Open the library.
    ///
    /// # Safety
    /// Loading a library runs its initialisers. The library that gets mapped
    /// must be a conforming Vulkan loader.
    pub unsafe fn open(self) -> Result<Library> {
        if self.fake {
            tracing::debug!("Using fake Vulkan library");
            return Ok(Library::fake());
        }

        open_first(&self.candidates())
    }

    /// Get the process-wide library, opening it with this configuration if no
    /// shared library is alive.
    ///
    /// Concurrent callers are serialised; the image is opened once and reused
    /// for as long as any returned handle is alive. A live shared library is
    /// returned as is, whatever this builder asks for.
    ///
    /// # Safety
    /// Same as [`LibraryBuilder::open`].
    pub unsafe fn shared(self) -> Result<Arc<Library>> {
        let mut slot = SHARED_LIBRARY.lock();
        if let Some(library) = slot.upgrade() {
            return Ok(library);
        }

        let library = Arc::new(self.open()?);
        *slot = Arc::downgrade(&library);
        Ok(library)
    }
}

/// Map the first candidate that loads.
unsafe fn open_first(candidates: &[PathBuf]) -> Result<Library> {
    let mut failures = Vec::new();
    let mut last_error = None;

    for candidate in candidates {
        match libloading::Library::new(candidate) {
            Ok(image) => {
                tracing::debug!("Loaded Vulkan library {}", candidate.display());
                return Library::from_image(image, candidate.clone());
            }
            Err(e) => {
                tracing::warn!("Could not load {}: {e}", candidate.display());
                failures.push(format!("{}: {e}", candidate.display()));
                last_error = Some(e);
            }
        }
    }

    let Some(source) = last_error else {
        return Err(LoaderError::Precondition(
            "no Vulkan library candidates to try".to_string(),
        ));
    };
    Err(LoaderError::Load {
        failures: failures.join("; "),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_library_bootstraps() {
        let library = Library::fake();
        assert!(library.is_fake());
        assert!(library.path().is_none());
    }

    #[test]
    fn fake_library_has_no_extensions() {
        let library = Library::fake();
        assert_eq!(library.enumerate_instance_extensions().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn builder_fake_skips_loading() {
        let library = unsafe { LibraryBuilder::new().fake(true).open() }.unwrap();
        assert!(library.is_fake());
    }

    #[test]
    fn candidates_order() {
        let builder = LibraryBuilder::new()
            .library_name("custom-vulkan.so")
            .search_path("/opt/vulkan");
        let candidates = builder.candidates();

        assert_eq!(candidates[0], PathBuf::from("/opt/vulkan/custom-vulkan.so"));
        assert_eq!(candidates[1], PathBuf::from("custom-vulkan.so"));
        assert_eq!(candidates.len(), 2 * (1 + DEFAULT_LIBRARY_NAMES.len()));
    }

    #[test]
    fn missing_library_is_load_error() {
        let missing = PathBuf::from("/nonexistent/vkdispatch/libvulkan.so.1");
        let result = unsafe { open_first(&[missing]) };
        match result {
            Err(LoaderError::Load { failures, .. }) => {
                assert!(failures.starts_with("/nonexistent/vkdispatch/libvulkan.so.1: "));
            }
            other => panic!("expected Load error, got {other:?}"),
        }
    }

    #[test]
    fn load_error_keeps_every_failure() {
        use std::error::Error;

        let configured = PathBuf::from("/nonexistent/x.so");
        let fallback = PathBuf::from("/nonexistent/vkdispatch/libvulkan.so");
        let err = unsafe { open_first(&[configured, fallback]) }.unwrap_err();

        assert!(err.source().is_some());
        let message = err.to_string();
        assert!(message.contains("/nonexistent/x.so: "), "{message}");
        assert!(message.contains("/nonexistent/vkdispatch/libvulkan.so: "), "{message}");
    }

    #[test]
    fn no_candidates_is_precondition() {
        let result = unsafe { open_first(&[]) };
        assert!(matches!(result, Err(LoaderError::Precondition(_))));
    }

    #[test]
    fn bootstrap_resolves_exactly_its_symbols() {
        let queried = std::cell::RefCell::new(Vec::new());
        let result = unsafe {
            Library::resolve_bootstrap(|name| {
                queried.borrow_mut().push(name);
                fake::lookup_global(name)
            })
        };

        assert!(result.is_ok());
        assert_eq!(queried.into_inner(), Library::SYMBOLS.to_vec());
    }

    #[test]
    fn missing_bootstrap_symbol() {
        let result = unsafe {
            Library::resolve_bootstrap(|name| {
                if name == c"vkCreateInstance" {
                    None
                } else {
                    fake::lookup_global(name)
                }
            })
        };
        assert!(matches!(
            result,
            Err(LoaderError::SymbolMissing(ref name)) if name == "vkCreateInstance"
        ));
    }

    #[test]
    fn shared_library_is_reused() {
        let first = unsafe { LibraryBuilder::new().fake(true).shared() }.unwrap();
        let second = unsafe { LibraryBuilder::new().fake(true).shared() }.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.is_fake());
    }
}
