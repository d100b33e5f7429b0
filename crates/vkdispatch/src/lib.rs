//! Tiered Vulkan function loader.
//!
//! Vulkan entry points are resolved at runtime in three tiers:
//! - [`Library`] maps the Vulkan loader and resolves the bootstrap symbols
//! - [`InstanceTable`] resolves instance-level functions through
//!   `vkGetInstanceProcAddr`
//! - [`DeviceTable`] resolves device-level functions through the instance's
//!   `vkGetDeviceProcAddr`
//!
//! Every table slot is an `Option` of the typed `ash::vk` function pointer.
//! Symbols the implementation does not provide are left as `None`, and it is
//! up to the caller to check a slot before calling through it.
//!
//! [`InstanceDispatch`] and [`DeviceDispatch`] pair a handle with its table
//! and keep the tier below alive.

pub mod device;
pub mod dispatch;
pub mod error;
mod fake;
pub mod instance;
pub mod library;
pub mod proc_addr;
mod table;

pub use device::DeviceTable;
pub use dispatch::{DeviceDispatch, InstanceDispatch};
pub use error::{LoaderError, Result};
pub use instance::InstanceTable;
pub use library::{Library, LibraryBuilder};
pub use proc_addr::GetInstanceProcFn;

pub use ash::vk;
