//! Test harness for vkdispatch.
//!
//! Provides stub drivers that stand in for a Vulkan implementation when
//! building dispatch tables, without needing a GPU or a loader library.

pub mod driver;

pub use driver::{get_instance_proc, sentinel_address, StubDriver};
