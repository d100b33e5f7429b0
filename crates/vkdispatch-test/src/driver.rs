//! Stub proc-address driver.
//!
//! A [`StubDriver`] answers proc-address queries from two configurable name
//! sets, one per tier, and records every query it receives. Instance queries
//! go through [`get_instance_proc`] with the driver as user data. Device
//! queries go through a stub `vkGetDeviceProcAddr`; the device handle passed to
//! it is the address of the driver, see [`StubDriver::device_handle`].
//!
//! Resolved names get a sentinel function that must never be called, except
//! `vkGetDeviceProcAddr`, which resolves to the working stub.

use ash::vk::{self, Handle};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::ffi::{c_char, c_void, CStr, CString};
use vkdispatch::proc_addr::{self, erase_proc};
use vkdispatch::{DeviceTable, InstanceTable};

/// Placeholder handed out for every resolved symbol.
unsafe extern "system" fn sentinel() {
    panic!("stub driver sentinel called");
}

/// Address of the placeholder returned for resolved symbols.
pub fn sentinel_address() -> *const c_void {
    sentinel as *const c_void
}

/// A fake Vulkan implementation answering proc-address queries.
#[derive(Debug, Default)]
pub struct StubDriver {
    instance_symbols: HashSet<CString>,
    device_symbols: HashSet<CString>,
    instance_queries: Mutex<Vec<CString>>,
    device_queries: Mutex<Vec<CString>>,
}

impl StubDriver {
    /// Create a driver that resolves nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a driver that resolves every instance and device symbol.
    pub fn complete() -> Self {
        Self::new()
            .with_instance_symbols(InstanceTable::SYMBOLS.iter().copied())
            .with_device_symbols(DeviceTable::SYMBOLS.iter().copied())
    }

    /// Resolve these names on instance queries.
    pub fn with_instance_symbols<'a>(mut self, names: impl IntoIterator<Item = &'a CStr>) -> Self {
        self.instance_symbols
            .extend(names.into_iter().map(CStr::to_owned));
        self
    }

    /// Resolve these names on device queries.
    pub fn with_device_symbols<'a>(mut self, names: impl IntoIterator<Item = &'a CStr>) -> Self {
        self.device_symbols
            .extend(names.into_iter().map(CStr::to_owned));
        self
    }

    /// User data to pass alongside [`get_instance_proc`].
    pub fn user_data(&self) -> *const c_void {
        (self as *const Self).cast()
    }

    /// Device handle understood by this driver's `vkGetDeviceProcAddr`.
    ///
    /// The handle is only valid while the driver is alive and not moved.
    pub fn device_handle(&self) -> vk::Device {
        vk::Device::from_raw(self as *const Self as u64)
    }

    /// Build an instance table from this driver.
    pub fn instance_table(&self) -> InstanceTable {
        // SAFETY: `get_instance_proc` expects a `StubDriver` as user data.
        unsafe { InstanceTable::new(get_instance_proc, self.user_data()) }
    }

    /// Names requested through [`get_instance_proc`], in order.
    pub fn instance_queries(&self) -> Vec<CString> {
        self.instance_queries.lock().clone()
    }

    /// Names requested through the stub `vkGetDeviceProcAddr`, in order.
    pub fn device_queries(&self) -> Vec<CString> {
        self.device_queries.lock().clone()
    }

    fn resolve_instance(&self, name: &CStr) -> vk::PFN_vkVoidFunction {
        self.instance_queries.lock().push(name.to_owned());
        if !self.instance_symbols.contains(name) {
            return None;
        }
        if name == c"vkGetDeviceProcAddr" {
            Some(erase_proc(get_device_proc_addr as vk::PFN_vkGetDeviceProcAddr))
        } else {
            Some(sentinel)
        }
    }

    fn resolve_device(&self, name: &CStr) -> vk::PFN_vkVoidFunction {
        self.device_queries.lock().push(name.to_owned());
        self.device_symbols.contains(name).then_some(sentinel as unsafe extern "system" fn())
    }
}

/// Instance proc-address callback for a [`StubDriver`].
///
/// # Safety
/// `user_data` must come from [`StubDriver::user_data`] on a live driver, and
/// `func_name` must be a valid C string.
pub unsafe extern "C" fn get_instance_proc(
    func_name: *const c_char,
    user_data: *const c_void,
) -> *const c_void {
    let driver = &*user_data.cast::<StubDriver>();
    proc_addr::to_raw(driver.resolve_instance(CStr::from_ptr(func_name)))
}

unsafe extern "system" fn get_device_proc_addr(
    device: vk::Device,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    let driver = &*(device.as_raw() as *const StubDriver);
    driver.resolve_device(CStr::from_ptr(p_name))
}
