//! Instance-level dispatch table.

use crate::library::Library;
use crate::proc_addr::{self, GetInstanceProcFn};
use crate::table::dispatch_table;
use ash::vk;
use std::ffi::{c_char, c_void};

dispatch_table! {
    /// Entry points resolved through `vkGetInstanceProcAddr` for one instance.
    ///
    /// Core entry points such as `vkCreateDevice` are expected to be present on
    /// any conforming implementation; extension queries such as
    /// `vkGetPhysicalDeviceCooperativeMatrixPropertiesKHR` are often absent.
    /// The table records what was resolved and leaves the checking to callers.
    pub struct InstanceTable {
        vkCreateDevice: vk::PFN_vkCreateDevice,
        vkDestroyInstance: vk::PFN_vkDestroyInstance,
        vkEnumerateDeviceExtensionProperties: vk::PFN_vkEnumerateDeviceExtensionProperties,
        vkEnumeratePhysicalDevices: vk::PFN_vkEnumeratePhysicalDevices,
        vkGetDeviceProcAddr: vk::PFN_vkGetDeviceProcAddr,
        vkGetPhysicalDeviceFeatures: vk::PFN_vkGetPhysicalDeviceFeatures,
        vkGetPhysicalDeviceFeatures2KHR: vk::PFN_vkGetPhysicalDeviceFeatures2,
        vkGetPhysicalDeviceFormatProperties: vk::PFN_vkGetPhysicalDeviceFormatProperties,
        vkGetPhysicalDeviceMemoryProperties: vk::PFN_vkGetPhysicalDeviceMemoryProperties,
        vkGetPhysicalDeviceProperties: vk::PFN_vkGetPhysicalDeviceProperties,
        vkGetPhysicalDeviceProperties2: vk::PFN_vkGetPhysicalDeviceProperties2,
        vkGetPhysicalDeviceQueueFamilyProperties: vk::PFN_vkGetPhysicalDeviceQueueFamilyProperties,
        vkGetPhysicalDeviceCooperativeMatrixPropertiesKHR:
            vk::PFN_vkGetPhysicalDeviceCooperativeMatrixPropertiesKHR,
    }
}

impl InstanceTable {
    /// Resolve every instance-level symbol through `get_instance_proc`.
    ///
    /// `user_data` is passed through untouched on every call.
    ///
    /// # Safety
    /// `get_instance_proc` must be safe to call with `user_data`, and for each
    /// name must return null or an entry point with the matching Vulkan
    /// signature. Whatever backs the returned pointers must stay loaded for as
    /// long as the table is used.
    pub unsafe fn new(get_instance_proc: GetInstanceProcFn, user_data: *const c_void) -> Self {
        Self::resolve_with(|name| proc_addr::from_raw(get_instance_proc(name.as_ptr(), user_data)))
    }

    /// Resolve the table for `instance` through the library's
    /// `vkGetInstanceProcAddr`.
    ///
    /// # Safety
    /// `instance` must be null or a live instance created from `library`, and
    /// `library` must outlive every call made through the table.
    pub unsafe fn load(library: &Library, instance: vk::Instance) -> Self {
        let context = InstanceProcContext {
            get_instance_proc_addr: library.vkGetInstanceProcAddr,
            instance,
        };
        Self::new(
            get_instance_proc_trampoline,
            std::ptr::addr_of!(context).cast(),
        )
    }
}

/// User data for [`get_instance_proc_trampoline`].
struct InstanceProcContext {
    get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    instance: vk::Instance,
}

unsafe extern "C" fn get_instance_proc_trampoline(
    func_name: *const c_char,
    user_data: *const c_void,
) -> *const c_void {
    let context = &*user_data.cast::<InstanceProcContext>();
    proc_addr::to_raw((context.get_instance_proc_addr)(context.instance, func_name))
}
