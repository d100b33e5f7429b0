//! Headless stand-in for the Vulkan loader.
//!
//! Behaves like a Vulkan implementation with no physical devices. Every entry
//! point is a static function in this crate, so addresses are stable for the
//! lifetime of the process and nothing needs to be unloaded.

use crate::proc_addr::erase_proc;
use ash::vk::{self, Handle};
use std::ffi::{c_char, CStr};

/// Backing storage for the handle returned by the fake `vkCreateInstance`.
static FAKE_INSTANCE: u8 = 0;

/// The instance handle handed out by the fake `vkCreateInstance`.
pub(crate) fn instance_handle() -> vk::Instance {
    vk::Instance::from_raw(std::ptr::addr_of!(FAKE_INSTANCE) as u64)
}

/// Resolve a global command, as `vkGetInstanceProcAddr(NULL, name)` would.
pub(crate) fn lookup_global(name: &CStr) -> vk::PFN_vkVoidFunction {
    let proc = match name.to_bytes() {
        b"vkGetInstanceProcAddr" => {
            erase_proc(get_instance_proc_addr as vk::PFN_vkGetInstanceProcAddr)
        }
        b"vkCreateInstance" => erase_proc(create_instance as vk::PFN_vkCreateInstance),
        b"vkEnumerateInstanceExtensionProperties" => erase_proc(
            enumerate_instance_extension_properties
                as vk::PFN_vkEnumerateInstanceExtensionProperties,
        ),
        _ => return None,
    };
    Some(proc)
}

fn lookup_instance(name: &CStr) -> vk::PFN_vkVoidFunction {
    let proc = match name.to_bytes() {
        b"vkDestroyInstance" => erase_proc(destroy_instance as vk::PFN_vkDestroyInstance),
        b"vkEnumeratePhysicalDevices" => {
            erase_proc(enumerate_physical_devices as vk::PFN_vkEnumeratePhysicalDevices)
        }
        b"vkGetDeviceProcAddr" => erase_proc(get_device_proc_addr as vk::PFN_vkGetDeviceProcAddr),
        b"vkCreateDevice" => erase_proc(create_device as vk::PFN_vkCreateDevice),
        _ => return lookup_global(name),
    };
    Some(proc)
}

unsafe extern "system" fn get_instance_proc_addr(
    instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    if p_name.is_null() {
        return None;
    }
    let name = CStr::from_ptr(p_name);
    if instance == vk::Instance::null() {
        lookup_global(name)
    } else {
        lookup_instance(name)
    }
}

unsafe extern "system" fn create_instance(
    _p_create_info: *const vk::InstanceCreateInfo<'_>,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
    p_instance: *mut vk::Instance,
) -> vk::Result {
    if p_instance.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    *p_instance = instance_handle();
    vk::Result::SUCCESS
}

unsafe extern "system" fn enumerate_instance_extension_properties(
    _p_layer_name: *const c_char,
    p_property_count: *mut u32,
    _p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    if !p_property_count.is_null() {
        *p_property_count = 0;
    }
    vk::Result::SUCCESS
}

unsafe extern "system" fn destroy_instance(
    _instance: vk::Instance,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
) {
}

unsafe extern "system" fn enumerate_physical_devices(
    _instance: vk::Instance,
    p_physical_device_count: *mut u32,
    _p_physical_devices: *mut vk::PhysicalDevice,
) -> vk::Result {
    if !p_physical_device_count.is_null() {
        *p_physical_device_count = 0;
    }
    vk::Result::SUCCESS
}

unsafe extern "system" fn create_device(
    _physical_device: vk::PhysicalDevice,
    _p_create_info: *const vk::DeviceCreateInfo<'_>,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
    _p_device: *mut vk::Device,
) -> vk::Result {
    vk::Result::ERROR_INITIALIZATION_FAILED
}

unsafe extern "system" fn get_device_proc_addr(
    _device: vk::Device,
    _p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    None
}
