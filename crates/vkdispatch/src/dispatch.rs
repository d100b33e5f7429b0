//! Owned handles paired with their dispatch tables.
//!
//! The raw tables leave lifetimes to the caller. The types here hold an `Arc`
//! to the tier they were built from, so the library outlives every instance
//! and every instance outlives its devices.

use crate::device::DeviceTable;
use crate::error::{LoaderError, Result};
use crate::instance::InstanceTable;
use crate::library::Library;
use ash::vk;
use std::ptr;
use std::sync::Arc;

/// A Vulkan instance together with its dispatch table.
pub struct InstanceDispatch {
    library: Arc<Library>,
    handle: vk::Instance,
    table: InstanceTable,
    owned: bool,
}

impl InstanceDispatch {
    /// Create an instance through the library and resolve its table.
    ///
    /// The instance is destroyed when the last reference is dropped.
    ///
    /// # Safety
    /// `create_info` and everything it points to must be valid for
    /// `vkCreateInstance`.
    pub unsafe fn create(
        library: Arc<Library>,
        create_info: &vk::InstanceCreateInfo<'_>,
    ) -> Result<Arc<Self>> {
        let mut handle = vk::Instance::null();
        (library.vkCreateInstance)(create_info, ptr::null(), &mut handle).result()?;

        let table = InstanceTable::load(&library, handle);
        tracing::debug!(
            "Created Vulkan instance ({} instance functions)",
            table.resolved_count()
        );

        Ok(Arc::new(Self {
            library,
            handle,
            table,
            owned: true,
        }))
    }

    /// Wrap an instance created elsewhere. It is not destroyed on drop.
    ///
    /// # Safety
    /// `handle` must be a live instance created from `library`, and must stay
    /// alive for as long as the returned value.
    pub unsafe fn adopt(library: Arc<Library>, handle: vk::Instance) -> Arc<Self> {
        let table = InstanceTable::load(&library, handle);
        Arc::new(Self {
            library,
            handle,
            table,
            owned: false,
        })
    }

    /// Get the instance handle.
    pub fn handle(&self) -> vk::Instance {
        self.handle
    }

    /// Get the instance dispatch table.
    pub fn table(&self) -> &InstanceTable {
        &self.table
    }

    /// Get the library this instance was created from.
    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }

    /// Enumerate the physical devices visible to this instance.
    pub fn enumerate_physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>> {
        let enumerate = self.table.vkEnumeratePhysicalDevices.ok_or_else(|| {
            LoaderError::FunctionUnavailable("vkEnumeratePhysicalDevices".to_string())
        })?;

        loop {
            let mut count = 0u32;
            // SAFETY: the handle is alive for as long as `self`.
            unsafe { enumerate(self.handle, &mut count, ptr::null_mut()) }.result()?;

            let mut devices = vec![vk::PhysicalDevice::null(); count as usize];
            let result = unsafe { enumerate(self.handle, &mut count, devices.as_mut_ptr()) };
            if result == vk::Result::INCOMPLETE {
                continue;
            }
            result.result()?;

            devices.truncate(count as usize);
            return Ok(devices);
        }
    }
}

impl std::fmt::Debug for InstanceDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceDispatch")
            .field("handle", &self.handle)
            .field("table", &self.table)
            .field("owned", &self.owned)
            .finish()
    }
}

impl Drop for InstanceDispatch {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        match self.table.vkDestroyInstance {
            // SAFETY: every device holds an `Arc` to this instance, so none
            // are left by the time it is dropped.
            Some(destroy) => unsafe { destroy(self.handle, ptr::null()) },
            None => tracing::warn!("vkDestroyInstance unavailable, leaking instance"),
        }
    }
}

/// A Vulkan device together with its dispatch table.
pub struct DeviceDispatch {
    instance: Arc<InstanceDispatch>,
    physical_device: vk::PhysicalDevice,
    handle: vk::Device,
    table: DeviceTable,
    owned: bool,
}

impl DeviceDispatch {
    /// Create a device on `physical_device` and resolve its table.
    ///
    /// The device is destroyed when the last reference is dropped.
    ///
    /// # Safety
    /// `physical_device` must belong to `instance`, and `create_info` must be
    /// valid for `vkCreateDevice`.
    pub unsafe fn create(
        instance: Arc<InstanceDispatch>,
        physical_device: vk::PhysicalDevice,
        create_info: &vk::DeviceCreateInfo<'_>,
    ) -> Result<Arc<Self>> {
        let create_device = instance
            .table
            .vkCreateDevice
            .ok_or_else(|| LoaderError::FunctionUnavailable("vkCreateDevice".to_string()))?;

        // Check the hinge before creating anything, so a failure leaks nothing.
        if instance.table.vkGetDeviceProcAddr.is_none() {
            return Err(LoaderError::Precondition(
                "instance table has no vkGetDeviceProcAddr, cannot build a device table"
                    .to_string(),
            ));
        }

        let mut handle = vk::Device::null();
        create_device(physical_device, create_info, ptr::null(), &mut handle).result()?;

        let table = DeviceTable::new(&instance.table, handle);
        tracing::debug!(
            "Created Vulkan device ({} device functions)",
            table.resolved_count()
        );

        Ok(Arc::new(Self {
            instance,
            physical_device,
            handle,
            table,
            owned: true,
        }))
    }

    /// Wrap a device created elsewhere. It is not destroyed on drop.
    ///
    /// # Safety
    /// `handle` must be a live device created on `physical_device` through
    /// `instance`, and must stay alive for as long as the returned value.
    pub unsafe fn adopt(
        instance: Arc<InstanceDispatch>,
        physical_device: vk::PhysicalDevice,
        handle: vk::Device,
    ) -> Result<Arc<Self>> {
        let table = DeviceTable::try_new(&instance.table, handle)?;
        Ok(Arc::new(Self {
            instance,
            physical_device,
            handle,
            table,
            owned: false,
        }))
    }

    /// Get the device handle.
    pub fn handle(&self) -> vk::Device {
        self.handle
    }

    /// Get the physical device this device was created on.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get the device dispatch table.
    pub fn table(&self) -> &DeviceTable {
        &self.table
    }

    /// Get the instance this device was created from.
    pub fn instance(&self) -> &Arc<InstanceDispatch> {
        &self.instance
    }
}

impl std::fmt::Debug for DeviceDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceDispatch")
            .field("handle", &self.handle)
            .field("table", &self.table)
            .field("owned", &self.owned)
            .finish()
    }
}

impl Drop for DeviceDispatch {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        match self.table.vkDestroyDevice {
            Some(destroy) => unsafe { destroy(self.handle, ptr::null()) },
            None => tracing::warn!("vkDestroyDevice unavailable, leaking device"),
        }
    }
}
