//! Device-level dispatch table.
//!
//! Device entry points come from `vkGetDeviceProcAddr` and may be
//! device-specific trampolines, so a [`DeviceTable`] is only valid for the
//! device it was built with. Build a new table for every device.

use crate::error::{LoaderError, Result};
use crate::instance::InstanceTable;
use crate::table::dispatch_table;
use ash::vk;

dispatch_table! {
    /// Entry points resolved through `vkGetDeviceProcAddr` for one device.
    pub struct DeviceTable {
        vkAllocateCommandBuffers: vk::PFN_vkAllocateCommandBuffers,
        vkAllocateDescriptorSets: vk::PFN_vkAllocateDescriptorSets,
        vkAllocateMemory: vk::PFN_vkAllocateMemory,
        vkBeginCommandBuffer: vk::PFN_vkBeginCommandBuffer,
        vkBindBufferMemory: vk::PFN_vkBindBufferMemory,
        vkBindImageMemory: vk::PFN_vkBindImageMemory,
        vkCmdBeginRenderPass: vk::PFN_vkCmdBeginRenderPass,
        vkCmdBindDescriptorSets: vk::PFN_vkCmdBindDescriptorSets,
        vkCmdBindIndexBuffer: vk::PFN_vkCmdBindIndexBuffer,
        vkCmdBindPipeline: vk::PFN_vkCmdBindPipeline,
        vkCmdBindVertexBuffers: vk::PFN_vkCmdBindVertexBuffers,
        vkCmdClearAttachments: vk::PFN_vkCmdClearAttachments,
        vkCmdCopyBufferToImage: vk::PFN_vkCmdCopyBufferToImage,
        vkCmdCopyImageToBuffer: vk::PFN_vkCmdCopyImageToBuffer,
        vkCmdDispatch: vk::PFN_vkCmdDispatch,
        vkCmdDraw: vk::PFN_vkCmdDraw,
        vkCmdDrawIndexed: vk::PFN_vkCmdDrawIndexed,
        vkCmdDrawIndexedIndirect: vk::PFN_vkCmdDrawIndexedIndirect,
        vkCmdEndRenderPass: vk::PFN_vkCmdEndRenderPass,
        vkCmdPipelineBarrier: vk::PFN_vkCmdPipelineBarrier,
        vkCmdPushConstants: vk::PFN_vkCmdPushConstants,
        vkCmdSetScissor: vk::PFN_vkCmdSetScissor,
        vkCmdSetViewport: vk::PFN_vkCmdSetViewport,
        vkCreateBuffer: vk::PFN_vkCreateBuffer,
        vkCreateCommandPool: vk::PFN_vkCreateCommandPool,
        vkCreateComputePipelines: vk::PFN_vkCreateComputePipelines,
        vkCreateDescriptorPool: vk::PFN_vkCreateDescriptorPool,
        vkCreateDescriptorSetLayout: vk::PFN_vkCreateDescriptorSetLayout,
        vkCreateFence: vk::PFN_vkCreateFence,
        vkCreateFramebuffer: vk::PFN_vkCreateFramebuffer,
        vkCreateGraphicsPipelines: vk::PFN_vkCreateGraphicsPipelines,
        vkCreateImage: vk::PFN_vkCreateImage,
        vkCreateImageView: vk::PFN_vkCreateImageView,
        vkCreatePipelineCache: vk::PFN_vkCreatePipelineCache,
        vkCreatePipelineLayout: vk::PFN_vkCreatePipelineLayout,
        vkCreateRenderPass: vk::PFN_vkCreateRenderPass,
        vkCreateSampler: vk::PFN_vkCreateSampler,
        vkCreateSemaphore: vk::PFN_vkCreateSemaphore,
        vkCreateShaderModule: vk::PFN_vkCreateShaderModule,
        vkDestroyBuffer: vk::PFN_vkDestroyBuffer,
        vkDestroyCommandPool: vk::PFN_vkDestroyCommandPool,
        vkDestroyDescriptorPool: vk::PFN_vkDestroyDescriptorPool,
        vkDestroyDescriptorSetLayout: vk::PFN_vkDestroyDescriptorSetLayout,
        vkDestroyDevice: vk::PFN_vkDestroyDevice,
        vkDestroyFence: vk::PFN_vkDestroyFence,
        vkDestroyFramebuffer: vk::PFN_vkDestroyFramebuffer,
        vkDestroyImage: vk::PFN_vkDestroyImage,
        vkDestroyImageView: vk::PFN_vkDestroyImageView,
        vkDestroyPipeline: vk::PFN_vkDestroyPipeline,
        vkDestroyPipelineCache: vk::PFN_vkDestroyPipelineCache,
        vkDestroyPipelineLayout: vk::PFN_vkDestroyPipelineLayout,
        vkDestroyRenderPass: vk::PFN_vkDestroyRenderPass,
        vkDestroySampler: vk::PFN_vkDestroySampler,
        vkDestroySemaphore: vk::PFN_vkDestroySemaphore,
        vkDestroyShaderModule: vk::PFN_vkDestroyShaderModule,
        vkEndCommandBuffer: vk::PFN_vkEndCommandBuffer,
        vkFlushMappedMemoryRanges: vk::PFN_vkFlushMappedMemoryRanges,
        vkFreeCommandBuffers: vk::PFN_vkFreeCommandBuffers,
        vkFreeDescriptorSets: vk::PFN_vkFreeDescriptorSets,
        vkFreeMemory: vk::PFN_vkFreeMemory,
        vkGetBufferMemoryRequirements: vk::PFN_vkGetBufferMemoryRequirements,
        vkGetDeviceQueue: vk::PFN_vkGetDeviceQueue,
        vkGetImageMemoryRequirements: vk::PFN_vkGetImageMemoryRequirements,
        vkGetImageSubresourceLayout: vk::PFN_vkGetImageSubresourceLayout,
        vkInvalidateMappedMemoryRanges: vk::PFN_vkInvalidateMappedMemoryRanges,
        vkMapMemory: vk::PFN_vkMapMemory,
        vkQueueSubmit: vk::PFN_vkQueueSubmit,
        vkQueueWaitIdle: vk::PFN_vkQueueWaitIdle,
        vkResetFences: vk::PFN_vkResetFences,
        vkUnmapMemory: vk::PFN_vkUnmapMemory,
        vkUpdateDescriptorSets: vk::PFN_vkUpdateDescriptorSets,
        vkWaitForFences: vk::PFN_vkWaitForFences,
    }
}

impl DeviceTable {
    /// Resolve every device-level symbol for `device`.
    ///
    /// # Panics
    /// Panics if `instance` has no `vkGetDeviceProcAddr`. Building a device
    /// table from such an instance table is a programming error; use
    /// [`DeviceTable::try_new`] to get it as an error instead.
    ///
    /// # Safety
    /// `device` must be a live device created through `instance`, and the
    /// instance table's backing library must outlive the returned table.
    pub unsafe fn new(instance: &InstanceTable, device: vk::Device) -> Self {
        match Self::try_new(instance, device) {
            Ok(table) => table,
            Err(err) => panic!("{err}"),
        }
    }

    /// Like [`DeviceTable::new`], but reports a missing hinge symbol as
    /// [`LoaderError::Precondition`].
    ///
    /// # Safety
    /// Same as [`DeviceTable::new`].
    pub unsafe fn try_new(instance: &InstanceTable, device: vk::Device) -> Result<Self> {
        let get_device_proc_addr = instance.vkGetDeviceProcAddr.ok_or_else(|| {
            LoaderError::Precondition(
                "instance table has no vkGetDeviceProcAddr, cannot build a device table"
                    .to_string(),
            )
        })?;

        Ok(Self::resolve_with(|name| {
            get_device_proc_addr(device, name.as_ptr())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::Library;
    use crate::proc_addr::erase_proc;
    use std::collections::HashSet;
    use std::ffi::{c_char, CStr};

    unsafe extern "system" fn placeholder() {}

    /// Provides every command-recording entry point and nothing else.
    unsafe extern "system" fn commands_only(
        _device: vk::Device,
        p_name: *const c_char,
    ) -> vk::PFN_vkVoidFunction {
        let name = CStr::from_ptr(p_name);
        if name.to_bytes().starts_with(b"vkCmd") {
            Some(placeholder)
        } else {
            None
        }
    }

    fn instance_with_hinge() -> InstanceTable {
        unsafe {
            InstanceTable::resolve_with(|name| {
                (name == c"vkGetDeviceProcAddr")
                    .then(|| erase_proc(commands_only as vk::PFN_vkGetDeviceProcAddr))
            })
        }
    }

    fn instance_without_hinge() -> InstanceTable {
        unsafe { InstanceTable::resolve_with(|_| None) }
    }

    #[test]
    fn symbols_are_unique() {
        let unique: HashSet<_> = DeviceTable::SYMBOLS.iter().collect();
        assert_eq!(unique.len(), DeviceTable::SYMBOLS.len());
        assert_eq!(DeviceTable::SYMBOLS.len(), 72);
    }

    #[test]
    fn tiers_are_disjoint() {
        let tiers: [&[&CStr]; 3] = [
            &Library::SYMBOLS,
            InstanceTable::SYMBOLS,
            DeviceTable::SYMBOLS,
        ];
        let total: usize = tiers.iter().map(|tier| tier.len()).sum();
        let all: HashSet<_> = tiers.iter().flat_map(|tier| tier.iter()).collect();

        assert_eq!(Library::SYMBOLS.len(), 3);
        assert_eq!(all.len(), total);
    }

    #[test]
    fn resolves_through_hinge() {
        let table = unsafe { DeviceTable::new(&instance_with_hinge(), vk::Device::null()) };

        assert!(table.vkCmdDispatch.is_some());
        assert!(table.vkQueueSubmit.is_none());
        assert!(table
            .present()
            .iter()
            .all(|name| name.to_bytes().starts_with(b"vkCmd")));
        assert_eq!(table.resolved_count(), 17);
    }

    #[test]
    fn missing_hinge_is_precondition_error() {
        let result = unsafe { DeviceTable::try_new(&instance_without_hinge(), vk::Device::null()) };
        assert!(matches!(result, Err(LoaderError::Precondition(_))));
    }

    #[test]
    #[should_panic(expected = "vkGetDeviceProcAddr")]
    fn missing_hinge_panics() {
        let _ = unsafe { DeviceTable::new(&instance_without_hinge(), vk::Device::null()) };
    }
}
