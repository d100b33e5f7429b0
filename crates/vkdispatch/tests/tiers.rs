//! End-to-end checks across the three dispatch tiers.

use std::ffi::CString;
use std::sync::Arc;
use vkdispatch::vk;
use vkdispatch::{
    DeviceDispatch, DeviceTable, InstanceDispatch, InstanceTable, Library, LibraryBuilder,
    LoaderError,
};
use vkdispatch_test::{get_instance_proc, sentinel_address, StubDriver};

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn tables_are_shareable() {
    assert_send_sync::<Library>();
    assert_send_sync::<InstanceTable>();
    assert_send_sync::<DeviceTable>();
    assert_send_sync::<InstanceDispatch>();
    assert_send_sync::<DeviceDispatch>();
}

#[test]
fn only_known_symbol_is_present() {
    let driver = StubDriver::new().with_instance_symbols([c"vkGetPhysicalDeviceProperties"]);
    let table = driver.instance_table();

    assert_eq!(table.present(), vec![c"vkGetPhysicalDeviceProperties"]);
    assert_eq!(
        table.vkGetPhysicalDeviceProperties.map(|f| f as *const std::ffi::c_void),
        Some(sentinel_address())
    );
}

#[test]
fn user_data_is_passed_through() {
    let driver = StubDriver::new();
    let _ = unsafe { InstanceTable::new(get_instance_proc, driver.user_data()) };

    let queried: Vec<_> = driver.instance_queries();
    let expected: Vec<CString> = InstanceTable::SYMBOLS.iter().map(|s| CString::from(*s)).collect();
    assert_eq!(queried, expected);
}

#[test]
fn instance_table_is_deterministic() {
    let driver = StubDriver::new().with_instance_symbols([
        c"vkCreateDevice",
        c"vkEnumeratePhysicalDevices",
        c"vkGetPhysicalDeviceCooperativeMatrixPropertiesKHR",
    ]);

    let first = driver.instance_table();
    let second = driver.instance_table();
    assert_eq!(first.presence(), second.presence());
    assert_eq!(first.resolved_count(), 3);
}

#[test]
fn device_table_requires_hinge() {
    let driver = StubDriver::complete();
    let instance = unsafe {
        InstanceTable::resolve_with(|name| {
            if name == c"vkGetDeviceProcAddr" {
                None
            } else {
                vkdispatch::proc_addr::from_raw(get_instance_proc(name.as_ptr(), driver.user_data()))
            }
        })
    };
    assert!(instance.vkGetDeviceProcAddr.is_none());

    let device = driver.device_handle();
    let result = unsafe { DeviceTable::try_new(&instance, device) };
    assert!(matches!(result, Err(LoaderError::Precondition(_))));
    assert!(driver.device_queries().is_empty());

    let panicked = std::panic::catch_unwind(|| unsafe { DeviceTable::new(&instance, device) });
    assert!(panicked.is_err());
}

#[test]
fn device_tables_are_per_device() {
    let first_driver = StubDriver::complete();
    let second_driver = StubDriver::new()
        .with_instance_symbols([c"vkGetDeviceProcAddr"])
        .with_device_symbols([c"vkQueueWaitIdle"]);

    let first = unsafe {
        DeviceTable::new(&first_driver.instance_table(), first_driver.device_handle())
    };
    let second = unsafe {
        DeviceTable::new(&second_driver.instance_table(), second_driver.device_handle())
    };

    assert_eq!(first.resolved_count(), DeviceTable::SYMBOLS.len());
    assert_eq!(second.present(), vec![c"vkQueueWaitIdle"]);
}

#[test]
fn instance_table_outlives_library() {
    let library = Library::fake();
    let mut handle = vk::Instance::null();
    let create_info = vk::InstanceCreateInfo::default();
    unsafe { (library.vkCreateInstance)(&create_info, std::ptr::null(), &mut handle) }
        .result()
        .unwrap();

    let table = unsafe { InstanceTable::load(&library, handle) };
    drop(library);

    let enumerate = table.vkEnumeratePhysicalDevices.unwrap();
    let mut count = 7u32;
    let result = unsafe { enumerate(handle, &mut count, std::ptr::null_mut()) };
    assert_eq!(result, vk::Result::SUCCESS);
    assert_eq!(count, 0);
}

#[test]
fn tables_share_across_threads() {
    let driver = StubDriver::complete();
    let table = driver.instance_table();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| assert_eq!(table.resolved_count(), InstanceTable::SYMBOLS.len()));
        }
    });
}

#[test]
fn fake_end_to_end() {
    // Headless library with deterministic bootstrap stubs.
    let library = unsafe { LibraryBuilder::new().fake(true).open() }.unwrap();
    let other = Library::fake();
    assert!(library.is_fake());
    assert_eq!(
        library.vkGetInstanceProcAddr as usize,
        other.vkGetInstanceProcAddr as usize
    );
    assert!(library.enumerate_instance_extensions().unwrap().is_empty());

    // Instance tier from a stub that only knows two names.
    let driver = StubDriver::new()
        .with_instance_symbols([c"vkCreateDevice", c"vkGetDeviceProcAddr"])
        .with_device_symbols([c"vkQueueSubmit", c"vkCmdDispatch"]);
    let instance = driver.instance_table();
    insta::assert_debug_snapshot!(instance.present(), @r#"
    [
        "vkCreateDevice",
        "vkGetDeviceProcAddr",
    ]
    "#);

    // Device tier resolves through the stub hinge.
    let device = unsafe { DeviceTable::try_new(&instance, driver.device_handle()) }.unwrap();
    insta::assert_debug_snapshot!(device.present(), @r#"
    [
        "vkCmdDispatch",
        "vkQueueSubmit",
    ]
    "#);
    assert_eq!(driver.device_queries().len(), DeviceTable::SYMBOLS.len());
}

#[test]
fn owned_chain_with_fake_library() {
    let library = Arc::new(Library::fake());
    let create_info = vk::InstanceCreateInfo::default();
    let instance = unsafe { InstanceDispatch::create(library.clone(), &create_info) }.unwrap();

    assert!(Arc::ptr_eq(instance.library(), &library));
    assert!(instance.table().is_present(c"vkGetDeviceProcAddr"));
    assert!(instance.enumerate_physical_devices().unwrap().is_empty());

    // The fake resolves no device functions at all.
    let device = unsafe {
        DeviceDispatch::adopt(instance.clone(), vk::PhysicalDevice::null(), vk::Device::null())
    }
    .unwrap();
    assert_eq!(device.table().missing().len(), DeviceTable::SYMBOLS.len());

    drop(instance);
    drop(library);
    assert_eq!(Arc::strong_count(device.instance().library()), 1);
}
