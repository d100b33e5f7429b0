//! Function pointer plumbing shared by every tier.
//!
//! All generic-to-typed reinterpretation goes through [`cast_fn`]. The
//! tables never transmute on their own, so this module is the single place
//! where a resolved address is trusted to match the signature of its slot.

use ash::vk;
use std::ffi::{c_char, c_void, CStr};
use std::mem;
use std::ptr;

/// Untyped entry point as returned by the proc-address queries.
pub type VoidFunction = unsafe extern "system" fn();

/// Callback used to resolve instance-level symbols.
///
/// Receives the nul-terminated symbol name and the caller's opaque token and
/// returns the entry point, or null when the symbol is not provided.
pub type GetInstanceProcFn =
    unsafe extern "C" fn(func_name: *const c_char, user_data: *const c_void) -> *const c_void;

/// Reinterpret an untyped entry point as the signature `F`.
///
/// The address is carried over bit for bit.
///
/// # Safety
/// `F` must be a function pointer type, and `proc` must point to a function
/// with exactly that signature. The tables uphold this by pairing every symbol
/// name with its `ash::vk` PFN type at compile time.
pub unsafe fn cast_fn<F: Copy>(proc: VoidFunction) -> F {
    assert_eq!(
        mem::size_of::<F>(),
        mem::size_of::<VoidFunction>(),
        "dispatch slots must be function pointers"
    );
    mem::transmute_copy::<VoidFunction, F>(&proc)
}

/// [`cast_fn`] for an optional entry point; `None` stays `None`.
///
/// # Safety
/// Same as [`cast_fn`] whenever `proc` is `Some`.
pub unsafe fn cast_proc<F: Copy>(proc: vk::PFN_vkVoidFunction) -> Option<F> {
    proc.map(|f| cast_fn(f))
}

/// Erase a typed entry point so it can be handed out by a proc-address query.
pub fn erase_proc<F: Copy>(f: F) -> VoidFunction {
    assert_eq!(
        mem::size_of::<F>(),
        mem::size_of::<VoidFunction>(),
        "only function pointers can be erased"
    );
    // SAFETY: same size, and the result is only ever called after being cast
    // back to `F` by `cast_proc`.
    unsafe { mem::transmute_copy::<F, VoidFunction>(&f) }
}

/// Convert the raw pointer returned by a [`GetInstanceProcFn`].
///
/// # Safety
/// `raw` must be null or the address of a function.
pub unsafe fn from_raw(raw: *const c_void) -> vk::PFN_vkVoidFunction {
    if raw.is_null() {
        None
    } else {
        Some(mem::transmute::<*const c_void, VoidFunction>(raw))
    }
}

/// Convert an entry point to the raw pointer form of a [`GetInstanceProcFn`].
pub fn to_raw(proc: vk::PFN_vkVoidFunction) -> *const c_void {
    proc.map_or(ptr::null(), |f| f as *const c_void)
}

/// Build a `&'static CStr` from a nul-terminated byte string at compile time.
pub(crate) const fn symbol(bytes: &'static [u8]) -> &'static CStr {
    match CStr::from_bytes_with_nul(bytes) {
        Ok(name) => name,
        Err(_) => panic!("symbol names must contain a single trailing nul"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe extern "system" fn queue_wait_idle(_queue: vk::Queue) -> vk::Result {
        vk::Result::ERROR_DEVICE_LOST
    }

    #[test]
    fn cast_keeps_absent_slots_absent() {
        let slot: Option<vk::PFN_vkQueueWaitIdle> = unsafe { cast_proc(None) };
        assert!(slot.is_none());
    }

    #[test]
    fn erase_then_cast_calls_through() {
        let erased = erase_proc(queue_wait_idle as vk::PFN_vkQueueWaitIdle);
        let typed: vk::PFN_vkQueueWaitIdle = unsafe { cast_proc(Some(erased)) }.unwrap();
        let result = unsafe { typed(vk::Queue::null()) };
        assert_eq!(result, vk::Result::ERROR_DEVICE_LOST);
    }

    #[test]
    fn raw_null_is_absent() {
        assert!(unsafe { from_raw(ptr::null()) }.is_none());
        assert!(to_raw(None).is_null());
    }

    #[test]
    fn raw_address_survives_conversion() {
        let erased = erase_proc(queue_wait_idle as vk::PFN_vkQueueWaitIdle);
        let raw = to_raw(Some(erased));
        assert!(!raw.is_null());
        let back = unsafe { from_raw(raw) }.unwrap();
        assert_eq!(back as usize, erased as usize);
    }

    #[test]
    fn symbol_from_literal() {
        const NAME: &CStr = symbol(b"vkQueueWaitIdle\0");
        assert_eq!(NAME.to_bytes(), b"vkQueueWaitIdle");
    }
}
