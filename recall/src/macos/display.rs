use std::ffi::c_void;

use core_foundation::{base::TCFType, string::CFString};
use core_foundation_sys::base::{kCFAllocatorDefault, CFAllocatorRef, CFRelease};
use core_foundation_sys::string::CFStringRef;
use core_graphics::display::{CGDirectDisplayID, CGDisplayBounds, CGMainDisplayID};

use crate::platform::{Bounds, DisplayId, DisplayInfo};

type CFUUIDRef = *const c_void;

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn CGDisplayCreateUUIDFromDisplayID(display: CGDirectDisplayID) -> CFUUIDRef;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFUUIDCreateString(alloc: CFAllocatorRef, uuid: CFUUIDRef) -> CFStringRef;
}

/// All active displays with their bounds in global coordinates (top-left origin),
/// the same space Accessibility reports window positions in.
pub fn get_all_displays() -> Vec<DisplayInfo> {
    let main_display_id = unsafe { CGMainDisplayID() };

    get_active_display_ids()
        .into_iter()
        .map(|display_id| DisplayInfo {
            id: display_id,
            uuid: display_uuid(display_id),
            frame: get_display_bounds(display_id),
            is_main: display_id == main_display_id,
        })
        .collect()
}

/// Get active display IDs using Core Graphics directly.
/// Unlike NSScreen::screens(), this doesn't depend on NSApplication's event loop.
pub fn get_active_display_ids() -> Vec<DisplayId> {
    use core_graphics::display::CGGetActiveDisplayList;

    const MAX_DISPLAYS: u32 = 16;
    let mut display_ids: [u32; 16] = [0; 16];
    let mut display_count: u32 = 0;

    let result = unsafe {
        CGGetActiveDisplayList(MAX_DISPLAYS, display_ids.as_mut_ptr(), &mut display_count)
    };

    if result != 0 {
        tracing::warn!("CGGetActiveDisplayList failed: {}", result);
        return Vec::new();
    }

    display_ids[..display_count as usize].to_vec()
}

fn get_display_bounds(display_id: DisplayId) -> Bounds {
    let rect = unsafe { CGDisplayBounds(display_id) };
    Bounds {
        x: rect.origin.x,
        y: rect.origin.y,
        width: rect.size.width,
        height: rect.size.height,
    }
}

/// Stable per-monitor UUID string, survives reboots and reconnects.
fn display_uuid(display_id: DisplayId) -> Option<String> {
    unsafe {
        let uuid = CGDisplayCreateUUIDFromDisplayID(display_id);
        if uuid.is_null() {
            tracing::debug!("No UUID for display {}", display_id);
            return None;
        }
        let raw = CFUUIDCreateString(kCFAllocatorDefault, uuid);
        CFRelease(uuid);
        if raw.is_null() {
            return None;
        }
        Some(CFString::wrap_under_create_rule(raw).to_string())
    }
}
