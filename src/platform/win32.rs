use windows::Win32::UI::HiDpi::{
    DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2, SetProcessDpiAwarenessContext,
};
use winsafe::{prelude::*, *};

use super::{Desktop, WindowHandle, WindowInfo};
use crate::error::{OrganizerError, Result};
use crate::geometry::{Rect, ScreenSize};

pub struct Win32Desktop;

impl Win32Desktop {
    pub fn new() -> Result<Self> {
        // Without DPI awareness scaled displays report logical, not physical, pixels.
        if let Err(err) =
            unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) }
        {
            log::debug!("Per-monitor DPI awareness unavailable ({err}), using system DPI awareness");
            if IsWindowsVistaOrGreater().map_err(|e| OrganizerError::platform("query version", e))? {
                SetProcessDPIAware().map_err(|e| OrganizerError::platform("set DPI awareness", e))?;
            }
        }
        Ok(Self)
    }
}

fn handle_of(hwnd: &HWND) -> WindowHandle {
    WindowHandle(hwnd.ptr() as usize as u64)
}

fn hwnd_of(handle: WindowHandle) -> HWND {
    unsafe { HWND::from_ptr(handle.0 as usize as _) }
}

impl Desktop for Win32Desktop {
    fn name(&self) -> &'static str {
        "win32"
    }

    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let mut windows = Vec::new();
        EnumWindows(|hwnd: HWND| -> bool {
            let title = hwnd.GetWindowText().unwrap_or_default();
            match hwnd.GetWindowRect() {
                Ok(rc) => windows.push(WindowInfo {
                    handle: handle_of(&hwnd),
                    title,
                    rect: Rect {
                        x: rc.left,
                        y: rc.top,
                        width: rc.right - rc.left,
                        height: rc.bottom - rc.top,
                    },
                }),
                Err(err) => log::debug!("Skipping window {:#?}: {err}", hwnd),
            }
            true // keep enumerating
        })
        .map_err(|err| OrganizerError::platform("enumerate windows", err))?;

        Ok(windows)
    }

    fn primary_screen_size(&self) -> Result<ScreenSize> {
        let width = GetSystemMetrics(co::SM::CXSCREEN);
        let height = GetSystemMetrics(co::SM::CYSCREEN);
        if width == 0 || height == 0 {
            return Err(OrganizerError::platform(
                "query screen size",
                "GetSystemMetrics returned 0",
            ));
        }
        Ok(ScreenSize { width, height })
    }

    fn move_window(&self, handle: WindowHandle, rect: Rect) -> Result<()> {
        let hwnd = hwnd_of(handle);
        if !hwnd.IsWindow() {
            return Err(OrganizerError::platform(
                "move window",
                format!("window {handle} no longer exists"),
            ));
        }

        hwnd.SetWindowPos(
            HwndPlace::Place(co::HWND_PLACE::default()),
            POINT {
                x: rect.x,
                y: rect.y,
            },
            SIZE {
                cx: rect.width,
                cy: rect.height,
            },
            co::SWP::NOACTIVATE | co::SWP::NOZORDER,
        )
        .map_err(|err| OrganizerError::platform("move window", err))
    }
}
