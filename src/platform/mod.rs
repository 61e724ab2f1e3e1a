use std::path::Path;
use std::time::Duration;

use crate::error::{OrganizerError, Result};
use crate::geometry::{Rect, ScreenSize};

#[cfg(windows)]
mod win32;
#[cfg(not(windows))]
mod x11;

/// Opaque identifier of a top-level window. Only valid while the window lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    pub title: String,
    pub rect: Rect,
}

impl std::fmt::Display for WindowInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Rect {
            x,
            y,
            width,
            height,
        } = self.rect;
        write!(f, "Window '{}' @ X:{x}, Y:{y}, W:{width}, H:{height}", self.title)
    }
}

/// What the organizer needs from the windowing system.
pub trait Desktop: Sync {
    fn name(&self) -> &'static str;

    /// All top-level windows in the order the system reports them.
    fn list_windows(&self) -> Result<Vec<WindowInfo>>;

    fn primary_screen_size(&self) -> Result<ScreenSize>;

    fn move_window(&self, handle: WindowHandle, rect: Rect) -> Result<()>;

    /// Starts the program detached; does not wait for it to exit.
    fn spawn(&self, path: &Path) -> Result<()> {
        std::process::Command::new(path)
            .spawn()
            .map(|child| log::debug!("Spawned {} as pid {}", path.display(), child.id()))
            .map_err(|source| OrganizerError::Launch {
                path: path.to_path_buf(),
                source,
            })
    }

    fn wait(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Connects to the windowing system of the current platform.
pub fn native() -> Result<Box<dyn Desktop>> {
    #[cfg(windows)]
    let desktop = win32::Win32Desktop::new()?;
    #[cfg(not(windows))]
    let desktop = x11::X11Desktop::connect()?;

    log::debug!("Using {} desktop backend", desktop.name());
    Ok(Box::new(desktop))
}
