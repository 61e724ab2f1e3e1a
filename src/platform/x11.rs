use x11rb::connection::Connection;
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::xproto::{Atom, AtomEnum, ConfigureWindowAux, ConnectionExt as _, Window};
use x11rb::rust_connection::RustConnection;

use super::{Desktop, WindowHandle, WindowInfo};
use crate::error::{OrganizerError, Result};
use crate::geometry::{Rect, ScreenSize};

struct Atoms {
    net_client_list: Atom,
    net_wm_name: Atom,
    utf8_string: Atom,
}

/// EWMH desktop: windows come from the window manager's `_NET_CLIENT_LIST`.
pub struct X11Desktop {
    conn: RustConnection,
    root: Window,
    screen: ScreenSize,
    atoms: Atoms,
}

impl X11Desktop {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(|e| OrganizerError::platform("connect to X server", e))?;

        let screen = conn.setup().roots.get(screen_num).ok_or_else(|| {
            OrganizerError::platform("connect to X server", format!("no screen {screen_num}"))
        })?;
        let root = screen.root;
        let root_size = ScreenSize {
            width: i32::from(screen.width_in_pixels),
            height: i32::from(screen.height_in_pixels),
        };
        let size = choose_screen(primary_output_size(&conn, root), root_size);

        let atoms = Atoms {
            net_client_list: intern(&conn, b"_NET_CLIENT_LIST")?,
            net_wm_name: intern(&conn, b"_NET_WM_NAME")?,
            utf8_string: intern(&conn, b"UTF8_STRING")?,
        };

        Ok(Self {
            conn,
            root,
            screen: size,
            atoms,
        })
    }

    fn client_list(&self) -> Result<Vec<Window>> {
        let reply = self
            .conn
            .get_property(false, self.root, self.atoms.net_client_list, AtomEnum::WINDOW, 0, u32::MAX)
            .map_err(|e| OrganizerError::platform("enumerate windows", e))?
            .reply()
            .map_err(|e| OrganizerError::platform("enumerate windows", e))?;

        reply.value32().map(|ids| ids.collect()).ok_or_else(|| {
            OrganizerError::platform(
                "enumerate windows",
                "window manager does not publish _NET_CLIENT_LIST",
            )
        })
    }

    fn title(&self, window: Window) -> Result<String> {
        let utf8 = self.text_property(window, self.atoms.net_wm_name, self.atoms.utf8_string)?;
        if !utf8.is_empty() {
            return Ok(utf8);
        }
        self.text_property(window, AtomEnum::WM_NAME.into(), AtomEnum::STRING.into())
    }

    fn text_property(&self, window: Window, property: Atom, kind: Atom) -> Result<String> {
        let reply = self
            .conn
            .get_property(false, window, property, kind, 0, u32::MAX)
            .map_err(|e| OrganizerError::platform("read window title", e))?
            .reply()
            .map_err(|e| OrganizerError::platform("read window title", e))?;
        Ok(String::from_utf8_lossy(&reply.value).into_owned())
    }

    fn frame(&self, window: Window) -> Result<Rect> {
        let geometry = self
            .conn
            .get_geometry(window)
            .map_err(|e| OrganizerError::platform("read window geometry", e))?
            .reply()
            .map_err(|e| OrganizerError::platform("read window geometry", e))?;
        let origin = self
            .conn
            .translate_coordinates(window, self.root, 0, 0)
            .map_err(|e| OrganizerError::platform("read window geometry", e))?
            .reply()
            .map_err(|e| OrganizerError::platform("read window geometry", e))?;

        Ok(Rect {
            x: i32::from(origin.dst_x),
            y: i32::from(origin.dst_y),
            width: i32::from(geometry.width),
            height: i32::from(geometry.height),
        })
    }
}

/// Size of the CRTC driving the RandR primary output, if there is one.
fn primary_output_size(conn: &RustConnection, root: Window) -> Option<ScreenSize> {
    let primary = conn.randr_get_output_primary(root).ok()?.reply().ok()?.output;
    if primary == x11rb::NONE {
        return None;
    }
    let output = conn
        .randr_get_output_info(primary, x11rb::CURRENT_TIME)
        .ok()?
        .reply()
        .ok()?;
    if output.crtc == x11rb::NONE {
        return None;
    }
    let crtc = conn
        .randr_get_crtc_info(output.crtc, x11rb::CURRENT_TIME)
        .ok()?
        .reply()
        .ok()?;
    Some(ScreenSize {
        width: i32::from(crtc.width),
        height: i32::from(crtc.height),
    })
}

/// The primary output when RandR reports a usable one, the whole root window otherwise.
fn choose_screen(primary: Option<ScreenSize>, root: ScreenSize) -> ScreenSize {
    match primary {
        Some(size) if size.width > 0 && size.height > 0 => size,
        _ => {
            log::debug!(
                "No RandR primary output, using root window size {}x{}",
                root.width,
                root.height
            );
            root
        }
    }
}

fn intern(conn: &RustConnection, name: &[u8]) -> Result<Atom> {
    Ok(conn
        .intern_atom(false, name)
        .map_err(|e| OrganizerError::platform("intern atom", e))?
        .reply()
        .map_err(|e| OrganizerError::platform("intern atom", e))?
        .atom)
}

impl Desktop for X11Desktop {
    fn name(&self) -> &'static str {
        "x11"
    }

    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let mut windows = Vec::new();
        for window in self.client_list()? {
            // Clients can vanish between listing and querying them.
            let info = self.title(window).and_then(|title| {
                Ok(WindowInfo {
                    handle: WindowHandle(u64::from(window)),
                    title,
                    rect: self.frame(window)?,
                })
            });
            match info {
                Ok(info) => windows.push(info),
                Err(err) => log::debug!("Skipping window {window:#x}: {err}"),
            }
        }
        Ok(windows)
    }

    fn primary_screen_size(&self) -> Result<ScreenSize> {
        Ok(self.screen)
    }

    fn move_window(&self, handle: WindowHandle, rect: Rect) -> Result<()> {
        let window = Window::try_from(handle.0).map_err(|_| {
            OrganizerError::platform("move window", format!("{handle} is not an X11 window id"))
        })?;
        let aux = ConfigureWindowAux::new()
            .x(rect.x)
            .y(rect.y)
            .width(u32::try_from(rect.width).unwrap_or(1).max(1))
            .height(u32::try_from(rect.height).unwrap_or(1).max(1));

        self.conn
            .configure_window(window, &aux)
            .map_err(|e| OrganizerError::platform("move window", e))?;
        self.conn
            .flush()
            .map_err(|e| OrganizerError::platform("move window", e))
    }
}
