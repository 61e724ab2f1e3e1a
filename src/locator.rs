use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{ProgramSpec, RuntimeConfig};
use crate::error::{OrganizerError, Result};
use crate::geometry::{Rect, resolve_rect};
use crate::platform::{Desktop, WindowHandle};

/// Pause between two searches after a program has been launched.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Where a single program is in the find, launch, retry sequence.
#[derive(Debug)]
pub enum PlacementState {
    NotStarted,
    /// Launched and polling; `attempt` searches have already missed.
    Searching { attempt: u32 },
    Found(WindowHandle),
    LaunchFailed(OrganizerError),
}

#[derive(Debug)]
pub enum Outcome {
    Placed { handle: WindowHandle, rect: Rect },
    Failed(OrganizerError),
}

#[derive(Debug)]
pub struct ProgramReport {
    pub name: String,
    pub outcome: Outcome,
}

impl ProgramReport {
    pub fn placed(&self) -> bool {
        matches!(self.outcome, Outcome::Placed { .. })
    }
}

pub struct Locator<'a> {
    desktop: &'a dyn Desktop,
    config: &'a RuntimeConfig,
}

impl<'a> Locator<'a> {
    pub fn new(desktop: &'a dyn Desktop, config: &'a RuntimeConfig) -> Self {
        Self { desktop, config }
    }

    /// Places every configured program and returns one report per program,
    /// in configuration order.
    pub fn run_all(&self) -> Vec<ProgramReport> {
        if self.config.parallel {
            self.run_parallel()
        } else {
            self.config
                .programs
                .iter()
                .map(|program| self.run_program(program))
                .collect()
        }
    }

    fn run_parallel(&self) -> Vec<ProgramReport> {
        let reports = Mutex::new(Vec::with_capacity(self.config.programs.len()));

        std::thread::scope(|scope| {
            for (index, program) in self.config.programs.iter().enumerate() {
                let reports = &reports;
                scope.spawn(move || {
                    let report = self.run_program(program);
                    reports.lock().push((index, report));
                });
            }
        });

        let mut reports = reports.into_inner();
        reports.sort_by_key(|(index, _)| *index);
        reports.into_iter().map(|(_, report)| report).collect()
    }

    pub fn run_program(&self, program: &ProgramSpec) -> ProgramReport {
        let outcome = match self
            .locate_or_launch(program)
            .and_then(|handle| Ok((handle, self.place(program, handle)?)))
        {
            Ok((handle, rect)) => Outcome::Placed { handle, rect },
            Err(err) => {
                log::error!("[FAIL]: {}: {err}", program.name);
                Outcome::Failed(err)
            }
        };

        ProgramReport {
            name: program.name.clone(),
            outcome,
        }
    }

    /// Returns the handle of the program's window, launching the program and
    /// polling for its window when it is not open yet.
    pub fn locate_or_launch(&self, program: &ProgramSpec) -> Result<WindowHandle> {
        let mut state = PlacementState::NotStarted;
        loop {
            log::debug!("'{}': {:?}", program.name, state);
            state = match state {
                PlacementState::NotStarted => match self.find_window(&program.name)? {
                    Some(handle) => PlacementState::Found(handle),
                    None => match self.launch(program) {
                        Ok(()) => PlacementState::Searching { attempt: 0 },
                        Err(err) => PlacementState::LaunchFailed(err),
                    },
                },
                PlacementState::Searching { attempt } if attempt >= self.config.retry_count => {
                    PlacementState::LaunchFailed(OrganizerError::WindowNotFound {
                        name: program.name.clone(),
                        attempts: attempt,
                    })
                }
                PlacementState::Searching { attempt } => {
                    if attempt > 0 {
                        self.desktop.wait(RETRY_INTERVAL);
                    }
                    match self.find_window(&program.name)? {
                        Some(handle) => PlacementState::Found(handle),
                        None => PlacementState::Searching {
                            attempt: attempt + 1,
                        },
                    }
                }
                PlacementState::Found(handle) => return Ok(handle),
                PlacementState::LaunchFailed(err) => return Err(err),
            };
        }
    }

    /// First window, in enumeration order, whose title contains `name`.
    pub fn find_window(&self, name: &str) -> Result<Option<WindowHandle>> {
        let windows = self.desktop.list_windows()?;
        match windows.iter().find(|window| window.title.contains(name)) {
            Some(window) => {
                log::info!("[ OK ]: Found window '{name}' with ID: {}", window.handle);
                Ok(Some(window.handle))
            }
            None => {
                log::info!("[FAIL]: Could not find window with name '{name}'");
                log::debug!("Searched {} windows", windows.len());
                Ok(None)
            }
        }
    }

    fn launch(&self, program: &ProgramSpec) -> Result<()> {
        log::info!(
            "[INIT]: Start {} from {}",
            program.name,
            program.executable_path.display()
        );
        self.desktop.spawn(&program.executable_path)?;
        if !program.startup_delay.is_zero() {
            self.desktop.wait(program.startup_delay);
        }
        log::info!("[ OK ]: Done");
        Ok(())
    }

    /// Moves the window to the program's configured rectangle. No read-back.
    pub fn place(&self, program: &ProgramSpec, handle: WindowHandle) -> Result<Rect> {
        let screen = self.desktop.primary_screen_size()?;
        let rect = resolve_rect(program.position, program.size, screen);
        log::info!(
            "[INFO]: Set {} to X:{}, Y:{}, W:{}, H:{}",
            program.name,
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );
        self.desktop.move_window(handle, rect)?;
        Ok(rect)
    }
}

/// Lists the windows when asked to, then places every program. A failed
/// listing is only reported.
pub fn arrange(desktop: &dyn Desktop, config: &RuntimeConfig) -> Vec<ProgramReport> {
    if config.list_windows_on_start {
        if let Err(err) = report_windows(desktop) {
            log::error!("[FAIL]: Could not list windows: {err}");
        }
    }
    Locator::new(desktop, config).run_all()
}

/// Logs every top-level window with its geometry. Returns how many were listed.
pub fn report_windows(desktop: &dyn Desktop) -> Result<usize> {
    let windows = desktop.list_windows()?;
    for window in &windows {
        log::info!("[INFO]: {window}");
    }
    Ok(windows.len())
}

/// Logs the end-of-run tally. Returns the number of placed programs.
pub fn summarize(reports: &[ProgramReport]) -> usize {
    let placed = reports.iter().filter(|report| report.placed()).count();
    log::info!("[INFO]: Placed {placed} of {} programs", reports.len());
    for report in reports {
        match &report.outcome {
            Outcome::Placed { handle, rect } => {
                log::debug!("{} placed: window {handle} at {rect:?}", report.name);
            }
            Outcome::Failed(err) => log::info!("[INFO]:   {} not placed ({err})", report.name),
        }
    }
    placed
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    use log::Level;

    use super::*;
    use crate::geometry::{AxisPair, ScreenSize};
    use crate::platform::WindowInfo;
    use crate::test_log;

    enum LaunchBehavior {
        /// The window shows up after `after` further listings have missed it.
        Opens { after: u32, window: WindowInfo },
        Fails,
    }

    #[derive(Default)]
    struct FakeDesktop {
        windows: Mutex<Vec<WindowInfo>>,
        launches: HashMap<PathBuf, LaunchBehavior>,
        pending: Mutex<Vec<(u32, WindowInfo)>>,
        /// How many upcoming listings fail.
        failing_listings: Mutex<u32>,
        list_calls: Mutex<u32>,
        spawned: Mutex<Vec<PathBuf>>,
        moves: Mutex<Vec<(WindowHandle, Rect)>>,
        waits: Mutex<Vec<Duration>>,
    }

    impl FakeDesktop {
        fn with_windows(windows: Vec<WindowInfo>) -> Self {
            Self {
                windows: Mutex::new(windows),
                ..Self::default()
            }
        }
    }

    impl Desktop for FakeDesktop {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn list_windows(&self) -> Result<Vec<WindowInfo>> {
            *self.list_calls.lock() += 1;
            {
                let mut failing = self.failing_listings.lock();
                if *failing > 0 {
                    *failing -= 1;
                    return Err(OrganizerError::platform("enumerate windows", "no display"));
                }
            }

            let mut windows = self.windows.lock();
            self.pending.lock().retain_mut(|(remaining, window)| {
                if *remaining == 0 {
                    windows.push(window.clone());
                    false
                } else {
                    *remaining -= 1;
                    true
                }
            });
            Ok(windows.clone())
        }

        fn primary_screen_size(&self) -> Result<ScreenSize> {
            Ok(ScreenSize {
                width: 1920,
                height: 1080,
            })
        }

        fn move_window(&self, handle: WindowHandle, rect: Rect) -> Result<()> {
            self.moves.lock().push((handle, rect));
            Ok(())
        }

        fn spawn(&self, path: &Path) -> Result<()> {
            self.spawned.lock().push(path.to_path_buf());
            match self.launches.get(path) {
                Some(LaunchBehavior::Opens { after, window }) => {
                    self.pending.lock().push((*after, window.clone()));
                    Ok(())
                }
                Some(LaunchBehavior::Fails) => Err(OrganizerError::Launch {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                }),
                None => Ok(()),
            }
        }

        fn wait(&self, duration: Duration) {
            self.waits.lock().push(duration);
        }
    }

    fn window(handle: u64, title: &str) -> WindowInfo {
        WindowInfo {
            handle: WindowHandle(handle),
            title: title.to_string(),
            rect: Rect::default(),
        }
    }

    fn program(name: &str, path: &str) -> ProgramSpec {
        ProgramSpec {
            name: name.to_string(),
            executable_path: PathBuf::from(path),
            size: AxisPair { x: 0.5, y: 0.5 },
            position: AxisPair { x: 0.5, y: 0.5 },
            startup_delay: Duration::ZERO,
        }
    }

    fn config(retry_count: u32, programs: Vec<ProgramSpec>) -> RuntimeConfig {
        RuntimeConfig {
            retry_count,
            debug_enabled: false,
            list_windows_on_start: false,
            parallel: false,
            programs,
        }
    }

    #[test]
    fn running_program_is_placed_without_spawning() {
        let desktop = FakeDesktop::with_windows(vec![
            window(7, "Downloads"),
            window(1, "Untitled - Notepad"),
        ]);
        let config = config(3, vec![program("Notepad", "notepad.exe")]);

        let reports = Locator::new(&desktop, &config).run_all();

        assert!(desktop.spawned.lock().is_empty());
        assert_eq!(*desktop.list_calls.lock(), 1);
        let expected = Rect {
            x: 960,
            y: 540,
            width: 960,
            height: 540,
        };
        assert_eq!(*desktop.moves.lock(), vec![(WindowHandle(1), expected)]);
        assert!(matches!(
            reports[0].outcome,
            Outcome::Placed { handle: WindowHandle(1), rect } if rect == expected
        ));
    }

    #[test]
    fn first_matching_window_wins() {
        let desktop = FakeDesktop::with_windows(vec![
            window(3, "Terminal - build"),
            window(4, "Terminal - logs"),
        ]);
        let config = config(0, vec![]);

        let found = Locator::new(&desktop, &config).find_window("Terminal").unwrap();

        assert_eq!(found, Some(WindowHandle(3)));
    }

    #[test]
    fn missing_window_fails_after_retries_without_placing() {
        let desktop = FakeDesktop::default();
        let config = config(3, vec![program("Ghost", "ghost.exe")]);

        let reports = Locator::new(&desktop, &config).run_all();

        assert_eq!(*desktop.spawned.lock(), vec![PathBuf::from("ghost.exe")]);
        assert_eq!(*desktop.list_calls.lock(), 4);
        assert_eq!(*desktop.waits.lock(), vec![RETRY_INTERVAL, RETRY_INTERVAL]);
        assert!(desktop.moves.lock().is_empty());
        assert!(matches!(
            &reports[0].outcome,
            Outcome::Failed(OrganizerError::WindowNotFound { name, attempts: 3 }) if name == "Ghost"
        ));
    }

    #[test]
    fn launched_window_is_found_while_retrying() {
        let mut desktop = FakeDesktop::default();
        desktop.launches.insert(
            PathBuf::from("editor.exe"),
            LaunchBehavior::Opens {
                after: 1,
                window: window(9, "main.rs - Editor"),
            },
        );
        let mut editor = program("Editor", "editor.exe");
        editor.startup_delay = Duration::from_secs(2);
        let config = config(5, vec![editor]);

        let reports = Locator::new(&desktop, &config).run_all();

        assert!(reports[0].placed());
        assert_eq!(*desktop.list_calls.lock(), 3);
        assert_eq!(
            *desktop.waits.lock(),
            vec![Duration::from_secs(2), RETRY_INTERVAL]
        );
        assert_eq!(desktop.moves.lock()[0].0, WindowHandle(9));
    }

    #[test]
    fn zero_retries_gives_up_right_after_launch() {
        let desktop = FakeDesktop::default();
        let config = config(0, vec![program("Ghost", "ghost.exe")]);

        let err = Locator::new(&desktop, &config)
            .locate_or_launch(&config.programs[0])
            .unwrap_err();

        assert!(matches!(err, OrganizerError::WindowNotFound { attempts: 0, .. }));
        assert_eq!(*desktop.list_calls.lock(), 1);
        assert_eq!(desktop.spawned.lock().len(), 1);
        assert!(desktop.waits.lock().is_empty());
    }

    #[test]
    fn launch_error_does_not_stop_the_batch() {
        let mut desktop = FakeDesktop::with_windows(vec![window(2, "Calculator")]);
        desktop
            .launches
            .insert(PathBuf::from("broken.exe"), LaunchBehavior::Fails);
        let config = config(
            2,
            vec![program("Broken", "broken.exe"), program("Calculator", "calc.exe")],
        );

        let reports = Locator::new(&desktop, &config).run_all();

        assert!(matches!(
            reports[0].outcome,
            Outcome::Failed(OrganizerError::Launch { .. })
        ));
        assert!(reports[1].placed());
        // No polling after a failed spawn.
        assert_eq!(*desktop.list_calls.lock(), 2);
        assert_eq!(summarize(&reports), 1);
    }

    #[test]
    fn enumeration_failure_is_reported_per_program() {
        let desktop = FakeDesktop {
            failing_listings: Mutex::new(u32::MAX),
            ..FakeDesktop::default()
        };
        let config = config(2, vec![program("A", "a.exe"), program("B", "b.exe")]);

        let reports = Locator::new(&desktop, &config).run_all();

        assert_eq!(reports.len(), 2);
        for report in &reports {
            assert!(matches!(
                report.outcome,
                Outcome::Failed(OrganizerError::Platform { .. })
            ));
        }
        assert!(desktop.spawned.lock().is_empty());
    }

    #[test]
    fn parallel_run_reports_in_config_order() {
        let desktop = FakeDesktop::with_windows(vec![
            window(1, "Alpha"),
            window(2, "Beta"),
            window(3, "Gamma"),
        ]);
        let mut config = config(
            1,
            vec![
                program("Gamma", "g.exe"),
                program("Alpha", "a.exe"),
                program("Beta", "b.exe"),
            ],
        );
        config.parallel = true;

        let reports = Locator::new(&desktop, &config).run_all();

        let names: Vec<&str> = reports.iter().map(|report| report.name.as_str()).collect();
        assert_eq!(names, ["Gamma", "Alpha", "Beta"]);
        assert!(reports.iter().all(ProgramReport::placed));
        assert_eq!(desktop.moves.lock().len(), 3);
        assert!(desktop.spawned.lock().is_empty());
    }

    #[test]
    fn window_report_lists_everything() {
        test_log::install();
        let mut one = window(1, "One");
        one.rect = Rect {
            x: 10,
            y: 20,
            width: 300,
            height: 400,
        };
        let desktop = FakeDesktop::with_windows(vec![one, window(2, "")]);

        assert_eq!(report_windows(&desktop).unwrap(), 2);

        let lines = test_log::messages(Level::Info);
        assert_eq!(
            lines,
            [
                "[INFO]: Window 'One' @ X:10, Y:20, W:300, H:400",
                "[INFO]: Window '' @ X:0, Y:0, W:0, H:0",
            ]
        );
    }

    #[test]
    fn every_miss_is_reported() {
        test_log::install();
        let desktop = FakeDesktop::default();
        let config = config(2, vec![program("Ghost", "ghost.exe")]);

        Locator::new(&desktop, &config).run_all();

        let misses = test_log::messages(Level::Info)
            .into_iter()
            .filter(|line| line == "[FAIL]: Could not find window with name 'Ghost'")
            .count();
        assert_eq!(misses, 3);
    }

    #[test]
    fn failed_listing_does_not_stop_the_batch() {
        test_log::install();
        let desktop = FakeDesktop {
            failing_listings: Mutex::new(1),
            ..FakeDesktop::with_windows(vec![window(5, "Calculator")])
        };
        let mut config = config(1, vec![program("Calculator", "calc.exe")]);
        config.list_windows_on_start = true;

        let reports = arrange(&desktop, &config);

        assert!(reports[0].placed());
        assert_eq!(*desktop.list_calls.lock(), 2);
        assert!(
            test_log::messages(Level::Error)
                .iter()
                .any(|line| line.starts_with("[FAIL]: Could not list windows"))
        );
    }
}
