//! Pure Data server that receives the OSC stream and turns it into sound.
//!
//! Only the process lifecycle is managed here; SoundNav talks to the running
//! patch exclusively over OSC.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::error::{Result, SoundNavError};
use crate::settings::{Settings, PURE_DATA_EXECUTABLE_KEY, PURE_DATA_PATCH_KEY};

/// Starts and terminates external processes.
pub trait ProcessLauncher {
    type Handle;

    fn start(&mut self, executable: &Path, args: &[String]) -> Result<Self::Handle>;
    fn terminate(&mut self, handle: Self::Handle);
}

/// Launches real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    type Handle = Child;

    fn start(&mut self, executable: &Path, args: &[String]) -> Result<Child> {
        Command::new(executable)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                SoundNavError::ExternalResource(format!(
                    "could not start {}: {}",
                    executable.display(),
                    e
                ))
            })
    }

    fn terminate(&mut self, mut child: Child) {
        if let Err(e) = child.kill() {
            warn!(target: "pure_data", "kill failed: {}", e);
        }
        let _ = child.wait();
    }
}

/// Default install locations, checked in order.
fn default_candidates() -> Vec<PathBuf> {
    let paths: &[&str] = if cfg!(windows) {
        &[
            "c:/Program Files/Purr Data/bin/pd.exe",
            "c:/Program Files (x86)/pd/bin/pd.exe",
            "c:/Program Files/Pd/bin/pd.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/Applications/Purr Data.app/Contents/MacOS/nwjs",
            "/Applications/Pd.app/Contents/Resources/bin/pd",
            "/usr/local/bin/pd",
        ]
    } else {
        &["/usr/bin/pd", "/usr/local/bin/pd", "/opt/purr-data/bin/pd-l2ork"]
    };
    paths.iter().map(PathBuf::from).collect()
}

/// Command line for `pd`: `[-nogui] [-open <patch>]`.
pub fn launch_args(patch: Option<&Path>, show_gui: bool) -> Vec<String> {
    let mut args = Vec::new();
    if !show_gui {
        args.push("-nogui".to_string());
    }
    if let Some(patch) = patch {
        args.push("-open".to_string());
        args.push(patch.to_string_lossy().into_owned());
    }
    args
}

pub struct PureDataServer<S: Settings, L: ProcessLauncher = SystemLauncher> {
    settings: S,
    launcher: L,
    candidates: Vec<PathBuf>,
    executable: Option<PathBuf>,
    process: Option<L::Handle>,
}

impl<S: Settings> PureDataServer<S, SystemLauncher> {
    pub fn system(settings: S) -> Self {
        Self::new(settings, SystemLauncher)
    }
}

impl<S: Settings, L: ProcessLauncher> PureDataServer<S, L> {
    pub fn new(settings: S, launcher: L) -> Self {
        Self {
            settings,
            launcher,
            candidates: default_candidates(),
            executable: None,
            process: None,
        }
    }

    /// Replace the list of install locations searched for `pd`.
    pub fn with_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    /// Locate the `pd` executable: cached value, then the saved setting,
    /// then the default install locations.
    pub fn executable_path(&mut self) -> Result<PathBuf> {
        if let Some(path) = &self.executable {
            return Ok(path.clone());
        }
        if let Some(saved) = self.settings.get(PURE_DATA_EXECUTABLE_KEY) {
            let saved = PathBuf::from(saved);
            if saved.is_file() {
                self.executable = Some(saved.clone());
                return Ok(saved);
            }
        }
        let found = self
            .candidates
            .iter()
            .find(|c| c.is_file())
            .map(|c| std::path::absolute(c).unwrap_or_else(|_| c.clone()));
        match found {
            Some(path) => {
                self.executable = Some(path.clone());
                Ok(path)
            }
            None => Err(SoundNavError::ExternalResource(
                "Pure Data executable (pd) not found. Install Purr Data \
                 (https://github.com/agraef/purr-data/releases) or set its path."
                    .to_string(),
            )),
        }
    }

    /// Remember a user-chosen executable and resolve it again.
    pub fn set_executable_path(&mut self, path: &Path) -> Result<PathBuf> {
        let value = path.to_string_lossy();
        if self.settings.get(PURE_DATA_EXECUTABLE_KEY).as_deref() != Some(value.as_ref()) {
            self.settings.set(PURE_DATA_EXECUTABLE_KEY, &value)?;
        }
        self.executable = None;
        self.executable_path()
    }

    /// Start Pure Data, stopping a running instance first.
    pub fn start(&mut self, patch: Option<&Path>, show_gui: bool) -> Result<()> {
        self.stop();
        if let Some(patch) = patch {
            if !patch.is_file() {
                return Err(SoundNavError::Configuration(format!(
                    "Pure Data patch {} does not exist",
                    patch.display()
                )));
            }
        }
        let executable = self.executable_path()?;
        let args = launch_args(patch, show_gui);
        info!(
            target: "pure_data",
            "Start Pure Data server: {} {}",
            executable.display(),
            args.join(" ")
        );
        let handle = self.launcher.start(&executable, &args)?;
        self.process = Some(handle);

        if let Some(patch) = patch {
            if let Err(e) = self.settings.set(PURE_DATA_PATCH_KEY, &patch.to_string_lossy()) {
                warn!(target: "pure_data", "could not remember patch path: {}", e);
            }
        }
        Ok(())
    }

    /// Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.process.take() {
            info!(target: "pure_data", "Stopping Pure Data server");
            self.launcher.terminate(handle);
        }
    }
}

impl<S: Settings, L: ProcessLauncher> Drop for PureDataServer<S, L> {
    fn drop(&mut self) {
        self.stop();
    }
}

// ─── Test Launcher ──────────────────────────────────────────────────

/// A process event recorded by [`TestLauncher`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOp {
    Start { executable: PathBuf, args: Vec<String>, handle: u32 },
    Terminate(u32),
}

/// Records launches instead of spawning processes. Clones share the record.
#[derive(Clone, Default)]
pub struct TestLauncher {
    ops: Arc<Mutex<Vec<ProcessOp>>>,
    next_handle: u32,
}

impl TestLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(&self) -> Vec<ProcessOp> {
        self.ops.lock().unwrap().clone()
    }
}

impl ProcessLauncher for TestLauncher {
    type Handle = u32;

    fn start(&mut self, executable: &Path, args: &[String]) -> Result<u32> {
        self.next_handle += 1;
        self.ops.lock().unwrap().push(ProcessOp::Start {
            executable: executable.to_path_buf(),
            args: args.to_vec(),
            handle: self.next_handle,
        });
        Ok(self.next_handle)
    }

    fn terminate(&mut self, handle: u32) {
        self.ops.lock().unwrap().push(ProcessOp::Terminate(handle));
    }
}
