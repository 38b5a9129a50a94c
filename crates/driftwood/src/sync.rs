use crate::config::BlogPaths;
use crate::error::{BlogError, IoContext, Result};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use walkdir::WalkDir;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

const CLONE_DIR: &str = "clone";
const NEXT_DIR: &str = "next";
const PREVIOUS_DIR: &str = "previous";

/// Fetches a repository into `target`, which must not exist yet.
pub trait RepositoryCloner: Send + Sync {
    fn clone_repository(&self, url: &str, target: &Path, timeout: Duration) -> Result<()>;
}

/// Shells out to `git clone --depth 1`.
#[derive(Debug, Clone)]
pub struct GitCloner {
    program: OsString,
    base_args: Vec<OsString>,
}

impl Default for GitCloner {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCloner {
    pub fn new() -> Self {
        Self {
            program: OsString::from("git"),
            base_args: Vec::new(),
        }
    }

    /// Runs `program base_args... clone ...` instead of `git clone ...`.
    pub fn with_command<I, S>(program: impl AsRef<OsStr>, base_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self {
            program: program.as_ref().to_os_string(),
            base_args: base_args
                .into_iter()
                .map(|arg| arg.as_ref().to_os_string())
                .collect(),
        }
    }
}

impl RepositoryCloner for GitCloner {
    fn clone_repository(&self, url: &str, target: &Path, timeout: Duration) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.base_args)
            .args(["clone", "--depth", "1", "--quiet", "--"])
            .arg(url)
            .arg(target)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| BlogError::SyncClone {
                message: format!("failed to start {}: {error}", self.program.to_string_lossy()),
            })?;

        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut output = String::new();
                let _ = stderr.read_to_string(&mut output);
                output
            })
        });

        let status = wait_with_timeout(&mut child, timeout).map_err(|error| BlogError::SyncClone {
            message: error.to_string(),
        })?;

        // A grandchild may still hold stderr open after a kill, so the reader
        // is only joined once the clone has exited on its own.
        let Some(status) = status else {
            return Err(BlogError::SyncClone {
                message: format!("timed out after {}s", timeout.as_secs_f64()),
            });
        };

        if status.success() {
            return Ok(());
        }

        let stderr = stderr_reader
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();
        Err(BlogError::SyncClone {
            message: format!("{status}: {}", stderr.trim()),
        })
    }
}

/// Waits for `child`, killing it once `timeout` has elapsed. `None` means
/// the process was killed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }

        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }

        thread::sleep(POLL_INTERVAL);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub directories: Vec<(String, usize)>,
}

impl SyncReport {
    pub fn total_files(&self) -> usize {
        self.directories.iter().map(|(_, count)| count).sum()
    }
}

/// Replaces the managed content directories with the ones from a fresh
/// clone. Runs are serialized, and the live directories are only touched
/// once every replacement has been fully built in the staging area.
pub struct SyncEngine {
    paths: BlogPaths,
    cloner: Box<dyn RepositoryCloner>,
    timeout: Duration,
    running: Mutex<()>,
    content_lock: Arc<RwLock<()>>,
}

impl SyncEngine {
    pub fn new(
        paths: BlogPaths,
        cloner: Box<dyn RepositoryCloner>,
        timeout: Duration,
        content_lock: Arc<RwLock<()>>,
    ) -> Self {
        Self {
            paths,
            cloner,
            timeout,
            running: Mutex::new(()),
            content_lock,
        }
    }

    /// Blocks the calling thread; run it off the async executor.
    pub fn run(&self, clone_url: &str) -> Result<SyncReport> {
        let _running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        let staging = &self.paths.staging_dir;

        tracing::info!("Syncing content from {clone_url}");
        let start = Instant::now();

        remove_dir_if_exists(staging).io_context("removing staging directory", staging)?;
        fs::create_dir_all(staging).io_context("creating staging directory", staging)?;

        let result = self.replace_from_clone(staging, clone_url);

        if let Err(error) = remove_dir_if_exists(staging) {
            tracing::warn!("Failed to remove {}: {error}", staging.display());
        }

        match &result {
            Ok(report) => tracing::info!(
                "Synced {} files in {:.2?}",
                report.total_files(),
                start.elapsed()
            ),
            Err(error) => tracing::error!("Sync failed: {error}"),
        }

        result
    }

    fn replace_from_clone(&self, staging: &Path, clone_url: &str) -> Result<SyncReport> {
        let clone_dir = staging.join(CLONE_DIR);
        self.cloner.clone_repository(clone_url, &clone_dir, self.timeout)?;

        let next_dir = staging.join(NEXT_DIR);
        let mut report = SyncReport::default();

        for (name, _) in self.paths.managed_dirs() {
            let source = clone_dir.join(name);
            if !source.is_dir() {
                return Err(BlogError::SyncReplace {
                    directory: name.to_string(),
                    message: "missing from the cloned repository".to_string(),
                });
            }

            let copied = copy_tree(&source, &next_dir.join(name)).map_err(|error| {
                BlogError::SyncReplace {
                    directory: name.to_string(),
                    message: error.to_string(),
                }
            })?;
            report.directories.push((name.to_string(), copied));
        }

        let previous_dir = staging.join(PREVIOUS_DIR);
        fs::create_dir_all(&previous_dir).io_context("creating staging directory", &previous_dir)?;

        let _writing = self.content_lock.blocking_write();
        self.swap_into_place(&next_dir, &previous_dir)?;

        Ok(report)
    }

    fn swap_into_place(&self, next_dir: &Path, previous_dir: &Path) -> Result<()> {
        let mut swapped: Vec<(&Path, Option<PathBuf>)> = Vec::new();

        for (name, live) in self.paths.managed_dirs() {
            let backup = previous_dir.join(name);
            let had_live = fs::symlink_metadata(live).is_ok();

            if had_live && let Err(error) = fs::rename(live, &backup) {
                rollback(&swapped);
                return Err(swap_error(name, error));
            }

            if let Err(error) = fs::rename(next_dir.join(name), live) {
                if had_live {
                    let _ = fs::rename(&backup, live);
                }
                rollback(&swapped);
                return Err(swap_error(name, error));
            }

            swapped.push((live, had_live.then_some(backup)));
        }

        Ok(())
    }
}

fn swap_error(name: &str, error: io::Error) -> BlogError {
    BlogError::SyncReplace {
        directory: name.to_string(),
        message: error.to_string(),
    }
}

fn rollback(swapped: &[(&Path, Option<PathBuf>)]) {
    for (live, backup) in swapped.iter().rev() {
        if let Err(error) = remove_dir_if_exists(live) {
            tracing::error!("Rollback failed to remove {}: {error}", live.display());
            continue;
        }
        if let Some(backup) = backup
            && let Err(error) = fs::rename(backup, live)
        {
            tracing::error!("Rollback failed to restore {}: {error}", live.display());
        }
    }
}

fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Recursively copies `source` into a new directory `dest`, returning the
/// number of files copied. Symbolic links are skipped.
pub fn copy_tree(source: &Path, dest: &Path) -> io::Result<usize> {
    fs::create_dir_all(dest)?;
    let mut copied = 0;

    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        } else {
            tracing::debug!("Skipping {} while copying", entry.path().display());
        }
    }

    Ok(copied)
}
