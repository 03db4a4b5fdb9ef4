//! PTY process management.

use anyhow::{Context, Result};
use portable_pty::{native_pty_system, Child, CommandBuilder, PtyPair, PtySize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

/// The user's login shell: `$SHELL`, falling back to `/bin/sh`.
pub fn default_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}

/// Handles PTY spawning and I/O for one terminal session.
///
/// Spawns the given argv on a fresh pseudo-terminal and provides methods
/// for reading output and writing input. `Drop` kills and reaps the child.
pub struct PtyHandler {
    pair: PtyPair,
    writer: Box<dyn Write + Send>,
    output_rx: Receiver<Vec<u8>>,
    exited: Arc<AtomicBool>,
    child: Box<dyn Child + Send + Sync>,
    child_pid: Option<u32>,
    _reader_thread: thread::JoinHandle<()>,
}

impl PtyHandler {
    /// Spawn `argv` on a new PTY in `cwd` (or the inherited working
    /// directory when `None`).
    pub fn spawn(argv: &[String], cwd: Option<&Path>, rows: u16, cols: u16) -> Result<Self> {
        let program = argv.first().context("empty command")?;

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("failed to open PTY")?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(&argv[1..]);
        cmd.env("TERM", "xterm-256color");
        if let Some(dir) = cwd {
            cmd.cwd(dir);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("failed to spawn {:?}", program))?;
        let child_pid = child.process_id();

        let writer = pair
            .master
            .take_writer()
            .context("failed to get PTY writer")?;
        let mut reader = pair
            .master
            .try_clone_reader()
            .context("failed to get PTY reader")?;

        let (output_tx, output_rx): (Sender<Vec<u8>>, Receiver<Vec<u8>>) = mpsc::channel();

        let exited = Arc::new(AtomicBool::new(false));
        let exited_clone = exited.clone();

        // Pump PTY output into the channel; EOF or a read error means the
        // child side is gone.
        let reader_thread = thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        exited_clone.store(true, Ordering::SeqCst);
                        break;
                    }
                    Ok(n) => {
                        if output_tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        exited_clone.store(true, Ordering::SeqCst);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            pair,
            writer,
            output_rx,
            exited,
            child,
            child_pid,
            _reader_thread: reader_thread,
        })
    }

    /// Write input bytes to the PTY.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read any pending output from the PTY (non-blocking).
    pub fn read_output(&self) -> Vec<Vec<u8>> {
        let mut output = Vec::new();
        while let Ok(data) = self.output_rx.try_recv() {
            output.push(data);
        }
        output
    }

    /// Whether the child process has exited (or its PTY reached EOF).
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    /// Resize the PTY.
    pub fn resize(&self, rows: u16, cols: u16, pixel_width: u16, pixel_height: u16) -> Result<()> {
        self.pair
            .master
            .resize(PtySize {
                rows,
                cols,
                pixel_width,
                pixel_height,
            })
            .context("failed to resize PTY")?;
        Ok(())
    }

    pub fn process_id(&self) -> Option<u32> {
        self.child_pid
    }

    /// Best-effort check for foreground work beyond the spawned child:
    /// true when the PTY's foreground process group is not the child's.
    /// Shell- and platform-dependent; only ever used to gate a
    /// confirmation prompt.
    #[cfg(unix)]
    pub fn has_foreground_child(&self) -> bool {
        let Some(pid) = self.child_pid else {
            return false;
        };
        let Some(fd) = self.pair.master.as_raw_fd() else {
            return false;
        };
        let pgid = unsafe { libc::tcgetpgrp(fd) };
        pgid == -1 || pgid as u32 != pid
    }

    #[cfg(not(unix))]
    pub fn has_foreground_child(&self) -> bool {
        false
    }

    /// Working directory of the child, read from its `/proc` cwd link.
    /// Only available on Linux; elsewhere callers fall back to inheriting
    /// their own working directory.
    pub fn child_working_directory(&self) -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let pid = self.child_pid?;
            std::fs::read_link(format!("/proc/{}/cwd", pid)).ok()
        }
        #[cfg(not(target_os = "linux"))]
        {
            None
        }
    }
}

impl Drop for PtyHandler {
    fn drop(&mut self) {
        self.exited.store(true, Ordering::SeqCst);

        // ESRCH (no such process) is expected if already exited.
        if let Err(e) = self.child.kill() {
            tracing::debug!("kill child process: {}", e);
        }
        // Reap to avoid a zombie.
        if let Err(e) = self.child.wait() {
            tracing::debug!("wait for child process: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_shell_is_absolute_or_env() {
        let shell = default_shell();
        assert!(!shell.is_empty());
        if std::env::var("SHELL").is_err() {
            assert_eq!(shell, "/bin/sh");
        }
    }

    #[test]
    fn spawn_rejects_empty_argv() {
        assert!(PtyHandler::spawn(&[], None, 24, 80).is_err());
    }
}
