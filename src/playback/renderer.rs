use crate::error::PlaybackError;
use crate::platform::RendererCommand;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};

/// Process-control directives the controller sends to a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Suspend,
    Continue,
    Terminate,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Suspend => "SIGSTOP",
            Signal::Continue => "SIGCONT",
            Signal::Terminate => "SIGTERM",
        }
    }

    /// Verb used in failure messages
    pub fn action(&self) -> &'static str {
        match self {
            Signal::Suspend => "pause",
            Signal::Continue => "resume",
            Signal::Terminate => "stop",
        }
    }

    #[cfg(unix)]
    fn raw(&self) -> libc::c_int {
        match self {
            Signal::Suspend => libc::SIGSTOP,
            Signal::Continue => libc::SIGCONT,
            Signal::Terminate => libc::SIGTERM,
        }
    }
}

/// How a renderer process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    pub code: Option<i32>,
    pub success: bool,
    /// Set when waiting on the process itself failed
    pub error: Option<String>,
}

impl ExitReport {
    fn from_wait(result: std::io::Result<ExitStatus>) -> Self {
        match result {
            Ok(status) => Self {
                code: status.code(),
                success: status.success(),
                error: None,
            },
            Err(e) => Self {
                code: None,
                success: false,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn describe(&self) -> String {
        match (&self.error, self.code) {
            (Some(error), _) => error.clone(),
            (None, Some(code)) => format!("renderer exited with code {}", code),
            (None, None) => "renderer was terminated by a signal".to_string(),
        }
    }
}

/// Exit notification delivered to the controller
#[derive(Debug, Clone)]
pub struct RendererExited {
    pub generation: u64,
    pub pid: Option<u32>,
    pub report: ExitReport,
}

/// Requests handled by the watcher task that owns the child
#[derive(Debug)]
enum Control {
    Signal(Signal, oneshot::Sender<Result<(), String>>),
    Kill,
}

/// Owned handle to a running renderer process.
///
/// The child itself lives in a watcher task that reaps it and publishes the
/// exit twice: on a watch channel read by this handle, and as a
/// [`RendererExited`] event for the controller. Signals are delivered by the
/// watcher too, so they never reach a pid that was already reaped. Dropping
/// the handle kills the process.
#[derive(Debug)]
pub struct Renderer {
    pid: Option<u32>,
    generation: u64,
    control_tx: mpsc::UnboundedSender<Control>,
    exit_rx: watch::Receiver<Option<ExitReport>>,
}

impl Renderer {
    /// Launch `command` for `file`. Must be called from within a Tokio runtime.
    pub fn spawn(
        command: &RendererCommand,
        file: &Path,
        generation: u64,
        events: mpsc::UnboundedSender<RendererExited>,
    ) -> Result<Self, PlaybackError> {
        let child = Command::new(&command.program)
            .args(command.arguments_for(file))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlaybackError::LaunchFailure(format!("{}: {}", command.program, e)))?;

        let pid = child.id();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = watch::channel(None);

        tokio::spawn(async move {
            let report = supervise(child, control_rx).await;
            let _ = exit_tx.send(Some(report.clone()));
            let _ = events.send(RendererExited {
                generation,
                pid,
                report,
            });
        });

        Ok(Self {
            pid,
            generation,
            control_tx,
            exit_rx,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the watcher has reaped the process
    pub fn has_exited(&self) -> bool {
        self.exit_rx.borrow().is_some()
    }

    pub fn exit_report(&self) -> Option<ExitReport> {
        self.exit_rx.borrow().clone()
    }

    /// Wait at most `limit` for the process to be reaped
    pub async fn wait_for_exit(&self, limit: Duration) -> Option<ExitReport> {
        let mut exit_rx = self.exit_rx.clone();
        let report = match tokio::time::timeout(limit, exit_rx.wait_for(Option::is_some)).await {
            Ok(Ok(report)) => report.clone(),
            Ok(Err(_)) | Err(_) => None,
        };
        report
    }

    /// Deliver `signal` to the live process
    pub async fn signal(&self, signal: Signal) -> Result<(), PlaybackError> {
        let failure = |reason: String| PlaybackError::SignalFailure {
            action: signal.action(),
            reason,
        };
        let gone = || failure("renderer has already exited".to_string());

        if self.has_exited() {
            return Err(gone());
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.control_tx
            .send(Control::Signal(signal, reply_tx))
            .map_err(|_| gone())?;

        match reply_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(failure(reason)),
            Err(_) => Err(gone()),
        }
    }

    /// Ask the process to exit on its own terms
    #[cfg(unix)]
    pub async fn terminate(&mut self) -> Result<(), PlaybackError> {
        self.signal(Signal::Terminate).await
    }

    #[cfg(not(unix))]
    pub async fn terminate(&mut self) -> Result<(), PlaybackError> {
        self.kill();
        Ok(())
    }

    /// Forcefully kill the process; the watcher still reaps it
    pub fn kill(&mut self) {
        let _ = self.control_tx.send(Control::Kill);
    }
}

/// Own `child` until it exits, serving control requests meanwhile
async fn supervise(
    mut child: Child,
    mut control_rx: mpsc::UnboundedReceiver<Control>,
) -> ExitReport {
    loop {
        let request = tokio::select! {
            status = child.wait() => return ExitReport::from_wait(status),
            request = control_rx.recv() => request,
        };

        match request {
            Some(Control::Signal(signal, reply)) => {
                let _ = reply.send(deliver(&child, signal));
            }
            // A dropped handle counts as a kill request too.
            Some(Control::Kill) | None => {
                let _ = child.start_kill();
                return ExitReport::from_wait(child.wait().await);
            }
        }
    }
}

#[cfg(unix)]
fn deliver(child: &Child, signal: Signal) -> Result<(), String> {
    // `id()` is None once the child has been reaped.
    let pid = child
        .id()
        .ok_or_else(|| "renderer has already exited".to_string())?;
    let pid = libc::pid_t::try_from(pid).map_err(|e| e.to_string())?;

    // SAFETY: kill(2) takes plain integers. Only this task reaps the child and
    // it has not done so yet, so the pid still names our process.
    let rc = unsafe { libc::kill(pid, signal.raw()) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error().to_string())
    }
}

#[cfg(not(unix))]
fn deliver(_child: &Child, _signal: Signal) -> Result<(), String> {
    Err("process signals are not available on this platform".to_string())
}
