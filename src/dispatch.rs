use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::Error;

/// One planned external invocation.
///
/// `target` is bookkeeping only — the file this invocation is about — and
/// is carried through to the outcome unchanged.
#[derive(Debug)]
pub struct Launch {
    pub program: String,
    pub args: Vec<OsString>,
    pub target: PathBuf,
}

/// The collected result of one external invocation.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub target: PathBuf,
    pub pid: Option<u32>,
    /// Exit code; `None` when the child was killed by a signal, timed out,
    /// or never spawned.
    pub status: Option<i32>,
    pub stderr: String,
    pub timed_out: bool,
    pub spawn_error: Option<String>,
}

impl DispatchOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == Some(0) && !self.timed_out && self.spawn_error.is_none()
    }
}

/// Launch every invocation before waiting on any, then join in launch order.
///
/// This is the batch concurrency model: the local orchestration is
/// sequential, parallelism comes entirely from the children all running at
/// once. Each join is bounded by `timeout`; a child still running at expiry
/// is killed and reported as a failure. A nonzero exit is logged and
/// recorded but never cancels sibling invocations — partial success is the
/// expected steady state.
pub async fn dispatch_all(launches: Vec<Launch>, timeout: Duration) -> Vec<DispatchOutcome> {
    // Fire pass: spawn everything without waiting.
    let mut inflight = Vec::with_capacity(launches.len());
    for launch in launches {
        let spawned = Command::new(&launch.program)
            .args(&launch.args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        inflight.push((launch, spawned));
    }

    // Join pass: collect in launch order. Completion order out in the world
    // is unconstrained; the ordering here is bookkeeping for deterministic
    // logging only.
    let mut outcomes = Vec::with_capacity(inflight.len());
    for (launch, spawned) in inflight {
        let outcome = match spawned {
            Err(e) => {
                let outcome = DispatchOutcome {
                    target: launch.target,
                    pid: None,
                    status: None,
                    stderr: String::new(),
                    timed_out: false,
                    spawn_error: Some(e.to_string()),
                };
                log::error!(
                    "Failed to launch {} for {}: {e}",
                    launch.program,
                    outcome.target.display()
                );
                outcome
            }
            Ok(child) => {
                let pid = child.id();
                match tokio::time::timeout(timeout, child.wait_with_output()).await {
                    Ok(Ok(output)) => DispatchOutcome {
                        target: launch.target,
                        pid,
                        status: output.status.code(),
                        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                        timed_out: false,
                        spawn_error: None,
                    },
                    Ok(Err(e)) => {
                        log::error!("Failed to collect {} (pid {pid:?}): {e}", launch.program);
                        DispatchOutcome {
                            target: launch.target,
                            pid,
                            status: None,
                            stderr: String::new(),
                            timed_out: false,
                            spawn_error: Some(e.to_string()),
                        }
                    }
                    // Dropping the timed-out future drops the child, and
                    // kill_on_drop reaps it.
                    Err(_) => {
                        let outcome = DispatchOutcome {
                            target: launch.target,
                            pid,
                            status: None,
                            stderr: String::new(),
                            timed_out: true,
                            spawn_error: None,
                        };
                        log::error!(
                            "{} (pid {pid:?}) for {} exceeded the {}s timeout and was killed",
                            launch.program,
                            outcome.target.display(),
                            timeout.as_secs()
                        );
                        outcome
                    }
                }
            }
        };

        if !outcome.succeeded() && !outcome.timed_out && outcome.spawn_error.is_none() {
            log::error!(
                "{}",
                Error::ExternalInvocation {
                    tool: launch.program.clone(),
                    pid: outcome.pid,
                    status: outcome.status,
                    stderr: outcome.stderr.trim_end().to_string(),
                }
            );
        }

        outcomes.push(outcome);
    }

    outcomes
}
