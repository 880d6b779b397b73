//! OS session lock primitive and lock-state notifications.
//!
//! Locking uses `LockWorkStation` on Windows and `loginctl lock-session` on
//! Linux. Lock/unlock notifications are produced by `SessionWatcher`, which
//! polls a lock-state query on its own thread and reports edges. The query
//! reads the WTS session flags on Windows and the logind `LockedHint` on
//! Linux.
use lockguard_traits::{SessionChange, SessionControl};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Locks the interactive session of the current user.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSession;

impl SessionControl for SystemSession {
    fn lock_session(&mut self) -> bool {
        let ok = lock_workstation();
        if ok {
            tracing::info!("session lock requested");
        } else {
            tracing::warn!("session lock request failed");
        }
        ok
    }
}

#[cfg(windows)]
fn lock_workstation() -> bool {
    // SAFETY: LockWorkStation takes no arguments and only reports success.
    unsafe { windows_sys::Win32::System::Shutdown::LockWorkStation() != 0 }
}

#[cfg(target_os = "linux")]
fn lock_workstation() -> bool {
    let mut cmd = std::process::Command::new("loginctl");
    cmd.arg("lock-session");
    if let Some(id) = session_id() {
        cmd.arg(id);
    }
    match cmd.status() {
        Ok(status) => status.success(),
        Err(e) => {
            tracing::warn!(error = %e, "cannot run loginctl");
            false
        }
    }
}

#[cfg(not(any(windows, target_os = "linux")))]
fn lock_workstation() -> bool {
    tracing::warn!("session locking is not supported on this platform");
    false
}

#[cfg(target_os = "linux")]
fn session_id() -> Option<String> {
    std::env::var("XDG_SESSION_ID").ok().filter(|s| !s.is_empty())
}

/// Interpret `loginctl show-session -p LockedHint --value` output.
pub fn parse_locked_hint(output: &str) -> Option<bool> {
    match output.trim() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

/// Interpret `WTSINFOEX_LEVEL1_W::SessionFlags`.
///
/// Windows 7 and Server 2008 R2 report the two values swapped; those
/// releases are not handled.
pub fn parse_session_flags(flags: i32) -> Option<bool> {
    const WTS_SESSIONSTATE_LOCK: i32 = 0;
    const WTS_SESSIONSTATE_UNLOCK: i32 = 1;
    match flags {
        WTS_SESSIONSTATE_LOCK => Some(true),
        WTS_SESSIONSTATE_UNLOCK => Some(false),
        _ => None,
    }
}

/// Whether the current session is locked, if it can be determined.
#[cfg(windows)]
pub fn query_locked() -> Option<bool> {
    use windows_sys::Win32::System::RemoteDesktop::{
        WTS_CURRENT_SESSION, WTSFreeMemory, WTSINFOEXW, WTSQuerySessionInformationW,
        WTSSessionInfoEx,
    };

    let mut buf: *mut u16 = std::ptr::null_mut();
    let mut bytes: u32 = 0;
    // SAFETY: a null server handle selects the local server. On success the
    // API hands back a buffer it allocated, which is freed below.
    let ok = unsafe {
        WTSQuerySessionInformationW(
            std::ptr::null_mut(),
            WTS_CURRENT_SESSION,
            WTSSessionInfoEx,
            &mut buf,
            &mut bytes,
        )
    };
    if ok == 0 || buf.is_null() {
        tracing::trace!("WTSQuerySessionInformationW failed");
        return None;
    }
    let flags = if (bytes as usize) >= std::mem::size_of::<WTSINFOEXW>() {
        // SAFETY: the buffer holds a WTSINFOEXW of at least `bytes` bytes;
        // level 1 is the only layout the API defines.
        unsafe {
            let info = &*buf.cast::<WTSINFOEXW>();
            if info.Level == 1 {
                Some(info.Data.WTSInfoExLevel1.SessionFlags)
            } else {
                None
            }
        }
    } else {
        None
    };
    // SAFETY: `buf` came from WTSQuerySessionInformationW and is freed once.
    unsafe { WTSFreeMemory(buf.cast()) };
    flags.and_then(parse_session_flags)
}

/// Whether the current session is locked, if it can be determined.
#[cfg(target_os = "linux")]
pub fn query_locked() -> Option<bool> {
    let id = session_id().unwrap_or_else(|| "self".to_string());
    let out = std::process::Command::new("loginctl")
        .args(["show-session", &id, "-p", "LockedHint", "--value"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    parse_locked_hint(&String::from_utf8_lossy(&out.stdout))
}

/// Background poller that turns lock-state samples into `SessionChange` edges.
///
/// Edges are found by comparing consecutive samples, so a lock and unlock
/// that both fall inside one poll period go unreported. A monitor that locked
/// the session itself then stays locked until the next observed unlock; keep
/// `session.poll_ms` well below the time it takes to type a password.
///
/// Failed queries (`None`) are skipped and never produce an edge. The thread
/// is shut down and joined when the watcher is dropped.
pub struct SessionWatcher {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl SessionWatcher {
    /// Watch the lock state of the current session.
    #[cfg(any(windows, target_os = "linux"))]
    pub fn spawn<F>(poll: Duration, on_change: F) -> Self
    where
        F: Fn(SessionChange) + Send + 'static,
    {
        Self::spawn_with(poll, query_locked, on_change)
    }

    /// Watch an arbitrary lock-state query (`Some(true)` = locked).
    pub fn spawn_with<Q, F>(poll: Duration, mut query: Q, on_change: F) -> Self
    where
        Q: FnMut() -> Option<bool> + Send + 'static,
        F: Fn(SessionChange) + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let poll = poll.max(Duration::from_millis(1));

        let join_handle = std::thread::spawn(move || {
            let mut last = query();
            tracing::debug!(locked = ?last, "session watcher started");
            loop {
                if !sleep_unless(&shutdown_clone, poll) {
                    break;
                }
                let Some(locked) = query() else {
                    continue;
                };
                if last != Some(locked) {
                    if last.is_some() {
                        on_change(if locked {
                            SessionChange::Locked
                        } else {
                            SessionChange::Unlocked
                        });
                    }
                    last = Some(locked);
                }
            }
            tracing::trace!("session watcher exiting cleanly");
        });

        Self {
            shutdown,
            join_handle: Some(join_handle),
        }
    }
}

/// Sleep `d` in short slices; returns false as soon as shutdown is requested.
fn sleep_unless(shutdown: &AtomicBool, d: Duration) -> bool {
    const SLICE: Duration = Duration::from_millis(20);
    let deadline = Instant::now() + d;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(SLICE.min(deadline - now));
    }
}

impl Drop for SessionWatcher {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            if let Err(e) = handle.join() {
                tracing::warn!(?e, "session watcher panicked during shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::mpsc;

    #[test]
    fn locked_hint_parsing() {
        assert_eq!(parse_locked_hint("yes\n"), Some(true));
        assert_eq!(parse_locked_hint("no"), Some(false));
        assert_eq!(parse_locked_hint(""), None);
        assert_eq!(parse_locked_hint("Failed to get session"), None);
    }

    #[test]
    fn session_flags_parsing() {
        assert_eq!(parse_session_flags(0), Some(true));
        assert_eq!(parse_session_flags(1), Some(false));
        assert_eq!(parse_session_flags(-1), None);
    }

    /// Replays `script`, then repeats its last sample forever.
    fn scripted(script: Vec<Option<bool>>) -> impl FnMut() -> Option<bool> + Send + 'static {
        let last = script.last().copied().flatten();
        let mut queue = VecDeque::from(script);
        move || queue.pop_front().unwrap_or(last)
    }

    fn collect_edges(script: Vec<Option<bool>>, expected: usize) -> Vec<SessionChange> {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let watcher = SessionWatcher::spawn_with(Duration::from_millis(1), scripted(script), move |c| {
            let _ = tx.lock().unwrap().send(c);
        });
        let mut seen = Vec::new();
        while seen.len() < expected {
            match rx.recv_timeout(Duration::from_secs(2)) {
                Ok(c) => seen.push(c),
                Err(_) => break,
            }
        }
        // Give the thread a few more polls to prove nothing else arrives.
        std::thread::sleep(Duration::from_millis(30));
        drop(watcher);
        seen.extend(rx.try_iter());
        seen
    }

    #[test]
    fn reports_each_edge_once() {
        let edges = collect_edges(
            vec![Some(false), Some(false), Some(true), Some(true), Some(false)],
            2,
        );
        assert_eq!(edges, vec![SessionChange::Locked, SessionChange::Unlocked]);
    }

    #[test]
    fn failed_queries_do_not_fake_edges() {
        let edges = collect_edges(vec![Some(false), None, Some(false), None, Some(true)], 1);
        assert_eq!(edges, vec![SessionChange::Locked]);
    }

    #[test]
    fn first_known_sample_is_a_baseline() {
        let edges = collect_edges(vec![None, None, Some(true), Some(false)], 1);
        assert_eq!(edges, vec![SessionChange::Unlocked]);
    }

    #[test]
    fn drop_stops_the_thread_promptly() {
        let started = Instant::now();
        let watcher = SessionWatcher::spawn_with(Duration::from_secs(60), || Some(false), |_| {});
        drop(watcher);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
