use tokio::process::Command;

const IOPRIO_CLASS_SHIFT: i32 = 13;
const IOPRIO_CLASS_BEST_EFFORT: i32 = 2;
const IOPRIO_WHO_PROCESS: i32 = 1;

/// Scheduling hints for an external program, equivalent to running it under
/// `ionice -c <io_class> -n <io_nice> nice -n <cpu_nice>`.
///
/// The hints are advisory: if the kernel refuses them the program still runs
/// with the default priorities.
#[derive(Debug, Default, PartialEq, Eq, Hash, Copy, Clone)]
pub struct PriorityHints {
    pub io_nice: Option<i32>,
    pub io_class: Option<i32>,
    pub cpu_nice: Option<i32>,
}

impl PriorityHints {
    pub fn is_empty(&self) -> bool {
        self.io_nice.is_none() && self.io_class.is_none() && self.cpu_nice.is_none()
    }

    /// Value for `ioprio_set`, `None` if no I/O class should be set.
    fn ioprio(&self) -> Option<i32> {
        let class = match (self.io_class, self.io_nice) {
            (None, None) | (Some(0), _) => return None,
            (Some(class), _) => class,
            (None, Some(_)) => IOPRIO_CLASS_BEST_EFFORT,
        };
        let level = self.io_nice.unwrap_or(0).clamp(0, 7);
        Some((class << IOPRIO_CLASS_SHIFT) | level)
    }

    #[cfg(target_os = "linux")]
    pub(crate) fn apply(&self, cmd: &mut Command) {
        if self.is_empty() {
            return;
        }
        let cpu_nice = self.cpu_nice;
        let ioprio = self.ioprio();
        // SAFETY: the closure only issues the async-signal-safe setpriority and
        // ioprio_set system calls.
        unsafe {
            cmd.pre_exec(move || {
                if let Some(nice) = cpu_nice {
                    libc::setpriority(libc::PRIO_PROCESS, 0, nice);
                }
                if let Some(ioprio) = ioprio {
                    libc::syscall(libc::SYS_ioprio_set, IOPRIO_WHO_PROCESS, 0, ioprio);
                }
                Ok(())
            });
        }
    }

    #[cfg(not(target_os = "linux"))]
    pub(crate) fn apply(&self, _cmd: &mut Command) {
        if !self.is_empty() {
            tracing::debug!("priority hints are only supported on Linux, ignoring them");
        }
    }
}
