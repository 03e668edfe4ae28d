//! `Task`: one schedulable entity (a thread), the unit of ptrace attachment
//! and of registry storage (spec §3).
//!
//! Grounded on the teacher's `Task` field layout/doc-comment density
//! (`examples/isgasho-rd/src/task_interface/task.rs`) and its
//! `Rc<RefCell<_>>`/`*SharedPtr` ownership convention
//! (`examples/isgasho-rd/src/thread_group.rs`).

pub use crate::abi::Mode;
use crate::registers::SyscallArgs;
use crate::sink::EventId;
use libc::pid_t;
use std::cell::RefCell;
use std::rc::Rc;

pub type TaskSharedPtr = Rc<RefCell<Task>>;

/// Status lifecycle (spec §3):
///
/// `Unknown` → `Allocated` (the tracer saw the child stop *before* its
/// parent's fork returned) → `Attached`, or `Unknown` → `Attached` directly
/// (the fork-parent's return was seen first and the child's stop is still
/// pending). `Free` terminates the task's slot; it may later be reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Status {
    Unknown,
    Allocated,
    Attached,
    Free,
}

/// Per-call scratch referenced by `Task::syscall_info` during an execve
/// entry→exit window: deep-copied out of the tracee at entry, freed at
/// exit. Deliberately holds no reference back to its owning task, since
/// execve may transfer it to a different task (spec §4.3.7, §9).
#[derive(Clone, Debug)]
pub struct ExecveScratch {
    pub binary: String,
    pub argv: Vec<String>,
    pub envp: Vec<String>,
}

#[derive(Clone)]
pub struct Task {
    pub tid: pid_t,
    /// Thread-group id; equals `tid` for a non-thread process.
    pub tgid: pid_t,
    /// Absolute current working directory. Non-empty and absolute for every
    /// non-`Free` task.
    pub wd: String,
    /// Address-space width, fixed at attach and re-evaluated on successful
    /// execve.
    pub mode: Mode,
    pub status: Status,
    /// Flips on every entry/exit dispatch.
    pub in_syscall: bool,
    /// Last-seen syscall number, raw (including the x32 high bit).
    pub current_syscall: i64,
    pub args: SyscallArgs,
    /// Opaque id vended by the Event Sink on process creation. `None` only
    /// before the task has been registered with the sink.
    pub identifier: Option<EventId>,
    /// Valid only between an execve entry and its matching exit.
    pub syscall_info: Option<ExecveScratch>,
}

impl Task {
    pub fn new(tid: pid_t, tgid: pid_t, wd: String, mode: Mode, status: Status) -> Task {
        Task {
            tid,
            tgid,
            wd,
            mode,
            status,
            in_syscall: false,
            current_syscall: -1,
            args: SyscallArgs::default(),
            identifier: None,
            syscall_info: None,
        }
    }

    pub fn shared(self) -> TaskSharedPtr {
        Rc::new(RefCell::new(self))
    }

    pub fn is_thread_group_leader(&self) -> bool {
        self.tid == self.tgid
    }

    /// True when this task is mid-execve with scratch pending — the
    /// condition the dispatch engine's execve-exit-sibling search looks for
    /// (spec §4.3.7 step 2).
    pub fn is_execve_in_flight(&self, execve_syscall: i64) -> bool {
        self.status == Status::Attached
            && self.in_syscall
            && self.current_syscall == execve_syscall
            && self.syscall_info.is_some()
    }
}
