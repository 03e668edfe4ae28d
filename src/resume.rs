//! Resuming a stopped tracee toward its next syscall stop (spec §4.6 step 7,
//! §6 "Ptrace interface").
//!
//! Grounded on `nix::sys::ptrace`'s resume wrappers (the same crate the
//! teacher uses for every other ptrace request, see
//! `examples/isgasho-rd/src/task_interface/task.rs`'s `ResumeRequest` enum),
//! behind a small trait so the dispatch engine's tests never need a real
//! tracee.

use crate::error::{Error, Result};
use libc::pid_t;
use nix::sys::ptrace;
use nix::unistd::Pid;

/// Abstraction over "resume task `tid` with `PTRACE_SYSCALL` semantics,
/// stopping again at the next syscall-entry or syscall-exit". The
/// production implementation is `PtraceResumer`; tests substitute a
/// recording fake.
pub trait Resumer {
    fn resume_syscall(&self, tid: pid_t) -> Result<()>;
}

pub struct PtraceResumer;

impl Resumer for PtraceResumer {
    fn resume_syscall(&self, tid: pid_t) -> Result<()> {
        ptrace::syscall(Pid::from_raw(tid), None).map_err(|e| match e {
            nix::Error::Sys(nix::errno::Errno::ESRCH) => Error::TraceeVanished { tid },
            other => Error::Invariant(format!("PTRACE_SYSCALL resume failed for tid {}: {}", tid, other)),
        })
    }
}
