//! `fork`/`vfork`/`clone` (spec §4.3.8). Grounded on `syscall_forking` in
//! `examples/original_source/reprozip/native/syscalls.c`.
//!
//! Like `execve::exit`, this needs the process registry (to look up or
//! allocate the new task) and issues a resume on a task other than the one
//! the dispatch engine is currently stepping, so it does not share the
//! generic `ExitHandler` signature (see `crate::handlers`' module doc
//! comment).

use crate::config::Config;
use crate::error::{Error, Result};
use crate::log;
use crate::log::LogLevel::LogInfo;
use crate::memory::TraceeMemory;
use crate::registry::Registry;
use crate::resume::Resumer;
use crate::sink::EventSink;
use crate::syscall_table::Discriminator;
use crate::task::{Status, Task, TaskSharedPtr};
use libc::pid_t;

/// Child shares its parent's thread group (and so is a "thread" rather
/// than a new process) — the clone(2) `CLONE_THREAD` flag.
const CLONE_THREAD: u64 = libc::CLONE_THREAD as u64;

pub fn exit(
    registry: &mut Registry,
    task: &TaskSharedPtr,
    _mem: &dyn TraceeMemory,
    sink: &mut dyn EventSink,
    resumer: &dyn Resumer,
    config: &Config,
    disc: Discriminator,
) -> Result<()> {
    let (retvalue, parent_tgid, parent_wd, parent_mode, parent_id, flags_arg) = {
        let t = task.borrow();
        (
            t.args.retvalue,
            t.tgid,
            t.wd.clone(),
            t.mode,
            t.identifier,
            t.args.arg(0).as_u64(),
        )
    };
    if retvalue <= 0 {
        return Ok(());
    }
    let new_tid = retvalue as pid_t;

    let is_thread = match disc {
        Discriminator::ForkFork | Discriminator::ForkVfork => false,
        Discriminator::ForkClone => flags_arg & CLONE_THREAD != 0,
        other => {
            return Err(Error::Invariant(format!(
                "forking::exit called with unexpected discriminator {:?}",
                other
            )))
        }
    };
    let new_tgid = if is_thread { parent_tgid } else { new_tid };
    let parent_id = parent_id.ok_or_else(|| Error::Invariant(format!("task {} has no event identifier", task.borrow().tid)))?;

    let existing = registry.find_by_tid(new_tid);
    let new_task = match existing {
        Some(t) => {
            let was_unknown = t.borrow().status == Status::Unknown;
            {
                let mut t = t.borrow_mut();
                t.tgid = new_tgid;
                t.wd = parent_wd.clone();
                t.mode = parent_mode;
            }
            if was_unknown {
                t.borrow_mut().status = Status::Attached;
                resumer.resume_syscall(new_tid)?;
            }
            t
        }
        None => {
            let t = Task::new(new_tid, new_tgid, parent_wd.clone(), parent_mode, Status::Allocated);
            registry.insert(t)
        }
    };

    // Register with the sink unconditionally: whether the wait loop saw the
    // child's SIGSTOP first (Unknown, promoted above) or the parent's
    // syscall-exit first (absent, just allocated), this is the first time
    // either race outcome reaches `add_process` (spec §4.3.8 rationale).
    let new_id = sink.add_process(Some(parent_id), &parent_wd).map_err(Error::Sink)?;
    new_task.borrow_mut().identifier = Some(new_id);

    let (live, unattached) = registry.counts();
    log!(
        config.verbosity,
        LogInfo,
        task.borrow().tid,
        "{}: new {} {} wd={} live={} unattached={}",
        if is_thread { "clone" } else { "fork" },
        if is_thread { "thread" } else { "process" },
        new_tid,
        parent_wd,
        live,
        unattached
    );

    Ok(())
}
