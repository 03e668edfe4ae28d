//! `execve` entry/exit pair (spec §4.3.7) — the subtlest handler in the
//! crate. Grounded on `syscall_execve_in`/`syscall_execve_out` in
//! `examples/original_source/reprozip/native/syscalls.c`.
//!
//! Unlike every other handler, `exit` needs the process registry (to find
//! the original caller when the exit stop lands on a different task than
//! the entry did, spec §4.3.7 step 2) and the Proc Scraper (step 4), so it
//! does not share the generic `ExitHandler` signature; the dispatch engine
//! calls it directly instead of through the syscall table (see
//! `crate::handlers`' module doc comment).

use crate::abi::SupportedArch;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::log;
use crate::log::LogLevel::LogInfo;
use crate::memory::{self, TraceeMemory};
use crate::registry::Registry;
use crate::sink::{EventSink, ProcScraper};
use crate::task::{ExecveScratch, Mode, Status, Task, TaskSharedPtr};

/// Entry: deep-copies the binary path, argv, and envp out of the tracee and
/// stashes them in `task.syscall_info` until the matching exit (spec
/// §4.3.7, "Entry deep-copies..."). Shares the generic `EntryHandler`
/// signature since capturing scratch never needs the registry.
pub fn entry(task: &mut Task, mem: &dyn TraceeMemory, config: &Config) -> Result<()> {
    let binary = memory::read_cstring(mem, task.tid, task.args.arg(0).as_ptr())?;
    let argv = memory::read_strarray(mem, task.mode, task.tid, task.args.arg(1).as_ptr())?;
    let envp = memory::read_strarray(mem, task.mode, task.tid, task.args.arg(2).as_ptr())?;
    log!(
        config.verbosity,
        LogInfo,
        task.tid,
        "execve entry: {} argv={:?}{}",
        binary,
        argv,
        if config.log_secrets {
            format!(" envp={:?}", envp)
        } else {
            format!(" envp_count={}", envp.len())
        }
    );
    task.syscall_info = Some(ExecveScratch { binary, argv, envp });
    Ok(())
}

/// Exit: implements the five-step algorithm of spec §4.3.7.
///
/// `resolved_abi` is the ABI table the dispatch engine actually resolved
/// this exit stop under (after the 32/64 transition workaround, spec §4.6
/// step 4) and becomes the task's re-evaluated `mode` on a successful
/// execve (spec §3, "`mode` ... re-evaluated on successful execve").
pub fn exit(
    task: &TaskSharedPtr,
    registry: &mut Registry,
    sink: &mut dyn EventSink,
    scraper: &mut dyn ProcScraper,
    config: &Config,
    resolved_abi: SupportedArch,
) -> Result<()> {
    let own_scratch = task.borrow_mut().syscall_info.take();
    let scratch = match own_scratch {
        Some(s) => s,
        None => {
            // spec §4.3.7 step 2: the exit landed on a different task than
            // the entry. Find the original caller among this task's thread
            // group and treat it as having vanished.
            let (tgid, execve_syscall) = {
                let t = task.borrow();
                (t.tgid, t.current_syscall)
            };
            let caller = registry.find_execve_sibling(tgid, execve_syscall).ok_or_else(|| {
                Error::Invariant(format!(
                    "execve exit on tid {} (tgid {}) found no pending scratch on self or any sibling",
                    task.borrow().tid,
                    tgid
                ))
            })?;
            let scratch = caller
                .borrow_mut()
                .syscall_info
                .take()
                .ok_or_else(|| Error::Invariant("execve sibling lost its scratch between lookup and use".to_string()))?;
            let (caller_id, caller_tid) = {
                let c = caller.borrow();
                (
                    c.identifier
                        .ok_or_else(|| Error::Invariant(format!("execve sibling {} has no event identifier", c.tid)))?,
                    c.tid,
                )
            };
            sink.add_exit(caller_id, 0).map_err(Error::Sink)?;
            caller.borrow_mut().status = Status::Free;
            log!(
                config.verbosity,
                LogInfo,
                caller_tid,
                "execve-ing thread vanished into its thread group leader"
            );
            scratch
        }
    };

    let retvalue = task.borrow().args.retvalue;
    if retvalue < 0 {
        log!(config.verbosity, LogInfo, task.borrow().tid, "execve({}) failed, retval={}", scratch.binary, retvalue);
        return Ok(());
    }

    task.borrow_mut().mode = match resolved_abi {
        SupportedArch::I386 => Mode::I386,
        SupportedArch::X86_64 | SupportedArch::X86_64X32 => Mode::X86_64,
    };

    let (id, tid, wd) = {
        let t = task.borrow();
        (
            t.identifier
                .ok_or_else(|| Error::Invariant(format!("task {} has no event identifier", t.tid)))?,
            t.tid,
            t.wd.clone(),
        )
    };

    log!(
        config.verbosity,
        LogInfo,
        tid,
        "exec: {} argv={:?}{}",
        scratch.binary,
        scratch.argv,
        if config.log_secrets {
            format!(" envp={:?}", scratch.envp)
        } else {
            format!(" envp_count={}", scratch.envp.len())
        }
    );

    sink.add_exec(id, &scratch.binary, &scratch.argv, &scratch.envp, &wd)
        .map_err(Error::Sink)?;
    scraper.add_files_from_proc(id, tid, &scratch.binary).map_err(Error::Sink)
}
