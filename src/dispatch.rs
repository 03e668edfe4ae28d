//! The dispatch engine: `handle_syscall(task)` (spec §4.4 "Dispatch
//! Engine", §4.6). The single entry point the outer attach/wait loop (out
//! of scope for this crate) calls once per observed syscall stop.
//!
//! Grounded on `syscall_handle` in
//! `examples/original_source/reprozip/native/syscalls.c` for the seven-step
//! algorithm, and on `examples/isgasho-rd/src/replay_syscall.rs` for the
//! general "resolve syscall, dispatch entry/exit, resume" shape of a ptrace
//! dispatch loop body in idiomatic Rust (`ed_assert!`-style invariant
//! checks replaced with `Error::Invariant`, spec §6b).

use crate::abi::{self, SupportedArch, X32_SYSCALL_BIT};
use crate::config::Config;
use crate::error::Result;
use crate::handlers;
use crate::log;
use crate::log::LogLevel::{LogDebug, LogTrace, LogWarn};
use crate::memory::TraceeMemory;
use crate::registry::Registry;
use crate::resume::Resumer;
use crate::sink::{EventSink, ProcScraper};
use crate::syscall_table::{Discriminator, SyscallTables};
use crate::task::{Mode, Task, TaskSharedPtr};

/// execve's syscall number on the I386 table (spec §4.6 step 4, GLOSSARY).
const EXECVE_I386_NUMBER: i64 = abi::i386::EXECVE;
/// execve's syscall number on either 64-bit table.
const EXECVE_X86_64_NUMBER: i64 = 59;

fn abi_for(task: &Task) -> SupportedArch {
    match task.mode {
        Mode::I386 => SupportedArch::I386,
        Mode::X86_64 => {
            if task.current_syscall & X32_SYSCALL_BIT != 0 {
                SupportedArch::X86_64X32
            } else {
                SupportedArch::X86_64
            }
        }
    }
}

/// Entry point. Resolves the task's current syscall against the right ABI
/// table, applies the execve ABI-transition workaround, dispatches to the
/// resolved entry- or exit-handler, flips `in_syscall`, and resumes the
/// task toward its next syscall stop.
///
/// Returns failure if any handler or sink call failed (spec §4.6, "Return
/// failure if any handler or sink call failed; the outer loop then tears
/// down"); a `TraceeVanished` error from a handler is already swallowed by
/// the handler itself where the spec calls for it (§7), so any error this
/// function returns is a sink failure or an invariant violation.
pub fn handle_syscall(
    registry: &mut Registry,
    task: &TaskSharedPtr,
    mem: &dyn TraceeMemory,
    sink: &mut dyn EventSink,
    scraper: &mut dyn ProcScraper,
    resumer: &dyn Resumer,
    config: &Config,
) -> Result<()> {
    let (tid, tgid, in_syscall, raw_number) = {
        let t = task.borrow();
        (t.tid, t.tgid, t.in_syscall, t.current_syscall)
    };

    let index = raw_number & !X32_SYSCALL_BIT;
    if index < 0 || index >= abi::SYSCALL_SANITY_CEILING {
        log!(config.verbosity, LogWarn, tid, "syscall index {} out of range, skipping dispatch", index);
        resumer.resume_syscall(tid)?;
        return Ok(());
    }

    let mut abi = abi_for(&task.borrow());

    // spec §4.6 step 4: the kernel may report execve's exit under the
    // target architecture's ABI regardless of the entry ABI. If this looks
    // like that transition and a sibling thread (which may be this same
    // task, pre-exec) is genuinely mid-execve with this exact syscall
    // number, force the table to the *transition's target* ABI — not the
    // matched task's own `mode`, which is exactly the field this quirk
    // leaves stale until `execve::exit` runs (examples/original_source/
    // reprozip/native/syscalls.c:951-976 hardcodes the target table for the
    // same reason).
    let is_execve_transition_candidate = (abi == SupportedArch::I386 && index == EXECVE_X86_64_NUMBER)
        || (abi != SupportedArch::I386 && index == EXECVE_I386_NUMBER);
    if is_execve_transition_candidate {
        if registry.find_execve_sibling(tgid, raw_number).is_some() {
            abi = if index == EXECVE_X86_64_NUMBER {
                SupportedArch::X86_64
            } else {
                SupportedArch::I386
            };
        }
    }

    let table = SyscallTables::for_abi(abi);
    let entry = table.get(index);

    log!(
        config.verbosity,
        LogTrace,
        tid,
        "syscall #{} abi={:?} edge={}",
        index,
        abi,
        if in_syscall { "exit" } else { "entry" }
    );

    if let Some(entry) = entry {
        if !in_syscall {
            if entry.name == "execve" {
                handlers::execve::entry(&mut task.borrow_mut(), mem, config)?;
            } else if let Some(f) = entry.entry {
                f(&mut task.borrow_mut(), mem, config)?;
            }
        } else {
            log!(
                config.verbosity,
                LogDebug,
                tid,
                "handled syscall: {} args={:?} ret={}",
                entry.name,
                task.borrow().args,
                task.borrow().args.retvalue
            );
            match entry.discriminator {
                Discriminator::ForkFork | Discriminator::ForkVfork | Discriminator::ForkClone => {
                    handlers::forking::exit(registry, task, mem, sink, resumer, config, entry.discriminator)?;
                }
                _ if entry.name == "execve" => {
                    handlers::execve::exit(task, registry, sink, scraper, config, abi)?;
                }
                _ => {
                    if let Some(f) = entry.exit {
                        f(&mut task.borrow_mut(), mem, sink, config, entry.discriminator)?;
                    }
                }
            }
        }
    } else {
        log!(config.verbosity, LogTrace, tid, "no table entry for syscall index {}", index);
    }

    {
        let mut t = task.borrow_mut();
        t.in_syscall = !t.in_syscall;
        if !t.in_syscall {
            t.current_syscall = -1;
            t.syscall_info = None;
        }
    }

    resumer.resume_syscall(tid)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::abi::Mode as AbiMode;
    use crate::memory::test_support::FakeTracee;
    use crate::resume::test_support::RecordingResumer;
    use crate::sink::test_support::RecordingSink;
    use crate::task::{Status, Task};

    fn attached(tid: i32, wd: &str) -> TaskSharedPtr {
        let t = Task::new(tid, tid, wd.to_string(), AbiMode::X86_64, Status::Attached).shared();
        t.borrow_mut().identifier = Some(tid as u64);
        t
    }

    #[test]
    fn simple_open_emits_one_file_open_event() {
        let mut registry = Registry::new();
        let task = attached(100, "/home/u");
        let mut mem = FakeTracee::new();
        mem.put_cstr(0x1000, "data.txt");

        task.borrow_mut().in_syscall = false;
        task.borrow_mut().current_syscall = crate::abi::x86_64::OPEN;
        task.borrow_mut().args.set_arg(0, 0x1000u64.into());
        task.borrow_mut().args.set_arg(1, (libc::O_RDONLY as u64).into());

        let mut sink = RecordingSink::new();
        let mut scraper = RecordingSink::new();
        let resumer = RecordingResumer::new();

        // entry stop: open has no entry-handler, nothing should happen yet.
        handle_syscall(&mut registry, &task, &mem, &mut sink, &mut scraper, &resumer, &Config::default()).unwrap();
        assert!(sink.events.is_empty());
        assert!(task.borrow().in_syscall);

        task.borrow_mut().args.retvalue = 3;
        handle_syscall(&mut registry, &task, &mem, &mut sink, &mut scraper, &resumer, &Config::default()).unwrap();
        assert_eq!(sink.events.len(), 1);
        assert!(!task.borrow().in_syscall);
        assert_eq!(resumer.resumed.borrow().as_slice(), &[100, 100]);
    }

    #[test]
    fn out_of_range_syscall_index_is_skipped_without_dispatch() {
        let mut registry = Registry::new();
        let task = attached(100, "/home/u");
        task.borrow_mut().current_syscall = 2000;
        let mem = FakeTracee::new();
        let mut sink = RecordingSink::new();
        let mut scraper = RecordingSink::new();
        let resumer = RecordingResumer::new();
        handle_syscall(&mut registry, &task, &mem, &mut sink, &mut scraper, &resumer, &Config::default()).unwrap();
        assert!(sink.events.is_empty());
        assert_eq!(resumer.resumed.borrow().as_slice(), &[100]);
    }

    #[test]
    fn negative_syscall_index_is_skipped_without_dispatch() {
        let mut registry = Registry::new();
        let task = attached(100, "/home/u");
        task.borrow_mut().current_syscall = -1;
        let mem = FakeTracee::new();
        let mut sink = RecordingSink::new();
        let mut scraper = RecordingSink::new();
        let resumer = RecordingResumer::new();
        handle_syscall(&mut registry, &task, &mem, &mut sink, &mut scraper, &resumer, &Config::default()).unwrap();
        assert!(sink.events.is_empty());
    }

    #[test]
    fn execve_abi_transition_dispatches_against_sibling_table() {
        let mut registry = Registry::new();
        // Leader observed entering under the 32-bit table's execve number,
        // but the exit stop reports syscall 59 (the 64-bit number). A
        // sibling thread is mid-execve with syscall 59 under the 64-bit
        // ABI, so the exit should be resolved via that table (spec §4.6
        // step 4) and land on `handlers::execve::exit`'s sibling-search
        // path, not silently miss the execve row.
        let leader = attached(100, "/home/u");
        leader.borrow_mut().mode = AbiMode::I386;
        leader.borrow_mut().in_syscall = true;
        leader.borrow_mut().current_syscall = EXECVE_X86_64_NUMBER;
        leader.borrow_mut().args.retvalue = 0;
        registry.insert_shared(leader.clone());

        let caller = attached(101, "/home/u");
        caller.borrow_mut().tgid = 100;
        caller.borrow_mut().in_syscall = true;
        caller.borrow_mut().current_syscall = EXECVE_X86_64_NUMBER;
        caller.borrow_mut().syscall_info = Some(crate::task::ExecveScratch {
            binary: "/bin/ls".to_string(),
            argv: vec![],
            envp: vec![],
        });
        registry.insert_shared(caller.clone());

        let mem = FakeTracee::new();
        let mut sink = RecordingSink::new();
        let mut scraper = RecordingSink::new();
        let resumer = RecordingResumer::new();
        handle_syscall(&mut registry, &leader, &mem, &mut sink, &mut scraper, &resumer, &Config::default()).unwrap();

        assert_eq!(caller.borrow().status, Status::Free);
        assert!(sink
            .events
            .iter()
            .any(|e| matches!(e, crate::sink::test_support::RecordedEvent::AddExec { .. })));
    }

    #[test]
    fn execve_abi_transition_on_a_single_task_still_emits_exec() {
        // The common single-threaded-execve case: no other task in the
        // registry, the "sibling" `find_execve_sibling` matches is this
        // same task, pre-exec, with its still-stale `mode`. The resolved
        // ABI must come from which branch matched (59 -> X86_64, 11 ->
        // I386), never from the matched task's own `mode` — that field is
        // exactly what's unreliable mid-transition (spec §4.6 step 4).
        let mut registry = Registry::new();
        let task = attached(100, "/home/u");
        task.borrow_mut().mode = AbiMode::I386;
        registry.insert_shared(task.clone());

        let mut mem = FakeTracee::new();
        mem.put_cstr(0x1000, "/bin/ls");
        mem.put_ptr(0x3000, AbiMode::X86_64, 0);
        mem.put_ptr(0x4000, AbiMode::X86_64, 0);
        task.borrow_mut().args.set_arg(0, 0x1000u64.into());
        task.borrow_mut().args.set_arg(1, 0x3000u64.into());
        task.borrow_mut().args.set_arg(2, 0x4000u64.into());

        let mut sink = RecordingSink::new();
        let mut scraper = RecordingSink::new();
        let resumer = RecordingResumer::new();

        // Entry stop, observed in-ABI under the 32-bit table.
        task.borrow_mut().in_syscall = false;
        task.borrow_mut().current_syscall = crate::abi::i386::EXECVE;
        handle_syscall(&mut registry, &task, &mem, &mut sink, &mut scraper, &resumer, &Config::default()).unwrap();
        assert!(task.borrow().syscall_info.is_some());

        // Exit stop, reported under the 64-bit execve number (the
        // transition quirk). `mode` is still `I386` at this point.
        task.borrow_mut().current_syscall = EXECVE_X86_64_NUMBER;
        task.borrow_mut().args.retvalue = 0;
        handle_syscall(&mut registry, &task, &mem, &mut sink, &mut scraper, &resumer, &Config::default()).unwrap();

        assert!(sink
            .events
            .iter()
            .any(|e| matches!(e, crate::sink::test_support::RecordedEvent::AddExec { .. })));
        assert!(scraper
            .events
            .iter()
            .any(|e| matches!(e, crate::sink::test_support::RecordedEvent::AddFilesFromProc { .. })));
        assert_eq!(task.borrow().mode, AbiMode::X86_64);
    }
}
