//! `connect`/`accept`/`accept4` and the 32-bit `socketcall` multiplexer
//! (spec §4.3.9). Grounded on `handle_accept`/`handle_connect`/
//! `syscall_socketcall`/`print_sockaddr` in
//! `examples/original_source/reprozip/native/syscalls.c`. Neither path
//! emits a structured Event Sink record — both are warning-only, per the
//! original's `print_sockaddr`-to-stderr behaviour.

use crate::abi::Mode;
use crate::config::Config;
use crate::error::Result;
use crate::log;
use crate::log::LogLevel::LogWarn;
use crate::memory::{self, TraceeMemory};
use crate::sink::EventSink;
use crate::syscall_table::Discriminator;
use crate::task::Task;

const AF_INET: u16 = libc::AF_INET as u16;
const AF_INET6: u16 = libc::AF_INET6 as u16;
const SYS_CONNECT: u64 = 3;
const SYS_ACCEPT: u64 = 5;

fn format_sockaddr(bytes: &[u8]) -> String {
    if bytes.len() < 2 {
        return "<unknown destination, truncated>".to_string();
    }
    let family = u16::from_ne_bytes([bytes[0], bytes[1]]);
    match family {
        AF_INET if bytes.len() >= 8 => {
            let port = u16::from_be_bytes([bytes[2], bytes[3]]);
            let addr = std::net::Ipv4Addr::new(bytes[4], bytes[5], bytes[6], bytes[7]);
            format!("{}:{}", addr, port)
        }
        AF_INET6 if bytes.len() >= 24 => {
            let port = u16::from_be_bytes([bytes[2], bytes[3]]);
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&bytes[8..24]);
            let addr = std::net::Ipv6Addr::from(octets);
            format!("[{}]:{}", addr, port)
        }
        other => format!("<unknown destination, sa_family={}>", other),
    }
}

fn warn_sockaddr(task: &Task, mem: &dyn TraceeMemory, config: &Config, addr_ptr: u64, len: usize) -> Result<()> {
    if addr_ptr == 0 || len < 2 {
        return Ok(());
    }
    let bytes = mem.read_bytes(task.tid, addr_ptr, len)?;
    log!(config.verbosity, LogWarn, task.tid, "remote endpoint: {}", format_sockaddr(&bytes));
    Ok(())
}

pub fn connect_exit(
    task: &mut Task,
    mem: &dyn TraceeMemory,
    _sink: &mut dyn EventSink,
    config: &Config,
    _disc: Discriminator,
) -> Result<()> {
    let addr_ptr = task.args.arg(1).as_ptr();
    let len = task.args.arg(2).as_u32() as usize;
    warn_sockaddr(task, mem, config, addr_ptr, len.min(28))
}

pub fn accept_exit(
    task: &mut Task,
    mem: &dyn TraceeMemory,
    _sink: &mut dyn EventSink,
    config: &Config,
    _disc: Discriminator,
) -> Result<()> {
    if !task.args.succeeded() {
        return Ok(());
    }
    let addr_ptr = task.args.arg(1).as_ptr();
    let len_ptr = task.args.arg(2).as_ptr();
    if addr_ptr == 0 || len_ptr == 0 {
        return Ok(());
    }
    let len = memory::read_word(mem, task.mode, task.tid, len_ptr)? as usize;
    warn_sockaddr(task, mem, config, addr_ptr, len.min(28))
}

/// 32-bit `socketcall(call, args)`: `args` is a tracee-side array of
/// word-sized values, re-fetched here since the kernel never copies them
/// into registers.
pub fn socketcall_exit(
    task: &mut Task,
    mem: &dyn TraceeMemory,
    sink: &mut dyn EventSink,
    config: &Config,
    disc: Discriminator,
) -> Result<()> {
    let call = task.args.arg(0).as_u64();
    let args_ptr = task.args.arg(1).as_ptr();
    let word = Mode::I386.word_size() as u64;
    match call {
        SYS_CONNECT => {
            let addr_ptr = memory::read_word(mem, Mode::I386, task.tid, args_ptr + word)?;
            let len = memory::read_word(mem, Mode::I386, task.tid, args_ptr + 2 * word)? as usize;
            warn_sockaddr(task, mem, config, addr_ptr, len.min(28))
        }
        SYS_ACCEPT => {
            if !task.args.succeeded() {
                return Ok(());
            }
            let addr_ptr = memory::read_word(mem, Mode::I386, task.tid, args_ptr + word)?;
            let len_ptr = memory::read_word(mem, Mode::I386, task.tid, args_ptr + 2 * word)?;
            if addr_ptr == 0 || len_ptr == 0 {
                return Ok(());
            }
            let len = memory::read_word(mem, Mode::I386, task.tid, len_ptr)? as usize;
            warn_sockaddr(task, mem, config, addr_ptr, len.min(28))
        }
        _ => {
            let _ = (sink, disc);
            Ok(())
        }
    }
}
