//! `chdir` (spec §4.3.6). Grounded on `syscall_chdir` in
//! `examples/original_source/reprozip/native/syscalls.c`.

use super::resolve_path_arg;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::memory::TraceeMemory;
use crate::sink::{EventSink, FileMode};
use crate::syscall_table::Discriminator;
use crate::task::Task;

pub fn exit(
    task: &mut Task,
    mem: &dyn TraceeMemory,
    sink: &mut dyn EventSink,
    _config: &Config,
    _disc: Discriminator,
) -> Result<()> {
    if !task.args.succeeded() {
        return Ok(());
    }
    let path = resolve_path_arg(task, mem, 0)?;
    task.wd = path.clone();
    let id = task
        .identifier
        .ok_or_else(|| Error::Invariant(format!("task {} has no event identifier", task.tid)))?;
    sink.add_file_open(id, &path, FileMode::FILE_WDIR, true)
        .map_err(Error::Sink)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::abi::Mode;
    use crate::memory::test_support::FakeTracee;
    use crate::sink::test_support::RecordingSink;
    use crate::task::Status;

    #[test]
    fn successful_chdir_updates_wd_and_emits_wdir_event() {
        let mut mem = FakeTracee::new();
        mem.put_cstr(0x1000, "/tmp");
        let mut task = Task::new(100, 100, "/home/u".to_string(), Mode::X86_64, Status::Attached);
        task.identifier = Some(7);
        task.args.set_arg(0, 0x1000u64.into());
        task.args.retvalue = 0;
        let mut sink = RecordingSink::new();
        exit(&mut task, &mem, &mut sink, &Config::default(), Discriminator::None).unwrap();
        assert_eq!(task.wd, "/tmp");
        assert_eq!(sink.events.len(), 1);
    }
}
