use std::cell::Cell;
use std::fmt::Write;
use std::rc::Rc;

use jitwind::arch::Arch;
use jitwind::classify::{CodeRanges, Deferred};
use jitwind::command::UnwinderCommand;
use jitwind::config::Config;
use jitwind::lifecycle::Installer;
use jitwind::stdext::Stdout;
use jitwind::walk::{Session, Snapshot};
use jitwind::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const JIT_CODE: std::ops::Range<u64> = 0x7f00_0000_0000..0x7f00_1000_0000;
const NATIVE_CODE: std::ops::Range<u64> = 0x55_0000_0000..0x55_0100_0000;

/// main -> enter_tc -> three JIT frames, stopped in the innermost one.
fn stopped_target() -> Snapshot {
    let jit = |offset: u64| JIT_CODE.start + offset;
    let native = |offset: u64| NATIVE_CODE.start + offset;
    let stack = 0x7ffc_0000_0000u64;

    let mut snapshot = Snapshot::new(Arch::X86_64);
    snapshot
        .set_register("rip", jit(0x3a0))
        .set_register("rbp", stack + 0x100)
        .set_register("rsp", stack + 0x0c0)
        .add_unwind_info(NATIVE_CODE)
        .map_words(stack + 0x100, &[stack + 0x140, jit(0x2f8)])
        .map_words(stack + 0x140, &[stack + 0x180, jit(0x118)])
        .map_words(stack + 0x180, &[stack + 0x1c0, native(0x2010)])
        .map_words(stack + 0x1c0, &[stack + 0x200, native(0x1234)])
        .map_words(stack + 0x200, &[0, 0]);
    snapshot
}

fn main() {
    let registry = tracing_subscriber::Registry::default().with(
        EnvFilter::builder()
            .with_default_directive(tracing::Level::TRACE.into())
            .from_env()
            .unwrap(),
    );

    let tree_layer = tracing_tree::HierarchicalLayer::new(2)
        .with_targets(true)
        .with_bracketed_fields(true);

    registry.with(tree_layer).init();

    // Stands in for the VM's translation cache globals, readable once the
    // target is loaded.
    let symbols_loaded = Rc::new(Cell::new(false));
    let classifier = {
        let symbols_loaded = symbols_loaded.clone();
        Deferred::new(move || {
            if symbols_loaded.get() {
                Ok(CodeRanges::new(vec![JIT_CODE]))
            } else {
                Err(Error::ClassifierNotReady("no symbol \"tc_base\" in current context".into()))
            }
        })
    };

    let config = Config::default();
    let mut session = Session::new(config.clone());
    let mut command = UnwinderCommand::new(Installer::new(Rc::new(classifier), config));
    let mut out = Stdout;

    let mut run = |session: &mut Session, args: &str| {
        writeln!(out, "(gdb) unwinder {args}").unwrap();
        if let Err(err) = command.invoke(args, session, &mut out) {
            writeln!(out, "{err}").unwrap();
        }
    };

    run(&mut session, "");
    run(&mut session, "init");

    session.attach(stopped_target());
    symbols_loaded.set(true);
    run(&mut session, "init");
    run(&mut session, "init");
    run(&mut session, "frobnicate");

    let backtrace = session.backtrace().unwrap();
    write!(out, "(gdb) bt\n{backtrace}").unwrap();
}
