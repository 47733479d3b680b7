//! The `unwinder` command group.
//!
//! ```text
//! (gdb) unwinder init
//! JIT unwinder could not be initialized.
//! Has debugger startup run to completion?
//! (gdb) run
//! ...
//! (gdb) unwinder init
//! JIT unwinder has been initialized.
//! ```

use core::fmt::Write;

use crate::classify::FrameClassifier;
use crate::error::{Error, Result};
use crate::host::Debugger;
use crate::lifecycle::Installer;

pub const PREFIX: &str = "unwinder";

/// Help category the host lists the commands under.
pub const CLASS: &str = "stack";

pub const DOC: &str = "Manage the JIT unwinder.";

/// `(name, doc)` of every subcommand.
pub const SUBCOMMANDS: &[(&str, &str)] = &[("init", "Initialize the JIT unwinder.")];

pub struct UnwinderCommand<C> {
    installer: Installer<C>,
}

impl<C: FrameClassifier + 'static> UnwinderCommand<C> {
    pub fn new(installer: Installer<C>) -> Self {
        Self { installer }
    }

    pub fn installer(&self) -> &Installer<C> {
        &self.installer
    }

    /// Run `unwinder <args>`. The bare prefix lists the subcommands.
    #[instrument(level = "debug", skip(self, debugger, out))]
    pub fn invoke(
        &mut self,
        args: &str,
        debugger: &mut dyn Debugger,
        out: &mut dyn Write,
    ) -> Result<()> {
        let mut words = args.split_whitespace();
        match words.next() {
            None => help(out),
            Some("init") => {
                if let Some(extra) = words.next() {
                    debug!(extra, "ignoring arguments to `init`");
                }
                self.init(debugger, out)
            }
            Some(other) => Err(Error::UnknownCommand(other.into())),
        }
    }

    fn init(&mut self, debugger: &mut dyn Debugger, out: &mut dyn Write) -> Result<()> {
        if self.installer.ensure_installed(debugger) {
            writeln!(out, "JIT unwinder has been initialized.")?;
        } else {
            writeln!(out, "JIT unwinder could not be initialized.")?;
            writeln!(out, "Has debugger startup run to completion?")?;
        }
        Ok(())
    }
}

fn help(out: &mut dyn Write) -> Result<()> {
    writeln!(out, "{DOC}")?;
    writeln!(out)?;
    writeln!(out, "List of {PREFIX} subcommands:")?;
    writeln!(out)?;
    for (name, doc) in SUBCOMMANDS {
        writeln!(out, "{PREFIX} {name} -- {doc}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::testing::{FakeDebugger, Jitted};

    fn run(
        command: &mut UnwinderCommand<Jitted>,
        args: &str,
        debugger: &mut FakeDebugger,
    ) -> Result<String> {
        let mut out = String::new();
        command.invoke(args, debugger, &mut out)?;
        Ok(out)
    }

    #[test]
    fn init_reports_failure_then_success() {
        let jitted = Jitted::not_ready();
        let mut command = UnwinderCommand::new(Installer::new(jitted.clone(), Config::default()));
        let mut debugger = FakeDebugger::default();

        assert_eq!(
            run(&mut command, "init", &mut debugger).unwrap(),
            "JIT unwinder could not be initialized.\nHas debugger startup run to completion?\n"
        );
        assert!(!command.installer().is_installed());

        jitted.ready.set(true);
        for _ in 0..2 {
            assert_eq!(
                run(&mut command, "init", &mut debugger).unwrap(),
                "JIT unwinder has been initialized.\n"
            );
        }
        assert_eq!(debugger.registered.len(), 1);
    }

    #[test]
    fn prefix_lists_subcommands() {
        let mut command = UnwinderCommand::new(Installer::new(Jitted::new(&[]), Config::default()));
        let mut debugger = FakeDebugger::default();

        let out = run(&mut command, "", &mut debugger).unwrap();

        assert_eq!(
            out,
            "Manage the JIT unwinder.\n\nList of unwinder subcommands:\n\nunwinder init -- Initialize the JIT unwinder.\n"
        );
        assert!(debugger.registered.is_empty());
    }

    #[test]
    fn unknown_subcommand() {
        let mut command = UnwinderCommand::new(Installer::new(Jitted::new(&[]), Config::default()));

        let err = run(&mut command, "reset", &mut FakeDebugger::default()).unwrap_err();

        assert_eq!(err, Error::UnknownCommand("reset".into()));
        assert_eq!(err.to_string(), "undefined unwinder command: \"reset\"");
    }

    #[test]
    fn init_ignores_arguments() {
        let mut command = UnwinderCommand::new(Installer::new(Jitted::new(&[]), Config::default()));

        let out = run(&mut command, "  init now ", &mut FakeDebugger::default()).unwrap();

        assert_eq!(out, "JIT unwinder has been initialized.\n");
    }
}
