use crate::config::Config;
use crate::lifecycle::{InstallState, Installer};
use crate::testing::{broken, FakeDebugger, Jitted};

#[test]
fn installs_once() {
    let jitted = Jitted::new(&[0x4000]);
    let mut installer = Installer::new(jitted.clone(), Config::default());
    let mut debugger = FakeDebugger::default();

    assert!(installer.ensure_installed(&mut debugger));
    assert!(installer.ensure_installed(&mut debugger));

    assert_eq!(debugger.registered.len(), 1);
    assert_eq!(debugger.registered[0].name(), "jit_unwinder");
    assert_eq!(installer.state(), InstallState::Installed);
    // The second call doesn't query the classifier again.
    assert_eq!(jitted.queries.get(), 1);
}

#[test]
fn waits_for_classifier() {
    let jitted = Jitted::not_ready();
    let mut installer = Installer::new(jitted.clone(), Config::default());
    let mut debugger = FakeDebugger::default();

    assert!(!installer.ensure_installed(&mut debugger));
    assert!(!installer.ensure_installed(&mut debugger));
    assert_eq!(installer.state(), InstallState::Uninitialized);
    assert!(debugger.registered.is_empty());

    jitted.ready.set(true);
    assert!(installer.ensure_installed(&mut debugger));
    assert!(installer.is_installed());
    assert_eq!(debugger.registered.len(), 1);
}

#[test]
fn never_ready() {
    let mut installer = Installer::new(broken(), Config::default());
    let mut debugger = FakeDebugger::default();

    for _ in 0..3 {
        assert!(!installer.ensure_installed(&mut debugger));
    }
    assert!(debugger.registered.is_empty());
}

#[test]
fn refused_registration_can_be_retried() {
    let mut installer = Installer::new(Jitted::new(&[]), Config::default());
    let mut debugger = FakeDebugger {
        refuse_registration: true,
        ..Default::default()
    };

    assert!(!installer.ensure_installed(&mut debugger));
    assert_eq!(installer.state(), InstallState::Uninitialized);

    debugger.refuse_registration = false;
    assert!(installer.ensure_installed(&mut debugger));
}

#[test]
fn installers_are_independent() {
    let jitted = Jitted::new(&[]);
    let mut first = Installer::new(jitted.clone(), Config::default());
    let second = Installer::new(jitted, Config::default());

    assert!(first.ensure_installed(&mut FakeDebugger::default()));
    assert!(!second.is_installed());
}

#[test]
fn registers_under_configured_name() {
    let config = Config {
        unwinder_name: "vm_unwinder".into(),
        ..Config::default()
    };
    let mut installer = Installer::new(Jitted::new(&[]), config);
    let mut debugger = FakeDebugger::default();

    assert!(installer.ensure_installed(&mut debugger));
    assert_eq!(debugger.registered[0].name(), "vm_unwinder");
}
