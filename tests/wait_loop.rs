mod common;

use std::collections::VecDeque;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

use sysgpio::gpio::{wait_for_edges, EdgeWait, Error, GpioLine, WaitOutcome};
use sysgpio::signal::ShutdownFlag;

use common::FakeSysfs;

const LINE: &str = "17";

enum Step {
    // The value descriptor became ready.
    Edge,
    // The value changed to the given contents before the edge was reported.
    EdgeWithValue(&'static [u8]),
    // A termination signal arrived and its handler ran during the wait.
    Signal,
    // Another signal interrupted the wait without requesting a shutdown.
    StraySignal,
    Error(i32),
    Report(usize, RawFd),
}

struct ScriptedWaiter<'a> {
    fd: RawFd,
    sysfs: &'a FakeSysfs,
    shutdown: &'a ShutdownFlag,
    // Set the shutdown flag while blocked in this wait (1-based).
    shutdown_on_wait: Option<usize>,
    script: VecDeque<Step>,
    waits: usize,
}

impl<'a> ScriptedWaiter<'a> {
    fn new<T: AsRawFd>(
        line: &T,
        sysfs: &'a FakeSysfs,
        shutdown: &'a ShutdownFlag,
        script: Vec<Step>,
    ) -> ScriptedWaiter<'a> {
        ScriptedWaiter {
            fd: line.as_raw_fd(),
            sysfs,
            shutdown,
            shutdown_on_wait: None,
            script: script.into(),
            waits: 0,
        }
    }
}

impl EdgeWait for ScriptedWaiter<'_> {
    fn wait(&mut self, ready: &mut [RawFd]) -> io::Result<usize> {
        self.waits += 1;
        if self.shutdown_on_wait == Some(self.waits) {
            self.shutdown.request();
        }

        match self.script.pop_front().expect("wait called more often than scripted") {
            Step::Edge => {
                ready[0] = self.fd;
                Ok(1)
            }
            Step::EdgeWithValue(value) => {
                self.sysfs.set_value(LINE, value);
                ready[0] = self.fd;
                Ok(1)
            }
            Step::Signal => {
                self.shutdown.request();
                Err(io::Error::from_raw_os_error(libc::EINTR))
            }
            Step::StraySignal => Err(io::Error::from_raw_os_error(libc::EINTR)),
            Step::Error(errno) => Err(io::Error::from_raw_os_error(errno)),
            Step::Report(count, fd) => {
                if count > 0 {
                    ready[0] = fd;
                }
                Ok(count)
            }
        }
    }
}

fn run(
    sysfs: &FakeSysfs,
    shutdown: &ShutdownFlag,
    shutdown_on_wait: Option<usize>,
    script: Vec<Step>,
) -> (WaitOutcome, String, usize) {
    let mut line = GpioLine::with_control_files(LINE, sysfs).unwrap();
    let mut waiter = ScriptedWaiter::new(&line, sysfs, shutdown, script);
    waiter.shutdown_on_wait = shutdown_on_wait;

    let mut seen = String::new();
    let outcome = wait_for_edges(&mut line, &mut waiter, shutdown, |value| {
        seen.push(value as char)
    });

    (outcome, seen, waiter.waits)
}

#[test]
fn shutdown_stops_after_second_value_without_further_emission() {
    let sysfs = FakeSysfs::new();
    let shutdown = ShutdownFlag::new();

    let (outcome, seen, waits) = run(&sysfs, &shutdown, Some(2), vec![Step::Edge, Step::Edge]);

    assert!(matches!(outcome, WaitOutcome::Shutdown));
    assert_eq!(seen, "11");
    assert_eq!(waits, 2);
}

#[test]
fn each_edge_reports_the_current_value() {
    let sysfs = FakeSysfs::new();
    let shutdown = ShutdownFlag::new();

    let (outcome, seen, _) = run(
        &sysfs,
        &shutdown,
        Some(3),
        vec![
            Step::EdgeWithValue(b"0\n"),
            Step::EdgeWithValue(b"1\n"),
            Step::Edge,
        ],
    );

    assert!(matches!(outcome, WaitOutcome::Shutdown));
    assert_eq!(seen, "101");
}

#[test]
fn pending_value_is_reported_before_blocking() {
    let sysfs = FakeSysfs::new();
    let shutdown = ShutdownFlag::new();
    shutdown.request();

    let (outcome, seen, waits) = run(&sysfs, &shutdown, None, vec![Step::Edge]);

    assert!(matches!(outcome, WaitOutcome::Shutdown));
    assert_eq!(seen, "1");
    assert_eq!(waits, 1);
}

#[test]
fn signal_during_wait_ends_loop_as_interrupted() {
    let sysfs = FakeSysfs::new();
    let shutdown = ShutdownFlag::new();

    let (outcome, seen, waits) = run(&sysfs, &shutdown, None, vec![Step::Edge, Step::Signal]);

    assert!(matches!(outcome, WaitOutcome::Interrupted));
    assert!(shutdown.is_set());
    assert_eq!(seen, "11");
    assert_eq!(waits, 2);
}

#[test]
fn stray_signal_is_not_retried() {
    let sysfs = FakeSysfs::new();
    let shutdown = ShutdownFlag::new();

    let (outcome, seen, waits) = run(&sysfs, &shutdown, None, vec![Step::StraySignal]);

    assert!(matches!(outcome, WaitOutcome::Interrupted));
    assert!(!outcome.is_failure());
    assert!(!shutdown.is_set());
    assert_eq!(seen, "1");
    assert_eq!(waits, 1);
}

#[test]
fn wait_errors_are_failures() {
    let sysfs = FakeSysfs::new();
    let shutdown = ShutdownFlag::new();

    let (outcome, _, _) = run(&sysfs, &shutdown, None, vec![Step::Error(libc::ENOMEM)]);

    match outcome {
        WaitOutcome::Failed(ref err) => {
            assert!(matches!(err, Error::Io { op: "epoll_wait", .. }));
            assert_eq!(err.errno(), libc::ENOMEM);
        }
        ref other => panic!("unexpected outcome: {}", other),
    }
}

#[test]
fn wrong_descriptor_is_a_protocol_violation() {
    let sysfs = FakeSysfs::new();
    let shutdown = ShutdownFlag::new();

    let (outcome, seen, _) = run(&sysfs, &shutdown, None, vec![Step::Report(1, 9999)]);

    assert_eq!(seen, "1");
    assert_eq!(outcome.into_result().unwrap_err().errno(), libc::EIO);
}

#[test]
fn unexpected_ready_count_is_a_protocol_violation() {
    let sysfs = FakeSysfs::new();
    let shutdown = ShutdownFlag::new();

    let (outcome, _, _) = run(&sysfs, &shutdown, None, vec![Step::Report(0, -1)]);

    assert!(outcome.is_failure());
    assert_eq!(outcome.into_result().unwrap_err().errno(), libc::EIO);
}

#[test]
fn read_failure_stops_before_emitting() {
    let sysfs = FakeSysfs::with_initial_value(b"");
    let shutdown = ShutdownFlag::new();

    let (outcome, seen, waits) = run(&sysfs, &shutdown, None, vec![]);

    match outcome {
        WaitOutcome::Failed(Error::Io { op, .. }) => assert_eq!(op, "read"),
        ref other => panic!("unexpected outcome: {}", other),
    }
    assert!(seen.is_empty());
    assert_eq!(waits, 0);
}

#[test]
fn line_is_still_released_after_the_loop() {
    let sysfs = FakeSysfs::new();
    let shutdown = ShutdownFlag::new();

    let (outcome, _, _) = run(&sysfs, &shutdown, None, vec![Step::Error(libc::EBADF)]);

    assert!(outcome.is_failure());
    assert!(!sysfs.is_exported(LINE));
    assert_eq!(sysfs.count_writes("unexport"), 1);
}
