// Installs process-wide signal handlers, so it runs in its own test binary.

use std::mem;
use std::ptr;

use sysgpio::signal::{self, SHUTDOWN_SIGNALS};

fn current_handler(signum: libc::c_int) -> libc::sighandler_t {
    let mut action: libc::sigaction = unsafe { mem::zeroed() };
    assert_eq!(
        unsafe { libc::sigaction(signum, ptr::null(), &mut action) },
        0
    );
    action.sa_sigaction
}

#[test]
fn first_signal_requests_shutdown_and_resets_handler() {
    let shutdown = signal::shutdown_flag();
    assert!(!shutdown.is_set());

    signal::install_handlers().unwrap();

    for &(signum, name) in SHUTDOWN_SIGNALS.iter() {
        assert_ne!(current_handler(signum), libc::SIG_DFL, "{} not installed", name);
    }

    assert_eq!(unsafe { libc::raise(libc::SIGUSR2) }, 0);

    assert!(shutdown.is_set());
    assert_eq!(current_handler(libc::SIGUSR2), libc::SIG_DFL);
    assert_ne!(current_handler(libc::SIGUSR1), libc::SIG_DFL);

    // Leave the process with default dispositions.
    for &(signum, _) in SHUTDOWN_SIGNALS.iter() {
        unsafe {
            libc::signal(signum, libc::SIG_DFL);
        }
    }
    shutdown.clear();
}
