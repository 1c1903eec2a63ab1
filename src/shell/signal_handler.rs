use log::debug;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const ENTER_FOREGROUND_ONLY: &str = "Entering foreground-only mode (& is now ignored)";
pub const EXIT_FOREGROUND_ONLY: &str = "Exiting foreground-only mode (& is now allowed)";

// Number of SIGTSTP deliveries not yet applied to a ShellMode.
static PENDING_TOGGLES: AtomicUsize = AtomicUsize::new(0);

pub struct SignalHandler;

impl SignalHandler {
    /// The shell ignores SIGINT outright and counts SIGTSTP.
    ///
    /// SIGTSTP is installed without `SA_RESTART`, so a blocking `read` or
    /// `waitpid` returns `EINTR` and the loop can print the mode notice
    /// straight away instead of after the next line of input.
    pub fn initialize() -> Result<(), nix::Error> {
        debug!("Initializing signal handlers");

        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        unsafe { signal::sigaction(Signal::SIGINT, &ignore)? };

        let sigtstp_action = SigAction::new(
            SigHandler::Handler(Self::handle_sigtstp),
            SaFlags::empty(),
            SigSet::empty(),
        );
        unsafe { signal::sigaction(Signal::SIGTSTP, &sigtstp_action)? };

        Ok(())
    }

    extern "C" fn handle_sigtstp(_: libc::c_int) {
        PENDING_TOGGLES.fetch_add(1, Ordering::SeqCst);
    }

    pub fn has_pending_toggles() -> bool {
        PENDING_TOGGLES.load(Ordering::SeqCst) > 0
    }

    pub fn take_pending_toggles() -> usize {
        PENDING_TOGGLES.swap(0, Ordering::SeqCst)
    }

    /// Signal dispositions for a freshly forked child, set before exec.
    /// Foreground children die on SIGINT, background ones ignore it;
    /// no child ever stops on SIGTSTP.
    pub fn configure_child(background: bool) -> Result<(), nix::Error> {
        let sigint = if background {
            SigHandler::SigIgn
        } else {
            SigHandler::SigDfl
        };
        let sigint_action = SigAction::new(sigint, SaFlags::empty(), SigSet::empty());
        unsafe { signal::sigaction(Signal::SIGINT, &sigint_action)? };

        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        unsafe { signal::sigaction(Signal::SIGTSTP, &ignore)? };

        Ok(())
    }
}

/// Whether `&` is honored. Only changed by applying SIGTSTP toggles.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShellMode {
    foreground_only: bool,
}

impl ShellMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_foreground_only(&self) -> bool {
        self.foreground_only
    }

    pub fn allows_background(&self) -> bool {
        !self.foreground_only
    }

    fn toggle(&mut self) -> &'static str {
        self.foreground_only = !self.foreground_only;
        if self.foreground_only {
            ENTER_FOREGROUND_ONLY
        } else {
            EXIT_FOREGROUND_ONLY
        }
    }

    /// Applies `count` toggles in order and returns the notice for each one.
    pub fn apply_toggles(&mut self, count: usize) -> Vec<&'static str> {
        (0..count).map(|_| self.toggle()).collect()
    }

    /// Drains toggles delivered since the last call.
    pub fn apply_pending(&mut self) -> Vec<&'static str> {
        let count = SignalHandler::take_pending_toggles();
        if count > 0 {
            debug!("Applying {} pending SIGTSTP toggle(s)", count);
        }
        self.apply_toggles(count)
    }
}
