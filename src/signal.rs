//! Interrupt handling
//!
//! A run is one blocking sequence of subprocesses, so an interrupt just ends
//! the process. Children in the same process group receive the signal too.
//! Partially written artifacts are left where they are.

/// Exit code for an interrupted run (128 + SIGINT)
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Install the SIGINT/SIGTERM handler. Call once at startup.
pub fn install() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| {
        eprintln!("\nInterrupted, aborting build.");
        std::process::exit(EXIT_CODE_INTERRUPTED);
    })
}
