pub mod error;
pub mod config;
pub mod session;
pub mod statement;
pub mod catalog;
pub mod loader;
pub mod exec;
pub mod service;
pub mod server;
pub mod cli;

pub use error::{AppError, AppResult};
pub use service::{new_session, ChatSession, LoadReport, SessionRegistry, Submission};

// Test-only printing helper: expands to eprintln! during tests and debug builds.
// Usage: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In release builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
