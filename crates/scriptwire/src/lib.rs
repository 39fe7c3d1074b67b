//! Expose script commands to a host process over stdin/stdout.
//!
//! # Crate Structure
//!
//! - [`frame`]: Newline-delimited JSON envelope framing
//! - [`bridge`]: Command registry, permission checks and dispatch (behind `bridge` feature)

/// Re-export frame types.
pub mod frame {
    pub use scriptwire_frame::*;
}

/// Re-export bridge types (requires `bridge` feature).
#[cfg(feature = "bridge")]
pub mod bridge {
    pub use scriptwire_bridge::*;
}
