//! Logger initialization.
//!
//! The crate itself only emits through the `log` facade: resize and regrid
//! decisions at `debug`, per-region uploads at `trace`. Hosts without a
//! logger of their own can call [`init_logging`] early in `main`.

mod init;

pub use init::{init_logging, LoggingConfig};
