//! Poll cycle and the main event loop.

pub mod poller;
pub mod runtime;

pub use poller::{PollError, PollReport, Poller, PollerSettings};
pub use runtime::{install_menus, Runtime, RuntimeSettings};
