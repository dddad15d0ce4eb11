//! Chat command surface for investors and admins.

pub mod approval;
pub mod handler;
pub mod parser;
pub mod replies;

pub use approval::{apply_request, ApprovalError};
pub use handler::{CommandError, CommandHandler, CommandSettings};
pub use parser::{parse, Command, ParseError, WithdrawAmount};
