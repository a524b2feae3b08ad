/*
[INPUT]:  Command-line front end modules
[OUTPUT]: Configuration loading and terminal prompts for the wallet-auth binary
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod approver;
pub mod config;

pub use approver::TerminalApprover;
pub use config::{AppConfig, TimeoutConfig};
