/*
[INPUT]:  Parsed subcommands and loaded configuration
[OUTPUT]: Subcommand implementations for the wallet-auth binary
[POS]:    CLI command layer
[UPDATE]: When adding or changing subcommands
*/

pub mod commands;
pub mod init;
