//! Settings backup and restore.

mod transfer;

pub use transfer::SettingsTransfer;
