//! Configuration loading and service wiring for hosts embedding the wallet.

mod alias_words;
mod config;
mod wiring;

pub use alias_words::{AliasWordsLoadError, load_alias_words};
pub use config::{SettingsError, WalletSettings};
pub use wiring::{BootstrapError, RetryBounds, WalletServices, assemble_services, build_services};
