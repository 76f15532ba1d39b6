//! Frame loop backends.
//!
//! Only the headless loop exists: the engine has no window of its own and
//! hands render snapshots to whoever embeds it.

pub mod headless;

pub use headless::HeadlessConfig;
