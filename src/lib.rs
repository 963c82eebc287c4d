//! Local companion daemon and cli for the Touchgrass wellness app. The daemon
//! owns a single JSON document of user state, pays out focus points for
//! healthy habits, and serves everything to local UIs over a small HTTP
//! bridge.

pub mod cli;
pub mod daemon;
pub mod economy;
pub mod oracle;
pub mod store;
pub mod utils;
