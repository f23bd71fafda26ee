//! CLI command implementations.

mod info;
mod init;
mod run;

pub use info::show_info;
pub use init::init_settings;
pub use run::{run_service, RunArgs};
