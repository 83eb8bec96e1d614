pub mod actions;
pub mod commands;
pub mod dispatch;

use anyhow::Result;

use self::actions::Action;

/// Parse the process arguments into an [`Action`].
///
/// Logs go to stderr as JSON (`RUST_LOG`, default `info`), so command output on
/// stdout stays clean.
pub fn start() -> Result<Action> {
    warden_observability::init();
    let matches = commands::new().get_matches();
    dispatch::handler(&matches)
}
