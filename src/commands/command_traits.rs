//! Command pattern interfaces

use crate::errors::SceneResult;

/// An executable CLI operation
pub trait Command {
    fn execute(&self) -> SceneResult<()>;
}

/// Picks and builds the command for a set of CLI arguments
pub trait CommandFactory {
    fn create_command(&self, args: &clap::ArgMatches) -> SceneResult<Box<dyn Command>>;
}
