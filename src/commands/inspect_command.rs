//! GeoTIFF inspection command

use std::path::PathBuf;

use crate::api::SceneKit;
use crate::commands::command_traits::Command;
use crate::errors::SceneResult;

/// Prints structure, grid and band names of a GeoTIFF
pub struct InspectCommand {
    input_file: PathBuf,
}

impl InspectCommand {
    pub fn new(input_file: PathBuf) -> Self {
        InspectCommand { input_file }
    }
}

impl Command for InspectCommand {
    fn execute(&self) -> SceneResult<()> {
        print!("{}", SceneKit::inspect(&self.input_file)?);
        Ok(())
    }
}
