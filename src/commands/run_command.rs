//! Full compositing run

use log::info;

use crate::api::SceneKit;
use crate::commands::command_traits::Command;
use crate::config::RunConfig;
use crate::errors::SceneResult;

pub struct RunCommand {
    config: RunConfig,
}

impl RunCommand {
    pub fn new(config: RunConfig) -> Self {
        RunCommand { config }
    }
}

impl Command for RunCommand {
    fn execute(&self) -> SceneResult<()> {
        let report = SceneKit::new(self.config.clone()).run_local()?;
        info!("Composited {} scenes", report.scene_ids.len());
        for export in &report.exports {
            println!("{} ({}x{}, {} band(s))", export.path.display(), export.grid.width, export.grid.height, export.bands);
        }
        for quicklook in &report.quicklooks {
            println!("{}", quicklook.display());
        }
        Ok(())
    }
}
