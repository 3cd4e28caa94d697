//! Scene listing command

use log::info;

use crate::api::SceneKit;
use crate::archive::LocalArchive;
use crate::commands::command_traits::Command;
use crate::config::RunConfig;
use crate::errors::SceneResult;

/// Lists the scenes a run would composite
pub struct ListScenesCommand {
    config: RunConfig,
}

impl ListScenesCommand {
    pub fn new(config: RunConfig) -> Self {
        ListScenesCommand { config }
    }
}

impl Command for ListScenesCommand {
    fn execute(&self) -> SceneResult<()> {
        let archive = LocalArchive::new(&self.config.archive);
        let scenes = SceneKit::new(self.config.clone()).list_scenes(&archive)?;
        info!("{} scenes of {} match", scenes.len(), self.config.collection);
        for scene in &scenes {
            println!("{}", scene);
        }
        Ok(())
    }
}
