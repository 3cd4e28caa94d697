use log::{error, Level, LevelFilter};
use std::path::PathBuf;
use std::process;

use scenekit::commands::{self, CommandFactory, SceneKitCommandFactory};
use scenekit::utils::logger::Logger;

fn main() {
    let matches = commands::cli().get_matches();

    let verbose = matches.get_flag("verbose");
    let logging = match matches.get_one::<PathBuf>("log-file") {
        Some(path) => Logger::init_global_logger(path, if verbose { Level::Debug } else { Level::Info }),
        None => Logger::init_console_logger(if verbose { LevelFilter::Debug } else { LevelFilter::Info }),
    };
    if let Err(e) = logging {
        eprintln!("Error setting up logger: {}", e);
        process::exit(1);
    }

    let factory = SceneKitCommandFactory::new();

    let command_result = factory.create_command(&matches);
    match command_result {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };
}
