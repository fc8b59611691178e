use KiPlex::Examples::plex_examples::plex_examples;
use log::{LevelFilter, error};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

pub fn main() {
    let _ = TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
    //
    let task: usize = 1;
    if let Err(e) = plex_examples(task) {
        error!("example {} failed: {}", task, e);
    }
}
