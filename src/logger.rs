use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

/// Initializes the logging system from a `log4rs.yaml` configuration file.
///
/// Should be called once at the beginning of the host application's execution.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    log4rs::init_file("log4rs.yaml", Default::default())?;
    Ok(())
}

/// Initializes a console logger with a programmatic default configuration.
///
/// Intended for embedders and tests that do not ship a `log4rs.yaml`.
/// Calling it more than once is harmless; later calls are ignored.
pub fn init_console(level: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%dT%H:%M:%S%.3f)} {l} {t} - {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))?;
    if log4rs::init_config(config).is_err() {
        // Already initialized by the embedder.
        return Ok(());
    }
    Ok(())
}
