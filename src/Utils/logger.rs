use chrono::Local;
use simplelog::*;
use std::fs::File;

/// "debug", "info", "warn", "error" or "off"/"none"
pub fn parse_level(level: &str) -> Result<LevelFilter, String> {
    match level.to_lowercase().as_str() {
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        "off" | "none" => Ok(LevelFilter::Off),
        other => Err(format!(
            "loglevel must be debug, info, warn, error or off, found '{}'",
            other
        )),
    }
}

/// log_<date>_<time>.txt in the working directory
pub fn timestamped_log_name() -> String {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("log_{}.txt", date_and_time)
}

/// Console logger plus, if `log_file` is given, a copy of every record in that file.
/// A logger that is already installed is kept; returns whether this call installed one.
pub fn init_logger(level: LevelFilter, log_file: Option<&str>) -> bool {
    if level == LevelFilter::Off {
        return false;
    }
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(name) = log_file {
        match File::create(name) {
            Ok(file) => loggers.push(WriteLogger::new(level, Config::default(), file)),
            Err(e) => eprintln!("cannot create log file {}: {}", name, e),
        }
    }
    CombinedLogger::init(loggers).is_ok()
}
