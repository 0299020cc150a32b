#![allow(non_snake_case)]
use RustedPlateModes::Examples::bvp_examples::bvp_examples;
use RustedPlateModes::Utils::logger::{init_logger, parse_level, timestamped_log_name};
use RustedPlateModes::numerical::ShootingBVP::plate_task::{DEFAULT_TASK, PlateTask};
use std::env;
use std::process::ExitCode;

/// plate eigenfrequency run; the task file is the first argument, without it the
/// built-in default task is used. `--example N` runs one of the bundled examples.
fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.get(1).map(String::as_str) == Some("--example") {
        let Some(example) = args.get(2).and_then(|n| n.parse::<usize>().ok()) else {
            eprintln!("usage: --example <number>");
            return ExitCode::FAILURE;
        };
        init_logger(simplelog::LevelFilter::Info, None);
        bvp_examples(example);
        return ExitCode::SUCCESS;
    }
    let task = match args.get(1) {
        Some(path) => PlateTask::from_file(path),
        None => DEFAULT_TASK.parse::<PlateTask>(),
    };
    let task = match task {
        Ok(task) => task,
        Err(e) => {
            eprintln!("cannot read task: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let level = match parse_level(&task.solver.loglevel) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let log_file = task.solver.log_to_file.then(timestamped_log_name);
    init_logger(level, log_file.as_deref());

    match task.run() {
        Ok(report) => {
            if report.frequencies.is_empty() {
                println!(
                    "no eigenfrequencies in [{}, {}]",
                    task.search.kappa_min, task.search.kappa_max
                );
            } else {
                println!("{}", report.table());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("plate run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
