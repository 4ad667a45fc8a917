//! Entrypoint for CLI
mod clock;
mod config;
mod error;

use std::{env, error::Error, fs, time::Instant};

use chip8_vm::{constants::*, prelude::*, IMPL_VERSION};
use log::{debug, error, info, LevelFilter};

use self::{
    clock::{Clock, Hz},
    config::CliConf,
    error::AppError,
};

static USAGE: &str = r#"
usage: chip8 CMD FILE [CONFIG]

commands:
    run     Run the target ROM file headless, then print the display
    dis     Disassemble the target ROM into readable assembly

examples:
    chip8 run breakout.rom
    chip8 run breakout.rom breakout.yaml
    chip8 dis breakout.rom
"#;

fn run_rom(filepath: &str, conf: CliConf) -> Result<(), AppError> {
    info!("running {filepath}");

    let rom = fs::read(filepath)?;

    let mut vm = Chip8Vm::new(conf.vm.clone())?;
    vm.load_rom(&rom)?;

    for key in conf.keys()? {
        vm.set_key(key, true);
    }

    let mut clock = Clock::new(Hz(DELAY_FREQUENCY));
    let mut buzzer_state = false;
    let mut result = Ok(());

    let start = Instant::now();
    'frames: for frame in 0..conf.frames {
        for _ in 0..conf.cycles_per_frame {
            if let Err(err) = vm.cycle() {
                error!("frame {frame}: {err}");
                result = Err(err);
                break 'frames;
            }
        }

        vm.tick_timers();

        // Buzzer should be on while sound timer counts down,
        // then turned off when the timer reaches zero.
        if vm.is_buzzing() != buzzer_state {
            buzzer_state = vm.is_buzzing();
            debug!("buzzer {}", if buzzer_state { "on" } else { "off" });
        }

        if conf.throttle {
            clock.wait();
        }
    }
    let end = Instant::now();

    info!(
        "time taken: {}ms",
        end.duration_since(start).as_nanos() as f64 / 1000000.0
    ); // to millis
    println!("{}", vm.dump_display()?);

    result?;

    Ok(())
}

fn run_disassembler(filepath: &str) -> Result<(), AppError> {
    info!("disassembling {filepath}");

    let rom = fs::read(filepath)?;
    print!("{}", disassemble_rom(&rom)?);

    Ok(())
}

fn disassemble_rom(rom: &[u8]) -> Result<String, AppError> {
    let mut vm = Chip8Vm::default();
    vm.load_rom(rom)?;
    Ok(vm.disassembler().listing()?)
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()?;

    match parse_args() {
        Some(Cmd::Run { filepath, config }) => {
            let conf = match config {
                Some(config) => CliConf::load(&config)?,
                None => CliConf::default(),
            };
            run_rom(&filepath, conf)?
        }
        Some(Cmd::Dis { filepath }) => run_disassembler(&filepath)?,
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    }

    Ok(())
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next() {
        Some(cmd) => {
            // don't format me T.T
            match cmd.as_str() {
                "run" => Some(Cmd::Run {
                    filepath: args.next()?,
                    config: args.next(),
                }),
                "dis" => Some(Cmd::Dis {
                    filepath: args.next()?,
                }),
                _ => None,
            }
        }
        None => None,
    }
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run file
    Run {
        filepath: String,
        config: Option<String>,
    },
    /// Disassemble
    Dis { filepath: String },
}
