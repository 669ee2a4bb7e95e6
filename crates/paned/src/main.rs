#![forbid(unsafe_code)]

//! paned demo binary.
//!
//! Opens a console buffer. Lines typed into the console are
//! echoed back; `name` starts a nested minibuffer read, `count` reads an
//! integer, `uptime` reports the seconds counted from a background thread's
//! `tick` async events, and `quit` asks for confirmation before exiting.

use std::cell::Cell;
use std::env;
use std::process;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use paned::prelude::*;
use paned::{ConsoleBuffer, LoggingConfig, TerminalOptions, TerminalSurface};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
paned demo

USAGE:
    paned-demo [OPTIONS]

OPTIONS:
    --log-file=PATH     Append tracing output to PATH
    --log-filter=DIRS   EnvFilter directives (default: info)
    --help, -h          Show this help message
    --version, -V       Show version

KEYBINDINGS:
    C-x 2 / C-x 3       Split below / right
    C-x 0 / C-x 1       Delete window / other windows
    M-n / M-p           Next / previous window
    <tab> / S-<tab>     Next / previous buffer
    C-x C-b             Buffer list
    C-x C-l             Log
    C-x 5 2 / C-x 5 0   New / delete window set
    C-g                 Cancel
    C-x C-c             Exit

ENVIRONMENT VARIABLES:
    PANED_LOG_FILE      Override --log-file";

struct Opts {
    logging: LoggingConfig,
}

fn parse_args() -> Opts {
    let mut logging = LoggingConfig::default();
    if let Ok(path) = env::var("PANED_LOG_FILE") {
        logging = logging.with_file(path);
    }
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            "--version" | "-V" => {
                println!("paned-demo {VERSION}");
                process::exit(0);
            }
            other => {
                if let Some(path) = other.strip_prefix("--log-file=") {
                    logging = logging.with_file(path);
                } else if let Some(filter) = other.strip_prefix("--log-filter=") {
                    logging = logging.with_filter(filter);
                } else {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Run with --help for usage information.");
                    process::exit(2);
                }
            }
        }
    }
    Opts { logging }
}

fn console_command(engine: &mut Engine, line: &str, ticks: u64) -> ActionResult {
    let reply = match line.trim() {
        "" => return Ok(Signal::Continue),
        "name" => {
            let name = engine.read_string("Your name: ", None)?;
            format!("Hello, {name}.")
        }
        "count" => {
            let count = engine.read_integer("How many? ", Some(3))?;
            (1..=count.clamp(0, 20))
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        }
        "uptime" => format!("up {ticks}s"),
        "quit" => {
            if engine.read_bool("Really quit? (y/n) ")? {
                return Ok(Signal::Exit);
            }
            "Staying.".to_string()
        }
        other => format!("echo: {other}"),
    };
    if let Some(console) = engine.current_buffer_as_mut::<ConsoleBuffer>() {
        console.append(&reply);
    }
    Ok(Signal::Continue)
}

fn run(opts: &Opts) -> Result<(), EngineError> {
    let surface = TerminalSurface::new(TerminalOptions::default())?;
    let mut engine = Engine::new(EngineConfig::default(), surface)?;
    init_tracing_or_warn(&opts.logging, engine.session_log().clone());

    let ticks = Rc::new(Cell::new(0u64));
    let counter = Rc::clone(&ticks);
    engine.register_async("tick", move |_: &mut Engine, _| {
        counter.set(counter.get() + 1);
        Ok(())
    })?;

    let console = engine.switch_to_buffer::<ConsoleBuffer>(&"console".to_string())?;
    if let Some(buffer) = engine.buffers_mut().get_as_mut::<ConsoleBuffer>(console) {
        buffer.set_handler(Rc::new(move |engine: &mut Engine, line: &str| {
            console_command(engine, line, ticks.get())
        }));
        buffer.append("Type a line and press <enter>. Try: name, count, uptime, quit.");
    }

    let poster = engine.async_poster()?;
    thread::spawn(move || {
        while poster.post("tick").is_ok() {
            thread::sleep(Duration::from_secs(1));
        }
    });

    engine.attach_terminal_input();
    engine.add_exit_handler(|engine: &mut Engine| {
        tracing::info!(buffers = engine.buffers().len(), "demo exiting");
    });
    engine.run()
}

fn init_tracing_or_warn(config: &LoggingConfig, log: paned::SessionLog) {
    if let Err(err) = paned::init_tracing(config, log) {
        eprintln!("Logging disabled: {err}");
    }
}

fn main() {
    let opts = parse_args();
    if let Err(err) = run(&opts) {
        eprintln!("Runtime error: {err}");
        process::exit(1);
    }
}
