// stackscope: time-travel inspector for the WebAssembly stack region

use std::fs;
use std::io;
use std::path::PathBuf;

use clap::Parser as CliParser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::LevelFilter;
use ratatui::{backend::CrosstermBackend, Terminal};

use stackscope::logging;
use stackscope::memory::{format_address, NativeAddress};
use stackscope::runtime::constants::DEFAULT_SNAPSHOT_LIMIT;
use stackscope::runtime::engine::Machine;
use stackscope::script::Parser;
use stackscope::snapshot::EventLevel;
use stackscope::ui::App;

#[derive(CliParser, Debug)]
#[command(name = "stackscope")]
#[command(about = "Step through a WebAssembly stack trace script", long_about = None)]
struct Args {
    /// Trace script to execute
    script: PathBuf,

    /// Snapshot history budget in MiB
    #[arg(long, value_name = "MB")]
    snapshot_limit: Option<usize>,

    /// Log filter (error, warn, info, debug, trace, off); overrides STACKSCOPE_LOG
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Print the event log instead of starting the TUI
    #[arg(long)]
    no_tui: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Log lines would tear the alternate screen, so the TUI defaults to off
    let default_level = if args.no_tui {
        LevelFilter::Warn
    } else {
        LevelFilter::Off
    };
    logging::init(default_level, args.log_level.as_deref())?;

    let source = match fs::read_to_string(&args.script) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", args.script.display(), e);
            std::process::exit(1);
        }
    };

    let program = match Parser::new(&source).and_then(|mut p| p.parse_program()) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            std::process::exit(1);
        }
    };
    log::info!(
        "parsed {} statements from {}",
        program.statements.len(),
        args.script.display()
    );

    let snapshot_limit = args
        .snapshot_limit
        .map(|mb| mb.saturating_mul(1024 * 1024))
        .unwrap_or(DEFAULT_SNAPSHOT_LIMIT);
    let mut machine = Machine::<NativeAddress>::new(program, snapshot_limit);

    let outcome = machine.run();

    if args.no_tui {
        for event in &machine.events().lines {
            let tag = match event.level {
                EventLevel::Info => "",
                EventLevel::Warn => "warning: ",
                EventLevel::Error => "error: ",
            };
            println!("{:>4}  {}{}", event.location.line, tag, event.text);
        }
        let context = machine.context();
        if let (Ok(base), Ok(end)) = (context.base(), context.end()) {
            println!(
                "final: base={} end={} sp={} depth={}",
                format_address(base),
                format_address(end),
                format_address(context.stack_pointer()),
                context.depth()
            );
        }
        if outcome.is_err() {
            std::process::exit(2);
        }
        return Ok(());
    }

    if let Err(e) = &outcome {
        eprintln!("Runtime error: {}", e);
        eprintln!("Entering TUI with partial execution history...");
    }

    if let Err(e) = machine.rewind_to_start() {
        eprintln!("Warning: Failed to rewind to start: {}", e);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(machine, source);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {}", err);
    }

    Ok(())
}
