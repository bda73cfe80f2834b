use jsinspect::*;
use std::io::{BufRead, Write};

#[derive(clap::Parser)]
#[command(name = "js", version, about = "JavaScript interpreter with an inspector console")]
struct Cli {
    /// Execute script
    #[arg(short, long)]
    eval: Option<String>,

    /// Enable %Name(...) runtime intrinsics
    #[arg(long)]
    allow_natives_syntax: bool,

    /// Shapes a keyed access site tracks before going megamorphic
    #[arg(long, default_value_t = 4)]
    max_polymorphism: usize,

    /// Allocate feedback vectors on first invocation
    #[arg(long)]
    no_lazy_feedback_allocation: bool,

    /// Stop in an interactive prompt when an exception is thrown
    #[arg(long, value_parser = ["none", "caught", "uncaught", "all"], default_value = "none")]
    pause_on_exceptions: String,

    /// JavaScript file to execute
    file: Option<std::path::PathBuf>,
}

enum Source<'a> {
    Inline(&'a str),
    File(&'a std::path::Path),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger (controlled by RUST_LOG)
    env_logger::init();

    let cli = <Cli as clap::Parser>::parse();
    let config = EngineConfig::default()
        .with_natives_syntax(cli.allow_natives_syntax)
        .with_max_polymorphism(cli.max_polymorphism)
        .with_lazy_feedback_allocation(!cli.no_lazy_feedback_allocation);
    let mode: PauseOnExceptionsMode = cli.pause_on_exceptions.parse()?;

    let source = match (&cli.eval, &cli.file) {
        (Some(script), _) => Source::Inline(script),
        (None, Some(file)) => Source::File(file),
        (None, None) => return run_persistent_repl(config, mode),
    };

    let mut session = Session::with_config(config);
    if mode != PauseOnExceptionsMode::None {
        session.debugger_enable();
        session.set_pause_on_exceptions(mode)?;
        session.set_pause_handler(interactive_pause);
    }
    let outcome = match source {
        Source::Inline(script) => session.run_script(script, ""),
        Source::File(file) => session.run_file(file),
    };
    log_notifications(&session);
    match outcome {
        Ok(result) => println!("{}", format_console_value(&result)),
        Err(JSError::Throw { value }) => {
            eprintln!("Uncaught {}", describe_exception(&value));
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("{err}");
            if let Some(file) = &cli.file {
                eprintln!("  in file: {}", file.display());
            }
            std::process::exit(1);
        }
    }
    session.close()?;
    Ok(())
}

/// The console has no protocol client; notifications are only logged.
fn log_notifications(session: &Session) {
    for notification in session.drain_notifications() {
        log::debug!("{} {}", notification.method, notification.params);
    }
}

fn describe_exception(value: &Value) -> String {
    let remote = RemoteObject::from_value(value);
    remote.description.unwrap_or_else(|| format_console_value(value))
}

fn print_result(result: &EvaluateResult) {
    if result.is_exception() {
        eprintln!("Uncaught {}", describe_exception(&result.value));
    } else {
        println!("{}", format_console_value(&result.value));
    }
}

/// Nested prompt shown while paused. Expressions run on the selected frame.
fn interactive_pause(ctx: &mut PausedContext<'_>) {
    let frames = ctx.call_frames();
    match ctx.reason() {
        Some(PauseReason::Exception { value, uncaught }) => {
            let kind = if uncaught { "uncaught" } else { "caught" };
            println!("Paused on {kind} exception: {}", describe_exception(&value));
        }
        _ => println!("Paused"),
    }
    if let Some(top) = frames.first() {
        println!("  at {} ({}:{}:{})", display_name(top), top.url, top.location.line_number + 1, top.location.column_number + 1);
    }
    println!("Commands: c (continue), bt (backtrace), f <n> (select frame), anything else is evaluated.");

    let mut selected = 0usize;
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("debug[{selected}]> ");
        if std::io::stdout().flush().is_err() {
            break;
        }
        let Some(Ok(line)) = lines.next() else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "c" | "cont" | "continue" => break,
            "bt" => {
                for (i, frame) in frames.iter().enumerate() {
                    let marker = if i == selected { '*' } else { ' ' };
                    println!("{marker} #{i} {} ({}:{})", display_name(frame), frame.url, frame.location.line_number + 1);
                }
            }
            _ if line.starts_with("f ") => match line[2..].trim().parse::<usize>() {
                Ok(n) if n < frames.len() => selected = n,
                _ => eprintln!("no such frame"),
            },
            expression => {
                let Some(frame) = frames.get(selected) else {
                    eprintln!("no call frames");
                    continue;
                };
                match ctx.evaluate_on_call_frame(&frame.call_frame_id, expression) {
                    Ok(result) => print_result(&result),
                    Err(e) => eprintln!("{e}"),
                }
            }
        }
    }
    if let Err(e) = ctx.resume() {
        log::debug!("resume after prompt: {e}");
    }
}

fn display_name(frame: &CallFrame) -> &str {
    if frame.function_name.is_empty() { "<anonymous>" } else { &frame.function_name }
}

// Persistent rustyline-powered REPL loop extracted into a helper to keep `main()` small.
#[allow(clippy::println_empty_string)]
fn run_persistent_repl(config: EngineConfig, mode: PauseOnExceptionsMode) -> Result<(), Box<dyn std::error::Error>> {
    use rustyline::Editor;
    use rustyline::error::ReadlineError;
    use std::path::PathBuf;

    let ver = clap::crate_version!();
    println!("JavaScript inspector REPL v{ver}. Type 'exit' or Ctrl-D to quit.");

    let mut rl = match Editor::<(), rustyline::history::FileHistory>::new() {
        Ok(e) => e,
        Err(err) => {
            eprintln!("Failed to initialize line editor: {err}");
            std::process::exit(1);
        }
    };

    let history_path: Option<PathBuf> = std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".jsinspect_history"));
    if let Some(ref p) = history_path
        && let Err(e) = rl.load_history(p)
    {
        log::debug!("no history loaded: {e}");
    }

    let mut repl = Repl::with_config(config);
    if mode != PauseOnExceptionsMode::None {
        repl = repl.with_debugger(mode, interactive_pause)?;
    }

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "js> " } else { ".... " };
        match rl.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if buffer.is_empty() && (trimmed == "exit" || trimmed == ".exit") {
                    break;
                }
                if buffer.is_empty() {
                    buffer = line.clone();
                } else {
                    buffer.push('\n');
                    buffer.push_str(&line);
                }
                if !Repl::is_complete_input(&buffer) {
                    continue;
                }
                if buffer.trim().is_empty() {
                    buffer.clear();
                    continue;
                }
                rl.add_history_entry(buffer.clone())?;
                match repl.eval(&buffer) {
                    Ok(result) => print_result(&result),
                    Err(e) => eprintln!("{e}"),
                }
                log_notifications(repl.session());
                buffer.clear();
            }
            Err(ReadlineError::Interrupted) => {
                println!("");
                buffer.clear();
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye");
                break;
            }
            Err(err) => {
                eprintln!("Readline error: {err}");
                break;
            }
        }
    }

    if let Some(ref p) = history_path {
        rl.save_history(p)?;
    }
    repl.close()?;
    Ok(())
}
