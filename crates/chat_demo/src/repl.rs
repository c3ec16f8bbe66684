//! Line-oriented chat loop: reads user events, drives the turn runtime, and
//! renders replies.
//!
//! Input and output are injected so tests can drive the loop without a
//! terminal. All session mutation happens on this thread via the runtime's
//! event flushing.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chat_session::TurnRuntime;
use tracing::warn;

use crate::commands::{parse_slash_command, SlashCommand};

const HELP_TEXT: &str = "Commands: /help, /clear, /memory, /quit";
const INPUT_PROMPT: &str = "you> ";
const REPLY_PREFIX: &str = "bot> ";
const POLL_SLICE: Duration = Duration::from_millis(50);

/// Extra time granted after a cancel request before giving up on a backend
/// that ignores the signal.
const CANCEL_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplOptions {
    /// How long one answer may run before the loop cancels it.
    pub answer_timeout: Duration,
}

/// Runs the chat loop until `/quit` or end of input.
pub fn run<R: BufRead, W: Write>(
    runtime: &Arc<TurnRuntime>,
    interrupted: &Arc<AtomicBool>,
    options: &ReplOptions,
    input: &mut R,
    output: &mut W,
) -> io::Result<()> {
    loop {
        write!(output, "{INPUT_PROMPT}")?;
        output.flush()?;

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {
                writeln!(output)?;
                continue;
            }
            Err(error) => return Err(error),
        }

        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        if let Some(command) = parse_slash_command(text) {
            match command {
                SlashCommand::Help => writeln!(output, "{HELP_TEXT}")?,
                SlashCommand::Clear => {
                    runtime.clear();
                    writeln!(output, "Transcript cleared")?;
                }
                SlashCommand::Memory => write_memory(runtime, output)?,
                SlashCommand::Quit => break,
                SlashCommand::Unknown(command) => {
                    writeln!(output, "Unknown command: {command}")?;
                }
            }

            continue;
        }

        match runtime.submit(text).and_then(|_| runtime.start_answer()) {
            Ok(_) => {
                if !await_settle(runtime, interrupted, options.answer_timeout) {
                    warn!("answer did not settle; the backend ignored cancellation");
                }

                writeln!(output, "{REPLY_PREFIX}{}", last_reply(runtime))?;
            }
            Err(error) => writeln!(output, "{error}")?,
        }
    }

    Ok(())
}

/// Flushes runtime events until the turn settles, cancelling once the
/// timeout elapses or Ctrl+C is observed.
fn await_settle(
    runtime: &TurnRuntime,
    interrupted: &Arc<AtomicBool>,
    timeout: Duration,
) -> bool {
    let start = Instant::now();
    let mut cancel_requested = false;

    loop {
        if runtime.settle(POLL_SLICE) {
            return true;
        }

        let timed_out = start.elapsed() >= timeout;
        let interrupt = interrupted.swap(false, Ordering::SeqCst);
        if (timed_out || interrupt) && !cancel_requested {
            cancel_requested = true;
            warn!("cancelling in-flight answer");
            runtime.cancel_active();
        }

        if cancel_requested && start.elapsed() >= timeout + CANCEL_GRACE {
            return false;
        }
    }
}

fn last_reply(runtime: &TurnRuntime) -> String {
    let session = runtime.session();
    let session = lock_unpoisoned(&session);
    session
        .transcript()
        .all()
        .last()
        .and_then(|turn| turn.assistant_reply.clone())
        .unwrap_or_else(|| "(no reply recorded)".to_string())
}

fn write_memory<W: Write>(runtime: &TurnRuntime, output: &mut W) -> io::Result<()> {
    let session = runtime.session();
    let session = lock_unpoisoned(&session);

    if session.memory().is_empty() {
        writeln!(output, "Memory window is empty")?;
        return Ok(());
    }

    for turn in session.memory().window() {
        let reply = turn.assistant_reply.as_deref().unwrap_or("(pending)");
        writeln!(output, "you: {}", turn.user_message)?;
        writeln!(output, "bot: {reply}")?;
    }

    Ok(())
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
