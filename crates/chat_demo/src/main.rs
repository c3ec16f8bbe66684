use std::io;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use chat_session::{
    ChatSession, ConversationController, PromptAssembler, SessionConfig, TurnRuntime,
};
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_demo::backends;
use chat_demo::config::DemoConfig;
use chat_demo::repl::{self, ReplOptions};

fn main() -> io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = DemoConfig::from_env();
    let backend = backends::backend_from_env().map_err(io::Error::other)?;
    let options = backends::options_from_env().map_err(io::Error::other)?;

    let profile = backend.profile();
    tracing::info!(
        backend = %profile.backend_id,
        model = %profile.model_id,
        "backend ready"
    );

    let session_config = SessionConfig {
        window_size: config.window_size,
        options,
    };
    let session = Arc::new(Mutex::new(ChatSession::with_config(&session_config)));

    {
        let session = lock_unpoisoned(&session);
        let created_at = session
            .created_at()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());
        println!(
            "Chat session {} started at {created_at}",
            session.session_id()
        );
        println!("Type a question and press enter. /help lists commands.");
    }

    let controller = ConversationController::new(
        backend,
        PromptAssembler::with_instructions(config.instructions.clone()),
        session_config.options,
    );
    let runtime = TurnRuntime::new(Arc::clone(&session), controller);

    let interrupted = Arc::new(AtomicBool::new(false));
    if let Err(error) =
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&interrupted))
    {
        tracing::warn!(%error, "SIGINT handler unavailable; Ctrl+C will not cancel turns");
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut output = stdout.lock();

    repl::run(
        &runtime,
        &interrupted,
        &ReplOptions {
            answer_timeout: config.answer_timeout,
        },
        &mut input,
        &mut output,
    )
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
