use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use vozbot::bot::openai;
use vozbot::bot::{Incoming, Pipeline, RandomChooser, Settings, TelegramClient, Transcriber};
use vozbot::bot::history::HistoryStore;
use vozbot::config::Config;

const GREETING: &str = "Olá! Envie-me uma mensagem e eu vou responder com texto e áudio!";

struct BotState {
    pipeline: Pipeline<openai::Client, openai::Client, TelegramClient, Transcriber>,
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "vozbot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = std::path::Path::new("logs");
    std::fs::create_dir_all(log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("vozbot.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting vozbot...");
    info!("Loaded config from {config_path}");

    let history = match HistoryStore::open(&config.db_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Voice intake is optional: without a model the bot stays text-only
    let transcriber = match config.whisper_model_path {
        Some(ref path) => match Transcriber::new(path) {
            Ok(t) => Some(t),
            Err(e) => {
                warn!("Voice transcription disabled: {e}");
                None
            }
        },
        None => {
            info!("No whisper_model_path configured, voice transcription disabled");
            None
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);
    let telegram = TelegramClient::new(bot.clone());

    let settings = Settings {
        owner_id: config.owner_id,
        personas: config.personas.clone(),
        language: config.language.clone(),
        history_limit: config.history_limit,
    };

    let pipeline = Pipeline::new(
        settings,
        history,
        openai::Client::new(config.openai_api_key.clone(), config.request_timeout_secs),
        openai::Client::new(config.openai_api_key.clone(), config.request_timeout_secs),
        telegram,
        transcriber,
        Box::new(RandomChooser),
    );

    let state = Arc::new(BotState { pipeline });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let user = match msg.from {
        Some(ref u) => u,
        None => return Ok(()),
    };

    // Display name: username, or "first last" as fallback
    let username = user.username.clone().unwrap_or_else(|| match &user.last_name {
        Some(last) => format!("{} {}", user.first_name, last),
        None => user.first_name.clone(),
    });

    let incoming = Incoming {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0 as i64,
        user_id: user.id.0 as i64,
        username,
        text: msg.text().unwrap_or("").to_string(),
    };

    if let Some(voice) = msg.voice() {
        let file_id = voice.file.id.clone();
        state.pipeline.handle_voice(incoming, &file_id.0).await;
        return Ok(());
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };

    if text == "/start" {
        bot.send_message(msg.chat.id, GREETING).await.ok();
        return Ok(());
    }

    state.pipeline.handle_text(incoming).await;
    Ok(())
}
