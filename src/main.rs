mod command;
mod config;
mod gchat;
mod translate;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{error, info};
use tracing_subscriber::prelude::*;

use command::CommandMessage;
use config::Config;
use gchat::gemini::LanguageModel;
use gchat::telegram::Messenger;
use gchat::tts::SpeechSynthesizer;
use gchat::{Commands, ElevenLabsClient, GchatContext, GeminiClient, IncomingMessage, Responder, SqliteStore, TelegramClient};
use translate::{TranslateClient, Translator};

struct BotState {
    config: Config,
    bot_username: String,
    responder: Responder,
    commands: Commands,
    translator: Translator,
}

impl BotState {
    fn new(config: Config, bot: &Bot, bot_username: String) -> Result<Self, Box<dyn std::error::Error>> {
        let store = SqliteStore::open(&config.data_dir.join("gchat.db"))?;
        let ctx = Arc::new(GchatContext::load(Arc::new(store))?);

        let messenger: Arc<dyn Messenger> = Arc::new(TelegramClient::new(bot.clone()));
        let model: Arc<dyn LanguageModel> = Arc::new(GeminiClient::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
        ));
        let speech = config.speech.as_ref().map(|s| {
            Arc::new(ElevenLabsClient::new(s.api_key.clone(), s.voice_id.clone())) as Arc<dyn SpeechSynthesizer>
        });
        if speech.is_none() {
            info!("No ElevenLabs key, voice replies disabled");
        }

        let operator_chat_id = config.owner_id as i64;
        let responder = Responder::new(
            ctx.clone(),
            model,
            speech,
            messenger.clone(),
            config.pacing.clone(),
            operator_chat_id,
        );
        let commands = Commands::new(
            ctx,
            messenger.clone(),
            config.command_prefix.clone(),
            config.command_ack_delay,
            operator_chat_id,
        );
        let translator = Translator::new(
            TranslateClient::new(config.translate_endpoint.clone()),
            messenger,
            config.command_prefix.clone(),
        );

        Ok(Self {
            config,
            bot_username,
            responder,
            commands,
            translator,
        })
    }
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "gchatbot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("gchatbot.log"))
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

    info!("🚀 Starting gchatbot...");
    info!("Loaded config from {config_path}");
    info!("Operator ID: {}", config.owner_id);

    let bot = Bot::new(&config.telegram_bot_token);

    let bot_username = match bot.get_me().await {
        Ok(me) => me.username().to_string(),
        Err(e) => {
            error!("Failed to fetch bot info: {e}");
            std::process::exit(1);
        }
    };
    info!("Running as @{bot_username}");

    let state = match BotState::new(config, &bot, bot_username) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to start: {e}");
            std::process::exit(1);
        }
    };

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

/// Where an incoming text message goes.
#[derive(Debug, PartialEq)]
enum Route<'a> {
    Translate(&'a str),
    Gchat(&'a str),
    Role(&'a str),
    Help,
    AutoReply,
    Ignore,
}

/// Who sent a message, and in what kind of chat.
#[derive(Debug, Clone, Copy)]
struct Origin {
    is_operator: bool,
    is_private: bool,
    is_bot: bool,
}

/// Commands win over auto-replies. Operator commands from anyone else are
/// dropped, as is anything addressed to another bot.
fn route<'a>(text: &'a str, origin: Origin, prefix: &str, bot_username: &str) -> Route<'a> {
    if let Some(cmd) = command::parse(text, prefix) {
        if !cmd.is_for(bot_username) {
            return Route::Ignore;
        }
        return match cmd.name.as_str() {
            "gtr" => Route::Translate(cmd.args),
            "gchat" if origin.is_operator => Route::Gchat(cmd.args),
            "role" if origin.is_operator => Route::Role(cmd.args),
            "help" if origin.is_operator => Route::Help,
            _ => Route::Ignore,
        };
    }

    if !origin.is_private || origin.is_bot || origin.is_operator {
        return Route::Ignore;
    }
    Route::AutoReply
}

async fn handle_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let origin = Origin {
        is_operator: state.config.is_owner(user.id.0),
        is_private: msg.chat.is_private(),
        is_bot: user.is_bot,
    };
    let command_msg = |args: &str| CommandMessage {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0 as i64,
        args: args.to_string(),
        reply_text: msg
            .reply_to_message()
            .and_then(|reply| reply.text())
            .map(str::to_string),
    };

    match route(text, origin, &state.config.command_prefix, &state.bot_username) {
        Route::Translate(args) => state.translator.on_command(command_msg(args)).await,
        Route::Gchat(args) => state.commands.on_gchat(command_msg(args)).await,
        Route::Role(args) => state.commands.on_role(command_msg(args)).await,
        Route::Help => state.commands.on_help(command_msg("")).await,
        Route::AutoReply => {
            let incoming = IncomingMessage {
                chat_id: msg.chat.id.0,
                message_id: msg.id.0 as i64,
                user_id: user.id.0 as i64,
                first_name: user.first_name.clone(),
                text: text.to_string(),
            };
            state.responder.on_message(incoming).await;
        }
        Route::Ignore => {}
    }

    Ok(())
}
