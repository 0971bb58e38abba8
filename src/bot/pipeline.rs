//! Message pipeline: intake → (transcription) → prompt → completion →
//! history write → presentation.
//!
//! External collaborators sit behind narrow traits so the pipeline can be
//! exercised end-to-end in tests without Telegram, OpenAI or Whisper.
//! Every failure is contained per event; handlers never bubble errors into
//! the polling loop.

use std::future::Future;

use chrono::Local;
use tracing::{info, warn};

use crate::bot::history::{ConversationRecord, HistoryStore};
use crate::bot::presenter::{Chooser, Presentation, split_response};
use crate::bot::prompt::{build_prompt, render_persona, select_persona};
use crate::config::Personas;

/// Fixed reply when the completion comes back empty.
pub const APOLOGY_NO_RESPONSE: &str = "Desculpe, não consegui gerar uma resposta.";
/// Fixed reply for completion/synthesis failures.
pub const APOLOGY_SERVICE: &str = "Desculpe, ocorreu um erro ao processar sua mensagem.";
/// Fixed reply when a voice message can't be understood.
pub const APOLOGY_VOICE: &str = "Desculpe, não consegui entender o áudio.";
/// Fixed reply when no transcription model is configured.
pub const VOICE_UNAVAILABLE: &str = "Desculpe, não consigo ouvir áudios no momento.";

/// One inbound message, already reduced to what the pipeline needs.
#[derive(Debug, Clone)]
pub struct Incoming {
    pub chat_id: i64,
    pub message_id: i64,
    pub user_id: i64,
    /// Display name: username, or "first last" as fallback.
    pub username: String,
    pub text: String,
}

/// Completion service surface.
pub trait Completion: Send + Sync {
    /// Returns the assistant text; empty string means the service had
    /// nothing to say.
    fn complete(
        &self,
        system_prompt: &str,
        question: &str,
    ) -> impl Future<Output = Result<String, String>> + Send;
}

/// Speech-synthesis surface. Produces OGG Opus bytes.
pub trait Speech: Send + Sync {
    fn synthesize(&self, text: &str) -> impl Future<Output = Result<Vec<u8>, String>> + Send;
}

/// Outbound delivery and voice download surface.
pub trait Outbound: Send + Sync {
    fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> impl Future<Output = Result<i64, String>> + Send;

    fn send_voice(
        &self,
        chat_id: i64,
        audio: Vec<u8>,
        reply_to: Option<i64>,
    ) -> impl Future<Output = Result<i64, String>> + Send;

    fn download_voice(&self, file_id: &str) -> impl Future<Output = Result<Vec<u8>, String>> + Send;
}

/// Speech-to-text surface. Synchronous: Whisper runs on the CPU.
pub trait SpeechToText: Send + Sync {
    fn transcribe(&self, ogg_data: &[u8], language: &str) -> Result<String, String>;
}

impl Completion for crate::bot::openai::Client {
    async fn complete(&self, system_prompt: &str, question: &str) -> Result<String, String> {
        match crate::bot::openai::Client::complete(self, system_prompt, question).await {
            Ok(text) => Ok(text),
            // Empty is not a transport failure; the pipeline decides what to say
            Err(crate::bot::openai::Error::Empty) => Ok(String::new()),
            Err(e) => Err(e.to_string()),
        }
    }
}

impl Speech for crate::bot::openai::Client {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, String> {
        crate::bot::openai::Client::synthesize(self, text)
            .await
            .map_err(|e| e.to_string())
    }
}

impl Outbound for crate::bot::telegram::TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str, reply_to: Option<i64>) -> Result<i64, String> {
        self.send_message(chat_id, text, reply_to).await
    }

    async fn send_voice(&self, chat_id: i64, audio: Vec<u8>, reply_to: Option<i64>) -> Result<i64, String> {
        crate::bot::telegram::TelegramClient::send_voice(self, chat_id, audio, reply_to).await
    }

    async fn download_voice(&self, file_id: &str) -> Result<Vec<u8>, String> {
        crate::bot::telegram::TelegramClient::download_voice(self, file_id).await
    }
}

impl SpeechToText for crate::bot::whisper::Transcriber {
    fn transcribe(&self, ogg_data: &[u8], language: &str) -> Result<String, String> {
        crate::bot::whisper::Transcriber::transcribe(self, ogg_data, language)
    }
}

/// Pipeline settings carved out of [`crate::config::Config`].
#[derive(Clone)]
pub struct Settings {
    pub owner_id: i64,
    pub personas: Personas,
    /// Language hint for transcription.
    pub language: String,
    /// Max history records replayed into the prompt (0 = unlimited).
    pub history_limit: usize,
}

/// The message pipeline.
pub struct Pipeline<C, S, O, T> {
    settings: Settings,
    history: HistoryStore,
    completion: C,
    speech: S,
    outbound: O,
    transcriber: Option<T>,
    chooser: Box<dyn Chooser>,
}

impl<C, S, O, T> Pipeline<C, S, O, T>
where
    C: Completion,
    S: Speech,
    O: Outbound,
    T: SpeechToText,
{
    pub fn new(
        settings: Settings,
        history: HistoryStore,
        completion: C,
        speech: S,
        outbound: O,
        transcriber: Option<T>,
        chooser: Box<dyn Chooser>,
    ) -> Self {
        Self {
            settings,
            history,
            completion,
            speech,
            outbound,
            transcriber,
            chooser,
        }
    }

    /// Handle an inbound text message.
    pub async fn handle_text(&self, msg: Incoming) {
        info!(
            "📨 {} ({}): \"{}\"",
            msg.username,
            msg.user_id,
            msg.text.chars().take(50).collect::<String>()
        );
        let question = msg.text.clone();
        self.respond(&msg, &question).await;
    }

    /// Handle an inbound voice message: download, transcribe, then answer
    /// like a text message.
    pub async fn handle_voice(&self, msg: Incoming, file_id: &str) {
        info!("🎤 Voice message from {} ({})", msg.username, msg.user_id);

        let Some(ref transcriber) = self.transcriber else {
            warn!("Voice message received but no transcription model is configured");
            self.apologize(&msg, VOICE_UNAVAILABLE).await;
            return;
        };

        let ogg_data = match self.outbound.download_voice(file_id).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Voice download failed: {e}");
                self.apologize(&msg, APOLOGY_VOICE).await;
                return;
            }
        };

        let question = match transcriber.transcribe(&ogg_data, &self.settings.language) {
            Ok(text) => text,
            Err(e) => {
                warn!("Transcription failed: {e}");
                self.apologize(&msg, APOLOGY_VOICE).await;
                return;
            }
        };

        self.respond(&msg, &question).await;
    }

    /// Prompt assembly → completion → history write → presentation.
    async fn respond(&self, msg: &Incoming, question: &str) {
        let chat_id = msg.chat_id.to_string();

        // A broken store must not silence the bot: answer without history
        let history = match self
            .history
            .history_for_limited(&chat_id, self.settings.history_limit)
        {
            Ok(entries) => entries,
            Err(e) => {
                warn!("History read failed, continuing without context: {e}");
                Vec::new()
            }
        };

        let persona = select_persona(&self.settings.personas, msg.user_id, self.settings.owner_id);
        let persona = render_persona(persona, &msg.username);
        let prompt = build_prompt(&persona, &history, question, Local::now());

        let response = match self.completion.complete(&prompt, question).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Completion failed: {e}");
                self.apologize(msg, APOLOGY_SERVICE).await;
                return;
            }
        };

        if response.trim().is_empty() {
            info!("Empty completion, not persisting");
            self.apologize(msg, APOLOGY_NO_RESPONSE).await;
            return;
        }

        let record = ConversationRecord {
            chat_id,
            user_id: msg.user_id.to_string(),
            username: msg.username.clone(),
            message: question.to_string(),
            response: response.clone(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        if let Err(e) = self.history.append(&record) {
            warn!("History write failed, replying anyway: {e}");
        }

        self.deliver(msg, &response).await;
    }

    /// Deliver the response using a randomly chosen presentation.
    async fn deliver(&self, msg: &Incoming, response: &str) {
        let parts = split_response(response);
        let presentation = self.chooser.choose();
        info!("📤 Presentation: {:?} ({} part(s))", presentation, parts.len());

        match presentation {
            Presentation::TextOnly => {
                for part in &parts {
                    self.send_text(msg, part).await;
                }
            }
            Presentation::VoiceOnly => {
                self.send_voice(msg, response).await;
            }
            Presentation::SplitTextVoice => {
                self.send_text(msg, &parts[0]).await;
                if let Some(voice_part) = parts.get(1)
                    && !voice_part.is_empty()
                {
                    self.send_voice(msg, voice_part).await;
                }
            }
            Presentation::Repeated => {
                if self.chooser.coin() {
                    for part in &parts {
                        self.send_text(msg, part).await;
                    }
                } else {
                    for part in &parts {
                        if !part.is_empty() && !self.send_voice(msg, part).await {
                            // Synthesis apologized already; stop here
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn send_text(&self, msg: &Incoming, text: &str) {
        // Delivery failures are logged inside the client; nothing to retry
        let _ = self
            .outbound
            .send_text(msg.chat_id, text, Some(msg.message_id))
            .await;
    }

    /// Synthesize and send one voice part. Returns false if synthesis
    /// failed, after sending the fixed apology.
    async fn send_voice(&self, msg: &Incoming, text: &str) -> bool {
        match self.speech.synthesize(text).await {
            Ok(audio) => {
                let _ = self
                    .outbound
                    .send_voice(msg.chat_id, audio, Some(msg.message_id))
                    .await;
                true
            }
            Err(e) => {
                warn!("Speech synthesis failed: {e}");
                self.apologize(msg, APOLOGY_SERVICE).await;
                false
            }
        }
    }

    async fn apologize(&self, msg: &Incoming, text: &str) {
        let _ = self
            .outbound
            .send_text(msg.chat_id, text, Some(msg.message_id))
            .await;
    }
}
