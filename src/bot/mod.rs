//! Bot core - history store, prompt assembly, presentation and the
//! message pipeline, plus the external service clients.

pub mod history;
pub mod openai;
pub mod pipeline;
pub mod presenter;
pub mod prompt;
pub mod telegram;
pub mod whisper;

pub use history::{ConversationRecord, HistoryStore};
pub use pipeline::{Incoming, Pipeline, Settings};
pub use presenter::{Chooser, Presentation, RandomChooser};
pub use telegram::TelegramClient;
pub use whisper::Transcriber;
