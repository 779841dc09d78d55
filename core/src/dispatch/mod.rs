pub mod mailbox;
pub mod speech;

pub use mailbox::Mailbox;
pub use speech::{announcement, deliver, spawn_speech_worker, SpeechOutcome};
