use crate::workflow::config::SpeechConfig;
use hazardcore::interface::SpeechBackend;
use hazardcore::prelude::{EngineError, EngineResult};
use std::io::Write;
use std::process::Command;

/// Speaks through an external TTS program, or just logs when none is set.
pub struct CommandSpeech {
    command: Option<String>,
    args: Vec<String>,
}

impl CommandSpeech {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            command: config.command.clone().filter(|c| !c.trim().is_empty()),
            args: config.args.clone(),
        }
    }
}

impl SpeechBackend for CommandSpeech {
    fn speak(&self, text: &str) -> EngineResult<()> {
        let Some(program) = &self.command else {
            log::info!("[speech] {}", text);
            return Ok(());
        };
        let status = Command::new(program)
            .args(&self.args)
            .arg(text)
            .status()
            .map_err(|err| EngineError::Backend(format!("spawning {}: {}", program, err)))?;
        if status.success() {
            Ok(())
        } else {
            Err(EngineError::Backend(format!("{} exited with {}", program, status)))
        }
    }

    fn beep(&self) -> EngineResult<()> {
        let mut stderr = std::io::stderr();
        stderr
            .write_all(b"\x07")
            .and_then(|_| stderr.flush())
            .map_err(|err| EngineError::Backend(format!("beep: {}", err)))
    }
}
