// src/capture/permission.rs
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    #[default]
    Unknown,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn is_decided(self) -> bool {
        self != PermissionState::Unknown
    }
}

/// Asks the user whether a camera may be used.
///
/// Returning `Unknown` means the prompt was dismissed without an answer.
pub trait PermissionPrompt: Send {
    fn ask(&mut self, camera: &str) -> PermissionState;
}

/// Pre-answered prompt, used for `--yes` and tests.
pub struct FixedPrompt {
    answer: PermissionState,
    asked: Arc<AtomicUsize>,
}

impl FixedPrompt {
    pub fn new(answer: PermissionState) -> Self {
        Self {
            answer,
            asked: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of how many times the prompt was shown.
    pub fn asked(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.asked)
    }
}

impl PermissionPrompt for FixedPrompt {
    fn ask(&mut self, _camera: &str) -> PermissionState {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

enum ConsoleInput {
    /// Shares the process-wide stdin buffer with other readers.
    Stdin,
    Reader(Box<dyn BufRead + Send>),
}

impl ConsoleInput {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        match self {
            ConsoleInput::Stdin => io::stdin().read_line(buf),
            ConsoleInput::Reader(reader) => reader.read_line(buf),
        }
    }
}

/// y/N question on a terminal.
pub struct ConsolePrompt {
    input: ConsoleInput,
    output: Box<dyn Write + Send>,
}

impl ConsolePrompt {
    pub fn new(input: Box<dyn BufRead + Send>, output: Box<dyn Write + Send>) -> Self {
        Self {
            input: ConsoleInput::Reader(input),
            output,
        }
    }

    pub fn stdio() -> Self {
        Self {
            input: ConsoleInput::Stdin,
            output: Box::new(io::stdout()),
        }
    }
}

impl PermissionPrompt for ConsolePrompt {
    fn ask(&mut self, camera: &str) -> PermissionState {
        if let Err(e) = write!(
            self.output,
            "HealthGuard needs the camera ({camera}) to analyse an image. Allow? [y/N]: "
        )
        .and_then(|_| self.output.flush())
        {
            error!("Failed to show permission prompt: {}", e);
            return PermissionState::Unknown;
        }

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(0) => PermissionState::Unknown,
            Ok(_) => match answer.trim().to_lowercase().as_str() {
                "y" | "yes" | "o" | "oui" => PermissionState::Granted,
                _ => PermissionState::Denied,
            },
            Err(e) => {
                error!("Failed to read permission answer: {}", e);
                PermissionState::Unknown
            }
        }
    }
}

/// Native yes/no dialog.
pub struct DialogPrompt;

impl DialogPrompt {
    /// Closing the dialog leaves the decision open.
    pub fn from_dialog(result: rfd::MessageDialogResult) -> PermissionState {
        match result {
            rfd::MessageDialogResult::Yes | rfd::MessageDialogResult::Ok => PermissionState::Granted,
            rfd::MessageDialogResult::No => PermissionState::Denied,
            _ => PermissionState::Unknown,
        }
    }
}

impl PermissionPrompt for DialogPrompt {
    fn ask(&mut self, camera: &str) -> PermissionState {
        let result = rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Info)
            .set_title("Permission caméra")
            .set_description(&format!(
                "Nous avons besoin de la caméra ({camera}) pour analyser l'image. Autoriser ?"
            ))
            .set_buttons(rfd::MessageButtons::YesNo)
            .show();
        Self::from_dialog(result)
    }
}
