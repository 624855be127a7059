// src/session.rs
//! Permission → capture → submit → display, one cycle at a time.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, error, info, warn};

use crate::capture::{CaptureAdapter, PermissionState};
use crate::diagnosis::{DiagnosisConnector, DiagnosisResult, TaskId};
use crate::error::{CaptureError, CycleError};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    PermissionPending,
    PermissionGranted,
    PermissionDenied,
    Capturing,
    Submitting,
    ResultDisplayed(DiagnosisResult),
    ErrorDisplayed(String),
}

impl SessionState {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionState::PermissionPending | SessionState::Capturing | SessionState::Submitting
        )
    }

    /// Text for the result line, if anything should be shown.
    pub fn display_text(&self) -> Option<String> {
        match self {
            SessionState::Idle | SessionState::PermissionGranted => None,
            SessionState::PermissionPending => Some("Chargement permissions...".to_string()),
            SessionState::PermissionDenied => Some("Permission caméra requise".to_string()),
            SessionState::Capturing => Some("Capture en cours...".to_string()),
            SessionState::Submitting => Some("Analyse en cours...".to_string()),
            SessionState::ResultDisplayed(result) => Some(result.display_text()),
            SessionState::ErrorDisplayed(message) => Some(message.clone()),
        }
    }
}

/// What the UI reads while a cycle runs on another thread.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub permission: PermissionState,
    pub task: TaskId,
    /// Picture of the latest cycle, kept until the next capture.
    pub last_capture: Option<PathBuf>,
    pub updated_at: chrono::DateTime<chrono::Local>,
}

pub type SessionView = Arc<Mutex<SessionSnapshot>>;

/// Single-slot busy flag shared between the UI and the worker.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicBool>);

impl InFlight {
    /// Claim the slot, or `None` while another cycle holds it.
    pub fn try_begin(&self) -> Option<InFlightToken> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightToken(Arc::clone(&self.0)))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases the in-flight slot on drop.
#[derive(Debug)]
pub struct InFlightToken(Arc<AtomicBool>);

impl Drop for InFlightToken {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Session {
    capture: CaptureAdapter,
    connector: Box<dyn DiagnosisConnector>,
    in_flight: InFlight,
    view: SessionView,
    retain_captures: bool,
}

impl Session {
    pub fn new(capture: CaptureAdapter, connector: Box<dyn DiagnosisConnector>, task: TaskId) -> Self {
        let snapshot = SessionSnapshot {
            state: SessionState::Idle,
            permission: capture.permission(),
            task,
            last_capture: None,
            updated_at: chrono::Local::now(),
        };
        Self {
            capture,
            connector,
            in_flight: InFlight::default(),
            view: Arc::new(Mutex::new(snapshot)),
            retain_captures: false,
        }
    }

    /// Keep every captured file instead of deleting it on the next cycle or
    /// when the session ends.
    pub fn retain_captures(mut self, retain: bool) -> Self {
        self.retain_captures = retain;
        self
    }

    pub fn view(&self) -> SessionView {
        Arc::clone(&self.view)
    }

    pub fn in_flight(&self) -> InFlight {
        self.in_flight.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.view.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn state(&self) -> SessionState {
        self.snapshot().state
    }

    pub fn permission(&self) -> PermissionState {
        self.capture.permission()
    }

    pub fn task(&self) -> TaskId {
        self.snapshot().task
    }

    pub fn set_task(&mut self, task: TaskId) {
        info!("Task set to {}", task);
        self.update(|snap| snap.task = task);
    }

    pub fn connector(&self) -> &dyn DiagnosisConnector {
        self.connector.as_ref()
    }

    fn update(&self, f: impl FnOnce(&mut SessionSnapshot)) {
        let mut snap = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut snap);
        snap.permission = self.capture.permission();
        snap.updated_at = chrono::Local::now();
    }

    fn set_state(&self, state: SessionState) {
        debug!("Session state -> {:?}", state);
        self.update(|snap| snap.state = state);
    }

    /// Idle → PermissionPending → PermissionGranted | PermissionDenied.
    pub fn request_permission(&mut self) -> PermissionState {
        if !self.capture.permission().is_decided() {
            self.set_state(SessionState::PermissionPending);
        }
        let permission = self.capture.request_permission();
        self.set_state(match permission {
            PermissionState::Granted => SessionState::PermissionGranted,
            PermissionState::Denied => SessionState::PermissionDenied,
            PermissionState::Unknown => SessionState::Idle,
        });
        permission
    }

    /// Run one capture/submission cycle, refusing if one is already running.
    pub fn run_cycle(&mut self) -> Result<DiagnosisResult, CycleError> {
        let token = self.in_flight.try_begin().ok_or_else(|| {
            warn!("Analysis requested while another one is running");
            CycleError::Busy
        })?;
        self.run_claimed(token)
    }

    /// Run a cycle whose in-flight slot the caller already claimed.
    pub fn run_claimed(&mut self, token: InFlightToken) -> Result<DiagnosisResult, CycleError> {
        let outcome = self.cycle();
        match &outcome {
            Ok(result) => self.set_state(SessionState::ResultDisplayed(result.clone())),
            Err(CycleError::Capture(CaptureError::PermissionDenied)) => {
                self.set_state(SessionState::PermissionDenied)
            }
            Err(e) => {
                error!("Analysis failed: {}", e);
                self.set_state(SessionState::ErrorDisplayed(e.user_message()));
            }
        }
        drop(token);
        outcome
    }

    fn cycle(&mut self) -> Result<DiagnosisResult, CycleError> {
        self.discard_previous_capture();
        self.set_state(SessionState::Capturing);
        let image = self.capture.capture()?;

        let path = image.path().to_path_buf();
        let task = self.task();
        self.update(|snap| {
            snap.state = SessionState::Submitting;
            snap.last_capture = Some(path);
        });
        Ok(self.connector.submit(&task, image)?)
    }

    fn discard_previous_capture(&self) {
        let previous = {
            let mut snap = self.view.lock().unwrap_or_else(PoisonError::into_inner);
            snap.last_capture.take()
        };
        if self.retain_captures {
            return;
        }
        if let Some(path) = previous {
            if let Err(e) = std::fs::remove_file(&path) {
                debug!("Could not remove old capture {}: {}", path.display(), e);
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.discard_previous_capture();
    }
}
