// src/gui.rs
use anyhow::Result;
use eframe::egui;
use egui::{Color32, RichText, Stroke, Vec2};
use log::{error, info};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

#[cfg(feature = "clipboard")]
use arboard::Clipboard;

use healthguard::capture::permission::DialogPrompt;
use healthguard::capture::file::{FileCamera, IMAGE_EXTENSIONS};
use healthguard::capture::screenshot::ScreenCamera;
use healthguard::diagnosis::task::KNOWN_TASKS;
use healthguard::session::{InFlight, SessionView};
use healthguard::{
    Camera, CaptureAdapter, CaptureError, ClientConfig, DiagnosisConnector, ImageReference,
    PermissionState, Session, SessionState, SubmissionClient, TaskId,
};

const WINDOW_WIDTH: f32 = 440.0;
const WINDOW_HEIGHT: f32 = 680.0;
const PREVIEW_MAX_HEIGHT: f32 = 320.0;
// Lets the click frame disappear before the screen is grabbed.
const SCREEN_CAPTURE_DELAY: Duration = Duration::from_millis(300);

#[derive(Clone, Copy, PartialEq, Eq)]
enum GuiSource {
    Screen,
    Picker,
}

impl GuiSource {
    fn label(self) -> &'static str {
        match self {
            GuiSource::Screen => "🖥 Écran",
            GuiSource::Picker => "📁 Photo",
        }
    }
}

/// Camera whose backend can be switched from the UI between cycles.
///
/// Photos are chosen on the UI thread and handed over through `picked`.
struct SelectableCamera {
    source: Arc<Mutex<GuiSource>>,
    screen: ScreenCamera,
    picked: Arc<Mutex<Option<PathBuf>>>,
    capture_dir: PathBuf,
}

impl Camera for SelectableCamera {
    fn name(&self) -> &str {
        "camera"
    }

    fn take_picture(&mut self) -> Result<ImageReference, CaptureError> {
        let source = *self.source.lock().unwrap_or_else(PoisonError::into_inner);
        match source {
            GuiSource::Screen => {
                thread::sleep(SCREEN_CAPTURE_DELAY);
                self.screen.take_picture()
            }
            GuiSource::Picker => {
                let picked = self.picked.lock().unwrap_or_else(PoisonError::into_inner).take();
                let path = picked.ok_or(CaptureError::NoImage)?;
                FileCamera::new(path, &self.capture_dir).take_picture()
            }
        }
    }
}

pub struct HealthGuardApp {
    was_style_initialized: bool,

    session: Arc<Mutex<Session>>,
    view: SessionView,
    in_flight: InFlight,
    client: Arc<SubmissionClient>,
    source: Arc<Mutex<GuiSource>>,
    picked: Arc<Mutex<Option<PathBuf>>>,
    endpoint: String,
    preview_path: Option<PathBuf>,
    preview: Option<egui::TextureHandle>,
    server_status: Arc<Mutex<Option<String>>>,
}

impl HealthGuardApp {
    fn new(config: ClientConfig) -> Result<Self> {
        let source = Arc::new(Mutex::new(GuiSource::Screen));
        let picked = Arc::new(Mutex::new(None));
        let camera = SelectableCamera {
            source: Arc::clone(&source),
            screen: ScreenCamera::new(&config.capture_dir),
            picked: Arc::clone(&picked),
            capture_dir: config.capture_dir.clone(),
        };
        let endpoint = config.base_endpoint.clone();
        let task = config.default_task.clone();
        let client = Arc::new(SubmissionClient::new(config)?);

        let adapter = CaptureAdapter::new(Box::new(camera), Box::new(DialogPrompt));
        let session = Session::new(adapter, Box::new(Arc::clone(&client)), task);

        Ok(Self {
            was_style_initialized: false,
            view: session.view(),
            in_flight: session.in_flight(),
            session: Arc::new(Mutex::new(session)),
            client,
            source,
            picked,
            endpoint,
            preview_path: None,
            preview: None,
            server_status: Arc::new(Mutex::new(None)),
        })
    }
}

impl eframe::App for HealthGuardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.was_style_initialized {
            let mut style = (*ctx.style()).clone();
            style.visuals.panel_fill = Color32::from_rgb(25, 25, 25);
            style.visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(30, 30, 30);
            style.visuals.widgets.inactive.bg_fill = Color32::from_rgb(45, 45, 45);
            style.visuals.widgets.hovered.bg_fill = Color32::from_rgb(55, 55, 55);
            style.visuals.widgets.active.bg_fill = Color32::from_rgb(65, 65, 65);
            style.visuals.widgets.inactive.rounding = egui::Rounding::same(6.0);
            style.visuals.widgets.hovered.rounding = egui::Rounding::same(6.0);
            style.visuals.widgets.active.rounding = egui::Rounding::same(6.0);
            style.visuals.selection.bg_fill = Color32::from_rgb(42, 90, 170);
            style.text_styles.insert(
                egui::TextStyle::Body,
                egui::FontId::new(15.0, egui::FontFamily::Proportional)
            );
            style.text_styles.insert(
                egui::TextStyle::Heading,
                egui::FontId::new(22.0, egui::FontFamily::Proportional)
            );
            ctx.set_style(style);
            self.was_style_initialized = true;
        }

        let snapshot = self.view.lock().unwrap_or_else(PoisonError::into_inner).clone();
        self.refresh_preview(ctx, snapshot.last_capture.as_ref());

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(10.0);
            ui.heading(RichText::new("HealthGuard").size(22.0));
            ui.label(RichText::new(&self.endpoint).small().color(Color32::from_rgb(130, 130, 130)));
            ui.separator();
            ui.add_space(8.0);

            match snapshot.permission {
                PermissionState::Unknown => self.draw_permission_request(ui),
                PermissionState::Denied => {
                    ui.label(RichText::new("Permission caméra requise").size(16.0).color(Color32::from_rgb(220, 90, 90)));
                }
                PermissionState::Granted => {
                    self.draw_controls(ui, &snapshot.task);
                    ui.add_space(8.0);
                    self.draw_preview(ui);
                    self.draw_result(ui, &snapshot.state);
                }
            }

            ui.add_space(12.0);
            self.draw_server_status(ui);
        });

        if self.in_flight.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

impl HealthGuardApp {
    fn draw_permission_request(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(40.0);
            ui.label(RichText::new("Nous avons besoin de la caméra pour analyser l'image").size(16.0));
            ui.add_space(10.0);
            if ui.add(egui::Button::new(RichText::new("Autoriser la caméra").size(15.0))
                .fill(Color32::from_rgb(42, 90, 170))
                .rounding(8.0)
            ).clicked() {
                match self.session.try_lock() {
                    Ok(mut session) => {
                        session.request_permission();
                    }
                    Err(_) => error!("Session busy, permission request skipped"),
                }
            }
        });
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui, task: &TaskId) {
        let busy = self.in_flight.is_busy();
        egui::Frame::none()
            .fill(Color32::from_rgb(35, 35, 35))
            .rounding(8.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("Analyse:").size(14.0));
                    let mut selected: Option<&str> = None;
                    egui::ComboBox::from_id_source("task_selector")
                        .selected_text(task.as_str())
                        .show_ui(ui, |ui| {
                            for choice in KNOWN_TASKS {
                                if ui.selectable_label(task.as_str() == *choice, *choice).clicked() {
                                    selected = Some(*choice);
                                }
                            }
                        });
                    if let Some(choice) = selected {
                        self.change_task(choice);
                    }

                    ui.label(RichText::new("Source:").size(14.0));
                    let mut source = self.source.lock().unwrap_or_else(PoisonError::into_inner);
                    for option in [GuiSource::Screen, GuiSource::Picker] {
                        ui.selectable_value(&mut *source, option, option.label());
                    }
                });
            });

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            let analyse = ui.add_enabled(!busy, egui::Button::new(
                RichText::new("📷 Analyser").size(15.0))
                .fill(Color32::from_rgb(42, 90, 170))
                .rounding(8.0)
            ).on_disabled_hover_text("Analyse déjà en cours");
            if analyse.clicked() {
                self.start_analysis(ui.ctx());
            }
            if busy {
                ui.spinner();
            }
        });
    }

    fn draw_preview(&self, ui: &mut egui::Ui) {
        if let Some(texture) = &self.preview {
            let available_width = ui.available_width();
            let size = texture.size_vec2();
            let aspect_ratio = if size.y > 0.0 { size.x / size.y } else { 1.0 };
            let mut image_size = Vec2::new(available_width, available_width / aspect_ratio);
            if image_size.y > PREVIEW_MAX_HEIGHT {
                image_size = Vec2::new(PREVIEW_MAX_HEIGHT * aspect_ratio, PREVIEW_MAX_HEIGHT);
            }
            ui.image((texture.id(), image_size));
            ui.add_space(8.0);
        }
    }

    fn draw_result(&self, ui: &mut egui::Ui, state: &SessionState) {
        let Some(text) = state.display_text() else {
            return;
        };
        let color = match state {
            SessionState::ErrorDisplayed(_) | SessionState::PermissionDenied => Color32::from_rgb(220, 90, 90),
            _ => Color32::WHITE,
        };
        egui::Frame::none()
            .fill(Color32::from_rgb(50, 50, 50))
            .rounding(8.0)
            .stroke(Stroke::new(1.0, Color32::from_rgb(70, 70, 70)))
            .inner_margin(egui::Margin::symmetric(16.0, 12.0))
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.label(RichText::new(&text).size(18.0).color(color));
                if let SessionState::ResultDisplayed(result) = state {
                    if ui.button(RichText::new("📋 Copier").size(13.0)).clicked() {
                        copy_to_clipboard(&result.display_text());
                    }
                }
            });
    }

    fn draw_server_status(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.small_button("Vérifier le serveur").clicked() {
                self.check_server(ui.ctx());
            }
            if let Some(status) = self.server_status.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
                ui.label(RichText::new(status).small());
            }
        });
    }

    fn change_task(&mut self, name: &str) {
        match (TaskId::new(name), self.session.try_lock()) {
            (Ok(task), Ok(mut session)) => session.set_task(task),
            (Err(e), _) => error!("Invalid task '{}': {}", name, e),
            (_, Err(_)) => info!("Analysis running, task change ignored"),
        }
    }

    fn start_analysis(&mut self, ctx: &egui::Context) {
        // Reject-while-busy: a second click while a cycle runs does nothing.
        let Some(token) = self.in_flight.try_begin() else {
            info!("Analysis already in progress, click ignored");
            return;
        };
        let source = *self.source.lock().unwrap_or_else(PoisonError::into_inner);
        if source == GuiSource::Picker {
            // Native dialogs stay on the UI thread.
            let Some(path) = rfd::FileDialog::new()
                .set_title("Choisir une photo")
                .add_filter("Images", IMAGE_EXTENSIONS)
                .pick_file()
            else {
                info!("No photo picked, analysis cancelled");
                return;
            };
            info!("Picked {}", path.display());
            *self.picked.lock().unwrap_or_else(PoisonError::into_inner) = Some(path);
        }
        let session = Arc::clone(&self.session);
        let ctx = ctx.clone();
        info!("Starting analysis.");
        thread::spawn(move || {
            let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
            match session.run_claimed(token) {
                Ok(result) => info!("Analysis complete: {}", result),
                Err(e) => error!("Analysis error: {}", e),
            }
            ctx.request_repaint();
        });
    }

    fn check_server(&mut self, ctx: &egui::Context) {
        let client = Arc::clone(&self.client);
        let status = Arc::clone(&self.server_status);
        let ctx = ctx.clone();
        thread::spawn(move || {
            let text = match client.health() {
                Ok(health) if health.is_ok() => "✓ Serveur disponible".to_string(),
                Ok(health) => format!("✗ Serveur: {}", health.status),
                Err(e) => format!("✗ {}", e),
            };
            *status.lock().unwrap_or_else(PoisonError::into_inner) = Some(text);
            ctx.request_repaint();
        });
    }

    fn refresh_preview(&mut self, ctx: &egui::Context, capture: Option<&PathBuf>) {
        let Some(path) = capture else {
            return;
        };
        if self.preview_path.as_ref() == Some(path) {
            return;
        }
        // Remembered even on failure so a broken file is not reloaded every frame.
        self.preview_path = Some(path.clone());
        match image::open(path) {
            Ok(picture) => {
                let size = [picture.width() as usize, picture.height() as usize];
                let color_image = egui::ColorImage::from_rgba_unmultiplied(
                    size,
                    picture.to_rgba8().as_flat_samples().as_slice(),
                );
                self.preview = Some(ctx.load_texture(
                    "capture_preview",
                    color_image,
                    egui::TextureOptions::LINEAR,
                ));
            }
            Err(e) => {
                error!("Failed to load preview {}: {}", path.display(), e);
                self.preview = None;
            }
        }
    }
}

fn copy_to_clipboard(text: &str) {
    #[cfg(feature = "clipboard")]
    {
        match Clipboard::new() {
            Ok(mut clipboard) => {
                if let Err(e) = clipboard.set_text(text.to_string()) {
                    error!("Failed to copy result to clipboard: {}", e);
                } else {
                    info!("Result copied to clipboard");
                }
            }
            Err(e) => {
                error!("Failed to access clipboard: {}", e);
            }
        }
    }
    #[cfg(not(feature = "clipboard"))]
    {
        error!("Clipboard feature not enabled, cannot copy '{}'", text);
    }
}

pub fn run_gui(config: ClientConfig) -> Result<()> {
    info!("HealthGuard GUI starting up...");

    let app = HealthGuardApp::new(config)?;
    let native_options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(WINDOW_WIDTH, WINDOW_HEIGHT)),
        ..eframe::NativeOptions::default()
    };

    eframe::run_native(
        "HealthGuard",
        native_options,
        Box::new(move |_cc| {
            Box::new(app)
        }),
    )
    .map_err(|e| anyhow::anyhow!("Failed to start GUI: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn picker_camera(capture_dir: &std::path::Path) -> SelectableCamera {
        SelectableCamera {
            source: Arc::new(Mutex::new(GuiSource::Picker)),
            screen: ScreenCamera::new(capture_dir),
            picked: Arc::new(Mutex::new(None)),
            capture_dir: capture_dir.to_path_buf(),
        }
    }

    #[test]
    fn picker_source_uses_the_photo_chosen_beforehand() {
        let photos = tempfile::tempdir().unwrap();
        let captures = tempfile::tempdir().unwrap();
        let photo = photos.path().join("eye.jpg");
        RgbImage::from_pixel(8, 8, Rgb([200, 40, 40])).save(&photo).unwrap();

        let mut camera = picker_camera(captures.path());
        *camera.picked.lock().unwrap() = Some(photo.clone());

        let captured = camera.take_picture().unwrap();
        assert!(captured.path().starts_with(captures.path()));
        assert_eq!(std::fs::read(captured.path()).unwrap(), std::fs::read(&photo).unwrap());
        assert!(camera.picked.lock().unwrap().is_none());
    }

    #[test]
    fn picker_source_without_a_choice_yields_no_image() {
        let captures = tempfile::tempdir().unwrap();
        let mut camera = picker_camera(captures.path());
        assert!(matches!(camera.take_picture(), Err(CaptureError::NoImage)));
    }
}
