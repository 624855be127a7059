// src/main.rs
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{error, info};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use healthguard::capture::file::FileCamera;
use healthguard::capture::permission::{ConsolePrompt, FixedPrompt};
use healthguard::capture::picker::PickerCamera;
use healthguard::capture::screenshot::ScreenCamera;
use healthguard::config::default_config_path;
use healthguard::diagnosis::task::KNOWN_TASKS;
use healthguard::{
    batch, Camera, CaptureAdapter, ClientConfig, ConfigError, ConfigOverrides, CycleError,
    DiagnosisConnector, DiagnosisResult, PermissionState, Session, SubmissionClient, SubmitError, TaskId,
};

mod gui;

#[derive(Parser)]
#[command(name = "healthguard")]
#[command(about = "Capture a photo and get a diagnosis from a HealthGuard server", long_about = None)]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ServerArgs {
    /// Server base URL, e.g. http://192.168.1.20:5000 (overrides HEALTHGUARD_API_URL)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Config file (default: <config dir>/healthguard/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CameraSource {
    /// Primary display
    Screen,
    /// A file, or the newest picture of a folder (see --from)
    File,
    /// Native file dialog
    Picker,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a picture and analyse it
    Capture {
        /// Model to run (e.g. "diabetes", "anemia", "deficiency")
        #[arg(long, short = 't')]
        task: Option<String>,

        /// Where the picture comes from
        #[arg(long, value_enum, default_value = "screen")]
        source: CameraSource,

        /// File or folder for --source file
        #[arg(long)]
        from: Option<PathBuf>,

        /// Keep a copy of the captured JPEG
        #[arg(long)]
        save: Option<PathBuf>,

        /// Grant camera permission without asking
        #[arg(long, short = 'y')]
        yes: bool,

        /// Skip the analysis - just capture (requires --save)
        #[arg(long)]
        no_submit: bool,
    },
    /// Analyse an existing picture
    Analyze {
        file: PathBuf,

        #[arg(long, short = 't')]
        task: Option<String>,
    },
    /// Analyse every .jpg/.jpeg/.png in a folder and print statistics
    Batch {
        dir: PathBuf,

        #[arg(long, short = 't')]
        task: Option<String>,
    },
    /// Check that the server is reachable
    CheckServer,
    /// List the tasks served by the reference backend
    ListTasks,
    /// Run simple interactive mode
    Interactive,
    /// Run graphical user interface
    Gui,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or("RUST_LOG", "info")
    );

    let cli = Cli::parse();

    match cli.command {
        Commands::Capture { task, source, from, save, yes, no_submit } => {
            let config = resolve_config(&cli.server, task)?;
            run_capture_cli(config, source, from, save, yes, no_submit)
        }
        Commands::Analyze { file, task } => {
            let config = resolve_config(&cli.server, task)?;
            analyze_file_cli(config, &file)
        }
        Commands::Batch { dir, task } => {
            let config = resolve_config(&cli.server, task)?;
            run_batch_cli(config, &dir)
        }
        Commands::CheckServer => {
            let config = resolve_config(&cli.server, None)?;
            check_server_status(&config)
        }
        Commands::ListTasks => {
            list_tasks();
            Ok(())
        }
        Commands::Interactive => {
            let config = resolve_config(&cli.server, None)?;
            run_interactive_mode(config)
        }
        Commands::Gui => {
            let config = resolve_config(&cli.server, None)?;
            gui::run_gui(config)
        }
    }
}

fn resolve_config(server: &ServerArgs, task: Option<String>) -> Result<ClientConfig> {
    let overrides = ConfigOverrides {
        endpoint: server.endpoint.clone(),
        config_file: server.config.clone(),
        timeout_secs: server.timeout,
        task,
        capture_dir: None,
    };
    ClientConfig::resolve(overrides).map_err(|e| {
        if let Some(hint) = config_error_hint(&e) {
            error!("{}", hint);
        }
        anyhow!(e)
    })
}

fn config_error_hint(e: &ConfigError) -> Option<String> {
    match e {
        ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => {
            Some(format!("Configuration file {} could not be used", path.display()))
        }
        ConfigError::MissingEndpoint => {
            let file = default_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "the config file".to_string());
            Some(format!(
                "No server configured: pass --endpoint, set HEALTHGUARD_API_URL or add `endpoint` to {}",
                file
            ))
        }
        _ => None,
    }
}

fn build_camera(source: CameraSource, from: Option<PathBuf>, capture_dir: &Path) -> Result<Box<dyn Camera>> {
    Ok(match source {
        CameraSource::Screen => Box::new(ScreenCamera::new(capture_dir)),
        CameraSource::Picker => Box::new(PickerCamera::new(capture_dir)),
        CameraSource::File => {
            let from = from.ok_or_else(|| anyhow!("--source file needs --from <FILE|DIR>"))?;
            Box::new(FileCamera::new(from, capture_dir))
        }
    })
}

fn run_capture_cli(
    config: ClientConfig,
    source: CameraSource,
    from: Option<PathBuf>,
    save: Option<PathBuf>,
    yes: bool,
    no_submit: bool,
) -> Result<()> {
    info!("Starting headless capture mode");

    let camera = build_camera(source, from, &config.capture_dir)?;
    let prompt: Box<dyn healthguard::capture::PermissionPrompt> = if yes {
        Box::new(FixedPrompt::new(PermissionState::Granted))
    } else {
        Box::new(ConsolePrompt::stdio())
    };
    let mut adapter = CaptureAdapter::new(camera, prompt);

    if no_submit {
        let save_path = save.ok_or_else(|| anyhow!("--no-submit needs --save <FILE>"))?;
        if adapter.request_permission() != PermissionState::Granted {
            println!("Permission caméra requise");
            return Err(anyhow!("camera permission not granted"));
        }
        let image = adapter.capture()?;
        std::fs::copy(image.path(), &save_path)?;
        std::fs::remove_file(image.path())?;
        info!("Picture saved to: {}", save_path.display());
        return Ok(());
    }

    let task = config.default_task.clone();
    let client = SubmissionClient::new(config)?;
    let mut session = Session::new(adapter, Box::new(client), task.clone())
        .retain_captures(save.is_some());

    if session.request_permission() != PermissionState::Granted {
        println!("Permission caméra requise");
        return Err(anyhow!("camera permission not granted"));
    }

    let outcome = session.run_cycle();
    if let (Some(save_path), Some(captured)) = (&save, session.snapshot().last_capture) {
        std::fs::copy(&captured, save_path)?;
        std::fs::remove_file(&captured)?;
        info!("Picture saved to: {}", save_path.display());
    }
    print_outcome(&task, outcome)
}

fn analyze_file_cli(config: ClientConfig, file: &Path) -> Result<()> {
    let task = config.default_task.clone();
    let capture_dir = config.capture_dir.clone();
    let client = Arc::new(SubmissionClient::new(config)?);
    print_outcome(&task, analyze_file(client, &task, file, &capture_dir))
}

/// A picture the user already has needs no camera permission. The copy made
/// in `capture_dir` goes away with the session.
fn analyze_file(
    connector: impl DiagnosisConnector + 'static,
    task: &TaskId,
    file: &Path,
    capture_dir: &Path,
) -> Result<DiagnosisResult, CycleError> {
    let adapter = CaptureAdapter::new(
        Box::new(FileCamera::new(file, capture_dir)),
        Box::new(FixedPrompt::new(PermissionState::Granted)),
    );
    let mut session = Session::new(adapter, Box::new(connector), task.clone());
    session.request_permission();
    session.run_cycle()
}

fn print_outcome(task: &TaskId, outcome: Result<DiagnosisResult, CycleError>) -> Result<()> {
    match outcome {
        Ok(result) => {
            println!("\n=== HealthGuard ({}) ===", task);
            println!("{}", result.display_text());
            if let Some(score) = result.score {
                println!("Raw score: {}", score);
            }
            println!("===========================================\n");
            Ok(())
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            println!("\n{}", e.user_message());
            print_hint(&e);
            Err(anyhow!(e))
        }
    }
}

fn print_hint(e: &CycleError) {
    match e {
        CycleError::Submit(SubmitError::Transport(_)) => {
            println!("\nMake sure the HealthGuard server is running and reachable,");
            println!("then check the endpoint: healthguard --endpoint http://<host>:5000 check-server");
        }
        CycleError::Submit(SubmitError::Server { status: 500, .. }) => {
            println!("\nThe server could not run the model. Known tasks:");
            for task in KNOWN_TASKS {
                println!("  - {}", task);
            }
        }
        _ => {}
    }
}

fn run_batch_cli(config: ClientConfig, dir: &Path) -> Result<()> {
    let task = config.default_task.clone();
    let scratch = config.capture_dir.clone();
    let client = SubmissionClient::new(config)?;

    let report = batch::run_batch(&client, &task, dir, &scratch)?;
    for entry in &report.entries {
        let name = entry.file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        match &entry.outcome {
            Ok(result) => match result.score {
                Some(score) => println!("{}: {} (conf={}, raw={})", name, result.diagnosis, result.confidence, score),
                None => println!("{}: {} (conf={})", name, result.diagnosis, result.confidence),
            },
            Err(e) => println!("{}: Erreur - {}", name, e),
        }
    }

    println!("\nTotal images: {}", report.total());
    for (diagnosis, count) in report.counts() {
        println!("Prédit '{}': {}", diagnosis, count);
    }
    if report.failures() > 0 {
        println!("Erreurs: {}", report.failures());
    }
    if let Some(mean) = report.mean_confidence() {
        println!("Confiance moyenne: {:.2}%", mean);
    }
    Ok(())
}

fn check_server_status(config: &ClientConfig) -> Result<()> {
    let url = &config.base_endpoint;
    info!("Checking server status at {}...", url);

    let client = SubmissionClient::new(config.clone())?;
    match client.health() {
        Ok(health) if health.is_ok() => {
            println!("✓ HealthGuard server is running at {}", url);
        }
        Ok(health) => {
            println!("✗ Server at {} reports status '{}'", url, health.status);
        }
        Err(e) => {
            println!("✗ Could not reach HealthGuard server at {}", url);
            println!("  Error: {}", e);
            println!("\nTroubleshooting:");
            println!("  1. Start the backend (it listens on port 5000 by default)");
            println!("  2. Use the machine's LAN address, not localhost, when the server runs elsewhere");
            println!("  3. Set HEALTHGUARD_API_URL or pass --endpoint");
        }
    }

    Ok(())
}

fn list_tasks() {
    println!("\nTasks served by the reference backend:");
    for task in KNOWN_TASKS {
        let marker = if *task == TaskId::default().as_str() { " (default)" } else { "" };
        println!("  - {}{}", task, marker);
    }
    println!();
}

fn run_interactive_mode(config: ClientConfig) -> Result<()> {
    println!("🩺  HealthGuard Interactive Mode");
    println!("===============================");
    println!();

    let capture_dir = config.capture_dir.clone();
    let base_endpoint = config.base_endpoint.clone();
    let client = Arc::new(SubmissionClient::new(config.clone())?);

    let adapter = CaptureAdapter::new(
        Box::new(ScreenCamera::new(&capture_dir)),
        Box::new(ConsolePrompt::stdio()),
    );
    let mut session = Session::new(adapter, Box::new(Arc::clone(&client)), config.default_task.clone());

    let stdin = io::stdin();
    let mut input = String::new();

    // Main menu loop
    loop {
        let task = session.task();
        println!("\nMain Menu (server: {}, task: {}):", base_endpoint, task);
        println!("1. Capture Screen and Analyse");
        println!("2. Analyse an Image File");
        println!("3. Change Task");
        println!("4. Check Server");
        println!("5. Exit");
        print!("\nEnter your choice (1-5): ");
        io::stdout().flush()?;

        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let choice = input.trim();

        match choice {
            "1" => {
                if session.request_permission() != PermissionState::Granted {
                    println!("✗ Permission caméra requise");
                    continue;
                }
                println!("\nCapturing and analysing...");
                // The error was already printed; stay in the menu.
                let _ = print_outcome(&task, session.run_cycle());
            }
            "2" => {
                print!("Enter the path of the picture: ");
                io::stdout().flush()?;

                input.clear();
                stdin.lock().read_line(&mut input)?;
                let path = input.trim();

                if !path.is_empty() {
                    println!("\nAnalysing {}...", path);
                    let outcome = analyze_file(Arc::clone(&client), &task, Path::new(path), &capture_dir);
                    let _ = print_outcome(&task, outcome);
                }
            }
            "3" => {
                list_tasks();
                print!("Enter task name (or leave empty to cancel): ");
                io::stdout().flush()?;

                input.clear();
                stdin.lock().read_line(&mut input)?;
                let name = input.trim();

                if !name.is_empty() {
                    match TaskId::new(name) {
                        Ok(new_task) => {
                            if !new_task.is_known() {
                                println!("Note: '{}' is not a known task, the server may reject it", new_task);
                            }
                            session.set_task(new_task);
                        }
                        Err(e) => println!("✗ {}", e),
                    }
                }
            }
            "4" => {
                check_server_status(&config)?;
            }
            "5" => {
                println!("Exiting HealthGuard");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter a number between 1 and 5.");
            }
        }
    }

    Ok(())
}
