//! Terminal host for the call screen.
//!
//! Reads credentials from the environment, mounts the screen in a call and
//! drives it from stdin. The loopback SDK stands in for the real-time SDK
//! and the UI kit.

mod commands;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use callscreen_core::loopback::{LoopbackEngine, LoopbackUiKit, PickerResponse};
use callscreen_core::{
    CallError, CallScreen, SessionCredentials, SettingsStore, StyleProps, UiKitCallback,
};
use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

use commands::{Command, HELP};

fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("callscreen_core=info,callscreen_cli=info")
        });
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    });
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("callscreen")
}

/// Mount the UI kit and hand its local tracks to the shell.
async fn enter_call(
    screen: &CallScreen,
    kit: &LoopbackUiKit,
    display_name: Option<String>,
) -> Result<(), CallError> {
    screen.start_call(display_name).await?;
    if let Some((audio, video)) = kit.local_tracks() {
        screen
            .handle_callback(UiKitCallback::LocalTracksReady { audio, video })
            .await?;
    }
    Ok(())
}

/// The shell already surfaces operation failures as events; only pass on
/// errors it rejected up front.
fn unreported<T>(result: Result<T, CallError>) -> Result<(), CallError> {
    match result {
        Err(CallError::NotInCall) => Err(CallError::NotInCall),
        _ => Ok(()),
    }
}

async fn run_command(
    command: Command,
    screen: &CallScreen,
    kit: &LoopbackUiKit,
    settings: &SettingsStore,
) -> Result<(), CallError> {
    match command {
        Command::Join(name) => {
            let name = name.or_else(|| settings.get().display_name);
            if name.is_some() {
                settings.set_display_name(name.clone());
            }
            enter_call(screen, kit, name).await?;
            println!("{}", render::render_view(&screen.view().await));
        }
        Command::ToggleAudio => unreported(screen.toggle_audio().await)?,
        Command::ToggleVideo => unreported(screen.toggle_video().await)?,
        Command::ToggleScreenShare => unreported(screen.toggle_screen_share().await)?,
        Command::EndCall => unreported(screen.end_call().await)?,
        Command::View => println!("{}", render::render_view(&screen.view().await)),
        Command::Props => match kit.mounted_props() {
            Some(props) => match serde_json::to_string_pretty(&props) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::warn!("cannot serialize props: {e}"),
            },
            None => println!("UI kit not mounted"),
        },
        Command::Users => {
            let users = screen.participants().await;
            if users.is_empty() {
                println!("no remote users");
            }
            for user in users {
                println!("{}", user.uid);
            }
        }
        Command::Kit(event) => unreported(screen.handle_callback(event.into_callback()).await)?,
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let credentials = match SessionCredentials::from_env() {
        Ok(credentials) => Arc::new(credentials),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let settings = SettingsStore::new(data_dir());
    let prefs = settings.get();

    let engine = LoopbackEngine::new().with_default_response(PickerResponse::VideoWithAudio);
    let kit = Arc::new(LoopbackUiKit::new(engine.clone()));
    let screen = CallScreen::new(credentials, Arc::new(engine), kit.clone())
        .with_style(StyleProps::default().with_theme(prefs.theme))
        .with_layout(prefs.layout);

    let mut events = screen.events();
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            println!("{}", render::render_event(&event));
        }
    });

    // The screen opens already in the call.
    if let Err(e) = enter_call(&screen, &kit, prefs.display_name).await {
        tracing::error!("failed to enter call: {e}");
    }
    println!("{}", render::render_view(&screen.view().await));
    println!("type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("stdin: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => {
                if let Err(e) = run_command(command, &screen, &kit, &settings).await {
                    println!("! {e}");
                }
            }
            Err(e) => println!("{e}"),
        }
    }

    match screen.unmount().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("unmount: {e}");
            ExitCode::FAILURE
        }
    }
}
