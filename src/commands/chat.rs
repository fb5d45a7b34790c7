//! Interactive voice chat session.
//!
//! Runs the main event loop: toggle recording on key press, package and
//! upload the captured audio when recording stops, and apply the agent's
//! reply to the chat views. Supports external toggles via SIGUSR1 signal.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::chat::{self, ChatSession, ViewSink};
use crate::client::AgentClient;
use crate::config::ParleyConfig;
use crate::playback;
use crate::recording::{AudioRecorder, RecorderState};
use crate::ui::{ChatCommand, ChatTui, ErrorScreen};

/// Runs an interactive voice chat session against the agent server.
///
/// A fresh session identifier is generated for this run; the chat log lives
/// only for the lifetime of the process (optionally exported as HTML on exit).
pub async fn handle_chat(
    server_override: Option<String>,
    export: Option<PathBuf>,
) -> Result<(), anyhow::Error> {
    tracing::info!("=== parley chat session started ===");

    let config = match ParleyConfig::load_or_init() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            let error_message = format!(
                "Configuration Error:\n\n{err}\n\nPlease check your ~/.config/parley/parley.toml file and try again."
            );
            let mut error_screen = ErrorScreen::new()?;
            error_screen.show_error(&error_message)?;
            error_screen.cleanup()?;
            return Err(anyhow::anyhow!("Configuration error: {err}"));
        }
    };

    let base_url = server_override.unwrap_or_else(|| config.server.base_url.clone());
    let client = AgentClient::new(&base_url, config.server.request_timeout_secs)?;

    tracing::info!(
        "Configuration loaded: server={}, device={}, sample_rate={}Hz, session={}",
        base_url,
        config.audio.device,
        config.audio.sample_rate,
        client.session_id()
    );

    let mut recorder = AudioRecorder::new(config.audio.sample_rate, config.audio.device.clone());
    let mut session = ChatSession::new();
    let mut tui = ChatTui::new(config.audio.sample_rate)
        .map_err(|e| anyhow::anyhow!("Failed to initialize UI: {e}"))?;

    // SIGUSR1 behaves like the toggle key, for window manager keybindings
    let external_toggle = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, external_toggle.clone())
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;

    tracing::debug!("Entering chat loop. Press Space to record, 'q' to quit.");

    loop {
        let command = if external_toggle.swap(false, Ordering::Relaxed) {
            tracing::info!("Received SIGUSR1: toggling recording via external trigger");
            ChatCommand::ToggleRecording
        } else {
            match tui.handle_input() {
                Ok(command) => command,
                Err(e) => {
                    tracing::error!("Input handling error: {}", e);
                    tui.cleanup().ok();
                    return Err(anyhow::anyhow!("Input handling error: {e}"));
                }
            }
        };

        match command {
            ChatCommand::Continue => {
                let samples = if recorder.state() == RecorderState::Recording {
                    recorder.samples()
                } else {
                    Vec::new()
                };
                if let Err(e) = tui.render(&samples) {
                    tracing::error!("Render error: {}", e);
                    tui.cleanup().ok();
                    return Err(anyhow::anyhow!("Render failed: {e}"));
                }
            }
            ChatCommand::ToggleRecording => match recorder.state() {
                RecorderState::Idle => match recorder.start() {
                    Ok(()) => {
                        tui.set_sample_rate(recorder.sample_rate());
                        tui.set_recording(true);
                    }
                    Err(e) => {
                        // Microphone failure leaves the recorder idle
                        tracing::error!("Failed to start recording: {}", e);
                        tui.show_error(&format!("Microphone access failed: {e}"));
                    }
                },
                RecorderState::Recording => {
                    tui.set_recording(false);
                    match recorder.stop() {
                        Ok(payload) => {
                            run_exchange(
                                &client,
                                &mut session,
                                &mut tui,
                                payload,
                                config.server.autoplay,
                            )
                            .await;
                        }
                        Err(e) => {
                            tracing::error!("Failed to package recording: {}", e);
                            tui.show_error(&format!("Failed to package recording: {e}"));
                        }
                    }
                }
            },
            ChatCommand::Quit => {
                if recorder.state() == RecorderState::Recording {
                    // Discard the in-progress recording; quitting never uploads
                    let _ = recorder.stop();
                }
                break;
            }
        }
    }

    tui.cleanup()
        .map_err(|e| anyhow::anyhow!("Cleanup failed: {e}"))?;

    if let Some(path) = export {
        chat::html::write_transcript(&path, session.log())?;
        println!("Transcript written to {}", path.display());
    }

    tracing::info!("=== parley chat session ended ===");
    Ok(())
}

/// Uploads one recording and applies the result to the chat views.
///
/// The upload runs as a spawned task while the UI animates the waiting
/// indicator; input is not processed until the exchange completes, so uploads
/// never overlap. Failures raise an alert and leave the views untouched.
async fn run_exchange(
    client: &AgentClient,
    session: &mut ChatSession,
    tui: &mut ChatTui,
    payload: Vec<u8>,
    autoplay: bool,
) {
    tui.set_loading(true);

    let task_client = client.clone();
    let upload_handle = tokio::spawn(async move { task_client.send_recording(payload).await });

    loop {
        if let Err(e) = tui.render(&[]) {
            tracing::warn!("Failed to render waiting indicator: {}", e);
        }

        if upload_handle.is_finished() {
            break;
        }

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    match upload_handle.await {
        Ok(Ok(reply)) => {
            let audio_url = client.files_url(&reply.audio_file);
            session.apply_reply(tui, &reply, &audio_url);

            if autoplay {
                // Best-effort: playback failures are logged, never surfaced
                tokio::spawn(async move {
                    if let Err(e) = playback::play_remote(&audio_url).await {
                        tracing::debug!("Reply playback skipped: {}", e);
                    }
                });
            }
        }
        Ok(Err(e)) => {
            tracing::error!("Chat upload failed: {}", e);
            session.apply_error(tui, &format!("Request failed: {e}"));
        }
        Err(e) => {
            tracing::error!("Chat upload task failed: {}", e);
            session.apply_error(tui, &format!("Request failed: {e}"));
        }
    }
}
