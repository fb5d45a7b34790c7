//! Best-effort playback of the assistant's synthesized reply.
//!
//! Downloads the reply audio from the agent's file endpoint to a temp file and
//! plays it with a system audio player. Playback is deliberately best-effort:
//! failures are logged but never surfaced to the user.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Downloads and plays a synthesized reply.
///
/// Intended to run in a detached task; the caller ignores the result beyond
/// logging. Blocks until the player exits so the temp file stays valid for
/// the whole playback.
///
/// # Errors
/// - If the audio resource cannot be fetched
/// - If no system audio player is available
pub async fn play_remote(url: &str) -> Result<()> {
    let audio_path = download_to_temp(url).await?;
    let result = play_file(&audio_path);

    if let Err(e) = std::fs::remove_file(&audio_path) {
        tracing::debug!("Failed to remove temp audio file: {}", e);
    }

    result
}

/// Fetches the audio resource into a temp file named after the process.
async fn download_to_temp(url: &str) -> Result<PathBuf> {
    tracing::debug!("Fetching reply audio from {url}");

    let response = reqwest::get(url)
        .await
        .map_err(|e| anyhow!("Failed to fetch reply audio: {e}"))?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Reply audio fetch failed with status {}",
            response.status()
        ));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| anyhow!("Failed to read reply audio body: {e}"))?;

    // Keep the server's extension so players pick the right decoder
    let extension = url.rsplit('.').next().filter(|ext| ext.len() <= 4);
    let filename = match extension {
        Some(ext) => format!("parley-reply-{}.{ext}", std::process::id()),
        None => format!("parley-reply-{}", std::process::id()),
    };
    let path = std::env::temp_dir().join(filename);

    std::fs::write(&path, &bytes)
        .map_err(|e| anyhow!("Failed to write temp audio file: {e}"))?;

    tracing::debug!("Reply audio saved: {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

/// Plays an audio file with the platform's audio player.
///
/// On macOS: uses `afplay`.
/// On Linux: tries common command-line players (mpv, ffplay, paplay).
fn play_file(audio_path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        let status = Command::new("afplay")
            .arg(audio_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| anyhow!("Failed to run afplay: {e}"))?;

        if !status.success() {
            return Err(anyhow!("afplay exited with {status}"));
        }
        Ok(())
    }

    #[cfg(not(target_os = "macos"))]
    {
        let players: &[(&str, &[&str])] = &[
            ("mpv", &["--no-video", "--really-quiet"]),
            ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "error"]),
            ("paplay", &[]),
        ];

        for (player, args) in players {
            let spawned = Command::new(player)
                .args(*args)
                .arg(audio_path)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();

            if let Ok(mut child) = spawned {
                let _ = child.wait();
                return Ok(());
            }
        }

        Err(anyhow!(
            "No audio player found. Install mpv, ffplay, or paplay for reply playback."
        ))
    }
}
