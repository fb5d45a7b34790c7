//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// A terminal voice chat client for a conversational agent server
#[derive(Parser)]
#[command(name = "parley")]
#[command(version)]
#[command(about = "Talk to a voice agent from your terminal")]
#[command(
    long_about = "Talk to a voice agent from your terminal.\n\nRecords microphone audio, uploads it to the agent server, and shows the\ntranscript and assistant reply. The assistant's synthesized voice is played\nback through the system audio player.\n\nDEFAULT COMMAND:\n    If no command is specified, 'chat' is used by default.\n\nEXAMPLES:\n    # Start a chat session against the configured server\n    $ parley\n\n    # Use a different agent server for this session\n    $ parley chat --server http://192.168.1.20:8000\n\n    # Save the conversation as an HTML transcript on exit\n    $ parley chat --export conversation.html\n\n    # List audio input devices\n    $ parley list-devices\n\n    # Edit configuration file\n    $ parley config"
)]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/parley/parley.toml\n    Logs:               ~/.local/state/parley/parley.log.*"
)]
struct Cli {
    /// Base URL of the agent server (chat default command)
    #[arg(short, long, value_name = "URL", global = true)]
    server: Option<String>,

    /// Write the chat log as an HTML transcript on exit (chat default command)
    #[arg(short, long, value_name = "FILE", global = true)]
    export: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive voice chat session (default)
    ///
    /// Press Space or Enter to start recording, again to stop and send.
    /// The transcript and assistant reply appear in the chat log.
    /// Press Escape/q to end the session.
    #[command(visible_alias = "c")]
    Chat {
        /// Base URL of the agent server, overriding the config file
        #[arg(short, long, value_name = "URL")]
        server: Option<String>,

        /// Write the chat log as an HTML transcript on exit
        #[arg(short, long, value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the correct input device in parley.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Open configuration file in your preferred editor
    ///
    /// Edit the agent server URL, audio settings, and playback options.
    /// Uses $EDITOR environment variable or falls back to nano/vim.
    Config,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    /// Useful for troubleshooting issues.
    Logs,

    /// Generate shell completion script
    ///
    /// Generate completion script for your shell. Save the output to your
    /// shell's completion directory or source it directly.
    ///
    /// Examples:
    ///   parley completions bash > parley.bash
    ///   parley completions zsh > _parley
    ///   parley completions fish > parley.fish
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Exit Codes
/// - 0: Success
/// - 1: General error
/// - 2: Usage error (invalid arguments)
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails (e.g., recording, upload, config editing)
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Handle commands that don't need logging or config setup
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "parley", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return match commands::handle_list_devices() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        Some(Commands::Logs) => {
            return match commands::handle_logs() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        _ => {}
    }

    // Initialize logging for all other commands
    logging::init_logging()?;

    // Route to appropriate command handler
    match cli.command {
        None | Some(Commands::Chat { .. }) => {
            // Default command is chat
            // Merge top-level options with explicit chat command options
            // If both are specified, the explicit chat command options take precedence
            let (server, export) = match cli.command {
                Some(Commands::Chat { server, export }) => (server, export),
                None => (cli.server, cli.export),
                _ => unreachable!(),
            };
            commands::handle_chat(server, export).await?;
        }
        Some(Commands::Config) => {
            commands::handle_config()?;
        }
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
