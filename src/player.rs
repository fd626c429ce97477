use std::process::Stdio;

use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::info;

use crate::config::PlayerConfig;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("failed to launch player '{0}': {1}. Is the player installed and in your PATH?")]
    Launch(String, String),
    #[error("player '{0}' exited with {1}")]
    Exited(String, std::process::ExitStatus),
    #[error("failed to wait for player: {0}")]
    Wait(#[from] std::io::Error),
}

/// Build the player command line: configured args, then the URL
pub fn player_command(config: &PlayerConfig, url: &str) -> Command {
    let mut cmd = Command::new(&config.command);

    // mpv prints progress to the terminal otherwise
    if config.command.contains("mpv") {
        cmd.args(["--force-seekable=yes", "--really-quiet"]);
    }

    cmd.args(&config.args);
    cmd.arg(url);

    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    cmd
}

pub fn launch_player(config: &PlayerConfig, url: &str) -> Result<Child, PlayerError> {
    info!(player = %config.command, "launching player");

    player_command(config, url)
        .spawn()
        .map_err(|e| PlayerError::Launch(config.command.clone(), e.to_string()))
}

/// Launch the player and wait for it to exit
pub async fn play(config: &PlayerConfig, url: &str) -> Result<(), PlayerError> {
    let mut child = launch_player(config, url)?;
    let status = child.wait().await?;

    if !status.success() {
        return Err(PlayerError::Exited(config.command.clone(), status));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_command_args() {
        let config = PlayerConfig {
            command: "vlc".to_string(),
            args: vec!["--fullscreen".to_string()],
        };
        let cmd = player_command(&config, "https://example.com/movie.mkv");
        let args: Vec<_> = cmd.as_std().get_args().collect();
        assert_eq!(args, ["--fullscreen", "https://example.com/movie.mkv"]);
    }

    #[test]
    fn test_player_command_mpv_flags() {
        let config = PlayerConfig::default();
        let cmd = player_command(&config, "magnet:?xt=urn:btih:abc");
        let args: Vec<_> = cmd.as_std().get_args().collect();
        assert_eq!(
            args,
            ["--force-seekable=yes", "--really-quiet", "magnet:?xt=urn:btih:abc"]
        );
    }

    #[tokio::test]
    async fn test_missing_player() {
        let config = PlayerConfig {
            command: "magplay-no-such-player".to_string(),
            args: Vec::new(),
        };
        let err = launch_player(&config, "https://example.com").unwrap_err();
        assert!(matches!(err, PlayerError::Launch(ref cmd, _) if cmd == "magplay-no-such-player"));
    }
}
