use reqwest::Client;

use crate::cinemeta::CinemetaClient;
use crate::config::Config;

pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
        }
    }

    fn warning(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
        }
    }

    fn error(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
        }
    }

    pub fn icon(&self) -> &'static str {
        match self.status {
            CheckStatus::Ok => "✓",
            CheckStatus::Warning => "⚠",
            CheckStatus::Error => "✗",
        }
    }

    pub fn color(&self) -> &'static str {
        match self.status {
            CheckStatus::Ok => "\x1b[32m",      // green
            CheckStatus::Warning => "\x1b[33m", // yellow
            CheckStatus::Error => "\x1b[31m",   // red
        }
    }
}

pub async fn run_checks(config: &Config, client: &Client) -> Vec<CheckResult> {
    vec![
        check_debrid(config),
        check_cinemeta(config, client).await,
        check_player(config),
    ]
}

fn check_debrid(config: &Config) -> CheckResult {
    match config.debrid.token() {
        Some(_) => CheckResult::ok(
            "Real-Debrid",
            &format!(
                "Token configured, resolve timeout {}s",
                config.debrid.resolve_timeout_secs
            ),
        ),
        None => CheckResult::warning(
            "Real-Debrid",
            "No token configured. Magnet links will be handed to the player directly.",
        ),
    }
}

async fn check_cinemeta(config: &Config, client: &Client) -> CheckResult {
    let cinemeta = CinemetaClient::with_base_url(client.clone(), &config.endpoints.cinemeta);

    match cinemeta.search("matrix").await {
        Ok(items) => CheckResult::ok("Cinemeta", &format!("Reachable, {} results", items.len())),
        Err(e) => CheckResult::error("Cinemeta", &format!("Connection failed: {}", e)),
    }
}

fn check_player(config: &Config) -> CheckResult {
    let player = &config.player.command;

    match which::which(player) {
        Ok(path) => CheckResult::ok("Player", &format!("{} found at {}", player, path.display())),
        Err(_) => CheckResult::error("Player", &format!("'{}' not found in PATH", player)),
    }
}

/// Number of (errors, warnings)
pub fn summarize(results: &[CheckResult]) -> (usize, usize) {
    let count = |status: CheckStatus| results.iter().filter(|r| r.status == status).count();
    (count(CheckStatus::Error), count(CheckStatus::Warning))
}

pub fn print_results(results: &[CheckResult]) {
    let reset = "\x1b[0m";

    println!("\nmagplay doctor\n");

    for result in results {
        println!(
            "  {}{} {}{}  {}",
            result.color(),
            result.icon(),
            result.name,
            reset,
            result.message
        );
    }

    println!();

    let (errors, warnings) = summarize(results);

    if errors > 0 {
        println!("  {} error(s), {} warning(s)", errors, warnings);
        println!("  Fix errors above to use magplay.\n");
    } else if warnings > 0 {
        println!(
            "  {} warning(s) - magplay will work with limited features.\n",
            warnings
        );
    } else {
        println!("  All checks passed!\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_debrid() {
        let mut config = Config::default();
        assert_eq!(check_debrid(&config).status, CheckStatus::Warning);

        config.debrid.token = Some("abc".to_string());
        assert_eq!(check_debrid(&config).status, CheckStatus::Ok);
    }

    #[test]
    fn test_check_player_missing() {
        let mut config = Config::default();
        config.player.command = "magplay-no-such-player".to_string();
        let result = check_player(&config);
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.icon(), "✗");
    }

    #[test]
    fn test_summarize() {
        let results = vec![
            CheckResult::ok("a", ""),
            CheckResult::warning("b", ""),
            CheckResult::error("c", ""),
            CheckResult::error("d", ""),
        ];
        assert_eq!(summarize(&results), (2, 1));
    }
}
