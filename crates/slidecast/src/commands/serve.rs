use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use crate::banner::{self, StartupInfo};
use crate::cli::ServeArgs;
use crate::config::Config;
use crate::live::LiveDeck;
use crate::live::reload::{FileSource, ReloadCoordinator};
use crate::parser;
use crate::render::HtmlRenderer;
use crate::server::auth::PresenterToken;
use crate::server::{self, AppState, ServerSettings};
use crate::theme::{THEME_NAMES, Theme};
use crate::tunnel::Tunnel;
use crate::watch::{self, FileWatcher};

/// Flags merged over the config file over built-in defaults.
struct Settings {
    host: String,
    port: u16,
    motion: bool,
    open_navigation: bool,
    keepalive: Duration,
    queue_capacity: usize,
    share: bool,
}

impl Settings {
    fn resolve(args: &ServeArgs, config: &Config) -> Self {
        Self {
            host: args.host.clone().unwrap_or_else(|| config.host().to_string()),
            port: args.port.unwrap_or_else(|| config.port()),
            motion: args.motion || config.motion(),
            open_navigation: args.open_navigation || config.open_navigation(),
            keepalive: Duration::from_secs(config.keepalive_secs()),
            queue_capacity: config.queue_capacity(),
            share: args.share || args.share_token.is_some(),
        }
    }
}

/// CLI flag, then the deck's own frontmatter, then the config file.
fn theme_name(args: &ServeArgs, deck_theme: Option<&str>, config: &Config) -> Result<String> {
    let name = args
        .theme
        .as_deref()
        .or(deck_theme)
        .unwrap_or_else(|| config.theme());
    if !THEME_NAMES.contains(&name) {
        anyhow::bail!(
            "Invalid theme: {name}. Must be one of: {}.",
            THEME_NAMES.join(", ")
        );
    }
    Ok(name.to_string())
}

fn asset_dir(file: &Path) -> PathBuf {
    file.canonicalize()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn browse_host(host: &str) -> &str {
    match host {
        "0.0.0.0" | "::" => "localhost",
        other => other,
    }
}

pub async fn run(file: PathBuf, args: ServeArgs, quiet: bool) -> Result<()> {
    let config = Config::load_or_default();
    let settings = Settings::resolve(&args, &config);

    let deck = parser::parse_deck(&file, settings.motion)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    let theme = theme_name(&args, deck.config.theme.as_deref(), &config)?;
    let slides = deck.total();
    info!(slides, path = %file.display(), "deck loaded");

    let listener = TcpListener::bind((settings.host.as_str(), settings.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", settings.host, settings.port))?;
    let port = listener.local_addr()?.port();

    let tunnel = if settings.share {
        Some(Tunnel::start(port, args.share_token.as_deref()).await?)
    } else {
        None
    };

    let live = Arc::new(LiveDeck::new(
        deck,
        Arc::new(HtmlRenderer),
        settings.queue_capacity,
    ));
    let token = PresenterToken::generate();

    let audience_url = format!("http://{}:{port}/", browse_host(&settings.host));
    let presenter_url = format!("{audience_url}presenter?token={}", token.as_str());
    if !quiet {
        banner::print_startup(&StartupInfo {
            file: &file.display().to_string(),
            slides,
            audience_url: &audience_url,
            presenter_url: &presenter_url,
            public_url: tunnel.as_ref().map(Tunnel::url),
            watching: args.watch,
            open_navigation: settings.open_navigation,
        });
    }

    let watcher = if args.watch {
        let (watcher, changes) = FileWatcher::start(&file)?;
        let coordinator = ReloadCoordinator::new(
            Box::new(FileSource::new(watcher.path(), settings.motion)),
            Arc::clone(&live),
        );
        watch::spawn_reload_loop(changes, Arc::new(coordinator));
        Some(watcher)
    } else {
        None
    };

    let (state, stop_streams) = AppState::new(
        live,
        token,
        ServerSettings {
            theme: Theme::from_name(&theme),
            keepalive: settings.keepalive,
            open_navigation: settings.open_navigation,
            asset_dir: asset_dir(&file),
        },
    );
    let shutdown = async move {
        server::shutdown_signal().await;
        let _ = stop_streams.send(true);
    };
    let served = server::serve(listener, state, shutdown).await;

    drop(watcher);
    if let Some(tunnel) = tunnel {
        tunnel.stop().await;
    }
    served
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        config.set("defaults.port", "9000").unwrap();
        config.set("server.host", "0.0.0.0").unwrap();

        let args = ServeArgs {
            port: Some(8080),
            ..Default::default()
        };
        let settings = Settings::resolve(&args, &config);
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.host, "0.0.0.0");
        assert!(!settings.share);

        let args = ServeArgs {
            share_token: Some("abc".into()),
            ..Default::default()
        };
        assert!(Settings::resolve(&args, &config).share);
    }

    #[test]
    fn test_theme_precedence() {
        let mut config = Config::default();
        config.set("defaults.theme", "dark").unwrap();
        let none = ServeArgs::default();
        assert_eq!(theme_name(&none, None, &config).unwrap(), "dark");
        assert_eq!(theme_name(&none, Some("light"), &config).unwrap(), "light");

        let flag = ServeArgs {
            theme: Some("dark".into()),
            ..Default::default()
        };
        assert_eq!(theme_name(&flag, Some("light"), &config).unwrap(), "dark");
        assert!(theme_name(&none, Some("sepia"), &config).is_err());
    }

    #[test]
    fn test_asset_dir_is_deck_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("slides.md");
        std::fs::write(&file, "# A").unwrap();
        assert_eq!(asset_dir(&file), dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_browse_host() {
        assert_eq!(browse_host("0.0.0.0"), "localhost");
        assert_eq!(browse_host("127.0.0.1"), "127.0.0.1");
    }
}
