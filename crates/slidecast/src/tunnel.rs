//! Public sharing through a pinggy.io SSH reverse tunnel.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const STARTUP_TIMEOUT: Duration = Duration::from_secs(15);
const FREE_HOST: &str = "a.pinggy.io";
const PRO_HOST: &str = "pro.pinggy.io";
const OUTPUT_EXCERPT: usize = 500;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://[\w.-]+\.pinggy\.(?:link|online)").expect("valid regex"));

/// A running tunnel. The ssh child is killed when this is dropped.
pub struct Tunnel {
    child: Child,
    url: String,
}

impl Tunnel {
    /// Spawn ssh and wait for the public URL to show up in its output.
    pub async fn start(port: u16, token: Option<&str>) -> Result<Self> {
        let ssh = find_program("ssh", std::env::var_os("PATH").as_deref())
            .context("SSH not found. Install OpenSSH to use --share.")?;

        let mut command = Command::new(ssh);
        command
            .args(ssh_args(port, token))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if token.is_none() {
            // The free tier asks for an empty password; answer it without a tty.
            if let Some(echo) = find_program("echo", std::env::var_os("PATH").as_deref()) {
                command.env("SSH_ASKPASS", echo).env("SSH_ASKPASS_REQUIRE", "force");
            }
        }

        let mut child = command.spawn().context("Failed to start ssh")?;
        let (tx, mut lines) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            drain(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            drain(stderr, tx);
        }

        let mut output = String::new();
        let found = tokio::time::timeout(STARTUP_TIMEOUT, async {
            while let Some(line) = lines.recv().await {
                debug!(%line, "ssh");
                if let Some(url) = extract_url(&line) {
                    return Some(url.to_string());
                }
                output.push_str(&line);
                output.push('\n');
            }
            None
        })
        .await;

        match found {
            Ok(Some(url)) => {
                info!(%url, "tunnel established");
                Ok(Self { child, url })
            }
            _ => {
                let _ = child.kill().await;
                let mut msg = String::from("Could not establish tunnel (timed out waiting for URL).");
                if !output.is_empty() {
                    let excerpt: String = output.chars().take(OUTPUT_EXCERPT).collect();
                    msg.push_str(&format!("\n\nSSH output:\n{excerpt}"));
                }
                bail!(msg)
            }
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn stop(mut self) {
        if let Err(e) = self.child.kill().await {
            warn!(error = %e, "failed to stop tunnel");
        }
    }
}

/// Keep reading so a full pipe never stalls ssh. Lines are forwarded while
/// anyone is listening and discarded afterwards.
fn drain<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let _ = tx.send(line);
        }
    });
}

pub fn ssh_args(port: u16, token: Option<&str>) -> Vec<String> {
    let target = match token {
        Some(token) => format!("{token}@{PRO_HOST}"),
        None => FREE_HOST.to_string(),
    };
    vec![
        "-p".into(),
        "443".into(),
        format!("-R0:localhost:{port}"),
        "-o".into(),
        "StrictHostKeyChecking=accept-new".into(),
        "-o".into(),
        "ServerAliveInterval=30".into(),
        target,
    ]
}

/// First public https URL in `text`. Plain http announcements are skipped.
pub fn extract_url(text: &str) -> Option<&str> {
    URL_RE.find(text).map(|m| m.as_str())
}

fn find_program(name: &str, path_var: Option<&OsStr>) -> Option<PathBuf> {
    let path_var = path_var?;
    std::env::split_paths(path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_url() {
        let out = "Warning: Permanently added 'a.pinggy.io' to known hosts.\n\
                   http://rndzz-123.a.free.pinggy.link\n\
                   https://rndzz-123.a.free.pinggy.link\n";
        assert_eq!(extract_url(out), Some("https://rndzz-123.a.free.pinggy.link"));
        assert_eq!(
            extract_url("https://abc.pro.pinggy.online"),
            Some("https://abc.pro.pinggy.online")
        );
        assert_eq!(extract_url("http://rndzz-123.a.free.pinggy.link"), None);
        assert_eq!(extract_url("connection refused"), None);
    }

    #[test]
    fn test_free_tier_args() {
        let args = ssh_args(5001, None);
        assert_eq!(args[..3], ["-p", "443", "-R0:localhost:5001"]);
        assert!(args.contains(&"StrictHostKeyChecking=accept-new".to_string()));
        assert_eq!(args.last().unwrap(), "a.pinggy.io");
    }

    #[test]
    fn test_token_uses_pro_host() {
        let args = ssh_args(8080, Some("abc123"));
        assert_eq!(args.last().unwrap(), "abc123@pro.pinggy.io");
    }

    #[test]
    fn test_find_program() {
        assert!(find_program("ssh", None).is_none());

        let dir = tempfile::tempdir().unwrap();
        let path = std::env::join_paths([dir.path()]).unwrap();
        assert!(find_program("ssh", Some(&path)).is_none());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let bin = dir.path().join("ssh");
            std::fs::write(&bin, "#!/bin/sh\n").unwrap();
            assert!(find_program("ssh", Some(&path)).is_none());
            std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
            assert_eq!(find_program("ssh", Some(&path)), Some(bin));
        }
    }
}
