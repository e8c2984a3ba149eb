use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::logger::Logger;
use super::timer::MonotonicClock;
use crate::{Error, Result};

pub const JOIN_RETRY_DELAY: Duration = Duration::from_secs(5);

/// The radio, as far as the clock cares.
pub trait NetworkLink {
    fn is_connected(&mut self) -> Result<bool>;
    fn connect(&mut self, ssid: &str, password: Option<&str>) -> Result<()>;
}

/// NetworkManager via its CLI.
#[derive(Debug, Default)]
pub struct NmcliLink;

impl NetworkLink for NmcliLink {
    fn is_connected(&mut self) -> Result<bool> {
        let output = Command::new("nmcli")
            .args(["-t", "-f", "STATE", "general"])
            .output()?;
        if !output.status.success() {
            return Err(Error::Transport(format!(
                "nmcli general: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(parse_nm_state(&String::from_utf8_lossy(&output.stdout)))
    }

    fn connect(&mut self, ssid: &str, password: Option<&str>) -> Result<()> {
        let mut child = Command::new("nmcli")
            .args(connect_args(ssid, password.is_some()))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        // With --ask nmcli prompts for the secret on stdin. It may exit
        // before reading it; the exit status below is what counts.
        if let Some(mut stdin) = child.stdin.take() {
            if let Some(pw) = password {
                let _ = writeln!(stdin, "{pw}");
            }
        }
        let output = child.wait_with_output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(Error::Transport(format!(
                "nmcli connect '{ssid}': {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

/// The secret never goes on the command line where `ps` could show it.
fn connect_args(ssid: &str, has_password: bool) -> Vec<&str> {
    let mut args = Vec::with_capacity(5);
    if has_password {
        args.push("--ask");
    }
    args.extend(["device", "wifi", "connect", ssid]);
    args
}

/// `connected`, `connected (site only)` and `connected (local only)` all count.
fn parse_nm_state(stdout: &str) -> bool {
    stdout.trim().starts_with("connected")
}

/// Credentials to join with, if any were configured.
pub struct WifiCredentials<'a> {
    pub ssid: &'a str,
    pub password: Option<&'a str>,
}

/// Block until the link is up, retrying the join every `retry_delay`.
/// Without credentials this only reports what it sees and returns.
pub fn ensure_connected(
    link: &mut dyn NetworkLink,
    credentials: Option<WifiCredentials<'_>>,
    clock: &dyn MonotonicClock,
    logger: &Logger,
    running: &AtomicBool,
    retry_delay: Duration,
) -> bool {
    match link.is_connected() {
        Ok(true) => {
            logger.info("network already connected");
            return true;
        }
        Ok(false) => {}
        Err(err) => logger.debug(format!("network state unknown: {err}")),
    }

    let Some(creds) = credentials else {
        logger.info("no wifi credentials configured; assuming the network is managed elsewhere");
        return false;
    };

    let mut attempt: u32 = 0;
    while running.load(Ordering::SeqCst) {
        attempt += 1;
        match link.connect(creds.ssid, creds.password) {
            Ok(()) => {
                logger.info(format!("joined wifi '{}' after {attempt} attempt(s)", creds.ssid));
                return true;
            }
            Err(err) => {
                logger.warn(format!(
                    "could not join wifi '{}', retrying in {}: {err}",
                    creds.ssid,
                    humantime::format_duration(retry_delay)
                ));
                clock.sleep(retry_delay);
            }
        }
    }
    false
}
