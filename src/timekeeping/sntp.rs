use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use sntpc::{NtpContext, NtpUdpSocket, StdTimestampGen};

use super::TimeReference;
use crate::{Error, Result};

/// Budget for one whole query, shared by every server in the list.
pub const SNTP_TIMEOUT: Duration = Duration::from_secs(5);
pub const FALLBACK_SERVERS: [&str; 2] = ["pool.ntp.org", "time.nist.gov"];
const NTP_PORT: u16 = 123;
/// Seconds between 1900-01-01 and 1970-01-01.
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Blocking std socket behind sntpc's socket trait.
struct StdSocket(UdpSocket);

impl NtpUdpSocket for StdSocket {
    async fn send_to(&self, buf: &[u8], addr: SocketAddr) -> sntpc::Result<usize> {
        self.0.send_to(buf, addr).map_err(|_| sntpc::Error::Network)
    }

    async fn recv_from(&self, buf: &mut [u8]) -> sntpc::Result<(usize, SocketAddr)> {
        self.0.recv_from(buf).map_err(|_| sntpc::Error::Network)
    }
}

/// SNTP client over a std UDP socket, trying each server in order until
/// the shared timeout runs out.
pub struct SntpReference {
    servers: Vec<String>,
    timeout: Duration,
}

impl SntpReference {
    /// `primary` first, then the public fallbacks (deduplicated).
    pub fn new(primary: &str) -> Self {
        let mut servers = vec![primary.trim().to_string()];
        for fallback in FALLBACK_SERVERS {
            if !servers.iter().any(|s| s.eq_ignore_ascii_case(fallback)) {
                servers.push(fallback.to_string());
            }
        }
        Self {
            servers,
            timeout: SNTP_TIMEOUT,
        }
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    fn query_server(server: &str, budget: Duration) -> Result<i64> {
        let deadline = Instant::now() + budget;
        let addr = resolve_ipv4(server, budget)?;
        let remaining = remaining_until(deadline)
            .ok_or_else(|| Error::Transport(format!("sntp {server}: timed out resolving")))?;

        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_read_timeout(Some(remaining))?;
        socket.set_write_timeout(Some(remaining))?;

        let socket = StdSocket(socket);
        let context = NtpContext::new(StdTimestampGen::default());
        let result = sntpc::sync::get_time(addr, &socket, context)
            .map_err(|e| Error::Transport(format!("sntp {server}: {e:?}")))?;
        Ok(normalize_seconds(u64::from(result.sec())))
    }
}

impl TimeReference for SntpReference {
    fn query(&mut self) -> Result<i64> {
        query_within(&self.servers, self.timeout, SntpReference::query_server)
    }

    fn describe(&self) -> String {
        format!("sntp({})", self.servers.join(", "))
    }
}

/// Try `servers` in order, handing each one whatever is left of `budget`.
/// Once the budget is spent the remaining servers are skipped.
fn query_within<F>(servers: &[String], budget: Duration, mut query: F) -> Result<i64>
where
    F: FnMut(&str, Duration) -> Result<i64>,
{
    let deadline = Instant::now() + budget;
    let mut last_err = None;
    for server in servers {
        let Some(remaining) = remaining_until(deadline) else {
            break;
        };
        match query(server, remaining) {
            Ok(secs) => return Ok(secs),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        Error::Transport(format!(
            "sntp timed out after {}",
            humantime::format_duration(budget)
        ))
    }))
}

fn remaining_until(deadline: Instant) -> Option<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    (!left.is_zero()).then_some(left)
}

/// `to_socket_addrs` has no timeout of its own, so the lookup runs on a
/// helper thread and is abandoned once `budget` passes.
fn resolve_ipv4(server: &str, budget: Duration) -> Result<SocketAddr> {
    let (tx, rx) = mpsc::channel();
    let host = server.to_string();
    std::thread::spawn(move || {
        let found = (host.as_str(), NTP_PORT)
            .to_socket_addrs()
            .map(|mut addrs| addrs.find(|a| a.is_ipv4()));
        let _ = tx.send(found);
    });
    match rx.recv_timeout(budget) {
        Ok(Ok(Some(addr))) => Ok(addr),
        Ok(Ok(None)) => Err(Error::Transport(format!("resolve {server}: no ipv4 address"))),
        Ok(Err(e)) => Err(Error::Transport(format!("resolve {server}: {e}"))),
        Err(_) => Err(Error::Transport(format!("resolve {server}: timed out"))),
    }
}

/// Accept either NTP-era or unix-era seconds.
fn normalize_seconds(secs: u64) -> i64 {
    if secs >= NTP_UNIX_OFFSET {
        (secs - NTP_UNIX_OFFSET) as i64
    } else {
        secs as i64
    }
}
