//! Test doubles: shells over scripted streams, simulated devices, an
//! instrumented connector and an in-memory versioned store.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::backup::{StoreStatus, VersionedStore};
use crate::channel::ShellChannel;
use crate::device::DeviceRecord;
use crate::error::{ChannelError, StoreError, TransportError};
use crate::platform::Vendor;
use crate::transport::Connector;

pub const CISCO_RUNNING_CONFIG: &str = "Building configuration...\r\n\
\r\n\
Current configuration : 1024 bytes\r\n\
!\r\n\
! Last configuration change at 10:00:00 UTC\r\n\
!\r\n\
version 15.2\r\n\
hostname r1\r\n\
!\r\n\
interface GigabitEthernet0/1\r\n \
ip address 10.0.0.1 255.255.255.0\r\n\
!\r\n\
end\r\n";

pub const CISCO_FILTERED: &str = "version 15.2\n\
hostname r1\n\
\n\
interface GigabitEthernet0/1\n \
ip address 10.0.0.1 255.255.255.0\n\
\n\
end";

pub const JUNIPER_CONFIG: &str = "## Last commit: 2025-01-01 10:00:00 UTC by admin\r\n\
set version 21.4R1\r\n\
set system host-name mx1\r\n\
set interfaces ge-0/0/0 unit 0 family inet address 10.0.0.3/24\r\n\
\r\n\
{master:0}\r\n";

pub const MIKROTIK_CONFIG: &str = "# jan/02/2025 10:00:00 by RouterOS 6.49.10\r\n\
# software id = ABCD-1234\r\n\
/interface bridge\r\n\
add name=bridge1\r\n\
/ip address\r\n\
add address=10.0.0.4/24 interface=ether1\r\n";

/// Password-authenticated cisco device.
pub fn cisco_device(address: &str, password: &str) -> DeviceRecord {
    DeviceRecord::new(address, Vendor::Cisco, "admin", password)
}

/// Shell over any byte stream, e.g. a `tokio_test` I/O mock.
pub struct StreamShell<T> {
    io: T,
}

impl<T> StreamShell<T> {
    pub fn new(io: T) -> Self {
        Self { io }
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ShellChannel for StreamShell<T> {
    async fn write(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        self.io.write_all(data).await?;
        self.io.flush().await?;
        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Option<Bytes>, ChannelError> {
        let mut buf = vec![0u8; 4096];
        let n = self.io.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(Bytes::from(buf)))
    }

    async fn close(self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Shell that accepts input and never answers.
pub struct SilentShell;

impl ShellChannel for SilentShell {
    async fn write(&mut self, _data: &[u8]) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Option<Bytes>, ChannelError> {
        std::future::pending().await
    }

    async fn close(self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// A device CLI answering line by line like the real vendor would.
///
/// Output that has not been asked for never appears: when the outbox is
/// empty a read waits forever, like a quiet device.
pub struct SimulatedDevice {
    vendor: Vendor,
    rank: u8,
    secret: Option<String>,
    awaiting_secret: bool,
    input: Vec<u8>,
    outbox: VecDeque<Bytes>,
    log: Arc<Mutex<Vec<String>>>,
}

impl SimulatedDevice {
    /// A device logged in at `rank`, showing its banner and prompt.
    pub fn new(vendor: Vendor, rank: u8) -> Self {
        let mut device = Self {
            vendor,
            rank,
            secret: None,
            awaiting_secret: false,
            input: Vec::new(),
            outbox: VecDeque::new(),
            log: Arc::new(Mutex::new(Vec::new())),
        };
        let banner = format!("\r\nAuthorized access only\r\n\r\n{}", device.prompt());
        device.outbox.push_back(Bytes::from(banner));
        device
    }

    /// A device that stays silent until it receives a keystroke.
    pub fn without_banner(mut self) -> Self {
        self.outbox.clear();
        self
    }

    /// Require `secret` after the enable command.
    pub fn with_secret(mut self, secret: &str) -> Self {
        self.secret = Some(secret.to_string());
        self
    }

    /// Lines received so far; secrets are recorded as `********`.
    pub fn command_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.log.clone()
    }

    fn prompt(&self) -> &'static str {
        match (self.vendor, self.rank) {
            (Vendor::Cisco, 0) => "r1>",
            (Vendor::Cisco, 1) => "r1#",
            (Vendor::Cisco, _) => "r1(config)#",
            (Vendor::Juniper, 0) => "admin@mx1> ",
            (Vendor::Juniper, _) => "admin@mx1# ",
            (Vendor::Mikrotik, _) => "[admin@MikroTik] > ",
        }
    }

    fn record(&self, line: &str) {
        self.log.lock().unwrap().push(line.to_string());
    }

    fn answer(&mut self, line: &str) -> String {
        if self.awaiting_secret {
            self.awaiting_secret = false;
            self.record("********");
            if self.secret.as_deref() == Some(line) {
                self.rank = 1;
                return format!("\r\n{}", self.prompt());
            }
            return format!("\r\n% Access denied\r\n\r\n{}", self.prompt());
        }

        self.record(line);
        let body = match self.vendor {
            Vendor::Cisco => self.cisco(line),
            Vendor::Juniper => self.juniper(line),
            Vendor::Mikrotik => self.mikrotik(line),
        };
        match body {
            Some(body) => format!("{line}\r\n{body}{}", self.prompt()),
            // Waiting for the enable secret
            None => format!("{line}\r\nPassword: "),
        }
    }

    fn cisco(&mut self, line: &str) -> Option<String> {
        let out = match (self.rank, line) {
            (_, "") => "",
            (0, cmd) if cmd == "enable" || cmd.starts_with("enable ") => {
                if self.secret.is_some() {
                    self.awaiting_secret = true;
                    return None;
                }
                self.rank = 1;
                ""
            }
            (1, "disable") => {
                self.rank = 0;
                ""
            }
            (1, "configure terminal") => {
                self.rank = 2;
                "Enter configuration commands, one per line.  End with CNTL/Z.\r\n"
            }
            (2, "end") => {
                self.rank = 1;
                ""
            }
            (_, "terminal length 0") | (_, "terminal width 511") => "",
            (1, "show running-config view full") => CISCO_RUNNING_CONFIG,
            _ => "           ^\r\n% Invalid input detected at '^' marker.\r\n\r\n",
        };
        Some(out.to_string())
    }

    fn juniper(&mut self, line: &str) -> Option<String> {
        let out = match (self.rank, line) {
            (_, "") => "",
            (0, "configure") => {
                self.rank = 1;
                "Entering configuration mode\r\n\r\n[edit]\r\n"
            }
            (1, "exit configuration-mode") => {
                self.rank = 0;
                "Exiting configuration mode\r\n\r\n"
            }
            (0, "set cli screen-length 0") => "Screen length set to 0\r\n\r\n",
            (0, "set cli screen-width 511") => "Screen width set to 511\r\n\r\n",
            (0, "show configuration | display set") => JUNIPER_CONFIG,
            _ => "                   ^\r\nunknown command.\r\n\r\n",
        };
        Some(out.to_string())
    }

    fn mikrotik(&mut self, line: &str) -> Option<String> {
        let out = match line {
            "" => "",
            "/export" => MIKROTIK_CONFIG,
            _ => "bad command name\r\n",
        };
        Some(out.to_string())
    }
}

impl ShellChannel for SimulatedDevice {
    async fn write(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        self.input.extend_from_slice(data);
        while let Some(pos) = memchr::memchr(b'\n', &self.input) {
            let raw: Vec<u8> = self.input.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            let reply = self.answer(&line);
            self.outbox.push_back(Bytes::from(reply));
        }
        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Option<Bytes>, ChannelError> {
        match self.outbox.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None => std::future::pending().await,
        }
    }

    async fn close(self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// How a mocked device reacts to a connection attempt.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Connects to a simulated device at `rank`.
    Healthy { rank: u8, secret: Option<&'static str> },
    /// Never answers.
    Unreachable,
    /// TCP connection refused.
    Refused,
    /// Login rejected.
    AuthRejected,
    /// The connect call panics.
    Panic,
}

impl Default for Behavior {
    fn default() -> Self {
        Self::Healthy {
            rank: 0,
            secret: None,
        }
    }
}

/// Open connections, observed from the connector's side.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    active: AtomicUsize,
    max_active: AtomicUsize,
    events: Mutex<Vec<String>>,
}

impl ConnectionStats {
    fn opened(&self, address: &str) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.events.lock().unwrap().push(format!("open {address}"));
    }

    fn closed(&self, address: &str) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(format!("close {address}"));
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// `open <address>` / `close <address>` in the order they happened.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn connected_to(&self, address: &str) -> bool {
        self.events().contains(&format!("open {address}"))
    }
}

/// Counts a connection as open from the connect call until dropped.
struct ConnectionGuard {
    stats: Arc<ConnectionStats>,
    address: String,
}

impl ConnectionGuard {
    fn new(stats: Arc<ConnectionStats>, address: &str) -> Self {
        stats.opened(address);
        Self {
            stats,
            address: address.to_string(),
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.stats.closed(&self.address);
    }
}

/// Simulated device shell that reports its lifetime to [`ConnectionStats`].
pub struct TrackedShell {
    device: SimulatedDevice,
    _guard: ConnectionGuard,
}

impl ShellChannel for TrackedShell {
    async fn write(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        self.device.write(data).await
    }

    async fn read_chunk(&mut self) -> Result<Option<Bytes>, ChannelError> {
        self.device.read_chunk().await
    }

    async fn close(self) -> Result<(), ChannelError> {
        self.device.close().await
    }
}

/// Connector handing out simulated devices.
#[derive(Debug, Default)]
pub struct MockConnector {
    behaviors: HashMap<String, Behavior>,
    connect_delay: Duration,
    stats: Arc<ConnectionStats>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(mut self, address: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(address.to_string(), behavior);
        self
    }

    /// Time each connection attempt takes.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn stats(&self) -> Arc<ConnectionStats> {
        self.stats.clone()
    }
}

impl Connector for MockConnector {
    type Shell = TrackedShell;

    async fn connect(&self, device: &DeviceRecord) -> Result<TrackedShell, TransportError> {
        let guard = ConnectionGuard::new(self.stats.clone(), &device.address);
        tokio::time::sleep(self.connect_delay).await;

        match self.behaviors.get(&device.address).copied().unwrap_or_default() {
            Behavior::Healthy { rank, secret } => {
                let mut simulated = SimulatedDevice::new(device.vendor, rank);
                if let Some(secret) = secret {
                    simulated = simulated.with_secret(secret);
                }
                Ok(TrackedShell {
                    device: simulated,
                    _guard: guard,
                })
            }
            Behavior::Unreachable => std::future::pending().await,
            Behavior::Refused => Err(TransportError::ConnectionFailed {
                host: device.address.clone(),
                port: device.port,
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            }),
            Behavior::AuthRejected => Err(TransportError::AuthenticationFailed {
                user: device.username.clone(),
            }),
            Behavior::Panic => panic!("simulated connector failure"),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    committed: HashMap<PathBuf, Vec<u8>>,
    staged: HashMap<PathBuf, Vec<u8>>,
    commits: Vec<String>,
    failing: Vec<String>,
}

/// Versioned store keeping every repository in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Make commits fail for repositories whose path contains `pattern`.
    pub fn fail_commits_for(&self, pattern: &str) {
        self.state.lock().unwrap().failing.push(pattern.to_string());
    }

    pub fn commit_messages(&self) -> Vec<String> {
        self.state.lock().unwrap().commits.clone()
    }
}

impl VersionedStore for MemoryStore {
    type Repo = PathBuf;

    async fn open_or_init(&self, dir: &Path) -> Result<PathBuf, StoreError> {
        Ok(dir.to_path_buf())
    }

    async fn stage(&self, _repo: &PathBuf, file: &Path) -> Result<(), StoreError> {
        let content = tokio::fs::read(file).await?;
        self.state
            .lock()
            .unwrap()
            .staged
            .insert(file.to_path_buf(), content);
        Ok(())
    }

    async fn status(&self, repo: &PathBuf) -> Result<StoreStatus, StoreError> {
        let state = self.state.lock().unwrap();
        let mut status = StoreStatus::default();
        for (path, content) in state.staged.iter().filter(|(p, _)| p.starts_with(repo)) {
            let name = path.display().to_string();
            match state.committed.get(path) {
                None => status.staged.added.push(name),
                Some(old) if old != content => status.staged.modified.push(name),
                Some(_) => {}
            }
        }
        Ok(status)
    }

    async fn commit(&self, repo: &PathBuf, message: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let repo_name = repo.display().to_string();
        if state.failing.iter().any(|p| repo_name.contains(p.as_str())) {
            return Err(StoreError::CommandFailed {
                command: "commit".into(),
                stderr: "simulated failure".into(),
            });
        }

        let staged: Vec<_> = state
            .staged
            .iter()
            .filter(|(p, _)| p.starts_with(repo))
            .map(|(p, c)| (p.clone(), c.clone()))
            .collect();
        for (path, content) in staged {
            state.staged.remove(&path);
            state.committed.insert(path, content);
        }
        state.commits.push(message.to_string());
        Ok(())
    }
}
