//! Privilege detection, escalation and configuration retrieval for one
//! device session.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use super::outcome::{FailureReason, SessionOutcome};
use super::privilege::{PrivilegeManager, TransitionInfo};
use crate::channel::{PtyChannel, ShellChannel};
use crate::device::DeviceRecord;
use crate::error::ChannelError;
use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Maximum privilege transitions attempted in one session.
pub const MAX_ESCALATION_ATTEMPTS: usize = 3;

/// How long to wait for an unprompted login prompt before sending a return.
const LOGIN_PROMPT_WAIT: Duration = Duration::from_secs(5);

/// Drives one open shell from login to configuration dump.
///
/// The driver never opens or closes the shell; whoever opened it closes
/// it. Every failure is returned as data inside the [`SessionOutcome`].
#[derive(Debug)]
pub struct SessionDriver {
    device: Arc<DeviceRecord>,
    platform: &'static PlatformDefinition,
}

impl SessionDriver {
    pub fn new(device: Arc<DeviceRecord>) -> Self {
        let platform = device.vendor.platform();
        Self { device, platform }
    }

    /// Run the session to completion.
    pub async fn run<C: ShellChannel>(&self, channel: &mut PtyChannel<C>) -> SessionOutcome {
        match self.retrieve(channel).await {
            Ok(output) => {
                info!(
                    "{}: retrieved {} bytes of configuration",
                    self.device.address,
                    output.len()
                );
                SessionOutcome::success(self.device.clone(), output)
            }
            Err(reason) => {
                warn!("{}: {}", self.device.address, reason);
                SessionOutcome::failure(self.device.clone(), reason)
            }
        }
    }

    async fn retrieve<C: ShellChannel>(
        &self,
        channel: &mut PtyChannel<C>,
    ) -> Result<String, FailureReason> {
        self.read_login_prompt(channel).await?;

        let show = &self.platform.show_config;
        self.acquire_rank(channel, show.rank).await?;

        for command in &self.platform.on_open_commands {
            let output = self.send_command(channel, command).await?;
            if let Some(pattern) = self.platform.detect_failure(&output) {
                debug!("{}: '{}' rejected ({})", self.device.address, command, pattern);
            }
        }

        let output = self.send_command(channel, &show.command).await?;
        if let Some(pattern) = self.platform.detect_failure(&output) {
            return Err(FailureReason::Command(format!("{}: {}", show.command, pattern)));
        }

        Ok(output)
    }

    /// Consume the login banner up to the first prompt.
    ///
    /// Some devices print nothing until they see a keystroke.
    async fn read_login_prompt<C: ShellChannel>(
        &self,
        channel: &mut PtyChannel<C>,
    ) -> Result<(), FailureReason> {
        let prompt = self.platform.prompt_pattern();
        match tokio::time::timeout(LOGIN_PROMPT_WAIT, channel.read_until(prompt)).await {
            Ok(Ok(_)) => return Ok(()),
            Ok(Err(ChannelError::PatternTimeout(_))) | Err(_) => {}
            Ok(Err(e)) => return Err(e.into()),
        }

        debug!("{}: no prompt after login, sending return", self.device.address);
        channel.send("").await?;
        channel.read_until(prompt).await?;
        Ok(())
    }

    /// Move the session to `target` one rank at a time.
    async fn acquire_rank<C: ShellChannel>(
        &self,
        channel: &mut PtyChannel<C>,
        target: u8,
    ) -> Result<(), FailureReason> {
        let privileges =
            PrivilegeManager::new(self.platform, self.device.privilege.command.as_deref());
        let mut attempts = 0;

        loop {
            let level = self.detect(channel, &privileges).await?;
            debug!(
                "{}: at privilege '{}' (rank {}), need rank {}",
                self.device.address, level.name, level.rank, target
            );

            if level.rank == target {
                return Ok(());
            }
            if attempts >= MAX_ESCALATION_ATTEMPTS {
                return Err(FailureReason::PrivilegeNotAttainable);
            }
            attempts += 1;

            let transition = privileges
                .next_transition(level.rank, target)
                .ok_or(FailureReason::PrivilegeNotAttainable)?;
            self.transition(channel, &transition).await?;
        }
    }

    /// Send a newline and classify the prompt it produces.
    async fn detect<'p, C: ShellChannel>(
        &self,
        channel: &mut PtyChannel<C>,
        privileges: &PrivilegeManager<'p>,
    ) -> Result<&'p PrivilegeLevel, FailureReason> {
        channel.send("").await?;
        let result = channel.read_until(self.platform.prompt_pattern()).await?;
        privileges
            .determine_from_prompt(&result.prompt)
            .ok_or(FailureReason::UnknownPrompt(result.prompt))
    }

    async fn transition<C: ShellChannel>(
        &self,
        channel: &mut PtyChannel<C>,
        transition: &TransitionInfo,
    ) -> Result<(), FailureReason> {
        let prompt = self.platform.prompt_pattern();
        debug!(
            "{}: sending '{}' towards rank {}",
            self.device.address, transition.command, transition.to
        );
        channel.send(&transition.command).await?;

        let Some(auth) = &transition.auth_prompt else {
            channel.read_until(prompt).await?;
            return Ok(());
        };

        if channel.read_until_any(&[prompt, auth]).await?.matched == 0 {
            return Ok(());
        }

        let Some(secret) = self.device.elevation_secret() else {
            warn!("{}: elevation secret requested but none configured", self.device.address);
            return Err(FailureReason::PrivilegeNotAttainable);
        };
        channel.send_hidden(secret).await?;

        if channel.read_until_any(&[prompt, auth]).await?.matched == 1 {
            warn!("{}: elevation secret rejected", self.device.address);
            return Err(FailureReason::PrivilegeNotAttainable);
        }
        Ok(())
    }

    async fn send_command<C: ShellChannel>(
        &self,
        channel: &mut PtyChannel<C>,
        command: &str,
    ) -> Result<String, FailureReason> {
        channel.send(command).await?;
        let result = channel.read_until(self.platform.prompt_pattern()).await?;
        Ok(normalize_output(&result.output, command))
    }
}

/// Strip the command echo and the trailing prompt from command output.
pub fn normalize_output(raw: &str, command: &str) -> String {
    let mut lines: Vec<&str> = raw.lines().collect();
    lines.pop();
    if lines
        .first()
        .is_some_and(|line| line.trim_end().ends_with(command.trim()))
    {
        lines.remove(0);
    }
    lines.join("\n")
}
