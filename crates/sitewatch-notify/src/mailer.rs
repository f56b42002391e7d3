//! Mail delivery capability and its mail(1) implementation.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{NotifyError, NotifyResult};
use crate::message::Message;

/// Boxed future returned by [`Mailer::deliver`].
pub type DeliveryFuture<'a> = Pin<Box<dyn Future<Output = NotifyResult<()>> + Send + 'a>>;

/// Delivers one rendered message to one recipient.
pub trait Mailer: Send + Sync {
    fn deliver<'a>(&'a self, recipient: &'a str, message: &'a Message) -> DeliveryFuture<'a>;
}

/// Runs `<program> [args...] -s <subject> <recipient>` with the body on stdin.
#[derive(Debug, Clone)]
pub struct CommandMailer {
    program: String,
    args: Vec<String>,
}

impl CommandMailer {
    /// Build from a command line such as `mail` or `mailx -r alerts@host`.
    pub fn from_command_line(command: &str) -> NotifyResult<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(NotifyError::EmptyCommand)?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn send(&self, recipient: &str, message: &Message) -> NotifyResult<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("-s")
            .arg(&message.subject)
            .arg(recipient)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| NotifyError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(message.body.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(NotifyError::Rejected {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(%recipient, program = %self.program, "mail handed to delivery program");
        Ok(())
    }
}

impl Mailer for CommandMailer {
    fn deliver<'a>(&'a self, recipient: &'a str, message: &'a Message) -> DeliveryFuture<'a> {
        Box::pin(self.send(recipient, message))
    }
}
