//! SSH/SFTP implementation of [`RemoteHost`]
//!
//! One TCP connection carries both the shell channel used for commands and
//! the SFTP subsystem used for uploads. Release order is SFTP first, then the
//! session, whether the deploy finished or failed.

use camino::{Utf8Path, Utf8PathBuf};
use ssh2::{CheckResult, ErrorCode, ExtendedData, KnownHostFileKind, Session, Sftp};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::path::Path;

use crate::config::Credentials;
use crate::{Error, Result};

use super::remote::RemoteHost;

/// SFTP status code for a missing file
const SFTP_NO_SUCH_FILE: i32 = 2;

/// Permissions of directories created during mirroring
const REMOTE_DIR_MODE: i32 = 0o755;

/// Connection parameters
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// OpenSSH known_hosts file to verify the server key against
    pub known_hosts: Option<Utf8PathBuf>,
}

/// An authenticated SSH session with an open SFTP channel
pub struct SshSession {
    // Fields drop in declaration order, so the SFTP channel goes first.
    sftp: Option<Sftp>,
    session: Session,
    host: String,
    closed: bool,
}

impl SshSession {
    /// Connect, verify the host key if configured, authenticate and open SFTP
    pub fn connect(options: &ConnectOptions, credentials: &Credentials) -> Result<Self> {
        tracing::info!("Connecting to {}:{}...", options.host, options.port);

        let tcp = TcpStream::connect((options.host.as_str(), options.port)).map_err(|e| {
            Error::remote(
                format!("Failed to connect to {}:{}: {}", options.host, options.port, e),
                "Check that the host is reachable and the SSH port is open",
            )
        })?;

        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.handshake()?;

        // From here on, dropping `this` disconnects the session.
        let mut this = Self {
            sftp: None,
            session,
            host: options.host.clone(),
            closed: false,
        };

        match options.known_hosts {
            Some(ref known_hosts) => this.verify_host_key(known_hosts, options.port)?,
            None => tracing::warn!(
                "Host key of {} is not verified; set `known_hosts` under [deploy]",
                options.host
            ),
        }

        this.authenticate(&options.username, credentials)?;
        this.sftp = Some(this.session.sftp()?);

        tracing::debug!("SFTP channel open on {}", this.host);
        Ok(this)
    }

    fn verify_host_key(&self, known_hosts: &Utf8Path, port: u16) -> Result<()> {
        let mut hosts = self.session.known_hosts()?;
        hosts.read_file(known_hosts.as_std_path(), KnownHostFileKind::OpenSSH)?;

        let (key, _) = self.session.host_key().ok_or_else(|| {
            Error::remote(
                format!("{} did not present a host key", self.host),
                "The SSH handshake did not complete",
            )
        })?;

        match hosts.check_port(&self.host, port, key) {
            CheckResult::Match => Ok(()),
            CheckResult::NotFound => Err(Error::remote(
                format!("{} is not listed in {}", self.host, known_hosts),
                format!("Add the key with `ssh-keyscan -p {} {}`", port, self.host),
            )),
            CheckResult::Mismatch => Err(Error::remote(
                format!("Host key of {} does not match {}", self.host, known_hosts),
                "The server key changed; verify it before deploying",
            )),
            CheckResult::Failure => Err(Error::remote(
                format!("Failed to check the host key of {}", self.host),
                format!("Check that {} is a valid known_hosts file", known_hosts),
            )),
        }
    }

    fn authenticate(&self, username: &str, credentials: &Credentials) -> Result<()> {
        match credentials {
            Credentials::Password(password) => {
                self.session.userauth_password(username, password)?;
            }
            Credentials::KeyFile { path, passphrase } => {
                self.session.userauth_pubkey_file(
                    username,
                    None,
                    path.as_std_path(),
                    passphrase.as_deref(),
                )?;
            }
        }

        if !self.session.authenticated() {
            return Err(Error::remote(
                format!("Authentication as {} on {} failed", username, self.host),
                "Check the deploy credentials",
            ));
        }

        Ok(())
    }

    fn sftp(&self) -> Result<&Sftp> {
        self.sftp.as_ref().ok_or_else(|| {
            Error::remote(
                "SFTP channel is closed",
                "This is an unexpected internal error",
            )
        })
    }

    /// Close the SFTP channel, then the session
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Some(sftp) = self.sftp.take() {
            drop(sftp);
            tracing::debug!("SFTP channel closed");
        }
        self.session.disconnect(None, "deploy finished", None)?;
        tracing::debug!("Disconnected from {}", self.host);
        Ok(())
    }
}

/// Copy `source` into `dest` and flush, so write errors surface here
fn copy_flushed<R, W>(source: &mut R, dest: &mut W) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let copied = std::io::copy(source, dest)?;
    dest.flush()?;
    Ok(copied)
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("Failed to close connection to {}: {}", self.host, e);
        }
    }
}

impl RemoteHost for SshSession {
    fn exists(&mut self, path: &str) -> Result<bool> {
        match self.sftp()?.stat(Path::new(path)) {
            Ok(_) => Ok(true),
            Err(e) if matches!(e.code(), ErrorCode::SFTP(SFTP_NO_SUCH_FILE)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn mkdir(&mut self, path: &str) -> Result<()> {
        self.sftp()?
            .mkdir(Path::new(path), REMOTE_DIR_MODE)
            .map_err(|e| {
                Error::remote(
                    format!("Failed to create remote directory {}: {}", path, e),
                    "Check permissions of the remote staging directory",
                )
            })
    }

    fn upload(&mut self, local: &Utf8Path, remote: &str) -> Result<()> {
        let mut source = File::open(local)?;
        let mut dest = self.sftp()?.create(Path::new(remote)).map_err(|e| {
            Error::remote(
                format!("Failed to open {} for writing: {}", remote, e),
                "Check permissions of the remote staging directory",
            )
        })?;
        copy_flushed(&mut source, &mut dest)?;
        dest.close().map_err(|e| {
            Error::remote(
                format!("Failed to finish writing {}: {}", remote, e),
                "Check free space on the remote host",
            )
        })
    }

    fn exec(&mut self, command: &str, on_line: &mut dyn FnMut(&str)) -> Result<i32> {
        let mut channel = self.session.channel_session()?;
        // Interleave stderr with stdout so neither stream can stall the other
        channel.handle_extended_data(ExtendedData::Merge)?;
        channel.exec(command)?;

        let mut reader = BufReader::new(&mut channel);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            on_line(line.trim_end_matches(['\r', '\n']));
        }
        drop(reader);

        channel.wait_close()?;
        Ok(channel.exit_status()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Accepts writes but fails when flushed
    struct FailingFlush(Vec<u8>);

    impl Write for FailingFlush {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("remote handle closed"))
        }
    }

    #[test]
    fn test_copy_flushed() {
        let mut dest = Vec::new();
        let copied = copy_flushed(&mut &b"index"[..], &mut dest).unwrap();
        assert_eq!(copied, 5);
        assert_eq!(dest, b"index");
    }

    #[test]
    fn test_copy_flushed_reports_flush_failure() {
        let mut dest = FailingFlush(Vec::new());
        let result = copy_flushed(&mut &b"index"[..], &mut dest);

        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(dest.0, b"index");
    }
}
