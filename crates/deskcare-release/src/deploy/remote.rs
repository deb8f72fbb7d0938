//! Remote host abstraction
//!
//! The deploy pipeline talks to the server only through [`RemoteHost`].
//! Remote paths are plain `/`-separated strings since the server is a Unix
//! host no matter where the tool runs.

use camino::Utf8Path;

use crate::Result;

/// Operations the deploy pipeline needs from a remote host
pub trait RemoteHost {
    /// Whether `path` exists on the remote host
    fn exists(&mut self, path: &str) -> Result<bool>;

    /// Create a single directory
    fn mkdir(&mut self, path: &str) -> Result<()>;

    /// Copy a local file to `remote`, overwriting it
    fn upload(&mut self, local: &Utf8Path, remote: &str) -> Result<()>;

    /// Run a shell command, passing each output line to `on_line`
    ///
    /// Returns the command's exit status. A failing command is not an error
    /// at this level.
    fn exec(&mut self, command: &str, on_line: &mut dyn FnMut(&str)) -> Result<i32>;

    /// Create `path` unless it already exists. Returns true if it was created.
    fn ensure_dir(&mut self, path: &str) -> Result<bool> {
        if self.exists(path)? {
            return Ok(false);
        }
        self.mkdir(path)?;
        Ok(true)
    }
}

/// Join a relative `/`-separated path onto a remote base directory
pub fn remote_join(base: &str, rel: &str) -> String {
    let rel = rel.trim_start_matches('/');
    if rel.is_empty() {
        return base.to_string();
    }
    if base.ends_with('/') {
        format!("{}{}", base, rel)
    } else {
        format!("{}/{}", base, rel)
    }
}

/// Quote a string for a POSIX shell
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory remote host used by the pipeline tests

    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Exists(String),
        Mkdir(String),
        Upload(String),
        Exec(String),
    }

    #[derive(Debug, Default)]
    pub struct FakeRemote {
        pub dirs: BTreeSet<String>,
        pub files: BTreeMap<String, Vec<u8>>,
        pub calls: Vec<Call>,
        pub output: Vec<String>,
        pub exit_status: i32,
    }

    impl FakeRemote {
        pub fn with_dirs(dirs: &[&str]) -> Self {
            Self {
                dirs: dirs.iter().map(|d| d.to_string()).collect(),
                ..Self::default()
            }
        }

        pub fn index_of(&self, call: &Call) -> usize {
            self.calls
                .iter()
                .position(|c| c == call)
                .unwrap_or_else(|| panic!("{:?} was never made", call))
        }

        pub fn execs(&self) -> Vec<&str> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Exec(cmd) => Some(cmd.as_str()),
                    _ => None,
                })
                .collect()
        }
    }

    impl RemoteHost for FakeRemote {
        fn exists(&mut self, path: &str) -> Result<bool> {
            self.calls.push(Call::Exists(path.to_string()));
            Ok(self.dirs.contains(path) || self.files.contains_key(path))
        }

        fn mkdir(&mut self, path: &str) -> Result<()> {
            self.calls.push(Call::Mkdir(path.to_string()));
            self.dirs.insert(path.to_string());
            Ok(())
        }

        fn upload(&mut self, local: &Utf8Path, remote: &str) -> Result<()> {
            self.calls.push(Call::Upload(remote.to_string()));
            let parent = remote.rsplit_once('/').map(|(p, _)| p).unwrap_or("");
            assert!(
                parent.is_empty() || self.dirs.contains(parent),
                "uploaded {} before creating {}",
                remote,
                parent
            );
            self.files.insert(remote.to_string(), std::fs::read(local)?);
            Ok(())
        }

        fn exec(&mut self, command: &str, on_line: &mut dyn FnMut(&str)) -> Result<i32> {
            self.calls.push(Call::Exec(command.to_string()));
            for line in &self.output {
                on_line(line);
            }
            Ok(self.exit_status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{Call, FakeRemote};
    use super::*;

    #[test]
    fn test_remote_join() {
        assert_eq!(remote_join("/tmp", "assets/app.js"), "/tmp/assets/app.js");
        assert_eq!(remote_join("/tmp/", "index.html"), "/tmp/index.html");
        assert_eq!(remote_join("/tmp", ""), "/tmp");
        assert_eq!(remote_join("/", "srv"), "/srv");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/tmp/setup.sh"), "'/tmp/setup.sh'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_ensure_dir_checks_before_creating() {
        let mut remote = FakeRemote::with_dirs(&["/tmp"]);

        assert!(!remote.ensure_dir("/tmp").unwrap());
        assert!(remote.ensure_dir("/tmp/assets").unwrap());

        assert_eq!(
            remote.calls,
            vec![
                Call::Exists("/tmp".to_string()),
                Call::Exists("/tmp/assets".to_string()),
                Call::Mkdir("/tmp/assets".to_string()),
            ]
        );
    }
}
