use std::io::{BufRead, BufReader, Read};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::error::Error;

/// Builds the argument list for `cvs [-dROOT] (log|rlog) [-d>DATE] DIRECTORY`.
///
/// Split out from [`spawn`] so the exact command line can be asserted
/// without actually invoking `cvs`.
pub fn build_args(root: Option<&str>, rlog: bool, directory: &str, since: Option<&str>) -> Vec<String> {
    let mut args = vec!["-q".to_string()];
    if let Some(root) = root {
        if !root.is_empty() {
            args.push(format!("-d{}", root));
        }
    }
    args.push(if rlog { "rlog".to_string() } else { "log".to_string() });
    if let Some(date) = since {
        args.push(format!("-d>{}", date));
    }
    args.push(directory.to_string());
    args
}

/// A running `cvs log`/`cvs rlog` subprocess.
pub struct LogProcess {
    child: Child,
}

impl LogProcess {
    pub fn spawn(root: Option<&str>, rlog: bool, directory: &str, since: Option<&str>) -> Result<Self, Error> {
        let args = build_args(root, rlog, directory, since);
        log::info!("running cvs {}", args.join(" "));

        let child = Command::new("cvs")
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(Error::Spawn)?;

        Ok(Self { child })
    }

    /// Returns an iterator over the subprocess's stdout, decoded as Latin-1
    /// (CVS emits file contents and log text in whatever the repository's
    /// native encoding is, and Latin-1 is the only encoding that never
    /// fails to decode a byte stream). Trailing `\n` is stripped from each
    /// line; nothing else is.
    pub fn lines(&mut self) -> Latin1Lines<ChildStdout> {
        let stdout = self.child.stdout.take().expect("stdout requested once and piped at spawn");
        Latin1Lines { reader: BufReader::new(stdout) }
    }

    /// Waits for the subprocess to exit, failing if it returned non-zero.
    pub fn wait(mut self) -> Result<(), Error> {
        let status = self.child.wait().map_err(Error::Read)?;
        match status.code() {
            Some(0) => Ok(()),
            Some(code) => Err(Error::ExitStatus(code)),
            None => Err(Error::ExitStatus(-1)),
        }
    }
}

/// Iterator over Latin-1-decoded lines of a byte stream, stripping exactly
/// one trailing `\n` per line (matching `line.endswith('\n')`).
pub struct Latin1Lines<R> {
    reader: BufReader<R>,
}

impl<R: Read> Iterator for Latin1Lines<R> {
    type Item = Result<String, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                Some(Ok(decode_latin1(&buf)))
            }
            Err(e) => Some(Err(Error::Read(e))),
        }
    }
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_rlog_command_with_root_and_date() {
        let args = build_args(Some(":pserver:anon@cvs.example.com:/cvsroot"), true, "module", Some("2020/01/01"));
        assert_eq!(
            args,
            vec![
                "-q",
                "-d:pserver:anon@cvs.example.com:/cvsroot",
                "rlog",
                "-d>2020/01/01",
                "module",
            ]
        );
    }

    #[test]
    fn builds_log_command_without_root_or_date() {
        let args = build_args(None, false, "module", None);
        assert_eq!(args, vec!["-q", "log", "module"]);
    }

    #[test]
    fn empty_root_is_omitted() {
        let args = build_args(Some(""), true, "module", None);
        assert_eq!(args, vec!["-q", "rlog", "module"]);
    }

    #[test]
    fn decodes_high_bytes_one_to_one() {
        let decoded = decode_latin1(&[0xe9, b'a']);
        assert_eq!(decoded.chars().next().unwrap() as u32, 0xe9);
        assert_eq!(decoded, "\u{e9}a");
    }

    #[test]
    fn strips_single_trailing_newline() {
        let mut lines = Latin1Lines { reader: BufReader::new(&b"one\ntwo\n"[..]) };
        assert_eq!(lines.next().unwrap().unwrap(), "one");
        assert_eq!(lines.next().unwrap().unwrap(), "two");
        assert!(lines.next().is_none());
    }
}
