//! Line-oriented command shell over a [`LocalHistory`].

use std::io::{BufRead, Write};

use serde::Serialize;
use tracing::{debug, warn};

use crate::change::Change;
use crate::history::{ChangeSetId, LocalHistory, Revision};
use crate::shell::error::{ShellError, ShellResult};
use crate::tree::{split_path, EntryId, Timestamp};

/// Shell configuration.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Prompt string.
    pub prompt: String,
    /// Print structured output as JSON.
    pub json: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: "localvcs> ".into(),
            json: false,
        }
    }
}

/// What the caller should do after a line was executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print the text (may be empty) and read the next line.
    Continue(String),
    Quit,
}

/// Changes queued between `begin` and `commit`.
#[derive(Debug)]
struct PendingBatch {
    name: String,
    changes: Vec<Change>,
}

#[derive(Serialize)]
struct ListedEntry<'a> {
    id: EntryId,
    name: &'a str,
    directory: bool,
}

/// The command shell.
pub struct Shell {
    history: LocalHistory,
    config: ShellConfig,
    pending: Option<PendingBatch>,
}

impl Shell {
    pub fn new(history: LocalHistory) -> Self {
        Self::with_config(history, ShellConfig::default())
    }

    pub fn with_config(history: LocalHistory, config: ShellConfig) -> Self {
        Self {
            history,
            config,
            pending: None,
        }
    }

    pub fn history(&self) -> &LocalHistory {
        &self.history
    }

    /// Check if a `begin` batch is open.
    pub fn in_batch(&self) -> bool {
        self.pending.is_some()
    }

    /// Run commands from `input` until EOF or `quit`.
    ///
    /// Command errors are written to `output` and counted; only fatal errors
    /// stop the loop. Returns the number of failed commands.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: R,
        output: &mut W,
        interactive: bool,
    ) -> ShellResult<usize> {
        if interactive {
            writeln!(output, "localvcs {} - type 'help' for commands", env!("CARGO_PKG_VERSION"))?;
        }

        let mut failures = 0;
        let mut lines = input.lines();
        loop {
            if interactive {
                let prompt = if self.in_batch() { "   ...> " } else { self.config.prompt.as_str() };
                write!(output, "{}", prompt)?;
                output.flush()?;
            }

            let Some(line) = lines.next() else { break };
            match self.execute_line(&line?) {
                Ok(Outcome::Continue(text)) => {
                    if !text.is_empty() {
                        writeln!(output, "{}", text.trim_end())?;
                    }
                }
                Ok(Outcome::Quit) => break,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    failures += 1;
                    writeln!(output, "error: {}", e)?;
                }
            }
        }

        if let Some(batch) = self.pending.take() {
            warn!(batch = %batch.name, changes = batch.changes.len(), "discarding uncommitted batch");
            writeln!(output, "discarded uncommitted batch '{}'", batch.name)?;
        }
        Ok(failures)
    }

    /// Execute one command line.
    pub fn execute_line(&mut self, line: &str) -> ShellResult<Outcome> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Outcome::Continue(String::new()));
        }

        let (command, rest) = line
            .split_once(char::is_whitespace)
            .map(|(c, r)| (c, r.trim_start()))
            .unwrap_or((line, ""));
        let args: Vec<&str> = rest.split_whitespace().collect();
        debug!(command, ?args, "executing");

        let text = match command.to_lowercase().as_str() {
            "help" | "?" => help(),
            "quit" | "exit" | "q" => return Ok(Outcome::Quit),
            "mkdir" => {
                let path = one_arg(&args, "mkdir PATH")?;
                let id = self.history.allocate_id()?;
                self.submit(
                    format!("Create directory {}", path),
                    Change::create_directory(id, path),
                )?
            }
            "touch" => {
                let (path, text) = path_and_text(rest, "touch PATH [TEXT]")?;
                let id = self.history.allocate_id()?;
                self.submit(
                    format!("Create file {}", path),
                    Change::create_file(id, path, unescape(text), Timestamp::now()),
                )?
            }
            "write" => {
                let (path, text) = path_and_text(rest, "write PATH TEXT")?;
                self.write(path, unescape(text))?
            }
            "rename" => {
                let [path, name] = two_args(&args, "rename PATH NEW_NAME")?;
                self.submit(
                    format!("Rename {} to {}", path, name),
                    Change::rename(path, name),
                )?
            }
            "mv" => {
                let [path, parent] = two_args(&args, "mv PATH DIRECTORY")?;
                self.submit(
                    format!("Move {} to {}", path, parent),
                    Change::move_to(path, parent),
                )?
            }
            "rm" => {
                let path = one_arg(&args, "rm PATH")?;
                self.submit(format!("Delete {}", path), Change::delete(path))?
            }
            "cat" => self.cat(one_arg(&args, "cat PATH")?)?,
            "ls" => self.ls(args.first().copied().unwrap_or(""))?,
            "tree" => {
                if self.config.json {
                    serde_json::to_string_pretty(&self.history.snapshot())?
                } else {
                    self.history.root().render()
                }
            }
            "snapshot" => serde_json::to_string_pretty(&self.history.snapshot())?,
            "log" => self.log()?,
            "origin" => self.origin(one_arg(&args, "origin PATH")?)?,
            "undo" => {
                self.ensure_no_batch("undo")?;
                let id = self.history.undo()?;
                format!("undone {}", id.short())
            }
            "redo" => {
                self.ensure_no_batch("redo")?;
                let id = self.history.redo()?;
                format!("redone {}", id.short())
            }
            "revert" => {
                self.ensure_no_batch("revert")?;
                let id = self.find_changeset(one_arg(&args, "revert CHANGESET")?)?;
                let count = self.history.revert_to(id)?;
                format!("reverted {} changeset(s)", count)
            }
            "begin" => {
                self.ensure_no_batch("begin")?;
                if rest.is_empty() {
                    return Err(ShellError::Usage("begin NAME".into()));
                }
                self.pending = Some(PendingBatch {
                    name: rest.to_string(),
                    changes: Vec::new(),
                });
                format!("batch '{}' started", rest)
            }
            "commit" => {
                let batch = self
                    .pending
                    .take()
                    .ok_or_else(|| ShellError::Usage("commit needs an open batch, see 'begin'".into()))?;
                let count = batch.changes.len();
                let id = self.history.record(batch.name, batch.changes)?;
                format!("recorded {} ({} changes)", id.short(), count)
            }
            "abort" => match self.pending.take() {
                Some(batch) => format!("batch '{}' discarded", batch.name),
                None => return Err(ShellError::Usage("abort needs an open batch, see 'begin'".into())),
            },
            other => return Err(ShellError::UnknownCommand(other.to_string())),
        };

        Ok(Outcome::Continue(text))
    }

    /// Record `change` as its own changeset, or queue it in the open batch.
    fn submit(&mut self, name: String, change: Change) -> ShellResult<String> {
        let description = change.to_string();
        if let Some(batch) = self.pending.as_mut() {
            batch.changes.push(change);
            return Ok(format!("queued: {}", description));
        }
        let id = self.history.record(name, [change])?;
        Ok(format!("{} [{}]", description, id.short()))
    }

    fn write(&mut self, path: &str, text: String) -> ShellResult<String> {
        let exists = self.history.root().find_entry(path).is_some_and(|e| e.is_file())
            || self.queued_file(path);
        if exists {
            self.submit(
                format!("Edit {}", path),
                Change::change_file_content(path, text, Timestamp::now()),
            )
        } else {
            let id = self.history.allocate_id()?;
            self.submit(
                format!("Create file {}", path),
                Change::create_file(id, path, text, Timestamp::now()),
            )
        }
    }

    /// whether the open batch already creates a file at `path`
    fn queued_file(&self, path: &str) -> bool {
        let target = split_path(path);
        self.pending.as_ref().is_some_and(|batch| {
            batch.changes.iter().any(|change| {
                matches!(change, Change::CreateFile(_)) && split_path(change.path()) == target
            })
        })
    }

    fn cat(&self, path: &str) -> ShellResult<String> {
        let entry = self.history.root().get_entry(path)?;
        let content = entry
            .content()
            .ok_or_else(|| ShellError::Usage(format!("cat: '{}' is a directory", path)))?;
        Ok(match content.as_text() {
            Some(text) => text.to_string(),
            None => format!("<{} bytes of binary content>", content.len()),
        })
    }

    fn ls(&self, path: &str) -> ShellResult<String> {
        let root = self.history.root();
        let entry = root.get_entry(path)?;
        if entry.is_file() {
            return Ok(entry.name().to_string());
        }

        let children: Vec<ListedEntry<'_>> = root
            .children(entry)
            .map(|child| ListedEntry {
                id: child.id(),
                name: child.name(),
                directory: child.is_directory(),
            })
            .collect();

        if self.config.json {
            return Ok(serde_json::to_string_pretty(&children)?);
        }
        Ok(children
            .iter()
            .map(|c| {
                if c.directory {
                    format!("{}/", c.name)
                } else {
                    c.name.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn log(&self) -> ShellResult<String> {
        let revisions = self.history.revisions();
        if self.config.json {
            let summaries: Vec<_> = revisions.iter().rev().map(Revision::summary).collect();
            return Ok(serde_json::to_string_pretty(&summaries)?);
        }
        if revisions.is_empty() {
            return Ok("(no changesets)".to_string());
        }

        let mut out = String::new();
        for revision in revisions.iter().rev() {
            out.push_str(&describe(revision));
            out.push('\n');
            for change in revision.changeset().changes() {
                out.push_str(&format!("    {}\n", change));
            }
        }
        Ok(out)
    }

    fn origin(&self, path: &str) -> ShellResult<String> {
        let revision = self.history.creation_of(path)?;
        if self.config.json {
            return Ok(serde_json::to_string_pretty(&revision.map(Revision::summary))?);
        }
        Ok(match revision {
            Some(revision) => format!("'{}' was created by {}", path, describe(revision)),
            None => format!("'{}' predates the recorded history", path),
        })
    }

    /// resolve a full changeset id or a unique suffix of one
    fn find_changeset(&self, text: &str) -> ShellResult<ChangeSetId> {
        if let Some(id) = ChangeSetId::parse(text) {
            return Ok(id);
        }
        let suffix = text.to_lowercase();
        let mut matches = self
            .history
            .revisions()
            .iter()
            .map(Revision::id)
            .filter(|id| id.to_string().ends_with(&suffix));

        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id),
            (Some(_), Some(_)) => Err(ShellError::Usage(format!("'{}' matches several changesets", text))),
            (None, _) => Err(ShellError::Usage(format!("no changeset matches '{}'", text))),
        }
    }

    fn ensure_no_batch(&self, command: &str) -> ShellResult<()> {
        match &self.pending {
            Some(batch) => Err(ShellError::Usage(format!(
                "'{}' is not allowed while batch '{}' is open, use 'commit' or 'abort'",
                command, batch.name
            ))),
            None => Ok(()),
        }
    }
}

fn describe(revision: &Revision) -> String {
    format!(
        "{} {} {} ({} changes)",
        revision.id().short(),
        revision.recorded_at().format("%Y-%m-%d %H:%M:%S"),
        revision.changeset().name(),
        revision.changeset().len()
    )
}

fn one_arg<'a>(args: &[&'a str], usage: &str) -> ShellResult<&'a str> {
    match args {
        [arg] => Ok(*arg),
        _ => Err(ShellError::Usage(usage.to_string())),
    }
}

fn two_args<'a>(args: &[&'a str], usage: &str) -> ShellResult<[&'a str; 2]> {
    match args {
        [a, b] => Ok([*a, *b]),
        _ => Err(ShellError::Usage(usage.to_string())),
    }
}

/// split "PATH rest of the line" keeping the text verbatim
fn path_and_text<'a>(rest: &'a str, usage: &str) -> ShellResult<(&'a str, &'a str)> {
    if rest.is_empty() {
        return Err(ShellError::Usage(usage.to_string()));
    }
    Ok(rest
        .split_once(char::is_whitespace)
        .map(|(path, text)| (path, text.trim_start()))
        .unwrap_or((rest, "")))
}

fn unescape(text: &str) -> String {
    text.replace("\\n", "\n").replace("\\t", "\t")
}

fn help() -> String {
    [
        "Changes:",
        "  mkdir PATH                Create a directory",
        "  touch PATH [TEXT]         Create a file",
        "  write PATH TEXT           Create a file or replace its content",
        "  rename PATH NEW_NAME      Rename an entry",
        "  mv PATH DIRECTORY         Move an entry ('/' is the root)",
        "  rm PATH                   Delete an entry and everything below it",
        "",
        "Batches:",
        "  begin NAME                Queue the following changes as one changeset",
        "  commit                    Record the queued changes",
        "  abort                     Drop the queued changes",
        "",
        "History:",
        "  log                       List recorded changesets, newest first",
        "  undo / redo               Revert or re-apply the latest changeset",
        "  revert CHANGESET          Undo back to and including CHANGESET",
        "  origin PATH               Show the changeset that created PATH",
        "",
        "Inspection:",
        "  ls [PATH]                 List a directory",
        "  cat PATH                  Print file content",
        "  tree                      Print the whole tree",
        "  snapshot                  Print the tree as JSON",
        "  help                      Show this help message",
        "  quit                      Exit",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryConfig;
    use std::io::{BufReader, Cursor, Write as _};

    fn shell() -> Shell {
        Shell::new(LocalHistory::default())
    }

    fn run(shell: &mut Shell, line: &str) -> String {
        match shell.execute_line(line).unwrap() {
            Outcome::Continue(text) => text,
            Outcome::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn test_basic_commands() {
        let mut sh = shell();
        assert_eq!(
            run(&mut sh, "mkdir docs").split(" [").next(),
            Some("create directory 'docs' (#1)")
        );
        run(&mut sh, "write docs/readme hello world");
        assert_eq!(run(&mut sh, "cat docs/readme"), "hello world");

        run(&mut sh, "write docs/readme line one\\nline two");
        assert_eq!(run(&mut sh, "cat docs/readme"), "line one\nline two");
        assert_eq!(run(&mut sh, "ls"), "docs/");
        assert_eq!(run(&mut sh, "ls docs"), "readme");
        assert_eq!(sh.history().revisions().len(), 3);

        run(&mut sh, "rename docs/readme README");
        run(&mut sh, "mkdir archive");
        run(&mut sh, "mv docs/README archive");
        assert_eq!(run(&mut sh, "tree"), "/\n  archive/\n    README (17 bytes)\n  docs/\n");

        run(&mut sh, "rm docs");
        assert_eq!(run(&mut sh, "ls /"), "archive/");
    }

    #[test]
    fn test_undo_redo_and_revert() {
        let mut sh = shell();
        run(&mut sh, "touch a");
        run(&mut sh, "touch b");
        run(&mut sh, "write b edited");

        assert!(run(&mut sh, "undo").starts_with("undone "));
        assert_eq!(run(&mut sh, "cat b"), "");
        assert!(run(&mut sh, "redo").starts_with("redone "));
        assert_eq!(run(&mut sh, "cat b"), "edited");

        let first = sh.history().revisions()[0].id().short();
        assert_eq!(run(&mut sh, &format!("revert {}", first)), "reverted 3 changeset(s)");
        assert_eq!(run(&mut sh, "ls"), "");
        assert!(sh.execute_line("undo").is_err());
    }

    #[test]
    fn test_batch_is_one_changeset() {
        let mut sh = shell();
        run(&mut sh, "begin add project");
        assert!(sh.in_batch());
        assert!(run(&mut sh, "mkdir src").starts_with("queued: "));
        run(&mut sh, "write src/main fn main() {}");
        assert!(sh.execute_line("undo").is_err());
        assert_eq!(run(&mut sh, "commit").split(" (").nth(1), Some("2 changes)"));

        assert_eq!(sh.history().revisions().len(), 1);
        assert_eq!(run(&mut sh, "cat src/main"), "fn main() {}");
        assert!(run(&mut sh, "origin src/main").contains("add project (2 changes)"));

        run(&mut sh, "undo");
        assert_eq!(run(&mut sh, "ls"), "");
    }

    #[test]
    fn test_batch_write_twice_edits_queued_file() {
        let mut sh = shell();
        run(&mut sh, "begin notes");
        assert!(run(&mut sh, "write f one").starts_with("queued: create file 'f'"));
        assert!(run(&mut sh, "write /f two").starts_with("queued: change content of"));
        run(&mut sh, "commit");

        assert_eq!(run(&mut sh, "cat f"), "two");
        assert_eq!(sh.history().revisions().len(), 1);
        assert_eq!(sh.history().revisions()[0].changeset().len(), 2);
    }

    #[test]
    fn test_failed_batch_leaves_tree_untouched() {
        let mut sh = shell();
        run(&mut sh, "touch taken");
        run(&mut sh, "begin broken");
        run(&mut sh, "mkdir fresh");
        run(&mut sh, "touch taken");

        let err = sh.execute_line("commit").unwrap_err();
        assert!(matches!(err, ShellError::History(_)));
        assert!(!sh.in_batch());
        assert_eq!(run(&mut sh, "ls"), "taken");
    }

    #[test]
    fn test_abort() {
        let mut sh = shell();
        run(&mut sh, "begin scratch");
        run(&mut sh, "touch tmp");
        assert_eq!(run(&mut sh, "abort"), "batch 'scratch' discarded");
        assert_eq!(run(&mut sh, "ls"), "");
        assert!(matches!(sh.execute_line("abort"), Err(ShellError::Usage(_))));
    }

    #[test]
    fn test_usage_errors() {
        let mut sh = shell();
        assert!(matches!(sh.execute_line("mkdir"), Err(ShellError::Usage(_))));
        assert!(matches!(sh.execute_line("mv a"), Err(ShellError::Usage(_))));
        assert!(matches!(sh.execute_line("frobnicate"), Err(ShellError::UnknownCommand(_))));
        assert!(matches!(sh.execute_line("cat missing"), Err(ShellError::Tree(_))));
        assert!(matches!(sh.execute_line("revert zzz"), Err(ShellError::Usage(_))));

        run(&mut sh, "mkdir dir");
        assert!(matches!(sh.execute_line("cat dir"), Err(ShellError::Usage(_))));
        assert_eq!(sh.execute_line("quit").unwrap(), Outcome::Quit);
        assert_eq!(run(&mut sh, "# comment"), "");
    }

    #[test]
    fn test_origin() {
        let mut sh = shell();
        run(&mut sh, "mkdir dir");
        run(&mut sh, "touch dir/file");
        run(&mut sh, "mv dir/file /");
        assert!(run(&mut sh, "origin file").contains("Create file dir/file"));
    }

    #[test]
    fn test_json_output() {
        let mut sh = Shell::with_config(
            LocalHistory::default(),
            ShellConfig {
                json: true,
                ..ShellConfig::default()
            },
        );
        run(&mut sh, "mkdir dir");
        run(&mut sh, "touch file");

        let listed: serde_json::Value = serde_json::from_str(&run(&mut sh, "ls")).unwrap();
        assert_eq!(listed[0]["name"], "dir");
        assert_eq!(listed[0]["directory"], true);
        assert_eq!(listed[1]["name"], "file");

        let log: serde_json::Value = serde_json::from_str(&run(&mut sh, "log")).unwrap();
        assert_eq!(log.as_array().map(Vec::len), Some(2));
        assert_eq!(log[0]["name"], "Create file file");

        let origin: serde_json::Value = serde_json::from_str(&run(&mut sh, "origin dir")).unwrap();
        assert_eq!(origin["name"], "Create directory dir");
    }

    #[test]
    fn test_run_counts_failures() {
        let mut sh = shell();
        let input = Cursor::new("mkdir a\nmkdir a\nls\nquit\nmkdir never\n");
        let mut output = Vec::new();

        let failures = sh.run(input, &mut output, false).unwrap();
        assert_eq!(failures, 1);

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("error: "));
        assert!(text.ends_with("a/\n"));
        assert!(!sh.history().root().has_entry("never"));
    }

    #[test]
    fn test_run_script_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# build a small tree").unwrap();
        writeln!(file, "begin init").unwrap();
        writeln!(file, "mkdir src").unwrap();
        writeln!(file, "touch src/lib hello").unwrap();
        writeln!(file, "commit").unwrap();
        writeln!(file, "begin dangling").unwrap();
        writeln!(file, "rm src").unwrap();
        file.flush().unwrap();

        let history = LocalHistory::new(HistoryConfig::new().case_sensitive(false)).unwrap();
        let mut sh = Shell::new(history);
        let reader = BufReader::new(file.reopen().unwrap());
        let mut output = Vec::new();

        assert_eq!(sh.run(reader, &mut output, false).unwrap(), 0);
        assert!(String::from_utf8(output)
            .unwrap()
            .contains("discarded uncommitted batch 'dangling'"));
        assert_eq!(run(&mut sh, "cat SRC/LIB"), "hello");
        assert!(!sh.in_batch());
    }
}
