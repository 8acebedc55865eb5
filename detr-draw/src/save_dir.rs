//! Preparation of the output directory.

use crate::common::*;

/// Asks whether a non-empty save directory may be cleared.
pub trait Confirm {
    /// Return `true` to clear the directory.
    fn confirm(&mut self, dir: &Path, entries: &[String]) -> Result<bool>;
}

impl<F> Confirm for F
where
    F: FnMut(&Path, &[String]) -> Result<bool>,
{
    fn confirm(&mut self, dir: &Path, entries: &[String]) -> Result<bool> {
        self(dir, entries)
    }
}

/// Accepts without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _dir: &Path, _entries: &[String]) -> Result<bool> {
        Ok(true)
    }
}

/// Prompts on a terminal until the answer is `yes` or `no`.
#[derive(Debug)]
pub struct StdinPrompt<R, W> {
    reader: R,
    writer: W,
}

impl StdinPrompt<BufReader<io::Stdin>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> StdinPrompt<R, W>
where
    R: BufRead,
    W: Write,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R, W> Confirm for StdinPrompt<R, W>
where
    R: BufRead,
    W: Write,
{
    fn confirm(&mut self, dir: &Path, _entries: &[String]) -> Result<bool> {
        loop {
            write!(
                self.writer,
                "{} is not empty. Clear it? (yes/no) ",
                dir.display()
            )?;
            self.writer.flush()?;

            let mut line = String::new();
            let num_bytes = self.reader.read_line(&mut line)?;
            if num_bytes == 0 {
                bail!("input is closed before an answer is given");
            }

            match line.trim().to_lowercase().as_str() {
                "yes" => return Ok(true),
                "no" => return Ok(false),
                _ => writeln!(self.writer, "Please answer yes or no.")?,
            }
        }
    }
}

/// The state of the save directory after preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prepared {
    /// The directory is empty and ready for output.
    Ready,
    /// Clearing the directory was declined.
    Declined,
}

/// Make sure the save directory is empty, asking before clearing it.
pub fn prepare_save_dir(dir: impl AsRef<Path>, confirm: &mut dyn Confirm) -> Result<Prepared> {
    let dir = dir.as_ref();
    ensure!(
        dir.is_dir(),
        "--save_path expects a folder path, {} is not a folder",
        dir.display()
    );

    let mut entries: Vec<String> = fs::read_dir(dir)?
        .map(|entry| -> Result<_> { Ok(entry?.file_name().to_string_lossy().into_owned()) })
        .try_collect()?;
    entries.sort();

    if entries.is_empty() {
        return Ok(Prepared::Ready);
    }

    info!("{} contains {:?}", dir.display(), entries);
    if !confirm.confirm(dir, &entries)? {
        info!("keep {} untouched", dir.display());
        return Ok(Prepared::Declined);
    }

    fs::remove_dir_all(dir).with_context(|| format!("failed to clear {}", dir.display()))?;
    fs::create_dir(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    info!("cleared {}", dir.display());

    Ok(Prepared::Ready)
}
