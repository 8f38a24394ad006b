//! Output delivery: generated filenames, file sinks and print windows

use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::{Error, Result};

/// Used in filenames when no employee has been entered
pub const FALLBACK_EMPLOYEE: &str = "collection";

fn filename_stem(employee: &str, date: NaiveDate) -> String {
    let who = employee.trim();
    let who = if who.is_empty() { FALLBACK_EMPLOYEE } else { who };
    let who: String = who
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '-' } else { c })
        .collect();
    format!("laporan-{}-{}", who, date.format("%Y-%m-%d"))
}

/// `laporan-<employee or "collection">-<YYYY-MM-DD>.png`
pub fn export_filename(employee: &str, date: NaiveDate) -> String {
    format!("{}.png", filename_stem(employee, date))
}

/// Name of the print document for the same report
pub fn print_document_name(employee: &str, date: NaiveDate) -> String {
    format!("{}.html", filename_stem(employee, date))
}

/// Where exported files end up.
pub trait ExportSink: Send + Sync {
    /// Store `bytes` under `filename` and report where they went.
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Writes exports into a directory, creating it on first use
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ExportSink for DirectorySink {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// Keeps exports in memory (tests, embedding hosts)
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, filename: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(filename)
            .cloned()
    }

    pub fn filenames(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl ExportSink for MemorySink {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(filename.to_string(), bytes.to_vec());
        Ok(PathBuf::from(filename))
    }
}

/// A platform print flow: a fresh document context per print job.
pub trait PrintWindow: Send + Sync {
    fn open(&self, name: &str) -> Result<Box<dyn PrintContext + Send>>;
}

pub trait PrintContext {
    fn write(&mut self, document: &str) -> Result<()>;
    fn print(&mut self) -> Result<()>;
    /// Always called once the job is over, whether or not printing worked.
    fn close(self: Box<Self>);
}

/// Print flow that saves the document as an HTML file; printing it is left
/// to whatever opens the file.
#[derive(Debug, Clone)]
pub struct HtmlFilePrinter {
    dir: PathBuf,
}

impl HtmlFilePrinter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PrintWindow for HtmlFilePrinter {
    fn open(&self, name: &str) -> Result<Box<dyn PrintContext + Send>> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(Box::new(HtmlFileContext {
            path: self.dir.join(name),
            document: String::new(),
        }))
    }
}

struct HtmlFileContext {
    path: PathBuf,
    document: String,
}

impl PrintContext for HtmlFileContext {
    fn write(&mut self, document: &str) -> Result<()> {
        self.document.push_str(document);
        Ok(())
    }

    fn print(&mut self) -> Result<()> {
        if self.document.is_empty() {
            return Err(Error::Delivery("nothing to print".into()));
        }
        std::fs::write(&self.path, &self.document)?;
        log::info!("print document written to {}", self.path.display());
        Ok(())
    }

    fn close(self: Box<Self>) {
        log::debug!("print context for {} closed", self.path.display());
    }
}
