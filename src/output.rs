use std::io::{self, Write};

use serde::Serialize;

use crate::app::{DownloadResult, ListResult, TagsResult};
use crate::manifest::CanonicalItem;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_list(result: &ListResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_item(item: &CanonicalItem) -> io::Result<()> {
        Self::print_json(item)
    }

    pub fn print_tags(result: &TagsResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_download(result: &DownloadResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl crate::app::ProgressSink for JsonOutput {
    fn event(&self, event: crate::app::ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::debug!(
                event = %event.message,
                elapsed_ms = elapsed.as_millis() as u64,
                "progress"
            ),
            None => tracing::debug!(event = %event.message, "progress"),
        }
    }
}
