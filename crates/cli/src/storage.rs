use anyhow::{Context, Result};
use retrieval::{Document, EmbeddedChunk};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// JSON array of documents.
pub fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open documents file {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid documents JSON in {}", path.display()))
}

/// Corpus written by `folio ingest`.
pub fn read_corpus(path: &Path) -> Result<Vec<EmbeddedChunk>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open corpus file {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid corpus JSON in {}", path.display()))
}

pub fn write_corpus(path: &Path, corpus: &[EmbeddedChunk]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("failed to create corpus file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, corpus)
        .with_context(|| format!("failed to write corpus to {}", path.display()))?;
    writer.flush()?;
    Ok(())
}
