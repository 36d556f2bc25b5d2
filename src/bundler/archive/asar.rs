//! asar archive writer.
//!
//! Layout:
//!
//! ```text
//! u32 LE 4 | u32 LE header_len          size pickle
//! u32 LE payload_len | i32 LE json_len   header pickle
//! json bytes | zero padding to 4
//! file contents, at the offsets named in the header
//! ```

use crate::bundler::error::{Error, ErrorExt, Result};
use crate::bundler::archive::ResourceArchiver;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Native asar writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsarArchiver;

impl ResourceArchiver for AsarArchiver {
    async fn seal(&self, source: &Path, output: &Path) -> Result<()> {
        let source = source.to_path_buf();
        let output = output.to_path_buf();
        let target = output.clone();
        tokio::task::spawn_blocking(move || write_archive(&source, &output))
            .await
            .map_err(|e| Error::Archive {
                output: target,
                reason: format!("archive task failed: {e}"),
            })?
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
enum Entry {
    Dir {
        files: BTreeMap<String, Entry>,
    },
    File {
        size: u64,
        offset: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        executable: bool,
        integrity: Integrity,
    },
    Link {
        link: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Integrity {
    algorithm: String,
    hash: String,
    block_size: usize,
    blocks: Vec<String>,
}

/// Files in the order their contents are appended.
struct Layout {
    root: Entry,
    contents: Vec<(PathBuf, u64)>,
}

fn write_archive(source: &Path, output: &Path) -> Result<()> {
    let archive_err = |reason: String| Error::Archive {
        output: output.to_path_buf(),
        reason,
    };

    let meta = std::fs::metadata(source).fs_context("reading archive source", source)?;
    if !meta.is_dir() {
        return Err(archive_err(format!("{} is not a directory", source.display())));
    }

    let layout = build_layout(source)?;
    let header = serde_json::to_vec(&layout.root)?;
    let header_pickle = header_pickle(&header)?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).fs_context("creating archive directory", parent)?;
    }
    let partial = partial_path(output);
    let result = (|| -> Result<()> {
        let file = File::create(&partial).fs_context("creating archive", &partial)?;
        let mut out = BufWriter::new(file);
        out.write_all(&4u32.to_le_bytes())?;
        out.write_all(&pickle_len(header_pickle.len())?.to_le_bytes())?;
        out.write_all(&header_pickle)?;

        for (path, size) in &layout.contents {
            let mut src = File::open(path).fs_context("opening archived file", path)?;
            let copied = io::copy(&mut src, &mut out).fs_context("archiving file", path)?;
            if copied != *size {
                return Err(archive_err(format!(
                    "{} changed size while archiving ({} -> {} bytes)",
                    path.display(),
                    size,
                    copied
                )));
            }
        }
        out.flush().fs_context("flushing archive", &partial)?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            std::fs::rename(&partial, output).fs_context("finalizing archive", output)?;
            log::debug!(
                "Sealed {} files from {} into {}",
                layout.contents.len(),
                source.display(),
                output.display()
            );
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::remove_file(&partial);
            Err(e)
        }
    }
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    output.with_file_name(name)
}

fn pickle_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::GenericError("asar header too large".into()))
}

/// Header pickle: payload length, string length, string bytes, padding.
fn header_pickle(json: &[u8]) -> Result<Vec<u8>> {
    let padded = json.len().div_ceil(4) * 4;
    let payload_len = pickle_len(4 + padded)?;
    let json_len = pickle_len(json.len())?;

    let mut buf = Vec::with_capacity(8 + padded);
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&json_len.to_le_bytes());
    buf.extend_from_slice(json);
    buf.resize(8 + padded, 0);
    Ok(buf)
}

fn build_layout(source: &Path) -> Result<Layout> {
    let real_root = std::fs::canonicalize(source).fs_context("resolving archive source", source)?;
    let mut root = BTreeMap::new();
    let mut contents = Vec::new();
    let mut offset = 0u64;

    for entry in walkdir::WalkDir::new(source)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        let rel = entry.path().strip_prefix(source)?;
        let components = rel
            .iter()
            .map(|c| {
                c.to_str().map(str::to_owned).ok_or_else(|| {
                    Error::GenericError(format!("non UTF-8 path in archive: {}", rel.display()))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let Some((name, parents)) = components.split_last() else {
            continue;
        };
        let dir = parent_dir(&mut root, parents)?;

        let file_type = entry.file_type();
        let node = if file_type.is_symlink() {
            Entry::Link {
                link: link_target(entry.path(), &real_root)?,
            }
        } else if file_type.is_dir() {
            Entry::Dir {
                files: BTreeMap::new(),
            }
        } else {
            let metadata = entry.metadata()?;
            let size = metadata.len();
            let node = Entry::File {
                size,
                offset: offset.to_string(),
                executable: is_executable(&metadata),
                integrity: integrity(entry.path())?,
            };
            contents.push((entry.path().to_path_buf(), size));
            offset += size;
            node
        };
        dir.insert(name.clone(), node);
    }

    Ok(Layout {
        root: Entry::Dir { files: root },
        contents,
    })
}

fn parent_dir<'a>(
    root: &'a mut BTreeMap<String, Entry>,
    parents: &[String],
) -> Result<&'a mut BTreeMap<String, Entry>> {
    let mut dir = root;
    for component in parents {
        dir = match dir.get_mut(component) {
            Some(Entry::Dir { files }) => files,
            _ => {
                return Err(Error::GenericError(format!(
                    "archive parent {component} is not a directory"
                )));
            }
        };
    }
    Ok(dir)
}

fn link_target(link: &Path, real_root: &Path) -> Result<String> {
    let resolved = std::fs::canonicalize(link).fs_context("resolving symlink", link)?;
    let rel = resolved.strip_prefix(real_root).map_err(|_| {
        Error::GenericError(format!(
            "symlink {} points outside the archived directory",
            link.display()
        ))
    })?;
    rel.to_str()
        .map(str::to_owned)
        .ok_or_else(|| Error::GenericError(format!("non UTF-8 link target: {}", rel.display())))
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    false
}

fn integrity(path: &Path) -> Result<Integrity> {
    let file = File::open(path).fs_context("opening file for hashing", path)?;
    let mut reader = BufReader::new(file);
    let mut whole = Sha256::new();
    let mut blocks = Vec::new();
    let mut block = vec![0u8; BLOCK_SIZE];

    loop {
        let filled = read_block(&mut reader, &mut block).fs_context("hashing file", path)?;
        if filled == 0 {
            break;
        }
        whole.update(&block[..filled]);
        blocks.push(hex::encode(Sha256::digest(&block[..filled])));
        if filled < BLOCK_SIZE {
            break;
        }
    }
    if blocks.is_empty() {
        blocks.push(hex::encode(Sha256::digest(b"")));
    }

    Ok(Integrity {
        algorithm: "SHA256".to_string(),
        hash: hex::encode(whole.finalize()),
        block_size: BLOCK_SIZE,
        blocks,
    })
}

fn read_block(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Reads the JSON header of an asar archive and the offset where file data starts.
pub fn read_header(archive: &Path) -> Result<(serde_json::Value, u64)> {
    let mut file = File::open(archive).fs_context("opening archive", archive)?;
    let mut word = [0u8; 4];

    file.read_exact(&mut word)?;
    file.read_exact(&mut word)?;
    let header_len = u32::from_le_bytes(word) as usize;

    let mut pickle = vec![0u8; header_len];
    file.read_exact(&mut pickle)?;
    if pickle.len() < 8 {
        return Err(Error::GenericError("truncated asar header".into()));
    }
    let json_len = u32::from_le_bytes([pickle[4], pickle[5], pickle[6], pickle[7]]) as usize;
    let json = pickle
        .get(8..8 + json_len)
        .ok_or_else(|| Error::GenericError("truncated asar header".into()))?;
    Ok((serde_json::from_slice(json)?, 8 + header_len as u64))
}
