//! Capture file pairs: a pcap file plus its JSONL metadata sidecar.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder_slice::LittleEndian;
use chrono::{DateTime, Utc};
use pcap_file::pcap::{PcapHeader, PcapPacket};
use pcap_file::{DataLink, Endianness, TsResolution};
use tracing::debug;

use crate::domain::Frame;
use crate::error::OutputError;

/// Prefix shared by every file this collector owns in the output directory.
pub const FILE_PREFIX: &str = "capture_";
pub const PCAP_EXTENSION: &str = "pcap";
pub const METADATA_EXTENSION: &str = "jsonl";

/// Largest frame a pair records; also the snaplen in the pcap header.
pub const SNAPLEN: u32 = 65535;

const TS_RESOLUTION: TsResolution = TsResolution::MicroSecond;

/// Give up on finding a free basename after this many suffixes.
const MAX_BASENAME_SUFFIX: u32 = 100;

/// Basename for a pair created at `created_at`, e.g. `capture_20260115T120000Z`.
pub fn basename_for(created_at: DateTime<Utc>) -> String {
    format!("{}{}", FILE_PREFIX, created_at.format("%Y%m%dT%H%M%SZ"))
}

/// Whether `name` follows the pair naming convention.
pub fn is_pair_file(name: &str) -> bool {
    let Some(rest) = name.strip_prefix(FILE_PREFIX) else {
        return false;
    };
    match rest.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty() && (ext == PCAP_EXTENSION || ext == METADATA_EXTENSION)
        }
        None => false,
    }
}

/// What is left of a pair once it has been closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSummary {
    pub basename: String,
    pub frames: u64,
}

struct MetadataLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

/// An open pcap file and, when metadata is enabled, its sidecar log.
///
/// Both files share one basename and are opened and closed together.
pub struct OutputPair {
    basename: String,
    created_at: DateTime<Utc>,
    pcap_path: PathBuf,
    pcap: BufWriter<File>,
    metadata: Option<MetadataLog>,
    frames: u64,
}

impl OutputPair {
    /// Create a new pair in `dir` named after `created_at`.
    ///
    /// If a pair with that basename already exists (two rotations within one
    /// second) a `_N` suffix is appended, which still sorts after the original.
    pub fn open(dir: &Path, created_at: DateTime<Utc>, metadata: bool) -> Result<Self, OutputError> {
        let base = basename_for(created_at);

        let mut suffix = 0;
        let (basename, pcap_file) = loop {
            let candidate = if suffix == 0 {
                base.clone()
            } else {
                format!("{}_{}", base, suffix)
            };
            let path = dir.join(format!("{}.{}", candidate, PCAP_EXTENSION));
            match create_new(&path) {
                Ok(file) => break (candidate, file),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && suffix < MAX_BASENAME_SUFFIX => {
                    debug!("{} already exists, trying next suffix", path.display());
                    suffix += 1;
                }
                Err(source) => return Err(OutputError::Io { path, source }),
            }
        };
        let pcap_path = dir.join(format!("{}.{}", basename, PCAP_EXTENSION));

        let mut pcap = BufWriter::new(pcap_file);
        if let Err(source) = pcap_header().write_to(&mut pcap) {
            discard(&pcap_path);
            return Err(OutputError::Pcap {
                path: pcap_path,
                source,
            });
        }

        let metadata = if metadata {
            let path = dir.join(format!("{}.{}", basename, METADATA_EXTENSION));
            match create_new(&path) {
                Ok(file) => Some(MetadataLog {
                    path,
                    writer: BufWriter::new(file),
                }),
                Err(source) => {
                    discard(&pcap_path);
                    return Err(OutputError::Io { path, source });
                }
            }
        } else {
            None
        };

        Ok(Self {
            basename,
            created_at,
            pcap_path,
            pcap,
            metadata,
            frames: 0,
        })
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn pcap_path(&self) -> &Path {
        &self.pcap_path
    }

    pub fn metadata_path(&self) -> Option<&Path> {
        self.metadata.as_ref().map(|m| m.path.as_path())
    }

    /// Frames written to this pair so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Append one frame, and its metadata line when the sidecar is open.
    ///
    /// The pcap record is written first and the line only after it. If the
    /// sidecar write then fails, the frame stays in the pcap without a line
    /// and the error is returned.
    pub fn write_frame(&mut self, frame: &Frame, metadata_line: Option<&str>) -> Result<(), OutputError> {
        let packet = PcapPacket::new(frame.since_epoch(), frame.orig_len, &frame.data);
        packet
            .write_to::<_, LittleEndian>(&mut self.pcap, TS_RESOLUTION, SNAPLEN)
            .map_err(|source| OutputError::Pcap {
                path: self.pcap_path.clone(),
                source,
            })?;
        self.frames += 1;

        if let (Some(log), Some(line)) = (self.metadata.as_mut(), metadata_line) {
            writeln!(log.writer, "{}", line).map_err(|source| OutputError::Io {
                path: log.path.clone(),
                source,
            })?;
        }

        Ok(())
    }

    /// Push buffered bytes of both files to the OS.
    pub fn flush(&mut self) -> Result<(), OutputError> {
        self.pcap.flush().map_err(|source| OutputError::Io {
            path: self.pcap_path.clone(),
            source,
        })?;
        if let Some(log) = self.metadata.as_mut() {
            log.writer.flush().map_err(|source| OutputError::Io {
                path: log.path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Flush and close both files.
    ///
    /// Both files are closed even if flushing the first one fails; the first
    /// error is returned.
    pub fn close(self) -> Result<PairSummary, OutputError> {
        let summary = PairSummary {
            basename: self.basename,
            frames: self.frames,
        };

        let mut pcap = self.pcap;
        let pcap_result = pcap.flush().map_err(|source| OutputError::Io {
            path: self.pcap_path.clone(),
            source,
        });
        drop(pcap);

        let metadata_result = match self.metadata {
            Some(mut log) => log.writer.flush().map_err(|source| OutputError::Io {
                path: log.path.clone(),
                source,
            }),
            None => Ok(()),
        };

        pcap_result?;
        metadata_result?;
        Ok(summary)
    }
}

fn pcap_header() -> PcapHeader {
    PcapHeader {
        snaplen: SNAPLEN,
        datalink: DataLink::ETHERNET,
        ts_resolution: TS_RESOLUTION,
        endianness: Endianness::Little,
        ..PcapHeader::default()
    }
}

fn create_new(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// Remove a half-created pair file. Failure only leaves an empty file behind.
fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        debug!("Failed to remove {}: {}", path.display(), e);
    }
}
