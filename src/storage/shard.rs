// src/storage/shard.rs

//! Rotating CSV shard writer.
//!
//! Records accumulate in one OPEN shard at a time. When the shard reaches
//! the configured record count it is finalized: the write stream is closed,
//! the file is renamed after its first/last record timestamps, gzipped, and
//! the uncompressed form is deleted only once the archive is on disk. A
//! shard is finalized at most once; the driver calls [`ShardWriter::finish`]
//! at run completion for a leftover shard with at least one record.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::Result;
use crate::models::Post;
use crate::utils::RunLogger;

/// CSV header row written at the top of every shard.
pub const SHARD_HEADER: &str =
    "author.handle,record.createdAt,record.text,replyCount,repostCount,likeCount,quoteCount";

/// Writer for rotating, gzip-finalized CSV shards.
pub struct ShardWriter {
    dir: PathBuf,
    prefix: String,
    posts_per_file: usize,
    next_index: u64,
    finalized: u64,
    current: Option<OpenShard>,
}

/// The single OPEN shard, while it exists.
struct OpenShard {
    index: u64,
    path: PathBuf,
    file: File,
    record_count: usize,
    first_created_at: Option<String>,
    last_created_at: Option<String>,
}

impl ShardWriter {
    /// Create a writer emitting shards under `dir`.
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, posts_per_file: usize) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            posts_per_file,
            next_index: 1,
            finalized: 0,
            current: None,
        }
    }

    /// Number of shards finalized so far.
    pub fn finalized_count(&self) -> u64 {
        self.finalized
    }

    /// Whether a shard is currently OPEN.
    pub fn has_open_shard(&self) -> bool {
        self.current.is_some()
    }

    /// Append one post to the current shard, opening or rotating as needed.
    ///
    /// After this returns, the open shard never holds more than the
    /// configured record count.
    pub fn append(&mut self, post: &Post, run_log: &mut RunLogger) -> Result<()> {
        if self.current.is_none() {
            self.open_shard(run_log)?;
        }

        let shard = self.current.as_mut().expect("shard opened above");
        writeln!(shard.file, "{}", encode_record(post))?;
        shard.record_count += 1;
        if shard.first_created_at.is_none() {
            shard.first_created_at = Some(post.created_at.clone());
        }
        shard.last_created_at = Some(post.created_at.clone());

        if shard.record_count >= self.posts_per_file {
            self.finalize_current(run_log)?;
        }
        Ok(())
    }

    /// Finalize the leftover OPEN shard, if any, at run completion.
    pub fn finish(&mut self, run_log: &mut RunLogger) -> Result<()> {
        if self.current.is_some() {
            self.finalize_current(run_log)?;
        }
        Ok(())
    }

    fn open_shard(&mut self, run_log: &mut RunLogger) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let index = self.next_index;
        self.next_index += 1;

        let path = self
            .dir
            .join(format!("{}_part_{:06}.csv", self.prefix, index));
        let mut file = File::create(&path)?;
        writeln!(file, "{SHARD_HEADER}")?;

        run_log.event(&format!("shard {index} opened: {}", path.display()))?;
        self.current = Some(OpenShard {
            index,
            path,
            file,
            record_count: 0,
            first_created_at: None,
            last_created_at: None,
        });
        Ok(())
    }

    /// Two-phase finalize: close + rename, then compress + delete source.
    fn finalize_current(&mut self, run_log: &mut RunLogger) -> Result<()> {
        let Some(shard) = self.current.take() else {
            return Ok(());
        };

        let OpenShard {
            index,
            path,
            mut file,
            record_count,
            first_created_at,
            last_created_at,
        } = shard;

        // Phase 1: close the stream and rename after the record timestamps.
        file.flush()?;
        drop(file);

        let first = sanitize_timestamp(first_created_at.as_deref().unwrap_or_default());
        let last = sanitize_timestamp(last_created_at.as_deref().unwrap_or_default());
        let csv_path = self
            .dir
            .join(format!("{}_{}_{}.csv", self.prefix, first, last));
        fs::rename(&path, &csv_path)?;

        // Phase 2: compress, delete the uncompressed file only after the
        // archive is confirmed on disk. On failure the CSV stays behind.
        let gz_path = csv_path.with_extension("csv.gz");
        compress_file(&csv_path, &gz_path)?;
        fs::remove_file(&csv_path)?;

        self.finalized += 1;
        run_log.event(&format!(
            "shard {index} finalized: {} ({record_count} records)",
            gz_path.display()
        ))?;
        Ok(())
    }
}

/// Gzip `src` into `dst`, syncing the archive before returning.
fn compress_file(src: &Path, dst: &Path) -> Result<()> {
    let mut input = File::open(src)?;
    let output = File::create(dst)?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.sync_all()?;
    Ok(())
}

/// Encode one post as a single CSV line.
fn encode_record(post: &Post) -> String {
    let text = normalize_newlines(&post.text);
    [
        escape_field(&post.handle),
        escape_field(&post.created_at),
        escape_field(&text),
        post.reply_count.to_string(),
        post.repost_count.to_string(),
        post.like_count.to_string(),
        post.quote_count.to_string(),
    ]
    .join(",")
}

/// Collapse embedded newlines to single spaces so a record is one line.
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// Quote a field containing a comma, quote, or newline; double inner quotes.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Strip the timestamp separators that are unsafe or noisy in file names.
fn sanitize_timestamp(ts: &str) -> String {
    ts.chars()
        .filter(|c| !matches!(c, '-' | ':' | 'T' | 'Z'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn post(n: u64) -> Post {
        Post {
            handle: format!("user{n}.bsky.social"),
            created_at: format!("2024-01-01T10:00:{n:02}Z"),
            text: format!("post number {n}"),
            reply_count: n,
            repost_count: 0,
            like_count: n * 10,
            quote_count: 0,
        }
    }

    fn logger(tmp: &TempDir) -> RunLogger {
        RunLogger::open(tmp.path().join("run.log")).unwrap()
    }

    fn gz_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().ends_with(".csv.gz"))
            .collect();
        files.sort();
        files
    }

    fn read_gz_lines(path: &Path) -> Vec<String> {
        let mut decoder = flate2::read::GzDecoder::new(File::open(path).unwrap());
        let mut content = String::new();
        decoder.read_to_string(&mut content).unwrap();
        content.lines().map(str::to_string).collect()
    }

    /// Minimal CSV line parser for round-trip assertions.
    fn parse_line(line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut chars = line.chars().peekable();
        let mut quoted = false;
        while let Some(c) = chars.next() {
            match c {
                '"' if !quoted && field.is_empty() => quoted = true,
                '"' if quoted => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        quoted = false;
                    }
                }
                ',' if !quoted => {
                    fields.push(std::mem::take(&mut field));
                }
                c => field.push(c),
            }
        }
        fields.push(field);
        fields
    }

    #[test]
    fn rotates_at_threshold_and_finalizes_remainder_on_finish() {
        let tmp = TempDir::new().unwrap();
        let mut run_log = logger(&tmp);
        let out = tmp.path().join("shards");
        let mut writer = ShardWriter::new(&out, "posts", 2);

        for n in 1..=3 {
            writer.append(&post(n), &mut run_log).unwrap();
        }
        // Shard 1 rotated at the threshold; shard 2 still open with post 3.
        assert_eq!(writer.finalized_count(), 1);
        assert!(writer.has_open_shard());
        assert_eq!(gz_files(&out).len(), 1);

        writer.finish(&mut run_log).unwrap();
        assert_eq!(writer.finalized_count(), 2);
        assert!(!writer.has_open_shard());

        let files = gz_files(&out);
        assert_eq!(files.len(), 2);
        let first = read_gz_lines(&files[0]);
        assert_eq!(first[0], SHARD_HEADER);
        assert_eq!(first.len(), 3);
        assert!(first[1].starts_with("user1.bsky.social,"));
        assert!(first[2].starts_with("user2.bsky.social,"));
        let second = read_gz_lines(&files[1]);
        assert_eq!(second.len(), 2);
        assert!(second[1].starts_with("user3.bsky.social,"));
    }

    #[test]
    fn shard_count_is_ceil_of_records_over_threshold() {
        let tmp = TempDir::new().unwrap();
        let mut run_log = logger(&tmp);
        let out = tmp.path().join("shards");
        let mut writer = ShardWriter::new(&out, "posts", 3);

        for n in 1..=7 {
            writer.append(&post(n), &mut run_log).unwrap();
        }
        writer.finish(&mut run_log).unwrap();

        let files = gz_files(&out);
        assert_eq!(files.len(), 7usize.div_ceil(3));
        for file in &files {
            let records = read_gz_lines(file).len() - 1;
            assert!(records <= 3);
        }
    }

    #[test]
    fn exact_multiple_leaves_nothing_for_finish() {
        let tmp = TempDir::new().unwrap();
        let mut run_log = logger(&tmp);
        let out = tmp.path().join("shards");
        let mut writer = ShardWriter::new(&out, "posts", 2);

        for n in 1..=4 {
            writer.append(&post(n), &mut run_log).unwrap();
        }
        assert_eq!(writer.finalized_count(), 2);
        assert!(!writer.has_open_shard());

        // finish() must not touch the already-finalized shards again.
        writer.finish(&mut run_log).unwrap();
        assert_eq!(writer.finalized_count(), 2);
        assert_eq!(gz_files(&out).len(), 2);
    }

    #[test]
    fn finalized_name_derives_from_first_and_last_timestamps() {
        let tmp = TempDir::new().unwrap();
        let mut run_log = logger(&tmp);
        let out = tmp.path().join("shards");
        let mut writer = ShardWriter::new(&out, "posts", 10);

        writer.append(&post(1), &mut run_log).unwrap();
        writer.append(&post(2), &mut run_log).unwrap();
        writer.finish(&mut run_log).unwrap();

        let files = gz_files(&out);
        assert_eq!(files.len(), 1);
        assert_eq!(
            files[0].file_name().unwrap().to_str().unwrap(),
            "posts_20240101100001_20240101100002.csv.gz"
        );
        // The uncompressed intermediate is gone.
        assert!(!out.join("posts_20240101100001_20240101100002.csv").exists());
        assert!(!out.join("posts_part_000001.csv").exists());
    }

    #[test]
    fn open_shard_keeps_working_name_until_finalized() {
        let tmp = TempDir::new().unwrap();
        let mut run_log = logger(&tmp);
        let out = tmp.path().join("shards");
        let mut writer = ShardWriter::new(&out, "posts", 10);

        writer.append(&post(1), &mut run_log).unwrap();
        assert!(out.join("posts_part_000001.csv").exists());
    }

    #[test]
    fn no_records_means_no_artifacts() {
        let tmp = TempDir::new().unwrap();
        let mut run_log = logger(&tmp);
        let out = tmp.path().join("shards");
        let mut writer = ShardWriter::new(&out, "posts", 2);

        writer.finish(&mut run_log).unwrap();
        assert_eq!(writer.finalized_count(), 0);
        assert!(!out.exists());
    }

    #[test]
    fn field_escaping_round_trips() {
        let tricky = Post {
            handle: "comma,handle".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            text: "she said \"hi, there\"".to_string(),
            reply_count: 1,
            repost_count: 2,
            like_count: 3,
            quote_count: 4,
        };

        let fields = parse_line(&encode_record(&tricky));
        assert_eq!(fields[0], "comma,handle");
        assert_eq!(fields[2], "she said \"hi, there\"");
        assert_eq!(fields[6], "4");
        assert_eq!(fields.len(), 7);
    }

    #[test]
    fn newlines_collapse_to_single_spaces() {
        let post = Post {
            handle: "a.bsky.social".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            text: "line one\nline two\r\nline three".to_string(),
            reply_count: 0,
            repost_count: 0,
            like_count: 0,
            quote_count: 0,
        };

        let line = encode_record(&post);
        assert!(!line.contains('\n'));
        let fields = parse_line(&line);
        assert_eq!(fields[2], "line one line two line three");
    }

    #[test]
    fn timestamp_sanitization_strips_separators_only() {
        assert_eq!(
            sanitize_timestamp("2024-01-01T10:30:00.123Z"),
            "20240101103000.123"
        );
        assert_eq!(
            sanitize_timestamp("2024-01-01T10:30:00-03:00"),
            "202401011030000300"
        );
    }
}
