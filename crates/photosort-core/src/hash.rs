use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use sha1::{Digest, Sha1};
use xxhash_rust::xxh32::{xxh32, Xxh32};

use crate::error::HashError;
use crate::notice::{Notice, NoticeSink};

/// Length of the content hash embedded in target file names.
pub const HASH_LEN: usize = 8;

const READ_BUFFER: usize = 64 * 1024;

/// XXH32 (seed 0) of `bytes` as 8 lowercase hex digits.
pub fn xxh32_hex(bytes: &[u8]) -> String {
    format!("{:08x}", xxh32(bytes, 0))
}

/// First 8 hex digits of the SHA-1 of `bytes`.
pub fn sha1_prefix(bytes: &[u8]) -> String {
    let mut digest = hex::encode(Sha1::digest(bytes));
    digest.truncate(HASH_LEN);
    digest
}

/// Streaming XXH32 over everything `reader` yields.
pub fn xxh32_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Xxh32::new(0);
    let mut buf = vec![0u8; READ_BUFFER];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:08x}", hasher.digest()))
}

pub fn sha1_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(sha1_prefix(&bytes))
}

/// Hash a file for naming: XXH32 first, SHA-1 prefix if that fails.
pub fn hash_file(path: &Path, notices: &NoticeSink<'_>) -> Result<String, HashError> {
    hash_with_fallback(
        path,
        || File::open(path).and_then(|f| xxh32_reader(BufReader::new(f))),
        || File::open(path).and_then(|f| sha1_reader(BufReader::new(f))),
        notices,
    )
}

fn hash_with_fallback<P, F>(
    path: &Path,
    primary: P,
    fallback: F,
    notices: &NoticeSink<'_>,
) -> Result<String, HashError>
where
    P: FnOnce() -> io::Result<String>,
    F: FnOnce() -> io::Result<String>,
{
    let primary_error = match primary() {
        Ok(hash) => return Ok(hash),
        Err(e) => e,
    };

    notices(&Notice::HashFallback {
        path: path.to_path_buf(),
        error: primary_error.to_string(),
    });

    fallback().map_err(|source| HashError {
        path: path.to_path_buf(),
        source,
        primary: primary_error,
    })
}
