use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use crate::error::{AuditError, AuditResult};

/// The capacity of the buffer used to read word sources.
const BUFFER_CAPACITY: usize = 1024 * 1024;

/// An iterator over the words of a word source.
/// Words are trimmed, blank lines and lines that are not valid UTF-8 are skipped.
pub struct WordList<R> {
    reader: R,
    buf: Vec<u8>,
    skipped: u64,
}

impl WordList<BufReader<File>> {
    /// Opens the word source at the given path.
    pub fn open(path: &Path) -> AuditResult<Self> {
        Ok(Self::new(open_source(path)?))
    }
}

impl<R: BufRead> WordList<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            skipped: 0,
        }
    }

    /// Returns the number of lines skipped because they were not valid UTF-8.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<R: BufRead> Iterator for WordList<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();

            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => (),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Some(Err(err)),
            }

            let Ok(line) = std::str::from_utf8(&self.buf) else {
                self.skipped += 1;
                continue;
            };

            let word = line.trim();
            if !word.is_empty() {
                return Some(Ok(word.to_owned()));
            }
        }
    }
}

/// Opens the file at the given path for buffered reading.
pub(crate) fn open_source(path: &Path) -> AuditResult<BufReader<File>> {
    let file = File::open(path).map_err(|source| AuditError::WordSource {
        path: path.to_owned(),
        source,
    })?;

    Ok(BufReader::with_capacity(BUFFER_CAPACITY, file))
}

/// Counts the words of the word source at the given path.
pub fn count_words(path: &Path) -> AuditResult<u64> {
    let mut count = 0;

    for word in WordList::open(path)? {
        word.map_err(|source| AuditError::WordSource {
            path: path.to_owned(),
            source,
        })?;
        count += 1;
    }

    Ok(count)
}

/// A word source that yields `content`, then fails like a device that was unplugged.
#[cfg(test)]
pub(crate) fn unplugged_source(content: &'static str) -> impl BufRead + Send + 'static {
    struct Unplugged;

    impl io::Read for Unplugged {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("the device was unplugged"))
        }
    }

    BufReader::new(io::Read::chain(content.as_bytes(), Unplugged))
}
