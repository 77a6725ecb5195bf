//! In-memory term/article interning and the on-disk index file format.
//!
//! An `IndexWriter` owns one body file and interns terms and articles as it
//! goes. A term's article-id buffer is partially flushed to the body once it
//! reaches [`PARTIAL_FLUSH_LIMIT`]; `flush` drains whatever remains, writes
//! the header, and concatenates body onto header to produce one
//! self-describing file — see the module-level format notes in
//! `crate::read` for the mirrored parse side.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::BuildError;
use crate::tokenizer::END_DELIM;

/// Number of article ids buffered per term before a partial flush.
const PARTIAL_FLUSH_LIMIT: usize = 256;

/// Builds one or more on-disk index files from a stream of `index(term,
/// article)` calls.
///
/// Bound to a `basename`; the first whole flush produces `basename` itself,
/// and later ones (triggered by the owning worker crossing
/// `ARTICLE_FLUSH_LIMIT` articles) produce `basename.2`, `basename.3`, and so
/// on.
pub struct IndexWriter {
    basename: PathBuf,
    flush_seq: u32,
    next_term_id: u32,
    next_article_id: u32,
    terms: HashMap<String, u32>,
    articles: HashMap<String, u32>,
    aids: HashMap<u32, Vec<u32>>,
    term_offsets: HashMap<u32, Vec<u64>>,
    body_path: PathBuf,
    body: Option<BufWriter<File>>,
    body_offset: u64,
}

impl IndexWriter {
    /// Start a fresh writer bound to `basename`. Opens a scratch body file;
    /// nothing is visible at `basename` itself until the first `flush`.
    pub fn create<P: AsRef<Path>>(basename: P) -> io::Result<IndexWriter> {
        let basename = basename.as_ref().to_path_buf();
        let body_path = scratch_path(&basename, "body", 1);
        let body = BufWriter::new(File::create(&body_path)?);
        Ok(IndexWriter {
            basename,
            flush_seq: 1,
            next_term_id: 1,
            next_article_id: 1,
            terms: HashMap::new(),
            articles: HashMap::new(),
            aids: HashMap::new(),
            term_offsets: HashMap::new(),
            body_path,
            body: Some(body),
            body_offset: 0,
        })
    }

    /// Number of distinct articles interned since the last flush.
    pub fn article_count(&self) -> u32 {
        self.articles.len() as u32
    }

    /// Record one occurrence of `term` in `article`.
    pub fn index(&mut self, term: &str, article: &str) -> Result<(), BuildError> {
        let tid = intern(&mut self.terms, &mut self.next_term_id, term)?;
        let aid = intern(&mut self.articles, &mut self.next_article_id, article)?;
        let buf = self.aids.entry(tid).or_default();
        buf.push(aid);
        if buf.len() >= PARTIAL_FLUSH_LIMIT {
            self.partial_flush(tid)?;
        }
        Ok(())
    }

    /// Write `tid`'s buffered article ids to the body as one record, and
    /// remember the offset so the header can find it again.
    fn partial_flush(&mut self, tid: u32) -> Result<(), BuildError> {
        let aids = match self.aids.get_mut(&tid) {
            Some(v) if !v.is_empty() => v,
            _ => return Ok(()),
        };
        let offset = self.body_offset;
        let body = self.body.as_mut().expect("writer used after final flush");
        body.write_u32::<LittleEndian>(tid)?;
        for &aid in aids.iter() {
            body.write_u32::<LittleEndian>(aid)?;
        }
        body.write_u32::<LittleEndian>(u32::MAX)?;
        body.write_all(b"\n")?;
        self.body_offset += 4 + 4 * aids.len() as u64 + 4 + 1;
        self.term_offsets.entry(tid).or_default().push(offset);
        aids.clear();
        Ok(())
    }

    /// Flush every pending term, write the header, and merge header+body
    /// into the final file. Unless `last`, reopens fresh state for the next
    /// generation of this writer's basename.
    pub fn flush(&mut self, last: bool) -> Result<(), BuildError> {
        let pending: Vec<u32> = self
            .aids
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(&tid, _)| tid)
            .collect();
        for tid in pending {
            self.partial_flush(tid)?;
        }
        if let Some(mut body) = self.body.take() {
            body.flush()?;
            // Dropping here closes the handle before we reopen the same
            // path for reading below.
            drop(body);
        }

        let output_path = self.output_path();
        let header_path = scratch_path(&self.basename, "header", self.flush_seq);
        {
            let mut header = BufWriter::new(File::create(&header_path)?);
            self.write_header(&mut header)?;
            header.flush()?;
        }

        {
            let mut header_file = OpenOptions::new().append(true).open(&header_path)?;
            let mut body_file = File::open(&self.body_path)?;
            io::copy(&mut body_file, &mut header_file)?;
        }
        fs::remove_file(&self.body_path)?;
        fs::rename(&header_path, &output_path)?;

        self.terms.clear();
        self.articles.clear();
        self.aids.clear();
        self.term_offsets.clear();
        self.next_term_id = 1;
        self.next_article_id = 1;
        self.body_offset = 0;
        self.flush_seq += 1;

        if !last {
            let body_path = scratch_path(&self.basename, "body", self.flush_seq);
            self.body = Some(BufWriter::new(File::create(&body_path)?));
            self.body_path = body_path;
        }
        Ok(())
    }

    /// Path the *next* call to `flush` will finalize into: `basename` for
    /// the first generation, `basename.<n>` for later ones.
    fn output_path(&self) -> PathBuf {
        if self.flush_seq == 1 {
            self.basename.clone()
        } else {
            let mut s = self.basename.clone().into_os_string();
            s.push(format!(".{}", self.flush_seq));
            PathBuf::from(s)
        }
    }

    /// Write the header section: back-patched body offset, article table,
    /// term table. See `crate::read` for the mirrored layout.
    fn write_header<W: Write>(&self, w: &mut W) -> Result<(), BuildError> {
        let mut rest = Vec::new();

        let mut articles_by_id: Vec<(u32, &str)> = self
            .articles
            .iter()
            .map(|(title, &id)| (id, title.as_str()))
            .collect();
        articles_by_id.sort_unstable_by_key(|&(id, _)| id);
        rest.write_u32::<LittleEndian>(articles_by_id.len() as u32)?;
        rest.write_all(b"\n")?;
        for (id, title) in &articles_by_id {
            rest.write_u32::<LittleEndian>(*id)?;
            rest.write_all(title.as_bytes())?;
            rest.write_all(b"\n")?;
        }

        let mut terms_by_id: Vec<(u32, &str)> = self
            .terms
            .iter()
            .map(|(term, &id)| (id, term.as_str()))
            .collect();
        terms_by_id.sort_unstable_by_key(|&(id, _)| id);
        rest.write_u32::<LittleEndian>(terms_by_id.len() as u32)?;
        rest.write_all(b"\n")?;
        for (id, term) in &terms_by_id {
            rest.write_u32::<LittleEndian>(*id)?;
            rest.write_all(term.as_bytes())?;
            rest.write_u8(END_DELIM)?;
            if let Some(offsets) = self.term_offsets.get(id) {
                for &offset in offsets {
                    let offset = u32::try_from(offset).map_err(|_| BuildError::BodyTooLarge { offset })?;
                    rest.write_u32::<LittleEndian>(offset)?;
                }
            }
            rest.write_u32::<LittleEndian>(u32::MAX)?;
            rest.write_all(b"\n")?;
        }

        // `u32 body_offset` + '\n' precede `rest`.
        let body_offset = 5 + rest.len() as u64;
        let body_offset = u32::try_from(body_offset).map_err(|_| BuildError::BodyTooLarge { offset: body_offset })?;
        w.write_u32::<LittleEndian>(body_offset)?;
        w.write_all(b"\n")?;
        w.write_all(&rest)?;
        Ok(())
    }

    /// Test-only convenience: true if `term` is currently buffered or
    /// already partial-flushed against `article` in this generation.
    #[cfg(test)]
    pub fn contains_term_article(&self, term: &str, article: &str) -> bool {
        let (Some(&tid), Some(&aid)) = (self.terms.get(term), self.articles.get(article)) else {
            return false;
        };
        self.aids.get(&tid).is_some_and(|v| v.contains(&aid))
    }
}

/// Assign `key` an id in `map` if it doesn't have one yet, bumping `counter`.
/// Ids start at 1; `u32::MAX` is reserved as the body's end-of-list sentinel
/// and is never assigned.
fn intern(map: &mut HashMap<String, u32>, counter: &mut u32, key: &str) -> Result<u32, BuildError> {
    if let Some(&id) = map.get(key) {
        return Ok(id);
    }
    if *counter >= u32::MAX {
        return Err(BuildError::IdSpaceExhausted);
    }
    let id = *counter;
    *counter += 1;
    map.insert(key.to_string(), id);
    Ok(id)
}

fn scratch_path(basename: &Path, kind: &str, seq: u32) -> PathBuf {
    let mut s = basename.as_os_str().to_owned();
    s.push(format!(".{kind}.{seq}.tmp"));
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::IndexReader;

    #[test]
    fn header_body_offset_equals_header_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idx");
        let mut w = IndexWriter::create(&path).unwrap();
        w.index("poetry", "Art").unwrap();
        w.index("poetry", "Art").unwrap();
        w.flush(true).unwrap();

        let bytes = fs::read(&path).unwrap();
        let declared = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        // body_offset must exactly delimit header from body: re-parsing
        // via IndexReader and searching must find both hits.
        let reader = IndexReader::open(&path).unwrap();
        let result = reader.search("poetry");
        assert_eq!(result.total, 1);
        assert_eq!(result.top, vec![("Art".to_string(), 2)]);
        assert!(declared <= bytes.len());
    }

    #[test]
    fn partial_flush_triggers_at_limit_and_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idx");
        let mut w = IndexWriter::create(&path).unwrap();
        for i in 0..(PARTIAL_FLUSH_LIMIT * 2 + 7) {
            w.index("common", &format!("article{i}")).unwrap();
        }
        w.flush(true).unwrap();

        let reader = IndexReader::open(&path).unwrap();
        let result = reader.search("common");
        assert_eq!(result.total, PARTIAL_FLUSH_LIMIT * 2 + 7);
    }

    #[test]
    fn multiple_whole_flushes_number_files_from_the_basename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idx");
        let mut w = IndexWriter::create(&path).unwrap();
        w.index("alpha", "One").unwrap();
        w.flush(false).unwrap();
        w.index("beta", "Two").unwrap();
        w.flush(true).unwrap();

        assert!(path.exists());
        assert!(dir.path().join("idx.2").exists());
    }

    #[test]
    fn id_space_exhaustion_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = IndexWriter::create(dir.path().join("idx")).unwrap();
        w.next_term_id = u32::MAX;
        let err = w.index("overflow", "Article").unwrap_err();
        assert!(matches!(err, BuildError::IdSpaceExhausted));
    }
}
