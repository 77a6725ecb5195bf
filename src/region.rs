//! Splits a dump file into N byte ranges aligned to `<title>` boundaries, so
//! indexer workers can each own a disjoint, whole-articles-only slice of the
//! file with no cross-thread coordination.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;

use crate::error::BuildError;
use crate::stream::{ByteStream, Region};

const MAX_REGIONS: usize = 64;
const REGION_TOKEN: &[u8] = b"<title>";

/// Divide `path` into `count` regions, each a whole number of articles.
///
/// `b_0 = 0`, `e_{N-1} = file size`, and each interior boundary is the
/// offset of the first `<title>` at or after `size * i / count`. Fails if
/// the file doesn't contain at least `count` occurrences of `<title>`.
pub fn regionize<P: AsRef<Path>>(path: P, count: usize) -> Result<Vec<Region>, BuildError> {
    let path = path.as_ref();
    if count == 0 || count > MAX_REGIONS {
        return Err(BuildError::InvalidRegionCount { count });
    }

    let size = File::open(path)?.seek(SeekFrom::End(0))?;
    let mut regions = Vec::with_capacity(count);
    let mut last_end: u64 = 0;
    let mut s = ByteStream::open(path, Region::new(0, 0))?;

    for i in 0..count - 1 {
        let target = (size / count as u64) * (i as u64 + 1);
        if !s.seek(target)? {
            return Err(BuildError::NotEnoughRegions {
                path: path.to_path_buf(),
            });
        }
        if !s.read_until(REGION_TOKEN, false, |_| {})? {
            return Err(BuildError::NotEnoughRegions {
                path: path.to_path_buf(),
            });
        }
        let end = s.tell()?;
        regions.push(Region::new(last_end, end));
        last_end = end;
    }
    regions.push(Region::new(last_end, size));
    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/short.xml")
    }

    #[test]
    fn tiles_the_whole_file() {
        let size = std::fs::metadata(fixture()).unwrap().len();
        let regions = regionize(fixture(), 2).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].begin, 0);
        assert_eq!(regions.last().unwrap().end, size);
        for w in regions.windows(2) {
            assert_eq!(w[0].end, w[1].begin);
        }
    }

    #[test]
    fn splits_five_articles_three_and_two() {
        let regions = regionize(fixture(), 2).unwrap();
        assert_eq!(regions[0], Region::new(0, 5918));
        assert_eq!(regions[1], Region::new(5918, 6835));
    }

    #[test]
    fn rejects_more_regions_than_titles() {
        let err = regionize(fixture(), 64).unwrap_err();
        assert!(matches!(err, BuildError::NotEnoughRegions { .. }));
    }

    #[test]
    fn rejects_zero_regions() {
        let err = regionize(fixture(), 0).unwrap_err();
        assert!(matches!(err, BuildError::InvalidRegionCount { count: 0 }));
    }
}
