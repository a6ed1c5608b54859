// Memoized access to the loaded table.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use crate::dashboard::*;

/// Tells whether the source changed since it was loaded. Two equal stamps
/// mean the cached table can be reused.
pub type Invalidation = Box<dyn Fn(&Path) -> Option<SystemTime>>;

pub fn modification_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Where the table comes from.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SourceSpec {
    pub path: PathBuf,
    pub provider: Provider,
    pub excel_worksheet_name: Option<String>,
}

pub struct TableCache {
    source: SourceSpec,
    invalidation: Invalidation,
    cached: Option<(Option<SystemTime>, Rc<Table>)>,
    loads: usize,
}

impl TableCache {
    /// A cache that reloads when the modification time of the file changes.
    pub fn new(source: SourceSpec) -> TableCache {
        TableCache::with_invalidation(source, Box::new(modification_time))
    }

    pub fn with_invalidation(source: SourceSpec, invalidation: Invalidation) -> TableCache {
        TableCache {
            source,
            invalidation,
            cached: None,
            loads: 0,
        }
    }

    /// Returns the table, loading it only if it is not cached yet or if the
    /// source changed.
    pub fn get(&mut self) -> BDashResult<Rc<Table>> {
        let stamp = (self.invalidation)(&self.source.path);
        if let Some((cached_stamp, table)) = &self.cached {
            if *cached_stamp == stamp {
                debug!("TableCache::get: reusing {:?}", self.source.path);
                return Ok(table.clone());
            }
            info!("Source {:?} changed, reloading", self.source.path);
        }
        let table = Rc::new(load_table(&self.source)?);
        self.cached = Some((stamp, table.clone()));
        self.loads += 1;
        Ok(table)
    }

    /// Drops the cached table.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// How many times the source was actually read.
    pub fn loads(&self) -> usize {
        self.loads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Write;
    use std::time::Duration;

    fn csv_file(num_rows: usize) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{}", SCHEMA.join(",")).unwrap();
        for i in 0..num_rows {
            writeln!(f, "role{},5,5,5,5,5,5,5,4,3,3,3,3,3,A,hello,,,", i).unwrap();
        }
        f.flush().unwrap();
        f
    }

    fn spec(f: &tempfile::NamedTempFile) -> SourceSpec {
        SourceSpec {
            path: f.path().to_path_buf(),
            provider: Provider::Csv,
            excel_worksheet_name: None,
        }
    }

    #[test]
    fn second_get_is_cached() {
        let f = csv_file(2);
        let mut cache = TableCache::with_invalidation(spec(&f), Box::new(|_: &Path| None));
        let t1 = cache.get().unwrap();
        let t2 = cache.get().unwrap();
        assert!(Rc::ptr_eq(&t1, &t2));
        assert_eq!(cache.loads(), 1);
        assert_eq!(t1.len(), 2);
    }

    #[test]
    fn changed_stamp_reloads() {
        let mut f = csv_file(1);
        let counter = Rc::new(Cell::new(0_u64));
        let c2 = counter.clone();
        let hook: Invalidation =
            Box::new(move |_: &Path| Some(SystemTime::UNIX_EPOCH + Duration::from_secs(c2.get())));
        let mut cache = TableCache::with_invalidation(spec(&f), hook);
        assert_eq!(cache.get().unwrap().len(), 1);

        writeln!(f, "late,1,1,1,1,1,1,1,1,1,1,1,1,1,,,,,").unwrap();
        f.flush().unwrap();
        // Same stamp: the stale table is still served.
        assert_eq!(cache.get().unwrap().len(), 1);

        counter.set(1);
        assert_eq!(cache.get().unwrap().len(), 2);
        assert_eq!(cache.loads(), 2);
    }

    #[test]
    fn invalidate_forces_a_reload() {
        let f = csv_file(1);
        let mut cache = TableCache::with_invalidation(spec(&f), Box::new(|_: &Path| None));
        cache.get().unwrap();
        cache.invalidate();
        cache.get().unwrap();
        assert_eq!(cache.loads(), 2);
    }

    #[test]
    fn schema_errors_are_not_cached() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{}", SCHEMA[..18].join(",")).unwrap();
        f.flush().unwrap();
        let mut cache = TableCache::new(spec(&f));
        let err = cache.get().map_err(|e| *e);
        match err {
            Err(DashError::Schema { source, .. }) => assert_eq!(
                source,
                FeedbackError::SchemaMismatch {
                    expected: 19,
                    actual: 18
                }
            ),
            x => panic!("unexpected result {:?}", x),
        }
        assert_eq!(cache.loads(), 0);
    }
}
