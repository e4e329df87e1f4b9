use std::{
    cmp::Ordering,
    ffi::OsString,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context};
use log::{debug, trace, warn};

use crate::{
    encoding::{decode_record, Encode, Record, RecordWriter},
    error::Error,
    fs::{OsDir, StorageDir, StorageFile},
    list::OrderedList,
};

mod options;

#[cfg(test)]
mod trace_test;

pub use options::TableOptions;

/// A list of fixed-width records mirrored from a flat file.
///
/// The whole file is read into memory by `open` and the whole file is
/// rewritten from the current traversal order by `flush`; nothing touches
/// the file in between. The file has no header: record `i` occupies bytes
/// `i * T::WIDTH .. (i + 1) * T::WIDTH`.
///
/// Unless `atomic_flush` is set, a flush that fails partway (or a crash
/// during one) can leave the file truncated, holding only some of the
/// records.
#[derive(Debug)]
pub struct RecordTable<T, D = OsDir>
where
    T: Record,
    D: StorageDir,
{
    dir: D,
    file_name: PathBuf,
    records: OrderedList<T>,
    // Records in the file as of the last load or flush.
    persisted: usize,
    options: TableOptions,
    // Set by anything that may have changed the records since load.
    dirty: bool,
    flushed: bool,
}

impl<T> RecordTable<T, OsDir>
where
    T: Record,
{
    /// Opens the table stored at `path`. A missing file is an empty table.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::open_with_options(path, TableOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: TableOptions) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("{:?} does not name a file", path))?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::open_in(OsDir::new(dir), file_name, options)
    }
}

impl<T, D> RecordTable<T, D>
where
    T: Record,
    D: StorageDir,
{
    pub fn open_in<P>(mut dir: D, name: &P, options: TableOptions) -> anyhow::Result<Self>
    where
        P: AsRef<Path> + ?Sized,
    {
        if T::WIDTH == 0 {
            bail!("record type has zero width");
        }
        let file_name = name.as_ref().to_path_buf();
        let path = dir.path_of(&file_name);

        let mut records = OrderedList::new();
        if let Some(mut file) = dir.open(&file_name)? {
            let data = file.read_all()?;
            if data.len() % T::WIDTH != 0 {
                return Err(Error::MalformedStorage {
                    path,
                    len: data.len(),
                    record_width: T::WIDTH,
                }
                .into());
            }
            for (i, chunk) in data.chunks_exact(T::WIDTH).enumerate() {
                let record = decode_record(chunk)
                    .with_context(|| format!("decoding record {} of {:?}", i, path))?;
                records.append(record);
            }
        }

        debug!("opened {:?} with {} records", path, records.len());
        Ok(RecordTable {
            dir,
            file_name,
            persisted: records.len(),
            records,
            options,
            dirty: false,
            flushed: false,
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path_of(&self.file_name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn persisted_len(&self) -> usize {
        self.persisted
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn records(&self) -> &OrderedList<T> {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut OrderedList<T> {
        self.dirty = true;
        &mut self.records
    }

    /// First record for which `eq(record, key)` holds.
    pub fn lookup<K, F>(&self, key: &K, mut eq: F) -> Option<&T>
    where
        K: ?Sized,
        F: FnMut(&T, &K) -> bool,
    {
        self.records.find_linear(|r| eq(r, key))?.value()
    }

    pub fn lookup_mut<K, F>(&mut self, key: &K, mut eq: F) -> Option<&mut T>
    where
        K: ?Sized,
        F: FnMut(&T, &K) -> bool,
    {
        let record = self.records.find_linear_mut(|r| eq(r, key))?.into_value_mut()?;
        self.dirty = true;
        Some(record)
    }

    /// Applies `f` to the first record matching `key`, failing with
    /// `NotFound` if there is none.
    pub fn update<K, F, U>(&mut self, key: &K, eq: F, f: U) -> anyhow::Result<()>
    where
        K: ?Sized,
        F: FnMut(&T, &K) -> bool,
        U: FnOnce(&mut T),
    {
        let record = self.lookup_mut(key, eq).ok_or(Error::NotFound)?;
        f(record);
        Ok(())
    }

    /// Replaces the first record matching `key` with `record`, or appends
    /// `record` if nothing matches. Returns the replaced record.
    pub fn upsert<K, F>(&mut self, record: T, key: &K, mut eq: F) -> Option<T>
    where
        K: ?Sized,
        F: FnMut(&T, &K) -> bool,
    {
        self.dirty = true;
        match self.records.find_linear_mut(|r| eq(r, key)) {
            Some(mut c) => {
                trace!("upsert: replacing record in {:?}", self.file_name);
                c.replace(record).ok()
            }
            None => {
                trace!("upsert: appending record to {:?}", self.file_name);
                self.records.append(record);
                None
            }
        }
    }

    /// Appends `record` without looking for an existing match.
    pub fn insert(&mut self, record: T) {
        self.dirty = true;
        self.records.append(record);
    }

    /// Removes every record matching `key` and returns how many went.
    pub fn remove<K, F>(&mut self, key: &K, mut eq: F) -> usize
    where
        K: ?Sized,
        F: FnMut(&T, &K) -> bool,
    {
        let removed = self.records.remove_where(|r| eq(r, key));
        self.dirty |= removed > 0;
        trace!("removed {} records from {:?}", removed, self.file_name);
        removed
    }

    pub fn sort_by<F>(&mut self, cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.dirty = true;
        self.records.sort_by(cmp)
    }

    /// Rewrites the backing file from the current traversal order and closes
    /// the table. Dropping a table instead flushes it only if it was changed
    /// since it was opened.
    pub fn flush(mut self) -> anyhow::Result<()> {
        self.flushed = true;
        self.write_out()
    }

    fn tmp_name(&self) -> PathBuf {
        let mut name: OsString = self.file_name.clone().into_os_string();
        name.push(".tmp");
        name.into()
    }

    fn write_out(&mut self) -> anyhow::Result<()> {
        self.write_records().map_err(|source| {
            Error::PersistenceFailure {
                path: self.path(),
                source,
            }
            .into()
        })
    }

    fn write_records(&mut self) -> anyhow::Result<()> {
        let target = if self.options.atomic_flush {
            self.tmp_name()
        } else {
            self.file_name.clone()
        };

        let mut file = self.dir.create(&target)?;
        let mut w = RecordWriter::new();
        for record in self.records.iter() {
            w.clear();
            record.write_bytes(&mut w);
            file.write(w.as_bytes())?;
        }
        // A tmp file is always synced before it replaces the backing file.
        if self.options.sync_on_flush || self.options.atomic_flush {
            file.sync()?;
        }
        if self.options.atomic_flush {
            self.dir.rename(&target, &self.file_name)?;
        }

        self.persisted = self.records.len();
        debug!(
            "flushed {} records ({} bytes) to {:?}{}",
            self.persisted,
            self.persisted * T::WIDTH,
            self.path(),
            if self.options.atomic_flush { " via rename" } else { "" }
        );
        Ok(())
    }
}

impl<T, D> Drop for RecordTable<T, D>
where
    T: Record,
    D: StorageDir,
{
    fn drop(&mut self) {
        if self.flushed || !self.dirty || !self.options.flush_on_drop {
            return;
        }
        self.flushed = true;
        if let Err(e) = self.write_out() {
            warn!("flush on drop failed: {:#}", e);
        }
    }
}
