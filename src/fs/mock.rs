use std::{
    cell::RefCell,
    collections::HashMap,
    io::{self, Read, Seek},
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::bail;

use super::{StorageDir, StorageFile};

#[derive(Default, Debug)]
struct MockData {
    synced: Vec<u8>,
    unsynced: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct MockFile {
    idx: usize,
    pub file_id: FileId,
    fs: Rc<RefCell<MockFs>>,
}

impl MockFile {
    pub fn read_all_synced(&self) -> Vec<u8> {
        (*self.fs).borrow().data[self.file_id].synced.clone()
    }

    fn contents_len(&self) -> usize {
        (*self.fs).borrow().data[self.file_id].unsynced.len()
    }
}

impl Seek for MockFile {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let target = match pos {
            io::SeekFrom::Start(i) => i as i64,
            io::SeekFrom::End(i) => self.contents_len() as i64 + i,
            io::SeekFrom::Current(i) => self.idx as i64 + i,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of file",
            ));
        }
        self.idx = target as usize;
        Ok(target as u64)
    }
}

impl Read for MockFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let fs = (*self.fs).borrow();
        let data = &fs.data[self.file_id].unsynced;
        if self.idx >= data.len() {
            return Ok(0);
        }
        let n = std::cmp::min(data.len() - self.idx, buf.len());
        buf[..n].copy_from_slice(&data[self.idx..self.idx + n]);
        self.idx += n;
        Ok(n)
    }
}

impl StorageFile for MockFile {
    fn write(&mut self, buf: &[u8]) -> anyhow::Result<()> {
        (*self.fs)
            .borrow_mut()
            .write(self.file_id, self.idx, buf.to_vec())?;
        self.idx += buf.len();
        Ok(())
    }

    fn sync(&mut self) -> anyhow::Result<()> {
        (*self.fs).borrow_mut().sync(self.file_id)
    }

    fn read_all(&mut self) -> anyhow::Result<Vec<u8>> {
        Ok((*self.fs).borrow().data[self.file_id].unsynced.clone())
    }

    fn len(&self) -> anyhow::Result<usize> {
        Ok(self.contents_len())
    }
}

/// An in-memory directory that records every operation performed on it and
/// can be made to fail partway through a sequence of operations.
#[derive(Clone, Debug)]
pub struct MockDir {
    pub fs: Rc<RefCell<MockFs>>,
}

impl MockDir {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        MockDir {
            fs: Rc::new(RefCell::new(MockFs::new())),
        }
    }

    fn name<P>(fname: &P) -> String
    where
        P: AsRef<Path> + ?Sized,
    {
        fname.as_ref().to_string_lossy().into_owned()
    }

    fn file(&self, file_id: FileId) -> MockFile {
        MockFile {
            idx: 0,
            file_id,
            fs: self.fs.clone(),
        }
    }

    /// Current (possibly unsynced) contents of `fname`.
    pub fn contents<P>(&self, fname: &P) -> Option<Vec<u8>>
    where
        P: AsRef<Path> + ?Sized,
    {
        let fs = (*self.fs).borrow();
        let id = *fs.names.get(&Self::name(fname))?;
        Some(fs.data[id].unsynced.clone())
    }

    pub fn put<P>(&self, fname: &P, data: &[u8])
    where
        P: AsRef<Path> + ?Sized,
    {
        let mut fs = (*self.fs).borrow_mut();
        let id = fs.data.len();
        fs.data.push(MockData {
            synced: data.to_vec(),
            unsynced: data.to_vec(),
        });
        fs.names.insert(Self::name(fname), id);
    }
}

impl StorageDir for MockDir {
    type File = MockFile;

    fn path_of<P>(&self, fname: &P) -> PathBuf
    where
        P: AsRef<Path> + ?Sized,
    {
        fname.as_ref().to_path_buf()
    }

    fn create<P>(&mut self, fname: &P) -> anyhow::Result<MockFile>
    where
        P: AsRef<Path> + ?Sized,
    {
        let id = (*self.fs).borrow_mut().create(Self::name(fname))?;
        Ok(self.file(id))
    }

    fn open<P>(&mut self, fname: &P) -> anyhow::Result<Option<MockFile>>
    where
        P: AsRef<Path> + ?Sized,
    {
        let id = (*self.fs).borrow_mut().open(Self::name(fname));
        Ok(id.map(|id| self.file(id)))
    }

    fn unlink<P>(&mut self, fname: &P) -> anyhow::Result<bool>
    where
        P: AsRef<Path> + ?Sized,
    {
        (*self.fs).borrow_mut().unlink(Self::name(fname))
    }

    fn rename<P, Q>(&mut self, from: &P, to: &Q) -> anyhow::Result<()>
    where
        P: AsRef<Path> + ?Sized,
        Q: AsRef<Path> + ?Sized,
    {
        (*self.fs)
            .borrow_mut()
            .rename(Self::name(from), Self::name(to))
    }
}

pub type FileId = usize;

#[derive(Debug, Clone)]
pub enum Event {
    Create(String, FileId),
    Open(String),
    Write(FileId, usize, Vec<u8>),
    Sync(FileId),
    Rename(String, String),
    Unlink(String),
}

impl Event {
    pub fn write_abbrev<W: std::fmt::Write>(&self, w: &mut W) -> std::fmt::Result {
        match self {
            Event::Create(name, file_id) => write!(w, "Create({}, {})", name, file_id),
            Event::Open(name) => write!(w, "Open({})", name),
            Event::Write(file_id, idx, contents) => {
                let escaped: String = contents
                    .iter()
                    .flat_map(|ch| std::ascii::escape_default(*ch))
                    .map(char::from)
                    .collect();
                write!(w, "Write({}, {}, {})", file_id, idx, escaped)
            }
            Event::Sync(file_id) => write!(w, "Sync({})", file_id),
            Event::Rename(from, to) => write!(w, "Rename({}, {})", from, to),
            Event::Unlink(name) => write!(w, "Unlink({})", name),
        }
    }
}

#[derive(Debug)]
pub struct MockFs {
    names: HashMap<String, FileId>,
    data: Vec<MockData>,
    events: Vec<Event>,

    // After this many mutating operations, "crash": refuse every further
    // mutation until `reboot`.
    time_to_crash: Option<usize>,
}

impl MockFs {
    fn new() -> Self {
        MockFs {
            names: HashMap::new(),
            data: Vec::new(),
            events: Vec::new(),
            time_to_crash: None,
        }
    }

    pub fn schedule_crash(&mut self, ops: usize) {
        self.time_to_crash = Some(ops);
    }

    /// Comes back from a crash. With `lose_unsynced`, behaves like a power
    /// loss and drops everything written since the last sync; without it,
    /// like a process crash where the OS kept the written data.
    pub fn reboot(&mut self, lose_unsynced: bool) {
        if lose_unsynced {
            for f in self.data.iter_mut() {
                f.unsynced.clone_from(&f.synced);
            }
        }
        self.time_to_crash = None;
    }

    fn perform_op(&mut self) -> anyhow::Result<()> {
        match self.time_to_crash {
            Some(0) => bail!("filesystem is down"),
            Some(x) => self.time_to_crash = Some(x - 1),
            None => {}
        }
        Ok(())
    }

    fn record(&mut self, e: Event) {
        self.events.push(e);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    fn create(&mut self, path: String) -> anyhow::Result<FileId> {
        self.perform_op()?;
        let id = match self.names.get(&path) {
            Some(id) => {
                self.data[*id].unsynced.clear();
                *id
            }
            None => {
                let id = self.data.len();
                self.data.push(MockData::default());
                self.names.insert(path.clone(), id);
                id
            }
        };
        self.record(Event::Create(path, id));
        Ok(id)
    }

    fn open(&mut self, path: String) -> Option<FileId> {
        let id = self.names.get(&path).cloned();
        self.record(Event::Open(path));
        id
    }

    fn unlink(&mut self, path: String) -> anyhow::Result<bool> {
        self.perform_op()?;
        let existed = self.names.remove(&path).is_some();
        self.record(Event::Unlink(path));
        Ok(existed)
    }

    fn rename(&mut self, from: String, to: String) -> anyhow::Result<()> {
        self.perform_op()?;
        match self.names.remove(&from) {
            Some(d) => {
                self.names.insert(to.clone(), d);
            }
            None => bail!("no such file: {}", from),
        }
        self.record(Event::Rename(from, to));
        Ok(())
    }

    fn write(&mut self, file: FileId, idx: usize, data: Vec<u8>) -> anyhow::Result<()> {
        self.perform_op()?;
        let contents = &mut self.data[file].unsynced;
        if contents.len() < idx + data.len() {
            contents.resize(idx + data.len(), 0);
        }
        contents[idx..idx + data.len()].copy_from_slice(&data);
        self.record(Event::Write(file, idx, data));
        Ok(())
    }

    fn sync(&mut self, file: FileId) -> anyhow::Result<()> {
        self.perform_op()?;
        let d = &mut self.data[file];
        d.synced.clone_from(&d.unsynced);
        self.record(Event::Sync(file));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::fs::{StorageDir, StorageFile};

    use super::MockDir;

    #[test]
    fn test_mock_file() -> anyhow::Result<()> {
        let mut dir = MockDir::new();

        let mut a = dir.create("a")?;
        a.write(&[1, 2, 3, 4])?;

        assert_eq!(Vec::<u8>::new(), a.read_all_synced());
        assert_eq!(vec![1, 2, 3, 4], a.read_all()?);

        a.sync()?;
        assert_eq!(vec![1, 2, 3, 4], a.read_all_synced());

        // Truncation is only durable once synced.
        let mut a = dir.create("a")?;
        assert_eq!(a.len()?, 0);
        (*dir.fs).borrow_mut().reboot(true);
        assert_eq!(a.read_all()?, vec![1, 2, 3, 4]);

        Ok(())
    }

    #[test]
    fn test_crash() -> anyhow::Result<()> {
        let mut dir = MockDir::new();
        (*dir.fs).borrow_mut().schedule_crash(2);
        let mut a = dir.create("a")?;
        a.write(&[1])?;
        assert!(a.write(&[2]).is_err());
        assert!(dir.rename("a", "b").is_err());

        (*dir.fs).borrow_mut().reboot(false);
        assert_eq!(dir.contents("a"), Some(vec![1]));
        assert!(dir.open("b")?.is_none());
        Ok(())
    }
}
