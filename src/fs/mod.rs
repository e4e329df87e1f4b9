use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, Write},
    path::{Path, PathBuf},
};

mod mock;

pub use mock::{Event, MockDir, MockFile, MockFs};

pub trait StorageFile: std::fmt::Debug + Read + Seek {
    fn write(&mut self, buf: &[u8]) -> anyhow::Result<()>;
    fn sync(&mut self) -> anyhow::Result<()>;
    fn read_all(&mut self) -> anyhow::Result<Vec<u8>>;
    fn len(&self) -> anyhow::Result<usize>;
}

/// A directory the record tables keep their files in.
pub trait StorageDir: Clone + std::fmt::Debug {
    type File: StorageFile;

    /// Full path of `fname`, for messages.
    fn path_of<P>(&self, fname: &P) -> PathBuf
    where
        P: AsRef<Path> + ?Sized;

    /// Creates `fname`, truncating it if it already exists.
    fn create<P>(&mut self, fname: &P) -> anyhow::Result<Self::File>
    where
        P: AsRef<Path> + ?Sized;

    /// Opens an existing file, or returns `None` if there is none.
    fn open<P>(&mut self, fname: &P) -> anyhow::Result<Option<Self::File>>
    where
        P: AsRef<Path> + ?Sized;

    fn unlink<P>(&mut self, fname: &P) -> anyhow::Result<bool>
    where
        P: AsRef<Path> + ?Sized;

    fn rename<P, Q>(&mut self, from: &P, to: &Q) -> anyhow::Result<()>
    where
        P: AsRef<Path> + ?Sized,
        Q: AsRef<Path> + ?Sized;
}

#[derive(Debug)]
pub struct OsFile {
    file: File,
}

impl Read for OsFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for OsFile {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl StorageFile for OsFile {
    fn write(&mut self, buf: &[u8]) -> anyhow::Result<()> {
        self.file.write_all(buf)?;
        Ok(())
    }

    fn sync(&mut self) -> anyhow::Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    fn read_all(&mut self) -> anyhow::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.file.seek(io::SeekFrom::Start(0))?;
        self.file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn len(&self) -> anyhow::Result<usize> {
        Ok(self.file.metadata()?.len().try_into()?)
    }
}

/// A real directory on disk.
#[derive(Debug, Clone)]
pub struct OsDir {
    root: PathBuf,
}

impl OsDir {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        OsDir { root: root.into() }
    }
}

impl StorageDir for OsDir {
    type File = OsFile;

    fn path_of<P>(&self, fname: &P) -> PathBuf
    where
        P: AsRef<Path> + ?Sized,
    {
        self.root.join(fname)
    }

    fn create<P>(&mut self, fname: &P) -> anyhow::Result<OsFile>
    where
        P: AsRef<Path> + ?Sized,
    {
        std::fs::create_dir_all(&self.root)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.path_of(fname))?;
        Ok(OsFile { file })
    }

    fn open<P>(&mut self, fname: &P) -> anyhow::Result<Option<OsFile>>
    where
        P: AsRef<Path> + ?Sized,
    {
        match File::open(self.path_of(fname)) {
            Ok(file) => Ok(Some(OsFile { file })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn unlink<P>(&mut self, fname: &P) -> anyhow::Result<bool>
    where
        P: AsRef<Path> + ?Sized,
    {
        match std::fs::remove_file(self.path_of(fname)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn rename<P, Q>(&mut self, from: &P, to: &Q) -> anyhow::Result<()>
    where
        P: AsRef<Path> + ?Sized,
        Q: AsRef<Path> + ?Sized,
    {
        std::fs::rename(self.path_of(from), self.path_of(to))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{OsDir, StorageDir, StorageFile};

    #[test]
    fn test_os_dir() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let mut dir = OsDir::new(tmp.path().join("nested"));

        assert!(dir.open("a")?.is_none());

        let mut a = dir.create("a")?;
        a.write(&[1, 2, 3])?;
        a.sync()?;
        assert_eq!(a.len()?, 3);

        let mut a = dir.open("a")?.unwrap();
        assert_eq!(a.read_all()?, vec![1, 2, 3]);

        // Creating again truncates.
        let b = dir.create("a")?;
        assert_eq!(b.len()?, 0);

        dir.rename("a", "b")?;
        assert!(dir.open("a")?.is_none());
        assert!(dir.unlink("b")?);
        assert!(!dir.unlink("b")?);

        Ok(())
    }
}
