//! Thin wrapper around `memmap2` for owning a file + its mapping together.
//!
//! A `Mmap`/`MmapMut` borrows from the `File` it was built from, so the file
//! handle has to outlive the mapping. These types keep both alive as a unit
//! and expose only the raw pointer + length a ring-buffer layout needs.

use memmap2::{Mmap, MmapMut};
use std::{
    fs::{File, OpenOptions},
    io,
    path::Path,
};

pub struct MmapFileMut {
    /// File handle kept alive to maintain the memory map validity
    _file: File,
    /// Memory-mapped region providing mutable access to file contents
    mmap: MmapMut,
}

pub struct MmapFile {
    /// File handle kept alive to maintain the memory map validity
    _file: File,
    /// Memory-mapped region providing read-only access to file contents
    mmap: Mmap,
}

impl MmapFileMut {
    /// Creates a new file sized to exactly `size_bytes` and maps it read-write.
    ///
    /// If `exclusive` is true, fails with `io::ErrorKind::AlreadyExists` when
    /// the path already exists; callers that want "delete stale file first"
    /// semantics should remove the path themselves and pass `exclusive = true`
    /// to still catch a concurrent creator.
    pub fn create_rw<P: AsRef<Path>>(path: P, size_bytes: u64, exclusive: bool) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .create_new(exclusive)
            .read(true)
            .write(true)
            .truncate(!exclusive)
            .open(path)?;
        file.set_len(size_bytes)?;

        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { _file: file, mmap })
    }

    /// Opens an existing file and maps it read-write.
    pub fn open_rw<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self { _file: file, mmap })
    }

    /// Raw pointer to the start of the mapped region.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.mmap.as_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Flushes dirty pages back to the file. Must be called (and the mapping
    /// dropped) before the file is deleted, so the OS has no dangling mapping
    /// over the unlinked inode when the last reference goes away mid-flush.
    pub fn sync_and_unmap(self) -> io::Result<()> {
        self.mmap.flush()
    }
}

impl MmapFile {
    /// Opens an existing file and maps it read-only.
    pub fn open_ro<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { _file: file, mmap })
    }

    /// Opens an existing file and maps it read-write (reader side of a ring
    /// still needs to write its own `read_index`, so it maps read-write too).
    pub fn open_rw<P: AsRef<Path>>(path: P) -> io::Result<MmapFileMut> {
        MmapFileMut::open_rw(path)
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.mmap.as_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// No writes to flush on a read-only mapping; present for symmetry with
    /// `MmapFileMut::sync_and_unmap` so callers don't need to special-case
    /// the reader side when tearing a ring down.
    pub fn sync_and_unmap(self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn mmap_roundtrip_bytes() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        fs::remove_file(&path).ok();
        let size = 4096;

        {
            let mut mm = MmapFileMut::create_rw(&path, size, false).unwrap();
            unsafe {
                let p = mm.as_mut_ptr();
                *p.add(0) = 0xAB;
                *p.add(1) = 0xCD;
            }
            mm.sync_and_unmap().unwrap();
        }
        {
            let mm = MmapFile::open_ro(&path).unwrap();
            unsafe {
                let p = mm.as_ptr();
                assert_eq!(*p.add(0), 0xAB);
                assert_eq!(*p.add(1), 0xCD);
            }
        }

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn create_rw_exclusive_rejects_existing_path() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        let err = MmapFileMut::create_rw(&path, 4096, true).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }
}
