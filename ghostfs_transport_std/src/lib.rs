// Copyright 2024 Kevin Ludwig
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    fs::{File, OpenOptions},
    os::unix::fs::FileExt,
    path::Path,
    sync::Mutex,
};

use ghostfs_transport::{Error, Result, Transport};

/// A `Transport` backed by positioned reads/writes on a regular file.
///
/// The file is opened once at construction and kept at a fixed size; this
/// mirrors how a steganographic carrier presents a capacity that doesn't
/// change for the lifetime of a mount.
pub struct FileTransport {
    file: File,
    capacity: u64,
}

impl FileTransport {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let capacity = file.metadata()?.len();
        Ok(Self { file, capacity })
    }

    pub fn create(path: impl AsRef<Path>, capacity: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(capacity)?;
        Ok(Self { file, capacity })
    }
}

impl Transport for FileTransport {
    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn read_at(&self, buffer: &mut [u8], offset: u64) -> Result<()> {
        self.file.read_exact_at(buffer, offset)?;
        Ok(())
    }

    fn write_at(&self, buffer: &[u8], offset: u64) -> Result<()> {
        self.file.write_all_at(buffer, offset)?;
        Ok(())
    }
}

/// A `Transport` backed by an in-memory buffer of fixed capacity.
///
/// Useful for tests that exercise the filesystem engine without touching
/// disk.
pub struct MemoryTransport {
    data: Mutex<Vec<u8>>,
}

impl MemoryTransport {
    pub fn new(capacity: u64) -> Self {
        Self {
            data: Mutex::new(vec![0u8; capacity as usize]),
        }
    }
}

impl Transport for MemoryTransport {
    fn capacity(&self) -> u64 {
        self.data.lock().unwrap().len() as u64
    }

    fn read_at(&self, buffer: &mut [u8], offset: u64) -> Result<()> {
        let data = self.data.lock().unwrap();
        let start = offset as usize;
        let end = start
            .checked_add(buffer.len())
            .filter(|&end| end <= data.len())
            .ok_or(Error::OutOfRange)?;
        buffer.copy_from_slice(&data[start..end]);
        Ok(())
    }

    fn write_at(&self, buffer: &[u8], offset: u64) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        let start = offset as usize;
        let end = start
            .checked_add(buffer.len())
            .filter(|&end| end <= data.len())
            .ok_or(Error::OutOfRange)?;
        data[start..end].copy_from_slice(buffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_transport_round_trips() {
        let t = MemoryTransport::new(4096);
        t.write_at(b"hello", 10).unwrap();
        let mut buf = [0u8; 5];
        t.read_at(&mut buf, 10).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn memory_transport_rejects_out_of_range() {
        let t = MemoryTransport::new(16);
        let mut buf = [0u8; 8];
        assert!(t.read_at(&mut buf, 12).is_err());
    }

    #[test]
    fn file_transport_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.bin");
        let t = FileTransport::create(&path, 4096).unwrap();
        t.write_at(b"hello", 10).unwrap();

        let t2 = FileTransport::open(&path).unwrap();
        let mut buf = [0u8; 5];
        t2.read_at(&mut buf, 10).unwrap();
        assert_eq!(&buf, b"hello");
        assert_eq!(t2.capacity(), 4096);
    }
}
