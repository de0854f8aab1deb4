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

//! Open files: positioned read/write and truncate, with zero-fill on
//! extension.

use zerocopy::little_endian::{U16, U32};

use ghostfs_err::{Error, Result};
use ghostfs_transport::Transport;

use crate::dir::EntryLocation;
use crate::layout::{CLUSTER_DATA, DIR_BIT, FILESIZE_MAX};
use crate::GhostFs;

fn size_to_clusters(size: u32) -> u32 {
    let size = size as usize;
    ((size / CLUSTER_DATA) + usize::from(size % CLUSTER_DATA != 0)) as u32
}

/// A handle on an open regular file, returned by `open`.
pub struct FileHandle {
    pub(crate) loc: EntryLocation,
}

impl<T: Transport> GhostFs<T> {
    pub fn open(&mut self, path: &str) -> Result<FileHandle> {
        let loc = self.lookup(path, false)?;
        let raw = self.raw_entry(loc)?;
        if raw.is_directory() {
            return Err(Error::IsDir);
        }
        Ok(FileHandle { loc })
    }

    pub fn release(&mut self, _handle: FileHandle) {}

    pub fn read(&mut self, handle: &FileHandle, buf: &mut [u8], offset: i64) -> Result<usize> {
        if offset < 0 {
            return Err(Error::Inval);
        }
        let offset = offset as u64;
        let raw = self.raw_entry(handle.loc)?;
        if raw.is_directory() {
            return Err(Error::IsDir);
        }
        let size = raw.size_value() as u64;
        if offset >= size || buf.is_empty() {
            return Ok(0);
        }
        let to_read = (size - offset).min(buf.len() as u64) as usize;

        let first_cluster = raw.cluster.get();
        let cluster_index = (offset / CLUSTER_DATA as u64) as u32;
        let mut off_in_cluster = (offset % CLUSTER_DATA as u64) as usize;
        let mut cluster_nr = self.cluster_at(first_cluster, cluster_index)?;

        let mut done = 0usize;
        while done < to_read {
            let n = (CLUSTER_DATA - off_in_cluster).min(to_read - done);
            let cluster = self.get_cluster(cluster_nr)?;
            buf[done..done + n].copy_from_slice(&cluster.data[off_in_cluster..off_in_cluster + n]);
            done += n;
            off_in_cluster = 0;
            if done < to_read {
                cluster_nr = self.get_cluster_next(cluster_nr)?;
            }
        }
        Ok(done)
    }

    pub fn write(&mut self, handle: &FileHandle, buf: &[u8], offset: i64) -> Result<usize> {
        if offset < 0 {
            return Err(Error::Inval);
        }
        let offset = offset as u64;
        let end = offset.checked_add(buf.len() as u64).ok_or(Error::Overflow)?;
        if end > FILESIZE_MAX as u64 {
            return Err(Error::Fbig);
        }

        let raw = self.raw_entry(handle.loc)?;
        if raw.is_directory() {
            return Err(Error::IsDir);
        }
        let old_size = raw.size_value() as u64;
        if end > old_size {
            self.resize(handle.loc, end as u32)?;
        }

        if buf.is_empty() {
            return Ok(0);
        }

        let raw = self.raw_entry(handle.loc)?;
        let first_cluster = raw.cluster.get();
        let cluster_index = (offset / CLUSTER_DATA as u64) as u32;
        let mut off_in_cluster = (offset % CLUSTER_DATA as u64) as usize;
        let mut cluster_nr = self.cluster_at(first_cluster, cluster_index)?;

        let mut written = 0usize;
        while written < buf.len() {
            let n = (CLUSTER_DATA - off_in_cluster).min(buf.len() - written);
            let cluster = self.get_cluster(cluster_nr)?;
            cluster.data[off_in_cluster..off_in_cluster + n]
                .copy_from_slice(&buf[written..written + n]);
            cluster.dirty = true;
            written += n;
            off_in_cluster = 0;
            if written < buf.len() {
                cluster_nr = self.get_cluster_next(cluster_nr)?;
            }
        }
        Ok(written)
    }

    pub fn truncate(&mut self, path: &str, new_size: i64) -> Result<()> {
        if new_size < 0 {
            return Err(Error::Inval);
        }
        if new_size as u64 > FILESIZE_MAX as u64 {
            return Err(Error::Fbig);
        }
        let loc = self.lookup(path, false)?;
        let raw = self.raw_entry(loc)?;
        if raw.is_directory() {
            return Err(Error::IsDir);
        }
        self.resize(loc, new_size as u32)
    }

    /// Grows or shrinks the cluster chain backing `loc` to match
    /// `new_size`, zero-filling any bytes that become newly readable.
    pub(crate) fn resize(&mut self, loc: EntryLocation, new_size: u32) -> Result<()> {
        let raw = self.raw_entry(loc)?;
        let dir_bit = raw.size.get() & DIR_BIT;
        let old_size = raw.size_value();
        let old_clusters = size_to_clusters(old_size);
        let new_clusters = size_to_clusters(new_size);
        let old_first = raw.cluster.get();

        let new_first = match new_clusters.cmp(&old_clusters) {
            std::cmp::Ordering::Greater => {
                if old_clusters == 0 {
                    self.alloc_clusters(new_clusters, true)?
                } else {
                    let tail = self.cluster_at(old_first, old_clusters - 1)?;
                    let added = self.alloc_clusters(new_clusters - old_clusters, true)?;
                    let tail_cluster = self.get_cluster(tail)?;
                    tail_cluster.next = added;
                    tail_cluster.dirty = true;
                    old_first
                }
            }
            std::cmp::Ordering::Less => {
                if new_clusters == 0 {
                    self.free_chain(old_first)?;
                    0
                } else {
                    let tail = self.cluster_at(old_first, new_clusters - 1)?;
                    let to_free = self.get_cluster(tail)?.next;
                    let tail_cluster = self.get_cluster(tail)?;
                    tail_cluster.next = 0;
                    tail_cluster.dirty = true;
                    self.free_chain(to_free)?;
                    old_first
                }
            }
            std::cmp::Ordering::Equal => old_first,
        };

        if new_size > old_size && old_clusters > 0 {
            let boundary_offset = (old_size % CLUSTER_DATA as u32) as usize;
            if boundary_offset > 0 {
                let boundary_cluster = self.cluster_at(old_first, old_clusters - 1)?;
                let cluster = self.get_cluster(boundary_cluster)?;
                cluster.data[boundary_offset..].fill(0);
                cluster.dirty = true;
            }
        }

        let mut raw = self.raw_entry(loc)?;
        raw.size = U32::new(new_size | dir_bit);
        raw.cluster = U16::new(new_first);
        self.set_raw_entry(loc, &raw)
    }
}
