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

//! Attribute reporting: per-entry metadata and volume-wide statistics.

use std::time::SystemTime;

use ghostfs_err::Result;
use ghostfs_transport::Transport;

use crate::layout::{CLUSTER_SIZE, FILENAME_SIZE};
use crate::GhostFs;

const S_IFDIR: u32 = 0o040000;
const S_IFREG: u32 = 0o100000;
const RW_RX: u32 = 0o755;

/// Metadata for a single entry, in the shape a POSIX `stat` bridge would
/// expect. Every timestamp reports the mount time: entries carry no
/// timestamps of their own on the carrier.
#[derive(Debug, Clone, Copy)]
pub struct FileAttr {
    pub size: u64,
    pub blocks: u64,
    pub is_dir: bool,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

/// Volume-wide statistics, in the shape a `statvfs` bridge would expect.
#[derive(Debug, Clone, Copy)]
pub struct StatVfs {
    pub block_size: u32,
    pub blocks: u64,
    pub blocks_free: u64,
    pub blocks_available: u64,
    pub name_max: u32,
}

impl<T: Transport> GhostFs<T> {
    pub fn getattr(&mut self, path: &str) -> Result<FileAttr> {
        let loc = self.lookup(path, false)?;
        let raw = self.raw_entry(loc)?;
        let is_dir = raw.is_directory();
        let size = if is_dir {
            CLUSTER_SIZE as u64
        } else {
            raw.size_value() as u64
        };
        let blocks = (size + 511) / 512;
        Ok(FileAttr {
            size,
            blocks,
            is_dir,
            mode: (if is_dir { S_IFDIR } else { S_IFREG }) | RW_RX,
            uid: self.uid,
            gid: self.gid,
            atime: self.mount_time,
            mtime: self.mount_time,
            ctime: self.mount_time,
        })
    }

    /// Reports the filesystem's size and occupancy.
    ///
    /// `name_max` reports the real per-component limit (`FILENAME_SIZE -
    /// 1`); file and free-file counts are not tracked by this filesystem
    /// and are reported as zero rather than guessed at.
    pub fn statvfs(&self) -> StatVfs {
        StatVfs {
            block_size: CLUSTER_SIZE as u32,
            blocks: self.cluster_count as u64,
            blocks_free: self.free_clusters as u64,
            blocks_available: self.free_clusters as u64,
            name_max: (FILENAME_SIZE - 1) as u32,
        }
    }
}
