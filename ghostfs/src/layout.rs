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

//! On-carrier layout: byte offsets, cluster geometry and the zerocopy views
//! onto raw cluster/entry bytes. Nothing in this module touches a transport.

use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Bytes per cluster, including its trailer.
pub(crate) const CLUSTER_SIZE: usize = 4096;
/// Bytes of payload in a cluster, i.e. everything before the trailer.
pub(crate) const CLUSTER_DATA: usize = 4092;
/// On-disk size of one directory entry.
pub(crate) const DIRENTRY_SIZE: usize = 62;
/// Directory entries that fit in one cluster's data area, with zero slack.
pub(crate) const CLUSTER_DIRENTS: usize = CLUSTER_DATA / DIRENTRY_SIZE;
/// Maximum filename length, including the terminating NUL.
pub(crate) const FILENAME_SIZE: usize = 56;
/// Largest size a regular file may report (2 GiB - 1).
pub(crate) const FILESIZE_MAX: u32 = 0x7FFF_FFFF;
/// High bit of a directory entry's `size` field marks it as a directory.
pub(crate) const DIR_BIT: u32 = 0x8000_0000;
/// Bytes occupied by the digest + header before cluster 0 begins.
pub(crate) const HEADER_SIZE: u64 = 18;

pub(crate) const fn cluster_offset(index: u16) -> u64 {
    HEADER_SIZE + index as u64 * CLUSTER_SIZE as u64
}

/// The on-disk representation of one cluster: a flat 4092-byte data area
/// followed by a 4-byte trailer. `dirty` is never meaningful once read back
/// off the carrier; it exists only so the trailer's size matches the
/// original layout.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub(crate) struct RawCluster {
    pub data: [u8; CLUSTER_DATA],
    pub next: U16,
    pub used: u8,
    pub reserved: u8,
}

/// The on-disk representation of one directory entry: a NUL-terminated
/// filename, a size whose high bit doubles as the directory flag, and the
/// index of the entry's first cluster.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub(crate) struct RawDirEntry {
    pub filename: [u8; FILENAME_SIZE],
    pub size: U32,
    pub cluster: U16,
}

impl RawDirEntry {
    pub(crate) fn empty() -> Self {
        Self {
            filename: [0; FILENAME_SIZE],
            size: U32::new(0),
            cluster: U16::new(0),
        }
    }

    pub(crate) fn is_used(&self) -> bool {
        self.filename[0] != 0
    }

    pub(crate) fn is_directory(&self) -> bool {
        self.size.get() & DIR_BIT != 0
    }

    pub(crate) fn size_value(&self) -> u32 {
        self.size.get() & !DIR_BIT
    }
}

/// The 18-byte header that precedes cluster 0: an integrity digest over
/// itself-minus-digest plus cluster 0, and the number of clusters that
/// follow it.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub(crate) struct RawHeader {
    pub digest: [u8; 16],
    pub cluster_count: U16,
}
