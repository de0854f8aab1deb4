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

//! The write-back cluster cache: lazy load on first touch, dirty tracking,
//! no eviction for the lifetime of a mount.

use ghostfs_err::{Error, Result};
use ghostfs_transport::Transport;
use zerocopy::little_endian::U16;
use zerocopy::{FromBytes, IntoBytes};

use crate::layout::{cluster_offset, RawCluster, CLUSTER_DATA, CLUSTER_SIZE};
use crate::GhostFs;

/// The in-memory shape of a cluster. Decoded once from `RawCluster` bytes
/// and kept resident until the mount is dropped.
pub(crate) struct Cluster {
    pub data: [u8; CLUSTER_DATA],
    pub next: u16,
    pub used: bool,
    pub dirty: bool,
}

impl Cluster {
    pub(crate) fn empty() -> Self {
        Self {
            data: [0; CLUSTER_DATA],
            next: 0,
            used: false,
            dirty: false,
        }
    }

    pub(crate) fn from_bytes(buf: &[u8; CLUSTER_SIZE]) -> Self {
        let raw = RawCluster::read_from_bytes(buf).expect("RawCluster is exactly CLUSTER_SIZE");
        Self {
            data: raw.data,
            next: raw.next.get(),
            used: raw.used != 0,
            dirty: false,
        }
    }

    pub(crate) fn to_bytes(&self) -> [u8; CLUSTER_SIZE] {
        let raw = RawCluster {
            data: self.data,
            next: U16::new(self.next),
            used: self.used as u8,
            reserved: 0,
        };
        let mut buf = [0u8; CLUSTER_SIZE];
        buf.copy_from_slice(raw.as_bytes());
        buf
    }
}

fn bad_filesystem() -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        "cluster chain references a cluster outside the filesystem",
    ))
}

impl<T: Transport> GhostFs<T> {
    /// Returns the cluster at `index`, loading it from the transport on
    /// first touch.
    pub(crate) fn get_cluster(&mut self, index: u16) -> Result<&mut Cluster> {
        if index >= self.cluster_count {
            return Err(Error::OutOfRange);
        }
        if self.clusters[index as usize].is_none() {
            let mut buf = [0u8; CLUSTER_SIZE];
            self.transport.read_at(&mut buf, cluster_offset(index))?;
            self.clusters[index as usize] = Some(Cluster::from_bytes(&buf));
        }
        Ok(self.clusters[index as usize].as_mut().unwrap())
    }

    /// Follows one `next` pointer, returning the index it led to.
    ///
    /// Cluster 0 can only ever be the root directory's first cluster, so a
    /// `next` of 0 always marks the end of a chain and is never itself a
    /// valid continuation.
    pub(crate) fn get_cluster_next(&mut self, index: u16) -> Result<u16> {
        let next = self.get_cluster(index)?.next;
        if next == 0 {
            return Err(bad_filesystem());
        }
        Ok(next)
    }

    /// Walks `position` steps from `start` (0 returns `start` itself) and
    /// returns the cluster index reached.
    pub(crate) fn cluster_at(&mut self, start: u16, position: u32) -> Result<u16> {
        let mut nr = start;
        let mut cur = 0u16;
        for step in 0..=position {
            if nr == 0 {
                return Err(bad_filesystem());
            }
            cur = nr;
            if step < position {
                nr = self.get_cluster(nr)?.next;
            }
        }
        Ok(cur)
    }

    /// Writes back every cluster marked dirty, clearing the flag on success.
    pub(crate) fn flush_clusters(&mut self) -> Result<()> {
        for (index, slot) in self.clusters.iter_mut().enumerate() {
            if let Some(cluster) = slot {
                if cluster.dirty {
                    self.transport
                        .write_at(&cluster.to_bytes(), cluster_offset(index as u16))?;
                    cluster.dirty = false;
                }
            }
        }
        Ok(())
    }
}
