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

//! Format, mount, sync and the integrity digest that ties them together.

use std::time::SystemTime;

use md5::{Digest, Md5};
use zerocopy::little_endian::U16;
use zerocopy::{FromBytes, IntoBytes};

use ghostfs_err::{Error, Result};
use ghostfs_transport::Transport;

use crate::cluster::Cluster;
use crate::layout::{cluster_offset, RawHeader, CLUSTER_DATA, CLUSTER_SIZE, HEADER_SIZE};
use crate::GhostFs;

fn compute_digest(cluster_count: u16, cluster0: &[u8; CLUSTER_SIZE]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(cluster_count.to_le_bytes());
    hasher.update(cluster0);
    hasher.finalize().into()
}

/// Initializes a transport's full capacity as a fresh, empty filesystem:
/// an empty root directory in cluster 0 and every other cluster marked
/// free. Returns the number of clusters the image was formatted for.
pub fn format<T: Transport>(transport: &T) -> Result<u16> {
    let capacity = transport.capacity();
    let usable = capacity
        .checked_sub(HEADER_SIZE)
        .ok_or(Error::NoSpace)?;
    if usable < CLUSTER_SIZE as u64 {
        return Err(Error::NoSpace);
    }
    let cluster_count = (usable / CLUSTER_SIZE as u64).min(u16::MAX as u64) as u16;

    let mut root = Cluster::empty();
    root.used = true;
    let root_bytes = root.to_bytes();

    let digest = compute_digest(cluster_count, &root_bytes);
    let header = RawHeader {
        digest,
        cluster_count: U16::new(cluster_count),
    };
    transport.write_at(header.as_bytes(), 0)?;
    transport.write_at(&root_bytes, cluster_offset(0))?;

    // Leave whatever was already on the carrier in place; freeing a cluster
    // only means clearing its `used` byte, since a free cluster's `next`
    // and data are irrelevant (invariant: unused clusters carry no meaning
    // in their other fields).
    const USED_OFFSET: usize = CLUSTER_DATA + 2;
    for index in 1..cluster_count {
        let mut buf = [0u8; CLUSTER_SIZE];
        transport.read_at(&mut buf, cluster_offset(index))?;
        buf[USED_OFFSET] = 0;
        transport.write_at(&buf, cluster_offset(index))?;
    }

    Ok(cluster_count)
}

impl<T: Transport> GhostFs<T> {
    /// Mounts a previously formatted transport, validating the integrity
    /// digest before trusting anything else on it.
    pub fn mount(transport: T) -> Result<Self> {
        let mut header_buf = [0u8; HEADER_SIZE as usize];
        transport.read_at(&mut header_buf, 0)?;
        let header = RawHeader::read_from_bytes(&header_buf).expect("RawHeader is HEADER_SIZE bytes");

        let cluster_count = header.cluster_count.get();
        if cluster_count == 0 {
            log::error!("refusing to mount: cluster_count is zero");
            return Err(Error::Inval);
        }

        let mut root_buf = [0u8; CLUSTER_SIZE];
        transport.read_at(&mut root_buf, cluster_offset(0))?;

        let expected = compute_digest(cluster_count, &root_buf);
        if expected != header.digest {
            log::error!("refusing to mount: integrity digest mismatch");
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "integrity digest mismatch",
            )));
        }

        let mut clusters = Vec::with_capacity(cluster_count as usize);
        clusters.resize_with(cluster_count as usize, || None);
        clusters[0] = Some(Cluster::from_bytes(&root_buf));

        let mut fs = GhostFs {
            transport,
            cluster_count,
            clusters,
            free_clusters: 0,
            uid: 0,
            gid: 0,
            mount_time: SystemTime::now(),
        };

        let mut free_clusters = 0u16;
        for index in 0..cluster_count {
            if !fs.get_cluster(index)?.used {
                free_clusters += 1;
            }
        }
        fs.free_clusters = free_clusters;

        log::debug!("mounted: {cluster_count} clusters, {free_clusters} free");
        Ok(fs)
    }

    /// Writes every dirty cluster back and recomputes the header digest
    /// over the (possibly just-changed) root cluster.
    pub fn sync(&mut self) -> Result<()> {
        self.flush_clusters()?;

        let root_bytes = self.get_cluster(0)?.to_bytes();
        let digest = compute_digest(self.cluster_count, &root_bytes);
        let header = RawHeader {
            digest,
            cluster_count: U16::new(self.cluster_count),
        };
        self.transport.write_at(header.as_bytes(), 0)?;
        Ok(())
    }

    /// Flushes outstanding changes and releases the transport.
    pub fn umount(mut self) -> Result<()> {
        self.sync()
    }

    pub fn cluster_count(&self) -> u16 {
        self.cluster_count
    }
}
