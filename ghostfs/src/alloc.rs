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

//! Cluster allocation: linear first-fit with full rollback on exhaustion,
//! and best-effort release of a chain.

use ghostfs_err::{Error, Result};
use ghostfs_transport::Transport;

use crate::layout::CLUSTER_DATA;
use crate::GhostFs;

impl<T: Transport> GhostFs<T> {
    /// Allocates `count` free clusters, chaining them together in the order
    /// found, and returns the index of the first one. Clusters 1.. are
    /// scanned from the start every time; cluster 0 is never a candidate.
    ///
    /// On exhaustion, every cluster claimed during this call is walked back
    /// via the `next` pointers just written and returned to the free set,
    /// so a failed allocation never leaks or left the cache inconsistent.
    pub(crate) fn alloc_clusters(&mut self, count: u32, zero: bool) -> Result<u16> {
        let cluster_count = self.cluster_count;
        let mut first: u16 = 0;
        let mut prev: Option<u16> = None;
        let mut pos: u16 = 1;
        let mut allocated: u32 = 0;

        let outcome: Result<u16> = loop {
            if allocated == count {
                break Ok(first);
            }
            if pos >= cluster_count {
                break Err(Error::NoSpace);
            }
            let cluster = self.get_cluster(pos)?;
            if cluster.used {
                pos += 1;
                continue;
            }

            if zero {
                cluster.data = [0; CLUSTER_DATA];
            }
            cluster.used = true;
            cluster.dirty = true;
            self.free_clusters -= 1;

            match prev {
                None => first = pos,
                Some(p) => {
                    let pc = self.get_cluster(p)?;
                    pc.next = pos;
                    pc.dirty = true;
                }
            }
            prev = Some(pos);
            allocated += 1;
            pos += 1;
        };

        match outcome {
            Ok(first) => {
                if let Some(p) = prev {
                    let pc = self.get_cluster(p)?;
                    pc.next = 0;
                    pc.dirty = true;
                }
                Ok(first)
            }
            Err(e) => {
                let mut nr = first;
                for _ in 0..allocated {
                    let cluster = self.get_cluster(nr)?;
                    let next = cluster.next;
                    cluster.used = false;
                    cluster.dirty = true;
                    self.free_clusters += 1;
                    nr = next;
                }
                Err(e)
            }
        }
    }

    /// Frees every cluster in the chain starting at `start`.
    ///
    /// Best-effort: if a transport read fails partway through the walk, the
    /// clusters freed so far stay freed and the error is returned. The free
    /// count stays correct either way; the next mount's scan is the source
    /// of truth.
    pub(crate) fn free_chain(&mut self, start: u16) -> Result<()> {
        let mut nr = start;
        loop {
            let cluster = match self.get_cluster(nr) {
                Ok(c) => c,
                Err(e) => {
                    log::warn!("failed to free cluster {nr}: {e}");
                    return Err(e);
                }
            };
            cluster.used = false;
            cluster.dirty = true;
            self.free_clusters += 1;
            let next = cluster.next;
            if next == 0 {
                return Ok(());
            }
            nr = next;
        }
    }
}
