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

//! Create, remove and rename: the namespace-mutating operations.

use zerocopy::little_endian::{U16, U32};

use ghostfs_err::{Error, Result};
use ghostfs_transport::Transport;

use crate::dir::{split_leaf, validate_leaf, EntryLocation};
use crate::layout::{RawDirEntry, DIR_BIT};
use crate::GhostFs;

impl<T: Transport> GhostFs<T> {
    fn create_entry(&mut self, path: &str, is_dir: bool) -> Result<EntryLocation> {
        let (parent_path, leaf_name) = split_leaf(path)?;
        let leaf = validate_leaf(leaf_name)?;

        let parent_loc = self.lookup(parent_path, false)?;
        let parent_raw = self.raw_entry(parent_loc)?;
        if !parent_raw.is_directory() {
            return Err(Error::NotDir);
        }
        let parent_cluster = match parent_loc {
            EntryLocation::Root => 0,
            EntryLocation::InCluster { .. } => parent_raw.cluster.get(),
        };

        if self.dir_contains(parent_cluster, leaf)? {
            return Err(Error::Exists);
        }

        let (entry_loc, extension) = match self.find_empty_entry(parent_cluster) {
            Ok(loc) => (loc, None),
            Err(Error::NotFound) => {
                let tail = self.chain_tail(parent_cluster)?;
                let new_cluster = self.alloc_clusters(1, true)?;
                let tail_cluster = self.get_cluster(tail)?;
                tail_cluster.next = new_cluster;
                tail_cluster.dirty = true;
                (
                    EntryLocation::InCluster {
                        cluster: new_cluster,
                        index: 0,
                    },
                    Some((tail, new_cluster)),
                )
            }
            Err(e) => return Err(e),
        };

        let mut raw = RawDirEntry::empty();
        raw.filename[..leaf.len()].copy_from_slice(leaf);

        if is_dir {
            match self.alloc_clusters(1, true) {
                Ok(dir_cluster) => {
                    raw.size = U32::new(DIR_BIT);
                    raw.cluster = U16::new(dir_cluster);
                }
                Err(e) => {
                    // Roll the parent chain extension back too: an entry
                    // slot with nothing in it must not become reachable.
                    if let Some((tail, new_cluster)) = extension {
                        let tail_cluster = self.get_cluster(tail)?;
                        tail_cluster.next = 0;
                        tail_cluster.dirty = true;
                        let _ = self.free_chain(new_cluster);
                    }
                    return Err(e);
                }
            }
        } else {
            raw.size = U32::new(0);
            raw.cluster = U16::new(0);
        }

        self.set_raw_entry(entry_loc, &raw)?;
        Ok(entry_loc)
    }

    fn remove_entry(&mut self, path: &str, want_dir: bool) -> Result<()> {
        let loc = self.lookup(path, false)?;
        if loc == EntryLocation::Root {
            return Err(Error::Inval);
        }
        let raw = self.raw_entry(loc)?;
        let is_dir = raw.is_directory();
        if want_dir && !is_dir {
            return Err(Error::NotDir);
        }
        if !want_dir && is_dir {
            return Err(Error::IsDir);
        }

        if is_dir {
            if !self.dir_is_empty(raw.cluster.get())? {
                return Err(Error::NotEmpty);
            }
            self.free_chain(raw.cluster.get())?;
        } else if raw.cluster.get() != 0 {
            self.free_chain(raw.cluster.get())?;
        }

        self.set_raw_entry(loc, &RawDirEntry::empty())
    }

    /// Creates an empty regular file.
    pub fn create(&mut self, path: &str) -> Result<()> {
        self.create_entry(path, false)?;
        Ok(())
    }

    /// Creates an empty directory.
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        self.create_entry(path, true)?;
        Ok(())
    }

    /// Removes a regular file.
    pub fn unlink(&mut self, path: &str) -> Result<()> {
        self.remove_entry(path, false)
    }

    /// Removes an empty directory.
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        self.remove_entry(path, true)
    }

    /// Moves the entry at `old_path` to `new_path`.
    ///
    /// Any existing entry at `new_path` is removed first, best-effort and
    /// treated as a file; a failure there is not reported back. The new
    /// entry is created fresh and then overwritten with the moved entry's
    /// size and cluster, so a directory keeps being a directory: the
    /// high bit rides along inside the copied `size` field.
    pub fn rename(&mut self, old_path: &str, new_path: &str) -> Result<()> {
        let old_loc = self.lookup(old_path, false)?;
        if old_loc == EntryLocation::Root {
            return Err(Error::Inval);
        }
        let old_raw = self.raw_entry(old_loc)?;

        let _ = self.remove_entry(new_path, false);

        let new_loc = self.create_entry(new_path, false)?;
        let mut new_raw = self.raw_entry(new_loc)?;
        new_raw.size = old_raw.size;
        new_raw.cluster = old_raw.cluster;
        self.set_raw_entry(new_loc, &new_raw)?;

        self.set_raw_entry(old_loc, &RawDirEntry::empty())?;
        Ok(())
    }
}
