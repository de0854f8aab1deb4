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

//! Directory entry layout, chain traversal and path lookup.

use ghostfs_err::{Error, Result};
use ghostfs_transport::Transport;
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, IntoBytes};

use crate::layout::{RawDirEntry, CLUSTER_DIRENTS, DIRENTRY_SIZE, DIR_BIT, FILENAME_SIZE};
use crate::GhostFs;

/// Where a directory entry lives.
///
/// `Root` is the synthetic entry for `/` itself: it is never backed by
/// bytes on the carrier, so reads of it are synthesized and writes to it
/// are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryLocation {
    Root,
    InCluster { cluster: u16, index: u8 },
}

fn entry_byte_range(index: u8) -> std::ops::Range<usize> {
    let start = index as usize * DIRENTRY_SIZE;
    start..start + DIRENTRY_SIZE
}

/// Checks a path component (the bytes starting at `comp`, up to the next
/// `/` or the end of the string) against a raw filename field.
///
/// Mirrors a bounded strncmp: a name that fills all 56 bytes without ever
/// hitting a NUL is treated as unmatchable, since it could never have been
/// written by this filesystem's own name validation.
fn component_matches(comp: &[u8], name: &[u8; FILENAME_SIZE]) -> bool {
    let mut ci = 0usize;
    let mut ni = 0usize;
    while ni < FILENAME_SIZE && ci < comp.len() && comp[ci] != b'/' && comp[ci] == name[ni] {
        ci += 1;
        ni += 1;
    }
    if ni == FILENAME_SIZE {
        return false;
    }
    let comp_ended = ci >= comp.len() || comp[ci] == b'/';
    let name_ended = name[ni] == 0;
    comp_ended && name_ended
}

/// Whole-name equality used for sibling collision checks: `name` is a
/// caller-supplied leaf (already validated to fit), compared against a raw
/// filename field including its implicit trailing NULs.
fn name_equals(name: &[u8; FILENAME_SIZE], candidate: &[u8]) -> bool {
    for i in 0..FILENAME_SIZE {
        let f = name[i];
        let n = candidate.get(i).copied().unwrap_or(0);
        if f != n {
            return false;
        }
        if f == 0 {
            return true;
        }
    }
    true
}

pub(crate) fn validate_leaf(name: &str) -> Result<&[u8]> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.contains(&b'/') {
        return Err(Error::Inval);
    }
    if bytes.len() > FILENAME_SIZE - 1 {
        return Err(Error::NameTooLong);
    }
    Ok(bytes)
}

/// Splits the last `/`-separated component off a path, returning
/// `(parent_path, leaf)`. `parent_path` always starts with `/`.
pub(crate) fn split_leaf(path: &str) -> Result<(&str, &str)> {
    if !path.starts_with('/') {
        return Err(Error::Inval);
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::Inval);
    }
    let split_at = trimmed.rfind('/').unwrap();
    let parent = if split_at == 0 { "/" } else { &trimmed[..split_at] };
    Ok((parent, &trimmed[split_at + 1..]))
}

impl<T: Transport> GhostFs<T> {
    pub(crate) fn raw_entry(&mut self, loc: EntryLocation) -> Result<RawDirEntry> {
        match loc {
            // Never backed by bytes on the carrier: size is always exactly
            // the directory bit, regardless of what mount last saw.
            EntryLocation::Root => Ok(RawDirEntry {
                filename: [0; FILENAME_SIZE],
                size: U32::new(DIR_BIT),
                cluster: U16::new(0),
            }),
            EntryLocation::InCluster { cluster, index } => {
                let c = self.get_cluster(cluster)?;
                Ok(RawDirEntry::read_from_bytes(&c.data[entry_byte_range(index)]).unwrap())
            }
        }
    }

    pub(crate) fn set_raw_entry(&mut self, loc: EntryLocation, raw: &RawDirEntry) -> Result<()> {
        match loc {
            EntryLocation::Root => Err(Error::Inval),
            EntryLocation::InCluster { cluster, index } => {
                let c = self.get_cluster(cluster)?;
                c.data[entry_byte_range(index)].copy_from_slice(raw.as_bytes());
                c.dirty = true;
                Ok(())
            }
        }
    }

    pub(crate) fn entry_name_bytes(&mut self, loc: EntryLocation) -> Result<Vec<u8>> {
        let raw = self.raw_entry(loc)?;
        let len = raw
            .filename
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FILENAME_SIZE);
        Ok(raw.filename[..len].to_vec())
    }

    pub(crate) fn raw_entry_at(&mut self, cluster: u16, index: u8) -> Result<RawDirEntry> {
        Ok(
            RawDirEntry::read_from_bytes(&self.get_cluster(cluster)?.data[entry_byte_range(index)])
                .unwrap(),
        )
    }

    /// Advances `(cluster, index)` to the next slot, following `next`
    /// pointers across cluster boundaries. Returns `NotFound` once the
    /// chain is exhausted.
    pub(crate) fn advance(&mut self, cluster: &mut u16, index: &mut u8) -> Result<()> {
        if (*index as usize) < CLUSTER_DIRENTS - 1 {
            *index += 1;
            return Ok(());
        }
        let next = self.get_cluster(*cluster)?.next;
        if next == 0 {
            return Err(Error::NotFound);
        }
        *cluster = next;
        *index = 0;
        Ok(())
    }

    /// Advances to the next *used* slot, skipping empty ones in between.
    pub(crate) fn advance_used(&mut self, cluster: &mut u16, index: &mut u8) -> Result<()> {
        loop {
            self.advance(cluster, index)?;
            let r = RawDirEntry::read_from_bytes(
                &self.get_cluster(*cluster)?.data[entry_byte_range(*index)],
            )
            .unwrap();
            if r.is_used() {
                return Ok(());
            }
        }
    }

    /// Resolves `path` to the location of the entry it names.
    ///
    /// When `skip_last` is set, the final component is not required to
    /// exist; the location returned is that of its parent directory
    /// instead, so callers can create or remove the final component
    /// themselves.
    pub(crate) fn lookup(&mut self, path: &str, skip_last: bool) -> Result<EntryLocation> {
        if !path.starts_with('/') {
            return Err(Error::Inval);
        }
        let rest = &path.as_bytes()[1..];
        if rest.is_empty() || (skip_last && !rest.contains(&b'/')) {
            return Ok(EntryLocation::Root);
        }

        let mut cluster = 0u16;
        let mut index = 0u8;
        let mut comp = rest;

        loop {
            let raw = RawDirEntry::read_from_bytes(
                &self.get_cluster(cluster)?.data[entry_byte_range(index)],
            )
            .unwrap();

            if component_matches(comp, &raw.filename) {
                let next_slash = comp.iter().position(|&b| b == b'/');
                let is_last = match next_slash {
                    None => true,
                    Some(pos) => skip_last && !comp[pos + 1..].contains(&b'/'),
                };
                if is_last {
                    return Ok(EntryLocation::InCluster { cluster, index });
                }
                if !raw.is_directory() {
                    return Err(Error::NotDir);
                }
                cluster = raw.cluster.get();
                index = 0;
                comp = &comp[next_slash.unwrap() + 1..];
                continue;
            }

            self.advance_used(&mut cluster, &mut index)?;
        }
    }

    /// Finds the first unused slot in the chain starting at `first_cluster`.
    /// Returns the last cluster visited when the chain is full, so the
    /// caller can extend it with a freshly allocated cluster.
    pub(crate) fn find_empty_entry(&mut self, first_cluster: u16) -> Result<EntryLocation> {
        let mut cluster = first_cluster;
        let mut index = 0u8;
        loop {
            let raw = RawDirEntry::read_from_bytes(
                &self.get_cluster(cluster)?.data[entry_byte_range(index)],
            )
            .unwrap();
            if !raw.is_used() {
                return Ok(EntryLocation::InCluster { cluster, index });
            }
            match self.advance(&mut cluster, &mut index) {
                Ok(()) => continue,
                Err(Error::NotFound) => return Err(Error::NotFound),
                Err(e) => return Err(e),
            }
        }
    }

    /// The cluster at the tail of the chain, i.e. the one whose `next`
    /// would have to change to extend it.
    pub(crate) fn chain_tail(&mut self, first_cluster: u16) -> Result<u16> {
        let mut cluster = first_cluster;
        loop {
            let next = self.get_cluster(cluster)?.next;
            if next == 0 {
                return Ok(cluster);
            }
            cluster = next;
        }
    }

    /// Whether `first_cluster`'s chain contains a used entry whose name
    /// equals `leaf`.
    pub(crate) fn dir_contains(&mut self, first_cluster: u16, leaf: &[u8]) -> Result<bool> {
        let mut cluster = first_cluster;
        let mut index = 0u8;
        loop {
            let raw = RawDirEntry::read_from_bytes(
                &self.get_cluster(cluster)?.data[entry_byte_range(index)],
            )
            .unwrap();
            if name_equals(&raw.filename, leaf) {
                return Ok(true);
            }
            match self.advance(&mut cluster, &mut index) {
                Ok(()) => continue,
                Err(Error::NotFound) => return Ok(false),
                Err(e) => return Err(e),
            }
        }
    }

    /// Whether any used entry remains in `first_cluster`'s chain.
    pub(crate) fn dir_is_empty(&mut self, first_cluster: u16) -> Result<bool> {
        let mut cluster = first_cluster;
        let mut index = 0u8;
        loop {
            let raw = RawDirEntry::read_from_bytes(
                &self.get_cluster(cluster)?.data[entry_byte_range(index)],
            )
            .unwrap();
            if raw.is_used() {
                return Ok(false);
            }
            match self.advance(&mut cluster, &mut index) {
                Ok(()) => continue,
                Err(Error::NotFound) => return Ok(true),
                Err(e) => return Err(e),
            }
        }
    }
}

/// A handle on an open directory, returned by `opendir`. Iteration state is
/// re-resolved against the cache on every call rather than cached in the
/// handle, so the handle itself stays a plain, cheap value.
pub struct DirHandle {
    pub(crate) first_cluster: u16,
    pub(crate) state: DirIterState,
}

#[derive(Clone, Copy)]
pub(crate) enum DirIterState {
    NotStarted,
    At { cluster: u16, index: u8 },
    Exhausted,
}

impl<T: Transport> GhostFs<T> {
    pub fn opendir(&mut self, path: &str) -> Result<DirHandle> {
        let loc = self.lookup(path, false)?;
        let raw = self.raw_entry(loc)?;
        if !raw.is_directory() {
            return Err(Error::NotDir);
        }
        let first_cluster = match loc {
            EntryLocation::Root => 0,
            EntryLocation::InCluster { .. } => raw.cluster.get(),
        };
        Ok(DirHandle {
            first_cluster,
            state: DirIterState::NotStarted,
        })
    }

    pub fn closedir(&mut self, _handle: DirHandle) {}

    /// Advances `handle` to the next used entry in the directory.
    ///
    /// Returns `Ok(())` when a new entry is available (read it with
    /// `entry_name`), or `Err(NotFound)` once the directory is exhausted.
    pub fn next_entry(&mut self, handle: &mut DirHandle) -> Result<()> {
        match handle.state {
            DirIterState::Exhausted => Err(Error::NotFound),
            DirIterState::NotStarted => {
                let mut cluster = handle.first_cluster;
                let mut index = 0u8;
                let raw = RawDirEntry::read_from_bytes(
                    &self.get_cluster(cluster)?.data[entry_byte_range(index)],
                )
                .unwrap();
                if raw.is_used() {
                    handle.state = DirIterState::At { cluster, index };
                    return Ok(());
                }
                match self.advance_used(&mut cluster, &mut index) {
                    Ok(()) => {
                        handle.state = DirIterState::At { cluster, index };
                        Ok(())
                    }
                    Err(Error::NotFound) => {
                        handle.state = DirIterState::Exhausted;
                        Err(Error::NotFound)
                    }
                    Err(e) => Err(e),
                }
            }
            DirIterState::At {
                mut cluster,
                mut index,
            } => match self.advance_used(&mut cluster, &mut index) {
                Ok(()) => {
                    handle.state = DirIterState::At { cluster, index };
                    Ok(())
                }
                Err(Error::NotFound) => {
                    handle.state = DirIterState::Exhausted;
                    Err(Error::NotFound)
                }
                Err(e) => Err(e),
            },
        }
    }

    /// Reads the name of the entry `handle` currently points at.
    pub fn entry_name(&mut self, handle: &DirHandle) -> Result<String> {
        match handle.state {
            DirIterState::At { cluster, index } => {
                let raw = RawDirEntry::read_from_bytes(
                    &self.get_cluster(cluster)?.data[entry_byte_range(index)],
                )
                .unwrap();
                let len = raw
                    .filename
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(FILENAME_SIZE);
                Ok(String::from_utf8_lossy(&raw.filename[..len]).into_owned())
            }
            _ => Err(Error::Inval),
        }
    }
}
