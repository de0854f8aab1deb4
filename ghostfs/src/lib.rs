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

//! GhostFS: a small cluster-chain filesystem that stores its entire
//! backing image through an abstract [`Transport`], rather than a block
//! device. The chain layout, allocator and directory format are all this
//! crate owns; what actually carries the bytes is somebody else's problem.

mod alloc;
mod attr;
mod cluster;
mod debug;
mod dir;
mod file;
mod integrity;
mod layout;
mod namespace;

#[cfg(test)]
mod tests;

use std::time::SystemTime;

pub use ghostfs_err::{Error, Result};
pub use ghostfs_transport::Transport;

pub use attr::{FileAttr, StatVfs};
pub use dir::DirHandle;
pub use file::FileHandle;
pub use integrity::format;

use cluster::Cluster;

/// A mounted filesystem over a transport of type `T`.
///
/// Every cluster is lazily pulled in from the transport on first touch and
/// kept resident for the lifetime of the mount; there is no eviction.
/// Dirty clusters are written back on [`GhostFs::sync`] or
/// [`GhostFs::umount`], never eagerly.
pub struct GhostFs<T: Transport> {
    transport: T,
    cluster_count: u16,
    clusters: Vec<Option<Cluster>>,
    free_clusters: u16,
    uid: u32,
    gid: u32,
    mount_time: SystemTime,
}
