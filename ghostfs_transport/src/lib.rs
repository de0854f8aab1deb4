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

pub use ghostfs_err::{Error, Result};

/// A flat, fixed-capacity, byte-addressable store.
///
/// Implementations are the seam at which a steganographic transport, a
/// plain file, or an in-memory buffer plug in; this crate only depends on
/// the contract, never on a concrete backing medium.
pub trait Transport {
    /// Total number of addressable bytes.
    fn capacity(&self) -> u64;

    /// Reads `buffer.len()` bytes starting at `offset`.
    ///
    /// Implementations must either fully satisfy the read or return an
    /// error; partial reads are not observable by callers.
    fn read_at(&self, buffer: &mut [u8], offset: u64) -> Result<()>;

    /// Writes `buffer.len()` bytes starting at `offset`.
    ///
    /// Implementations must either fully satisfy the write or return an
    /// error; partial writes are not observable by callers.
    fn write_at(&self, buffer: &[u8], offset: u64) -> Result<()>;
}
