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

//! A recursive tree dump, useful for tests and diagnostics. There is no
//! shell or bridge here to print it; callers get it back as a `String`.

use ghostfs_err::Result;
use ghostfs_transport::Transport;

use crate::layout::FILENAME_SIZE;
use crate::GhostFs;

impl<T: Transport> GhostFs<T> {
    pub fn debug(&mut self) -> Result<String> {
        let mut out = String::new();
        self.debug_dir(0, "", &mut out)?;
        Ok(out)
    }

    fn debug_dir(&mut self, first_cluster: u16, path: &str, out: &mut String) -> Result<()> {
        let mut cluster = first_cluster;
        let mut index = 0u8;
        loop {
            let raw = self.raw_entry_at(cluster, index)?;
            if raw.is_used() {
                let len = raw
                    .filename
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(FILENAME_SIZE);
                let name = String::from_utf8_lossy(&raw.filename[..len]);
                let full_path = format!("{path}/{name}");
                if raw.is_directory() {
                    out.push_str(&full_path);
                    out.push_str("/\n");
                    self.debug_dir(raw.cluster.get(), &full_path, out)?;
                } else {
                    out.push_str(&full_path);
                    out.push_str(&format!(" {{{}}}\n", raw.size_value()));
                }
            }
            match self.advance(&mut cluster, &mut index) {
                Ok(()) => continue,
                Err(ghostfs_err::Error::NotFound) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }
}
