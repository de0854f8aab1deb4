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

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("allocation failure")]
    NoMemory,
    #[error("no free cluster available")]
    NoSpace,
    #[error("transport failure or corrupted chain")]
    Io(#[from] std::io::Error),
    #[error("cluster index out of range")]
    OutOfRange,
    #[error("invalid argument")]
    Inval,
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    Exists,
    #[error("not a directory")]
    NotDir,
    #[error("is a directory")]
    IsDir,
    #[error("directory not empty")]
    NotEmpty,
    #[error("filename too long")]
    NameTooLong,
    #[error("file too large")]
    Fbig,
    #[error("arithmetic overflow")]
    Overflow,
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Maps to the conventional POSIX numeric for a host bridge.
    ///
    /// The bridge itself is out of scope; only the mapping is part of the
    /// error design.
    pub fn to_errno(&self) -> i32 {
        match self {
            Error::NoMemory => libc_like::ENOMEM,
            Error::NoSpace => libc_like::ENOSPC,
            Error::Io(_) => libc_like::EIO,
            Error::OutOfRange => libc_like::ERANGE,
            Error::Inval => libc_like::EINVAL,
            Error::NotFound => libc_like::ENOENT,
            Error::Exists => libc_like::EEXIST,
            Error::NotDir => libc_like::ENOTDIR,
            Error::IsDir => libc_like::EISDIR,
            Error::NotEmpty => libc_like::ENOTEMPTY,
            Error::NameTooLong => libc_like::ENAMETOOLONG,
            Error::Fbig => libc_like::EFBIG,
            Error::Overflow => libc_like::EOVERFLOW,
        }
    }
}

/// Numeric values match `errno.h` on Linux; kept local so this crate has no
/// platform dependency of its own.
mod libc_like {
    pub const ENOMEM: i32 = 12;
    pub const EIO: i32 = 5;
    pub const ENOSPC: i32 = 28;
    pub const ERANGE: i32 = 34;
    pub const EINVAL: i32 = 22;
    pub const ENOENT: i32 = 2;
    pub const EEXIST: i32 = 17;
    pub const ENOTDIR: i32 = 20;
    pub const EISDIR: i32 = 21;
    pub const ENOTEMPTY: i32 = 39;
    pub const ENAMETOOLONG: i32 = 36;
    pub const EFBIG: i32 = 27;
    pub const EOVERFLOW: i32 = 75;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping_is_stable() {
        assert_eq!(Error::NotFound.to_errno(), 2);
        assert_eq!(Error::Exists.to_errno(), 17);
        assert_eq!(Error::NotEmpty.to_errno(), 39);
    }
}
