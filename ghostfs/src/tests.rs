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

use ghostfs_transport::Transport;
use ghostfs_transport_std::MemoryTransport;

use crate::{format, Error, GhostFs};

const CLUSTER_SIZE: u64 = 4096;
const HEADER_SIZE: u64 = 18;

fn mounted(clusters: u64) -> GhostFs<MemoryTransport> {
    let transport = MemoryTransport::new(HEADER_SIZE + CLUSTER_SIZE * clusters);
    format(&transport).unwrap();
    GhostFs::mount(transport).unwrap()
}

#[test]
fn format_sizes_cluster_count_from_capacity() {
    let transport = MemoryTransport::new(HEADER_SIZE + CLUSTER_SIZE * 4);
    let count = format(&transport).unwrap();
    assert_eq!(count, 4);
}

#[test]
fn mount_reports_all_but_root_free() {
    let fs = mounted(4);
    let stat = fs.statvfs();
    assert_eq!(stat.blocks, 4);
    assert_eq!(stat.blocks_free, 3);
}

#[test]
fn mount_rejects_corrupted_digest() {
    let transport = MemoryTransport::new(HEADER_SIZE + CLUSTER_SIZE * 4);
    format(&transport).unwrap();
    transport.write_at(b"x", 0).unwrap();
    let err = GhostFs::mount(transport).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn create_write_and_read_round_trip() {
    let mut fs = mounted(4);
    fs.create("/hello.txt").unwrap();
    let handle = fs.open("/hello.txt").unwrap();
    let written = fs.write(&handle, b"hello, ghost", 0).unwrap();
    assert_eq!(written, 12);

    let mut buf = [0u8; 12];
    let read = fs.read(&handle, &mut buf, 0).unwrap();
    assert_eq!(read, 12);
    assert_eq!(&buf, b"hello, ghost");

    let attr = fs.getattr("/hello.txt").unwrap();
    assert_eq!(attr.size, 12);
    assert!(!attr.is_dir);
}

#[test]
fn truncate_extension_reads_back_as_zero() {
    let mut fs = mounted(4);
    fs.create("/f").unwrap();
    let handle = fs.open("/f").unwrap();
    fs.write(&handle, b"abc", 0).unwrap();
    fs.truncate("/f", 10).unwrap();

    let mut buf = [0xffu8; 7];
    let read = fs.read(&handle, &mut buf, 3).unwrap();
    assert_eq!(read, 7);
    assert_eq!(&buf, &[0u8; 7]);
}

#[test]
fn truncate_shrink_frees_clusters() {
    let mut fs = mounted(8);
    fs.create("/big").unwrap();
    let handle = fs.open("/big").unwrap();
    let data = vec![7u8; 4092 * 3 + 10];
    fs.write(&handle, &data, 0).unwrap();

    let free_after_grow = fs.statvfs().blocks_free;
    fs.truncate("/big", 5).unwrap();
    let free_after_shrink = fs.statvfs().blocks_free;
    assert!(free_after_shrink > free_after_grow);
}

#[test]
fn mkdir_and_nested_create_show_up_in_debug_tree() {
    let mut fs = mounted(4);
    fs.mkdir("/docs").unwrap();
    fs.create("/docs/readme").unwrap();

    let tree = fs.debug().unwrap();
    assert!(tree.contains("/docs/\n"));
    assert!(tree.contains("/docs/readme {0}\n"));
}

#[test]
fn rmdir_rejects_non_empty_then_succeeds_when_empty() {
    let mut fs = mounted(4);
    fs.mkdir("/d").unwrap();
    fs.create("/d/f").unwrap();

    assert!(matches!(fs.rmdir("/d"), Err(Error::NotEmpty)));

    fs.unlink("/d/f").unwrap();
    fs.rmdir("/d").unwrap();
    assert!(matches!(fs.getattr("/d"), Err(Error::NotFound)));
}

#[test]
fn rename_preserves_directory_bit_and_contents() {
    let mut fs = mounted(4);
    fs.mkdir("/old").unwrap();
    fs.create("/old/child").unwrap();

    fs.rename("/old", "/new").unwrap();

    let attr = fs.getattr("/new").unwrap();
    assert!(attr.is_dir);
    assert!(matches!(fs.getattr("/old"), Err(Error::NotFound)));

    let mut dir = fs.opendir("/new").unwrap();
    fs.next_entry(&mut dir).unwrap();
    assert_eq!(fs.entry_name(&dir).unwrap(), "child");
}

#[test]
fn unlink_returns_clusters_to_the_free_set() {
    let mut fs = mounted(8);
    fs.create("/big").unwrap();
    let handle = fs.open("/big").unwrap();
    let data = vec![1u8; 4092 * 2 + 1];
    fs.write(&handle, &data, 0).unwrap();

    let free_before = fs.statvfs().blocks_free;
    fs.unlink("/big").unwrap();
    let free_after = fs.statvfs().blocks_free;
    assert!(free_after > free_before);
}

#[test]
fn create_rejects_overlong_names_and_bad_paths() {
    let mut fs = mounted(4);
    let long_name = "x".repeat(56);
    let path = format!("/{long_name}");
    assert!(matches!(fs.create(&path), Err(Error::NameTooLong)));
    assert!(matches!(fs.create("no-leading-slash"), Err(Error::Inval)));
}

#[test]
fn create_on_existing_name_is_rejected() {
    let mut fs = mounted(4);
    fs.create("/dup").unwrap();
    assert!(matches!(fs.create("/dup"), Err(Error::Exists)));
}

#[test]
fn allocation_failure_rolls_back_and_leaves_free_count_untouched() {
    let mut fs = mounted(2); // root + exactly one free cluster
    fs.create("/a").unwrap();
    let a = fs.open("/a").unwrap();
    // One cluster's worth fits; asking for two more than available must fail
    // cleanly and leave the free count exactly where it was beforehand.
    let free_before = fs.statvfs().blocks_free;
    let huge = vec![0u8; 4092 * 4];
    let err = fs.write(&a, &huge, 0).unwrap_err();
    assert!(matches!(err, Error::NoSpace));
    assert_eq!(fs.statvfs().blocks_free, free_before);
}

#[test]
fn file_backed_transport_survives_a_remount() {
    use ghostfs_transport_std::FileTransport;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.ghostfs");

    {
        let transport = FileTransport::create(&path, HEADER_SIZE + CLUSTER_SIZE * 4).unwrap();
        format(&transport).unwrap();
        let mut fs = GhostFs::mount(transport).unwrap();
        fs.mkdir("/docs").unwrap();
        fs.create("/docs/note").unwrap();
        fs.sync().unwrap();
    }

    let transport = FileTransport::open(&path).unwrap();
    let mut fs = GhostFs::mount(transport).unwrap();
    let attr = fs.getattr("/docs/note").unwrap();
    assert!(!attr.is_dir);
}

#[test]
fn sync_succeeds_and_preserves_the_entry() {
    let mut fs = mounted(4);
    fs.mkdir("/persisted").unwrap();
    fs.sync().unwrap();

    let attr = fs.getattr("/persisted").unwrap();
    assert!(attr.is_dir);
}
