use mime_stream::{
    copy, read_range, Access, BufferMode, BufferStream, Error, FsStream, MemStream, MmapStream,
    SeekFrom, Stream,
};
use pretty_assertions::assert_eq;
use std::fs::File;
use std::io::Write;

const CONTENT: &[u8] = b"From someone Mon Jan  1 00:00:00 2001\n\
Subject: streams\n\
\n\
The same bytes through every stream variant.\n";

fn temp_file() -> File {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(CONTENT).unwrap();
    file.flush().unwrap();
    file
}

fn variants() -> Vec<(&'static str, Box<dyn Stream>)> {
    let fs = FsStream::with_bounds(temp_file(), 0, None).unwrap();
    let mmap = MmapStream::new(&temp_file(), Access::ReadOnly).unwrap();
    let mem = MemStream::from_slice(CONTENT);
    let buffered_fs = FsStream::with_bounds(temp_file(), 0, None).unwrap();
    vec![
        ("fs", Box::new(fs)),
        ("mmap", Box::new(mmap)),
        ("mem", Box::new(mem)),
        (
            "buffer(fs)",
            Box::new(BufferStream::new(buffered_fs, BufferMode::BlockRead)),
        ),
    ]
}

#[test]
fn variants_read_identically() {
    for (name, mut stream) in variants() {
        assert_eq!(stream.length().unwrap(), Some(CONTENT.len() as u64), "{}", name);
        let mut copied = MemStream::new();
        assert_eq!(copy(&mut stream, &mut copied).unwrap(), CONTENT.len() as u64);
        assert_eq!(copied.as_bytes(), CONTENT, "{}", name);
        assert!(stream.eos(), "{}", name);
    }
}

#[test]
fn variants_seek_identically() {
    for (name, mut stream) in variants() {
        let body = read_range(&mut stream, 56..60).unwrap();
        assert_eq!(body, b"The ", "{}", name);
        assert_eq!(stream.tell(), 60, "{}", name);
        assert_eq!(stream.seek(SeekFrom::Current(-4)).unwrap(), 56, "{}", name);
        assert_eq!(stream.seek(SeekFrom::End(-1)).unwrap(), CONTENT.len() as u64 - 1);
        stream.reset().unwrap();
        assert_eq!(stream.tell(), 0, "{}", name);
        assert!(!stream.eos(), "{}", name);
        assert!(
            matches!(stream.seek(SeekFrom::Current(-1)), Err(Error::OutOfBounds { .. })),
            "{}",
            name
        );
    }
}

#[test]
fn closed_variants_fail_cleanly() {
    for (name, mut stream) in variants() {
        stream.close().unwrap();
        let mut buf = [0u8; 8];
        assert!(matches!(stream.read(&mut buf), Err(Error::Closed)), "{}", name);
    }
}
