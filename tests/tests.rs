use lvpack::{
    compress, decompress, Chunk, EncoderBuilder, LvError, LzssBackend, Pack, PackDialect,
};
use std::sync::Arc;
use std::thread;

/// Small xorshift generator so test data is the same on every run
struct XorShift(u32);

impl XorShift {
    fn next_byte(&mut self) -> u8 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        (x >> 24) as u8
    }

    fn bytes(&mut self, n: usize) -> Vec<u8> {
        (0..n).map(|_| self.next_byte()).collect()
    }

    /// bytes drawn from a tiny alphabet, so there are plenty of repeats
    fn texty(&mut self, n: usize) -> Vec<u8> {
        (0..n).map(|_| b"abcd efg"[(self.next_byte() % 8) as usize]).collect()
    }
}

fn roundtrip(input: &[u8], backend: LzssBackend) -> Result<Vec<u8>, LvError> {
    let compressed = EncoderBuilder::for_bytes(input)
        .lzss_backend(backend)
        .encode_to_vec()?;
    let decompressed = decompress(&compressed, input.len())?;
    assert_eq!(input, decompressed.as_slice(), "{:?} roundtrip", backend);

    Ok(compressed)
}

fn le32s(vals: &[u32]) -> Vec<u8> {
    vals.iter().flat_map(|v| v.to_le_bytes().to_vec()).collect()
}

#[test]
fn roundtrip_short_inputs() -> Result<(), LvError> {
    let mut rng = XorShift(0x1234_5678);

    for len in 1..=80 {
        let random = rng.bytes(len);
        let texty = rng.texty(len);
        for &backend in &[LzssBackend::Longest, LzssBackend::FirstFit] {
            roundtrip(&random, backend)?;
            roundtrip(&texty, backend)?;
        }
    }

    Ok(())
}

#[test]
fn roundtrip_zeros_match_the_fresh_dictionary() -> Result<(), LvError> {
    let zeros = vec![0u8; 1000];
    let compressed = roundtrip(&zeros, LzssBackend::Longest)?;
    // every token can be a back-reference into the zero filled dictionary
    assert!(compressed.len() < 150, "{} bytes", compressed.len());

    Ok(())
}

#[test]
fn roundtrip_repeated_byte_run() -> Result<(), LvError> {
    let run = vec![b'A'; 200];
    for &backend in &[LzssBackend::Longest, LzssBackend::FirstFit] {
        let compressed = roundtrip(&run, backend)?;
        assert!(compressed.len() < 50, "{:?}: {} bytes", backend, compressed.len());
    }

    Ok(())
}

#[test]
fn dictionary_wraps_around() -> Result<(), LvError> {
    let mut rng = XorShift(0xdead_beef);
    let mut input = rng.bytes(5000);
    // bytes 4100.. sit at dictionary index 4.. once the cursor has wrapped
    let repeated = input[4100..4160].to_vec();
    input.extend_from_slice(&repeated);
    input.extend(rng.texty(3000));

    for &backend in &[LzssBackend::Longest, LzssBackend::FirstFit] {
        let compressed = roundtrip(&input, backend)?;
        let all_literals = input.len() + (input.len() + 7) / 8;
        assert!(compressed.len() + 40 < all_literals);
    }

    Ok(())
}

#[test]
fn hand_built_stream_across_the_wrap() -> Result<(), LvError> {
    // 4096 literals fill the dictionary, then 'Z' overwrites index 0 and a
    // reference copies three bytes starting at index 0xfff. The read wraps to
    // index 0, then reads index 1, which the same copy has just written.
    let mut src = Vec::new();
    let mut expected = Vec::new();
    for group in 0..512 {
        src.push(0xff);
        for i in 0..8 {
            let byte = (group * 8 + i) as u8;
            src.push(byte);
            expected.push(byte);
        }
    }
    src.extend(&[0b0000_0001, b'Z', 0xff, 0x0f]);
    expected.extend(&[b'Z', 0xff, b'Z', 0xff]);

    assert_eq!(decompress(&src, expected.len())?, expected);

    Ok(())
}

#[test]
fn first_fit_matches_the_legacy_packer() -> Result<(), LvError> {
    let input = b"THE LOST VIKINGS THE LOST VIKINGS ERIK BALEOG OLAF VIKINGS";
    let expected = [
        0xff, 0x54, 0x48, 0x45, 0x20, 0x4c, 0x4f, 0x53, 0x54, 0xff, 0x20, 0x56, 0x49, 0x4b, 0x49,
        0x4e, 0x47, 0x53, 0xfd, 0x20, 0x00, 0xe0, 0x45, 0x52, 0x49, 0x4b, 0x20, 0x42, 0xff, 0x41,
        0x4c, 0x45, 0x4f, 0x47, 0x20, 0x4f, 0x4c, 0x03, 0x41, 0x46, 0x08, 0x50,
    ];

    let compressed = roundtrip(input, LzssBackend::FirstFit)?;
    assert_eq!(compressed, &expected[..]);

    Ok(())
}

#[test]
fn decompressed_size_is_exact() -> Result<(), LvError> {
    let input = b"size fidelity size fidelity size fidelity";
    let compressed = compress(input)?;

    // asking for less stops early, asking for more runs off the end of the source
    assert_eq!(decompress(&compressed, 10)?, &input[..10]);
    assert!(decompress(&compressed, input.len() + 1).is_err());

    Ok(())
}

#[test]
fn primary_pack_rebuilds_byte_for_byte() -> Result<(), LvError> {
    let mut file = le32s(&[3, 16, 20, 30]);
    file.resize(40, 0);

    let pack = Pack::open(&file, PackDialect::Primary)?;
    let sizes: Vec<usize> = pack.chunks().map(Chunk::size).collect();
    assert_eq!(sizes, vec![4, 10, 10]);
    assert_eq!(pack.to_vec()?, file);

    Ok(())
}

#[test]
fn extended_pack_rebuild_keeps_flags() -> Result<(), LvError> {
    let mut file = le32s(&[12, 20 | lvpack::format::CHUNK_FLAG, 28]);
    file.extend(le32s(&[5, 0xdead]));
    file.extend(le32s(&[6, 0xbeef]));

    let pack = Pack::open(&file, PackDialect::Extended)?;
    assert!(pack.get_chunk(1)?.is_flagged());
    assert_eq!(pack.to_vec()?, file);

    Ok(())
}

#[test]
fn packs_survive_a_rebuild() -> Result<(), LvError> {
    let mut rng = XorShift(42);
    let originals: Vec<Vec<u8>> = vec![
        rng.texty(300),
        b"tiny".to_vec(),
        rng.bytes(700),
        vec![9; 2000],
        rng.texty(5000),
    ];

    for &dialect in &[PackDialect::Primary, PackDialect::Extended] {
        let pack = Pack::from_chunks(dialect, &originals, LzssBackend::Longest)?;
        let bytes = pack.to_vec()?;
        assert_eq!(bytes.len(), pack.file_len());

        let reopened = Pack::open(&bytes, dialect)?;
        assert_eq!(reopened, pack);

        for (chunk, original) in reopened.chunks().zip(&originals) {
            assert_eq!(chunk.header_width(), dialect.header_width());
            assert_eq!(chunk.decompressed_size(), original.len());
            assert_eq!(&chunk.decompress()?, original);
        }
    }

    Ok(())
}

#[test]
fn replaced_chunk_survives_a_rebuild() -> Result<(), LvError> {
    let mut pack = Pack::from_chunks(
        PackDialect::Primary,
        &[&b"HUD image"[..], b"level header", b"palette"],
        LzssBackend::FirstFit,
    )?;
    let replacement = b"a much longer replacement for the level header".repeat(4);
    pack.replace_chunk(1, &replacement, LzssBackend::FirstFit)?;

    let reopened = Pack::open(&pack.to_vec()?, PackDialect::Primary)?;
    assert_eq!(reopened.decompress_chunk(0)?, b"HUD image");
    assert_eq!(reopened.decompress_chunk(1)?, replacement);
    assert_eq!(reopened.decompress_chunk(2)?, b"palette");

    Ok(())
}

#[test]
fn chunks_decompress_concurrently() -> Result<(), LvError> {
    let mut rng = XorShift(7);
    let originals: Vec<Vec<u8>> = (0..6).map(|_| rng.texty(1500)).collect();
    let pack = Arc::new(Pack::from_chunks(
        PackDialect::Extended,
        &originals,
        LzssBackend::Longest,
    )?);

    let handles: Vec<_> = (0..pack.len())
        .map(|i| {
            let pack = Arc::clone(&pack);
            thread::spawn(move || pack.decompress_chunk(i))
        })
        .collect();

    for (handle, original) in handles.into_iter().zip(&originals) {
        let decoded = handle.join().expect("decoder thread panicked")?;
        assert_eq!(&decoded, original);
    }

    Ok(())
}

#[test]
fn non_monotonic_table_is_a_format_error() {
    let mut file = le32s(&[4, 20, 30, 25, 40]);
    file.resize(60, 0);

    match Pack::open(&file, PackDialect::Primary) {
        Err(LvError::Format(msg)) => assert!(msg.contains("not increasing"), "{}", msg),
        other => panic!("expected a format error, got {:?}", other),
    }
}

#[test]
fn files_roundtrip_through_disk() -> Result<(), LvError> {
    let tmp = tempfile::tempdir()?;
    let raw_path = tmp.path().join("level.bin");
    let lzss_path = tmp.path().join("level.lz");
    let pack_path = tmp.path().join("DATA.DAT");

    let mut rng = XorShift(99);
    let level = rng.texty(2500);
    std::fs::write(&raw_path, &level)?;

    EncoderBuilder::for_file(&raw_path)?
        .lzss_backend(LzssBackend::FirstFit)
        .encode_to_file(&lzss_path)?;
    let compressed = std::fs::read(&lzss_path)?;
    assert_eq!(decompress(&compressed, level.len())?, level);

    let pack = Pack::from_chunks(
        PackDialect::Extended,
        &[&level[..], b"palette"],
        LzssBackend::Longest,
    )?;
    pack.write_to_file(&pack_path)?;

    let reopened = Pack::from_file(&pack_path, PackDialect::Extended)?;
    assert_eq!(reopened, pack);
    assert_eq!(reopened.decompress_chunk(0)?, level);

    Ok(())
}
