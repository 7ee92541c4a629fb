use flac_fixer::Error;
use flac_fixer::metadata::{
    Block, BlockType, Opaque, Padding, Picture, read_blocks, write_blocks,
};

fn streaminfo() -> Block {
    Opaque {
        block_type: BlockType::Streaminfo,
        data: vec![0; 34],
    }
    .into()
}

fn comment() -> Block {
    Opaque {
        block_type: BlockType::VorbisComment,
        data: b"\x09\x00\x00\x00reference\x00\x00\x00\x00".to_vec(),
    }
    .into()
}

fn picture(data: Vec<u8>) -> Block {
    Picture {
        picture_type: Picture::FRONT_COVER,
        media_type: "image/png".to_owned(),
        description: "front".to_owned(),
        width: 32,
        height: 24,
        color_depth: 24,
        colors_used: 0,
        data,
    }
    .into()
}

fn basic_blocks() -> Vec<Block> {
    vec![
        streaminfo(),
        comment(),
        picture((0..=255).collect()),
        Padding {
            size: 100u8.into(),
        }
        .into(),
    ]
}

fn perform_test(f: impl FnOnce(&mut Vec<Block>)) -> Result<(), Error> {
    let mut blocks = basic_blocks();
    f(&mut blocks);
    write_blocks(std::io::sink(), &blocks)
}

#[test]
fn test_block_roundtrips() {
    use std::io::Read;

    let blocks = basic_blocks();
    let audio = (0..1000).map(|_| fastrand::u8(..)).collect::<Vec<_>>();

    let mut flac = vec![];
    write_blocks(&mut flac, &blocks).unwrap();
    let metadata_len = flac.len();
    flac.extend_from_slice(&audio);

    let mut data = std::io::Cursor::new(flac.as_slice());
    let read = read_blocks(data.by_ref())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(read, blocks);

    // reading stops right where the audio begins
    assert_eq!(data.position() as usize, metadata_len);
    let mut rest = vec![];
    data.read_to_end(&mut rest).unwrap();
    assert_eq!(rest, audio);

    // and writing the blocks back gives the same bytes
    let mut rewritten = vec![];
    write_blocks(&mut rewritten, &read).unwrap();
    assert_eq!(rewritten.as_slice(), &flac[..metadata_len]);
}

#[test]
fn test_block_sizes() {
    let blocks = basic_blocks();
    let mut flac = vec![];
    write_blocks(&mut flac, &blocks).unwrap();

    assert_eq!(
        flac.len() as u64,
        4 + blocks
            .iter()
            .map(|b| b.total_size().unwrap())
            .sum::<u64>()
    );

    // eight 32-bit fields, "image/png", "front" and 256 data bytes
    assert_eq!(blocks[2].size().unwrap().get(), 32 + 9 + 5 + 256);
}

#[test]
fn test_write_metadata() {
    assert!(matches!(perform_test(|_| { /* do nothing */ }), Ok(())));

    // STREAMINFO must be present
    assert!(matches!(
        perform_test(|blocks| {
            blocks.remove(0);
        }),
        Err(Error::MissingStreaminfo)
    ));

    // STREAMINFO must always be first
    assert!(matches!(
        perform_test(|blocks| {
            blocks.swap(0, 1);
        }),
        Err(Error::MissingStreaminfo)
    ));

    // only one STREAMINFO allowed
    assert!(matches!(
        perform_test(|blocks| {
            blocks.push(streaminfo());
        }),
        Err(Error::MultipleStreaminfo)
    ));

    // any number of PICTURE and PADDING blocks are fine
    assert!(matches!(
        perform_test(|blocks| {
            blocks.push(picture(vec![1, 2, 3]));
            blocks.push(Padding::default().into());
        }),
        Ok(())
    ));

    // blocks must fit in 24 bits
    assert!(matches!(
        perform_test(|blocks| {
            blocks.push(picture(vec![0; 1 << 24]));
        }),
        Err(Error::ExcessiveBlockSize)
    ));
}

#[test]
fn test_read_metadata() {
    fn read(flac: &[u8]) -> Result<Vec<Block>, Error> {
        read_blocks(flac).collect()
    }

    let mut flac = vec![];
    write_blocks(&mut flac, &basic_blocks()).unwrap();
    assert!(read(&flac).is_ok());

    // not a FLAC file at all
    assert!(matches!(read(b"RIFF\x00\x00\x00\x00WAVE"), Err(Error::MissingFlacTag)));
    assert!(matches!(read(b"fL"), Err(Error::MissingFlacTag)));
    assert!(matches!(read(b""), Err(Error::MissingFlacTag)));
    assert!(read(b"fL").unwrap_err().is_not_flac());

    // STREAMINFO must be first
    let mut no_streaminfo = vec![];
    write_blocks(&mut no_streaminfo, &[streaminfo(), comment()]).unwrap();
    no_streaminfo.drain(4..4 + 4 + 34);
    assert!(matches!(read(&no_streaminfo), Err(Error::MissingStreaminfo)));

    // a block type of 127 is invalid
    let mut invalid = flac.clone();
    invalid[4 + 4 + 34] = 0x7F;
    assert!(matches!(read(&invalid), Err(Error::InvalidMetadataBlock)));

    // a truncated file can't be read, and is broken rather than foreign
    let err = read(&flac[..flac.len() - 10]).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(!err.is_not_flac());

    // even when cut off partway through STREAMINFO
    let err = read(&flac[..4 + 4 + 10]).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(!err.is_not_flac());
}

#[test]
fn test_block_size_mismatch() {
    let mut flac = vec![];
    write_blocks(&mut flac, &[streaminfo(), picture(vec![1, 2, 3, 4])]).unwrap();

    // claim the PICTURE is 4 bytes larger than its contents
    let header = 4 + 4 + 34;
    let size = u32::from_be_bytes([0, flac[header + 1], flac[header + 2], flac[header + 3]]) + 4;
    flac[header + 1..header + 4].copy_from_slice(&size.to_be_bytes()[1..]);
    flac.extend_from_slice(&[0; 4]);

    assert!(matches!(
        read_blocks(flac.as_slice()).collect::<Result<Vec<_>, _>>(),
        Err(Error::InvalidMetadataBlockSize)
    ));
}

#[test]
fn test_reserved_blocks() {
    let blocks = vec![
        streaminfo(),
        Opaque {
            block_type: BlockType::Reserved(42),
            data: vec![1, 2, 3],
        }
        .into(),
    ];

    let mut flac = vec![];
    write_blocks(&mut flac, &blocks).unwrap();
    assert_eq!(
        read_blocks(flac.as_slice())
            .collect::<Result<Vec<_>, _>>()
            .unwrap(),
        blocks
    );
}
