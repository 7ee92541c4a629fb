use flac_fixer::Error;
use flac_fixer::batch::{Batch, Candidate, Totals, collect};
use flac_fixer::fixer::{FileError, Options, Outcome};
use flac_fixer::metadata::{Block, BlockType, Opaque, Padding, Picture, write_blocks};
use flac_fixer::report::{write_footer, write_outcome};
use std::path::Path;

fn write_flac(path: &Path, picture_size: Option<usize>, padding: u16) {
    let mut blocks: Vec<Block> = vec![
        Opaque {
            block_type: BlockType::Streaminfo,
            data: vec![0; 34],
        }
        .into(),
    ];

    if let Some(size) = picture_size {
        blocks.push(
            Picture {
                picture_type: Picture::FRONT_COVER,
                media_type: "image/jpeg".to_owned(),
                description: String::new(),
                width: 1000,
                height: 1000,
                color_depth: 24,
                colors_used: 0,
                data: std::iter::repeat_with(|| fastrand::u8(..))
                    .take(size)
                    .collect(),
            }
            .into(),
        );
    }

    blocks.push(
        Padding {
            size: padding.into(),
        }
        .into(),
    );

    let mut flac = vec![];
    write_blocks(&mut flac, &blocks).unwrap();
    flac.extend(std::iter::repeat_with(|| fastrand::u8(..)).take(10_000));
    std::fs::write(path, flac).unwrap();
}

fn run(candidates: &[Candidate], options: Options) -> (Vec<Outcome>, Totals) {
    let mut outcomes = vec![];
    let totals = Batch::new(options)
        .run(candidates, |outcome| {
            outcomes.push(outcome.clone());
            Ok::<_, FileError>(())
        })
        .unwrap();
    (outcomes, totals)
}

#[test]
fn test_no_valid_inputs() {
    let dir = tempfile::tempdir().unwrap();

    assert!(matches!(
        collect(&[dir.path().join("missing"), dir.path().join("also missing")]),
        Err(Error::InvalidInput)
    ));

    // an existing but empty directory is valid
    assert!(collect(&[dir.path()]).unwrap().is_empty());
}

#[test]
fn test_collect_order() {
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("sub");
    std::fs::create_dir(&sub).unwrap();
    for path in [
        sub.join("c.flac"),
        dir.path().join("b.flac"),
        dir.path().join("a.flac"),
    ] {
        std::fs::write(path, b"").unwrap();
    }

    let candidates = collect(&[
        dir.path().to_owned(),
        dir.path().join("missing"),
        dir.path().join("a.flac"),
    ])
    .unwrap();

    // files are sorted by name, listed once,
    // and all share the directory they were found under
    assert_eq!(
        candidates,
        vec![
            Candidate {
                path: dir.path().join("a.flac"),
                base: dir.path().to_owned(),
            },
            Candidate {
                path: dir.path().join("b.flac"),
                base: dir.path().to_owned(),
            },
            Candidate {
                path: sub.join("c.flac"),
                base: dir.path().to_owned(),
            },
        ]
    );

    // a file given directly is its own base
    let candidates = collect(&[dir.path().join("b.flac"), sub.clone()]).unwrap();
    assert_eq!(
        candidates,
        vec![
            Candidate {
                path: dir.path().join("b.flac"),
                base: dir.path().join("b.flac"),
            },
            Candidate {
                path: sub.join("c.flac"),
                base: sub.clone(),
            },
        ]
    );
}

#[test]
fn test_batch_totals() {
    let dir = tempfile::tempdir().unwrap();
    write_flac(&dir.path().join("01.flac"), Some(20_000), 2048);
    write_flac(&dir.path().join("02.flac"), None, 10240);
    write_flac(&dir.path().join("03.flac"), None, 0);
    std::fs::write(dir.path().join("cover.txt"), b"not FLAC").unwrap();

    let candidates = collect(&[dir.path()]).unwrap();
    assert_eq!(candidates.len(), 4);

    let (outcomes, totals) = run(&candidates, Options::default());

    // the text file is skipped entirely
    assert_eq!(outcomes.len(), 3);
    assert_eq!(totals.files, 3);

    assert!(outcomes[0].size_reduction() > 0);
    assert_eq!(outcomes[1].size_reduction(), 0);
    assert_eq!(outcomes[2].size_reduction(), -8192);

    assert_eq!(totals.removed, outcomes[0].size_reduction() as u64);
    assert_eq!(totals.added, 8192);
}

#[test]
fn test_batch_check_only() {
    let dir = tempfile::tempdir().unwrap();
    write_flac(&dir.path().join("01.flac"), Some(20_000), 2048);
    write_flac(&dir.path().join("02.flac"), Some(20_000), 0);
    let candidates = collect(&[dir.path()]).unwrap();

    let mut batch = Batch::new(Options {
        check_only: true,
        save_pictures: true,
        ..Options::default()
    });
    let totals = batch
        .run(&candidates, |_| Ok::<_, FileError>(()))
        .unwrap();

    assert_eq!(totals.files, 2);
    assert_eq!(totals.removed, 0);
    assert_eq!(totals.added, 0);
    assert_eq!(batch.totals(), totals);
    assert!(!dir.path().join("cover.jpg").exists());
}

#[test]
fn test_batch_report_failure() {
    let dir = tempfile::tempdir().unwrap();
    write_flac(&dir.path().join("01.flac"), Some(20_000), 2048);
    write_flac(&dir.path().join("02.flac"), Some(20_000), 2048);
    let untouched = std::fs::read(dir.path().join("02.flac")).unwrap();
    let candidates = collect(&[dir.path()]).unwrap();

    let mut batch = Batch::new(Options::default());
    let mut reported = 0;
    let result = batch.run(
        &candidates,
        |_| -> Result<(), Box<dyn std::error::Error>> {
            reported += 1;
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into())
        },
    );

    // the run stops at the first failed report,
    // leaving later files as they were
    assert_eq!(
        result
            .unwrap_err()
            .downcast_ref::<std::io::Error>()
            .map(|err| err.kind()),
        Some(std::io::ErrorKind::BrokenPipe)
    );
    assert_eq!(reported, 1);
    assert_eq!(batch.totals().files, 1);
    assert_eq!(
        std::fs::read(dir.path().join("02.flac")).unwrap(),
        untouched
    );
}

#[test]
fn test_batch_archiver() {
    let dir = tempfile::tempdir().unwrap();
    write_flac(&dir.path().join("01.flac"), Some(20_000), 2048);
    let picture = std::fs::read(dir.path().join("01.flac")).unwrap()[4 + 4 + 34 + 4 + 32 + 10..]
        [..20_000]
        .to_vec();
    let candidates = collect(&[dir.path()]).unwrap();

    let mut batch = Batch::new(Options {
        save_pictures: true,
        ..Options::default()
    });
    batch
        .run(&candidates, |_| Ok::<_, FileError>(()))
        .unwrap();

    // the archiver lives as long as the batch
    assert!(batch.archiver().is_archived(&picture));
    assert_eq!(batch.archiver().location_count(dir.path()), 1);
    assert_eq!(
        std::fs::read(dir.path().join("cover.jpg")).unwrap(),
        picture
    );
}

#[test]
fn test_report_check_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("01.flac");
    write_flac(&path, Some(20_000), 2048);

    let (outcomes, _) = run(
        &collect(&[&path]).unwrap(),
        Options {
            check_only: true,
            ..Options::default()
        },
    );

    let mut output = vec![];
    write_outcome(&mut output, &outcomes[0]).unwrap();
    let size = std::fs::metadata(&path).unwrap().len();

    assert_eq!(
        String::from_utf8(output).unwrap(),
        format!(
            "------------------------------------\n\
             01.flac ({})\n \
             Padding block: 2.0 KiB\n \
             Picture: 1000×1000 image/jpeg (19.5 KiB)\n",
            flac_fixer::report::Bytes(size)
        )
    );
}

#[test]
fn test_report_changes() {
    let dir = tempfile::tempdir().unwrap();
    write_flac(&dir.path().join("01.flac"), Some(20_000), 2048);
    write_flac(&dir.path().join("02.flac"), None, 10240);

    let (outcomes, totals) = run(&collect(&[dir.path()]).unwrap(), Options::default());

    let mut output = vec![];
    write_outcome(&mut output, &outcomes[0]).unwrap();
    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("\n 1 pictures removed\n"));
    assert!(output.contains("\n New padding: 8.0 KiB\n"));
    assert!(output.contains("\n File size reduction: "));

    let mut output = vec![];
    write_outcome(&mut output, &outcomes[1]).unwrap();
    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("\n No pictures found\n"));
    assert!(output.contains("\n Padding was left as found: 10.0 KiB\n"));
    assert!(!output.contains("File size"));

    let mut output = vec![];
    write_footer(&mut output, &totals).unwrap();
    assert_eq!(
        String::from_utf8(output).unwrap(),
        format!(
            "------------------------------------\n\nA total of {} was removed\n",
            flac_fixer::report::Bytes(totals.removed)
        )
    );
}

#[test]
fn test_report_footer() {
    fn footer(totals: Totals) -> String {
        let mut output = vec![];
        write_footer(&mut output, &totals).unwrap();
        String::from_utf8(output).unwrap()
    }

    const SEPARATOR: &str = "------------------------------------\n";

    // a single file gets no totals
    assert_eq!(
        footer(Totals {
            files: 1,
            removed: 4096,
            added: 0,
        }),
        SEPARATOR
    );

    // nor does a run with no changes
    assert_eq!(footer(Totals::default()), SEPARATOR);

    assert_eq!(
        footer(Totals {
            files: 3,
            removed: 4096,
            added: 8192,
        }),
        format!("{SEPARATOR}\nA total of 4.0 KiB was removed\nA total of 8.0 KiB was added\n")
    );
}
