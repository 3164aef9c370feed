/*!
 * Integration tests for the preparation handler
 *
 * Tests cover:
 * - Path strategies end to end (mirror, ordered, vendor layouts)
 * - Round-robin output rotation
 * - Hardlink idempotency
 * - Failure handling and counter behaviour
 * - Dry-run mode
 * - Metadata sidecars
 * - The external decompress pipeline for gzip, bzip2 and zip input (skipped
 *   when the tool is unavailable)
 */

use chrono::{TimeZone, Utc};
use filetime::FileTime;
use prepsync::config::{HandlerConfig, OrderedStrategy};
use prepsync::compression::CompressedFormat;
use prepsync::core::TransferMethod;
use prepsync::metadata::MetadataRecord;
use prepsync::{Handler, PrepError, PrepareSyncer, SidecarMetadata};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{tempdir, TempDir};

/// Input directory plus `outputs` output directories under one tempdir
fn workspace(outputs: usize) -> (TempDir, HandlerConfig) {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in");
    fs::create_dir_all(&input).unwrap();
    let output = (0..outputs)
        .map(|i| dir.path().join(format!("out{}", i)))
        .collect();
    (dir, HandlerConfig::new(input, output))
}

fn write_input(config: &HandlerConfig, relative: &str, contents: &str) -> PathBuf {
    let path = config.input.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

fn ordered(config: &mut HandlerConfig, strategy: OrderedStrategy) {
    config.ordered = true;
    config.ordered_strategy = strategy;
}

/// Stored zip archive holding `data.csv` = "id,name\n1,alpha\n"
const DATA_CSV_ZIP: &[u8] = &[
    0x50, 0x4b, 0x03, 0x04, 0x14, 0x00, 0x00, 0x00, 0x00, 0x00, 0xc0, 0x53,
    0x65, 0x52, 0x21, 0xa6, 0xc8, 0x36, 0x10, 0x00, 0x00, 0x00, 0x10, 0x00,
    0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x64, 0x61, 0x74, 0x61, 0x2e, 0x63,
    0x73, 0x76, 0x69, 0x64, 0x2c, 0x6e, 0x61, 0x6d, 0x65, 0x0a, 0x31, 0x2c,
    0x61, 0x6c, 0x70, 0x68, 0x61, 0x0a, 0x50, 0x4b, 0x01, 0x02, 0x14, 0x03,
    0x14, 0x00, 0x00, 0x00, 0x00, 0x00, 0xc0, 0x53, 0x65, 0x52, 0x21, 0xa6,
    0xc8, 0x36, 0x10, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x08, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xa4, 0x01,
    0x00, 0x00, 0x00, 0x00, 0x64, 0x61, 0x74, 0x61, 0x2e, 0x63, 0x73, 0x76,
    0x50, 0x4b, 0x05, 0x06, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00,
    0x36, 0x00, 0x00, 0x00, 0x36, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Whether `program` is on PATH (`unzip` exits non-zero for `--version`)
fn have_program(program: &str) -> bool {
    Command::new(program).arg("--version").output().is_ok()
}

/// Compress `path` in place with an external tool, leaving `<path><suffix>`
fn compress_with(program: &str, path: &Path) {
    assert!(Command::new(program)
        .arg("-f")
        .arg(path)
        .status()
        .unwrap()
        .success());
}

fn gunzip_to_string(path: &Path) -> String {
    let output = Command::new("gzip").arg("-dc").arg(path).output().unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap()
}

#[cfg(unix)]
fn same_inode(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    let (a, b) = (fs::metadata(a).unwrap(), fs::metadata(b).unwrap());
    a.ino() == b.ino() && a.dev() == b.dev()
}

// =============================================================================
// Path Strategy Tests
// =============================================================================

#[test]
fn test_mirror_preserves_relative_path() {
    let (_dir, config) = workspace(1);
    let file = write_input(&config, "vendor/2021/a.csv", "rows");

    let mut handler = Handler::new(config.clone()).unwrap();
    assert!(handler.process(&file));

    let dest = config.output[0].join("vendor/2021/a.csv");
    assert_eq!(fs::read_to_string(&dest).unwrap(), "rows");
    #[cfg(unix)]
    assert!(same_inode(&file, &dest));
}

#[test]
fn test_cmag_date_from_file_name() {
    let (_dir, mut config) = workspace(1);
    ordered(&mut config, OrderedStrategy::Cmag);
    config.ordered_time_pattern = "%Y/%m".to_string();
    let file = write_input(&config, "2021/a-210305-report.csv", "rows");

    let mut handler = Handler::new(config.clone()).unwrap();
    let outcome = handler.try_process(&file).unwrap();

    let expected = config.output[0].join("2021/2021/03/a-210305-report.csv");
    assert_eq!(outcome.destination, expected);
    assert!(expected.exists());
}

#[test]
fn test_default_ordered_flat_file_uses_processing_time() {
    let (_dir, mut config) = workspace(1);
    ordered(&mut config, OrderedStrategy::Default);
    config.ordered_by_processing_time = true;
    let file = write_input(&config, "flat.csv", "rows");

    let mut handler = Handler::new(config.clone())
        .unwrap()
        .with_counter(3)
        .with_processing_time(Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap());
    let outcome = handler.try_process(&file).unwrap();

    assert_eq!(
        outcome.destination,
        config.output[0].join("root/2023/01/02/20230102-030405-3-flat.csv")
    );
    assert!(outcome.destination.exists());
}

#[test]
fn test_default_ordered_uses_mtime() {
    let (_dir, mut config) = workspace(1);
    ordered(&mut config, OrderedStrategy::Default);
    let file = write_input(&config, "feed/day/x.csv", "rows");
    filetime::set_file_mtime(&file, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();

    let mut handler = Handler::new(config.clone())
        .unwrap()
        .with_processing_time(Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap());
    let outcome = handler.try_process(&file).unwrap();

    assert_eq!(
        outcome.destination,
        config.output[0].join("feed/2020/09/13/20230102-030405-0-feed-day-x.csv")
    );
}

#[test]
fn test_datorama_adds_mtime_epoch() {
    let (_dir, mut config) = workspace(1);
    ordered(&mut config, OrderedStrategy::Datorama);
    let file = write_input(&config, "dat/x.csv", "rows");
    filetime::set_file_mtime(&file, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();

    let mut handler = Handler::new(config.clone())
        .unwrap()
        .with_processing_time(Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap());
    let outcome = handler.try_process(&file).unwrap();

    assert_eq!(
        outcome.destination,
        config.output[0].join("dat/2020/09/13/1600000000/20230102-030405-0-dat-x.csv")
    );
}

#[test]
fn test_lotame_date_from_directory() {
    let (_dir, mut config) = workspace(1);
    ordered(&mut config, OrderedStrategy::Lotame);
    let file = write_input(&config, "lotame/batch_2021030512/segments.tsv", "rows");

    let mut handler = Handler::new(config.clone()).unwrap();
    let outcome = handler.try_process(&file).unwrap();

    assert_eq!(
        outcome.destination,
        config.output[0].join("2021/03/05/segments.tsv")
    );
}

#[test]
fn test_silverpop_export_name() {
    let (_dir, mut config) = workspace(1);
    ordered(&mut config, OrderedStrategy::Silverpop);
    let name = "Raw Recipient Data Export Mar 05 2021 10-30-00 AM 1.zip";
    let file = write_input(&config, &format!("sp/{}", name), "not really a zip");

    let mut handler = Handler::new(config.clone()).unwrap();
    let outcome = handler.try_process(&file).unwrap();

    assert_eq!(outcome.method, TransferMethod::Hardlink);
    assert_eq!(outcome.destination, config.output[0].join("sp/2021/03").join(name));
}

#[test]
fn test_vendor_parse_failure_fails_file() {
    let (_dir, mut config) = workspace(1);
    ordered(&mut config, OrderedStrategy::Cmag);
    let file = write_input(&config, "2021/undated.csv", "rows");

    let mut handler = Handler::new(config.clone()).unwrap();
    let err = handler.try_process(&file).unwrap_err();
    assert!(matches!(err, PrepError::Routing { .. }));
    assert_eq!(handler.counter(), 0);
}

// =============================================================================
// Rotation and Lifecycle Tests
// =============================================================================

#[test]
fn test_round_robin_distribution() {
    let (_dir, config) = workspace(3);
    let mut handler = Handler::new(config.clone()).unwrap().with_counter(0);

    for i in 0..7 {
        let file = write_input(&config, &format!("f{}.csv", i), "x");
        assert!(handler.process(&file));
    }

    let counts: Vec<usize> = config
        .output
        .iter()
        .map(|dir| fs::read_dir(dir).unwrap().count())
        .collect();
    assert_eq!(counts, vec![3, 2, 2]);
    assert_eq!(handler.counter(), 7);
}

#[test]
fn test_failure_leaves_counter_and_destination() {
    let (_dir, config) = workspace(2);
    let mut handler = Handler::new(config.clone()).unwrap().with_counter(4);

    let missing = config.input.join("gone.csv");
    assert!(!handler.process(&missing));
    assert_eq!(handler.counter(), 4);
    assert!(!config.output[0].join("gone.csv").exists());
    assert!(!config.output[1].join("gone.csv").exists());
}

#[test]
fn test_hardlink_is_idempotent() {
    let (_dir, config) = workspace(1);
    let file = write_input(&config, "a.csv", "first");

    let mut handler = Handler::new(config.clone()).unwrap();
    assert!(handler.process(&file));
    assert!(handler.process(&file));

    let dest = config.output[0].join("a.csv");
    assert_eq!(fs::read_to_string(&dest).unwrap(), "first");
    assert_eq!(handler.counter(), 2);
}

#[test]
fn test_syncer_processes_whole_tree() {
    let (_dir, config) = workspace(2);
    write_input(&config, "a.csv", "a");
    write_input(&config, "b/c.csv", "c");
    write_input(&config, "b/d.csv", "d");

    let handler = Handler::new(config.clone()).unwrap().with_counter(0);
    let mut syncer = PrepareSyncer::new(handler);
    let summary = syncer.sync().unwrap();

    assert_eq!(summary.processed, 3);
    assert!(summary.is_clean());
    assert!(config.output[0].join("a.csv").exists());
    assert!(config.output[1].join("b/c.csv").exists());
    assert!(config.output[0].join("b/d.csv").exists());
    assert_eq!(syncer.handler().counter(), 3);
}

// =============================================================================
// Dry-Run and Metadata Tests
// =============================================================================

#[test]
fn test_dry_run_touches_nothing() {
    let (_dir, mut config) = workspace(1);
    config.dry_run = true;
    config.metadata = true;
    let file = write_input(&config, "sub/a.csv", "rows");

    let mut handler = Handler::new(config.clone()).unwrap();
    assert!(handler.process(&file));

    assert!(!config.output[0].exists());
    assert_eq!(handler.counter(), 1);
    let summary = handler.dry_run_summary();
    assert_eq!(summary.link_count, 1);
    assert_eq!(summary.mkdir_count, 1);
    assert_eq!(summary.command_count, 0);
}

#[test]
fn test_metadata_sidecar_written() {
    let (_dir, mut config) = workspace(1);
    config.metadata = true;
    let file = write_input(&config, "a.csv", "abc");

    let mut handler = Handler::new(config.clone()).unwrap();
    assert!(handler.process(&file));

    let sidecar = SidecarMetadata::sidecar_path(&config.output[0].join("a.csv"));
    let record: MetadataRecord = serde_json::from_slice(&fs::read(sidecar).unwrap()).unwrap();
    assert_eq!(record.file, "a.csv");
    assert_eq!(record.size, 3);
    assert_eq!(
        record.sha256,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

// =============================================================================
// Decompress Pipeline Tests
// =============================================================================

#[test]
fn test_gzip_input_is_expanded() {
    if !have_program("gzip") {
        eprintln!("gzip not available, skipping");
        return;
    }

    let (_dir, mut config) = workspace(1);
    config.uncompress_input = true;
    config.metadata = true;
    let plain = write_input(&config, "feed/a.csv", "one,two\n");
    compress_with("gzip", &plain);
    let file = config.input.join("feed/a.csv.gz");

    let mut handler = Handler::new(config.clone()).unwrap();
    let outcome = handler.try_process(&file).unwrap();

    let expected = config.output[0].join("feed/a.csv");
    assert_eq!(outcome.destination, expected);
    assert_eq!(fs::read_to_string(&expected).unwrap(), "one,two\n");
    assert!(SidecarMetadata::sidecar_path(&expected).exists());
}

#[test]
fn test_gzip_output_recompresses() {
    if !have_program("gzip") {
        eprintln!("gzip not available, skipping");
        return;
    }

    let (_dir, mut config) = workspace(1);
    config.uncompress_input = true;
    config.gzip_output = true;
    let plain = write_input(&config, "a.csv", "rows\n");
    compress_with("gzip", &plain);
    let file = config.input.join("a.csv.gz");

    let mut handler = Handler::new(config.clone()).unwrap();
    let outcome = handler.try_process(&file).unwrap();

    assert_eq!(outcome.destination, config.output[0].join("a.csv.gz"));
    assert_eq!(gunzip_to_string(&outcome.destination), "rows\n");
    assert!(!config.output[0].join("a.csv").exists());
}

#[test]
fn test_bzip2_input_is_expanded() {
    if !have_program("bzip2") {
        eprintln!("bzip2 not available, skipping");
        return;
    }

    let (_dir, mut config) = workspace(1);
    config.uncompress_input = true;
    let plain = write_input(&config, "feed/a.tsv", "x\ty\n");
    compress_with("bzip2", &plain);
    let file = config.input.join("feed/a.tsv.bz2");

    let mut handler = Handler::new(config.clone()).unwrap();
    let outcome = handler.try_process(&file).unwrap();

    assert_eq!(
        outcome.method,
        TransferMethod::Pipeline {
            format: CompressedFormat::Bzip2,
            recompressed: false
        }
    );
    assert_eq!(outcome.destination, config.output[0].join("feed/a.tsv"));
    assert_eq!(fs::read_to_string(&outcome.destination).unwrap(), "x\ty\n");
}

#[test]
fn test_zip_input_is_expanded() {
    if !have_program("unzip") {
        eprintln!("unzip not available, skipping");
        return;
    }

    let (_dir, mut config) = workspace(1);
    config.uncompress_input = true;
    let file = config.input.join("feed/data.csv.zip");
    fs::create_dir_all(file.parent().unwrap()).unwrap();
    fs::write(&file, DATA_CSV_ZIP).unwrap();

    let mut handler = Handler::new(config.clone()).unwrap();
    let outcome = handler.try_process(&file).unwrap();

    let expected = config.output[0].join("feed/data.csv");
    assert_eq!(outcome.destination, expected);
    assert_eq!(fs::read_to_string(&expected).unwrap(), "id,name\n1,alpha\n");
    assert_eq!(fs::read_dir(config.output[0].join("feed")).unwrap().count(), 1);
}

#[test]
fn test_zip_input_with_gzip_output() {
    if !have_program("unzip") || !have_program("gzip") {
        eprintln!("unzip or gzip not available, skipping");
        return;
    }

    let (_dir, mut config) = workspace(1);
    config.uncompress_input = true;
    config.gzip_output = true;
    config.metadata = true;
    let file = config.input.join("data.csv.zip");
    fs::write(&file, DATA_CSV_ZIP).unwrap();

    let mut handler = Handler::new(config.clone()).unwrap();
    let outcome = handler.try_process(&file).unwrap();

    let expected = config.output[0].join("data.csv.gz");
    assert_eq!(outcome.destination, expected);
    assert_eq!(gunzip_to_string(&expected), "id,name\n1,alpha\n");
    assert!(!config.output[0].join("data.csv").exists());
    assert!(SidecarMetadata::sidecar_path(&expected).exists());
}

#[test]
fn test_expanded_output_leaves_linked_input_intact() {
    if !have_program("gzip") {
        eprintln!("gzip not available, skipping");
        return;
    }

    let (_dir, mut config) = workspace(1);
    config.uncompress_input = true;
    let original = write_input(&config, "a.csv", "ORIGINAL INPUT\n");
    let packed = write_input(&config, "packed/a.csv", "NEW CONTENT\n");
    compress_with("gzip", &packed);
    fs::rename(
        config.input.join("packed/a.csv.gz"),
        config.input.join("a.csv.gz"),
    )
    .unwrap();
    fs::remove_dir(config.input.join("packed")).unwrap();

    // `a.csv` is linked first, then `a.csv.gz` expands onto the same name
    let mut syncer = PrepareSyncer::new(Handler::new(config.clone()).unwrap());
    let summary = syncer.sync().unwrap();

    assert_eq!(summary.processed, 2);
    assert!(summary.is_clean());
    assert_eq!(fs::read_to_string(&original).unwrap(), "ORIGINAL INPUT\n");
    assert_eq!(
        fs::read_to_string(config.output[0].join("a.csv")).unwrap(),
        "NEW CONTENT\n"
    );
}

#[test]
fn test_corrupt_archive_fails_file() {
    if !have_program("gzip") {
        eprintln!("gzip not available, skipping");
        return;
    }

    let (_dir, mut config) = workspace(1);
    config.uncompress_input = true;
    config.cleanup_partial_output = true;
    let file = write_input(&config, "bad.csv.gz", "definitely not gzip");

    let mut handler = Handler::new(config.clone()).unwrap();
    let err = handler.try_process(&file).unwrap_err();

    assert!(matches!(err, PrepError::Transfer { .. }));
    assert_eq!(handler.counter(), 0);
    assert!(!config.output[0].join("bad.csv").exists());
}
