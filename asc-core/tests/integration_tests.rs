//! Integration tests for the ASC decoder using synthetic on-disk logs.

use asc_core::{decode_file, AscDecoder, DecodeError, DecoderConfig, Eye, RecordKind};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// A short recording in the shape real converters emit: header block,
/// start markers, samples with trailing flag columns, and end-of-event lines.
const RECORDING: &str = "\
** CONVERTED FROM session01.edf
** DATE: Tue Mar 12 10:15:02 2024
** TYPE: EDF_FILE BINARY EVENT SAMPLE TAGGED
MSG\t1000 DISPLAY_COORDS 0 0 1919 1079
MSG\t1001 TRIALID 1
START\t1002 \tRIGHT\tSAMPLES\tEVENTS
PRESCALER\t1
SFIX R   1002
1002\t  512.3\t  384.7\t  950.0\t...
1003\t  513.0\t  385.1\t  951.0\t...
1004\t  512.8\t  384.9\t  949.0\t...
EFIX R   1002\t1004\t3\t  512.7\t  384.9\t    950
SSACC R  1005
1005\t  530.0\t  390.0\t  948.0\t...
1006\t  600.0\t  410.0\t  947.0\t...
ESACC R  1005\t1006\t2\t  530.0\t  390.0\t  600.0\t  410.0\t   2.31\t    312
SBLINK R 1007
1007\t   .\t   .\t    0.0\t...
1008\t   .\t   .\t    0.0\t...
EBLINK R 1007\t1008\t2
1009\t  601.0\t  411.0\t  900.0\t...
MSG\t1010 Position changed to  LEFT  panel
EFIX X garbage data
END\t1011 \tSAMPLES\tEVENTS\tRES\t  38.00\t  37.50
";

fn write_log(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents).expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

/// Every record kind lands in its own collection, in file order.
#[test]
fn test_decode_recording_counts() {
    let file = write_log(RECORDING.as_bytes());
    let result = decode_file(file.path()).expect("Failed to decode file");

    assert_eq!(result.samples.len(), 8);
    assert_eq!(result.fixations.len(), 1);
    assert_eq!(result.saccades.len(), 1);
    assert_eq!(result.blinks.len(), 1);
    assert_eq!(result.messages.len(), 3);

    let times: Vec<f64> = result.samples.iter().map(|s| s.timestamp).collect();
    assert_eq!(
        times,
        vec![1002.0, 1003.0, 1004.0, 1005.0, 1006.0, 1007.0, 1008.0, 1009.0]
    );

    let texts: Vec<&str> = result.messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "DISPLAY_COORDS 0 0 1919 1079",
            "TRIALID 1",
            "Position changed to  LEFT  panel"
        ]
    );
}

/// Event fields decode to the documented types and values.
#[test]
fn test_decode_recording_fields() {
    let file = write_log(RECORDING.as_bytes());
    let result = decode_file(file.path()).expect("Failed to decode file");

    let fix = &result.fixations[0];
    assert_eq!(fix.eye, Eye::Right);
    assert_eq!((fix.start, fix.end, fix.duration), (1002, 1004, 3));
    assert_eq!((fix.x, fix.y, fix.pupil_size), (512.7, 384.9, 950.0));

    let sacc = &result.saccades[0];
    assert_eq!((sacc.start_x, sacc.start_y), (530.0, 390.0));
    assert_eq!((sacc.end_x, sacc.end_y), (600.0, 410.0));

    let blink = &result.blinks[0];
    assert_eq!((blink.start, blink.end), (1007, 1008));
}

/// Blink-time samples carry missing coordinates, never the previous values.
#[test]
fn test_missing_gaze_samples() {
    let file = write_log(RECORDING.as_bytes());
    let result = decode_file(file.path()).expect("Failed to decode file");

    let blink_samples: Vec<_> = result
        .samples
        .iter()
        .filter(|s| (1007.0..=1008.0).contains(&s.timestamp))
        .collect();
    assert_eq!(blink_samples.len(), 2);
    for sample in blink_samples {
        assert_eq!(sample.x, None);
        assert_eq!(sample.y, None);
        assert_eq!(sample.pupil_size, 0.0);
    }

    assert_eq!(result.samples[7].x, Some(601.0));
    assert_eq!(result.stats.missing_gaze, 2);
}

/// Header lines, start/end markers and start-of-event lines are ignored;
/// the malformed EFIX line is counted and does not stop the pass.
#[test]
fn test_ignored_and_malformed_lines() {
    let file = write_log(RECORDING.as_bytes());
    let result = decode_file(file.path()).expect("Failed to decode file");

    assert_eq!(result.stats.lines, RECORDING.lines().count());
    assert_eq!(result.stats.unrecognized, 9);
    assert_eq!(result.stats.malformed(RecordKind::Fixation), 1);
    assert_eq!(result.stats.total_malformed(), 1);

    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].line_number, 23);
    assert_eq!(result.diagnostics[0].text, "EFIX X garbage data");
}

/// Lines after a malformed line are still decoded.
#[test]
fn test_malformed_line_does_not_abort() {
    let log = "\
EFIX X garbage data
EFIX R 100 250 150 512.3 384.7 950.0
ESACC L 300 340
ESACC L 300 340 40 10.0 10.0 100.0 80.0
";
    let file = write_log(log.as_bytes());
    let result = decode_file(file.path()).expect("Failed to decode file");

    assert_eq!(result.fixations.len(), 1);
    assert_eq!(result.fixations[0].start, 100);
    assert_eq!(result.saccades.len(), 1);
    assert_eq!(result.saccades[0].eye, Eye::Left);
    assert_eq!(result.stats.total_malformed(), 2);
}

#[test]
fn test_empty_file() {
    let file = write_log(b"");
    let result = decode_file(file.path()).expect("Failed to decode file");

    assert!(result.samples.is_empty());
    assert!(result.fixations.is_empty());
    assert!(result.saccades.is_empty());
    assert!(result.blinks.is_empty());
    assert!(result.messages.is_empty());
    assert_eq!(result.stats.lines, 0);
}

#[test]
fn test_nonexistent_path() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let missing = dir.path().join("missing.asc");

    match decode_file(&missing) {
        Err(DecodeError::SourceUnavailable { path, .. }) => {
            assert_eq!(path.as_deref(), Some(missing.as_path()));
        }
        Ok(_) => panic!("Expected SourceUnavailable for {:?}", missing),
    }
}

/// Windows line endings and stray non-UTF-8 bytes are tolerated.
#[test]
fn test_crlf_and_invalid_utf8() {
    let mut log = b"MSG 5 start\r\n1000 1.0 2.0 3.0\r\n".to_vec();
    log.extend_from_slice(b"MSG 6 \xff\xfe bytes\r\n");
    log.extend_from_slice(b"EBLINK L 7 9\r\n");

    let file = write_log(&log);
    let result = decode_file(file.path()).expect("Failed to decode file");

    assert_eq!(result.messages.len(), 2);
    assert_eq!(result.messages[0].text, "start");
    assert_eq!(result.samples.len(), 1);
    assert_eq!(result.blinks.len(), 1);
    assert_eq!(result.blinks[0].end, 9);
}

/// A decoder instance can be reused across files.
#[test]
fn test_decoder_reuse() {
    let first = write_log(b"EBLINK R\n");
    let second = write_log(b"\n\nEBLINK R\n");

    let mut decoder = AscDecoder::with_config(DecoderConfig::new().with_max_diagnostics(10));
    let a = decoder.decode_file(first.path()).expect("Failed to decode file");
    let b = decoder.decode_file(second.path()).expect("Failed to decode file");

    assert_eq!(a.diagnostics[0].line_number, 1);
    assert_eq!(b.diagnostics[0].line_number, 3);
}

/// Independent decoders can run on separate threads.
#[test]
fn test_parallel_decoding() {
    let files: Vec<NamedTempFile> = (0..4)
        .map(|i| write_log(format!("MSG {} file {}\n", i, i).as_bytes()))
        .collect();
    let paths: Vec<&Path> = files.iter().map(|f| f.path()).collect();

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = paths
            .iter()
            .map(|path| scope.spawn(move || decode_file(path)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("Decoder thread panicked"))
            .collect()
    });

    for (i, result) in results.into_iter().enumerate() {
        let result = result.expect("Failed to decode file");
        assert_eq!(result.messages[0].timestamp, i as u64);
        assert_eq!(result.messages[0].text, format!("file {}", i));
    }
}
