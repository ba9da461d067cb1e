use flate2::write::GzEncoder;
use std::io::prelude::*;

use gzjson_stream::errors::ErrorKind;
use gzjson_stream::{Config, Pipeline, Summary};

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Runs the whole pipeline over `compressed`, returning the emitted objects as strings
fn extract(compressed: &[u8], chunk_size: usize) -> (Vec<String>, Summary) {
    let mut objects = Vec::new();
    let pipeline = Pipeline::new(compressed, &Config::new().chunk_size(chunk_size)).unwrap();
    let summary = pipeline
        .run(|object| {
            objects.push(String::from_utf8(object.to_vec()).unwrap());
            Ok(())
        })
        .unwrap();
    (objects, summary)
}

fn sample_objects() -> Vec<String> {
    (0..500)
        .map(|i| {
            format!(
                r#"{{"id":{},"user":{{"name":"user-{}","bio":"likes {{braces}} and \"quotes\""}},"tags":["a","b{{"]}}"#,
                i, i
            )
        })
        .collect()
}

#[test]
fn extracts_every_object_in_order() {
    let objects = sample_objects();
    let payload = objects.join("\n");
    let compressed = gzip(payload.as_bytes());

    let (extracted, summary) = extract(&compressed, 1024);

    assert_eq!(extracted, objects);
    assert_eq!(summary.objects, objects.len() as u64);
    assert_eq!(summary.compressed_bytes, compressed.len() as u64);
    assert_eq!(summary.decompressed_bytes, payload.len() as u64);
    assert_eq!(summary.truncated, None);
}

#[test]
fn reassembly_matches_payload_without_separators() {
    let objects = sample_objects();
    let payload = objects.join(" \r\n\t");
    let compressed = gzip(payload.as_bytes());

    let (extracted, _) = extract(&compressed, 1024);

    assert_eq!(extracted.concat(), objects.concat());
}

#[test]
fn chunk_size_does_not_affect_output() {
    let objects = sample_objects();
    let compressed = gzip(objects.join("\n").as_bytes());

    let (expected, _) = extract(&compressed, compressed.len());
    for &chunk_size in [1, 2, 7, 64, 1024].iter() {
        let (extracted, _) = extract(&compressed, chunk_size);
        assert_eq!(extracted, expected, "chunk size {}", chunk_size);
    }
}

#[test]
fn nested_and_string_braces_stay_whole() {
    let compressed = gzip(br#"{"a":{"b":1}} {"a":"x{y}z"}"#);

    let (extracted, _) = extract(&compressed, 1024);

    assert_eq!(extracted, vec![r#"{"a":{"b":1}}"#, r#"{"a":"x{y}z"}"#]);
}

#[test]
fn dangling_object_is_reported() {
    let compressed = gzip(b"{\"a\":1}\n{\"b\":{\"c\":");

    let (extracted, summary) = extract(&compressed, 4);

    assert_eq!(extracted, vec![r#"{"a":1}"#]);
    let truncation = summary.truncated.unwrap();
    assert_eq!(truncation.start, 8);
    assert_eq!(truncation.pending, 10);
    assert_eq!(truncation.depth, 2);
}

#[test]
fn array_root_is_a_framing_error() {
    let compressed = gzip(b"[{\"a\":1}]");

    let mut emitted = 0;
    let pipeline = Pipeline::new(&compressed[..], &Config::default()).unwrap();
    let err = pipeline
        .run(|_| {
            emitted += 1;
            Ok(())
        })
        .unwrap_err();

    assert_eq!(emitted, 0);
    match *err.kind() {
        ErrorKind::Framing(byte, position) => {
            assert_eq!(byte, b'[');
            assert_eq!(position, 0);
        }
        ref other => panic!("unexpected error kind: {:?}", other),
    }
}

#[test]
fn truncated_gzip_is_a_decompression_error() {
    let compressed = gzip(sample_objects().join("\n").as_bytes());
    let truncated = &compressed[..compressed.len() - 20];

    let pipeline = Pipeline::new(truncated, &Config::default()).unwrap();
    let err = pipeline.run(|_| Ok(())).unwrap_err();

    match *err.kind() {
        ErrorKind::Decompression(_) => (),
        ref other => panic!("unexpected error kind: {:?}", other),
    }
}

#[test]
fn emit_errors_stop_the_run() {
    let compressed = gzip(b"{\"a\":1} {\"b\":2} {\"c\":3}");

    let mut seen = 0;
    let pipeline = Pipeline::new(&compressed[..], &Config::default()).unwrap();
    let err = pipeline
        .run(|_| {
            seen += 1;
            if seen == 2 {
                Err("downstream rejected object".into())
            } else {
                Ok(())
            }
        })
        .unwrap_err();

    assert_eq!(seen, 2);
    assert_eq!(err.to_string(), "downstream rejected object");
}
