//! Reader paths, strategy equivalence, events, and partitioned parsing.

use std::io::{Read, Write as _};

use kudel::{
    DocumentSink, Event, EventValue, ParseOptions, SerializeOptions, Strategy, find_node_boundaries,
    iterate, merge, parse, parse_parallel, parse_reader, parse_with_options, parse_with_sink,
    serialize_to_bytes,
};

/// Reader that hands out at most `step` bytes per call, forcing refill
/// loops and tokens that span buffer boundaries.
struct Trickle {
    data: Vec<u8>,
    pos: usize,
    step: usize,
}

impl Read for Trickle {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        let n = self.step.min(self.data.len() - self.pos).min(out.len());
        out[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

fn canon_doc(doc: &kudel::Document) -> String {
    String::from_utf8(serialize_to_bytes(doc, &SerializeOptions::default())).unwrap()
}

const SAMPLE: &str = r##"first 1 2.5 key="quoted \u{2764} value" {
    inner #true flag=#null
    raw #"no \n escapes"#
    multi """
        dedented
        lines
        """
}
second (ty)3 ; third
/-elided by slashdash
fourth 0xFF prop=1_000
"##;

/// Every strategy yields the same serialized document.
#[test]
fn parse_variants_are_equivalent() {
    let base = canon_doc(&parse(SAMPLE.as_bytes()).unwrap());
    for strategy in [Strategy::Streaming, Strategy::StructuralIndex, Strategy::Preprocessed] {
        let options = ParseOptions::default().with_strategy(strategy);
        let doc = parse_with_options(SAMPLE.as_bytes(), &options).unwrap();
        assert_eq!(canon_doc(&doc), base, "{strategy:?}");
    }
}

/// Reader parses must match slice parses under any read granularity.
#[test]
fn reader_matches_slice_under_short_reads() {
    let base = canon_doc(&parse(SAMPLE.as_bytes()).unwrap());
    for step in [1, 2, 3, 7, 64, 4096] {
        for strategy in [Strategy::Streaming, Strategy::StructuralIndex] {
            let reader = Trickle {
                data: SAMPLE.as_bytes().to_vec(),
                pos: 0,
                step,
            };
            let options = ParseOptions::default()
                .with_strategy(strategy)
                .with_buffer_size(64);
            let doc = parse_reader(reader, &options).unwrap();
            assert_eq!(canon_doc(&doc), base, "step {step} {strategy:?}");
        }
    }
}

#[test]
fn reader_token_longer_than_buffer() {
    let long = "x".repeat(5000);
    let input = format!("node \"{long}\"\n");
    let reader = Trickle {
        data: input.into_bytes(),
        pos: 0,
        step: 17,
    };
    let options = ParseOptions::default().with_buffer_size(64);
    let doc = parse_reader(reader, &options).unwrap();
    let root = doc.roots()[0];
    let value = doc.arguments(root)[0].value.as_string().unwrap();
    assert_eq!(doc.text(value).len(), 5000);
}

#[test]
fn parse_reader_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"from-disk 1 {\n    child\n}\n").unwrap();
    let handle = file.reopen().unwrap();
    let doc = parse_reader(handle, &ParseOptions::default()).unwrap();
    assert_eq!(canon_doc(&doc), "from-disk 1 {\n    child\n}\n");
}

#[test]
fn max_document_size_enforced() {
    let options = ParseOptions::default().with_max_document_size(16);
    let reader = Trickle {
        data: b"node with a fairly long tail 1 2 3\n".to_vec(),
        pos: 0,
        step: 8,
    };
    assert!(parse_reader(reader, &options).is_err());
}

/// Events arrive in document order with one EndNode per StartNode.
#[test]
fn pull_iterator_event_sequence() {
    let mut events = iterate(b"(type)node (int)42 key=\"v\" { child }");
    let mut seen = Vec::new();
    while let Some(ev) = events.next() {
        seen.push(format!("{:?}", ev.unwrap()));
    }
    let expected = [
        "StartNode { name: \"node\", type_annotation: Some(\"type\") }",
        "Argument { value: Integer(42), type_annotation: Some(\"int\") }",
        "Property { name: \"key\", value: String(\"v\"), type_annotation: None }",
        "StartNode { name: \"child\", type_annotation: None }",
        "EndNode",
        "EndNode",
    ];
    assert_eq!(seen, expected);
}

#[test]
fn pull_iterator_is_terminal_after_error() {
    let mut events = iterate(b"node \"open");
    let mut err_count = 0;
    while let Some(ev) = events.next() {
        if ev.is_err() {
            err_count += 1;
        }
    }
    assert_eq!(err_count, 1);
}

/// Rebuilding a document from pushed events round-trips.
#[test]
fn document_sink_reconstructs() {
    let direct = canon_doc(&parse(SAMPLE.as_bytes()).unwrap());
    let mut sink = DocumentSink::new();
    parse_with_sink(SAMPLE.as_bytes(), &mut sink, &ParseOptions::default()).unwrap();
    assert_eq!(canon_doc(&sink.finish()), direct);
}

#[test]
fn custom_sink_sees_normalized_values() {
    struct Collect(Vec<String>);
    impl kudel::EventSink for Collect {
        fn event(&mut self, event: Event<'_>) {
            if let Event::Argument { value, .. } = event {
                match value {
                    EventValue::String(s) => self.0.push(s.to_owned()),
                    EventValue::Integer(i) => self.0.push(i.to_string()),
                    EventValue::Float { original, .. } => self.0.push(original.to_owned()),
                    other => self.0.push(format!("{other:?}")),
                }
            }
        }
    }
    let mut sink = Collect(Vec::new());
    parse_with_sink(
        b"n \"a\\tb\" 0x10 1e2",
        &mut sink,
        &ParseOptions::default(),
    )
    .unwrap();
    assert_eq!(sink.0, ["a\tb", "16", "1E+2"]);
}

/// Merging partition parses equals parsing the concatenation.
#[test]
fn merge_equals_whole_parse() {
    let part1 = "alpha 1 {\n    kid\n}\n";
    let part2 = "beta two=2\ngamma\n";
    let merged = merge(vec![
        parse(part1.as_bytes()).unwrap(),
        parse(part2.as_bytes()).unwrap(),
    ]);
    let whole_src = format!("{part1}{part2}");
    let whole = parse(whole_src.as_bytes()).unwrap();
    assert_eq!(canon_doc(&merged), canon_doc(&whole));
}

#[test]
fn parallel_parse_matches_serial() {
    let mut big = String::new();
    for i in 0..200 {
        big.push_str(&format!("entry-{i} value={i} {{\n    child {i}\n}}\n"));
    }
    let serial = canon_doc(&parse(big.as_bytes()).unwrap());
    for partitions in [2, 3, 8] {
        let doc = parse_parallel(big.as_bytes(), partitions, &ParseOptions::default()).unwrap();
        assert_eq!(canon_doc(&doc), serial, "{partitions} partitions");
    }
}

#[test]
fn node_boundaries_are_grammar_aware() {
    let src = b"a \"brace { in string\"\nb { c\nd }\ne\n";
    let cuts = find_node_boundaries(src, 4);
    for &cut in &cuts {
        let head = &src[cut as usize..];
        assert!(
            head.is_empty() || head.starts_with(b"b ") || head.starts_with(b"e"),
            "cut {cut} lands mid-node"
        );
    }
}

#[test]
fn into_owned_detaches_from_source() {
    let source = b"node \"borrowed text\" bare".to_vec();
    let doc = parse(&source).unwrap();
    let owned = doc.into_owned();
    drop(source);
    let root = owned.roots()[0];
    let args = owned.arguments(root);
    assert_eq!(owned.text(args[0].value.as_string().unwrap()), "borrowed text");
    assert_eq!(owned.text(args[1].value.as_string().unwrap()), "bare");
}
