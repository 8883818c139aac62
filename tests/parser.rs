use hi_json::{parse, parse_each, parse_reader, parse_reader_each, Value};
use pretty_assertions::assert_eq;

#[test]
fn scalar_and_container_scenarios() {
    assert_eq!(parse(b"null").unwrap(), Value::Null);
    assert_eq!(parse(b"  true \n").unwrap(), Value::Bool(true));
    assert_eq!(parse(b"-0").unwrap(), Value::Int(0));

    let v = parse(br#"{"a": 1, "b": [true, false, null], "c": "x\ny"}"#).unwrap();
    let obj = v.as_object().unwrap();
    assert_eq!(obj.get("a"), Some(&Value::Int(1)));
    assert_eq!(
        obj.get("b").unwrap().as_array().unwrap(),
        &[Value::Bool(true), Value::Bool(false), Value::Null]
    );
    assert_eq!(obj.get("c").unwrap().as_str(), Some("x\ny"));
}

#[test]
fn deeply_nested_structure() {
    let input = b"[[[[[1,2],3],4],5],6]";
    let v = parse(input).unwrap();
    let mut cur = &v;
    for _ in 0..4 {
        cur = &cur.as_array().unwrap()[0];
    }
    assert_eq!(cur.as_array().unwrap()[0], Value::Int(1));
}

#[test]
fn i64_max_stays_int_one_past_promotes() {
    assert_eq!(parse(b"9223372036854775807").unwrap(), Value::Int(i64::MAX));
    assert_eq!(
        parse(b"9223372036854775808").unwrap(),
        Value::Big("9223372036854775808".to_string())
    );
}

#[test]
fn huge_exponent_promotes_to_big() {
    match parse(b"0.1e20000").unwrap() {
        Value::Big(lit) => assert_eq!(lit, "0.1e20000"),
        other => panic!("expected Big, got {other:?}"),
    }
}

#[test]
fn empty_input_is_incomplete_json() {
    let err = parse(b"").unwrap_err();
    assert_eq!(err.message, "incomplete JSON");
}

#[test]
fn unterminated_object_is_incomplete_json() {
    let err = parse(br#"{"k":"#).unwrap_err();
    assert_eq!(err.message, "incomplete JSON");
}

#[test]
fn trailing_comma_in_array_is_rejected() {
    assert!(parse(b"[1,]").is_err());
}

#[test]
fn extra_trailing_data_is_rejected() {
    let err = parse(br#""abc"x"#).unwrap_err();
    assert!(err.message.contains("extra characters after close"));
}

#[test]
fn parse_each_splits_a_whitespace_separated_stream() {
    let mut values = Vec::new();
    parse_each(b"1 2.5 \"three\" [4]\n", |v| values.push(v)).unwrap();
    assert_eq!(
        values,
        vec![
            Value::Int(1),
            Value::Float(2.5),
            Value::String("three".to_string()),
            Value::Array(vec![Value::Int(4)]),
        ]
    );
}

#[test]
fn parse_reader_matches_parse() {
    let input = br#"{"x": [1, 2, 3], "y": null}"#;
    let from_slice = parse(input).unwrap();
    let from_reader = parse_reader(std::io::Cursor::new(input)).unwrap();
    assert_eq!(from_slice, from_reader);
}

#[test]
fn parse_reader_each_streams_across_reads() {
    struct OneByteAtATime<'a>(&'a [u8]);

    impl<'a> std::io::Read for OneByteAtATime<'a> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    let mut values = Vec::new();
    parse_reader_each(OneByteAtATime(b"1 2 3"), |v| values.push(v)).unwrap();
    assert_eq!(values, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
}

#[test]
fn result_is_independent_of_chunk_boundaries() {
    let input = br#"{"name": "a long string value", "list": [1, 2, 3, 4, 5], "nested": {"k": 9.5}}"#;
    let whole = parse(input).unwrap();

    // Re-run with a reader that trickles the input out a few bytes at a
    // time, crossing every possible split point across several runs.
    for chunk_len in [1usize, 2, 3, 7, 16] {
        struct Chunked<'a> {
            data: &'a [u8],
            chunk_len: usize,
        }
        impl<'a> std::io::Read for Chunked<'a> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                let n = self.chunk_len.min(self.data.len()).min(buf.len());
                buf[..n].copy_from_slice(&self.data[..n]);
                self.data = &self.data[n..];
                Ok(n)
            }
        }
        let got = parse_reader(Chunked {
            data: input,
            chunk_len,
        })
        .unwrap();
        assert_eq!(got, whole, "chunk_len = {chunk_len}");
    }
}

#[test]
fn bom_is_skipped_once() {
    let mut input = vec![0xEF, 0xBB, 0xBF];
    input.extend_from_slice(br#"{"a": 1}"#);
    let v = parse(&input).unwrap();
    assert_eq!(v.as_object().unwrap().get("a"), Some(&Value::Int(1)));
}

#[test]
fn malformed_bom_prefix_errors() {
    let err = parse(&[0xEF, 0xBB, 0x00]).unwrap_err();
    assert_eq!(err.message, "expected BOM at 1:3");
}

#[test]
fn string_split_exactly_at_a_chunk_boundary() {
    // A 4096-byte read chunk landing mid-string must not corrupt the
    // string or its escape handling.
    let filler = "x".repeat(4090);
    let input = format!(r#"["{filler}\n123"]"#);
    let v = parse_reader(std::io::Cursor::new(input.as_bytes())).unwrap();
    let s = v.as_array().unwrap()[0].as_str().unwrap();
    assert_eq!(s, format!("{filler}\n123"));
}
