#![no_main]
use canonref::{Canon, RefParser};
use lazy_static::lazy_static;
use libfuzzer_sys::fuzz_target;

lazy_static! {
    static ref PARSER: RefParser = RefParser::new(Canon::from_default_source().unwrap());
}

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // parse is total: no input may panic, and every emitted range must
        // come out fully qualified
        let list = PARSER.parse(s, None);
        for range in &list {
            assert!(range.start.name.is_some());
            assert!(range.start.ch.is_some());
            assert!(range.start.vs.is_some());
            assert!(range.end.ch.is_some());
            assert!(range.end.vs.is_some());
        }
        let _ = PARSER.refstring(&list);
    }
});
