//! Test guests written in WAT.

#![allow(dead_code)]

use pn2gw_types::ResultRecord;
use pn2gw_wasm::ModuleSource;

/// Where the canned guest places its result record.
pub const RECORD_PTR: u32 = 16;

/// Guest that validates its inputs the way the real converter does and
/// otherwise echoes them back:
///
/// - empty CSV -> error "CSV text is empty"
/// - empty hero -> error "Hero name is required"
/// - otherwise result = CSV text, detail = hero name, and
///   `skipped_count = flags | game << 8 | trunc(rake) << 16 | trunc(cap) << 24`
pub const ECHO_GUEST: &str = r#"
(module
    (import "env" "log_debug" (func $log (param i32 i32)))
    (memory (export "mem") 1)
    (global $heap (mut i32) (i32.const 4096))
    (data (i32.const 256) "CSV text is empty")
    (data (i32.const 288) "Hero name is required")
    (data (i32.const 320) "parseCSV called")

    (func (export "malloc") (param $n i32) (result i32)
        (local $p i32)
        (local $end i32)
        (local.set $p (global.get $heap))
        (local.set $end (i32.add (local.get $p) (local.get $n)))
        (if (i32.gt_u (local.get $end) (i32.mul (memory.size) (i32.const 65536)))
            (then
                (drop (memory.grow
                    (i32.add
                        (i32.div_u
                            (i32.sub (local.get $end) (i32.mul (memory.size) (i32.const 65536)))
                            (i32.const 65536))
                        (i32.const 1))))))
        (global.set $heap (local.get $end))
        (local.get $p))

    (func $record (param $ptr i32) (param $len i32) (param $skipped i32)
                  (param $dptr i32) (param $dlen i32) (result i32)
        (i32.store (i32.const 16) (local.get $ptr))
        (i32.store (i32.const 20) (local.get $len))
        (i32.store (i32.const 24) (local.get $skipped))
        (i32.store (i32.const 28) (local.get $dptr))
        (i32.store (i32.const 32) (local.get $dlen))
        (i32.const 16))

    (func (export "parseCSV")
        (param $csv i32) (param $csvLen i32) (param $hero i32) (param $heroLen i32)
        (param $flags i32) (param $game i32) (param $rake f64) (param $cap f64)
        (result i32)
        (call $log (i32.const 320) (i32.const 15))
        (if (i32.eqz (local.get $csvLen))
            (then (return (call $record (i32.const 256) (i32.const 17) (i32.const -1) (i32.const 0) (i32.const 0)))))
        (if (i32.eqz (local.get $heroLen))
            (then (return (call $record (i32.const 288) (i32.const 21) (i32.const -1) (i32.const 0) (i32.const 0)))))
        (call $record
            (local.get $csv)
            (local.get $csvLen)
            (i32.or
                (i32.or (local.get $flags) (i32.shl (local.get $game) (i32.const 8)))
                (i32.or
                    (i32.shl (i32.trunc_f64_u (local.get $rake)) (i32.const 16))
                    (i32.shl (i32.trunc_f64_u (local.get $cap)) (i32.const 24))))
            (local.get $hero)
            (local.get $heroLen)))
)
"#;

/// Guest whose `parseCSV` traps.
pub const TRAPPING_GUEST: &str = r#"
(module
    (memory (export "mem") 1)
    (func (export "malloc") (param i32) (result i32) (i32.const 1024))
    (func (export "parseCSV")
        (param i32 i32 i32 i32 i32 i32 f64 f64) (result i32)
        unreachable))
"#;

/// Guest whose allocator always fails.
pub const NULL_ALLOC_GUEST: &str = r#"
(module
    (memory (export "mem") 1)
    (func (export "malloc") (param i32) (result i32) (i32.const 0))
    (func (export "parseCSV")
        (param i32 i32 i32 i32 i32 i32 f64 f64) (result i32)
        (i32.const 16)))
"#;

pub fn source(name: &str, wat_src: &str) -> ModuleSource {
    ModuleSource::Bytes {
        name: name.to_string(),
        bytes: wat::parse_str(wat_src).expect("Failed to parse WAT"),
    }
}

/// Escape bytes for a WAT data string.
fn wat_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("\\{:02x}", b)).collect()
}

/// Guest that ignores its inputs and returns a fixed record.
///
/// `result` is the hand history (or error message when `skipped_count` is
/// the sentinel); `detail` is the raw skipped-detail payload.
pub fn canned_guest(result: &str, skipped_count: u32, detail: Option<&str>) -> Vec<u8> {
    let result_ptr: u32 = 64;
    let result_len = result.len() as u32;
    let detail_ptr: u32 = (result_ptr + result_len + 7) & !7;
    let detail_bytes = detail.unwrap_or("").as_bytes();
    let detail_len = detail_bytes.len() as u32;

    let record = ResultRecord {
        result_ptr,
        result_len,
        skipped_count,
        skipped_detail_ptr: if detail.is_some() { detail_ptr } else { 0 },
        skipped_detail_len: detail_len,
    };

    let data_end = detail_ptr + detail_len;
    let pages = data_end / 65536 + 2;
    let heap = (data_end + 4096) & !7;

    let wat_src = format!(
        r#"
(module
    (memory (export "mem") {pages})
    (global $heap (mut i32) (i32.const {heap}))
    (data (i32.const {record_ptr}) "{record}")
    (data (i32.const {result_ptr}) "{result}")
    (data (i32.const {detail_ptr}) "{detail}")
    (func (export "malloc") (param $n i32) (result i32)
        (local $p i32)
        (local.set $p (global.get $heap))
        (global.set $heap (i32.add (local.get $p) (local.get $n)))
        (local.get $p))
    (func (export "parseCSV")
        (param i32 i32 i32 i32 i32 i32 f64 f64) (result i32)
        (i32.const {record_ptr})))
"#,
        pages = pages,
        heap = heap,
        record_ptr = RECORD_PTR,
        record = wat_bytes(&record.to_le_bytes()),
        result_ptr = result_ptr,
        result = wat_bytes(result.as_bytes()),
        detail_ptr = detail_ptr,
        detail = wat_bytes(detail_bytes),
    );

    wat::parse_str(&wat_src).expect("Failed to parse canned guest")
}

pub fn canned_source(result: &str, skipped_count: u32, detail: Option<&str>) -> ModuleSource {
    ModuleSource::Bytes {
        name: "canned.wasm".to_string(),
        bytes: canned_guest(result, skipped_count, detail),
    }
}

/// Three complete hands in converter output format.
pub const THREE_HANDS_HH: &str = "\
PokerStars Hand #1001: Hold'em No Limit ($0.05/$0.10) - 2024/01/15 21:03:44 UTC
Table 'pokernow' 6-max Seat #1 is the button
Seat 1: Alice ($10.00 in chips)
Seat 2: Bob ($10.00 in chips)
*** SUMMARY ***
Total pot $0.20 | Rake $0.01

PokerStars Hand #1002: Hold'em No Limit ($0.05/$0.10) - 2024/01/15 21:04:10 UTC
Table 'pokernow' 6-max Seat #2 is the button
Seat 1: Alice ($10.10 in chips)
Seat 2: Bob ($9.90 in chips)
*** SUMMARY ***
Total pot $0.40 | Rake $0.02

PokerStars Hand #1003: Hold'em No Limit ($0.05/$0.10) - 2024/01/15 21:05:02 UTC
Table 'pokernow' 6-max Seat #1 is the button
Seat 1: Alice ($10.30 in chips)
Seat 2: Bob ($9.70 in chips)
*** SUMMARY ***
Total pot $1.00 | Rake $0.05
";

/// PokerNow CSV with three complete hands.
pub const THREE_HANDS_CSV: &str = "\
entry,at,order
\"-- starting hand #1 (id: aaa111)  (No Limit Texas Hold'em) (dealer: \"\"Bob @ b1\"\") --\",2024-01-15T21:03:40.000Z,1
\"-- ending hand #1 --\",2024-01-15T21:03:50.000Z,2
\"-- starting hand #2 (id: bbb222)  (No Limit Texas Hold'em) (dealer: \"\"Alice @ a1\"\") --\",2024-01-15T21:04:05.000Z,3
\"-- ending hand #2 --\",2024-01-15T21:04:20.000Z,4
\"-- starting hand #3 (id: ccc333)  (No Limit Texas Hold'em) (dealer: \"\"Bob @ b1\"\") --\",2024-01-15T21:05:00.000Z,5
\"-- ending hand #3 --\",2024-01-15T21:05:10.000Z,6
";
