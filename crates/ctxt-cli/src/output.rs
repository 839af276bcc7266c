//! Human and `--json` renderings of command results. Everything goes to
//! stdout except errors; logs are on stderr.

use ctxt_types::KeyRecord;
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
struct RecordView<'a> {
    #[serde(flatten)]
    record: &'a KeyRecord,
    fingerprint: String,
}

pub fn print_record(record: &KeyRecord, json: bool) {
    if json {
        let view = RecordView {
            record,
            fingerprint: record.fingerprint(),
        };
        print_json(&view);
    } else {
        println!("{}  {}", record.number, record.fingerprint());
    }
}

pub fn print_records(records: &[KeyRecord], json: bool) {
    if json {
        let views: Vec<_> = records
            .iter()
            .map(|record| {
                json!({
                    "number": record.number,
                    "fingerprint": record.fingerprint(),
                })
            })
            .collect();
        print_json(&views);
    } else if records.is_empty() {
        println!("(no contacts)");
    } else {
        for record in records {
            println!("{}  {}", record.number, record.fingerprint());
        }
    }
}

/// Print one named value: `{"<key>": value}` in JSON mode, the bare value
/// otherwise so it can be piped.
pub fn print_field(key: &str, value: &str, json: bool) {
    if json {
        print_json(&json!({ key: value }));
    } else {
        println!("{value}");
    }
}

pub fn print_error(err: &anyhow::Error, json: bool) {
    if json {
        eprintln!("{}", json!({ "error": format!("{err:#}") }));
    } else {
        eprintln!("error: {err:#}");
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("{{\"error\":\"json serialization failed: {e}\"}}"),
    }
}
