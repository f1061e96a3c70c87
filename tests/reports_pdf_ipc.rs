use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn fixture_path(rel: &str) -> PathBuf {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    base.join(rel)
}

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_resultsd");
    let mut child = Command::new(exe)
        .env("RESULTS_CSV_PATH", fixture_path("fixtures/results/g12_results.csv"))
        .env("RESULTS_REPORT_TITLE", "Grade 12 Results")
        .env_remove("RESULTS_CONFIG")
        .env_remove("RESULTS_MISSING_SOURCE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn resultsd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|w| w == needle.as_bytes())
}

#[test]
fn student_pdf_writes_file_at_out_path() {
    let workspace = temp_dir("resultsd-report-out");
    let out = workspace.join("nested").join("a004.pdf");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let found = request(
        &mut stdin,
        &mut reader,
        "1",
        "students.search",
        json!({ "seatNumber": "A004" }),
    );
    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "reports.studentPdf",
        json!({
            "studentData": found["result"],
            "outPath": out.to_string_lossy(),
            "generatedAt": "2025-08-14 10:05:00"
        }),
    );
    assert_eq!(resp["ok"], json!(true), "{}", resp);
    assert_eq!(resp["result"]["fileName"], json!("STEM_Result_A004.pdf"));
    assert_eq!(resp["result"]["mimeType"], json!("application/pdf"));

    let bytes = std::fs::read(&out).expect("read pdf");
    assert_eq!(resp["result"]["byteCount"], json!(bytes.len()));
    assert!(bytes.starts_with(b"%PDF-"));
    assert!(contains(&bytes, "(Grade 12 Results)"));
    assert!(contains(&bytes, "(Rank: #4)"));
    assert!(contains(&bytes, "(Generated on: 2025-08-14 10:05:00)"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn student_pdf_inline_is_deterministic_for_fixed_time() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let params = json!({
        "studentData": {
            "seatNumber": "B7",
            "name": "Mona",
            "totalScore": 301,
            "status": "PASS",
            "rank": 12
        },
        "generatedAt": "2025-01-02 03:04:05"
    });
    let a = request(&mut stdin, &mut reader, "1", "reports.studentPdf", params.clone());
    let b = request(&mut stdin, &mut reader, "2", "reports.studentPdf", params);
    let a64 = a["result"]["pdfBase64"].as_str().expect("pdfBase64");
    assert_eq!(Some(a64), b["result"]["pdfBase64"].as_str());

    let bytes = STANDARD.decode(a64).expect("base64");
    assert!(!bytes.is_empty());
    assert!(contains(&bytes, "(Total Score: 301/500)"));
    assert!(contains(&bytes, "(Name: Mona)"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn student_pdf_by_seat_number_looks_up_record() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "reports.studentPdf",
        json!({ "seatNumber": "a005", "generatedAt": "2025-01-02 03:04:05" }),
    );
    assert_eq!(resp["result"]["fileName"], json!("STEM_Result_A005.pdf"));
    let bytes = STANDARD
        .decode(resp["result"]["pdfBase64"].as_str().expect("pdfBase64"))
        .expect("base64");
    assert!(contains(&bytes, "(Status: ABSENT)"));

    let missing = request(
        &mut stdin,
        &mut reader,
        "2",
        "reports.studentPdf",
        json!({ "seatNumber": "nope" }),
    );
    assert_eq!(missing["error"]["code"], json!("not_found"));

    let legacy = request(
        &mut stdin,
        &mut reader,
        "3",
        "reports.studentPdf",
        json!({ "seating_no": "A001", "generatedAt": "2025-01-02 03:04:05" }),
    );
    assert_eq!(legacy["result"]["fileName"], json!("STEM_Result_A001.pdf"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn student_pdf_rejects_bad_input() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let no_data = request(&mut stdin, &mut reader, "1", "reports.studentPdf", json!({}));
    assert_eq!(no_data["error"]["code"], json!("bad_params"));

    let not_object = request(
        &mut stdin,
        &mut reader,
        "2",
        "reports.studentPdf",
        json!({ "studentData": "A001" }),
    );
    assert_eq!(not_object["error"]["code"], json!("bad_params"));

    let bad_time = request(
        &mut stdin,
        &mut reader,
        "3",
        "reports.studentPdf",
        json!({ "studentData": { "seatNumber": "A1" }, "generatedAt": "yesterday" }),
    );
    assert_eq!(bad_time["error"]["code"], json!("bad_params"));

    let render = request(
        &mut stdin,
        &mut reader,
        "4",
        "reports.studentPdf",
        json!({ "studentData": { "seatNumber": "A1", "rank": [1, 2] } }),
    );
    assert_eq!(render["error"]["code"], json!("render_failed"));
    assert_eq!(render["error"]["message"], json!("PDF generation failed"));

    drop(stdin);
    let _ = child.wait();
}
