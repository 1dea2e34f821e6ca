use std::fs;
use std::process::Command;

use anyhow::Result;
use tempfile::tempdir;

const RECORD: &[u8] = br#"{"measurement_uid":"cli","test_keys":{}}"#;

fn extract(root: &std::path::Path, length: usize, output: &std::path::Path) -> Result<std::process::Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_autoclave-fetch"))
        .arg("extract")
        .arg("--root")
        .arg(root)
        .args(["--container", "single.zst", "--frame-offset", "0"])
        .arg("--frame-length")
        .arg(fs::metadata(root.join("single.zst"))?.len().to_string())
        .arg("--length")
        .arg(length.to_string())
        .arg("--output")
        .arg(output)
        .output()?)
}

#[test]
fn extract_writes_the_record() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("single.zst"), zstd::stream::encode_all(RECORD, 3)?)?;
    let output = dir.path().join("record.json");

    let run = extract(dir.path(), RECORD.len(), &output)?;
    assert!(run.status.success(), "stderr: {}", String::from_utf8_lossy(&run.stderr));
    assert_eq!(fs::read(&output)?, RECORD);
    Ok(())
}

#[test]
fn truncated_record_leaves_no_output_file() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("single.zst"), zstd::stream::encode_all(RECORD, 3)?)?;
    let output = dir.path().join("record.json");

    let run = extract(dir.path(), RECORD.len() + 10, &output)?;
    assert!(!run.status.success());
    assert!(!output.exists());
    Ok(())
}
