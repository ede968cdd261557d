use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn outline_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("outline");
    path
}

fn span(text: &str, size: f32, bold: bool, y0: f32) -> serde_json::Value {
    let font_name = if bold { "Arial-Bold" } else { "Arial" };
    let x1 = 72.0 + 6.0 * text.len() as f32;
    let y1 = y0 + size;
    serde_json::json!({
        "spans": [{
            "text": text,
            "font_name": font_name,
            "font_size": size,
            "bold": bold,
            "bbox": { "x0": 72.0, "y0": y0, "x1": x1, "y1": y1 },
        }]
    })
}

fn page(index: usize, lines: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({ "index": index, "width": 612.0, "height": 792.0, "lines": lines })
}

fn write_report(path: &Path, topic: &str) {
    let pages = vec![
        page(0, vec![span(&format!("{} Report", topic), 24.0, true, 100.0)]),
        page(
            1,
            vec![
                span("1. Introduction", 14.0, true, 100.0),
                span(
                    &format!("This report looks at {} in some detail.", topic.to_lowercase()),
                    10.0,
                    false,
                    130.0,
                ),
                span("1.1 Background", 12.0, true, 160.0),
                span(
                    &format!("Earlier work on {} shaped the approach taken here.", topic.to_lowercase()),
                    10.0,
                    false,
                    190.0,
                ),
            ],
        ),
    ];
    fs::write(path, serde_json::to_string_pretty(&pages).unwrap()).unwrap();
}

fn setup_test_env(provider: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let input = root.join("input");
    fs::create_dir_all(&input).unwrap();
    write_report(&input.join("alpha.json"), "Rainfall");
    write_report(&input.join("beta.json"), "Harvest");
    write_report(&input.join("gamma.json"), "Irrigation");
    fs::write(input.join("notes.txt"), "not a document").unwrap();

    fs::write(
        input.join("manifest.json"),
        r#"{
  "documents": [
    { "filename": "alpha.json", "title": "Rainfall" },
    { "filename": "beta.json", "title": "Harvest" },
    { "filename": "gamma.json", "title": "Irrigation" }
  ],
  "persona": { "role": "Farm Manager" },
  "job_to_be_done": { "task": "Plan irrigation ahead of the harvest" }
}"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[ranking]
min_score = 0.0
top_n = 3

[embedding]
provider = "{}"
dims = 256
"#,
        provider
    );
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_path = config_dir.join("outline.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_outline(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = outline_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run outline binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_outline_single_file_to_stdout() {
    let (tmp, config_path) = setup_test_env("hashed");
    let input = tmp.path().join("input/alpha.json");

    let (stdout, stderr, success) = run_outline(&config_path, &["outline", input.to_str().unwrap()]);
    assert!(success, "outline failed: stdout={}, stderr={}", stdout, stderr);

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["title"], "Rainfall Report");
    let outline = json["outline"].as_array().unwrap();
    assert_eq!(outline.len(), 2);
    assert_eq!(outline[0]["level"], "H1");
    assert_eq!(outline[0]["text"], "1. Introduction");
    assert_eq!(outline[0]["page"], 2);
    assert_eq!(outline[1]["level"], "H2");
    assert_eq!(outline[1]["text"], "1.1 Background");
}

#[test]
fn test_outline_directory_writes_one_file_per_document() {
    let (tmp, config_path) = setup_test_env("hashed");
    let input = tmp.path().join("input");
    let output = tmp.path().join("output");

    let (stdout, stderr, success) = run_outline(
        &config_path,
        &[
            "outline",
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ],
    );
    assert!(success, "outline failed: stdout={}, stderr={}", stdout, stderr);

    // manifest.json is not a layout dump and is skipped with a warning
    for name in ["alpha", "beta", "gamma"] {
        let content = fs::read_to_string(output.join(format!("{}.json", name))).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert!(json["title"].as_str().unwrap().ends_with("Report"));
    }
    assert!(!output.join("notes.json").exists());
    assert!(!output.join("manifest.json").exists());
    assert!(stdout.contains("Wrote 3 outline(s)"));
}

#[test]
fn test_outline_directory_requires_output() {
    let (tmp, config_path) = setup_test_env("hashed");
    let input = tmp.path().join("input");

    let (_, stderr, success) = run_outline(&config_path, &["outline", input.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("--output is required"));
}

#[test]
fn test_rank_writes_ranking_json() {
    let (tmp, config_path) = setup_test_env("hashed");
    let manifest = tmp.path().join("input/manifest.json");
    let output = tmp.path().join("output/ranking.json");

    let (stdout, stderr, success) = run_outline(
        &config_path,
        &[
            "rank",
            "--manifest",
            manifest.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ],
    );
    assert!(success, "rank failed: stdout={}, stderr={}", stdout, stderr);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let metadata = &json["metadata"];
    assert_eq!(metadata["input_documents"].as_array().unwrap().len(), 3);
    assert_eq!(metadata["persona"], "Farm Manager");
    assert_eq!(metadata["job_to_be_done"], "Plan irrigation ahead of the harvest");
    assert!(metadata["processing_timestamp"].as_str().unwrap().contains('T'));

    let extracted = json["extracted_sections"].as_array().unwrap();
    let analysis = json["subsection_analysis"].as_array().unwrap();
    assert_eq!(extracted.len(), 3);
    assert_eq!(analysis.len(), 3);
    for (i, section) in extracted.iter().enumerate() {
        assert_eq!(section["importance_rank"], i + 1);
        assert!(section["section_title"].is_string());
        assert_eq!(section["page_number"], 2);
        assert!(!analysis[i]["refined_text"].as_str().unwrap().is_empty());
    }
}

#[test]
fn test_disabled_provider_blocks_rank_only() {
    let (tmp, config_path) = setup_test_env("disabled");
    let input = tmp.path().join("input/beta.json");
    let manifest = tmp.path().join("input/manifest.json");

    let (_, _, success) = run_outline(&config_path, &["outline", input.to_str().unwrap()]);
    assert!(success, "outline should not need embeddings");

    let (_, stderr, success) =
        run_outline(&config_path, &["rank", "--manifest", manifest.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("Ranking requires embeddings"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (tmp, _) = setup_test_env("hashed");
    let bad = tmp.path().join("config/bad.toml");
    fs::write(&bad, "[outline]\nfont_tiers = 0\n").unwrap();
    let input = tmp.path().join("input/alpha.json");

    let (_, stderr, success) = run_outline(&bad, &["outline", input.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("font_tiers"));
}
