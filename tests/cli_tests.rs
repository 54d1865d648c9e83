#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::archives::{sample_war, write_file};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const CATALOG: &[u8] = br#"
types:
  - name: a.B
    path: /pets
    tags: [pets]
    operations:
      - { method: GET, name: listPets, produces: [application/json] }
  - name: c.D
    path: /things
    operations:
      - { method: POST, name: createThing }
"#;

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_oas-assemble"))
        .current_dir(dir)
        .env("OAS_LOG_LEVEL", "error")
        .env_remove("OAS_ENABLED")
        .env_remove("OAS_SCAN_LIB")
        .env_remove("OAS_SERVERS")
        .args(args)
        .output()
        .expect("run cli")
}

#[test]
fn test_cli_assemble_writes_json() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "app.war", &sample_war());
    write_file(dir.path(), "types.yaml", CATALOG);

    let output = run(
        dir.path(),
        &[
            "assemble",
            "--archive",
            "app.war",
            "--catalog",
            "types.yaml",
            "--context-root",
            "/shop",
            "--format",
            "json",
            "--output",
            "openapi.json",
        ],
    );
    assert!(output.status.success(), "{output:?}");

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("openapi.json")).unwrap())
            .unwrap();
    assert_eq!(doc["openapi"], "3.1.0");
    assert_eq!(doc["paths"]["/pets"]["get"]["operationId"], "listPets");
    assert!(doc["paths"].get("/things").is_none());
    assert!(doc["servers"][0]["url"]
        .as_str()
        .unwrap()
        .ends_with(":8080/shop"));
}

#[test]
fn test_cli_assemble_yaml_to_stdout_with_config() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "app.war", &sample_war());
    write_file(dir.path(), "types.yaml", CATALOG);
    write_file(
        dir.path(),
        "openapi.yaml",
        b"scan_lib: true\nservers: [https://api.example.com]\n",
    );

    let output = run(
        dir.path(),
        &[
            "assemble",
            "-a",
            "app.war",
            "-c",
            "types.yaml",
            "--config",
            "openapi.yaml",
        ],
    );
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("/things"));
    assert!(stdout.contains("https://api.example.com"));
}

#[test]
fn test_cli_list_types() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "app.war", &sample_war());
    write_file(dir.path(), "types.yaml", CATALOG);

    let output = run(
        dir.path(),
        &["list-types", "--archive", "app.war", "--catalog", "types.yaml"],
    );
    assert!(output.status.success(), "{output:?}");
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "a.B\n");
}

#[test]
fn test_cli_missing_archive_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "types.yaml", CATALOG);
    let output = run(
        dir.path(),
        &["assemble", "--archive", "nope.war", "--catalog", "types.yaml"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.war"));
}
