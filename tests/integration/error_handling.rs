// tests/integration/error_handling.rs

use std::io::Write;

use stagedag::config::load_and_validate;
use stagedag::errors::{
    StagedagError, EXIT_CONFIG_ERROR, EXIT_INTERNAL_ERROR, PIPELINE_FAILURE_EXIT_CODE,
};
use stagedag::pipeline::{BuildMode, Pipeline};
use tempfile::NamedTempFile;

#[test]
fn test_dag_cycle_returns_structured_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[pipeline]
root_working_dir = "/tmp/stagedag-never-created"
script_dir = "/tmp"

[stage.A]
script = "a.py"
after = ["B"]

[stage.B]
script = "b.py"
after = ["A"]
"#
    )
    .unwrap();

    let result = load_and_validate(file.path());

    match result {
        Err(StagedagError::DependencyCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains("A") || msg.contains("B"));
        }
        other => panic!("Expected DependencyCycle error, got {:?}", other),
    }
}

#[test]
fn test_missing_pipeline_section_is_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[stage.a]\nscript = \"a.py\"\n").unwrap();

    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, StagedagError::TomlError(_)), "{err:?}");
}

#[test]
fn test_unknown_cli_target_is_stage_not_found() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "[pipeline]\nroot_working_dir = \"/tmp/x\"\nscript_dir = \"/tmp\"\n[stage.a]\nscript = \"a.py\"\n"
    )
    .unwrap();

    let mut cfg = load_and_validate(file.path()).unwrap();
    cfg.pipeline.target = "nope".to_string();
    let err = Pipeline::build(cfg, BuildMode::Preview).unwrap_err();
    assert!(matches!(err, StagedagError::StageNotFound(_)), "{err:?}");
}

#[test]
fn test_exit_codes_separate_invocation_errors_from_stage_failures() {
    assert_eq!(
        StagedagError::ConfigError("x".into()).exit_code(),
        EXIT_CONFIG_ERROR
    );
    assert_eq!(
        StagedagError::StageNotFound("x".into()).exit_code(),
        EXIT_CONFIG_ERROR
    );
    assert_eq!(
        StagedagError::StageFailed {
            stage: "x".into(),
            code: 1
        }
        .exit_code(),
        PIPELINE_FAILURE_EXIT_CODE
    );
    assert_eq!(
        StagedagError::IoError(std::io::Error::other("disk")).exit_code(),
        EXIT_INTERNAL_ERROR
    );
}
