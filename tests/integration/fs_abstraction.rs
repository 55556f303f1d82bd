// tests/integration/fs_abstraction.rs

use std::path::Path;
use std::sync::Arc;

use stagedag::config::EnvironmentConfig;
use stagedag::fs::mock::MockFileSystem;
use stagedag::fs::FileSystem;
use stagedag::pipeline::{BuildMode, Pipeline};
use stagedag::record::TimingStore;
use stagedag_test_utils::builders::{ConfigFileBuilder, StageConfigBuilder};

use crate::common::init_tracing;

#[test]
fn test_mock_fs_basic_ops() {
    let fs = MockFileSystem::new();
    let path = Path::new("/test/file.txt");

    fs.add_file(path, "hello world");

    assert!(fs.exists(path));
    assert!(fs.is_file(path));
    assert!(fs.is_dir(Path::new("/test")));
    assert_eq!(fs.read_to_string(path).unwrap(), "hello world");
    assert_eq!(
        fs.read_dir(Path::new("/test")).unwrap(),
        vec![path.to_path_buf()]
    );

    fs.remove_dir_all(Path::new("/test")).unwrap();
    assert!(!fs.exists(path));
    assert!(fs.read_to_string(path).is_err());
}

#[test]
fn test_pipeline_builds_on_mock_fs() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_dir("/root/work/prep");
    fs.add_dir("/root/work/prep_3");
    fs.add_file("/images/lofar.simg", "img");

    let cfg = ConfigFileBuilder::new("/root")
        .with_ncpu(8)
        .with_environment("lofar", EnvironmentConfig::container("/images/lofar.simg"))
        .with_stage(
            "prep",
            StageConfigBuilder::new("prep.py")
                .environment("lofar")
                .run_flag(2)
                .arg("ncpu", "{ncpu}")
                .build(),
        )
        .with_stage(
            "image",
            StageConfigBuilder::new("image.py")
                .after("prep")
                .run_flag(1)
                .arg("data_dir", "{workspace:prep}")
                .arg("scripts", "{script_dir}")
                .arg("root", "{root}")
                .arg("dry", false)
                .arg("scale", 1.5)
                .build(),
        )
        .build();

    let pipeline =
        Pipeline::build_with(cfg, Arc::new(fs.clone()), "endpoint", BuildMode::Execute).unwrap();

    assert_eq!(pipeline.workspace_of("prep"), Some(Path::new("/root/work/prep_4")));
    assert_eq!(pipeline.workspace_of("image"), Some(Path::new("/root/work/image")));
    assert!(fs.is_dir(Path::new("/root/work/prep_4")));
    assert!(fs.is_dir(Path::new("/root/work/image")));

    let plan = pipeline.render_plan().unwrap();
    assert!(plan.contains("singularity exec -B /tmp,/dev/shm,$HOME /images/lofar.simg"), "{plan}");
    assert!(
        plan.contains(
            "python /root/scripts/image.py --data_dir=/root/work/prep_4 --scripts=/root/scripts --root=/root/work --dry=False --scale=1.5"
        ),
        "{plan}"
    );
    assert!(plan.contains("--ncpu=8"), "{plan}");
}

#[test]
fn test_timing_store_on_mock_fs() {
    let fs = MockFileSystem::new();
    let store = TimingStore::with_fs("/root/work/timing.txt", Arc::new(fs.clone()));

    store.record(
        "solve",
        std::time::Duration::from_millis(1500),
    )
    .unwrap();

    assert_eq!(
        fs.read_to_string(Path::new("/root/work/timing.txt")).unwrap(),
        "solve,1.50\n"
    );
}
