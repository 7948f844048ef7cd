use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::Path;
use std::time::Duration;
use tar::Archive;
use tempfile::TempDir;

use deploy_docs::archive::{create_archive, run_build, sha256_file};
use deploy_docs::config::Config;
use deploy_docs::deploy::{DeployPlan, DeployStep, DeployStrategy};
use deploy_docs::remote::{DeploymentTarget, HostKeyPolicy};
use deploy_docs::Error;

fn write_site(root: &Path) {
    fs::create_dir_all(root.join("_static")).unwrap();
    fs::write(root.join("index.html"), "<h1>Docs</h1>").unwrap();
    fs::write(root.join(".buildinfo"), "config: abc").unwrap();
    fs::write(root.join("_static").join("pygments.css"), ".hll {}").unwrap();
}

#[test]
fn test_build_and_package_extracts_to_same_tree() {
    let work = TempDir::new().unwrap();
    let project = work.path().join("sphinx-doc");
    fs::create_dir_all(&project).unwrap();

    run_build(
        "mkdir -p _build/html/_static && echo '<h1>Docs</h1>' > _build/html/index.html \
         && echo '.hll {}' > _build/html/_static/pygments.css",
        &project,
    )
    .unwrap();

    let archive = work.path().join("docs.tar.gz");
    let info = create_archive(&project.join("_build").join("html"), &archive).unwrap();
    assert_eq!(info.sha256, sha256_file(&archive).unwrap());

    let doc_root = work.path().join("public_html").join("docs");
    fs::create_dir_all(&doc_root).unwrap();
    Archive::new(GzDecoder::new(File::open(&archive).unwrap()))
        .unpack(&doc_root)
        .unwrap();

    assert!(doc_root.join("index.html").is_file());
    assert!(doc_root.join("_static").join("pygments.css").is_file());
    assert!(!doc_root.join("_build").exists());
}

#[test]
fn test_hidden_files_are_packed() {
    let work = TempDir::new().unwrap();
    let html = work.path().join("html");
    write_site(&html);

    let archive = work.path().join("out.tar.gz");
    create_archive(&html, &archive).unwrap();
    let names = deploy_docs::archive::list_entries(&archive).unwrap();
    assert!(names.iter().any(|n| n == ".buildinfo"));
}

#[test]
fn test_failed_build_is_reported() {
    let work = TempDir::new().unwrap();
    let result = run_build("exit 2", work.path());
    assert!(matches!(result, Err(Error::Build(_))));
}

#[test]
fn test_config_file_drives_target_and_plan() {
    let work = TempDir::new().unwrap();
    let key = work.path().join("id_rsa");
    let path = work.path().join("config.yml");
    fs::write(
        &path,
        format!(
            "target:\n\
             \x20 host: docs.example.com\n\
             \x20 user: www\n\
             \x20 port: 2222\n\
             \x20 private_key: {}\n\
             \x20 timeout: 15\n\
             \x20 host_key_policy: accept-new\n\
             publish:\n\
             \x20 archive: /tmp/ccp_docs.tar.gz\n\
             \x20 doc_root: public_html/py/ciscoconfparse\n\
             \x20 strategy: in-place\n\
             \x20 remove_archive: false\n\
             \x20 zone: America/Chicago\n",
            key.display()
        ),
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    let target = DeploymentTarget::from_config(&config.target).unwrap();
    let plan = DeployPlan::from_config(&config.publish).unwrap();

    assert_eq!(target.connection_string(), "www@docs.example.com:2222");
    assert_eq!(target.private_key(), key.as_path());
    assert_eq!(target.timeout(), Duration::from_secs(15));
    assert_eq!(target.host_key_policy(), HostKeyPolicy::AcceptNew);

    assert_eq!(plan.strategy(), DeployStrategy::InPlace);
    assert_eq!(plan.archive_name(), "docs.tar.gz");
    assert_eq!(
        plan.steps(),
        vec![
            DeployStep::Authenticate,
            DeployStep::Connect,
            DeployStep::Clean,
            DeployStep::Upload,
            DeployStep::Verify,
            DeployStep::Extract,
        ]
    );
}

#[test]
fn test_invalid_yaml_is_config_error() {
    let work = TempDir::new().unwrap();
    let path = work.path().join("config.yml");
    fs::write(&path, "target:\n  port: [not, a, port]\n").unwrap();
    assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
}
