mod common;

use common::{FakeToolchain, make_template, s};
use macos_dist::bundler::{DiskImage, Error, ToolOutput};
use std::path::Path;

#[cfg(unix)]
#[tokio::test]
async fn image_holds_app_and_applications_link() {
    let tmp = tempfile::tempdir().unwrap();
    let app = make_template(tmp.path(), "ChronoChat");
    let output = tmp.path().join("build/ChronoChat-0.5-Mavericks-10.9.dmg");

    let image = DiskImage::new(&output, "ChronoChat-0.5-Mavericks-10.9", "UDBZ").unwrap();
    image
        .symlink(Path::new("/Applications"), "/Applications")
        .unwrap();
    image.stage(&app, "/ChronoChat.app").await.unwrap();

    let staging = image.staging_dir().to_path_buf();
    let link = std::fs::read_link(staging.join("Applications")).unwrap();
    assert_eq!(link, Path::new("/Applications"));
    assert!(staging.join("ChronoChat.app/Contents/Info.plist").is_file());

    let fake = FakeToolchain::new();
    let report = image.create(&fake).await.unwrap();

    assert!(report.succeeded());
    assert_eq!(report.path, output);
    assert!(output.is_file());
    assert!(!staging.exists());
    assert_eq!(
        fake.calls_to("hdiutil"),
        vec![vec![
            "create".to_string(),
            "-srcfolder".to_string(),
            s(&staging),
            "-format".to_string(),
            "UDBZ".to_string(),
            "-volname".to_string(),
            "ChronoChat-0.5-Mavericks-10.9".to_string(),
            s(&output),
        ]]
    );
}

#[tokio::test]
async fn tool_failure_is_reported_not_raised() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("out.dmg");
    let image = DiskImage::new(&output, "Vol", "UDBZ").unwrap();
    image.mkdir("/Docs").await.unwrap();
    let staging = image.staging_dir().to_path_buf();

    let fake = FakeToolchain::new().with_output("hdiutil", ToolOutput::failure(1, "hdiutil: create failed"));
    let report = image.create(&fake).await.unwrap();

    assert!(!report.succeeded());
    assert_eq!(report.output.status, Some(1));
    assert!(!staging.exists());
    assert!(!output.exists());
}

#[tokio::test]
async fn existing_output_is_replaced() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("out.dmg");
    std::fs::create_dir_all(output.join("leftover")).unwrap();

    let image = DiskImage::new(&output, "Vol", "UDZO").unwrap();
    let report = image.create(&FakeToolchain::new()).await.unwrap();

    assert!(report.succeeded());
    assert!(output.is_file());
}

#[tokio::test]
async fn staging_destinations_must_be_absolute() {
    let tmp = tempfile::tempdir().unwrap();
    let readme = tmp.path().join("README");
    std::fs::write(&readme, b"read me").unwrap();
    let image = DiskImage::new(tmp.path().join("out.dmg"), "Vol", "UDBZ").unwrap();

    let err = image.stage(&readme, "README").await.unwrap_err();
    assert!(matches!(err, Error::InvalidStagingPath(_)));

    let staged = image.stage(&readme, "/").await.unwrap();
    assert_eq!(staged, image.staging_dir().join("README"));
}
