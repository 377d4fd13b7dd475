//! Unit tests for archive creation.

use super::*;
use crate::archive::backend::{NativeBackend, TarToolBackend};
use crate::exec::SystemCommandExecutor;
use crate::tool::resolve_tool;
use flate2::read::GzDecoder;
use logtest::Logger;
use rstest::{fixture, rstest};
use std::cell::RefCell;
use tempfile::TempDir;

struct Staging {
    _dir: TempDir,
    config: PackagingConfig,
}

impl Staging {
    fn version_root(&self) -> Utf8PathBuf {
        self.config.version_root(VersioningMode::ByVersion)
    }

    fn add_package(&self, repo_location: &str, file: &str) {
        let dir = self.version_root().join(repo_location);
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join(file), file.as_bytes()).expect("write package");
    }
}

#[fixture]
fn staging() -> Staging {
    let dir = TempDir::new().expect("temp dir creation succeeds");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
    let contents = format!(
        concat!(
            "project = \"acme\"\n",
            "ref = \"3f2c1e9\"\n",
            "version = \"1.4.0\"\n",
            "distribution_server = \"builds.example.com\"\n",
            "staging_root = \"{}\"\n",
            "[[platform_repos]]\nname = \"el7\"\nrepo_location = \"rpm/el7\"\n",
            "[[platform_repos]]\nname = \"deb10\"\nrepo_location = \"deb/deb10\"\n",
        ),
        root
    );
    let config = PackagingConfig::from_toml_str(&contents, Utf8Path::new("test.toml"))
        .expect("test config parses");
    Staging { _dir: dir, config }
}

/// Backend that records requests and fails for chosen sources.
#[derive(Default)]
struct RecordingBackend {
    requests: RefCell<Vec<(Utf8PathBuf, Utf8PathBuf)>>,
    failing_sources: Vec<&'static str>,
}

impl ArchiveBackend for RecordingBackend {
    fn write_archive(&self, request: &ArchiveRequest<'_>) -> Result<String> {
        self.requests
            .borrow_mut()
            .push((request.source.to_owned(), request.destination.to_owned()));
        if self.failing_sources.contains(&request.source.as_str()) {
            return Err(PackagerError::ArchiveTool {
                tool: Utf8PathBuf::from("tar"),
                status: Some(2),
                stderr: format!("{}: Cannot open", request.source),
            });
        }
        fs::write(request.working_dir.join(request.destination), b"archive")?;
        Ok(String::new())
    }
}

fn archive_name(platform: &str) -> ArchiveName {
    ArchiveName::for_platform("acme", platform).expect("valid archive name")
}

fn archive_entries(path: &Utf8Path) -> Vec<(String, u64, u64)> {
    let file = fs::File::open(path).expect("open archive");
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive
        .entries()
        .expect("entries")
        .map(|entry| {
            let entry = entry.expect("entry");
            let path = entry.path().expect("path").to_string_lossy().into_owned();
            let header = entry.header();
            (path, header.uid().expect("uid"), header.gid().expect("gid"))
        })
        .collect()
}

fn leftover_partials(repos_dir: &Utf8Path) -> Vec<String> {
    fs::read_dir(repos_dir)
        .expect("read repos dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".partial"))
        .collect()
}

#[rstest]
#[case(None, StrictMode::Disabled)]
#[case(Some("true"), StrictMode::Enabled)]
#[case(Some("TRUE"), StrictMode::Disabled)]
#[case(Some("1"), StrictMode::Disabled)]
#[case(Some(""), StrictMode::Disabled)]
fn only_exact_true_enables_strict_mode(
    #[case] value: Option<&str>,
    #[case] expected: StrictMode,
) {
    assert_eq!(StrictMode::from_value(value), expected);
}

#[rstest]
#[case("fail-fast", FailurePolicy::FailFast)]
#[case("collect-all", FailurePolicy::CollectAll)]
fn failure_policy_parses(#[case] text: &str, #[case] expected: FailurePolicy) {
    assert_eq!(text.parse::<FailurePolicy>(), Ok(expected));
    assert_eq!(expected.to_string(), text);
}

#[test]
fn failure_policy_rejects_unknown_values() {
    assert_eq!(
        "keep-going".parse::<FailurePolicy>(),
        Err(UnknownFailurePolicy("keep-going".to_owned()))
    );
}

#[rstest]
fn native_archive_contains_root_owned_subtree(staging: Staging) {
    staging.add_package("rpm/el7/x86_64", "acme-1.4.0.rpm");
    let archiver = Archiver::new(&staging.config, &NativeBackend);

    let outcome = temp_env::with_var_unset(STRICT_MODE_ENV, || {
        archiver.create_signed_repo_archive(
            Utf8Path::new("rpm/el7"),
            &archive_name("el7"),
            VersioningMode::ByVersion,
        )
    })
    .expect("archive succeeds");

    let ArchiveOutcome::Created(created) = outcome else {
        panic!("expected an archive to be created");
    };
    assert_eq!(created.path, staging.version_root().join("repos/acme-el7.tar.gz"));
    assert_eq!(
        created.sha256,
        compute_sha256(created.path.as_std_path()).expect("digest")
    );
    let entries = archive_entries(&created.path);
    assert!(entries.iter().all(|(_, uid, gid)| *uid == 0 && *gid == 0));
    let paths: Vec<&str> = entries.iter().map(|(path, _, _)| path.as_str()).collect();
    assert_eq!(
        paths,
        ["rpm/el7", "rpm/el7/x86_64", "rpm/el7/x86_64/acme-1.4.0.rpm"]
    );
    assert!(leftover_partials(&staging.version_root().join(REPOS_DIR)).is_empty());
}

#[rstest]
fn system_tar_archive_matches_layout(staging: Staging) {
    let Ok(tar) = resolve_tool("tar", None) else {
        return;
    };
    staging.add_package("deb/deb10", "acme_1.4.0_amd64.deb");
    let backend = TarToolBackend::new(SystemCommandExecutor::default(), tar);
    let archiver = Archiver::new(&staging.config, &backend);

    let outcome = temp_env::with_var_unset(STRICT_MODE_ENV, || {
        archiver.create_signed_repo_archive(
            Utf8Path::new("deb/deb10"),
            &archive_name("deb10"),
            VersioningMode::ByVersion,
        )
    })
    .expect("archive succeeds");

    let ArchiveOutcome::Created(created) = outcome else {
        panic!("expected an archive to be created");
    };
    let entries = archive_entries(&created.path);
    assert!(
        entries
            .iter()
            .any(|(path, _, _)| path == "deb/deb10/acme_1.4.0_amd64.deb")
    );
    assert!(entries.iter().all(|(_, uid, gid)| *uid == 0 && *gid == 0));
}

#[rstest]
fn empty_subtree_is_skipped_without_strict_mode(staging: Staging) {
    let source = staging.version_root().join("rpm/el7");
    fs::create_dir_all(&source).expect("mkdir");
    let backend = RecordingBackend::default();
    let archiver = Archiver::new(&staging.config, &backend);
    let mut logger = Logger::start();

    let outcome = temp_env::with_var(STRICT_MODE_ENV, Some("false"), || {
        archiver.create_signed_repo_archive(
            Utf8Path::new("rpm/el7"),
            &archive_name("el7"),
            VersioningMode::ByVersion,
        )
    })
    .expect("skip is not an error");

    assert!(matches!(
        outcome,
        ArchiveOutcome::Skipped { ref reason } if reason.ends_with("rpm/el7 has no files")
    ));
    assert!(backend.requests.borrow().is_empty());
    assert!(!staging.version_root().join("repos/acme-el7.tar.gz").exists());

    let mut warned = false;
    while let Some(record) = logger.pop() {
        let message = record.args().to_string();
        if record.level() == log::Level::Warn
            && message.contains("acme-el7")
            && message.contains(source.as_str())
        {
            warned = true;
            break;
        }
    }
    assert!(warned, "expected a skip warning naming acme-el7 and {source}");
}

#[rstest]
fn absent_subtree_fails_in_strict_mode(staging: Staging) {
    let backend = RecordingBackend::default();
    let archiver = Archiver::new(&staging.config, &backend);

    let err = temp_env::with_var(STRICT_MODE_ENV, Some("true"), || {
        archiver.create_signed_repo_archive(
            Utf8Path::new("rpm/el7"),
            &archive_name("el7"),
            VersioningMode::ByVersion,
        )
    })
    .expect_err("strict mode rejects missing packages");

    match err {
        PackagerError::MissingArtifacts { path } => {
            assert_eq!(path, staging.version_root().join("rpm/el7"));
        }
        other => panic!("expected MissingArtifacts, got {other:?}"),
    }
    assert!(backend.requests.borrow().is_empty());
}

#[rstest]
fn by_ref_mode_reads_ref_directory(staging: Staging) {
    let ref_root = staging.config.version_root(VersioningMode::ByRef);
    fs::create_dir_all(ref_root.join("rpm/el7")).expect("mkdir");
    fs::write(ref_root.join("rpm/el7/acme.rpm"), b"rpm").expect("write");
    let backend = RecordingBackend::default();
    let archiver = Archiver::new(&staging.config, &backend);

    let outcome = temp_env::with_var_unset(STRICT_MODE_ENV, || {
        archiver.create_signed_repo_archive(
            Utf8Path::new("rpm/el7"),
            &archive_name("el7"),
            VersioningMode::ByRef,
        )
    })
    .expect("archive succeeds");

    let ArchiveOutcome::Created(created) = outcome else {
        panic!("expected an archive to be created");
    };
    assert_eq!(created.path, ref_root.join("repos/acme-el7.tar.gz"));
}

#[rstest]
fn backend_writes_to_staging_file_inside_repos(staging: Staging) {
    staging.add_package("rpm/el7", "acme.rpm");
    let backend = RecordingBackend::default();
    let archiver = Archiver::new(&staging.config, &backend);

    temp_env::with_var_unset(STRICT_MODE_ENV, || {
        archiver.create_signed_repo_archive(
            Utf8Path::new("rpm/el7"),
            &archive_name("el7"),
            VersioningMode::ByVersion,
        )
    })
    .expect("archive succeeds");

    let requests = backend.requests.borrow();
    let (source, destination) = requests.first().expect("one request");
    assert_eq!(source, "rpm/el7");
    assert_eq!(destination.parent(), Some(Utf8Path::new(REPOS_DIR)));
    assert!(destination.as_str().ends_with(".partial"));
}

#[rstest]
fn failed_write_keeps_previous_archive(staging: Staging) {
    staging.add_package("rpm/el7", "acme.rpm");
    let repos_dir = staging.version_root().join(REPOS_DIR);
    fs::create_dir_all(&repos_dir).expect("mkdir");
    fs::write(repos_dir.join("acme-el7.tar.gz"), b"previous").expect("write");
    let backend = RecordingBackend {
        failing_sources: vec!["rpm/el7"],
        ..RecordingBackend::default()
    };
    let archiver = Archiver::new(&staging.config, &backend);

    let err = temp_env::with_var_unset(STRICT_MODE_ENV, || {
        archiver.create_signed_repo_archive(
            Utf8Path::new("rpm/el7"),
            &archive_name("el7"),
            VersioningMode::ByVersion,
        )
    })
    .expect_err("backend fails");

    assert!(matches!(err, PackagerError::ArchiveTool { .. }));
    assert_eq!(
        fs::read(repos_dir.join("acme-el7.tar.gz")).expect("read"),
        b"previous"
    );
    assert!(leftover_partials(&repos_dir).is_empty());
}

#[rstest]
fn all_platforms_are_archived_in_table_order(staging: Staging) {
    staging.add_package("rpm/el7", "acme.rpm");
    staging.add_package("deb/deb10", "acme.deb");
    let backend = RecordingBackend::default();
    let archiver = Archiver::new(&staging.config, &backend);

    let report = temp_env::with_var_unset(STRICT_MODE_ENV, || {
        archiver.create_all_repo_archives(
            "acme",
            VersioningMode::ByVersion,
            FailurePolicy::FailFast,
        )
    })
    .expect("all archives succeed");

    let names: Vec<String> = report
        .created()
        .map(|(entry, _)| entry.archive_name.to_string())
        .collect();
    assert_eq!(names, ["acme-el7", "acme-deb10"]);
    assert_eq!(report.skipped_count(), 0);
}

#[rstest]
fn empty_platform_is_reported_as_skipped(staging: Staging) {
    staging.add_package("deb/deb10", "acme.deb");
    let backend = RecordingBackend::default();
    let archiver = Archiver::new(&staging.config, &backend);

    let report = temp_env::with_var_unset(STRICT_MODE_ENV, || {
        archiver.create_all_repo_archives(
            "acme",
            VersioningMode::ByVersion,
            FailurePolicy::FailFast,
        )
    })
    .expect("skips are not failures");

    assert_eq!(report.platforms.len(), 2);
    assert_eq!(report.skipped_count(), 1);
    assert!(matches!(report.platforms[0].outcome, ArchiveOutcome::Skipped { .. }));
    assert_eq!(report.platforms[0].platform, "el7");
}

#[rstest]
fn fail_fast_stops_at_first_failure(staging: Staging) {
    staging.add_package("rpm/el7", "acme.rpm");
    staging.add_package("deb/deb10", "acme.deb");
    let backend = RecordingBackend {
        failing_sources: vec!["rpm/el7"],
        ..RecordingBackend::default()
    };
    let archiver = Archiver::new(&staging.config, &backend);

    let err = temp_env::with_var_unset(STRICT_MODE_ENV, || {
        archiver.create_all_repo_archives(
            "acme",
            VersioningMode::ByVersion,
            FailurePolicy::FailFast,
        )
    })
    .expect_err("el7 fails");

    assert!(matches!(
        err,
        PackagerError::PlatformArchive { ref platform, .. } if platform == "el7"
    ));
    assert_eq!(backend.requests.borrow().len(), 1);
}

#[rstest]
fn collect_all_attempts_every_platform(staging: Staging) {
    staging.add_package("rpm/el7", "acme.rpm");
    staging.add_package("deb/deb10", "acme.deb");
    let backend = RecordingBackend {
        failing_sources: vec!["rpm/el7"],
        ..RecordingBackend::default()
    };
    let archiver = Archiver::new(&staging.config, &backend);

    let err = temp_env::with_var_unset(STRICT_MODE_ENV, || {
        archiver.create_all_repo_archives(
            "acme",
            VersioningMode::ByVersion,
            FailurePolicy::CollectAll,
        )
    })
    .expect_err("el7 fails");

    let PackagerError::ArchiveBatch { failures } = err else {
        panic!("expected ArchiveBatch");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].platform, "el7");
    assert_eq!(backend.requests.borrow().len(), 2);
    assert!(staging.version_root().join("repos/acme-deb10.tar.gz").exists());
}

#[rstest]
fn report_serialises_outcomes_with_status_tag(staging: Staging) {
    staging.add_package("deb/deb10", "acme.deb");
    let backend = RecordingBackend::default();
    let archiver = Archiver::new(&staging.config, &backend);

    let report = temp_env::with_var_unset(STRICT_MODE_ENV, || {
        archiver.create_all_repo_archives(
            "acme",
            VersioningMode::ByVersion,
            FailurePolicy::FailFast,
        )
    })
    .expect("archives succeed");
    let json = serde_json::to_value(&report).expect("report serialises");

    assert_eq!(json["platforms"][0]["outcome"]["status"], "skipped");
    assert_eq!(json["platforms"][1]["outcome"]["status"], "created");
    assert_eq!(json["platforms"][1]["archive_name"], "acme-deb10");
}

#[rstest]
#[case::archive_dir("repos")]
#[case::dotted_archive_dir("./repos")]
#[case::version_root(".")]
fn subtree_overlapping_archive_dir_is_rejected(staging: Staging, #[case] subpath: &str) {
    staging.add_package("repos/el7", "acme.rpm");
    let archiver = Archiver::new(&staging.config, &NativeBackend);

    let err = temp_env::with_var_unset(STRICT_MODE_ENV, || {
        archiver.create_signed_repo_archive(
            Utf8Path::new(subpath),
            &archive_name("all"),
            VersioningMode::ByVersion,
        )
    })
    .expect_err("overlapping subtree must be rejected");

    assert!(matches!(err, PackagerError::OverlappingRepoSubtree { .. }));
    let repos_dir = staging.version_root().join(REPOS_DIR);
    assert!(leftover_partials(&repos_dir).is_empty());
    assert!(!repos_dir.join("acme-all.tar.gz").exists());
}

#[rstest]
fn nested_project_is_rejected_before_writing(staging: Staging) {
    staging.add_package("rpm/el7", "acme.rpm");
    let backend = RecordingBackend::default();
    let archiver = Archiver::new(&staging.config, &backend);

    let err = temp_env::with_var_unset(STRICT_MODE_ENV, || {
        archiver.create_all_repo_archives(
            "acme/x",
            VersioningMode::ByVersion,
            FailurePolicy::CollectAll,
        )
    })
    .expect_err("nested project must be rejected");

    assert!(matches!(err, PackagerError::InvalidArchiveName { ref name } if name == "acme/x-el7"));
    assert!(backend.requests.borrow().is_empty());
    assert!(!staging.version_root().join(REPOS_DIR).exists());
}
