#[cfg(all(test, unix))]
mod tests {
    use linux_release_packager::bundler::archive::read_header;
    use linux_release_packager::bundler::{
        Arch, AsarArchiver, Bundler, CleanupPolicy, Error, PipelineOutcome, ResourceArchiver,
        Result, Settings, SettingsBuilder, Stage, ToolSettings, ToolStatus, scaffold_templates,
    };
    use std::future::Future;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    const PACK_NAME: &str = "sample-1.2.3-amd64";

    const FAKE_DPKG_DEB: &str = r#"#!/bin/sh
# dpkg-deb -Zxz --build <dir> <out>: the "package" is the rendered control file
cp "$3/DEBIAN/control" "$4"
"#;

    const FAKE_RPMBUILD: &str = r#"#!/bin/sh
# rpmbuild --quiet --target <arch> -D "_topdir <dir>" -D "_builddir <dir>" -bb <spec>
arch="$3"
topdir="${5#_topdir }"
mkdir -p "$topdir/RPMS/$arch"
cp "$9" "$topdir/RPMS/$arch/sample-1.2.3-1.$arch.rpm"
"#;

    const FAILING_TOOL: &str = "#!/bin/sh\necho \"tool: error: cannot build\" >&2\nexit 2\n";

    struct Fixture {
        _parent: TempDir,
        root: PathBuf,
        tools: TempDir,
    }

    impl Fixture {
        async fn new() -> Self {
            Self::named("sample").await
        }

        /// Project in a directory called `dir` under a fresh temp directory.
        async fn named(dir: &str) -> Self {
            let parent = tempfile::tempdir().unwrap();
            let root = parent.path().join(dir);
            std::fs::create_dir_all(&root).unwrap();
            let root = root.as_path();

            write(
                root,
                "app/package.json",
                r#"{
                    "name": "sample",
                    "productName": "Sample App",
                    "version": "1.2.3",
                    "description": "A sample application",
                    "author": { "name": "Jane Doe", "email": "jane@example.com" }
                }"#,
            );
            write(root, "build/index.html", "<html></html>");
            write(root, "build/js/app.js", "console.log('hi')");
            write(root, "node_modules/electron-prebuilt/dist/electron", "#!/bin/sh\n");
            write(root, "node_modules/electron-prebuilt/dist/LICENSE", "MIT");
            write(root, "node_modules/electron-prebuilt/dist/locales/en-US.pak", "pak");
            write(root, "app/images/linux/icon.png", "png");
            write(root, "dictionaries/en-US.dic", "words");

            let settings = SettingsBuilder::new()
                .project_root(root)
                .arch(Arch::X86_64)
                .build()
                .unwrap();
            scaffold_templates(&settings, false).await.unwrap();

            let tools = tempfile::tempdir().unwrap();
            let fixture = Self {
                root: root.to_path_buf(),
                _parent: parent,
                tools,
            };
            fixture.tool("dpkg-deb", FAKE_DPKG_DEB);
            fixture.tool("rpmbuild", FAKE_RPMBUILD);
            fixture
        }

        fn root(&self) -> &Path {
            &self.root
        }

        fn tool(&self, name: &str, script: &str) -> PathBuf {
            let path = self.tools.path().join(name);
            std::fs::write(&path, script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn tool_settings(&self) -> ToolSettings {
            ToolSettings {
                use_fakeroot: false,
                dpkg_deb: self.tools.path().join("dpkg-deb"),
                rpmbuild: self.tools.path().join("rpmbuild"),
                timeout: Some(Duration::from_secs(30)),
                ..ToolSettings::default()
            }
        }

        fn builder(&self) -> SettingsBuilder {
            SettingsBuilder::new()
                .project_root(self.root())
                .arch(Arch::X86_64)
                .tools(self.tool_settings())
        }

        fn settings(&self, cleanup: CleanupPolicy) -> Settings {
            self.builder().cleanup(cleanup).build().unwrap()
        }
    }

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn listing(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        let mut entries: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().is_file())
            .map(|e| (e.path().to_path_buf(), std::fs::read(e.path()).unwrap()))
            .collect();
        entries.sort();
        entries
    }

    #[tokio::test]
    async fn test_full_pipeline_produces_both_packages() {
        let fixture = Fixture::new().await;
        let build_before = listing(&fixture.root().join("build"));

        let outcome = Bundler::new(fixture.settings(CleanupPolicy::OnSuccess))
            .run()
            .await;

        let PipelineOutcome::Completed(report) = &outcome else {
            panic!("pipeline failed: {outcome:?}");
        };
        assert_eq!(report.pack_name, PACK_NAME);
        assert_eq!(report.completed, Stage::PIPELINE.to_vec());
        assert!(report.cleaned);
        assert!(!fixture.root().join("tmp").exists());
        assert_eq!(listing(&fixture.root().join("build")), build_before);

        let deb = report.deb.as_ref().unwrap();
        assert!(deb.succeeded(), "{:?}", deb.tool);
        let deb_path = fixture.root().join("releases").join(format!("{PACK_NAME}.deb"));
        assert_eq!(deb.paths(), vec![deb_path.clone()]);
        assert_eq!(deb.artifacts[0].checksum.len(), 64);

        let control = std::fs::read_to_string(&deb_path).unwrap();
        assert!(control.contains("Package: sample\n"));
        assert!(control.contains("Version: 1.2.3\n"));
        assert!(control.contains("Maintainer: Jane Doe <jane@example.com>\n"));
        assert!(control.contains("Architecture: amd64\n"));
        assert!(control.contains("Description: A sample application"));
        assert!(!control.contains("{{"));
        let size: u64 = control
            .lines()
            .find_map(|l| l.strip_prefix("Installed-Size: "))
            .unwrap()
            .parse()
            .unwrap();
        assert!(size >= 1);

        let rpm = report.rpm.as_ref().unwrap();
        assert!(rpm.succeeded(), "{:?}", rpm.tool);
        let rpm_path = fixture.root().join("releases/sample-1.2.3-1.x86_64.rpm");
        assert_eq!(rpm.paths(), vec![rpm_path.clone()]);
        let spec = std::fs::read_to_string(rpm_path).unwrap();
        assert!(spec.contains("Name: sample\n"));
        assert!(spec.contains("Packager: Jane Doe <jane@example.com>"));
        assert!(spec.contains("%{buildroot}/opt/sample"));
        assert!(!spec.contains("{{"));
    }

    #[tokio::test]
    async fn test_glob_metacharacters_in_project_path() {
        let fixture = Fixture::named("proj[1]").await;

        let outcome = Bundler::new(fixture.settings(CleanupPolicy::Never)).run().await;

        let rpm = outcome.report().rpm.as_ref().unwrap();
        assert_eq!(rpm.tool.status, ToolStatus::Exited(0));
        let published = fixture.root().join("releases/sample-1.2.3-1.x86_64.rpm");
        assert_eq!(rpm.paths(), vec![published.clone()]);
        assert!(published.is_file());
    }

    #[tokio::test]
    async fn test_rpm_follows_configured_arch() {
        let fixture = Fixture::new().await;
        let settings = fixture
            .builder()
            .arch(Arch::AArch64)
            .cleanup(CleanupPolicy::OnSuccess)
            .build()
            .unwrap();

        let outcome = Bundler::new(settings).run().await;

        assert!(outcome.is_completed(), "{outcome:?}");
        let report = outcome.report();
        assert_eq!(report.pack_name, "sample-1.2.3-arm64");
        let rpm = report.rpm.as_ref().unwrap();
        assert!(rpm.tool.command_line.contains("--target aarch64"));
        assert_eq!(
            rpm.paths(),
            vec![fixture.root().join("releases/sample-1.2.3-1.aarch64.rpm")]
        );
        assert!(fixture.root().join("releases/sample-1.2.3-arm64.deb").is_file());
    }

    #[tokio::test]
    async fn test_staged_tree_layout() {
        let fixture = Fixture::new().await;

        let outcome = Bundler::new(fixture.settings(CleanupPolicy::Never)).run().await;

        assert!(outcome.is_completed());
        assert!(!outcome.report().cleaned);
        let pack_dir = fixture.root().join("tmp").join(PACK_NAME);
        let app_dir = pack_dir.join("opt/sample");

        assert!(app_dir.join("sample").is_file());
        assert!(!app_dir.join("electron").exists());
        assert!(app_dir.join("LICENSE").is_file());
        assert!(app_dir.join("locales/en-US.pak").is_file());
        assert!(app_dir.join("icon.png").is_file());
        assert!(app_dir.join("resources/dictionaries/en-US.dic").is_file());

        let (header, _) = read_header(&app_dir.join("resources/app.asar")).unwrap();
        assert!(header["files"]["index.html"].is_object());
        assert!(header["files"]["js"]["files"]["app.js"].is_object());

        let desktop =
            std::fs::read_to_string(pack_dir.join("usr/share/applications/sample.desktop"))
                .unwrap();
        assert!(desktop.contains("Name=Sample App\n"));
        assert!(desktop.contains("Version=1.2.3\n"));
        assert!(desktop.contains("Comment=A sample application\n"));
        assert!(desktop.contains("Exec=/opt/sample/sample\n"));
        assert!(!desktop.contains("{{"));
    }

    #[tokio::test]
    async fn test_failing_tools_do_not_fail_the_run() {
        let fixture = Fixture::new().await;
        fixture.tool("dpkg-deb", FAILING_TOOL);
        fixture.tool("rpmbuild", FAILING_TOOL);

        let outcome = Bundler::new(fixture.settings(CleanupPolicy::OnSuccess))
            .run()
            .await;

        let PipelineOutcome::Completed(report) = &outcome else {
            panic!("pipeline failed: {outcome:?}");
        };
        for package in report.packages() {
            assert!(!package.succeeded());
            assert_eq!(package.tool.status, ToolStatus::Exited(2));
            assert!(package.tool.stderr.contains("cannot build"));
            assert!(package.artifacts.is_empty());
        }
        assert!(!fixture.root().join("releases").join(format!("{PACK_NAME}.deb")).exists());
        assert!(report.cleaned);
        assert!(!fixture.root().join("tmp").exists());
    }

    #[tokio::test]
    async fn test_stderr_output_counts_as_failure() {
        let fixture = Fixture::new().await;
        fixture.tool(
            "dpkg-deb",
            "#!/bin/sh\ncp \"$3/DEBIAN/control\" \"$4\"\necho 'warning: odd' >&2\n",
        );

        let outcome = Bundler::new(fixture.settings(CleanupPolicy::OnSuccess))
            .run()
            .await;

        let deb = outcome.report().deb.as_ref().unwrap();
        assert_eq!(deb.tool.status, ToolStatus::Exited(0));
        assert!(!deb.succeeded());
        assert!(deb.tool.failure_reason().unwrap().contains("warning: odd"));
        assert!(outcome.report().rpm.as_ref().unwrap().succeeded());
    }

    #[tokio::test]
    async fn test_missing_tool_is_best_effort() {
        let fixture = Fixture::new().await;
        let tools = ToolSettings {
            dpkg_deb: fixture.tools.path().join("no-such-dpkg-deb"),
            ..fixture.tool_settings()
        };
        let settings = fixture.builder().tools(tools).build().unwrap();

        let outcome = Bundler::new(settings).run().await;

        assert!(outcome.is_completed());
        let deb = outcome.report().deb.as_ref().unwrap();
        assert!(matches!(deb.tool.status, ToolStatus::NotFound(_)));
        assert!(outcome.report().rpm.as_ref().unwrap().succeeded());
    }

    #[tokio::test]
    async fn test_hung_tool_times_out() {
        let fixture = Fixture::new().await;
        fixture.tool("rpmbuild", "#!/bin/sh\nsleep 10\n");
        let settings = fixture
            .builder()
            .tool_timeout(Duration::from_millis(300))
            .build()
            .unwrap();

        let outcome = Bundler::new(settings).run().await;

        assert!(outcome.is_completed());
        let rpm = outcome.report().rpm.as_ref().unwrap();
        assert!(matches!(rpm.tool.status, ToolStatus::TimedOut(_)));
        assert!(rpm.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_missing_runtime_keeps_staging_tree() {
        let fixture = Fixture::new().await;
        let settings = fixture
            .builder()
            .runtime_dir("node_modules/does-not-exist")
            .build()
            .unwrap();

        let outcome = Bundler::new(settings).run().await;

        let PipelineOutcome::Failed { stage, error, report } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(stage, Stage::StageRuntime);
        assert!(error.is_not_found(), "{error}");
        assert_eq!(report.completed, vec![Stage::InitializeWorkspace]);
        assert!(!report.cleaned);
        assert!(fixture.root().join("tmp").is_dir());
        assert!(report.deb.is_none());
    }

    #[tokio::test]
    async fn test_always_policy_cleans_after_failure() {
        let fixture = Fixture::new().await;
        let settings = fixture
            .builder()
            .runtime_dir("node_modules/does-not-exist")
            .cleanup(CleanupPolicy::Always)
            .build()
            .unwrap();

        let outcome = Bundler::new(settings).run().await;

        assert!(!outcome.is_completed());
        assert!(outcome.report().cleaned);
        assert!(!fixture.root().join("tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_manifest_touches_nothing() {
        let fixture = Fixture::new().await;
        std::fs::remove_file(fixture.root().join("app/package.json")).unwrap();
        write(fixture.root(), "tmp/leftover.txt", "keep me");

        let outcome = Bundler::new(fixture.settings(CleanupPolicy::Always))
            .run()
            .await;

        let PipelineOutcome::Failed { stage, report, .. } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(stage, Stage::InitializeWorkspace);
        assert!(report.completed.is_empty());
        assert!(fixture.root().join("tmp/leftover.txt").is_file());
    }

    #[tokio::test]
    async fn test_missing_icon_fails_metadata_stage() {
        let fixture = Fixture::new().await;
        std::fs::remove_file(fixture.root().join("app/images/linux/icon.png")).unwrap();
        std::fs::remove_dir_all(fixture.root().join("dictionaries")).unwrap();

        let outcome = Bundler::new(fixture.settings(CleanupPolicy::OnSuccess))
            .run()
            .await;

        let PipelineOutcome::Failed { stage, error, .. } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(stage, Stage::FinalizeMetadata);
        let Error::Stage { failures, .. } = &error else {
            panic!("unexpected error {error}");
        };
        assert_eq!(failures.len(), 2);
        assert!(failures[0].starts_with("icon"));
    }

    struct FailingArchiver;

    impl ResourceArchiver for FailingArchiver {
        fn seal(&self, _source: &Path, output: &Path) -> impl Future<Output = Result<()>> + Send {
            let output = output.to_path_buf();
            async move {
                Err(Error::Archive {
                    output,
                    reason: "disk full".to_string(),
                })
            }
        }
    }

    #[tokio::test]
    async fn test_archiver_failure_stops_pipeline() {
        let fixture = Fixture::new().await;

        let outcome =
            Bundler::with_archiver(fixture.settings(CleanupPolicy::OnSuccess), FailingArchiver)
                .run()
                .await;

        let PipelineOutcome::Failed { stage, error, report } = outcome else {
            panic!("expected failure");
        };
        assert_eq!(stage, Stage::ArchiveResources);
        assert!(format!("{error:?}").contains("disk full"));
        assert_eq!(
            report.completed,
            vec![Stage::InitializeWorkspace, Stage::StageRuntime]
        );
        assert!(!fixture.root().join("releases").join(format!("{PACK_NAME}.deb")).exists());
    }

    #[derive(Clone, Default)]
    struct CountingArchiver {
        inner: AsarArchiver,
        calls: Arc<AtomicUsize>,
    }

    impl ResourceArchiver for CountingArchiver {
        fn seal(&self, source: &Path, output: &Path) -> impl Future<Output = Result<()>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.seal(source, output)
        }
    }

    #[tokio::test]
    async fn test_archiver_invoked_once() {
        let fixture = Fixture::new().await;
        let archiver = CountingArchiver::default();

        let outcome =
            Bundler::with_archiver(fixture.settings(CleanupPolicy::OnSuccess), archiver.clone())
                .run()
                .await;

        assert!(outcome.is_completed());
        assert_eq!(archiver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rerun_overwrites_previous_release() {
        let fixture = Fixture::new().await;
        let deb_path = fixture.root().join("releases").join(format!("{PACK_NAME}.deb"));
        write(fixture.root(), &format!("releases/{PACK_NAME}.deb"), "stale");

        let outcome = Bundler::new(fixture.settings(CleanupPolicy::OnSuccess))
            .run()
            .await;

        assert!(outcome.is_completed());
        assert!(std::fs::read_to_string(deb_path).unwrap().contains("Package: sample"));
    }
}
