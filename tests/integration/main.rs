//! Integration tests for swsync

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    /// swsync isolated from the user's config and state
    pub fn swsync(home: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("swsync");
        cmd.env("SWSYNC_CONFIG", home.path().join("config.toml"))
            .env("SWSYNC_STATE_DIR", home.path().join("state"))
            .env("NO_COLOR", "1");
        cmd
    }

    #[test]
    fn help_displays() {
        let home = TempDir::new().unwrap();
        swsync(&home)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("ffline cache synchronizer"));
    }

    #[test]
    fn version_displays() {
        let home = TempDir::new().unwrap();
        swsync(&home)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("swsync"));
    }

    #[test]
    fn config_path() {
        let home = TempDir::new().unwrap();
        swsync(&home)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let home = TempDir::new().unwrap();
        swsync(&home)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[caches]"))
            .stdout(predicate::str::contains("app-temp-cache"));
    }

    #[test]
    fn config_init_writes_file() {
        let home = TempDir::new().unwrap();
        swsync(&home).args(["config", "init"]).assert().success();
        assert!(home.path().join("config.toml").exists());

        swsync(&home)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--force"));
    }

    #[test]
    fn install_without_manifest_hints() {
        let home = TempDir::new().unwrap();
        swsync(&home)
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No build manifest configured"))
            .stderr(predicate::str::contains("--manifest"));
    }

    #[test]
    fn status_with_nothing_installed() {
        let home = TempDir::new().unwrap();
        swsync(&home)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("not installed"))
            .stdout(predicate::str::contains("No cache partitions"));
    }

    #[test]
    fn clear_with_nothing_cached() {
        let home = TempDir::new().unwrap();
        swsync(&home)
            .args(["clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache partitions"));
    }
}

mod manifest_tests {
    use super::cli_tests::swsync;
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn generate_writes_manifest_into_build_dir() {
        let home = TempDir::new().unwrap();
        let build = home.path().join("build");
        write(&build, "index.html", "<html>");
        write(&build, "main.dart.js", "void main() {}");
        write(&build, "assets/FontManifest.json", "[]");
        write(&build, ".last_build_id", "abc");

        swsync(&home)
            .args(["manifest", "generate"])
            .arg(&build)
            .assert()
            .success()
            .stdout(predicate::str::contains("Fingerprinted 4 resources"));

        let content = fs::read_to_string(build.join("swsync-manifest.json")).unwrap();
        let manifest: serde_json::Value = serde_json::from_str(&content).unwrap();
        let resources = manifest["resources"].as_object().unwrap();
        assert!(resources.contains_key("/"));
        assert!(resources.contains_key("assets/FontManifest.json"));
        assert!(!resources.contains_key(".last_build_id"));
        assert_eq!(resources["/"], resources["index.html"]);

        // Regenerating does not fingerprint the manifest itself
        swsync(&home)
            .args(["manifest", "generate"])
            .arg(&build)
            .assert()
            .success()
            .stdout(predicate::str::contains("Fingerprinted 4 resources"));
    }

    #[test]
    fn generate_to_stdout_with_shell_override() {
        let home = TempDir::new().unwrap();
        let build = home.path().join("build");
        write(&build, "index.html", "<html>");
        write(&build, "main.dart.js", "void main() {}");

        let output = swsync(&home)
            .args(["manifest", "generate", "--stdout", "--shell", "main.dart.js"])
            .arg(&build)
            .output()
            .unwrap();
        assert!(output.status.success());

        let manifest: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(manifest["shell"], serde_json::json!(["main.dart.js"]));
        assert!(!build.join("swsync-manifest.json").exists());
    }

    #[test]
    fn diff_reports_changes() {
        let home = TempDir::new().unwrap();
        let old = home.path().join("old.json");
        let new = home.path().join("new.json");
        fs::write(
            &old,
            r#"{"resources": {"index.html": "a", "main.dart.js": "b", "gone.png": "c"}}"#,
        )
        .unwrap();
        fs::write(
            &new,
            r#"{"resources": {"index.html": "a", "main.dart.js": "B", "new.png": "d"}}"#,
        )
        .unwrap();

        swsync(&home)
            .args(["manifest", "diff"])
            .arg(&old)
            .arg(&new)
            .assert()
            .success()
            .stdout(predicate::str::contains("~ main.dart.js"))
            .stdout(predicate::str::contains("+ new.png"))
            .stdout(predicate::str::contains("- gone.png"))
            .stdout(predicate::str::contains("evict 2 entries"));
    }

    #[test]
    fn invalid_manifest_is_rejected() {
        let home = TempDir::new().unwrap();
        let manifest = home.path().join("bad.json");
        fs::write(
            &manifest,
            r#"{"resources": {"index.html": "a"}, "shell": ["main.dart.js"]}"#,
        )
        .unwrap();

        swsync(&home)
            .args(["manifest", "show", "--manifest"])
            .arg(&manifest)
            .assert()
            .failure()
            .stderr(predicate::str::contains("main.dart.js"));
    }
}

mod lifecycle_tests {
    use super::cli_tests::swsync;
    use assert_cmd::Command;
    use predicates::prelude::*;
    use std::collections::HashMap;
    use std::fs;
    use std::io::{BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use tempfile::TempDir;

    /// A static site served over HTTP from an in-memory file table
    struct Site {
        origin: String,
        files: Arc<Mutex<HashMap<String, String>>>,
        build: PathBuf,
    }

    impl Site {
        fn start(home: &TempDir) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let origin = format!("http://{}", listener.local_addr().unwrap());
            let files: Arc<Mutex<HashMap<String, String>>> = Arc::default();

            let shared = files.clone();
            thread::spawn(move || {
                for stream in listener.incoming().flatten() {
                    serve(stream, &shared);
                }
            });

            Self {
                origin,
                files,
                build: home.path().join("build"),
            }
        }

        /// Publish files to both the build directory and the server
        fn deploy(&self, files: &[(&str, &str)]) {
            for (rel, contents) in files {
                let path = self.build.join(rel);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, contents).unwrap();
                self.files
                    .lock()
                    .unwrap()
                    .insert(format!("/{}", rel), contents.to_string());
            }
        }

        /// Change what the server answers without touching the build
        fn serve_only(&self, rel: &str, contents: &str) {
            self.files
                .lock()
                .unwrap()
                .insert(format!("/{}", rel), contents.to_string());
        }

        fn manifest(&self) -> PathBuf {
            self.build.join("swsync-manifest.json")
        }
    }

    fn serve(mut stream: TcpStream, files: &Mutex<HashMap<String, String>>) {
        let Ok(clone) = stream.try_clone() else {
            return;
        };
        let mut reader = BufReader::new(clone);
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).is_err() {
            return;
        }
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) if line == "\r\n" => break,
                Ok(_) => {}
            }
        }

        let target = request_line.split_whitespace().nth(1).unwrap_or("/");
        let path = target.split('?').next().unwrap_or("/");
        let path = if path == "/" { "/index.html" } else { path };

        let response = match files.lock().unwrap().get(path) {
            Some(body) => format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            ),
            None => {
                "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
            }
        };
        let _ = stream.write_all(response.as_bytes());
    }

    fn worker_cmd(home: &TempDir, site: &Site) -> Command {
        let mut cmd = swsync(home);
        cmd.arg("--origin")
            .arg(&site.origin)
            .arg("--manifest")
            .arg(site.manifest());
        cmd
    }

    fn generate(home: &TempDir, site: &Site) {
        swsync(home)
            .args(["manifest", "generate", "--shell", "index.html,main.dart.js"])
            .arg(&site.build)
            .assert()
            .success();
    }

    fn status_json(home: &TempDir, site: &Site) -> serde_json::Value {
        let output = worker_cmd(home, site)
            .args(["status", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());
        serde_json::from_slice(&output.stdout).unwrap()
    }

    fn journal_events(home: &Path) -> Vec<String> {
        fs::read_to_string(home.join("state").join("journal.log"))
            .unwrap_or_default()
            .lines()
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
            .filter_map(|event| event["event"].as_str().map(str::to_string))
            .collect()
    }

    #[test]
    fn activate_requires_install() {
        let home = TempDir::new().unwrap();
        let site = Site::start(&home);
        site.deploy(&[("index.html", "<html>v1"), ("main.dart.js", "js-v1")]);
        generate(&home, &site);

        worker_cmd(&home, &site)
            .arg("activate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No installed worker"))
            .stderr(predicate::str::contains("worker is parsed"))
            .stderr(predicate::str::contains("swsync install"));
    }

    /// Rewrite the persisted lifecycle state as a killed run leaves it
    fn interrupt(home: &TempDir, state: &str) {
        let path = home.path().join("state").join("worker.json");
        let mut record: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        record["state"] = serde_json::Value::from(state);
        fs::write(&path, record.to_string()).unwrap();
    }

    #[test]
    fn interrupted_runs_recover() {
        let home = TempDir::new().unwrap();
        let site = Site::start(&home);
        site.deploy(&[("index.html", "<html>v1"), ("main.dart.js", "js-v1")]);
        generate(&home, &site);

        worker_cmd(&home, &site).arg("install").assert().success();
        interrupt(&home, "installing");
        worker_cmd(&home, &site).arg("install").assert().success();

        interrupt(&home, "activating");
        worker_cmd(&home, &site)
            .arg("activate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("worker is activating"))
            .stderr(predicate::str::contains("swsync install"));

        worker_cmd(&home, &site).arg("install").assert().success();
        worker_cmd(&home, &site).arg("activate").assert().success();
        assert_eq!(status_json(&home, &site)["worker"]["state"], "activated");
    }

    #[test]
    fn clear_resets_a_stuck_worker() {
        let home = TempDir::new().unwrap();
        let site = Site::start(&home);
        site.deploy(&[("index.html", "<html>v1"), ("main.dart.js", "js-v1")]);
        generate(&home, &site);

        worker_cmd(&home, &site).arg("install").assert().success();
        interrupt(&home, "installing");

        worker_cmd(&home, &site)
            .args(["clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("worker record"));
        assert!(!home.path().join("state").join("worker.json").exists());
        assert!(status_json(&home, &site)["worker"].is_null());
    }

    #[test]
    fn install_activate_fetch_upgrade() {
        let home = TempDir::new().unwrap();
        let site = Site::start(&home);
        site.deploy(&[
            ("index.html", "<html>v1"),
            ("main.dart.js", "js-v1"),
            ("assets/logo.png", "png-v1"),
        ]);
        generate(&home, &site);

        worker_cmd(&home, &site)
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::contains("Staged 2 shell files"));

        worker_cmd(&home, &site)
            .arg("activate")
            .assert()
            .success()
            .stdout(predicate::str::contains("No previous manifest"))
            .stdout(predicate::str::contains("Promoted 2 shell files"));

        // Shell files were promoted into the content cache
        worker_cmd(&home, &site)
            .args(["fetch", "main.dart.js"])
            .assert()
            .success()
            .stdout("js-v1")
            .stderr(predicate::str::contains("(cache)"));

        // Other resources are cached lazily
        worker_cmd(&home, &site)
            .args(["fetch", "assets/logo.png"])
            .assert()
            .success()
            .stdout("png-v1")
            .stderr(predicate::str::contains("(network)"));
        site.serve_only("assets/logo.png", "png-changed-on-server");
        worker_cmd(&home, &site)
            .args(["fetch", "/assets/logo.png?v=7"])
            .assert()
            .success()
            .stdout("png-v1")
            .stderr(predicate::str::contains("(cache)"));

        // Unknown paths pass through to the network
        worker_cmd(&home, &site)
            .args(["fetch", "api/health"])
            .assert()
            .success()
            .stderr(predicate::str::contains("404"))
            .stderr(predicate::str::contains("(passthrough)"));

        // Second deployment changes main.dart.js only
        site.deploy(&[("main.dart.js", "js-v2"), ("assets/logo.png", "png-v1")]);
        generate(&home, &site);

        worker_cmd(&home, &site).arg("install").assert().success();
        worker_cmd(&home, &site)
            .arg("activate")
            .assert()
            .success()
            .stdout(predicate::str::contains("Retained 2 unchanged entries"))
            .stdout(predicate::str::contains("Evicted 1 entries"))
            .stdout(predicate::str::contains("main.dart.js"));

        worker_cmd(&home, &site)
            .args(["fetch", "main.dart.js"])
            .assert()
            .success()
            .stdout("js-v2")
            .stderr(predicate::str::contains("(cache)"));

        let status = status_json(&home, &site);
        assert_eq!(status["worker"]["state"], "activated");
        assert_eq!(status["worker"]["clients_claimed"], true);
        assert_eq!(status["manifest"]["stored_resources"], 4);
        assert_eq!(status["manifest"]["drift"]["changed"], serde_json::json!([]));
        assert_eq!(status["manifest"]["missing"], serde_json::json!(["/"]));

        assert_eq!(
            journal_events(home.path()),
            vec![
                "worker.installed",
                "worker.activated",
                "worker.installed",
                "worker.activated"
            ]
        );

        worker_cmd(&home, &site)
            .args(["clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cleared 2 partitions and the worker record"));
        assert!(status_json(&home, &site)["worker"].is_null());
        assert!(status_json(&home, &site)["partitions"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn download_offline_hydrates_every_resource() {
        let home = TempDir::new().unwrap();
        let site = Site::start(&home);
        site.deploy(&[
            ("index.html", "<html>v1"),
            ("main.dart.js", "js-v1"),
            ("assets/logo.png", "png-v1"),
            ("assets/fonts/roboto.ttf", "ttf"),
        ]);
        generate(&home, &site);

        worker_cmd(&home, &site).arg("install").assert().success();
        worker_cmd(&home, &site).arg("activate").assert().success();

        worker_cmd(&home, &site)
            .args(["message", "downloadOffline"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cached 3 resources"));

        let status = status_json(&home, &site);
        assert_eq!(status["manifest"]["missing"], serde_json::json!([]));

        worker_cmd(&home, &site)
            .args(["message", "downloadOffline"])
            .assert()
            .success()
            .stdout(predicate::str::contains("All resources already cached"));
    }

    #[test]
    fn failed_install_marks_worker_redundant() {
        let home = TempDir::new().unwrap();
        let site = Site::start(&home);
        site.deploy(&[("index.html", "<html>v1"), ("main.dart.js", "js-v1")]);
        generate(&home, &site);
        site.files.lock().unwrap().remove("/main.dart.js");

        worker_cmd(&home, &site)
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("404"));

        let status = status_json(&home, &site);
        assert_eq!(status["worker"]["state"], "redundant");
    }

    #[test]
    fn unknown_message_is_ignored() {
        let home = TempDir::new().unwrap();
        let site = Site::start(&home);
        site.deploy(&[("index.html", "<html>v1")]);
        generate(&home, &site);

        worker_cmd(&home, &site)
            .args(["message", "refresh"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Ignored unknown message"));
    }
}
