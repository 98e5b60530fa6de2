//! Integration tests for pinboot

mod support {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use pinboot::digest::ArtifactHash;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::path::{Path, PathBuf};
    use std::thread::{self, JoinHandle};
    use tempfile::TempDir;

    pub const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    /// Isolated manifest and cache for one test
    pub struct Workspace {
        pub dir: TempDir,
    }

    impl Workspace {
        pub fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        pub fn cache_root(&self) -> PathBuf {
            self.dir.path().join("cache")
        }

        pub fn cached(&self, hash: &str) -> PathBuf {
            self.cache_root().join(format!("{hash}.artifact"))
        }

        pub fn manifest_path(&self) -> PathBuf {
            self.dir.path().join("pinboot.toml")
        }

        pub fn write_manifest(&self, text: &str) {
            std::fs::write(self.manifest_path(), text).unwrap();
        }

        /// Write a local artifact and return its file URL and hash
        pub fn artifact(&self, name: &str, content: &[u8]) -> (String, ArtifactHash) {
            let path = self.dir.path().join(name);
            std::fs::write(&path, content).unwrap();
            (
                url::Url::from_file_path(&path).unwrap().to_string(),
                ArtifactHash::of_bytes(content),
            )
        }

        pub fn pinboot(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("pinboot");
            cmd.env("PINBOOT_MANIFEST", self.manifest_path())
                .env("PINBOOT_CACHE_DIR", self.cache_root());
            cmd
        }

        pub fn pinboot_cache(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("pinboot-cache");
            cmd.env("PINBOOT_CACHE_DIR", self.cache_root());
            cmd
        }
    }

    /// Serve `body` with `status` for one connection per expected request
    pub fn serve(status: u16, body: &'static [u8], requests: usize) -> (String, JoinHandle<usize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/artifact.bin", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let mut served = 0;
            for stream in listener.incoming().take(requests) {
                let mut stream = stream.unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                write!(
                    stream,
                    "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                )
                .unwrap();
                stream.write_all(body).unwrap();
                served += 1;
            }
            served
        });
        (url, handle)
    }

    /// A URL nothing listens on
    pub fn dead_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/artifact.bin")
    }

    pub fn read(path: &Path) -> Vec<u8> {
        std::fs::read(path).unwrap()
    }
}

mod bootstrap_tests {
    use super::support::*;
    use predicates::prelude::*;

    #[test]
    fn downloads_verifies_and_launches() {
        let ws = Workspace::new();
        let (url, server) = serve(200, b"abc", 1);
        ws.write_manifest(&format!(
            "entry = \"pinboot.noop\"\nrequires = \"{ABC_SHA256}@{url}\"\n"
        ));

        ws.pinboot().assert().success();

        assert_eq!(server.join().unwrap(), 1);
        assert_eq!(read(&ws.cached(ABC_SHA256)), b"abc");
    }

    #[test]
    fn warm_cache_needs_no_network() {
        let ws = Workspace::new();
        let (url, server) = serve(200, b"abc", 1);
        ws.write_manifest(&format!(
            "entry = \"pinboot.noop\"\nrequires = \"{ABC_SHA256}@{url}\"\n"
        ));
        ws.pinboot().assert().success();
        server.join().unwrap();

        // The listener is gone; a second download attempt would be refused
        ws.pinboot().assert().success();
    }

    #[test]
    fn hash_mismatch_fails_without_caching() {
        let ws = Workspace::new();
        let (url, server) = serve(200, b"abc", 1);
        let altered = format!("{}0", &ABC_SHA256[..63]);
        ws.write_manifest(&format!(
            "entry = \"pinboot.noop\"\nrequires = \"{altered}@{url}\"\n"
        ));

        ws.pinboot()
            .assert()
            .code(1)
            .stderr(predicate::str::contains("does not match"));

        server.join().unwrap();
        assert!(!ws.cached(&altered).exists());
        assert!(!ws.cached(ABC_SHA256).exists());
    }

    #[test]
    fn missing_entry_fails_before_download() {
        let ws = Workspace::new();
        ws.write_manifest(&format!("requires = \"{ABC_SHA256}@{}\"\n", dead_url()));

        ws.pinboot()
            .assert()
            .code(1)
            .stderr(predicate::str::contains("entry point has not been specified"));

        assert!(!ws.cache_root().exists());
    }

    #[test]
    fn unknown_entry_fails_before_download() {
        let ws = Workspace::new();
        ws.write_manifest(&format!(
            "entry = \"app.absent\"\nrequires = \"{ABC_SHA256}@{}\"\n",
            dead_url()
        ));

        ws.pinboot()
            .assert()
            .code(1)
            .stderr(predicate::str::contains("app.absent"));
    }

    #[test]
    fn silent_prints_nothing() {
        let ws = Workspace::new();
        ws.write_manifest("verbosity = \"silent\"\n");

        ws.pinboot().assert().code(1).stderr(predicate::str::is_empty());
    }

    #[test]
    fn invalid_verbosity_is_reported() {
        let ws = Workspace::new();
        ws.write_manifest("verbosity = \"loud\"\nentry = \"pinboot.noop\"\n");

        ws.pinboot()
            .assert()
            .code(1)
            .stderr(predicate::str::contains("loud"));
    }

    #[test]
    fn missing_manifest_file() {
        let ws = Workspace::new();

        ws.pinboot()
            .assert()
            .code(1)
            .stderr(predicate::str::contains("No bootstrap manifest found"));
    }

    #[test]
    fn fetch_failure_exits_with_requirement_code() {
        let ws = Workspace::new();
        let (url, server) = serve(404, b"not found", 1);
        ws.write_manifest(&format!(
            "entry = \"pinboot.noop\"\nrequires = \"{ABC_SHA256}@{url}\"\n"
        ));

        ws.pinboot()
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Failed to fetch"));

        server.join().unwrap();
        assert!(!ws.cached(ABC_SHA256).exists());
    }

    #[test]
    fn corrupt_cache_entry_is_fatal() {
        let ws = Workspace::new();
        std::fs::create_dir_all(ws.cache_root()).unwrap();
        std::fs::write(ws.cached(ABC_SHA256), b"abd").unwrap();
        ws.write_manifest(&format!(
            "entry = \"pinboot.noop\"\nrequires = \"{ABC_SHA256}@{}\"\n",
            dead_url()
        ));

        ws.pinboot()
            .assert()
            .code(1)
            .stderr(predicate::str::contains("does not match"));

        assert_eq!(read(&ws.cached(ABC_SHA256)), b"abd");
    }

    #[test]
    fn file_url_requirement() {
        let ws = Workspace::new();
        let (url, hash) = ws.artifact("lib.bin", b"library bytes");
        ws.write_manifest(&format!(
            "verbosity = \"info\"\nentry = \"pinboot.noop\"\nrequires = [\"{hash}={url}\"]\n"
        ));

        ws.pinboot().assert().success();

        assert_eq!(read(&ws.cached(hash.as_str())), b"library bytes");
    }

    #[cfg(unix)]
    #[test]
    fn exec_entry_forwards_args_and_exit_code() {
        let ws = Workspace::new();
        let out = ws.dir.path().join("out.txt");
        let script = format!("#!/bin/sh\nprintf '%s' \"$1\" > {}\nexit 7\n", out.display());
        let (url, hash) = ws.artifact("tool.sh", script.as_bytes());
        ws.write_manifest(&format!(
            "entry = \"pinboot.exec\"\nrequires = \"{hash}@{url}\"\n"
        ));

        ws.pinboot().arg("hello world").assert().code(7);

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello world");
    }
}

mod cache_cli_tests {
    use super::support::*;
    use predicates::prelude::*;

    #[test]
    fn help_displays() {
        Workspace::new()
            .pinboot_cache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("pinboot artifact cache"));
    }

    #[test]
    fn path_prints_root() {
        let ws = Workspace::new();
        ws.pinboot_cache()
            .arg("path")
            .assert()
            .success()
            .stdout(predicate::str::contains(ws.cache_root().display().to_string()));
    }

    #[test]
    fn debug_verbosity_logs_cache_root() {
        let ws = Workspace::new();
        ws.pinboot_cache()
            .args(["-vv", "path"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Cache root:"));
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        Workspace::new()
            .pinboot_cache()
            .args(["verify", "xyz"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Invalid argument 'xyz'"));
    }

    #[test]
    fn list_empty() {
        Workspace::new()
            .pinboot_cache()
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached artifacts"));
    }

    #[test]
    fn warm_then_list_and_verify() {
        let ws = Workspace::new();
        let (url, hash) = ws.artifact("lib.bin", b"abc");
        ws.write_manifest(&format!(
            "entry = \"pinboot.noop\"\nrequires = \"{hash}@{url}\"\n"
        ));

        ws.pinboot_cache()
            .arg("warm")
            .arg("--manifest")
            .arg(ws.manifest_path())
            .assert()
            .success();

        ws.pinboot_cache()
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("{ABC_SHA256}.artifact")));

        ws.pinboot_cache().arg("verify").assert().success();
    }

    #[test]
    fn verify_reports_corruption() {
        let ws = Workspace::new();
        std::fs::create_dir_all(ws.cache_root()).unwrap();
        std::fs::write(ws.cached(ABC_SHA256), b"abd").unwrap();

        ws.pinboot_cache()
            .arg("verify")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("does not match"));
    }

    #[test]
    fn clear_removes_artifacts() {
        let ws = Workspace::new();
        std::fs::create_dir_all(ws.cache_root()).unwrap();
        std::fs::write(ws.cached(ABC_SHA256), b"abc").unwrap();

        ws.pinboot_cache()
            .args(["clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cleared 1 artifact(s)"));

        assert!(!ws.cached(ABC_SHA256).exists());
    }
}
