#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// A temp dir holding fake linkers in `bin/` and stub compiler drivers that
/// record their environment and arguments into `<triple>.env` / `<triple>.args`.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new(linkers: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        let sandbox = Self { dir };
        for linker in linkers {
            write_executable(&sandbox.bin().join(linker), "#!/bin/sh\nexit 0\n");
        }
        sandbox
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn bin(&self) -> PathBuf {
        self.dir.path().join("bin")
    }

    /// A compiler driver stub exiting with `code`; `$3` is the target triple.
    pub fn driver(&self, code: i32) -> PathBuf {
        let path = self.dir.path().join(format!("driver-{}", code));
        let script = format!(
            "#!/bin/sh\n/usr/bin/env -0 > \"{dir}/$3.env\"\necho \"$@\" > \"{dir}/$3.args\"\nexit {code}\n",
            dir = self.dir.path().display(),
            code = code
        );
        write_executable(&path, &script);
        path
    }

    /// A compiler driver stub that gets killed by SIGKILL.
    pub fn killed_driver(&self) -> PathBuf {
        let path = self.dir.path().join("driver-killed");
        write_executable(&path, "#!/bin/sh\nkill -9 $$\n");
        path
    }

    /// Environment seen by the stub for `triple`, if it ran.
    pub fn child_env(&self, triple: &str) -> Option<BTreeMap<String, String>> {
        let content = fs::read(self.dir.path().join(format!("{}.env", triple))).ok()?;
        Some(
            String::from_utf8_lossy(&content)
                .split('\0')
                .filter_map(|l| l.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    pub fn child_args(&self, triple: &str) -> Option<String> {
        fs::read_to_string(self.dir.path().join(format!("{}.args", triple)))
            .ok()
            .map(|s| s.trim_end().to_string())
    }

    pub fn write_config(&self, content: &str) -> PathBuf {
        let path = self.dir.path().join("targets.toml");
        fs::write(&path, content).unwrap();
        path
    }
}

pub fn write_executable(path: &Path, content: &str) {
    fs::write(path, content).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}
