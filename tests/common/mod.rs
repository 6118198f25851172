//! Fake project fixture: each stage is a small `sh` script standing in for the
//! real package manager, migration runner, asset collector, and audit.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

pub struct Project {
    pub dir: TempDir,
}

impl Project {
    /// A healthy project: manifest present, database reachable, no audit violations.
    pub fn healthy() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        fs::write(root.join("requirements.txt"), "Django==5.0.6\ncertifi==2024.2.2\n").unwrap();
        fs::write(root.join("cacert.pem"), "-----BEGIN CERTIFICATE-----\n").unwrap();
        fs::write(root.join("db_up"), "").unwrap();
        fs::create_dir_all(root.join("assets/css")).unwrap();
        fs::write(root.join("assets/css/app.css"), "body { margin: 0 }\n").unwrap();
        fs::write(root.join("assets/logo.svg"), "<svg/>\n").unwrap();

        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.path(rel)).unwrap();
    }

    pub fn touch(&self, rel: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap_or_default()
    }

    /// Sorted relative listing of `staticfiles/`.
    pub fn static_listing(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect(&self.path("staticfiles"), &self.path("staticfiles"), &mut out);
        out.sort();
        out
    }

    /// Install an executable `sh` script standing in for the interpreter used by
    /// `launchpad verify`. Each smoke check it serves is appended to `checks.log`;
    /// the database check fails with 3 unless `db_up` exists.
    #[cfg(unix)]
    pub fn install_fake_python(&self) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.path("fake-python");
        fs::write(&path, FAKE_PYTHON).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    pub fn write_config(&self, config: &Value) {
        fs::write(
            self.path("launchpad.json"),
            serde_json::to_string_pretty(config).unwrap(),
        )
        .unwrap();
    }
}

fn collect(base: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(base, &path, out);
        } else {
            out.push(path.strip_prefix(base).unwrap().display().to_string());
        }
    }
}

const FAKE_PYTHON: &str = r#"#!/bin/sh
[ "$1" = "-c" ] || { echo "unexpected arguments: $*" >&2; exit 64; }
case "$2" in
    *ensure_connection*) check=database ;;
    *ALLOWED_HOSTS*) check=debug ;;
    *certifi*) check=certs ;;
    *) check=settings ;;
esac
echo "$check $DJANGO_SETTINGS_MODULE DEBUG=$DEBUG" >> checks.log
if [ "$check" = database ] && [ ! -f db_up ]; then
    echo 'could not connect to server' >&2
    exit 3
fi
echo "$check ok"
"#;

fn sh(script: &str) -> Value {
    json!(["sh", "-c", script])
}

/// Stage overrides driving the fixture. `working_dir` is left to the caller.
pub fn stage_overrides() -> Value {
    json!({
        "install": {
            "commands": [
                sh("echo 'pip upgraded'"),
                sh("test -f requirements.txt || { echo 'Could not open requirements file' >&2; exit 1; }")
            ]
        },
        "certs": {
            "commands": [sh("test -f cacert.pem && echo \"$PWD/cacert.pem\"")]
        },
        "migrate": {
            "commands": [sh(
                "test -f db_up || { echo 'could not connect to server' >&2; exit 2; }; \
                 grep -qx 0001_initial migrations.log 2>/dev/null || echo 0001_initial >> migrations.log"
            )]
        },
        "collectstatic": {
            "commands": [sh("rm -rf staticfiles && mkdir staticfiles && cp -R assets/. staticfiles/")]
        },
        "audit": {
            "commands": [sh("test ! -f audit_violations || { cat audit_violations >&2; exit 1; }")]
        }
    })
}

pub fn config_json(project: &Project) -> Value {
    json!({
        "working_dir": project.root().to_str().unwrap(),
        "env": {"LAUNCHPAD_FIXTURE": "1"},
        "stages": stage_overrides()
    })
}
