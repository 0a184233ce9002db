use modelreg_core::{CoreError, ErrorKind, RegisterOptions, Registry, RegistryConfig};
use modelreg_store::{Metadata, HASHED_FILES, MANIFEST_FILE, REQUIRED_FILES};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;

fn write_package(dir: &Path, seed: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    // The manifest placeholder is rewritten on register.
    for name in REQUIRED_FILES {
        fs::write(dir.join(name), format!("{seed}:{name}\n")).unwrap();
    }
    dir.to_path_buf()
}

fn meta(v: serde_json::Value) -> Metadata {
    match v {
        serde_json::Value::Object(m) => m,
        _ => panic!("metadata must be an object"),
    }
}

fn registry(root: &Path) -> Registry {
    Registry::new(RegistryConfig::new(root)).unwrap()
}

// Register twice with the same coordinates, different contents.
#[test]
fn version_is_immutable() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(&tmp.path().join("registry"));
    let a = write_package(&tmp.path().join("a"), "first");
    let b = write_package(&tmp.path().join("b"), "second");

    let first = reg
        .register("t", "m", "v1", &a, Metadata::new(), &RegisterOptions::default())
        .unwrap();
    let err = reg
        .register("t", "m", "v1", &b, Metadata::new(), &RegisterOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let content = fs::read_to_string(first.package_path.join("model.pt")).unwrap();
    assert_eq!(content, "first:model.pt\n", "second attempt must not touch the package");
    assert_eq!(reg.promotion_history("t", "m").unwrap().len(), 1);
}

#[test]
fn verify_succeeds_after_register() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(&tmp.path().join("registry"));
    let src = write_package(&tmp.path().join("src"), "x");
    reg.register("t", "m", "v1", &src, Metadata::new(), &RegisterOptions::default())
        .unwrap();

    reg.verify("t", "m@v1").unwrap();
    reg.verify("t", "m@latest").unwrap();
}

#[test]
fn tampering_any_hashed_file_fails_verify_naming_it() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("registry");
    let reg = registry(&root);
    let src = write_package(&tmp.path().join("src"), "x");

    for (i, name) in HASHED_FILES.iter().enumerate() {
        let version = format!("v{i}");
        let res = reg
            .register("t", "m", &version, &src, Metadata::new(), &RegisterOptions::no_alias())
            .unwrap();
        fs::write(res.package_path.join(name), "tampered").unwrap();

        let err = reg.verify("t", &format!("m@{version}")).unwrap_err();
        match err {
            CoreError::Integrity { ref file, .. } => assert_eq!(file, name),
            other => panic!("expected integrity failure for {name}, got {other}"),
        }
    }
}

#[test]
fn removed_manifest_is_integrity_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = Registry::new(
        RegistryConfig::new(tmp.path().join("registry")).with_strict_verify(false),
    )
    .unwrap();
    let src = write_package(&tmp.path().join("src"), "x");
    let res = reg
        .register("t", "m", "v1", &src, Metadata::new(), &RegisterOptions::no_alias())
        .unwrap();
    fs::remove_file(res.package_path.join(MANIFEST_FILE)).unwrap();

    // Required-file validation runs first and already names the manifest.
    let err = reg.verify("t", "m@v1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains(MANIFEST_FILE));
}

#[test]
fn binary_garbage_manifest_is_integrity_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(&tmp.path().join("registry"));
    let src = write_package(&tmp.path().join("src"), "x");
    let res = reg
        .register("t", "m", "v1", &src, Metadata::new(), &RegisterOptions::no_alias())
        .unwrap();
    fs::write(res.package_path.join(MANIFEST_FILE), [0xc3, 0x28, 0xff]).unwrap();

    let err = reg.verify("t", "m@v1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(err.to_string().contains(MANIFEST_FILE));
}

#[test]
fn alias_and_version_resolve_to_same_path() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(&tmp.path().join("registry"));
    let src = write_package(&tmp.path().join("src"), "x");
    reg.register("t", "m", "v1", &src, Metadata::new(), &RegisterOptions::default())
        .unwrap();

    let by_version = reg.resolve("t", "m@v1", false).unwrap();
    let by_alias = reg.resolve("t", "m@latest", false).unwrap();
    assert_eq!(by_version, by_alias);
}

#[test]
fn alias_lookup_precedes_literal_version() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(&tmp.path().join("registry"));
    let src = write_package(&tmp.path().join("src"), "x");
    for v in ["v1", "v2"] {
        reg.register("t", "m", v, &src, Metadata::new(), &RegisterOptions::no_alias())
            .unwrap();
    }
    // An alias named like an existing version shadows it.
    reg.promote("t", "m", "v2", "v1", None, None).unwrap();
    let path = reg.resolve("t", "m@v2", false).unwrap();
    assert!(path.ends_with("versions/v1"));
}

#[test]
fn alias_pointing_outside_the_model_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("registry");
    let reg = Registry::new(RegistryConfig::new(&root).with_strict_verify(false)).unwrap();
    let src = write_package(&tmp.path().join("src"), "x");
    reg.register("t", "m", "v1", &src, Metadata::new(), &RegisterOptions::default())
        .unwrap();
    reg.register("t", "other", "v9", &src, Metadata::new(), &RegisterOptions::default())
        .unwrap();

    let alias_path = reg.layout().alias_path("t", "m", "bad");
    for target in ["", "../../other/versions/v9", "."] {
        let doc = serde_json::json!({
            "task": "t",
            "model_name": "m",
            "alias": "bad",
            "version": target,
            "updated_at": "2026-01-01T00:00:00Z",
        });
        fs::write(&alias_path, doc.to_string()).unwrap();

        for verify in [false, true] {
            let err = reg.resolve("t", "m@bad", verify).unwrap_err();
            assert!(
                matches!(err, CoreError::InvalidIdentifier(_)),
                "version {target:?}: {err}"
            );
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }
}

#[test]
fn promotions_are_audited_in_call_order() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(&tmp.path().join("registry"));
    let src = write_package(&tmp.path().join("src"), "x");
    for v in ["v1", "v2", "v3"] {
        reg.register("t", "m", v, &src, Metadata::new(), &RegisterOptions::no_alias())
            .unwrap();
    }

    let plan = [
        ("production", "v1"),
        ("staging", "v2"),
        ("production", "v3"),
        ("production", "v2"),
        ("staging", "v3"),
    ];
    for (i, (alias, version)) in plan.iter().enumerate() {
        let reason = format!("step {i}");
        reg.promote("t", "m", alias, version, Some("tester"), Some(&reason))
            .unwrap();
    }

    let log = reg
        .layout()
        .promotions_log("t", "m");
    let raw = fs::read_to_string(&log).unwrap();
    assert_eq!(raw.lines().count(), plan.len());

    let events = reg.promotion_history("t", "m").unwrap();
    assert_eq!(events.len(), plan.len());
    for (i, (event, (alias, version))) in events.iter().zip(plan.iter()).enumerate() {
        assert_eq!(event.alias, *alias);
        assert_eq!(event.version, *version);
        assert_eq!(event.actor.as_deref(), Some("tester"));
        assert_eq!(event.reason, Some(format!("step {i}")));
        assert_eq!(event.task, "t");
        assert_eq!(event.model_name, "m");
    }
}

#[test]
fn alias_document_and_audit_share_timestamp() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(&tmp.path().join("registry"));
    let src = write_package(&tmp.path().join("src"), "x");
    reg.register("t", "m", "v1", &src, Metadata::new(), &RegisterOptions::no_alias())
        .unwrap();
    let doc = reg.promote("t", "m", "production", "v1", None, None).unwrap();
    let events = reg.promotion_history("t", "m").unwrap();
    assert_eq!(events[0].ts_utc, doc.updated_at);
    assert!(doc.updated_at.ends_with("+00:00"));
}

#[test]
fn missing_artifacts_dir_creates_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("registry");
    let reg = registry(&root);

    let err = reg
        .register(
            "t",
            "m",
            "v1",
            &tmp.path().join("does-not-exist"),
            Metadata::new(),
            &RegisterOptions::default(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(!reg.layout().version_dir("t", "m", "v1").exists());
    assert!(reg.list_versions("t", "m").unwrap().is_empty());
}

#[test]
fn each_missing_required_file_is_named() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(&tmp.path().join("registry"));

    for name in REQUIRED_FILES {
        if *name == "model_meta.json" {
            // Always written by the engine.
            continue;
        }
        let src = write_package(&tmp.path().join(format!("src-{name}")), "x");
        fs::remove_file(src.join(name)).unwrap();

        let version = format!("missing-{name}");
        let err = reg
            .register("t", "m", &version, &src, Metadata::new(), &RegisterOptions::default())
            .unwrap_err();
        match err {
            CoreError::IncompletePackage { ref missing, .. } => {
                assert_eq!(missing, &vec![(*name).to_owned()]);
            }
            other => panic!("expected incomplete package for {name}, got {other}"),
        }
        // No rollback: the invalid directory stays and no alias was written.
        assert!(reg.layout().version_dir("t", "m", &version).exists());
    }
    assert!(reg.list_aliases("t", "m").unwrap().is_empty());
}

#[test]
fn all_missing_files_reported_together() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(&tmp.path().join("registry"));
    let src = tmp.path().join("sparse");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("model.pt"), "weights").unwrap();

    let err = reg
        .register("t", "m", "v1", &src, Metadata::new(), &RegisterOptions::default())
        .unwrap_err();
    match err {
        CoreError::IncompletePackage { missing, .. } => {
            assert_eq!(
                missing,
                vec![
                    "model_genes.txt",
                    "label_map.json",
                    "metrics.json",
                    "feature_schema.json",
                    "sha256sums.txt",
                ]
            );
        }
        other => panic!("unexpected {other}"),
    }
}

#[test]
fn reference_parsing_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(&tmp.path().join("registry"));
    for bad in ["m", "", "m@", "@v1"] {
        let err = reg.resolve("t", bad, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidReference, "{bad:?}");
    }
}

#[test]
fn concrete_registration_scenario() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(&tmp.path().join("registry"));
    let src = write_package(&tmp.path().join("src"), "x");

    let res = reg
        .register(
            "t",
            "m",
            "v1",
            &src,
            meta(serde_json::json!({"framework": "x"})),
            &RegisterOptions::default(),
        )
        .unwrap();
    assert!(res.ok);
    assert_eq!(res.alias_set.as_deref(), Some("latest"));
    assert!(res.package_path.ends_with("tasks/t/models/m/versions/v1"));

    let on_disk: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(res.package_path.join("model_meta.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(on_disk["framework"], "x");
    assert_eq!(on_disk["task"], "t");
    assert_eq!(on_disk["version"], "v1");
    assert!(on_disk["created_at"].is_string());

    let manifest = fs::read_to_string(res.package_path.join(MANIFEST_FILE)).unwrap();
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines.len(), HASHED_FILES.len());
    for (line, name) in lines.iter().zip(HASHED_FILES) {
        let (digest, file) = line.split_once("  ").unwrap();
        assert_eq!(digest.len(), 64);
        assert_eq!(file, *name);
        assert_eq!(res.hashes.digest(name), Some(digest));
    }
    assert!(manifest.ends_with('\n'));
}

#[test]
fn result_serializes_hashes_as_object() {
    let tmp = tempfile::tempdir().unwrap();
    let reg = registry(&tmp.path().join("registry"));
    let src = write_package(&tmp.path().join("src"), "x");
    let res = reg
        .register("t", "m", "v1", &src, Metadata::new(), &RegisterOptions::default())
        .unwrap();
    let json = serde_json::to_value(&res).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["alias_set"], "latest");
    assert!(json["hashes"]["model.pt"].is_string());
    assert!(json["hashes"].get(MANIFEST_FILE).is_none());
}

#[test]
fn concurrent_register_same_version_one_winner() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("registry");
    let n = 6;
    let barrier = Arc::new(Barrier::new(n));

    let handles: Vec<_> = (0..n)
        .map(|i| {
            let root = root.clone();
            let src = write_package(&tmp.path().join(format!("src{i}")), &format!("w{i}"));
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let reg = registry(&root);
                barrier.wait();
                reg.register("t", "m", "v1", &src, Metadata::new(), &RegisterOptions::no_alias())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one register must win");
    for r in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(r.kind(), ErrorKind::AlreadyExists, "loser saw {r}");
    }

    let reg = registry(&root);
    reg.verify("t", "m@v1").unwrap();
    assert_eq!(reg.list_versions("t", "m").unwrap(), vec!["v1"]);
}

#[test]
fn reregister_after_abandoned_staging_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("registry");
    let reg = registry(&root);
    let src = write_package(&tmp.path().join("src"), "x");

    // Leftover from a copy interrupted before its rename.
    let versions = reg.layout().versions_dir("t", "m");
    let stale = versions.join(".staging-v1-crashed");
    fs::create_dir_all(&stale).unwrap();
    fs::write(stale.join("model.pt"), "partial").unwrap();

    reg.register("t", "m", "v1", &src, Metadata::new(), &RegisterOptions::default())
        .unwrap();
    reg.verify("t", "m@latest").unwrap();
    assert_eq!(reg.list_versions("t", "m").unwrap(), vec!["v1"]);
}
