use prefab_proxy::staleness::{mtime_of, TemplateStaleness};
use prefab_proxy::{TemplateId, TemplateInfo, TemplateResolver, TemplateVersion};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Resolves templates to files on disk.
#[derive(Default)]
struct FileResolver {
    paths: HashMap<TemplateId, PathBuf>,
}

impl TemplateResolver for FileResolver {
    fn resolve(&self, template: TemplateId) -> Option<TemplateInfo> {
        self.paths.get(&template).map(TemplateInfo::from_path)
    }
}

fn write_template(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = File::create(&path).unwrap();
    writeln!(file, "root: {name}").unwrap();
    path
}

#[test]
fn test_mtime_of_missing_file() {
    let dir = TempDir::new().unwrap();
    assert!(mtime_of(&dir.path().join("nope.prefab")).is_none());
}

#[test]
fn test_first_observation_is_a_change() {
    let dir = TempDir::new().unwrap();
    let template = TemplateId::new();
    let mut resolver = FileResolver::default();
    resolver.paths.insert(template, write_template(&dir, "crate.prefab"));

    let staleness = TemplateStaleness::has_changed(&resolver, Some(template), None);
    assert!(staleness.changed);
    assert!(staleness.version.is_some());

    let again = TemplateStaleness::has_changed(&resolver, Some(template), staleness.version);
    assert!(!again.changed);
    assert_eq!(again.version, staleness.version);
}

#[test]
fn test_newer_mtime_is_a_change() {
    let dir = TempDir::new().unwrap();
    let template = TemplateId::new();
    let path = write_template(&dir, "crate.prefab");
    let mut resolver = FileResolver::default();
    resolver.paths.insert(template, path.clone());

    let before = TemplateStaleness::current_version(&resolver, Some(template));

    let file = File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(60)).unwrap();

    let staleness = TemplateStaleness::has_changed(&resolver, Some(template), before);
    assert!(staleness.changed);
    assert!(staleness.version > before);
}

#[test]
fn test_null_and_unresolvable_templates_never_change() {
    let resolver = FileResolver::default();
    let observed = Some(TemplateVersion(SystemTime::UNIX_EPOCH));

    for template in [None, Some(TemplateId::new())] {
        let staleness = TemplateStaleness::has_changed(&resolver, template, observed);
        assert!(!staleness.changed);
        assert!(staleness.version.is_none());
    }
}

#[test]
fn test_deleted_file_reads_as_unresolvable() {
    let dir = TempDir::new().unwrap();
    let template = TemplateId::new();
    let path = write_template(&dir, "crate.prefab");
    let mut resolver = FileResolver::default();
    resolver.paths.insert(template, path.clone());

    std::fs::remove_file(&path).unwrap();
    let staleness = TemplateStaleness::has_changed(&resolver, Some(template), None);
    assert!(!staleness.changed);
    assert!(staleness.version.is_none());
}
