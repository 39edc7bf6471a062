use super::*;
use std::io::Write;

const SERVICES: &str = r#"
[ops-prod]
user = "ops"
host = "store.internal"
port = 5432
service = "coordination"

[ops-test]
user = "ci"
host = "localhost"
"#;

fn services_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn load_reads_all_sections() {
    let file = services_file(SERVICES);
    let profiles = ProfileFile::load(file.path()).unwrap();

    let mut names = profiles.section_names();
    names.sort();
    assert_eq!(names, vec!["ops-prod", "ops-test"]);
}

#[test]
fn from_file_picks_the_named_section() {
    let file = services_file(SERVICES);
    let profile = ConnectionProfile::from_file(file.path(), "ops-prod").unwrap();

    assert_eq!(profile.user.as_deref(), Some("ops"));
    assert_eq!(profile.port, Some(5432));
    assert_eq!(profile.service.as_deref(), Some("coordination"));
}

#[test]
fn missing_section_is_reported_by_name() {
    let file = services_file(SERVICES);
    let err = ConnectionProfile::from_file(file.path(), "ops-staging").unwrap_err();

    assert!(matches!(
        err,
        ProfileError::SectionNotFound { section, .. } if section == "ops-staging"
    ));
}

#[test]
fn missing_file_surfaces_io_error() {
    let err = ConnectionProfile::from_file(Path::new("/nonexistent/services.toml"), "x")
        .unwrap_err();
    assert!(matches!(err, ProfileError::Io { .. }));
}

#[test]
fn malformed_toml_surfaces_parse_error() {
    let file = services_file("[broken\nuser = ");
    let err = ProfileFile::load(file.path()).unwrap_err();
    assert!(matches!(err, ProfileError::Parse { .. }));
}

#[test]
fn default_profile_is_empty() {
    let profile = ConnectionProfile::default();
    assert_eq!(profile, ConnectionProfile {
        user: None,
        password: None,
        host: None,
        port: None,
        service: None,
    });
}
