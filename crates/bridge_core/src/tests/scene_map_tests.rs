use std::io::Write;

use super::*;

fn mapping_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write mapping");
    file
}

#[test]
fn loads_scene_to_widget_mapping() {
    let file = mapping_file(r#"{ "Intro": "3", "Interview": "7", "Outro": "3" }"#);
    let scenes = SceneMap::load(file.path()).expect("load");

    assert_eq!(scenes.len(), 3);
    assert_eq!(scenes.widget_for("Interview"), Some(&WidgetId::from("7")));
    assert_eq!(scenes.widget_for("Outro"), Some(&WidgetId::from("3")));
    assert_eq!(scenes.widget_for("Break"), None);
}

#[test]
fn iterates_in_scene_name_order() {
    let scenes: SceneMap = [("b", "2"), ("a", "1"), ("c", "3")].into_iter().collect();
    let names: Vec<&str> = scenes.iter().map(|(scene, _)| scene).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = SceneMap::load(dir.path().join("mappings.json")).expect_err("missing file");
    assert!(matches!(err, MappingError::Read { .. }));
}

#[test]
fn malformed_mapping_is_a_parse_error() {
    let file = mapping_file("{ \"Intro\": ");
    let err = SceneMap::load(file.path()).expect_err("malformed");
    assert!(matches!(err, MappingError::Parse { .. }));

    let file = mapping_file(r#"{ "Intro": 3 }"#);
    let err = SceneMap::load(file.path()).expect_err("non-string widget id");
    assert!(matches!(err, MappingError::Parse { .. }));

    let file = mapping_file(r#"["Intro", "3"]"#);
    assert!(SceneMap::load(file.path()).is_err());
}
