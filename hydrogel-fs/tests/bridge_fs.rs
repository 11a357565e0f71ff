//! The full bridge cycle against a real directory.

use hydrogel_fs::DirStore;
use hydrogel_core::{Bridge, Schema, Selection};
use serde_json::{Value, json};
use tempfile::TempDir;

fn site_schema() -> Schema {
    Schema::hydratable(
        "Site",
        ["name"],
        [
            ("name", Schema::Text),
            (
                "posts",
                Schema::array(Schema::hydratable(
                    "Post",
                    ["slug"],
                    [("slug", Schema::Text), ("title", Schema::Text)],
                )),
            ),
            ("theme", Schema::singleton("Theme", [("accent", Schema::Text)])),
        ],
    )
}

fn site() -> Value {
    json!({
        "_tag": "Site",
        "name": "blog",
        "posts": [
            {"_tag": "Post", "slug": "intro", "title": "Intro"},
            {"_tag": "Post", "slug": "next", "title": "Next"},
        ],
        "theme": {"_tag": "Theme", "accent": "teal"},
    })
}

#[test]
fn export_lays_out_one_file_per_fragment() {
    let dir = TempDir::new().unwrap();
    let mut bridge = Bridge::new(&site_schema(), DirStore::open(dir.path()).unwrap()).unwrap();
    bridge.import_from_memory(&site()).unwrap();
    bridge.export().unwrap();

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(names.len(), 4);
    assert!(names.contains(&"Site!name@blog.json".to_string()));
    assert!(names.contains(&"Site!name@blog___Post!slug@next.json".to_string()));
}

#[test]
fn a_fresh_bridge_sees_what_another_wrote() {
    let dir = TempDir::new().unwrap();
    {
        let mut writer =
            Bridge::new(&site_schema(), DirStore::open(dir.path()).unwrap()).unwrap();
        writer.import_from_memory(&site()).unwrap();
        writer.export().unwrap();
    }

    let mut reader = Bridge::new(&site_schema(), DirStore::open(dir.path()).unwrap()).unwrap();
    assert_eq!(reader.view().unwrap(), site());
}

#[test]
fn peek_reads_only_the_selected_file() {
    let dir = TempDir::new().unwrap();
    {
        let mut writer =
            Bridge::new(&site_schema(), DirStore::open(dir.path()).unwrap()).unwrap();
        writer.import_from_memory(&site()).unwrap();
        writer.export().unwrap();
    }

    let mut reader = Bridge::new(&site_schema(), DirStore::open(dir.path()).unwrap()).unwrap();
    let peeked = reader
        .peek(Some(&Selection::new().keys("Site", [("name", "blog")])))
        .unwrap();

    assert_eq!(peeked["Site"]["name"], json!("blog"));
    assert_eq!(reader.index().len(), 1);
}

#[test]
fn clear_removes_the_fragment_files() {
    let dir = TempDir::new().unwrap();
    let mut bridge = Bridge::new(&site_schema(), DirStore::open(dir.path()).unwrap()).unwrap();
    bridge.import_from_memory(&site()).unwrap();
    bridge.export().unwrap();
    bridge.clear().unwrap();

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert!(bridge.index().is_empty());

    // A cleared directory has nothing satisfying the root schema.
    assert!(bridge.view().is_err());
}
