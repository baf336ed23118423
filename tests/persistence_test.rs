use std::fs;

use tempfile::TempDir;

use bkindex::indexing::default_metric;
use bkindex::{BkTree, BuildOptions, IndexError, Keyboard, NodeRecord, TreeRecord, TreeSource};

fn sample_tree() -> BkTree {
    let mut tree = BkTree::new("book");
    tree.insert_all(["books", "cake", "boo", "boon", "cook", "cape", "cart"]).unwrap();
    tree.deactivate("cape").unwrap();
    tree
}

#[test]
fn test_json_file_round_trip() -> bkindex::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tree.json");

    let tree = sample_tree();
    tree.save_json(&path)?;

    let restored = BkTree::from_json_file(&path, default_metric())?;
    assert_eq!(restored.to_record(), tree.to_record());
    assert_eq!(restored.deleted_count(), 1);
    assert_eq!(restored.range_query("cap", 1), tree.range_query("cap", 1));

    let from_source = BkTree::build(TreeSource::JsonFile(path), default_metric())?;
    assert_eq!(from_source.to_string(), tree.to_string());
    Ok(())
}

#[test]
fn test_text_file_source() -> bkindex::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("words.txt");
    fs::write(&path, "book\r\nbooks\r\ncake\r\nbook\r\n\r\n")?;

    let tree = BkTree::from_text_file(&path, "\n", default_metric())?;
    assert_eq!(tree.len(), 3);
    assert_eq!(tree.root().value(), "book");

    let tree = BkTree::build(
        TreeSource::TextFile { path, delimiter: "\n".into() },
        default_metric(),
    )?;
    assert!(tree.contains("cake"));
    Ok(())
}

#[test]
fn test_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = BkTree::from_json_file(temp_dir.path().join("absent.json"), default_metric()).unwrap_err();
    assert!(matches!(err, IndexError::Io(_)));
}

#[test]
fn test_bytes_keep_weighted_queries() -> bkindex::Result<()> {
    let keyboard = Keyboard::qwerty();
    let options = BuildOptions::default();
    let tree = BkTree::from_values(["cat", "cst", "cpt", "cart"], options.metric(Some(&keyboard)))?;

    let bytes = tree.to_bytes()?;
    let restored = BkTree::from_bytes(&bytes, options.metric(Some(&keyboard)))?;
    for radius in 0..3 {
        assert_eq!(restored.range_query("cat", radius), tree.range_query("cat", radius));
    }
    Ok(())
}

#[test]
fn test_handwritten_record() -> bkindex::Result<()> {
    let record = TreeRecord {
        root: "book".into(),
        nodes: vec![
            NodeRecord::new("book", true).with_link(1, "books").with_link(4, "cake"),
            NodeRecord::new("books", true),
            NodeRecord::new("cake", false),
        ],
    };
    let mut tree = BkTree::build(TreeSource::Record(record), default_metric())?;
    assert_eq!(tree.deleted_count(), 1);
    assert!(tree.range_query("cake", 0).is_empty());

    tree.activate("cake")?;
    assert!(tree.range_query("cake", 0)[&0].contains("cake"));
    Ok(())
}

#[test]
fn test_missing_reference_in_json() {
    let json = r#"{"root": "book", "nodes": [{"value": "book", "links": {"1": "books"}}]}"#;
    let err = BkTree::from_json(json.as_bytes(), default_metric()).unwrap_err();
    assert!(matches!(err, IndexError::MissingReference(ref value) if value == "books"));

    let err = BkTree::from_json("not json".as_bytes(), default_metric()).unwrap_err();
    assert!(matches!(err, IndexError::Json(_)));
}

#[test]
fn test_keyboard_json_round_trip() -> bkindex::Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("keyboard.json");

    let keyboard = Keyboard::qwerty();
    keyboard.write_json(fs::File::create(&path)?)?;
    let restored = Keyboard::from_json(fs::File::open(&path)?)?;

    assert_eq!(restored.len(), keyboard.len());
    assert_eq!(restored.weight('a', 's', 2), 1);
    assert_eq!(restored.weight('a', 'p', 2), 2);
    Ok(())
}
