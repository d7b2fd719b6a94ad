//! Cross-module scenario: parsing a full camera-node style document,
//! reading it back through the typed accessors, and dumping/reparsing it
//! should agree structurally (spec's "DataTree round-trip" scenario).

use qcnode_datatree::{DataTree, ImageFormat};

const DOC: &str = "\
[static]\n\
name = \"c0\"\n\
id = 7\n\
width = 1920\n\
height = 1080\n\
format = \"nv12\"\n";

#[test]
fn typed_accessors_read_back_the_literal_document() {
    let tree = DataTree::from_str(DOC).unwrap();
    let mut sub = DataTree::new();
    assert!(tree.get_subtree("static", &mut sub));

    assert_eq!(sub.get("name", String::new()), "c0");
    assert_eq!(sub.get("id", 0u32), 7);
    assert_eq!(sub.get_image_format("format", ImageFormat::Max), ImageFormat::Nv12);
}

#[test]
fn dump_then_reparse_is_structurally_identical() {
    let once = DataTree::from_str(DOC).unwrap();
    let twice = DataTree::from_str(&once.dump()).unwrap();
    let thrice = DataTree::from_str(&twice.dump()).unwrap();
    assert_eq!(twice, thrice);
}
