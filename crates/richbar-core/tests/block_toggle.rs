use gpui_richbar_core::{
    BlockType, Document, Editor, Marks, Node, PluginRegistry, Point, Selection,
};

fn editor_with_blocks(kinds: &[&str], selection: Option<Selection>) -> Editor {
    let doc = Document {
        children: kinds
            .iter()
            .map(|kind| Node::block(*kind, vec![Node::text("abc", Marks::default())]))
            .collect(),
    };
    Editor::new(doc, selection, PluginRegistry::richtext())
}

fn caret() -> Option<Selection> {
    Some(Selection::collapsed(Point::new(vec![0, 0], 1)))
}

fn block_kinds(editor: &Editor) -> Vec<String> {
    editor
        .doc()
        .children
        .iter()
        .map(|node| match node {
            Node::Element(el) => el.kind.clone(),
            Node::Text(_) => panic!("expected element block"),
        })
        .collect()
}

#[test]
fn toggling_twice_from_paragraph_restores_paragraph() {
    for block in BlockType::ALL {
        let mut editor = editor_with_blocks(&["paragraph"], caret());

        editor.toggle_block(block).unwrap();
        assert_eq!(block_kinds(&editor), vec![block.kind().to_string()]);
        assert!(editor.is_block_active(block));

        editor.toggle_block(block).unwrap();
        assert_eq!(block_kinds(&editor), vec!["paragraph".to_string()]);
    }
}

const HEADINGS: [BlockType; 4] = [BlockType::H1, BlockType::H2, BlockType::H3, BlockType::H4];

#[test]
fn toggling_an_active_heading_reverts_to_paragraph() {
    for heading in HEADINGS {
        let mut editor = editor_with_blocks(&[heading.kind()], caret());
        assert!(editor.is_block_active(heading));

        editor.toggle_block(heading).unwrap();
        assert_eq!(block_kinds(&editor), vec!["paragraph".to_string()]);
        assert!(!editor.is_block_active(heading));

        editor.toggle_block(heading).unwrap();
        assert_eq!(block_kinds(&editor), vec![heading.kind().to_string()]);
    }
}

#[test]
fn toggling_another_heading_twice_does_not_restore_the_original() {
    for original in HEADINGS {
        for other in HEADINGS.into_iter().filter(|other| *other != original) {
            let mut editor = editor_with_blocks(&[original.kind()], caret());

            editor.toggle_block(other).unwrap();
            assert_eq!(block_kinds(&editor), vec![other.kind().to_string()]);
            assert!(!editor.is_block_active(original));

            editor.toggle_block(other).unwrap();
            assert_eq!(block_kinds(&editor), vec!["paragraph".to_string()]);
        }
    }
}

#[test]
fn paragraph_toggle_is_absorbing() {
    let mut editor = editor_with_blocks(&["paragraph"], caret());
    assert!(editor.is_block_active(BlockType::Paragraph));

    editor.toggle_block(BlockType::Paragraph).unwrap();
    assert_eq!(block_kinds(&editor), vec!["paragraph".to_string()]);
    editor.toggle_block(BlockType::Paragraph).unwrap();
    assert_eq!(block_kinds(&editor), vec!["paragraph".to_string()]);
}

#[test]
fn mixed_selection_reports_every_present_type() {
    let selection = Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![1, 0], 2));
    let mut editor = editor_with_blocks(&["h1", "h2", "paragraph"], Some(selection));

    assert!(editor.is_block_active(BlockType::H1));
    assert!(editor.is_block_active(BlockType::H2));
    assert!(!editor.is_block_active(BlockType::Paragraph));
    assert_eq!(
        editor.active_block_types(),
        vec![BlockType::H1, BlockType::H2]
    );

    editor.toggle_block(BlockType::H1).unwrap();
    assert_eq!(
        block_kinds(&editor),
        vec!["paragraph", "paragraph", "paragraph"]
    );

    editor.toggle_block(BlockType::H4).unwrap();
    assert_eq!(block_kinds(&editor), vec!["h4", "h4", "paragraph"]);
}

#[test]
fn without_selection_queries_are_false_and_toggles_do_nothing() {
    let mut editor = editor_with_blocks(&["h1"], None);
    for block in BlockType::ALL {
        assert!(!editor.is_block_active(block));
    }

    let before = editor.doc().clone();
    editor.toggle_block(BlockType::H2).unwrap();
    editor.toggle_block(BlockType::Paragraph).unwrap();
    assert_eq!(editor.doc(), &before);
}

#[test]
fn unknown_kinds_are_never_active_and_can_be_replaced() {
    let mut editor = editor_with_blocks(&["blockquote"], caret());
    assert!(editor.active_block_types().is_empty());

    editor.toggle_block(BlockType::H2).unwrap();
    assert_eq!(block_kinds(&editor), vec!["h2".to_string()]);
}
