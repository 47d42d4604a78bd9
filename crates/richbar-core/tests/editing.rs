use gpui_richbar_core::{
    Direction, Document, Editor, Mark, Marks, Node, PluginRegistry, Point, Selection,
};

fn editor_with(blocks: Vec<(&str, Vec<Node>)>, selection: Selection) -> Editor {
    let doc = Document {
        children: blocks
            .into_iter()
            .map(|(kind, children)| Node::block(kind, children))
            .collect(),
    };
    Editor::new(doc, Some(selection), PluginRegistry::richtext())
}

fn plain(text: &str) -> Vec<Node> {
    vec![Node::text(text, Marks::default())]
}

fn caret(path: Vec<usize>, offset: usize) -> Selection {
    Selection::collapsed(Point::new(path, offset))
}

/// `(kind, text)` per block.
fn blocks(editor: &Editor) -> Vec<(String, String)> {
    editor
        .text_blocks()
        .iter()
        .map(|block| (block.el.kind.clone(), block.text()))
        .collect()
}

fn block(kind: &str, text: &str) -> (String, String) {
    (kind.to_string(), text.to_string())
}

#[test]
fn typing_and_backspace() {
    let mut editor = Editor::with_richtext_plugins();
    editor.insert_text("hello").unwrap();
    assert_eq!(blocks(&editor), vec![block("paragraph", "hello")]);
    assert_eq!(editor.selection(), Some(&caret(vec![0, 0], 5)));

    editor.delete_backward().unwrap();
    assert_eq!(blocks(&editor), vec![block("paragraph", "hell")]);
    assert_eq!(editor.selection(), Some(&caret(vec![0, 0], 4)));
}

#[test]
fn backspace_removes_a_whole_multibyte_char() {
    let mut editor = editor_with(vec![("paragraph", plain("aé"))], caret(vec![0, 0], 3));
    editor.delete_backward().unwrap();
    assert_eq!(blocks(&editor), vec![block("paragraph", "a")]);
}

#[test]
fn break_then_backspace_round_trips() {
    let mut editor = editor_with(vec![("paragraph", plain("hello"))], caret(vec![0, 0], 2));

    editor.insert_break().unwrap();
    assert_eq!(
        blocks(&editor),
        vec![block("paragraph", "he"), block("paragraph", "llo")]
    );
    assert_eq!(editor.selection(), Some(&caret(vec![1, 0], 0)));

    editor.delete_backward().unwrap();
    assert_eq!(blocks(&editor), vec![block("paragraph", "hello")]);
    assert_eq!(editor.selection(), Some(&caret(vec![0, 0], 2)));
}

#[test]
fn break_keeps_the_block_type() {
    let mut editor = editor_with(vec![("h2", plain("title"))], caret(vec![0, 0], 5));
    editor.insert_break().unwrap();
    assert_eq!(blocks(&editor), vec![block("h2", "title"), block("h2", "")]);
    assert_eq!(editor.selection(), Some(&caret(vec![1, 0], 0)));

    let mut editor = editor_with(vec![("paragraph", plain("ab"))], caret(vec![0, 0], 0));
    editor.insert_break().unwrap();
    assert_eq!(
        blocks(&editor),
        vec![block("paragraph", ""), block("paragraph", "ab")]
    );
}

#[test]
fn merging_blocks_keeps_the_surviving_type() {
    let mut editor = editor_with(
        vec![("h1", plain("ab")), ("paragraph", plain("cd"))],
        caret(vec![1, 0], 0),
    );
    editor.delete_backward().unwrap();
    assert_eq!(blocks(&editor), vec![block("h1", "abcd")]);

    let mut editor = editor_with(
        vec![("h1", plain("ab")), ("paragraph", plain("cd"))],
        caret(vec![0, 0], 2),
    );
    editor.delete_forward().unwrap();
    assert_eq!(blocks(&editor), vec![block("h1", "abcd")]);
    assert_eq!(editor.selection(), Some(&caret(vec![0, 0], 2)));
}

#[test]
fn delete_at_document_edges_is_a_no_op() {
    let mut editor = editor_with(vec![("paragraph", plain("ab"))], caret(vec![0, 0], 0));
    editor.delete_backward().unwrap();
    assert_eq!(blocks(&editor), vec![block("paragraph", "ab")]);

    editor.select(caret(vec![0, 0], 2));
    editor.delete_forward().unwrap();
    assert_eq!(blocks(&editor), vec![block("paragraph", "ab")]);
}

#[test]
fn deleting_a_fragment_joins_the_edge_blocks() {
    let mut editor = editor_with(
        vec![
            ("paragraph", plain("abc")),
            ("h2", plain("def")),
            ("paragraph", plain("ghi")),
        ],
        Selection::new(Point::new(vec![0, 0], 1), Point::new(vec![2, 0], 2)),
    );
    editor.delete_backward().unwrap();
    assert_eq!(blocks(&editor), vec![block("paragraph", "ai")]);
    assert_eq!(editor.selection(), Some(&caret(vec![0, 0], 1)));
}

#[test]
fn select_all_then_delete_leaves_one_empty_block() {
    let mut editor = editor_with(
        vec![("paragraph", plain("ab")), ("h1", plain("cd"))],
        caret(vec![0, 0], 0),
    );
    editor.select_all();
    assert_eq!(
        editor.selection(),
        Some(&Selection::new(
            Point::new(vec![0, 0], 0),
            Point::new(vec![1, 0], 2)
        ))
    );

    editor.delete_forward().unwrap();
    assert_eq!(blocks(&editor), vec![block("paragraph", "")]);
    assert_eq!(editor.selection(), Some(&caret(vec![0, 0], 0)));
}

#[test]
fn typing_over_a_selection_replaces_it() {
    let mut editor = editor_with(
        vec![("paragraph", plain("hello world"))],
        Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![0, 0], 5)),
    );
    editor.insert_text("bye").unwrap();
    assert_eq!(blocks(&editor), vec![block("paragraph", "bye world")]);
    assert_eq!(editor.selection(), Some(&caret(vec![0, 0], 3)));
}

#[test]
fn typing_at_the_start_of_a_bold_leaf_continues_the_previous_leaf() {
    let bold = Marks::default().with(Mark::Bold);
    let mut editor = editor_with(
        vec![(
            "paragraph",
            vec![Node::text("ab", Marks::default()), Node::text("cd", bold)],
        )],
        caret(vec![0, 1], 0),
    );
    editor.insert_text("x").unwrap();

    let Node::Element(paragraph) = &editor.doc().children[0] else {
        panic!("expected element block");
    };
    assert_eq!(
        paragraph.children,
        vec![Node::text("abx", Marks::default()), Node::text("cd", bold)]
    );
    assert_eq!(editor.selection(), Some(&caret(vec![0, 0], 3)));
}

#[test]
fn caret_moves_across_blocks_and_extends() {
    let mut editor = editor_with(
        vec![("paragraph", plain("ab")), ("h1", plain("cd"))],
        caret(vec![0, 0], 2),
    );

    editor.move_caret(Direction::Forward, false);
    assert_eq!(editor.selection(), Some(&caret(vec![1, 0], 0)));

    editor.move_caret(Direction::Backward, false);
    assert_eq!(editor.selection(), Some(&caret(vec![0, 0], 2)));

    editor.select(caret(vec![0, 0], 0));
    editor.move_caret(Direction::Forward, true);
    editor.move_caret(Direction::Forward, true);
    assert_eq!(
        editor.selection(),
        Some(&Selection::new(
            Point::new(vec![0, 0], 0),
            Point::new(vec![0, 0], 2)
        ))
    );

    editor.move_caret(Direction::Backward, false);
    assert_eq!(editor.selection(), Some(&caret(vec![0, 0], 0)));

    editor.move_caret(Direction::Backward, false);
    assert_eq!(editor.selection(), Some(&caret(vec![0, 0], 0)));
}

#[test]
fn selected_text_joins_blocks_with_newlines() {
    let mut editor = editor_with(
        vec![
            ("h1", plain("title")),
            ("paragraph", plain("body")),
            ("h2", plain("tail")),
        ],
        Selection::new(Point::new(vec![2, 0], 2), Point::new(vec![0, 0], 3)),
    );
    assert_eq!(editor.selected_text(), "le\nbody\nta");

    editor.select(caret(vec![1, 0], 2));
    assert_eq!(editor.selected_text(), "");
}

#[test]
fn cut_then_paste_restores_the_text() {
    let mut editor = editor_with(
        vec![("paragraph", plain("one")), ("paragraph", plain("two"))],
        Selection::new(Point::new(vec![0, 0], 1), Point::new(vec![1, 0], 2)),
    );

    let clipboard = editor.selected_text();
    assert_eq!(clipboard, "ne\ntw");
    editor.delete_fragment().unwrap();
    assert_eq!(blocks(&editor), vec![block("paragraph", "oo")]);

    editor.insert_lines(&clipboard).unwrap();
    assert_eq!(
        blocks(&editor),
        vec![block("paragraph", "one"), block("paragraph", "two")]
    );
    assert_eq!(editor.selection(), Some(&caret(vec![1, 0], 2)));
}

#[test]
fn pasting_normalizes_carriage_returns() {
    let mut editor = editor_with(vec![("h3", plain(""))], caret(vec![0, 0], 0));

    editor.insert_lines("a\r\nb\rc").unwrap();
    assert_eq!(
        blocks(&editor),
        vec![block("h3", "a"), block("h3", "b"), block("h3", "c")]
    );
}
