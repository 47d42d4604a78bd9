use gpui_richbar_core::{Editor, Marks, Node, PluginRegistry, Point, Selection};

#[test]
fn block_commands_and_queries() {
    let mut editor = Editor::with_richtext_plugins();
    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "hello" })))
        .unwrap();

    assert_eq!(
        editor
            .run_query::<bool>("block.is_active", Some(serde_json::json!({ "type": "paragraph" })))
            .unwrap(),
        true
    );

    editor
        .run_command("block.toggle", Some(serde_json::json!({ "type": "h2" })))
        .unwrap();
    assert_eq!(
        editor
            .run_query::<Vec<String>>("block.active_types", None)
            .unwrap(),
        vec!["h2".to_string()]
    );

    editor
        .run_command("block.set", Some(serde_json::json!({ "type": "h4" })))
        .unwrap();
    let Node::Element(block) = &editor.doc().children[0] else {
        panic!("expected element block");
    };
    assert_eq!(block.kind, "h4");

    editor
        .run_command("block.toggle", Some(serde_json::json!({ "type": "h4" })))
        .unwrap();
    assert_eq!(
        editor
            .run_query::<bool>("block.is_active", Some(serde_json::json!({ "type": "h4" })))
            .unwrap(),
        false
    );
}

#[test]
fn mark_commands_and_queries() {
    let mut editor = Editor::with_richtext_plugins();
    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "hello" })))
        .unwrap();
    editor.select(Selection::new(
        Point::new(vec![0, 0], 0),
        Point::new(vec![0, 0], 5),
    ));

    assert_eq!(
        editor
            .run_query::<bool>("marks.is_active", Some(serde_json::json!({ "mark": "bold" })))
            .unwrap(),
        false
    );

    editor
        .run_command("marks.toggle", Some(serde_json::json!({ "mark": "bold" })))
        .unwrap();
    editor
        .run_command("marks.add", Some(serde_json::json!({ "mark": "code" })))
        .unwrap();

    let active = editor.run_query::<Marks>("marks.get_active", None).unwrap();
    assert!(active.bold);
    assert!(active.code);
    assert!(!active.italic);

    editor
        .run_command("marks.remove", Some(serde_json::json!({ "mark": "bold" })))
        .unwrap();
    assert_eq!(
        editor
            .run_query::<bool>("marks.is_active", Some(serde_json::json!({ "mark": "bold" })))
            .unwrap(),
        false
    );
}

#[test]
fn text_commands() {
    let mut editor = Editor::with_richtext_plugins();
    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "abc" })))
        .unwrap();
    editor.run_command("text.insert_break", None).unwrap();
    editor
        .run_command("text.insert", Some(serde_json::json!({ "text": "d" })))
        .unwrap();
    editor.run_command("text.delete_backward", None).unwrap();
    editor.run_command("text.delete_backward", None).unwrap();
    assert_eq!(editor.doc().children.len(), 1);

    editor.select(Selection::collapsed(Point::new(vec![0, 0], 0)));
    editor.run_command("text.delete_forward", None).unwrap();

    let texts: Vec<String> = editor.text_blocks().iter().map(|b| b.text()).collect();
    assert_eq!(texts, vec!["bc".to_string()]);
}

#[test]
fn bad_ids_and_args_are_reported() {
    let mut editor = Editor::with_richtext_plugins();

    let err = editor.run_command("block.nope", None).unwrap_err();
    assert_eq!(err.message(), "Unknown command: block.nope");

    let err = editor.run_command("block.toggle", None).unwrap_err();
    assert_eq!(err.message(), "Missing args.type");

    let err = editor
        .run_command("block.toggle", Some(serde_json::json!({ "type": "h7" })))
        .unwrap_err();
    assert_eq!(err.message(), "Unknown block type: h7");

    let err = editor
        .run_query::<bool>("marks.is_active", Some(serde_json::json!({ "mark": "strike" })))
        .unwrap_err();
    assert_eq!(err.message(), "Unknown mark: strike");

    let err = editor.run_query::<bool>("marks.nope", None).unwrap_err();
    assert_eq!(err.message(), "Unknown query: marks.nope");

    let err = editor
        .run_query::<bool>("block.active_types", None)
        .unwrap_err();
    assert!(err.message().starts_with("Failed to decode query result"));
}

#[test]
fn core_registry_has_no_mark_commands() {
    let registry = PluginRegistry::core();
    assert!(registry.command("block.toggle").is_some());
    assert!(registry.command("text.insert").is_some());
    assert!(registry.command("marks.toggle").is_none());
    assert!(registry.query("marks.is_active").is_none());
    assert!(registry.is_known_kind("h3"));
    assert!(!registry.is_known_kind("blockquote"));
}
