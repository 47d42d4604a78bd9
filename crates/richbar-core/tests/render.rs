use gpui_richbar_core::{
    BlockType, Mark, Marks, Node, Rendered, TextNode, Wrapper, initial_document, render_document,
    render_element, render_leaf, render_node,
};

fn leaf(text: &str, marks: Marks) -> TextNode {
    TextNode {
        text: text.to_string(),
        marks,
    }
}

/// Wrappers from the outside in, following the single-child chain of a rendered leaf.
fn wrapper_chain(rendered: &Rendered) -> Vec<Wrapper> {
    let mut chain = Vec::new();
    let mut current = rendered;
    while let Rendered::Element { wrapper, children } = current {
        chain.push(*wrapper);
        let [only] = children.as_slice() else {
            panic!("expected a single child");
        };
        current = only;
    }
    chain
}

#[test]
fn leaf_wrappers_nest_bold_code_italic_underline() {
    let all = Marks {
        bold: true,
        italic: true,
        underline: true,
        code: true,
    };
    let rendered = render_leaf(&leaf("x", all), Rendered::Text("x".to_string()));
    assert_eq!(
        wrapper_chain(&rendered),
        vec![
            Wrapper::Leaf,
            Wrapper::Mark(Mark::Underline),
            Wrapper::Mark(Mark::Italic),
            Wrapper::Mark(Mark::Code),
            Wrapper::Mark(Mark::Bold),
        ]
    );
    assert_eq!(rendered.text_content(), "x");
}

#[test]
fn plain_leaf_is_only_the_leaf_span() {
    let rendered = render_leaf(
        &leaf("plain", Marks::default()),
        Rendered::Text("plain".to_string()),
    );
    assert_eq!(wrapper_chain(&rendered), vec![Wrapper::Leaf]);
}

#[test]
fn known_kinds_map_to_block_wrappers_and_unknown_kinds_fall_back() {
    for block in BlockType::ALL {
        let rendered = render_element(block.kind(), Vec::new());
        assert_eq!(rendered.wrapper(), Some(Wrapper::Block(block)));
        assert_eq!(rendered.wrapper().unwrap().style().font_weight, Some(400));
    }

    let rendered = render_element("blockquote", vec![Rendered::Text("q".to_string())]);
    assert_eq!(rendered.wrapper(), Some(Wrapper::Fallback));
    assert_eq!(Wrapper::Fallback.tag(), "span");
    assert_eq!(rendered.text_content(), "q");
}

#[test]
fn mark_styles() {
    assert_eq!(Wrapper::Mark(Mark::Bold).style().font_weight, Some(600));
    assert_eq!(Wrapper::Mark(Mark::Code).style().background, Some(0xdce7e8));
    assert_eq!(Wrapper::Mark(Mark::Italic).tag(), "em");
    assert_eq!(Wrapper::Mark(Mark::Underline).tag(), "u");
    assert_eq!(Wrapper::Block(BlockType::Paragraph).tag(), "p");
    assert_eq!(Wrapper::Block(BlockType::H3).tag(), "h3");
}

#[test]
fn rendering_is_deterministic() {
    let node = Node::block(
        "h2",
        vec![
            Node::text("a", Marks::default().with(Mark::Bold)),
            Node::text("b", Marks::default()),
        ],
    );
    assert_eq!(render_node(&node), render_node(&node));
    assert_eq!(
        render_document(&initial_document()),
        render_document(&initial_document())
    );
}

#[test]
fn initial_document_renders_an_italic_heading() {
    let rendered = render_document(&initial_document());
    let [heading] = rendered.as_slice() else {
        panic!("expected one block");
    };
    assert_eq!(heading.wrapper(), Some(Wrapper::Block(BlockType::H1)));

    let runs = heading.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].text, "Halo My Name is Naufal");
    assert!(runs[0].has_mark(Mark::Italic));
    assert!(!runs[0].has_mark(Mark::Bold));
    assert_eq!(runs[0].font_weight(), Some(400));
    assert_eq!(runs[0].background(), None);
}
