//! Maps document nodes to a presentation tree that a view layer can paint.

use crate::core::{Document, Node, TextNode};
use crate::format::{BlockType, Mark};

/// Wrapper order for leaf marks, innermost first.
pub const LEAF_WRAP_ORDER: [Mark; 4] = [Mark::Bold, Mark::Code, Mark::Italic, Mark::Underline];

pub const BLOCK_FONT_WEIGHT: u16 = 400;
pub const BOLD_FONT_WEIGHT: u16 = 600;
pub const CODE_BACKGROUND: u32 = 0xdce7e8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wrapper {
    Block(BlockType),
    /// Unknown element kinds render as a plain inline span.
    Fallback,
    Mark(Mark),
    /// Outermost wrapper of every text leaf.
    Leaf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WrapperStyle {
    pub font_weight: Option<u16>,
    pub background: Option<u32>,
}

impl Wrapper {
    pub fn tag(self) -> &'static str {
        match self {
            Wrapper::Block(BlockType::Paragraph) => "p",
            Wrapper::Block(block) => block.kind(),
            Wrapper::Fallback | Wrapper::Leaf => "span",
            Wrapper::Mark(Mark::Bold) => "strong",
            Wrapper::Mark(Mark::Code) => "code",
            Wrapper::Mark(Mark::Italic) => "em",
            Wrapper::Mark(Mark::Underline) => "u",
        }
    }

    pub fn style(self) -> WrapperStyle {
        match self {
            Wrapper::Block(_) | Wrapper::Fallback => WrapperStyle {
                font_weight: Some(BLOCK_FONT_WEIGHT),
                background: None,
            },
            Wrapper::Mark(Mark::Bold) => WrapperStyle {
                font_weight: Some(BOLD_FONT_WEIGHT),
                background: None,
            },
            Wrapper::Mark(Mark::Code) => WrapperStyle {
                font_weight: None,
                background: Some(CODE_BACKGROUND),
            },
            Wrapper::Mark(_) | Wrapper::Leaf => WrapperStyle::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Text(String),
    Element {
        wrapper: Wrapper,
        children: Vec<Rendered>,
    },
}

/// A contiguous piece of text and the wrappers around it, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun {
    pub text: String,
    pub wrappers: Vec<Wrapper>,
}

impl StyledRun {
    pub fn has_mark(&self, mark: Mark) -> bool {
        self.wrappers.contains(&Wrapper::Mark(mark))
    }

    /// The weight of the innermost wrapper that sets one.
    pub fn font_weight(&self) -> Option<u16> {
        self.wrappers
            .iter()
            .rev()
            .find_map(|wrapper| wrapper.style().font_weight)
    }

    pub fn background(&self) -> Option<u32> {
        self.wrappers
            .iter()
            .rev()
            .find_map(|wrapper| wrapper.style().background)
    }
}

impl Rendered {
    pub fn wrapper(&self) -> Option<Wrapper> {
        match self {
            Rendered::Text(_) => None,
            Rendered::Element { wrapper, .. } => Some(*wrapper),
        }
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Rendered::Text(text) => out.push_str(text),
            Rendered::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }

    pub fn runs(&self) -> Vec<StyledRun> {
        fn walk(node: &Rendered, stack: &mut Vec<Wrapper>, out: &mut Vec<StyledRun>) {
            match node {
                Rendered::Text(text) => out.push(StyledRun {
                    text: text.clone(),
                    wrappers: stack.clone(),
                }),
                Rendered::Element { wrapper, children } => {
                    stack.push(*wrapper);
                    for child in children {
                        walk(child, stack, out);
                    }
                    stack.pop();
                }
            }
        }

        let mut out = Vec::new();
        walk(self, &mut Vec::new(), &mut out);
        out
    }
}

/// Presentation for an element of `kind` around its already rendered children.
pub fn render_element(kind: &str, children: Vec<Rendered>) -> Rendered {
    let wrapper = match BlockType::from_kind(kind) {
        Some(block) => Wrapper::Block(block),
        None => Wrapper::Fallback,
    };
    Rendered::Element { wrapper, children }
}

/// Wrap `children` once per active mark of `leaf`, then in the leaf span.
pub fn render_leaf(leaf: &TextNode, children: Rendered) -> Rendered {
    let mut rendered = children;
    for mark in LEAF_WRAP_ORDER {
        if leaf.marks.get(mark) {
            rendered = Rendered::Element {
                wrapper: Wrapper::Mark(mark),
                children: vec![rendered],
            };
        }
    }
    Rendered::Element {
        wrapper: Wrapper::Leaf,
        children: vec![rendered],
    }
}

pub fn render_node(node: &Node) -> Rendered {
    match node {
        Node::Text(leaf) => render_leaf(leaf, Rendered::Text(leaf.text.clone())),
        Node::Element(el) => render_element(&el.kind, el.children.iter().map(render_node).collect()),
    }
}

pub fn render_document(doc: &Document) -> Vec<Rendered> {
    doc.children.iter().map(render_node).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_carry_enclosing_wrappers() {
        let rendered = render_node(&Node::block(
            "h2",
            vec![Node::text(
                "x",
                crate::core::Marks {
                    bold: true,
                    code: true,
                    ..Default::default()
                },
            )],
        ));
        let runs = rendered.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(
            runs[0].wrappers,
            vec![
                Wrapper::Block(BlockType::H2),
                Wrapper::Leaf,
                Wrapper::Mark(Mark::Code),
                Wrapper::Mark(Mark::Bold),
            ]
        );
        assert_eq!(runs[0].font_weight(), Some(BOLD_FONT_WEIGHT));
        assert_eq!(runs[0].background(), Some(CODE_BACKGROUND));
    }
}
