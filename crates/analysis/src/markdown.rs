//! Block tree over GitHub-flavoured markdown.
//!
//! pulldown-cmark emits a flat event stream; the table parser needs to look at
//! the shape of a cell (which inline nodes, in which order), so the stream is
//! folded into owned [`Block`] / [`Inline`] trees. Adjacent text events are
//! merged, so `" -> "` always arrives as a single [`Inline::Text`].

use pulldown_cmark::{Event, Options, Parser, Tag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Heading(Vec<Inline>),
    BlockQuote(Vec<Block>),
    List(Vec<Vec<Block>>),
    CodeBlock(String),
    Html(String),
    Table(Table),
    Rule,
}

/// Inline content of one table cell.
pub type Cell = Vec<Inline>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub head: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Link {
        destination: String,
        children: Vec<Inline>,
    },
    Image {
        destination: String,
        children: Vec<Inline>,
    },
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Html(String),
    Break,
}

pub fn parse_document(markdown: &str) -> Vec<Block> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let mut builder = TreeBuilder {
        events: Parser::new_ext(markdown, options),
    };
    builder.blocks()
}

/// Compact rendering of inline nodes for error messages.
pub fn describe(inlines: &[Inline]) -> String {
    let parts: Vec<String> = inlines.iter().map(describe_one).collect();
    format!("[{}]", parts.join(", "))
}

fn describe_one(inline: &Inline) -> String {
    match inline {
        Inline::Text(text) => format!("text {text:?}"),
        Inline::Code(code) => format!("code {code:?}"),
        Inline::Link { children, .. } => format!("link {}", describe(children)),
        Inline::Image { children, .. } => format!("image {}", describe(children)),
        Inline::Emphasis(children) => format!("emphasis {}", describe(children)),
        Inline::Strong(children) => format!("strong {}", describe(children)),
        Inline::Strikethrough(children) => format!("strikethrough {}", describe(children)),
        Inline::Html(html) => format!("html {html:?}"),
        Inline::Break => "break".to_string(),
    }
}

struct TreeBuilder<I> {
    events: I,
}

impl<'a, I> TreeBuilder<I>
where
    I: Iterator<Item = Event<'a>>,
{
    /// Consumes blocks up to the end of the enclosing container (or the input).
    fn blocks(&mut self) -> Vec<Block> {
        let mut blocks = Vec::new();
        // tight list items carry inline events without a paragraph wrapper
        let mut loose = Vec::new();
        while let Some(event) = self.events.next() {
            match event {
                Event::End(_) => break,
                Event::Start(tag) if is_block(&tag) => {
                    flush_loose(&mut blocks, &mut loose);
                    if let Some(block) = self.block(tag) {
                        blocks.push(block);
                    }
                }
                Event::Rule => {
                    flush_loose(&mut blocks, &mut loose);
                    blocks.push(Block::Rule);
                }
                Event::Html(html) if loose.is_empty() => match blocks.last_mut() {
                    Some(Block::Html(existing)) => existing.push_str(&html),
                    _ => blocks.push(Block::Html(html.into_string())),
                },
                other => self.inline(other, &mut loose),
            }
        }
        flush_loose(&mut blocks, &mut loose);
        blocks
    }

    fn block(&mut self, tag: Tag<'a>) -> Option<Block> {
        match tag {
            Tag::Paragraph => Some(Block::Paragraph(self.inlines())),
            Tag::Heading(..) => Some(Block::Heading(self.inlines())),
            Tag::BlockQuote => Some(Block::BlockQuote(self.blocks())),
            Tag::CodeBlock(_) => Some(Block::CodeBlock(self.raw_text())),
            Tag::List(_) => Some(Block::List(self.list_items())),
            Tag::Table(_) => Some(Block::Table(self.table())),
            _ => {
                self.skip();
                None
            }
        }
    }

    fn list_items(&mut self) -> Vec<Vec<Block>> {
        let mut items = Vec::new();
        while let Some(event) = self.events.next() {
            match event {
                Event::Start(Tag::Item) => items.push(self.blocks()),
                Event::End(_) => break,
                Event::Start(_) => self.skip(),
                _ => {}
            }
        }
        items
    }

    fn table(&mut self) -> Table {
        let mut table = Table::default();
        while let Some(event) = self.events.next() {
            match event {
                Event::Start(Tag::TableHead) => table.head = self.cells(),
                Event::Start(Tag::TableRow) => table.rows.push(self.cells()),
                Event::End(_) => break,
                Event::Start(_) => self.skip(),
                _ => {}
            }
        }
        table
    }

    fn cells(&mut self) -> Vec<Cell> {
        let mut cells = Vec::new();
        while let Some(event) = self.events.next() {
            match event {
                Event::Start(Tag::TableCell) => cells.push(self.inlines()),
                Event::Start(Tag::TableRow) => cells.extend(self.cells()),
                Event::End(_) => break,
                Event::Start(_) => self.skip(),
                _ => {}
            }
        }
        cells
    }

    fn inlines(&mut self) -> Vec<Inline> {
        let mut inlines = Vec::new();
        while let Some(event) = self.events.next() {
            match event {
                Event::End(_) => break,
                other => self.inline(other, &mut inlines),
            }
        }
        inlines
    }

    fn inline(&mut self, event: Event<'a>, out: &mut Vec<Inline>) {
        match event {
            Event::Text(text) => push_text(out, &text),
            Event::Code(code) => out.push(Inline::Code(code.into_string())),
            Event::Html(html) => out.push(Inline::Html(html.into_string())),
            Event::SoftBreak | Event::HardBreak => out.push(Inline::Break),
            Event::Start(Tag::Link(_, destination, _)) => {
                let children = self.inlines();
                out.push(Inline::Link {
                    destination: destination.into_string(),
                    children,
                });
            }
            Event::Start(Tag::Image(_, destination, _)) => {
                let children = self.inlines();
                out.push(Inline::Image {
                    destination: destination.into_string(),
                    children,
                });
            }
            Event::Start(Tag::Emphasis) => {
                let children = self.inlines();
                out.push(Inline::Emphasis(children));
            }
            Event::Start(Tag::Strong) => {
                let children = self.inlines();
                out.push(Inline::Strong(children));
            }
            Event::Start(Tag::Strikethrough) => {
                let children = self.inlines();
                out.push(Inline::Strikethrough(children));
            }
            Event::Start(_) => self.skip(),
            _ => {}
        }
    }

    fn raw_text(&mut self) -> String {
        let mut text = String::new();
        while let Some(event) = self.events.next() {
            match event {
                Event::Text(chunk) => text.push_str(&chunk),
                Event::End(_) => break,
                _ => {}
            }
        }
        text
    }

    /// Discards events up to and including the end of the current container.
    fn skip(&mut self) {
        let mut depth = 1usize;
        for event in self.events.by_ref() {
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }
}

fn is_block(tag: &Tag<'_>) -> bool {
    matches!(
        tag,
        Tag::Paragraph
            | Tag::Heading(..)
            | Tag::BlockQuote
            | Tag::CodeBlock(_)
            | Tag::List(_)
            | Tag::Item
            | Tag::FootnoteDefinition(_)
            | Tag::Table(_)
            | Tag::TableHead
            | Tag::TableRow
            | Tag::TableCell
    )
}

fn push_text(out: &mut Vec<Inline>, text: &str) {
    // table cells can end with an empty text event
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text(previous)) = out.last_mut() {
        previous.push_str(text);
    } else {
        out.push(Inline::Text(text.to_string()));
    }
}

fn flush_loose(blocks: &mut Vec<Block>, loose: &mut Vec<Inline>) {
    if !loose.is_empty() {
        blocks.push(Block::Paragraph(std::mem::take(loose)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_table_with_link_wrapped_cells() {
        let body = "This PR contains the following updates:\n\n\
            | Package | Change |\n\
            |---|---|\n\
            | [lodash](https://lodash.com/) ([source](https://github.com/lodash/lodash)) | [`4.17.0` -> `4.17.21`](https://renovatebot.com/diffs/npm/lodash/4.17.0/4.17.21) |\n";
        let blocks = parse_document(body);
        assert!(matches!(blocks[0], Block::Paragraph(_)));
        let Block::Table(table) = &blocks[1] else {
            panic!("expected table, got {:?}", blocks[1]);
        };
        assert_eq!(table.head[0], vec![Inline::Text("Package".into())]);
        assert_eq!(table.head[1], vec![Inline::Text("Change".into())]);
        assert_eq!(table.rows.len(), 1);

        let package = &table.rows[0][0];
        assert!(matches!(&package[0], Inline::Link { children, .. } if children == &vec![Inline::Text("lodash".into())]));

        let change = &table.rows[0][1];
        let Inline::Link { children, .. } = &change[0] else {
            panic!("expected link, got {change:?}");
        };
        assert_eq!(
            children,
            &vec![
                Inline::Code("4.17.0".into()),
                Inline::Text(" -> ".into()),
                Inline::Code("4.17.21".into()),
            ]
        );
    }

    #[test]
    fn plain_cells_hold_no_empty_text() {
        let blocks = parse_document("| Package | Change |\n|---|---|\n| `lodash` | `1.0.0` -> `1.0.1` |\n");
        let Block::Table(table) = &blocks[0] else {
            panic!("expected table, got {:?}", blocks[0]);
        };
        assert_eq!(table.rows[0][0], vec![Inline::Code("lodash".into())]);
        assert_eq!(
            table.rows[0][1],
            vec![
                Inline::Code("1.0.0".into()),
                Inline::Text(" -> ".into()),
                Inline::Code("1.0.1".into()),
            ]
        );
    }

    #[test]
    fn tight_list_items_become_paragraphs() {
        let blocks = parse_document("- one\n- two\n");
        let Block::List(items) = &blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], vec![Block::Paragraph(vec![Inline::Text("one".into())])]);
    }

    #[test]
    fn html_and_rules_are_kept_as_blocks() {
        let blocks = parse_document("<details>\n<summary>x</summary>\n</details>\n\n---\n\ntext\n");
        assert!(matches!(blocks[0], Block::Html(_)));
        assert!(blocks.contains(&Block::Rule));
        assert!(matches!(blocks.last(), Some(Block::Paragraph(_))));
    }

    #[test]
    fn describe_renders_shape() {
        let rendered = describe(&[Inline::Code("1.0".into()), Inline::Text(" => ".into())]);
        assert_eq!(rendered, r#"[code "1.0", text " => "]"#);
    }
}
