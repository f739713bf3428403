use std::iter;

use arbor::{
    WidgetRef,
    text::Wrap,
    widget::boxed,
    widgets::{AttrMap, Frame, ListBox, SimpleListWalker, Text},
};

/// Tab stops are this far apart.
const TAB_WIDTH: usize = 4;

/// Expand tabs, since text layout treats a tab as a single cell.
fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        if c == '\t' {
            let pad = TAB_WIDTH - out.chars().count() % TAB_WIDTH;
            out.extend(iter::repeat_n(' ', pad));
        } else {
            out.push(c);
        }
    }
    out
}

/// A scrolling view of `contents`, one list item per line. Long lines are
/// clipped unless `wrap` is set.
pub fn pager(title: &str, contents: &str, wrap: bool) -> WidgetRef {
    let mode = if wrap { Wrap::Space } else { Wrap::Clip };
    let items = contents
        .lines()
        .map(|l| boxed(Text::new(expand_tabs(l)).with_wrap(mode)))
        .collect();
    let listbox = boxed(ListBox::new(SimpleListWalker::new(items)));
    let header = boxed(AttrMap::fill(boxed(Text::new(format!(" {title}"))), "header", None));
    let footer = boxed(AttrMap::fill(
        boxed(Text::new(" arrows scroll  pgup/pgdn page  home/end  q quit")),
        "footer",
        None,
    ));
    tracing::info!("paging {} lines", contents.lines().count());
    boxed(Frame::new(listbox).with_header(header).with_footer(footer))
}

#[cfg(test)]
mod tests {
    use arbor::{Widget, error::Result, event::key::KeyCode, sizing::RenderSize, testing::render_lines};

    use super::*;

    #[test]
    fn tabs() {
        assert_eq!(expand_tabs("a\tb"), "a   b");
        assert_eq!(expand_tabs("\tx"), "    x");
        assert_eq!(expand_tabs("abcd\te"), "abcd    e");
    }

    #[test]
    fn scrolls_by_line() -> Result<()> {
        let contents: Vec<String> = (0..20).map(|i| format!("line {i}")).collect();
        let p = pager("test", &contents.join("\n"), false);
        let size = RenderSize::boxed(20, 5);
        let lines = render_lines(&p, size, true)?;
        assert_eq!(lines[0].trim_end(), " test");
        assert_eq!(lines[1].trim_end(), "line 0");
        assert_eq!(lines[3].trim_end(), "line 2");

        p.borrow_mut().keypress(size, KeyCode::Down.into())?;
        let lines = render_lines(&p, size, true)?;
        assert_eq!(lines[1].trim_end(), "line 1");

        p.borrow_mut().keypress(size, KeyCode::End.into())?;
        let lines = render_lines(&p, size, true)?;
        assert_eq!(lines[3].trim_end(), "line 19");
        Ok(())
    }
}
