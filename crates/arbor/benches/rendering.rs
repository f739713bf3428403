//! List box rendering benchmarks for arbor.

use std::hint::black_box;

use arbor::{
    Widget, cache,
    event::key::KeyCode,
    sizing::RenderSize,
    widget::{Handle, boxed, cached},
    widgets::{ListBox, SimpleListWalker, Text},
};
use criterion::{Criterion, criterion_group, criterion_main};

/// Sample paragraph repeated through the list.
const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. \
    Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.";

/// A list box over `n` paragraphs.
fn listbox(n: usize) -> Handle<ListBox<SimpleListWalker>> {
    let items = (0..n).map(|i| boxed(Text::new(format!("{i}: {LOREM}")))).collect();
    cached(ListBox::new(SimpleListWalker::new(items)))
}

/// Benchmark cold and warm list box renders, and scrolling.
fn benchmark_listbox(c: &mut Criterion) {
    let size = RenderSize::boxed(80, 24);

    c.bench_function("listbox_render_cold", |b| {
        let lb = listbox(1000);
        b.iter(|| {
            cache::clear();
            let canvas = lb.borrow_mut().render(size, true).expect("render failed");
            black_box(canvas);
        });
    });

    c.bench_function("listbox_render_warm", |b| {
        let lb = listbox(1000);
        let _held = lb.borrow_mut().render(size, true).expect("render failed");
        b.iter(|| {
            let canvas = lb.borrow_mut().render(size, true).expect("render failed");
            black_box(canvas);
        });
    });

    c.bench_function("listbox_scroll", |b| {
        let lb = listbox(1000);
        let mut canvas = lb.borrow_mut().render(size, true).expect("render failed");
        b.iter(|| {
            let unhandled = lb
                .borrow_mut()
                .keypress(size, KeyCode::PageDown.into())
                .expect("keypress failed");
            if unhandled.is_some() {
                // Wrap around at the end of the list.
                lb.borrow_mut().keypress(size, KeyCode::Home.into()).expect("keypress failed");
            }
            canvas = lb.borrow_mut().render(size, true).expect("render failed");
            black_box(&canvas);
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = benchmark_listbox
}
criterion_main!(benches);
